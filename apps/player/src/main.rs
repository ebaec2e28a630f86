use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use reveal::{MessagingLinkBuilder, RevealController, RevealEffect, RevealTimings, Stage};
use server_api::resolve::{resolve, ResolveError, DEMO_ID};
use shared::domain::ProposalRecord;
use storage::Storage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Plays a shared proposal in the terminal.
#[derive(Parser, Debug)]
struct Args {
    /// Share link, `#fragment`, or bare token.
    #[arg(long)]
    link: Option<String>,
    /// Stored proposal id, or `demo`.
    #[arg(long)]
    id: Option<String>,
    #[arg(long, default_value = "sqlite://./data/proposals.db")]
    database_url: String,
    #[arg(long, default_value = MessagingLinkBuilder::DEFAULT_BASE)]
    contact_base_url: String,
    /// Multiplier applied to every stage delay.
    #[arg(long, default_value_t = 1.0)]
    pace: f32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();
    let args = Args::parse();

    let fragment = args.link.as_deref().map(fragment_of);
    let needs_storage = args.id.as_deref().is_some_and(|id| id != DEMO_ID);
    let database_url = if needs_storage {
        args.database_url.as_str()
    } else {
        "sqlite::memory:"
    };
    let storage = Storage::new(database_url)
        .await
        .with_context(|| format!("failed to open proposal storage at '{database_url}'"))?;

    let resolved = match resolve(&storage, fragment.as_deref(), args.id.as_deref()).await {
        Ok(resolved) => resolved,
        Err(ResolveError::NotFound { id }) => {
            anyhow::bail!("proposal '{id}' not found; the link may have expired")
        }
        Err(ResolveError::Missing) => {
            anyhow::bail!("nothing to play: pass --link with a share link or --id (try --id demo)")
        }
        Err(err) => return Err(err.into()),
    };
    info!(source = ?resolved.source, "proposal resolved");

    let contact = MessagingLinkBuilder::new(&args.contact_base_url)
        .with_context(|| format!("invalid contact base url '{}'", args.contact_base_url))?;
    let timings = RevealTimings::default().scaled(args.pace.max(0.0));
    let (controller, effects) = RevealController::start(resolved.record, timings, Arc::new(contact));

    play(&controller, effects).await
}

/// Accepts a full URL, a `#fragment`, or a bare token.
fn fragment_of(link: &str) -> String {
    match Url::parse(link) {
        Ok(url) => url.fragment().unwrap_or_default().to_string(),
        Err(_) => link.trim().trim_start_matches('#').to_string(),
    }
}

async fn play(
    controller: &RevealController,
    mut effects: tokio::sync::mpsc::UnboundedReceiver<RevealEffect>,
) -> Result<()> {
    let mut updates = controller.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stage = updates.borrow_and_update().stage;
    render(stage, controller.record());

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if snapshot.stage != stage {
                    stage = snapshot.stage;
                    render(stage, controller.record());
                }
                if stage == Stage::Contact {
                    if let Some(link) = controller.contact_action() {
                        println!("  {link}");
                    }
                    break;
                }
            }
            Some(effect) = effects.recv() => match effect {
                RevealEffect::Celebrate => println!("  🎉 🎊 🎉 🎊 🎉"),
                RevealEffect::Discourage(message) => println!("  {message}"),
            },
            line = lines.next_line(), if stage == Stage::Question => {
                let Some(line) = line.context("failed to read answer")? else {
                    debug!("stdin closed before an answer");
                    break;
                };
                match line.trim().to_ascii_lowercase().as_str() {
                    "y" | "yes" => {
                        controller.accept();
                    }
                    "n" | "no" => {
                        controller.decline();
                        let offset = controller.snapshot().reject_offset;
                        println!("  (the No button jumped to {:+.0}, {:+.0})", offset.x, offset.y);
                    }
                    "h" | "hover" => {
                        controller.hover_decline();
                        let offset = controller.snapshot().reject_offset;
                        println!("  (the No button dodged to {:+.0}, {:+.0})", offset.x, offset.y);
                    }
                    _ => println!("  Answer y, n, or h."),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    controller.teardown();
    Ok(())
}

fn render(stage: Stage, record: &ProposalRecord) {
    match stage {
        Stage::Intro => println!("\n💌 {}, someone has something to tell you...", record.recipient_name()),
        Stage::Message => println!("\n  \"{}\"\n      - {}", record.message(), record.sender_name()),
        Stage::Question => println!(
            "\n{}, will you be my Valentine? [y]es / [n]o / [h]over over no",
            record.recipient_name()
        ),
        Stage::Celebration => println!("\nYES! 💖"),
        Stage::Contact => println!("\nLet {} know you said yes:", record.sender_name()),
    }
}
