use std::sync::Arc;

use anyhow::{Context, Result};
use arboard::Clipboard;
use clap::{Args, Parser, Subcommand};
use reveal::MessagingLinkBuilder;
use server_api::{
    create_proposal, get_proposal,
    share::{build_share_url, share_link, ShareError, ShareOutcome, ShareTarget},
    ApiContext,
};
use shared::{
    domain::{NewProposal, Theme},
    error::ApiException,
};
use storage::Storage;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/proposals.db")]
    database_url: String,
    /// Page that plays the reveal.
    #[arg(long, default_value = "http://127.0.0.1:8080/p")]
    public_base_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ProposalArgs {
    #[arg(long)]
    sender: String,
    #[arg(long)]
    recipient: String,
    /// Phone number; spaces, dashes and parentheses are ignored.
    #[arg(long)]
    handle: String,
    #[arg(long)]
    message: String,
    #[arg(long, default_value_t = Theme::Romantic)]
    theme: Theme,
}

impl From<ProposalArgs> for NewProposal {
    fn from(args: ProposalArgs) -> Self {
        NewProposal {
            sender_name: args.sender,
            recipient_name: args.recipient,
            contact_handle: args.handle,
            message: args.message,
            theme: Some(args.theme),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a share link without touching storage.
    Encode(ProposalArgs),
    /// Print the proposal carried by a token or share link.
    Decode { token: String },
    /// Store a proposal and share its link.
    Create(ProposalArgs),
    Show { id: String },
    List {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

/// No native share sheet on a terminal; links go to the clipboard.
struct ClipboardShare;

impl ShareTarget for ClipboardShare {
    fn native_share(&self, _url: &str) -> Result<(), ShareError> {
        Err(ShareError::Unsupported)
    }

    fn copy(&self, url: &str) -> Result<(), ShareError> {
        let mut clipboard = Clipboard::new().map_err(|err| ShareError::Failed(err.to_string()))?;
        clipboard
            .set_text(url.to_string())
            .map_err(|err| ShareError::Failed(err.to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();
    let cli = Cli::parse();
    let public_base_url = Url::parse(&cli.public_base_url)
        .with_context(|| format!("invalid public base url '{}'", cli.public_base_url))?;

    match cli.command {
        Command::Encode(args) => {
            let content = NewProposal::from(args).validate()?;
            let token = codec::encode_content(&content);
            println!("{}", build_share_url(&public_base_url, &token));
        }
        Command::Decode { token } => {
            let fragment = match Url::parse(&token) {
                Ok(url) => url.fragment().unwrap_or_default().to_string(),
                Err(_) => token,
            };
            let record = codec::try_decode(&fragment).context("link does not carry a proposal")?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Create(args) => {
            let ctx = open_context(&cli.database_url, public_base_url).await?;
            let created = create_proposal(&ctx, args.into())
                .await
                .map_err(ApiException::from)?;
            println!("created id={}", created.record.id());
            println!("share: {}", created.share_url);
            println!("view:  {}", created.view_url);
            match share_link(&ClipboardShare, &created.share_url) {
                Ok(ShareOutcome::Shared) => println!("link shared"),
                Ok(ShareOutcome::Copied) => println!("link copied to clipboard"),
                Err(err) => warn!(%err, "could not copy link; use the printed url"),
            }
        }
        Command::Show { id } => {
            let ctx = open_context(&cli.database_url, public_base_url).await?;
            let record = get_proposal(&ctx, &id).await.map_err(ApiException::from)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::List { limit } => {
            let storage = Storage::new(&cli.database_url).await?;
            for record in storage.list_recent(limit).await? {
                println!(
                    "{}  {}  {} -> {}",
                    record.id(),
                    record.created_at().format("%Y-%m-%d %H:%M"),
                    record.sender_name(),
                    record.recipient_name()
                );
            }
        }
    }

    Ok(())
}

async fn open_context(database_url: &str, public_base_url: Url) -> Result<ApiContext> {
    let storage = Storage::new(database_url)
        .await
        .with_context(|| format!("failed to open proposal storage at '{database_url}'"))?;
    Ok(ApiContext {
        store: Arc::new(storage),
        public_base_url,
        contact: Arc::new(MessagingLinkBuilder::default()),
    })
}
