//! Decides which proposal a visit shows: shared token first, then the demo
//! sentinel, then a stored id.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::domain::{ProposalContent, ProposalId, ProposalRecord, Theme};
use storage::{ProposalStore, StorageError};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEMO_ID: &str = ProposalId::DEMO;
pub const SHARED_ID: &str = ProposalId::SHARED;

const DEMO_CREATED_AT_SECS: i64 = 1_707_868_800;

pub fn demo_record() -> ProposalRecord {
    ProposalRecord::new(
        ProposalId::demo(),
        ProposalContent {
            sender_name: "Alex".into(),
            recipient_name: "Sam".into(),
            contact_handle: "+15550100000".into(),
            message: "Every day with you is my favourite day. I have one question for you..."
                .into(),
            theme: Theme::Romantic,
        },
        DateTime::<Utc>::from_timestamp(DEMO_CREATED_AT_SECS, 0).unwrap_or_default(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Fragment,
    Demo,
    Storage,
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub record: ProposalRecord,
    pub source: ResolutionSource,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("proposal '{id}' not found")]
    NotFound { id: String },
    #[error("no share token or proposal id supplied")]
    Missing,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub async fn resolve(
    store: &dyn ProposalStore,
    fragment: Option<&str>,
    id: Option<&str>,
) -> Result<Resolved, ResolveError> {
    let fragment = fragment.map(str::trim).filter(|f| !f.is_empty() && *f != "#");
    let id = id.map(str::trim).filter(|id| !id.is_empty());

    if let Some(fragment) = fragment {
        match codec::try_decode(fragment) {
            Ok(record) => match record.content().check() {
                Ok(()) => {
                    return Ok(Resolved {
                        record,
                        source: ResolutionSource::Fragment,
                    })
                }
                Err(err) => warn!(%err, "shared token decoded to invalid content; falling back"),
            },
            Err(err) => debug!(%err, "fragment is not a share token; falling back"),
        }
    }

    match id {
        Some(DEMO_ID) => Ok(Resolved {
            record: demo_record(),
            source: ResolutionSource::Demo,
        }),
        Some(SHARED_ID) => Err(ResolveError::NotFound {
            id: SHARED_ID.to_string(),
        }),
        Some(id) => store
            .get_by_id(id)
            .await?
            .map(|record| Resolved {
                record,
                source: ResolutionSource::Storage,
            })
            .ok_or_else(|| ResolveError::NotFound { id: id.to_string() }),
        None => Err(ResolveError::Missing),
    }
}
