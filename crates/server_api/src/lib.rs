use std::sync::Arc;

use chrono::Utc;
use reveal::ContactLinkBuilder;
use serde::Serialize;
use shared::{
    domain::{NewProposal, ProposalId, ProposalRecord},
    error::{ApiError, ErrorCode},
};
use storage::{ProposalStore, StorageError};
use tracing::{info, warn};
use url::Url;

pub mod resolve;
pub mod share;

use resolve::{demo_record, ResolutionSource, ResolveError, DEMO_ID};
use share::{build_share_url, build_view_url};

#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<dyn ProposalStore>,
    /// Page that plays the reveal; share tokens go in its fragment.
    pub public_base_url: Url,
    pub contact: Arc<dyn ContactLinkBuilder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedProposal {
    pub record: ProposalRecord,
    pub token: String,
    pub share_url: String,
    pub view_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedProposal {
    pub record: ProposalRecord,
    pub source: ResolutionSource,
    pub contact_url: String,
}

pub async fn create_proposal(
    ctx: &ApiContext,
    input: NewProposal,
) -> Result<CreatedProposal, ApiError> {
    let content = input.validate()?;
    let record = ProposalRecord::new(ProposalId::generate(), content, Utc::now());
    ctx.store.save(&record).await.map_err(storage_failure)?;

    let token = codec::encode(&record);
    let share_url = build_share_url(&ctx.public_base_url, &token).to_string();
    let view_url = build_view_url(&ctx.public_base_url, record.id()).to_string();
    info!(id = %record.id(), token_len = token.len(), "proposal created");
    Ok(CreatedProposal {
        record,
        token,
        share_url,
        view_url,
    })
}

pub async fn get_proposal(ctx: &ApiContext, id: &str) -> Result<ProposalRecord, ApiError> {
    if id == DEMO_ID {
        return Ok(demo_record());
    }
    ctx.store
        .get_by_id(id)
        .await
        .map_err(storage_failure)?
        .ok_or_else(|| ApiError::not_found(format!("proposal '{id}'")))
}

pub async fn resolve_proposal(
    ctx: &ApiContext,
    fragment: Option<&str>,
    id: Option<&str>,
) -> Result<ResolvedProposal, ApiError> {
    let resolved = resolve::resolve(ctx.store.as_ref(), fragment, id)
        .await
        .map_err(|err| match err {
            ResolveError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, err.to_string()),
            ResolveError::Missing => ApiError::new(ErrorCode::Validation, err.to_string()),
            ResolveError::Storage(err) => storage_failure(err),
        })?;
    let contact_url = ctx.contact.build(
        resolved.record.contact_handle(),
        resolved.record.sender_name(),
    );
    Ok(ResolvedProposal {
        record: resolved.record,
        source: resolved.source,
        contact_url,
    })
}

fn storage_failure(err: StorageError) -> ApiError {
    warn!(%err, "proposal storage failure");
    ApiError::new(ErrorCode::Storage, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
