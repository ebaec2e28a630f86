use shared::domain::ProposalId;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// `<base>#<token>`; any fragment already on `base` is replaced.
pub fn build_share_url(base: &Url, token: &str) -> Url {
    let mut url = base.clone();
    url.set_fragment(Some(token));
    url
}

/// `<base>?id=<id>` for proposals stored server-side.
pub fn build_view_url(base: &Url, id: &ProposalId) -> Url {
    let mut url = base.clone();
    url.set_fragment(None);
    url.query_pairs_mut().clear().append_pair("id", id.as_str());
    url
}

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("native share is not available")]
    Unsupported,
    #[error("share failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Copied,
}

/// A native share sheet and a clipboard.
pub trait ShareTarget {
    fn native_share(&self, url: &str) -> Result<(), ShareError>;
    fn copy(&self, url: &str) -> Result<(), ShareError>;
}

pub fn share_link(target: &dyn ShareTarget, url: &str) -> Result<ShareOutcome, ShareError> {
    match target.native_share(url) {
        Ok(()) => {
            info!("share link handed to native share");
            Ok(ShareOutcome::Shared)
        }
        Err(err) => {
            warn!(%err, "native share failed; copying link instead");
            target.copy(url)?;
            Ok(ShareOutcome::Copied)
        }
    }
}
