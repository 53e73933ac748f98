//! Where the wallet authorization URL goes once it is built.

use crate::error::Result;
use crate::library::MaybeSendSync;
use url::Url;

pub trait Redirect: MaybeSendSync {
    fn redirect(&self, url: &Url) -> Result<()>;
}

/// Native default: there is no page to navigate, so the URL is logged and
/// returned to the caller through `SignInOutcome`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRedirect;

impl Redirect for LogRedirect {
    fn redirect(&self, url: &Url) -> Result<()> {
        tracing::info!(%url, "open this URL to authorize the access key");
        Ok(())
    }
}
