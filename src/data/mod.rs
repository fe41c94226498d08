//! Upstream NAV sources.
//!
//! Each [`SourceKind`] has exactly one adapter implementing [`SourceAdapter`].
//! Adapters own their HTTP client (built once at startup) and hand back a
//! normalized [`Series`]; payload quirks never leak past this module.

use std::time::Duration;

use crate::domain::{Series, SourceKind};
use crate::error::FetchFailure;

pub mod boc;
pub mod bocom;
pub mod citic;
pub mod cmbc;
pub mod efunds;
pub mod http;
pub mod hzbank;
pub mod registry;

pub use boc::BocFixedAdapter;
pub use bocom::BocomAdapter;
pub use citic::CiticAdapter;
pub use cmbc::CmbcAdapter;
pub use efunds::EfundsAdapter;
pub use hzbank::HzbankAdapter;
pub use registry::AdapterRegistry;

/// Fetches the NAV history of one product from one upstream provider.
///
/// Implementations must not panic on bad payloads: individually malformed
/// entries are dropped, and an unusable response becomes a [`FetchFailure`].
/// A well-formed response with no entries is an empty series.
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Worst-case time `fetch` spends waiting on its requests, summed over
    /// sequential requests. The runner never cuts a fetch off sooner.
    fn request_budget(&self) -> Duration {
        Duration::ZERO
    }

    fn fetch(&self, product_id: &str) -> Result<Series, FetchFailure>;
}

/// Per-run adapter settings.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Request timeout for most providers.
    pub request_timeout: Duration,
    /// CMBC answers slowly and gets a longer timeout.
    pub slow_request_timeout: Duration,
    /// Optional `JSESSIONID` cookie for BOCOM.
    pub bocom_session: Option<String>,
    /// Optional `JSESSIONID` cookie for CITIC.
    pub citic_session: Option<String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            slow_request_timeout: Duration::from_secs(15),
            bocom_session: None,
            citic_session: None,
        }
    }
}

impl SourceSettings {
    /// Defaults plus optional session cookies from the environment (`.env` honoured).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            bocom_session: non_empty_var("BOCOM_SESSION_ID"),
            citic_session: non_empty_var("CITIC_SESSION_ID"),
            ..Self::default()
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
