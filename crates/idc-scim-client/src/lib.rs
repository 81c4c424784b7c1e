//! Provisioning client and reconciliation engine for identity directories
//! that expose a restricted SCIM 2.0 dialect (cursor pagination, `eq`/`and`
//! filters only, PATCH-only group membership, membership hidden from
//! listings).

pub mod auth;
pub mod client;
pub mod config;
pub mod desired;
pub mod error;
pub mod filter;
pub mod membership;
pub mod models;
pub mod outcome;
pub mod pagination;
pub mod reconciler;
pub mod transport;

pub use client::ScimClient;
pub use config::ScimConfig;
pub use desired::{DesiredGroup, DesiredGroups, DesiredUsers};
pub use error::{ConfigError, ProtocolError, ScimClientError, ScimClientResult, ValidationError};
pub use filter::Filter;
pub use outcome::{ChangeDetail, MemberRef, RunOutcome, SyncOutcome};
pub use reconciler::{ReconciliationEngine, SyncMode, SyncOptions};
pub use transport::{HttpTransport, Transport};

/// Build an HTTP client from environment configuration.
///
/// Reads `SCIM_ENDPOINT`, `SCIM_TOKEN` and `SCIM_TIMEOUT_SECS` (a `.env` file
/// is honoured).
pub fn client_from_env() -> ScimClientResult<ScimClient> {
    let config = ScimConfig::from_env()?;
    ScimClient::from_config(&config)
}
