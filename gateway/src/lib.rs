pub mod config;
pub mod discovery;
pub mod error;
pub mod health;
pub mod logging;
pub mod proxy;
pub mod refresh;
pub mod registry;
pub mod rewrite;
pub mod routes;
pub mod state;
pub mod test_util;

pub use config::Config;
pub use discovery::{EndpointDescriptor, EndpointDiscovery};
pub use error::GatewayError;
pub use health::{HealthChecker, HealthReport};
pub use proxy::{ProxyEngine, ProxyRequest};
pub use refresh::{RefreshError, RefreshOutput, Refresher, ScriptRefresher};
pub use registry::{BackendConfig, BackendRecord, BackendRegistry, BackendStatus};
pub use state::AppState;
