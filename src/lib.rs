pub mod constants;
pub mod error;
pub mod models;
pub mod modules;
pub mod proxy;
mod utils;

#[cfg(test)]
mod test_utils;

pub use error::{QuotaError, QuotaResult};
pub use models::{AccountCredential, ModelQuota, QuotaConfig, QuotaSnapshot, TokenData};
pub use proxy::google::{BaseUrlResolver, ConfiguredBaseUrls};
pub use proxy::quota::{
    build_resolver, DefaultQuotaResolver, QuotaCache, QuotaResolver, QuotaService,
    QuotaUpstreamClient,
};
pub use proxy::token::{OAuthTokenProvider, StoredTokenProvider, TokenProvider};

use std::path::Path;

/// Loads configuration from `config_path` (plus environment overrides), sets up
/// logging and starts the quota service with its sweeper.
pub fn start_from_config_file(config_path: &Path) -> QuotaResult<QuotaService> {
    let mut config = modules::system::config::load_config(config_path)?;
    modules::system::config::apply_env_overrides(&mut config);
    modules::system::logger::init_logger(config.log_dir.as_deref().map(Path::new));
    QuotaService::start(&config)
}
