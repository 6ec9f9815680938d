pub mod account;
pub mod config;
pub mod quota;

pub use account::{AccountCredential, TokenData};
pub use config::{QuotaConfig, UpstreamProxyConfig};
pub use quota::{ModelQuota, QuotaSnapshot, DEFAULT_SUBSCRIPTION_TIER};
