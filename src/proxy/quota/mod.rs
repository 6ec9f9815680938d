pub mod cache;
pub mod resolver;
pub mod service;
pub mod upstream;

pub use cache::QuotaCache;
pub use resolver::QuotaResolver;
pub use service::{build_resolver, DefaultQuotaResolver, QuotaService};
pub use upstream::{AccountIdentity, QuotaUpstreamClient};
