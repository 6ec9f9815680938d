pub mod endpoints;

pub use endpoints::{BaseUrlResolver, ConfiguredBaseUrls};
