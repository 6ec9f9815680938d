pub mod google;
pub mod quota;
pub mod token;

pub use google::{BaseUrlResolver, ConfiguredBaseUrls};
pub use quota::{QuotaCache, QuotaResolver, QuotaService};
pub use token::{OAuthTokenProvider, StoredTokenProvider, TokenProvider};
