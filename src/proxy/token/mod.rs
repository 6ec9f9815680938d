pub mod provider;

pub use crate::modules::auth::oauth::OAuthTokenProvider;
pub use provider::{StoredTokenProvider, TokenProvider};
