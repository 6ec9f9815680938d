use crate::models::AccountCredential;

/// Ordered candidate upstream base URLs for an account.
pub trait BaseUrlResolver: Send + Sync {
    fn fallback_order(&self, credential: &AccountCredential) -> Vec<String>;
}

/// Account override first, then the configured hosts (Sandbox, Daily, Prod by default).
#[derive(Debug, Clone)]
pub struct ConfiguredBaseUrls {
    base_urls: Vec<String>,
}

impl ConfiguredBaseUrls {
    pub fn new(base_urls: Vec<String>) -> Self {
        Self { base_urls }
    }
}

impl BaseUrlResolver for ConfiguredBaseUrls {
    fn fallback_order(&self, credential: &AccountCredential) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.base_urls.len() + 1);
        for raw in credential.base_url.iter().chain(self.base_urls.iter()) {
            let url = raw.trim().trim_end_matches('/');
            if url.is_empty() || out.iter().any(|existing| existing == url) {
                continue;
            }
            out.push(url.to_string());
        }
        out
    }
}
