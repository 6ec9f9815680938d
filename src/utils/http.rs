use reqwest::{Client, Proxy};
use std::time::Duration;

use crate::error::{QuotaError, QuotaResult};
use crate::models::QuotaConfig;

#[cfg(not(any(feature = "tls-native", feature = "tls-rustls")))]
compile_error!("one TLS backend feature must be enabled: `tls-native` or `tls-rustls`");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TlsBackendSelection {
    NativeTls,
    Rustls,
}

fn parse_tls_backend(raw: &str) -> Option<TlsBackendSelection> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "native" | "native-tls" | "default-tls" => Some(TlsBackendSelection::NativeTls),
        "rustls" => Some(TlsBackendSelection::Rustls),
        _ => None,
    }
}

fn supports_tls_backend(selection: TlsBackendSelection) -> bool {
    match selection {
        TlsBackendSelection::NativeTls => cfg!(feature = "tls-native"),
        TlsBackendSelection::Rustls => cfg!(feature = "tls-rustls"),
    }
}

fn compiled_default_tls_backend() -> TlsBackendSelection {
    if cfg!(feature = "tls-native") {
        TlsBackendSelection::NativeTls
    } else {
        TlsBackendSelection::Rustls
    }
}

fn selected_tls_backend() -> TlsBackendSelection {
    let requested = std::env::var("TLS_BACKEND")
        .ok()
        .and_then(|raw| parse_tls_backend(&raw));
    if let Some(requested) = requested {
        if supports_tls_backend(requested) {
            return requested;
        }
        tracing::warn!(
            "TLS_BACKEND requested an unavailable backend for this build; falling back to compiled default"
        );
    }
    compiled_default_tls_backend()
}

fn apply_tls_backend(builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
    match selected_tls_backend() {
        TlsBackendSelection::NativeTls => builder,
        TlsBackendSelection::Rustls => {
            #[cfg(feature = "tls-rustls")]
            {
                builder.use_rustls_tls()
            }
            #[cfg(not(feature = "tls-rustls"))]
            {
                builder
            }
        }
    }
}

/// HTTP client for the quota endpoints, honoring the configured timeouts and
/// upstream proxy. An invalid proxy URL is logged and skipped.
pub fn build_client(config: &QuotaConfig) -> QuotaResult<Client> {
    let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
    let mut builder = apply_tls_backend(Client::builder())
        .connect_timeout(timeout.min(Duration::from_secs(20)))
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60));

    let proxy_config = &config.upstream_proxy;
    if proxy_config.enabled && !proxy_config.url.is_empty() {
        match Proxy::all(&proxy_config.url) {
            Ok(proxy) => {
                builder = builder.proxy(proxy);
                tracing::info!("quota client enabled upstream proxy: {}", proxy_config.url);
            }
            Err(e) => {
                tracing::error!("invalid_proxy_url: {}, error: {}", proxy_config.url, e);
            }
        }
    }

    builder
        .build()
        .map_err(|e| QuotaError::Config(format!("failed to build HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UpstreamProxyConfig;
    use crate::test_utils::{lock_env, ScopedEnvVar};

    #[test]
    fn test_parse_tls_backend_aliases() {
        assert_eq!(parse_tls_backend("native"), Some(TlsBackendSelection::NativeTls));
        assert_eq!(parse_tls_backend(" Default-TLS "), Some(TlsBackendSelection::NativeTls));
        assert_eq!(parse_tls_backend("RUSTLS"), Some(TlsBackendSelection::Rustls));
        assert_eq!(parse_tls_backend("openssl"), None);
    }

    #[test]
    fn test_unavailable_backend_falls_back_to_compiled_default() {
        let _guard = lock_env();
        let _tls = ScopedEnvVar::set("TLS_BACKEND", "bogus");
        assert_eq!(selected_tls_backend(), compiled_default_tls_backend());
        assert!(supports_tls_backend(selected_tls_backend()));
    }

    #[test]
    fn test_build_client_ignores_invalid_proxy() {
        let mut config = QuotaConfig::default();
        config.upstream_proxy = UpstreamProxyConfig {
            enabled: true,
            url: "::not a url::".to_string(),
        };
        assert!(build_client(&config).is_ok());
    }
}
