use regex::Regex;
use std::sync::LazyLock;

const FALLBACK_VERSION: &str = env!("CARGO_PKG_VERSION");
const VERSION_ENV: &str = "ANTIGRAVITY_VERSION";

static VERSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+\.\d+").expect("Invalid version regex"));

fn parse_version(text: &str) -> Option<String> {
    VERSION_REGEX.find(text).map(|m| m.as_str().to_string())
}

fn resolve_version(env_value: Option<&str>) -> String {
    env_value
        .and_then(parse_version)
        .unwrap_or_else(|| FALLBACK_VERSION.to_string())
}

fn format_user_agent(version: &str) -> String {
    format!(
        "antigravity/{} {}/{}",
        version,
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Agent string sent on every quota call unless the config overrides it.
pub static USER_AGENT: LazyLock<String> = LazyLock::new(|| {
    let version = resolve_version(std::env::var(VERSION_ENV).ok().as_deref());
    tracing::info!(version = %version, "User-Agent initialized");
    format_user_agent(&version)
});
