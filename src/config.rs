use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use url::Url;

use crate::content::{DEFAULT_TRACK_ALIAS, FIRST_LESSON_ALIAS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub auth_endpoint: Url,
    pub state_dir: PathBuf,
    pub default_track: String,
    pub first_lesson: String,
    pub last_updated: String,
    pub scroll_throttle: Duration,
}

impl ShellConfig {
    pub fn default_auth_endpoint() -> &'static str {
        "http://localhost:8787/auth"
    }
    pub fn default_state_dir() -> PathBuf {
        PathBuf::from(".learnshell")
    }
    pub fn default_scroll_throttle() -> Duration {
        Duration::from_millis(100)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let raw_endpoint = get("LEARNSHELL_AUTH_ENDPOINT")
            .unwrap_or_else(|| Self::default_auth_endpoint().to_owned());
        let auth_endpoint = parse_endpoint(&raw_endpoint)
            .with_context(|| format!("invalid LEARNSHELL_AUTH_ENDPOINT={raw_endpoint:?}"))?;

        Ok(Self {
            auth_endpoint,
            state_dir: get("LEARNSHELL_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(Self::default_state_dir),
            default_track: get("LEARNSHELL_DEFAULT_TRACK")
                .unwrap_or_else(|| DEFAULT_TRACK_ALIAS.to_owned()),
            first_lesson: get("LEARNSHELL_FIRST_LESSON")
                .unwrap_or_else(|| FIRST_LESSON_ALIAS.to_owned()),
            last_updated: get("LEARNSHELL_LAST_UPDATED").unwrap_or_default(),
            scroll_throttle: Self::default_scroll_throttle(),
        })
    }
}

pub fn parse_endpoint(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).context("parse url")?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => anyhow::bail!("unsupported endpoint scheme: {other}"),
    }
}
