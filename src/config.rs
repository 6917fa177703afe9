use std::env;
use std::time::Duration;

use reqwest::Client;
use tracing::warn;
use url::Url;

use crate::USER_AGENT;
use crate::marketplace::DEFAULT_BASE_URL;
use crate::visual::backend::SurfaceKind;
use crate::visual::{DEFAULT_LENS_URL, PollPolicy};

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout covering DNS + connect + response body.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum redirect hops before aborting.
const MAX_REDIRECTS: usize = 5;

const MARKETPLACE_VAR: &str = "LENSMATCH_MARKETPLACE_URL";
const LENS_VAR: &str = "LENSMATCH_LENS_URL";
const CHROME_VAR: &str = "LENSMATCH_CHROME";

/// Runtime settings.
///
/// Configuration via environment variables:
/// - `LENSMATCH_MARKETPLACE_URL`: catalog origin (default `https://www.daraz.com.bd`)
/// - `LENSMATCH_LENS_URL`: image-search origin (default `https://lens.google.com`)
/// - `LENSMATCH_CHROME`: Chrome/Chromium binary (default: well-known install locations)
#[derive(Debug, Clone)]
pub struct Config {
    pub marketplace_url: String,
    pub lens_url: String,
    pub chrome_path: Option<String>,
    pub surface: SurfaceKind,
    pub poll: PollPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            marketplace_url: origin(&lookup, MARKETPLACE_VAR, DEFAULT_BASE_URL),
            lens_url: origin(&lookup, LENS_VAR, DEFAULT_LENS_URL),
            chrome_path: lookup(CHROME_VAR)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            surface: SurfaceKind::default(),
            poll: PollPolicy::default(),
        }
    }

    pub fn with_surface(mut self, surface: Option<SurfaceKind>) -> Self {
        if let Some(kind) = surface {
            self.surface = kind;
        }
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        if let Some(n) = max_attempts.filter(|n| *n > 0) {
            self.poll.max_attempts = n;
        }
        self
    }
}

fn origin(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    let Some(raw) = lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    else {
        return default.to_string();
    };

    match Url::parse(&raw) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => raw.trim_end_matches('/').to_string(),
        _ => {
            warn!(var = key, value = %raw, "ignoring invalid URL, using default");
            default.to_string()
        }
    }
}

pub fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let c = config(&[]);
        assert_eq!(c.marketplace_url, "https://www.daraz.com.bd");
        assert_eq!(c.lens_url, "https://lens.google.com");
        assert_eq!(c.poll.max_attempts, 25);
        assert_eq!(c.poll.ready_grace, 12);
        assert_eq!(c.chrome_path, None);
        assert_eq!(c.surface, SurfaceKind::Chrome);
    }

    #[test]
    fn chrome_path_and_surface_override() {
        let c = config(&[(CHROME_VAR, " /opt/chromium/chrome ")]);
        assert_eq!(c.chrome_path.as_deref(), Some("/opt/chromium/chrome"));

        let c = config(&[(CHROME_VAR, "  ")]).with_surface(Some(SurfaceKind::Static));
        assert_eq!(c.chrome_path, None);
        assert_eq!(c.surface, SurfaceKind::Static);

        let c = config(&[]).with_surface(None);
        assert_eq!(c.surface, SurfaceKind::Chrome);
    }

    #[test]
    fn overrides_are_trimmed() {
        let c = config(&[
            (MARKETPLACE_VAR, "  http://127.0.0.1:8080/ "),
            (LENS_VAR, "https://lens.example"),
        ]);
        assert_eq!(c.marketplace_url, "http://127.0.0.1:8080");
        assert_eq!(c.lens_url, "https://lens.example");
    }

    #[test]
    fn invalid_or_blank_values_fall_back() {
        let c = config(&[(MARKETPLACE_VAR, "ftp://files.example"), (LENS_VAR, "   ")]);
        assert_eq!(c.marketplace_url, DEFAULT_BASE_URL);
        assert_eq!(c.lens_url, DEFAULT_LENS_URL);

        let c = config(&[(MARKETPLACE_VAR, "not a url")]);
        assert_eq!(c.marketplace_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn max_attempts_override_ignores_zero() {
        let c = config(&[]).with_max_attempts(Some(3));
        assert_eq!(c.poll.max_attempts, 3);

        let c = config(&[]).with_max_attempts(Some(0));
        assert_eq!(c.poll.max_attempts, 25);

        let c = config(&[]).with_max_attempts(None);
        assert_eq!(c.poll.max_attempts, 25);
    }

    #[test]
    fn http_client_builds() {
        assert!(http_client().is_ok());
    }
}
