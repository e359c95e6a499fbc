use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::UploadError;

pub const DEFAULT_ADDRESS: &str = "https://myrealm.signalfx.com";
pub const DEFAULT_DATA_ADDRESS: &str = "https://ingest.eu0.signalfx.com/";
pub const DEFAULT_DASHBOARD_URL: &str = "https://<REALM>.signalfx.com/#/dashboard/<ID>";

/// When to open the dashboard link in a browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserOpen {
    #[default]
    Start,
    End,
    Both,
    Never,
}

impl BrowserOpen {
    /// Anything other than `start`, `end` or `both` disables opening.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "start" => Self::Start,
            "end" => Self::End,
            "both" => Self::Both,
            _ => Self::Never,
        }
    }

    pub fn at_start(&self) -> bool {
        matches!(self, Self::Start | Self::Both)
    }

    pub fn at_end(&self) -> bool {
        matches!(self, Self::End | Self::Both)
    }
}

impl<'de> Deserialize<'de> for BrowserOpen {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(s) => Self::from_str(&s),
            _ => Self::Never,
        })
    }
}

/// Uploader settings, as found under the reporter's section of the host
/// configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    pub token: Option<String>,
    pub token_file: Option<PathBuf>,
    pub address: String,
    pub data_address: String,
    pub dashboard_url: String,
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub send_interval: Duration,
    pub project: String,
    #[serde(deserialize_with = "deserialize_tags")]
    pub custom_tags: BTreeMap<String, String>,
    pub report_times_multiplier: f64,
    pub browser_open: BrowserOpen,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: None,
            token_file: None,
            address: DEFAULT_ADDRESS.to_string(),
            data_address: DEFAULT_DATA_ADDRESS.to_string(),
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            timeout: Duration::from_secs(30),
            send_interval: Duration::from_secs(30),
            project: "myproject".to_string(),
            custom_tags: BTreeMap::new(),
            report_times_multiplier: 1000.0,
            browser_open: BrowserOpen::Start,
            debug: false,
        }
    }
}

impl Settings {
    /// Read settings from a host-supplied JSON object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, UploadError> {
        let settings: Settings = serde_json::from_value(value)
            .map_err(|e| UploadError::Config(format!("invalid uploader settings: {}", e)))?;
        Ok(settings.normalized())
    }

    /// Strip trailing slashes from the configured URLs.
    pub fn normalized(mut self) -> Self {
        for url in [&mut self.address, &mut self.data_address, &mut self.dashboard_url] {
            let trimmed = url.trim_end_matches('/').len();
            url.truncate(trimmed);
        }
        self
    }
}

fn deserialize_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .filter(|secs| *secs >= 0.0)
            .map(Duration::from_secs_f64)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration: {}", n))),
        serde_json::Value::String(s) => parse_duration(s).map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!("invalid duration: {}", other))),
    }
}

/// Tag values may be any JSON scalar; numbers and booleans become strings.
fn deserialize_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error> {
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => Ok((key, s)),
            serde_json::Value::Number(n) => Ok((key, n.to_string())),
            serde_json::Value::Bool(b) => Ok((key, b.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "invalid value for tag '{}': {}",
                key, other
            ))),
        })
        .collect()
}

/// Parse a human-friendly duration such as `30`, `"1m30s"` or `"500ms"`.
///
/// A bare number is seconds. Supported units: `ms`, `s`, `m`, `h`, `d`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim().to_lowercase();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(secs) = s.parse::<f64>() {
        if secs < 0.0 || !secs.is_finite() {
            return Err(format!("invalid duration: {}", input));
        }
        return Ok(Duration::from_secs_f64(secs));
    }

    let mut total = 0.0_f64;
    let mut rest = s.as_str();
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(format!("invalid duration: {}", input));
        }
        let number: f64 = rest[..num_len]
            .parse()
            .map_err(|_| format!("invalid duration: {}", input))?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let factor = match &rest[..unit_len] {
            "ms" => 0.001,
            "s" | "" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "d" => 86400.0,
            unit => return Err(format!("unknown duration unit '{}' in {}", unit, input)),
        };
        rest = &rest[unit_len..];
        total += number * factor;
    }

    Ok(Duration::from_secs_f64(total))
}

/// Load settings from `SIGNALFX_*` environment variables.
///
/// `SIGNALFX_TOKEN` is deliberately not read here: it is the second token
/// source, consulted only when the settings carry no token.
pub fn load_config() -> anyhow::Result<Settings> {
    let defaults = Settings::default();

    let token_file = std::env::var("SIGNALFX_TOKEN_FILE").ok().map(PathBuf::from);

    let address = std::env::var("SIGNALFX_ADDRESS").unwrap_or(defaults.address);

    let data_address = std::env::var("SIGNALFX_DATA_ADDRESS").unwrap_or(defaults.data_address);

    let dashboard_url = std::env::var("SIGNALFX_DASHBOARD_URL").unwrap_or(defaults.dashboard_url);

    let timeout = std::env::var("SIGNALFX_TIMEOUT")
        .ok()
        .and_then(|v| parse_duration(&v).ok())
        .unwrap_or(defaults.timeout);

    let send_interval = std::env::var("SIGNALFX_SEND_INTERVAL")
        .ok()
        .and_then(|v| parse_duration(&v).ok())
        .unwrap_or(defaults.send_interval);

    let project = std::env::var("SIGNALFX_PROJECT").unwrap_or(defaults.project);

    // k=v,k=v
    let custom_tags = std::env::var("SIGNALFX_CUSTOM_TAGS")
        .map(|v| {
            v.split(',')
                .filter_map(|pair| pair.split_once('='))
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .filter(|(k, _)| !k.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let report_times_multiplier = std::env::var("SIGNALFX_REPORT_TIMES_MULTIPLIER")
        .unwrap_or_else(|_| "1000".to_string())
        .parse()
        .unwrap_or(defaults.report_times_multiplier);

    let browser_open = std::env::var("SIGNALFX_BROWSER_OPEN")
        .map(|v| BrowserOpen::from_str(&v))
        .unwrap_or(defaults.browser_open);

    let debug = std::env::var("DEBUG").is_ok();

    Ok(Settings {
        token: None,
        token_file,
        address,
        data_address,
        dashboard_url,
        timeout,
        send_interval,
        project,
        custom_tags,
        report_times_multiplier,
        browser_open,
        debug,
    }
    .normalized())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let cfg = Settings::default();
        assert_eq!(cfg.address, "https://myrealm.signalfx.com");
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.send_interval, Duration::from_secs(30));
        assert_eq!(cfg.project, "myproject");
        assert_eq!(cfg.report_times_multiplier, 1000.0);
        assert_eq!(cfg.browser_open, BrowserOpen::Start);
        assert!(cfg.token.is_none());
    }

    #[test]
    fn test_from_value_kebab_case() {
        let cfg = Settings::from_value(serde_json::json!({
            "token": "abc",
            "token-file": "/tmp/token",
            "address": "https://api.us1.signalfx.com/",
            "data-address": "https://ingest.us1.signalfx.com/v2/datapoint/",
            "dashboard-url": "https://app.us1.signalfx.com/#/dashboard/XYZ/",
            "timeout": "10s",
            "send-interval": 5,
            "project": "checkout",
            "custom-tags": {"env": "staging"},
            "report-times-multiplier": 1,
            "browser-open": "both"
        }))
        .unwrap();

        assert_eq!(cfg.token.as_deref(), Some("abc"));
        assert_eq!(cfg.token_file, Some(PathBuf::from("/tmp/token")));
        assert_eq!(cfg.address, "https://api.us1.signalfx.com");
        assert_eq!(cfg.data_address, "https://ingest.us1.signalfx.com/v2/datapoint");
        assert_eq!(cfg.dashboard_url, "https://app.us1.signalfx.com/#/dashboard/XYZ");
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert_eq!(cfg.send_interval, Duration::from_secs(5));
        assert_eq!(cfg.project, "checkout");
        assert_eq!(cfg.custom_tags["env"], "staging");
        assert_eq!(cfg.report_times_multiplier, 1.0);
        assert_eq!(cfg.browser_open, BrowserOpen::Both);
    }

    #[test]
    fn test_from_value_partial_uses_defaults() {
        let cfg = Settings::from_value(serde_json::json!({"project": "p"})).unwrap();
        assert_eq!(cfg.project, "p");
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.data_address, "https://ingest.eu0.signalfx.com");
    }

    #[test]
    fn test_from_value_stringifies_scalar_tags() {
        let cfg = Settings::from_value(serde_json::json!({
            "custom-tags": {"build": 42, "canary": true, "ratio": 0.5, "env": "prod"}
        }))
        .unwrap();

        assert_eq!(cfg.custom_tags["build"], "42");
        assert_eq!(cfg.custom_tags["canary"], "true");
        assert_eq!(cfg.custom_tags["ratio"], "0.5");
        assert_eq!(cfg.custom_tags["env"], "prod");
    }

    #[test]
    fn test_from_value_rejects_nested_tag() {
        let result = Settings::from_value(serde_json::json!({"custom-tags": {"team": ["a", "b"]}}));
        assert!(matches!(result, Err(UploadError::Config(_))));
    }

    #[test]
    fn test_from_value_rejects_bad_duration() {
        let result = Settings::from_value(serde_json::json!({"timeout": "soon"}));
        assert!(matches!(result, Err(UploadError::Config(_))));
    }

    #[test]
    fn test_browser_open_modes() {
        assert_eq!(BrowserOpen::from_str("start"), BrowserOpen::Start);
        assert_eq!(BrowserOpen::from_str("END"), BrowserOpen::End);
        assert_eq!(BrowserOpen::from_str("both"), BrowserOpen::Both);
        assert_eq!(BrowserOpen::from_str("none"), BrowserOpen::Never);
        assert_eq!(BrowserOpen::from_str(""), BrowserOpen::Never);

        assert!(BrowserOpen::Both.at_start() && BrowserOpen::Both.at_end());
        assert!(BrowserOpen::Start.at_start() && !BrowserOpen::Start.at_end());
        assert!(!BrowserOpen::Never.at_start() && !BrowserOpen::Never.at_end());
    }

    #[test]
    fn test_browser_open_non_string_disables() {
        let cfg = Settings::from_value(serde_json::json!({"browser-open": false})).unwrap();
        assert_eq!(cfg.browser_open, BrowserOpen::Never);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("2.5").unwrap(), Duration::from_millis(2500));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration(" 10S ").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-5").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10w").is_err());
    }

    #[test]
    fn test_load_config_with_custom_settings() {
        std::env::set_var("SIGNALFX_PROJECT", "env-project");
        std::env::set_var("SIGNALFX_SEND_INTERVAL", "1m");
        std::env::set_var("SIGNALFX_CUSTOM_TAGS", "env=ci, team = perf,broken");
        std::env::set_var("SIGNALFX_DATA_ADDRESS", "http://localhost:9999/");
        std::env::set_var("SIGNALFX_REPORT_TIMES_MULTIPLIER", "not_a_number");

        let cfg = load_config().unwrap();
        assert_eq!(cfg.project, "env-project");
        assert_eq!(cfg.send_interval, Duration::from_secs(60));
        assert_eq!(cfg.custom_tags.len(), 2);
        assert_eq!(cfg.custom_tags["team"], "perf");
        assert_eq!(cfg.data_address, "http://localhost:9999");
        assert_eq!(cfg.report_times_multiplier, 1000.0);
        assert!(cfg.token.is_none());

        std::env::remove_var("SIGNALFX_PROJECT");
        std::env::remove_var("SIGNALFX_SEND_INTERVAL");
        std::env::remove_var("SIGNALFX_CUSTOM_TAGS");
        std::env::remove_var("SIGNALFX_DATA_ADDRESS");
        std::env::remove_var("SIGNALFX_REPORT_TIMES_MULTIPLIER");
    }

    #[test]
    fn test_load_config_timeout_parse_error_uses_default() {
        std::env::set_var("SIGNALFX_TIMEOUT", "forever");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        std::env::remove_var("SIGNALFX_TIMEOUT");
    }

    #[test]
    fn test_load_config_browser_open() {
        std::env::set_var("SIGNALFX_BROWSER_OPEN", "end");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.browser_open, BrowserOpen::End);
        std::env::remove_var("SIGNALFX_BROWSER_OPEN");
    }
}
