//! API token lookup.
//!
//! Sources are tried in priority order: settings, environment, token file.

use std::path::Path;

/// Environment variable holding the SignalFx access token.
pub const TOKEN_ENV_VAR: &str = "SIGNALFX_TOKEN";

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Config,
    Environment,
    File,
}

/// Return the first non-empty token among the three sources.
///
/// The file is only read when neither of the first two sources yields a
/// token. An unreadable file counts as absent.
pub fn resolve_token(
    from_config: Option<&str>,
    from_env: Option<&str>,
    token_file: Option<&Path>,
) -> Option<(String, TokenSource)> {
    if let Some(token) = non_empty(from_config) {
        tracing::info!("token found in config");
        return Some((token, TokenSource::Config));
    }
    tracing::info!("token not found in config");

    if let Some(token) = non_empty(from_env) {
        tracing::info!("token found in {} environment variable", TOKEN_ENV_VAR);
        return Some((token, TokenSource::Environment));
    }
    tracing::info!("token not found in {} environment variable", TOKEN_ENV_VAR);

    let Some(path) = token_file.filter(|p| !p.as_os_str().is_empty()) else {
        tracing::info!("token-file is not set");
        return None;
    };

    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let token = non_empty(Some(&contents));
            if token.is_some() {
                tracing::info!("token found in file {}", path.display());
            } else {
                tracing::info!("token file {} is empty", path.display());
            }
            token.map(|t| (t, TokenSource::File))
        }
        Err(e) => {
            tracing::info!(
                "token can't be read from file {}: {}, check path or access",
                path.display(),
                e
            );
            None
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::io::Write;

    fn token_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_config_wins() {
        let file = token_file("from-file");
        let resolved = resolve_token(Some("from-config"), Some("from-env"), Some(file.path()));
        assert_eq!(resolved, Some(("from-config".to_string(), TokenSource::Config)));
    }

    #[test]
    fn test_env_before_file() {
        let file = token_file("from-file");
        let resolved = resolve_token(None, Some("from-env"), Some(file.path()));
        assert_eq!(resolved, Some(("from-env".to_string(), TokenSource::Environment)));
    }

    #[test]
    fn test_empty_config_falls_through() {
        let resolved = resolve_token(Some(""), Some("from-env"), None);
        assert_eq!(resolved.map(|(_, s)| s), Some(TokenSource::Environment));
    }

    #[test]
    fn test_file_is_trimmed() {
        let file = token_file("  secret-token\n");
        let resolved = resolve_token(None, None, Some(file.path()));
        assert_eq!(resolved, Some(("secret-token".to_string(), TokenSource::File)));
    }

    #[test]
    fn test_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        assert_eq!(resolve_token(None, None, Some(&missing)), None);
    }

    #[test]
    fn test_empty_file_is_absent() {
        let file = token_file("\n");
        assert_eq!(resolve_token(None, None, Some(file.path())), None);
    }

    #[test]
    fn test_nothing_configured() {
        assert_eq!(resolve_token(None, None, None), None);
        assert_eq!(resolve_token(None, None, Some(Path::new(""))), None);
    }
}
