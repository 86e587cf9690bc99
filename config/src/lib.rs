//! Configuration loading for delve.
//!
//! Every section and field is optional; command-line flags override whatever
//! is loaded here.
//!
//! ```toml
//! [engine]
//! concurrency = 100
//! delimiters = ["", "0", "1", "2", "3", "-", "_"]
//! dedupe = false
//!
//! [probe]
//! nameserver = "1.1.1.1:53"
//! http = true
//! http_timeout_seconds = 10
//!
//! [output]
//! directory = "${HOME}/delve"
//! ```

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use delve_types::{Delimiters, ExploreSettings, TypeError};
use serde::Deserialize;
use thiserror::Error;

// Default value function for serde (bool::default() is false, so only true needs a fn)
pub(crate) const fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct DelveConfig {
    pub engine: Option<EngineConfig>,
    pub probe: Option<ProbeConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid engine settings: {0}")]
    Invalid(#[from] TypeError),
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid(_) => None,
        }
    }
}

/// Explorer knobs.
///
/// ```toml
/// [engine]
/// concurrency = 100
/// delimiters = ["", "-"]
/// dedupe = true
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct EngineConfig {
    /// Maximum probes in flight. Default: 100.
    pub concurrency: Option<usize>,
    /// Delimiters joining two words into one label.
    pub delimiters: Option<Delimiters>,
    /// Skip candidates that were already queued once. Default: false.
    #[serde(default)]
    pub dedupe: bool,
}

/// DNS and HTTP probe settings.
#[derive(Debug, Deserialize)]
pub struct ProbeConfig {
    /// `ip` or `ip:port`. Defaults to the first resolv.conf nameserver.
    pub nameserver: Option<String>,
    pub dns_timeout_ms: Option<u64>,
    /// Fetch `http://<name>/` for names that resolve. Default: true.
    #[serde(default = "default_true")]
    pub http: bool,
    pub http_timeout_seconds: Option<u64>,
    pub http_port: Option<u16>,
    pub max_redirects: Option<usize>,
    pub user_agent: Option<String>,
    pub max_body_bytes: Option<usize>,
    /// Capture TXT records. Default: true.
    #[serde(default = "default_true")]
    pub txt: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            nameserver: None,
            dns_timeout_ms: None,
            http: true,
            http_timeout_seconds: None,
            http_port: None,
            max_redirects: None,
            user_agent: None,
            max_body_bytes: None,
            txt: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Directory for result files. `${VAR}` references are expanded.
    pub directory: Option<String>,
}

/// Replace `${VAR}` with the environment value (empty when unset).
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl DelveConfig {
    /// Load `~/.delve/config.toml`. A missing file is not an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    /// Load an explicitly named config file. A missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Resolve the `[engine]` section over the built-in defaults.
    pub fn explore_settings(&self) -> Result<ExploreSettings, ConfigError> {
        let mut settings = ExploreSettings::default();
        let Some(engine) = self.engine.as_ref() else {
            return Ok(settings);
        };
        if let Some(concurrency) = engine.concurrency {
            settings = settings.with_concurrency(concurrency)?;
        }
        if let Some(delimiters) = engine.delimiters.clone() {
            settings.delimiters = delimiters;
        }
        settings.dedupe = engine.dedupe;
        Ok(settings)
    }

    #[must_use]
    pub fn output_directory(&self) -> Option<PathBuf> {
        self.output
            .as_ref()
            .and_then(|output| output.directory.as_deref())
            .map(|raw| PathBuf::from(expand_env_vars(raw)))
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".delve").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // expand_env_vars tests

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("/tmp/scans"), "/tmp/scans");
    }

    #[test]
    fn expand_env_vars_single_var() {
        unsafe {
            env::set_var("DELVE_TEST_SCAN_ROOT", "/data");
        }
        assert_eq!(expand_env_vars("${DELVE_TEST_SCAN_ROOT}/scans"), "/data/scans");
        unsafe {
            env::remove_var("DELVE_TEST_SCAN_ROOT");
        }
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        unsafe {
            env::remove_var("DELVE_MISSING_VAR_FOR_TEST");
        }
        assert_eq!(
            expand_env_vars("before ${DELVE_MISSING_VAR_FOR_TEST} after"),
            "before  after"
        );
    }

    #[test]
    fn expand_env_vars_unclosed_brace_preserved() {
        assert_eq!(expand_env_vars("out/${UNCLOSED"), "out/${UNCLOSED");
    }

    #[test]
    fn expand_env_vars_empty_var_name_removed() {
        assert_eq!(expand_env_vars("a${}b"), "ab");
    }

    // DelveConfig parsing tests

    #[test]
    fn parse_empty_config() {
        let config: DelveConfig = toml::from_str("").unwrap();
        assert!(config.engine.is_none());
        assert!(config.probe.is_none());
        assert!(config.output.is_none());
        assert_eq!(config.explore_settings().unwrap(), ExploreSettings::default());
    }

    #[test]
    fn parse_engine_config() {
        let toml_str = r#"
[engine]
concurrency = 8
delimiters = ["", "-"]
dedupe = true
"#;
        let config: DelveConfig = toml::from_str(toml_str).unwrap();
        let settings = config.explore_settings().unwrap();
        assert_eq!(settings.concurrency.get(), 8);
        assert_eq!(settings.delimiters.iter().collect::<Vec<_>>(), ["", "-"]);
        assert!(settings.dedupe);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config: DelveConfig = toml::from_str("[engine]\nconcurrency = 0\n").unwrap();
        let err = config.explore_settings().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(TypeError::ZeroConcurrency)));
        assert!(err.path().is_none());
    }

    #[test]
    fn empty_delimiters_fail_to_parse() {
        let result = toml::from_str::<DelveConfig>("[engine]\ndelimiters = []\n");
        assert!(result.is_err());
    }

    #[test]
    fn parse_probe_config_defaults() {
        let config: DelveConfig = toml::from_str("[probe]\nnameserver = \"9.9.9.9\"\n").unwrap();
        let probe = config.probe.unwrap();
        assert_eq!(probe.nameserver.as_deref(), Some("9.9.9.9"));
        assert!(probe.http);
        assert!(probe.txt);
        assert!(probe.http_timeout_seconds.is_none());
    }

    #[test]
    fn parse_probe_config_overrides() {
        let toml_str = r#"
[probe]
http = false
txt = false
dns_timeout_ms = 500
http_port = 8080
max_body_bytes = 4096
user_agent = "scanner/1.0"
"#;
        let config: DelveConfig = toml::from_str(toml_str).unwrap();
        let probe = config.probe.unwrap();
        assert!(!probe.http);
        assert!(!probe.txt);
        assert_eq!(probe.dns_timeout_ms, Some(500));
        assert_eq!(probe.http_port, Some(8080));
        assert_eq!(probe.max_body_bytes, Some(4096));
        assert_eq!(probe.user_agent.as_deref(), Some("scanner/1.0"));
    }

    #[test]
    fn output_directory_expands_env() {
        unsafe {
            env::set_var("DELVE_TEST_OUT", "/srv");
        }
        let config: DelveConfig =
            toml::from_str("[output]\ndirectory = \"${DELVE_TEST_OUT}/found\"\n").unwrap();
        assert_eq!(config.output_directory(), Some(PathBuf::from("/srv/found")));
        unsafe {
            env::remove_var("DELVE_TEST_OUT");
        }
    }

    #[test]
    fn load_from_reports_parse_error_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[engine\nconcurrency = ").expect("write");

        let err = DelveConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), Some(&path));
    }

    #[test]
    fn load_from_missing_file_is_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.toml");
        let err = DelveConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_from_reads_valid_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[engine]\nconcurrency = 3\n").expect("write");

        let config = DelveConfig::load_from(&path).unwrap();
        assert_eq!(config.explore_settings().unwrap().concurrency.get(), 3);
    }
}
