//! Configuration module for Faultline.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{ErrorMask, ErrorType, Level};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Faultline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sdk: SdkConfig,
    pub app: AppConfig,
    pub attachments: AttachmentsConfig,
    pub logger: LoggerConfig,
    pub logs: LogsConfig,
    pub frame: FrameConfig,
    pub outbox: OutboxConfig,
}

/// Core SDK settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Project DSN. Empty disables automatic initialization.
    pub dsn: String,
    /// Release name; `{app_name}` and `{app_version}` are expanded from [`AppConfig`].
    pub release: String,
    pub dist: Option<String>,
    /// Environment name. Empty means `production`.
    pub environment: String,
    /// Probability in `[0.0, 1.0]` that an event is sent.
    pub sample_rate: f64,
    pub max_breadcrumbs: usize,
    pub send_default_pii: bool,
    /// Also replace the user name (as a whole word or path component) when
    /// personal data is scrubbed.
    pub strip_usernames: bool,
    /// Initialize the sink as soon as the pipeline is built.
    pub auto_init: bool,
    /// Print internal diagnostics.
    pub debug: bool,
    /// Minimum level of internal diagnostics printed when `debug` is on.
    pub diagnostic_level: Level,
}

/// Application identity used for the release name and the `app` context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
}

/// Files attached to events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentsConfig {
    /// Attach the host log file.
    pub attach_log: bool,
    pub log_path: Option<PathBuf>,
    pub attach_screenshot: bool,
    /// Minimum event level that gets a screenshot.
    pub screenshot_level: Level,
    pub attach_scene_tree: bool,
    /// Directory where screenshot and scene-tree files are written.
    pub dir: PathBuf,
}

/// Error logger integration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub enabled: bool,
    /// Add surrounding source lines to script frames.
    pub include_source: bool,
    /// Add local, member and global variables to script frames.
    pub include_variables: bool,
    /// Record plain log messages as breadcrumbs.
    pub messages_as_breadcrumbs: bool,
    /// Error types captured as events.
    pub event_mask: ErrorMask,
    /// Error types recorded as breadcrumbs.
    pub breadcrumb_mask: ErrorMask,
    /// Log messages starting with any of these prefixes are ignored.
    pub filtered_prefixes: Vec<String>,
    pub limits: LimitsConfig,
}

/// Rate limits applied to error signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum events captured per frame.
    pub events_per_frame: u32,
    /// Identical errors within this window are treated as spam.
    pub repeated_error_window_ms: u64,
    /// Maximum events inside the throttle window.
    pub throttle_events: u32,
    /// Length of the throttle window. Zero disables throttling.
    pub throttle_window_ms: u64,
}

/// Structured logs settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    /// Send structured log records.
    pub enabled: bool,
}

/// Frame ticker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Interval of the background frame ticker, in milliseconds.
    pub tick_interval_ms: u64,
}

/// Local envelope outbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    pub dir: PathBuf,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/faultline/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("faultline")
            .join("config.yaml")
    }

    /// Release name with `{app_name}` and `{app_version}` expanded.
    ///
    /// Returns `None` when the configured release is empty.
    pub fn release(&self) -> Option<String> {
        if self.sdk.release.trim().is_empty() {
            return None;
        }
        Some(
            self.sdk
                .release
                .replace("{app_name}", &self.app.name)
                .replace("{app_version}", &self.app.version),
        )
    }

    /// Configured environment, or `production`.
    pub fn environment(&self) -> String {
        if self.sdk.environment.trim().is_empty() {
            "production".to_string()
        } else {
            self.sdk.environment.clone()
        }
    }

    /// True when the sink should be initialized without an explicit call.
    pub fn auto_init_enabled(&self) -> bool {
        self.sdk.auto_init && !self.sdk.dsn.trim().is_empty()
    }

    /// `tracing` filter directive for the pipeline's own diagnostics.
    pub fn log_filter(&self) -> String {
        if !self.sdk.debug {
            return "faultline=warn".to_string();
        }
        let level = match self.sdk.diagnostic_level {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warn",
            Level::Error | Level::Fatal => "error",
        };
        format!("faultline={level}")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            dsn: String::new(),
            release: "{app_name}@{app_version}".to_string(),
            dist: None,
            environment: String::new(),
            sample_rate: 1.0,
            max_breadcrumbs: 100,
            send_default_pii: false,
            strip_usernames: false,
            auto_init: true,
            debug: false,
            diagnostic_level: Level::Debug,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            version: "0.0.0".to_string(),
        }
    }
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            attach_log: true,
            log_path: None,
            attach_screenshot: false,
            screenshot_level: Level::Fatal,
            attach_scene_tree: false,
            dir: data_dir().join("attachments"),
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include_source: true,
            include_variables: false,
            messages_as_breadcrumbs: true,
            event_mask: ErrorMask::ALL_EXCEPT_WARNING,
            breadcrumb_mask: ErrorMask::ALL,
            filtered_prefixes: vec![INTERNAL_PREFIX.to_string()],
            limits: LimitsConfig::default(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            events_per_frame: 5,
            repeated_error_window_ms: 1000,
            throttle_events: 20,
            throttle_window_ms: 10_000,
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
        }
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            dir: data_dir().join("outbox"),
        }
    }
}

/// Prefix of messages printed by the pipeline itself.
pub const INTERNAL_PREFIX: &str = "faultline: ";

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("faultline")
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sdk.sample_rate"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Upper bound for `sdk.max_breadcrumbs`.
const MAX_BREADCRUMBS_LIMIT: usize = 1000;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sdk ---
        if !self.sdk.dsn.trim().is_empty() {
            if let Err(message) = validate_dsn(&self.sdk.dsn) {
                errors.push(ValidationError {
                    field: "sdk.dsn".into(),
                    message,
                });
            }
        }
        if !(0.0..=1.0).contains(&self.sdk.sample_rate) {
            errors.push(ValidationError {
                field: "sdk.sample_rate".into(),
                message: format!("must be between 0.0 and 1.0, got {}", self.sdk.sample_rate),
            });
        }
        if self.sdk.max_breadcrumbs > MAX_BREADCRUMBS_LIMIT {
            errors.push(ValidationError {
                field: "sdk.max_breadcrumbs".into(),
                message: format!("must be at most {MAX_BREADCRUMBS_LIMIT}"),
            });
        }
        if self
            .release()
            .is_some_and(|r| r.contains('{') || r.contains('}'))
        {
            errors.push(ValidationError {
                field: "sdk.release".into(),
                message: "unknown placeholder; only {app_name} and {app_version} are supported"
                    .into(),
            });
        }

        // --- app ---
        if self.app.name.trim().is_empty() {
            errors.push(ValidationError {
                field: "app.name".into(),
                message: "must not be empty".into(),
            });
        }

        // --- attachments ---
        if (self.attachments.attach_screenshot || self.attachments.attach_scene_tree)
            && self.attachments.dir.as_os_str().is_empty()
        {
            errors.push(ValidationError {
                field: "attachments.dir".into(),
                message: "required when screenshots or scene trees are attached".into(),
            });
        }

        // --- logger ---
        if self
            .logger
            .filtered_prefixes
            .iter()
            .any(|p| p.is_empty())
        {
            errors.push(ValidationError {
                field: "logger.filtered_prefixes".into(),
                message: "prefixes must not be empty".into(),
            });
        }
        let limits = &self.logger.limits;
        if limits.throttle_window_ms > 0 && limits.throttle_events == 0 {
            errors.push(ValidationError {
                field: "logger.limits.throttle_events".into(),
                message: "must be greater than 0 while throttling is enabled".into(),
            });
        }

        // --- frame ---
        if self.frame.tick_interval_ms == 0 {
            errors.push(ValidationError {
                field: "frame.tick_interval_ms".into(),
                message: "must be greater than 0".into(),
            });
        }

        errors
    }
}

/// Checks the shape `https://<public_key>@<host>/<project_id>`.
fn validate_dsn(dsn: &str) -> Result<(), String> {
    let url = url::Url::parse(dsn).map_err(|e| format!("not a valid URL: {e}"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("unsupported scheme: {}", url.scheme()));
    }
    if url.username().is_empty() {
        return Err("missing public key".into());
    }
    if url.host_str().is_none() {
        return Err("missing host".into());
    }
    let project = url.path().trim_matches('/');
    if project.is_empty() {
        return Err("missing project id".into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder initialised with [`Config::default`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sdk ---

    pub fn dsn(mut self, dsn: impl Into<String>) -> Self {
        self.config.sdk.dsn = dsn.into();
        self
    }

    pub fn release(mut self, release: impl Into<String>) -> Self {
        self.config.sdk.release = release.into();
        self
    }

    pub fn dist(mut self, dist: impl Into<String>) -> Self {
        self.config.sdk.dist = Some(dist.into());
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.config.sdk.environment = environment.into();
        self
    }

    pub fn sample_rate(mut self, rate: f64) -> Self {
        self.config.sdk.sample_rate = rate;
        self
    }

    pub fn max_breadcrumbs(mut self, n: usize) -> Self {
        self.config.sdk.max_breadcrumbs = n;
        self
    }

    pub fn send_default_pii(mut self, enabled: bool) -> Self {
        self.config.sdk.send_default_pii = enabled;
        self
    }

    pub fn strip_usernames(mut self, enabled: bool) -> Self {
        self.config.sdk.strip_usernames = enabled;
        self
    }

    pub fn auto_init(mut self, enabled: bool) -> Self {
        self.config.sdk.auto_init = enabled;
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.sdk.debug = enabled;
        self
    }

    pub fn diagnostic_level(mut self, level: Level) -> Self {
        self.config.sdk.diagnostic_level = level;
        self
    }

    // --- app ---

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app.name = name.into();
        self
    }

    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.config.app.version = version.into();
        self
    }

    // --- attachments ---

    pub fn attach_log(mut self, enabled: bool) -> Self {
        self.config.attachments.attach_log = enabled;
        self
    }

    pub fn log_path(mut self, path: PathBuf) -> Self {
        self.config.attachments.log_path = Some(path);
        self
    }

    pub fn attach_screenshot(mut self, enabled: bool) -> Self {
        self.config.attachments.attach_screenshot = enabled;
        self
    }

    pub fn screenshot_level(mut self, level: Level) -> Self {
        self.config.attachments.screenshot_level = level;
        self
    }

    pub fn attach_scene_tree(mut self, enabled: bool) -> Self {
        self.config.attachments.attach_scene_tree = enabled;
        self
    }

    pub fn attachments_dir(mut self, dir: PathBuf) -> Self {
        self.config.attachments.dir = dir;
        self
    }

    // --- logger ---

    pub fn logger_enabled(mut self, enabled: bool) -> Self {
        self.config.logger.enabled = enabled;
        self
    }

    pub fn include_source(mut self, enabled: bool) -> Self {
        self.config.logger.include_source = enabled;
        self
    }

    pub fn include_variables(mut self, enabled: bool) -> Self {
        self.config.logger.include_variables = enabled;
        self
    }

    pub fn messages_as_breadcrumbs(mut self, enabled: bool) -> Self {
        self.config.logger.messages_as_breadcrumbs = enabled;
        self
    }

    pub fn event_mask(mut self, mask: ErrorMask) -> Self {
        self.config.logger.event_mask = mask;
        self
    }

    pub fn breadcrumb_mask(mut self, mask: ErrorMask) -> Self {
        self.config.logger.breadcrumb_mask = mask;
        self
    }

    /// Adds `error_type` to both capture masks.
    pub fn capture_error_type(mut self, error_type: ErrorType) -> Self {
        self.config.logger.event_mask = self.config.logger.event_mask | error_type;
        self.config.logger.breadcrumb_mask = self.config.logger.breadcrumb_mask | error_type;
        self
    }

    pub fn filtered_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.config.logger.filtered_prefixes = prefixes;
        self
    }

    pub fn limits(mut self, limits: LimitsConfig) -> Self {
        self.config.logger.limits = limits;
        self
    }

    pub fn events_per_frame(mut self, n: u32) -> Self {
        self.config.logger.limits.events_per_frame = n;
        self
    }

    pub fn repeated_error_window_ms(mut self, ms: u64) -> Self {
        self.config.logger.limits.repeated_error_window_ms = ms;
        self
    }

    pub fn throttle_events(mut self, n: u32) -> Self {
        self.config.logger.limits.throttle_events = n;
        self
    }

    pub fn throttle_window_ms(mut self, ms: u64) -> Self {
        self.config.logger.limits.throttle_window_ms = ms;
        self
    }

    // --- logs / frame / outbox ---

    pub fn logs_enabled(mut self, enabled: bool) -> Self {
        self.config.logs.enabled = enabled;
        self
    }

    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.frame.tick_interval_ms = ms;
        self
    }

    pub fn outbox_dir(mut self, dir: PathBuf) -> Self {
        self.config.outbox.dir = dir;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert!(cfg.sdk.dsn.is_empty());
        assert_eq!(cfg.sdk.sample_rate, 1.0);
        assert_eq!(cfg.sdk.max_breadcrumbs, 100);
        assert!(!cfg.sdk.send_default_pii);
        assert!(!cfg.sdk.strip_usernames);
        assert_eq!(cfg.sdk.diagnostic_level, Level::Debug);
        assert!(cfg.attachments.attach_log);
        assert_eq!(cfg.attachments.screenshot_level, Level::Fatal);
        assert!(cfg.logger.enabled);
        assert_eq!(cfg.logger.event_mask, ErrorMask::ALL_EXCEPT_WARNING);
        assert_eq!(cfg.logger.breadcrumb_mask, ErrorMask::ALL);
        assert_eq!(cfg.logger.filtered_prefixes, vec!["faultline: ".to_string()]);
        assert_eq!(cfg.logger.limits.events_per_frame, 5);
        assert_eq!(cfg.logger.limits.repeated_error_window_ms, 1000);
        assert_eq!(cfg.logger.limits.throttle_events, 20);
        assert_eq!(cfg.logger.limits.throttle_window_ms, 10_000);
        assert!(!cfg.logs.enabled);
        assert_eq!(cfg.frame.tick_interval_ms, 16);
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    #[test]
    fn release_template_is_expanded() {
        let cfg = ConfigBuilder::new()
            .app_name("space-miner")
            .app_version("1.4.2")
            .build();
        assert_eq!(cfg.release().as_deref(), Some("space-miner@1.4.2"));

        let cfg = ConfigBuilder::new().release("").build();
        assert!(cfg.release().is_none());
    }

    #[test]
    fn environment_defaults_to_production() {
        assert_eq!(Config::default().environment(), "production");
        let cfg = ConfigBuilder::new().environment("staging").build();
        assert_eq!(cfg.environment(), "staging");
    }

    #[test]
    fn auto_init_requires_dsn() {
        assert!(!Config::default().auto_init_enabled());
        let cfg = ConfigBuilder::new()
            .dsn("https://key@o1.ingest.example.com/42")
            .build();
        assert!(cfg.auto_init_enabled());
        let cfg = ConfigBuilder::new()
            .dsn("https://key@o1.ingest.example.com/42")
            .auto_init(false)
            .build();
        assert!(!cfg.auto_init_enabled());
    }

    #[test]
    fn log_filter_follows_debug_options() {
        assert_eq!(Config::default().log_filter(), "faultline=warn");
        let cfg = ConfigBuilder::new()
            .debug(true)
            .diagnostic_level(Level::Info)
            .build();
        assert_eq!(cfg.log_filter(), "faultline=info");
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
sdk:
  dsn: "https://abc@o1.ingest.example.com/7"
  release: "{app_name}-{app_version}"
  environment: staging
  sample_rate: 0.5
  max_breadcrumbs: 50
  debug: true
  diagnostic_level: warning
app:
  name: demo
  version: "2.0"
attachments:
  attach_screenshot: true
  screenshot_level: error
  dir: /tmp/faultline-attachments
logger:
  include_variables: true
  event_mask: [error, script]
  breadcrumb_mask: [error]
  limits:
    events_per_frame: 3
    throttle_window_ms: 0
logs:
  enabled: true
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.sdk.dsn, "https://abc@o1.ingest.example.com/7");
        assert_eq!(cfg.release().as_deref(), Some("demo-2.0"));
        assert_eq!(cfg.environment(), "staging");
        assert_eq!(cfg.sdk.sample_rate, 0.5);
        assert_eq!(cfg.sdk.max_breadcrumbs, 50);
        assert_eq!(cfg.sdk.diagnostic_level, Level::Warning);
        assert!(cfg.attachments.attach_screenshot);
        assert_eq!(cfg.attachments.screenshot_level, Level::Error);
        assert_eq!(cfg.attachments.dir, PathBuf::from("/tmp/faultline-attachments"));
        assert!(cfg.logger.include_variables);
        assert!(cfg.logger.event_mask.allows(ErrorType::Script));
        assert!(!cfg.logger.event_mask.allows(ErrorType::Shader));
        assert!(!cfg.logger.breadcrumb_mask.allows(ErrorType::Warning));
        assert_eq!(cfg.logger.limits.events_per_frame, 3);
        assert_eq!(cfg.logger.limits.throttle_window_ms, 0);
        // Unspecified fields keep their defaults
        assert_eq!(cfg.logger.limits.throttle_events, 20);
        assert!(cfg.logger.enabled);
        assert!(cfg.logs.enabled);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn load_rejects_unknown_error_type() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"logger:\n  event_mask: [error, linker]\n")
            .unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    // -- Validation --

    #[test]
    fn validate_catches_bad_dsn() {
        for dsn in [
            "not a url",
            "ftp://key@host/1",
            "https://o1.ingest.example.com/1",
            "https://key@o1.ingest.example.com/",
        ] {
            let cfg = ConfigBuilder::new().dsn(dsn).build();
            let errors = cfg.validate();
            assert!(
                errors.iter().any(|e| e.field == "sdk.dsn"),
                "expected DSN error for {dsn}"
            );
        }
    }

    #[test]
    fn validate_catches_sample_rate_out_of_range() {
        let cfg = ConfigBuilder::new().sample_rate(1.5).build();
        assert!(cfg.validate().iter().any(|e| e.field == "sdk.sample_rate"));
        let cfg = ConfigBuilder::new().sample_rate(-0.1).build();
        assert!(cfg.validate().iter().any(|e| e.field == "sdk.sample_rate"));
    }

    #[test]
    fn validate_catches_too_many_breadcrumbs() {
        let cfg = ConfigBuilder::new().max_breadcrumbs(5000).build();
        assert!(cfg.validate().iter().any(|e| e.field == "sdk.max_breadcrumbs"));
    }

    #[test]
    fn validate_catches_unknown_release_placeholder() {
        let cfg = ConfigBuilder::new().release("{app_name}@{build}").build();
        assert!(cfg.validate().iter().any(|e| e.field == "sdk.release"));
    }

    #[test]
    fn validate_catches_zero_throttle_events() {
        let cfg = ConfigBuilder::new().throttle_events(0).build();
        assert!(cfg
            .validate()
            .iter()
            .any(|e| e.field == "logger.limits.throttle_events"));

        // Fine when throttling is disabled
        let cfg = ConfigBuilder::new()
            .throttle_events(0)
            .throttle_window_ms(0)
            .build();
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validate_catches_empty_prefix_and_zero_tick() {
        let cfg = ConfigBuilder::new()
            .filtered_prefixes(vec![String::new()])
            .tick_interval_ms(0)
            .build();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "logger.filtered_prefixes"));
        assert!(errors.iter().any(|e| e.field == "frame.tick_interval_ms"));
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "sdk.sample_rate".into(),
            message: "must be between 0.0 and 1.0".into(),
        };
        assert_eq!(err.to_string(), "sdk.sample_rate: must be between 0.0 and 1.0");
    }

    // -- Builder --

    #[test]
    fn builder_starts_from_defaults() {
        assert_eq!(ConfigBuilder::new().build(), Config::default());
    }

    #[test]
    fn builder_capture_error_type_extends_masks() {
        let cfg = ConfigBuilder::new()
            .event_mask(ErrorMask::NONE)
            .breadcrumb_mask(ErrorMask::NONE)
            .capture_error_type(ErrorType::Warning)
            .build();
        assert!(cfg.logger.event_mask.allows(ErrorType::Warning));
        assert!(cfg.logger.breadcrumb_mask.allows(ErrorType::Warning));
        assert!(!cfg.logger.event_mask.allows(ErrorType::Error));
    }

    #[test]
    fn builder_build_validated_fails_for_invalid_config() {
        let result = ConfigBuilder::new().sample_rate(2.0).build_validated();
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "sdk.sample_rate");
    }

    #[test]
    fn builder_build_validated_succeeds_for_valid_config() {
        let cfg = ConfigBuilder::new()
            .dsn("https://key@o1.ingest.example.com/42")
            .sample_rate(0.25)
            .build_validated()
            .expect("valid config");
        assert_eq!(cfg.sdk.sample_rate, 0.25);
    }
}
