//! Layered scan configuration (§1.1 / §5 / §6).
//!
//! Three layers, applied in order: compiled-in defaults (this module),
//! an optional TOML file (teacher precedent: the `toml` dependency was
//! already part of the teacher's stack), then CLI flag overrides applied
//! by `cli::Cli::into_overrides`. Each layer only overwrites fields it
//! actually sets.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Runtime knobs for one scan. Cheap to clone; handed by value to the
/// executor and transport.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Global in-flight request cap (§4.5).
    pub global_concurrency: usize,
    /// Default minimum interval between requests to the same host (§4.3).
    pub default_host_interval: Duration,
    /// Per-host overrides, keyed by host (e.g. rate-sensitive APIs).
    pub host_interval_overrides: HashMap<String, Duration>,
    /// Per-request deadline (§4.2).
    pub request_timeout: Duration,
    /// Maximum redirects the transport follows (§4.2).
    pub max_redirects: u8,
    /// Retries for transient transport errors (§4.5).
    pub max_retries: u8,
    /// Backoff base/cap for retries (§4.5: 100ms -> 400ms).
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Per-scan deadline; quick and deep have distinct defaults (§5).
    pub scan_deadline_quick: Duration,
    pub scan_deadline_deep: Duration,
    /// Per-scan seed for the UA rotation sequence (§4.2). `None` means
    /// derive one from the identifier being scanned.
    pub ua_seed: Option<u64>,
    /// Excluded categories (§6 `--exclude-category`, repeatable).
    pub exclude_categories: Vec<String>,
    /// Exclude NSFW-flagged probes (§6 `--no-nsfw`).
    pub exclude_nsfw: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            global_concurrency: 50,
            default_host_interval: Duration::from_millis(100),
            host_interval_overrides: HashMap::new(),
            request_timeout: Duration::from_secs(15),
            max_redirects: 5,
            max_retries: 2,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_millis(400),
            scan_deadline_quick: Duration::from_secs(180),
            scan_deadline_deep: Duration::from_secs(600),
            ua_seed: None,
            exclude_categories: Vec::new(),
            exclude_nsfw: false,
        }
    }
}

impl ScanConfig {
    /// The per-scan deadline for a given mode (§5).
    pub fn scan_deadline(&self, mode: crate::registry::ScanMode) -> Duration {
        match mode {
            crate::registry::ScanMode::Quick => self.scan_deadline_quick,
            crate::registry::ScanMode::Deep => self.scan_deadline_deep,
        }
    }

    /// The pacing interval for a given host: an override if configured,
    /// else the global default (§4.3).
    pub fn host_interval(&self, host: &str) -> Duration {
        self.host_interval_overrides
            .get(host)
            .copied()
            .unwrap_or(self.default_host_interval)
    }

    /// Layer a partial file-based config on top of these defaults.
    pub fn apply_file(mut self, file: FileConfig) -> Self {
        if let Some(v) = file.global_concurrency {
            self.global_concurrency = v;
        }
        if let Some(v) = file.default_host_interval_ms {
            self.default_host_interval = Duration::from_millis(v);
        }
        for (host, ms) in file.host_interval_overrides_ms {
            self.host_interval_overrides
                .insert(host, Duration::from_millis(ms));
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.max_redirects {
            self.max_redirects = v;
        }
        if let Some(v) = file.max_retries {
            self.max_retries = v;
        }
        if let Some(v) = file.scan_deadline_quick_secs {
            self.scan_deadline_quick = Duration::from_secs(v);
        }
        if let Some(v) = file.scan_deadline_deep_secs {
            self.scan_deadline_deep = Duration::from_secs(v);
        }
        self
    }

    /// Load the optional TOML config file. A missing file is not an error
    /// (the defaults stand); a malformed file is, since the caller asked
    /// for it explicitly.
    pub fn load_file(path: &std::path::Path) -> Result<Option<FileConfig>, String> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .map(Some)
                .map_err(|e| format!("invalid config file {}: {e}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(format!("cannot read config file {}: {e}", path.display())),
        }
    }
}

/// The partial, file-sourced layer. Every field optional so a file only
/// needs to set what it wants to override.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub global_concurrency: Option<usize>,
    pub default_host_interval_ms: Option<u64>,
    #[serde(default)]
    pub host_interval_overrides_ms: HashMap<String, u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_redirects: Option<u8>,
    pub max_retries: Option<u8>,
    pub scan_deadline_quick_secs: Option<u64>,
    pub scan_deadline_deep_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.global_concurrency, 50);
        assert_eq!(cfg.default_host_interval, Duration::from_millis(100));
        assert_eq!(cfg.max_retries, 2);
    }

    #[test]
    fn file_layer_overrides_selectively() {
        let mut file = FileConfig::default();
        file.global_concurrency = Some(10);
        let cfg = ScanConfig::default().apply_file(file);
        assert_eq!(cfg.global_concurrency, 10);
        // untouched field keeps its default
        assert_eq!(cfg.max_retries, 2);
    }

    #[test]
    fn host_interval_falls_back_to_default() {
        let mut cfg = ScanConfig::default();
        cfg.host_interval_overrides
            .insert("slow.example".into(), Duration::from_secs(1));
        assert_eq!(cfg.host_interval("slow.example"), Duration::from_secs(1));
        assert_eq!(cfg.host_interval("other.example"), cfg.default_host_interval);
    }
}
