//! Structured JSONL scan logger.
//!
//! Grounded in the teacher's `EnhancedDebugLogger`/`RotatingLogger`: a
//! size-based rotating append log, one NDJSON record per event, redaction
//! applied before anything touches disk. Repurposed here for scan
//! lifecycle events instead of proxy health telemetry, and the redaction
//! patterns additionally cover the identifier under scan, since that is
//! this crate's own sensitive payload.

use chrono::Local;
use flate2::write::GzEncoder;
use flate2::Compression;
use fs2::FileExt;
use regex::Regex;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

const LOG_ROTATION_SIZE_MB: u64 = 8;
const MAX_ARCHIVES: u32 = 5;
const ROTATION_CHECK_INTERVAL: u32 = 200;

struct RotatingLogger {
    log_path: PathBuf,
    write_count: AtomicU32,
}

impl RotatingLogger {
    fn new(log_path: PathBuf) -> Self {
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        Self {
            log_path,
            write_count: AtomicU32::new(0),
        }
    }

    fn write_with_rotation(&self, json_line: &str) -> Result<(), std::io::Error> {
        if self.write_count.fetch_add(1, Ordering::Relaxed) % ROTATION_CHECK_INTERVAL == 0 {
            let _ = self.rotate_if_needed();
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.log_path)?;
        writeln!(file, "{json_line}")?;
        Ok(())
    }

    fn rotate_if_needed(&self) -> Result<(), std::io::Error> {
        if !self.needs_rotation()? {
            return Ok(());
        }
        let lock_path = self.log_path.with_extension("lock");
        let lock_file = OpenOptions::new().create(true).write(true).truncate(true).open(&lock_path)?;
        match lock_file.try_lock_exclusive() {
            Ok(()) => {
                if self.needs_rotation()? {
                    self.perform_rotation()?;
                }
                let _ = std::fs::remove_file(&lock_path);
                Ok(())
            }
            Err(_) => Ok(()),
        }
    }

    fn needs_rotation(&self) -> Result<bool, std::io::Error> {
        if !self.log_path.exists() {
            return Ok(false);
        }
        let metadata = std::fs::metadata(&self.log_path)?;
        Ok(metadata.len() >= LOG_ROTATION_SIZE_MB * 1024 * 1024)
    }

    fn perform_rotation(&self) -> Result<(), std::io::Error> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = self.log_path.file_name().unwrap().to_str().unwrap();
        let archive_name = format!("{filename}.{timestamp}.gz");
        let archive_path = self.log_path.parent().unwrap().join(archive_name);

        let temp_path = self.log_path.with_extension("rotating");
        std::fs::rename(&self.log_path, &temp_path)?;

        let source_file = File::open(&temp_path)?;
        let target_file = File::create(&archive_path)?;
        let mut encoder = GzEncoder::new(target_file, Compression::default());
        std::io::copy(&mut BufReader::new(source_file), &mut encoder)?;
        encoder.finish()?;
        std::fs::remove_file(&temp_path)?;

        let _ = self.cleanup_old_archives();
        Ok(())
    }

    fn cleanup_old_archives(&self) -> Result<(), std::io::Error> {
        let log_dir = self.log_path.parent().unwrap();
        let filename = self.log_path.file_name().unwrap().to_str().unwrap();

        let mut archives = Vec::new();
        for entry in std::fs::read_dir(log_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&format!("{filename}.")) && name.ends_with(".gz") {
                archives.push((entry.path(), entry.metadata()?.modified()?));
            }
        }
        archives.sort_by_key(|(_, modified)| *modified);
        if archives.len() > MAX_ARCHIVES as usize {
            let to_remove = archives.len() - MAX_ARCHIVES as usize;
            for (path, _) in archives.iter().take(to_remove) {
                let _ = std::fs::remove_file(path);
            }
        }
        Ok(())
    }
}

fn compile_redaction_patterns() -> Vec<Regex> {
    let patterns = [
        r"(?i)authorization[:\s]+[^\s\n]+",
        r"(?i)bearer[:\s]+[^\s\n]+",
        r"(?i)token[:\s]+[^\s\n]+",
        r"(?i)api[_-]?key[:\s]+[^\s\n]+",
        r"(?i)access_key=[^&\s]+",
        r"[\w.+-]+@[\w-]+\.[\w.-]+",
        r"\+?\d{8,15}",
    ];
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

/// One scanner-wide JSONL logger, shared read-only across every worker
/// once constructed (§9 ambient logging requirement).
pub struct ScanLogger {
    logger: RotatingLogger,
    redaction_patterns: Vec<Regex>,
}

impl ScanLogger {
    /// Resolves the log path: an explicit `override_path` wins, else
    /// `OSINT_LOG_FILE`, else the platform default under the user's data
    /// directory (teacher precedent: `CCSTATUS_JSONL_FILE` env override).
    pub fn new(override_path: Option<PathBuf>) -> Self {
        let path = override_path
            .or_else(|| std::env::var("OSINT_LOG_FILE").ok().map(PathBuf::from))
            .unwrap_or_else(Self::default_log_path);
        Self {
            logger: RotatingLogger::new(path),
            redaction_patterns: compile_redaction_patterns(),
        }
    }

    fn default_log_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("reconprobe");
        path.push("scan-log.jsonl");
        path
    }

    fn redact(&self, text: &str) -> String {
        let mut redacted = text.to_string();
        for pattern in &self.redaction_patterns {
            redacted = pattern.replace_all(&redacted, "[REDACTED]").to_string();
        }
        redacted
    }

    fn write_event(&self, mut entry: serde_json::Value) {
        if let Some(obj) = entry.as_object_mut() {
            for (_, value) in obj.iter_mut() {
                if let serde_json::Value::String(s) = value {
                    *s = self.redact(s);
                }
            }
        }
        if let Ok(line) = serde_json::to_string(&entry) {
            let _ = self.logger.write_with_rotation(&line);
        }
    }

    pub fn scan_start(&self, kind: &str, mode: &str, correlation_id: &str) {
        self.write_event(serde_json::json!({
            "timestamp": Local::now().to_rfc3339(),
            "event": "scan_start",
            "kind": kind,
            "mode": mode,
            "correlation_id": correlation_id,
        }));
    }

    pub fn probe_outcome(&self, probe_id: &str, state: &str, latency_ms: u64, correlation_id: &str) {
        self.write_event(serde_json::json!({
            "timestamp": Local::now().to_rfc3339(),
            "event": "probe_outcome",
            "probe_id": probe_id,
            "state": state,
            "latency_ms": latency_ms,
            "correlation_id": correlation_id,
        }));
    }

    pub fn adapter_outcome(&self, section: &str, ok: bool, correlation_id: &str) {
        self.write_event(serde_json::json!({
            "timestamp": Local::now().to_rfc3339(),
            "event": "adapter_outcome",
            "section": section,
            "ok": ok,
            "correlation_id": correlation_id,
        }));
    }

    pub fn scan_end(&self, attempted: usize, present: usize, correlation_id: &str) {
        self.write_event(serde_json::json!({
            "timestamp": Local::now().to_rfc3339(),
            "event": "scan_end",
            "attempted": attempted,
            "present": present,
            "correlation_id": correlation_id,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_identifier_shaped_values() {
        let logger = ScanLogger {
            logger: RotatingLogger::new(PathBuf::from("/tmp/does-not-matter.jsonl")),
            redaction_patterns: compile_redaction_patterns(),
        };
        assert_eq!(logger.redact("alice@example.com"), "[REDACTED]");
        assert_eq!(logger.redact("Authorization: Bearer abc123"), "[REDACTED]");
    }

    #[test]
    fn writes_and_rotates_in_a_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.jsonl");
        let logger = ScanLogger::new(Some(path.clone()));
        logger.scan_start("username", "quick", "corr-1");
        assert!(path.exists());
    }
}
