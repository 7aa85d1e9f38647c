//! Cross-process job progress, observable via an atomically-written JSON
//! file plus a cooperative cancel-flag file. Grounded in
//! `examples/original_source/scraper/progress.py`'s `ProgressWriter`/
//! `read_progress`/`is_job_running`.
//!
//! Liveness is purely timestamp-based here (see SPEC_FULL.md §4.5): a
//! `running` record is considered live iff `now - last_flush_ts <=
//! stale_timeout`. The original's `os.kill(pid, 0)` probe is not
//! reproduced; `pid` is kept in the record for display only.

use crate::config::ProgressConfig;
use crate::errors::CrawlError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressState {
    pub job_type: String,
    pub status: String,
    pub pid: u32,
    pub started_at: f64,
    pub last_flush_ts: f64,
    pub elapsed_seconds: f64,
    pub elapsed_fmt: String,
    pub total: i64,
    pub processed: i64,
    pub updated: i64,
    pub errors: i64,
    pub not_found: i64,
    pub remaining: i64,
    pub progress_pct: f64,
    pub speed_per_min: f64,
    pub eta_seconds: f64,
    pub eta_fmt: String,
    pub current_item: String,
    pub phase: String,
    pub phase_number: i64,
    pub phase_total: i64,
    pub error_message: String,
}

fn now_ts() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
}

fn fmt_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        return format!("{seconds:.0}s");
    }
    let total = seconds as i64;
    let (m, s) = (total / 60, total % 60);
    let (h, m) = (m / 60, m % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else {
        format!("{m}m {s:02}s")
    }
}

/// Reporter held by a workflow for the duration of one job.
pub struct ProgressWriter {
    cfg: ProgressConfig,
    job_type: String,
    total: i64,
    processed: i64,
    updated: i64,
    errors: i64,
    not_found: i64,
    started_at: f64,
    current_item: String,
    phase: String,
    phase_number: i64,
    phase_total: i64,
    /// Terminal statuses are sticky; once set, further ticks/phase changes
    /// are ignored rather than clobbering the final record (spec §4.5).
    terminal: bool,
}

impl ProgressWriter {
    pub fn start(cfg: ProgressConfig, job_type: &str, total: i64) -> Result<Self, CrawlError> {
        clear_cancel_flag(&cfg)?;
        let mut writer = Self {
            cfg,
            job_type: job_type.to_string(),
            total,
            processed: 0,
            updated: 0,
            errors: 0,
            not_found: 0,
            started_at: now_ts(),
            current_item: String::new(),
            phase: "Initialisation".to_string(),
            phase_number: 0,
            phase_total: 0,
            terminal: false,
        };
        writer.flush("running", "")?;
        Ok(writer)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        updated: bool,
        error: bool,
        not_found: bool,
        current_item: Option<&str>,
    ) -> Result<(), CrawlError> {
        if self.terminal {
            return Ok(());
        }
        self.processed += 1;
        if updated {
            self.updated += 1;
        }
        if error {
            self.errors += 1;
        }
        if not_found {
            self.not_found += 1;
        }
        if let Some(item) = current_item {
            if !item.is_empty() {
                self.current_item = item.to_string();
            }
        }
        self.flush("running", "")
    }

    /// Update the total once a phase's item count becomes known (discovery
    /// phases start at `total=0` since the count isn't known up front).
    pub fn set_total(&mut self, total: i64) -> Result<(), CrawlError> {
        if self.terminal {
            return Ok(());
        }
        self.total = total;
        self.flush("running", "")
    }

    /// Update the phase triple shown to the observer (e.g. `3/5`).
    pub fn set_phase(&mut self, label: &str, number: i64, total: i64) -> Result<(), CrawlError> {
        if self.terminal {
            return Ok(());
        }
        self.phase = label.to_string();
        self.phase_number = number;
        self.phase_total = total;
        self.flush("running", "")
    }

    pub fn finish(&mut self) -> Result<(), CrawlError> {
        if self.terminal {
            return Ok(());
        }
        self.terminal = true;
        self.flush("finished", "")
    }

    pub fn cancel(&mut self) -> Result<(), CrawlError> {
        if self.terminal {
            return Ok(());
        }
        self.terminal = true;
        self.flush("cancelled", "")
    }

    pub fn abort(&mut self, reason: &str) -> Result<(), CrawlError> {
        if self.terminal {
            return Ok(());
        }
        self.terminal = true;
        self.flush("error", reason)
    }

    pub fn processed(&self) -> i64 {
        self.processed
    }

    pub fn updated(&self) -> i64 {
        self.updated
    }

    pub fn errors(&self) -> i64 {
        self.errors
    }

    pub fn not_found(&self) -> i64 {
        self.not_found
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cfg.cancel_path().exists()
    }

    fn flush(&mut self, status: &str, error_message: &str) -> Result<(), CrawlError> {
        let now = now_ts();
        let elapsed = (now - self.started_at).max(0.0);
        let remaining = (self.total - self.processed).max(0);
        let speed = if elapsed > 0.0 { self.processed as f64 / elapsed } else { 0.0 };
        let eta_seconds = if speed > 0.0 { remaining as f64 / speed } else { 0.0 };
        let progress_pct = if self.total > 0 {
            self.processed as f64 / self.total as f64 * 100.0
        } else {
            0.0
        };

        let state = ProgressState {
            job_type: self.job_type.clone(),
            status: status.to_string(),
            pid: std::process::id(),
            started_at: self.started_at,
            last_flush_ts: now,
            elapsed_seconds: elapsed,
            elapsed_fmt: fmt_duration(elapsed),
            total: self.total,
            processed: self.processed,
            updated: self.updated,
            errors: self.errors,
            not_found: self.not_found,
            remaining,
            progress_pct,
            speed_per_min: speed * 60.0,
            eta_seconds,
            eta_fmt: fmt_duration(eta_seconds),
            current_item: self.current_item.clone(),
            phase: self.phase.clone(),
            phase_number: self.phase_number,
            phase_total: self.phase_total,
            error_message: error_message.to_string(),
        };

        write_atomic(&self.cfg, &state)
    }
}

fn write_atomic(cfg: &ProgressConfig, state: &ProgressState) -> Result<(), CrawlError> {
    let dir = &cfg.dir;
    fs::create_dir_all(dir)?;
    let path = cfg.progress_path();
    let tmp = path.with_extension("tmp");
    let json = serde_json::to_string(state)
        .map_err(|e| CrawlError::Io(format!("failed to serialize progress: {e}")))?;
    fs::write(&tmp, json)?;
    fs::rename(&tmp, &path)?;
    Ok(())
}

/// Read current progress, if any job has ever flushed one.
pub fn read_progress(cfg: &ProgressConfig) -> Option<ProgressState> {
    let raw = fs::read_to_string(cfg.progress_path()).ok()?;
    serde_json::from_str(&raw).ok()
}

/// `true` iff the last-seen record claims `running` and hasn't gone stale.
/// Purely timestamp-based — no PID liveness probe (see module docs).
pub fn is_job_running(cfg: &ProgressConfig) -> bool {
    let Some(state) = read_progress(cfg) else {
        return false;
    };
    if state.status != "running" {
        return false;
    }
    let age = now_ts() - state.last_flush_ts;
    age >= 0.0 && age <= cfg.stale_timeout.as_secs_f64()
}

pub fn clear_progress(cfg: &ProgressConfig) -> Result<(), CrawlError> {
    let path = cfg.progress_path();
    if path.exists() {
        fs::remove_file(path)?;
    }
    clear_cancel_flag(cfg)
}

pub fn request_cancel(cfg: &ProgressConfig) -> Result<(), CrawlError> {
    fs::create_dir_all(&cfg.dir)?;
    fs::write(cfg.cancel_path(), "cancel")?;
    Ok(())
}

/// Remove only the cancel flag, leaving the terminal progress record in
/// place for the observer to read (spec §4.6: a cancelled workflow "clears
/// the cancel flag" as part of its finalization, distinct from `clear()`
/// which also deletes the progress record itself).
pub fn clear_cancel(cfg: &ProgressConfig) -> Result<(), CrawlError> {
    clear_cancel_flag(cfg)
}

fn clear_cancel_flag(cfg: &ProgressConfig) -> Result<(), CrawlError> {
    let path = cfg.cancel_path();
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cfg() -> (tempfile::TempDir, ProgressConfig) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ProgressConfig {
            dir: dir.path().to_string_lossy().to_string(),
            stale_timeout: Duration::from_secs(120),
        };
        (dir, cfg)
    }

    #[test]
    fn start_tick_finish_round_trip() {
        let (_dir, cfg) = test_cfg();
        let mut writer = ProgressWriter::start(cfg.clone(), "incremental", 10).unwrap();
        writer.tick(true, false, false, Some("listing 1")).unwrap();
        writer.tick(false, true, false, None).unwrap();
        writer.finish().unwrap();

        let state = read_progress(&cfg).unwrap();
        assert_eq!(state.status, "finished");
        assert_eq!(state.processed, 2);
        assert_eq!(state.updated, 1);
        assert_eq!(state.errors, 1);
        assert_eq!(state.current_item, "listing 1");
    }

    #[test]
    fn cancel_flag_lifecycle() {
        let (_dir, cfg) = test_cfg();
        assert!(!ProgressWriter::start(cfg.clone(), "incremental", 1)
            .unwrap()
            .is_cancel_requested());

        request_cancel(&cfg).unwrap();
        let writer = ProgressWriter::start(cfg.clone(), "incremental", 1).unwrap();
        // start() clears any leftover cancel flag from a previous run.
        assert!(!writer.is_cancel_requested());

        request_cancel(&cfg).unwrap();
        assert!(writer.is_cancel_requested());
    }

    #[test]
    fn is_job_running_reflects_staleness_not_pid() {
        let (_dir, mut cfg) = test_cfg();
        cfg.stale_timeout = Duration::from_secs(0);
        let mut writer = ProgressWriter::start(cfg.clone(), "incremental", 1).unwrap();
        writer.tick(false, false, false, None).unwrap();
        // A zero stale_timeout means even a just-flushed record reads as
        // not running once any time at all has passed.
        std::thread::sleep(Duration::from_millis(5));
        assert!(!is_job_running(&cfg));
    }

    #[test]
    fn finished_job_is_not_running() {
        let (_dir, cfg) = test_cfg();
        let mut writer = ProgressWriter::start(cfg.clone(), "incremental", 1).unwrap();
        writer.finish().unwrap();
        assert!(!is_job_running(&cfg));
    }

    #[test]
    fn set_phase_updates_triple() {
        let (_dir, cfg) = test_cfg();
        let mut writer = ProgressWriter::start(cfg.clone(), "full", 10).unwrap();
        writer.set_phase("Detail backfill", 3, 5).unwrap();
        let state = read_progress(&cfg).unwrap();
        assert_eq!(state.phase, "Detail backfill");
        assert_eq!(state.phase_number, 3);
        assert_eq!(state.phase_total, 5);
    }

    #[test]
    fn terminal_status_is_sticky() {
        let (_dir, cfg) = test_cfg();
        let mut writer = ProgressWriter::start(cfg.clone(), "incremental", 5).unwrap();
        writer.cancel().unwrap();
        // Further ticks/phase changes after a terminal transition are ignored.
        writer.tick(true, false, false, Some("ignored")).unwrap();
        writer.set_phase("ignored", 9, 9).unwrap();
        let state = read_progress(&cfg).unwrap();
        assert_eq!(state.status, "cancelled");
        assert_eq!(state.processed, 0);
        assert_ne!(state.phase, "ignored");
    }

    #[test]
    fn clear_progress_removes_files() {
        let (_dir, cfg) = test_cfg();
        ProgressWriter::start(cfg.clone(), "incremental", 1).unwrap();
        request_cancel(&cfg).unwrap();
        clear_progress(&cfg).unwrap();
        assert!(read_progress(&cfg).is_none());
        assert!(!cfg.cancel_path().exists());
    }
}
