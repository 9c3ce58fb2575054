//! Similarity clustering progress reporting.
//!
//! Similarity clustering is quadratic, so `rlens cluster --mode similarity`
//! reports how far the outer loop has come. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.

use review_lens_core::cluster::{ClusterProgress, NoClusterProgress};
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Reporters are moved onto the blocking clustering thread.
pub type Reporter = Box<dyn ClusterProgress + Send + Sync>;

/// Human-friendly progress on stderr: "cluster similarity  1,234 / 5,000 reviews".
///
/// Prints at most once per percentage point, plus the final line.
pub struct StderrProgress {
    last_percent: AtomicUsize,
}

impl StderrProgress {
    pub fn new() -> Self {
        Self {
            last_percent: AtomicUsize::new(usize::MAX),
        }
    }
}

impl Default for StderrProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterProgress for StderrProgress {
    fn on_progress(&self, processed: usize, total: usize) {
        let percent = if total == 0 { 100 } else { processed * 100 / total };
        if self.last_percent.swap(percent, Ordering::Relaxed) == percent && processed != total {
            return;
        }
        let line = format!(
            "cluster similarity  {} / {} reviews\n",
            format_number(processed as u64),
            format_number(total as u64)
        );
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ClusterProgress for JsonProgress {
    fn on_progress(&self, processed: usize, total: usize) {
        let obj = serde_json::json!({
            "event": "progress",
            "phase": "similarity",
            "n": processed,
            "total": total
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Reporter {
        match self {
            ProgressMode::Off => Box::new(NoClusterProgress),
            ProgressMode::Human => Box::new(StderrProgress::new()),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

impl FromStr for ProgressMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => anyhow::bail!("Unknown progress mode: '{}'. Use off, human, or json.", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn progress_mode_parses() {
        assert_eq!("JSON".parse::<ProgressMode>().unwrap(), ProgressMode::Json);
        assert_eq!("off".parse::<ProgressMode>().unwrap(), ProgressMode::Off);
        assert!("loud".parse::<ProgressMode>().is_err());
    }

    #[test]
    fn every_mode_builds_a_reporter() {
        for mode in [ProgressMode::Off, ProgressMode::Human, ProgressMode::Json] {
            let reporter = mode.reporter();
            reporter.on_progress(0, 0);
            reporter.on_progress(2, 2);
        }
    }
}
