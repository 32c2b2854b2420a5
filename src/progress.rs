//! Build progress reporting.
//!
//! `statute build` reports which phase it is in and how many sections have
//! been embedded so far. Progress goes to **stderr** so stdout stays
//! parseable for scripts.

use std::io::Write;

/// A single progress event during a collection build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildProgressEvent {
    /// Documents are being prepared from the corpus records.
    Preparing { collection: String, total: u64 },
    /// `n` of `total` documents have been embedded.
    Embedding {
        collection: String,
        n: u64,
        total: u64,
    },
    /// Entries are being written in a single transaction.
    Writing { collection: String, total: u64 },
}

pub trait BuildProgressReporter: Send + Sync {
    fn report(&self, event: BuildProgressEvent);
}

/// Human-friendly progress on stderr: "build slpc  embedding  128 / 511 sections".
pub struct StderrProgress;

impl BuildProgressReporter for StderrProgress {
    fn report(&self, event: BuildProgressEvent) {
        let line = match &event {
            BuildProgressEvent::Preparing { collection, total } => {
                format!("build {}  preparing {} sections\n", collection, format_number(*total))
            }
            BuildProgressEvent::Embedding {
                collection,
                n,
                total,
            } => format!(
                "build {}  embedding  {} / {} sections\n",
                collection,
                format_number(*n),
                format_number(*total)
            ),
            BuildProgressEvent::Writing { collection, total } => {
                format!("build {}  writing {} entries\n", collection, format_number(*total))
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl BuildProgressReporter for JsonProgress {
    fn report(&self, event: BuildProgressEvent) {
        if let Ok(line) = serde_json::to_string(&event_json(&event)) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

fn event_json(event: &BuildProgressEvent) -> serde_json::Value {
    match event {
        BuildProgressEvent::Preparing { collection, total } => serde_json::json!({
            "event": "progress",
            "collection": collection,
            "phase": "preparing",
            "total": total
        }),
        BuildProgressEvent::Embedding {
            collection,
            n,
            total,
        } => serde_json::json!({
            "event": "progress",
            "collection": collection,
            "phase": "embedding",
            "n": n,
            "total": total
        }),
        BuildProgressEvent::Writing { collection, total } => serde_json::json!({
            "event": "progress",
            "collection": collection,
            "phase": "writing",
            "total": total
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl BuildProgressReporter for NoProgress {
    fn report(&self, _event: BuildProgressEvent) {}
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
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

    pub fn reporter(&self) -> Box<dyn BuildProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1), "1");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn json_events_carry_phase() {
        let v = event_json(&BuildProgressEvent::Embedding {
            collection: "slpc".into(),
            n: 64,
            total: 511,
        });
        assert_eq!(v["phase"], "embedding");
        assert_eq!(v["n"], 64);
        assert_eq!(v["collection"], "slpc");
    }
}
