use std::collections::HashSet;
use std::fs;
use std::path::Path;

use parking_lot::Mutex;
use tracing::debug;

use crate::log::SharedSink;

/// Metadata artifacts that must all be present before a session can be
/// reconciled. `cameras.json` is optional — sessions without surveyed camera
/// positions are still processable.
const REQUIRED_ARTIFACTS: [&str; 3] = ["aruco.json", "marker.json", "meta.json"];

/// Decides when a session directory holds a complete artifact set, and
/// guarantees each session is dispatched at most once.
pub struct ReadinessDetector {
    sink: SharedSink,
    dispatched: Mutex<HashSet<String>>,
}

impl ReadinessDetector {
    pub fn new(sink: SharedSink) -> Self {
        Self {
            sink,
            dispatched: Mutex::new(HashSet::new()),
        }
    }

    /// Pure completeness check: all required metadata files plus at least one
    /// jpg. Artifact arrival order does not matter.
    pub fn is_ready(dir: &Path) -> bool {
        for name in REQUIRED_ARTIFACTS {
            if !dir.join(name).is_file() {
                return false;
            }
        }
        has_any_jpg(dir)
    }

    /// Re-evaluate a session after an artifact write. Returns `true` exactly
    /// once per session: the first call that observes a complete artifact set.
    /// Further artifact arrivals for an already-dispatched session are no-ops.
    pub fn check(&self, session_id: &str, dir: &Path) -> bool {
        for name in REQUIRED_ARTIFACTS {
            if !dir.join(name).is_file() {
                self.sink.log(&format!("{session_id}: {name} not found"));
                return false;
            }
        }
        if !has_any_jpg(dir) {
            self.sink.log(&format!("{session_id}: no jpg files found"));
            return false;
        }

        // Set-and-test under one lock so concurrent arrivals cannot both
        // dispatch the session.
        let newly = self.dispatched.lock().insert(session_id.to_string());
        if !newly {
            debug!(session_id, "already dispatched, ignoring");
        }
        newly
    }
}

fn has_any_jpg(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|e| {
        e.path().is_file()
            && e.file_name()
                .to_string_lossy()
                .to_lowercase()
                .ends_with(".jpg")
    })
}
