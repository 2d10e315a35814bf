//! Stage completion within a process
//!
//! Publishing stages always execute: a [`StageRun`] reports incomplete until
//! it has run in this process and never persists a marker, so a restarted
//! scheduler reruns the stage.

use crate::domain::ExportDate;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-process completion flag of one stage run
#[derive(Debug)]
pub struct StageRun {
    name: String,
    date: Option<ExportDate>,
    has_run: AtomicBool,
}

impl StageRun {
    pub fn new(name: impl Into<String>, date: Option<ExportDate>) -> Self {
        Self {
            name: name.into(),
            date,
            has_run: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn date(&self) -> Option<ExportDate> {
        self.date
    }

    /// Whether the stage has run to completion in this process
    pub fn complete(&self) -> bool {
        self.has_run.load(Ordering::SeqCst)
    }

    /// Flag the run as finished
    pub fn mark_run(&self) {
        self.has_run.store(true, Ordering::SeqCst);
        tracing::debug!(
            stage = %self.name,
            date = ?self.date.map(|d| d.value()),
            "Stage run finished"
        );
    }
}
