//! Core naming runs shared by the CLI and library callers.
//! No host binding or UI dependencies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::config::NamingConfig;
use crate::document::{CadDocument, DocumentError};
use crate::passes::{designation, terminal_pins, wire_numbers, TerminalSet};

#[derive(Debug, thiserror::Error)]
pub enum NamingError {
    #[error("Not connected to a document: {0}")]
    NotConnected(DocumentError),
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Options for a single run (CLI or library).
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Compute and log every label without writing to the document
    pub dry_run: bool,
}

/// The naming passes, in the order a full run executes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    DeviceDesignations,
    WireNumbers,
    TerminalPinNames,
}

impl PassKind {
    /// Terminal pin names read wire numbers, so they run after wire numbering.
    pub const ALL: [PassKind; 3] = [
        PassKind::DeviceDesignations,
        PassKind::WireNumbers,
        PassKind::TerminalPinNames,
    ];

    pub fn title(self) -> &'static str {
        match self {
            PassKind::DeviceDesignations => "Device designations",
            PassKind::WireNumbers => "Wire numbers",
            PassKind::TerminalPinNames => "Terminal pin names",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A label the pass settled on for one subject (signal, device or pin).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub subject: String,
    pub label: String,
}

/// Per-pass counts.
///
/// Every item the pass looked at is `considered`, and ends up in exactly one
/// of `updated`, `unchanged`, `skipped` or `failed`, except in a dry run,
/// where items that would have been written are only `considered`.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub pass: PassKind,
    pub dry_run: bool,
    pub considered: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub assignments: Vec<Assignment>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PassReport {
    pub fn new(pass: PassKind, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            pass,
            dry_run,
            considered: 0,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            failed: 0,
            assignments: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub fn assign(&mut self, subject: impl Into<String>, label: impl Into<String>) {
        self.assignments.push(Assignment {
            subject: subject.into(),
            label: label.into(),
        });
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        tracing::info!(
            "{}: {}/{} updated, {} unchanged, {} skipped, {} failed{}",
            self.pass,
            self.updated,
            self.considered,
            self.unchanged,
            self.skipped,
            self.failed,
            if self.dry_run { " (dry run)" } else { "" }
        );
        self
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Label assigned to `subject`, if any
    pub fn label_of(&self, subject: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|a| a.subject == subject)
            .map(|a| a.label.as_str())
    }
}

/// Reports of every pass in one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub passes: Vec<PassReport>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            passes: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.passes.iter().any(PassReport::has_failures)
    }

    pub fn total_updated(&self) -> usize {
        self.passes.iter().map(|p| p.updated).sum()
    }

    pub fn total_considered(&self) -> usize {
        self.passes.iter().map(|p| p.considered).sum()
    }

    pub fn pass(&self, kind: PassKind) -> Option<&PassReport> {
        self.passes.iter().find(|p| p.pass == kind)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Core naming API used by both the CLI and library callers.
pub struct NamingCore;

impl NamingCore {
    /// Fail fast when there is no document to work on. Nothing is written.
    pub fn connect<D: CadDocument + ?Sized>(doc: &D) -> Result<(), NamingError> {
        doc.ensure_open().map_err(|e| {
            tracing::error!("Failed to connect to document: {}", e);
            NamingError::NotConnected(e)
        })
    }

    /// Number every signal's net segments.
    pub fn assign_wire_numbers<D: CadDocument + ?Sized>(
        doc: &mut D,
        config: &NamingConfig,
        options: &RunOptions,
    ) -> Result<PassReport, NamingError> {
        Self::connect(doc)?;
        tracing::info!("Starting wire number assignment");
        let plan = wire_numbers::plan_wire_numbers(doc, config)?;
        Ok(wire_numbers::apply_wire_numbers(doc, &plan, config, options))
    }

    /// Designate every non-terminal device and cable.
    pub fn assign_device_designations<D: CadDocument + ?Sized>(
        doc: &mut D,
        config: &NamingConfig,
        options: &RunOptions,
    ) -> Result<PassReport, NamingError> {
        Self::connect(doc)?;
        let terminals = TerminalSet::classify(doc, config)?;
        Self::designate(doc, config, &terminals, options)
    }

    /// Name every terminal pin after the wire number it is connected to.
    pub fn assign_terminal_pin_names<D: CadDocument + ?Sized>(
        doc: &mut D,
        config: &NamingConfig,
        options: &RunOptions,
    ) -> Result<PassReport, NamingError> {
        Self::connect(doc)?;
        let terminals = TerminalSet::classify(doc, config)?;
        Self::name_terminal_pins(doc, config, &terminals, options)
    }

    fn designate<D: CadDocument + ?Sized>(
        doc: &mut D,
        config: &NamingConfig,
        terminals: &TerminalSet,
        options: &RunOptions,
    ) -> Result<PassReport, NamingError> {
        tracing::info!("Starting device designation assignment");
        let plan = designation::plan_designations(doc, config, terminals)?;
        Ok(designation::apply_designations(doc, &plan, options))
    }

    fn name_terminal_pins<D: CadDocument + ?Sized>(
        doc: &mut D,
        config: &NamingConfig,
        terminals: &TerminalSet,
        options: &RunOptions,
    ) -> Result<PassReport, NamingError> {
        tracing::info!("Starting terminal pin name assignment");
        terminal_pins::assign_terminal_pin_names(doc, config, terminals, options)
    }

    /// Run `passes` in the given order.
    ///
    /// Terminal devices are classified once, before the first pass, so a
    /// device renamed by the designation pass keeps its classification for
    /// the terminal pin pass.
    pub fn run<D: CadDocument + ?Sized>(
        doc: &mut D,
        config: &NamingConfig,
        options: &RunOptions,
        passes: &[PassKind],
    ) -> Result<RunReport, NamingError> {
        config.validate()?;
        Self::connect(doc)?;

        let terminals = if passes.iter().any(|p| *p != PassKind::WireNumbers) {
            TerminalSet::classify(doc, config)?
        } else {
            TerminalSet::default()
        };

        let mut report = RunReport::new();
        tracing::info!("Run {} started ({} passes)", report.run_id, passes.len());
        for &pass in passes {
            let pass_report = match pass {
                PassKind::DeviceDesignations => Self::designate(doc, config, &terminals, options)?,
                PassKind::WireNumbers => Self::assign_wire_numbers(doc, config, options)?,
                PassKind::TerminalPinNames => {
                    Self::name_terminal_pins(doc, config, &terminals, options)?
                }
            };
            report.passes.push(pass_report);
        }
        tracing::info!(
            "Run {} finished: {}/{} items updated",
            report.run_id,
            report.total_updated(),
            report.total_considered()
        );
        Ok(report)
    }

    /// Run every pass in the standard order.
    pub fn run_all<D: CadDocument + ?Sized>(
        doc: &mut D,
        config: &NamingConfig,
        options: &RunOptions,
    ) -> Result<RunReport, NamingError> {
        Self::run(doc, config, options, &PassKind::ALL)
    }
}
