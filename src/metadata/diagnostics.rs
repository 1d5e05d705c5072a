//! Diagnostics collection for the merge pipeline.
//!
//! This module provides types for collecting and reporting diagnostic messages
//! during a merge. Per-member duplicate skips, missing accessor links and degraded
//! platform fix-ups are reported here and never abort the pipeline; only the
//! conditions in [`crate::Error`] do.
//!
//! # Architecture
//!
//! The diagnostics container is shared across the pipeline stages:
//! - **Import engine**: reports member skips and collision displacements
//! - **Reference fixator**: reports unresolvable mentions and accessibility corrections
//! - **Platform fixer**: reports degraded no-op fix-ups
//! - **Session**: reports assembly-reference pruning and resource unioning
//!
//! The [`Diagnostics`] container uses `boxcar::Vec` for lock-free append
//! operations, so the parallel input-loading stage can report without
//! synchronization; the merge proper appends from a single thread.
//!
//! # Key Components
//!
//! - [`Diagnostics`] - Append-only container for diagnostic entries
//! - [`Diagnostic`] - Individual entry with severity, category and context
//! - [`DiagnosticSeverity`] - Severity level (Info, Warning, Error)
//! - [`DiagnosticCategory`] - Pipeline stage the diagnostic originates from

use strum::Display;

/// Severity level of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DiagnosticSeverity {
    /// Informational message, not indicating a problem.
    #[strum(serialize = "INFO")]
    Info,

    /// Warning about a recoverable condition.
    ///
    /// The merge continues, but some data was skipped, a link was left
    /// unresolved, or behavior may differ from a naive union of the inputs.
    #[strum(serialize = "WARN")]
    Warning,

    /// Error recorded in lenient paths before the pipeline aborts,
    /// or one that a caller chose to downgrade.
    #[strum(serialize = "ERROR")]
    Error,
}

/// Pipeline stage or subject area a diagnostic originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DiagnosticCategory {
    /// Type-level merge decisions: create, merge-into, displacement renames.
    TypeMerge,
    /// Per-member merge decisions: duplicate skips, accessor rebinding.
    MemberMerge,
    /// Second-pass reference fix-up results.
    ReferenceFix,
    /// Platform baseline scope rewriting.
    PlatformFix,
    /// Assembly- and module-reference table maintenance.
    AssemblyRef,
    /// Embedded resource carrying.
    Resource,
}

/// A single diagnostic entry.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// How severe the reported condition is.
    pub severity: DiagnosticSeverity,
    /// Which pipeline stage reported it.
    pub category: DiagnosticCategory,
    /// Human-readable description naming the affected type/member and module.
    pub message: String,
}

/// Append-only container for diagnostics produced during a merge.
///
/// # Examples
///
/// ```rust
/// use dotfuse::metadata::diagnostics::{Diagnostics, DiagnosticCategory};
///
/// let diagnostics = Diagnostics::new();
/// diagnostics.warning(
///     DiagnosticCategory::MemberMerge,
///     "field Counter already present in Ns.Helper, skipped (from LibB.dll)",
/// );
///
/// assert_eq!(diagnostics.warning_count(), 1);
/// for entry in diagnostics.iter() {
///     println!("[{}] {}: {}", entry.severity, entry.category, entry.message);
/// }
/// ```
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: boxcar::Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: boxcar::Vec::new(),
        }
    }

    /// Append an informational entry.
    pub fn info(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(DiagnosticSeverity::Info, category, message);
    }

    /// Append a warning entry.
    pub fn warning(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(DiagnosticSeverity::Warning, category, message);
    }

    /// Append an error entry.
    pub fn error(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(DiagnosticSeverity::Error, category, message);
    }

    fn push(
        &self,
        severity: DiagnosticSeverity,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) {
        self.entries.push(Diagnostic {
            severity,
            category,
            message: message.into(),
        });
    }

    /// Iterate over all entries in append order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(|(_, entry)| entry)
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.count()
    }

    /// Returns `true` when no diagnostics were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if any entry has [`DiagnosticSeverity::Error`].
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    /// Number of warning entries.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
            .count()
    }

    /// Number of error entries.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
            .count()
    }
}
