// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Recoverable parse anomalies.
//!
//! A decode never aborts over a single bad field. Instead each tolerated
//! inconsistency is recorded here and a placeholder node is emitted. The
//! collection is owned by one decode call and starts empty for every call.

use std::fmt;

use serde::Serialize;

/// Kind of a recoverable anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AnomalyKind {
    /// Wire tag did not match any expected schema child
    TagMismatch,
    /// A required schema child was absent
    MissingField,
    /// No alternative of a choice matched the wire tag
    ChoiceExhausted,
    /// A declared length was implausible and was clamped
    LengthClamped,
    /// A named-number lookup found no entry for the value
    NamedValueMissing,
    /// Type reference resolution exceeded the configured depth
    ReferenceDepthExceeded,
    /// Constructed nesting exceeded the configured depth
    NestingTooDeep,
    /// End-of-contents marker with no open indefinite construct
    StackUnderflow,
    /// Value octets are not a valid encoding for the declared type
    MalformedValue,
    /// Trace record type not recognized for the detected format version
    UnknownRecord,
}

impl AnomalyKind {
    /// Short label for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::TagMismatch => "tag mismatch",
            AnomalyKind::MissingField => "missing field",
            AnomalyKind::ChoiceExhausted => "choice exhausted",
            AnomalyKind::LengthClamped => "length clamped",
            AnomalyKind::NamedValueMissing => "named value missing",
            AnomalyKind::ReferenceDepthExceeded => "reference depth exceeded",
            AnomalyKind::NestingTooDeep => "nesting too deep",
            AnomalyKind::StackUnderflow => "stack underflow",
            AnomalyKind::MalformedValue => "malformed value",
            AnomalyKind::UnknownRecord => "unknown record",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded anomaly with its location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    /// Anomaly kind
    pub kind: AnomalyKind,
    /// Byte offset the anomaly refers to
    pub offset: usize,
    /// Decode stack depth at the time
    pub depth: usize,
    /// Free-form detail (field name, tag, value)
    pub detail: String,
}

/// Per-call anomaly accumulator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    error_count: u32,
    anomalies: Vec<Anomaly>,
}

impl Diagnostics {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything recorded so far.
    pub fn reset(&mut self) {
        self.error_count = 0;
        self.anomalies.clear();
    }

    /// Record an anomaly of the given kind with no location information.
    pub fn record_anomaly(&mut self, kind: AnomalyKind) {
        self.record(kind, 0, 0, String::new());
    }

    /// Record an anomaly with its location.
    pub fn record(
        &mut self,
        kind: AnomalyKind,
        offset: usize,
        depth: usize,
        detail: impl Into<String>,
    ) {
        let detail = detail.into();
        tracing::debug!(
            context = "diagnostics",
            kind = kind.as_str(),
            offset,
            depth,
            detail = detail.as_str(),
            "recoverable anomaly"
        );
        self.error_count = self.error_count.saturating_add(1);
        self.anomalies.push(Anomaly {
            kind,
            offset,
            depth,
            detail,
        });
    }

    /// Number of anomalies recorded.
    pub fn count(&self) -> u32 {
        self.error_count
    }

    /// Whether nothing was recorded.
    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }

    /// Recorded anomalies in the order they occurred.
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// Number of anomalies of one kind.
    pub fn count_of(&self, kind: AnomalyKind) -> usize {
        self.anomalies.iter().filter(|a| a.kind == kind).count()
    }

    /// Append another collection to this one.
    pub fn merge(&mut self, other: Diagnostics) {
        self.error_count = self.error_count.saturating_add(other.error_count);
        self.anomalies.extend(other.anomalies);
    }
}

/// Receiver of the per-call diagnostics (logging, alerting, UI annotation).
pub trait DiagnosticsSink {
    /// Report the diagnostics of one finished decode call.
    fn report(&mut self, diagnostics: &Diagnostics);
}

/// Sink that forwards a summary and each anomaly to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn report(&mut self, diagnostics: &Diagnostics) {
        if diagnostics.is_clean() {
            return;
        }
        tracing::warn!(
            context = "decode",
            count = diagnostics.count(),
            "decode finished with parse anomalies"
        );
        for anomaly in diagnostics.anomalies() {
            tracing::warn!(
                context = "decode",
                kind = anomaly.kind.as_str(),
                offset = anomaly.offset,
                depth = anomaly.depth,
                detail = anomaly.detail.as_str(),
                "anomaly"
            );
        }
    }
}

/// Sink that keeps every reported collection, for hosts that render later.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    /// Collections in report order
    pub reports: Vec<Diagnostics>,
}

impl DiagnosticsSink for CollectingSink {
    fn report(&mut self, diagnostics: &Diagnostics) {
        self.reports.push(diagnostics.clone());
    }
}
