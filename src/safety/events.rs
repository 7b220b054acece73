//! Safety event records and the bounded log that holds them.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

/// How serious a recorded safety event is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
    Fatal,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
        Severity::Fatal,
    ];

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry in the safety log.
#[derive(Clone, Debug, PartialEq)]
pub struct SafetyEvent {
    pub severity: Severity,
    pub message: String,
    /// Identifier of the body, ship or subsystem the event concerns.
    pub subject: String,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for SafetyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.severity,
            self.subject,
            self.message
        )
    }
}

/// Per-severity totals since the last reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeverityCounts([u64; 5]);

impl SeverityCounts {
    pub fn get(&self, severity: Severity) -> u64 {
        self.0[severity.index()]
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    fn increment(&mut self, severity: Severity) {
        self.0[severity.index()] += 1;
    }
}

/// Circular buffer of safety events; the oldest entry is dropped on overflow.
#[derive(Clone, Debug)]
pub struct EventLog {
    events: VecDeque<SafetyEvent>,
    capacity: usize,
    counts: SeverityCounts,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            counts: SeverityCounts::default(),
        }
    }

    pub fn push(&mut self, event: SafetyEvent) {
        self.counts.increment(event.severity);
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn counts(&self) -> SeverityCounts {
        self.counts
    }

    /// Up to `n` most recent events, newest last.
    pub fn recent(&self, n: usize) -> Vec<SafetyEvent> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.counts = SeverityCounts::default();
    }
}
