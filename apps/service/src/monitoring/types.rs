use std::fmt;

use crate::models::CheckState;

/// Terminal result of a single probe attempt.
///
/// A probe produces exactly one of these; the first terminal event wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The target answered with this status code
    Response { status_code: u16 },
    /// Connection or protocol failure before a response arrived
    NetworkError { message: String },
    /// The check's deadline passed first
    Timeout,
}

impl Outcome {
    pub fn response_code(&self) -> Option<u16> {
        match self {
            Outcome::Response { status_code } => Some(*status_code),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Response { status_code } => write!(f, "status {status_code}"),
            Outcome::NetworkError { message } => write!(f, "network error: {message}"),
            Outcome::Timeout => write!(f, "timeout"),
        }
    }
}

/// State derived from a probe, and whether the owner must hear about it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub new_state: CheckState,
    pub alert_warranted: bool,
}

/// How one check's pipeline ended within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckDisposition {
    /// New state persisted, no alert needed
    Recorded,
    /// New state persisted and the owner was alerted
    Alerted,
    /// New state persisted but the alert could not be delivered
    AlertFailed,
    /// Probe ran but the new state could not be written
    PersistFailed,
    /// Record failed validation
    Rejected,
    /// Record could not be read
    ReadFailed,
    /// A previous cycle is still working on this check
    SkippedInFlight,
}

/// Tally of a cycle's check dispositions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub listing_failed: bool,
    pub listed: usize,
    pub recorded: usize,
    pub alerted: usize,
    pub alert_failed: usize,
    pub persist_failed: usize,
    pub rejected: usize,
    pub read_failed: usize,
    pub skipped_in_flight: usize,
    pub aborted: usize,
}

impl CycleReport {
    pub fn record(&mut self, disposition: CheckDisposition) {
        let counter = match disposition {
            CheckDisposition::Recorded => &mut self.recorded,
            CheckDisposition::Alerted => &mut self.alerted,
            CheckDisposition::AlertFailed => &mut self.alert_failed,
            CheckDisposition::PersistFailed => &mut self.persist_failed,
            CheckDisposition::Rejected => &mut self.rejected,
            CheckDisposition::ReadFailed => &mut self.read_failed,
            CheckDisposition::SkippedInFlight => &mut self.skipped_in_flight,
        };
        *counter += 1;
    }

    /// Checks whose new state reached storage this cycle.
    pub fn persisted(&self) -> usize {
        self.recorded + self.alerted + self.alert_failed
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.listing_failed {
            return write!(f, "listing failed");
        }
        write!(
            f,
            "{} listed, {} persisted ({} alerted, {} alert failures), {} persist failures, \
             {} rejected, {} unreadable, {} in flight, {} aborted",
            self.listed,
            self.persisted(),
            self.alerted,
            self.alert_failed,
            self.persist_failed,
            self.rejected,
            self.read_failed,
            self.skipped_in_flight,
            self.aborted,
        )
    }
}
