//! Readiness detection from the web service's own log output.
//!
//! `vboxwebsrv` has no health endpoint, so the only signal available is the
//! text it prints. The markers below are tied to the daemon's log format and
//! are the place to update if a VirtualBox release rewords them.

/// Printed once the SOAP listener socket is bound.
pub const READY_MARKER: &str = "Socket connection successful: ";
/// Printed when the listener cannot bind because the port is taken.
pub const ADDRESS_IN_USE_MARKER: &str = "#### SOAP FAULT: Address already in use [detected]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Ready,
    FatalConflict,
}

/// Scans output lines for the first lifecycle signal of a run.
#[derive(Debug, Default)]
pub struct ReadinessDetector {
    fired: Option<Signal>,
}

impl ReadinessDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a signal for the first matching line only; later matches are ignored.
    pub fn observe(&mut self, line: &str) -> Option<Signal> {
        if self.fired.is_some() {
            return None;
        }
        let signal = scan(line)?;
        self.fired = Some(signal);
        Some(signal)
    }
}

pub fn scan(line: &str) -> Option<Signal> {
    if line.contains(READY_MARKER) {
        Some(Signal::Ready)
    } else if line.contains(ADDRESS_IN_USE_MARKER) {
        Some(Signal::FatalConflict)
    } else {
        None
    }
}
