//! Run state shared between the supervisor and its monitor task
//!
//! Every transition happens under the one mutex in [`Shared`]. The lock is a
//! plain `std::sync::Mutex` and is never held across an `.await`.

use super::monitor::ChildHandle;
use crate::readiness::Signal;
use crate::state::LifecycleState;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

/// What a waiting `start()` is woken up with. Only the first non-pending
/// value of a run is kept.
#[derive(Debug, Clone, PartialEq, Eq, strum::EnumIs)]
pub(super) enum Wake {
    Pending,
    Ready,
    Conflict(String),
    Exited(i32),
    Aborted,
}

pub(super) struct Inner {
    pub state: LifecycleState,
    /// Incremented by every start attempt; signals from older runs are dropped
    pub generation: u64,
    pub child: Option<ChildHandle>,
    /// Children that ignored a graceful stop; killed when the supervisor drops
    pub reclaim: Vec<ChildHandle>,
    pub port: Option<u16>,
    pub last_error: Option<String>,
    pub exit_code: Option<i32>,
    pub wake: watch::Sender<Wake>,
}

impl Inner {
    pub fn live_child(&self) -> Option<&ChildHandle> {
        self.child.as_ref().filter(|c| c.is_alive())
    }

    /// Moves Stopped -> Starting and returns the new run's generation and waker.
    pub fn begin_run(&mut self) -> (u64, watch::Receiver<Wake>) {
        self.generation += 1;
        self.state = LifecycleState::Starting;
        self.last_error = None;
        self.exit_code = None;
        self.port = None;
        self.reclaim.retain(ChildHandle::is_alive);
        let (tx, rx) = watch::channel(Wake::Pending);
        self.wake = tx;
        (self.generation, rx)
    }

    /// Publishes the outcome of the current start, unless one was already published.
    pub fn post(&self, wake: Wake) {
        self.wake.send_if_modified(|current| {
            if current.is_pending() {
                *current = wake;
                true
            } else {
                false
            }
        });
    }

    pub fn pending_wake(&self) -> Wake {
        self.wake.borrow().clone()
    }

    pub fn settle_stopped(&mut self) {
        self.state = LifecycleState::Stopped;
        self.child = None;
        self.post(Wake::Aborted);
    }
}

pub(super) struct Shared {
    inner: Mutex<Inner>,
}

impl Shared {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: LifecycleState::Stopped,
                generation: 0,
                child: None,
                reclaim: vec![],
                port: None,
                last_error: None,
                exit_code: None,
                wake: watch::Sender::new(Wake::Pending),
            }),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("web service state mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Readiness callback, invoked by the monitor for the first marker line of a run.
    pub fn on_signal(&self, generation: u64, signal: Signal) {
        let mut inner = self.lock();
        if inner.generation != generation || !inner.state.is_starting() {
            trace!("ignoring {signal:?}: web service is {}", inner.state);
            return;
        }
        match signal {
            Signal::Ready => {
                inner.state = LifecycleState::Started;
                inner.post(Wake::Ready);
            }
            Signal::FatalConflict => {
                let message = match inner.port {
                    Some(port) => format!("web service port {port} is already in use"),
                    None => "web service port is already in use".to_string(),
                };
                error!("{message}");
                inner.last_error = Some(message.clone());
                inner.post(Wake::Conflict(message));
            }
        }
    }

    /// Exit observer: whatever the state, the run is over.
    pub fn on_exit(&self, generation: u64, code: i32) {
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!("ignoring exit of an earlier web service run (rc {code})");
            return;
        }
        inner.exit_code = Some(code);
        inner.child = None;
        inner.state = LifecycleState::Stopped;
        inner.post(Wake::Exited(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_wake_wins() {
        let shared = Shared::new();
        let mut inner = shared.lock();
        let (generation, rx) = inner.begin_run();
        assert_eq!(generation, 1);
        assert!(inner.state.is_starting());

        inner.post(Wake::Conflict("port taken".to_string()));
        inner.post(Wake::Ready);
        assert_eq!(*rx.borrow(), Wake::Conflict("port taken".to_string()));
    }

    #[test]
    fn test_signals_from_older_runs_are_ignored() {
        let shared = Shared::new();
        let (first, _) = shared.lock().begin_run();
        shared.lock().settle_stopped();
        let (second, rx) = shared.lock().begin_run();
        assert_ne!(first, second);

        shared.on_signal(first, Signal::Ready);
        shared.on_exit(first, 1);
        assert!(shared.lock().state.is_starting());
        assert!(rx.borrow().is_pending());

        shared.on_signal(second, Signal::Ready);
        assert!(shared.lock().state.is_started());
        assert_eq!(*rx.borrow(), Wake::Ready);
    }

    #[test]
    fn test_conflict_records_last_error() {
        let shared = Shared::new();
        let (generation, rx) = shared.lock().begin_run();
        shared.lock().port = Some(18083);

        shared.on_signal(generation, Signal::FatalConflict);
        let inner = shared.lock();
        assert!(inner.state.is_starting());
        assert_eq!(
            inner.last_error.as_deref(),
            Some("web service port 18083 is already in use")
        );
        assert!(rx.borrow().is_conflict());
    }

    #[test]
    fn test_exit_settles_stopped() {
        let shared = Shared::new();
        let (generation, rx) = shared.lock().begin_run();
        shared.on_exit(generation, 3);

        let inner = shared.lock();
        assert!(inner.state.is_stopped());
        assert_eq!(inner.exit_code, Some(3));
        assert_eq!(*rx.borrow(), Wake::Exited(3));
    }
}
