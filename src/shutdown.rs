//! Explicit shutdown registration.
//!
//! Nothing is stopped implicitly when the process exits. The host registers
//! each supervisor here and runs the registry on its own shutdown path.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// Something that must be stopped before the host exits.
pub trait Shutdown: Send + Sync {
    fn name(&self) -> String;
    fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

#[derive(Default)]
pub struct ShutdownHooks {
    hooks: Mutex<Vec<Arc<dyn Shutdown>>>,
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, hook: Arc<dyn Shutdown>) {
        debug!("registered shutdown hook: {}", hook.name());
        self.hooks_mut().push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks_mut().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every hook once, most recently registered first. Later calls are no-ops.
    pub async fn run(&self) {
        let hooks = std::mem::take(&mut *self.hooks_mut());
        for hook in hooks.iter().rev() {
            info!("shutting down {}", hook.name());
            hook.shutdown().await;
        }
    }

    fn hooks_mut(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn Shutdown>>> {
        self.hooks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Shutdown for Recorder {
        fn name(&self) -> String {
            self.name.to_string()
        }

        fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
            Box::pin(async move {
                self.log.lock().unwrap().push(self.name);
            })
        }
    }

    #[tokio::test]
    async fn test_hooks_run_once_in_reverse_order() {
        let log = Arc::new(Mutex::new(vec![]));
        let hooks = ShutdownHooks::new();
        assert!(hooks.is_empty());
        for name in ["first", "second"] {
            hooks.register(Arc::new(Recorder {
                name,
                log: log.clone(),
            }));
        }
        assert_eq!(hooks.len(), 2);

        hooks.run().await;
        hooks.run().await;
        assert_eq!(*log.lock().unwrap(), ["second", "first"]);
        assert!(hooks.is_empty());
    }
}
