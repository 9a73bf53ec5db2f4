//! Web service lifecycle - start/stop operations
//!
//! `start()` launches the daemon and waits for the first of ready, conflict,
//! exit, abort or the deadline. `stop()` asks the daemon to terminate and
//! polls for its exit within a fixed budget.

use super::WebSrv;
use super::monitor;
use super::state::Wake;
use crate::error::WebSrvError;
use crate::state::LifecycleState;
use crate::{args, locator, ports};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::time;

impl WebSrv {
    /// Starts the web service and waits until it reports readiness.
    ///
    /// Calling this while a run is starting or started logs a warning and
    /// returns `Ok(())` without launching a second process. A stop that is
    /// still in progress is waited out first, and `StillStopping` is returned
    /// if it does not settle. Any other failure leaves the supervisor `Stopped`.
    pub async fn start(&self) -> Result<(), WebSrvError> {
        self.await_stopping().await;
        let (generation, mut wake) = {
            let mut inner = self.shared.lock();
            match inner.state {
                LifecycleState::Stopped => {}
                LifecycleState::Stopping => return Err(WebSrvError::StillStopping),
                state => {
                    warn!("VirtualBox web service is already {state}, not starting another");
                    return Ok(());
                }
            }
            inner.begin_run()
        };

        if let Err(e) = self.launch(generation) {
            self.abandon(generation);
            return Err(e);
        }

        let outcome = match time::timeout(
            self.config.start_timeout,
            wake.wait_for(|w| !w.is_pending()),
        )
        .await
        {
            Ok(Ok(w)) => Some((*w).clone()),
            // the run's waker was replaced, so this run is already over
            Ok(Err(_)) => Some(Wake::Aborted),
            Err(_) => None,
        };
        match outcome {
            Some(wake) => self.settle(wake).await,
            None => self.on_deadline(generation).await,
        }
    }

    /// Gives a concurrent `stop()` its full poll budget to settle.
    async fn await_stopping(&self) {
        let poll = self.config.stop_poll_interval;
        for _ in 0..=self.config.stop_attempts.max(1) {
            if !self.shared.lock().state.is_stopping() {
                return;
            }
            debug!("waiting for the previous web service run to stop");
            time::sleep(poll).await;
        }
    }

    /// Resolves the port, checks the environment and spawns the daemon.
    fn launch(&self, generation: u64) -> Result<(), WebSrvError> {
        let config = &self.config;
        let port = ports::resolve(&config.host, config.port, config.port_attempts)?;
        if !ports::is_port_available(&config.host, port) {
            return Err(WebSrvError::PortInUse {
                host: config.host.clone(),
                port,
            });
        }
        if let Some(tls) = &config.tls {
            tls.validate()?;
        }
        let path = locator::locate(&config.exec_candidates)?;
        let args = args::build(config, port);

        info!(
            "starting VirtualBox web service: {} {}",
            path.display(),
            args.join(" ")
        );
        let child = Command::new(&path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| WebSrvError::Launch {
                path: path.clone(),
                source,
            })?;

        let (handle, monitor) = monitor::attach(child, generation, config.output_log.clone());
        {
            let mut inner = self.shared.lock();
            if inner.generation != generation || !inner.state.is_starting() {
                debug!("start was interrupted before the process was registered");
                // dropping the monitor drops the child, which kills it
                return Err(WebSrvError::StartAborted);
            }
            if let Some(pid) = handle.pid() {
                debug!("VirtualBox web service pid {pid}, port {port}");
            }
            inner.child = Some(handle);
            inner.port = Some(port);
        }
        tokio::spawn(monitor.run(Arc::downgrade(&self.shared)));
        Ok(())
    }

    /// Rolls a failed launch back to Stopped, unless a newer run took over.
    fn abandon(&self, generation: u64) {
        let mut inner = self.shared.lock();
        if inner.generation == generation && inner.state.is_starting() {
            inner.settle_stopped();
        }
    }

    async fn settle(&self, wake: Wake) -> Result<(), WebSrvError> {
        match wake {
            Wake::Ready => {
                info!("VirtualBox web service is ready");
                Ok(())
            }
            Wake::Conflict(message) => {
                self.stop().await;
                Err(WebSrvError::StartupConflict { message })
            }
            Wake::Exited(code) => {
                error!("VirtualBox web service exited during startup with rc {code}");
                Err(WebSrvError::UnexpectedExit { code })
            }
            Wake::Pending | Wake::Aborted => Err(WebSrvError::StartAborted),
        }
    }

    /// No signal arrived in time. An outcome posted while the deadline fired
    /// still decides the run; otherwise an occupied port is taken to mean the
    /// daemon is up but printed nothing recognizable.
    async fn on_deadline(&self, generation: u64) -> Result<(), WebSrvError> {
        let late = {
            let mut inner = self.shared.lock();
            let port = inner.port;
            if inner.generation != generation {
                Some(Wake::Aborted)
            } else if !inner.pending_wake().is_pending() {
                Some(inner.pending_wake())
            } else {
                match port {
                    Some(port)
                        if inner.state.is_starting()
                            && !ports::is_port_available(&self.config.host, port) =>
                    {
                        warn!(
                            "no readiness message from the web service, but port {port} is in use; assuming started"
                        );
                        inner.state = LifecycleState::Started;
                        inner.post(Wake::Ready);
                        Some(Wake::Ready)
                    }
                    _ => None,
                }
            }
        };
        if let Some(wake) = late {
            return self.settle(wake).await;
        }
        self.stop().await;
        Err(WebSrvError::StartTimeout {
            timeout: self.config.start_timeout,
        })
    }

    /// Stops the web service. Never fails; always ends `Stopped`.
    ///
    /// A process that outlives the poll budget is killed when the supervisor
    /// is dropped.
    pub async fn stop(&self) {
        let (generation, mut exit) = {
            let mut inner = self.shared.lock();
            if inner.state.is_stopped() {
                debug!("VirtualBox web service is not running, nothing to stop");
                return;
            }
            if inner.state.is_starting() {
                inner.post(Wake::Aborted);
            }
            let exit = inner.live_child().map(|child| {
                child.terminate();
                child.exit()
            });
            let Some(exit) = exit else {
                inner.settle_stopped();
                return;
            };
            inner.state = LifecycleState::Stopping;
            (inner.generation, exit)
        };

        info!("stopping VirtualBox web service");
        let attempts = self.config.stop_attempts;
        let poll = self.config.stop_poll_interval;
        let mut exited = false;
        for attempt in 1..=attempts.max(1) {
            exited = matches!(
                time::timeout(poll, exit.wait_for(Option::is_some)).await,
                Ok(_)
            );
            if exited {
                break;
            }
            debug!("waiting for the web service to exit ({attempt}/{attempts})");
        }

        let mut inner = self.shared.lock();
        if inner.generation != generation {
            return;
        }
        if !exited && let Some(child) = inner.child.take() {
            warn!(
                "VirtualBox web service pid {} did not exit after {attempts} attempts, it will be killed on shutdown",
                child.pid().map_or_else(|| "?".to_string(), |p| p.to_string())
            );
            inner.reclaim.push(child);
        }
        if !inner.state.is_stopped() {
            inner.settle_stopped();
        }
    }

    /// Forcibly kills the running process. The exit observer settles the state.
    pub fn kill(&self) -> Result<(), WebSrvError> {
        let inner = self.shared.lock();
        let child = inner.live_child().ok_or(WebSrvError::NotRunning)?;
        info!("killing VirtualBox web service");
        child.kill();
        Ok(())
    }

    /// Waits for the running process to exit on its own and returns its exit code.
    pub async fn wait_exit(&self) -> Result<i32, WebSrvError> {
        let mut exit = {
            let inner = self.shared.lock();
            inner
                .live_child()
                .ok_or(WebSrvError::NotRunning)?
                .exit()
        };
        let code = match exit.wait_for(Option::is_some).await {
            Ok(code) => (*code).unwrap_or(-1),
            Err(_) => -1,
        };
        Ok(code)
    }
}
