//! Service lifecycle supervisor
//!
//! Runs a fixed set of long-lived units (listeners, background jobs) as
//! independent tasks and drives them through
//! `Starting -> Running -> ShuttingDown -> Stopped`.
//!
//! Shutdown starts on the first of: the external signal, a unit returning an
//! error, a unit panicking, or a unit exiting on its own. Every unit then sees
//! its cancellation token fire and gets its own stop deadline; a unit still
//! running past that deadline is aborted. The first unit failure is kept and
//! returned once every unit has finished.

use anyhow::anyhow;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

type UnitTask = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// One independently running part of the process
///
/// The task receives a token that fires when shutdown begins; it should wind
/// down and return within `stop_deadline`.
pub struct ServiceUnit {
    name: &'static str,
    stop_deadline: Duration,
    task: UnitTask,
}

impl ServiceUnit {
    pub fn new<F, Fut>(name: &'static str, stop_deadline: Duration, task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name,
            stop_deadline,
            task: Box::new(move |token| task(token).boxed()),
        }
    }
}

/// First recorded unit failure wins
#[derive(Default, Clone)]
struct FirstError(Arc<Mutex<Option<anyhow::Error>>>);

impl FirstError {
    fn record(&self, err: anyhow::Error) {
        let mut slot = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn take(&self) -> Option<anyhow::Error> {
        match self.0.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

pub struct Supervisor {
    state: watch::Sender<LifecycleState>,
    shutdown: CancellationToken,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            state,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Cancelling this token requests shutdown. Safe to call any number of times.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn transition(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        info!(from = ?previous, to = ?next, "Lifecycle transition");
    }

    /// Run `units` until `signal` resolves or a unit stops, then shut down
    pub async fn run<S>(self, units: Vec<ServiceUnit>, signal: S) -> anyhow::Result<()>
    where
        S: Future<Output = ()>,
    {
        let first_error = FirstError::default();
        self.transition(LifecycleState::Running);

        let running: Vec<(&'static str, Duration, JoinHandle<()>)> = units
            .into_iter()
            .map(|unit| {
                let handle = tokio::spawn(supervise(
                    unit.name,
                    (unit.task)(self.shutdown.child_token()),
                    self.shutdown.clone(),
                    first_error.clone(),
                ));
                info!(unit = unit.name, "Service unit started");
                (unit.name, unit.stop_deadline, handle)
            })
            .collect();

        tokio::select! {
            _ = signal => info!("Termination signal received"),
            _ = self.shutdown.cancelled() => info!("Shutdown requested"),
        }

        self.transition(LifecycleState::ShuttingDown);
        self.shutdown.cancel();

        join_all(
            running
                .into_iter()
                .map(|(name, deadline, handle)| stop_unit(name, deadline, handle)),
        )
        .await;

        self.transition(LifecycleState::Stopped);

        match first_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Run one unit to completion and turn any way it ends early into a shutdown request
async fn supervise(
    name: &'static str,
    task: BoxFuture<'static, anyhow::Result<()>>,
    shutdown: CancellationToken,
    first_error: FirstError,
) {
    let outcome = AssertUnwindSafe(task).catch_unwind().await;
    let requested = shutdown.is_cancelled();

    match outcome {
        Ok(Ok(())) if requested => info!(unit = name, "Service unit stopped"),
        Ok(Ok(())) => {
            warn!(unit = name, "Service unit exited before shutdown was requested");
            first_error.record(anyhow!("{name} exited unexpectedly"));
        }
        Ok(Err(e)) => {
            error!(unit = name, error = %format!("{e:#}"), "Service unit failed");
            first_error.record(e.context(format!("{name} failed")));
        }
        Err(_) => {
            error!(unit = name, "Service unit panicked");
            first_error.record(anyhow!("{name} panicked"));
        }
    }

    shutdown.cancel();
}

/// Wait for a unit up to its deadline, aborting it past that
async fn stop_unit(name: &'static str, deadline: Duration, mut handle: JoinHandle<()>) {
    match tokio::time::timeout(deadline, &mut handle).await {
        Ok(_) => {}
        Err(_) => {
            warn!(
                unit = name,
                deadline_ms = deadline.as_millis() as u64,
                "Service unit did not stop within its deadline, aborting"
            );
            handle.abort();
            let _ = handle.await;
        }
    }
}
