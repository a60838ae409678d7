//! # TaskRunner: lifecycle of one task.
//!
//! Owns a task body and drives it through
//! `Idle → Initializing → Running → Disposing → Idle`. A runner can be started
//! any number of times; each start is a new **generation**.
//!
//! ## Start
//! ```text
//! start(on_finished)
//!   ├─► initialize ── Err ──► record fault, on_finished()
//!   ├─► finish already true? ──► on_finished(), no execute loop
//!   ├─► one-shot finish listener ──► on_finished()
//!   └─► frequency > 0? ──► spawn periodic execute ── Err ──► on_finished()
//! ```
//!
//! ## Stop
//! ```text
//! stop()
//!   ├─► bump generation (stale on_finished never fires)
//!   ├─► cancel token, join execute loop (waits for in-flight tick)
//!   ├─► dispose finish listener
//!   ├─► dispose hook
//!   └─► return first fault (initialize / execute / dispose)
//! ```
//!
//! ## Rules
//! - `on_finished` fires at most once per generation.
//! - `stop` on an idle runner is a no-op returning `Ok(())`.
//! - `start` on a running runner stops it first (restart).
//! - Panics in hooks are caught and reported as [`TaskError::Panicked`].

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::TaskError;
use crate::periodic;
use crate::reactive::{Observable, ObserverHandle};
use crate::resources::ResourceSet;
use crate::tasks::task::Task;

static TASK_SEQ: AtomicU64 = AtomicU64::new(1);

/// Shared handle to a built task.
pub type TaskRef = Arc<TaskRunner>;

/// Process-unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        Self(TASK_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Lifecycle phase of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Initializing,
    Running,
    Disposing,
}

/// Fires the start callback once, and only for the generation that registered it.
struct Completion {
    generation: Arc<AtomicU64>,
    expected: u64,
    callback: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Completion {
    fn fire(&self) {
        if self.generation.load(Ordering::Acquire) != self.expected {
            return;
        }
        let callback = self.callback.lock().take();
        if let Some(callback) = callback {
            callback();
        }
    }
}

struct Run {
    token: CancellationToken,
    job: Option<JoinHandle<Result<(), TaskError>>>,
    listener: Option<ObserverHandle>,
    fault: Option<TaskError>,
}

/// A built task: body plus scheduling metadata plus lifecycle state.
pub struct TaskRunner {
    id: TaskId,
    name: Arc<str>,
    body: Arc<dyn Task>,
    required: ResourceSet,
    finish: Observable<bool>,
    frequency: u32,
    lifecycle: Mutex<Lifecycle>,
    generation: Arc<AtomicU64>,
    run: tokio::sync::Mutex<Option<Run>>,
}

impl TaskRunner {
    pub(crate) fn new(
        name: String,
        body: Arc<dyn Task>,
        required: ResourceSet,
        finish: Observable<bool>,
        frequency: u32,
    ) -> Self {
        Self {
            id: TaskId::next(),
            name: Arc::from(name),
            body,
            required,
            finish,
            frequency,
            lifecycle: Mutex::new(Lifecycle::Idle),
            generation: Arc::new(AtomicU64::new(0)),
            run: tokio::sync::Mutex::new(None),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required(&self) -> &ResourceSet {
        &self.required
    }

    pub fn finish_condition(&self) -> &Observable<bool> {
        &self.finish
    }

    /// Execution frequency in Hz (`0` = no periodic `execute`).
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock()
    }

    /// True between `start` and the end of `stop`.
    pub fn is_running(&self) -> bool {
        matches!(
            self.lifecycle(),
            Lifecycle::Initializing | Lifecycle::Running
        )
    }

    /// Starts a new run; `on_finished` fires once when the task is done.
    ///
    /// Returns after `initialize` completed. "Done" means the finish condition became
    /// true, or a hook failed. The callback never fires after a later `stop`/`start`.
    pub async fn start<F>(&self, on_finished: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = self.run.lock().await;
        if slot.is_some() {
            warn!(task = %self.name, "start requested while running; restarting");
            if let Err(err) = self.stop_locked(&mut slot).await {
                warn!(task = %self.name, error = %err, "previous run ended with a fault");
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let completion = Arc::new(Completion {
            generation: Arc::clone(&self.generation),
            expected: generation,
            callback: Mutex::new(Some(Box::new(on_finished))),
        });
        let token = CancellationToken::new();
        let mut run = Run {
            token: token.clone(),
            job: None,
            listener: None,
            fault: None,
        };

        self.set_lifecycle(Lifecycle::Initializing);
        debug!(task = %self.name, generation, "initializing");

        if let Err(err) = guarded(self.body.initialize()).await {
            warn!(task = %self.name, error = %err, "initialize failed");
            run.fault = Some(err);
            self.set_lifecycle(Lifecycle::Running);
            *slot = Some(run);
            completion.fire();
            return;
        }
        self.set_lifecycle(Lifecycle::Running);

        if self.finish.get() {
            debug!(task = %self.name, "finish condition already true");
            *slot = Some(run);
            completion.fire();
            return;
        }

        let on_finish = Arc::clone(&completion);
        run.listener = Some(self.finish.invoke_once_when_true(move || on_finish.fire()));

        if self.frequency > 0 {
            let body = Arc::clone(&self.body);
            let name = Arc::clone(&self.name);
            let frequency = self.frequency;
            let on_fault = Arc::clone(&completion);
            run.job = Some(tokio::spawn(async move {
                let res = periodic::run(frequency, token, || guarded(body.execute())).await;
                if let Err(err) = &res {
                    warn!(task = %name, error = %err, "execute failed; ending run");
                    on_fault.fire();
                }
                res
            }));
        }
        *slot = Some(run);
    }

    /// Stops the current run, waiting for the in-flight `execute` and running `dispose`.
    ///
    /// Returns the first fault raised by any hook during this run.
    pub async fn stop(&self) -> Result<(), TaskError> {
        let mut slot = self.run.lock().await;
        self.stop_locked(&mut slot).await
    }

    async fn stop_locked(&self, slot: &mut Option<Run>) -> Result<(), TaskError> {
        let Some(run) = slot.take() else {
            return Ok(());
        };
        self.generation.fetch_add(1, Ordering::AcqRel);
        run.token.cancel();

        let mut outcome = run.fault.map_or(Ok(()), Err);
        if let Some(job) = run.job {
            let joined = match job.await {
                Ok(res) => res,
                Err(err) if err.is_panic() => Err(TaskError::from_panic(err.into_panic())),
                Err(_) => Err(TaskError::Canceled),
            };
            outcome = outcome.and(joined);
        }
        if let Some(listener) = run.listener {
            listener.dispose();
        }

        self.set_lifecycle(Lifecycle::Disposing);
        debug!(task = %self.name, "disposing");
        let disposed = guarded(self.body.dispose()).await;
        self.set_lifecycle(Lifecycle::Idle);

        if let Err(err) = &disposed {
            warn!(task = %self.name, error = %err, "dispose failed");
        }
        outcome.and(disposed)
    }

    fn set_lifecycle(&self, next: Lifecycle) {
        *self.lifecycle.lock() = next;
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        if let Some(run) = self.run.get_mut() {
            run.token.cancel();
        }
    }
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("required", &self.required)
            .field("frequency", &self.frequency)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

/// Awaits a hook, turning a panic into [`TaskError::Panicked`].
async fn guarded<Fut>(hook: Fut) -> Result<(), TaskError>
where
    Fut: Future<Output = Result<(), TaskError>>,
{
    match AssertUnwindSafe(hook).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => Err(TaskError::from_panic(payload)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Variable;
    use crate::tasks::TaskSpec;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct Fixture {
        log: Arc<Mutex<Vec<&'static str>>>,
        ticks: Arc<AtomicUsize>,
        fail_init: bool,
        panic_execute: bool,
        slow_execute: Option<Duration>,
    }

    #[async_trait]
    impl Task for Fixture {
        async fn initialize(&self) -> Result<(), TaskError> {
            self.log.lock().push("init");
            if self.fail_init {
                return Err(TaskError::fail("no encoder"));
            }
            Ok(())
        }

        async fn execute(&self) -> Result<(), TaskError> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            if self.panic_execute {
                panic!("motor stalled");
            }
            if let Some(pause) = self.slow_execute {
                self.log.lock().push("execute.start");
                tokio::time::sleep(pause).await;
                self.log.lock().push("execute.end");
            }
            Ok(())
        }

        async fn dispose(&self) -> Result<(), TaskError> {
            self.log.lock().push("dispose");
            Ok(())
        }
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_then_finish_condition_fires_callback() {
        let done = Variable::new(false);
        let fixture = Fixture::default();
        let ticks = Arc::clone(&fixture.ticks);
        let task = TaskSpec::new(fixture)
            .finish_when(&done)
            .with_frequency(10)
            .build();

        let (fired, on_finished) = counter();
        task.start(on_finished).await;
        assert_eq!(task.lifecycle(), Lifecycle::Running);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(ticks.load(Ordering::SeqCst) >= 1);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        done.set(true);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert!(task.stop().await.is_ok());
        assert_eq!(task.lifecycle(), Lifecycle::Idle);
    }

    #[tokio::test]
    async fn test_already_finished_skips_execute() {
        let fixture = Fixture::default();
        let ticks = Arc::clone(&fixture.ticks);
        let task = TaskSpec::new(fixture).finish_when(true).build();

        let (fired, on_finished) = counter();
        task.start(on_finished).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        task.stop().await.unwrap();
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_on_idle_is_noop() {
        let fixture = Fixture::default();
        let log = Arc::clone(&fixture.log);
        let task = TaskSpec::new(fixture).build();
        assert!(task.stop().await.is_ok());
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_fault_surfaces_from_stop() {
        let fixture = Fixture {
            fail_init: true,
            ..Fixture::default()
        };
        let log = Arc::clone(&fixture.log);
        let task = TaskSpec::new(fixture).build();

        let (fired, on_finished) = counter();
        task.start(on_finished).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let res = task.stop().await;
        assert_eq!(res, Err(TaskError::fail("no encoder")));
        assert_eq!(*log.lock(), vec!["init", "dispose"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_panic_is_caught() {
        let fixture = Fixture {
            panic_execute: true,
            ..Fixture::default()
        };
        let task = TaskSpec::new(fixture).build();

        let (fired, on_finished) = counter();
        task.start(on_finished).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        match task.stop().await {
            Err(TaskError::Panicked { info }) => assert_eq!(info, "motor stalled"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stale_callback_never_fires_into_next_run() {
        let done = Variable::new(false);
        let task = TaskSpec::new(Fixture::default())
            .finish_when(&done)
            .with_frequency(0)
            .build();

        let (first, on_first) = counter();
        task.start(on_first).await;
        task.stop().await.unwrap();

        let (second, on_second) = counter();
        task.start(on_second).await;
        done.set(true);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        task.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_disposes_previous_run() {
        let fixture = Fixture::default();
        let log = Arc::clone(&fixture.log);
        let task = TaskSpec::new(fixture).with_frequency(0).build();

        task.start(|| {}).await;
        task.start(|| {}).await;
        task.stop().await.unwrap();
        assert_eq!(*log.lock(), vec!["init", "dispose", "init", "dispose"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_in_flight_execute() {
        let fixture = Fixture {
            slow_execute: Some(Duration::from_millis(50)),
            ..Fixture::default()
        };
        let log = Arc::clone(&fixture.log);
        let task = TaskSpec::new(fixture).with_frequency(100).build();

        task.start(|| {}).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*log.lock(), vec!["init", "execute.start"]);

        task.stop().await.unwrap();
        assert_eq!(
            *log.lock(),
            vec!["init", "execute.start", "execute.end", "dispose"]
        );
    }
}
