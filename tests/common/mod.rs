#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use taskdispatch::{Config, Runtime, RuntimeBuilder, Task, TaskError, TaskRef, TaskSpec};
use tokio::sync::oneshot;

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

/// Records `init` / `dispose` of a named task; never finishes by itself.
pub struct Recording {
    name: &'static str,
    log: Log,
}

#[async_trait]
impl Task for Recording {
    fn name(&self) -> &str {
        self.name
    }

    async fn initialize(&self) -> Result<(), TaskError> {
        self.log.lock().push(format!("{}.init", self.name));
        Ok(())
    }

    async fn dispose(&self) -> Result<(), TaskError> {
        self.log.lock().push(format!("{}.dispose", self.name));
        Ok(())
    }
}

pub fn recording(name: &'static str, log: &Log) -> TaskSpec {
    TaskSpec::new(Recording {
        name,
        log: Arc::clone(log),
    })
    .with_frequency(0)
}

/// Routes `tracing` output to the test harness; set `RUST_LOG` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn runtime() -> Arc<Runtime> {
    init_tracing();
    RuntimeBuilder::new(Config::default()).build()
}

/// Starts `task` outside the dispatcher and waits for its completion callback.
pub async fn run_to_completion(task: &TaskRef, limit: Duration) -> bool {
    let (tx, rx) = oneshot::channel();
    task.start(move || {
        let _ = tx.send(());
    })
    .await;
    tokio::time::timeout(limit, rx).await.is_ok()
}

/// Waits until the dispatcher has processed everything, including the stop
/// requests posted by completion callbacks of the previous round.
pub async fn settle(rt: &Runtime) {
    for _ in 0..3 {
        rt.sync().await.expect("dispatcher alive");
        tokio::task::yield_now().await;
    }
}
