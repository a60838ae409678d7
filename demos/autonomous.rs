//! # Example: autonomous
//!
//! A two-resource robot running a short autonomous routine.
//!
//! Demonstrates how to:
//! - Register resources with [`Runtime::add_resource`] and give one an idle task.
//! - Finish a [`TaskFn`] on a reactive condition.
//! - Chain tasks with [`sequential`] and bound the routine with a timeout.
//! - Watch dispatcher events through the built-in [`LogWriter`].
//!
//! ## Flow
//! ```text
//! activate() ──► drive.idle + arm.idle
//! set_mode(Autonomous)
//! start(routine) ──► preempts both idle tasks
//!     ├─► drive forward until odometry >= 1.0
//!     └─► raise arm for 300 ms
//! routine done ──► resources fall back to their idle tasks
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example autonomous
//! ```

use std::sync::Arc;
use std::time::Duration;

use taskdispatch::{
    Config, DelayTask, LogWriter, Mode, Resource, RuntimeBuilder, Subscribe, TaskError, TaskExt,
    TaskFn, Variable, sequential,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 1. Runtime with the logging subscriber
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let runtime = RuntimeBuilder::new(Config::default())
        .with_subscribers(subs)
        .build();

    // 2. Resources; the drivetrain holds still while nobody drives it
    let drive = Resource::new("drive");
    let arm = Resource::new("arm");
    let odometry = Variable::new(0.0_f64);

    drive.set_idle_task(
        TaskFn::spec("drive.brake", || async { Ok::<_, TaskError>(()) })
            .requires(&drive)
            .with_frequency(0)
            .build(),
    )?;
    runtime.add_resource(&drive)?;
    runtime.add_resource(&arm)?;

    // 3. Routine: drive one meter, then raise the arm
    let pose = odometry.clone();
    let forward = runtime.task(
        TaskFn::spec("drive.forward", move || {
            let pose = pose.clone();
            async move {
                pose.update(|d| d + 0.1);
                Ok::<_, TaskError>(())
            }
        })
        .requires(&drive)
        .with_frequency(20)
        .finish_when(odometry.greater_than(0.99)),
    );
    let raise = runtime.task(
        DelayTask::new(Duration::from_millis(300))
            .into_spec()
            .named("arm.raise")
            .requires(&arm),
    );
    let routine = sequential(vec![forward, raise]).with_timeout(Duration::from_secs(5));

    // 4. Go
    runtime.activate()?;
    runtime.set_mode(Mode::Autonomous);
    runtime.start(&routine)?;
    runtime.sync().await?;
    for allocation in runtime.allocations() {
        println!("{} holds {:?}", allocation.task.name(), allocation.resources.names());
    }

    while runtime.dispatcher().is_allocated(&routine) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        runtime.sync().await?;
    }
    println!("routine finished at {:.1} m", odometry.get());

    runtime.set_mode(Mode::Disabled);
    runtime.shutdown().await?;
    Ok(())
}
