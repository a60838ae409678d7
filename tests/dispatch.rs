mod common;

use std::time::Duration;

use common::{log, recording, runtime, settle};
use taskdispatch::{EventKind, InstantTask, Resource, ResourceSet, RuntimeError};

#[tokio::test]
async fn test_allocations_disjoint_and_covering() {
    let rt = runtime();
    let (a, b, c) = (Resource::new("a"), Resource::new("b"), Resource::new("c"));
    for r in [&a, &b, &c] {
        rt.add_resource(r).unwrap();
    }
    let trace = log();
    let ab = rt.task(recording("ab", &trace).requires(&a).requires(&b));
    let bc = rt.task(recording("bc", &trace).requires(&b).requires(&c));
    rt.activate().unwrap();

    rt.start(&ab).unwrap();
    rt.start(&bc).unwrap();
    settle(&rt).await;

    let allocations = rt.allocations();
    for (i, x) in allocations.iter().enumerate() {
        for y in &allocations[i + 1..] {
            assert!(!x.resources.intersects(&y.resources), "{x:?} overlaps {y:?}");
        }
    }
    let mut covered = ResourceSet::new();
    for allocation in &allocations {
        covered.extend(&allocation.resources);
    }
    assert_eq!(covered.len(), 3);

    assert!(rt.dispatcher().is_allocated(&bc));
    assert!(!rt.dispatcher().is_allocated(&ab));
    assert_eq!(rt.dispatcher().owner_of(a.id()).unwrap().id(), a.idle_task().id());
    rt.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_preempted_task_disposed_before_new_initialize() {
    let rt = runtime();
    let arm = Resource::new("arm");
    rt.add_resource(&arm).unwrap();
    let trace = log();
    let first = rt.task(recording("first", &trace).requires(&arm));
    let second = rt.task(recording("second", &trace).requires(&arm));
    rt.activate().unwrap();

    rt.start(&first).unwrap();
    rt.start(&second).unwrap();
    settle(&rt).await;

    assert_eq!(
        *trace.lock(),
        vec!["first.init", "first.dispose", "second.init"]
    );
    rt.shutdown().await.unwrap();
    assert_eq!(trace.lock().last().map(String::as_str), Some("second.dispose"));
}

#[tokio::test]
async fn test_finished_task_returns_resource_to_idle() {
    let rt = runtime();
    let gyro = Resource::new("gyro");
    rt.add_resource(&gyro).unwrap();
    let reset = rt.task(InstantTask::new("reset", || Ok(())).into_spec().requires(&gyro));
    rt.activate().unwrap();

    rt.start(&reset).unwrap();
    settle(&rt).await;

    assert!(!rt.dispatcher().is_allocated(&reset));
    assert!(gyro.idle_task().is_running());
    rt.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_start_before_activate_is_rejected() {
    let rt = runtime();
    let arm = Resource::new("arm");
    rt.add_resource(&arm).unwrap();
    let trace = log();
    let task = rt.task(recording("early", &trace).requires(&arm));

    assert!(matches!(
        rt.start(&task),
        Err(RuntimeError::NotActivated { .. })
    ));

    rt.activate().unwrap();
    settle(&rt).await;
    assert!(trace.lock().is_empty());
    assert!(!rt.dispatcher().is_allocated(&task));
    rt.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_registration_closed_after_activate() {
    let rt = runtime();
    rt.add_resource(&Resource::new("drive")).unwrap();
    rt.activate().unwrap();

    let late = Resource::new("late");
    assert_eq!(
        rt.add_resource(&late),
        Err(RuntimeError::RegistrationClosed {
            resource: "late".into()
        })
    );
    assert_eq!(rt.activate(), Err(RuntimeError::AlreadyActivated));
    rt.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_preemption_is_published() {
    let rt = runtime();
    let arm = Resource::new("arm");
    rt.add_resource(&arm).unwrap();
    let trace = log();
    let first = rt.task(recording("first", &trace).requires(&arm));
    let second = rt.task(recording("second", &trace).requires(&arm));
    rt.activate().unwrap();
    let mut events = rt.subscribe();

    rt.start(&first).unwrap();
    rt.start(&second).unwrap();
    settle(&rt).await;

    let preempted = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let ev = events.recv().await.expect("bus open");
            if ev.kind == EventKind::TaskPreempted && ev.task.as_deref() == Some("first") {
                return ev;
            }
        }
    })
    .await
    .expect("preemption event");
    assert_eq!(preempted.reason.as_deref(), Some("second"));
    assert_eq!(preempted.resource.as_deref(), Some("arm"));
    rt.shutdown().await.unwrap();
}
