mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use common::{Log, log, runtime};
use taskdispatch::{EventKind, Mode, Resource, ResourceHooks, Variable};

struct Recorder {
    name: &'static str,
    log: Log,
}

impl Recorder {
    fn push(&self, hook: &str) {
        self.log.lock().push(format!("{}.{hook}", self.name));
    }
}

impl ResourceHooks for Recorder {
    fn late_init(&self) {
        self.push("late_init");
    }

    fn auto_reset(&self) {
        self.push("auto_reset");
    }

    fn teleop_reset(&self) {
        self.push("teleop_reset");
    }

    fn zero_outputs(&self) {
        self.push("zero_outputs");
    }
}

#[tokio::test]
async fn test_resource_hooks_follow_registration_order() {
    let rt = runtime();
    let trace = log();
    for name in ["drive", "arm"] {
        let resource = Resource::with_hooks(
            name,
            Recorder {
                name,
                log: Arc::clone(&trace),
            },
        );
        rt.add_resource(&resource).unwrap();
    }

    rt.activate().unwrap();
    rt.set_mode(Mode::Autonomous);
    rt.set_mode(Mode::Teleop);
    rt.set_mode(Mode::Disabled);

    assert_eq!(
        *trace.lock(),
        vec![
            "drive.late_init",
            "arm.late_init",
            "drive.auto_reset",
            "arm.auto_reset",
            "drive.teleop_reset",
            "arm.teleop_reset",
            "drive.zero_outputs",
            "arm.zero_outputs",
        ]
    );
    rt.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_mode_change_published() {
    let rt = runtime();
    let mut events = rt.subscribe();

    assert!(rt.set_mode(Mode::Teleop));
    assert!(!rt.set_mode(Mode::Teleop));
    assert_eq!(rt.mode(), Mode::Teleop);
    assert_eq!(rt.state_machine().current(), Mode::Teleop);

    let ev = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("event in time")
        .expect("bus open");
    assert_eq!(ev.kind, EventKind::ModeChanged);
    assert_eq!(ev.reason.as_deref(), Some("None -> Teleop"));
}

#[tokio::test]
async fn test_user_callbacks_share_mode_machine() {
    let rt = runtime();
    let order = log();

    let o = Arc::clone(&order);
    rt.state_machine()
        .on_leave([Mode::Disabled], move |_| o.lock().push("leave".into()));
    let o = Arc::clone(&order);
    rt.state_machine()
        .on_transition([Mode::Disabled], [Mode::Autonomous], move |_, _| {
            o.lock().push("transition".into())
        });
    let o = Arc::clone(&order);
    rt.state_machine()
        .on_enter([Mode::Autonomous], move |_| o.lock().push("enter".into()));

    rt.set_mode(Mode::Disabled);
    rt.set_mode(Mode::Autonomous);
    assert_eq!(*order.lock(), vec!["leave", "transition", "enter"]);
}

#[test]
fn test_lazy_wiring_activates_upstream_once() {
    let wired = Arc::new(AtomicUsize::new(0));
    let source = Variable::new(2);
    let w = Arc::clone(&wired);
    source.on_first_use(move || {
        w.fetch_add(1, Ordering::SeqCst);
    });

    let doubled = source.map(|v| v * 2);
    let above = doubled.greater_than(5);
    assert_eq!(wired.load(Ordering::SeqCst), 0);

    assert!(!above.get());
    assert_eq!(wired.load(Ordering::SeqCst), 1);

    source.set(3);
    assert!(above.get());
    assert_eq!(doubled.get(), 6);
    assert_eq!(wired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sampled_source_refreshes() {
    let rt = runtime();
    let counter = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&counter);
    let reading = rt.sample(move || c.load(Ordering::SeqCst));

    let seen = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&seen);
    let _handle = reading.on_change(move |_| {
        s.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(reading.get(), 0);

    counter.store(7, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(reading.get(), 7);
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}
