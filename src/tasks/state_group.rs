//! Picks a task by the current value of a state source.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::reactive::{Observable, Value};
use crate::tasks::conditional::ConditionalTask;
use crate::tasks::group::sequential;
use crate::tasks::runner::TaskRef;

/// Maps state values to tasks.
///
/// Building yields a sequential group of conditionals `source() == key`, so at
/// most one mapped task runs per start, chosen when its turn comes.
///
/// ```
/// use std::time::Duration;
/// use taskdispatch::{DelayTask, StateGroupBuilder, Variable};
///
/// #[derive(Clone, Copy, PartialEq, Debug)]
/// enum Level { Low, High }
///
/// let target = Variable::new(Level::Low);
/// let task = StateGroupBuilder::from_observable(&target)
///     .map(Level::Low, DelayTask::new(Duration::from_millis(100)).into_spec().build())
///     .map(Level::High, DelayTask::new(Duration::from_millis(400)).into_spec().build())
///     .build();
/// assert_eq!(task.frequency(), 0);
/// ```
pub struct StateGroupBuilder<T> {
    source: Arc<dyn Fn() -> T + Send + Sync>,
    entries: Vec<(T, TaskRef)>,
}

impl<T: Value + fmt::Debug> StateGroupBuilder<T> {
    pub fn new<F>(source: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            source: Arc::new(source),
            entries: Vec::new(),
        }
    }

    pub fn from_observable(source: &Observable<T>) -> Self {
        let source = source.clone();
        Self::new(move || source.get())
    }

    /// Maps `key` to `task`; mapping a key again replaces the earlier task.
    pub fn map(mut self, key: T, task: TaskRef) -> Self {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            warn!(key = ?key, previous = entry.1.name(), "state already mapped; overwriting");
            entry.1 = task;
            return self;
        }
        self.entries.push((key, task));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(self) -> TaskRef {
        let branches = self.entries.into_iter().map(|(key, task)| {
            let source = Arc::clone(&self.source);
            ConditionalTask::new(move || source() == key)
                .when_true(task)
                .into_spec()
                .build()
        });
        sequential(branches.collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Variable;
    use crate::tasks::InstantTask;
    use parking_lot::Mutex;

    fn record(log: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> TaskRef {
        let log = Arc::clone(log);
        InstantTask::new(label, move || {
            log.lock().push(label);
            Ok(())
        })
        .into_spec()
        .build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_only_matching_state() {
        let state = Variable::new(2);
        let log = Arc::new(Mutex::new(Vec::new()));
        let task = StateGroupBuilder::from_observable(&state)
            .map(1, record(&log, "one"))
            .map(2, record(&log, "two"))
            .map(3, record(&log, "three"))
            .build();

        task.start(|| {}).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(task.finish_condition().get());
        task.stop().await.unwrap();
        assert_eq!(*log.lock(), vec!["two"]);
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let builder = StateGroupBuilder::new(|| 'a')
            .map('a', record(&log, "first"))
            .map('a', record(&log, "second"));
        assert_eq!(builder.len(), 1);
        assert_eq!(builder.entries[0].1.name(), "second");
    }
}
