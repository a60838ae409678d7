//! Error types used by the dispatch runtime and by task hooks.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`]: configuration and usage errors raised by the runtime itself
//!   (resource registration, dispatcher activation, group validation).
//! - [`TaskError`]: errors raised by task hooks (`initialize`/`execute`/`dispose`).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging.

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the dispatch runtime.
///
/// Configuration errors (`RegistrationClosed`, `ResourceConflict`, `IdleTaskMismatch`)
/// are fatal at construction time and never retried. `NotActivated` is a usage
/// error: the rejected call has no effect.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A resource was registered after the dispatcher was activated.
    #[error("cannot register resource '{resource}' after activation")]
    RegistrationClosed {
        /// Name of the rejected resource.
        resource: String,
    },

    /// A task was started before the dispatcher was activated (and debug mode is off).
    #[error("cannot start task '{task}' before the dispatcher is activated")]
    NotActivated {
        /// Name of the rejected task.
        task: String,
    },

    /// The dispatcher (or an idle-task assignment) was touched after activation.
    #[error("runtime already activated")]
    AlreadyActivated,

    /// Two members of a parallel group require the same resource.
    #[error("resource conflict: '{first}' and '{second}' both require '{resource}'")]
    ResourceConflict {
        /// Name of the first conflicting task.
        first: String,
        /// Name of the second conflicting task.
        second: String,
        /// Name of the contested resource.
        resource: String,
    },

    /// An idle task that does not require its own resource was assigned.
    #[error("idle task '{task}' does not require resource '{resource}'")]
    IdleTaskMismatch {
        /// Name of the rejected idle task.
        task: String,
        /// Name of the resource it was assigned to.
        resource: String,
    },

    /// The dispatcher loop is gone (shut down).
    #[error("dispatcher closed")]
    Closed,

    /// Shutdown did not stop every task within the grace period.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of tasks still allocated when the grace period ran out.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use taskdispatch::RuntimeError;
    ///
    /// let err = RuntimeError::NotActivated { task: "drive".into() };
    /// assert_eq!(err.as_label(), "runtime_not_activated");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::RegistrationClosed { .. } => "runtime_registration_closed",
            RuntimeError::NotActivated { .. } => "runtime_not_activated",
            RuntimeError::AlreadyActivated => "runtime_already_activated",
            RuntimeError::ResourceConflict { .. } => "runtime_resource_conflict",
            RuntimeError::IdleTaskMismatch { .. } => "runtime_idle_task_mismatch",
            RuntimeError::Closed => "runtime_closed",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns true for errors that are caused by how the runtime was composed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RuntimeError::RegistrationClosed { .. }
                | RuntimeError::ResourceConflict { .. }
                | RuntimeError::IdleTaskMismatch { .. }
                | RuntimeError::AlreadyActivated
        )
    }
}

/// # Errors produced by task hooks.
///
/// A fault inside a hook is unrecoverable for that run of the task: the runner
/// still disposes the task and then surfaces the error to whoever stopped it.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Non-recoverable fatal error.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Hook failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Hook panicked; the panic was caught by the runner.
    #[error("hook panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Hook observed cancellation and bailed out.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Convenience constructor for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Convenience constructor for [`TaskError::Fatal`].
    ///
    /// Use it for faults that leave the hardware in an unknown state; the
    /// dispatcher reports them at error level.
    pub fn fatal(error: impl Into<String>) -> Self {
        TaskError::Fatal {
            error: error.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, TaskError::Fatal { .. })
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use taskdispatch::TaskError;
    ///
    /// let err = TaskError::fail("encoder unplugged");
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fatal { error } => format!("fatal: {error}"),
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
            TaskError::Canceled => "context cancelled".to_string(),
        }
    }

    /// Builds a [`TaskError::Panicked`] from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        TaskError::Panicked {
            info: panic_message(payload.as_ref()),
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        let conflict = RuntimeError::ResourceConflict {
            first: "a".into(),
            second: "b".into(),
            resource: "arm".into(),
        };
        assert!(conflict.is_configuration());
        assert!(!RuntimeError::NotActivated { task: "t".into() }.is_configuration());
        assert_eq!(conflict.as_label(), "runtime_resource_conflict");
    }

    #[test]
    fn test_fatal_constructor() {
        let err = TaskError::fatal("encoder lost");
        assert!(err.is_fatal());
        assert_eq!(err.as_label(), "task_fatal");
        assert_eq!(err.as_message(), "fatal: encoder lost");
        assert!(!TaskError::fail("retry").is_fatal());
    }

    #[test]
    fn test_panic_payload_rendering() {
        let err = TaskError::from_panic(Box::new("boom"));
        assert_eq!(err, TaskError::Panicked { info: "boom".into() });

        let err = TaskError::from_panic(Box::new(String::from("kaboom")));
        assert_eq!(err.as_message(), "panic: kaboom");

        let err = TaskError::from_panic(Box::new(42_u8));
        assert_eq!(err.as_label(), "task_panicked");
    }
}
