//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the dispatcher, the runtime, the
//! mode state machine and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Dispatcher` (allocation changes), `Runtime` (activation,
//!   registration, mode, shutdown), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the runtime's fan-out listener (feeds `SubscriberSet`) and any
//!   receiver obtained from `Runtime::subscribe()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
