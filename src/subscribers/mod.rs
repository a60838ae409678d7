//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! built-in implementations for handling events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//!   Dispatcher ── publish(Event) ──► Bus ──► runtime listener ──► SubscriberSet::emit
//!                                                                      │
//!                                              ┌───────────────┬───────┴───────┐
//!                                              ▼               ▼               ▼
//!                                          LogWriter        Custom           ...
//! ```

mod embedded;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
