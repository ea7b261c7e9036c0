//! Render review events into IRC messages.
//!
//! One event becomes zero or more `(channel, text)` notifications: the base
//! message per recipient channel, plus approval-threshold extras for
//! comment-added events. A record missing a field a message needs drops that
//! message (logged), never the stream.

pub mod render;

pub use render::{Notification, render};
