//! Decide which channels receive a review event.
//!
//! The table is built once at startup from the channel map and never mutated,
//! so it can be shared across tasks without locking. Matching never fails: a
//! field the event doesn't carry, or a key the map doesn't know, just means
//! no recipients.

pub mod table;

pub use table::RoutingTable;
