//! Parley - direct messaging with live push and read receipts.
//!
//! The server stores messages, fans new messages and read marks out over an
//! in-process event bus to per-connection live channels, and serves
//! cursor-paginated history. The client reconciler merges history pages and
//! pushed events into one deduplicated, newest-first view and refetches when
//! the live channel reports lost events.

pub mod adapters;
pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
