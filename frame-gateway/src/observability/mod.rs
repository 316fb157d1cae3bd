//! Structured logging vocabulary.
//!
//! Library code emits `tracing` events using the names in [`events`] and the field
//! keys in [`fields`]. Subscribers are installed by binaries and tests only.

pub mod events;
pub mod fields;
