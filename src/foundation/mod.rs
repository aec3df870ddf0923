//! Shared value types, time arithmetic, digests and the error taxonomy.

pub(crate) mod core;
pub(crate) mod digest;
pub(crate) mod error;
pub(crate) mod time;
