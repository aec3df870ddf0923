//! Package description, writer options and progress reporting.

pub(crate) mod job;
pub(crate) mod opts;
pub(crate) mod spec;
