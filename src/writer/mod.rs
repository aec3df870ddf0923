//! Sequencing engine: orders picture units from many producers and assembles the package.

pub(crate) mod digest;
pub(crate) mod engine;
pub(crate) mod queue;
