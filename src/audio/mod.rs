//! Audio content model: sample buffers, channel mapping, gain and fade envelopes.

pub(crate) mod buffers;
pub(crate) mod content;
pub(crate) mod fade;
pub(crate) mod mapping;
pub(crate) mod stream;
