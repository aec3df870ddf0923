//! Per-reel asset writers and the playlist entries they produce.

pub(crate) mod atmos;
pub(crate) mod manifest;
pub(crate) mod picture;
pub(crate) mod sound;
pub(crate) mod text;
pub(crate) mod writer;
