//! Recovery index: fixed-size per-frame records that let an interrupted build resume.

pub(crate) mod check;
pub(crate) mod frame_info;
pub(crate) mod handle;
