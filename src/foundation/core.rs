use crate::foundation::error::{DcpError, DcpResult};

/// Frame index. Signed so that `-1` can mean "nothing yet".
pub type Frame = i64;

/// Highest number of audio channels a package can carry.
pub const MAX_DCP_AUDIO_CHANNELS: usize = 16;

/// Which picture channel a frame belongs to.
///
/// The declaration order is the sort order used by the sequencing queue.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Eyes {
    /// 2D picture.
    Both,
    /// Left eye of a stereoscopic pair.
    Left,
    /// Right eye of a stereoscopic pair.
    Right,
}

impl Eyes {
    /// Short lower-case name, used in file names and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl std::fmt::Display for Eyes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> DcpResult<Self> {
        if den == 0 {
            return Err(DcpError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(DcpError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Whole-number rate, as used by DCP edit rates.
    pub fn integer(num: u32) -> DcpResult<Self> {
        Self::new(num, 1)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

impl std::fmt::Display for Fps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
