use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::foundation::core::{Eyes, Fps, Frame, MAX_DCP_AUDIO_CHANNELS};
use crate::foundation::digest::{Fingerprint, StableHasher};
use crate::foundation::error::{DcpError, DcpResult};
use crate::foundation::time::{DcpTime, TimePeriod};

fn default_audio_frame_rate() -> u32 {
    48_000
}

/// Everything the writer needs to know about the package being built.
///
/// The surrounding project model resolves timelines and rates; this is the flattened result.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PackageSpec {
    /// Human-readable package name, written into the composition playlist.
    pub name: String,
    /// Working directory holding internal assets, recovery indices and spill files.
    pub directory: PathBuf,
    /// Picture edit rate.
    pub video_frame_rate: Fps,
    /// Stereoscopic picture.
    #[serde(default)]
    pub three_d: bool,
    /// Number of sound channels in the package.
    pub audio_channels: usize,
    /// Sound sample rate.
    #[serde(default = "default_audio_frame_rate")]
    pub audio_frame_rate: u32,
    /// Reel plan: contiguous, non-empty periods in timeline order.
    pub reels: Vec<TimePeriod>,
    /// Description of every parameter that affects picture output (sources, crop, scale, ...).
    pub video_identifier: String,
    /// Closed-caption track names.
    #[serde(default)]
    pub closed_caption_tracks: Vec<String>,
}

impl PackageSpec {
    /// Parse a spec from JSON.
    pub fn from_reader(r: impl Read) -> DcpResult<Self> {
        serde_json::from_reader(r).map_err(|e| DcpError::serde(e.to_string()))
    }

    /// Parse a spec from a JSON file.
    pub fn from_path(path: &Path) -> DcpResult<Self> {
        let f = File::open(path).map_err(|e| DcpError::io(path, "open package spec", e))?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check the spec is self-consistent.
    pub fn validate(&self) -> DcpResult<()> {
        if self.name.trim().is_empty() {
            return Err(DcpError::validation("package name must be non-empty"));
        }
        Fps::new(self.video_frame_rate.num, self.video_frame_rate.den)?;
        if self.audio_channels == 0 || self.audio_channels > MAX_DCP_AUDIO_CHANNELS {
            return Err(DcpError::validation(format!(
                "audio_channels must be in 1..={MAX_DCP_AUDIO_CHANNELS}"
            )));
        }
        if self.audio_frame_rate == 0 {
            return Err(DcpError::validation("audio_frame_rate must be > 0"));
        }
        if self.reels.is_empty() {
            return Err(DcpError::validation("at least one reel is required"));
        }
        let fps = self.fps();
        for (i, reel) in self.reels.iter().enumerate() {
            if reel.from.get() < 0 || reel.to <= reel.from {
                return Err(DcpError::validation(format!("reel {i} has an empty period")));
            }
            for t in [reel.from, reel.to] {
                if DcpTime::from_frames(t.frames_round(fps), fps) != t {
                    return Err(DcpError::validation(format!(
                        "reel {i} boundary {} is not on a frame edge",
                        t.get()
                    )));
                }
            }
            if i > 0 && self.reels[i - 1].to != reel.from {
                return Err(DcpError::validation(format!(
                    "reel {i} does not start where reel {} ends",
                    i - 1
                )));
            }
        }
        Ok(())
    }

    /// Picture rate as a float.
    pub fn fps(&self) -> f64 {
        self.video_frame_rate.as_f64()
    }

    /// Number of picture frames in `period`.
    pub fn frames_in(&self, period: TimePeriod) -> Frame {
        period.duration().frames_round(self.fps())
    }

    /// Picture channels a frame has in this package.
    pub fn eyes(&self) -> &'static [Eyes] {
        if self.three_d {
            &[Eyes::Left, Eyes::Right]
        } else {
            &[Eyes::Both]
        }
    }

    /// Picture units (frames times eyes) across all reels.
    pub fn total_picture_units(&self) -> u64 {
        let frames: Frame = self.reels.iter().map(|r| self.frames_in(*r)).sum();
        frames as u64 * self.eyes().len() as u64
    }

    /// Fingerprint of the parameters that decide the picture bytes of `period`.
    pub fn picture_fingerprint(&self, period: TimePeriod) -> Fingerprint {
        let mut h = StableHasher::new();
        h.write_str(&self.video_identifier);
        h.write_i64(period.from.get());
        h.write_i64(period.to.get());
        h.write_bool(self.three_d);
        h.write_u32(self.video_frame_rate.num);
        h.write_u32(self.video_frame_rate.den);
        h.finish()
    }

    /// Identity of the picture asset for `period`; stable while the picture parameters are.
    pub fn picture_asset_id(&self, period: TimePeriod) -> uuid::Uuid {
        let bytes = self.picture_fingerprint(period).as_u128().to_be_bytes();
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }

    /// Directory of internal picture assets.
    pub fn video_dir(&self) -> PathBuf {
        self.directory.join("video")
    }

    /// File name of the internal picture asset for `period`.
    pub fn video_filename(&self, period: TimePeriod) -> String {
        format!(
            "{}_{}_{}.pic",
            self.picture_fingerprint(period).to_hex(),
            period.from.get(),
            period.to.get()
        )
    }

    /// Full path of the internal picture asset for `period`.
    pub fn video_path(&self, period: TimePeriod) -> PathBuf {
        self.video_dir().join(self.video_filename(period))
    }

    /// Recovery index for `period`.
    pub fn info_file(&self, period: TimePeriod) -> PathBuf {
        self.directory.join("info").join(format!(
            "{}_{}_{}",
            self.picture_fingerprint(period).to_hex(),
            period.from.get(),
            period.to.get()
        ))
    }

    /// Spill file for a frame that had to leave memory before it could be written.
    pub fn j2c_path(&self, reel: usize, frame: Frame, eyes: Eyes) -> PathBuf {
        self.directory
            .join("j2c")
            .join(format!("{reel}_{frame:06}_{eyes}.j2c"))
    }

    /// Scratch directory for per-reel sound and auxiliary assets.
    pub fn scratch_dir(&self) -> PathBuf {
        self.directory.join("scratch")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/package/spec.rs"]
mod tests;
