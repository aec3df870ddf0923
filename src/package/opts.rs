use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::foundation::error::{DcpError, DcpResult};

/// Tuning knobs for the sequencing engine.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WriterOpts {
    /// Number of upstream encoder threads the backpressure policy should expect.
    pub encoder_threads: usize,
    /// FULL frames allowed in memory per encoder thread.
    pub frames_in_memory_multiplier: f64,
    /// Queue entries allowed per encoder thread before FAKE/REPEAT producers wait.
    pub queue_size_multiplier: usize,
    /// Worker threads for digest calculation (`None` uses rayon's default).
    pub digest_threads: Option<usize>,
}

impl Default for WriterOpts {
    fn default() -> Self {
        Self {
            encoder_threads: 1,
            frames_in_memory_multiplier: 3.0,
            queue_size_multiplier: 16,
            digest_threads: None,
        }
    }
}

impl WriterOpts {
    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_reader(r: impl Read) -> DcpResult<Self> {
        serde_json::from_reader(r).map_err(|e| DcpError::serde(e.to_string()))
    }

    /// Parse options from a JSON file.
    pub fn from_path(path: &Path) -> DcpResult<Self> {
        let f = File::open(path).map_err(|e| DcpError::io(path, "open writer options", e))?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check the options are usable.
    pub fn validate(&self) -> DcpResult<()> {
        if self.encoder_threads == 0 {
            return Err(DcpError::validation("encoder_threads must be >= 1"));
        }
        if self.frames_in_memory_multiplier.is_nan() || self.frames_in_memory_multiplier <= 0.0 {
            return Err(DcpError::validation(
                "frames_in_memory_multiplier must be > 0",
            ));
        }
        if self.queue_size_multiplier == 0 {
            return Err(DcpError::validation("queue_size_multiplier must be >= 1"));
        }
        if self.digest_threads == Some(0) {
            return Err(DcpError::validation("digest_threads must be >= 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/package/opts.rs"]
mod tests;
