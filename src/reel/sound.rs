use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::audio::buffers::AudioBuffers;
use crate::foundation::error::{DcpError, DcpResult};

const FULL_SCALE_24: f32 = 8_388_607.0;

fn hound_error(path: &Path, context: &str, e: hound::Error) -> DcpError {
    match e {
        hound::Error::IoError(io) => DcpError::io(path, context, io),
        other => DcpError::Other(anyhow::anyhow!("{context} '{}': {other}", path.display())),
    }
}

/// 24-bit PCM sound asset for one reel.
pub struct SoundAssetWriter {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
    channels: usize,
    frames: u64,
    id: uuid::Uuid,
}

impl std::fmt::Debug for SoundAssetWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundAssetWriter")
            .field("path", &self.path)
            .field("channels", &self.channels)
            .field("frames", &self.frames)
            .field("id", &self.id)
            .finish()
    }
}

impl SoundAssetWriter {
    /// Create a new sound asset with a fresh identity.
    pub fn start(path: &Path, channels: usize, sample_rate: u32) -> DcpResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DcpError::io(parent, "create sound asset directory", e))?;
        }
        let spec = hound::WavSpec {
            channels: u16::try_from(channels)
                .map_err(|_| DcpError::validation("too many sound channels"))?,
            sample_rate,
            bits_per_sample: 24,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path, spec)
            .map_err(|e| hound_error(path, "create sound asset", e))?;
        Ok(Self {
            writer: Some(writer),
            path: path.to_path_buf(),
            channels,
            frames: 0,
            id: uuid::Uuid::new_v4(),
        })
    }

    /// Path of the asset file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity of this asset; new on every run.
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    /// Sample frames written so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Append `audio`. Extra input channels are dropped and missing ones are silent.
    pub fn write(&mut self, audio: &AudioBuffers) -> DcpResult<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            DcpError::contract(format!(
                "sound asset '{}' is already finalized",
                self.path.display()
            ))
        })?;
        let have = audio.channels().min(self.channels);
        for f in 0..audio.frames() {
            for c in 0..self.channels {
                let s = if c < have { audio.channel(c)[f] } else { 0.0 };
                let v = (s.clamp(-1.0, 1.0) * FULL_SCALE_24).round() as i32;
                writer
                    .write_sample(v)
                    .map_err(|e| hound_error(&self.path, "write sound asset", e))?;
            }
        }
        self.frames += audio.frames() as u64;
        Ok(())
    }

    /// Finish the file. Later calls are no-ops.
    pub fn finalize(&mut self) -> DcpResult<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| hound_error(&self.path, "finalize sound asset", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/reel/sound.rs"]
mod tests;
