use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::foundation::error::{DcpError, DcpResult};

const ATMOS_MAGIC: &[u8; 8] = b"DCPWATM1";

/// Stream parameters that travel with immersive audio frames.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AtmosMetadata {
    /// Edit rate numerator.
    pub edit_rate: u32,
    /// First frame number.
    pub first_frame: u32,
    /// Highest channel count used.
    pub max_channel_count: u32,
    /// Highest object count used.
    pub max_object_count: u32,
    /// Bitstream version.
    pub atmos_version: u32,
}

/// Appends immersive audio frames to a container headed by the stream metadata.
///
/// Layout: magic, `u32` metadata length, metadata JSON, then `u32`-length-prefixed frames.
pub struct AtmosAssetWriter {
    out: Option<BufWriter<File>>,
    path: PathBuf,
    metadata: AtmosMetadata,
    frames: u64,
    id: uuid::Uuid,
}

impl std::fmt::Debug for AtmosAssetWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtmosAssetWriter")
            .field("path", &self.path)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl AtmosAssetWriter {
    /// Create the container with the metadata of the first frame.
    pub fn start(path: &Path, metadata: AtmosMetadata) -> DcpResult<Self> {
        let io = |e| DcpError::io(path, "write atmos asset", e);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        let mut out = BufWriter::new(File::create(path).map_err(io)?);
        let json = serde_json::to_vec(&metadata).map_err(|e| DcpError::serde(e.to_string()))?;
        out.write_all(ATMOS_MAGIC).map_err(io)?;
        out.write_all(&(json.len() as u32).to_le_bytes()).map_err(io)?;
        out.write_all(&json).map_err(io)?;
        Ok(Self {
            out: Some(out),
            path: path.to_path_buf(),
            metadata,
            frames: 0,
            id: uuid::Uuid::new_v4(),
        })
    }

    /// Path of the asset file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Asset identity.
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    /// Metadata the container was created with.
    pub fn metadata(&self) -> &AtmosMetadata {
        &self.metadata
    }

    /// Frames written so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Append one frame.
    pub fn write(&mut self, data: &[u8]) -> DcpResult<()> {
        let out = self.out.as_mut().ok_or_else(|| {
            DcpError::contract(format!(
                "atmos asset '{}' is already finalized",
                self.path.display()
            ))
        })?;
        let len = u32::try_from(data.len())
            .map_err(|_| DcpError::validation("atmos frame larger than 4 GiB"))?;
        out.write_all(&len.to_le_bytes())
            .and_then(|_| out.write_all(data))
            .map_err(|e| DcpError::io(&self.path, "write atmos frame", e))?;
        self.frames += 1;
        Ok(())
    }

    /// Flush and close. Later calls are no-ops.
    pub fn finalize(&mut self) -> DcpResult<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()
                .map_err(|e| DcpError::io(&self.path, "finalize atmos asset", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/reel/atmos.rs"]
mod tests;
