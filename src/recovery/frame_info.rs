use crate::foundation::core::{Eyes, Frame};
use crate::foundation::digest::{ContentDigest, DIGEST_LEN, Digester};
use crate::foundation::error::{DcpError, DcpResult};
use crate::recovery::handle::InfoFileHandle;

const RECORD_LEN: usize = 8 + 8 + DIGEST_LEN;

/// Where one encoded frame lives inside a picture asset, and what its bytes hash to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FrameInfo {
    /// Byte offset of the frame within the asset file.
    pub offset: u64,
    /// Length of the frame in bytes.
    pub size: u64,
    /// SHA-256 of the frame bytes.
    pub hash: ContentDigest,
}

impl FrameInfo {
    /// Bytes occupied by one record in an index file.
    pub const SIZE_ON_DISK: u64 = RECORD_LEN as u64;

    /// Record for `data` written at `offset`.
    pub fn for_data(offset: u64, data: &[u8]) -> Self {
        Self {
            offset,
            size: data.len() as u64,
            hash: Digester::digest(data),
        }
    }

    /// Byte position of the record for `(frame, eyes)`.
    ///
    /// Mono indices hold one record per frame; stereo indices interleave left then right.
    pub fn position(frame: Frame, eyes: Eyes) -> DcpResult<u64> {
        if frame < 0 {
            return Err(DcpError::contract(format!(
                "negative frame {frame} has no index record"
            )));
        }
        let frame = frame as u64;
        let size = Self::SIZE_ON_DISK;
        Ok(match eyes {
            Eyes::Both => frame * size,
            Eyes::Left => frame * 2 * size,
            Eyes::Right => frame * 2 * size + size,
        })
    }

    /// Encode as a little-endian record.
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        out[0..8].copy_from_slice(&self.offset.to_le_bytes());
        out[8..16].copy_from_slice(&self.size.to_le_bytes());
        out[16..].copy_from_slice(&self.hash);
        out
    }

    /// Decode a record; all-zero sizes mean "never written".
    pub fn from_bytes(bytes: &[u8; RECORD_LEN]) -> Option<Self> {
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[0..8]);
        let offset = u64::from_le_bytes(word);
        word.copy_from_slice(&bytes[8..16]);
        let size = u64::from_le_bytes(word);
        if size == 0 {
            return None;
        }
        let mut hash = [0u8; DIGEST_LEN];
        hash.copy_from_slice(&bytes[16..]);
        Some(Self { offset, size, hash })
    }

    /// Read the record for `(frame, eyes)`.
    ///
    /// A record past the end of the file, or one never written, is `None`.
    pub fn read(handle: &mut InfoFileHandle, frame: Frame, eyes: Eyes) -> DcpResult<Option<Self>> {
        let pos = Self::position(frame, eyes)?;
        let mut buf = [0u8; RECORD_LEN];
        if !handle.read_exact_at(pos, &mut buf)? {
            return Ok(None);
        }
        Ok(Self::from_bytes(&buf))
    }

    /// Write (or overwrite) the record for `(frame, eyes)`.
    pub fn write(&self, handle: &mut InfoFileHandle, frame: Frame, eyes: Eyes) -> DcpResult<()> {
        let pos = Self::position(frame, eyes)?;
        handle.write_all_at(pos, &self.to_bytes())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/recovery/frame_info.rs"]
mod tests;
