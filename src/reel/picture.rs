use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::foundation::core::{Eyes, Frame};
use crate::foundation::error::{DcpError, DcpResult};
use crate::recovery::frame_info::FrameInfo;

const HEADER_MAGIC: &[u8; 8] = b"DCPWPIC1";
const TRAILER_MAGIC: &[u8; 8] = b"DCPWIDX1";
/// Bytes before the first frame payload.
pub const HEADER_LEN: u64 = 16;
const TRAILER_TAIL_LEN: u64 = 8 + 16 + 8;
const INDEX_ENTRY_LEN: u64 = 16;

/// Writes frame payloads contiguously into a picture asset and appends an index at the end.
///
/// Layout: 16-byte header (magic, stereo flag), payloads in write order, then one
/// `(offset, size)` entry per payload, the payload count, the asset id and a closing magic.
#[derive(Debug)]
pub struct PictureAssetWriter {
    file: File,
    path: PathBuf,
    id: uuid::Uuid,
    offset: u64,
    index: Vec<(u64, u64)>,
    finalized: bool,
}

impl PictureAssetWriter {
    /// Open the asset at `path` for writing.
    ///
    /// With `resume` the existing bytes are kept so that already-correct frames can be skipped
    /// with [`PictureAssetWriter::fake_write`]; otherwise the file is truncated.
    pub fn start(path: &Path, id: uuid::Uuid, stereo: bool, resume: bool) -> DcpResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DcpError::io(parent, "create picture asset directory", e))?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(!resume)
            .open(path)
            .map_err(|e| DcpError::io(path, "open picture asset", e))?;

        let mut header = [0u8; HEADER_LEN as usize];
        header[..8].copy_from_slice(HEADER_MAGIC);
        header[8] = u8::from(stereo);
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.write_all(&header))
            .map_err(|e| DcpError::io(path, "write picture asset header", e))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            id,
            offset: HEADER_LEN,
            index: Vec::new(),
            finalized: false,
        })
    }

    /// Path of the asset file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity written into the trailer.
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    /// Number of payloads written or skipped so far.
    pub fn units(&self) -> u64 {
        self.index.len() as u64
    }

    /// Append `data` and return its recovery record.
    pub fn write(&mut self, data: &[u8]) -> DcpResult<FrameInfo> {
        self.check_open()?;
        self.file
            .seek(SeekFrom::Start(self.offset))
            .and_then(|_| self.file.write_all(data))
            .map_err(|e| DcpError::io(&self.path, "write picture frame", e))?;
        let info = FrameInfo::for_data(self.offset, data);
        self.index.push((self.offset, info.size));
        self.offset += info.size;
        Ok(info)
    }

    /// Read back `size` bytes at `offset`, typically a frame written by an earlier run.
    pub fn read_at(&mut self, offset: u64, size: u64) -> DcpResult<Vec<u8>> {
        let mut data = vec![0u8; size as usize];
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(&mut data))
            .map_err(|e| DcpError::io(&self.path, "read back picture frame", e))?;
        Ok(data)
    }

    /// Account for `size` bytes that are already correct on disk at the write position.
    pub fn fake_write(&mut self, size: u64) -> DcpResult<()> {
        self.check_open()?;
        self.index.push((self.offset, size));
        self.offset += size;
        Ok(())
    }

    /// Write the trailer, drop any stale bytes after it and flush.
    ///
    /// Returns the number of payloads in the asset.
    pub fn finalize(&mut self) -> DcpResult<u64> {
        self.check_open()?;
        let mut trailer =
            Vec::with_capacity(self.index.len() * INDEX_ENTRY_LEN as usize + TRAILER_TAIL_LEN as usize);
        for (offset, size) in &self.index {
            trailer.extend_from_slice(&offset.to_le_bytes());
            trailer.extend_from_slice(&size.to_le_bytes());
        }
        trailer.extend_from_slice(&(self.index.len() as u64).to_le_bytes());
        trailer.extend_from_slice(self.id.as_bytes());
        trailer.extend_from_slice(TRAILER_MAGIC);

        let end = self.offset + trailer.len() as u64;
        self.file
            .seek(SeekFrom::Start(self.offset))
            .and_then(|_| self.file.write_all(&trailer))
            .and_then(|_| self.file.set_len(end))
            .and_then(|_| self.file.sync_all())
            .map_err(|e| DcpError::io(&self.path, "finalize picture asset", e))?;
        self.finalized = true;
        Ok(self.units())
    }

    fn check_open(&self) -> DcpResult<()> {
        if self.finalized {
            return Err(DcpError::contract(format!(
                "picture asset '{}' is already finalized",
                self.path.display()
            )));
        }
        Ok(())
    }
}

/// Random access to the frames of a finalized picture asset.
#[derive(Debug)]
pub struct PictureAssetReader {
    file: File,
    path: PathBuf,
    stereo: bool,
    id: uuid::Uuid,
    index: Vec<(u64, u64)>,
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(word)
}

impl PictureAssetReader {
    /// Open a finalized asset and load its index.
    pub fn open(path: &Path) -> DcpResult<Self> {
        let io = |e| DcpError::io(path, "read picture asset", e);
        let mut file = File::open(path).map_err(io)?;
        let len = file.metadata().map_err(io)?.len();
        if len < HEADER_LEN + TRAILER_TAIL_LEN {
            return Err(DcpError::validation(format!(
                "'{}' is too short to be a picture asset",
                path.display()
            )));
        }

        let mut header = [0u8; HEADER_LEN as usize];
        file.read_exact(&mut header).map_err(io)?;
        if &header[..8] != HEADER_MAGIC {
            return Err(DcpError::validation(format!(
                "'{}' is not a picture asset",
                path.display()
            )));
        }
        let stereo = header[8] != 0;

        let mut tail = [0u8; TRAILER_TAIL_LEN as usize];
        file.seek(SeekFrom::Start(len - TRAILER_TAIL_LEN))
            .and_then(|_| file.read_exact(&mut tail))
            .map_err(io)?;
        if &tail[24..] != TRAILER_MAGIC {
            return Err(DcpError::validation(format!(
                "picture asset '{}' was never finalized",
                path.display()
            )));
        }
        let count = read_u64(&tail[..8]);
        let mut id = [0u8; 16];
        id.copy_from_slice(&tail[8..24]);

        let index_len = count
            .checked_mul(INDEX_ENTRY_LEN)
            .filter(|n| *n <= len - HEADER_LEN - TRAILER_TAIL_LEN)
            .ok_or_else(|| {
                DcpError::validation(format!(
                    "picture asset '{}' has a corrupt index",
                    path.display()
                ))
            })?;
        let mut raw = vec![0u8; index_len as usize];
        file.seek(SeekFrom::Start(len - TRAILER_TAIL_LEN - index_len))
            .and_then(|_| file.read_exact(&mut raw))
            .map_err(io)?;
        let index = raw
            .chunks_exact(INDEX_ENTRY_LEN as usize)
            .map(|c| (read_u64(&c[..8]), read_u64(&c[8..])))
            .collect();

        Ok(Self {
            file,
            path: path.to_path_buf(),
            stereo,
            id: uuid::Uuid::from_bytes(id),
            index,
        })
    }

    /// Identity recorded in the trailer.
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    /// Whether the asset carries left/right pairs.
    pub fn stereo(&self) -> bool {
        self.stereo
    }

    /// Number of payloads.
    pub fn units(&self) -> usize {
        self.index.len()
    }

    /// Number of picture frames (pairs count once when stereo).
    pub fn frames(&self) -> Frame {
        let units = self.index.len() as Frame;
        if self.stereo { units / 2 } else { units }
    }

    /// `(offset, size)` of payload `unit`.
    pub fn entry(&self, unit: usize) -> Option<(u64, u64)> {
        self.index.get(unit).copied()
    }

    /// Bytes of `(frame, eyes)`.
    pub fn frame(&mut self, frame: Frame, eyes: Eyes) -> DcpResult<Vec<u8>> {
        let unit = match (self.stereo, eyes) {
            (false, Eyes::Both) => frame,
            (true, Eyes::Left) => frame * 2,
            (true, Eyes::Right) => frame * 2 + 1,
            _ => {
                return Err(DcpError::contract(format!(
                    "{eyes} frame requested from a {} asset",
                    if self.stereo { "stereo" } else { "mono" }
                )));
            }
        };
        self.read_unit(unit)
    }

    /// Bytes of payload `unit`.
    pub fn read_unit(&mut self, unit: Frame) -> DcpResult<Vec<u8>> {
        let (offset, size) = usize::try_from(unit)
            .ok()
            .and_then(|u| self.entry(u))
            .ok_or_else(|| {
                DcpError::contract(format!(
                    "unit {unit} is outside picture asset '{}'",
                    self.path.display()
                ))
            })?;
        let mut data = vec![0u8; size as usize];
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(&mut data))
            .map_err(|e| DcpError::io(&self.path, "read picture frame", e))?;
        Ok(data)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/reel/picture.rs"]
mod tests;
