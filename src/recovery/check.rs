use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::foundation::core::{Eyes, Frame};
use crate::foundation::digest::Digester;
use crate::foundation::error::DcpResult;
use crate::recovery::frame_info::FrameInfo;
use crate::recovery::handle::{InfoFileHandle, InfoFiles};

/// Highest frame index that has at least one record in `handle`, or `-1`.
pub fn last_recorded_frame(handle: &InfoFileHandle, stereo: bool) -> DcpResult<Frame> {
    let records = (handle.len()? / FrameInfo::SIZE_ON_DISK) as Frame;
    if records == 0 {
        return Ok(-1);
    }
    Ok(if stereo {
        (records - 1) / 2
    } else {
        records - 1
    })
}

fn eyes_for(stereo: bool) -> &'static [Eyes] {
    if stereo {
        &[Eyes::Left, Eyes::Right]
    } else {
        &[Eyes::Both]
    }
}

/// Return `true` if every eye of `frame` is recorded and its bytes in `asset` hash to the record.
pub fn existing_frame_ok(
    asset: &mut File,
    handle: &mut InfoFileHandle,
    frame: Frame,
    stereo: bool,
) -> DcpResult<bool> {
    for &eyes in eyes_for(stereo) {
        let Some(info) = FrameInfo::read(handle, frame, eyes)? else {
            tracing::debug!(frame, %eyes, "no index record");
            return Ok(false);
        };
        if asset.seek(SeekFrom::Start(info.offset)).is_err() {
            return Ok(false);
        }
        let mut data = Vec::new();
        let read = asset
            .by_ref()
            .take(info.size)
            .read_to_end(&mut data)
            .unwrap_or(0);
        if read as u64 != info.size {
            tracing::debug!(frame, %eyes, read, wanted = info.size, "existing frame is incomplete");
            return Ok(false);
        }
        if Digester::digest(&data) != info.hash {
            tracing::debug!(frame, %eyes, "existing frame failed hash check");
            return Ok(false);
        }
    }
    Ok(true)
}

/// First frame of `asset` that must be written again, judged against the index at `info`.
///
/// Scans down from the last recorded frame; the first frame whose every eye checks out marks
/// everything before it as already on disk. A missing asset or index means starting from 0.
pub fn first_nonexistent_frame(
    info_files: &InfoFiles,
    asset: &Path,
    info: &Path,
    stereo: bool,
) -> DcpResult<Frame> {
    let mut asset_file = match File::open(asset) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(asset = %asset.display(), error = %e, "no existing asset");
            return Ok(0);
        }
    };
    let mut handle = match info_files.open(info, true) {
        Ok(h) => h,
        Err(e) => {
            tracing::debug!(info = %info.display(), error = %e, "no existing index");
            return Ok(0);
        }
    };

    let mut frame = last_recorded_frame(&handle, stereo)?;
    while frame >= 0 {
        if existing_frame_ok(&mut asset_file, &mut handle, frame, stereo)? {
            break;
        }
        frame -= 1;
    }
    let first = frame + 1;
    tracing::info!(asset = %asset.display(), first, "resuming picture asset");
    Ok(first)
}

#[cfg(test)]
#[path = "../../tests/unit/recovery/check.rs"]
mod tests;
