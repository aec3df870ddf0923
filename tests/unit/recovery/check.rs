use super::*;
use std::io::Write;
use std::path::PathBuf;

fn temp_dir(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "dcpwriter_check_{name}_{}_{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write `frames` back to back into `asset` and index them.
fn write_frames(files: &InfoFiles, asset: &Path, info: &Path, frames: &[(Frame, Eyes, &str)]) {
    let mut file = File::create(asset).unwrap();
    let mut handle = files.open(info, false).unwrap();
    let mut offset = 0u64;
    for (frame, eyes, data) in frames {
        let data = data.as_bytes();
        file.write_all(data).unwrap();
        FrameInfo::for_data(offset, data)
            .write(&mut handle, *frame, *eyes)
            .unwrap();
        offset += data.len() as u64;
    }
}

#[test]
fn missing_files_resume_from_zero() {
    let dir = temp_dir("missing");
    let files = InfoFiles::new();
    let got = first_nonexistent_frame(&files, &dir.join("a"), &dir.join("i"), false).unwrap();
    assert_eq!(got, 0);
}

#[test]
fn intact_asset_resumes_after_last_frame() {
    let dir = temp_dir("intact");
    let (asset, info) = (dir.join("asset"), dir.join("info"));
    let files = InfoFiles::new();
    write_frames(
        &files,
        &asset,
        &info,
        &[(0, Eyes::Both, "aaaa"), (1, Eyes::Both, "bb"), (2, Eyes::Both, "cccccc")],
    );
    assert_eq!(first_nonexistent_frame(&files, &asset, &info, false).unwrap(), 3);
}

#[test]
fn truncated_asset_resumes_at_first_damaged_frame() {
    let dir = temp_dir("truncated");
    let (asset, info) = (dir.join("asset"), dir.join("info"));
    let files = InfoFiles::new();
    write_frames(
        &files,
        &asset,
        &info,
        &[(0, Eyes::Both, "aaaa"), (1, Eyes::Both, "bb"), (2, Eyes::Both, "cccccc")],
    );
    let f = std::fs::OpenOptions::new().write(true).open(&asset).unwrap();
    f.set_len(7).unwrap();
    assert_eq!(first_nonexistent_frame(&files, &asset, &info, false).unwrap(), 2);
}

#[test]
fn stereo_frame_needs_both_eyes() {
    let dir = temp_dir("stereo");
    let (asset, info) = (dir.join("asset"), dir.join("info"));
    let files = InfoFiles::new();
    write_frames(
        &files,
        &asset,
        &info,
        &[
            (0, Eyes::Left, "l0"),
            (0, Eyes::Right, "r0"),
            (1, Eyes::Left, "l1"),
        ],
    );
    assert_eq!(first_nonexistent_frame(&files, &asset, &info, true).unwrap(), 1);
}

#[test]
fn corrupted_bytes_fail_the_hash_check() {
    let dir = temp_dir("corrupt");
    let (asset, info) = (dir.join("asset"), dir.join("info"));
    let files = InfoFiles::new();
    write_frames(&files, &asset, &info, &[(0, Eyes::Both, "xyz")]);
    std::fs::write(&asset, b"xyZ").unwrap();
    assert_eq!(first_nonexistent_frame(&files, &asset, &info, false).unwrap(), 0);
}
