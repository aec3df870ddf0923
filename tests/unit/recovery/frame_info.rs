use super::*;
use crate::recovery::handle::InfoFiles;

fn temp_dir(name: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "dcpwriter_frame_info_{name}_{}_{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn record_is_48_bytes() {
    assert_eq!(FrameInfo::SIZE_ON_DISK, 48);
}

#[test]
fn positions_interleave_stereo_eyes() {
    assert_eq!(FrameInfo::position(3, Eyes::Both).unwrap(), 3 * 48);
    assert_eq!(FrameInfo::position(3, Eyes::Left).unwrap(), 6 * 48);
    assert_eq!(FrameInfo::position(3, Eyes::Right).unwrap(), 7 * 48);
    assert!(FrameInfo::position(-1, Eyes::Both).is_err());
}

#[test]
fn bytes_are_little_endian() {
    let info = FrameInfo {
        offset: 0x0102,
        size: 7,
        hash: [0xab; 32],
    };
    let b = info.to_bytes();
    assert_eq!(&b[0..2], &[0x02, 0x01]);
    assert_eq!(b[8], 7);
    assert_eq!(FrameInfo::from_bytes(&b), Some(info));
    assert_eq!(FrameInfo::from_bytes(&[0u8; 48]), None);
}

#[test]
fn out_of_order_writes_read_back_last_value() {
    let dir = temp_dir("order");
    let path = dir.join("info");
    let files = InfoFiles::new();
    let mut h = files.open(&path, false).unwrap();

    let r10 = FrameInfo::for_data(1000, b"ten");
    let r0 = FrameInfo::for_data(0, b"zero");
    let r5a = FrameInfo::for_data(500, b"five");
    let r5b = FrameInfo::for_data(555, b"five again");

    r10.write(&mut h, 10, Eyes::Both).unwrap();
    r5a.write(&mut h, 5, Eyes::Both).unwrap();
    r0.write(&mut h, 0, Eyes::Both).unwrap();
    r5b.write(&mut h, 5, Eyes::Both).unwrap();
    drop(h);

    let mut h = files.open(&path, true).unwrap();
    assert_eq!(FrameInfo::read(&mut h, 0, Eyes::Both).unwrap(), Some(r0));
    assert_eq!(FrameInfo::read(&mut h, 5, Eyes::Both).unwrap(), Some(r5b));
    assert_eq!(FrameInfo::read(&mut h, 10, Eyes::Both).unwrap(), Some(r10));
    assert_eq!(FrameInfo::read(&mut h, 3, Eyes::Both).unwrap(), None);
    assert_eq!(FrameInfo::read(&mut h, 11, Eyes::Both).unwrap(), None);
}
