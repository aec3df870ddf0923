use super::*;

fn temp_dir(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "dcpwriter_picture_{name}_{}_{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn written_frames_read_back_through_the_trailer() {
    let dir = temp_dir("roundtrip");
    let path = dir.join("a.pic");
    let id = uuid::Uuid::new_v4();
    let mut w = PictureAssetWriter::start(&path, id, false, false).unwrap();
    let i0 = w.write(b"first").unwrap();
    let i1 = w.write(b"second!").unwrap();
    assert_eq!(i0.offset, HEADER_LEN);
    assert_eq!(i1.offset, HEADER_LEN + 5);
    assert_eq!(w.finalize().unwrap(), 2);
    assert!(w.write(b"late").is_err());

    let mut r = PictureAssetReader::open(&path).unwrap();
    assert_eq!(r.id(), id);
    assert_eq!(r.frames(), 2);
    assert_eq!(r.frame(1, Eyes::Both).unwrap(), b"second!");
    assert!(r.frame(0, Eyes::Left).is_err());
    assert!(r.read_unit(2).is_err());
}

#[test]
fn resume_keeps_bytes_and_fake_write_skips_them() {
    let dir = temp_dir("resume");
    let path = dir.join("a.pic");
    let id = uuid::Uuid::new_v4();
    {
        let mut w = PictureAssetWriter::start(&path, id, false, false).unwrap();
        w.write(b"aaaa").unwrap();
        w.write(b"bbbb").unwrap();
        w.write(b"cccc").unwrap();
    }

    let mut w = PictureAssetWriter::start(&path, id, false, true).unwrap();
    w.write(b"aaaa").unwrap();
    w.fake_write(4).unwrap();
    assert_eq!(w.read_at(HEADER_LEN + 4, 4).unwrap(), b"bbbb");
    w.write(b"dd").unwrap();
    w.finalize().unwrap();

    let mut r = PictureAssetReader::open(&path).unwrap();
    assert_eq!(r.units(), 3);
    assert_eq!(r.read_unit(1).unwrap(), b"bbbb");
    assert_eq!(r.read_unit(2).unwrap(), b"dd");
}

#[test]
fn stereo_units_interleave_eyes() {
    let dir = temp_dir("stereo");
    let path = dir.join("s.pic");
    let mut w = PictureAssetWriter::start(&path, uuid::Uuid::new_v4(), true, false).unwrap();
    for data in [b"L0", b"R0", b"L1", b"R1"] {
        w.write(data).unwrap();
    }
    w.finalize().unwrap();
    let mut r = PictureAssetReader::open(&path).unwrap();
    assert!(r.stereo());
    assert_eq!(r.frames(), 2);
    assert_eq!(r.frame(1, Eyes::Left).unwrap(), b"L1");
    assert_eq!(r.frame(0, Eyes::Right).unwrap(), b"R0");
}

#[test]
fn unfinalized_asset_is_rejected() {
    let dir = temp_dir("unfinalized");
    let path = dir.join("u.pic");
    let mut w = PictureAssetWriter::start(&path, uuid::Uuid::new_v4(), false, false).unwrap();
    w.write(&[0u8; 64]).unwrap();
    drop(w);
    assert!(PictureAssetReader::open(&path).is_err());
}
