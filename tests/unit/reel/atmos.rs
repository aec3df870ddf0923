use super::*;

fn metadata() -> AtmosMetadata {
    AtmosMetadata {
        edit_rate: 24,
        first_frame: 0,
        max_channel_count: 10,
        max_object_count: 118,
        atmos_version: 1,
    }
}

#[test]
fn container_holds_metadata_then_prefixed_frames() {
    let path = std::env::temp_dir().join(format!("dcpwriter_atmos_{}.atmos", std::process::id()));
    let mut w = AtmosAssetWriter::start(&path, metadata()).unwrap();
    w.write(b"one").unwrap();
    w.write(b"three").unwrap();
    assert_eq!(w.frames(), 2);
    w.finalize().unwrap();
    w.finalize().unwrap();
    assert!(matches!(w.write(b"late"), Err(DcpError::Contract(_))));

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..8], ATMOS_MAGIC);
    let json_len = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
    let meta: AtmosMetadata = serde_json::from_slice(&bytes[12..12 + json_len]).unwrap();
    assert_eq!(meta, metadata());

    let rest = &bytes[12 + json_len..];
    assert_eq!(u32::from_le_bytes(rest[..4].try_into().unwrap()), 3);
    assert_eq!(&rest[4..7], b"one");
    assert_eq!(u32::from_le_bytes(rest[7..11].try_into().unwrap()), 5);
    assert_eq!(&rest[11..], b"three");
}
