use super::*;
use crate::foundation::core::Fps;
use crate::reel::picture::PictureAssetReader;

fn temp_dir(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "dcpwriter_reel_{name}_{}_{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn spec(dir: &Path) -> Arc<PackageSpec> {
    Arc::new(PackageSpec {
        name: "Reel".to_string(),
        directory: dir.to_path_buf(),
        video_frame_rate: Fps::integer(24).unwrap(),
        three_d: false,
        audio_channels: 2,
        audio_frame_rate: 48_000,
        reels: vec![TimePeriod::new(DcpTime::ZERO, DcpTime::from_frames(10, 24.0))],
        video_identifier: "unit".to_string(),
        closed_caption_tracks: vec!["en".to_string()],
    })
}

fn reel(spec: &Arc<PackageSpec>, files: &Arc<InfoFiles>) -> ReelWriter {
    ReelWriter::new(spec.clone(), files.clone(), 0, spec.reels[0], None).unwrap()
}

#[test]
fn repeat_duplicates_last_full_bytes() {
    let dir = temp_dir("repeat");
    let spec = spec(&dir);
    let files = Arc::new(InfoFiles::new());
    let r = reel(&spec, &files);
    r.write(Arc::from(&b"frame0"[..]), 0, Eyes::Both).unwrap();
    r.repeat_write(1, Eyes::Both).unwrap();
    let f1 = r.recorded_frame(1, Eyes::Both).unwrap().unwrap();
    assert_eq!(f1.size, 6);
    assert_eq!(f1.offset, crate::reel::picture::HEADER_LEN + 6);
}

#[test]
fn resumed_reel_skips_intact_frames_and_repeats_from_disk() {
    let dir = temp_dir("resume");
    let spec = spec(&dir);
    let files = Arc::new(InfoFiles::new());
    {
        let r = reel(&spec, &files);
        assert_eq!(r.first_nonexistent_frame(), 0);
        for (i, d) in [&b"aa"[..], &b"bbb"[..], &b"cccc"[..]].into_iter().enumerate() {
            r.write(Arc::from(d), i as Frame, Eyes::Both).unwrap();
        }
    }

    let r = reel(&spec, &files);
    assert_eq!(r.first_nonexistent_frame(), 3);
    r.write(Arc::from(&b"aa"[..]), 0, Eyes::Both).unwrap();
    let size = r.recorded_frame(1, Eyes::Both).unwrap().unwrap().size;
    r.fake_write(size, Eyes::Both).unwrap();
    r.repeat_write(2, Eyes::Both).unwrap();

    let out = dir.join("out");
    r.finish(&out).unwrap();
    let manifest = r.create_reel(&[], &[]).unwrap();
    let picture = manifest.picture.unwrap();
    let mut reader = PictureAssetReader::open(&picture.path).unwrap();
    assert_eq!(reader.frames(), 3);
    assert_eq!(reader.frame(2, Eyes::Both).unwrap(), b"bbb");
    assert_eq!(picture.id, spec.picture_asset_id(spec.reels[0]));
}

#[test]
fn missing_kinds_come_from_referenced_assets() {
    let dir = temp_dir("refs");
    let spec = spec(&dir);
    let files = Arc::new(InfoFiles::new());
    let r = reel(&spec, &files);
    r.write(Arc::from(&b"pic"[..]), 0, Eyes::Both).unwrap();
    r.write_text(
        PlayerText::lines(["hi"]),
        TextType::ClosedCaption,
        Some("en"),
        TimePeriod::new(DcpTime::ZERO, DcpTime::from_frames(5, 24.0)),
    )
    .unwrap();
    r.finish(&dir.join("out")).unwrap();

    let referenced_sound = ManifestAsset {
        kind: AssetKind::Sound,
        id: uuid::Uuid::new_v4(),
        path: dir.join("elsewhere.wav"),
        duration: 10,
        digest: Some("00".to_string()),
        track: None,
        referenced: true,
    };
    let other_period = ReferencedReelAsset {
        asset: ManifestAsset {
            kind: AssetKind::Subtitle,
            ..referenced_sound.clone()
        },
        period: TimePeriod::new(DcpTime::from_seconds(100.0), DcpTime::from_seconds(101.0)),
    };
    let refs = vec![
        ReferencedReelAsset {
            asset: referenced_sound.clone(),
            period: spec.reels[0],
        },
        other_period,
    ];

    r.calculate_digests(&|_| {}).unwrap();
    let m = r.create_reel(&refs, &[]).unwrap();
    assert_eq!(m.sound, Some(referenced_sound));
    assert!(m.subtitle.is_none());
    assert_eq!(m.closed_captions.len(), 1);
    assert_eq!(m.closed_captions[0].track.as_deref(), Some("en"));
    let digest = m.picture.unwrap().digest.unwrap();
    assert_eq!(digest.len(), 64);
}

#[test]
fn digests_report_progress_up_to_one() {
    let dir = temp_dir("progress");
    let spec = spec(&dir);
    let files = Arc::new(InfoFiles::new());
    let r = reel(&spec, &files);
    assert!(r.calculate_digests(&|_| {}).is_err());
    r.write(Arc::from(vec![1u8; 4096]), 0, Eyes::Both).unwrap();
    r.write_audio(&AudioBuffers::new(2, 2000)).unwrap();
    r.finish(&dir.join("out")).unwrap();

    let seen = Mutex::new(Vec::new());
    r.calculate_digests(&|p| seen.lock().push(p)).unwrap();
    let seen = seen.into_inner();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last().copied(), Some(1.0));
    let m = r.create_reel(&[], &[]).unwrap();
    assert!(m.sound.unwrap().digest.is_some());
}

#[test]
fn atmos_keeps_the_first_metadata_and_empty_sound_is_dropped() {
    let dir = temp_dir("atmos_meta");
    let spec = spec(&dir);
    let files = Arc::new(InfoFiles::new());
    let r = reel(&spec, &files);
    let first = AtmosMetadata {
        edit_rate: 24,
        first_frame: 0,
        max_channel_count: 10,
        max_object_count: 118,
        atmos_version: 1,
    };
    let changed = AtmosMetadata {
        max_object_count: 64,
        ..first.clone()
    };
    r.write(Arc::from(&b"pic"[..]), 0, Eyes::Both).unwrap();
    r.write_atmos(b"a0", &first).unwrap();
    r.write_atmos(b"a1", &changed).unwrap();

    let out = dir.join("out");
    r.finish(&out).unwrap();
    let m = r.create_reel(&[], &[]).unwrap();
    assert!(m.sound.is_none());
    assert!(!spec.scratch_dir().join("reel0_pcm.wav").exists());

    let atmos = m.atmos.unwrap();
    assert_eq!(atmos.duration, 2);
    let bytes = std::fs::read(&atmos.path).unwrap();
    let len = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
    let stored: AtmosMetadata = serde_json::from_slice(&bytes[12..12 + len]).unwrap();
    assert_eq!(stored, first);
}
