use super::*;

#[test]
fn cues_are_stored_relative_to_the_reel() {
    let start = DcpTime::from_seconds(10.0);
    let mut w = TextAssetWriter::new(TextType::OpenSubtitle, None, start, 24.0);
    let mut text = PlayerText::lines(["Hello"]);
    text.fonts.push("Arial".to_string());
    w.write(
        text,
        TimePeriod::new(DcpTime::from_seconds(11.0), DcpTime::from_seconds(12.5)),
    )
    .unwrap();
    assert_eq!(w.entries.len(), 1);
    assert_eq!(w.entries[0].in_frame, 24);
    assert_eq!(w.entries[0].out_frame, 60);
    assert_eq!(w.fonts().collect::<Vec<_>>(), vec!["Arial"]);
}

#[test]
fn cue_before_reel_start_is_rejected() {
    let mut w = TextAssetWriter::new(
        TextType::ClosedCaption,
        Some("en".to_string()),
        DcpTime::from_seconds(10.0),
        24.0,
    );
    let err = w
        .write(
            PlayerText::lines(["early"]),
            TimePeriod::new(DcpTime::from_seconds(9.0), DcpTime::from_seconds(11.0)),
        )
        .unwrap_err();
    assert!(matches!(err, DcpError::Contract(_)));
}

#[test]
fn finalized_track_is_json() {
    let path = std::env::temp_dir().join(format!("dcpwriter_text_{}.json", std::process::id()));
    let mut w = TextAssetWriter::new(TextType::ClosedCaption, Some("en".into()), DcpTime::ZERO, 25.0);
    w.write(
        PlayerText::lines(["a", "b"]),
        TimePeriod::new(DcpTime::ZERO, DcpTime::from_seconds(1.0)),
    )
    .unwrap();
    w.finalize(&path).unwrap();
    let v: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(v["kind"], "closed_caption");
    assert_eq!(v["track"], "en");
    assert_eq!(v["entries"][0]["out_frame"], 25);
    assert_eq!(v["entries"][0]["text"]["lines"][1], "b");
}
