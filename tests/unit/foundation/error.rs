use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        DcpError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        DcpError::contract("x")
            .to_string()
            .contains("internal contract violation:")
    );
    assert!(
        DcpError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn storage_full_is_classified_as_disk_full() {
    let err = DcpError::io(
        Path::new("/tmp/a.pic"),
        "write frame",
        std::io::Error::from(std::io::ErrorKind::StorageFull),
    );
    assert!(err.is_disk_full());
    assert!(err.to_string().contains("/tmp/a.pic"));
}

#[test]
fn other_io_errors_keep_context() {
    let err = DcpError::io(
        Path::new("/tmp/b.pic"),
        "open picture asset",
        std::io::Error::other("boom"),
    );
    assert!(!err.is_disk_full());
    let text = err.to_string();
    assert!(text.contains("open picture asset"));
    assert!(text.contains("boom"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = DcpError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
