use super::*;

#[test]
fn new_mapping_is_silent() {
    let m = AudioMapping::new(2, 16);
    for i in 0..2 {
        for o in 0..16 {
            assert_eq!(m.get(i, o), 0.0);
        }
    }
    assert!(m.mapped_output_channels().is_empty());
}

#[test]
fn mono_defaults_to_centre() {
    let m = AudioMapping::make_default(1, 6);
    assert_eq!(m.get(0, CENTRE_CHANNEL), 1.0);
    assert_eq!(m.mapped_output_channels(), vec![CENTRE_CHANNEL]);
}

#[test]
fn multichannel_defaults_to_identity() {
    let m = AudioMapping::make_default(6, 16);
    for i in 0..6 {
        assert_eq!(m.get(i, i), 1.0);
    }
    assert_eq!(m.mapped_output_channels(), vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn out_of_range_access_is_silent_and_ignored() {
    let mut m = AudioMapping::new(1, 2);
    m.set(5, 0, 1.0);
    m.set(0, 9, 1.0);
    assert_eq!(m.get(5, 0), 0.0);
    assert_eq!(m.get(0, 9), 0.0);
}

#[test]
fn summary_lists_routes() {
    let mut m = AudioMapping::new(2, 2);
    m.set(1, 0, 0.5);
    assert_eq!(m.summary(), "1->0@0.50");
}
