use super::*;
use approx::assert_relative_eq;

const RATE: u32 = 48_000;
const LENGTH: Frame = 480_000;

fn frames(n: Frame) -> ContentTime {
    ContentTime::from_frames(n, f64::from(RATE))
}

fn envelope(fade_in: Frame, fade_out: Frame) -> FadeEnvelope {
    FadeEnvelope {
        fade_in: frames(fade_in),
        fade_out: frames(fade_out),
        trim_start: ContentTime::ZERO,
        trim_end: ContentTime::ZERO,
        stream_length: frames(LENGTH),
    }
}

#[test]
fn curves_clamp_outside_unit_interval() {
    assert_eq!(fade_in_curve(-0.5), 0.0);
    assert_eq!(fade_in_curve(0.0), 0.0);
    assert_relative_eq!(fade_in_curve(1.0), 1.0);
    assert_relative_eq!(fade_in_curve(3.0), 1.0);
    assert_relative_eq!(fade_out_curve(-1.0), 1.0);
    assert_relative_eq!(fade_out_curve(0.0), 1.0);
    assert_eq!(fade_out_curve(1.0), 0.0);
}

#[test]
fn fade_in_curve_matches_closed_form() {
    for i in 0..100 {
        let t = i as f32 / 100.0;
        assert_relative_eq!(fade_in_curve(t), (2.0 * (t - 1.0)).exp() * t, epsilon = 1e-6);
    }
}

#[test]
fn no_fades_means_no_envelope() {
    let e = envelope(0, 0);
    assert!(e.coefficients(0, 0, RATE).is_empty());
    assert!(e.coefficients(0, 2000, RATE).is_empty());
    assert!(e.coefficients(LENGTH + 100, 8000, RATE).is_empty());
}

#[test]
fn window_between_fades_is_empty() {
    let e = envelope(2000, 2000);
    assert!(e.coefficients(2000, 50, RATE).is_empty());
    assert!(e.coefficients(12_000, 99, RATE).is_empty());
    assert!(e.coefficients(LENGTH - 2051, 50, RATE).is_empty());
}

#[test]
fn window_inside_fade_in_follows_curve() {
    let c = envelope(2000, 0).coefficients(0, 2000, RATE);
    assert_eq!(c.len(), 2000);
    for (i, k) in c.iter().enumerate() {
        assert_relative_eq!(*k, fade_in_curve(i as f32 / 2000.0), epsilon = 1e-6);
    }
}

#[test]
fn overlapping_fades_multiply() {
    let c = envelope(LENGTH, LENGTH).coefficients(0, 10_000, RATE);
    assert_eq!(c.len(), 10_000);
    for (i, k) in c.iter().enumerate() {
        let t = i as f32 / LENGTH as f32;
        assert_relative_eq!(*k, fade_in_curve(t) * fade_out_curve(t), epsilon = 1e-6);
    }
}
