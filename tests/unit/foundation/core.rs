use super::*;

#[test]
fn eyes_sort_both_left_right() {
    let mut v = vec![Eyes::Right, Eyes::Both, Eyes::Left];
    v.sort();
    assert_eq!(v, vec![Eyes::Both, Eyes::Left, Eyes::Right]);
}

#[test]
fn fps_rejects_zero() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(24, 0).is_err());
    assert_eq!(Fps::integer(24).unwrap().as_f64(), 24.0);
}

#[test]
fn fps_display() {
    assert_eq!(Fps::integer(25).unwrap().to_string(), "25");
    assert_eq!(Fps::new(30000, 1001).unwrap().to_string(), "30000/1001");
}
