use super::*;

fn key(reel: usize, frame: Frame, eyes: Eyes) -> QueueKey {
    QueueKey { reel, frame, eyes }
}

#[test]
fn keys_sort_by_reel_then_frame_then_eye() {
    let mut keys = vec![
        key(1, 0, Eyes::Left),
        key(0, 2, Eyes::Right),
        key(0, 2, Eyes::Left),
        key(0, 1, Eyes::Right),
    ];
    keys.sort();
    assert_eq!(
        keys,
        vec![
            key(0, 1, Eyes::Right),
            key(0, 2, Eyes::Left),
            key(0, 2, Eyes::Right),
            key(1, 0, Eyes::Left),
        ]
    );
}

#[test]
fn mono_cursor_advances_one_frame_at_a_time() {
    let mut lw = LastWritten::default();
    assert!(lw.next(&key(0, 0, Eyes::Both)));
    assert!(!lw.next(&key(0, 1, Eyes::Both)));
    lw.update(&key(0, 0, Eyes::Both));
    assert!(lw.next(&key(0, 1, Eyes::Both)));
    assert!(lw.is_past(&key(0, 0, Eyes::Both)));
    assert!(!lw.is_past(&key(0, 1, Eyes::Both)));
}

#[test]
fn stereo_cursor_alternates_eyes() {
    let mut lw = LastWritten::default();
    assert!(lw.next(&key(0, 0, Eyes::Left)));
    assert!(!lw.next(&key(0, 0, Eyes::Right)));
    lw.update(&key(0, 0, Eyes::Left));
    assert!(lw.next(&key(0, 0, Eyes::Right)));
    assert!(!lw.next(&key(0, 1, Eyes::Left)));
    assert!(!lw.is_past(&key(0, 0, Eyes::Right)));
    assert!(lw.is_past(&key(0, 0, Eyes::Left)));
    lw.update(&key(0, 0, Eyes::Right));
    assert!(lw.next(&key(0, 1, Eyes::Left)));
    assert!(lw.is_past(&key(0, 0, Eyes::Right)));
}

#[test]
fn fake_and_repeat_units_never_count_as_in_memory() {
    assert!(QueueItem::full(Arc::from(&b"x"[..])).in_memory());
    assert!(!QueueItem::fake(10).in_memory());
    assert!(!QueueItem::repeat().in_memory());
}
