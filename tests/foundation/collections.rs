//! Integration tests for persistent collections
//!
//! Tests structural sharing and the ordering guarantees the engine relies on.

use ember_foundation::{LtMap, LtVec};

#[test]
fn vec_updates_leave_original_untouched() {
    let a: LtVec<i32> = [1, 2, 3].into_iter().collect();
    let b = a.push_back(4);

    assert_eq!(a.len(), 3);
    assert_eq!(b.len(), 4);
    assert_eq!(b.last(), Some(&4));
}

#[test]
fn vec_slice_is_half_open() {
    let v: LtVec<i32> = (0..6).collect();
    let mid = v.slice(1, 4);
    assert_eq!(mid.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(v.slice(3, 3).is_empty());
}

#[test]
fn map_iterates_in_key_order() {
    let m: LtMap<&str, i32> = [("c", 3), ("a", 1), ("b", 2)].into_iter().collect();
    let keys: Vec<_> = m.keys().copied().collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[test]
fn map_insert_and_remove_are_persistent() {
    let a: LtMap<&str, i32> = LtMap::new().insert("x", 1);
    let b = a.insert("y", 2);
    let c = b.remove("x");

    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 2);
    assert!(!c.contains_key("x"));
    assert_eq!(c.get("y"), Some(&2));
}

#[test]
fn map_union_prefers_other() {
    let base: LtMap<&str, i32> = [("a", 1), ("b", 2)].into_iter().collect();
    let changes: LtMap<&str, i32> = [("b", 20), ("c", 30)].into_iter().collect();
    let merged = base.union(&changes);

    assert_eq!(merged.get("a"), Some(&1));
    assert_eq!(merged.get("b"), Some(&20));
    assert_eq!(merged.get("c"), Some(&30));
}
