//! Scenario tests S1-S7 (spec.md §8), run against `MemoryBlockStore` with
//! `keysize = 2, valuesize = 2, blocksize = 64`, 32 total blocks.

use bptree_storage_stack::{BTreeIndex, MemoryBlockStore};

fn attached() -> BTreeIndex<MemoryBlockStore> {
    let store = MemoryBlockStore::new(64, 32);
    let mut index = BTreeIndex::new(2, 2, store);
    index.attach(0, true).unwrap();
    index
}

#[test]
fn s1_empty_lookup() {
    let index = attached();
    assert!(index.lookup(b"AA").is_err());
}

#[test]
fn s2_single_insert() {
    let mut index = attached();
    index.insert(b"AA".to_vec(), b"11".to_vec()).unwrap();
    assert_eq!(index.lookup(b"AA").unwrap().as_bytes(), b"11");
    assert!(index.sanity_check().unwrap().is_empty());
}

#[test]
fn s3_update_overwrite() {
    let mut index = attached();
    index.insert(b"AA".to_vec(), b"11".to_vec()).unwrap();
    index.update(b"AA".to_vec(), b"22".to_vec()).unwrap();
    assert_eq!(index.lookup(b"AA").unwrap().as_bytes(), b"22");
    assert!(index.update(b"BB".to_vec(), b"00".to_vec()).is_err());
}

#[test]
fn s4_ordered_bulk_insert_triggers_one_split() {
    let mut index = attached();
    for i in 0..10 {
        let key = format!("A{}", i).into_bytes();
        index.insert(key.clone(), key).unwrap();
    }

    let mut out = Vec::new();
    index
        .display(bptree_storage_stack::DisplayMode::SortedKeyVal, &mut out)
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    let expected: String = (0..10).map(|i| format!("(A{},A{})\n", i, i)).collect();
    assert_eq!(text, expected);
    assert!(index.sanity_check().unwrap().is_empty());
}

#[test]
fn s5_reverse_bulk_insert_stays_ordered() {
    let mut index = attached();
    for i in (0..10).rev() {
        let key = format!("Z{}", i).into_bytes();
        index.insert(key.clone(), key).unwrap();
    }

    let mut out = Vec::new();
    index
        .display(bptree_storage_stack::DisplayMode::SortedKeyVal, &mut out)
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    let expected: String = (0..10).map(|i| format!("(Z{},Z{})\n", i, i)).collect();
    assert_eq!(text, expected);
    assert!(index.sanity_check().unwrap().is_empty());
}

#[test]
fn s6_duplicate_insert_rejected() {
    let mut index = attached();
    index.insert(b"AA".to_vec(), b"11".to_vec()).unwrap();
    assert!(index.insert(b"AA".to_vec(), b"22".to_vec()).is_err());
    assert_eq!(index.lookup(b"AA").unwrap().as_bytes(), b"11");
}

#[test]
fn s7_exhaustion_preserves_prior_keys() {
    let mut index = attached();
    let mut inserted = Vec::new();
    loop {
        let n = inserted.len();
        let key = format!("{:02}", n).into_bytes();
        match index.insert(key.clone(), key.clone()) {
            Ok(()) => inserted.push(key),
            Err(_) => break,
        }
    }

    assert!(!inserted.is_empty());
    for key in &inserted {
        assert_eq!(&index.lookup(key).unwrap().as_bytes().to_vec(), key);
    }
}
