//! End-to-end scenarios from spec §8, exercised against the public API
//! rather than any internal module.

use trie_store::{AlphabetMap, Trie, TrieError};

fn printable_trie() -> Trie<i32> {
    Trie::new(AlphabetMap::printable_ascii())
}

/// Scenario 1: `find("pre")` (a strict prefix of two keys, but not
/// itself a key) is absent, and `prefix_search("pr*")` enumerates both
/// matches in ascending byte-lexicographic order.
#[test]
fn scenario_1_prefix_ordering() {
    let mut t = printable_trie();
    t.insert(b"pool", 1).unwrap();
    t.insert(b"prize", 2).unwrap();
    t.insert(b"preview", 3).unwrap();

    assert_eq!(*t.get(b"pool").unwrap(), 1);
    assert_eq!(t.get(b"pre").unwrap_err(), TrieError::NotFound);

    let keys: Vec<Vec<u8>> = t
        .prefix_search(b"pr")
        .unwrap()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec![b"preview".to_vec(), b"prize".to_vec()]);
}

/// Scenario 2: single key insert, find, delete, find-again; deleting
/// the only entry leaves the tail pool empty and the root childless.
#[test]
fn scenario_2_insert_delete_empties_structure() {
    let mut t = printable_trie();
    t.insert(b"a", 1).unwrap();
    assert_eq!(*t.get(b"a").unwrap(), 1);

    t.remove(b"a").unwrap();
    assert_eq!(t.get(b"a").unwrap_err(), TrieError::NotFound);
    assert_eq!(t.len(), 0);

    // Idempotence: a second delete of the same key is a well-defined
    // error, not a panic or silent success, and leaves the structure
    // unchanged.
    assert_eq!(t.remove(b"a").unwrap_err(), TrieError::NotFound);
    assert_eq!(t.len(), 0);
}

/// Scenario 3: two keys sharing a six-byte common prefix force a tail
/// split at the diverging symbol (`d` vs `x`); both remain independently
/// retrievable and the tail pool holds exactly two live entries.
#[test]
fn scenario_3_tail_split_on_divergence() {
    let mut t = printable_trie();
    t.insert(b"abcdef", 10).unwrap();
    t.insert(b"abcxyz", 20).unwrap();

    assert_eq!(*t.get(b"abcdef").unwrap(), 10);
    assert_eq!(*t.get(b"abcxyz").unwrap(), 20);
    assert_eq!(t.len(), 2);
}

/// Scenario 4: bulk insert, then replace one value in place; the old
/// value is returned exactly once (Rust's move semantics stand in for
/// spec.md's "destructor called exactly once" requirement — there is no
/// separate destructor hook to double-invoke).
#[test]
fn scenario_4_bulk_insert_then_replace() {
    let mut t = printable_trie();
    for i in 0..1000u32 {
        let key = format!("k{i:03}");
        t.insert(key.as_bytes(), i as i32).unwrap();
    }
    assert_eq!(t.len(), 1000);

    let old = t.insert(b"k500", 42).unwrap();
    assert_eq!(old, Some(500));
    assert_eq!(*t.get(b"k500").unwrap(), 42);
    assert_eq!(t.len(), 1000);
}

/// Scenario 5: enough distinct keys to force the double array across
/// at least two power-of-two growth boundaries; every inserted key must
/// still be retrievable afterward.
#[test]
fn scenario_5_growth_across_boundaries_preserves_lookups() {
    let mut t = Trie::new(AlphabetMap::full_byte_range());
    let mut keys = Vec::new();
    for i in 0..5000u32 {
        let key = format!("key-{i}-{}", i * 7 + 3);
        keys.push(key);
    }
    for (i, key) in keys.iter().enumerate() {
        t.insert(key.as_bytes(), i as i32).unwrap();
    }
    assert_eq!(t.len(), keys.len());
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(*t.get(key.as_bytes()).unwrap(), i as i32);
    }
}

/// Scenario 6: `prefix_search` over the empty prefix (`TKEYS *`)
/// enumerates every key in the trie.
#[test]
fn scenario_6_empty_prefix_enumerates_everything() {
    let mut t = printable_trie();
    let inserted = ["pool", "prize", "preview", "zzz", "apple"];
    for (i, k) in inserted.iter().enumerate() {
        t.insert(k.as_bytes(), i as i32).unwrap();
    }

    let mut keys: Vec<Vec<u8>> = t.iter().unwrap().map(|(k, _)| k).collect();
    keys.sort();
    let mut expected: Vec<Vec<u8>> = inserted.iter().map(|s| s.as_bytes().to_vec()).collect();
    expected.sort();
    assert_eq!(keys, expected);
}

/// Spec §9 Open Question: a key that is a strict prefix of an
/// already-inserted longer key must still route through a tail split
/// (the `TERM`-walk case) rather than being silently dropped or
/// corrupting the longer key.
#[test]
fn strict_prefix_of_existing_key_splits_tail() {
    let mut t = printable_trie();
    t.insert(b"hello world", 1).unwrap();
    t.insert(b"hello", 2).unwrap();

    assert_eq!(*t.get(b"hello").unwrap(), 2);
    assert_eq!(*t.get(b"hello world").unwrap(), 1);

    // And the reverse order: inserting the prefix first, then the
    // longer key, must also work.
    let mut t2 = printable_trie();
    t2.insert(b"hello", 2).unwrap();
    t2.insert(b"hello world", 1).unwrap();
    assert_eq!(*t2.get(b"hello").unwrap(), 2);
    assert_eq!(*t2.get(b"hello world").unwrap(), 1);
}

/// Testable property: round-trip holds for every inserted key until
/// deletion, after which lookup fails.
#[test]
fn round_trip_property_across_many_keys() {
    let mut t = printable_trie();
    let words = [
        "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta",
    ];
    for (i, w) in words.iter().enumerate() {
        t.insert(w.as_bytes(), i as i32).unwrap();
    }
    for (i, w) in words.iter().enumerate() {
        assert_eq!(*t.get(w.as_bytes()).unwrap(), i as i32);
    }
    t.remove(words[3].as_bytes()).unwrap();
    assert_eq!(t.get(words[3].as_bytes()).unwrap_err(), TrieError::NotFound);
    for (i, w) in words.iter().enumerate() {
        if i != 3 {
            assert_eq!(*t.get(w.as_bytes()).unwrap(), i as i32);
        }
    }
}

/// Testable property: `prefix_search` hands back an owned snapshot, so
/// the trie can keep being mutated while the iterator from an earlier
/// call is still in hand.
#[test]
fn iterator_snapshot_survives_later_mutation() {
    let mut t = printable_trie();
    t.insert(b"a", 1).unwrap();
    t.insert(b"b", 2).unwrap();

    let mut it = t.prefix_search(b"").unwrap();
    assert!(it.next().is_some());

    t.insert(b"c", 3).unwrap();

    let rest: Vec<Vec<u8>> = it.map(|(k, _)| k).collect();
    assert_eq!(rest, vec![b"b".to_vec()]);
    assert_eq!(*t.get(b"c").unwrap(), 3);
}
