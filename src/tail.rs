use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::types::{
    TrieChar, TrieDeserializable, TrieIndex, TrieSerializable, TAIL_START_BLOCKNO, TRIE_CHAR_TERM,
};

pub(crate) const TAIL_SIGNATURE: u32 = 0xdffcdffc;

/// One slab entry: the suffix of a path that currently has no
/// branching, plus the owned key/value pair it terminates in. `None`
/// suffix means "this block is a free-list link, not live data" is
/// represented instead by `next_free != -1`; a live block with an
/// empty suffix (key ends exactly at this node) stores `Some(vec![])`.
struct TailEntry<V> {
    suffix: Option<Vec<TrieChar>>,
    key: Box<[u8]>,
    val: Option<V>,
    next_free: TrieIndex,
}

impl<V> Default for TailEntry<V> {
    fn default() -> Self {
        Self {
            suffix: None,
            key: Box::new([]),
            val: None,
            next_free: -1,
        }
    }
}

/// Slab of tail entries addressed as `TAIL_START_BLOCKNO + block`, with
/// a free list threaded through `next_free` (spec §4.3).
pub(crate) struct TailPool<V> {
    entries: Vec<TailEntry<V>>,
    first_free: TrieIndex,
    used: usize,
}

impl<V> Default for TailPool<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            first_free: 0,
            used: 0,
        }
    }
}

impl<V> TailPool<V> {
    pub(crate) fn used(&self) -> usize {
        self.used
    }

    fn index_of(block: TrieIndex) -> usize {
        (block - TAIL_START_BLOCKNO) as usize
    }

    fn block_of(index: usize) -> TrieIndex {
        index as TrieIndex + TAIL_START_BLOCKNO
    }

    /// Allocate a new block, doubling the pool when the free list is
    /// empty (power-of-two growth, matching the double array's own
    /// policy).
    pub(crate) fn alloc(&mut self, key: Box<[u8]>, val: V) -> TrieIndex {
        if self.first_free == 0 {
            self.grow();
        }
        let block = self.first_free;
        let idx = Self::index_of(block);
        self.first_free = self.entries[idx].next_free;
        self.entries[idx] = TailEntry {
            suffix: None,
            key,
            val: Some(val),
            next_free: -1,
        };
        self.used += 1;
        block
    }

    fn grow(&mut self) {
        let old_len = self.entries.len();
        let new_len = if old_len == 0 { 4 } else { old_len * 2 };
        tracing::trace!(old_len, new_len, "growing tail pool");
        self.entries.resize_with(new_len, TailEntry::default);
        // Chain every newly added block into the free list, ascending,
        // terminated by the pool's own `first_free` (0 means "none").
        for i in (old_len..new_len).rev() {
            self.entries[i].next_free = self.first_free;
            self.first_free = Self::block_of(i);
        }
    }

    /// Return the block to the free list, in ascending-index order
    /// (testable property: free list ordering), and hand the owned
    /// value back to the caller — the Rust-native replacement for the
    /// original's caller-destructor-on-free hook.
    pub(crate) fn free(&mut self, block: TrieIndex) -> Option<V> {
        let idx = Self::index_of(block);
        let entry = &mut self.entries[idx];
        let val = entry.val.take();
        entry.suffix = None;
        entry.key = Box::new([]);

        // Insert `block` into the free list in ascending order. `0` is
        // the list terminator (no block is ever addressed 0, since real
        // blocks start at `TAIL_START_BLOCKNO`).
        if self.first_free == 0 || block < self.first_free {
            self.entries[idx].next_free = self.first_free;
            self.first_free = block;
        } else {
            let mut prev = self.first_free;
            loop {
                let next = self.entries[Self::index_of(prev)].next_free;
                if next == 0 || next > block {
                    self.entries[Self::index_of(prev)].next_free = block;
                    self.entries[idx].next_free = next;
                    break;
                }
                prev = next;
            }
        }
        self.used -= 1;
        val
    }

    fn is_live(&self, block: TrieIndex) -> bool {
        let idx = Self::index_of(block);
        idx < self.entries.len() && self.entries[idx].next_free == -1
    }

    pub(crate) fn get_suffix(&self, block: TrieIndex) -> Option<&[TrieChar]> {
        if !self.is_live(block) {
            return None;
        }
        self.entries[Self::index_of(block)].suffix.as_deref()
    }

    /// Duplicate `bytes` before freeing the old suffix, tolerating the
    /// incoming slice aliasing the stored one (spec §9 "Suffix
    /// aliasing").
    pub(crate) fn set_suffix(&mut self, block: TrieIndex, bytes: Option<&[TrieChar]>) {
        let owned = bytes.map(|b| b.to_vec());
        self.entries[Self::index_of(block)].suffix = owned;
    }

    pub(crate) fn get_data(&self, block: TrieIndex) -> Option<&V> {
        if !self.is_live(block) {
            return None;
        }
        self.entries[Self::index_of(block)].val.as_ref()
    }

    pub(crate) fn get_data_mut(&mut self, block: TrieIndex) -> Option<&mut V> {
        if !self.is_live(block) {
            return None;
        }
        self.entries[Self::index_of(block)].val.as_mut()
    }

    pub(crate) fn get_key(&self, block: TrieIndex) -> Option<&[u8]> {
        if !self.is_live(block) {
            return None;
        }
        Some(&self.entries[Self::index_of(block)].key)
    }

    /// Replace the value, returning the old one. Spec §4.4 `replace`
    /// ordering (set new, then drop old) falls out of the return-the-old
    /// value shape for free: the caller decides whether to drop it.
    pub(crate) fn set_data(&mut self, block: TrieIndex, val: V) -> Option<V> {
        self.entries[Self::index_of(block)].val.replace(val)
    }

    /// Walk the tail suffix at `block` starting at `*suffix_idx`
    /// against symbol `c`. Advances `*suffix_idx` unless `c` is the
    /// terminator (matching the terminator never consumes a suffix
    /// position, since the stored suffix already ends before it).
    pub(crate) fn walk_char(&self, block: TrieIndex, suffix_idx: u16, c: TrieChar) -> Option<u16> {
        let suffix = self.get_suffix(block)?;
        let at = suffix.get(suffix_idx as usize).copied().unwrap_or(TRIE_CHAR_TERM);
        if at != c {
            return None;
        }
        if c == TRIE_CHAR_TERM {
            Some(suffix_idx)
        } else {
            Some(suffix_idx + 1)
        }
    }

    pub(crate) fn is_walkable_char(&self, block: TrieIndex, suffix_idx: u16, c: TrieChar) -> bool {
        self.walk_char(block, suffix_idx, c).is_some()
    }

    /// Allocate a fresh block holding `key`/`val` with the given
    /// suffix already installed, the one-shot shape `Trie`'s
    /// branch/split paths use (spec's `add_suffix` + `set_data` pair
    /// collapsed into a single call since `V` need not be `Default`).
    pub(crate) fn alloc_with_suffix(
        &mut self,
        key: Box<[u8]>,
        val: V,
        suffix: Option<&[TrieChar]>,
    ) -> TrieIndex {
        let block = self.alloc(key, val);
        self.set_suffix(block, suffix);
        block
    }
}

impl<V: TrieSerializable> TrieSerializable for TailPool<V> {
    fn serialize<T: Write>(&self, writer: &mut T) -> io::Result<()> {
        writer.write_u32::<BigEndian>(TAIL_SIGNATURE)?;
        writer.write_i32::<BigEndian>(self.entries.len() as i32)?;
        writer.write_i32::<BigEndian>(self.first_free)?;
        for entry in &self.entries {
            let is_live = entry.next_free == -1;
            writer.write_u8(is_live as u8)?;
            if is_live {
                let suffix = entry.suffix.as_deref().unwrap_or(&[]);
                writer.write_u32::<BigEndian>(suffix.len() as u32)?;
                writer.write_all(suffix)?;
                writer.write_u32::<BigEndian>(entry.key.len() as u32)?;
                writer.write_all(&entry.key)?;
                entry
                    .val
                    .as_ref()
                    .expect("live entry always has a value")
                    .serialize(writer)?;
            } else {
                writer.write_i32::<BigEndian>(entry.next_free)?;
            }
        }
        Ok(())
    }
}

impl<V: TrieDeserializable> TrieDeserializable for TailPool<V> {
    fn deserialize<T: Read>(reader: &mut T) -> io::Result<Self> {
        if reader.read_u32::<BigEndian>()? != TAIL_SIGNATURE {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad tail pool signature"));
        }
        let len = reader.read_i32::<BigEndian>()? as usize;
        let first_free = reader.read_i32::<BigEndian>()?;
        let mut entries = Vec::with_capacity(len);
        let mut used = 0;
        for _ in 0..len {
            let is_live = reader.read_u8()? != 0;
            if is_live {
                let suffix_len = reader.read_u32::<BigEndian>()? as usize;
                let mut suffix = vec![0u8; suffix_len];
                reader.read_exact(&mut suffix)?;
                let key_len = reader.read_u32::<BigEndian>()? as usize;
                let mut key = vec![0u8; key_len];
                reader.read_exact(&mut key)?;
                let val = V::deserialize(reader)?;
                used += 1;
                entries.push(TailEntry {
                    suffix: Some(suffix),
                    key: key.into_boxed_slice(),
                    val: Some(val),
                    next_free: -1,
                });
            } else {
                let next_free = reader.read_i32::<BigEndian>()?;
                entries.push(TailEntry {
                    suffix: None,
                    key: Box::new([]),
                    val: None,
                    next_free,
                });
            }
        }
        Ok(Self {
            entries,
            first_free,
            used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_free_alloc_reuses_block_and_tracks_used() {
        let mut pool: TailPool<i32> = TailPool::default();
        let a = pool.alloc(Box::new(*b"k1"), 1);
        assert_eq!(pool.used(), 1);
        let old = pool.free(a);
        assert_eq!(old, Some(1));
        assert_eq!(pool.used(), 0);
        let b = pool.alloc(Box::new(*b"k2"), 2);
        assert_eq!(a, b);
        assert_eq!(pool.used(), 1);
    }

    #[test]
    fn suffix_set_tolerates_self_aliasing() {
        let mut pool: TailPool<i32> = TailPool::default();
        let block = pool.alloc(Box::new(*b"k"), 1);
        pool.set_suffix(block, Some(b"hello"));
        let existing = pool.get_suffix(block).unwrap().to_vec();
        pool.set_suffix(block, Some(&existing));
        assert_eq!(pool.get_suffix(block), Some(&b"hello"[..]));
    }

    #[test]
    fn walk_char_matches_terminator_without_advancing() {
        let mut pool: TailPool<i32> = TailPool::default();
        let block = pool.alloc(Box::new(*b"k"), 1);
        pool.set_suffix(block, Some(&[5, 6, 0]));
        let idx = pool.walk_char(block, 0, 5).unwrap();
        let idx = pool.walk_char(block, idx, 6).unwrap();
        let idx2 = pool.walk_char(block, idx, 0).unwrap();
        assert_eq!(idx, idx2);
    }

    #[test]
    fn free_list_is_ascending_order() {
        let mut pool: TailPool<i32> = TailPool::default();
        let a = pool.alloc(Box::new(*b"a"), 1);
        let b = pool.alloc(Box::new(*b"b"), 2);
        let c = pool.alloc(Box::new(*b"c"), 3);
        pool.free(c);
        pool.free(a);
        pool.free(b);
        // Re-allocating three times should hand back blocks in
        // ascending index order: a, b, c.
        let r1 = pool.alloc(Box::new(*b"x"), 9);
        let r2 = pool.alloc(Box::new(*b"y"), 9);
        let r3 = pool.alloc(Box::new(*b"z"), 9);
        assert_eq!((r1, r2, r3), (a, b, c));
    }
}
