use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::alphabet::AlphabetMap;
use crate::config::TrieConfig;
use crate::darray::DoubleArray;
use crate::error::{Result, TrieError};
use crate::int_stack::IntStack;
use crate::iter::TrieIterator;
use crate::tail::TailPool;
use crate::types::{
    TrieChar, TrieDeserializable, TrieIndex, TrieSerializable, TRIE_CHAR_TERM,
};

const TRIE_SIGNATURE: u32 = 0xd9fcd9fc;

/// An ordered byte-string key/value store backed by a double-array
/// trie with tail-pool suffix compression (spec §1). Keys are mapped
/// through `alphabet` into the internal symbol space before the
/// double array ever sees them.
pub struct Trie<V> {
    alphabet: AlphabetMap,
    da: DoubleArray,
    tail: TailPool<V>,
    config: TrieConfig,
    num_entries: usize,
}

impl<V> Trie<V> {
    pub fn new(alphabet: AlphabetMap) -> Self {
        Self::with_config(alphabet, TrieConfig::default())
    }

    pub fn with_config(alphabet: AlphabetMap, config: TrieConfig) -> Self {
        let mut da = DoubleArray::default();
        da.set_auto_resize(config.auto_resize);
        Self {
            alphabet,
            da,
            tail: TailPool::default(),
            config,
            num_entries: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.num_entries
    }

    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    pub fn config(&self) -> &TrieConfig {
        &self.config
    }

    /// Toggle growth at runtime, propagating to the underlying double
    /// array (see [`TrieConfig`] for why this is an instance field
    /// rather than the original's process-wide switch).
    pub fn set_auto_resize(&mut self, auto_resize: bool) {
        self.config.auto_resize = auto_resize;
        self.da.set_auto_resize(auto_resize);
    }

    /// Spec §6 `enable_resize()`: allow growth paths to call
    /// `DoubleArray::expand`/`TailPool::grow` again.
    pub fn enable_resize(&mut self) {
        self.set_auto_resize(true);
    }

    /// Spec §6 `disable_resize()`: any allocation that would otherwise
    /// grow the arrays instead fails with `TrieError::AllocationFailure`.
    pub fn disable_resize(&mut self) {
        self.set_auto_resize(false);
    }

    /// Insert `key` mapped to `val`, overwriting and returning any
    /// previous value.
    pub fn insert(&mut self, key: &[u8], val: V) -> Result<Option<V>> {
        self.store(key, val, true)
    }

    /// Insert `key` only if absent; `Err(TrieError::Duplicate)` leaves
    /// the trie untouched.
    pub fn insert_if_absent(&mut self, key: &[u8], val: V) -> Result<()> {
        self.store(key, val, false).map(|_| ())
    }

    pub fn get(&self, key: &[u8]) -> Result<&V> {
        let enc = self.alphabet.encode(key)?;
        let (_, block) = self.locate(&enc).ok_or(TrieError::NotFound)?;
        self.tail.get_data(block).ok_or(TrieError::NotFound)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Result<&mut V> {
        let enc = self.alphabet.encode(key)?;
        let (_, block) = self.locate(&enc).ok_or(TrieError::NotFound)?;
        self.tail.get_data_mut(block).ok_or(TrieError::NotFound)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_ok()
    }

    /// Remove `key`, pruning every ancestor state left childless by its
    /// removal (spec §4.2 `prune`).
    pub fn remove(&mut self, key: &[u8]) -> Result<V> {
        let enc = self.alphabet.encode(key)?;
        let (state, block) = self.locate(&enc).ok_or(TrieError::NotFound)?;
        let val = self.tail.free(block).ok_or(TrieError::NotFound)?;
        self.da.prune(self.da.get_root(), state);
        self.num_entries -= 1;
        Ok(val)
    }

    /// Enumerate every key starting with `prefix`, in ascending symbol
    /// order (spec §4.6; an empty prefix enumerates the whole trie).
    ///
    /// The returned iterator owns a snapshot of every matching
    /// `(key, value)` pair, collected up front rather than read lazily
    /// through a borrow of `self` (spec §9 "Iterator safety"/"aliasing
    /// hazard": the source's iterator holds a raw pointer into `base[]`
    /// that a later insert can relocate out from under it. Borrowing
    /// `self` for the iterator's lifetime would statically forbid any
    /// mutation for as long as the iterator lives — correct, but it
    /// makes a live mutation-counter check on every `next()` permanently
    /// unreachable dead code, since the borrow checker already rules out
    /// the hazard it exists to catch. Owning the snapshot outright
    /// removes the hazard instead of guarding against it at runtime, and
    /// lets callers freely mutate the trie while holding an iterator).
    pub fn prefix_search(&self, prefix: &[u8]) -> Result<TrieIterator<V>>
    where
        V: Clone,
    {
        let blocks = self.collect_prefix_blocks(prefix)?;
        let entries = blocks
            .into_iter()
            .map(|block| {
                let key = self.tail_key(block).to_vec();
                let val = self
                    .tail_data(block)
                    .expect("a block collected from a live DFS is still live")
                    .clone();
                (key, val)
            })
            .collect();
        Ok(TrieIterator::new(entries))
    }

    pub fn iter(&self) -> Result<TrieIterator<V>>
    where
        V: Clone,
    {
        self.prefix_search(&[])
    }

    pub fn clear(&mut self) {
        let mut da = DoubleArray::default();
        da.set_auto_resize(self.config.auto_resize);
        self.da = da;
        self.tail = TailPool::default();
        self.num_entries = 0;
    }

    /// Clear the trie, reporting progress as entries are dropped.
    /// Useful for CLI callers tearing down a large resident trie. Spec
    /// §4.4 `empty(callback)`: the callback takes the done-count alone
    /// and fires "every 2^16 slots," not on every single freed slot.
    pub fn clear_with(&mut self, mut progress: impl FnMut(usize)) {
        const PROGRESS_STRIDE: usize = 1 << 16;
        let total = self.num_entries;
        if total > 0 {
            let blocks = self.collect_blocks(self.da.get_root());
            for (i, _block) in blocks.into_iter().enumerate() {
                let done = i + 1;
                if done % PROGRESS_STRIDE == 0 {
                    progress(done);
                }
            }
        }
        self.clear();
    }

    pub(crate) fn tail_key(&self, block: TrieIndex) -> &[u8] {
        self.tail.get_key(block).unwrap_or(&[])
    }

    pub(crate) fn tail_data(&self, block: TrieIndex) -> Option<&V> {
        self.tail.get_data(block)
    }

    fn store(&mut self, key: &[u8], val: V, overwrite: bool) -> Result<Option<V>> {
        let enc = self.alphabet.encode(key)?;
        let (s, consumed) = self.walk_da(&enc);
        if self.da.is_separate(s) {
            self.insert_at_tail(s, &enc[consumed..], key, val, overwrite)
        } else if consumed < enc.len() {
            self.branch_in_branch(s, &enc[consumed..], key, val)
        } else {
            Err(TrieError::Corrupt(
                "walk terminated on a non-separate state with nothing left to consume",
            ))
        }
    }

    /// Walk from root along `enc`, stopping at the first state that is
    /// already a tail pointer (can't walk further in the double array)
    /// or the first symbol without a matching edge. Returns the state
    /// reached and how many symbols of `enc` were consumed getting
    /// there.
    fn walk_da(&self, enc: &[TrieChar]) -> (TrieIndex, usize) {
        let mut s = self.da.get_root();
        let mut i = 0;
        loop {
            if self.da.is_separate(s) || i == enc.len() {
                break;
            }
            match self.da.walk(s, enc[i]) {
                Some(next) => {
                    s = next;
                    i += 1;
                }
                None => break,
            }
        }
        (s, i)
    }

    /// Find the (state, tail block) holding exactly `enc`, if any.
    fn locate(&self, enc: &[TrieChar]) -> Option<(TrieIndex, TrieIndex)> {
        let (s, consumed) = self.walk_da(enc);
        if !self.da.is_separate(s) {
            return None;
        }
        let block = self.da.get_tail_index(s);
        let mut idx = 0u16;
        for &c in &enc[consumed..] {
            idx = self.tail.walk_char(block, idx, c)?;
        }
        Some((s, block))
    }

    /// `s` has no edge for `remaining[0]`: literalize exactly one edge,
    /// then tail-compress everything after it.
    fn branch_in_branch(
        &mut self,
        s: TrieIndex,
        remaining: &[TrieChar],
        key: &[u8],
        val: V,
    ) -> Result<Option<V>> {
        let c0 = remaining[0];
        let new_state = self.da.insert_edge(s, c0)?;
        let rest = &remaining[1..];
        let block = self
            .tail
            .alloc_with_suffix(key.to_vec().into_boxed_slice(), val, Some(rest));
        self.da.set_tail_index(new_state, block);
        self.num_entries += 1;
        Ok(None)
    }

    /// `s` is already a tail pointer whose stored suffix conflicts (or
    /// matches) `remaining`. Finds the first point of divergence,
    /// materializes any shared prefix as literal edges (a branch point
    /// no longer qualifies for compression), then splits into two tail
    /// entries — or, if the two never diverge, treats it as storing to
    /// an existing key.
    fn insert_at_tail(
        &mut self,
        s: TrieIndex,
        remaining: &[TrieChar],
        key: &[u8],
        val: V,
        overwrite: bool,
    ) -> Result<Option<V>> {
        let old_block = self.da.get_tail_index(s);
        let old_suffix = self.tail.get_suffix(old_block).unwrap_or(&[]).to_vec();

        let mut i = 0usize;
        loop {
            let oc = old_suffix.get(i).copied().unwrap_or(TRIE_CHAR_TERM);
            let nc = remaining.get(i).copied().unwrap_or(TRIE_CHAR_TERM);
            if oc != nc {
                break;
            }
            if oc == TRIE_CHAR_TERM {
                if !overwrite {
                    return Err(TrieError::Duplicate);
                }
                let old = self.tail.set_data(old_block, val);
                return Ok(old);
            }
            i += 1;
        }

        let mut cur = s;
        for &c in &old_suffix[..i] {
            cur = self.da.insert_edge(cur, c)?;
        }

        let (old_c, old_rest) = Self::split_at(&old_suffix, i);
        let (new_c, new_rest) = Self::split_at(remaining, i);

        // Reserve both destination edges before touching `old_block`:
        // these are the only fallible steps left (allocation failure),
        // and neither has mutated the old entry yet. If either fails,
        // `old_block` is still live and `s` still points at it, so the
        // trie is left exactly as it was before this call — spec §7's
        // "no partial inserts" (no destroyed-and-unrecoverable old
        // entry, no edge pointing at a not-yet-allocated tail block).
        let old_state = self.da.insert_edge(cur, old_c)?;
        let new_state = self.da.insert_edge(cur, new_c)?;

        let old_key = self.tail.get_key(old_block).unwrap().to_vec().into_boxed_slice();
        let old_val = self
            .tail
            .free(old_block)
            .ok_or(TrieError::Corrupt("tail entry at a separate state was not live"))?;
        let old_block2 = self.tail.alloc_with_suffix(old_key, old_val, Some(&old_rest));
        self.da.set_tail_index(old_state, old_block2);

        let new_block = self
            .tail
            .alloc_with_suffix(key.to_vec().into_boxed_slice(), val, Some(&new_rest));
        self.da.set_tail_index(new_state, new_block);

        self.num_entries += 1;
        Ok(None)
    }

    fn split_at(buf: &[TrieChar], i: usize) -> (TrieChar, Vec<TrieChar>) {
        let c = buf.get(i).copied().unwrap_or(TRIE_CHAR_TERM);
        let rest = if c == TRIE_CHAR_TERM {
            Vec::new()
        } else {
            buf[i + 1..].to_vec()
        };
        (c, rest)
    }

    /// Locate the double-array state (or lone tail entry) that all keys
    /// starting with `prefix` hang off of, then collect every tail
    /// block beneath it via an explicit DFS stack.
    fn collect_prefix_blocks(&self, prefix: &[u8]) -> Result<Vec<TrieIndex>> {
        let mut enc = self.alphabet.encode(prefix)?;
        enc.pop();
        match self.locate_prefix(&enc) {
            Some(start) => Ok(self.collect_blocks(start)),
            None => Ok(Vec::new()),
        }
    }

    fn locate_prefix(&self, enc_prefix: &[TrieChar]) -> Option<TrieIndex> {
        let mut s = self.da.get_root();
        let mut i = 0;
        while i < enc_prefix.len() {
            if self.da.is_separate(s) {
                let block = self.da.get_tail_index(s);
                let mut idx = 0u16;
                for &c in &enc_prefix[i..] {
                    idx = self.tail.walk_char(block, idx, c)?;
                }
                return Some(s);
            }
            match self.da.walk(s, enc_prefix[i]) {
                Some(next) => {
                    s = next;
                    i += 1;
                }
                None => return None,
            }
        }
        Some(s)
    }

    pub(crate) fn collect_blocks(&self, start: TrieIndex) -> Vec<TrieIndex> {
        let mut out = Vec::new();
        if self.da.is_separate(start) {
            out.push(self.da.get_tail_index(start));
            return out;
        }
        let mut stack = IntStack::new();
        stack.push(start);
        while let Some(s) = stack.pop() {
            if self.da.is_separate(s) {
                out.push(self.da.get_tail_index(s));
                continue;
            }
            let syms = self.da.output_symbols(s);
            for i in (0..syms.num()).rev() {
                let c = syms.get(i).unwrap();
                if let Some(next) = self.da.walk(s, c) {
                    stack.push(next);
                }
            }
        }
        out
    }
}

/// Whole-trie serialization, matching the teacher's `ROTrie::serialize`
/// shape: the engine hands a collaborator (the snapshot/AOF layer, out
/// of scope per spec §6) the raw bytes of its double array and tail
/// pool; it does not itself know any file format. The `AlphabetMap` is
/// not persisted — callers reconstruct a `Trie` with the same alphabet
/// they used to build it, exactly as they must supply one to `Trie::new`.
impl<V: TrieSerializable> Trie<V> {
    pub fn serialize<T: Write>(&self, writer: &mut T) -> io::Result<()> {
        writer.write_u32::<BigEndian>(TRIE_SIGNATURE)?;
        writer.write_u32::<BigEndian>(self.num_entries as u32)?;
        self.da.serialize(writer)?;
        self.tail.serialize(writer)
    }
}

impl<V: TrieDeserializable> Trie<V> {
    pub fn deserialize<T: Read>(reader: &mut T, alphabet: AlphabetMap) -> io::Result<Self> {
        if reader.read_u32::<BigEndian>()? != TRIE_SIGNATURE {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad trie signature"));
        }
        let num_entries = reader.read_u32::<BigEndian>()? as usize;
        let da = DoubleArray::deserialize(reader)?;
        let tail = TailPool::deserialize(reader)?;
        Ok(Self {
            alphabet,
            da,
            tail,
            config: TrieConfig::default(),
            num_entries,
        })
    }
}
