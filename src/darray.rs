use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::cmp;
use std::io::{self, Read, Write};

use crate::error::{Result, TrieError};
use crate::symbols::Symbols;
use crate::types::{
    TrieChar, TrieIndex, TRIE_CHAR_MAX, TRIE_INDEX_ERROR, TRIE_INDEX_HALFMAX, TRIE_INDEX_MAX,
};

pub(crate) const DA_SIGNATURE: u32 = 0xdafcdafc;

/// Reserved slots: 0 is the header (`base[0] = SIGNATURE`,
/// `check[0] = length`), 1 is the free-list sentinel, 2 is the root.
pub(crate) const FREE_LIST_HEAD: TrieIndex = 1;
pub(crate) const ROOT_STATE: TrieIndex = 2;
pub(crate) const DA_POOL_BEGIN: TrieIndex = 3;

/// Two parallel signed-integer arrays holding both a tree (occupied
/// cells) and a doubly-linked circular free list (free cells), per
/// spec §3/§4.2/§9 — no heap nodes, just flat `Vec<i32>` plus thin
/// accessors.
pub(crate) struct DoubleArray {
    base: Vec<TrieIndex>,
    check: Vec<TrieIndex>,
    auto_resize: bool,
}

impl Default for DoubleArray {
    fn default() -> Self {
        let len = DA_POOL_BEGIN as usize;
        let mut base = vec![0; len];
        let mut check = vec![0; len];

        base[0] = DA_SIGNATURE as TrieIndex;
        check[0] = len as TrieIndex;

        // Empty free list: sentinel points to itself.
        base[FREE_LIST_HEAD as usize] = -FREE_LIST_HEAD;
        check[FREE_LIST_HEAD as usize] = -FREE_LIST_HEAD;

        // Root's base is conventionally pinned at DA_POOL_BEGIN; the
        // cell it names doesn't exist yet (lazy pool growth happens on
        // first insert, via `expand`).
        base[ROOT_STATE as usize] = DA_POOL_BEGIN;
        check[ROOT_STATE as usize] = 0;

        Self {
            base,
            check,
            auto_resize: true,
        }
    }
}

impl DoubleArray {
    pub(crate) fn set_auto_resize(&mut self, auto_resize: bool) {
        self.auto_resize = auto_resize;
    }

    pub(crate) fn get_root(&self) -> TrieIndex {
        ROOT_STATE
    }

    pub(crate) fn len(&self) -> TrieIndex {
        self.base.len() as TrieIndex
    }

    pub(crate) fn get_base(&self, s: TrieIndex) -> Option<TrieIndex> {
        self.base.get(s as usize).copied()
    }

    pub(crate) fn get_check(&self, s: TrieIndex) -> Option<TrieIndex> {
        self.check.get(s as usize).copied()
    }

    fn set_base(&mut self, s: TrieIndex, val: TrieIndex) {
        self.base[s as usize] = val;
    }

    fn set_check(&mut self, s: TrieIndex, val: TrieIndex) {
        self.check[s as usize] = val;
    }

    /// Walk from `s` using symbol `c`. `None` if no such edge exists.
    pub(crate) fn walk(&self, s: TrieIndex, c: TrieChar) -> Option<TrieIndex> {
        let base = self.get_base(s)?;
        if base <= 0 {
            return None;
        }
        let next = base + c as TrieIndex;
        if self.get_check(next) == Some(s) {
            Some(next)
        } else {
            None
        }
    }

    /// `true` iff `s` holds a tail pointer rather than a branch.
    pub(crate) fn is_separate(&self, s: TrieIndex) -> bool {
        matches!(self.get_base(s), Some(b) if b < 0)
    }

    pub(crate) fn get_tail_index(&self, s: TrieIndex) -> TrieIndex {
        -self.get_base(s).unwrap_or(TRIE_INDEX_ERROR)
    }

    pub(crate) fn set_tail_index(&mut self, s: TrieIndex, tail_block: TrieIndex) {
        self.set_base(s, -tail_block);
    }

    pub(crate) fn has_children(&self, s: TrieIndex) -> bool {
        let Some(base) = self.get_base(s) else {
            return false;
        };
        if base <= 0 {
            return false;
        }
        let max_c = cmp::min(TRIE_CHAR_MAX as TrieIndex, self.len() - base);
        (0..=max_c).any(|c| self.get_check(base + c) == Some(s))
    }

    /// Collect this state's children as sorted symbols, ascending.
    pub(crate) fn output_symbols(&self, s: TrieIndex) -> Symbols {
        let mut syms = Symbols::new();
        let Some(base) = self.get_base(s) else {
            return syms;
        };
        if base <= 0 {
            return syms;
        }
        let max_c = cmp::min(TRIE_CHAR_MAX as TrieIndex, self.len() - base);
        for c in 0..=max_c {
            if self.get_check(base + c) == Some(s) {
                syms.add_fast(c as TrieChar);
            }
        }
        syms
    }

    /// Ensure `to_index` is addressable, growing the arrays
    /// (power-of-two) if necessary and permitted.
    fn prepare_space(&mut self, to_index: TrieIndex) -> Result<()> {
        if to_index < 0 || to_index >= TRIE_INDEX_MAX {
            return Err(TrieError::AllocationFailure);
        }
        if (to_index as usize) < self.base.len() {
            return Ok(());
        }
        self.expand(to_index + 1)
    }

    fn next_pow_of_two(n: TrieIndex) -> TrieIndex {
        let mut p: TrieIndex = 4;
        while p < n {
            if p >= TRIE_INDEX_HALFMAX {
                return TRIE_INDEX_MAX;
            }
            p *= 2;
        }
        p
    }

    /// Grow the arrays to the next power of two `>= size`, threading
    /// the new cells into the free list as a contiguous ascending
    /// segment spliced in immediately before the sentinel.
    pub(crate) fn expand(&mut self, size: TrieIndex) -> Result<()> {
        if (size as usize) <= self.base.len() {
            return Ok(());
        }
        if !self.auto_resize {
            return Err(TrieError::AllocationFailure);
        }
        let new_len = Self::next_pow_of_two(size);
        let old_len = self.base.len() as TrieIndex;
        tracing::trace!(old_len, new_len, "expanding double array");

        self.base.resize(new_len as usize, 0);
        self.check.resize(new_len as usize, 0);

        let prev_last = -self.base[FREE_LIST_HEAD as usize];

        self.check[prev_last as usize] = -old_len;
        self.base[old_len as usize] = -prev_last;
        for i in old_len..(new_len - 1) {
            self.check[i as usize] = -(i + 1);
            self.base[(i + 1) as usize] = -i;
        }
        self.check[(new_len - 1) as usize] = -FREE_LIST_HEAD;
        self.base[FREE_LIST_HEAD as usize] = -(new_len - 1);

        self.check[0] = new_len;
        Ok(())
    }

    /// Unlink `s` from the free list (it is about to become occupied).
    fn assign_cell(&mut self, s: TrieIndex) {
        let prev = -self.base[s as usize];
        let next = -self.check[s as usize];
        self.check[prev as usize] = -next;
        self.base[next as usize] = -prev;
    }

    /// Insert `s` into the free list in ascending-index order (spec §5:
    /// the next allocation from any state prefers the smallest fitting
    /// offset — this is observable and tested).
    pub(crate) fn free_cell(&mut self, s: TrieIndex) {
        let mut i = -self.check[FREE_LIST_HEAD as usize];
        while i != FREE_LIST_HEAD && i < s {
            i = -self.check[i as usize];
        }
        let prev = -self.base[i as usize];
        self.check[s as usize] = -i;
        self.base[s as usize] = -prev;
        self.check[prev as usize] = -s;
        self.base[i as usize] = -s;
    }

    fn check_free_cell(&mut self, s: TrieIndex) -> Result<bool> {
        self.prepare_space(s)?;
        Ok(self.check[s as usize] < 0)
    }

    fn fit_symbols(&mut self, base: TrieIndex, symbols: &Symbols) -> Result<bool> {
        for i in 0..symbols.num() {
            let c = symbols.get(i).unwrap();
            if base > TRIE_INDEX_MAX - c as TrieIndex {
                return Ok(false);
            }
            if !self.check_free_cell(base + c as TrieIndex)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Find the smallest `base` offset such that every symbol in
    /// `symbols`, added to it, lands on a currently-free cell.
    fn find_free_base(&mut self, symbols: &Symbols) -> Result<TrieIndex> {
        let first = symbols.get(0).ok_or(TrieError::AllocationFailure)? as TrieIndex;

        let mut s = -self.check[FREE_LIST_HEAD as usize];
        while s != FREE_LIST_HEAD && s < first + DA_POOL_BEGIN {
            s = -self.check[s as usize];
        }
        if s == FREE_LIST_HEAD {
            s = first + DA_POOL_BEGIN;
            loop {
                self.prepare_space(s)?;
                if self.check[s as usize] < 0 {
                    break;
                }
                s += 1;
            }
        }
        while !self.fit_symbols(s - first, symbols)? {
            if -self.check[s as usize] == FREE_LIST_HEAD {
                let grown = self.len() + 1;
                self.expand(grown)?;
            }
            s = -self.check[s as usize];
        }
        Ok(s - first)
    }

    /// Relocate the subtree rooted at `s` so its children live at
    /// `new_base + c` instead of `old_base + c`, rewriting grandchild
    /// back-pointers. The only operation that moves nodes.
    fn reindex(&mut self, s: TrieIndex, new_base: TrieIndex) -> Result<()> {
        let old_base = self.get_base(s).unwrap_or(TRIE_INDEX_ERROR);
        let symbols = self.output_symbols(s);

        tracing::trace!(state = s, old_base, new_base, "relocating subtree");

        for i in 0..symbols.num() {
            let c = symbols.get(i).unwrap() as TrieIndex;
            let old_next = old_base + c;
            let new_next = new_base + c;
            let old_next_base = self.get_base(old_next).unwrap_or(TRIE_INDEX_ERROR);

            self.assign_cell(new_next);
            self.set_check(new_next, s);
            self.set_base(new_next, old_next_base);

            if old_next_base > 0 {
                let max_c = cmp::min(TRIE_CHAR_MAX as TrieIndex, self.len() - old_next_base);
                for cc in 0..=max_c {
                    if self.get_check(old_next_base + cc) == Some(old_next) {
                        self.set_check(old_next_base + cc, new_next);
                    }
                }
            }

            self.free_cell(old_next);
        }
        self.set_base(s, new_base);
        Ok(())
    }

    /// Ensure an edge labelled `c` exists out of `s`, relocating `s`'s
    /// subtree if the natural cell collides with another state's
    /// child.
    pub(crate) fn insert_edge(&mut self, s: TrieIndex, c: TrieChar) -> Result<TrieIndex> {
        let base = self.get_base(s).unwrap_or(TRIE_INDEX_ERROR);
        let next;
        if base > TRIE_INDEX_ERROR {
            let candidate = base + c as TrieIndex;
            if self.get_check(candidate) == Some(s) {
                return Ok(candidate);
            }
            if base > TRIE_INDEX_MAX - c as TrieIndex || !self.check_free_cell(candidate)? {
                let mut symbols = self.output_symbols(s);
                symbols.add(c);
                let new_base = self.find_free_base(&symbols)?;
                self.reindex(s, new_base)?;
                next = new_base + c as TrieIndex;
            } else {
                next = candidate;
            }
        } else {
            let mut symbols = Symbols::new();
            symbols.add(c);
            let new_base = self.find_free_base(&symbols)?;
            self.set_base(s, new_base);
            next = new_base + c as TrieIndex;
        }
        self.assign_cell(next);
        self.set_check(next, s);
        Ok(next)
    }

    /// Free `s` and walk up via `check`, freeing every newly-childless
    /// ancestor, stopping at `parent` or at the first branching state.
    pub(crate) fn prune(&mut self, parent: TrieIndex, mut s: TrieIndex) {
        while s != parent && !self.has_children(s) {
            let Some(p) = self.get_check(s) else { break };
            self.free_cell(s);
            s = p;
        }
    }

    pub(crate) fn serialize<T: Write>(&self, writer: &mut T) -> io::Result<()> {
        writer.write_u32::<BigEndian>(DA_SIGNATURE)?;
        writer.write_i32::<BigEndian>(self.base.len() as i32)?;
        for i in 0..self.base.len() {
            writer.write_i32::<BigEndian>(self.base[i])?;
            writer.write_i32::<BigEndian>(self.check[i])?;
        }
        Ok(())
    }

    pub(crate) fn deserialize<T: Read>(reader: &mut T) -> io::Result<Self> {
        if reader.read_u32::<BigEndian>()? != DA_SIGNATURE {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad double array signature"));
        }
        let len = reader.read_i32::<BigEndian>()? as usize;
        let mut base = Vec::with_capacity(len);
        let mut check = Vec::with_capacity(len);
        for _ in 0..len {
            base.push(reader.read_i32::<BigEndian>()?);
            check.push(reader.read_i32::<BigEndian>()?);
        }
        Ok(Self {
            base,
            check,
            auto_resize: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_array_has_no_children_at_root() {
        let da = DoubleArray::default();
        assert!(!da.has_children(da.get_root()));
        assert!(da.walk(da.get_root(), b'a').is_none());
    }

    #[test]
    fn insert_edge_then_walk_round_trips() {
        let mut da = DoubleArray::default();
        let root = da.get_root();
        let next = da.insert_edge(root, b'a').unwrap();
        assert_eq!(da.walk(root, b'a'), Some(next));
    }

    #[test]
    fn free_list_stays_ascending_after_growth() {
        let mut da = DoubleArray::default();
        let root = da.get_root();
        // Force several expansions by inserting many distinct symbols.
        for c in 0u8..=200 {
            da.insert_edge(root, c).unwrap();
        }
        // Walk the free list from the sentinel and check strict
        // ascending order all the way around.
        let sentinel = FREE_LIST_HEAD;
        let mut i = -da.check[sentinel as usize];
        let mut prev = sentinel;
        while i != sentinel {
            assert!(i > prev, "free list must be strictly ascending");
            prev = i;
            i = -da.check[i as usize];
        }
    }

    #[test]
    fn reindex_preserves_existing_edges() {
        let mut da = DoubleArray::default();
        let root = da.get_root();
        let a = da.insert_edge(root, b'a').unwrap();
        // Force a relocation of root by inserting enough siblings that
        // a later insert must collide and reindex.
        for c in b'b'..=b'z' {
            da.insert_edge(root, c).unwrap();
        }
        // Whatever root's base became, the original edge must still
        // resolve to a consistent state reachable the same way.
        assert!(da.get_check(a).is_some());
        assert_eq!(da.walk(root, b'a').is_some(), true);
    }

    #[test]
    fn prune_removes_childless_chain_up_to_parent() {
        let mut da = DoubleArray::default();
        let root = da.get_root();
        let a = da.insert_edge(root, b'a').unwrap();
        let b = da.insert_edge(a, b'b').unwrap();
        assert!(da.has_children(root));
        // Mark `b` as deleted (as Trie::remove would) then prune.
        da.free_cell(b);
        da.prune(root, a);
        assert!(!da.has_children(root));
    }
}
