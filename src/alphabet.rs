use rangemap::RangeInclusiveSet;

use crate::error::{Result, TrieError};
use crate::types::TRIE_CHAR_TERM;

/// Caller-supplied encode/decode between external key bytes and the
/// internal `[1, 255]` symbol space, plus the ranges that define which
/// external bytes are legal (spec §4.6).
///
/// The double array and tail pool never look at `AlphabetMap` directly;
/// `Trie::insert`/`get`/`remove`/`prefix_search` call `encode`/`decode`
/// at the boundary and walk on the resulting `TrieChar` bytes.
#[derive(Clone)]
pub struct AlphabetMap {
    ranges: RangeInclusiveSet<u8>,
    byte_to_symbol: Box<[i32; 256]>,
    symbol_to_byte: Vec<u8>,
}

impl Default for AlphabetMap {
    fn default() -> Self {
        Self {
            ranges: RangeInclusiveSet::new(),
            byte_to_symbol: Box::new([-1; 256]),
            symbol_to_byte: vec![0],
        }
    }
}

impl AlphabetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A convenience alphabet covering every byte value `0x01..=0xff`
    /// (everything except the terminator itself), useful for opaque
    /// binary keys.
    pub fn full_byte_range() -> Self {
        let mut map = Self::new();
        map.add_range(0x01, 0xff).expect("full range is always valid");
        map
    }

    /// A convenience alphabet covering printable ASCII, matching the
    /// end-to-end scenarios in spec §8.
    pub fn printable_ascii() -> Self {
        let mut map = Self::new();
        map.add_range(0x20, 0x7e).expect("ascii range is always valid");
        map
    }

    /// Add `begin..=end` (inclusive) to the set of legal external
    /// bytes, merging with any existing ranges, then recompute the
    /// dense encode/decode tables.
    pub fn add_range(&mut self, begin: u8, end: u8) -> Result<()> {
        if begin > end {
            return Err(TrieError::InvalidRange { begin, end });
        }
        self.ranges.insert(begin..=end);
        self.recalc_work_area()
    }

    fn recalc_work_area(&mut self) -> Result<()> {
        self.byte_to_symbol = Box::new([-1; 256]);
        self.symbol_to_byte = vec![0];

        let mut next_symbol: u32 = 1;
        for range in self.ranges.iter() {
            for byte in *range.start()..=*range.end() {
                if next_symbol > 255 {
                    return Err(TrieError::InvalidRange { begin: byte, end: byte });
                }
                self.byte_to_symbol[byte as usize] = next_symbol as i32;
                self.symbol_to_byte.push(byte);
                next_symbol += 1;
            }
        }

        Ok(())
    }

    /// Encode an external key into its internal symbol form, terminated
    /// by [`TRIE_CHAR_TERM`]. Fails with [`TrieError::Encoding`] on the
    /// first byte outside the configured ranges.
    pub fn encode(&self, key: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(key.len() + 1);
        for &b in key {
            let sym = self.byte_to_symbol[b as usize];
            if sym < 0 {
                return Err(TrieError::Encoding { byte: b });
            }
            out.push(sym as u8);
        }
        out.push(TRIE_CHAR_TERM);
        Ok(out)
    }

    /// Decode an internal symbol string (not including the trailing
    /// terminator) back to external bytes. Used only by diagnostics and
    /// iteration key reconstruction; the engine never needs to decode
    /// to operate correctly.
    pub fn decode(&self, symbols: &[u8]) -> Vec<u8> {
        symbols
            .iter()
            .copied()
            .take_while(|&s| s != TRIE_CHAR_TERM)
            .map(|s| self.symbol_to_byte[s as usize])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_and_decodes_round_trip() {
        let map = AlphabetMap::printable_ascii();
        let encoded = map.encode(b"pool").unwrap();
        assert_eq!(encoded.last(), Some(&TRIE_CHAR_TERM));
        let decoded = map.decode(&encoded);
        assert_eq!(decoded, b"pool");
    }

    #[test]
    fn rejects_byte_outside_range() {
        let map = AlphabetMap::printable_ascii();
        let err = map.encode(&[0x01]).unwrap_err();
        assert_eq!(err, TrieError::Encoding { byte: 0x01 });
    }

    #[test]
    fn merges_overlapping_ranges() {
        let mut map = AlphabetMap::new();
        map.add_range(b'a', b'm').unwrap();
        map.add_range(b'k', b'z').unwrap();
        assert!(map.encode(b"a").is_ok());
        assert!(map.encode(b"z").is_ok());
        assert!(map.encode(&[1u8]).is_err());
    }

    #[test]
    fn rejects_inverted_range() {
        let mut map = AlphabetMap::new();
        assert_eq!(
            map.add_range(10, 5).unwrap_err(),
            TrieError::InvalidRange { begin: 10, end: 5 }
        );
    }
}
