#![deny(unsafe_code)]

pub use alphabet::AlphabetMap;
pub use config::TrieConfig;
pub use error::{Result, TrieError};
pub use iter::TrieIterator;
pub use trie::Trie;
pub use types::{
    TrieChar, TrieDeserializable, TrieIndex, TrieSerializable, TRIE_CHAR_MAX, TRIE_CHAR_TERM,
    TRIE_INDEX_ERROR, TRIE_INDEX_MAX,
};

mod alphabet;
mod config;
mod darray;
mod error;
mod int_stack;
mod iter;
mod symbols;
mod tail;
mod trie;
pub mod types;
