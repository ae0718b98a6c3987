use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use trie_store::{AlphabetMap, Trie};

/// Load-on-start, save-on-mutate wrapper around a [`Trie`], the small
/// persistence shim a one-shot CLI process needs even though the engine
/// itself has no file format (spec §6: the core exposes enumeration and
/// per-entry access, the file format is a collaborator's job — here,
/// this binary is that collaborator, and a minimal one at that).
pub struct Context {
    pub trie: Trie<String>,
    path: PathBuf,
}

impl Context {
    pub fn load(path: &Path) -> io::Result<Self> {
        let trie = if path.exists() {
            let mut reader = BufReader::new(File::open(path)?);
            Trie::deserialize(&mut reader, AlphabetMap::full_byte_range())?
        } else {
            Trie::new(AlphabetMap::full_byte_range())
        };
        Ok(Self {
            trie,
            path: path.to_path_buf(),
        })
    }

    pub fn save(&self) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        self.trie.serialize(&mut writer)
    }
}
