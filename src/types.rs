use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Index into the double array / tail pool. Negative values double as
/// free-list links and tail-pointer encodings; see `darray` and `tail`.
pub type TrieIndex = i32;
pub const TRIE_INDEX_MAX: TrieIndex = 0x7fffffff;
pub const TRIE_INDEX_HALFMAX: TrieIndex = 0x3fffffff;
pub const TRIE_INDEX_ERROR: TrieIndex = 0;

/// A byte after alphabet encoding: `[1, 255]`, with `0` reserved for
/// [`TRIE_CHAR_TERM`].
pub type TrieChar = u8;
pub const TRIE_CHAR_TERM: TrieChar = 0;
pub const TRIE_CHAR_MAX: TrieChar = TrieChar::MAX;

pub(crate) const TAIL_START_BLOCKNO: TrieIndex = 2;

/// Serialize into the engine's binary wire format (big-endian, matching
/// the teacher's `darray`/`tail` on-disk layout).
pub trait TrieSerializable {
    fn serialize<T: Write>(&self, writer: &mut T) -> io::Result<()>;

    fn serialized_size(&self) -> usize {
        let mut buf = Vec::new();
        self.serialize(&mut buf).unwrap();
        buf.len()
    }
}

pub trait TrieDeserializable {
    fn deserialize<T: Read>(reader: &mut T) -> io::Result<Self>
    where
        Self: Sized;
}

impl TrieSerializable for i32 {
    fn serialize<T: Write>(&self, writer: &mut T) -> io::Result<()> {
        writer.write_i32::<BigEndian>(*self)
    }

    fn serialized_size(&self) -> usize {
        size_of::<i32>()
    }
}

impl TrieDeserializable for i32 {
    fn deserialize<T: Read>(reader: &mut T) -> io::Result<Self>
    where
        Self: Sized,
    {
        reader.read_i32::<BigEndian>()
    }
}

impl TrieSerializable for u32 {
    fn serialize<T: Write>(&self, writer: &mut T) -> io::Result<()> {
        writer.write_u32::<BigEndian>(*self)
    }

    fn serialized_size(&self) -> usize {
        size_of::<u32>()
    }
}

impl TrieDeserializable for u32 {
    fn deserialize<T: Read>(reader: &mut T) -> io::Result<Self>
    where
        Self: Sized,
    {
        reader.read_u32::<BigEndian>()
    }
}

impl TrieSerializable for String {
    fn serialize<T: Write>(&self, writer: &mut T) -> io::Result<()> {
        let bytes = self.as_bytes();
        writer.write_u32::<BigEndian>(bytes.len() as u32)?;
        writer.write_all(bytes)
    }
}

impl TrieDeserializable for String {
    fn deserialize<T: Read>(reader: &mut T) -> io::Result<Self>
    where
        Self: Sized,
    {
        let len = reader.read_u32::<BigEndian>()? as usize;
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
