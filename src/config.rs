/// Per-instance growth policy. The original C library toggled resize
/// behavior through a process-wide global; the Design Note calls that
/// out as a smell and asks for an instance field instead, with a thin
/// shim only if a host insists on the global shape (nothing in this
/// crate's scope does, so there is no shim).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrieConfig {
    pub(crate) auto_resize: bool,
}

impl Default for TrieConfig {
    fn default() -> Self {
        Self { auto_resize: true }
    }
}

impl TrieConfig {
    pub fn auto_resize(&self) -> bool {
        self.auto_resize
    }
}
