use crate::Context;

/// `TGET key`.
pub fn tget(context: &Context, key: &str) {
    match context.trie.get(key.as_bytes()) {
        Ok(val) => println!("{val}"),
        Err(e) => eprintln!("tget: key '{key}' {e}"),
    }
}
