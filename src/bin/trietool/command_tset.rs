use crate::Context;

/// `TSET key value`: insert or overwrite. Mirrors `Trie::insert`'s
/// `HashMap`-style return of the previous value, reported so the caller
/// can tell replace from fresh insert.
pub fn tset(context: &mut Context, key: &str, value: String) {
    match context.trie.insert(key.as_bytes(), value) {
        Ok(Some(old)) => println!("OK (replaced \"{old}\")"),
        Ok(None) => println!("OK"),
        Err(e) => eprintln!("tset: {e}"),
    }
}

/// `TSETNX key value`: insert only if absent.
pub fn tsetnx(context: &mut Context, key: &str, value: String) {
    match context.trie.insert_if_absent(key.as_bytes(), value) {
        Ok(()) => println!("OK"),
        Err(e) => eprintln!("tsetnx: {e}"),
    }
}
