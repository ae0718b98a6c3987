use crate::Context;

/// `TDEL key...`: deletes any number of keys, returning the count
/// actually removed (spec §6: "`TDEL` accepts any number of keys and
/// returns the count deleted").
pub fn tdel(context: &mut Context, keys: &[String]) {
    let mut deleted = 0u64;
    for key in keys {
        if context.trie.remove(key.as_bytes()).is_ok() {
            deleted += 1;
        }
    }
    println!("{deleted}");
}
