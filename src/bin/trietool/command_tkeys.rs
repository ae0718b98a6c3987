use regex::Regex;

use crate::Context;

/// `TKEYS pattern`: `pattern` must end in `*` (spec §6); everything
/// before the trailing `*` is the literal prefix to enumerate. Only a
/// single trailing wildcard is supported — the engine's
/// `prefix_search` has no notion of mid-string wildcards, so reject
/// anything else up front rather than silently treating it as a
/// literal byte.
pub fn tkeys(context: &Context, pattern: &str) {
    let trailing_star = Regex::new(r"^[^*]*\*$").expect("static pattern is valid regex");
    if !trailing_star.is_match(pattern) {
        eprintln!("tkeys: pattern '{pattern}' must end in exactly one '*' and contain no other '*'");
        return;
    }
    let prefix = &pattern[..pattern.len() - 1];

    match context.trie.prefix_search(prefix.as_bytes()) {
        Ok(iter) => {
            for (key, _val) in iter {
                println!("{}", String::from_utf8_lossy(&key));
            }
        }
        Err(e) => eprintln!("tkeys: {e}"),
    }
}
