// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_note(size: usize) -> String {
    let base = "# Daily note\n\nSome **bold** and *italic* text with `code`, ==highlight== and $x^2$.\n\n- [ ] buy milk ^ab12cd\n- [x] call mum\n  - nested with [[Projects/Alpha]] and #tag\n> quoted [link](https://example.com)\n\n![cat](assets/cat.png)\n\n---\n\n";
    base.repeat(size)
}

#[allow(dead_code)]
pub fn generate_outline(items: usize, depth: usize) -> String {
    let mut content = String::new();
    for item in 0..items {
        let indent = "  ".repeat(item % depth.max(1));
        content.push_str(&format!(
            "{indent}- item {item} with ~~old~~ text and https://example.com/{item}\n"
        ));
    }
    content
}
