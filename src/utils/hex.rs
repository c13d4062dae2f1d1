/// Clean a hex string by removing "0x" prefix and whitespace
pub fn clean_hex(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

pub fn is_hex_of_len(s: &str, bytes: usize) -> bool {
    let cleaned = clean_hex(s);
    cleaned.len() == bytes * 2 && cleaned.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Keep the first `max_chars` characters and mark the cut with `...`.
pub fn ellipsize(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
