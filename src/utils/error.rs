/// Collapse whitespace and cap length so provider errors (which can embed whole response
/// bodies) fit on one report line.
pub fn compact_error_message(message: &str, max_len: usize) -> String {
    let raw = match message.split_once(" text: ") {
        Some((prefix, _)) => format!("{prefix} text=<omitted>"),
        None => message.to_string(),
    };

    let mut compact = String::with_capacity(raw.len().min(max_len.saturating_add(16)));
    for word in raw.split_whitespace() {
        if !compact.is_empty() {
            compact.push(' ');
        }
        compact.push_str(word);
        if compact.chars().count() > max_len {
            break;
        }
    }
    if compact.chars().count() <= max_len {
        return compact;
    }
    let mut cut: String = compact.chars().take(max_len).collect();
    cut.push_str("...(truncated)");
    cut
}

#[cfg(test)]
mod tests {
    use super::compact_error_message;

    #[test]
    fn test_compact_error_message_elides_body_and_caps_length() {
        let raw = "deserialization error: expected value, text: \"<html>...502 Bad Gateway...</html>\"";
        let compact = compact_error_message(raw, 260);
        assert_eq!(compact, "deserialization error: expected value, text=<omitted>");

        let long = "word ".repeat(100);
        let capped = compact_error_message(&long, 20);
        assert!(capped.ends_with("...(truncated)"));
        assert_eq!(capped.chars().count(), 20 + "...(truncated)".len());
    }
}
