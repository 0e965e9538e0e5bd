//! Width wrapping for rendered license text.
//!
//! Lines wrap independently so the document's block structure survives:
//! list items keep their marker and hang continuation lines under the first
//! character of the item's content, and block quotes keep the `> ` marker on
//! every wrapped line (or drop it entirely in plaintext mode).

/// Wrap each line of `text` to at most `width` columns.
///
/// The only lines that may exceed `width` are those holding a single token
/// longer than the width; tokens are never split.
pub fn wrap_for_width(text: &str, width: usize, plaintext_mode: bool) -> String {
    text.split('\n')
        .map(|line| wrap_line(line, width, plaintext_mode))
        .collect::<Vec<_>>()
        .join("\n")
}

fn wrap_line(line: &str, width: usize, plaintext_mode: bool) -> String {
    if line.trim().is_empty() {
        return line.to_string();
    }
    if let Some(content_start) = list_content_start(line) {
        let prefix = &line[..content_start];
        let content = &line[content_start..];
        let prefix_width = prefix.chars().count();
        let indent = " ".repeat(prefix_width);
        let chunks = fill(content, width.saturating_sub(prefix_width).max(1));
        return join_with_prefix(&chunks, prefix, &indent);
    }
    if let Some(content) = line.strip_prefix("> ") {
        let chunks = fill(content, width.saturating_sub(2).max(1));
        if plaintext_mode {
            return chunks.join("\n");
        }
        return join_with_prefix(&chunks, "> ", "> ");
    }
    fill(line, width.max(1)).join("\n")
}

/// Byte offset of the first content character of a list item, or None when
/// the line is not a list item.
fn list_content_start(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let lead = line.len() - trimmed.len();
    let marker = list_marker_len(trimmed)?;
    let rest = &trimmed[marker..];
    let gap = rest.len() - rest.trim_start().len();
    if rest.trim_start().is_empty() {
        return None;
    }
    Some(lead + marker + gap)
}

fn list_marker_len(trimmed: &str) -> Option<usize> {
    if trimmed.starts_with("- ") || trimmed.starts_with("* ") {
        return Some(1);
    }
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 && trimmed[digits..].starts_with('.') && trimmed[digits + 1..].starts_with(' ') {
        return Some(digits + 1);
    }
    None
}

fn join_with_prefix(chunks: &[String], first: &str, rest: &str) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            if i == 0 {
                format!("{first}{chunk}")
            } else {
                format!("{rest}{chunk}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Greedy word fill. A token longer than `width` gets its own line.
fn fill(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;
    for word in text.split_whitespace() {
        let word_width = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_width = word_width;
        } else if current_width + 1 + word_width <= width {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_width = word_width;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
