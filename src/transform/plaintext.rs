//! Markdown to plain text.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn reference_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(?P<text>[^\]]*)\]\[(?P<ref>[^\]]*)\]").expect("static pattern"))
}

fn image_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)").expect("static pattern"))
}

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").expect("static pattern"))
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^`{3}\S*[ \t]*$").expect("static pattern"))
}

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#{1,6} ").expect("static pattern"))
}

fn bold_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*").expect("static pattern"))
}

fn italic_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*([^*\n]+)\*").expect("static pattern"))
}

fn inline_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`\n]*)`").expect("static pattern"))
}

/// Strip markdown formatting, keeping the readable text.
///
/// Reference-style links `[text][ref]` are resolved against
/// `reference_links` (label to URL) before stripping; a label with no entry
/// passes through unchanged. Inline links and images become `text (url)`,
/// fenced code delimiters become a `===` separator line, and header, bold,
/// italic, and inline-code markers are dropped while their inner text is
/// kept. Constructs outside this set pass through as-is.
pub fn to_plaintext(text: &str, reference_links: &BTreeMap<String, String>) -> String {
    let text = reference_link_regex().replace_all(text, |caps: &regex::Captures<'_>| {
        match reference_links.get(&caps["ref"]) {
            Some(url) => format!("{} ({url})", &caps["text"]),
            None => caps[0].to_string(),
        }
    });
    let text = image_regex().replace_all(&text, "$1 ($2)");
    let text = link_regex().replace_all(&text, "$1 ($2)");
    let text = fence_regex().replace_all(&text, "===");
    let text = header_regex().replace_all(&text, "");
    let text = bold_regex().replace_all(&text, "$1");
    let text = italic_regex().replace_all(&text, "$1");
    inline_code_regex().replace_all(&text, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_refs() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    #[test]
    fn strips_headers_and_emphasis() {
        let input = "## Terms\n\nYou **must** keep *all* `notices`.\n";
        let out = to_plaintext(input, &no_refs());
        assert_eq!(out, "Terms\n\nYou must keep all notices.\n");
    }

    #[test]
    fn converts_links_and_images() {
        let input = "See [the source](https://example.com) and ![logo](logo.png).\n";
        let out = to_plaintext(input, &no_refs());
        assert_eq!(
            out,
            "See the source (https://example.com) and logo (logo.png).\n"
        );
    }

    #[test]
    fn resolves_reference_links() {
        let mut refs = BTreeMap::new();
        refs.insert("gpl".to_string(), "https://gnu.org/gpl".to_string());
        let input = "Based on [the GPL][gpl] and [unknown][nope].\n";
        let out = to_plaintext(input, &refs);
        assert!(out.contains("the GPL (https://gnu.org/gpl)"));
        assert!(out.contains("[unknown][nope]"));
    }

    #[test]
    fn fenced_code_becomes_separator() {
        let input = "```plaintext\nverbatim\n```\n";
        let out = to_plaintext(input, &no_refs());
        assert_eq!(out, "===\nverbatim\n===\n");
    }

    #[test]
    fn output_has_no_markdown_control_characters() {
        let input = "# Head\n\n**bold** *it* `code` [a](b) ![c](d)\n\n```\nx\n```\n";
        let out = to_plaintext(input, &no_refs());
        for marker in ["#", "`", "**", "```"] {
            assert!(!out.contains(marker), "found {marker:?} in {out:?}");
        }
    }

    #[test]
    fn unrecognized_constructs_pass_through() {
        let input = "A | table | row\n<div>html</div>\n";
        assert_eq!(to_plaintext(input, &no_refs()), input);
    }
}
