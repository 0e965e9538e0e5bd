//! Annotation extraction.
//!
//! Reader text carries footnote-style notes as annotation blocks: inline
//! citations `(1)`..`(3)` in a paragraph, followed by a `{ .annotate }`
//! marker line and a numbered list of note bodies. The site theme renders
//! these in place; every other representation needs real markdown footnotes.
//!
//! The rewrite is a two-pass scan. Pass one collects each marker with the
//! numbered items that follow it. Pass two pairs the citations in the span
//! before each marker against the item ordinals, scanning backward from the
//! marker, then replaces the paired citations with `[^k]` references
//! numbered globally in reading order. Unpaired citations stay literal and
//! unpaired items are dropped.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// The source format caps an annotation block at three items.
const MAX_ITEMS: usize = 3;

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\{\s?\.annotate\s?\}\s*$").expect("static pattern"))
}

fn item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([123])\.\s{1,2}(\S.*)$").expect("static pattern"))
}

fn citation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([123])\)").expect("static pattern"))
}

struct AnnotationBlock {
    /// Byte offset of the start of the marker line.
    marker_start: usize,
    /// Byte offset past the last consumed line (items plus one trailing
    /// blank line, when present).
    end: usize,
    /// Item ordinal and body, in listing order.
    items: Vec<(u8, String)>,
}

/// Replace annotation blocks with markdown footnotes.
///
/// Footnote references are numbered `[^1]`, `[^2]`, ... across the whole
/// document in reading order, and the matching definitions are appended at
/// the end in the same order. Text without annotation markers is returned
/// unchanged. The output never contains a marker line.
pub fn extract_and_footnote(text: &str) -> String {
    let blocks = collect_blocks(text);
    if blocks.is_empty() {
        return text.to_string();
    }

    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    let mut footnotes: Vec<String> = Vec::new();
    let mut span_start = 0;
    for block in &blocks {
        let paired = pair_citations(&text[span_start..block.marker_start], span_start, block);
        for (range, body) in paired {
            let reference = footnotes.len() + 1;
            edits.push((range, format!("[^{reference}]")));
            footnotes.push(body);
        }
        edits.push((block.marker_start..block.end, String::new()));
        span_start = block.end;
    }

    let body = apply_edits(text, edits);
    if footnotes.is_empty() {
        return body;
    }
    let mut out = body.trim_end().to_string();
    out.push_str("\n\n");
    for (i, note) in footnotes.iter().enumerate() {
        out.push_str(&format!("[^{}]: {}\n", i + 1, note));
    }
    out
}

fn collect_blocks(text: &str) -> Vec<AnnotationBlock> {
    let lines = line_spans(text);
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let (range, content) = &lines[i];
        if !marker_regex().is_match(content) {
            i += 1;
            continue;
        }
        let marker_start = range.start;
        let mut end = range.end;
        let mut items = Vec::new();
        let mut j = i + 1;
        while j < lines.len() && items.len() < MAX_ITEMS {
            let Some(caps) = item_regex().captures(lines[j].1) else {
                break;
            };
            let ordinal: u8 = caps[1].parse().unwrap_or(0);
            items.push((ordinal, caps[2].trim().to_string()));
            end = lines[j].0.end;
            j += 1;
        }
        // A terminating blank line belongs to the block.
        if j < lines.len() && lines[j].1.trim().is_empty() {
            end = lines[j].0.end;
            j += 1;
        }
        blocks.push(AnnotationBlock {
            marker_start,
            end,
            items,
        });
        i = j;
    }
    blocks
}

/// Pair inline citations against a block's items, scanning backward from the
/// marker and consuming at most as many citations as there are items.
/// Returns replacements in reading order.
fn pair_citations(
    span: &str,
    span_offset: usize,
    block: &AnnotationBlock,
) -> Vec<(Range<usize>, String)> {
    let citations: Vec<(Range<usize>, u8)> = citation_regex()
        .captures_iter(span)
        .map(|caps| {
            let m = caps.get(0).expect("whole match");
            let ordinal: u8 = caps[1].parse().unwrap_or(0);
            (span_offset + m.start()..span_offset + m.end(), ordinal)
        })
        .collect();

    let mut taken = vec![false; block.items.len()];
    let mut paired: Vec<(Range<usize>, usize)> = Vec::new();
    for (range, ordinal) in citations.into_iter().rev() {
        if paired.len() == block.items.len() {
            break;
        }
        let slot =
            (0..block.items.len()).find(|&idx| block.items[idx].0 == ordinal && !taken[idx]);
        if let Some(idx) = slot {
            taken[idx] = true;
            paired.push((range, idx));
        }
    }
    paired.sort_by_key(|(range, _)| range.start);
    paired
        .into_iter()
        .map(|(range, idx)| (range, block.items[idx].1.clone()))
        .collect()
}

fn apply_edits(text: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for (range, replacement) in edits {
        out.push_str(&text[pos..range.start]);
        out.push_str(&replacement);
        pos = range.end;
    }
    out.push_str(&text[pos..]);
    out
}

/// Byte range (including the trailing newline) and content (excluding it)
/// for each line.
fn line_spans(text: &str) -> Vec<(Range<usize>, &str)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for chunk in text.split_inclusive('\n') {
        let end = start + chunk.len();
        spans.push((start..end, chunk.trim_end_matches('\n')));
        start = end;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_block_to_footnotes() {
        let input = "See (1) and (2).\n{.annotate}\n1. First note\n2. Second note\n\n";
        let expected = "See [^1] and [^2].\n\n[^1]: First note\n[^2]: Second note\n";
        assert_eq!(extract_and_footnote(input), expected);
    }

    #[test]
    fn numbers_footnotes_globally_across_blocks() {
        let input = "First (1).\n{ .annotate }\n1. Note A\n\nSecond (1) and (2).\n\
                     { .annotate }\n1. Note B\n2.  Note C\n\n";
        let out = extract_and_footnote(input);
        assert!(out.contains("First [^1]."));
        assert!(out.contains("Second [^2] and [^3]."));
        assert!(out.ends_with("[^1]: Note A\n[^2]: Note B\n[^3]: Note C\n"));
    }

    #[test]
    fn footnote_numbers_are_contiguous() {
        let input = "A (1).\n{.annotate}\n1. one\n\nB (2).\n{.annotate}\n2. two\n\n";
        let out = extract_and_footnote(input);
        assert!(out.contains("A [^1]."));
        assert!(out.contains("B [^2]."));
    }

    #[test]
    fn returns_input_unchanged_without_markers() {
        let input = "Plain paragraph with (1) that cites nothing.\n";
        assert_eq!(extract_and_footnote(input), input);
    }

    #[test]
    fn drops_items_with_no_matching_citation() {
        let input = "Only (1) here.\n{.annotate}\n1. kept\n2. dropped\n\n";
        let out = extract_and_footnote(input);
        assert!(out.contains("Only [^1] here."));
        assert!(out.contains("[^1]: kept"));
        assert!(!out.contains("dropped"));
    }

    #[test]
    fn leaves_citation_without_matching_item_literal() {
        let input = "Cites (3) only.\n{.annotate}\n1. lonely note\n\n";
        let out = extract_and_footnote(input);
        assert!(out.contains("Cites (3) only."));
        assert!(!out.contains("[^1]"));
        assert!(!out.contains(".annotate"));
    }

    #[test]
    fn removes_marker_even_when_nothing_pairs() {
        let input = "No citations at all.\n{.annotate}\n\nMore text.\n";
        let out = extract_and_footnote(input);
        assert!(!out.contains(".annotate"));
        assert!(out.contains("More text."));
    }

    #[test]
    fn consumes_at_most_one_citation_per_item() {
        let input = "Both (1) and again (1).\n{.annotate}\n1. the note\n\n";
        let out = extract_and_footnote(input);
        // Backward scan pairs the occurrence nearest the marker.
        assert!(out.contains("Both (1) and again [^1]."));
        assert!(out.ends_with("[^1]: the note\n"));
    }

    #[test]
    fn every_reference_has_a_definition() {
        let input = "A (1), b (2), c (3).\n{ .annotate }\n1. one\n2. two\n3. three\n\n";
        let out = extract_and_footnote(input);
        for n in 1..=3 {
            assert!(out.contains(&format!("[^{n}]")));
            assert!(out.contains(&format!("[^{n}]: ")));
        }
    }
}
