//! Definition reformatting.
//!
//! Reader text writes glossary entries as an inline-code term, a blank line,
//! and a `:`-prefixed indented definition. The markdown representation keeps
//! the term and tightens the pair into a definition list; the plaintext
//! representation strips the code delimiters and uses a bullet.

use regex::Regex;
use std::sync::OnceLock;

/// Output style for [`reformat_definitions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionTarget {
    /// `` `term` `` followed by `: definition`.
    DefinitionList,
    /// Bare term followed by `- definition`.
    BulletList,
}

fn definition_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Term line, blank line, colon with up to four spaces of indent, then
    // the definition body up to the next blank line.
    RE.get_or_init(|| {
        Regex::new(r"(?P<term>`[\w\s]+`)\n{2}:\s{1,4}(?P<def>[^\n]+(?:\n[^\n]+)*)\n{2}")
            .expect("static pattern")
    })
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\s?\.\w+\s?\}").expect("static pattern"))
}

/// Rewrite every definition pair in `text` to `target` form.
///
/// All pairs in the text are rewritten in a single pass; a text is never
/// left with a mix of rewritten and original pairs. Leftover inline
/// attribute markers (`{.classname}`) are stripped from the whole text
/// afterwards. Applying the same target twice is a no-op: the rewritten
/// form no longer has a blank line between term and definition, so it does
/// not match the detection pattern again.
pub fn reformat_definitions(text: &str, target: DefinitionTarget) -> String {
    let reformatted = definition_regex().replace_all(text, |caps: &regex::Captures<'_>| {
        let term = &caps["term"];
        let body = caps["def"].trim();
        match target {
            DefinitionTarget::DefinitionList => format!("{term}\n: {body}\n\n"),
            DefinitionTarget::BulletList => {
                format!("{}\n- {body}\n\n", term.trim_matches('`'))
            }
        }
    });
    attribute_regex().replace_all(&reformatted, "").into_owned()
}
