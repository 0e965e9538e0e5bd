//! License text transforms.
//!
//! Every representation of a license starts from the reader text authored in
//! the docs tree. The functions here derive the others:
//!
//! - [`footnotes`]: annotation blocks → standard markdown footnotes
//! - [`definitions`]: definition pairs → definition lists or bullet lists
//! - [`plaintext`]: markdown → plain text
//! - [`wrap`]: width wrapping that preserves list and quote structure
//!
//! All transforms are pure string functions. A transform never fails: input
//! it does not recognize passes through unchanged, so a malformed license
//! page degrades instead of aborting the build.

use regex::Regex;
use std::sync::OnceLock;

pub mod definitions;
pub mod footnotes;
pub mod plaintext;
pub mod wrap;

pub use definitions::{reformat_definitions, DefinitionTarget};
pub use footnotes::extract_and_footnote;
pub use plaintext::to_plaintext;
pub use wrap::wrap_for_width;

fn first_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<h2 class="license-first-header">(.*?)</h2>"#).expect("static pattern")
    })
}

/// Rewrite the styled first-header element authors use in reader text as a
/// plain markdown heading.
pub fn promote_first_header(text: &str) -> String {
    first_header_regex().replace_all(text, "## $1").into_owned()
}
