//! Page assembly.
//!
//! Takes a content unit whose representations have been derived and builds
//! the final page body: a license admonition holding tabbed views (reader,
//! markdown, plaintext, changelog, and official when an official text
//! exists), using the blocks syntax the site theme renders into tabs. Also
//! builds the standalone embed fragment and the computed front-matter
//! fields the output page carries.

use crate::content::{ContentUnit, Representation};
use chrono::{Datelike, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Fallback changelog body for licenses without a CHANGELOG companion.
pub const EMPTY_CHANGELOG: &str = "No changelog yet.";

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s{0,2}year\s{0,2}\}\}").expect("static pattern"))
}

pub fn current_year() -> String {
    Utc::now().year().to_string()
}

/// Resolve `{{ year }}` placeholders. The year is the one substitution the
/// assembler performs itself; everything else the author writes in
/// template syntax is a build error the canary reports.
pub fn replace_year(text: &str, year: &str) -> String {
    year_regex().replace_all(text, year).into_owned()
}

fn icon(tab: &str) -> &'static str {
    match tab {
        "reader" => ":material-book-open-variant:",
        "markdown" => ":octicons-markdown-24:",
        "plaintext" => ":nounproject-txt:",
        "changelog" => ":material-history:",
        "official" => ":material-license:",
        _ => "",
    }
}

/// Wrap `text` in a blocks-syntax block. Nesting depth is expressed by the
/// separator length, outermost longest.
fn blockify(text: &str, kind: &str, title: &str, separator_count: usize, options: &str) -> String {
    let separator = "/".repeat(separator_count);
    let option_line = if options.is_empty() {
        "\n".to_string()
    } else {
        format!("{}{options}\n\n", " ".repeat(separator_count + 1))
    };
    format!("\n{separator} {kind} | {title}\n{option_line}{text}\n{separator}")
}

fn version_line(unit: &ContentUnit) -> String {
    match unit.front_matter.original_version.as_deref() {
        Some(original) => format!(
            "original version: {original} | plain version: {}",
            unit.version
        ),
        None => format!("plain version: {}", unit.version),
    }
}

fn append_reader_header(out: &mut String, unit: &ContentUnit) {
    let title = unit.title();
    let version_info = match unit.front_matter.original_version.as_deref() {
        Some(original) => format!(
            "<span class=\"original-version\">original version: {original}</span>\
             <span class=\"plain-version\">plain version: {}</span>",
            unit.version
        ),
        None => format!(
            "<span class=\"plain-version\">plain version: {}</span>",
            unit.version
        ),
    };
    out.push_str(&format!(
        "<div class=\"license-header\">\n\n# {title}\n\n\
         <div class='version-info'>{version_info}</div>\n\n</div>\n\n"
    ));
}

fn append_markdown_header(out: &mut String, unit: &ContentUnit) {
    out.push_str(&format!("# {}\n\n", unit.title()));
    match unit.front_matter.original_version.as_deref() {
        Some(original) => out.push_str(&format!(
            "> original version: {original}\n> plain version: {}\n\n",
            unit.version
        )),
        None => out.push_str(&format!("> plain version: {}\n\n", unit.version)),
    }
}

fn append_plaintext_header(out: &mut String, unit: &ContentUnit) {
    out.push_str(&format!("{}\n\n", unit.title().to_uppercase()));
    out.push_str(&format!("{}\n\n", version_line(unit)));
}

fn not_advice_text(license_type: &str) -> String {
    format!(
        "We are not lawyers. This is not legal advice. You use this {license_type} at \
         your own risk. If you need legal advice, talk to a lawyer. We are normal \
         people who want to make licenses accessible for everyone. If you see a \
         mistake or want to suggest a change, please open an issue or submit edits.\n"
    )
}

fn not_official_text(unit: &ContentUnit) -> String {
    let original_name = unit
        .front_matter
        .original_name
        .as_deref()
        .unwrap_or("original license")
        .trim()
        .to_string();
    let original_url = unit.front_matter.original_url.as_deref().unwrap_or("").trim();
    let mut text = format!(
        "**Our plain language versions are not official** and are not endorsed by \
         the {original_name} authors. We try to capture the *legal meaning* of the \
         original, but we can't guarantee our version provides the same legal \
         protections.\n"
    );
    if !original_url.is_empty() {
        text.push_str(&format!(
            "\nYou can find the official {original_name} at {original_url}.\n"
        ));
    }
    text
}

fn disclaimer_block(unit: &ContentUnit) -> String {
    let license_type = unit.category.license_type();
    let has_official = unit.front_matter.has_official_text();
    let not_advice = blockify(
        &not_advice_text(license_type),
        if has_official { "tab" } else { "warning" },
        "This is not legal advice.",
        3,
        "open: True",
    );
    if !has_official {
        return not_advice;
    }
    let original_name = unit
        .front_matter
        .original_name
        .as_deref()
        .unwrap_or("original license");
    let not_official = blockify(
        &not_official_text(unit),
        "tab",
        &format!("This is not the official {original_name}"),
        3,
        "open: True",
    );
    blockify(
        &format!("{not_advice}\n{not_official}\n"),
        "details",
        "disclaimer",
        4,
        "open:True",
    )
}

fn reader_tab(unit: &ContentUnit, year: &str) -> String {
    let mut text = String::new();
    append_reader_header(&mut text, unit);
    text.push_str(&replace_year(&unit.raw_text, year));
    text.push_str(&disclaimer_block(unit));
    blockify(&text, "tab", &format!("reader {}", icon("reader")), 5, "")
}

fn markdown_tab(unit: &ContentUnit) -> String {
    let mut inner = String::new();
    append_markdown_header(&mut inner, unit);
    inner.push_str(unit.derived_text(Representation::Markdown).unwrap_or(""));
    let text = format!(
        "\n```markdown\n{inner}\n```\n\n{}",
        disclaimer_block(unit)
    );
    blockify(
        &text,
        "tab",
        &format!("markdown {}", icon("markdown")),
        5,
        "",
    )
}

fn plaintext_tab(unit: &ContentUnit) -> String {
    let mut inner = String::new();
    append_plaintext_header(&mut inner, unit);
    inner.push_str(unit.derived_text(Representation::Plaintext).unwrap_or(""));
    let text = format!(
        "```plaintext\n{inner}\n```\n\n{}",
        disclaimer_block(unit)
    );
    blockify(
        &text,
        "tab",
        &format!("plaintext {}", icon("plaintext")),
        5,
        "",
    )
}

fn changelog_tab(unit: &ContentUnit) -> String {
    let text = unit.changelog_text.as_deref().unwrap_or(EMPTY_CHANGELOG);
    blockify(
        text,
        "tab",
        &format!("changelog {}", icon("changelog")),
        5,
        "",
    )
}

fn official_tab(unit: &ContentUnit) -> String {
    let Some(text) = unit.front_matter.official_license_text.as_deref() else {
        return String::new();
    };
    blockify(
        text,
        "tab",
        &format!("official {}", icon("official")),
        5,
        "",
    )
}

/// Assemble the tabbed page body for a unit whose markdown and plaintext
/// representations have been derived.
pub fn assemble_page(unit: &ContentUnit, year: &str) -> String {
    let mut tabs = String::new();
    tabs.push_str(&reader_tab(unit, year));
    tabs.push_str(&markdown_tab(unit));
    tabs.push_str(&plaintext_tab(unit));
    tabs.push_str(&changelog_tab(unit));
    if unit.front_matter.has_official_text() {
        tabs.push_str(&official_tab(unit));
    }
    tabs.push('\n');
    blockify(
        &tabs,
        "admonition license",
        &format!(
            "Plain License: <span class='detail-title-highlight'>{}</span>",
            unit.title()
        ),
        6,
        "open:True",
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Standalone fragment served at `embed/<spdx_id>.html` for sites that
/// iframe a license instead of linking to it.
pub fn embed_fragment(unit: &ContentUnit) -> String {
    let spdx = unit
        .front_matter
        .spdx_id
        .as_deref()
        .unwrap_or(&unit.slug);
    let plaintext = unit.derived_text(Representation::Plaintext).unwrap_or("");
    format!(
        "<div class=\"license-embed\" data-license=\"{spdx}\">\n\
         <h1>{}</h1>\n\
         <p class=\"version-info\">{}</p>\n\
         <pre>\n{}</pre>\n\
         </div>\n",
        escape_html(&unit.title()),
        escape_html(&version_line(unit)),
        escape_html(plaintext)
    )
}

/// Computed front-matter fields merged into the output page, and checked
/// for leftover placeholders by the canary.
pub fn computed_front_matter(unit: &ContentUnit, year: &str) -> serde_yaml::Mapping {
    let mut map = serde_yaml::Mapping::new();
    let mut insert = |key: &str, value: serde_yaml::Value| {
        map.insert(serde_yaml::Value::String(key.to_string()), value);
    };
    insert("year", serde_yaml::Value::String(year.to_string()));
    insert(
        "license_type",
        serde_yaml::Value::String(unit.category.license_type().to_string()),
    );
    insert(
        "plain_version",
        serde_yaml::Value::String(unit.version.clone()),
    );
    insert(
        "markdown_license_text",
        serde_yaml::Value::String(
            unit.derived_text(Representation::Markdown)
                .unwrap_or("")
                .to_string(),
        ),
    );
    insert(
        "plaintext_license_text",
        serde_yaml::Value::String(
            unit.derived_text(Representation::Plaintext)
                .unwrap_or("")
                .to_string(),
        ),
    );
    insert(
        "tags",
        serde_yaml::Value::Sequence(
            unit.front_matter
                .derived_tags()
                .into_iter()
                .map(serde_yaml::Value::String)
                .collect(),
        ),
    );
    map
}
