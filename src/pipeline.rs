//! The build pipeline.
//!
//! A build is a fixed sequence of phases, each visiting every discovered
//! license before the next begins:
//!
//! 1. *gather*: parse front matter, attach the changelog companion and the
//!    plain version, resolve the year placeholder in the reader text
//! 2. *markdown*: derive the markdown and plaintext representations
//! 3. *assemble*: build the tabbed page body and the embed fragment
//! 4. *write*: put the output files on disk
//!
//! The canary watches every phase. Visitation order inside a phase carries
//! no meaning — the per-phase sets it collects are the only correctness
//! signal — and a unit that fails a phase is skipped, not fatal: the
//! canary's verdict is where the build learns something went missing.

use crate::assemble;
use crate::canary::{BuildCanary, GateMode, Phase, Verdict};
use crate::content::{Category, ContentUnit, Representation};
use crate::discover::{self, SourcePage};
use crate::transform::{self, DefinitionTarget};
use crate::version;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_WRAP_WIDTH: usize = 100;

/// The invoking command, which fixes production-mode semantics for the
/// whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildCommand {
    Build,
    Serve,
    Deploy,
}

impl BuildCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildCommand::Build => "build",
            BuildCommand::Serve => "serve",
            BuildCommand::Deploy => "deploy",
        }
    }

    /// Serve is the development loop; everything else is production. CI
    /// counts as production regardless of command.
    pub fn production(&self) -> bool {
        matches!(self, BuildCommand::Build | BuildCommand::Deploy)
            || std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub docs_dir: PathBuf,
    pub out_dir: PathBuf,
    pub command: BuildCommand,
    pub gate_mode: GateMode,
    pub wrap_width: usize,
}

/// What one build run produced, queried by the gate.
#[derive(Debug)]
pub struct BuildReport {
    pub verdict: Verdict,
    pub expected: usize,
    pub written: usize,
    pub errors: Vec<String>,
}

/// Run one complete build. Constructs a fresh canary for the run, so
/// repeated invocations (serve mode) share no state.
pub fn run_build(options: &BuildOptions) -> Result<BuildReport> {
    let sources = discover::discover(&options.docs_dir)?;
    let mut canary = BuildCanary::new(sources.keys().cloned(), options.command.production());
    tracing::info!(
        command = options.command.as_str(),
        production = canary.production(),
        expected = canary.expected().len(),
        "starting build"
    );

    let year = assemble::current_year();
    let mut units = gather_phase(&sources, &year, &mut canary);
    markdown_phase(&mut units, options.wrap_width, &mut canary);
    let pages = assemble_phase(&mut units, &year, &mut canary);
    let written = write_phase(&units, &pages, &options.out_dir, &mut canary)?;

    let verdict = canary.verdict();
    Ok(BuildReport {
        verdict,
        expected: canary.expected().len(),
        written,
        errors: canary.errors().to_vec(),
    })
}

fn gather_phase(
    sources: &BTreeMap<String, SourcePage>,
    year: &str,
    canary: &mut BuildCanary,
) -> BTreeMap<String, ContentUnit> {
    let mut units = BTreeMap::new();
    for (slug, page) in sources {
        let Some(unit) = gather_unit(page, year) else {
            tracing::warn!(slug = %slug, "skipping page without required front matter");
            continue;
        };
        canary.register(Phase::Gathered, slug);
        units.insert(slug.clone(), unit);
    }
    units
}

/// Build a content unit from a source page, or None when a required
/// front-matter field is missing. Missing fields are not fatal — pages
/// other than licenses can share this layout — but a skipped license will
/// show up in the canary's verdict.
fn gather_unit(page: &SourcePage, year: &str) -> Option<ContentUnit> {
    let category: Category = page.front_matter.category.as_deref()?.parse().ok()?;
    let reader_text = page.front_matter.reader_license_text.as_deref()?;
    let raw_text = assemble::replace_year(reader_text, year);
    // The resolved reader text replaces the authored one in the output
    // front matter; a `{{ year }}` the author wrote is not a leftover.
    let mut front_matter = page.front_matter.clone();
    front_matter.reader_license_text = Some(raw_text.clone());
    let changelog_text = page
        .changelog
        .clone()
        .or_else(|| front_matter.changelog.clone());
    Some(ContentUnit {
        slug: page.slug.clone(),
        category,
        front_matter,
        raw_text,
        derived: BTreeMap::new(),
        changelog_text,
        version: version::plain_version(&page.dir),
    })
}

fn markdown_phase(
    units: &mut BTreeMap<String, ContentUnit>,
    wrap_width: usize,
    canary: &mut BuildCanary,
) {
    for (slug, unit) in units.iter_mut() {
        let footnoted = transform::extract_and_footnote(&transform::promote_first_header(
            &unit.raw_text,
        ));
        let markdown = transform::reformat_definitions(&footnoted, DefinitionTarget::DefinitionList);
        let plaintext_source =
            transform::reformat_definitions(&footnoted, DefinitionTarget::BulletList);
        let references = link_reference_map(unit);
        let plaintext = transform::wrap_for_width(
            &transform::to_plaintext(&plaintext_source, &references),
            wrap_width,
            true,
        );
        canary.check_placeholders(&markdown, Phase::Markdown, slug);
        canary.check_placeholders(&plaintext, Phase::Markdown, slug);
        unit.set_derived(Representation::Markdown, markdown);
        unit.set_derived(Representation::Plaintext, plaintext);
        canary.register(Phase::Markdown, slug);
    }
}

/// Reference-style link targets an author declared in front matter, used
/// when flattening `[text][ref]` links for the plaintext view.
fn link_reference_map(unit: &ContentUnit) -> BTreeMap<String, String> {
    let mut references = BTreeMap::new();
    let Some(serde_yaml::Value::Sequence(entries)) = unit.front_matter.extra.get("link_references")
    else {
        return references;
    };
    for entry in entries {
        let tag = entry.get("reference_tag").and_then(|v| v.as_str());
        let url = entry.get("link_url").and_then(|v| v.as_str());
        if let (Some(tag), Some(url)) = (tag, url) {
            references.insert(tag.to_string(), url.to_string());
        }
    }
    references
}

struct AssembledPage {
    body: String,
    front_matter: serde_yaml::Value,
}

fn assemble_phase(
    units: &mut BTreeMap<String, ContentUnit>,
    year: &str,
    canary: &mut BuildCanary,
) -> BTreeMap<String, AssembledPage> {
    let mut pages = BTreeMap::new();
    for (slug, unit) in units.iter_mut() {
        let body = assemble::assemble_page(unit, year);
        let fragment = assemble::embed_fragment(unit);
        let front_matter = match merged_front_matter(unit, year) {
            Ok(front_matter) => front_matter,
            Err(error) => {
                canary.push_error(format!("front matter for {slug} failed to serialize: {error}"));
                continue;
            }
        };
        canary.check_placeholders(&body, Phase::Assembled, slug);
        canary.check_placeholders(&fragment, Phase::Assembled, slug);
        canary.check_placeholders_value(&front_matter, Phase::Assembled, slug);
        unit.set_derived(Representation::EmbedFragment, fragment);
        pages.insert(slug.clone(), AssembledPage { body, front_matter });
        canary.register(Phase::Assembled, slug);
    }
    pages
}

/// Author front matter plus the computed fields, as one mapping.
fn merged_front_matter(unit: &ContentUnit, year: &str) -> Result<serde_yaml::Value> {
    let mut value = serde_yaml::to_value(&unit.front_matter)?;
    let serde_yaml::Value::Mapping(map) = &mut value else {
        anyhow::bail!("front matter did not serialize to a mapping");
    };
    for (key, computed) in assemble::computed_front_matter(unit, year) {
        map.insert(key, computed);
    }
    Ok(value)
}

fn write_phase(
    units: &BTreeMap<String, ContentUnit>,
    pages: &BTreeMap<String, AssembledPage>,
    out_dir: &Path,
    canary: &mut BuildCanary,
) -> Result<usize> {
    let mut written = 0;
    for (slug, unit) in units {
        let Some(page) = pages.get(slug) else {
            continue;
        };
        write_unit(slug, unit, page, out_dir)?;
        canary.register(Phase::Written, slug);
        written += 1;
    }
    Ok(written)
}

fn write_unit(slug: &str, unit: &ContentUnit, page: &AssembledPage, out_dir: &Path) -> Result<()> {
    let page_dir = out_dir.join(slug);
    fs::create_dir_all(&page_dir)
        .with_context(|| format!("create output dir {}", page_dir.display()))?;

    let front_matter = serde_yaml::to_string(&page.front_matter)?;
    let index = format!("---\n{front_matter}---\n{}\n", page.body);
    fs::write(page_dir.join("index.md"), index)
        .with_context(|| format!("write page for {slug}"))?;

    if let Some(plaintext) = unit.derived_text(Representation::Plaintext) {
        fs::write(page_dir.join(format!("{slug}.txt")), plaintext)
            .with_context(|| format!("write plaintext for {slug}"))?;
    }

    if let Some(fragment) = unit.derived_text(Representation::EmbedFragment) {
        let embed_dir = out_dir.join("embed");
        fs::create_dir_all(&embed_dir)
            .with_context(|| format!("create output dir {}", embed_dir.display()))?;
        let spdx = unit.front_matter.spdx_id.as_deref().unwrap_or(slug);
        fs::write(embed_dir.join(format!("{spdx}.html")), fragment)
            .with_context(|| format!("write embed fragment for {slug}"))?;
    }
    tracing::debug!(slug = %slug, "wrote output files");
    Ok(())
}

/// Turn the canary's verdict into a process exit code, printing the full
/// error report on a hard-gate failure.
pub fn gate_exit(report: &BuildReport, mode: GateMode) -> u8 {
    match (report.verdict, mode) {
        (Verdict::Verified, _) => {
            tracing::info!(written = report.written, "build verified");
            0
        }
        (Verdict::Failed, GateMode::Soft) => {
            tracing::warn!(
                errors = report.errors.len(),
                "build canary failed; soft gate lets the build pass"
            );
            for error in &report.errors {
                tracing::warn!(error = %error, "canary error");
            }
            0
        }
        (Verdict::Failed, GateMode::Hard) => {
            eprintln!(
                "build canary failed with {} error(s):",
                report.errors.len()
            );
            for error in &report.errors {
                eprintln!("  - {error}");
            }
            1
        }
    }
}
