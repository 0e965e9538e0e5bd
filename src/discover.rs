//! Source discovery.
//!
//! License pages live at `<docs>/licenses/<category>/<slug>/index.md`. The
//! slug is the directory name; the category and `licenses` index pages at
//! shallower levels are not license pages and are excluded. Discovery runs
//! once at startup and its result doubles as the canary's expected set.

use crate::content::{Category, FrontMatter};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A discovered license source page, still unparsed past its front matter.
#[derive(Debug, Clone)]
pub struct SourcePage {
    pub slug: String,
    pub dir: PathBuf,
    pub front_matter: FrontMatter,
    pub body: String,
    pub changelog: Option<String>,
}

/// Enumerate the license source pages under `docs_dir`.
///
/// Returns slug → page, sorted by slug. Finding nothing is not an error
/// here; the canary fails the build at verdict time when the expected set
/// is empty.
pub fn discover(docs_dir: &Path) -> Result<BTreeMap<String, SourcePage>> {
    let root = docs_dir.join("licenses");
    let mut pages = BTreeMap::new();
    if !root.is_dir() {
        tracing::warn!(root = %root.display(), "license root does not exist");
        return Ok(pages);
    }
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if !entry.file_type().is_file() || entry.file_name().to_str() != Some("index.md") {
            continue;
        }
        let Some(dir) = entry.path().parent() else {
            continue;
        };
        let Some(slug) = dir.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !is_license_dir(slug) {
            continue;
        }
        let page = read_source_page(slug, dir, entry.path())?;
        tracing::debug!(slug = %slug, "discovered license page");
        pages.insert(slug.to_string(), page);
    }
    Ok(pages)
}

/// Category index pages and the section index share the `index.md` layout;
/// only deeper directories are licenses.
fn is_license_dir(name: &str) -> bool {
    name != "licenses"
        && Category::ALL
            .iter()
            .all(|category| category.as_str() != name)
}

fn read_source_page(slug: &str, dir: &Path, index_path: &Path) -> Result<SourcePage> {
    let raw = fs::read_to_string(index_path)
        .with_context(|| format!("read license page {}", index_path.display()))?;
    let (front_matter, body) = match split_front_matter(&raw) {
        Some((yaml, body)) => {
            let front_matter: FrontMatter = serde_yaml::from_str(yaml)
                .with_context(|| format!("parse front matter of {}", index_path.display()))?;
            (front_matter, body.to_string())
        }
        None => (FrontMatter::default(), raw),
    };
    let changelog = fs::read_to_string(dir.join("CHANGELOG.md")).ok();
    Ok(SourcePage {
        slug: slug.to_string(),
        dir: dir.to_path_buf(),
        front_matter,
        body,
        changelog,
    })
}

/// Split a `---` delimited YAML front-matter block from the page body.
fn split_front_matter(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix("---\n")?;
    match rest.split_once("\n---\n") {
        Some((yaml, body)) => Some((yaml, body)),
        None => rest.strip_suffix("\n---").map(|yaml| (yaml, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_license(root: &Path, category: &str, slug: &str, front: &str, body: &str) {
        let dir = root.join("licenses").join(category).join(slug);
        fs::create_dir_all(&dir).expect("create license dir");
        fs::write(dir.join("index.md"), format!("---\n{front}---\n{body}")).expect("write page");
    }

    #[test]
    fn finds_license_pages_and_skips_section_indexes() {
        let tmp = TempDir::new().expect("tempdir");
        let docs = tmp.path();
        fs::create_dir_all(docs.join("licenses/permissive")).expect("dirs");
        fs::write(docs.join("licenses/index.md"), "# Licenses\n").expect("section index");
        fs::write(
            docs.join("licenses/permissive/index.md"),
            "# Permissive\n",
        )
        .expect("category index");
        write_license(
            docs,
            "permissive",
            "mit",
            "category: permissive\nreader_license_text: text\n",
            "",
        );

        let pages = discover(docs).expect("discover");
        assert_eq!(pages.keys().collect::<Vec<_>>(), vec!["mit"]);
    }

    #[test]
    fn attaches_changelog_when_present() {
        let tmp = TempDir::new().expect("tempdir");
        write_license(tmp.path(), "copyleft", "gpl", "category: copyleft\n", "");
        fs::write(
            tmp.path().join("licenses/copyleft/gpl/CHANGELOG.md"),
            "## 1.0.0\n",
        )
        .expect("changelog");

        let pages = discover(tmp.path()).expect("discover");
        assert_eq!(pages["gpl"].changelog.as_deref(), Some("## 1.0.0\n"));
    }

    #[test]
    fn empty_tree_discovers_nothing() {
        let tmp = TempDir::new().expect("tempdir");
        let pages = discover(tmp.path()).expect("discover");
        assert!(pages.is_empty());
    }

    #[test]
    fn front_matter_splits_from_body() {
        let (yaml, body) = split_front_matter("---\na: 1\n---\nbody\n").expect("split");
        assert_eq!(yaml, "a: 1");
        assert_eq!(body, "body\n");
    }

    #[test]
    fn page_without_front_matter_is_all_body() {
        let tmp = TempDir::new().expect("tempdir");
        let dir = tmp.path().join("licenses/permissive/isc");
        fs::create_dir_all(&dir).expect("dirs");
        fs::write(dir.join("index.md"), "just text\n").expect("page");

        let pages = discover(tmp.path()).expect("discover");
        assert_eq!(pages["isc"].body, "just text\n");
        assert!(pages["isc"].front_matter.category.is_none());
    }
}
