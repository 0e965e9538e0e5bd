//! Content model for license pages.
//!
//! The docs tree is the host here: each license lives in its own directory
//! as an `index.md` with YAML front matter and companion `CHANGELOG.md` /
//! `package.json` files. This module defines the narrow view of that data
//! the pipeline consumes — the recognized front-matter keys and the content
//! unit that accumulates derived representations phase by phase.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// License category, taken from the `category` front-matter key and from
/// the directory layout under `licenses/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Permissive,
    Copyleft,
    PublicDomain,
    Proprietary,
    SourceAvailable,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Permissive,
        Category::Copyleft,
        Category::PublicDomain,
        Category::Proprietary,
        Category::SourceAvailable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Permissive => "permissive",
            Category::Copyleft => "copyleft",
            Category::PublicDomain => "public-domain",
            Category::Proprietary => "proprietary",
            Category::SourceAvailable => "source-available",
        }
    }

    /// Public-domain texts are dedications, not licenses; the wording on
    /// the assembled page follows suit.
    pub fn license_type(&self) -> &'static str {
        match self {
            Category::PublicDomain => "dedication",
            _ => "license",
        }
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s.trim())
            .ok_or_else(|| UnknownCategory(s.trim().to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown license category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

/// The recognized front-matter keys of a license page. Anything else the
/// author wrote is carried in `extra` untouched.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FrontMatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spdx_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader_license_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limitations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official_license_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl FrontMatter {
    /// Tag labels derived from the permission/condition/limitation keys.
    /// Entries without a mapping are skipped.
    pub fn derived_tags(&self) -> Vec<String> {
        self.conditions
            .iter()
            .chain(self.permissions.iter())
            .chain(self.limitations.iter())
            .filter_map(|key| tag_label(key))
            .map(str::to_string)
            .collect()
    }

    pub fn has_official_text(&self) -> bool {
        self.official_license_text
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }
}

fn tag_label(key: &str) -> Option<&'static str> {
    let label = match key {
        // allowances
        "distribution" => "can-share",
        "commercial-use" => "can-sell",
        "modifications" => "can-change",
        "revokable" => "can-revoke",
        "relicense" => "relicense",
        // requirements
        "disclose-source" => "share-source",
        "document-changes" => "describe-changes",
        "include-copyright" => "give-credit",
        "same-license" => "share-alike (strict)",
        "same-license--file" => "share-alike (relaxed)",
        "same-license--library" => "share-alike (relaxed)",
        _ => return None,
    };
    Some(label)
}

/// One derived representation of a license text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Representation {
    Markdown,
    Plaintext,
    EmbedFragment,
}

/// One license's material moving through the build.
///
/// Created when the source page is gathered; each phase adds derived
/// representations until the unit is written out. Absent entries in
/// `derived` mean that representation has not been produced yet.
#[derive(Debug, Clone)]
pub struct ContentUnit {
    pub slug: String,
    pub category: Category,
    pub front_matter: FrontMatter,
    pub raw_text: String,
    pub derived: BTreeMap<Representation, String>,
    pub changelog_text: Option<String>,
    pub version: String,
}

impl ContentUnit {
    pub fn derived_text(&self, representation: Representation) -> Option<&str> {
        self.derived.get(&representation).map(String::as_str)
    }

    pub fn set_derived(&mut self, representation: Representation, text: String) {
        self.derived.insert(representation, text);
    }

    /// Display title for the assembled page.
    pub fn title(&self) -> String {
        match self.front_matter.plain_name.as_deref() {
            Some(name) => format!("The {}", name.trim()),
            None => self.slug.clone(),
        }
    }
}
