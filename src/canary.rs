//! The build canary.
//!
//! Most license content is generated during the build, so a page can be
//! silently dropped or shipped with an unresolved placeholder without any
//! single phase noticing. The canary is the build-wide tally that catches
//! this: it learns the expected set of license slugs before any page is
//! processed, records which slugs reached each phase, accumulates
//! diagnostics, and settles into a single verdict at the end of the run.
//!
//! One canary belongs to exactly one build run. It is constructed by the
//! pipeline and passed by reference to every phase; rebuilds (serve mode)
//! construct a fresh one, which is what keeps runs isolated from each
//! other. Errors are accumulated, never raised — the whole point is one
//! comprehensive report at the end instead of dying on the first problem.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::OnceLock;

/// Build phases a content unit passes through, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Gathered,
    Markdown,
    Assembled,
    Written,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Gathered,
        Phase::Markdown,
        Phase::Assembled,
        Phase::Written,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Gathered => "gathered",
            Phase::Markdown => "markdown",
            Phase::Assembled => "assembled",
            Phase::Written => "written",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final state of a build run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Verified,
    Failed,
}

/// Whether a failed verdict aborts the build or only logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    Hard,
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Collecting,
    Settled(Verdict),
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*[^{}]*?\s*\}\}").expect("static pattern"))
}

/// Build-wide consistency tracker for one run.
#[derive(Debug)]
pub struct BuildCanary {
    expected: BTreeSet<String>,
    observed: BTreeMap<Phase, BTreeSet<String>>,
    errors: Vec<String>,
    production: bool,
    state: State,
}

impl BuildCanary {
    /// Start a canary for one build run. `expected` is fixed from here on.
    pub fn new<I, S>(expected: I, production: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let expected: BTreeSet<String> = expected.into_iter().map(Into::into).collect();
        tracing::debug!(count = expected.len(), production, "canary started");
        BuildCanary {
            expected,
            observed: BTreeMap::new(),
            errors: Vec::new(),
            production,
            state: State::Collecting,
        }
    }

    pub fn production(&self) -> bool {
        self.production
    }

    pub fn expected(&self) -> &BTreeSet<String> {
        &self.expected
    }

    pub fn is_expected(&self, slug: &str) -> bool {
        self.expected.contains(slug)
    }

    /// Record that `slug` reached `phase`. A slug outside the expected set
    /// is ignored: other pages may flow through the same pipeline hooks.
    pub fn register(&mut self, phase: Phase, slug: &str) {
        if let State::Settled(_) = self.state {
            tracing::warn!(%phase, slug, "register after verdict ignored");
            return;
        }
        if !self.expected.contains(slug) {
            tracing::debug!(%phase, slug, "unexpected slug not registered");
            return;
        }
        self.observed.entry(phase).or_default().insert(slug.to_string());
    }

    /// Number of expected slugs observed at `phase`.
    pub fn observed_count(&self, phase: Phase) -> usize {
        self.observed.get(&phase).map_or(0, BTreeSet::len)
    }

    /// Scan `content` for unresolved `{{ ... }}` template placeholders and
    /// record a diagnostic for each hit. Failure is deferred to the verdict.
    pub fn check_placeholders(&mut self, content: &str, phase: Phase, slug: &str) {
        if let State::Settled(_) = self.state {
            return;
        }
        if let Some(found) = placeholder_regex().find(content) {
            self.push_error(format!(
                "unresolved placeholder {} in {slug} at phase {phase}",
                found.as_str()
            ));
        }
    }

    /// Placeholder scan over structured front matter: strings anywhere in
    /// the value tree are checked.
    pub fn check_placeholders_value(&mut self, value: &serde_yaml::Value, phase: Phase, slug: &str) {
        match value {
            serde_yaml::Value::String(text) => self.check_placeholders(text, phase, slug),
            serde_yaml::Value::Sequence(items) => {
                for item in items {
                    self.check_placeholders_value(item, phase, slug);
                }
            }
            serde_yaml::Value::Mapping(map) => {
                for (_, item) in map {
                    self.check_placeholders_value(item, phase, slug);
                }
            }
            _ => {}
        }
    }

    /// Record a build error. No-op after the verdict settles.
    pub fn push_error(&mut self, message: String) {
        if let State::Settled(_) = self.state {
            return;
        }
        tracing::debug!(error = %message, "canary recorded error");
        self.errors.push(message);
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Settle the run. Verified only when every expected slug reached every
    /// phase and no errors accumulated; a build that expected nothing at
    /// all is also a failure, because it means discovery silently came up
    /// empty. Once settled the verdict does not change.
    pub fn verdict(&mut self) -> Verdict {
        if let State::Settled(verdict) = self.state {
            return verdict;
        }
        if self.expected.is_empty() {
            self.errors
                .push("no license pages were discovered; nothing to build".to_string());
        }
        let empty = BTreeSet::new();
        for phase in Phase::ALL {
            let observed = self.observed.get(&phase).unwrap_or(&empty);
            let missing: Vec<&str> = self
                .expected
                .difference(observed)
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                self.errors.push(format!(
                    "phase {phase} saw {} of {} licenses; missing: {}",
                    observed.len(),
                    self.expected.len(),
                    missing.join(", ")
                ));
            }
        }
        let verdict = if self.errors.is_empty() {
            Verdict::Verified
        } else {
            Verdict::Failed
        };
        self.state = State::Settled(verdict);
        tracing::info!(?verdict, errors = self.errors.len(), "canary settled");
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canary(slugs: &[&str]) -> BuildCanary {
        BuildCanary::new(slugs.iter().copied(), false)
    }

    fn register_all(canary: &mut BuildCanary, slugs: &[&str]) {
        for phase in Phase::ALL {
            for slug in slugs {
                canary.register(phase, slug);
            }
        }
    }

    #[test]
    fn verified_when_every_unit_reaches_every_phase() {
        let mut canary = canary(&["mit", "gpl"]);
        register_all(&mut canary, &["mit", "gpl"]);
        assert_eq!(canary.verdict(), Verdict::Verified);
    }

    #[test]
    fn fails_and_names_the_missing_unit() {
        // One unit never makes it to the written phase.
        let mut canary = BuildCanary::new(["mit", "gpl", "isc", "bsd", "mpl"], false);
        for phase in Phase::ALL {
            for slug in ["mit", "gpl", "isc", "bsd", "mpl"] {
                if phase == Phase::Written && slug == "mpl" {
                    continue;
                }
                canary.register(phase, slug);
            }
        }
        assert_eq!(canary.verdict(), Verdict::Failed);
        let report = canary.errors().join("\n");
        assert!(report.contains("written"), "{report}");
        assert!(report.contains("mpl"), "{report}");
        assert!(report.contains("4 of 5"), "{report}");
    }

    #[test]
    fn empty_expected_set_fails() {
        let mut canary = BuildCanary::new(Vec::<String>::new(), true);
        assert_eq!(canary.verdict(), Verdict::Failed);
    }

    #[test]
    fn unexpected_slug_is_ignored_not_fatal() {
        let mut canary = canary(&["mit"]);
        canary.register(Phase::Gathered, "not-a-license");
        assert_eq!(canary.observed_count(Phase::Gathered), 0);
        register_all(&mut canary, &["mit"]);
        assert_eq!(canary.verdict(), Verdict::Verified);
    }

    #[test]
    fn observed_sets_grow_monotonically() {
        let mut canary = canary(&["mit", "gpl"]);
        canary.register(Phase::Gathered, "mit");
        let first = canary.observed_count(Phase::Gathered);
        canary.register(Phase::Gathered, "mit");
        canary.register(Phase::Gathered, "gpl");
        let second = canary.observed_count(Phase::Gathered);
        assert!(second >= first);
        assert_eq!(second, 2);
    }

    #[test]
    fn placeholder_in_content_fails_the_build() {
        let mut canary = canary(&["mit"]);
        register_all(&mut canary, &["mit"]);
        canary.check_placeholders("MIT License {{ year }}", Phase::Markdown, "mit");
        assert_eq!(canary.verdict(), Verdict::Failed);
        assert!(canary.errors()[0].contains("{{ year }}"));
        assert!(canary.errors()[0].contains("markdown"));
    }

    #[test]
    fn placeholder_scan_recurses_through_front_matter() {
        let mut canary = canary(&["mit"]);
        let value: serde_yaml::Value =
            serde_yaml::from_str("title: ok\nnested:\n  - fine\n  - '{{ oops }}'\n")
                .expect("yaml");
        canary.check_placeholders_value(&value, Phase::Assembled, "mit");
        assert_eq!(canary.errors().len(), 1);
        assert!(canary.errors()[0].contains("{{ oops }}"));
    }

    #[test]
    fn clean_content_records_nothing() {
        let mut canary = canary(&["mit"]);
        canary.check_placeholders("no templates here", Phase::Markdown, "mit");
        assert!(canary.errors().is_empty());
    }

    #[test]
    fn verdict_is_terminal() {
        let mut canary = canary(&["mit"]);
        register_all(&mut canary, &["mit"]);
        assert_eq!(canary.verdict(), Verdict::Verified);
        // Mutations after settling are ignored.
        canary.push_error("late error".to_string());
        canary.register(Phase::Gathered, "gpl");
        assert_eq!(canary.verdict(), Verdict::Verified);
        assert!(canary.errors().is_empty());
    }

    #[test]
    fn sequential_runs_share_nothing() {
        let mut first = canary(&["mit"]);
        register_all(&mut first, &["mit"]);
        assert_eq!(first.verdict(), Verdict::Verified);

        // A rebuild constructs a fresh canary with a different expected
        // set; nothing from the first run leaks into its verdict.
        let mut second = canary(&["gpl"]);
        register_all(&mut second, &["gpl"]);
        second.register(Phase::Gathered, "mit");
        assert_eq!(second.observed_count(Phase::Gathered), 1);
        assert_eq!(second.verdict(), Verdict::Verified);
    }
}
