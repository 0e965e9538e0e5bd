//! Shared test infrastructure for integration tests.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// A throwaway docs tree the compiled binary builds from.
pub struct SiteFixture {
    root: TempDir,
}

impl SiteFixture {
    pub fn new() -> Self {
        SiteFixture {
            root: TempDir::new().expect("create fixture tempdir"),
        }
    }

    pub fn docs_dir(&self) -> PathBuf {
        self.root.path().join("docs")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root.path().join("site")
    }

    pub fn license_dir(&self, category: &str, slug: &str) -> PathBuf {
        self.docs_dir().join("licenses").join(category).join(slug)
    }

    /// Write a license page with the standard required keys plus
    /// `front_extra` appended verbatim to the front matter.
    pub fn add_license(&self, category: &str, slug: &str, reader_text: &str, front_extra: &str) {
        let dir = self.license_dir(category, slug);
        fs::create_dir_all(&dir).expect("create license dir");
        let indented: String = reader_text
            .lines()
            .map(|line| format!("  {line}\n"))
            .collect();
        let page = format!(
            "---\ncategory: {category}\nplain_name: Plain {slug}\nspdx_id: {slug}\n\
             reader_license_text: |\n{indented}{front_extra}---\n"
        );
        fs::write(dir.join("index.md"), page).expect("write license page");
    }

    pub fn add_changelog(&self, category: &str, slug: &str, content: &str) {
        let dir = self.license_dir(category, slug);
        fs::write(dir.join("CHANGELOG.md"), content).expect("write changelog");
    }

    pub fn add_package_json(&self, category: &str, slug: &str, version: &str) {
        let dir = self.license_dir(category, slug);
        fs::write(
            dir.join("package.json"),
            format!("{{\"name\": \"{slug}\", \"version\": \"{version}\"}}"),
        )
        .expect("write package.json");
    }

    /// Run the binary with `args` plus the fixture's docs/out directories.
    pub fn run(&self, args: &[&str]) -> Output {
        let mut command = Command::new(env!("CARGO_BIN_EXE_plb"));
        command.args(args);
        command.arg("--docs-dir").arg(self.docs_dir());
        if args[0] != "bump-version" {
            command.arg("--out-dir").arg(self.out_dir());
        }
        command.output().expect("run plb")
    }

    pub fn read_output(&self, rel_path: &str) -> String {
        let path = self.out_dir().join(rel_path);
        fs::read_to_string(&path)
            .unwrap_or_else(|error| panic!("read {}: {error}", path.display()))
    }
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
