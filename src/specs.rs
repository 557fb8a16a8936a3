//! End-to-end spec selection from changed files.
//!
//! A change under `src/blocks/<feature>/…` (or one of the other tracked
//! categories) selects the Cypress specs of that feature. The selection is
//! written as a comma-joined glob string for the test runner.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Source directories whose features carry their own Cypress specs.
pub const DEFAULT_CATEGORIES: &[&str] = &["src/blocks", "src/extensions", "src/components"];

/// Glob appended to `{category}/{feature}/` to find spec files.
pub const DEFAULT_SPEC_SUFFIX: &str = "**/*.cypress.js";

/// Default location of the spec string consumed by the test runner.
pub const DEFAULT_SPEC_STRING_PATH: &str = "/tmp/specstring";

/// A spec glob for one feature in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecGlob {
    pub category: String,
    pub feature: String,
    pub pattern: String,
}

/// Features and spec globs selected for a change set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecSelection {
    features: Vec<String>,
    globs: Vec<SpecGlob>,
}

impl SpecSelection {
    /// Distinct feature names in first-seen order.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Distinct globs in first-seen order.
    pub fn globs(&self) -> &[SpecGlob] {
        &self.globs
    }

    /// Returns true if no spec glob was selected.
    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }

    /// The comma-joined glob string passed to the test runner.
    pub fn spec_string(&self) -> String {
        self.globs
            .iter()
            .map(|glob| glob.pattern.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn record(&mut self, category: &str, feature: &str, suffix: &str) {
        if !self.features.iter().any(|f| f == feature) {
            self.features.push(feature.to_string());
        }

        if self
            .globs
            .iter()
            .any(|g| g.category == category && g.feature == feature)
        {
            return;
        }

        self.globs.push(SpecGlob {
            category: category.to_string(),
            feature: feature.to_string(),
            pattern: format!("{}/{}/{}", category, feature, suffix),
        });
    }

    /// Drops globs that match no file under `root`.
    ///
    /// Features left without any glob are dropped too. Returns the number of
    /// globs removed.
    pub fn retain_existing(&mut self, root: &Path) -> usize {
        let before = self.globs.len();

        let Some(root) = root.to_str() else {
            tracing::warn!(root = %root.display(), "project root is not valid UTF-8");
            let removed = self.globs.len();
            self.globs.clear();
            self.features.clear();
            return removed;
        };
        let root = glob::Pattern::escape(root.trim_end_matches('/'));

        self.globs.retain(|spec| {
            let pattern = format!("{}/{}", root, spec.pattern);
            match glob::glob(&pattern) {
                Ok(mut paths) => paths.any(|entry| entry.is_ok()),
                Err(e) => {
                    tracing::warn!(pattern = %spec.pattern, error = %e, "invalid spec glob");
                    false
                }
            }
        });

        let globs = &self.globs;
        self.features
            .retain(|feature| globs.iter().any(|g| &g.feature == feature));

        before - self.globs.len()
    }
}

/// Result of selecting specs for a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecOutcome {
    /// At least one spec glob applies.
    Selected(SpecSelection),
    /// The change set contained no paths at all.
    NoChanges,
    /// Paths changed, but none under a tracked category.
    NoApplicableSpecs,
}

/// Maps changed paths onto spec globs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSelector {
    categories: Vec<String>,
    suffix: String,
}

impl Default for SpecSelector {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            suffix: DEFAULT_SPEC_SUFFIX.to_string(),
        }
    }
}

impl SpecSelector {
    /// Creates a selector for the given categories and spec suffix.
    pub fn new(categories: Vec<String>, suffix: impl Into<String>) -> Self {
        Self {
            categories: categories
                .into_iter()
                .map(|c| c.trim_end_matches('/').to_string())
                .collect(),
            suffix: suffix.into(),
        }
    }

    /// Returns the feature directory of `path` within `category`, if any.
    fn feature_of<'a>(category: &str, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(category)?
            .strip_prefix('/')?
            .split('/')
            .next()
            .filter(|feature| !feature.is_empty())
    }

    /// Selects spec globs for `changed_files`.
    ///
    /// Each entry may itself hold several newline-separated paths; blank
    /// lines are skipped. Every category is checked independently per path.
    pub fn select<I, S>(&self, changed_files: I) -> SpecSelection
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = SpecSelection::default();

        for entry in changed_files {
            for path in non_empty_lines(entry.as_ref()) {
                for category in &self.categories {
                    if let Some(feature) = Self::feature_of(category, path) {
                        selection.record(category, feature, &self.suffix);
                    }
                }
            }
        }

        selection
    }

    /// Selects spec globs and classifies an empty result.
    pub fn select_outcome<I, S>(&self, changed_files: I) -> SpecOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries: Vec<S> = changed_files.into_iter().collect();
        let has_paths = entries
            .iter()
            .any(|entry| non_empty_lines(entry.as_ref()).next().is_some());

        if !has_paths {
            return SpecOutcome::NoChanges;
        }

        let selection = self.select(&entries);
        if selection.is_empty() {
            SpecOutcome::NoApplicableSpecs
        } else {
            SpecOutcome::Selected(selection)
        }
    }
}

fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Selects spec globs using the default categories.
pub fn select_specs<I, S>(changed_files: I) -> SpecSelection
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    SpecSelector::default().select(changed_files)
}

/// Writes the spec string for the test runner.
pub fn write_spec_string(path: &Path, selection: &SpecSelection) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, selection.spec_string())?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn selects_blocks_and_extensions() {
        let selection = select_specs([
            "src/blocks/heading/index.js",
            "src/blocks/heading/test.js",
            "src/extensions/gallery/a.js",
            "",
            "README.md",
        ]);

        assert_eq!(selection.features(), ["heading", "gallery"]);
        assert_eq!(
            selection.spec_string(),
            "src/blocks/heading/**/*.cypress.js,src/extensions/gallery/**/*.cypress.js"
        );
    }

    #[test]
    fn repeated_feature_files_collapse() {
        let once = select_specs(["src/blocks/accordion/edit.js"]);
        let many = select_specs([
            "src/blocks/accordion/edit.js",
            "src/blocks/accordion/save.js",
            "src/blocks/accordion/styles/style.scss",
        ]);
        assert_eq!(once, many);
        assert_eq!(many.globs().len(), 1);
    }

    #[test]
    fn same_feature_in_two_categories_keeps_both_globs() {
        let selection = select_specs([
            "src/blocks/gallery/index.js",
            "src/components/gallery/index.js",
        ]);

        assert_eq!(selection.features(), ["gallery"]);
        assert_eq!(
            selection.spec_string(),
            "src/blocks/gallery/**/*.cypress.js,src/components/gallery/**/*.cypress.js"
        );
    }

    #[test]
    fn untracked_paths_never_contribute() {
        let selection = select_specs([
            "package.json",
            "src/utils/helper.js",
            "docs/src/blocks/heading/index.js",
            "src/blocks",
            "src/blocks/",
            "src/blocksmith/x/index.js",
        ]);
        assert!(selection.is_empty());
        assert_eq!(selection.spec_string(), "");
        assert!(selection.features().is_empty());
    }

    #[test]
    fn newline_separated_entries_are_split() {
        let selection =
            select_specs(["src/blocks/buttons/index.js\n\nsrc/components/row/index.js\n"]);
        assert_eq!(selection.features(), ["buttons", "row"]);
    }

    #[test]
    fn outcome_distinguishes_empty_cases() {
        let selector = SpecSelector::default();

        assert_eq!(selector.select_outcome(["", "\n"]), SpecOutcome::NoChanges);
        assert_eq!(
            selector.select_outcome(["README.md", "composer.json"]),
            SpecOutcome::NoApplicableSpecs
        );
        assert!(matches!(
            selector.select_outcome(["src/blocks/alert/index.js"]),
            SpecOutcome::Selected(ref s) if s.features() == ["alert"]
        ));
    }

    #[test]
    fn custom_categories_use_segment_after_prefix() {
        let selector = SpecSelector::new(vec!["packages/ui/".to_string()], "**/*.spec.ts");
        let selection = selector.select(["packages/ui/button/index.ts"]);
        assert_eq!(selection.spec_string(), "packages/ui/button/**/*.spec.ts");
    }

    #[test]
    fn retain_existing_drops_missing_specs() {
        let root = TempDir::new().unwrap();
        let spec_dir = root.path().join("src/blocks/heading/test");
        std::fs::create_dir_all(&spec_dir).unwrap();
        std::fs::write(spec_dir.join("heading.cypress.js"), "describe()").unwrap();

        let mut selection = select_specs([
            "src/blocks/heading/index.js",
            "src/extensions/gallery/a.js",
        ]);
        let removed = selection.retain_existing(root.path());

        assert_eq!(removed, 1);
        assert_eq!(selection.features(), ["heading"]);
        assert_eq!(selection.spec_string(), "src/blocks/heading/**/*.cypress.js");
    }

    #[test]
    fn retain_existing_treats_root_literally() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("build[1]");
        let spec_dir = root.join("src/blocks/heading");
        std::fs::create_dir_all(&spec_dir).unwrap();
        std::fs::write(spec_dir.join("heading.cypress.js"), "describe()").unwrap();

        let mut selection = select_specs(["src/blocks/heading/index.js"]);
        let removed = selection.retain_existing(&root);

        assert_eq!(removed, 0);
        assert_eq!(selection.features(), ["heading"]);
    }

    #[test]
    fn spec_string_is_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/specstring");
        let selection = select_specs(["src/blocks/heading/index.js"]);

        write_spec_string(&path, &selection).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "src/blocks/heading/**/*.cypress.js"
        );
    }
}
