//! Feature classification (spec §4.3, Open Question #1 in DESIGN.md: the
//! label-based policy is the only one implemented).

use prlens_core::LabelInfo;

const ALLOW_LABELS: &[&str] =
    &["feature", "enhancement", "new-feature", "type:feature", "type:enhancement", "improvement", "addition", "feat"];

const EXCLUDE_LABELS: &[&str] = &[
    "bug",
    "bugfix",
    "fix",
    "hotfix",
    "regression",
    "docs",
    "documentation",
    "refactor",
    "cleanup",
    "tech-debt",
    "chore",
    "maintenance",
    "ci",
    "build",
    "infra",
    "test",
    "tests",
    "qa",
    "revert",
    "security-fix",
    "backport",
];

fn has_any(labels: &[LabelInfo], set: &[&str]) -> bool {
    labels.iter().any(|l| set.contains(&l.name.to_ascii_lowercase().as_str()))
}

/// A PR is a feature iff it carries any allow-label, or it is merged and
/// carries no exclude-label and is not documentation-only. Returns the PR
/// title as the feature string when true, empty string otherwise.
pub fn classify_feature(
    title: &str,
    labels: &[LabelInfo],
    is_merged: bool,
    all_files_documentation: bool,
) -> String {
    if has_any(labels, ALLOW_LABELS) {
        return title.to_string();
    }
    if is_merged && !has_any(labels, EXCLUDE_LABELS) && !all_files_documentation {
        return title.to_string();
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(name: &str) -> LabelInfo {
        LabelInfo { name: name.to_string(), color: "000000".to_string() }
    }

    #[test]
    fn scenario_6_bugfix_is_not_feature() {
        let labels = vec![label("bugfix")];
        assert_eq!(classify_feature("Fix crash", &labels, true, false), "");
    }

    #[test]
    fn scenario_6_explicit_feature_label() {
        let labels = vec![label("feature")];
        assert_eq!(classify_feature("Add dark mode", &labels, true, false), "Add dark mode");
    }

    #[test]
    fn scenario_6_documentation_only_is_not_feature() {
        assert_eq!(classify_feature("Update docs", &[], true, true), "");
    }

    #[test]
    fn unmerged_with_no_labels_is_not_feature() {
        assert_eq!(classify_feature("WIP widget", &[], false, false), "");
    }

    #[test]
    fn merged_with_no_labels_and_code_changes_is_feature() {
        assert_eq!(classify_feature("Add widget", &[], true, false), "Add widget");
    }
}
