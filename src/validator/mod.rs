//! Configuration validation primitives
//!
//! Validation accumulates every problem it can find in one pass rather than
//! failing fast. Each step receives a [`Validator`] and pushes
//! [`ConfigIssue`]s as errors or warnings; the finished pass is frozen into a
//! [`ValidationReport`].

pub mod issue;
pub mod report;

use tracing::{debug, warn};

pub use issue::{ConfigIssue, KeyLocation};
pub use report::ValidationReport;

/// Error/warning accumulator threaded through a validation pass
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ConfigIssue>,
    warnings: Vec<ConfigIssue>,
}

impl Validator {
    /// Create an empty accumulator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fatal issue
    pub fn push(&mut self, issue: ConfigIssue) {
        debug!(issue = %issue, "Configuration error");
        self.errors.push(issue);
    }

    /// Record a non-fatal issue
    pub fn push_warning(&mut self, issue: ConfigIssue) {
        warn!(issue = %issue, "Configuration warning");
        self.warnings.push(issue);
    }

    /// Errors recorded so far
    #[must_use]
    pub fn errors(&self) -> &[ConfigIssue] {
        &self.errors
    }

    /// Warnings recorded so far
    #[must_use]
    pub fn warnings(&self) -> &[ConfigIssue] {
        &self.warnings
    }

    /// Whether any fatal issue was recorded
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Freeze into a report
    #[must_use]
    pub fn into_report(self) -> ValidationReport {
        ValidationReport::new(self.errors, self.warnings)
    }
}

/// Render a list the way issue messages quote values: `'a', 'b' and 'c'`
#[must_use]
pub fn join_quoted<S: AsRef<str>>(values: &[S]) -> String {
    join_quoted_with(values, "and")
}

/// Like [`join_quoted`] but joined with `or` for "must be one of" messages
#[must_use]
pub fn join_quoted_or<S: AsRef<str>>(values: &[S]) -> String {
    join_quoted_with(values, "or")
}

fn join_quoted_with<S: AsRef<str>>(values: &[S], conjunction: &str) -> String {
    let quoted: Vec<String> = values.iter().map(|v| format!("'{}'", v.as_ref())).collect();
    match quoted.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} {conjunction} {last}", init.join(", ")),
    }
}

/// Split `values` into unknown entries (when `valid` is given) and
/// case-sensitive duplicates, each in first-seen order
#[must_use]
pub fn check_list(values: &[String], valid: Option<&[&str]>) -> (Vec<String>, Vec<String>) {
    let mut seen: Vec<&str> = Vec::with_capacity(values.len());
    let mut invalid = Vec::new();
    let mut duplicates = Vec::new();

    for value in values {
        if let Some(valid) = valid {
            if !oidc_consts::is_one_of(value, valid) && !invalid.contains(value) {
                invalid.push(value.clone());
            }
        }

        if seen.contains(&value.as_str()) {
            if !duplicates.contains(value) {
                duplicates.push(value.clone());
            }
        } else {
            seen.push(value);
        }
    }

    (invalid, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_quoted_formats_lists() {
        assert_eq!(join_quoted::<&str>(&[]), "");
        assert_eq!(join_quoted(&["a"]), "'a'");
        assert_eq!(join_quoted(&["a", "b", "c"]), "'a', 'b' and 'c'");
        assert_eq!(join_quoted_or(&["a", "b"]), "'a' or 'b'");
        assert_eq!(join_quoted_or(&["a", "b", "c"]), "'a', 'b' or 'c'");
        assert_eq!(join_quoted_or(&["a"]), "'a'");
        assert_eq!(join_quoted_with(&["a", "b"], "nor"), "'a' nor 'b'");
    }

    #[test]
    fn check_list_reports_unknown_and_duplicates_once() {
        // GIVEN: a list with an unknown value and a repeated value
        let values: Vec<String> = ["code", "bogus", "code", "code", "bogus"]
            .iter()
            .map(ToString::to_string)
            .collect();

        // WHEN: checked against a vocabulary
        let (invalid, duplicates) = check_list(&values, Some(&["code", "token"]));

        // THEN: each problem value is listed once
        assert_eq!(invalid, vec!["bogus"]);
        assert_eq!(duplicates, vec!["code", "bogus"]);
    }

    #[test]
    fn check_list_duplicates_are_case_sensitive() {
        let values = vec!["Openid".to_string(), "openid".to_string()];
        let (invalid, duplicates) = check_list(&values, None);
        assert!(invalid.is_empty());
        assert!(duplicates.is_empty());
    }

    #[test]
    fn validator_separates_errors_and_warnings() {
        let mut v = Validator::new();
        v.push(ConfigIssue::NoClients);
        v.push_warning(ConfigIssue::EntropyDisabled);

        assert!(v.has_errors());
        let report = v.into_report();
        assert_eq!(report.errors(), &[ConfigIssue::NoClients]);
        assert_eq!(report.warnings(), &[ConfigIssue::EntropyDisabled]);
    }
}
