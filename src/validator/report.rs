//! Validation report generation and formatting

use serde::{Serialize, Serializer, ser::SerializeStruct};

use super::issue::ConfigIssue;

/// Outcome of a validation pass: fatal errors and warnings, in the order
/// they were found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: Vec<ConfigIssue>,
    warnings: Vec<ConfigIssue>,
}

impl ValidationReport {
    /// Create a report from already-classified issues
    #[must_use]
    pub fn new(errors: Vec<ConfigIssue>, warnings: Vec<ConfigIssue>) -> Self {
        Self { errors, warnings }
    }

    /// Fatal issues; any entry blocks activation
    #[must_use]
    pub fn errors(&self) -> &[ConfigIssue] {
        &self.errors
    }

    /// Non-fatal issues
    #[must_use]
    pub fn warnings(&self) -> &[ConfigIssue] {
        &self.warnings
    }

    /// Check if the configuration may be activated (no errors)
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Format as human-readable text
    #[must_use]
    pub fn format_text(&self) -> String {
        let mut output = String::new();

        for warning in &self.warnings {
            output.push_str(&format!("warning: {warning}\n"));
        }
        for error in &self.errors {
            output.push_str(&format!("error: {error}\n"));
        }

        output.push_str(&format!(
            "\n{} error(s), {} warning(s): configuration is {}\n",
            self.errors.len(),
            self.warnings.len(),
            if self.is_valid() { "valid" } else { "invalid" }
        ));
        output
    }

    /// Format as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for ValidationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let messages =
            |issues: &[ConfigIssue]| issues.iter().map(ToString::to_string).collect::<Vec<_>>();

        let mut state = serializer.serialize_struct("ValidationReport", 3)?;
        state.serialize_field("valid", &self.is_valid())?;
        state.serialize_field("errors", &messages(&self.errors))?;
        state.serialize_field("warnings", &messages(&self.warnings))?;
        state.end()
    }
}
