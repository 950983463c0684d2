//! Authorization policy table.
//!
//! # Design
//!
//! Policies are named and referenced by clients. Each has a default decision
//! and an ordered list of rules; rules are evaluated in declaration order and
//! the **first matching rule** wins. Rule order is never changed.
//!
//! ## Subjects
//!
//! | Matcher | Matches when |
//! |---------|--------------|
//! | `user:<name>` | the subject's username equals `<name>` |
//! | `group:<name>` | the subject is a member of `<name>` |
//!
//! A rule matches when any of its matchers does.
//!
//! The reserved names `one_factor`, `two_factor` and `deny` are always
//! available and always decide themselves.

use std::collections::BTreeMap;
use std::fmt;

use oidc_consts::{POLICY_DENY, POLICY_ONE_FACTOR, POLICY_TWO_FACTOR, RESERVED_POLICY_NAMES};
use serde::Serialize;
use tracing::debug;

use crate::config::PolicyConfig;
use crate::discovery::DiscoveryBuilder;
use crate::validator::{ConfigIssue, Validator, join_quoted_or};

/// Authorization level required (or refusal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Single-factor authentication suffices
    OneFactor,
    /// Two-factor authentication is required
    TwoFactor,
    /// Access is refused
    Deny,
}

impl Decision {
    /// Decision used when none is configured
    pub const DEFAULT: Self = Self::TwoFactor;

    /// Parse a configured decision name
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            POLICY_ONE_FACTOR => Some(Self::OneFactor),
            POLICY_TWO_FACTOR => Some(Self::TwoFactor),
            POLICY_DENY => Some(Self::Deny),
            _ => None,
        }
    }

    /// Configuration spelling
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneFactor => POLICY_ONE_FACTOR,
            Self::TwoFactor => POLICY_TWO_FACTOR,
            Self::Deny => POLICY_DENY,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity a policy is evaluated for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    /// Username
    pub username: String,
    /// Group memberships
    pub groups: Vec<String>,
}

/// A single subject matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectMatcher {
    /// Matches one user
    User(String),
    /// Matches members of one group
    Group(String),
}

impl SubjectMatcher {
    /// Parse `user:<name>` or `group:<name>`
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if let Some(user) = value.strip_prefix("user:") {
            (!user.is_empty()).then(|| Self::User(user.to_string()))
        } else if let Some(group) = value.strip_prefix("group:") {
            (!group.is_empty()).then(|| Self::Group(group.to_string()))
        } else {
            None
        }
    }

    fn matches(&self, subject: &Subject) -> bool {
        match self {
            Self::User(user) => subject.username == *user,
            Self::Group(group) => subject.groups.iter().any(|g| g == group),
        }
    }
}

/// One ordered rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyRule {
    /// Decision when the rule matches
    pub decision: Decision,
    /// Matchers; any may match
    pub subjects: Vec<SubjectMatcher>,
}

/// A normalized named policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationPolicy {
    /// Policy name
    pub name: String,
    /// Decision when no rule matches
    pub default_decision: Decision,
    /// Rules in declaration order
    pub rules: Vec<PolicyRule>,
}

impl AuthorizationPolicy {
    /// Evaluate the rules in order; the first match wins, otherwise the
    /// default decision applies.
    #[must_use]
    pub fn decide(&self, subject: &Subject) -> Decision {
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.subjects.iter().any(|m| m.matches(subject)) {
                debug!(
                    policy = %self.name,
                    rule = i + 1,
                    username = %subject.username,
                    decision = %rule.decision,
                    "Policy rule matched"
                );
                return rule.decision;
            }
        }
        debug!(policy = %self.name, username = %subject.username, "No policy rule matched");
        self.default_decision
    }
}

/// All normalized policies, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyTable {
    policies: BTreeMap<String, AuthorizationPolicy>,
}

impl PolicyTable {
    /// Validate and normalize the configured policies, adding every accepted
    /// name to `discovery`.
    pub fn build(
        raw: &BTreeMap<String, PolicyConfig>,
        discovery: &mut DiscoveryBuilder,
        validator: &mut Validator,
    ) -> Self {
        let mut policies = BTreeMap::new();

        for (name, config) in raw {
            if name.trim().is_empty() {
                validator.push(ConfigIssue::PolicyBlankName);
                continue;
            }

            if RESERVED_POLICY_NAMES.contains(&name.as_str()) {
                validator.push(ConfigIssue::PolicyReservedName {
                    name: name.clone(),
                    reserved: join_quoted_or(RESERVED_POLICY_NAMES),
                });
            } else {
                discovery.add_policy(name);
            }

            let policy = normalize_policy(name, config, validator);
            policies.insert(name.clone(), policy);
        }

        Self { policies }
    }

    /// A configured (non-built-in) policy
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AuthorizationPolicy> {
        self.policies.get(name)
    }

    /// Number of configured policies
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether no policies are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Decide `subject` under the policy called `name`. Reserved names decide
    /// themselves; unknown names deny.
    #[must_use]
    pub fn decide(&self, name: &str, subject: &Subject) -> Decision {
        if let Some(decision) = Decision::parse(name) {
            return decision;
        }
        self.policies
            .get(name)
            .map_or(Decision::Deny, |policy| policy.decide(subject))
    }
}

fn normalize_policy(name: &str, config: &PolicyConfig, validator: &mut Validator) -> AuthorizationPolicy {
    let valid = join_quoted_or(RESERVED_POLICY_NAMES);

    let default_decision = if config.default_policy.is_empty() {
        Decision::DEFAULT
    } else if let Some(decision) = Decision::parse(&config.default_policy) {
        decision
    } else {
        validator.push(ConfigIssue::PolicyInvalidDefault {
            name: name.to_string(),
            valid: valid.clone(),
            got: config.default_policy.clone(),
        });
        Decision::DEFAULT
    };

    if config.rules.is_empty() {
        validator.push(ConfigIssue::PolicyMissingRules {
            name: name.to_string(),
        });
    }

    let rules = config
        .rules
        .iter()
        .enumerate()
        .map(|(i, rule)| {
            let decision = if rule.policy.is_empty() {
                Decision::DEFAULT
            } else if let Some(decision) = Decision::parse(&rule.policy) {
                decision
            } else {
                validator.push(ConfigIssue::PolicyRuleInvalidDecision {
                    name: name.to_string(),
                    rule: i + 1,
                    valid: valid.clone(),
                    got: rule.policy.clone(),
                });
                Decision::DEFAULT
            };

            if rule.subject.is_empty() {
                validator.push(ConfigIssue::PolicyRuleMissingSubject {
                    name: name.to_string(),
                    rule: i + 1,
                });
            }

            let subjects = rule
                .subject
                .iter()
                .filter_map(|s| {
                    let matcher = SubjectMatcher::parse(s);
                    if matcher.is_none() {
                        validator.push(ConfigIssue::PolicyRuleInvalidSubject {
                            name: name.to_string(),
                            rule: i + 1,
                            subject: s.clone(),
                        });
                    }
                    matcher
                })
                .collect();

            PolicyRule { decision, subjects }
        })
        .collect();

    AuthorizationPolicy {
        name: name.to_string(),
        default_decision,
        rules,
    }
}
