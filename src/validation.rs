//! Validation System - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! Policy maps violations to a validity flag. Validity never blocks preview
//! rendering, only the copy path.

use serde::{Deserialize, Serialize};

use crate::record::ContactRecord;
use crate::theme::{FailureMode, Theme};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub field: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
    pub theme_id: String,
    pub theme_version: String,
}

impl ValidationResult {
    pub fn success(theme: &Theme) -> Self {
        Self {
            valid: true,
            violations: vec![],
            theme_id: theme.id.clone(),
            theme_version: theme.theme_version.clone(),
        }
    }

    pub fn failure(theme: &Theme, violations: Vec<ValidationViolation>) -> Self {
        Self {
            valid: false,
            violations,
            theme_id: theme.id.clone(),
            theme_version: theme.theme_version.clone(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations
            .iter()
            .map(|v| format!("{}: {}", v.rule, v.message))
            .collect()
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, record: &ContactRecord, theme: &Theme) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct RequiredFieldsRule;

impl ValidationRule for RequiredFieldsRule {
    fn name(&self) -> &'static str { "required_fields" }

    fn validate(&self, record: &ContactRecord, _theme: &Theme) -> Vec<ValidationViolation> {
        record
            .missing_required()
            .into_iter()
            .map(|field| ValidationViolation {
                rule: self.name().to_string(),
                field: format!("{:?}", field).to_lowercase(),
                severity: ViolationSeverity::Error,
                message: format!("{} is required", field.label()),
                remediation: vec![format!("Fill in {}", field.label())],
            })
            .collect()
    }
}

pub struct EmailShapeRule;

impl ValidationRule for EmailShapeRule {
    fn name(&self) -> &'static str { "email_shape" }

    fn validate(&self, record: &ContactRecord, _theme: &Theme) -> Vec<ValidationViolation> {
        if record.email.is_empty() || looks_like_email(&record.email) {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            field: "email".to_string(),
            severity: ViolationSeverity::Warning,
            message: "Email address does not look like user@domain".to_string(),
            remediation: vec!["Check the email address for typos".to_string()],
        }]
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Advisory check that the address belongs to the theme's organization.
pub struct EmailDomainRule;

impl ValidationRule for EmailDomainRule {
    fn name(&self) -> &'static str { "email_domain" }

    fn validate(&self, record: &ContactRecord, theme: &Theme) -> Vec<ValidationViolation> {
        let allowed = match &theme.validation.allowed_email_domain {
            Some(domain) if !record.email.is_empty() => domain,
            _ => return vec![],
        };

        let domain = record.email.rsplit_once('@').map(|(_, d)| d).unwrap_or("");
        if domain.eq_ignore_ascii_case(allowed) {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            field: "email".to_string(),
            severity: ViolationSeverity::Warning,
            message: format!("Email is not an @{} address", allowed),
            remediation: vec![format!("Use your @{} address", allowed)],
        }]
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredFieldsRule),
                Box::new(EmailShapeRule),
                Box::new(EmailDomainRule),
            ],
        }
    }

    pub fn validate(&self, record: &ContactRecord, theme: &Theme) -> ValidationResult {
        let mut all_violations = vec![];

        for rule in &self.rules {
            all_violations.extend(rule.validate(record, theme));
        }

        let has_errors = all_violations.iter()
            .any(|v| v.severity == ViolationSeverity::Error);

        match theme.validation.failure_mode {
            FailureMode::Block if has_errors => ValidationResult::failure(theme, all_violations),
            FailureMode::Block if all_violations.is_empty() => ValidationResult::success(theme),
            // Warnings never block
            FailureMode::Block | FailureMode::Warn | FailureMode::Log => ValidationResult {
                valid: true,
                violations: all_violations,
                theme_id: theme.id.clone(),
                theme_version: theme.theme_version.clone(),
            },
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
