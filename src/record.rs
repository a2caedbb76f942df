//! Contact Record - the one domain entity
//!
//! A `FormState` holds what the user typed. A `ContactRecord` is the trimmed
//! snapshot handed to the renderers; it is rebuilt on every render.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Unknown form field: {0}")]
    UnknownField(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequiredField {
    Name,
    Title,
}

impl RequiredField {
    pub fn label(&self) -> &'static str {
        match self {
            RequiredField::Name => "Name",
            RequiredField::Title => "Job Title",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactRecord {
    pub name: String,
    pub title: String,
    pub organization: String,
    #[serde(default)]
    pub pronouns: String,
    #[serde(default)]
    pub cell: String,
    #[serde(default)]
    pub office: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub other: String,
}

impl ContactRecord {
    pub fn missing_required(&self) -> Vec<RequiredField> {
        let mut missing = vec![];
        if self.name.is_empty() {
            missing.push(RequiredField::Name);
        }
        if self.title.is_empty() {
            missing.push(RequiredField::Title);
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Link target for the website line.
    ///
    /// Anything not starting with `http://` or `https://` gets `https://` in
    /// front. The displayed text is always the raw `website` value.
    pub fn website_href(&self) -> Option<String> {
        if self.website.is_empty() {
            return None;
        }
        if has_http_scheme(&self.website) {
            Some(self.website.clone())
        } else {
            Some(format!("https://{}", self.website))
        }
    }
}

fn has_http_scheme(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Raw form state, owned by the caller and passed into every render.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormState {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pronouns: String,
    #[serde(default)]
    pub cell: String,
    #[serde(default)]
    pub office: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub other: String,
}

impl FormState {
    /// Field keys in form order.
    pub const FIELDS: [&'static str; 8] = [
        "name", "title", "cell", "office", "pronouns", "email", "website", "other",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) -> Result<(), FormError> {
        *self.field_mut(field)? = value.into();
        Ok(())
    }

    pub fn get(&self, field: &str) -> Result<&str, FormError> {
        let value = match field {
            "name" => &self.name,
            "title" => &self.title,
            "pronouns" => &self.pronouns,
            "cell" => &self.cell,
            "office" => &self.office,
            "email" => &self.email,
            "website" => &self.website,
            "other" => &self.other,
            other => return Err(FormError::UnknownField(other.to_string())),
        };
        Ok(value)
    }

    fn field_mut(&mut self, field: &str) -> Result<&mut String, FormError> {
        let slot = match field {
            "name" => &mut self.name,
            "title" => &mut self.title,
            "pronouns" => &mut self.pronouns,
            "cell" => &mut self.cell,
            "office" => &mut self.office,
            "email" => &mut self.email,
            "website" => &mut self.website,
            "other" => &mut self.other,
            other => return Err(FormError::UnknownField(other.to_string())),
        };
        Ok(slot)
    }

    /// Fill name and email from a signed-in profile. Empty profile values
    /// leave the form untouched.
    pub fn prefill_from_profile(&mut self, display_name: Option<&str>, email: Option<&str>) {
        if let Some(name) = display_name.filter(|n| !n.trim().is_empty()) {
            self.name = name.to_string();
        }
        if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
            self.email = email.to_string();
        }
    }

    /// Snapshot the form as a trimmed record. `organization` is never user input.
    pub fn record(&self, organization: &str) -> ContactRecord {
        ContactRecord {
            name: self.name.trim().to_string(),
            title: self.title.trim().to_string(),
            organization: organization.to_string(),
            pronouns: self.pronouns.trim().to_string(),
            cell: self.cell.trim().to_string(),
            office: self.office.trim().to_string(),
            email: self.email.trim().to_string(),
            website: self.website.trim().to_string(),
            other: self.other.trim().to_string(),
        }
    }
}
