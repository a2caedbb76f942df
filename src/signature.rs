//! Signature Renderer
//!
//! Turns a `ContactRecord` into a table-based HTML fragment for rich-text
//! email clients, plus the plain-text equivalent. Both are pure functions of
//! the record and theme.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::escape::escape_html;
use crate::record::ContactRecord;
use crate::theme::Theme;
use crate::validation::{ValidationResult, Validator};

pub const NAME_PLACEHOLDER: &str = "Your Name";
pub const TITLE_PLACEHOLDER: &str = "Your Title";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedSignature {
    pub html: String,
    pub plain_text: String,
    pub validation: ValidationResult,
}

impl RenderedSignature {
    /// False when name or title is missing; the copy path must refuse.
    pub fn is_copyable(&self) -> bool {
        self.validation.valid && !self.validation.has_errors()
    }
}

/// Render both representations and the record's validity.
pub fn render(record: &ContactRecord, theme: &Theme) -> RenderedSignature {
    render_with(&Validator::default(), record, theme)
}

pub fn render_with(validator: &Validator, record: &ContactRecord, theme: &Theme) -> RenderedSignature {
    let html = render_html(record, theme);
    let plain_text = render_plain_text(record);
    let validation = validator.validate(record, theme);
    debug!(
        "rendered signature with theme {} ({} bytes html, valid={})",
        theme.id,
        html.len(),
        validation.valid
    );
    RenderedSignature { html, plain_text, validation }
}

/// One optional line of the contact block.
enum ContactLine<'a> {
    Labeled(&'static str, &'a str),
    Email(&'a str),
    Website { href: String, text: &'a str },
    Note(&'a str),
}

/// Optional lines in display order: Cell, Office, Pronouns, Email, Website, Other.
fn contact_lines(record: &ContactRecord) -> Vec<ContactLine<'_>> {
    let mut lines = vec![];
    if !record.cell.is_empty() {
        lines.push(ContactLine::Labeled("Cell", &record.cell));
    }
    if !record.office.is_empty() {
        lines.push(ContactLine::Labeled("Office", &record.office));
    }
    if !record.pronouns.is_empty() {
        lines.push(ContactLine::Labeled("Pronouns", &record.pronouns));
    }
    if !record.email.is_empty() {
        lines.push(ContactLine::Email(&record.email));
    }
    if let Some(href) = record.website_href() {
        lines.push(ContactLine::Website { href, text: &record.website });
    }
    if !record.other.is_empty() {
        lines.push(ContactLine::Note(&record.other));
    }
    lines
}

fn header_or_placeholder(value: &str, placeholder: &str, theme: &Theme) -> String {
    if value.is_empty() {
        format!(
            r#"<span style="color: {};">{}</span>"#,
            theme.palette.placeholder, placeholder
        )
    } else {
        escape_html(value)
    }
}

pub fn render_html(record: &ContactRecord, theme: &Theme) -> String {
    let font = &theme.typography.font_family;
    let palette = &theme.palette;
    let sizes = &theme.typography;

    let contact_style = format!(
        "font-family: {}; font-size: {}px; color: {}; padding: 2px 0;",
        font, sizes.contact_size, palette.primary_text
    );
    let link_style = format!("color: {}; text-decoration: none;", palette.link);

    let mut contact_rows = String::new();
    for line in contact_lines(record) {
        // Writing into a String cannot fail.
        let _ = match line {
            ContactLine::Labeled(label, value) => write!(
                contact_rows,
                r#"<tr><td style="{}">{}: {}</td></tr>"#,
                contact_style,
                label,
                escape_html(value)
            ),
            ContactLine::Email(email) => {
                let email = escape_html(email);
                write!(
                    contact_rows,
                    r#"<tr><td style="{}"><a href="mailto:{}" style="{}">{}</a></td></tr>"#,
                    contact_style, email, link_style, email
                )
            }
            ContactLine::Website { href, text } => write!(
                contact_rows,
                r#"<tr><td style="{}"><a href="{}" style="{}">{}</a></td></tr>"#,
                contact_style,
                escape_html(&href),
                link_style,
                escape_html(text)
            ),
            ContactLine::Note(note) => write!(
                contact_rows,
                r#"<tr><td style="font-family: {}; font-size: {}px; color: {}; padding: 8px 0 2px 0; font-style: italic;">{}</td></tr>"#,
                font,
                sizes.note_size,
                palette.secondary_text,
                escape_html(note)
            ),
        };
    }

    let logo_cell = match &theme.logo {
        Some(logo) => format!(
            r#"
        <td style="vertical-align: top; padding-right: 15px;">
            <img src="{}" alt="{}" width="{}" height="{}" style="display: block; border: 0;">
        </td>"#,
            escape_html(&logo.url),
            escape_html(&logo.alt),
            logo.width,
            logo.height
        ),
        None => String::new(),
    };

    format!(
        r#"<table cellpadding="0" cellspacing="0" border="0" style="font-family: {font}; font-size: {base}px; line-height: 1.4;">
    <tr>{logo_cell}
        <td style="width: 3px; background-color: {accent}; vertical-align: top;"></td>
        <td style="vertical-align: top; padding-left: 15px;">
            <table cellpadding="0" cellspacing="0" border="0">
                <tr>
                    <td style="font-family: {font}; font-size: {name_size}px; font-weight: bold; color: {primary}; padding-bottom: 2px;">
                        {name}
                    </td>
                </tr>
                <tr>
                    <td style="font-family: {font}; font-size: {title_size}px; color: {secondary}; padding-bottom: 2px;">
                        {title}
                    </td>
                </tr>
                <tr>
                    <td style="font-family: {font}; font-size: {org_size}px; font-weight: bold; color: {primary}; padding-bottom: 8px;">
                        {organization}
                    </td>
                </tr>
                {contact_rows}
            </table>
        </td>
    </tr>
</table>"#,
        font = font,
        base = sizes.base_size,
        logo_cell = logo_cell,
        accent = palette.accent,
        name_size = sizes.name_size,
        title_size = sizes.title_size,
        org_size = sizes.organization_size,
        primary = palette.primary_text,
        secondary = palette.secondary_text,
        name = header_or_placeholder(&record.name, NAME_PLACEHOLDER, theme),
        title = header_or_placeholder(&record.title, TITLE_PLACEHOLDER, theme),
        organization = escape_html(&record.organization),
        contact_rows = contact_rows,
    )
}

/// Plain-text fallback used alongside the HTML on clipboard writes.
pub fn render_plain_text(record: &ContactRecord) -> String {
    let mut lines: Vec<String> = vec![
        record.name.clone(),
        record.title.clone(),
        record.organization.clone(),
    ];
    let mut note = None;

    for line in contact_lines(record) {
        match line {
            ContactLine::Labeled(label, value) => lines.push(format!("{}: {}", label, value)),
            ContactLine::Email(email) => lines.push(email.to_string()),
            ContactLine::Website { text, .. } => lines.push(text.to_string()),
            ContactLine::Note(text) => note = Some(text),
        }
    }

    let mut text = lines.join("\n");
    if let Some(note) = note {
        text.push_str("\n\n");
        text.push_str(note);
    }
    text.trim().to_string()
}
