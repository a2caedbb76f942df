//! Clipboard - rich write with a legacy fallback
//!
//! A `ClipboardSink` is the platform clipboard. A `ClipboardWriter` is the
//! strategy for putting a signature on it, chosen once at startup from what
//! the sink supports.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::signature::RenderedSignature;

pub const MSG_COPIED: &str = "Signature copied! Paste it in your email settings.";
pub const MSG_MISSING_REQUIRED: &str = "Please fill in Name and Job Title";
pub const MSG_COPY_FAILED: &str = "Copy failed. Please select and copy manually.";

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard does not support rich (multi-format) items")]
    RichUnsupported,

    #[error("Clipboard write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One clipboard write. Rich writes carry both flavors; selection copies only
/// carry the HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardItem {
    pub html: String,
    pub text: Option<String>,
}

pub trait ClipboardSink {
    fn supports_rich(&self) -> bool;
    fn put(&mut self, item: ClipboardItem) -> Result<(), ClipboardError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardCapability {
    Rich,
    Legacy,
}

pub trait ClipboardWriter {
    fn kind(&self) -> ClipboardCapability;
    fn write_signature(&self, sink: &mut dyn ClipboardSink, html: &str, text: &str) -> Result<(), ClipboardError>;
}

/// Writes `text/html` and `text/plain` as a single item.
pub struct RichClipboard;

impl ClipboardWriter for RichClipboard {
    fn kind(&self) -> ClipboardCapability {
        ClipboardCapability::Rich
    }

    fn write_signature(&self, sink: &mut dyn ClipboardSink, html: &str, text: &str) -> Result<(), ClipboardError> {
        if !sink.supports_rich() {
            return Err(ClipboardError::RichUnsupported);
        }
        sink.put(ClipboardItem {
            html: html.to_string(),
            text: Some(text.to_string()),
        })
    }
}

/// Selection-based copy of the rendered HTML.
pub struct LegacyClipboard;

impl ClipboardWriter for LegacyClipboard {
    fn kind(&self) -> ClipboardCapability {
        ClipboardCapability::Legacy
    }

    fn write_signature(&self, sink: &mut dyn ClipboardSink, html: &str, _text: &str) -> Result<(), ClipboardError> {
        sink.put(ClipboardItem { html: html.to_string(), text: None })
    }
}

/// Pick the writer for this sink. Call once at startup.
pub fn select_writer(sink: &dyn ClipboardSink) -> Box<dyn ClipboardWriter> {
    if sink.supports_rich() {
        Box::new(RichClipboard)
    } else {
        Box::new(LegacyClipboard)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyStatus {
    pub kind: StatusKind,
    pub message: String,
    pub via: Option<ClipboardCapability>,
}

impl CopyStatus {
    fn success(via: ClipboardCapability) -> Self {
        Self { kind: StatusKind::Success, message: MSG_COPIED.to_string(), via: Some(via) }
    }

    fn error(message: &str) -> Self {
        Self { kind: StatusKind::Error, message: message.to_string(), via: None }
    }

    pub fn is_success(&self) -> bool {
        self.kind == StatusKind::Success
    }
}

/// Copy a rendered signature. Refuses incomplete records. A failed rich write
/// falls back to a legacy write exactly once.
pub fn copy_signature(
    rendered: &RenderedSignature,
    sink: &mut dyn ClipboardSink,
    writer: &dyn ClipboardWriter,
) -> CopyStatus {
    if !rendered.is_copyable() {
        return CopyStatus::error(MSG_MISSING_REQUIRED);
    }

    match writer.write_signature(sink, &rendered.html, &rendered.plain_text) {
        Ok(()) => {
            debug!("signature copied via {:?} clipboard", writer.kind());
            return CopyStatus::success(writer.kind());
        }
        Err(e) => warn!("{:?} clipboard write failed: {}", writer.kind(), e),
    }

    if writer.kind() == ClipboardCapability::Legacy {
        return CopyStatus::error(MSG_COPY_FAILED);
    }

    match LegacyClipboard.write_signature(sink, &rendered.html, &rendered.plain_text) {
        Ok(()) => CopyStatus::success(ClipboardCapability::Legacy),
        Err(e) => {
            warn!("legacy clipboard fallback failed: {}", e);
            CopyStatus::error(MSG_COPY_FAILED)
        }
    }
}

/// In-memory clipboard.
#[derive(Debug, Default)]
pub struct MemoryClipboardSink {
    pub rich: bool,
    pub items: Vec<ClipboardItem>,
}

impl MemoryClipboardSink {
    pub fn new(rich: bool) -> Self {
        Self { rich, items: vec![] }
    }

    pub fn last(&self) -> Option<&ClipboardItem> {
        self.items.last()
    }
}

impl ClipboardSink for MemoryClipboardSink {
    fn supports_rich(&self) -> bool {
        self.rich
    }

    fn put(&mut self, item: ClipboardItem) -> Result<(), ClipboardError> {
        self.items.push(item);
        Ok(())
    }
}

/// Writes `signature.html` (and `signature.txt` for rich items) into a
/// directory. Used by the CLI where there is no desktop clipboard.
pub struct FileClipboardSink {
    dir: PathBuf,
}

impl FileClipboardSink {
    pub const HTML_FILE: &'static str = "signature.html";
    pub const TEXT_FILE: &'static str = "signature.txt";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ClipboardSink for FileClipboardSink {
    fn supports_rich(&self) -> bool {
        true
    }

    fn put(&mut self, item: ClipboardItem) -> Result<(), ClipboardError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(Self::HTML_FILE), &item.html)?;
        if let Some(text) = &item.text {
            fs::write(self.dir.join(Self::TEXT_FILE), text)?;
        }
        Ok(())
    }
}
