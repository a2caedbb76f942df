//! Render Pipeline - Single Entry Point
//!
//! Every signature render goes through validation; the bundle carries the
//! result so the copy path can refuse incomplete records.

use chrono::{DateTime, Utc};
use log::{debug, info};
use rusttype::Font;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::compositor::{BackgroundImage, ComposeOutcome, CompositeError, Compositor};
use crate::export::{background_filename, encode_jpeg, ExportError, ExportedFile};
use crate::hashing::{compute_job_hash, compute_manifest_hash};
use crate::record::{ContactRecord, FormError, FormState};
use crate::signature::{self, RenderedSignature};
use crate::surface::ImageSurface;
use crate::theme::{Theme, ThemeError, ThemeRegistry};
use crate::validation::{ValidationResult, Validator};
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Theme not found: {0}")]
    ThemeNotFound(String),

    #[error("Theme error: {0}")]
    Theme(#[from] ThemeError),

    #[error("Compositing error: {0}")]
    Composite(#[from] CompositeError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Form error: {0}")]
    Form(#[from] FormError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleRequest {
    pub theme_id: String,
    pub form: FormState,
    #[serde(default)]
    pub include_background: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureBundle {
    pub id: String,
    pub theme_id: String,
    pub theme_version: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub manifest_hash: String,
    pub job_hash: String,
    pub record: ContactRecord,
    pub validation: ValidationResult,
    pub html: String,
    pub plain_text: String,
    #[serde(default)]
    pub background: Option<ExportedFile>,
}

/// The render pipeline - single entry point for all signature operations
pub struct SignaturePipeline {
    registry: ThemeRegistry,
    validator: Validator,
}

impl SignaturePipeline {
    pub fn new(registry: ThemeRegistry) -> Self {
        Self {
            registry,
            validator: Validator::new(),
        }
    }

    /// List all available themes
    pub fn list_themes(&self) -> Vec<&Theme> {
        self.registry.list()
    }

    pub fn get_theme(&self, id: &str) -> Option<&Theme> {
        self.registry.get(id)
    }

    /// Look up a theme and check it can run on this engine.
    pub fn theme(&self, id: &str) -> Result<&Theme, PipelineError> {
        let theme = self.registry.get(id)
            .ok_or_else(|| PipelineError::ThemeNotFound(id.to_string()))?;
        theme.check_engine_version()?;
        Ok(theme)
    }

    /// Snapshot the form with the theme's organization.
    pub fn record(&self, theme_id: &str, form: &FormState) -> Result<ContactRecord, PipelineError> {
        Ok(form.record(&self.theme(theme_id)?.organization))
    }

    pub fn validate_record(
        &self,
        theme_id: &str,
        record: &ContactRecord,
    ) -> Result<ValidationResult, PipelineError> {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let theme = self.theme(theme_id)?;
        Ok(self.validator.validate(record, theme))
    }

    /// Render the HTML and plain-text signature. Validation is always run.
    pub fn render_signature(
        &self,
        theme_id: &str,
        record: &ContactRecord,
    ) -> Result<RenderedSignature, PipelineError> {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let theme = self.theme(theme_id)?;
        Ok(signature::render_with(&self.validator, record, theme))
    }

    /// Compose and encode the meeting background. `None` when the background
    /// image has not been loaded yet.
    pub fn render_background(
        &self,
        theme_id: &str,
        record: &ContactRecord,
        background: &BackgroundImage,
        font: Option<&Font<'static>>,
    ) -> Result<Option<ExportedFile>, PipelineError> {
        let theme = self.theme(theme_id)?;
        let layout = &theme.background;
        let compositor = Compositor::from_theme(theme)?;

        let mut surface = ImageSurface::new(layout.width, layout.height);
        if let Some(font) = font {
            surface = surface.with_font(font.clone());
        }

        let outcome = compositor.compose(&mut surface, background, &record.name, &record.pronouns)?;
        debug!("background compose outcome: {:?}", outcome);
        if outcome == ComposeOutcome::Skipped {
            return Ok(None);
        }

        let bytes = encode_jpeg(surface.pixels(), layout.jpeg_quality)?;
        Ok(Some(ExportedFile::jpeg(
            background_filename(&record.name),
            [layout.width, layout.height],
            &bytes,
        )))
    }

    /// Render everything for one request into a hashed bundle.
    pub fn compile(
        &self,
        request: &BundleRequest,
        background: &BackgroundImage,
        font: Option<&Font<'static>>,
    ) -> Result<SignatureBundle, PipelineError> {
        let theme = self.theme(&request.theme_id)?;
        let record = request.form.record(&theme.organization);
        let rendered = self.render_signature(&request.theme_id, &record)?;

        let background = if request.include_background {
            self.render_background(&request.theme_id, &record, background, font)?
        } else {
            None
        };

        let job_hash = compute_job_hash(
            &theme.id,
            &theme.theme_version,
            &record,
            ENGINE_VERSION,
        )?;

        let mut bundle = SignatureBundle {
            id: Uuid::new_v4().to_string(),
            theme_id: theme.id.clone(),
            theme_version: theme.theme_version.clone(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            manifest_hash: String::new(),  // Computed after
            job_hash,
            record,
            validation: rendered.validation,
            html: rendered.html,
            plain_text: rendered.plain_text,
            background,
        };

        bundle.manifest_hash = compute_manifest_hash(&bundle)?;
        info!("compiled bundle {} (job {})", bundle.id, &bundle.job_hash[..12]);

        Ok(bundle)
    }
}

impl Default for SignaturePipeline {
    fn default() -> Self {
        Self::new(ThemeRegistry::default())
    }
}
