//! Preview Session - form state, debounced preview, copy status
//!
//! Owns everything the editing surface needs between events. Callers feed
//! input events and clock ticks; the session decides when to re-render.

use log::debug;
use rusttype::Font;
use std::time::Instant;

use crate::clipboard::{copy_signature, ClipboardSink, ClipboardWriter, CopyStatus};
use crate::compositor::BackgroundImage;
use crate::debounce::{Debouncer, StatusBoard};
use crate::export::ExportedFile;
use crate::pipeline::{PipelineError, SignaturePipeline};
use crate::record::{ContactRecord, FormState};
use crate::signature::RenderedSignature;

pub struct PreviewSession<'p> {
    pipeline: &'p SignaturePipeline,
    theme_id: String,
    form: FormState,
    debounce: Debouncer,
    background: BackgroundImage,
    status: StatusBoard,
    preview: RenderedSignature,
}

impl<'p> PreviewSession<'p> {
    /// Start a session with an empty form and an initial (placeholder) preview.
    pub fn new(pipeline: &'p SignaturePipeline, theme_id: &str) -> Result<Self, PipelineError> {
        Self::with_form(pipeline, theme_id, FormState::new())
    }

    pub fn with_form(
        pipeline: &'p SignaturePipeline,
        theme_id: &str,
        form: FormState,
    ) -> Result<Self, PipelineError> {
        let record = pipeline.record(theme_id, &form)?;
        let preview = pipeline.render_signature(theme_id, &record)?;
        Ok(Self {
            pipeline,
            theme_id: theme_id.to_string(),
            form,
            debounce: Debouncer::default(),
            background: BackgroundImage::new(),
            status: StatusBoard::default(),
            preview,
        })
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn preview(&self) -> &RenderedSignature {
        &self.preview
    }

    pub fn record(&self) -> Result<ContactRecord, PipelineError> {
        self.pipeline.record(&self.theme_id, &self.form)
    }

    /// Record an input event. The preview refreshes on a later `tick`.
    pub fn input(&mut self, field: &str, value: &str, now: Instant) -> Result<(), PipelineError> {
        self.form.set(field, value)?;
        self.debounce.trigger(now);
        Ok(())
    }

    /// Returns true when the preview was re-rendered.
    pub fn tick(&mut self, now: Instant) -> Result<bool, PipelineError> {
        if !self.debounce.poll(now) {
            return Ok(false);
        }
        self.refresh()?;
        Ok(true)
    }

    /// When the next `tick` could re-render, if an update is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Render now and drop any pending debounced update.
    pub fn flush(&mut self) -> Result<(), PipelineError> {
        self.debounce.cancel();
        self.refresh()
    }

    fn refresh(&mut self) -> Result<(), PipelineError> {
        let record = self.record()?;
        self.preview = self.pipeline.render_signature(&self.theme_id, &record)?;
        debug!("preview refreshed for theme {}", self.theme_id);
        Ok(())
    }

    /// Populate name/email from a signed-in profile and refresh immediately.
    pub fn prefill_from_profile(
        &mut self,
        display_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), PipelineError> {
        self.form.prefill_from_profile(display_name, email);
        self.flush()
    }

    pub fn background_loaded(&mut self, image: image::RgbaImage) {
        self.background.mark_loaded(image);
    }

    /// Current meeting background, or `None` while the image is still loading.
    pub fn background(&self, font: Option<&Font<'static>>) -> Result<Option<ExportedFile>, PipelineError> {
        let record = self.record()?;
        self.pipeline.render_background(&self.theme_id, &record, &self.background, font)
    }

    /// Copy from fresh form state, not the possibly stale preview.
    pub fn copy(
        &mut self,
        sink: &mut dyn ClipboardSink,
        writer: &dyn ClipboardWriter,
        now: Instant,
    ) -> Result<CopyStatus, PipelineError> {
        let record = self.record()?;
        let rendered = self.pipeline.render_signature(&self.theme_id, &record)?;
        let status = copy_signature(&rendered, sink, writer);
        self.status.show(status.message.clone(), now);
        Ok(status)
    }

    pub fn status(&self, now: Instant) -> Option<&str> {
        self.status.current(now)
    }
}
