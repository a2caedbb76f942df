//! Sigforge Core - email signatures and meeting backgrounds
//!
//! # Ground Rules
//! 1. Every field is plain text; nothing reaches the HTML unescaped
//! 2. Renders are pure: same record + same theme = same bytes
//! 3. Missing name/title never block the preview, always block the copy
//! 4. No background image, no drawing

pub mod record;
pub mod escape;
pub mod theme;
pub mod validation;
pub mod signature;
pub mod compositor;
pub mod surface;
pub mod export;
pub mod clipboard;
pub mod debounce;
pub mod hashing;
pub mod pipeline;
pub mod session;

pub use record::{ContactRecord, FormState, RequiredField};
pub use theme::{Theme, ThemeId, ThemeRegistry, BackgroundLayout};
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};
pub use signature::{render, RenderedSignature};
pub use compositor::{BackgroundImage, ComposeOutcome, Compositor, RasterSurface};
pub use surface::ImageSurface;
pub use clipboard::{ClipboardCapability, ClipboardWriter, CopyStatus};
pub use hashing::{compute_manifest_hash, compute_job_hash, canonical_json};
pub use pipeline::{SignaturePipeline, SignatureBundle, BundleRequest, PipelineError};
pub use session::PreviewSession;

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
