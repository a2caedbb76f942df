//! Sigforge CLI - signature and background generator
//!
//! Commands: themes, validate, signature, background, copy, bundle, watch
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 when a record is refused for missing required fields

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use sigforge::{
    clipboard::{copy_signature, select_writer, ClipboardWriter, FileClipboardSink, LegacyClipboard},
    compositor::BackgroundImage,
    surface::{load_background, load_font},
    theme::{ThemeRegistry, BUILTIN_THEME_ID},
    BundleRequest, FormState, PipelineError, PreviewSession, SignaturePipeline,
};

#[derive(Parser)]
#[command(name = "sigforge-cli")]
#[command(about = "Sigforge CLI - email signatures and meeting backgrounds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to themes directory
    #[arg(long, default_value = "themes", global = true)]
    themes_dir: PathBuf,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available themes
    Themes,

    /// Validate form fields
    Validate {
        #[arg(short, long, default_value = BUILTIN_THEME_ID)]
        theme: String,

        /// JSON payload (form fields)
        #[arg(short, long)]
        payload: String,
    },

    /// Render the HTML and plain-text signature
    Signature {
        #[arg(short, long, default_value = BUILTIN_THEME_ID)]
        theme: String,

        /// JSON payload (form fields)
        #[arg(short, long)]
        payload: String,
    },

    /// Compose the meeting background and write it as JPEG
    Background {
        #[arg(short, long, default_value = BUILTIN_THEME_ID)]
        theme: String,

        /// JSON payload (form fields)
        #[arg(short, long)]
        payload: String,

        /// Background image (defaults to the theme's imagePath)
        #[arg(long)]
        image: Option<PathBuf>,

        /// Bold TrueType font (defaults to the theme's fontPath)
        #[arg(long)]
        font: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Copy the signature to a file-backed clipboard
    Copy {
        #[arg(short, long, default_value = BUILTIN_THEME_ID)]
        theme: String,

        /// JSON payload (form fields)
        #[arg(short, long)]
        payload: String,

        /// Clipboard directory
        #[arg(short, long, default_value = "clipboard")]
        out: PathBuf,

        /// Use the selection-style copy (HTML only)
        #[arg(long)]
        legacy: bool,
    },

    /// Render everything into a hashed JSON bundle
    Bundle {
        /// JSON payload (BundleRequest)
        #[arg(short, long)]
        payload: String,

        #[arg(long)]
        image: Option<PathBuf>,

        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Read `field=value` lines from stdin and print debounced previews
    Watch {
        #[arg(short, long, default_value = BUILTIN_THEME_ID)]
        theme: String,
    },
}

fn init_logger(verbose: bool) {
    let default_filter = if verbose { "sigforge=debug,info" } else { "sigforge=info,warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(s) => {
            println!("{}", s);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("failed to serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn fail(e: impl std::fmt::Display) -> ExitCode {
    println!("{}", serde_json::json!({ "success": false, "error": e.to_string() }));
    ExitCode::FAILURE
}

fn parse_form(payload: &str) -> Result<FormState, String> {
    serde_json::from_str(payload).map_err(|e| format!("Invalid payload: {}", e))
}

fn resolve_background(
    pipeline: &SignaturePipeline,
    theme_id: &str,
    image: Option<PathBuf>,
    font: Option<PathBuf>,
) -> Result<(BackgroundImage, Option<rusttype::Font<'static>>), PipelineError> {
    let layout = &pipeline.theme(theme_id)?.background;

    let background = match image.or_else(|| layout.image_path.clone()) {
        Some(path) => load_background(&path)?,
        None => {
            warn!("no background image configured; background will be skipped");
            BackgroundImage::new()
        }
    };
    let font = match font.or_else(|| layout.font_path.clone()) {
        Some(path) => Some(load_font(&path)?),
        None => None,
    };
    Ok((background, font))
}

fn write_output(dir: &Path, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    fs::write(&path, bytes)?;
    Ok(path)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let registry = match ThemeRegistry::load_from_dir(&cli.themes_dir) {
        Ok(r) => r,
        Err(e) => return fail(format!("Failed to load themes: {}", e)),
    };

    let pipeline = SignaturePipeline::new(registry);

    match cli.command {
        Commands::Themes => {
            let themes: Vec<_> = pipeline.list_themes()
                .iter()
                .map(|t| serde_json::json!({
                    "id": t.id,
                    "name": t.name,
                    "version": t.theme_version,
                    "organization": t.organization,
                    "background": [t.background.width, t.background.height],
                }))
                .collect();
            print_json(&themes)
        }

        Commands::Validate { theme, payload } => {
            let form = match parse_form(&payload) {
                Ok(f) => f,
                Err(e) => return fail(e),
            };
            let result = pipeline.record(&theme, &form)
                .and_then(|record| pipeline.validate_record(&theme, &record));
            match result {
                Ok(result) => {
                    for message in result.messages() {
                        warn!("{}", message);
                    }
                    let code = print_json(&result);
                    if result.valid { code } else { ExitCode::from(2) }
                }
                Err(e) => fail(e),
            }
        }

        Commands::Signature { theme, payload } => {
            let form = match parse_form(&payload) {
                Ok(f) => f,
                Err(e) => return fail(e),
            };
            match pipeline.record(&theme, &form)
                .and_then(|record| pipeline.render_signature(&theme, &record))
            {
                Ok(rendered) => print_json(&rendered),
                Err(e) => fail(e),
            }
        }

        Commands::Background { theme, payload, image, font, out } => {
            let form = match parse_form(&payload) {
                Ok(f) => f,
                Err(e) => return fail(e),
            };
            let result = resolve_background(&pipeline, &theme, image, font).and_then(|(bg, font)| {
                let record = pipeline.record(&theme, &form)?;
                pipeline.render_background(&theme, &record, &bg, font.as_ref())
            });
            match result {
                Ok(Some(file)) => {
                    let bytes = match file.decode_data() {
                        Ok(b) => b,
                        Err(e) => return fail(e),
                    };
                    match write_output(&out, &file.filename, &bytes) {
                        Ok(path) => {
                            info!("wrote {}", path.display());
                            print_json(&serde_json::json!({
                                "success": true,
                                "path": path,
                                "size": file.size,
                                "hash": file.hash,
                            }))
                        }
                        Err(e) => fail(e),
                    }
                }
                Ok(None) => fail("Background image not loaded"),
                Err(e) => fail(e),
            }
        }

        Commands::Copy { theme, payload, out, legacy } => {
            let form = match parse_form(&payload) {
                Ok(f) => f,
                Err(e) => return fail(e),
            };
            let rendered = match pipeline.record(&theme, &form)
                .and_then(|record| pipeline.render_signature(&theme, &record))
            {
                Ok(r) => r,
                Err(e) => return fail(e),
            };

            let mut sink = FileClipboardSink::new(out);
            let writer: Box<dyn ClipboardWriter> = if legacy {
                Box::new(LegacyClipboard)
            } else {
                select_writer(&sink)
            };
            let status = copy_signature(&rendered, &mut sink, writer.as_ref());
            let code = print_json(&status);
            if status.is_success() { code } else { ExitCode::from(2) }
        }

        Commands::Bundle { payload, image, font } => {
            let request: BundleRequest = match serde_json::from_str(&payload) {
                Ok(r) => r,
                Err(e) => return fail(format!("Invalid payload: {}", e)),
            };
            let (background, font) = if request.include_background {
                match resolve_background(&pipeline, &request.theme_id, image, font) {
                    Ok(pair) => pair,
                    Err(e) => return fail(e),
                }
            } else {
                (BackgroundImage::new(), None)
            };

            match pipeline.compile(&request, &background, font.as_ref()) {
                Ok(bundle) => {
                    let code = print_json(&serde_json::json!({ "success": true, "bundle": bundle }));
                    if bundle.validation.valid { code } else { ExitCode::from(2) }
                }
                Err(e) => fail(e),
            }
        }

        Commands::Watch { theme } => match watch(&pipeline, &theme) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(e),
        },
    }
}

/// Debounced preview loop over stdin.
fn watch(pipeline: &SignaturePipeline, theme: &str) -> Result<(), PipelineError> {
    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    let mut session = PreviewSession::new(pipeline, theme)?;
    let emit = |session: &PreviewSession| {
        let preview = session.preview();
        println!(
            "{}",
            serde_json::json!({
                "form": session.form(),
                "valid": preview.is_copyable(),
                "plain_text": preview.plain_text,
            })
        );
    };
    emit(&session);

    loop {
        let timeout = session
            .next_deadline()
            .map(|d| d.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_secs(3600));

        match rx.recv_timeout(timeout) {
            Ok(line) => {
                let Some((field, value)) = line.split_once('=') else {
                    warn!("ignoring line without '=': {:?}", line);
                    continue;
                };
                if let Err(e) = session.input(field.trim(), value, Instant::now()) {
                    warn!("{}", e);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if session.tick(Instant::now())? {
                    emit(&session);
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                if session.next_deadline().is_some() {
                    session.flush()?;
                    emit(&session);
                }
                return Ok(());
            }
        }
    }
}
