//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use image::{Rgba, RgbaImage};
use sigforge::{
    compositor::{BackgroundImage, ComposeOutcome, CompositeError, Compositor, RasterSurface, Rect},
    hashing::canonical_json,
    surface::{load_font, ImageSurface},
    theme::{Theme, ThemeRegistry, BUILTIN_THEME_ID},
    render, BundleRequest, ContactRecord, FormState, SignaturePipeline,
};
use std::path::Path;

fn create_test_theme() -> Theme {
    let mut theme = Theme::builtin();
    theme.id = "test-theme".to_string();
    theme.organization = "Example Lab & Co".to_string();
    theme.validation.allowed_email_domain = None;
    theme.background.width = 320;
    theme.background.height = 180;
    theme.background.bar_x = 10;
    theme.background.bar_y = 10;
    theme.background.bar_width = 4;
    theme.background.bar_height = 40;
    theme.background.text_gap_x = 6;
    theme.background.large_font_px = 20.0;
    theme.background.small_font_px = 12.0;
    theme.background.line_gap = 4.0;
    theme
}

fn create_pipeline() -> SignaturePipeline {
    let mut registry = ThemeRegistry::new();
    registry.register(create_test_theme());
    SignaturePipeline::new(registry)
}

fn header_only() -> ContactRecord {
    ContactRecord {
        name: "Jane Smith".to_string(),
        title: "Physicist".to_string(),
        organization: "Example Lab & Co".to_string(),
        ..Default::default()
    }
}

fn full_record() -> ContactRecord {
    ContactRecord {
        pronouns: "she/her".to_string(),
        cell: "(609) 555-1234".to_string(),
        office: "(609) 243-2000".to_string(),
        email: "jsmith@example.org".to_string(),
        website: "example.org".to_string(),
        other: "Schedule a meeting".to_string(),
        ..header_only()
    }
}

fn positions(haystack: &str, needles: &[&str]) -> Vec<usize> {
    needles
        .iter()
        .map(|n| haystack.find(n).unwrap_or_else(|| panic!("{:?} missing", n)))
        .collect()
}

/// A bold-ish system font, when the machine has one.
fn system_font() -> Option<rusttype::Font<'static>> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
        "/Library/Fonts/Arial Bold.ttf",
    ]
    .iter()
    .map(Path::new)
    .filter(|p| p.exists())
    .find_map(|p| load_font(p).ok())
}

fn loaded_background() -> BackgroundImage {
    let mut bg = BackgroundImage::new();
    let mut image = RgbaImage::new(64, 36);
    for (x, y, p) in image.enumerate_pixels_mut() {
        *p = Rgba([(x * 4) as u8, (y * 7) as u8, 90, 255]);
    }
    bg.mark_loaded(image);
    bg
}

#[test]
fn invariant_header_only_without_optional_fields() {
    let pipeline = create_pipeline();
    let rendered = pipeline.render_signature("test-theme", &header_only()).unwrap();

    assert_eq!(rendered.html.matches("<tr>").count(), 4); // outer row + three header rows
    for label in ["Cell:", "Office:", "Pronouns:", "mailto:", "font-style: italic"] {
        assert!(!rendered.html.contains(label), "unexpected {}", label);
    }
    assert_eq!(rendered.plain_text, "Jane Smith\nPhysicist\nExample Lab & Co");
}

#[test]
fn invariant_single_mailto_link() {
    let pipeline = create_pipeline();
    let record = ContactRecord { email: "a&b@example.org".to_string(), ..header_only() };
    let rendered = pipeline.render_signature("test-theme", &record).unwrap();

    assert_eq!(rendered.html.matches("href=\"mailto:").count(), 1);
    assert!(rendered.html.contains(r#"href="mailto:a&amp;b@example.org""#));
    assert!(rendered.html.contains(">a&amp;b@example.org</a>"));
}

#[test]
fn invariant_website_scheme_normalized_for_href_only() {
    let pipeline = create_pipeline();
    let record = ContactRecord { website: "example.org".to_string(), ..header_only() };
    let rendered = pipeline.render_signature("test-theme", &record).unwrap();

    assert!(rendered.html.contains(r#"<a href="https://example.org""#));
    assert!(rendered.html.contains(">example.org</a>"));
    assert!(rendered.plain_text.ends_with("example.org"));
    assert!(!rendered.plain_text.contains("https://"));
}

#[test]
fn invariant_escaping_is_total() {
    let pipeline = create_pipeline();
    let hostile = "<script>alert(\"x\")</script> & more";
    let record = ContactRecord {
        name: hostile.to_string(),
        title: hostile.to_string(),
        pronouns: hostile.to_string(),
        cell: hostile.to_string(),
        office: hostile.to_string(),
        email: hostile.to_string(),
        website: hostile.to_string(),
        other: hostile.to_string(),
        ..header_only()
    };
    let rendered = pipeline.render_signature("test-theme", &record).unwrap();
    let clean = pipeline.render_signature("test-theme", &header_only()).unwrap();

    assert!(!rendered.html.contains("<script"));
    assert!(rendered.html.contains("&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; more"));
    // Only the template's own markup characters remain raw
    assert_eq!(rendered.html.matches('&').count() - rendered.html.matches("&lt;").count()
        - rendered.html.matches("&gt;").count() - rendered.html.matches("&quot;").count()
        - rendered.html.matches("&amp;").count(), 0);
    assert!(clean.html.contains("Example Lab &amp; Co"));
}

#[test]
fn invariant_optional_line_order() {
    let pipeline = create_pipeline();
    let rendered = pipeline.render_signature("test-theme", &full_record()).unwrap();

    let order = ["Cell: (609) 555-1234", "Office: (609) 243-2000", "Pronouns: she/her",
        "jsmith@example.org", ">example.org</a>", "Schedule a meeting"];
    let html_positions = positions(&rendered.html, &order);
    assert!(html_positions.windows(2).all(|w| w[0] < w[1]), "{:?}", html_positions);

    let text_order = ["Cell: (609) 555-1234", "Office: (609) 243-2000", "Pronouns: she/her",
        "jsmith@example.org", "\nexample.org", "\n\nSchedule a meeting"];
    let text_positions = positions(&rendered.plain_text, &text_order);
    assert!(text_positions.windows(2).all(|w| w[0] < w[1]), "{:?}", text_positions);
}

#[test]
fn invariant_pipeline_render_matches_direct_render() {
    let pipeline = create_pipeline();
    let theme = create_test_theme();
    let via_pipeline = pipeline.render_signature("test-theme", &full_record()).unwrap();
    let direct = render(&full_record(), &theme);

    assert_eq!(via_pipeline.html, direct.html);
    assert_eq!(via_pipeline.plain_text, direct.plain_text);
    assert_eq!(via_pipeline.validation.valid, direct.validation.valid);
    assert_eq!(via_pipeline.validation.theme_id, "test-theme");
}

#[test]
fn invariant_website_link_target_is_always_http() {
    let pipeline = create_pipeline();
    for website in ["javascript:alert(document.cookie)", "data:text/html,x"] {
        let record = ContactRecord { website: website.to_string(), ..header_only() };
        let rendered = pipeline.render_signature("test-theme", &record).unwrap();
        assert!(!rendered.html.contains(&format!("href=\"{}", website.split(':').next().unwrap())));
        assert!(rendered.html.contains("<a href=\"https://"));
    }
}

#[test]
fn invariant_missing_required_blocks_copy_not_preview() {
    let pipeline = create_pipeline();
    let record = ContactRecord { name: String::new(), ..full_record() };
    let rendered = pipeline.render_signature("test-theme", &record).unwrap();

    assert!(rendered.html.contains("Your Name"));
    assert!(!rendered.validation.valid);
    assert!(!rendered.is_copyable());
}

#[test]
fn invariant_compose_before_load_is_noop() {
    let theme = create_test_theme();
    let compositor = Compositor::from_theme(&theme).unwrap();
    let mut surface = ImageSurface::new(320, 180);
    surface.fill_rect(Rect { x: 0, y: 0, width: 320, height: 180 }, Rgba([7, 8, 9, 255]));
    let before = surface.pixels().clone();

    let outcome = compositor
        .compose(&mut surface, &BackgroundImage::new(), "Jane Smith", "she/her")
        .unwrap();

    assert_eq!(outcome, ComposeOutcome::Skipped);
    assert_eq!(surface.pixels(), &before);
}

#[test]
fn invariant_compose_is_idempotent() {
    let theme = create_test_theme();
    let compositor = Compositor::from_theme(&theme).unwrap();
    let background = loaded_background();

    let render = |name: &str, font: Option<rusttype::Font<'static>>| {
        let mut surface = ImageSurface::new(320, 180);
        if let Some(font) = font {
            surface = surface.with_font(font);
        }
        compositor.compose(&mut surface, &background, name, "").unwrap();
        surface.into_image()
    };

    assert_eq!(render("", None), render("", None));

    match system_font() {
        Some(font) => {
            let a = render("Jane Smith", Some(font.clone()));
            let b = render("Jane Smith", Some(font));
            assert_eq!(a, b);
            // accent bar is drawn over the background
            assert_eq!(*a.get_pixel(11, 11), Rgba([0xf5, 0x80, 0x25, 255]));
        }
        None => eprintln!("no system font found; skipping text rasterization check"),
    }
}

#[test]
fn invariant_accent_bar_drawn_before_text() {
    let theme = create_test_theme();
    let compositor = Compositor::from_theme(&theme).unwrap();
    let background = loaded_background();

    let mut a = ImageSurface::new(320, 180);
    let mut b = ImageSurface::new(320, 180);
    let first = compositor.compose(&mut a, &background, "Jane Smith", "she/her");
    let second = compositor.compose(&mut b, &background, "Jane Smith", "she/her");

    // No font on the surface: the text step fails, the bar is already down
    assert!(matches!(first, Err(CompositeError::FontMissing)));
    assert!(matches!(second, Err(CompositeError::FontMissing)));
    assert_eq!(*a.pixels().get_pixel(11, 11), Rgba([0xf5, 0x80, 0x25, 255]));
    assert_eq!(*a.pixels().get_pixel(13, 49), Rgba([0xf5, 0x80, 0x25, 255]));
    assert_ne!(*a.pixels().get_pixel(14, 11), Rgba([0xf5, 0x80, 0x25, 255]));
    assert_eq!(a.pixels(), b.pixels());
}

#[test]
fn invariant_background_fills_canvas_and_bar_needs_name() {
    let theme = create_test_theme();
    let compositor = Compositor::from_theme(&theme).unwrap();
    let mut surface = ImageSurface::new(320, 180);

    let outcome = compositor.compose(&mut surface, &loaded_background(), "", "").unwrap();
    assert_eq!(outcome, ComposeOutcome::BackgroundOnly);
    assert_eq!(surface.width(), 320);
    assert!(surface.pixels().pixels().all(|p| p[3] >= 254));
    assert_ne!(*surface.pixels().get_pixel(11, 11), Rgba([0xf5, 0x80, 0x25, 255]));
}

#[test]
fn invariant_job_hash_stable() {
    let pipeline = create_pipeline();
    let mut form = FormState::new();
    form.set("name", "Jane Smith").unwrap();
    form.set("title", "Physicist").unwrap();

    let request = BundleRequest {
        theme_id: "test-theme".to_string(),
        form,
        include_background: false,
    };

    let bundle1 = pipeline.compile(&request, &BackgroundImage::new(), None).unwrap();
    let bundle2 = pipeline.compile(&request, &BackgroundImage::new(), None).unwrap();

    assert_eq!(bundle1.job_hash, bundle2.job_hash);
    assert_eq!(bundle1.html, bundle2.html);
    assert_ne!(bundle1.id, bundle2.id);
    assert!(!bundle1.manifest_hash.is_empty());
    assert_eq!(bundle1.record.organization, "Example Lab & Co");
}

#[test]
fn invariant_bundle_includes_background_when_loaded() {
    let pipeline = create_pipeline();
    let request = BundleRequest {
        theme_id: "test-theme".to_string(),
        form: FormState::new(),
        include_background: true,
    };

    let skipped = pipeline.compile(&request, &BackgroundImage::new(), None).unwrap();
    assert!(skipped.background.is_none());

    let bundle = pipeline.compile(&request, &loaded_background(), None).unwrap();
    let file = bundle.background.unwrap();
    assert_eq!(file.size, [320, 180]);
    let decoded = image::load_from_memory(&file.decode_data().unwrap()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (320, 180));
}

#[test]
fn invariant_canonical_json_deterministic() {
    use serde_json::json;

    let obj1 = json!({"z": 1, "a": 2, "m": {"b": 1, "a": 2}});
    let obj2 = json!({"a": 2, "m": {"a": 2, "b": 1}, "z": 1});

    assert_eq!(canonical_json(&obj1).unwrap(), canonical_json(&obj2).unwrap());
}

#[test]
fn invariant_theme_not_found_error() {
    let pipeline = create_pipeline();
    let result = pipeline.render_signature("nonexistent", &header_only());
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Theme not found"));
}

#[test]
fn invariant_builtin_theme_always_available() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ThemeRegistry::load_from_dir(&dir.path().join("missing")).unwrap();
    let pipeline = SignaturePipeline::new(registry);
    assert!(pipeline.get_theme(BUILTIN_THEME_ID).is_some());
}

#[cfg(feature = "test-hooks")]
#[test]
fn invariant_render_calls_validate() {
    use sigforge::pipeline::{get_validation_call_count, reset_validation_call_count};

    let pipeline = create_pipeline();
    reset_validation_call_count();
    pipeline.render_signature("test-theme", &header_only()).unwrap();
    assert_eq!(get_validation_call_count(), 1);
}
