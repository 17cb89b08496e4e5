// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command implementations. Each prints a JSON report on stdout; logs go to
// stderr.

use std::path::Path;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use image::RgbaImage;
use ledgercam_bridge::{CameraDevice, StillImageCamera};
use ledgercam_capture::{
    CaptureMessage, CaptureSession, OverlayStyle, dispatch, render_overlay, upload_artifact,
};
use ledgercam_core::error::{LedgercamError, Result};
use ledgercam_core::types::CaptureTarget;
use ledgercam_core::{Corner, Quadrilateral};
use ledgercam_document::scan::{TextRegion, trim_to_regions};
use ledgercam_document::{
    CaptureFormat, Frame, QuadDetector, RectifyOutcome, Rectifier, encode,
};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::services::app_services::AppServices;

// -- Argument parsing ---------------------------------------------------------

/// Parse `x1,y1,x2,y2,x3,y3,x4,y4` into a quadrilateral. The points may come
/// in any order.
pub fn parse_corners(s: &str) -> std::result::Result<Quadrilateral, String> {
    let values: Vec<f32> = s
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|err| format!("invalid corner list {s:?}: {err}"))?;
    match values[..] {
        [x1, y1, x2, y2, x3, y3, x4, y4] => Ok(Quadrilateral::from_unordered([
            Corner::new(x1, y1),
            Corner::new(x2, y2),
            Corner::new(x3, y3),
            Corner::new(x4, y4),
        ])),
        _ => Err(format!("expected 8 numbers (4 x,y pairs), got {}", values.len())),
    }
}

// -- Image I/O ----------------------------------------------------------------

fn open_image(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path).map_err(|err| {
        LedgercamError::ImageError(format!("failed to open {}: {}", path.display(), err))
    })?;
    Ok(image.to_rgba8())
}

/// Write `image` as JPEG (`.jpg`/`.jpeg`) or PNG (anything else).
fn save_image(image: &RgbaImage, path: &Path, quality: u8) -> Result<()> {
    let is_jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
    let format = if is_jpeg {
        CaptureFormat::Jpeg
    } else {
        CaptureFormat::Png
    };
    let bytes = encode(image, format, quality)?;
    std::fs::write(path, bytes)?;
    info!(path = %path.display(), "Image written");
    Ok(())
}

fn print_report(report: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn detect_native(services: &AppServices, native: &RgbaImage) -> Option<Quadrilateral> {
    let sampled = Frame::sample(native, services.config().max_processing_dimension);
    services.detector().detect_sampled(&sampled)
}

// -- Commands -----------------------------------------------------------------

/// Find the document in a photo and report its corners.
pub fn detect(services: &AppServices, input: &Path, overlay: Option<&Path>) -> Result<()> {
    let native = open_image(input)?;
    let quad = detect_native(services, &native);
    if quad.is_none() {
        warn!(input = %input.display(), "No document found");
    }

    if let Some(path) = overlay {
        let drawn = render_overlay(&native, quad.as_ref(), None, &OverlayStyle::default());
        save_image(&drawn, path, services.config().jpeg_quality)?;
    }

    print_report(&json!({
        "input": input.display().to_string(),
        "width": native.width(),
        "height": native.height(),
        "corners": quad.map(|q| q.to_tuples()),
    }))
}

/// Rectify a photo using given corners, or detected ones when none are given.
pub fn rectify(
    services: &AppServices,
    input: &Path,
    output: &Path,
    corners: Option<Quadrilateral>,
) -> Result<()> {
    let native = open_image(input)?;
    let quad = corners.or_else(|| detect_native(services, &native));

    let config = services.config();
    let rectifier = Rectifier::new(config.min_output_dimension, config.enhance.clone());
    let rectified = rectifier.rectify(&native, quad.as_ref());
    save_image(&rectified.image, output, config.jpeg_quality)?;

    let (outcome, reason) = match &rectified.outcome {
        RectifyOutcome::Warped => ("warped", None),
        RectifyOutcome::NoQuadrilateral => ("no_quadrilateral", None),
        RectifyOutcome::Degenerate(reason) => ("degenerate", Some(reason.clone())),
    };
    print_report(&json!({
        "output": output.display().to_string(),
        "width": rectified.image.width(),
        "height": rectified.image.height(),
        "outcome": outcome,
        "reason": reason,
        "corners": quad.map(|q| q.to_tuples()),
    }))
}

/// Full capture: a photo stands in for the camera; the result is OCR'd,
/// handed off, and stored under its storage key.
pub async fn capture(
    services: &AppServices,
    input: &Path,
    target: CaptureTarget,
    user_id: u64,
    date: Option<NaiveDate>,
) -> Result<()> {
    let camera: Arc<dyn CameraDevice> = Arc::new(StillImageCamera::open(input)?);
    let mut session =
        CaptureSession::open_manual(camera, services.config().clone(), services.detector())?;

    if !session.detect_now().await? {
        warn!("No document found; capturing the raw frame");
    }
    let artifact = session.capture();
    session.close().await;
    let artifact = artifact?;

    let (tx, mut rx) = mpsc::unbounded_channel::<CaptureMessage>();
    dispatch(artifact, target, services.ocr(), &tx)?;
    drop(tx);
    let message = rx
        .recv()
        .await
        .ok_or_else(|| LedgercamError::HandoffError("no capture was delivered".into()))?;

    let date = date
        .or(message.extraction.date)
        .unwrap_or_else(|| Local::now().date_naive());
    let key = upload_artifact(services.uploader(), &message.artifact, message.target, date, user_id)?;

    print_report(&json!({
        "key": key.as_str(),
        "path": services.upload_root().join(key.as_str()).display().to_string(),
        "filename": message.artifact.filename,
        "mime_type": message.artifact.mime_type(),
        "sha256": message.artifact.sha256,
        "bytes": message.artifact.bytes.len(),
        "width": message.artifact.width,
        "height": message.artifact.height,
        "rectified": message.artifact.rectified,
        "extraction": message.extraction,
    }))
}

/// Crop an image to the given text regions.
pub fn trim(
    services: &AppServices,
    input: &Path,
    output: &Path,
    regions: &[TextRegion],
    margin: u32,
) -> Result<()> {
    let image = open_image(input)?;
    let trimmed = trim_to_regions(&image, regions, margin);
    save_image(&trimmed, output, services.config().jpeg_quality)?;
    print_report(&json!({
        "output": output.display().to_string(),
        "width": trimmed.width(),
        "height": trimmed.height(),
    }))
}

#[cfg(test)]
mod tests {
    use image::Rgba;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    use super::*;

    fn write_document(dir: &Path) -> std::path::PathBuf {
        let mut img = RgbaImage::from_pixel(640, 480, Rgba([25, 25, 25, 255]));
        draw_filled_rect_mut(&mut img, Rect::at(120, 90).of_size(400, 300), Rgba([240, 240, 240, 255]));
        let path = dir.join("photo.png");
        img.save(&path).expect("save");
        path
    }

    fn services(dir: &Path) -> AppServices {
        let config = dir.join("config.json");
        std::fs::write(&config, r#"{"min_output_dimension": 300}"#).expect("write config");
        AppServices::init(Some(&config), None, Some(dir.join("uploads"))).expect("services")
    }

    #[test]
    fn corners_parse_in_any_order() {
        let quad = parse_corners("100,80, 10,80, 10,10, 100,10").expect("parse");
        assert_eq!(quad.top_left(), Corner::new(10.0, 10.0));
        assert_eq!(quad.bottom_right(), Corner::new(100.0, 80.0));
        assert!(parse_corners("1,2,3").is_err());
        assert!(parse_corners("a,b,c,d,e,f,g,h").is_err());
    }

    #[test]
    fn rectify_with_explicit_corners_writes_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = write_document(dir.path());
        let output = dir.path().join("out.png");
        let quad = Quadrilateral::axis_aligned(120.0, 90.0, 520.0, 390.0);

        rectify(&services(dir.path()), &input, &output, Some(quad)).expect("rectify");
        let written = image::open(&output).expect("open output");
        assert_eq!((written.width(), written.height()), (400, 300));
    }

    #[test]
    fn trim_crops_to_region() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = write_document(dir.path());
        let output = dir.path().join("trimmed.png");
        let regions = [TextRegion::new(100, 100, 50, 40)];

        trim(&services(dir.path()), &input, &output, &regions, 10).expect("trim");
        let written = image::open(&output).expect("open output");
        assert_eq!((written.width(), written.height()), (70, 60));
    }

    #[tokio::test]
    async fn capture_stores_artifact_under_storage_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = write_document(dir.path());
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).expect("date");

        capture(&services(dir.path()), &input, CaptureTarget::Invoice, 7, Some(date))
            .await
            .expect("capture");

        let day = dir.path().join("uploads/invoices/2025/03/09");
        let stored: Vec<_> = std::fs::read_dir(&day).expect("read dir").collect();
        assert_eq!(stored.len(), 1);
        let name = stored[0].as_ref().expect("entry").file_name();
        let name = name.to_string_lossy();
        assert!(name.starts_with("user_7_") && name.ends_with(".jpg"));
    }
}
