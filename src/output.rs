//! Output assembler: crops captured screenshots and lays them out for print.
//!
//! Screenshots are taken in device pixels. A slide's crop rectangle is either
//! already in device pixels (auto-capture) or in CSS pixels (manual
//! selection); the slide's `coordinates_already_device_scaled` flag says
//! which, and nothing is inferred from image sizes.

use std::io::Cursor;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView};
use thiserror::Error;

use crate::geometry::Rect;
use crate::session::Slide;

/// JPEG quality of cropped slides.
pub const CROP_JPEG_QUALITY: u8 = 95;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("not a base64 data URL")]
    InvalidDataUrl,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("crop rectangle {0:?} lies outside the {1}x{2} screenshot")]
    EmptyCrop(Rect, u32, u32),
}

/// How one screenshot is cut down to its slide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropPlan {
    /// Area of the screenshot, in device pixels.
    pub source: Rect,
    /// Size of the cropped image, in CSS pixels.
    pub output_width: u32,
    pub output_height: u32,
}

/// Plan the crop of `slide` for a display with `device_pixel_ratio`.
///
/// `None` when the slide has no usable crop rectangle; such slides are
/// printed uncropped.
#[must_use]
pub fn crop_plan(slide: &Slide, device_pixel_ratio: f64) -> Option<CropPlan> {
    let rect = slide.crop_rectangle.filter(|r| !r.is_empty())?;
    let ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };

    let (source, css) = if slide.coordinates_already_device_scaled {
        (rect, rect.scaled(1.0 / ratio))
    } else {
        (rect.scaled(ratio), rect)
    };

    Some(CropPlan {
        source,
        output_width: (css.width.round() as u32).max(1),
        output_height: (css.height.round() as u32).max(1),
    })
}

/// Crop `slide`'s screenshot, returning a JPEG data URL.
///
/// Any failure falls back to the original screenshot.
#[must_use]
pub fn crop_slide(slide: &Slide, device_pixel_ratio: f64) -> String {
    let Some(plan) = crop_plan(slide, device_pixel_ratio) else {
        return slide.image.clone();
    };
    match apply_crop(&slide.image, &plan) {
        Ok(cropped) => cropped,
        Err(e) => {
            tracing::warn!("Keeping uncropped slide: {}", e);
            slide.image.clone()
        }
    }
}

fn apply_crop(data_url: &str, plan: &CropPlan) -> Result<String, OutputError> {
    let bytes = decode_data_url(data_url)?;
    let screenshot = image::load_from_memory(&bytes)?;
    let (width, height) = screenshot.dimensions();

    let source = plan.source;
    let x0 = source.x.max(0.0).floor() as u32;
    let y0 = source.y.max(0.0).floor() as u32;
    let x1 = (source.right().round().max(0.0) as u32).min(width);
    let y1 = (source.bottom().round().max(0.0) as u32).min(height);
    if x1 <= x0 || y1 <= y0 {
        return Err(OutputError::EmptyCrop(source, width, height));
    }

    let region = screenshot.crop_imm(x0, y0, x1 - x0, y1 - y0);
    let (width, height) = (plan.output_width, plan.output_height);
    let scale_x = f64::from(width) / source.width;
    let scale_y = f64::from(height) / source.height;
    let placed_width = ((f64::from(x1 - x0) * scale_x).round() as u32).clamp(1, width);
    let placed_height = ((f64::from(y1 - y0) * scale_y).round() as u32).clamp(1, height);
    let placed = if region.dimensions() == (placed_width, placed_height) {
        region
    } else {
        region.resize_exact(placed_width, placed_height, FilterType::Triangle)
    };
    if (placed_width, placed_height) == (width, height) {
        return encode_jpeg(&placed);
    }

    // Part of the rectangle lies off the screenshot: that part stays blank.
    let left = ((f64::from(x0) - source.x) * scale_x).round().max(0.0) as i64;
    let top = ((f64::from(y0) - source.y) * scale_y).round().max(0.0) as i64;
    let mut slide = DynamicImage::new_rgb8(width, height);
    imageops::overlay(&mut slide, &placed, left, top);
    encode_jpeg(&slide)
}

fn encode_jpeg(img: &DynamicImage) -> Result<String, OutputError> {
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, CROP_JPEG_QUALITY).encode_image(&img.to_rgb8())?;
    let payload = base64::engine::general_purpose::STANDARD.encode(buffer.into_inner());
    Ok(format!("data:image/jpeg;base64,{payload}"))
}

/// Bytes carried by a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, OutputError> {
    let (header, payload) = data_url.split_once(',').ok_or(OutputError::InvalidDataUrl)?;
    if !header.starts_with("data:") || !header.ends_with(";base64") {
        return Err(OutputError::InvalidDataUrl);
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
}

/// Printable HTML document: one full-width image per slide, printed as soon
/// as every image has loaded.
#[must_use]
pub fn render_document(slides: &[Slide], device_pixel_ratio: f64) -> String {
    let mut html = String::from(DOCUMENT_HEAD);
    for slide in slides {
        let src = crop_slide(slide, device_pixel_ratio);
        html.push_str("<img src=\"");
        html.push_str(&escape_attribute(&src));
        html.push_str("\" style=\"width: 100%\">\n");
    }
    html.push_str(DOCUMENT_TAIL);
    tracing::debug!("Rendered {} slide(s)", slides.len());
    html
}

const DOCUMENT_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>SlidePrint</title>
<style>
  body { margin: 0; }
  #output img { display: block; page-break-after: always; }
</style>
</head>
<body>
<div id="output">
"#;

const DOCUMENT_TAIL: &str = r"</div>
<script>
  (function () {
    var imgs = document.images;
    var loaded = 0;
    function onLoad() {
      loaded++;
      if (loaded === imgs.length) window.print();
    }
    for (var i = 0; i < imgs.length; i++) {
      if (imgs[i].complete) onLoad();
      else imgs[i].addEventListener('load', onLoad, false);
    }
  })();
</script>
</body>
</html>
";

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

#[cfg(test)]
mod tests {
    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;

    /// 40x20 PNG: left half red, right half blue.
    fn screenshot() -> String {
        let img = RgbImage::from_fn(40, 20, |x, _| {
            if x < 20 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        let payload = base64::engine::general_purpose::STANDARD.encode(buffer.into_inner());
        format!("data:image/png;base64,{payload}")
    }

    fn slide(rect: Option<Rect>, device_scaled: bool) -> Slide {
        Slide {
            image: screenshot(),
            crop_rectangle: rect,
            coordinates_already_device_scaled: device_scaled,
        }
    }

    fn decoded(data_url: &str) -> DynamicImage {
        image::load_from_memory(&decode_data_url(data_url).unwrap()).unwrap()
    }

    #[test]
    fn plan_for_device_scaled_rect() {
        let plan = crop_plan(&slide(Some(Rect::new(20.0, 0.0, 20.0, 20.0)), true), 2.0).unwrap();
        assert_eq!(plan.source, Rect::new(20.0, 0.0, 20.0, 20.0));
        assert_eq!((plan.output_width, plan.output_height), (10, 10));
    }

    #[test]
    fn plan_for_css_rect() {
        let plan = crop_plan(&slide(Some(Rect::new(10.0, 0.0, 10.0, 10.0)), false), 2.0).unwrap();
        assert_eq!(plan.source, Rect::new(20.0, 0.0, 20.0, 20.0));
        assert_eq!((plan.output_width, plan.output_height), (10, 10));
    }

    #[test]
    fn no_plan_without_rect() {
        assert_eq!(crop_plan(&slide(None, true), 2.0), None);
        assert_eq!(
            crop_plan(&slide(Some(Rect::new(0.0, 0.0, 0.0, 5.0)), true), 2.0),
            None
        );
    }

    #[test]
    fn bogus_ratio_is_treated_as_one() {
        let plan = crop_plan(&slide(Some(Rect::new(0.0, 0.0, 8.0, 4.0)), false), 0.0).unwrap();
        assert_eq!(plan.source, Rect::new(0.0, 0.0, 8.0, 4.0));
    }

    #[test]
    fn crops_to_right_half() {
        let cropped = crop_slide(&slide(Some(Rect::new(20.0, 0.0, 20.0, 20.0)), true), 1.0);
        assert!(cropped.starts_with("data:image/jpeg;base64,"));

        let img = decoded(&cropped);
        assert_eq!(img.dimensions(), (20, 20));
        let Rgb([r, _, b]) = img.to_rgb8().get_pixel(10, 10).to_owned();
        assert!(b > 200 && r < 60, "expected blue, got r={r} b={b}");
    }

    #[test]
    fn crop_scales_down_to_css_size() {
        let cropped = crop_slide(&slide(Some(Rect::new(0.0, 0.0, 40.0, 20.0)), true), 2.0);
        assert_eq!(decoded(&cropped).dimensions(), (20, 10));
    }

    fn is_blue(img: &DynamicImage, x: u32, y: u32) -> bool {
        let Rgb([r, g, b]) = img.to_rgb8().get_pixel(x, y).to_owned();
        b > 200 && r < 60 && g < 60
    }

    fn is_red(img: &DynamicImage, x: u32, y: u32) -> bool {
        let Rgb([r, g, b]) = img.to_rgb8().get_pixel(x, y).to_owned();
        r > 200 && g < 60 && b < 60
    }

    fn is_blank(img: &DynamicImage, x: u32, y: u32) -> bool {
        let Rgb([r, g, b]) = img.to_rgb8().get_pixel(x, y).to_owned();
        r < 40 && g < 40 && b < 40
    }

    #[test]
    fn crop_is_clamped_to_screenshot() {
        // Only x 30..40 exists; the other 40 px of the slide stay blank.
        let cropped = crop_slide(&slide(Some(Rect::new(30.0, 0.0, 50.0, 20.0)), true), 1.0);
        let img = decoded(&cropped);
        assert_eq!(img.dimensions(), (50, 20));
        assert!(is_blue(&img, 5, 10));
        assert!(is_blank(&img, 25, 10));
        assert!(is_blank(&img, 45, 10));
    }

    #[test]
    fn crop_left_of_screenshot_keeps_offset() {
        let cropped = crop_slide(&slide(Some(Rect::new(-10.0, 0.0, 30.0, 20.0)), true), 1.0);
        let img = decoded(&cropped);
        assert_eq!(img.dimensions(), (30, 20));
        assert!(is_blank(&img, 3, 10));
        assert!(is_red(&img, 20, 10));
    }

    #[test]
    fn clamped_crop_scales_with_the_slide() {
        // CSS rect 10..30 at ratio 2 is device 20..60; only 20..40 exists.
        let cropped = crop_slide(&slide(Some(Rect::new(10.0, 0.0, 20.0, 10.0)), false), 2.0);
        let img = decoded(&cropped);
        assert_eq!(img.dimensions(), (20, 10));
        assert!(is_blue(&img, 3, 5));
        assert!(is_blank(&img, 16, 5));
    }

    #[test]
    fn rect_outside_screenshot_keeps_original() {
        let original = slide(Some(Rect::new(100.0, 100.0, 10.0, 10.0)), true);
        assert_eq!(crop_slide(&original, 1.0), original.image);
    }

    #[test]
    fn undecodable_image_keeps_original() {
        let broken = Slide {
            image: "data:image/jpeg;base64,shot1".into(),
            crop_rectangle: Some(Rect::new(0.0, 0.0, 5.0, 5.0)),
            coordinates_already_device_scaled: true,
        };
        assert_eq!(crop_slide(&broken, 1.0), broken.image);
    }

    #[test]
    fn data_url_parsing() {
        assert_eq!(decode_data_url("data:text/plain;base64,aGk=").unwrap(), b"hi");
        assert!(matches!(
            decode_data_url("https://example.com/a.png"),
            Err(OutputError::InvalidDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:text/plain,hi"),
            Err(OutputError::InvalidDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:text/plain;base64,!!"),
            Err(OutputError::Base64(_))
        ));
    }

    #[test]
    fn document_has_one_image_per_slide() {
        let slides = vec![slide(None, false), slide(None, false), slide(None, false)];
        let html = render_document(&slides, 1.0);
        assert_eq!(html.matches("<img ").count(), 3);
        assert!(html.contains("window.print()"));
        assert!(html.contains("style=\"width: 100%\""));
    }

    #[test]
    fn empty_document_is_valid() {
        let html = render_document(&[], 1.0);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(!html.contains("<img "));
    }

    #[test]
    fn attribute_escaping() {
        assert_eq!(escape_attribute(r#"a"b&c<"#), "a&quot;b&amp;c&lt;");
    }
}
