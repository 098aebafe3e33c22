//! Output writers: SVG markup and raster images via resvg.
//!
//! The output format is picked from the file extension. Raster output is
//! rendered with resvg and saved through the `image` crate.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use log::{debug, info};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::Document;

/// Errors produced while writing a document.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No writer exists for the requested output kind.
    #[error("no writer for file extension: {0}")]
    UnsupportedFormat(String),

    #[error("failed to render SVG: {0}")]
    Render(#[from] resvg::usvg::Error),

    #[error("cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

// ============================================================================
// OutputFormat
// ============================================================================

/// A supported output kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Serialized SVG markup.
    Svg,
    /// Rasterized PNG.
    Png,
}

impl OutputFormat {
    /// Picks the format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            _ => Err(ExportError::UnsupportedFormat(ext)),
        }
    }
}

// ============================================================================
// RasterOptions
// ============================================================================

/// Sizing for raster output.
///
/// `width` and `height` are mutually exclusive targets (0 means unset); the
/// other dimension follows the artwork's aspect ratio. Without either, the
/// intrinsic size is multiplied by `scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterOptions {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default = "default_scale")]
    pub scale: f32,
}

fn default_scale() -> f32 {
    1.0
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            scale: default_scale(),
        }
    }
}

impl RasterOptions {
    /// Fits the output to a target width.
    pub fn with_width(width: u32) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    /// Fits the output to a target height.
    pub fn with_height(height: u32) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }

    /// Returns the scale factor and output pixel size for artwork of the given size.
    pub fn resolve(&self, art_width: f32, art_height: f32) -> (f32, u32, u32) {
        let scale = if self.width > 0 && art_width > 0.0 {
            self.width as f32 / art_width
        } else if self.height > 0 && art_height > 0.0 {
            self.height as f32 / art_height
        } else {
            self.scale
        };
        let width = (art_width * scale).round() as u32;
        let height = (art_height * scale).round() as u32;
        (scale, width, height)
    }
}

// ============================================================================
// Writing
// ============================================================================

/// Writes a document to `path`, choosing the writer from the extension.
///
/// Parent directories are created as needed.
pub fn save(doc: &Document, path: &Path, options: &RasterOptions) -> Result<(), ExportError> {
    let format = OutputFormat::from_path(path)?;
    info!("Writing: {}", path.display());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    match format {
        OutputFormat::Svg => fs::write(path, doc.to_svg_string()).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        }),
        OutputFormat::Png => {
            let image = render_document(doc, options)?;
            image.save(path)?;
            Ok(())
        }
    }
}

/// Rasterizes a document to an RGBA image.
///
/// The output size follows the root `viewBox` when there is one, otherwise
/// the document's intrinsic size.
pub fn render_document(doc: &Document, options: &RasterOptions) -> Result<RgbaImage, ExportError> {
    let tree = Tree::from_str(&doc.to_svg_string(), &Options::default())?;
    let art_size = doc
        .view_box()
        .filter(|vb| vb.width > 0.0 && vb.height > 0.0)
        .map(|vb| (vb.width as f32, vb.height as f32));
    rasterize(&tree, art_size, options)
}

/// Rasterizes SVG markup to an RGBA image at its intrinsic size.
pub fn render_svg(svg_data: &str, options: &RasterOptions) -> Result<RgbaImage, ExportError> {
    let tree = Tree::from_str(svg_data, &Options::default())?;
    rasterize(&tree, None, options)
}

fn rasterize(
    tree: &Tree,
    art_size: Option<(f32, f32)>,
    options: &RasterOptions,
) -> Result<RgbaImage, ExportError> {
    let size = tree.size();
    let (art_width, art_height) = art_size.unwrap_or((size.width(), size.height()));
    let (scale, width, height) = options.resolve(art_width, art_height);
    debug!("Rendering {}x{} at scale {}", width, height, scale);

    let mut pixmap = Pixmap::new(width, height).ok_or(ExportError::Canvas { width, height })?;
    // Maps the tree's intrinsic size onto the canvas.
    let transform = Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(tree, transform, &mut pixmap.as_mut());

    Ok(pixmap_to_rgba_image(&pixmap))
}

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    RgbaImage::from_fn(pixmap.width(), pixmap.height(), |x, y| {
        let Some(pixel) = pixmap.pixel(x, y) else {
            return Rgba([0, 0, 0, 0]);
        };
        // tiny_skia stores premultiplied alpha.
        unpremultiply(pixel.red(), pixel.green(), pixel.blue(), pixel.alpha())
    })
}

fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> Rgba<u8> {
    if a == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    let a_f = a as f32 / 255.0;
    let channel = |c: u8| (c as f32 / a_f).round().min(255.0) as u8;
    Rgba([channel(r), channel(g), channel(b), a])
}

// ============================================================================
// Compositing
// ============================================================================

/// Composites an image over an opaque white backdrop.
pub fn flatten_on_white(image: &RgbaImage) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        alpha_blend(*image.get_pixel(x, y), Rgba([255, 255, 255, 255]))
    })
}

/// Alpha blends two RGBA pixels (source over destination).
fn alpha_blend(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;

    let out_a = sa + da * (1.0 - sa);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        let sf = s as f32 / 255.0;
        let df = d as f32 / 255.0;
        let out = (sf * sa + df * da * (1.0 - sa)) / out_a;
        (out * 255.0).round() as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 40 20"><rect width="20" height="20" fill="#ff0000"/></svg>"##;

    #[test]
    fn format_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a/logo.svg")).unwrap(), OutputFormat::Svg);
        assert_eq!(OutputFormat::from_path(Path::new("logo.PNG")).unwrap(), OutputFormat::Png);
        assert!(matches!(
            OutputFormat::from_path(Path::new("logo.pdf")),
            Err(ExportError::UnsupportedFormat(ext)) if ext == "pdf"
        ));
        assert!(matches!(
            OutputFormat::from_path(Path::new("logo")),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn raster_sizing() {
        assert_eq!(RasterOptions::default().resolve(40.0, 20.0), (1.0, 40, 20));
        assert_eq!(RasterOptions::with_height(80).resolve(40.0, 20.0), (4.0, 160, 80));
        assert_eq!(RasterOptions::with_width(20).resolve(40.0, 20.0), (0.5, 20, 10));

        let scaled = RasterOptions {
            scale: 2.0,
            ..RasterOptions::default()
        };
        assert_eq!(scaled.resolve(40.0, 20.0), (2.0, 80, 40));
    }

    #[test]
    fn render_follows_requested_height() {
        let img = render_svg(SQUARE, &RasterOptions::with_height(10)).unwrap();
        assert_eq!((img.width(), img.height()), (20, 10));

        // Left half is the red square, right half is transparent.
        assert_eq!(img.get_pixel(2, 5).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(17, 5)[3], 0);
    }

    #[test]
    fn document_size_follows_view_box() {
        let sized = r##"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="200" viewBox="0 0 40 20"><rect width="20" height="20" fill="#ff0000"/></svg>"##;
        let doc = Document::parse(sized).unwrap();

        let img = render_document(&doc, &RasterOptions::default()).unwrap();
        assert_eq!((img.width(), img.height()), (40, 20));
        assert_eq!(img.get_pixel(5, 10).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(35, 10)[3], 0);

        let img = render_document(&doc, &RasterOptions::with_height(80)).unwrap();
        assert_eq!((img.width(), img.height()), (160, 80));

        let intrinsic = render_svg(sized, &RasterOptions::default()).unwrap();
        assert_eq!((intrinsic.width(), intrinsic.height()), (400, 200));
    }

    #[test]
    fn render_rejects_bad_markup() {
        assert!(matches!(
            render_svg("<svg", &RasterOptions::default()),
            Err(ExportError::Render(_))
        ));
    }

    #[test]
    fn flatten_fills_transparency_with_white() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        let flat = flatten_on_white(&img);
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(flat.get_pixel(1, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn flatten_blends_partial_alpha() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let pixel = flatten_on_white(&img).get_pixel(0, 0).0;
        assert_eq!(pixel[3], 255);
        assert!(pixel[0] > 100 && pixel[0] < 155);
    }

    #[test]
    fn save_writes_svg_and_png() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::parse(SQUARE).unwrap();

        let svg_path = dir.path().join("out/logo.svg");
        save(&doc, &svg_path, &RasterOptions::default()).unwrap();
        assert_eq!(fs::read_to_string(&svg_path).unwrap(), doc.to_svg_string());

        let png_path = dir.path().join("out/logo.png");
        save(&doc, &png_path, &RasterOptions::with_width(80)).unwrap();
        let png = image::open(&png_path).unwrap();
        assert_eq!((png.width(), png.height()), (80, 40));
    }

    #[test]
    fn save_rejects_unknown_formats() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::parse(SQUARE).unwrap();
        let err = save(&doc, &dir.path().join("logo.ps"), &RasterOptions::default()).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat(_)));
    }
}
