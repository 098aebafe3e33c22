//! artwork-recolor: Brand recoloring for vector logos and icons
//!
//! This crate retints SVG artwork with a brand color for light and dark
//! themes and renders raster previews of the result.
//!
//! The color engine works in Hue/Whiteness/Blackness: each fill keeps its own
//! whiteness and blackness (averaged with the brand's) while taking the
//! brand's hue. On a dark background the fill's levels are inverted first.
//!
//! # Example
//!
//! ```
//! use artwork_recolor::{Background, Color, Document, Recolorer};
//!
//! let mut doc = Document::parse(
//!     r##"<svg xmlns="http://www.w3.org/2000/svg"><path class="v_letters" fill="#ff0000"/></svg>"##,
//! ).unwrap();
//!
//! let brand = Color::parse("#333").unwrap();
//! let recolorer = Recolorer::new(brand, Some(Background::Level(255)), ["caret"]);
//! recolorer.apply(&mut doc).unwrap();
//!
//! let svg = doc.to_svg_string();
//! assert!(!svg.contains("#ff0000"));
//! ```
//!
//! # Batch Builds
//!
//! For whole projects, describe jobs with a [`BuildManifest`] (or use
//! [`BuildManifest::standard`]) and run them with [`run_manifest`]:
//!
//! ```no_run
//! use std::path::Path;
//! use artwork_recolor::{run_manifest, BuildLayout, BuildManifest};
//!
//! let manifest = BuildManifest::standard(&BuildLayout::under(Path::new(".")));
//! run_manifest(&manifest).unwrap();
//! ```

mod batch;
mod clean;
mod color;
mod document;
mod error;
mod export;
mod profile;
mod recolor;

pub use batch::{
    assemble_splash, is_stale, run_job, run_manifest, touch, write_splash_gif, BuildLayout,
    DEFAULT_BRAND, PREVIEW_COLORS, PREVIEW_HEIGHT,
};
pub use clean::{clean_dir, clean_document, clean_element, clean_file, strip_export_suffix};
pub use color::{Color, ColorError, Hwb, DARK_LUMA_THRESHOLD};
pub use document::{Document, DocumentError, Element, Node, ViewBox};
pub use error::{Error, Result};
pub use export::{
    flatten_on_white, render_document, render_svg, save, ExportError, OutputFormat, RasterOptions,
};
pub use profile::{BackgroundSetting, BuildJob, BuildManifest, RecolorProfile};
pub use recolor::{
    hide_name, normalize_hide_name, Action, Background, RecolorStats, Recolorer, BACKGROUND_CLASS,
};
