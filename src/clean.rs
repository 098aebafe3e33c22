//! Normalizes source artwork exported from design tools.
//!
//! Layer names become stable hooks for the recolorer: drawable elements get a
//! `v_<name>` class, gradients get an `e_<name>` id, and fill references are
//! rewritten to point at the normalized gradient ids.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use walkdir::WalkDir;

use crate::document::{Document, Element, Node};
use crate::error::{Error, Result};

/// Attributes removed from the root `<svg>` element.
pub const ROOT_STRIP_ATTRS: &[&str] = &["x", "y", "width", "height", "enable-background", "xml:space"];

/// Strips the `_<digits>_` suffix design tools append to duplicate layer names.
///
/// `shine_2_` becomes `shine`; names without the suffix are returned unchanged.
pub fn strip_export_suffix(name: &str) -> &str {
    let Some(body) = name.strip_suffix('_') else {
        return name;
    };
    let without_digits = body.trim_end_matches(|c: char| c.is_ascii_digit());
    if without_digits.len() == body.len() {
        return name;
    }
    match without_digits.strip_suffix('_') {
        Some(stem) if !stem.is_empty() => stem,
        _ => name,
    }
}

fn is_gradient(element: &Element) -> bool {
    matches!(element.local_name(), "linearGradient" | "radialGradient")
}

/// Normalizes a single element's identity, fill reference and placement.
///
/// Attributes named in `strip_attrs` are removed afterwards.
pub fn clean_element(element: &mut Element, strip_attrs: &[&str]) {
    let identity = element
        .attr("data-name")
        .or_else(|| element.attr("id"))
        .map(|name| strip_export_suffix(name).to_lowercase());

    if let Some(identity) = identity {
        if is_gradient(element) {
            element.set_attr("id", format!("e_{}", identity));
        } else {
            element.set_attr("class", format!("v_{}", identity));
            element.remove_attr("id");
        }
        element.remove_attr("data-name");
    }

    if let Some(target) = element.fill().and_then(fill_reference) {
        let target = strip_export_suffix(target).to_lowercase();
        element.set_attr("fill", format!("url(#e_{})", target));
    }

    for attr in ["x", "y"] {
        if element.attr(attr) == Some("0") {
            element.remove_attr(attr);
        }
    }

    for attr in strip_attrs {
        element.remove_attr(attr);
    }
}

/// Returns the id inside `url(#...)`, if the fill is a reference.
fn fill_reference(fill: &str) -> Option<&str> {
    let start = fill.find("url(#")? + "url(#".len();
    let rest = &fill[start..];
    let end = rest.find(')')?;
    Some(&rest[..end]).filter(|id| !id.is_empty())
}

/// Cleans a whole document: the root, then every descendant carrying an `id`.
pub fn clean_document(doc: &mut Document) {
    let root = doc.root_mut();
    clean_element(root, ROOT_STRIP_ATTRS);
    for node in root.children_mut() {
        if let Node::Element(child) = node {
            clean_identified(child);
        }
    }
}

fn clean_identified(element: &mut Element) {
    if element.has_attr("id") {
        clean_element(element, &[]);
    }
    for node in element.children_mut() {
        if let Node::Element(child) = node {
            clean_identified(child);
        }
    }
}

/// Cleans an SVG file in place.
pub fn clean_file(path: &Path) -> Result<()> {
    info!("Cleaning: {}", path.display());
    let mut doc = Document::open(path)?;
    clean_document(&mut doc);
    fs::write(path, doc.to_svg_string()).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Cleans every `.svg` file under `dir`, returning the cleaned paths.
pub fn clean_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut cleaned = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "svg") {
            clean_file(path)?;
            cleaned.push(path.to_path_buf());
        }
    }
    Ok(cleaned)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORTED: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" x="0" y="0" width="200" height="100" viewBox="0 0 200 100" enable-background="new 0 0 200 100" xml:space="preserve">
  <linearGradient id="Shine_3_" x1="0" y1="0"><stop offset="0" stop-color="#fff"/></linearGradient>
  <g id="Caret" data-name="Caret_12_">
    <rect id="Background" x="0" y="5" fill="#FFFFFF" width="10" height="10"/>
    <path id="Letters" fill="url(#Shine_3_)" d="M0 0h1z"/>
  </g>
  <path fill="url(#Other_1_)" d="M0 0h1z"/>
</svg>"##;

    #[test]
    fn export_suffix_stripping() {
        assert_eq!(strip_export_suffix("Shine_3_"), "Shine");
        assert_eq!(strip_export_suffix("a_b_12_"), "a_b");
        assert_eq!(strip_export_suffix("Shine"), "Shine");
        assert_eq!(strip_export_suffix("Shine_"), "Shine_");
        assert_eq!(strip_export_suffix("_3_"), "_3_");
        assert_eq!(strip_export_suffix("Shine3_"), "Shine3_");
    }

    #[test]
    fn fill_reference_extraction() {
        assert_eq!(fill_reference("url(#abc)"), Some("abc"));
        assert_eq!(fill_reference("#abc"), None);
        assert_eq!(fill_reference("url(#)"), None);
    }

    #[test]
    fn root_attributes_are_stripped() {
        let mut doc = Document::parse(EXPORTED).unwrap();
        clean_document(&mut doc);
        let root = doc.root();
        for attr in ROOT_STRIP_ATTRS {
            assert!(!root.has_attr(attr), "{attr} should be stripped");
        }
        assert_eq!(root.attr("viewBox"), Some("0 0 200 100"));
    }

    #[test]
    fn identities_become_classes_and_gradient_ids() {
        let mut doc = Document::parse(EXPORTED).unwrap();
        clean_document(&mut doc);
        let root = doc.root();

        let gradient = root.child_elements().next().unwrap();
        assert_eq!(gradient.attr("id"), Some("e_shine"));
        assert_eq!(gradient.class(), None);
        // Only plain x/y are dropped when zero.
        assert_eq!(gradient.attr("x1"), Some("0"));

        let caret = root.find_by_class("v_caret").unwrap();
        assert!(!caret.has_attr("id"));
        assert!(!caret.has_attr("data-name"));

        let background = root.find_by_class("v_background").unwrap();
        assert!(!background.has_attr("x"));
        assert_eq!(background.attr("y"), Some("5"));

        let letters = root.find_by_class("v_letters").unwrap();
        assert_eq!(letters.fill(), Some("url(#e_shine)"));
    }

    #[test]
    fn elements_without_id_are_left_alone() {
        let mut doc = Document::parse(EXPORTED).unwrap();
        clean_document(&mut doc);
        let last = doc.root().child_elements().last().unwrap();
        assert_eq!(last.fill(), Some("url(#Other_1_)"));
    }

    #[test]
    fn clean_dir_rewrites_svg_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let svg_path = dir.path().join("logo.svg");
        let txt_path = dir.path().join("notes.txt");
        fs::write(&svg_path, EXPORTED).unwrap();
        fs::write(&txt_path, "x=\"0\"").unwrap();

        let cleaned = clean_dir(dir.path()).unwrap();
        assert_eq!(cleaned, vec![svg_path.clone()]);

        let rewritten = fs::read_to_string(&svg_path).unwrap();
        assert!(rewritten.contains(r#"class="v_caret""#));
        assert!(!rewritten.contains("data-name"));
        assert_eq!(fs::read_to_string(&txt_path).unwrap(), "x=\"0\"");
    }
}
