//! Artwork recoloring pass.
//!
//! A [`Recolorer`] retints every fill in a [`Document`] with a brand color
//! while keeping the artwork's own light/dark modeling. When the background
//! is dark, fills are tone-inverted before blending.

use std::collections::HashSet;
use std::str::FromStr;

use log::{debug, info, warn};

use crate::color::{Color, ColorError};
use crate::document::{Document, Element, Node};

/// Class of the element that paints the artwork's backdrop.
pub const BACKGROUND_CLASS: &str = "v_background";

/// Prefix marking a fill that references a paint server (gradient).
const REFERENCE_PREFIX: &str = "url(";

// ============================================================================
// Background
// ============================================================================

/// The background the artwork will be displayed on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    /// An explicit background color, used as-is.
    Color(Color),
    /// A gray level (0-255) tinted with the brand color.
    Level(u8),
}

impl Background {
    /// Resolves the displayed background color for a brand color.
    pub fn resolve(&self, brand: &Color) -> Color {
        match self {
            Self::Color(color) => *color,
            Self::Level(level) => brand.blend_hwb(&Color::gray(f64::from(*level) / 255.0)),
        }
    }
}

impl FromStr for Background {
    type Err = ColorError;

    /// Integers are gray levels and must be in 0-255; anything else is a color literal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if let Ok(level) = value.parse::<i64>() {
            return u8::try_from(level)
                .map(Self::Level)
                .map_err(|_| ColorError::InvalidBackground(s.to_string()));
        }
        Color::parse(value)
            .map(Self::Color)
            .map_err(|_| ColorError::InvalidBackground(s.to_string()))
    }
}

// ============================================================================
// Per-element policy
// ============================================================================

/// What the recolorer does with a single element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// No fill: left alone.
    Skip,
    /// Class is in the hide list: element and subtree are removed.
    Hide,
    /// Fill references a gradient: left alone.
    Passthrough,
    /// The backdrop element: takes the background color, never blended.
    Background,
    /// Any other fill: blended with the brand color.
    Recolor,
}

/// Counts of what a pass did, for logging and tests.
///
/// Elements inside a hidden subtree are counted before the subtree is
/// removed, so nested hidden or recolored elements add to the totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecolorStats {
    pub recolored: usize,
    pub hidden: usize,
    pub passed_through: usize,
    pub backgrounds: usize,
}

/// The name an element can be hidden by: its class after the first `_`.
///
/// `v_caret` is hidden by `caret`; a class without `_` is used whole.
pub fn hide_name(class: &str) -> &str {
    class.split_once('_').map_or(class, |(_, rest)| rest)
}

/// Normalizes a hide list entry; `caret`, `no-caret` and `--no-caret` are equivalent.
pub fn normalize_hide_name(name: &str) -> &str {
    let name = name.trim();
    let name = name.strip_prefix("--").unwrap_or(name);
    name.strip_prefix("no-").unwrap_or(name)
}

// ============================================================================
// Recolorer
// ============================================================================

/// Applies the brand recoloring policy across a document.
///
/// The background and darkness flag are computed once at construction and
/// stay fixed for every document the recolorer is applied to.
///
/// # Example
///
/// ```
/// use artwork_recolor::{Background, Color, Document, Recolorer};
///
/// let mut doc = Document::parse(
///     r##"<svg xmlns="http://www.w3.org/2000/svg">
///         <rect class="v_background" fill="#ffffff"/>
///         <path class="v_caret" fill="#000"/>
///         <path class="v_letters" fill="#ff0000"/>
///     </svg>"##,
/// ).unwrap();
///
/// let brand = Color::parse("#333").unwrap();
/// let recolorer = Recolorer::new(brand, Some(Background::Level(0)), ["caret"]);
/// assert!(recolorer.is_dark());
///
/// let stats = recolorer.apply(&mut doc).unwrap();
/// assert_eq!(stats.hidden, 1);
/// assert_eq!(stats.recolored, 1);
/// ```
#[derive(Debug, Clone)]
pub struct Recolorer {
    brand: Color,
    background: Option<Color>,
    dark: bool,
    hide: HashSet<String>,
}

impl Recolorer {
    /// Creates a recolorer for a brand color, optional background and hide list.
    pub fn new<I, S>(brand: Color, background: Option<Background>, hide: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let background = background.map(|bg| bg.resolve(&brand));
        let dark = background.is_some_and(|bg| bg.is_dark());

        if let Some(bg) = background {
            let hwb = bg.hwb();
            info!("Background: {} (luma {:.6})", bg, bg.luma());
            debug!("  White: {:.6}, Black: {:.6}", hwb.whiteness, hwb.blackness);
            info!("  Dark background: {}", dark);
        }

        Self {
            brand,
            background,
            dark,
            hide: hide
                .into_iter()
                .map(|name| normalize_hide_name(name.as_ref()).to_string())
                .collect(),
        }
    }

    pub fn brand(&self) -> Color {
        self.brand
    }

    /// The resolved background color, if a background was given.
    pub fn background(&self) -> Option<Color> {
        self.background
    }

    /// True when the background is dark enough to invert artwork tones.
    pub fn is_dark(&self) -> bool {
        self.dark
    }

    /// Decides what to do with an element.
    pub fn classify(&self, element: &Element) -> Action {
        let Some(fill) = element.fill() else {
            return Action::Skip;
        };

        let class = element.class();
        if class.is_some_and(|c| self.hide.contains(hide_name(c))) {
            return Action::Hide;
        }
        if fill.starts_with(REFERENCE_PREFIX) {
            return Action::Passthrough;
        }
        if class == Some(BACKGROUND_CLASS) {
            return Action::Background;
        }
        Action::Recolor
    }

    /// Computes the replacement for a plain color fill.
    pub fn recolor_fill(&self, fill: &str) -> Result<Color, ColorError> {
        let mut color = Color::parse(fill)?;
        if self.dark {
            color = color.invert_levels();
        }
        Ok(self.brand.blend_hwb(&color))
    }

    /// Recolors a document in place.
    ///
    /// Elements are visited once their whole subtree has been visited. Hidden
    /// elements are detached from their parent without disturbing the walk
    /// over their remaining siblings. A hidden element's descendants have
    /// already been processed when it is removed, so an unparseable fill
    /// inside it still fails the pass. Fails on the first unparseable fill.
    pub fn apply(&self, doc: &mut Document) -> Result<RecolorStats, ColorError> {
        let mut stats = RecolorStats::default();
        let root = doc.root_mut();

        self.walk_children(root, &mut stats)?;
        if self.visit(root, &mut stats)? == Action::Hide {
            warn!("Cannot hide the document root, ignoring");
            stats.hidden -= 1;
        }

        debug!(
            "Recolored {} fills, hid {} elements, passed {} references through",
            stats.recolored, stats.hidden, stats.passed_through
        );
        Ok(stats)
    }

    fn walk_children(&self, parent: &mut Element, stats: &mut RecolorStats) -> Result<(), ColorError> {
        let mut index = 0;
        while index < parent.children().len() {
            if let Node::Element(child) = &mut parent.children_mut()[index] {
                self.walk_children(child, stats)?;
                if self.visit(child, stats)? == Action::Hide {
                    parent.children_mut().remove(index);
                    continue;
                }
            }
            index += 1;
        }
        Ok(())
    }

    fn visit(&self, element: &mut Element, stats: &mut RecolorStats) -> Result<Action, ColorError> {
        let action = self.classify(element);
        match action {
            Action::Skip => {}
            Action::Hide => stats.hidden += 1,
            Action::Passthrough => stats.passed_through += 1,
            Action::Background => {
                if let Some(bg) = self.background {
                    element.set_attr("fill", bg.to_hex());
                    stats.backgrounds += 1;
                }
            }
            Action::Recolor => {
                // `classify` only returns Recolor for elements with a fill.
                let fill = element.fill().unwrap_or_default();
                let color = self.recolor_fill(fill)?;
                element.set_attr("fill", color.to_hex());
                stats.recolored += 1;
            }
        }
        Ok(action)
    }
}

// ============================================================================
// Tests
// ============================================================================
