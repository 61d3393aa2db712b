//! Annotation data model: marker records, element categories, and styles.

use serde::{Deserialize, Serialize};

/// Radius of a marker circle in image-intrinsic pixels. The same radius is
/// used for hit-testing, so the visual and interactive areas match exactly.
pub const MARKER_RADIUS: f32 = 14.0;

/// A 2D point in image-intrinsic pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Clamp into `[0, width] x [0, height]`.
    pub fn clamped(self, width: f32, height: f32) -> Point {
        Point {
            x: self.x.clamp(0.0, width.max(0.0)),
            y: self.y.clamp(0.0, height.max(0.0)),
        }
    }

    /// Round both coordinates to whole pixels.
    pub fn rounded(self) -> Point {
        Point {
            x: self.x.round(),
            y: self.y.round(),
        }
    }
}

/// Category of UI element a marker points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Button,
    Input,
    Link,
    Icon,
    Dropdown,
    Checkbox,
    Image,
    Text,
    Tab,
    Other,
    /// User-created marker, as opposed to one proposed by detection.
    Manual,
}

impl ElementType {
    /// Parse a detection payload label. Matching is case-insensitive;
    /// blank or unrecognized labels map to `Other`.
    pub fn parse(label: &str) -> ElementType {
        match label.trim().to_lowercase().as_str() {
            "button" => ElementType::Button,
            "input" => ElementType::Input,
            "link" => ElementType::Link,
            "icon" => ElementType::Icon,
            "dropdown" => ElementType::Dropdown,
            "checkbox" => ElementType::Checkbox,
            "image" => ElementType::Image,
            "text" => ElementType::Text,
            "tab" => ElementType::Tab,
            "manual" => ElementType::Manual,
            _ => ElementType::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Button => "button",
            ElementType::Input => "input",
            ElementType::Link => "link",
            ElementType::Icon => "icon",
            ElementType::Dropdown => "dropdown",
            ElementType::Checkbox => "checkbox",
            ElementType::Image => "image",
            ElementType::Text => "text",
            ElementType::Tab => "tab",
            ElementType::Other => "other",
            ElementType::Manual => "manual",
        }
    }
}

/// The two mutually exclusive marker categories.
///
/// Actionable covers elements that trigger navigation or an action; data-entry
/// fields stay general even though they are interactive, because the annotated
/// image documents action-triggers separately from data-input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    General,
    Actionable,
}

impl AnnotationKind {
    /// Derive the category from an element type. Done once at creation time
    /// and never recomputed afterwards.
    pub fn classify(element_type: ElementType) -> Self {
        match element_type {
            ElementType::Button | ElementType::Link | ElementType::Tab => {
                AnnotationKind::Actionable
            }
            _ => AnnotationKind::General,
        }
    }

    pub fn label_prefix(self) -> &'static str {
        match self {
            AnnotationKind::General => "",
            AnnotationKind::Actionable => "A",
        }
    }
}

/// A single numbered marker tied to one point on the image.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Annotation {
    pub id: u64,
    pub point: Point,
    pub description: String,
    pub element_type: ElementType,
    pub kind: AnnotationKind,
}

// ── Marker styling ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Color4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color4 {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn to_egui(self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(
            (self.r * 255.0) as u8,
            (self.g * 255.0) as u8,
            (self.b * 255.0) as u8,
            (self.a * 255.0) as u8,
        )
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([
            (self.r * 255.0) as u8,
            (self.g * 255.0) as u8,
            (self.b * 255.0) as u8,
            (self.a * 255.0) as u8,
        ])
    }

    pub fn rgb_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn set_rgb(&mut self, rgb: [f32; 3]) {
        self.r = rgb[0];
        self.g = rgb[1];
        self.b = rgb[2];
    }
}

/// Colors used to draw one category of marker.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub background: Color4,
    pub border: Color4,
    pub text: Color4,
}

/// Per-category marker styles, persisted alongside the annotations.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MarkerStyles {
    pub general: MarkerStyle,
    pub actionable: MarkerStyle,
}

impl MarkerStyles {
    pub fn for_kind(&self, kind: AnnotationKind) -> &MarkerStyle {
        match kind {
            AnnotationKind::General => &self.general,
            AnnotationKind::Actionable => &self.actionable,
        }
    }
}

impl Default for MarkerStyles {
    fn default() -> Self {
        Self {
            general: MarkerStyle {
                background: Color4::rgb(0.13, 0.45, 0.85),
                border: Color4::rgb(1.0, 1.0, 1.0),
                text: Color4::rgb(1.0, 1.0, 1.0),
            },
            actionable: MarkerStyle {
                background: Color4::rgb(0.87, 0.32, 0.18),
                border: Color4::rgb(1.0, 1.0, 1.0),
                text: Color4::rgb(1.0, 1.0, 1.0),
            },
        }
    }
}
