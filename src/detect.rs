//! Detection collaborator contract and raw-box normalization.
//!
//! The vision model itself is a black box behind [`DetectionProvider`]; this
//! module owns the policy that turns its raw boxes into annotation records:
//! degenerate or fully off-image boxes are silently dropped, surviving boxes
//! are clamped into the image and anchored at their top-right corner.

use std::fs;
use std::path::PathBuf;

use image::DynamicImage;
use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::annotation::{Annotation, AnnotationKind, ElementType, Point};

/// One raw box as returned by the vision collaborator.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBox {
    #[serde(default)]
    pub top_left: Option<Point>,
    #[serde(default)]
    pub bottom_right: Option<Point>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub element_type: String,
}

#[derive(Debug, Error)]
pub enum DetectionError {
    /// The credential was rejected. Callers should forget the stored
    /// credential and prompt for a new one.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The response was not valid structured data. Treated like a generic
    /// failure by callers; no partial results are accepted.
    #[error("malformed detection payload: {0}")]
    Malformed(String),
    #[error("detection failed: {0}")]
    Service(String),
}

impl DetectionError {
    pub fn is_auth(&self) -> bool {
        matches!(self, DetectionError::Auth(_))
    }
}

/// External vision service proposing candidate element boxes for an image.
pub trait DetectionProvider: Send + Sync {
    fn detect(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
        credential: &str,
    ) -> Result<Vec<RawBox>, DetectionError>;
}

/// Stand-in provider that reads raw boxes from a JSON sidecar next to the
/// image (`<image>.<ext>.detections.json`). The network call to a real vision
/// model is out of scope; anything implementing [`DetectionProvider`] can be
/// dropped in its place.
pub struct FixtureProvider {
    path: PathBuf,
}

impl FixtureProvider {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl DetectionProvider for FixtureProvider {
    fn detect(
        &self,
        _image: &DynamicImage,
        _width: u32,
        _height: u32,
        _credential: &str,
    ) -> Result<Vec<RawBox>, DetectionError> {
        let data = fs::read_to_string(&self.path)
            .map_err(|e| DetectionError::Service(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&data).map_err(|e| DetectionError::Malformed(e.to_string()))
    }
}

/// Normalize a detection batch against an image of `width` x `height`.
///
/// Rejected boxes are omitted without error: dropping a bad box beats failing
/// the whole batch. Every surviving marker is anchored at the top-right corner
/// of its clamped box, which keeps the marker off the left-aligned text labels
/// inside the detected element.
pub fn normalize_boxes(
    boxes: &[RawBox],
    width: f32,
    height: f32,
    mut next_id: impl FnMut() -> u64,
) -> Vec<Annotation> {
    let mut out = Vec::with_capacity(boxes.len());
    for (i, raw) in boxes.iter().enumerate() {
        let (Some(tl), Some(br)) = (raw.top_left, raw.bottom_right) else {
            debug!("box {i}: missing corner, dropped");
            continue;
        };
        if tl.x >= br.x || tl.y >= br.y {
            debug!("box {i}: non-positive extent, dropped");
            continue;
        }
        if br.x <= 0.0 || tl.x >= width || br.y <= 0.0 || tl.y >= height {
            debug!("box {i}: entirely outside image, dropped");
            continue;
        }

        let tl = tl.clamped(width, height);
        let br = br.clamped(width, height);
        // Anchor at the clamped top-right corner, then clamp the anchor itself.
        let anchor = Point::new(br.x, tl.y).clamped(width, height);

        let element_type = ElementType::parse(&raw.element_type);
        let kind = AnnotationKind::classify(element_type);
        out.push(Annotation {
            id: next_id(),
            point: anchor,
            description: raw.description.clone(),
            element_type,
            kind,
        });
    }
    out
}
