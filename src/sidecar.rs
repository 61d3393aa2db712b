//! JSON sidecar persistence. Annotations and marker styles are saved next to
//! the image (`<image>.<ext>.marks`) and restored when the same image is
//! opened again; the detection fixture lives beside it.

use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, MarkerStyles};

#[derive(Serialize, Deserialize)]
pub struct SidecarFile {
    pub annotations: Vec<Annotation>,
    pub styles: MarkerStyles,
}

pub fn sidecar_path(image_path: &Path) -> PathBuf {
    image_path.with_extension(format!(
        "{}.marks",
        image_path
            .extension()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("")
    ))
}

pub fn detections_path(image_path: &Path) -> PathBuf {
    image_path.with_extension(format!(
        "{}.detections.json",
        image_path
            .extension()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("")
    ))
}

pub fn load(image_path: &Path) -> Option<SidecarFile> {
    let path = sidecar_path(image_path);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(file) => Some(file),
        Err(err) => {
            warn!("ignoring unreadable sidecar {}: {err}", path.display());
            None
        }
    }
}

pub fn save(image_path: &Path, annotations: &[Annotation], styles: &MarkerStyles) {
    let path = sidecar_path(image_path);
    let file = SidecarFile {
        annotations: annotations.to_vec(),
        styles: *styles,
    };
    match serde_json::to_string_pretty(&file) {
        Ok(data) => {
            if let Err(err) = std::fs::write(&path, data) {
                warn!("failed to save {}: {err}", path.display());
            }
        }
        Err(err) => warn!("failed to serialize sidecar: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationKind, ElementType, Point};

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("shot.png");
        let annotations = vec![Annotation {
            id: 3,
            point: Point::new(120.0, 40.0),
            description: "Save button".to_owned(),
            element_type: ElementType::Button,
            kind: AnnotationKind::Actionable,
        }];
        let mut styles = MarkerStyles::default();
        styles.general.background.set_rgb([0.2, 0.6, 0.4]);

        save(&image_path, &annotations, &styles);
        assert_eq!(sidecar_path(&image_path), dir.path().join("shot.png.marks"));
        assert!(sidecar_path(&image_path).exists());

        let restored = load(&image_path).expect("sidecar should load back");
        assert_eq!(restored.annotations.len(), 1);
        let ann = &restored.annotations[0];
        assert_eq!(ann.id, 3);
        assert_eq!(ann.point, Point::new(120.0, 40.0));
        assert_eq!(ann.description, "Save button");
        assert_eq!(ann.element_type, ElementType::Button);
        assert_eq!(ann.kind, AnnotationKind::Actionable);
        assert_eq!(
            restored.styles.general.background.rgb_array(),
            [0.2, 0.6, 0.4]
        );
    }

    #[test]
    fn missing_sidecar_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent.png")).is_none());
    }

    #[test]
    fn unreadable_sidecar_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("shot.png");
        std::fs::write(sidecar_path(&image_path), "not json").unwrap();
        assert!(load(&image_path).is_none());
    }

    #[test]
    fn detections_fixture_sits_next_to_the_image() {
        let path = Path::new("captures/shot.png");
        assert_eq!(
            detections_path(path),
            Path::new("captures/shot.png.detections.json")
        );
    }
}
