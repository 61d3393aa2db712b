//! Coordinate mapping between the scaled display surface and image-intrinsic
//! pixels. All stored geometry lives in image-intrinsic coordinates; only the
//! final draw step multiplies back by the fit scale.

use crate::annotation::Point;

/// Uniform scale that fits an `iw` x `ih` image inside a `cw` x `ch` container
/// while preserving aspect ratio, chosen by comparing aspect ratios: an image
/// wider (proportionally) than the container is width-bound, otherwise
/// height-bound.
///
/// Returns `None` when any dimension is zero or not finite. That means "no
/// valid scale yet" and the caller should skip drawing for this frame.
pub fn fit_scale(iw: f32, ih: f32, cw: f32, ch: f32) -> Option<f32> {
    if !(iw > 0.0 && ih > 0.0 && cw > 0.0 && ch > 0.0) {
        return None;
    }
    let scale = if iw / ih > cw / ch { cw / iw } else { ch / ih };
    scale.is_finite().then_some(scale)
}

/// Translate a display-surface position into image-intrinsic coordinates.
pub fn to_image_coords(screen: egui::Pos2, display_origin: egui::Pos2, scale: f32) -> Point {
    Point::new(
        (screen.x - display_origin.x) / scale,
        (screen.y - display_origin.y) / scale,
    )
}

/// Translate an image-intrinsic point back onto the display surface.
pub fn to_screen_coords(point: Point, display_origin: egui::Pos2, scale: f32) -> egui::Pos2 {
    egui::pos2(
        display_origin.x + point.x * scale,
        display_origin.y + point.y * scale,
    )
}

/// Rectangle the image occupies when scaled to fit and centered in
/// `container`, together with the fit scale. `None` while no valid scale
/// exists.
pub fn fit_rect(image_size: (u32, u32), container: egui::Rect) -> Option<(egui::Rect, f32)> {
    let (iw, ih) = (image_size.0 as f32, image_size.1 as f32);
    let scale = fit_scale(iw, ih, container.width(), container.height())?;
    let size = egui::vec2(iw * scale, ih * scale);
    let origin = container.center() - size * 0.5;
    Some((egui::Rect::from_min_size(origin, size), scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_scale_width_bound() {
        // 1600x400 image into 800x600: width-bound, scale 0.5.
        assert_eq!(fit_scale(1600.0, 400.0, 800.0, 600.0), Some(0.5));
    }

    #[test]
    fn fit_scale_height_bound() {
        // 400x1200 image into 800x600: height-bound, scale 0.5.
        assert_eq!(fit_scale(400.0, 1200.0, 800.0, 600.0), Some(0.5));
    }

    #[test]
    fn fit_scale_rejects_degenerate_container() {
        assert_eq!(fit_scale(800.0, 600.0, 0.0, 600.0), None);
        assert_eq!(fit_scale(800.0, 600.0, 800.0, 0.0), None);
        assert_eq!(fit_scale(0.0, 600.0, 800.0, 600.0), None);
    }

    #[test]
    fn screen_image_round_trip() {
        let origin = egui::pos2(40.0, 25.0);
        let scale = 0.5;
        let p = to_image_coords(egui::pos2(190.0, 225.0), origin, scale);
        assert_eq!(p, Point::new(300.0, 400.0));
        assert_eq!(to_screen_coords(p, origin, scale), egui::pos2(190.0, 225.0));
    }

    #[test]
    fn fit_rect_centers_image() {
        let container = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(800.0, 600.0));
        let (rect, scale) = fit_rect((400, 400), container).unwrap();
        assert_eq!(scale, 1.5);
        assert_eq!(rect.min, egui::pos2(100.0, 0.0));
        assert_eq!(rect.size(), egui::vec2(600.0, 600.0));
    }
}
