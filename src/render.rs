//! Marker drawing: the live egui painter pass and the offscreen raster
//! export. Both passes are pure functions of explicit state; the export is
//! simply the same render with no selection, so it never needs a
//! redraw-then-capture delay and never disturbs the live selection.

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_circle_mut, draw_text_mut, text_size,
};

use crate::annotation::{Color4, MarkerStyles, MARKER_RADIUS};
use crate::geometry::to_screen_coords;
use crate::ordering::{Filter, OrderedView};
use crate::store::AnnotationStore;

/// Extra radius of the glow ring drawn beneath the selected marker.
const GLOW_MARGIN: f32 = 5.0;
const GLOW_COLOR: Color4 = Color4 {
    r: 1.0,
    g: 0.84,
    b: 0.0,
    a: 1.0,
};

/// Draw every marker visible under `filter` onto the live canvas, in draw
/// order, with the selected one glowing.
#[allow(clippy::too_many_arguments)]
pub fn paint_markers(
    painter: &egui::Painter,
    store: &AnnotationStore,
    view: &OrderedView,
    filter: Filter,
    styles: &MarkerStyles,
    selection: Option<u64>,
    display_origin: egui::Pos2,
    scale: f32,
) {
    for id in view.visible(store, filter) {
        let Some(ann) = store.get(id) else { continue };
        let style = styles.for_kind(ann.kind);
        let center = to_screen_coords(ann.point, display_origin, scale);
        let radius = MARKER_RADIUS * scale;

        if selection == Some(id) {
            painter.circle_filled(center, radius + GLOW_MARGIN * scale, GLOW_COLOR.to_egui());
        }
        painter.circle_filled(center, radius, style.background.to_egui());
        painter.circle_stroke(
            center,
            radius,
            egui::Stroke::new((1.5 * scale).max(1.0), style.border.to_egui()),
        );
        if let Some(label) = view.label(id) {
            painter.text(
                center,
                egui::Align2::CENTER_CENTER,
                label,
                egui::FontId::proportional((MARKER_RADIUS * scale).max(8.0)),
                style.text.to_egui(),
            );
        }
    }
}

/// Rasterize the base image plus all markers visible under `filter` at the
/// image's natural resolution. `selection` controls the glow ring; the export
/// path always passes `None`.
pub fn render_to_image(
    base: &DynamicImage,
    store: &AnnotationStore,
    view: &OrderedView,
    filter: Filter,
    styles: &MarkerStyles,
    selection: Option<u64>,
) -> Result<RgbaImage> {
    let mut img = base.to_rgba8();
    let font = marker_font()?;
    let px = PxScale::from(MARKER_RADIUS * 1.3);
    let radius = MARKER_RADIUS as i32;

    for id in view.visible(store, filter) {
        let Some(ann) = store.get(id) else { continue };
        let style = styles.for_kind(ann.kind);
        let cx = ann.point.x.round() as i32;
        let cy = ann.point.y.round() as i32;

        if selection == Some(id) {
            draw_filled_circle_mut(
                &mut img,
                (cx, cy),
                radius + GLOW_MARGIN as i32,
                GLOW_COLOR.to_rgba(),
            );
        }
        draw_filled_circle_mut(&mut img, (cx, cy), radius, style.background.to_rgba());
        draw_hollow_circle_mut(&mut img, (cx, cy), radius, style.border.to_rgba());

        if let Some(label) = view.label(id) {
            let (tw, th) = text_size(px, &font, label);
            draw_text_mut(
                &mut img,
                style.text.to_rgba(),
                cx - tw as i32 / 2,
                cy - th as i32 / 2,
                px,
                &font,
                label,
            );
        }
    }
    Ok(img)
}

/// The export pass: identical to the live render except no selection glow is
/// ever drawn. The caller's selection state is not touched.
pub fn export_image(
    base: &DynamicImage,
    store: &AnnotationStore,
    view: &OrderedView,
    filter: Filter,
    styles: &MarkerStyles,
) -> Result<RgbaImage> {
    render_to_image(base, store, view, filter, styles, None)
}

/// egui ships its UI fonts as static byte slices; reuse one of them for the
/// raster export instead of vendoring a separate font file.
fn marker_font() -> Result<FontVec> {
    let defs = egui::FontDefinitions::default();
    let data = defs
        .font_data
        .get("Hack")
        .or_else(|| defs.font_data.values().next())
        .context("no bundled font available for export labels")?;
    FontVec::try_from_vec(data.font.to_vec()).map_err(|e| anyhow!("invalid bundled font: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationKind, ElementType, Point};

    fn scene() -> (DynamicImage, AnnotationStore, OrderedView, u64) {
        let base = DynamicImage::new_rgba8(200, 160);
        let mut store = AnnotationStore::new(200.0, 160.0);
        let id = store.add(
            Point::new(100.0, 80.0),
            "submit".to_owned(),
            ElementType::Button,
            AnnotationKind::Actionable,
        );
        let view = OrderedView::derive(&store);
        (base, store, view, id)
    }

    #[test]
    fn export_equals_render_with_selection_cleared() {
        let (base, store, view, id) = scene();
        let styles = MarkerStyles::default();
        let exported = export_image(&base, &store, &view, Filter::All, &styles).unwrap();
        let live_no_selection =
            render_to_image(&base, &store, &view, Filter::All, &styles, None).unwrap();
        assert_eq!(exported.as_raw(), live_no_selection.as_raw());

        // And a selected render differs: the glow ring is really drawn.
        let live_selected =
            render_to_image(&base, &store, &view, Filter::All, &styles, Some(id)).unwrap();
        assert_ne!(exported.as_raw(), live_selected.as_raw());
    }

    #[test]
    fn filtered_export_omits_filtered_markers() {
        let (base, mut store, _, _) = scene();
        store.add(
            Point::new(40.0, 40.0),
            String::new(),
            ElementType::Input,
            AnnotationKind::General,
        );
        let view = OrderedView::derive(&store);
        let styles = MarkerStyles::default();
        let all = export_image(&base, &store, &view, Filter::All, &styles).unwrap();
        let actionable =
            export_image(&base, &store, &view, Filter::ActionableOnly, &styles).unwrap();
        assert_ne!(all.as_raw(), actionable.as_raw());
    }

    #[test]
    fn export_tolerates_markers_at_image_edge() {
        let base = DynamicImage::new_rgba8(200, 160);
        let mut store = AnnotationStore::new(200.0, 160.0);
        store.add(
            Point::new(200.0, 0.0),
            String::new(),
            ElementType::Other,
            AnnotationKind::General,
        );
        let view = OrderedView::derive(&store);
        let img = export_image(&base, &store, &view, Filter::All, &MarkerStyles::default());
        assert!(img.is_ok());
    }
}
