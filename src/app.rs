//! eframe application shell: panels, dialogs, sidecar persistence, and the
//! detection worker. Everything here is plumbing around the engine modules;
//! the invariants live in `store`, `ordering`, `detect`, and `interaction`.

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

use anyhow::{Context as _, Result};
use eframe::egui;
use image::DynamicImage;
use log::{debug, error, info, warn};

use crate::annotation::{AnnotationKind, MarkerStyles};
use crate::credential::{CredentialStore, MemoryCredentialStore};
use crate::detect::{self, DetectionError, DetectionProvider, FixtureProvider, RawBox};
use crate::geometry;
use crate::interaction::{InteractionController, Released};
use crate::ordering::{Filter, OrderedView};
use crate::render;
use crate::sidecar;
use crate::store::AnnotationStore;

// ── Detection worker ────────────────────────────────────────────────────────

struct AnalysisJob {
    generation: u64,
    rx: mpsc::Receiver<Result<Vec<RawBox>, DetectionError>>,
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct MarkApp {
    image_path: Option<PathBuf>,
    raw_image: Option<DynamicImage>,
    texture: Option<egui::TextureHandle>,
    image_size: (u32, u32),

    store: AnnotationStore,
    view: OrderedView,
    controller: InteractionController,
    filter: Filter,
    manual_kind: AnnotationKind,
    styles: MarkerStyles,
    saved_revision: u64,

    credentials: MemoryCredentialStore,
    provider: Option<Arc<dyn DetectionProvider>>,
    analysis: Option<AnalysisJob>,
    analysis_generation: u64,

    pending_delete: Option<u64>,
    credential_prompt: bool,
    credential_input: String,
    status: Option<String>,
}

impl MarkApp {
    pub fn new(image_path: Option<PathBuf>) -> Self {
        let mut app = Self {
            image_path: None,
            raw_image: None,
            texture: None,
            image_size: (0, 0),
            store: AnnotationStore::new(0.0, 0.0),
            view: OrderedView::default(),
            controller: InteractionController::new(),
            filter: Filter::All,
            manual_kind: AnnotationKind::General,
            styles: MarkerStyles::default(),
            saved_revision: 0,
            credentials: MemoryCredentialStore::default(),
            provider: None,
            analysis: None,
            analysis_generation: 0,
            pending_delete: None,
            credential_prompt: false,
            credential_input: String::new(),
            status: None,
        };
        if let Some(path) = image_path {
            if let Err(err) = app.load_image(&path) {
                error!("failed to load {}: {err:#}", path.display());
                app.status = Some(format!("Failed to load image: {err}"));
            }
        }
        app
    }

    fn analyzing(&self) -> bool {
        self.analysis.is_some()
    }

    /// Load a new image, replacing the previous annotation set entirely.
    fn load_image(&mut self, path: &Path) -> Result<()> {
        let img = image::open(path).with_context(|| format!("open image {}", path.display()))?;
        let (w, h) = (img.width(), img.height());

        self.image_size = (w, h);
        self.raw_image = Some(img);
        self.texture = None;
        self.store.reset_image(w as f32, h as f32);
        self.controller.select(None);
        self.pending_delete = None;
        // A detection result still in flight belongs to the previous image:
        // stop waiting on it, and let the generation check discard the late
        // message if it ever needs delivering.
        self.analysis = None;
        self.analysis_generation += 1;

        if let Some(saved) = sidecar::load(path) {
            info!(
                "restored {} annotations from {}",
                saved.annotations.len(),
                sidecar::sidecar_path(path).display()
            );
            self.store.adopt(saved.annotations);
            self.styles = saved.styles;
        }

        self.provider = Some(Arc::new(FixtureProvider::new(sidecar::detections_path(
            path,
        ))));
        self.image_path = Some(path.to_owned());
        self.saved_revision = self.store.revision();
        self.status = None;
        info!("loaded {} ({w}x{h})", path.display());
        Ok(())
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() {
            return;
        }
        if let Some(ref img) = self.raw_image {
            let rgba = img.to_rgba8();
            let size = [rgba.width() as usize, rgba.height() as usize];
            let pixels = rgba.as_flat_samples();
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
            self.texture =
                Some(ctx.load_texture("screenshot", color_image, egui::TextureOptions::LINEAR));
        }
    }

    /// Re-derive order and numbering if any mutation happened since the last
    /// derivation.
    fn refresh_view(&mut self) {
        if !self.view.is_current(&self.store) {
            self.view = OrderedView::derive(&self.store);
        }
    }

    fn autosave_if_dirty(&mut self) {
        if self.store.revision() == self.saved_revision {
            return;
        }
        // A drag bumps the revision on every move; keep those in memory and
        // flush once the gesture ends.
        if self.controller.is_dragging() {
            return;
        }
        if let Some(path) = &self.image_path {
            sidecar::save(path, self.store.all(), &self.styles);
        }
        self.saved_revision = self.store.revision();
    }

    // ── Detection flow ──────────────────────────────────────────────────

    fn start_analysis(&mut self) {
        let Some(image) = self.raw_image.clone() else {
            return;
        };
        let Some(provider) = self.provider.clone() else {
            return;
        };
        let Some(credential) = self.credentials.get() else {
            self.credential_prompt = true;
            return;
        };

        self.analysis_generation += 1;
        let generation = self.analysis_generation;
        self.pending_delete = None;
        let (w, h) = self.image_size;
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = provider.detect(&image, w, h, &credential);
            let _ = tx.send(result);
        });
        self.analysis = Some(AnalysisJob { generation, rx });
        self.status = None;
        info!("analysis started (generation {generation})");
    }

    fn poll_analysis(&mut self) {
        let finished = match &self.analysis {
            Some(job) => match job.rx.try_recv() {
                Ok(result) => Some((job.generation, Some(result))),
                Err(mpsc::TryRecvError::Empty) => None,
                Err(mpsc::TryRecvError::Disconnected) => Some((job.generation, None)),
            },
            None => None,
        };
        let Some((generation, result)) = finished else {
            return;
        };
        self.analysis = None;

        if generation != self.analysis_generation {
            // The image changed while the call was in flight; the result no
            // longer applies.
            info!("discarding stale detection result");
            return;
        }
        let Some(result) = result else {
            self.status = Some("Analysis worker disappeared".to_owned());
            return;
        };

        match result {
            Ok(boxes) => self.apply_detection(boxes),
            Err(err) if err.is_auth() => {
                warn!("detection rejected credential: {err}");
                self.credentials.clear();
                self.credential_prompt = true;
                self.status = Some("Credential rejected; enter a new one".to_owned());
            }
            Err(err) => {
                error!("detection failed: {err}");
                self.status = Some(format!("Analysis failed: {err}"));
            }
        }
    }

    fn apply_detection(&mut self, boxes: Vec<RawBox>) {
        let (w, h) = self.store.image_size();
        let batch = detect::normalize_boxes(&boxes, w, h, || self.store.next_id());
        info!(
            "analysis produced {} markers from {} raw boxes",
            batch.len(),
            boxes.len()
        );
        self.store.replace_all(batch);
        self.controller.select(None);
    }

    // ── Export ──────────────────────────────────────────────────────────

    fn export_annotated(&mut self) -> Result<PathBuf> {
        let raw = self.raw_image.as_ref().context("no image loaded")?;
        let path = self.image_path.as_ref().context("no image loaded")?;
        self.view = OrderedView::derive(&self.store);

        // Selection is an explicit argument of the render, not ambient state,
        // so the export needs no clear-render-restore dance.
        let img = render::export_image(raw, &self.store, &self.view, self.filter, &self.styles)?;
        let out_path = path.with_file_name(format!(
            "{}_annotated.png",
            path.file_stem()
                .unwrap_or_default()
                .to_str()
                .unwrap_or("out")
        ));
        img.save(&out_path)
            .with_context(|| format!("save {}", out_path.display()))?;
        info!("exported {}", out_path.display());
        Ok(out_path)
    }

    // ── Panels ──────────────────────────────────────────────────────────

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Open…").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("images", &["png", "jpg", "jpeg", "bmp", "webp"])
                    .pick_file()
                {
                    if let Err(err) = self.load_image(&path) {
                        error!("failed to load {}: {err:#}", path.display());
                        self.status = Some(format!("Failed to load image: {err}"));
                    }
                }
            }
            ui.separator();

            ui.label("Add as:");
            ui.selectable_value(&mut self.manual_kind, AnnotationKind::General, "General");
            ui.selectable_value(
                &mut self.manual_kind,
                AnnotationKind::Actionable,
                "Actionable",
            );
            ui.separator();

            ui.label("Show:");
            ui.selectable_value(&mut self.filter, Filter::All, "All");
            ui.selectable_value(&mut self.filter, Filter::GeneralOnly, "General");
            ui.selectable_value(&mut self.filter, Filter::ActionableOnly, "Actionable");
            ui.separator();

            let mut styles_changed = false;
            ui.label("General:");
            let mut rgb = self.styles.general.background.rgb_array();
            if ui.color_edit_button_rgb(&mut rgb).changed() {
                self.styles.general.background.set_rgb(rgb);
                styles_changed = true;
            }
            ui.label("Actionable:");
            let mut rgb = self.styles.actionable.background.rgb_array();
            if ui.color_edit_button_rgb(&mut rgb).changed() {
                self.styles.actionable.background.set_rgb(rgb);
                styles_changed = true;
            }
            if styles_changed {
                if let Some(path) = &self.image_path {
                    sidecar::save(path, self.store.all(), &self.styles);
                }
            }
            ui.separator();

            let can_analyze = self.raw_image.is_some() && !self.analyzing();
            if ui
                .add_enabled(can_analyze, egui::Button::new("Analyze"))
                .clicked()
            {
                self.start_analysis();
            }
            if ui
                .add_enabled(self.raw_image.is_some(), egui::Button::new("Export"))
                .clicked()
            {
                match self.export_annotated() {
                    Ok(out) => self.status = Some(format!("Exported {}", out.display())),
                    Err(err) => self.status = Some(format!("Export failed: {err}")),
                }
            }

            if let Some(status) = &self.status {
                ui.separator();
                ui.label(status.clone());
            }
        });
    }

    fn annotation_list(&mut self, ui: &mut egui::Ui) {
        ui.heading("Markers");
        let enabled = !self.analyzing();
        let visible = self.view.visible(&self.store, self.filter);
        egui::ScrollArea::vertical().show(ui, |ui| {
            for id in visible {
                let Some(ann) = self.store.get(id) else { continue };
                let label = self.view.label(id).unwrap_or("?").to_owned();
                let element = ann.element_type.as_str();
                let mut description = ann.description.clone();
                let selected = self.controller.selected() == Some(id);

                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(enabled, egui::SelectableLabel::new(selected, &label))
                        .clicked()
                    {
                        self.controller
                            .select(if selected { None } else { Some(id) });
                    }
                    ui.label(element);
                    if ui
                        .add_enabled(enabled, egui::Button::new("✕").small())
                        .clicked()
                    {
                        self.pending_delete = Some(id);
                    }
                });
                if ui
                    .add_enabled(
                        enabled,
                        egui::TextEdit::singleline(&mut description).hint_text("description"),
                    )
                    .changed()
                {
                    self.store.update_description(id, &description);
                }
                ui.separator();
            }
        });
    }

    fn canvas(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let canvas_rect = response.rect;
        painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

        let Some((img_rect, scale)) = geometry::fit_rect(self.image_size, canvas_rect) else {
            // No valid scale yet (no image, or a collapsed container).
            painter.text(
                canvas_rect.center(),
                egui::Align2::CENTER_CENTER,
                "Open a screenshot to annotate it",
                egui::FontId::proportional(16.0),
                egui::Color32::GRAY,
            );
            return;
        };

        if let Some(ref tex) = self.texture {
            painter.image(
                tex.id(),
                img_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        self.refresh_view();
        let visible = self.view.visible(&self.store, self.filter);
        render::paint_markers(
            &painter,
            &self.store,
            &self.view,
            self.filter,
            &self.styles,
            self.controller.selected(),
            img_rect.min,
            scale,
        );

        // While analyzing, the soon-to-be-replaced set must not be mutated.
        if self.analyzing() || self.pending_delete.is_some() || self.credential_prompt {
            return;
        }

        let (primary_pressed, primary_down, primary_released, secondary_pressed) = ctx.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_down(),
                i.pointer.primary_released(),
                i.pointer.secondary_pressed(),
            )
        });

        match response.hover_pos() {
            Some(pos) => {
                let p = geometry::to_image_coords(pos, img_rect.min, scale);
                if primary_pressed && canvas_rect.contains(pos) {
                    self.controller.press(p, &visible, &self.store);
                } else if primary_down {
                    self.controller.pointer_move(p, &mut self.store);
                }
                if primary_released {
                    let outcome =
                        self.controller
                            .release(p, &visible, &mut self.store, self.manual_kind);
                    debug!("release outcome: {outcome:?}");
                    if let Released::Added(id) = outcome {
                        info!("added manual marker {id} at {:.0},{:.0}", p.x, p.y);
                    }
                }
                if secondary_pressed && canvas_rect.contains(pos) {
                    if let Some(id) = self.controller.context_request(p, &visible, &self.store) {
                        self.pending_delete = Some(id);
                    }
                }

                // Cursor affordance only; not part of the data model.
                let over_marker = self.controller.is_dragging()
                    || crate::interaction::hit_test(p, &visible, &self.store).is_some();
                ctx.set_cursor_icon(if over_marker {
                    egui::CursorIcon::Grab
                } else {
                    egui::CursorIcon::Crosshair
                });
            }
            None => {
                // Pointer left the surface or focus was lost: abort any
                // in-progress gesture, last applied position stands.
                self.controller.cancel();
            }
        }
    }

    // ── Dialogs ─────────────────────────────────────────────────────────

    fn delete_dialog(&mut self, ctx: &egui::Context) {
        let Some(id) = self.pending_delete else { return };
        let label = self.view.label(id).unwrap_or("?").to_owned();
        egui::Window::new("Delete marker")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(format!("Delete marker {label}?"));
                ui.horizontal(|ui| {
                    if ui.button("Delete").clicked() {
                        if self.store.remove(id) {
                            self.controller.reconcile_removed(id);
                        }
                        self.pending_delete = None;
                    }
                    if ui.button("Cancel").clicked() {
                        self.pending_delete = None;
                    }
                });
            });
    }

    fn credential_dialog(&mut self, ctx: &egui::Context) {
        if !self.credential_prompt {
            return;
        }
        egui::Window::new("Detection credential")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label("A credential is required to run detection.");
                ui.add(
                    egui::TextEdit::singleline(&mut self.credential_input)
                        .password(true)
                        .hint_text("credential"),
                );
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        self.credentials.set(&self.credential_input);
                        self.credential_input.clear();
                        self.credential_prompt = false;
                    }
                    if ui.button("Cancel").clicked() {
                        self.credential_input.clear();
                        self.credential_prompt = false;
                    }
                });
            });
    }

    fn analyzing_overlay(&self, ctx: &egui::Context) {
        if !self.analyzing() {
            return;
        }
        egui::Window::new("Analyzing")
            .collapsible(false)
            .resizable(false)
            .title_bar(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Analyzing screenshot…");
                });
            });
        // Keep polling the worker even without input events.
        ctx.request_repaint();
    }
}

impl eframe::App for MarkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ensure_texture(ctx);
        self.poll_analysis();
        self.refresh_view();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui);
        });

        egui::SidePanel::right("markers")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                self.annotation_list(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas(ctx, ui);
        });

        self.delete_dialog(ctx);
        self.credential_dialog(ctx);
        self.analyzing_overlay(ctx);

        self.autosave_if_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{ElementType, Point};

    fn app_with_image(dir: &Path) -> MarkApp {
        let image_path = dir.join("shot.png");
        image::DynamicImage::new_rgba8(64, 48)
            .save(&image_path)
            .unwrap();
        MarkApp::new(Some(image_path))
    }

    #[test]
    fn autosave_waits_for_the_drag_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_image(dir.path());
        let marks = sidecar::sidecar_path(app.image_path.as_ref().unwrap());

        let id = app.store.add(
            Point::new(10.0, 10.0),
            String::new(),
            ElementType::Manual,
            AnnotationKind::General,
        );
        app.autosave_if_dirty();
        assert!(marks.exists());
        let before = std::fs::read_to_string(&marks).unwrap();

        // Mid-drag revisions stay in memory; the sidecar is untouched even
        // though the store changed.
        let order = vec![id];
        app.controller.press(Point::new(10.0, 10.0), &order, &app.store);
        app.controller
            .pointer_move(Point::new(30.0, 30.0), &mut app.store);
        assert!(app.controller.is_dragging());
        assert_ne!(app.store.revision(), app.saved_revision);
        app.autosave_if_dirty();
        assert_eq!(std::fs::read_to_string(&marks).unwrap(), before);

        // Releasing ends the gesture and the next pass flushes.
        app.controller.release(
            Point::new(30.0, 30.0),
            &order,
            &mut app.store,
            AnnotationKind::General,
        );
        app.autosave_if_dirty();
        assert_ne!(std::fs::read_to_string(&marks).unwrap(), before);
        assert_eq!(app.store.revision(), app.saved_revision);
    }

    #[test]
    fn aborted_drag_still_flushes_applied_positions() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_image(dir.path());
        let marks = sidecar::sidecar_path(app.image_path.as_ref().unwrap());

        let id = app.store.add(
            Point::new(10.0, 10.0),
            String::new(),
            ElementType::Manual,
            AnnotationKind::General,
        );
        app.autosave_if_dirty();
        let before = std::fs::read_to_string(&marks).unwrap();

        let order = vec![id];
        app.controller.press(Point::new(10.0, 10.0), &order, &app.store);
        app.controller
            .pointer_move(Point::new(25.0, 25.0), &mut app.store);
        app.controller.cancel();
        app.autosave_if_dirty();
        assert_ne!(std::fs::read_to_string(&marks).unwrap(), before);
    }

    #[test]
    fn loading_a_new_image_drops_the_inflight_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_image(dir.path());

        let (_tx, rx) = mpsc::channel();
        app.analysis = Some(AnalysisJob {
            generation: app.analysis_generation,
            rx,
        });
        assert!(app.analyzing());

        let second = dir.path().join("next.png");
        image::DynamicImage::new_rgba8(32, 32).save(&second).unwrap();
        app.load_image(&second).unwrap();

        // The overlay state is gone immediately; the new image accepts input
        // without waiting for the orphaned worker.
        assert!(!app.analyzing());
    }

    #[test]
    fn reopening_an_image_restores_its_annotations() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_image(dir.path());
        let path = app.image_path.clone().unwrap();

        app.store.add(
            Point::new(20.0, 30.0),
            "logo".to_owned(),
            ElementType::Image,
            AnnotationKind::General,
        );
        app.autosave_if_dirty();

        let reopened = MarkApp::new(Some(path));
        assert_eq!(reopened.store.len(), 1);
        assert_eq!(reopened.store.all()[0].description, "logo");
        assert_eq!(reopened.store.all()[0].point, Point::new(20.0, 30.0));
    }
}
