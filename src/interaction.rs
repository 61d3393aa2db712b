//! Pointer state machine: click-vs-drag disambiguation, selection toggling,
//! manual marker adds, live drag updates, and delete requests.
//!
//! All positions here are image-intrinsic (already through the geometry
//! mapper). The controller owns the selection and is the only component that
//! mutates annotation positions from pointer input.

use crate::annotation::{AnnotationKind, ElementType, Point, MARKER_RADIUS};
use crate::store::AnnotationStore;

/// A press-then-release within this distance is a click, not a drag.
pub const CLICK_TOLERANCE: f32 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    Idle,
    /// Press registered; may become a click or, if a marker was hit, a drag.
    Pressed { start: Point, hit: Option<u64> },
    /// Confirmed drag of one annotation.
    Dragging { id: u64 },
}

/// What a primary-button release amounted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Released {
    /// Click on empty space: a new manual annotation was added.
    Added(u64),
    /// Click on a marker that was not the selected one.
    Selected(u64),
    /// Click on the already-selected marker.
    Deselected,
    /// A drag ended; its position updates were already applied move-by-move.
    DragFinished(u64),
    /// Nothing happened (e.g. a long press-release with no marker hit).
    None,
}

#[derive(Debug)]
pub struct InteractionController {
    state: State,
    selected: Option<u64>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            selected: None,
        }
    }

    pub fn selected(&self) -> Option<u64> {
        self.selected
    }

    /// Select (or deselect with `None`) from outside the pointer flow, e.g.
    /// from a list row.
    pub fn select(&mut self, id: Option<u64>) {
        self.selected = id;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, State::Dragging { .. })
    }

    /// Primary button pressed at `p`. Records the drag-start reference and the
    /// marker under the pointer, if any. No mutation yet.
    pub fn press(&mut self, p: Point, draw_order: &[u64], store: &AnnotationStore) {
        let hit = hit_test(p, draw_order, store);
        self.state = State::Pressed { start: p, hit };
    }

    /// Pointer moved to `p` with the primary button held. A move away from the
    /// press position with a marker hit confirms the drag; every move while
    /// dragging writes the marker position through for live feedback.
    pub fn pointer_move(&mut self, p: Point, store: &mut AnnotationStore) {
        match self.state {
            State::Pressed {
                start,
                hit: Some(id),
            } if p != start => {
                self.state = State::Dragging { id };
                store.update_point(id, p.rounded());
            }
            State::Dragging { id } => {
                store.update_point(id, p.rounded());
            }
            _ => {}
        }
    }

    /// Primary button released at `p`. A short press-release with no confirmed
    /// drag is a click: toggle selection on a hit marker, or add a manual
    /// annotation of `manual_kind` on empty space. Anything else leaves the
    /// already-applied drag updates standing. The controller always returns to
    /// idle.
    pub fn release(
        &mut self,
        p: Point,
        draw_order: &[u64],
        store: &mut AnnotationStore,
        manual_kind: AnnotationKind,
    ) -> Released {
        let outcome = match self.state {
            State::Idle => Released::None,
            State::Dragging { id } => Released::DragFinished(id),
            State::Pressed { start, .. } => {
                if start.distance_to(p) < CLICK_TOLERANCE {
                    match hit_test(p, draw_order, store) {
                        Some(id) if self.selected == Some(id) => {
                            self.selected = None;
                            Released::Deselected
                        }
                        Some(id) => {
                            self.selected = Some(id);
                            Released::Selected(id)
                        }
                        None => {
                            let id = store.add(
                                p.rounded(),
                                String::new(),
                                ElementType::Manual,
                                manual_kind,
                            );
                            Released::Added(id)
                        }
                    }
                } else {
                    Released::None
                }
            }
        };
        self.state = State::Idle;
        outcome
    }

    /// Pointer left the surface or focus was lost: abort any in-progress drag
    /// without reverting already-applied position updates.
    pub fn cancel(&mut self) {
        self.state = State::Idle;
    }

    /// Secondary (context) action at `p`: a hit marker becomes a delete
    /// request for a confirmation collaborator to act on. Never deletes
    /// directly.
    pub fn context_request(
        &self,
        p: Point,
        draw_order: &[u64],
        store: &AnnotationStore,
    ) -> Option<u64> {
        hit_test(p, draw_order, store)
    }

    /// The store removed `id`; drop the selection if it pointed there.
    pub fn reconcile_removed(&mut self, id: u64) {
        if self.selected == Some(id) {
            self.selected = None;
        }
    }
}

/// Hit-test `p` against markers in `draw_order`. Overlapping markers resolve
/// to the topmost one, i.e. the last drawn, by testing in reverse order.
pub fn hit_test(p: Point, draw_order: &[u64], store: &AnnotationStore) -> Option<u64> {
    draw_order
        .iter()
        .rev()
        .copied()
        .find(|&id| {
            store
                .get(id)
                .is_some_and(|a| a.point.distance_to(p) <= MARKER_RADIUS)
        })
}
