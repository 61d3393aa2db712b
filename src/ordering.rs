//! Derived display order and per-category numbering.
//!
//! Order and labels are views over the store, never stored on the records.
//! Labels are assigned over the *full* set; a display filter is applied
//! strictly afterwards, so a filtered view always shows the numbers items
//! carry in the full ordering.

use std::collections::HashMap;

use crate::annotation::AnnotationKind;
use crate::store::AnnotationStore;

/// Which categories a view shows. Applied after numbering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    GeneralOnly,
    ActionableOnly,
}

impl Filter {
    pub fn admits(self, kind: AnnotationKind) -> bool {
        match self {
            Filter::All => true,
            Filter::GeneralOnly => kind == AnnotationKind::General,
            Filter::ActionableOnly => kind == AnnotationKind::Actionable,
        }
    }
}

/// Total order plus id-to-label mapping for one store revision.
#[derive(Clone, Debug, Default)]
pub struct OrderedView {
    order: Vec<u64>,
    labels: HashMap<u64, String>,
    revision: u64,
}

impl OrderedView {
    /// Derive order and labels from the full annotation set: top-to-bottom,
    /// left-to-right (ties on y broken by x, then id for determinism), with
    /// two independent counters emitting `1, 2, …` for general and
    /// `A1, A2, …` for actionable items in the order encountered.
    pub fn derive(store: &AnnotationStore) -> Self {
        let mut entries: Vec<(crate::annotation::Point, u64)> =
            store.all().iter().map(|a| (a.point, a.id)).collect();
        entries.sort_by(|a, b| {
            a.0.y
                .total_cmp(&b.0.y)
                .then(a.0.x.total_cmp(&b.0.x))
                .then(a.1.cmp(&b.1))
        });
        let order: Vec<u64> = entries.into_iter().map(|(_, id)| id).collect();

        let mut labels = HashMap::with_capacity(order.len());
        let mut general = 1u32;
        let mut actionable = 1u32;
        for &id in &order {
            let Some(ann) = store.get(id) else { continue };
            let label = match ann.kind {
                AnnotationKind::General => {
                    let n = general;
                    general += 1;
                    n.to_string()
                }
                AnnotationKind::Actionable => {
                    let n = actionable;
                    actionable += 1;
                    format!("{}{}", ann.kind.label_prefix(), n)
                }
            };
            labels.insert(id, label);
        }

        Self {
            order,
            labels,
            revision: store.revision(),
        }
    }

    /// Whether this view still matches the store it was derived from.
    pub fn is_current(&self, store: &AnnotationStore) -> bool {
        self.revision == store.revision()
    }

    /// Full draw order (unfiltered), topmost last.
    pub fn order(&self) -> &[u64] {
        &self.order
    }

    pub fn label(&self, id: u64) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    /// Ids visible under `filter`, in draw order. Labels are untouched by the
    /// filter; they come from the full-set walk in `derive`.
    pub fn visible(&self, store: &AnnotationStore, filter: Filter) -> Vec<u64> {
        self.order
            .iter()
            .copied()
            .filter(|&id| store.get(id).is_some_and(|a| filter.admits(a.kind)))
            .collect()
    }
}
