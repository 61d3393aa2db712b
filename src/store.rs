//! Owned collection of annotation records.
//!
//! The store is the single writer for annotations in a session. Ids are
//! assigned monotonically and never reused, even after deletion or a bulk
//! clear. Every mutation bumps a revision counter; derived views compare
//! revisions instead of hooking into any render cycle.

use crate::annotation::{Annotation, AnnotationKind, ElementType, Point};

#[derive(Debug)]
pub struct AnnotationStore {
    items: Vec<Annotation>,
    image_width: f32,
    image_height: f32,
    next_id: u64,
    revision: u64,
}

impl AnnotationStore {
    pub fn new(image_width: f32, image_height: f32) -> Self {
        Self {
            items: Vec::new(),
            image_width,
            image_height,
            next_id: 1,
            revision: 0,
        }
    }

    /// Switch to a new image: drops every annotation but keeps the id counter
    /// running so ids stay unique for the whole session.
    pub fn reset_image(&mut self, image_width: f32, image_height: f32) {
        self.items.clear();
        self.image_width = image_width;
        self.image_height = image_height;
        self.revision += 1;
    }

    pub fn image_size(&self) -> (f32, f32) {
        (self.image_width, self.image_height)
    }

    /// Hand out a fresh id. Used by the detection normalizer so batch entries
    /// get ids from the same sequence as manual ones.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add(
        &mut self,
        point: Point,
        description: String,
        element_type: ElementType,
        kind: AnnotationKind,
    ) -> u64 {
        let id = self.next_id();
        self.items.push(Annotation {
            id,
            point: point.clamped(self.image_width, self.image_height),
            description,
            element_type,
            kind,
        });
        self.revision += 1;
        id
    }

    /// Replace the whole set with a normalized detection batch. All-or-nothing:
    /// the caller only reaches this with a fully normalized batch in hand.
    pub fn replace_all(&mut self, batch: Vec<Annotation>) {
        self.items = batch;
        self.revision += 1;
    }

    /// Adopt previously persisted annotations, advancing the id counter past
    /// the highest adopted id.
    pub fn adopt(&mut self, annotations: Vec<Annotation>) {
        if let Some(max) = annotations.iter().map(|a| a.id).max() {
            self.next_id = self.next_id.max(max + 1);
        }
        self.items = annotations;
        for a in &mut self.items {
            a.point = a.point.clamped(self.image_width, self.image_height);
        }
        self.revision += 1;
    }

    pub fn update_point(&mut self, id: u64, point: Point) -> bool {
        let (w, h) = (self.image_width, self.image_height);
        match self.items.iter_mut().find(|a| a.id == id) {
            Some(a) => {
                a.point = point.clamped(w, h);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn update_description(&mut self, id: u64, description: &str) -> bool {
        match self.items.iter_mut().find(|a| a.id == id) {
            Some(a) => {
                a.description = description.to_owned();
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|a| a.id != id);
        if self.items.len() != before {
            self.revision += 1;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items.clear();
            self.revision += 1;
        }
    }

    pub fn get(&self, id: u64) -> Option<&Annotation> {
        self.items.iter().find(|a| a.id == id)
    }

    pub fn all(&self) -> &[Annotation] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Monotonic change counter. Any cached derivation (ordering, numbering)
    /// is stale once this moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
