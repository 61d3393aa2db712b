//! screenmark: annotate UI screenshots with numbered markers.
//!
//! The engine lives in the leaf modules (`geometry`, `detect`, `store`,
//! `ordering`, `interaction`, `render`); `app` is the eframe shell gluing
//! them to panels, dialogs, and the detection worker.

pub mod annotation;
pub mod app;
pub mod credential;
pub mod detect;
pub mod geometry;
pub mod interaction;
pub mod ordering;
pub mod render;
pub mod sidecar;
pub mod store;
