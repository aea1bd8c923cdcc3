//! Reference checking for versioned life-cycle-assessment datasets.
//!
//! Datasets point at each other by `(id, type, version)` instead of
//! embedding one another. This crate finds those references in a dataset
//! document, resolves them against injected entity stores, classifies each
//! one, and maps failures onto editing sections. It also models the
//! exchange graph of a life-cycle model and validates its edges.

pub mod config;
pub mod graph;
pub mod models;
pub mod resolver;
pub mod store;
pub mod validation;
