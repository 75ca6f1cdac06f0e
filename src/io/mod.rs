// file: src/io/mod.rs
// description: persistence module exports
// reference: internal module structure

pub mod json;
pub mod matrix_serde;

pub use json::{ClassDataset, Envelope, JsonStore, MatrixSet, SingleMatrix, TrialSet, kinds};
