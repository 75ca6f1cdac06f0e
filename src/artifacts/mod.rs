// file: src/artifacts/mod.rs
// description: signal artifact removal module exports

pub mod asr;

pub use asr::{Asr, DEFAULT_REJECTION_LIMIT};
