pub mod client;
pub mod tracker;

pub use client::{GeminiClient, GeminiConfig, TextGenerator};
pub use tracker::{DEFAULT_MAX_CONCURRENT, DEFAULT_RETENTION, GenerationTracker};
