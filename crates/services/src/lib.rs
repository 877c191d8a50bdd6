#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod generation;
pub mod quiz;

pub use quiz_core::Clock;

pub use app_services::{AppServices, ServiceSettings};
pub use error::{AppServicesError, GenerationError, SessionError};
pub use generation::{GeminiClient, GeminiConfig, GenerationTracker, TextGenerator};
pub use quiz::{NextQuestionView, PageView, QuizSessionService};
