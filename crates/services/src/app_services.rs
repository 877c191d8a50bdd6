use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use quiz_core::prompt::{DEFAULT_FEATURES, MAX_QUESTIONS_PER_PROMPT, ParameterError, PromptFeature};
use storage::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::generation::{
    DEFAULT_MAX_CONCURRENT, DEFAULT_RETENTION, GeminiClient, GenerationTracker, TextGenerator,
};
use crate::quiz::{DEFAULT_BATCH_SIZE, QuizSessionService};

/// How long a session survives without a request.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Tunables for the generation pipeline and session storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub batch_size: usize,
    pub max_generations: usize,
    pub retention: Duration,
    pub session_ttl: Duration,
    /// Instruction blocks included in every generation prompt.
    pub features: Vec<PromptFeature>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_generations: DEFAULT_MAX_CONCURRENT,
            retention: DEFAULT_RETENTION,
            session_ttl: DEFAULT_SESSION_TTL,
            features: DEFAULT_FEATURES.to_vec(),
        }
    }
}

impl ServiceSettings {
    /// # Errors
    ///
    /// Returns `AppServicesError` for a batch size outside `1..=20` or an
    /// empty worker pool.
    pub fn validate(&self) -> Result<(), AppServicesError> {
        if !(1..=MAX_QUESTIONS_PER_PROMPT).contains(&self.batch_size) {
            return Err(AppServicesError::BatchSize(ParameterError::Count(
                self.batch_size,
            )));
        }
        if self.max_generations == 0 {
            return Err(AppServicesError::NoWorkers);
        }
        Ok(())
    }
}

/// Assembles app-facing services over one storage and one text generator.
#[derive(Clone)]
pub struct AppServices {
    tracker: GenerationTracker,
    quiz: Arc<QuizSessionService>,
}

impl AppServices {
    /// Build services with the Gemini client configured from the environment.
    ///
    /// A missing API key is not fatal: generation tasks fail with a visible
    /// message while every other endpoint keeps working.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if `settings` are invalid.
    pub fn from_env(settings: ServiceSettings) -> Result<Self, AppServicesError> {
        let client = GeminiClient::from_env();
        if client.enabled() {
            info!("question generation enabled");
        } else {
            warn!("GOOGLE_API_KEY is not set; question generation is disabled");
        }
        let clock = Clock::default();
        Self::new(
            Storage::in_memory_with_ttl(clock, settings.session_ttl),
            Arc::new(client),
            clock,
            settings,
        )
    }

    /// # Errors
    ///
    /// Returns `AppServicesError` if `settings` are invalid.
    pub fn new(
        storage: Storage,
        generator: Arc<dyn TextGenerator>,
        clock: Clock,
        settings: ServiceSettings,
    ) -> Result<Self, AppServicesError> {
        settings.validate()?;

        let tracker = GenerationTracker::new(generator)
            .with_clock(clock)
            .with_max_concurrent(settings.max_generations)
            .with_retention(settings.retention)
            .with_features(&settings.features);
        let quiz = Arc::new(
            QuizSessionService::new(tracker.clone(), Arc::clone(&storage.sessions))
                .with_batch_size(settings.batch_size),
        );

        Ok(Self { tracker, quiz })
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizSessionService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn tracker(&self) -> &GenerationTracker {
        &self.tracker
    }
}
