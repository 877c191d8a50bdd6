mod generation;
mod ids;
mod metrics;
mod question;
mod session;

pub use ids::{ParseIdError, SessionId, TaskId};

pub use generation::{GenerationStage, GenerationStatus, GenerationTask};
pub use metrics::{Metrics, MetricsSnapshot};
pub use question::{
    AnswerOption, AnswerType, CLUE_COUNT, DEFAULT_DIFFICULTY, MAX_DIFFICULTY, MIN_DIFFICULTY,
    Metadata, Question, QuestionError, Reference, ReferenceKind,
};
pub use session::{AdvanceState, AnswerOutcome, AnswerState, QuizSession, SessionStateError};
