pub mod view;
pub mod workflow;

pub use view::{NextQuestionView, PageView};
pub use workflow::{DEFAULT_BATCH_SIZE, QuizSessionService};
