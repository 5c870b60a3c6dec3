//! # autodev_learning
//!
//! User feedback about agent output, the lessons drawn from it, and
//! prompt rewrites that apply those lessons. Records are kept as JSON files
//! in the configured feedback directory.

pub mod error;
pub mod feedback;
pub mod models;
pub mod store;
pub mod system;

pub use error::{LearningError, LearningResult};
pub use feedback::{parse_learning_points, FeedbackManager, FEEDBACK_FILE, LEARNING_FILE};
pub use models::{
    FeedbackAnalysis, FeedbackOutcome, FeedbackRef, FeedbackSubmission, ImplementationStatus,
    ImprovementArea, LearningRecord,
};
pub use store::JsonStore;
pub use system::InteractiveLearningSystem;
