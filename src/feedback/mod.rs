pub mod classifier;
pub mod engine;
pub mod prompt;
pub mod validator;

pub use engine::{EngineSettings, FeedbackEngine, FeedbackResult};
