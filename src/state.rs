use crate::feedback::FeedbackEngine;
use crate::middleware::RateLimiter;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: FeedbackEngine,
    pub limiter: RateLimiter,
}

pub type SharedState = Arc<AppState>;
