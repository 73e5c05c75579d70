pub mod behavior;

pub use behavior::{BehaviorPayload, BehaviorRecord, Direction, GoalType, Guidelines, Scheme};
