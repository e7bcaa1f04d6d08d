// Core matchmaking exports
pub mod distance;
pub mod engine;
pub mod error;
pub mod filters;
pub mod hooks;
pub mod locks;
pub mod matcher;
pub mod queue;
pub mod ranker;

pub use distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box};
pub use engine::PairingEngine;
pub use error::MatchError;
pub use filters::{accepts_requester, filter_candidates};
pub use hooks::{PairingHooks, PairingListener};
pub use locks::UserLocks;
pub use matcher::{MatchOutcome, MatchStats, Matcher, MatcherSettings};
pub use queue::MatchQueue;
pub use ranker::{select_nearest, Selection};
