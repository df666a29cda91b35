mod durations;
mod planner;

pub use durations::RoundDurations;
pub use planner::{Decision, TransitionPlanner, WaitReason};
