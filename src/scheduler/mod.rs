// ABOUTME: Scheduler module - sliding-window admission control for API calls.
// ABOUTME: Contains quota windows, limit profiles, header feedback, and the drain loop.

mod feedback;
mod profile;
mod scheduler;
mod window;

pub use feedback::{
    HeaderSource, LIMIT_HEADER, REMAINING_HEADER, RESET_HEADER, RateLimitSignals, reset_delay,
};
pub use profile::{ELEVATED_LIMIT_THRESHOLD, LimitProfile};
pub use scheduler::{BoxedTask, Scheduler, TaskHandle, erase_task};
pub use window::{MINUTE, QuotaWindow, SECOND};

#[cfg(test)]
mod feedback_test;
