// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use quotagate::prelude::*;` to get started quickly.

pub use crate::client::RateLimitedClient;
pub use crate::config::{SchedulerConfig, SchedulerConfigBuilder};
pub use crate::error::{ClientError, SchedulerError};
pub use crate::scheduler::{
    BoxedTask, HeaderSource, LimitProfile, RateLimitSignals, Scheduler, TaskHandle, erase_task,
};
