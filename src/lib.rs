// ABOUTME: Root module for quotagate - adaptive rate limiting for API clients.
// ABOUTME: Re-exports the scheduler, its configuration, and the HTTP client.

pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod scheduler;

pub use client::RateLimitedClient;
pub use config::SchedulerConfig;
pub use error::{ClientError, SchedulerError};
pub use scheduler::Scheduler;
