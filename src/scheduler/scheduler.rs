// ABOUTME: Sliding-window task scheduler gating outbound calls on two quotas.
// ABOUTME: Single drain loop admits FIFO batches; server feedback retunes limits.

use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::feedback::{HeaderSource, RateLimitSignals, reset_delay};
use super::profile::LimitProfile;
use super::window::{MINUTE, QuotaWindow, SECOND};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;

/// A type-erased unit of work, as accepted by [`Scheduler::submit_erased`].
pub type BoxedTask<T> = Box<dyn FnOnce() -> BoxFuture<'static, T> + Send>;

/// A queued work item with its result channel already bound.
type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Erase a task so it can cross a boundary that only carries `dyn Any`.
pub fn erase_task<F, Fut>(task: F) -> Box<dyn Any + Send>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    let boxed: BoxedTask<Fut::Output> = Box::new(move || task().boxed());
    Box::new(boxed)
}

/// Future resolving to a submitted task's own output.
///
/// Resolves to `Err(SchedulerError::TaskDropped)` only if the task never
/// produced an outcome (it panicked, or the runtime shut down first).
#[must_use = "a TaskHandle does nothing unless awaited"]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, SchedulerError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| SchedulerError::TaskDropped))
    }
}

/// Mutable scheduler state, protected by a single mutex.
struct SchedulerState {
    queue: VecDeque<Job>,
    second: QuotaWindow,
    minute: QuotaWindow,
    limits: LimitProfile,
    cooldown_until: Option<Instant>,
    draining: bool,
}

impl SchedulerState {
    /// How long until the saturated window(s) free a slot.
    fn quota_wait(&self, now: Instant) -> Duration {
        [
            (&self.second, self.limits.per_second),
            (&self.minute, self.limits.per_minute),
        ]
        .into_iter()
        .filter(|(window, ceiling)| window.headroom(*ceiling) <= 0)
        .filter_map(|(window, _)| window.next_expiry())
        .max()
        .map(|at| at.saturating_duration_since(now))
        .unwrap_or_default()
    }
}

struct Shared {
    state: Mutex<SchedulerState>,
    config: SchedulerConfig,
}

/// What the drain loop should do next.
enum Step {
    Idle,
    Wait(Duration),
    Launch(Vec<Job>),
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        // State stays consistent across a panic: no method panics mid-update.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make one admission decision against a single `now` snapshot.
    fn next_step(&self) -> Step {
        let mut state = self.lock();

        if state.queue.is_empty() {
            state.draining = false;
            return Step::Idle;
        }

        let now = Instant::now();
        if let Some(until) = state.cooldown_until.filter(|until| *until > now) {
            return Step::Wait(until - now);
        }

        state.second.prune(now);
        state.minute.prune(now);

        let allowed = state
            .second
            .headroom(state.limits.per_second)
            .min(state.minute.headroom(state.limits.per_minute))
            .min(state.queue.len() as i64);

        if allowed <= 0 {
            let wait = state.quota_wait(now).max(self.config.min_wait());
            tracing::debug!(
                queued = state.queue.len(),
                wait_ms = wait.as_millis() as u64,
                "quota exhausted, waiting"
            );
            return Step::Wait(wait);
        }

        let allowed = allowed as usize;
        let batch: Vec<Job> = state.queue.drain(..allowed).collect();
        state.second.record(now, allowed);
        state.minute.record(now, allowed);

        tracing::debug!(
            admitted = allowed,
            queued = state.queue.len(),
            "admitting batch"
        );
        Step::Launch(batch)
    }
}

/// Clears the draining flag if the drain loop is torn down mid-flight,
/// including when the runtime drops it before its first poll.
struct DrainGuard {
    shared: Arc<Shared>,
    armed: bool,
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        if self.armed {
            self.shared.lock().draining = false;
        }
    }
}

async fn drain(mut guard: DrainGuard) {
    loop {
        match guard.shared.next_step() {
            Step::Idle => {
                // next_step already cleared the flag under the lock.
                guard.armed = false;
                return;
            }
            Step::Wait(wait) => tokio::time::sleep(wait).await,
            Step::Launch(batch) => {
                let running: Vec<_> = batch.into_iter().map(|job| tokio::spawn(job())).collect();
                for result in futures::future::join_all(running).await {
                    if let Err(err) = result {
                        tracing::warn!(error = %err, "scheduled task did not complete");
                    }
                }
            }
        }
    }
}

/// Client-side gatekeeper for an API enforcing per-second and per-minute quotas.
///
/// Work items are admitted in submission order, in batches no larger than the
/// headroom left in both sliding windows. Each batch runs concurrently and is
/// awaited in full before the next admission decision. Response headers fed to
/// [`observe`](Self::observe) retune the ceilings and impose cooldowns.
///
/// Cloning is cheap and clones share state. Separate instances created with
/// [`new`](Self::new) are fully independent.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Scheduler")
            .field("limits", &state.limits)
            .field("queued", &state.queue.len())
            .field("cooldown_until", &state.cooldown_until)
            .field("draining", &state.draining)
            .finish()
    }
}

impl Scheduler {
    /// Create a scheduler with the default (anonymous) ceilings.
    pub fn new() -> Self {
        Self::from_valid_config(SchedulerConfig::default())
    }

    /// Create a scheduler from a custom configuration.
    pub fn with_config(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: SchedulerConfig) -> Self {
        let state = SchedulerState {
            queue: VecDeque::new(),
            second: QuotaWindow::new(SECOND),
            minute: QuotaWindow::new(MINUTE),
            limits: config.initial_limits,
            cooldown_until: None,
            draining: false,
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                config,
            }),
        }
    }

    /// Enqueue a task and return a handle to its eventual output.
    ///
    /// The task is not called until it is admitted. Its output, success or
    /// failure, is delivered through the handle unchanged.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime and no drain loop is active.
    /// The task is not enqueued in that case and the scheduler stays usable.
    pub fn submit<F, Fut>(&self, task: F) -> TaskHandle<Fut::Output>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            async move {
                // The caller may have dropped its handle; the task still ran.
                let _ = tx.send(task().await);
            }
            .boxed()
        });
        self.enqueue(job);
        TaskHandle { rx }
    }

    /// Enqueue a type-erased task.
    ///
    /// Returns `Err(SchedulerError::InvalidTask)` immediately, without
    /// touching the queue, if `task` is not a [`BoxedTask<T>`].
    pub fn submit_erased<T: Send + 'static>(
        &self,
        task: Box<dyn Any + Send>,
    ) -> Result<TaskHandle<T>, SchedulerError> {
        let task = task
            .downcast::<BoxedTask<T>>()
            .map_err(|_| SchedulerError::InvalidTask {
                expected: std::any::type_name::<BoxedTask<T>>(),
            })?;
        Ok(self.submit(*task))
    }

    fn enqueue(&self, job: Job) {
        let runtime = tokio::runtime::Handle::try_current();

        let mut state = self.shared.lock();
        if state.draining {
            state.queue.push_back(job);
            return;
        }

        let runtime = match runtime {
            Ok(runtime) => runtime,
            Err(err) => {
                drop(state);
                panic!("Scheduler::submit needs a Tokio runtime to start draining: {err}");
            }
        };

        state.queue.push_back(job);
        state.draining = true;
        drop(state);

        runtime.spawn(drain(DrainGuard {
            shared: Arc::clone(&self.shared),
            armed: true,
        }));
    }

    /// Retune from a response's rate-limit headers.
    pub fn observe<H: HeaderSource + ?Sized>(&self, headers: &H) {
        self.observe_signals(&RateLimitSignals::from_headers(headers));
    }

    /// Retune from already-extracted rate-limit signals.
    ///
    /// A positive reported ceiling selects a known profile, minus safety
    /// margins. A low remaining count turns the reset hint into a cooldown.
    /// Missing or malformed values leave state untouched.
    pub fn observe_signals(&self, signals: &RateLimitSignals) {
        if let Some(reported) = signals.limit.filter(|limit| *limit > 0.0) {
            let retuned = LimitProfile::retuned_for(reported);
            let (previous, limits) = {
                let mut state = self.shared.lock();
                let previous = state.limits;
                if retuned.per_minute > 0 {
                    state.limits = retuned;
                } else {
                    state.limits.per_second = retuned.per_second;
                }
                (previous, state.limits)
            };
            if previous != limits {
                tracing::info!(
                    reported,
                    per_second = limits.per_second,
                    per_minute = limits.per_minute,
                    "retuned rate limits"
                );
            }
        }

        let threshold = f64::from(self.shared.config.remaining_threshold);
        if let Some(remaining) = signals.remaining.filter(|r| *r <= threshold) {
            let delay = signals
                .reset
                .as_deref()
                .and_then(|raw| reset_delay(raw, Utc::now()));

            match delay {
                Some(delay) if !delay.is_zero() => {
                    self.apply_cooldown(delay.saturating_add(self.shared.config.cooldown_padding()));
                }
                _ => tracing::debug!(
                    remaining,
                    reset = ?signals.reset,
                    "low remaining quota without a usable reset hint"
                ),
            }
        }
    }

    /// Pause admissions until `now + duration`.
    ///
    /// A zero duration, or one ending before the current cooldown, is a no-op.
    /// So is a duration too large to represent as a deadline; it is treated as
    /// a malformed signal and the prior cooldown is kept.
    pub fn apply_cooldown(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }

        let Some(until) = Instant::now().checked_add(duration) else {
            tracing::debug!(?duration, "ignoring cooldown beyond the representable range");
            return;
        };
        let mut state = self.shared.lock();
        if state.cooldown_until.is_none_or(|current| until > current) {
            state.cooldown_until = Some(until);
            tracing::warn!(
                cooldown_ms = duration.as_millis() as u64,
                queued = state.queue.len(),
                "rate limit cooldown in effect"
            );
        }
    }

    /// Overwrite the ceilings directly. Zero fields are ignored.
    pub fn update_limits(&self, limits: LimitProfile) {
        let mut state = self.shared.lock();
        if limits.per_second > 0 {
            state.limits.per_second = limits.per_second;
        }
        if limits.per_minute > 0 {
            state.limits.per_minute = limits.per_minute;
        }
    }

    /// Current ceilings.
    pub fn limits(&self) -> LimitProfile {
        self.shared.lock().limits
    }

    /// Number of items waiting for admission.
    pub fn queue_len(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Admissions currently inside the (second, minute) windows.
    pub fn window_counts(&self) -> (usize, usize) {
        let now = Instant::now();
        let mut state = self.shared.lock();
        state.second.prune(now);
        state.minute.prune(now);
        (state.second.len(), state.minute.len())
    }

    /// Time left on the active cooldown, if any.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        let now = Instant::now();
        self.shared
            .lock()
            .cooldown_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Returns true while a drain loop is active.
    pub fn is_draining(&self) -> bool {
        self.shared.lock().draining
    }
}
