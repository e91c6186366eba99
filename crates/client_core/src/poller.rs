//! Timer-driven queue position checks.
//!
//! Each `start` hands out a new generation number. Every tick, and every
//! mutation a tick makes, is conditioned on that generation still being
//! current, so a timer that outlives `stop` can never touch ride state.

use std::{
    future::Future,
    ops::ControlFlow,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use reqwest::StatusCode;
use shared::{
    domain::{CompletionCode, DriverId, RideId},
    protocol::QueuePositionResponse,
};
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::debug;

use crate::{store::Ride, transport::ApiReply};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
    Stopped,
    Resolved,
}

/// A queue position reply, already branched on its status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollReply {
    Position(u32),
    Assignment {
        ride_id: Option<RideId>,
        driver: DriverId,
        code: Option<CompletionCode>,
    },
}

/// Result of a single poll as seen by the caller of `poll_once`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// No queued ride; nothing was sent.
    NotQueued,
    StillQueued { position: u32, changed: bool },
    Assigned(Ride),
    /// Transport or parse failure. Logged, never surfaced to the rider.
    Failed(String),
}

/// 202 means a driver was found, 200 carries the current position.
pub fn interpret_poll_reply(reply: &ApiReply) -> Result<PollReply, String> {
    let assigned = match reply.status {
        StatusCode::ACCEPTED => true,
        StatusCode::OK => false,
        status => {
            return Err(reply
                .server_message()
                .unwrap_or_else(|| format!("unexpected queue status {}", status.as_u16())))
        }
    };
    let body: QueuePositionResponse = reply
        .json()
        .map_err(|err| format!("unreadable queue reply: {err}"))?;

    if assigned {
        let driver = body
            .driver
            .ok_or_else(|| "assignment reply without a driver".to_string())?;
        return Ok(PollReply::Assignment {
            ride_id: body.ride_id,
            driver,
            code: body.ride_code,
        });
    }

    body.queue_position
        .map(|position| PollReply::Position(position.max(1)))
        .ok_or_else(|| "queue reply without a position".to_string())
}

pub struct QueuePoller {
    interval: Duration,
    state: PollerState,
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl QueuePoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: PollerState::Idle,
            generation: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Spawns the timer. The first tick fires one interval from now. Returns
    /// `None` when a timer is already running.
    pub fn start<F, Fut>(&mut self, mut tick: F) -> Option<u64>
    where
        F: FnMut(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        if self.state == PollerState::Polling {
            return None;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let period = self.interval;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if current.load(Ordering::SeqCst) != generation {
                    debug!(generation, "queue: stale timer exiting");
                    break;
                }
                if tick(generation).await.is_break() {
                    break;
                }
            }
        }));
        self.state = PollerState::Polling;
        Some(generation)
    }

    /// Invalidates the running generation and aborts the timer. The caller
    /// awaits the returned handle to be sure no tick is still executing.
    /// Calling this again is a no-op.
    pub fn stop(&mut self) -> Option<JoinHandle<()>> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if self.state == PollerState::Polling {
            self.state = PollerState::Stopped;
        }
        let handle = self.task.take();
        if let Some(handle) = &handle {
            handle.abort();
        }
        handle
    }

    /// Called when an assignment has been applied. May run on the timer
    /// task itself, so the task is detached rather than awaited; it exits
    /// because its generation is no longer current.
    pub fn mark_resolved(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.task = None;
        self.state = PollerState::Resolved;
    }
}

impl Drop for QueuePoller {
    fn drop(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;
