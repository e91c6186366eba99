use std::{
    ops::ControlFlow,
    sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError},
    time::Duration,
};

use reqwest::StatusCode;
use shared::{
    domain::{CompletionCode, DriverId, RideId, RideStatus, RiderId, Role},
    protocol::{EditRideRequest, LocationSearchResponse, LocationSuggestion, RideRecord, RideRecords},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub mod cancellation;
pub mod completion;
pub mod error;
pub mod poller;
pub mod session;
pub mod store;
pub mod submitter;
pub mod transport;

pub use cancellation::{CancellationDraft, CancellationFlow, ConfirmedCancellation};
pub use completion::{CodeEntry, CompletionCodeVerifier};
pub use error::{Busy, LifecycleError, LifecycleResult, Operation};
pub use poller::{PollOutcome, PollerState, QueuePoller, DEFAULT_POLL_INTERVAL};
pub use session::{MemoryResumeStore, ResumePointers, ResumeStore, SessionContext};
pub use store::{Ride, RidePatch, RideStateStore};
pub use submitter::{RideRequest, RideSubmitter, SubmitOutcome};
pub use transport::{ApiReply, HttpRideApi, RideApi, TransportError};

use poller::{interpret_poll_reply, PollReply};

/// Address queries this short are answered locally with no suggestions.
pub const MIN_SUGGESTION_QUERY_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub poll_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RideEvent {
    Submitted(Ride),
    QueuePositionChanged { ride_id: RideId, position: u32 },
    /// Emitted once per ride, whether the driver came with the create reply
    /// or from a poll.
    DriverAssigned(Ride),
    TripStarted(Ride),
    /// Final snapshot of a completed or cancelled ride. Sent before the
    /// ride is cleared from the store.
    RideClosed(Ride),
    LeftQueue { ride_id: RideId },
    Restored(Ride),
}

#[derive(Default)]
struct CoordinatorState {
    store: RideStateStore,
    held_code: Option<CompletionCode>,
    assignment_notified: bool,
}

impl CoordinatorState {
    fn reset(&mut self) -> Option<Ride> {
        self.held_code = None;
        self.assignment_notified = false;
        self.store.clear()
    }
}

/// Single in-flight slot shared by every mutating operation.
#[derive(Default)]
struct InFlight {
    slot: StdMutex<Option<Operation>>,
}

struct InFlightGuard<'a> {
    slot: &'a StdMutex<Option<Operation>>,
}

impl InFlight {
    fn begin(&self, operation: Operation) -> LifecycleResult<InFlightGuard<'_>> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = *slot {
            return Err(LifecycleError::OperationInProgress(Busy::InFlight(running)));
        }
        *slot = Some(operation);
        Ok(InFlightGuard { slot: &self.slot })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// The only entry point the UI layer talks to. Owns the ride store, the
/// queue poller and the event channel; every state change goes through
/// here.
pub struct LifecycleCoordinator {
    api: Arc<dyn RideApi>,
    resume: Arc<dyn ResumeStore>,
    session: SessionContext,
    submitter: RideSubmitter,
    verifier: CompletionCodeVerifier,
    cancellation: CancellationFlow,
    state: Mutex<CoordinatorState>,
    poller: StdMutex<QueuePoller>,
    in_flight: InFlight,
    events: broadcast::Sender<RideEvent>,
}

impl LifecycleCoordinator {
    pub fn new(
        api: Arc<dyn RideApi>,
        resume: Arc<dyn ResumeStore>,
        session: SessionContext,
        config: CoordinatorConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            submitter: RideSubmitter::new(Arc::clone(&api)),
            verifier: CompletionCodeVerifier::new(Arc::clone(&api)),
            cancellation: CancellationFlow::new(Arc::clone(&api)),
            api,
            resume,
            session,
            state: Mutex::new(CoordinatorState::default()),
            poller: StdMutex::new(QueuePoller::new(config.poll_interval)),
            in_flight: InFlight::default(),
            events,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RideEvent> {
        self.events.subscribe()
    }

    pub async fn current(&self) -> Option<Ride> {
        self.state.lock().await.store.get().cloned()
    }

    pub async fn status(&self) -> Option<RideStatus> {
        self.state.lock().await.store.status()
    }

    pub fn poller_state(&self) -> PollerState {
        self.poller().state()
    }

    /// Submits a ride request. A queued ride starts the poller; an
    /// immediate assignment is announced right away.
    pub async fn create_ride(self: &Arc<Self>, request: RideRequest) -> LifecycleResult<Ride> {
        self.require_role(Role::Rider, "request a ride")?;
        let _guard = self.in_flight.begin(Operation::Submission)?;
        if let Some(status) = self.state.lock().await.store.active().map(|ride| ride.status) {
            return Err(LifecycleError::OperationInProgress(Busy::ActiveRide(status)));
        }

        let outcome = self
            .submitter
            .submit(&self.session.rider_id(), &request)
            .await?;

        let ride = {
            let mut state = self.state.lock().await;
            let (ride, held_code) = match outcome {
                SubmitOutcome::Assigned(ride) => (ride, None),
                SubmitOutcome::Queued { ride, held_code } => (ride, held_code),
            };
            let ride = state.store.insert(ride)?;
            state.held_code = held_code;
            state.assignment_notified = ride.status.holds_completion_code();
            ride
        };

        info!(ride_id = %ride.id, status = %ride.status, "ride: submitted");
        self.emit(RideEvent::Submitted(ride.clone()));
        if ride.status == RideStatus::Queued {
            self.spawn_poller();
        } else {
            self.emit(RideEvent::DriverAssigned(ride.clone()));
            self.persist_pointers(&ride).await;
        }
        Ok(ride)
    }

    pub async fn start_polling(self: &Arc<Self>) -> LifecycleResult<()> {
        if self.status().await != Some(RideStatus::Queued) {
            return Err(LifecycleError::invalid_transition(
                "polling needs a queued ride",
            ));
        }
        self.spawn_poller();
        Ok(())
    }

    /// Tears the timer down and waits until no tick can still run. Safe to
    /// call any number of times.
    pub async fn stop_polling(&self) {
        let handle = self.poller().stop();
        if let Some(handle) = handle {
            let _ = handle.await;
            debug!("queue: polling stopped");
        }
    }

    /// One position check. Does nothing, not even a request, unless the
    /// ride is queued.
    pub async fn poll_once(&self) -> LifecycleResult<PollOutcome> {
        let _guard = self.in_flight.begin(Operation::Polling)?;
        if self.status().await != Some(RideStatus::Queued) {
            return Ok(PollOutcome::NotQueued);
        }

        let outcome = match self.fetch_poll_reply().await {
            Ok(reply) => {
                let mut state = self.state.lock().await;
                let outcome = self.apply_poll_reply(&mut state, reply);
                if matches!(outcome, PollOutcome::Assigned(_)) {
                    self.poller().mark_resolved();
                }
                outcome
            }
            Err(reason) => {
                warn!(reason = reason.as_str(), "queue: poll failed");
                PollOutcome::Failed(reason)
            }
        };

        if let PollOutcome::Assigned(ride) = &outcome {
            self.persist_pointers(ride).await;
        }
        Ok(outcome)
    }

    /// Withdraws a queued ride. On any failure the ride stays queued and
    /// polling resumes.
    pub async fn leave_queue(self: &Arc<Self>) -> LifecycleResult<()> {
        self.require_role(Role::Rider, "leave the queue")?;
        let _guard = self.in_flight.begin(Operation::LeaveQueue)?;
        let ride = self.ride_in(&[RideStatus::Queued], "leave the queue").await?;

        self.stop_polling().await;
        let deleted = match self.api.delete_ride(ride.id).await {
            Ok(reply) => reply.into_success("leaving the queue failed").map(drop),
            Err(err) => Err(err.into()),
        };
        if let Err(err) = deleted {
            warn!(ride_id = %ride.id, error = %err, "queue: leave failed; ride still queued");
            self.spawn_poller();
            return Err(err);
        }

        self.state.lock().await.reset();
        self.clear_pointers().await;
        info!(ride_id = %ride.id, "queue: left");
        self.emit(RideEvent::LeftQueue { ride_id: ride.id });
        Ok(())
    }

    /// Driver side of the handshake. A wrong code changes nothing; the ride
    /// closes only once the ride service has acknowledged completion.
    pub async fn verify_completion(&self, entered: &str) -> LifecycleResult<Ride> {
        self.require_role(Role::Driver, "verify a completion code")?;
        let _guard = self.in_flight.begin(Operation::Verification)?;
        let ride = self
            .ride_in(
                &[RideStatus::Assigned, RideStatus::InProgress],
                "complete the ride",
            )
            .await?;

        CompletionCodeVerifier::check(ride.completion_code.as_ref(), entered)?;
        self.verifier.confirm(ride.id).await?;
        self.close_ride(RidePatch::completed()).await
    }

    pub async fn cancel(&self, cancellation: &ConfirmedCancellation) -> LifecycleResult<Ride> {
        self.require_role(Role::Rider, "cancel a ride")?;
        let _guard = self.in_flight.begin(Operation::Cancellation)?;
        let ride = self
            .ride_in(
                &[RideStatus::Assigned, RideStatus::InProgress],
                "cancel; a queued ride leaves the queue instead",
            )
            .await?;

        self.cancellation.submit(ride.id, cancellation).await?;
        self.close_ride(RidePatch::cancelled(cancellation.text()))
            .await
    }

    pub async fn start_trip(&self) -> LifecycleResult<Ride> {
        self.require_role(Role::Driver, "start a trip")?;
        let _guard = self.in_flight.begin(Operation::TripStart)?;
        let ride = self.ride_in(&[RideStatus::Assigned], "start the trip").await?;

        self.api
            .edit_ride(ride.id, &EditRideRequest::status(RideStatus::InProgress))
            .await?
            .into_success("starting the trip failed")?;

        let ride = self.state.lock().await.store.set(RidePatch::in_progress())?;
        info!(ride_id = %ride.id, "trip: started");
        self.emit(RideEvent::TripStarted(ride.clone()));
        Ok(ride)
    }

    /// Looks up the ride this driver is currently carrying. `None` when the
    /// ride service has nothing assigned.
    pub async fn load_driver_ride(&self) -> LifecycleResult<Option<Ride>> {
        self.require_role(Role::Driver, "load a driver ride")?;
        let _guard = self.in_flight.begin(Operation::Lookup)?;
        if let Some(ride) = self.state.lock().await.store.active().cloned() {
            return Ok(Some(ride));
        }

        let driver = self.session.driver_id();
        let reply = self
            .api
            .fetch_driver_ride(&driver, RideStatus::InProgress)
            .await?;
        if reply.status == StatusCode::NOT_FOUND {
            debug!(driver = %driver, "trip: no ride assigned");
            return Ok(None);
        }
        let reply = reply.into_success("loading the assigned ride failed")?;
        let Some(record) = parse_records(&reply)?.into_first() else {
            return Ok(None);
        };

        let status = match record.status {
            Some(RideStatus::Assigned) => RideStatus::Assigned,
            _ => RideStatus::InProgress,
        };
        let code = record.ride_code.clone().ok_or_else(|| {
            LifecycleError::rejected(
                reply.status.as_u16(),
                "assigned ride has no completion code",
            )
        })?;
        let ride = ride_from_record(record, status, Some(driver), Some(code))?;
        self.restore(ride).await.map(Some)
    }

    /// Brings a rider back to an assigned ride after a restart, using the
    /// persisted resume pointers. Stale pointers are dropped. A ride that is
    /// already held is refreshed from the ride service instead.
    pub async fn resume(&self) -> LifecycleResult<Option<Ride>> {
        let _guard = self.in_flight.begin(Operation::Lookup)?;
        if self.state.lock().await.store.active().is_some() {
            return self.refresh_active().await;
        }
        if self.session.role != Role::Rider {
            return Ok(None);
        }

        let pointers = match self.resume.load_pointers().await {
            Ok(pointers) => pointers,
            Err(err) => {
                warn!(error = %err, "session: unreadable resume pointers");
                return Ok(None);
            }
        };
        let Some(ride_id) = pointers.ride_id else {
            return Ok(None);
        };

        let reply = self.api.fetch_ride(ride_id).await?;
        if reply.status == StatusCode::NOT_FOUND {
            info!(ride_id = %ride_id, "session: resumed ride no longer exists");
            self.clear_pointers().await;
            return Ok(None);
        }
        let reply = reply.into_success("loading the ride failed")?;
        let record = parse_records(&reply)?.into_first().unwrap_or_default();

        let status = match record.status {
            Some(status) if status.holds_completion_code() => status,
            other => {
                info!(ride_id = %ride_id, status = ?other, "session: resumed ride is no longer active");
                self.clear_pointers().await;
                return Ok(None);
            }
        };
        let driver = pointers.driver_name.or_else(|| record.driver.clone());
        let code = pointers.ride_code.or_else(|| record.ride_code.clone());
        if driver.is_none() || code.is_none() {
            warn!(ride_id = %ride_id, "session: resume pointers incomplete");
            self.clear_pointers().await;
            return Ok(None);
        }

        let mut record = record;
        record.ride_id = Some(ride_id);
        record.rider.get_or_insert_with(|| self.session.rider_id());
        let ride = ride_from_record(record, status, driver, code)?;
        self.restore(ride).await.map(Some)
    }

    /// Re-reads the held ride from the ride service and applies what the
    /// other side did to it: a started trip moves it to `InProgress`, a
    /// completed or cancelled ride is closed. A queued ride is left to the
    /// poller. Returns the ride still held afterwards.
    pub async fn refresh(&self) -> LifecycleResult<Option<Ride>> {
        let _guard = self.in_flight.begin(Operation::Lookup)?;
        self.refresh_active().await
    }

    /// Pickup, dropoff and time for the ride detail view. Read-only.
    pub async fn ride_details(&self, ride_id: RideId) -> LifecycleResult<RideRecord> {
        let reply = self
            .api
            .fetch_ride(ride_id)
            .await?
            .into_success("loading the ride failed")?;
        parse_records(&reply)?
            .into_first()
            .ok_or_else(|| LifecycleError::rejected(reply.status.as_u16(), "ride not found"))
    }

    pub async fn suggest_addresses(&self, query: &str) -> LifecycleResult<Vec<LocationSuggestion>> {
        let query = query.trim();
        if query.chars().count() < MIN_SUGGESTION_QUERY_LEN {
            return Ok(Vec::new());
        }
        let reply = self
            .api
            .search_locations(query)
            .await?
            .into_success("address search failed")?;
        let response: LocationSearchResponse = reply.json().map_err(|err| {
            LifecycleError::rejected(
                reply.status.as_u16(),
                format!("unexpected address search response: {err}"),
            )
        })?;
        Ok(response.predictions)
    }

    fn poller(&self) -> MutexGuard<'_, QueuePoller> {
        self.poller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: RideEvent) {
        let _ = self.events.send(event);
    }

    fn require_role(&self, role: Role, action: &str) -> LifecycleResult<()> {
        if self.session.role == role {
            Ok(())
        } else {
            Err(LifecycleError::invalid_transition(format!(
                "a {} cannot {action}",
                self.session.role.as_str()
            )))
        }
    }

    async fn ride_in(&self, allowed: &[RideStatus], action: &str) -> LifecycleResult<Ride> {
        let state = self.state.lock().await;
        match state.store.get() {
            Some(ride) if allowed.contains(&ride.status) => Ok(ride.clone()),
            Some(ride) => Err(LifecycleError::invalid_transition(format!(
                "cannot {action} while the ride is {}",
                ride.status
            ))),
            None => Err(LifecycleError::invalid_transition(format!(
                "cannot {action} without an active ride"
            ))),
        }
    }

    fn spawn_poller(self: &Arc<Self>) {
        let coordinator = Arc::downgrade(self);
        let mut poller = self.poller();
        let started = poller.start(move |generation| {
            let coordinator = coordinator.clone();
            async move {
                match coordinator.upgrade() {
                    Some(coordinator) => coordinator.run_tick(generation).await,
                    None => ControlFlow::Break(()),
                }
            }
        });
        let interval = poller.interval();
        drop(poller);
        if let Some(generation) = started {
            debug!(generation, interval_ms = interval.as_millis() as u64, "queue: polling started");
        }
    }

    async fn run_tick(&self, generation: u64) -> ControlFlow<()> {
        let Ok(_guard) = self.in_flight.begin(Operation::Polling) else {
            debug!(generation, "queue: tick skipped; operation in flight");
            return ControlFlow::Continue(());
        };
        if self.status().await != Some(RideStatus::Queued) {
            debug!(generation, "queue: ride no longer queued");
            return ControlFlow::Break(());
        }

        let fetched = self.fetch_poll_reply().await;
        let outcome = {
            let mut state = self.state.lock().await;
            if !self.poller().is_current(generation) {
                debug!(generation, "queue: dropping stale poll reply");
                return ControlFlow::Break(());
            }
            let reply = match fetched {
                Ok(reply) => reply,
                Err(reason) => {
                    warn!(generation, reason = reason.as_str(), "queue: poll failed");
                    return ControlFlow::Continue(());
                }
            };
            let outcome = self.apply_poll_reply(&mut state, reply);
            if matches!(outcome, PollOutcome::Assigned(_)) {
                self.poller().mark_resolved();
            }
            outcome
        };

        match outcome {
            PollOutcome::Assigned(ride) => {
                self.persist_pointers(&ride).await;
                ControlFlow::Break(())
            }
            PollOutcome::Failed(reason) => {
                warn!(generation, reason = reason.as_str(), "queue: poll reply not applied");
                ControlFlow::Continue(())
            }
            PollOutcome::NotQueued | PollOutcome::StillQueued { .. } => ControlFlow::Continue(()),
        }
    }

    async fn fetch_poll_reply(&self) -> Result<PollReply, String> {
        let reply = self
            .api
            .queue_position(&self.session.rider_id())
            .await
            .map_err(|err| err.to_string())?;
        interpret_poll_reply(&reply)
    }

    fn apply_poll_reply(&self, state: &mut CoordinatorState, reply: PollReply) -> PollOutcome {
        let Some(ride) = state.store.get() else {
            return PollOutcome::NotQueued;
        };
        if ride.status != RideStatus::Queued {
            debug!(ride_id = %ride.id, status = %ride.status, "queue: ignoring reply for ride that is not queued");
            return PollOutcome::NotQueued;
        }
        let ride_id = ride.id;

        match reply {
            PollReply::Position(position) => {
                let previous = ride.queue_position;
                if previous == Some(position) {
                    return PollOutcome::StillQueued {
                        position,
                        changed: false,
                    };
                }
                if previous.is_some_and(|previous| position > previous) {
                    debug!(ride_id = %ride_id, position, "queue: position moved back");
                }
                if let Err(err) = state.store.set(RidePatch::queue_position(position)) {
                    return PollOutcome::Failed(err.to_string());
                }
                debug!(ride_id = %ride_id, position, "queue: position changed");
                self.emit(RideEvent::QueuePositionChanged { ride_id, position });
                PollOutcome::StillQueued {
                    position,
                    changed: true,
                }
            }
            PollReply::Assignment {
                ride_id: reported,
                driver,
                code,
            } => {
                if let Some(reported) = reported.filter(|reported| *reported != ride_id) {
                    return PollOutcome::Failed(format!(
                        "assignment for ride {reported} while ride {ride_id} is queued"
                    ));
                }
                let Some(code) = code.or_else(|| state.held_code.clone()) else {
                    return PollOutcome::Failed("assignment without a completion code".into());
                };
                let ride = match state.store.set(RidePatch::assigned(driver, code)) {
                    Ok(ride) => ride,
                    Err(err) => return PollOutcome::Failed(err.to_string()),
                };
                state.held_code = None;
                if state.assignment_notified {
                    debug!(ride_id = %ride_id, "queue: assignment already announced");
                } else {
                    state.assignment_notified = true;
                    info!(ride_id = %ride_id, driver = ?ride.driver_id, "queue: driver assigned");
                    self.emit(RideEvent::DriverAssigned(ride.clone()));
                }
                PollOutcome::Assigned(ride)
            }
        }
    }

    async fn refresh_active(&self) -> LifecycleResult<Option<Ride>> {
        let Some(held) = self.state.lock().await.store.active().cloned() else {
            return Ok(None);
        };
        if held.status == RideStatus::Queued {
            return Ok(Some(held));
        }

        let reply = self.api.fetch_ride(held.id).await?;
        let reported = if reply.status == StatusCode::NOT_FOUND {
            info!(ride_id = %held.id, "ride: no longer exists on the ride service");
            Some(RideStatus::Cancelled)
        } else {
            let reply = reply.into_success("refreshing the ride failed")?;
            parse_records(&reply)?
                .into_first()
                .and_then(|record| record.status)
        };

        match reported {
            Some(status) if status.is_terminal() => {
                let patch = match status {
                    RideStatus::Completed => RidePatch::completed(),
                    _ => RidePatch::cancelled(""),
                };
                self.close_ride(patch).await?;
                Ok(None)
            }
            Some(RideStatus::InProgress) if held.status == RideStatus::Assigned => {
                let ride = self.state.lock().await.store.set(RidePatch::in_progress())?;
                info!(ride_id = %ride.id, "trip: started by driver");
                self.emit(RideEvent::TripStarted(ride.clone()));
                self.persist_pointers(&ride).await;
                Ok(Some(ride))
            }
            other => {
                debug!(ride_id = %held.id, local = %held.status, reported = ?other, "ride: refresh changed nothing");
                Ok(Some(held))
            }
        }
    }

    /// Applies a terminal patch, announces the final snapshot and clears the
    /// ride.
    async fn close_ride(&self, patch: RidePatch) -> LifecycleResult<Ride> {
        let closed = {
            let mut state = self.state.lock().await;
            let closed = state.store.set(patch)?;
            self.emit(RideEvent::RideClosed(closed.clone()));
            state.reset();
            closed
        };
        info!(ride_id = %closed.id, status = %closed.status, "ride: closed");
        self.clear_pointers().await;
        Ok(closed)
    }

    async fn restore(&self, ride: Ride) -> LifecycleResult<Ride> {
        let ride = {
            let mut state = self.state.lock().await;
            let ride = state.store.insert(ride)?;
            state.held_code = None;
            state.assignment_notified = true;
            ride
        };
        info!(ride_id = %ride.id, status = %ride.status, "ride: restored");
        self.emit(RideEvent::Restored(ride.clone()));
        Ok(ride)
    }

    async fn persist_pointers(&self, ride: &Ride) {
        if self.session.role != Role::Rider {
            return;
        }
        let pointers = ResumePointers {
            ride_id: Some(ride.id),
            driver_name: ride.driver_id.clone(),
            ride_code: ride.completion_code.clone(),
            in_progress: ride.status == RideStatus::InProgress,
        };
        if let Err(err) = self.resume.save_pointers(&pointers).await {
            warn!(ride_id = %ride.id, error = %err, "session: failed to persist resume pointers");
        }
    }

    async fn clear_pointers(&self) {
        if self.session.role != Role::Rider {
            return;
        }
        if let Err(err) = self.resume.clear_pointers().await {
            warn!(error = %err, "session: failed to clear resume pointers");
        }
    }
}

fn parse_records(reply: &ApiReply) -> LifecycleResult<RideRecords> {
    reply.json().map_err(|err| {
        LifecycleError::rejected(
            reply.status.as_u16(),
            format!("unexpected ride record: {err}"),
        )
    })
}

fn ride_from_record(
    record: RideRecord,
    status: RideStatus,
    driver: Option<DriverId>,
    code: Option<CompletionCode>,
) -> LifecycleResult<Ride> {
    let id = record
        .ride_id
        .ok_or_else(|| LifecycleError::rejected(200, "ride record without an id"))?;
    Ok(Ride {
        id,
        rider_id: record.rider.unwrap_or_else(|| RiderId(String::new())),
        driver_id: driver,
        pickup_location: record.pickup_location,
        dropoff_location: record.dropoff_location,
        pickup_time: record.pickup_time,
        num_passengers: record.num_passengers.unwrap_or(1),
        ada_required: record.ada_required.unwrap_or(false),
        queue_position: None,
        status,
        completion_code: code,
        cancel_reason: None,
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
