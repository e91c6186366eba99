use super::*;

fn code(digits: &str) -> CompletionCode {
    CompletionCode::parse(digits).expect("code")
}

fn queued_ride(position: u32) -> Ride {
    Ride {
        id: RideId(7),
        rider_id: RiderId::from("rider1"),
        driver_id: None,
        pickup_location: "Union".to_string(),
        dropoff_location: "Library".to_string(),
        pickup_time: Some("2024-05-01T12:00:00Z".parse().expect("timestamp")),
        num_passengers: 2,
        ada_required: false,
        queue_position: Some(position),
        status: RideStatus::Queued,
        completion_code: None,
        cancel_reason: None,
    }
}

fn assigned_ride() -> Ride {
    Ride {
        driver_id: Some(DriverId::from("Alex")),
        queue_position: None,
        status: RideStatus::Assigned,
        completion_code: Some(code("1234")),
        ..queued_ride(1)
    }
}

#[test]
fn empty_store_has_no_ride() {
    let store = RideStateStore::new();
    assert!(store.get().is_none());
    assert!(store.status().is_none());
}

#[test]
fn set_without_ride_is_invalid_transition() {
    let mut store = RideStateStore::new();
    let err = store.set(RidePatch::queue_position(2)).expect_err("no ride");
    assert!(matches!(err, LifecycleError::InvalidTransition(_)));
}

#[test]
fn queue_position_updates_while_queued() {
    let mut store = RideStateStore::new();
    store.insert(queued_ride(3)).expect("insert");
    let ride = store.set(RidePatch::queue_position(2)).expect("update");
    assert_eq!(ride.queue_position, Some(2));
    assert_eq!(store.get().and_then(|r| r.queue_position), Some(2));
}

#[test]
fn assignment_clears_queue_position_and_stores_code() {
    let mut store = RideStateStore::new();
    store.insert(queued_ride(1)).expect("insert");
    let ride = store
        .set(RidePatch::assigned(DriverId::from("Alex"), code("4321")))
        .expect("assign");
    assert_eq!(ride.status, RideStatus::Assigned);
    assert_eq!(ride.queue_position, None);
    assert_eq!(ride.driver_id, Some(DriverId::from("Alex")));
    assert_eq!(ride.completion_code, Some(code("4321")));
}

#[test]
fn setting_queue_position_on_completed_ride_is_rejected() {
    let mut store = RideStateStore::new();
    store.insert(assigned_ride()).expect("insert");
    store.set(RidePatch::completed()).expect("complete");

    let err = store
        .set(RidePatch::queue_position(1))
        .expect_err("queue position on completed ride");
    assert!(matches!(err, LifecycleError::InvalidTransition(_)));
    assert_eq!(store.get().and_then(|r| r.queue_position), None);
}

#[test]
fn completing_without_clearing_code_is_rejected_and_leaves_state() {
    let mut store = RideStateStore::new();
    store.insert(assigned_ride()).expect("insert");

    let err = store
        .set(RidePatch {
            status: Some(RideStatus::Completed),
            ..RidePatch::default()
        })
        .expect_err("code must be cleared");
    assert!(matches!(err, LifecycleError::InvalidTransition(_)));
    assert_eq!(store.status(), Some(RideStatus::Assigned));
    assert!(store.get().and_then(|r| r.completion_code.clone()).is_some());
}

#[test]
fn assigned_without_code_is_rejected() {
    let mut store = RideStateStore::new();
    let mut ride = assigned_ride();
    ride.completion_code = None;
    assert!(store.insert(ride).is_err());
    assert!(store.get().is_none());
}

#[test]
fn queued_ride_cannot_hold_code() {
    let mut store = RideStateStore::new();
    let mut ride = queued_ride(2);
    ride.completion_code = Some(code("0000"));
    assert!(store.insert(ride).is_err());
}

#[test]
fn cancellation_requires_reason_and_clears_code() {
    let mut store = RideStateStore::new();
    store.insert(assigned_ride()).expect("insert");
    let ride = store.set(RidePatch::cancelled("")).expect("cancel");
    assert_eq!(ride.status, RideStatus::Cancelled);
    assert_eq!(ride.cancel_reason.as_deref(), Some(""));
    assert!(ride.completion_code.is_none());
}

#[test]
fn queued_ride_cannot_jump_to_terminal() {
    let mut store = RideStateStore::new();
    store.insert(queued_ride(2)).expect("insert");
    let err = store
        .set(RidePatch::cancelled("Change of plans"))
        .expect_err("queued rides leave the queue instead");
    assert!(matches!(err, LifecycleError::InvalidTransition(_)));
    assert_eq!(store.status(), Some(RideStatus::Queued));
}

#[test]
fn active_ride_blocks_insert_but_terminal_ride_does_not() {
    let mut store = RideStateStore::new();
    store.insert(assigned_ride()).expect("insert");
    assert!(store.insert(queued_ride(4)).is_err());

    store.set(RidePatch::completed()).expect("complete");
    let ride = store.insert(queued_ride(4)).expect("replace terminal ride");
    assert_eq!(ride.status, RideStatus::Queued);
}

#[test]
fn passenger_count_is_bounded() {
    let mut store = RideStateStore::new();
    let mut ride = queued_ride(1);
    ride.num_passengers = 6;
    assert!(store.insert(ride).is_err());
}

#[test]
fn clear_returns_previous_ride() {
    let mut store = RideStateStore::new();
    store.insert(queued_ride(1)).expect("insert");
    let previous = store.clear().expect("previous ride");
    assert_eq!(previous.id, RideId(7));
    assert!(store.get().is_none());
}

#[test]
fn transition_table_matches_lifecycle() {
    use RideStatus::*;
    assert!(is_allowed_transition(Queued, Assigned));
    assert!(is_allowed_transition(Assigned, InProgress));
    assert!(is_allowed_transition(InProgress, Completed));
    assert!(!is_allowed_transition(Completed, Queued));
    assert!(!is_allowed_transition(InProgress, Assigned));
    assert!(!is_allowed_transition(Cancelled, Completed));
}
