use std::{
    io::{self, BufRead, Write},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use client_core::{
    Busy, CancellationDraft, LifecycleCoordinator, LifecycleError, Ride, RideEvent,
    RideRequest, ResumeStore, SessionContext,
};
use shared::domain::{CancelReason, RideId, RideStatus, Role};
use storage::Storage;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

const LEAVE_RETRY_DELAY: Duration = Duration::from_millis(250);
const LEAVE_ATTEMPTS: usize = 3;

pub async fn login(storage: &Storage, session: &SessionContext) -> Result<()> {
    if session.username.is_empty() {
        bail!("username must not be empty");
    }
    storage.save_session(session).await?;
    storage.clear_pointers().await?;
    info!(username = session.username.as_str(), role = session.role.as_str(), "session: saved");
    println!("Signed in as {} ({})", session.username, session.role.as_str());
    Ok(())
}

pub async fn logout(storage: &Storage) -> Result<()> {
    storage.clear_pointers().await?;
    storage.clear_session().await?;
    info!("session: cleared");
    println!("Signed out.");
    Ok(())
}

pub async fn request(coordinator: &Arc<LifecycleCoordinator>, request: RideRequest) -> Result<()> {
    let mut events = coordinator.subscribe_events();
    let ride = coordinator.create_ride(request).await?;
    if ride.status != RideStatus::Queued {
        print_assignment(&ride);
        return Ok(());
    }

    println!(
        "Ride {} is in the queue at position {}. Waiting for a driver (Ctrl-C to leave the queue)...",
        ride.id,
        ride.queue_position.unwrap_or(1)
    );
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(RideEvent::QueuePositionChanged { position, .. }) => {
                    println!("{}", describe_position(position));
                }
                Ok(RideEvent::DriverAssigned(ride)) => {
                    print_assignment(&ride);
                    return Ok(());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "ride: event stream lagged");
                }
                Err(RecvError::Closed) => bail!("ride coordinator shut down"),
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                leave_queue(coordinator).await?;
                println!("Left the queue.");
                return Ok(());
            }
        }
    }
}

/// A poll may be in flight at the moment the rider asks to leave; wait for it
/// rather than failing.
async fn leave_queue(coordinator: &Arc<LifecycleCoordinator>) -> Result<()> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match coordinator.leave_queue().await {
            Ok(()) => return Ok(()),
            Err(LifecycleError::OperationInProgress(Busy::InFlight(_)))
                if attempt < LEAVE_ATTEMPTS =>
            {
                tokio::time::sleep(LEAVE_RETRY_DELAY).await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

pub async fn status(coordinator: &LifecycleCoordinator) -> Result<()> {
    let ride = match coordinator.session().role {
        Role::Rider => coordinator.resume().await?,
        Role::Driver => coordinator.load_driver_ride().await?,
    };
    match ride {
        Some(ride) => println!("{}", describe(&ride, coordinator.session().role)),
        None => println!("No active ride."),
    }
    Ok(())
}

pub async fn details(coordinator: &LifecycleCoordinator, ride_id: Option<RideId>) -> Result<()> {
    let ride_id = match ride_id {
        Some(ride_id) => ride_id,
        None => active_ride(coordinator)
            .await?
            .map(|ride| ride.id)
            .context("no active ride; pass --ride-id")?,
    };
    let record = coordinator.ride_details(ride_id).await?;
    println!("Ride {ride_id}");
    println!("  pickup:  {}", record.pickup_location);
    println!("  dropoff: {}", record.dropoff_location);
    if let Some(time) = record.pickup_time {
        println!("  time:    {}", time.to_rfc3339());
    }
    if let Some(status) = record.status {
        println!("  status:  {status}");
    }
    if let Some(driver) = record.driver {
        println!("  driver:  {driver}");
    }
    Ok(())
}

pub async fn cancel(
    coordinator: &LifecycleCoordinator,
    reason: CancelReason,
    assume_yes: bool,
) -> Result<()> {
    let ride = coordinator
        .resume()
        .await?
        .context("no assigned ride to cancel")?;

    let mut draft = CancellationDraft::new();
    draft.select(reason);
    if !assume_yes && !confirm(&format!("Cancel ride {}? [y/N] ", ride.id))? {
        println!("Ride not cancelled.");
        return Ok(());
    }
    let confirmed = draft.confirm()?;

    let closed = coordinator.cancel(&confirmed).await?;
    println!("Ride {} cancelled ({}).", closed.id, display_reason(confirmed.text()));
    Ok(())
}

pub async fn driver_ride(coordinator: &LifecycleCoordinator) -> Result<()> {
    match coordinator.load_driver_ride().await? {
        Some(ride) => println!("{}", describe(&ride, Role::Driver)),
        None => println!("No ride assigned."),
    }
    Ok(())
}

pub async fn start(coordinator: &LifecycleCoordinator) -> Result<()> {
    coordinator
        .load_driver_ride()
        .await?
        .context("no ride assigned")?;
    let ride = coordinator.start_trip().await?;
    println!("Trip {} started.", ride.id);
    Ok(())
}

pub async fn complete(coordinator: &LifecycleCoordinator, code: &str) -> Result<()> {
    coordinator
        .load_driver_ride()
        .await?
        .context("no ride assigned")?;

    match coordinator.verify_completion(code.trim()).await {
        Ok(ride) => {
            println!("Ride {} completed.", ride.id);
            Ok(())
        }
        Err(LifecycleError::CodeMismatch) => {
            bail!("that code does not match; ask the rider and try again")
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn suggest(coordinator: &LifecycleCoordinator, query: &str) -> Result<()> {
    let suggestions = coordinator.suggest_addresses(query).await?;
    if suggestions.is_empty() {
        println!("No suggestions.");
    }
    for suggestion in suggestions {
        println!("{}", suggestion.description);
    }
    Ok(())
}

async fn active_ride(coordinator: &LifecycleCoordinator) -> Result<Option<Ride>> {
    Ok(match coordinator.session().role {
        Role::Rider => coordinator.resume().await?,
        Role::Driver => coordinator.load_driver_ride().await?,
    })
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn print_assignment(ride: &Ride) {
    let driver = ride
        .driver_id
        .as_ref()
        .map(|driver| driver.as_str())
        .unwrap_or("your driver");
    println!("Driver {driver} is on the way for ride {}.", ride.id);
    if let Some(code) = &ride.completion_code {
        println!("Completion code: {code} (give this to the driver at dropoff)");
    }
}

fn describe_position(position: u32) -> String {
    if position <= 1 {
        "You're next! Waiting for a driver to become available.".to_string()
    } else {
        format!("Queue position: {position}")
    }
}

fn display_reason(text: &str) -> &str {
    if text.trim().is_empty() {
        "no reason given"
    } else {
        text
    }
}

fn describe(ride: &Ride, viewer: Role) -> String {
    let mut lines = vec![format!(
        "Ride {}: {} -> {} [{}]",
        ride.id, ride.pickup_location, ride.dropoff_location, ride.status
    )];
    if let Some(position) = ride.queue_position {
        lines.push(format!("  {}", describe_position(position)));
    }
    match viewer {
        Role::Rider => {
            if let Some(driver) = &ride.driver_id {
                lines.push(format!("  driver: {driver}"));
            }
            if let Some(code) = &ride.completion_code {
                lines.push(format!("  completion code: {code}"));
            }
        }
        Role::Driver => {
            lines.push(format!("  rider: {}", ride.rider_id));
            lines.push(format!(
                "  passengers: {}{}",
                ride.num_passengers,
                if ride.ada_required { " (ADA)" } else { "" }
            ));
        }
    }
    lines.join("\n")
}
