use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use super::{contact_fields, contacts_for, fetch_rows, reword, transition};
use crate::backend::{ChangeFilter, ChangeKind, DynBackend, Query};
use crate::cache::{CachedCollection, HISTORY_KEY, LoadOutcome, user_key};
use crate::error::AppError;
use crate::models::{Booking, BookingStatus, User};
use crate::platform::connectivity::OFFLINE_MESSAGE;
use crate::realtime::{self, ListenerHandle, ListenerSpec, Reconcile};
use crate::state::AppContext;

pub const HISTORY_CHANNEL: &str = "history-updates";
const PASSENGER_PLACEHOLDERS: (&str, &str) = ("Passenger Name Unavailable", "No Phone Provided");

async fn fetch_history(backend: DynBackend, user: User) -> Result<Vec<Booking>, AppError> {
    if !user.is_driver() {
        let query = Query::from("bookings")
            .eq("customer_id", user.id.to_string())
            .order("created_at", false);
        return fetch_rows(&backend, &query).await;
    }

    let query = Query::from("bookings")
        .eq("driver_id", user.id.to_string())
        .order("pickup_time", false);
    let mut rides: Vec<Booking> = fetch_rows(&backend, &query).await?;
    let contacts = contacts_for(&backend, rides.iter().filter_map(|r| r.customer_id)).await?;

    for ride in &mut rides {
        let (name, phone) = contact_fields(&contacts, ride.customer_id, PASSENGER_PLACEHOLDERS);
        ride.user_name = Some(name);
        ride.user_phone = Some(phone);
    }
    Ok(rides)
}

/// Ride history for the signed-in customer or driver.
#[derive(Clone)]
pub struct MyRidesScreen {
    ctx: Arc<AppContext>,
    user: User,
    rides: Arc<CachedCollection<Booking>>,
}

impl MyRidesScreen {
    pub fn new(ctx: Arc<AppContext>) -> Result<Self, AppError> {
        let user = ctx.require_user("Please sign in to view your rides.")?;
        let rides = Arc::new(CachedCollection::new(
            &user_key(HISTORY_KEY, user.id),
            ctx.session.clone(),
            ctx.metrics.clone(),
        ));
        Ok(Self { ctx, user, rides })
    }

    pub fn rides(&self) -> Arc<CachedCollection<Booking>> {
        self.rides.clone()
    }

    pub fn is_driver(&self) -> bool {
        self.user.is_driver()
    }

    /// Offline, the snapshot is all there is; no fetch is attempted.
    pub async fn load(&self) -> LoadOutcome {
        self.rides.hydrate_once();

        if !self.ctx.network.is_online() {
            return LoadOutcome::Stale {
                error: OFFLINE_MESSAGE.to_string(),
            };
        }

        let backend = self.ctx.backend.clone();
        let user = self.user.clone();
        self.rides.refresh(|| fetch_history(backend, user)).await
    }

    pub async fn cancel(&self, id: Uuid) -> Result<Booking, AppError> {
        self.ctx
            .network
            .require_online("No internet connection! Cannot cancel ride.")?;
        self.set_status(id, BookingStatus::Cancelled)
            .await
            .map_err(|err| reword(err, "Failed to cancel the ride. Ensure you have database permissions."))
    }

    pub async fn complete(&self, id: Uuid) -> Result<Booking, AppError> {
        self.ctx
            .network
            .require_online("No internet connection! Cannot update status.")?;
        self.set_status(id, BookingStatus::Completed)
            .await
            .map_err(|err| reword(err, "Failed to update database. Check access policies."))
    }

    async fn set_status(&self, id: Uuid, next: BookingStatus) -> Result<Booking, AppError> {
        let updated = transition(&self.ctx.backend, id, next, &self.user).await?;

        self.rides.modify(|rows| match rows.iter_mut().find(|ride| ride.id == id) {
            Some(ride) => {
                ride.status = updated.status;
                true
            }
            None => false,
        });
        Ok(updated)
    }

    /// Status changes from any client are merged into the visible rides.
    pub async fn listen(&self) -> Result<ListenerHandle, AppError> {
        let spec = ListenerSpec::new(
            HISTORY_CHANNEL,
            ChangeFilter::table("bookings").on(ChangeKind::Update),
        );
        let handle = realtime::listen(
            &self.ctx.backend,
            spec,
            self.rides.clone(),
            Reconcile::Patch,
            self.ctx.metrics.clone(),
        )
        .await?;
        Ok(handle)
    }

    /// Reloads whenever connectivity comes back. Abort the handle to stop.
    pub fn reload_on_reconnect(&self) -> JoinHandle<()> {
        let screen = self.clone();
        let mut online = self.ctx.network.subscribe();

        tokio::spawn(async move {
            while online.changed().await.is_ok() {
                let back_online = *online.borrow_and_update();
                if back_online {
                    info!(user_id = %screen.user.id, "back online, reloading rides");
                    screen.load().await;
                }
            }
        })
    }
}
