use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::{contact_fields, contacts_for, fetch_rows, reword, transition};
use crate::backend::{ChangeFilter, DynBackend, Query};
use crate::cache::{CachedCollection, DRIVER_REQUESTS_KEY, LoadOutcome, user_key};
use crate::error::AppError;
use crate::models::{Booking, BookingStatus, User};
use crate::realtime::{self, ListenerHandle, ListenerSpec, Reconcile, ReloadFn};
use crate::state::AppContext;

pub const DRIVER_CHANNEL: &str = "driver-notifications";
const PASSENGER_PLACEHOLDERS: (&str, &str) = ("Guest Passenger", "Confidential");

async fn fetch_pending(backend: DynBackend, driver_id: Uuid) -> Result<Vec<Booking>, AppError> {
    let query = Query::from("bookings")
        .eq("status", BookingStatus::Pending.as_str())
        .eq("driver_id", driver_id.to_string())
        .order("pickup_time", true);
    let mut requests: Vec<Booking> = fetch_rows(&backend, &query).await?;
    if requests.is_empty() {
        return Ok(requests);
    }

    let contacts = contacts_for(&backend, requests.iter().filter_map(|r| r.customer_id)).await?;
    for request in &mut requests {
        let (name, phone) =
            contact_fields(&contacts, request.customer_id, PASSENGER_PLACEHOLDERS);
        request.user_name = Some(name);
        request.user_phone = Some(phone);
    }
    Ok(requests)
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestOutcome {
    pub message: String,
    pub booking: Booking,
    pub remaining: usize,
    /// The panel closes once nothing is pending.
    pub panel_open: bool,
}

/// Pending ride requests addressed to the signed-in driver.
#[derive(Clone)]
pub struct DriverNotificationsScreen {
    ctx: Arc<AppContext>,
    driver: User,
    requests: Arc<CachedCollection<Booking>>,
}

impl DriverNotificationsScreen {
    pub fn new(ctx: Arc<AppContext>) -> Result<Self, AppError> {
        let driver = ctx.require_user("Please sign in as a pilot.")?;
        if !driver.is_driver() {
            return Err(AppError::Forbidden(
                "Ride requests are only shown to pilots.".to_string(),
            ));
        }

        let requests = Arc::new(CachedCollection::new(
            &user_key(DRIVER_REQUESTS_KEY, driver.id),
            ctx.session.clone(),
            ctx.metrics.clone(),
        ));
        Ok(Self {
            ctx,
            driver,
            requests,
        })
    }

    pub fn requests(&self) -> Arc<CachedCollection<Booking>> {
        self.requests.clone()
    }

    pub async fn load(&self) -> LoadOutcome {
        self.requests.hydrate_once();
        let backend = self.ctx.backend.clone();
        let driver_id = self.driver.id;
        self.requests
            .refresh(|| fetch_pending(backend, driver_id))
            .await
    }

    pub async fn accept(&self, id: Uuid) -> Result<RequestOutcome, AppError> {
        let booking = transition(&self.ctx.backend, id, BookingStatus::Accepted, &self.driver)
            .await
            .map_err(|err| reword(err, "Error accepting mission. Please try again."))?;
        Ok(self.settle(
            booking,
            "Mission Accepted! Check your Driver History to track it.",
        ))
    }

    pub async fn reject(&self, id: Uuid) -> Result<RequestOutcome, AppError> {
        let booking = transition(&self.ctx.backend, id, BookingStatus::Rejected, &self.driver)
            .await
            .map_err(|err| reword(err, "Error rejecting mission."))?;
        Ok(self.settle(booking, "Mission rejected."))
    }

    fn settle(&self, booking: Booking, message: &str) -> RequestOutcome {
        self.requests.modify(|rows| {
            let before = rows.len();
            rows.retain(|request| request.id != booking.id);
            rows.len() != before
        });
        let remaining = self.requests.len();

        info!(booking_id = %booking.id, status = %booking.status, remaining, "ride request handled");
        RequestOutcome {
            message: message.to_string(),
            booking,
            remaining,
            panel_open: remaining > 0,
        }
    }

    /// Any change to this driver's bookings reloads the list so passenger
    /// details come along.
    pub async fn listen(&self) -> Result<ListenerHandle, AppError> {
        let driver_id = self.driver.id;
        let spec = ListenerSpec::new(
            DRIVER_CHANNEL,
            ChangeFilter::table("bookings").row_eq("driver_id", driver_id),
        )
        .matching("driver_id", driver_id);

        let screen = self.clone();
        let reload: ReloadFn = Arc::new(move || {
            let screen = screen.clone();
            async move {
                screen.load().await;
            }
            .boxed()
        });

        let handle = realtime::listen(
            &self.ctx.backend,
            spec,
            self.requests.clone(),
            Reconcile::Reload(reload),
            self.ctx.metrics.clone(),
        )
        .await?;
        Ok(handle)
    }
}
