use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::fetch_rows;
use crate::backend::{DynBackend, Query, TableApi, decode_rows, encode_row};
use crate::cache::{CachedCollection, LOCATIONS_KEY, LoadOutcome, RefreshPolicy};
use crate::engine::locations::{cities_in, districts};
use crate::error::AppError;
use crate::forms::booking::{BookingForm, BookingInput};
use crate::models::{Booking, BookingStatus, Location, NewBooking};
use crate::platform::connectivity::OFFLINE_MESSAGE;
use crate::state::AppContext;

pub const DEFAULT_CAR: &str = "Premium Fleet";
const NO_DRIVER: &str =
    "Error: No driver selected. Please return to the fleet page and select a car again.";
const SIGN_IN_FIRST: &str = "Error: You must be logged in to book a ride.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookRideParams {
    #[serde(default)]
    pub car: Option<String>,
    #[serde(default)]
    pub driver_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookRideView {
    pub car_name: String,
    pub driver_id: Option<Uuid>,
    pub signed_in: bool,
    pub districts: Vec<String>,
    pub locations: LoadOutcome,
}

pub(crate) async fn fetch_locations(backend: DynBackend) -> Result<Vec<Location>, AppError> {
    let query = Query::from("maharashtra_locations")
        .select("city_name, district")
        .eq("is_active", true)
        .order("city_name", true);
    fetch_rows(&backend, &query).await
}

pub struct BookRideScreen {
    ctx: Arc<AppContext>,
    car_name: String,
    driver_id: Option<Uuid>,
    locations: CachedCollection<Location>,
}

impl BookRideScreen {
    pub fn new(ctx: Arc<AppContext>, params: BookRideParams) -> Self {
        let locations =
            CachedCollection::new(LOCATIONS_KEY, ctx.durable.clone(), ctx.metrics.clone());
        Self {
            car_name: params
                .car
                .filter(|car| !car.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CAR.to_string()),
            driver_id: params.driver_id,
            ctx,
            locations,
        }
    }

    /// Locations are reference data: a stored snapshot is used as-is.
    pub async fn load(&self) -> BookRideView {
        let backend = self.ctx.backend.clone();
        let (locations, signed_in) = tokio::join!(
            self.locations
                .load(RefreshPolicy::WhenMissing, || fetch_locations(backend)),
            async { self.ctx.current_user().is_some() },
        );

        BookRideView {
            car_name: self.car_name.clone(),
            driver_id: self.driver_id,
            signed_in,
            districts: districts(&self.locations.snapshot()),
            locations,
        }
    }

    pub fn cities(&self, district: &str) -> Vec<String> {
        cities_in(&self.locations.snapshot(), district)
    }

    pub async fn submit(&self, input: &BookingInput) -> Result<Booking, AppError> {
        let mut form = BookingForm::new();
        form.fill(input);
        let draft = form.submit()?;

        let driver_id = self
            .driver_id
            .ok_or_else(|| AppError::BadRequest(NO_DRIVER.to_string()))?;
        let customer = self.ctx.require_user(SIGN_IN_FIRST)?;
        self.ctx.network.require_online(OFFLINE_MESSAGE)?;

        let booking = NewBooking {
            customer_id: customer.id,
            driver_id,
            car_name: self.car_name.clone(),
            source_location: draft.source_location,
            destination_location: draft.destination_location,
            pickup_time: draft.pickup_time,
            status: BookingStatus::Pending,
        };

        let inserted = self
            .ctx
            .backend
            .insert("bookings", vec![encode_row(&booking)?])
            .await?;
        let Some(created) = decode_rows::<Booking>(inserted)?.into_iter().next() else {
            return Err(AppError::Internal("booking insert returned no row".to_string()));
        };

        info!(
            booking_id = %created.id,
            driver_id = %driver_id,
            car = %created.car_name,
            "ride requested"
        );
        Ok(created)
    }
}
