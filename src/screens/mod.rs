//! One module per application screen. A screen owns its visible collections,
//! talks to the backend through the shared [`AppContext`](crate::state::AppContext)
//! and reports failures as [`AppError`].

pub mod auth;
pub mod book_ride;
pub mod driver_notifications;
pub mod enquiry;
pub mod fleet;
pub mod home;
pub mod my_rides;
pub mod pilot_routes;
pub mod profile;
pub mod startup;
pub mod user_notifications;

use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::backend::{DynBackend, Filter, Query, TableApi, decode_rows};
use crate::engine::status::available_actions;
use crate::error::AppError;
use crate::models::{Booking, BookingStatus, Role, User};

pub(crate) async fn fetch_rows<T: DeserializeOwned>(
    backend: &DynBackend,
    query: &Query,
) -> Result<Vec<T>, AppError> {
    let rows = backend.select(query).await?;
    Ok(decode_rows(rows)?)
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Contact {
    pub id: Uuid,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Resolves profile names and phones for `ids` with one `in` query.
pub(crate) async fn contacts_for(
    backend: &DynBackend,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, Contact>, AppError> {
    let mut wanted: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
    wanted.sort();
    wanted.dedup();
    if wanted.is_empty() {
        return Ok(HashMap::new());
    }

    let query = Query::from("profiles")
        .select("id, full_name, phone_number")
        .in_("id", wanted);
    let contacts: Vec<Contact> = fetch_rows(backend, &query).await?;

    Ok(contacts.into_iter().map(|c| (c.id, c)).collect())
}

/// Name and phone for the profile `id`, or the screen's placeholders.
pub(crate) fn contact_fields(
    contacts: &HashMap<Uuid, Contact>,
    id: Option<Uuid>,
    (name, phone): (&str, &str),
) -> (String, String) {
    let contact = id.and_then(|id| contacts.get(&id));
    (
        non_blank(contact.and_then(|c| c.full_name.as_ref()), name),
        non_blank(contact.and_then(|c| c.phone_number.as_ref()), phone),
    )
}

fn non_blank(value: Option<&String>, fallback: &str) -> String {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Moves one of `actor`'s bookings to `next` if its current status and the
/// actor's role allow it. The write is conditional on the status read, so of
/// two concurrent callers only one succeeds.
pub(crate) async fn transition(
    backend: &DynBackend,
    id: Uuid,
    next: BookingStatus,
    actor: &User,
) -> Result<Booking, AppError> {
    let query = Query::from("bookings").eq("id", id.to_string());
    let current: Vec<Booking> = fetch_rows(backend, &query).await?;
    let role = actor.role();
    let owned = current.into_iter().next().filter(|booking| match role {
        Role::Driver => booking.driver_id == Some(actor.id),
        Role::Customer => booking.customer_id == Some(actor.id),
        Role::Admin => true,
    });
    let Some(booking) = owned else {
        return Err(AppError::NotFound(format!("Ride {id} does not exist.")));
    };

    if !booking.status.can_transition_to(next) {
        return Err(AppError::Conflict(format!(
            "Ride is already {}; it cannot be marked {next}.",
            booking.status
        )));
    }
    if !available_actions(booking.status, role).contains(&next) {
        return Err(AppError::Forbidden(format!(
            "A {role} cannot mark a ride {next}."
        )));
    }

    let filters = [
        Filter::eq("id", id.to_string()),
        Filter::eq("status", booking.status.as_str()),
    ];
    let updated = backend
        .update("bookings", json!({ "status": next }), &filters)
        .await?;
    let Some(row) = decode_rows::<Booking>(updated)?.into_iter().next() else {
        return Err(AppError::Conflict(
            "Ride was updated by someone else. Refresh and try again.".to_string(),
        ));
    };

    info!(booking_id = %id, from = %booking.status, to = %next, "ride status changed");
    Ok(row)
}

/// Maps a failed write to the message a screen shows for it, keeping
/// local refusals (offline, conflict, forbidden) as they are.
pub(crate) fn reword(err: AppError, message: &str) -> AppError {
    match err {
        AppError::Backend(backend) => AppError::Backend(backend.with_message(message)),
        other => other,
    }
}

pub(crate) fn cache_buster(url: &str) -> String {
    format!("{url}?t={}", Utc::now().timestamp_millis())
}

