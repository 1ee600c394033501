use std::collections::BTreeSet;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::{contact_fields, contacts_for, fetch_rows};
use crate::backend::{ChangeFilter, ChangeKind, DynBackend, Query};
use crate::cache::{CachedCollection, DISMISSED_KEY, LoadOutcome, USER_ALERTS_KEY, user_key};
use crate::error::AppError;
use crate::models::{Booking, BookingStatus, User};
use crate::platform::SnapshotStore;
use crate::realtime::{self, ListenerHandle, ListenerSpec, Reconcile, ReloadFn};
use crate::state::AppContext;

pub const USER_CHANNEL: &str = "user-notifications";
const DRIVER_PLACEHOLDERS: (&str, &str) = ("Assigning Pilot...", "Standby");
const VISIBLE_STATUSES: [BookingStatus; 3] = [
    BookingStatus::Pending,
    BookingStatus::Accepted,
    BookingStatus::Rejected,
];

/// Ids the user dismissed, kept across restarts.
pub fn dismissed_ids(store: &dyn SnapshotStore) -> BTreeSet<String> {
    let Some(raw) = store.get(DISMISSED_KEY) else {
        return BTreeSet::new();
    };
    serde_json::from_str::<BTreeSet<String>>(&raw).unwrap_or_else(|err| {
        warn!(error = %err, "ignoring unreadable dismissed list");
        BTreeSet::new()
    })
}

async fn fetch_alerts(
    backend: DynBackend,
    customer_id: Uuid,
    dismissed: BTreeSet<String>,
) -> Result<Vec<Booking>, AppError> {
    let query = Query::from("bookings")
        .eq("customer_id", customer_id.to_string())
        .in_("status", VISIBLE_STATUSES.map(|status| status.as_str()))
        .order("pickup_time", false);
    let rides: Vec<Booking> = fetch_rows(&backend, &query).await?;

    let mut alerts: Vec<Booking> = rides
        .into_iter()
        .filter(|ride| !dismissed.contains(&ride.id.to_string()))
        .collect();
    let contacts = contacts_for(&backend, alerts.iter().filter_map(|r| r.driver_id)).await?;

    for alert in &mut alerts {
        let (name, phone) = contact_fields(&contacts, alert.driver_id, DRIVER_PLACEHOLDERS);
        alert.driver_name = Some(name);
        alert.driver_phone = Some(phone);
    }
    Ok(alerts)
}

#[derive(Debug, Clone, Serialize)]
pub struct DismissOutcome {
    pub remaining: usize,
    pub panel_open: bool,
}

/// Status updates on the signed-in passenger's rides.
#[derive(Clone)]
pub struct UserNotificationsScreen {
    ctx: Arc<AppContext>,
    customer: User,
    alerts: Arc<CachedCollection<Booking>>,
}

impl UserNotificationsScreen {
    pub fn new(ctx: Arc<AppContext>) -> Result<Self, AppError> {
        let customer = ctx.require_user("Please sign in to see ride updates.")?;
        if customer.is_driver() {
            return Err(AppError::Forbidden(
                "Ride updates are shown to passengers only.".to_string(),
            ));
        }

        let alerts = Arc::new(CachedCollection::new(
            &user_key(USER_ALERTS_KEY, customer.id),
            ctx.session.clone(),
            ctx.metrics.clone(),
        ));
        Ok(Self {
            ctx,
            customer,
            alerts,
        })
    }

    pub fn alerts(&self) -> Arc<CachedCollection<Booking>> {
        self.alerts.clone()
    }

    pub async fn load(&self) -> LoadOutcome {
        let dismissed = dismissed_ids(self.ctx.durable.as_ref());
        if self.alerts.hydrate_once().is_some() {
            self.alerts.modify(|rows| {
                let before = rows.len();
                rows.retain(|alert| !dismissed.contains(&alert.id.to_string()));
                rows.len() != before
            });
        }

        let backend = self.ctx.backend.clone();
        let customer_id = self.customer.id;
        self.alerts
            .refresh(|| fetch_alerts(backend, customer_id, dismissed))
            .await
    }

    pub fn dismiss(&self, id: Uuid) -> Result<DismissOutcome, AppError> {
        let mut dismissed = dismissed_ids(self.ctx.durable.as_ref());
        dismissed.insert(id.to_string());
        self.ctx
            .durable
            .set(DISMISSED_KEY, &serde_json::to_string(&dismissed)?)?;

        self.alerts.modify(|rows| {
            let before = rows.len();
            rows.retain(|alert| alert.id != id);
            rows.len() != before
        });
        let remaining = self.alerts.len();

        info!(booking_id = %id, remaining, "notification dismissed");
        Ok(DismissOutcome {
            remaining,
            panel_open: remaining > 0,
        })
    }

    pub async fn listen(&self) -> Result<ListenerHandle, AppError> {
        let customer_id = self.customer.id;
        let spec = ListenerSpec::new(
            USER_CHANNEL,
            ChangeFilter::table("bookings").on(ChangeKind::Update),
        )
        .matching("customer_id", customer_id);

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
            self.alerts.clone(),
            Reconcile::Reload(reload),
            self.ctx.metrics.clone(),
        )
        .await?;
        Ok(handle)
    }
}
