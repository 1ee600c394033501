use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use super::{fetch_rows, reword};
use crate::backend::{DynBackend, Filter, Query, TableApi, decode_rows, encode_row};
use crate::cache::{CachedCollection, LoadOutcome, ROUTES_KEY};
use crate::error::AppError;
use crate::forms::route::{RouteForm, RouteInput};
use crate::models::RoutePackage;
use crate::platform::connectivity::OFFLINE_MESSAGE;
use crate::state::AppContext;

const SYNC_FAILED: &str = "Failed to sync routes. The database might be unreachable.";
const BROADCAST_FAILED: &str = "Broadcast failed. Check database connection.";
const DELETE_FAILED: &str = "Action denied: Unable to delete route.";
const PILOTS_ONLY: &str = "Only registered pilots can manage routes.";

pub(crate) fn routes_collection(ctx: &AppContext) -> CachedCollection<RoutePackage> {
    CachedCollection::new(ROUTES_KEY, ctx.session.clone(), ctx.metrics.clone())
}

pub(crate) async fn fetch_routes(backend: DynBackend) -> Result<Vec<RoutePackage>, AppError> {
    let query = Query::from("routes").order("created_at", false);
    fetch_rows(&backend, &query).await
}

#[derive(Debug, Clone, Serialize)]
pub struct PilotRoutesView {
    pub is_driver: bool,
    pub routes: Vec<RoutePackage>,
    pub error: Option<String>,
}

pub struct PilotRoutesScreen {
    ctx: Arc<AppContext>,
    routes: CachedCollection<RoutePackage>,
}

impl PilotRoutesScreen {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let routes = routes_collection(&ctx);
        Self { ctx, routes }
    }

    pub fn routes(&self) -> Vec<RoutePackage> {
        self.routes.snapshot()
    }

    /// Driver check and route sync run together.
    pub async fn load(&self) -> PilotRoutesView {
        self.routes.hydrate_once();

        let check = async { self.ctx.current_user().is_some_and(|user| user.is_driver()) };
        let (is_driver, outcome) = tokio::join!(check, self.sync());

        PilotRoutesView {
            is_driver,
            routes: self.routes.snapshot(),
            error: match outcome {
                LoadOutcome::Stale { error } => Some(error),
                _ => None,
            },
        }
    }

    async fn sync(&self) -> LoadOutcome {
        if !self.ctx.network.is_online() {
            return LoadOutcome::Stale {
                error: OFFLINE_MESSAGE.to_string(),
            };
        }

        let backend = self.ctx.backend.clone();
        match self.routes.refresh(|| fetch_routes(backend)).await {
            LoadOutcome::Stale { error } => {
                error!(error = %error, "route sync failed");
                LoadOutcome::Stale {
                    error: SYNC_FAILED.to_string(),
                }
            }
            outcome => outcome,
        }
    }

    fn require_pilot(&self) -> Result<(), AppError> {
        let user = self.ctx.require_user(PILOTS_ONLY)?;
        if !user.is_driver() {
            return Err(AppError::Forbidden(PILOTS_ONLY.to_string()));
        }
        Ok(())
    }

    /// Publishes a route and shows it first in the list.
    pub async fn broadcast(&self, input: &RouteInput) -> Result<RoutePackage, AppError> {
        self.require_pilot()?;
        let route = RouteForm::new().submit(input)?;

        let inserted = self
            .ctx
            .backend
            .insert("routes", vec![encode_row(&route)?])
            .await
            .map_err(|err| reword(err.into(), BROADCAST_FAILED))?;
        let Some(created) = decode_rows::<RoutePackage>(inserted)?.into_iter().next() else {
            return Err(AppError::Internal(BROADCAST_FAILED.to_string()));
        };

        self.routes.modify(|rows| {
            rows.insert(0, created.clone());
            true
        });
        info!(route_id = %created.id, dest = %created.dest, "route broadcast");
        Ok(created)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.require_pilot()?;

        self.ctx
            .backend
            .delete("routes", &[Filter::eq("id", id.to_string())])
            .await
            .map_err(|err| reword(err.into(), DELETE_FAILED))?;

        self.routes.modify(|rows| {
            let before = rows.len();
            rows.retain(|route| route.id != id);
            rows.len() != before
        });
        info!(route_id = %id, "route deleted");
        Ok(())
    }
}
