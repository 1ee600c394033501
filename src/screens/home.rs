use std::sync::Arc;

use serde::Serialize;

use super::fetch_rows;
use super::pilot_routes::{fetch_routes, routes_collection};
use crate::backend::{DynBackend, Query, StorageApi};
use crate::cache::{CachedCollection, FLEET_KEY, LoadOutcome};
use crate::engine::links::{ContactLinks, car_enquiry_text, whatsapp_link};
use crate::error::AppError;
use crate::models::{RoutePackage, Vehicle};
use crate::state::AppContext;

pub const FLEET_BUCKET: &str = "fleet_images";
pub const FLEET_FOLDER: &str = "vehicles";

/// Bare file names in `image_url` live in the fleet bucket.
pub fn resolve_image(backend: &DynBackend, image: &str) -> String {
    if image.starts_with("http") {
        image.to_string()
    } else {
        backend.public_url(FLEET_BUCKET, &format!("{FLEET_FOLDER}/{image}"))
    }
}

pub(crate) async fn fetch_fleet(backend: DynBackend) -> Result<Vec<Vehicle>, AppError> {
    let query = Query::from("fleet").order("created_at", false);
    let mut fleet: Vec<Vehicle> = fetch_rows(&backend, &query).await?;

    for vehicle in &mut fleet {
        if let Some(image) = vehicle.image_url.as_deref().filter(|i| !i.is_empty()) {
            vehicle.image_url = Some(resolve_image(&backend, image));
        }
    }

    Ok(fleet)
}

#[derive(Debug, Clone, Serialize)]
pub struct FleetCard {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub enquiry_link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeView {
    pub fleet: Vec<FleetCard>,
    pub routes: Vec<RoutePackage>,
    pub fleet_status: LoadOutcome,
    pub routes_status: LoadOutcome,
    pub contact: ContactLinks,
}

pub struct HomeScreen {
    ctx: Arc<AppContext>,
    fleet: CachedCollection<Vehicle>,
    routes: CachedCollection<RoutePackage>,
}

impl HomeScreen {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let fleet = CachedCollection::new(FLEET_KEY, ctx.session.clone(), ctx.metrics.clone());
        let routes = routes_collection(&ctx);
        Self { ctx, fleet, routes }
    }

    /// Shows snapshots first, then refreshes fleet and routes together.
    pub async fn load(&self) -> Result<HomeView, AppError> {
        self.fleet.hydrate_once();
        self.routes.hydrate_once();

        let fleet_backend = self.ctx.backend.clone();
        let routes_backend = self.ctx.backend.clone();
        let (fleet_status, routes_status) = tokio::join!(
            self.fleet.refresh(|| fetch_fleet(fleet_backend)),
            self.routes.refresh(|| fetch_routes(routes_backend)),
        );

        let fleet = self
            .fleet
            .snapshot()
            .into_iter()
            .map(|vehicle| self.card(vehicle))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HomeView {
            fleet,
            routes: self.routes.snapshot(),
            fleet_status,
            routes_status,
            contact: self.ctx.contacts.links(),
        })
    }

    fn card(&self, vehicle: Vehicle) -> Result<FleetCard, AppError> {
        let link = whatsapp_link(
            &self.ctx.contacts.primary_phone,
            &car_enquiry_text(&vehicle.name),
        )?;
        Ok(FleetCard {
            vehicle,
            enquiry_link: link.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::resolve_image;
    use crate::backend::{DynBackend, MemoryBackend};

    #[test]
    fn bare_names_resolve_into_the_fleet_bucket() {
        let backend: DynBackend = Arc::new(MemoryBackend::default());
        assert_eq!(
            resolve_image(&backend, "dzire.png"),
            "memory://storage/public/fleet_images/vehicles/dzire.png"
        );
        assert_eq!(
            resolve_image(&backend, "https://cdn.example/ertiga.jpg"),
            "https://cdn.example/ertiga.jpg"
        );
    }
}
