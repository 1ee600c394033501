use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use super::home::{FLEET_BUCKET, FLEET_FOLDER};
use crate::backend::{StorageApi, TableApi, UploadFile, UploadOptions, decode_rows, encode_row};
use crate::error::AppError;
use crate::forms::vehicle::{VehicleForm, VehicleInput};
use crate::models::{NewVehicle, Vehicle};
use crate::state::AppContext;

const NOT_AUTHORIZED: &str = "Pilot not authorized.";
const SAVE_FAILED: &str = "Image uploaded, but failed to save vehicle.";

pub struct ManageFleetScreen {
    ctx: Arc<AppContext>,
}

impl ManageFleetScreen {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Uploads the picture, then records the vehicle. The two writes are
    /// independent: a failed insert leaves the uploaded object behind.
    pub async fn publish(
        &self,
        input: &VehicleInput,
        image: Option<UploadFile>,
    ) -> Result<Vehicle, AppError> {
        let draft = VehicleForm::new().submit(input, image.as_ref().map(|f| f.name.as_str()))?;
        let user = self.ctx.require_user(NOT_AUTHORIZED)?;
        let Some(image) = image else {
            return Err(AppError::BadRequest("Select an image to upload.".to_string()));
        };

        let path = format!(
            "{FLEET_FOLDER}/{}-{}.{}",
            user.id,
            Utc::now().timestamp_millis(),
            image.extension()
        );
        self.ctx
            .backend
            .upload(FLEET_BUCKET, &path, image, UploadOptions { upsert: false })
            .await
            .map_err(|err| AppError::Backend(err.context("Upload Failed")))?;

        let vehicle = NewVehicle {
            driver_id: user.id,
            name: draft.name,
            class: draft.class,
            rate_per_km: draft.rate_per_km,
            description: draft.description,
            min_package_km: draft.min_package_km,
            image_url: self.ctx.backend.public_url(FLEET_BUCKET, &path),
            is_active: true,
        };

        let inserted = match self.ctx.backend.insert("fleet", vec![encode_row(&vehicle)?]).await {
            Ok(rows) => rows,
            Err(err) => {
                error!(path = %path, error = %err, "vehicle insert failed after upload");
                return Err(AppError::Backend(err.with_message(SAVE_FAILED)));
            }
        };

        let Some(saved) = decode_rows::<Vehicle>(inserted)?.into_iter().next() else {
            return Err(AppError::Internal(SAVE_FAILED.to_string()));
        };
        info!(vehicle_id = %saved.id, driver_id = %user.id, "vehicle published");
        Ok(saved)
    }
}
