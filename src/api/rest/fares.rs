use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};

use crate::engine::links::{ContactLinks, car_enquiry_text, whatsapp_link};
use crate::engine::{Car, Enquiry, FareSummary, RouteFare};
use crate::error::AppError;
use crate::screens::enquiry::{self, EnquiryReceipt, QuoteParams};
use crate::state::AppContext;

pub fn router() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/fares/quote", get(quote))
        .route("/fares/destinations", get(destinations))
        .route("/enquiries", post(submit_enquiry))
        .route("/enquiries/suggest", get(suggest))
        .route("/links/contact", get(contact))
        .route("/links/whatsapp", get(whatsapp))
}

#[derive(Serialize)]
pub struct DestinationsResponse {
    pub routes: Vec<RouteFare>,
    pub cars: Vec<Car>,
}

#[derive(Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct WhatsappParams {
    pub car: String,
}

#[derive(Serialize)]
pub struct LinkResponse {
    pub link: String,
}

async fn quote(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<QuoteParams>,
) -> Json<FareSummary> {
    Json(enquiry::summary(
        &ctx.fares,
        &params.destination,
        params.car.as_deref(),
    ))
}

async fn destinations(State(ctx): State<Arc<AppContext>>) -> Json<DestinationsResponse> {
    Json(DestinationsResponse {
        routes: ctx.fares.routes().to_vec(),
        cars: ctx.fares.cars().to_vec(),
    })
}

async fn submit_enquiry(
    State(ctx): State<Arc<AppContext>>,
    Json(payload): Json<Enquiry>,
) -> Result<Json<EnquiryReceipt>, AppError> {
    Ok(Json(enquiry::submit(&ctx, payload)?))
}

async fn suggest(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<SuggestParams>,
) -> Json<Vec<&'static str>> {
    Json(enquiry::suggestions(&ctx.fares, &params.q))
}

async fn contact(State(ctx): State<Arc<AppContext>>) -> Json<ContactLinks> {
    Json(ctx.contacts.links())
}

async fn whatsapp(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<WhatsappParams>,
) -> Result<Json<LinkResponse>, AppError> {
    let link = whatsapp_link(&ctx.contacts.primary_phone, &car_enquiry_text(&params.car))?;
    Ok(Json(LinkResponse {
        link: link.to_string(),
    }))
}
