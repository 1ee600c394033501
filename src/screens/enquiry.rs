use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::links::{Enquiry, enquiry_message, whatsapp_link};
use crate::engine::{FareSummary, FareTable};
use crate::error::AppError;
use crate::forms::{FormGroup, Rule};
use crate::state::AppContext;

pub const DEFAULT_CAR: &str = "Swift Dzire";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteParams {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub car: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnquiryReceipt {
    pub enquiry: Enquiry,
    pub summary: FareSummary,
    pub message: String,
    pub whatsapp_link: String,
}

pub fn suggestions(fares: &FareTable, typed: &str) -> Vec<&'static str> {
    fares.suggest(typed)
}

pub fn summary(fares: &FareTable, destination: &str, car: Option<&str>) -> FareSummary {
    let car = car.filter(|c| !c.trim().is_empty()).unwrap_or(DEFAULT_CAR);
    FareSummary::from_quote(&fares.quote_for_car(destination.trim(), car))
}

/// Builds the booking request text and the link that opens it in WhatsApp.
pub fn submit(ctx: &AppContext, mut enquiry: Enquiry) -> Result<EnquiryReceipt, AppError> {
    if enquiry.car.trim().is_empty() {
        enquiry.car = DEFAULT_CAR.to_string();
    }

    let mut form = FormGroup::new("Please share your name, phone and trip details.")
        .field("name", vec![Rule::Required])
        .field("phone", vec![Rule::Required])
        .field("source", vec![Rule::Required])
        .field("destination", vec![Rule::Required]);
    form.set("name", enquiry.name.trim());
    form.set("phone", enquiry.phone.trim());
    form.set("source", enquiry.source.trim());
    form.set("destination", enquiry.destination.trim());
    form.validate()?;

    let summary = summary(&ctx.fares, &enquiry.destination, Some(&enquiry.car));
    let message = enquiry_message(&enquiry, &summary);
    let link = whatsapp_link(&ctx.contacts.primary_phone, &message)?;

    info!(destination = %enquiry.destination, car = %enquiry.car, quoted = summary.valid, "enquiry prepared");
    Ok(EnquiryReceipt {
        enquiry,
        summary,
        message,
        whatsapp_link: link.to_string(),
    })
}
