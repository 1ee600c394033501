use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::fare::FareSummary;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub primary_phone: String,
    pub secondary_phone: String,
    pub email: String,
}

impl Default for ContactDetails {
    fn default() -> Self {
        Self {
            primary_phone: "+917972504272".to_string(),
            secondary_phone: "+919552263633".to_string(),
            email: "vishnushitole978@gmail.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactLinks {
    pub call: String,
    pub call_secondary: String,
    pub email: String,
}

impl ContactDetails {
    pub fn links(&self) -> ContactLinks {
        ContactLinks {
            call: tel_link(&self.primary_phone),
            call_secondary: tel_link(&self.secondary_phone),
            email: mailto_link(&self.email),
        }
    }
}

pub fn tel_link(phone: &str) -> String {
    format!("tel:{phone}")
}

pub fn mailto_link(address: &str) -> String {
    format!("mailto:{address}")
}

/// `https://wa.me/<digits>?text=<message>` with the message percent-encoded.
pub fn whatsapp_link(phone: &str, message: &str) -> Result<Url, AppError> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    Url::parse(&format!(
        "https://wa.me/{digits}?text={}",
        encode_component(message)
    ))
    .map_err(|err| AppError::Internal(format!("invalid messaging link: {err}")))
}

pub fn car_enquiry_text(car_name: &str) -> String {
    format!("Hello, I am interested in booking the {car_name}.")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Enquiry {
    pub name: String,
    pub phone: String,
    pub source: String,
    pub destination: String,
    pub car: String,
    #[serde(default)]
    pub message: String,
}

/// The multi-line booking request sent over WhatsApp.
pub fn enquiry_message(enquiry: &Enquiry, summary: &FareSummary) -> String {
    let note = if enquiry.message.trim().is_empty() {
        "Standard Request"
    } else {
        enquiry.message.trim()
    };
    let rule = "--------------------------";

    [
        "*NEW SWIFTLUX BOOKING*".to_string(),
        rule.to_string(),
        format!("👤 *Name:* {}", enquiry.name),
        format!("📞 *Phone:* {}", enquiry.phone),
        format!("🚗 *Car:* {}", enquiry.car),
        format!("📍 *From:* {}", enquiry.source),
        format!("🏁 *To:* {}", enquiry.destination),
        format!("💰 *Fare:* {}", summary.price),
        format!("📏 *Limit:* {}", summary.details),
        rule.to_string(),
        format!("💬 *Note:* {note}"),
    ]
    .join("\n")
}

/// Percent-encodes everything except the unreserved URI component characters.
fn encode_component(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(byte as char),
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}
