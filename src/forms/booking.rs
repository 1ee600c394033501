use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

use super::{FormGroup, Rule, ValidationErrors};
use crate::engine::locations::display_name;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookingInput {
    #[serde(default)]
    pub source_district: String,
    #[serde(default)]
    pub source_city: String,
    #[serde(default)]
    pub destination_district: String,
    #[serde(default)]
    pub destination_city: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    pub source_location: String,
    pub destination_location: String,
    pub pickup_time: DateTime<Utc>,
}

/// Pickup form. City selects stay disabled until their district is chosen.
pub struct BookingForm {
    group: FormGroup,
}

impl BookingForm {
    pub fn new() -> Self {
        Self {
            group: FormGroup::new("Please fill out all fields completely.")
                .field("sourceDistrict", vec![Rule::Required])
                .disabled_field("sourceCity", vec![Rule::Required])
                .field("destinationDistrict", vec![Rule::Required])
                .disabled_field("destinationCity", vec![Rule::Required])
                .field("date", vec![Rule::Required])
                .field("time", vec![Rule::Required]),
        }
    }

    pub fn group(&self) -> &FormGroup {
        &self.group
    }

    pub fn choose_source_district(&mut self, district: &str) {
        self.choose_district("sourceDistrict", "sourceCity", district);
    }

    pub fn choose_destination_district(&mut self, district: &str) {
        self.choose_district("destinationDistrict", "destinationCity", district);
    }

    fn choose_district(&mut self, district_field: &str, city_field: &str, district: &str) {
        self.group.set(district_field, district);
        if district.is_empty() {
            return;
        }
        self.group.enable(city_field);
        self.group.set(city_field, "");
    }

    pub fn fill(&mut self, input: &BookingInput) {
        self.choose_source_district(&input.source_district);
        self.group.set("sourceCity", input.source_city.as_str());
        self.choose_destination_district(&input.destination_district);
        self.group.set("destinationCity", input.destination_city.as_str());
        self.group.set("date", input.date.as_str());
        self.group.set("time", input.time.as_str());
    }

    pub fn submit(&mut self) -> Result<BookingDraft, ValidationErrors> {
        self.group.validate()?;
        let value = |name: &str| self.group.value(name);

        Ok(BookingDraft {
            source_location: display_name(value("sourceCity"), value("sourceDistrict")),
            destination_location: display_name(
                value("destinationCity"),
                value("destinationDistrict"),
            ),
            pickup_time: pickup_instant(value("date"), value("time"), &Local).map_err(|_| {
                ValidationErrors::single(
                    "Please choose a valid pickup date and time.",
                    "date",
                    "datetime",
                )
            })?,
        })
    }
}

impl Default for BookingForm {
    fn default() -> Self {
        Self::new()
    }
}

/// Interprets `date` (`YYYY-MM-DD`) and `time` (`HH:MM[:SS]`) in `zone`.
pub fn pickup_instant<Tz: TimeZone>(
    date: &str,
    time: &str,
    zone: &Tz,
) -> Result<DateTime<Utc>, String> {
    let stamp = format!("{}T{}", date.trim(), time.trim());
    let naive = NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|err| format!("invalid pickup time '{stamp}': {err}"))?;

    zone.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| format!("pickup time '{stamp}' does not exist locally"))
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone, Utc};

    use super::{BookingForm, BookingInput, pickup_instant};

    #[test]
    fn city_stays_disabled_until_district_chosen() {
        let mut form = BookingForm::new();
        assert!(!form.group().is_enabled("sourceCity"));

        form.group.set("sourceCity", "Lonavala");
        form.choose_source_district("Pune");
        assert!(form.group().is_enabled("sourceCity"));
        assert_eq!(form.group().value("sourceCity"), "");

        form.choose_source_district("");
        assert!(form.group().is_enabled("sourceCity"));
    }

    #[test]
    fn submit_builds_locations_and_instant() {
        let mut form = BookingForm::new();
        form.fill(&BookingInput {
            source_district: "Pune".to_string(),
            source_city: "Kothrud".to_string(),
            destination_district: "Raigad".to_string(),
            destination_city: "Alibag".to_string(),
            date: "2026-11-02".to_string(),
            time: "06:30".to_string(),
        });

        let draft = form.submit().unwrap();
        assert_eq!(draft.source_location, "Kothrud, Pune");
        assert_eq!(draft.destination_location, "Alibag, Raigad");
    }

    #[test]
    fn missing_city_is_a_validation_error() {
        let mut form = BookingForm::new();
        form.fill(&BookingInput {
            source_district: "Pune".to_string(),
            destination_district: "Raigad".to_string(),
            destination_city: "Alibag".to_string(),
            date: "2026-11-02".to_string(),
            time: "06:30".to_string(),
            ..BookingInput::default()
        });

        let errors = form.submit().unwrap_err();
        assert!(errors.has("sourceCity"));
        assert_eq!(errors.message(), "Please fill out all fields completely.");
    }

    #[test]
    fn pickup_instant_uses_local_offset() {
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let instant = pickup_instant("2026-11-02", "06:30", &ist).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 11, 2, 1, 0, 0).unwrap());
        assert!(pickup_instant("2026-13-02", "06:30", &ist).is_err());
    }
}
