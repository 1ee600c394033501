use std::collections::BTreeSet;

use crate::models::Location;

/// Sorted, de-duplicated districts.
pub fn districts(rows: &[Location]) -> Vec<String> {
    rows.iter()
        .map(|row| row.district.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn cities_in(rows: &[Location], district: &str) -> Vec<String> {
    rows.iter()
        .filter(|row| row.district == district)
        .map(|row| row.city_name.clone())
        .collect()
}

/// `"<city>, <district>"`, the form stored on bookings.
pub fn display_name(city: &str, district: &str) -> String {
    format!("{city}, {district}")
}

#[cfg(test)]
mod tests {
    use super::{cities_in, districts, display_name};
    use crate::models::Location;

    fn row(city: &str, district: &str) -> Location {
        Location {
            city_name: city.to_string(),
            district: district.to_string(),
        }
    }

    #[test]
    fn districts_are_sorted_and_unique() {
        let rows = vec![
            row("Lonavala", "Pune"),
            row("Alibag", "Raigad"),
            row("Baramati", "Pune"),
            row("Karad", "Satara"),
            row("Matheran", "Raigad"),
        ];

        assert_eq!(districts(&rows), vec!["Pune", "Raigad", "Satara"]);
        assert_eq!(cities_in(&rows, "Raigad"), vec!["Alibag", "Matheran"]);
        assert!(cities_in(&rows, "Nagpur").is_empty());
        assert!(districts(&[]).is_empty());
        assert_eq!(display_name("Alibag", "Raigad"), "Alibag, Raigad");
    }
}
