use std::fmt;

use serde::{Deserialize, Serialize};

/// Amount in paise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const fn rupees(rupees: u64) -> Self {
        Money(rupees * 100)
    }

    pub const fn paise(self) -> u64 {
        self.0
    }

    pub fn percent(self, percent: u64) -> Self {
        Money(self.0 * percent / 100)
    }

    pub fn saturating_sub(self, other: Money) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rupees, paise) = (self.0 / 100, self.0 % 100);
        if paise == 0 {
            write!(f, "₹{rupees}")
        } else {
            write!(f, "₹{rupees}.{paise:02}")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeatClass {
    #[serde(rename = "4 Seater")]
    FourSeater,
    #[serde(rename = "6 Seater")]
    SixSeater,
}

impl SeatClass {
    pub fn label(&self) -> &'static str {
        match self {
            SeatClass::FourSeater => "4 Seater",
            SeatClass::SixSeater => "6 Seater",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteFare {
    pub destination: &'static str,
    pub four_seater: Money,
    pub six_seater: Money,
    pub km_limit: u32,
    pub package: bool,
}

impl RouteFare {
    pub fn price(&self, class: SeatClass) -> Money {
        match class {
            SeatClass::FourSeater => self.four_seater,
            SeatClass::SixSeater => self.six_seater,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Car {
    pub name: &'static str,
    pub class: SeatClass,
    pub rate_per_km: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fare {
    pub destination: String,
    pub class: SeatClass,
    pub base: Money,
    pub discount: Money,
    pub total: Money,
    pub km_limit: u32,
    pub package: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_per_km: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "fare", rename_all = "snake_case")]
pub enum Quote {
    Available(Fare),
    Unavailable,
}

impl Quote {
    pub fn fare(&self) -> Option<&Fare> {
        match self {
            Quote::Available(fare) => Some(fare),
            Quote::Unavailable => None,
        }
    }
}

/// What the enquiry dialog shows for the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FareSummary {
    pub price: String,
    pub details: String,
    pub valid: bool,
}

impl FareSummary {
    pub fn from_quote(quote: &Quote) -> Self {
        match quote {
            Quote::Available(fare) => {
                let extra = fare
                    .extra_per_km
                    .map(|rate| format!(" | Extra {rate}/km"))
                    .unwrap_or_default();
                Self {
                    price: format!("{}/-", fare.total),
                    details: format!("{} KM Limit{extra}", fare.km_limit),
                    valid: true,
                }
            }
            Quote::Unavailable => Self {
                price: "Get Quote".to_string(),
                details: "Select destination for fare".to_string(),
                valid: false,
            },
        }
    }
}

const PACKAGE_DISCOUNT_PERCENT: u64 = 10;

pub struct FareTable {
    routes: Vec<RouteFare>,
    cars: Vec<Car>,
    origins: Vec<&'static str>,
}

impl FareTable {
    pub fn new(routes: Vec<RouteFare>, cars: Vec<Car>, origins: Vec<&'static str>) -> Self {
        Self {
            routes,
            cars,
            origins,
        }
    }

    pub fn standard() -> Self {
        let route = |destination, four, six, km_limit, package| RouteFare {
            destination,
            four_seater: Money::rupees(four),
            six_seater: Money::rupees(six),
            km_limit,
            package,
        };

        Self::new(
            vec![
                route("Bhimashankar", 3599, 4500, 250, false),
                route("Lonavala", 3599, 4500, 200, false),
                route("Mahabaleshwar", 3599, 4500, 280, false),
                route("Alibag", 5999, 6599, 350, false),
                route("Goa", 14999, 16999, 1000, true),
                route("Matheran", 3999, 4599, 250, false),
                route("Tarkarli Beach", 10999, 12599, 850, true),
                route("Diveagar Beach", 5999, 6599, 350, false),
            ],
            vec![
                Car {
                    name: "Swift Dzire",
                    class: SeatClass::FourSeater,
                    rate_per_km: Money::rupees(12),
                },
                Car {
                    name: "Maruti Suzuki Ertiga",
                    class: SeatClass::SixSeater,
                    rate_per_km: Money::rupees(15),
                },
                Car {
                    name: "Maruti Suzuki WagonR",
                    class: SeatClass::FourSeater,
                    rate_per_km: Money::rupees(11),
                },
            ],
            vec!["Pune"],
        )
    }

    pub fn routes(&self) -> &[RouteFare] {
        &self.routes
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn route(&self, destination: &str) -> Option<&RouteFare> {
        self.routes.iter().find(|route| route.destination == destination)
    }

    pub fn car(&self, name: &str) -> Option<&Car> {
        self.cars.iter().find(|car| car.name == name)
    }

    pub fn quote(&self, destination: &str, class: SeatClass) -> Quote {
        match self.route(destination) {
            Some(route) => Quote::Available(fare_for(route, class, None)),
            None => Quote::Unavailable,
        }
    }

    pub fn quote_for_car(&self, destination: &str, car_name: &str) -> Quote {
        match (self.route(destination), self.car(car_name)) {
            (Some(route), Some(car)) => {
                Quote::Available(fare_for(route, car.class, Some(car.rate_per_km)))
            }
            _ => Quote::Unavailable,
        }
    }

    /// Every place the enquiry dialog offers: origins first, then destinations.
    pub fn places(&self) -> Vec<&'static str> {
        self.origins
            .iter()
            .copied()
            .chain(self.routes.iter().map(|route| route.destination))
            .collect()
    }

    pub fn suggest(&self, typed: &str) -> Vec<&'static str> {
        let needle = typed.to_lowercase();
        self.places()
            .into_iter()
            .filter(|place| place.to_lowercase().contains(&needle))
            .collect()
    }
}

impl Default for FareTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn fare_for(route: &RouteFare, class: SeatClass, extra_per_km: Option<Money>) -> Fare {
    let base = route.price(class);
    let discount = if route.package {
        base.percent(PACKAGE_DISCOUNT_PERCENT)
    } else {
        Money::default()
    };

    Fare {
        destination: route.destination.to_string(),
        class,
        base,
        discount,
        total: base.saturating_sub(discount),
        km_limit: route.km_limit,
        package: route.package,
        extra_per_km,
    }
}

#[cfg(test)]
mod tests {
    use super::{FareSummary, FareTable, Money, Quote, SeatClass};

    #[test]
    fn every_listed_pair_is_priced_with_exact_package_discount() {
        let table = FareTable::standard();

        for route in table.routes() {
            for class in [SeatClass::FourSeater, SeatClass::SixSeater] {
                let quote = table.quote(route.destination, class);
                let fare = quote.fare().expect("listed destination must be priced");
                let base = route.price(class);

                assert_eq!(fare.base, base);
                if route.package {
                    assert_eq!(fare.discount.paise() * 10, base.paise());
                    assert_eq!(fare.total.paise(), base.paise() * 9 / 10);
                } else {
                    assert_eq!(fare.discount, Money::default());
                    assert_eq!(fare.total, base);
                }
            }
        }
    }

    #[test]
    fn unknown_destination_has_no_quote() {
        let table = FareTable::standard();
        assert_eq!(table.quote("Atlantis", SeatClass::FourSeater), Quote::Unavailable);
        assert_eq!(table.quote("", SeatClass::SixSeater), Quote::Unavailable);
        assert_eq!(table.quote_for_car("Lonavala", "Hovercraft"), Quote::Unavailable);
    }

    #[test]
    fn summary_matches_dialog_wording() {
        let table = FareTable::standard();

        let lonavala = FareSummary::from_quote(&table.quote_for_car("Lonavala", "Swift Dzire"));
        assert_eq!(lonavala.price, "₹3599/-");
        assert_eq!(lonavala.details, "200 KM Limit | Extra ₹12/km");
        assert!(lonavala.valid);

        let goa = FareSummary::from_quote(&table.quote_for_car("Goa", "Maruti Suzuki Ertiga"));
        assert_eq!(goa.price, "₹15299.10/-");
        assert_eq!(goa.details, "1000 KM Limit | Extra ₹15/km");

        let missing = FareSummary::from_quote(&Quote::Unavailable);
        assert_eq!(missing.price, "Get Quote");
        assert_eq!(missing.details, "Select destination for fare");
        assert!(!missing.valid);
    }

    #[test]
    fn suggestions_are_case_insensitive_substrings() {
        let table = FareTable::standard();
        assert_eq!(table.suggest("beach"), vec!["Tarkarli Beach", "Diveagar Beach"]);
        assert_eq!(table.suggest("PU"), vec!["Pune"]);
        assert_eq!(table.suggest("").len(), 9);
    }
}
