pub mod fare;
pub mod links;
pub mod locations;
pub mod status;

pub use fare::{Car, Fare, FareSummary, FareTable, Money, Quote, RouteFare, SeatClass};
pub use links::{ContactDetails, Enquiry};
