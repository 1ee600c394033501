pub mod booking;
pub mod location;
pub mod profile;
pub mod route;
pub mod session;
pub mod vehicle;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use booking::{Booking, BookingStatus, NewBooking};
pub use location::Location;
pub use profile::{DriverDetails, Profile, ProfileMetadata, Role};
pub use route::{NewRoute, RoutePackage};
pub use session::{AuthEvent, Session, User};
pub use vehicle::{NewVehicle, Vehicle};

/// A row that can be cached, patched from a change feed and matched by id.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn record_id(&self) -> String;
}
