pub mod flights;
pub mod pricing;
pub mod routes;

pub use flights::FlightCatalog;
pub use pricing::RouteFare;
pub use routes::{RouteCatalog, RouteInput, RoutePatch};
