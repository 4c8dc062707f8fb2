use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use skybook_core::{
    bounded, CoreError, CoreResult, FlightRoute, NewRoute, Page, PageRequest, RouteSearch, Store,
};

use crate::pricing::RouteFare;

#[derive(Debug, Clone)]
pub struct RouteInput {
    pub flight_id: i64,
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub base_price: Decimal,
    pub gst: Decimal,
}

/// Partial route update. The owning flight cannot be changed.
#[derive(Debug, Clone, Default)]
pub struct RoutePatch {
    pub departure_city: Option<String>,
    pub arrival_city: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub base_price: Option<Decimal>,
    pub gst: Option<Decimal>,
}

impl RoutePatch {
    pub fn is_empty(&self) -> bool {
        self.departure_city.is_none()
            && self.arrival_city.is_none()
            && self.departure_time.is_none()
            && self.arrival_time.is_none()
            && self.base_price.is_none()
            && self.gst.is_none()
    }

    /// Produces the merged route with a recomputed total.
    fn merge(&self, current: &FlightRoute) -> CoreResult<FlightRoute> {
        let fare = RouteFare::new(current.base_price, current.gst)?
            .with_changes(self.base_price, self.gst)?;
        let merged = FlightRoute {
            route_id: current.route_id,
            flight_id: current.flight_id,
            departure_city: self
                .departure_city
                .as_deref()
                .map(str::trim)
                .unwrap_or(&current.departure_city)
                .to_string(),
            arrival_city: self
                .arrival_city
                .as_deref()
                .map(str::trim)
                .unwrap_or(&current.arrival_city)
                .to_string(),
            departure_time: self.departure_time.unwrap_or(current.departure_time),
            arrival_time: self.arrival_time.unwrap_or(current.arrival_time),
            base_price: fare.base_price,
            gst: fare.gst,
            total_price: fare.total(),
        };
        check_itinerary(
            &merged.departure_city,
            &merged.arrival_city,
            merged.departure_time,
            merged.arrival_time,
        )?;
        Ok(merged)
    }
}

fn check_itinerary(
    departure_city: &str,
    arrival_city: &str,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
) -> CoreResult<()> {
    if departure_city.is_empty() || arrival_city.is_empty() {
        return Err(CoreError::ValidationError("cities must not be blank".to_string()));
    }
    if departure_city.eq_ignore_ascii_case(arrival_city) {
        return Err(CoreError::ValidationError(
            "departure_city and arrival_city must differ".to_string(),
        ));
    }
    if arrival_time <= departure_time {
        return Err(CoreError::ValidationError(
            "arrival_time must be after departure_time".to_string(),
        ));
    }
    Ok(())
}

/// Priced legs flown by catalog flights, and the public route search.
#[derive(Clone)]
pub struct RouteCatalog {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl RouteCatalog {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Add a route to an existing flight
    pub async fn add_route(&self, input: RouteInput) -> CoreResult<FlightRoute> {
        let fare = RouteFare::new(input.base_price, input.gst)?;
        let route = NewRoute {
            flight_id: input.flight_id,
            departure_city: input.departure_city.trim().to_string(),
            arrival_city: input.arrival_city.trim().to_string(),
            departure_time: input.departure_time,
            arrival_time: input.arrival_time,
            base_price: fare.base_price,
            gst: fare.gst,
            total_price: fare.total(),
        };
        check_itinerary(&route.departure_city, &route.arrival_city, route.departure_time, route.arrival_time)?;

        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.get_flight(route.flight_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Flight {}", route.flight_id)))?;
            let created = tx.insert_route(&route).await.map_err(|e| {
                CoreError::conflict_on_constraint(e, format!("Flight {} no longer exists", route.flight_id))
            })?;
            tx.commit().await?;
            info!(route_id = created.route_id, flight_id = created.flight_id, "Route created");
            Ok(created)
        })
        .await
    }

    pub async fn get_route(&self, route_id: i64) -> CoreResult<FlightRoute> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.get_route(route_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Route {}", route_id)))
        })
        .await
    }

    /// Update a route; the total price is recomputed from the merged fare.
    pub async fn update_route(&self, route_id: i64, patch: RoutePatch) -> CoreResult<FlightRoute> {
        if patch.is_empty() {
            return Err(CoreError::InvalidArgument("at least one field must be provided".to_string()));
        }

        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let current = tx
                .get_route(route_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Route {}", route_id)))?;
            let merged = patch.merge(&current)?;
            let updated = tx
                .update_route(&merged)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Route {}", route_id)))?;
            tx.commit().await?;
            info!(route_id, total_price = %updated.total_price, "Route updated");
            Ok(updated)
        })
        .await
    }

    pub async fn delete_route(&self, route_id: i64) -> CoreResult<()> {
        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            if !tx.delete_route(route_id).await? {
                return Err(CoreError::NotFound(format!("Route {}", route_id)));
            }
            tx.commit().await?;
            info!(route_id, "Route deleted");
            Ok(())
        })
        .await
    }

    /// Routes between two cities departing on the given UTC date, earliest first.
    pub async fn search_routes(&self, search: RouteSearch, page: PageRequest) -> CoreResult<Page<FlightRoute>> {
        let search = RouteSearch {
            departure_city: search.departure_city.trim().to_string(),
            arrival_city: search.arrival_city.trim().to_string(),
            date: search.date,
        };
        if search.departure_city.is_empty() || search.arrival_city.is_empty() {
            return Err(CoreError::InvalidArgument("departure_city and arrival_city are required".to_string()));
        }

        bounded(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let total = tx.count_routes(&search).await?;
            let items = tx.search_routes(&search, &page).await?;
            Ok(Page::new(items, page, total))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn route() -> FlightRoute {
        FlightRoute {
            route_id: 1,
            flight_id: 1,
            departure_city: "Delhi".to_string(),
            arrival_city: "Mumbai".to_string(),
            departure_time: Utc.with_ymd_and_hms(2025, 6, 1, 6, 0, 0).unwrap(),
            arrival_time: Utc.with_ymd_and_hms(2025, 6, 1, 8, 10, 0).unwrap(),
            base_price: Decimal::from(100),
            gst: Decimal::from(18),
            total_price: Decimal::from(118),
        }
    }

    #[test]
    fn test_merge_recomputes_total_from_gst_alone() {
        let patch = RoutePatch { gst: Some(Decimal::from(10)), ..Default::default() };
        let merged = patch.merge(&route()).unwrap();
        assert_eq!(merged.base_price, Decimal::from(100));
        assert_eq!(merged.total_price, Decimal::from(110));
    }

    #[test]
    fn test_merge_rejects_arrival_before_departure() {
        let patch = RoutePatch {
            arrival_time: Some(Utc.with_ymd_and_hms(2025, 6, 1, 5, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(matches!(patch.merge(&route()), Err(CoreError::ValidationError(_))));
    }

    #[test]
    fn test_same_city_rejected_ignoring_case() {
        let r = route();
        assert!(check_itinerary("Delhi", "delhi", r.departure_time, r.arrival_time).is_err());
    }
}
