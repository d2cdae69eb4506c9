//! Input data model: delivery locations and the depot.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),
}

/// A geocoded stop: identifier, coordinates and an optional address label.
///
/// Coordinates are validated on construction and cannot change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    id: String,
    lat: f64,
    lng: f64,
    address: Option<String>,
}

impl Location {
    pub fn new(id: impl Into<String>, lat: f64, lng: f64) -> Result<Self, LocationError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(LocationError::InvalidLatitude(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(LocationError::InvalidLongitude(lng));
        }

        Ok(Self {
            id: id.into(),
            lat,
            lng,
            address: None,
        })
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Coordinates as (lat, lng).
    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

/// The fixed start/end point shared by every route.
#[derive(Debug, Clone, PartialEq)]
pub struct Depot(Location);

impl Depot {
    pub fn new(location: Location) -> Self {
        Self(location)
    }

    pub fn location(&self) -> &Location {
        &self.0
    }

    pub fn coords(&self) -> (f64, f64) {
        self.0.coords()
    }
}

/// Location ordering used for the full OD matrix: depot at index 0, then
/// the addresses in input order.
pub fn planning_coordinates(depot: &Depot, addresses: &[Location]) -> Vec<(f64, f64)> {
    std::iter::once(depot.coords())
        .chain(addresses.iter().map(Location::coords))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert_eq!(
            Location::new("a", 91.0, 0.0),
            Err(LocationError::InvalidLatitude(91.0))
        );
        assert_eq!(
            Location::new("a", 0.0, -180.5),
            Err(LocationError::InvalidLongitude(-180.5))
        );
        assert!(Location::new("a", f64::NAN, 0.0).is_err());
    }

    #[test]
    fn accepts_boundary_coordinates() {
        let location = Location::new("edge", -90.0, 180.0).unwrap();
        assert_eq!(location.coords(), (-90.0, 180.0));
        assert_eq!(location.address(), None);
    }

    #[test]
    fn depot_comes_first_in_planning_order() {
        let depot = Depot::new(Location::new("depot", 51.0, -114.0).unwrap());
        let addresses = vec![
            Location::new("a", 51.1, -114.1).unwrap().with_address("1 MAIN ST NE"),
            Location::new("b", 51.2, -114.2).unwrap(),
        ];

        let coords = planning_coordinates(&depot, &addresses);
        assert_eq!(coords, vec![(51.0, -114.0), (51.1, -114.1), (51.2, -114.2)]);
        assert_eq!(addresses[0].address(), Some("1 MAIN ST NE"));
    }
}
