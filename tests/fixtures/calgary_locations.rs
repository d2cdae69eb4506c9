//! Real Calgary locations for realistic test fixtures.
//!
//! Coordinates are routable points in the Calgary road network (OSM
//! Alberta extract). The depot is the warehouse on Aero Drive NE.

use delivery_planner::{Depot, Location};

/// A named point with coordinates.
#[derive(Debug, Clone)]
pub struct Place {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Place {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    pub fn to_location(&self) -> Location {
        Location::new(self.name, self.lat, self.lng).expect("fixture coordinates are valid")
    }
}

pub const WAREHOUSE: Place = Place::new("24 AERO DR NE", 51.1196913, -114.0316978);

// ============================================================================
// North of the Bow
// ============================================================================

pub const NORTH: &[Place] = &[
    Place::new("Country Hills Town Centre", 51.1562, -114.0688),
    Place::new("Nose Hill Park", 51.1106, -114.1108),
    Place::new("Market Mall", 51.0849, -114.1557),
    Place::new("Crowfoot Crossing", 51.1247, -114.2073),
    Place::new("Calgary International Airport", 51.1315, -114.0106),
    Place::new("Peter Lougheed Centre", 51.0795, -113.9855),
];

// ============================================================================
// South Calgary
// ============================================================================

pub const SOUTH: &[Place] = &[
    Place::new("Southcentre Mall", 50.9576, -114.0673),
    Place::new("Fish Creek Park", 50.9085, -114.0366),
    Place::new("South Health Campus", 50.8825, -113.9536),
    Place::new("Deerfoot Meadows", 50.9695, -114.0458),
    Place::new("Rockyview General Hospital", 50.9895, -114.0971),
];

// ============================================================================
// Downtown / Inner City
// ============================================================================

pub const CENTRAL: &[Place] = &[
    Place::new("Calgary Tower", 51.0447, -114.0631),
    Place::new("Calgary Zoo", 51.0458, -114.0287),
    Place::new("SAIT", 51.0643, -114.0892),
    Place::new("Chinook Centre", 50.9983, -114.0732),
];

pub fn depot() -> Depot {
    Depot::new(WAREHOUSE.to_location())
}

/// Three northern and two southern addresses: two obvious routes.
pub fn five_addresses() -> Vec<Location> {
    vec![
        NORTH[0].to_location(),
        SOUTH[0].to_location(),
        NORTH[1].to_location(),
        SOUTH[1].to_location(),
        NORTH[4].to_location(),
    ]
}

/// `count` synthetic addresses on a regular grid over the city.
pub fn grid_addresses(count: usize) -> Vec<Location> {
    let side = (count as f64).sqrt().ceil() as usize;
    (0..count)
        .map(|i| {
            let lat = 50.90 + (i / side) as f64 * 0.015;
            let lng = -114.25 + (i % side) as f64 * 0.02;
            Location::new(format!("grid-{i}"), lat, lng).expect("grid stays in range")
        })
        .collect()
}
