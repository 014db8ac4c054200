//! Travel-time / geocoding client with cache, daily quota, and hybrid
//! deterministic simulation for when the upstream API is unavailable or
//! over quota.

mod client;
mod error;
mod quota;
mod simulation;

pub use client::{GeoClient, GeoClientConfig, GeoMode, ReqwestGeoUpstream};
pub use error::GeoError;
pub use simulation::simulate_travel_time;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Driving,
    Transit,
    Cycling,
    Walking,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Transit => "transit",
            TravelMode::Cycling => "cycling",
            TravelMode::Walking => "walking",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    /// `minutes[i][j]` is the travel time from `origins[i]` to `destinations[j]`.
    pub minutes: Vec<Vec<i64>>,
}

/// The upstream API the [`GeoClient`] talks to when not simulating. The
/// core ships [`client::ReqwestGeoUpstream`] as the default implementation.
#[async_trait]
pub trait GeoUpstream: Send + Sync {
    async fn directions(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<i64, GeoError>;
    async fn geocode(&self, address: &str) -> Result<Location, GeoError>;
    async fn matrix(
        &self,
        origins: &[String],
        destinations: &[String],
        mode: TravelMode,
    ) -> Result<DistanceMatrix, GeoError>;
}
