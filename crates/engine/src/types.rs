//! Domain types for mileage-tracked trip legs.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ApportionError;
use crate::reconcile::Reconciliation;

// ──────────────────────────────────────────────
// Coordinate
// ──────────────────────────────────────────────

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting values outside the valid lat/lng range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ApportionError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(ApportionError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Coordinate {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

// ──────────────────────────────────────────────
// LegKind / LegStatus
// ──────────────────────────────────────────────

/// Whether a leg carries revenue freight or is an empty return to terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegKind {
    Loaded,
    DeadheadReturn,
}

impl LegKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegKind::Loaded => "LOADED",
            LegKind::DeadheadReturn => "DEADHEAD_RETURN",
        }
    }
}

impl fmt::Display for LegKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a trip leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegStatus {
    Pending,
    RouteCalculated,
    InProgress,
    Completed,
    Failed,
}

impl LegStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegStatus::Pending => "PENDING",
            LegStatus::RouteCalculated => "ROUTE_CALCULATED",
            LegStatus::InProgress => "IN_PROGRESS",
            LegStatus::Completed => "COMPLETED",
            LegStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for LegStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(LegStatus::Pending),
            "ROUTE_CALCULATED" => Ok(LegStatus::RouteCalculated),
            "IN_PROGRESS" => Ok(LegStatus::InProgress),
            "COMPLETED" => Ok(LegStatus::Completed),
            "FAILED" => Ok(LegStatus::Failed),
            other => Err(format!("unknown leg status '{}'", other)),
        }
    }
}

// ──────────────────────────────────────────────
// JurisdictionMiles
// ──────────────────────────────────────────────

/// One (jurisdiction, miles) pair at the storage boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionEntry {
    pub jurisdiction: String,
    pub miles: Decimal,
}

/// Ordered jurisdiction → miles mapping.
///
/// Entries keep the order in which the route first enters each jurisdiction
/// and serialize as a list of `{jurisdiction, miles}` objects so stored
/// records diff cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JurisdictionMiles(Vec<JurisdictionEntry>);

impl JurisdictionMiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add miles to a jurisdiction, appending it if not yet present.
    pub fn add(&mut self, jurisdiction: &str, miles: Decimal) {
        match self.0.iter_mut().find(|e| e.jurisdiction == jurisdiction) {
            Some(entry) => entry.miles += miles,
            None => self.0.push(JurisdictionEntry {
                jurisdiction: jurisdiction.to_string(),
                miles,
            }),
        }
    }

    pub fn get(&self, jurisdiction: &str) -> Option<Decimal> {
        self.0
            .iter()
            .find(|e| e.jurisdiction == jurisdiction)
            .map(|e| e.miles)
    }

    pub fn iter(&self) -> impl Iterator<Item = &JurisdictionEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all jurisdiction miles.
    pub fn total(&self) -> Decimal {
        self.0.iter().map(|e| e.miles).sum()
    }

    /// Drop entries whose mileage is not strictly positive.
    pub(crate) fn retain_positive(&mut self) {
        self.0.retain(|e| e.miles > Decimal::ZERO);
    }
}

impl<'a> FromIterator<(&'a str, Decimal)> for JurisdictionMiles {
    fn from_iter<I: IntoIterator<Item = (&'a str, Decimal)>>(iter: I) -> Self {
        let mut miles = JurisdictionMiles::new();
        for (code, value) in iter {
            miles.add(code, value);
        }
        miles
    }
}

// ──────────────────────────────────────────────
// TripLeg
// ──────────────────────────────────────────────

/// Failure recorded on a leg that reached `FAILED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegFailure {
    pub code: String,
    pub message: String,
}

/// One directional movement whose mileage must be apportioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripLeg {
    pub id: String,
    pub truck_identifier: String,
    pub kind: LegKind,
    pub origin: Option<Coordinate>,
    pub destination: Option<Coordinate>,
    pub starting_odometer: Option<Decimal>,
    pub ending_odometer: Option<Decimal>,
    pub route_miles_by_jurisdiction: JurisdictionMiles,
    pub total_route_miles: Decimal,
    pub total_duration_seconds: u64,
    pub status: LegStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<LegFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<Reconciliation>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

/// Input for creating a new `PENDING` leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLeg {
    pub truck_identifier: String,
    pub kind: LegKind,
    pub origin: Option<Coordinate>,
    pub destination: Option<Coordinate>,
    #[serde(default)]
    pub starting_odometer: Option<Decimal>,
}

impl TripLeg {
    /// A fresh `PENDING` leg with an empty apportionment.
    pub fn pending(id: impl Into<String>, new_leg: NewLeg, created_at: OffsetDateTime) -> Self {
        TripLeg {
            id: id.into(),
            truck_identifier: new_leg.truck_identifier,
            kind: new_leg.kind,
            origin: new_leg.origin,
            destination: new_leg.destination,
            starting_odometer: new_leg.starting_odometer,
            ending_odometer: None,
            route_miles_by_jurisdiction: JurisdictionMiles::new(),
            total_route_miles: Decimal::ZERO,
            total_duration_seconds: 0,
            status: LegStatus::Pending,
            failure: None,
            reconciliation: None,
            created_at,
            started_at: None,
            completed_at: None,
        }
    }

    /// Origin and destination, or the first one that is missing.
    pub fn endpoints(&self) -> Result<(Coordinate, Coordinate), ApportionError> {
        let origin = self.origin.ok_or_else(|| ApportionError::MissingCoordinate {
            leg_id: self.id.clone(),
            which: "origin",
        })?;
        let destination = self
            .destination
            .ok_or_else(|| ApportionError::MissingCoordinate {
                leg_id: self.id.clone(),
                which: "destination",
            })?;
        Ok((origin, destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_rejects_out_of_range() {
        assert!(Coordinate::new(91.0, 0.0).is_err());
        assert!(Coordinate::new(0.0, -181.0).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(35.4676, -97.5164).is_ok());
    }

    #[test]
    fn jurisdiction_miles_accumulates_in_first_seen_order() {
        let mut miles = JurisdictionMiles::new();
        miles.add("TX", Decimal::new(1000, 1));
        miles.add("OK", Decimal::new(500, 1));
        miles.add("TX", Decimal::new(250, 1));

        let codes: Vec<&str> = miles.iter().map(|e| e.jurisdiction.as_str()).collect();
        assert_eq!(codes, vec!["TX", "OK"]);
        assert_eq!(miles.get("TX"), Some(Decimal::new(1250, 1)));
        assert_eq!(miles.total(), Decimal::new(1750, 1));
    }

    #[test]
    fn jurisdiction_miles_serializes_as_ordered_pairs() {
        let miles: JurisdictionMiles = [("TX", Decimal::new(3000, 1)), ("OK", Decimal::new(2000, 1))]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&miles).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"jurisdiction": "TX", "miles": "300.0"},
                {"jurisdiction": "OK", "miles": "200.0"}
            ])
        );
        let back: JurisdictionMiles = serde_json::from_value(json).unwrap();
        assert_eq!(back, miles);
    }

    #[test]
    fn leg_status_round_trips_through_str() {
        for status in [
            LegStatus::Pending,
            LegStatus::RouteCalculated,
            LegStatus::InProgress,
            LegStatus::Completed,
            LegStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<LegStatus>(), Ok(status));
        }
        assert!("DRIVING".parse::<LegStatus>().is_err());
    }

    #[test]
    fn endpoints_reports_missing_destination() {
        let leg = TripLeg::pending(
            "leg-1",
            NewLeg {
                truck_identifier: "T-100".to_string(),
                kind: LegKind::Loaded,
                origin: Some(Coordinate::new(32.7767, -96.797).unwrap()),
                destination: None,
                starting_odometer: None,
            },
            OffsetDateTime::UNIX_EPOCH,
        );
        assert_eq!(
            leg.endpoints(),
            Err(ApportionError::MissingCoordinate {
                leg_id: "leg-1".to_string(),
                which: "destination",
            })
        );
    }
}
