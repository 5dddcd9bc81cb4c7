//! Mileage aggregator: folds completed legs into per-jurisdiction totals.
//!
//! The aggregator keys its input by leg id, so folding the same leg twice is
//! a no-op and merging two aggregators is a set union. Totals are computed
//! from that set on demand; the result therefore depends only on which legs
//! were folded, never on the order they arrived in.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{JurisdictionMiles, LegKind, LegStatus, TripLeg};

/// Per-jurisdiction row of the IFTA worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionTotal {
    pub jurisdiction_code: String,
    pub route_miles: Decimal,
    pub deadhead_miles: Decimal,
    pub total_miles: Decimal,
}

/// Grand totals plus the jurisdiction table sorted by code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MileageTotals {
    pub route_miles: Decimal,
    pub deadhead_miles: Decimal,
    pub total_miles: Decimal,
    pub jurisdiction_count: usize,
    pub jurisdictions: Vec<JurisdictionTotal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Contribution {
    kind: LegKind,
    miles: JurisdictionMiles,
}

/// Accumulates completed legs for a reporting scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MileageAggregator {
    legs: BTreeMap<String, Contribution>,
}

impl MileageAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an aggregator from a set of legs.
    pub fn from_legs<'a>(legs: impl IntoIterator<Item = &'a TripLeg>) -> Self {
        let mut agg = Self::new();
        for leg in legs {
            agg.fold(leg);
        }
        agg
    }

    /// Fold one leg in. Returns `false` when the leg was ignored: it is not
    /// `COMPLETED` or it has already been folded.
    pub fn fold(&mut self, leg: &TripLeg) -> bool {
        if leg.status != LegStatus::Completed || self.legs.contains_key(&leg.id) {
            return false;
        }
        self.legs.insert(
            leg.id.clone(),
            Contribution {
                kind: leg.kind,
                miles: leg.route_miles_by_jurisdiction.clone(),
            },
        );
        true
    }

    /// Union with another aggregator.
    pub fn merge(&mut self, other: &MileageAggregator) {
        for (id, contribution) in &other.legs {
            self.legs
                .entry(id.clone())
                .or_insert_with(|| contribution.clone());
        }
    }

    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }

    pub fn contains(&self, leg_id: &str) -> bool {
        self.legs.contains_key(leg_id)
    }

    /// Compute totals over every folded leg.
    pub fn totals(&self) -> MileageTotals {
        let mut by_code: BTreeMap<&str, (Decimal, Decimal)> = BTreeMap::new();

        for contribution in self.legs.values() {
            for entry in contribution.miles.iter() {
                let slot = by_code
                    .entry(entry.jurisdiction.as_str())
                    .or_insert((Decimal::ZERO, Decimal::ZERO));
                match contribution.kind {
                    LegKind::Loaded => slot.0 += entry.miles,
                    LegKind::DeadheadReturn => slot.1 += entry.miles,
                }
            }
        }

        let jurisdictions: Vec<JurisdictionTotal> = by_code
            .into_iter()
            .map(|(code, (route, deadhead))| JurisdictionTotal {
                jurisdiction_code: code.to_string(),
                route_miles: route,
                deadhead_miles: deadhead,
                total_miles: route + deadhead,
            })
            .collect();

        let route_miles: Decimal = jurisdictions.iter().map(|j| j.route_miles).sum();
        let deadhead_miles: Decimal = jurisdictions.iter().map(|j| j.deadhead_miles).sum();

        MileageTotals {
            route_miles,
            deadhead_miles,
            total_miles: route_miles + deadhead_miles,
            jurisdiction_count: jurisdictions.len(),
            jurisdictions,
        }
    }
}
