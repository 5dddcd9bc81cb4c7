//! Jurisdiction span parser.
//!
//! Turns a truck-routing provider response into a per-jurisdiction mileage
//! split plus the provider's trip summary. The summary is authoritative for
//! the leg's total; spans only decide how that total is divided.
//!
//! Pure: the HTTP call that produces a [`RouteResponse`] lives in the tracker.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ApportionError;
use crate::numeric::{
    meters_to_miles, relative_difference, round_seconds, round_tenth, ApportionPolicy,
};
use crate::types::JurisdictionMiles;

// ──────────────────────────────────────────────
// Provider wire types
// ──────────────────────────────────────────────

/// Raw routing response (HERE Routing v8 layout).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(alias = "travelSummary")]
    pub summary: SectionSummary,
    #[serde(default)]
    pub spans: Vec<Span>,
}

/// Section totals: `length` in meters, `duration` in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub length: Decimal,
    #[serde(default)]
    pub duration: Decimal,
}

/// A sub-segment of a section, optionally annotated with a jurisdiction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Span length in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<Decimal>,
}

impl Span {
    /// Normalized jurisdiction code, if the span carries a usable one.
    pub fn jurisdiction(&self) -> Option<String> {
        let code = self.state_code.as_deref()?.trim();
        if code.is_empty() {
            None
        } else {
            Some(code.to_ascii_uppercase())
        }
    }
}

impl RouteResponse {
    /// Decode a provider payload.
    pub fn from_json(raw: &str) -> Result<Self, ApportionError> {
        serde_json::from_str(raw).map_err(|e| ApportionError::MalformedResponse(e.to_string()))
    }
}

// ──────────────────────────────────────────────
// Apportionment
// ──────────────────────────────────────────────

/// Result of apportioning one origin→destination route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteApportionment {
    pub total_miles: Decimal,
    pub total_duration_seconds: u64,
    pub miles_by_jurisdiction: JurisdictionMiles,
    /// Meters carried by spans with no jurisdiction code (or no length).
    pub unattributed_meters: Decimal,
    /// `|summary - attributed| / summary`, measured in meters.
    pub gap_ratio: Decimal,
}

/// Apportion the provider's preferred (first) route by jurisdiction.
///
/// Meters are summed per jurisdiction across every section, and coverage is
/// judged on those unrounded meters against the summary length. Tenths of a
/// mile are then handed out by largest remainder, so the rounded map sums to
/// the rounded attributed distance (the rounded total when every span is
/// annotated).
///
/// Fails with `NoRouteFound` for an empty or zero-length route, or one too
/// short to carry a tenth of a mile, and with `ProviderCoverageGap` when
/// unannotated spans leave more than `policy.coverage_tolerance` of the
/// summary distance unapportioned.
pub fn apportion_route(
    response: &RouteResponse,
    policy: &ApportionPolicy,
) -> Result<RouteApportionment, ApportionError> {
    let route = response.routes.first().ok_or(ApportionError::NoRouteFound)?;
    if route.sections.is_empty() {
        return Err(ApportionError::NoRouteFound);
    }

    let mut total_meters = Decimal::ZERO;
    let mut total_seconds = Decimal::ZERO;
    let mut meters_by_jurisdiction = JurisdictionMiles::new();
    let mut unattributed_meters = Decimal::ZERO;

    for section in &route.sections {
        total_meters += section.summary.length;
        total_seconds += section.summary.duration;

        for span in &section.spans {
            let length = span.length.unwrap_or(Decimal::ZERO);
            match span.jurisdiction() {
                Some(code) if span.length.is_some() => meters_by_jurisdiction.add(&code, length),
                _ => unattributed_meters += length,
            }
        }
    }

    let attributed_meters = meters_by_jurisdiction.total();
    let gap_ratio = match relative_difference(total_meters, attributed_meters, total_meters) {
        Some(ratio) if total_meters > Decimal::ZERO => ratio,
        _ => return Err(ApportionError::NoRouteFound),
    };
    let total_miles = round_tenth(meters_to_miles(total_meters));
    let attributed_miles = round_tenth(meters_to_miles(attributed_meters));

    if gap_ratio > policy.coverage_tolerance {
        return Err(ApportionError::ProviderCoverageGap {
            total_miles,
            apportioned_miles: attributed_miles,
            gap_ratio: gap_ratio.round_dp(4),
        });
    }

    let mut miles_by_jurisdiction = allocate_tenths(&meters_by_jurisdiction, attributed_miles);
    miles_by_jurisdiction.retain_positive();
    if miles_by_jurisdiction.is_empty() {
        return Err(ApportionError::NoRouteFound);
    }

    Ok(RouteApportionment {
        total_miles,
        total_duration_seconds: round_seconds(total_seconds),
        miles_by_jurisdiction,
        unattributed_meters,
        gap_ratio,
    })
}

/// Largest-remainder rounding: floor each jurisdiction to tenths, then give
/// the leftover tenths of `target` to the largest remainders. Ties go to the
/// jurisdiction met first along the route.
fn allocate_tenths(meters: &JurisdictionMiles, target: Decimal) -> JurisdictionMiles {
    let shares: Vec<(&str, Decimal, Decimal)> = meters
        .iter()
        .map(|e| {
            let exact = meters_to_miles(e.miles) * Decimal::TEN;
            let floor = exact.floor();
            (e.jurisdiction.as_str(), floor, exact - floor)
        })
        .collect();

    let floored: Decimal = shares.iter().map(|(_, floor, _)| *floor).sum();
    let mut leftover = target * Decimal::TEN - floored;

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| shares[b].2.cmp(&shares[a].2));
    let mut bumped = vec![false; shares.len()];
    for index in order {
        if leftover < Decimal::ONE {
            break;
        }
        bumped[index] = true;
        leftover -= Decimal::ONE;
    }

    shares
        .iter()
        .zip(bumped)
        .map(|(&(code, floor, _), bump)| {
            let tenths = if bump { floor + Decimal::ONE } else { floor };
            let mut miles = tenths / Decimal::TEN;
            miles.rescale(1);
            (code, miles)
        })
        .collect()
}
