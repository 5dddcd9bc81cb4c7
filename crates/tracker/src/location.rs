//! Live location source for deadhead-return origins.

use ifta_engine::Coordinate;

use crate::error::TrackerError;

/// Supplies the driver's current position.
///
/// A single synchronous read; accuracy and staleness are the source's concern.
pub trait LocationSource: Send + Sync {
    fn current_position(&self) -> Result<Coordinate, TrackerError>;
}

/// A position already known to the caller, e.g. sent by the driver's device.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinate);

impl FixedLocation {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, TrackerError> {
        Ok(FixedLocation(Coordinate::new(latitude, longitude)?))
    }
}

impl LocationSource for FixedLocation {
    fn current_position(&self) -> Result<Coordinate, TrackerError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_location_validates_range() {
        assert!(FixedLocation::new(32.7, -96.8).is_ok());
        assert!(matches!(
            FixedLocation::new(32.7, -196.8),
            Err(TrackerError::Apportion(_))
        ));
    }
}
