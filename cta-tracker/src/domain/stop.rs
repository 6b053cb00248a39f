//! Stops, stations and transfers.

use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an invalid stop id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stop id: {0:?}")]
pub struct InvalidStopId(String);

/// Numeric stop identifier. Its range encodes what kind of stop it is.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StopId(u32);

/// What a stop id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopType {
    /// Below 30000.
    Bus,
    /// 30000 to 39999: a single rail platform.
    Rail,
    /// 40000 and above: a station grouping several platforms.
    ParentStation,
}

impl StopId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn parse(s: &str) -> Result<Self, InvalidStopId> {
        s.trim()
            .parse()
            .map(Self)
            .map_err(|_| InvalidStopId(s.to_string()))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn stop_type(&self) -> StopType {
        match self.0 {
            0..30_000 => StopType::Bus,
            30_000..40_000 => StopType::Rail,
            _ => StopType::ParentStation,
        }
    }
}

impl FromStr for StopId {
    type Err = InvalidStopId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopId({})", self.0)
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stop, platform or parent station.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub id: StopId,
    pub code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub location_type: u8,
    pub parent_station: Option<StopId>,
    pub wheelchair_boarding: bool,
    /// Built from a tracker response because the schedule has no such stop.
    pub synthesized: bool,
}

impl Stop {
    /// A stop the trackers know about but the schedule doesn't.
    ///
    /// Seasonal bus routes are the usual cause.
    pub fn synthesized(id: StopId, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id,
            code: None,
            name: name.into(),
            description: None,
            lat,
            lon,
            location_type: 0,
            parent_station: None,
            wheelchair_boarding: false,
            synthesized: true,
        }
    }

    pub fn stop_type(&self) -> StopType {
        self.id.stop_type()
    }
}

/// A transfer rule between two stops.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub from_stop: StopId,
    pub to_stop: StopId,
    pub transfer_type: u8,
    pub min_transfer_time: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_type_boundaries() {
        assert_eq!(StopId::new(0).stop_type(), StopType::Bus);
        assert_eq!(StopId::new(29_999).stop_type(), StopType::Bus);
        assert_eq!(StopId::new(30_000).stop_type(), StopType::Rail);
        assert_eq!(StopId::new(39_999).stop_type(), StopType::Rail);
        assert_eq!(StopId::new(40_000).stop_type(), StopType::ParentStation);
        assert_eq!(StopId::new(41_400).stop_type(), StopType::ParentStation);
    }

    #[test]
    fn parse_stop_ids() {
        assert_eq!(StopId::parse("15895").unwrap().get(), 15895);
        assert_eq!(StopId::parse(" 30141 ").unwrap().get(), 30141);
        assert!(StopId::parse("").is_err());
        assert!(StopId::parse("-3").is_err());
        assert!(StopId::parse("abc").is_err());
    }

    #[test]
    fn synthesized_stop() {
        let stop = Stop::synthesized(StopId::new(18000), "Beach", 41.9, -87.6);
        assert!(stop.synthesized);
        assert_eq!(stop.stop_type(), StopType::Bus);
        assert_eq!(stop.parent_station, None);
    }
}
