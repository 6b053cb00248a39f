//! Routes and the closed set of rail lines.

use std::fmt;

/// Whether a route is served by rail or bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    Rail,
    Bus,
}

/// One of the eight rail lines.
///
/// Each line is known by three names: the train tracker's code ("brn"), the
/// schedule's route id ("Brn") and a display name ("Brown").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RailLine {
    Red,
    Blue,
    Brown,
    Green,
    Orange,
    Purple,
    Pink,
    Yellow,
}

impl RailLine {
    pub const ALL: [RailLine; 8] = [
        RailLine::Red,
        RailLine::Blue,
        RailLine::Brown,
        RailLine::Green,
        RailLine::Orange,
        RailLine::Purple,
        RailLine::Pink,
        RailLine::Yellow,
    ];

    /// Code used by the train tracker API (`rt` parameter, `rt` field).
    pub fn api_code(&self) -> &'static str {
        match self {
            RailLine::Red => "red",
            RailLine::Blue => "blue",
            RailLine::Brown => "brn",
            RailLine::Green => "g",
            RailLine::Orange => "org",
            RailLine::Purple => "p",
            RailLine::Pink => "pink",
            RailLine::Yellow => "y",
        }
    }

    /// Route id in the schedule.
    pub fn route_id(&self) -> &'static str {
        match self {
            RailLine::Red => "Red",
            RailLine::Blue => "Blue",
            RailLine::Brown => "Brn",
            RailLine::Green => "G",
            RailLine::Orange => "Org",
            RailLine::Purple => "P",
            RailLine::Pink => "Pink",
            RailLine::Yellow => "Y",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RailLine::Red => "Red",
            RailLine::Blue => "Blue",
            RailLine::Brown => "Brown",
            RailLine::Green => "Green",
            RailLine::Orange => "Orange",
            RailLine::Purple => "Purple",
            RailLine::Pink => "Pink",
            RailLine::Yellow => "Yellow",
        }
    }

    /// Human-readable direction for a tracker `trDr` code ("1" or "5").
    pub fn direction(&self, code: &str) -> Option<&'static str> {
        let (one, five) = match self {
            RailLine::Red => ("Howard-bound", "95th/Dan Ryan-bound"),
            RailLine::Blue => ("O'Hare-bound", "Forest Park-bound"),
            RailLine::Brown => ("Kimball-bound", "Loop-bound"),
            RailLine::Green => (
                "Harlem/Lake-bound",
                "Ashland/63rd- or Cottage Grove-bound (toward 63rd St destinations)",
            ),
            RailLine::Orange => ("Loop-bound", "Midway-bound"),
            RailLine::Purple => ("Linden-bound", "Howard- or Loop-bound"),
            RailLine::Pink => ("Loop-bound", "54th/Cermak-bound"),
            RailLine::Yellow => ("Skokie-bound", "Howard-bound"),
        };
        match code.trim() {
            "1" => Some(one),
            "5" => Some(five),
            _ => None,
        }
    }

    /// Look a line up by its schedule route id. Exact match only.
    pub fn from_route_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.route_id() == id)
    }

    /// Look a line up by any of its names, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|l| {
            s.eq_ignore_ascii_case(l.api_code())
                || s.eq_ignore_ascii_case(l.route_id())
                || s.eq_ignore_ascii_case(l.name())
        })
    }
}

impl fmt::Display for RailLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A route as loaded from the schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub route_type: Option<u8>,
    pub url: Option<String>,
    pub color: Option<String>,
    pub text_color: Option<String>,
}

impl Route {
    /// A route carrying nothing but its id.
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            short_name: None,
            long_name: None,
            route_type: None,
            url: None,
            color: None,
            text_color: None,
        }
    }

    /// Rail if the id names one of the rail lines, bus otherwise.
    pub fn kind(&self) -> RouteKind {
        if self.rail_line().is_some() {
            RouteKind::Rail
        } else {
            RouteKind::Bus
        }
    }

    pub fn rail_line(&self) -> Option<RailLine> {
        RailLine::from_route_id(&self.id)
    }

    /// Best available display name.
    pub fn display_name(&self) -> &str {
        self.long_name
            .as_deref()
            .or(self.short_name.as_deref())
            .unwrap_or(&self.id)
    }
}

impl From<RailLine> for Route {
    fn from(line: RailLine) -> Self {
        Self {
            long_name: Some(line.name().to_string()),
            ..Route::bare(line.route_id())
        }
    }
}
