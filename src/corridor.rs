//! Tunnel identifiers, corridor geometry and the portal direction mapping.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Tunnel {
    Gotthard,
    MonteBianco,
    Frejus,
    Brenner,
}

impl Tunnel {
    pub const ALL: [Tunnel; 4] = [
        Tunnel::Gotthard,
        Tunnel::MonteBianco,
        Tunnel::Frejus,
        Tunnel::Brenner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tunnel::Gotthard => "gotthard",
            Tunnel::MonteBianco => "monte_bianco",
            Tunnel::Frejus => "frejus",
            Tunnel::Brenner => "brenner",
        }
    }
}

impl fmt::Display for Tunnel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tunnel {
    type Err = String;

    /// Accepts the canonical ids plus the legacy UI ids (`gottardo`,
    /// `monte-bianco`, `brennero`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gotthard" | "gottardo" => Ok(Tunnel::Gotthard),
            "monte_bianco" | "monte-bianco" | "mont_blanc" => Ok(Tunnel::MonteBianco),
            "frejus" => Ok(Tunnel::Frejus),
            "brenner" | "brennero" => Ok(Tunnel::Brenner),
            other => Err(format!("unknown tunnel: {other}")),
        }
    }
}

impl TryFrom<String> for Tunnel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Compass direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Direction {
    N,
    S,
    E,
    W,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::N => "N",
            Direction::S => "S",
            Direction::E => "E",
            Direction::W => "W",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    /// Accepts compass letters and the external forms used by the reading
    /// tables (`N2S`, `S2N`, `E2W`, `W2E`) and the UI (`northbound`, ...).
    /// `N2S` means travelling from north to south, i.e. [`Direction::S`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "s2n" | "northbound" => Ok(Direction::N),
            "s" | "n2s" | "southbound" => Ok(Direction::S),
            "e" | "w2e" | "eastbound" => Ok(Direction::E),
            "w" | "e2w" | "westbound" => Ok(Direction::W),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

impl TryFrom<String> for Direction {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    NS,
    EW,
}

impl Axis {
    pub fn directions(&self) -> [Direction; 2] {
        match self {
            Axis::NS => [Direction::N, Direction::S],
            Axis::EW => [Direction::E, Direction::W],
        }
    }
}

/// Which portal a trip starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Portal {
    A,
    B,
}

/// Portal order for a direction on an axis. Portal A is the north (NS) or
/// west (EW) end. Returns `None` for directions off the axis.
pub fn portal_order(axis: Axis, direction: Direction) -> Option<(Portal, Portal)> {
    match (axis, direction) {
        (Axis::NS, Direction::S) => Some((Portal::A, Portal::B)),
        (Axis::NS, Direction::N) => Some((Portal::B, Portal::A)),
        (Axis::EW, Direction::E) => Some((Portal::A, Portal::B)),
        (Axis::EW, Direction::W) => Some((Portal::B, Portal::A)),
        _ => None,
    }
}

/// Static description of one tunnel corridor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorridorConfig {
    pub axis: Axis,
    pub a: Coordinate,
    pub b: Coordinate,
    #[serde(default)]
    pub lane: Option<String>,
}

impl CorridorConfig {
    fn portal(&self, p: Portal) -> Coordinate {
        match p {
            Portal::A => self.a,
            Portal::B => self.b,
        }
    }
}

/// A resolved trip through a corridor.
#[derive(Debug, Clone, PartialEq)]
pub struct CorridorPath {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub points: Vec<Coordinate>,
}

/// Returns `n` points linearly spaced from `a` to `b`, both endpoints
/// included when `n >= 2`. `n == 1` yields `[a]`.
pub fn interpolate(a: Coordinate, b: Coordinate, n: usize) -> Vec<Coordinate> {
    (0..n)
        .map(|i| {
            let t = if n == 1 {
                0.0
            } else {
                i as f64 / (n - 1) as f64
            };
            Coordinate {
                lat: a.lat + (b.lat - a.lat) * t,
                lon: a.lon + (b.lon - a.lon) * t,
            }
        })
        .collect()
}

/// Corridor geometry for every known tunnel.
///
/// Defaults can be overridden per tunnel from a JSON file:
/// ```json
/// {
///   "gotthard": { "axis": "NS", "a": {"lat": 46.66, "lon": 8.58}, "b": {"lat": 46.52, "lon": 8.60}, "lane": "A2" }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CorridorTable {
    entries: HashMap<Tunnel, CorridorConfig>,
}

impl CorridorTable {
    pub fn builtin() -> Self {
        let entries = [
            (
                Tunnel::Gotthard,
                CorridorConfig {
                    axis: Axis::NS,
                    a: Coordinate::new(46.6671, 8.5866),
                    b: Coordinate::new(46.6475, 8.592),
                    lane: Some("A2".to_string()),
                },
            ),
            (
                Tunnel::MonteBianco,
                CorridorConfig {
                    axis: Axis::EW,
                    a: Coordinate::new(45.9286, 6.8639),
                    b: Coordinate::new(45.8206, 6.9727),
                    lane: Some("T1".to_string()),
                },
            ),
            (
                Tunnel::Frejus,
                CorridorConfig {
                    axis: Axis::EW,
                    a: Coordinate::new(45.1234, 6.7032),
                    b: Coordinate::new(45.0865, 6.7237),
                    lane: Some("T4".to_string()),
                },
            ),
            (
                Tunnel::Brenner,
                CorridorConfig {
                    axis: Axis::NS,
                    a: Coordinate::new(47.0027, 11.5056),
                    b: Coordinate::new(46.8988, 11.4828),
                    lane: Some("A13".to_string()),
                },
            ),
        ];
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Loads overrides from `path` on top of the built-in table.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read corridor file '{path}'"))?;
        let overrides: HashMap<Tunnel, CorridorConfig> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse corridor file '{path}'"))?;

        let mut table = Self::builtin();
        table.entries.extend(overrides);
        Ok(table)
    }

    pub fn get(&self, tunnel: Tunnel) -> Option<&CorridorConfig> {
        self.entries.get(&tunnel)
    }

    /// All `(tunnel, direction)` pairs valid on their tunnel's axis, in a
    /// stable order.
    pub fn pairs(&self) -> Vec<(Tunnel, Direction)> {
        Tunnel::ALL
            .iter()
            .filter_map(|t| self.get(*t).map(|cfg| (*t, cfg.axis)))
            .flat_map(|(t, axis)| axis.directions().into_iter().map(move |d| (t, d)))
            .collect()
    }

    /// Resolves origin, destination and `n_points` sampling points for a
    /// trip, or `None` when the direction is not on the tunnel's axis.
    pub fn path(&self, tunnel: Tunnel, direction: Direction, n_points: usize) -> Option<CorridorPath> {
        let cfg = self.get(tunnel)?;
        let (from, to) = portal_order(cfg.axis, direction)?;
        let origin = cfg.portal(from);
        let destination = cfg.portal(to);
        Some(CorridorPath {
            origin,
            destination,
            points: interpolate(origin, destination, n_points),
        })
    }
}

impl Default for CorridorTable {
    fn default() -> Self {
        Self::builtin()
    }
}
