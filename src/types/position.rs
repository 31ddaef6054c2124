//! Decoded position telemetry

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// One position reading emitted by the in-game telemetry script.
///
/// Identity is spatial: equality and hashing consider `(x, y, z)` only, so
/// two readings at the same coordinates with different headings collapse to
/// one key in a `HashSet` or `HashMap`. Compare `heading` explicitly when it
/// matters.
///
/// Coordinates are compared by bit pattern after folding `-0.0` into `0.0`,
/// which keeps `Eq` and `Hash` consistent even for NaN.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub heading: f64,
}

impl Position {
    /// Create a new position reading
    pub fn new(x: f64, y: f64, z: f64, heading: f64) -> Self {
        Self { x, y, z, heading }
    }

    /// Build a position from exactly `[x, y, z, heading]`
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [x, y, z, heading] => Some(Self::new(*x, *y, *z, *heading)),
            _ => None,
        }
    }

    /// Straight-line distance to another position, ignoring heading
    pub fn distance_to(&self, other: &Position) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    fn spatial_key(&self) -> [u64; 3] {
        [canonical_bits(self.x), canonical_bits(self.y), canonical_bits(self.z)]
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 { 0.0f64.to_bits() } else { value.to_bits() }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.spatial_key() == other.spatial_key()
    }
}

impl Eq for Position {}

impl Hash for Position {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.spatial_key().hash(state);
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Position(x={:.3}, y={:.3}, z={:.3}, heading={:.1})",
            self.x, self.y, self.z, self.heading
        )
    }
}
