//! Value-copied roster snapshots used to rebuild teams between rounds.

use serde::{Deserialize, Serialize};

use crate::{ArchetypeKey, Point, Team, UnitView};

/// Archetype and position of one unit captured in a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Archetype of the captured unit.
    pub archetype: ArchetypeKey,
    /// World-space center of the captured unit.
    pub position: Point,
}

impl UnitPlacement {
    /// Creates a new placement record.
    #[must_use]
    pub fn new(archetype: ArchetypeKey, position: Point) -> Self {
        Self {
            archetype,
            position,
        }
    }
}

/// Decoupled copy of one team's roster at a moment in time.
///
/// Snapshots hold plain data and never reference live units, so rebuilding
/// a roster from a snapshot cannot alias the units being discarded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    team: Team,
    placements: Vec<UnitPlacement>,
}

impl RosterSnapshot {
    /// Creates an empty snapshot for a team.
    #[must_use]
    pub const fn empty(team: Team) -> Self {
        Self {
            team,
            placements: Vec::new(),
        }
    }

    /// Creates a snapshot from explicit placements.
    #[must_use]
    pub fn from_placements(team: Team, placements: Vec<UnitPlacement>) -> Self {
        Self { team, placements }
    }

    /// Captures every living unit of `team` in identifier order.
    #[must_use]
    pub fn capture(team: Team, units: &UnitView) -> Self {
        let placements = units
            .living()
            .filter(|unit| unit.team == team)
            .map(|unit| UnitPlacement::new(unit.archetype.clone(), unit.position))
            .collect();
        Self { team, placements }
    }

    /// Team the snapshot belongs to.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    /// Captured placements in capture order.
    #[must_use]
    pub fn placements(&self) -> &[UnitPlacement] {
        &self.placements
    }

    /// Number of captured units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Reports whether the snapshot holds no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Returns a copy of the snapshot extended with additional placements.
    #[must_use]
    pub fn with_additional(&self, extra: impl IntoIterator<Item = UnitPlacement>) -> Self {
        let mut placements = self.placements.clone();
        placements.extend(extra);
        Self {
            team: self.team,
            placements,
        }
    }
}
