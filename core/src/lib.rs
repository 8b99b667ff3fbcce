#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Hexa autobattler engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! views such as [`UnitView`], and respond exclusively with new command
//! batches.

mod archetypes;
mod roster;

pub use archetypes::{
    ActionAnimation, ArchetypeKey, ArchetypeStats, ArchetypeTable, Delivery, HealStats,
};
pub use roster::{RosterSnapshot, UnitPlacement};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Distance at which a projectile is considered to have struck its target.
pub const PROJECTILE_HIT_RADIUS: f32 = 15.0;

/// Describes the active phase of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Players purchase and arrange units; the simulation is paused.
    Planning,
    /// Units fight autonomously until one team is wiped out.
    Combat,
}

/// Side a unit fights for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Team controlled by the player.
    Player,
    /// Opposing team generated by the round controller.
    Enemy,
}

impl Team {
    /// Returns the team this team fights against.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

/// Result of a finished combat phase from the player's perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// Every enemy died while at least one player unit survived.
    Won,
    /// Every player unit died. A simultaneous wipe also counts as a loss.
    Lost,
}

/// Combat action a unit can wind up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Damages an enemy.
    Attack,
    /// Restores health to an ally.
    Heal,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Generates the hex lattice. Placement is unavailable until this runs.
    ConfigureHexGrid {
        /// Dimensions and geometry of the lattice.
        layout: HexLayout,
    },
    /// Creates a unit at a position without charging gold.
    SpawnUnit {
        /// Archetype used to derive the unit's stats.
        archetype: ArchetypeKey,
        /// Team the unit fights for.
        team: Team,
        /// World-space position of the unit's center.
        position: Point,
    },
    /// Buys a player unit and places it on the free cell nearest the click.
    PurchaseUnit {
        /// Archetype to purchase.
        archetype: ArchetypeKey,
        /// World-space point that was clicked.
        at: Point,
    },
    /// Moves a player unit to the cell nearest the release point.
    RelocateUnit {
        /// Unit being dragged.
        unit: UnitId,
        /// World-space point where the drag was released.
        to: Point,
    },
    /// Reassigns every living unit to its nearest free cell.
    ReconcileOccupancy,
    /// Transitions the world from planning to combat.
    BeginCombat,
    /// Advances the simulation by one fixed step.
    Tick,
    /// Moves a unit one step toward another unit's current center.
    StepUnit {
        /// Unit that moves.
        unit: UnitId,
        /// Unit being approached.
        toward: UnitId,
    },
    /// Starts an attack or heal wind-up.
    BeginAction {
        /// Acting unit.
        unit: UnitId,
        /// Action to perform.
        action: ActionKind,
        /// Unit receiving the payload when the action resolves.
        target: UnitId,
    },
    /// Marks a unit as idle because it has nothing to do.
    IdleUnit {
        /// Unit that idles.
        unit: UnitId,
    },
    /// Ends the combat phase with the provided outcome.
    EndCombat {
        /// Result of the finished combat.
        outcome: RoundOutcome,
    },
    /// Discards every unit of a team and rebuilds it from a snapshot.
    ReplaceRoster {
        /// Team being rebuilt.
        team: Team,
        /// Archetypes and positions of the new roster.
        roster: RosterSnapshot,
    },
    /// Adds gold to the player's purse.
    GrantGold {
        /// Gold to add.
        amount: u32,
    },
    /// Increments the round counter.
    AdvanceRound,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the hex lattice was generated.
    GridGenerated {
        /// Number of cells in the lattice.
        cells: u32,
    },
    /// Confirms that a unit entered the world.
    UnitSpawned {
        /// Identifier allocated to the unit.
        unit: UnitId,
        /// Team the unit fights for.
        team: Team,
        /// Archetype of the unit.
        archetype: ArchetypeKey,
    },
    /// Confirms that a player unit was bought.
    UnitPurchased {
        /// Identifier allocated to the unit.
        unit: UnitId,
        /// Cell the unit was placed on.
        cell: CellCoord,
        /// Gold charged for the purchase.
        cost: u32,
    },
    /// Reports that a purchase was refused. No gold was charged.
    PurchaseRejected {
        /// Archetype requested for purchase.
        archetype: ArchetypeKey,
        /// Specific reason the purchase failed.
        reason: PurchaseError,
    },
    /// Confirms that a unit was moved to a new cell.
    UnitRelocated {
        /// Unit that moved.
        unit: UnitId,
        /// Cell the unit now occupies.
        cell: CellCoord,
    },
    /// Reports that a relocation was refused.
    RelocationRejected {
        /// Unit that was dragged.
        unit: UnitId,
        /// Specific reason the relocation failed.
        reason: RelocationError,
    },
    /// Reports that a unit could not be given a cell during reconciliation.
    UnitUnassigned {
        /// Unit left without a cell at its last known position.
        unit: UnitId,
    },
    /// Announces that the world entered a new phase.
    PhaseChanged {
        /// Phase that became active.
        phase: Phase,
    },
    /// Indicates that the simulation advanced by one tick.
    TimeAdvanced {
        /// Number of combat ticks elapsed since the world was created.
        tick: u64,
    },
    /// Confirms that a unit started winding up an action.
    ActionStarted {
        /// Acting unit.
        unit: UnitId,
        /// Action being performed.
        action: ActionKind,
        /// Recorded target.
        target: UnitId,
        /// Ticks until the action resolves.
        windup: u32,
    },
    /// Reports that an action resolved against a target that already died.
    ActionCancelled {
        /// Acting unit.
        unit: UnitId,
        /// Action whose payload was skipped.
        action: ActionKind,
        /// Target that died during the wind-up.
        target: UnitId,
    },
    /// Reports that a unit lost health.
    UnitDamaged {
        /// Damaged unit.
        unit: UnitId,
        /// Unit responsible for the damage.
        source: UnitId,
        /// Health removed.
        amount: u32,
        /// Health remaining after the hit.
        remaining: Health,
    },
    /// Reports that a unit regained health.
    UnitHealed {
        /// Healed unit.
        unit: UnitId,
        /// Healer.
        source: UnitId,
        /// Health after the heal.
        health: Health,
    },
    /// Announces that a unit's health reached zero.
    UnitDied {
        /// Unit that died.
        unit: UnitId,
        /// Team the unit fought for.
        team: Team,
    },
    /// Confirms that a ranged attack launched a projectile.
    ProjectileLaunched {
        /// Identifier allocated to the projectile.
        projectile: ProjectileId,
        /// Unit that fired.
        shooter: UnitId,
        /// Unit being tracked.
        target: UnitId,
    },
    /// Reports that a projectile vanished because its target died.
    ProjectileExpired {
        /// Projectile that vanished.
        projectile: ProjectileId,
    },
    /// Announces the end of combat.
    CombatEnded {
        /// Result of the combat.
        outcome: RoundOutcome,
    },
    /// Confirms that a team's roster was rebuilt from a snapshot.
    RosterReplaced {
        /// Team that was rebuilt.
        team: Team,
        /// Number of units created.
        units: u32,
    },
    /// Reports a change of the player's gold.
    GoldChanged {
        /// Gold held after the change.
        gold: u32,
    },
    /// Announces that a new round began.
    RoundAdvanced {
        /// Number of the round that became current.
        round: u32,
    },
}

/// Unique identifier assigned to a unit.
///
/// Identifiers increase monotonically, so sorting by identifier reproduces
/// creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new projectile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single hex cell expressed as row and column indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    row: u32,
    column: u32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }
}

/// Continuous world-space position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical coordinate.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Moves up to `step` units toward `destination` without overshooting.
    #[must_use]
    pub fn step_toward(self, destination: Point, step: f32) -> Point {
        let dx = destination.x - self.x;
        let dy = destination.y - self.y;
        let distance = dx.hypot(dy);
        if distance <= 0.0 || step <= 0.0 {
            return self;
        }
        if step >= distance {
            return destination;
        }

        Point::new(self.x + dx / distance * step, self.y + dy / distance * step)
    }
}

/// Current and remaining health of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Health(u32);

impl Health {
    /// Creates a new health value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the raw health value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Reports whether no health remains.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.0 == 0
    }

    /// Subtracts damage, saturating at zero.
    #[must_use]
    pub const fn saturating_sub(self, amount: u32) -> Self {
        Self(self.0.saturating_sub(amount))
    }

    /// Adds healing, capped at `max`.
    #[must_use]
    pub fn restored(self, amount: u32, max: Health) -> Self {
        Self(self.0.saturating_add(amount).min(max.0))
    }
}

/// Geometry of the hex lattice.
///
/// Cells are pointy-top hexagons laid out in rows; odd rows are shifted
/// right by half a cell so the lattice forms a brick-offset tiling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HexLayout {
    rows: u32,
    columns: u32,
    center: Point,
    cell_radius: f32,
    cell_margin: f32,
}

impl HexLayout {
    /// Creates a new lattice description.
    #[must_use]
    pub const fn new(
        rows: u32,
        columns: u32,
        center: Point,
        cell_radius: f32,
        cell_margin: f32,
    ) -> Self {
        Self {
            rows,
            columns,
            center,
            cell_radius,
            cell_margin,
        }
    }

    /// Number of rows in the lattice.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of cells per row.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// World-space point the lattice is centered on.
    #[must_use]
    pub const fn center(&self) -> Point {
        self.center
    }

    /// Distance from a cell's center to its corners.
    #[must_use]
    pub const fn cell_radius(&self) -> f32 {
        self.cell_radius
    }

    /// Gap between neighbouring cells.
    #[must_use]
    pub const fn cell_margin(&self) -> f32 {
        self.cell_margin
    }

    /// Total number of cells in the lattice.
    #[must_use]
    pub const fn cell_count(&self) -> u32 {
        self.rows.saturating_mul(self.columns)
    }
}

/// Immutable description of one generated hex cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellSnapshot {
    /// Row and column of the cell.
    pub coord: CellCoord,
    /// World-space center of the cell.
    pub center: Point,
    /// Distance from the lattice center, used by radial reveal effects.
    pub distance_from_center: f32,
    /// Unit occupying the cell, if any.
    pub occupant: Option<UnitId>,
}

/// Lifecycle state of a unit's combat state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitStatus {
    /// Nothing to do, or waiting out a cooldown.
    Idle,
    /// Moving toward a target.
    Seeking,
    /// Winding up an attack.
    Attacking,
    /// Winding up a heal.
    Healing,
    /// Terminal state once health reaches zero.
    Dead,
}

/// Action wind-up that has started but not yet resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PendingAction {
    /// Action being performed.
    pub kind: ActionKind,
    /// Unit receiving the payload.
    pub target: UnitId,
    /// Ticks remaining until resolution.
    pub remaining: u32,
}

/// Immutable representation of a single unit's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitSnapshot {
    /// Unique identifier assigned to the unit.
    pub id: UnitId,
    /// Team the unit fights for.
    pub team: Team,
    /// Archetype of the unit.
    pub archetype: ArchetypeKey,
    /// World-space center of the unit.
    pub position: Point,
    /// Cell the unit occupies, if any.
    pub cell: Option<CellCoord>,
    /// Current health.
    pub health: Health,
    /// Maximum health.
    pub max_health: Health,
    /// Maximum distance for starting an attack.
    pub attack_range: f32,
    /// Maximum distance for starting a heal, present only for healers.
    pub heal_range: Option<f32>,
    /// Ticks until the unit may attack again.
    pub attack_cooldown: u32,
    /// Ticks until the unit may heal again.
    pub heal_cooldown: u32,
    /// Current state machine status.
    pub status: UnitStatus,
    /// Action currently winding up.
    pub pending: Option<PendingAction>,
}

impl UnitSnapshot {
    /// Reports whether the unit is still alive.
    #[must_use]
    pub const fn alive(&self) -> bool {
        !self.health.is_depleted()
    }

    /// Reports whether the unit has lost any health.
    #[must_use]
    pub fn is_wounded(&self) -> bool {
        self.health < self.max_health
    }
}

/// Number of living units on each team.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LivingCounts {
    /// Living player units.
    pub player: u32,
    /// Living enemy units.
    pub enemy: u32,
}

/// Read-only snapshot describing every unit in the world.
#[derive(Clone, Debug, Default)]
pub struct UnitView {
    snapshots: Vec<UnitSnapshot>,
}

impl UnitView {
    /// Creates a new unit view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<UnitSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured unit snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.snapshots.iter()
    }

    /// Iterator over living units in deterministic order.
    pub fn living(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.snapshots.iter().filter(|snapshot| snapshot.alive())
    }

    /// Looks up a unit by identifier.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&UnitSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Counts living units per team.
    #[must_use]
    pub fn living_counts(&self) -> LivingCounts {
        let mut counts = LivingCounts::default();
        for snapshot in self.living() {
            match snapshot.team {
                Team::Player => counts.player += 1,
                Team::Enemy => counts.enemy += 1,
            }
        }
        counts
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<UnitSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of an in-flight projectile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Identifier allocated to the projectile.
    pub id: ProjectileId,
    /// Unit that fired the projectile.
    pub shooter: UnitId,
    /// Unit being tracked.
    pub target: UnitId,
    /// Current world-space position.
    pub position: Point,
    /// Damage applied on impact.
    pub damage: u32,
}

/// Reasons a hex grid operation may fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum GridError {
    /// The lattice has not been generated yet.
    #[error("hex grid has not been generated")]
    NotReady,
    /// The lattice was already generated.
    #[error("hex grid was already generated")]
    AlreadyGenerated,
    /// The coordinate lies outside the lattice.
    #[error("cell lies outside the hex grid")]
    UnknownCell,
    /// The cell is held by another unit.
    #[error("cell is occupied by another unit")]
    Occupied,
}

/// Reasons a purchase may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum PurchaseError {
    /// Purchases are only possible while planning.
    #[error("units can only be purchased during planning")]
    InvalidPhase,
    /// The archetype is not part of the archetype table.
    #[error("archetype is not available")]
    UnknownArchetype,
    /// The player cannot afford the archetype.
    #[error("not enough gold")]
    InsufficientGold,
    /// Every cell is occupied, or the grid is not generated.
    #[error("no free cell is available")]
    NoFreeCell,
    /// Every unit identifier has already been handed out.
    #[error("no further units can be created")]
    UnitsExhausted,
}

/// Reasons a relocation may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum RelocationError {
    /// Units can only be moved while planning.
    #[error("units can only be relocated during planning")]
    InvalidPhase,
    /// The unit does not exist, is dead, or belongs to the enemy.
    #[error("unit cannot be relocated")]
    UnknownUnit,
    /// The hex grid has not been generated.
    #[error("hex grid has not been generated")]
    NotReady,
    /// The nearest cell is held by another unit.
    #[error("cell is occupied by another unit")]
    Occupied,
}
