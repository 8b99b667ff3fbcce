#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the Hexa autobattler.
//!
//! The world owns the hex grid, every unit, in-flight projectiles, the
//! player's purse and the round counter. It is mutated exclusively through
//! [`apply`], which validates each [`Command`] and reports what happened as
//! [`Event`] values. Commands that fail validation leave the world unchanged.

mod hex;
mod projectiles;
mod units;

use hexa_core::{
    ActionKind, ArchetypeKey, ArchetypeTable, CellCoord, Command, Delivery, Event, GridError,
    HexLayout, Phase, PendingAction, Point, PurchaseError, RelocationError, RosterSnapshot,
    RoundOutcome, Team, UnitId, UnitStatus,
};
use tracing::{debug, info, warn};

use hex::HexGrid;
use projectiles::{Flight, ProjectileRegistry};
use units::UnitRegistry;

const FIRST_ROUND: u32 = 1;

/// Represents the authoritative Hexa world state.
#[derive(Debug)]
pub struct World {
    archetypes: ArchetypeTable,
    grid: HexGrid,
    units: UnitRegistry,
    projectiles: ProjectileRegistry,
    phase: Phase,
    gold: u32,
    round: u32,
    tick_index: u64,
}

impl World {
    /// Creates a world in the planning phase of the first round.
    ///
    /// The hex grid is not generated until [`Command::ConfigureHexGrid`] is
    /// applied.
    #[must_use]
    pub fn new(archetypes: ArchetypeTable, starting_gold: u32) -> Self {
        Self {
            archetypes,
            grid: HexGrid::new(),
            units: UnitRegistry::new(),
            projectiles: ProjectileRegistry::new(),
            phase: Phase::Planning,
            gold: starting_gold,
            round: FIRST_ROUND,
            tick_index: 0,
        }
    }

    fn configure_grid(&mut self, layout: HexLayout, out_events: &mut Vec<Event>) {
        match self.grid.generate(layout) {
            Ok(cells) => {
                info!(
                    rows = layout.rows(),
                    columns = layout.columns(),
                    "hex grid generated"
                );
                out_events.push(Event::GridGenerated { cells });
                self.reconcile_occupancy(out_events);
            }
            Err(error) => warn!(%error, "hex grid configuration ignored"),
        }
    }

    fn spawn_unit(
        &mut self,
        archetype: ArchetypeKey,
        team: Team,
        position: Point,
        out_events: &mut Vec<Event>,
    ) -> Option<UnitId> {
        let Some(stats) = self.archetypes.get(&archetype).copied() else {
            warn!(%archetype, "cannot spawn unknown archetype");
            return None;
        };

        let Some(unit) = self
            .units
            .spawn(team, archetype.clone(), stats, position)
        else {
            warn!(%archetype, "unit identifiers exhausted, spawn refused");
            return None;
        };
        out_events.push(Event::UnitSpawned {
            unit,
            team,
            archetype,
        });
        Some(unit)
    }

    fn purchase_unit(
        &mut self,
        archetype: ArchetypeKey,
        at: Point,
        out_events: &mut Vec<Event>,
    ) -> Result<(), PurchaseError> {
        if self.phase != Phase::Planning {
            return Err(PurchaseError::InvalidPhase);
        }
        let stats = self
            .archetypes
            .get(&archetype)
            .copied()
            .ok_or(PurchaseError::UnknownArchetype)?;
        let cost = stats.cost();
        if self.gold < cost {
            return Err(PurchaseError::InsufficientGold);
        }

        let cell = self
            .grid
            .nearest_free_cell(at)
            .ok()
            .flatten()
            .ok_or(PurchaseError::NoFreeCell)?;
        let center = self
            .grid
            .center_of(cell)
            .ok_or(PurchaseError::NoFreeCell)?;

        let Some(unit) = self
            .units
            .spawn(Team::Player, archetype.clone(), stats, center)
        else {
            warn!(%archetype, "unit identifiers exhausted, purchase refused");
            return Err(PurchaseError::UnitsExhausted);
        };
        if self.grid.assign(unit, cell).is_err() {
            let _ = self.units.remove(unit);
            return Err(PurchaseError::NoFreeCell);
        }

        self.gold -= cost;
        out_events.push(Event::UnitSpawned {
            unit,
            team: Team::Player,
            archetype,
        });
        out_events.push(Event::UnitPurchased { unit, cell, cost });
        out_events.push(Event::GoldChanged { gold: self.gold });
        Ok(())
    }

    fn relocate_unit(&mut self, unit: UnitId, to: Point) -> Result<CellCoord, RelocationError> {
        if self.phase != Phase::Planning {
            return Err(RelocationError::InvalidPhase);
        }
        match self.units.get(unit) {
            Some(state) if state.alive() && state.team == Team::Player => {}
            _ => return Err(RelocationError::UnknownUnit),
        }

        let cell = self
            .grid
            .nearest_cell(to)
            .map_err(|_| RelocationError::NotReady)?;
        let center = self.grid.assign(unit, cell).map_err(|error| match error {
            GridError::NotReady => RelocationError::NotReady,
            _ => RelocationError::Occupied,
        })?;

        if let Some(state) = self.units.get_mut(unit) {
            state.position = center;
        }
        Ok(cell)
    }

    /// Snaps every living unit onto its nearest free cell in identifier order.
    fn reconcile_occupancy(&mut self, out_events: &mut Vec<Event>) {
        let placements: Vec<(UnitId, Point)> = self
            .units
            .iter()
            .filter(|unit| unit.alive())
            .map(|unit| (unit.id, unit.position))
            .collect();

        let reconciliation = match self.grid.initialize_occupancy(placements) {
            Ok(reconciliation) => reconciliation,
            Err(error) => {
                debug!(%error, "occupancy reconciliation skipped");
                return;
            }
        };

        for (unit, _, center) in reconciliation.assigned {
            if let Some(state) = self.units.get_mut(unit) {
                state.position = center;
            }
        }
        for unit in reconciliation.unassigned {
            warn!(unit = unit.get(), "no free cell left for unit");
            out_events.push(Event::UnitUnassigned { unit });
        }
    }

    fn begin_combat(&mut self, out_events: &mut Vec<Event>) {
        if self.phase != Phase::Planning {
            warn!("combat already in progress");
            return;
        }

        for unit in self.units.iter_mut() {
            unit.reset_combat_state();
        }
        self.phase = Phase::Combat;
        info!(round = self.round, "combat started");
        out_events.push(Event::PhaseChanged {
            phase: Phase::Combat,
        });
    }

    fn advance_combat(&mut self, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        out_events.push(Event::TimeAdvanced {
            tick: self.tick_index,
        });

        for id in self.units.living_ids() {
            let Some(unit) = self.units.get_mut(id) else {
                continue;
            };
            if !unit.alive() {
                continue;
            }
            unit.tick_cooldowns();
            if let Some(action) = unit.advance_pending() {
                self.resolve_action(id, action, out_events);
            }
        }

        let units = &self.units;
        let finished = self.projectiles.advance(|target| {
            units
                .get(target)
                .filter(|unit| unit.alive())
                .map(|unit| unit.position)
        });
        for (projectile, flight) in finished {
            match flight {
                Flight::Struck {
                    shooter,
                    target,
                    damage,
                } => {
                    debug!(
                        projectile = projectile.get(),
                        target = target.get(),
                        damage,
                        "projectile struck"
                    );
                    self.damage_unit(target, shooter, damage, out_events);
                }
                Flight::Expired => out_events.push(Event::ProjectileExpired { projectile }),
                Flight::InFlight => {}
            }
        }
    }

    fn begin_action(
        &mut self,
        unit: UnitId,
        action: ActionKind,
        target: UnitId,
        out_events: &mut Vec<Event>,
    ) {
        let Some(actor) = self.units.get(unit) else {
            return;
        };
        let Some(recipient) = self.units.get(target) else {
            return;
        };
        if !actor.alive() || !recipient.alive() || actor.is_busy() {
            return;
        }
        if actor.cooldown_for(action) > 0 {
            debug!(unit = unit.get(), ?action, "action still cooling down");
            return;
        }
        let Some(range) = actor.range_for(action) else {
            return;
        };
        let valid_target = match action {
            ActionKind::Attack => recipient.team == actor.team.opponent(),
            ActionKind::Heal => recipient.team == actor.team && recipient.id != actor.id,
        };
        if !valid_target || actor.position.distance(recipient.position) > range {
            debug!(
                unit = unit.get(),
                target = target.get(),
                ?action,
                "action request refused"
            );
            return;
        }

        let Some(actor) = self.units.get_mut(unit) else {
            return;
        };
        let windup = actor.begin(action, target);
        out_events.push(Event::ActionStarted {
            unit,
            action,
            target,
            windup,
        });

        if windup == 0 {
            self.resolve_action(
                unit,
                PendingAction {
                    kind: action,
                    target,
                    remaining: 0,
                },
                out_events,
            );
        }
    }

    /// Delivers the payload of a finished wind-up.
    ///
    /// The cooldown starts even when the target died during the wind-up.
    fn resolve_action(&mut self, unit: UnitId, action: PendingAction, out_events: &mut Vec<Event>) {
        let Some(actor) = self.units.get_mut(unit) else {
            return;
        };
        if !actor.alive() {
            return;
        }
        actor.finish(action.kind);
        let stats = actor.stats;
        let origin = actor.position;

        let target_alive = self
            .units
            .get(action.target)
            .map_or(false, |target| target.alive());
        if !target_alive {
            debug!(
                unit = unit.get(),
                target = action.target.get(),
                "target died during wind-up"
            );
            out_events.push(Event::ActionCancelled {
                unit,
                action: action.kind,
                target: action.target,
            });
            return;
        }

        match action.kind {
            ActionKind::Attack => match stats.delivery() {
                Delivery::Melee => {
                    debug!(
                        unit = unit.get(),
                        target = action.target.get(),
                        damage = stats.damage(),
                        "melee strike"
                    );
                    self.damage_unit(action.target, unit, stats.damage(), out_events);
                }
                Delivery::Projectile { speed } => {
                    let projectile =
                        self.projectiles
                            .launch(unit, action.target, origin, speed, stats.damage());
                    debug!(
                        unit = unit.get(),
                        target = action.target.get(),
                        projectile = projectile.get(),
                        "projectile launched"
                    );
                    out_events.push(Event::ProjectileLaunched {
                        projectile,
                        shooter: unit,
                        target: action.target,
                    });
                }
            },
            ActionKind::Heal => {
                let amount = stats.heal().map_or(0, |heal| heal.amount());
                if let Some(target) = self.units.get_mut(action.target) {
                    target.receive_heal(amount);
                    debug!(
                        unit = unit.get(),
                        target = action.target.get(),
                        amount,
                        "heal resolved"
                    );
                    out_events.push(Event::UnitHealed {
                        unit: action.target,
                        source: unit,
                        health: target.health,
                    });
                }
            }
        }
    }

    fn damage_unit(
        &mut self,
        target: UnitId,
        source: UnitId,
        amount: u32,
        out_events: &mut Vec<Event>,
    ) {
        let Some(unit) = self.units.get_mut(target) else {
            return;
        };
        if !unit.alive() {
            return;
        }

        let died = unit.take_damage(amount);
        out_events.push(Event::UnitDamaged {
            unit: target,
            source,
            amount,
            remaining: unit.health,
        });
        if died {
            let team = unit.team;
            let _ = self.grid.vacate(target);
            debug!(unit = target.get(), ?team, "unit died");
            out_events.push(Event::UnitDied { unit: target, team });
        }
    }

    fn step_unit(&mut self, unit: UnitId, toward: UnitId) {
        let Some(destination) = self
            .units
            .get(toward)
            .filter(|target| target.alive())
            .map(|target| target.position)
        else {
            return;
        };
        let Some(mover) = self.units.get_mut(unit) else {
            return;
        };
        if !mover.alive() || mover.is_busy() {
            return;
        }

        mover.position = mover
            .position
            .step_toward(destination, mover.stats.move_speed());
        mover.status = UnitStatus::Seeking;
    }

    fn idle_unit(&mut self, unit: UnitId) {
        if let Some(state) = self.units.get_mut(unit) {
            if state.alive() && !state.is_busy() {
                state.status = UnitStatus::Idle;
            }
        }
    }

    fn end_combat(&mut self, outcome: RoundOutcome, out_events: &mut Vec<Event>) {
        if self.phase != Phase::Combat {
            warn!(?outcome, "no combat in progress to end");
            return;
        }

        self.projectiles.clear();
        for unit in self.units.iter_mut() {
            unit.reset_combat_state();
        }
        self.phase = Phase::Planning;
        info!(round = self.round, ?outcome, ticks = self.tick_index, "combat ended");
        out_events.push(Event::CombatEnded { outcome });
        out_events.push(Event::PhaseChanged {
            phase: Phase::Planning,
        });
    }

    fn replace_roster(&mut self, team: Team, roster: RosterSnapshot, out_events: &mut Vec<Event>) {
        if self.phase != Phase::Planning {
            warn!(?team, "rosters can only be rebuilt while planning");
            return;
        }
        if roster.team() != team {
            warn!(?team, snapshot = ?roster.team(), "roster snapshot belongs to another team");
            return;
        }

        for unit in self.units.remove_team(team) {
            let _ = self.grid.vacate(unit);
        }

        let mut created: u32 = 0;
        for placement in roster.placements() {
            if self
                .spawn_unit(placement.archetype.clone(), team, placement.position, out_events)
                .is_some()
            {
                created += 1;
            }
        }

        debug!(?team, units = created, "roster rebuilt");
        out_events.push(Event::RosterReplaced {
            team,
            units: created,
        });
        self.reconcile_occupancy(out_events);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureHexGrid { layout } => world.configure_grid(layout, out_events),
        Command::SpawnUnit {
            archetype,
            team,
            position,
        } => {
            if world.phase == Phase::Planning {
                let _ = world.spawn_unit(archetype, team, position, out_events);
            } else {
                warn!(%archetype, "units can only be spawned while planning");
            }
        }
        Command::PurchaseUnit { archetype, at } => {
            if let Err(reason) = world.purchase_unit(archetype.clone(), at, out_events) {
                debug!(%archetype, %reason, "purchase rejected");
                out_events.push(Event::PurchaseRejected { archetype, reason });
            }
        }
        Command::RelocateUnit { unit, to } => match world.relocate_unit(unit, to) {
            Ok(cell) => out_events.push(Event::UnitRelocated { unit, cell }),
            Err(reason) => {
                debug!(unit = unit.get(), %reason, "relocation rejected");
                out_events.push(Event::RelocationRejected { unit, reason });
            }
        },
        Command::ReconcileOccupancy => world.reconcile_occupancy(out_events),
        Command::BeginCombat => world.begin_combat(out_events),
        Command::Tick => {
            if world.phase == Phase::Combat {
                world.advance_combat(out_events);
            }
        }
        Command::StepUnit { unit, toward } => {
            if world.phase == Phase::Combat {
                world.step_unit(unit, toward);
            }
        }
        Command::BeginAction {
            unit,
            action,
            target,
        } => {
            if world.phase == Phase::Combat {
                world.begin_action(unit, action, target, out_events);
            }
        }
        Command::IdleUnit { unit } => {
            if world.phase == Phase::Combat {
                world.idle_unit(unit);
            }
        }
        Command::EndCombat { outcome } => world.end_combat(outcome, out_events),
        Command::ReplaceRoster { team, roster } => world.replace_roster(team, roster, out_events),
        Command::GrantGold { amount } => {
            world.gold = world.gold.saturating_add(amount);
            out_events.push(Event::GoldChanged { gold: world.gold });
        }
        Command::AdvanceRound => {
            world.round = world.round.saturating_add(1);
            info!(round = world.round, "round advanced");
            out_events.push(Event::RoundAdvanced { round: world.round });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use hexa_core::{
        ArchetypeTable, CellCoord, CellSnapshot, GridError, LivingCounts, Phase, Point,
        ProjectileSnapshot, Team, UnitId, UnitSnapshot, UnitView,
    };

    /// Reports the active phase.
    #[must_use]
    pub fn phase(world: &World) -> Phase {
        world.phase
    }

    /// Gold currently held by the player.
    #[must_use]
    pub fn gold(world: &World) -> u32 {
        world.gold
    }

    /// Number of the current round, starting at one.
    #[must_use]
    pub fn round(world: &World) -> u32 {
        world.round
    }

    /// Number of combat ticks simulated since the world was created.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Archetype table the world was created with.
    #[must_use]
    pub fn archetypes(world: &World) -> &ArchetypeTable {
        &world.archetypes
    }

    /// Captures a read-only view of every unit, living or dead.
    #[must_use]
    pub fn unit_view(world: &World) -> UnitView {
        let snapshots: Vec<UnitSnapshot> = world
            .units
            .iter()
            .map(|unit| unit.snapshot(world.grid.cell_of(unit.id)))
            .collect();
        UnitView::from_snapshots(snapshots)
    }

    /// Counts living units per team.
    #[must_use]
    pub fn living_counts(world: &World) -> LivingCounts {
        let mut counts = LivingCounts::default();
        for unit in world.units.iter().filter(|unit| unit.alive()) {
            match unit.team {
                Team::Player => counts.player += 1,
                Team::Enemy => counts.enemy += 1,
            }
        }
        counts
    }

    /// Reports whether the hex grid has been generated.
    #[must_use]
    pub fn is_grid_ready(world: &World) -> bool {
        world.grid.is_generated()
    }

    /// Describes every hex cell in row-major order.
    #[must_use]
    pub fn cells(world: &World) -> Vec<CellSnapshot> {
        world.grid.snapshots()
    }

    /// Cell whose center is nearest to the provided point.
    pub fn nearest_cell(world: &World, point: Point) -> Result<CellCoord, GridError> {
        world.grid.nearest_cell(point)
    }

    /// Reports whether the cell exists and is unoccupied.
    #[must_use]
    pub fn is_cell_free(world: &World, cell: CellCoord) -> bool {
        world.grid.is_free(cell)
    }

    /// Unit occupying the cell, if any.
    #[must_use]
    pub fn occupant(world: &World, cell: CellCoord) -> Option<UnitId> {
        world.grid.occupant(cell)
    }

    /// Cell occupied by the unit, if any.
    #[must_use]
    pub fn cell_of(world: &World, unit: UnitId) -> Option<CellCoord> {
        world.grid.cell_of(unit)
    }

    /// Describes every in-flight projectile in launch order.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world.projectiles.snapshots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexa_core::{ActionAnimation, ArchetypeStats, HealStats, Health, UnitPlacement};

    fn archetypes() -> ArchetypeTable {
        [
            (
                ArchetypeKey::new("warrior"),
                ArchetypeStats::new(3, 10, 2, 60.0, 60, 1.5),
            ),
            (
                ArchetypeKey::new("archer"),
                ArchetypeStats::new(3, 6, 2, 300.0, 90, 1.2)
                    .with_delivery(Delivery::Projectile { speed: 8.0 })
                    .with_attack_animation(ActionAnimation::new(8, 0.15, 0.7)),
            ),
            (
                ArchetypeKey::new("monk"),
                ArchetypeStats::new(5, 8, 0, 0.0, 0, 1.2).with_heal(HealStats::new(2, 150.0, 90)),
            ),
        ]
        .into_iter()
        .collect()
    }

    fn layout() -> HexLayout {
        HexLayout::new(6, 9, Point::new(1024.0, 540.0), 64.0, 5.0)
    }

    fn world_with_grid(gold: u32) -> World {
        let mut world = World::new(archetypes(), gold);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureHexGrid { layout: layout() },
            &mut events,
        );
        world
    }

    fn spawn(world: &mut World, archetype: &str, team: Team, position: Point) -> UnitId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnUnit {
                archetype: ArchetypeKey::new(archetype),
                team,
                position,
            },
            &mut events,
        );
        events
            .iter()
            .find_map(|event| match event {
                Event::UnitSpawned { unit, .. } => Some(*unit),
                _ => None,
            })
            .expect("unit spawned")
    }

    #[test]
    fn new_world_starts_in_planning_of_round_one() {
        let world = World::new(archetypes(), 10);
        assert_eq!(query::phase(&world), Phase::Planning);
        assert_eq!(query::round(&world), 1);
        assert_eq!(query::gold(&world), 10);
        assert!(!query::is_grid_ready(&world));
    }

    #[test]
    fn configuring_grid_twice_is_ignored() {
        let mut world = world_with_grid(10);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureHexGrid {
                layout: HexLayout::new(2, 2, Point::new(0.0, 0.0), 10.0, 1.0),
            },
            &mut events,
        );
        assert!(events.is_empty());
        assert_eq!(query::cells(&world).len(), 54);
    }

    #[test]
    fn purchase_places_unit_and_charges_gold() {
        let mut world = world_with_grid(10);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PurchaseUnit {
                archetype: ArchetypeKey::new("warrior"),
                at: Point::new(1024.0, 540.0),
            },
            &mut events,
        );

        let (unit, cell) = events
            .iter()
            .find_map(|event| match event {
                Event::UnitPurchased { unit, cell, .. } => Some((*unit, *cell)),
                _ => None,
            })
            .expect("purchase succeeded");
        assert_eq!(query::gold(&world), 7);
        assert_eq!(query::occupant(&world, cell), Some(unit));
        assert!(events.contains(&Event::GoldChanged { gold: 7 }));
    }

    #[test]
    fn purchase_without_grid_reports_no_free_cell() {
        let mut world = World::new(archetypes(), 10);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PurchaseUnit {
                archetype: ArchetypeKey::new("warrior"),
                at: Point::new(0.0, 0.0),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::PurchaseRejected {
                archetype: ArchetypeKey::new("warrior"),
                reason: PurchaseError::NoFreeCell,
            }]
        );
        assert_eq!(query::gold(&world), 10);
    }

    #[test]
    fn purchase_on_full_board_keeps_gold() {
        let mut world = World::new(archetypes(), 100);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureHexGrid {
                layout: HexLayout::new(1, 1, Point::new(0.0, 0.0), 10.0, 1.0),
            },
            &mut events,
        );
        for _ in 0..2 {
            apply(
                &mut world,
                Command::PurchaseUnit {
                    archetype: ArchetypeKey::new("warrior"),
                    at: Point::new(0.0, 0.0),
                },
                &mut events,
            );
        }
        assert_eq!(query::gold(&world), 97);
        assert_eq!(
            events.last(),
            Some(&Event::PurchaseRejected {
                archetype: ArchetypeKey::new("warrior"),
                reason: PurchaseError::NoFreeCell,
            })
        );
    }

    #[test]
    fn relocation_rejects_enemy_units_and_occupied_cells() {
        let mut world = world_with_grid(10);
        let cells = query::cells(&world);
        let player = spawn(&mut world, "warrior", Team::Player, cells[0].center);
        let blocker = spawn(&mut world, "warrior", Team::Player, cells[1].center);
        let enemy = spawn(&mut world, "warrior", Team::Enemy, cells[2].center);
        let mut events = Vec::new();
        apply(&mut world, Command::ReconcileOccupancy, &mut events);

        apply(
            &mut world,
            Command::RelocateUnit {
                unit: enemy,
                to: cells[5].center,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::RelocateUnit {
                unit: player,
                to: cells[1].center,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::RelocateUnit {
                unit: blocker,
                to: cells[7].center,
            },
            &mut events,
        );

        assert!(events.contains(&Event::RelocationRejected {
            unit: enemy,
            reason: RelocationError::UnknownUnit,
        }));
        assert!(events.contains(&Event::RelocationRejected {
            unit: player,
            reason: RelocationError::Occupied,
        }));
        assert!(events.contains(&Event::UnitRelocated {
            unit: blocker,
            cell: cells[7].coord,
        }));
        assert!(query::is_cell_free(&world, cells[1].coord));
        assert_eq!(query::cell_of(&world, player), Some(cells[0].coord));
    }

    #[test]
    fn ticks_outside_combat_are_ignored() {
        let mut world = world_with_grid(10);
        let mut events = Vec::new();
        apply(&mut world, Command::Tick, &mut events);
        assert!(events.is_empty());
        assert_eq!(query::tick_index(&world), 0);
    }

    #[test]
    fn instant_melee_attack_resolves_on_begin() {
        let mut world = world_with_grid(10);
        let attacker = spawn(&mut world, "warrior", Team::Player, Point::new(100.0, 100.0));
        let defender = spawn(&mut world, "warrior", Team::Enemy, Point::new(150.0, 100.0));
        let mut events = Vec::new();
        apply(&mut world, Command::BeginCombat, &mut events);
        events.clear();

        apply(
            &mut world,
            Command::BeginAction {
                unit: attacker,
                action: ActionKind::Attack,
                target: defender,
            },
            &mut events,
        );

        assert!(events.contains(&Event::UnitDamaged {
            unit: defender,
            source: attacker,
            amount: 2,
            remaining: Health::new(8),
        }));
        let view = query::unit_view(&world);
        let attacker_state = view.get(attacker).expect("attacker exists");
        assert_eq!(attacker_state.attack_cooldown, 60);
        assert_eq!(attacker_state.status, UnitStatus::Idle);
    }

    #[test]
    fn out_of_range_attack_is_refused() {
        let mut world = world_with_grid(10);
        let attacker = spawn(&mut world, "warrior", Team::Player, Point::new(0.0, 0.0));
        let defender = spawn(&mut world, "warrior", Team::Enemy, Point::new(500.0, 0.0));
        let mut events = Vec::new();
        apply(&mut world, Command::BeginCombat, &mut events);
        events.clear();

        apply(
            &mut world,
            Command::BeginAction {
                unit: attacker,
                action: ActionKind::Attack,
                target: defender,
            },
            &mut events,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn ranged_attack_launches_projectile_after_windup() {
        let mut world = world_with_grid(10);
        let archer = spawn(&mut world, "archer", Team::Player, Point::new(0.0, 0.0));
        let target = spawn(&mut world, "warrior", Team::Enemy, Point::new(200.0, 0.0));
        let mut events = Vec::new();
        apply(&mut world, Command::BeginCombat, &mut events);
        apply(
            &mut world,
            Command::BeginAction {
                unit: archer,
                action: ActionKind::Attack,
                target,
            },
            &mut events,
        );
        assert!(events.contains(&Event::ActionStarted {
            unit: archer,
            action: ActionKind::Attack,
            target,
            windup: 37,
        }));

        events.clear();
        for _ in 0..36 {
            apply(&mut world, Command::Tick, &mut events);
        }
        assert!(query::projectiles(&world).is_empty());
        apply(&mut world, Command::Tick, &mut events);
        assert_eq!(query::projectiles(&world).len(), 1);

        events.clear();
        for _ in 0..40 {
            apply(&mut world, Command::Tick, &mut events);
        }
        assert!(events.iter().any(|event| matches!(
            event,
            Event::UnitDamaged { unit, source, .. } if *unit == target && *source == archer
        )));
        assert!(query::projectiles(&world).is_empty());
    }

    #[test]
    fn stale_target_cancels_payload_but_starts_cooldown() {
        let mut world = world_with_grid(10);
        let archer = spawn(&mut world, "archer", Team::Player, Point::new(0.0, 0.0));
        let target = spawn(&mut world, "warrior", Team::Enemy, Point::new(50.0, 0.0));
        let killer = spawn(&mut world, "warrior", Team::Player, Point::new(60.0, 0.0));
        let mut events = Vec::new();
        apply(&mut world, Command::BeginCombat, &mut events);
        apply(
            &mut world,
            Command::BeginAction {
                unit: archer,
                action: ActionKind::Attack,
                target,
            },
            &mut events,
        );

        // Five instant hits of 2 damage kill the 10 hp target.
        for _ in 0..5 {
            if let Some(unit) = world.units.get_mut(killer) {
                unit.reset_combat_state();
            }
            apply(
                &mut world,
                Command::BeginAction {
                    unit: killer,
                    action: ActionKind::Attack,
                    target,
                },
                &mut events,
            );
        }
        assert!(events.contains(&Event::UnitDied {
            unit: target,
            team: Team::Enemy,
        }));

        events.clear();
        for _ in 0..37 {
            apply(&mut world, Command::Tick, &mut events);
        }
        assert!(events.contains(&Event::ActionCancelled {
            unit: archer,
            action: ActionKind::Attack,
            target,
        }));
        assert!(query::projectiles(&world).is_empty());
        let view = query::unit_view(&world);
        assert_eq!(view.get(archer).map(|unit| unit.attack_cooldown), Some(90));
    }

    #[test]
    fn healer_restores_wounded_ally_up_to_max() {
        let mut world = world_with_grid(10);
        let monk = spawn(&mut world, "monk", Team::Player, Point::new(0.0, 0.0));
        let ally = spawn(&mut world, "warrior", Team::Player, Point::new(100.0, 0.0));
        if let Some(unit) = world.units.get_mut(ally) {
            let _ = unit.take_damage(1);
        }
        let mut events = Vec::new();
        apply(&mut world, Command::BeginCombat, &mut events);
        apply(
            &mut world,
            Command::BeginAction {
                unit: monk,
                action: ActionKind::Heal,
                target: ally,
            },
            &mut events,
        );

        assert!(events.contains(&Event::UnitHealed {
            unit: ally,
            source: monk,
            health: Health::new(10),
        }));
    }

    #[test]
    fn healer_cannot_target_itself_or_attack() {
        let mut world = world_with_grid(10);
        let monk = spawn(&mut world, "monk", Team::Player, Point::new(0.0, 0.0));
        let enemy = spawn(&mut world, "warrior", Team::Enemy, Point::new(10.0, 0.0));
        let mut events = Vec::new();
        apply(&mut world, Command::BeginCombat, &mut events);
        events.clear();

        apply(
            &mut world,
            Command::BeginAction {
                unit: monk,
                action: ActionKind::Heal,
                target: monk,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::BeginAction {
                unit: monk,
                action: ActionKind::Attack,
                target: enemy,
            },
            &mut events,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn busy_units_do_not_move() {
        let mut world = world_with_grid(10);
        let archer = spawn(&mut world, "archer", Team::Player, Point::new(0.0, 0.0));
        let target = spawn(&mut world, "warrior", Team::Enemy, Point::new(200.0, 0.0));
        let mut events = Vec::new();
        apply(&mut world, Command::BeginCombat, &mut events);
        apply(
            &mut world,
            Command::BeginAction {
                unit: archer,
                action: ActionKind::Attack,
                target,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::StepUnit {
                unit: archer,
                toward: target,
            },
            &mut events,
        );

        let view = query::unit_view(&world);
        assert_eq!(
            view.get(archer).map(|unit| unit.position),
            Some(Point::new(0.0, 0.0))
        );
    }

    #[test]
    fn death_vacates_the_cell() {
        let mut world = world_with_grid(10);
        let cells = query::cells(&world);
        let attacker = spawn(&mut world, "warrior", Team::Player, cells[0].center);
        let defender = spawn(&mut world, "warrior", Team::Enemy, cells[1].center);
        let mut events = Vec::new();
        apply(&mut world, Command::ReconcileOccupancy, &mut events);
        apply(&mut world, Command::BeginCombat, &mut events);

        world.damage_unit(defender, attacker, 10, &mut events);

        assert_eq!(query::cell_of(&world, defender), None);
        assert!(query::is_cell_free(&world, cells[1].coord));
        assert_eq!(query::living_counts(&world).enemy, 0);
    }

    #[test]
    fn end_combat_returns_to_planning_and_clears_projectiles() {
        let mut world = world_with_grid(10);
        let archer = spawn(&mut world, "archer", Team::Player, Point::new(0.0, 0.0));
        let target = spawn(&mut world, "warrior", Team::Enemy, Point::new(280.0, 0.0));
        let mut events = Vec::new();
        apply(&mut world, Command::BeginCombat, &mut events);
        apply(
            &mut world,
            Command::BeginAction {
                unit: archer,
                action: ActionKind::Attack,
                target,
            },
            &mut events,
        );
        for _ in 0..38 {
            apply(&mut world, Command::Tick, &mut events);
        }
        assert_eq!(query::projectiles(&world).len(), 1);

        events.clear();
        apply(
            &mut world,
            Command::EndCombat {
                outcome: RoundOutcome::Won,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![
                Event::CombatEnded {
                    outcome: RoundOutcome::Won
                },
                Event::PhaseChanged {
                    phase: Phase::Planning
                },
            ]
        );
        assert!(query::projectiles(&world).is_empty());
    }

    #[test]
    fn replace_roster_rebuilds_only_the_named_team() {
        let mut world = world_with_grid(10);
        let cells = query::cells(&world);
        let player = spawn(&mut world, "warrior", Team::Player, cells[0].center);
        let _ = spawn(&mut world, "warrior", Team::Enemy, cells[1].center);
        let mut events = Vec::new();

        let roster = RosterSnapshot::from_placements(
            Team::Enemy,
            vec![
                UnitPlacement::new(ArchetypeKey::new("archer"), cells[10].center),
                UnitPlacement::new(ArchetypeKey::new("archer"), cells[10].center),
            ],
        );
        apply(
            &mut world,
            Command::ReplaceRoster {
                team: Team::Enemy,
                roster,
            },
            &mut events,
        );

        assert!(events.contains(&Event::RosterReplaced {
            team: Team::Enemy,
            units: 2,
        }));
        let view = query::unit_view(&world);
        let enemies: Vec<_> = view.iter().filter(|unit| unit.team == Team::Enemy).collect();
        assert_eq!(enemies.len(), 2);
        assert!(enemies.iter().all(|unit| unit.archetype.as_str() == "archer"));
        assert_ne!(enemies[0].cell, enemies[1].cell);
        assert!(view.get(player).is_some());
    }

    #[test]
    fn gold_and_round_counters_advance() {
        let mut world = World::new(archetypes(), 0);
        let mut events = Vec::new();
        apply(&mut world, Command::GrantGold { amount: 5 }, &mut events);
        apply(&mut world, Command::AdvanceRound, &mut events);
        assert_eq!(
            events,
            vec![
                Event::GoldChanged { gold: 5 },
                Event::RoundAdvanced { round: 2 }
            ]
        );
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("log lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLog {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("log lock")).into_owned()
        }
    }

    #[test]
    fn combat_resolution_is_traced_at_debug() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut world = world_with_grid(10);
            let warrior = spawn(&mut world, "warrior", Team::Player, Point::new(100.0, 100.0));
            let archer = spawn(&mut world, "archer", Team::Player, Point::new(0.0, 0.0));
            let monk = spawn(&mut world, "monk", Team::Player, Point::new(50.0, 0.0));
            let enemy = spawn(&mut world, "warrior", Team::Enemy, Point::new(150.0, 100.0));
            let mut events = Vec::new();
            apply(&mut world, Command::BeginCombat, &mut events);

            for (unit, action, target) in [
                (warrior, ActionKind::Attack, enemy),
                (archer, ActionKind::Attack, enemy),
                (monk, ActionKind::Heal, warrior),
            ] {
                apply(
                    &mut world,
                    Command::BeginAction {
                        unit,
                        action,
                        target,
                    },
                    &mut events,
                );
            }
            for _ in 0..80 {
                apply(&mut world, Command::Tick, &mut events);
            }
        });

        let contents = log.contents();
        for message in [
            "melee strike",
            "projectile launched",
            "projectile struck",
            "heal resolved",
        ] {
            assert!(contents.contains(message), "missing '{message}' in:\n{contents}");
        }
    }
}
