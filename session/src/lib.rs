#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Game session facade that wires the world to the combat and round systems.
//!
//! A [`Session`] owns the authoritative [`World`] together with the pure
//! systems that drive it. Every mutation is submitted as a [`Command`]; the
//! resulting events are fed to the round system until it stops answering,
//! so roster rebuilds, reinforcements and rewards happen as part of the same
//! call that ended combat.

mod config;

pub use config::{ConfigError, Economy, GameConfig, RosterEntry};

use hexa_core::{
    ArchetypeKey, CellCoord, CellSnapshot, Command, Event, LivingCounts, Phase, Point,
    ProjectileSnapshot, PurchaseError, RelocationError, RosterSnapshot, RoundOutcome, Team,
    UnitId, UnitView,
};
use hexa_system_combat::{resolve_outcome, Combat};
use hexa_system_rounds::{self as rounds, Rounds};
use hexa_world::{self as world, query, World};
use tracing::{debug, info};

/// Running game: the board, both rosters, the purse and the round counter.
#[derive(Debug)]
pub struct Session {
    world: World,
    combat: Combat,
    rounds: Rounds,
    shop: Vec<ArchetypeKey>,
    outcome: Option<RoundOutcome>,
    decisions: Vec<Command>,
    final_units: Option<UnitView>,
    recording: bool,
    log: Vec<Event>,
}

impl Session {
    /// Builds a session in the planning phase of round one.
    ///
    /// The hex grid is generated, the configured roster is spawned and every
    /// unit is snapped onto its nearest free cell. An empty shop list offers
    /// every configured archetype.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let GameConfig {
            grid,
            economy,
            reinforcements,
            shop,
            archetypes,
            roster,
        } = config;

        let shop = if shop.is_empty() {
            archetypes.iter().map(|(key, _)| key.clone()).collect()
        } else {
            shop
        };

        let mut session = Self {
            world: World::new(archetypes, economy.starting_gold),
            combat: Combat::new(),
            rounds: Rounds::new(rounds::Config::new(economy.round_reward, reinforcements)),
            shop,
            outcome: None,
            decisions: Vec::new(),
            final_units: None,
            recording: false,
            log: Vec::new(),
        };

        let _ = session.dispatch(Command::ConfigureHexGrid { layout: grid });
        for entry in roster {
            let _ = session.dispatch(Command::SpawnUnit {
                archetype: entry.archetype,
                team: entry.team,
                position: entry.position,
            });
        }
        let _ = session.dispatch(Command::ReconcileOccupancy);
        Ok(session)
    }

    /// Buys a player unit and places it on the free cell nearest `at`.
    ///
    /// Archetypes missing from the shop are rejected as unknown. No gold is
    /// charged when the purchase fails.
    pub fn purchase(
        &mut self,
        archetype: impl Into<ArchetypeKey>,
        at: Point,
    ) -> Result<UnitId, PurchaseError> {
        let archetype = archetype.into();
        if !self.shop.contains(&archetype) {
            debug!(%archetype, "archetype is not offered in the shop");
            return Err(PurchaseError::UnknownArchetype);
        }

        let events = self.dispatch(Command::PurchaseUnit { archetype, at });
        events
            .iter()
            .find_map(|event| match event {
                Event::UnitPurchased { unit, .. } => Some(Ok(*unit)),
                Event::PurchaseRejected { reason, .. } => Some(Err(*reason)),
                _ => None,
            })
            .unwrap_or(Err(PurchaseError::InvalidPhase))
    }

    /// Drags a player unit onto the cell nearest `to`.
    pub fn relocate(&mut self, unit: UnitId, to: Point) -> Result<CellCoord, RelocationError> {
        let events = self.dispatch(Command::RelocateUnit { unit, to });
        events
            .iter()
            .find_map(|event| match event {
                Event::UnitRelocated { cell, .. } => Some(Ok(*cell)),
                Event::RelocationRejected { reason, .. } => Some(Err(*reason)),
                _ => None,
            })
            .unwrap_or(Err(RelocationError::InvalidPhase))
    }

    /// Captures the living roster of `team` as it stands now.
    #[must_use]
    pub fn capture_roster(&self, team: Team) -> RosterSnapshot {
        RosterSnapshot::capture(team, &query::unit_view(&self.world))
    }

    /// Discards the team named by `roster` and rebuilds it from the snapshot.
    ///
    /// Only takes effect while planning.
    pub fn restore_roster(&mut self, roster: RosterSnapshot) {
        let team = roster.team();
        let _ = self.dispatch(Command::ReplaceRoster { team, roster });
    }

    /// Starts combat, capturing both rosters for the round system.
    ///
    /// Clears the outcome and final units of the previous combat.
    pub fn begin_combat(&mut self) {
        if query::phase(&self.world) != Phase::Planning {
            debug!("begin_combat ignored outside planning");
            return;
        }
        self.outcome = None;
        self.final_units = None;
        let _ = self.dispatch(Command::BeginCombat);
    }

    /// Advances the simulation by one step.
    ///
    /// Returns the outcome when this tick ended combat. Outside combat the
    /// call does nothing and returns `None`.
    pub fn tick(&mut self) -> Option<RoundOutcome> {
        if query::phase(&self.world) != Phase::Combat {
            return None;
        }

        let _ = self.dispatch(Command::Tick);

        let view = query::unit_view(&self.world);
        let mut decisions = std::mem::take(&mut self.decisions);
        decisions.clear();
        self.combat
            .handle(query::phase(&self.world), &view, &mut decisions);
        for command in decisions.drain(..) {
            let _ = self.dispatch(command);
        }
        self.decisions = decisions;

        let counts = query::living_counts(&self.world);
        let outcome = resolve_outcome(counts)?;
        info!(
            round = query::round(&self.world),
            ?outcome,
            player = counts.player,
            enemy = counts.enemy,
            "round resolved"
        );
        self.final_units = Some(query::unit_view(&self.world));
        let _ = self.dispatch(Command::EndCombat { outcome });
        self.outcome = Some(outcome);
        Some(outcome)
    }

    /// Outcome of the most recent combat, until the next [`Session::begin_combat`].
    #[must_use]
    pub fn round_outcome(&self) -> Option<RoundOutcome> {
        self.outcome
    }

    /// Units as they stood on the tick that ended the most recent combat.
    ///
    /// Taken before the rosters are rebuilt, so survivors keep their combat
    /// health. Cleared by the next [`Session::begin_combat`].
    #[must_use]
    pub fn final_units(&self) -> Option<&UnitView> {
        self.final_units.as_ref()
    }

    /// Living units per team.
    #[must_use]
    pub fn living_counts(&self) -> LivingCounts {
        query::living_counts(&self.world)
    }

    /// Gold held by the player.
    #[must_use]
    pub fn current_gold(&self) -> u32 {
        query::gold(&self.world)
    }

    /// Round currently being planned or fought.
    #[must_use]
    pub fn current_round(&self) -> u32 {
        query::round(&self.world)
    }

    /// Active phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        query::phase(&self.world)
    }

    /// Combat ticks elapsed since the session started.
    #[must_use]
    pub fn tick_index(&self) -> u64 {
        query::tick_index(&self.world)
    }

    /// Every unit, sorted by identifier.
    #[must_use]
    pub fn units(&self) -> UnitView {
        query::unit_view(&self.world)
    }

    /// Every cell of the hex grid in row-major order.
    #[must_use]
    pub fn cells(&self) -> Vec<CellSnapshot> {
        query::cells(&self.world)
    }

    /// Projectiles currently in flight.
    #[must_use]
    pub fn projectiles(&self) -> Vec<ProjectileSnapshot> {
        query::projectiles(&self.world)
    }

    /// Archetypes offered for purchase.
    #[must_use]
    pub fn shop(&self) -> &[ArchetypeKey] {
        &self.shop
    }

    /// Turns event recording on or off. Recording starts disabled.
    ///
    /// Disabling also discards everything recorded so far.
    pub fn record_events(&mut self, enabled: bool) {
        self.recording = enabled;
        if !enabled {
            self.log = Vec::new();
        }
    }

    /// Drains every event recorded since the previous call.
    ///
    /// Always empty unless [`Session::record_events`] enabled recording.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.log)
    }

    /// Applies `command` and lets the round system react until it goes quiet.
    ///
    /// Returns every event produced along the way.
    fn dispatch(&mut self, command: Command) -> Vec<Event> {
        let mut produced = Vec::new();
        world::apply(&mut self.world, command, &mut produced);

        let mut pending = produced.clone();
        let mut commands = Vec::new();
        while !pending.is_empty() {
            let units = query::unit_view(&self.world);
            let round = query::round(&self.world);
            self.rounds.handle(&pending, &units, round, &mut commands);
            if commands.is_empty() {
                break;
            }

            pending.clear();
            for follow_up in commands.drain(..) {
                world::apply(&mut self.world, follow_up, &mut pending);
            }
            produced.extend(pending.iter().cloned());
        }

        if self.recording {
            self.log.extend(produced.iter().cloned());
        }
        produced
    }
}
