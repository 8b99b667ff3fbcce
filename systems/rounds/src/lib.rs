#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Round progression system that rebuilds rosters when combat ends.
//!
//! When combat begins the system captures value copies of both rosters.
//! A win advances the round, restores the player's pre-combat roster,
//! rebuilds the enemy roster with extra reinforcements and grants gold.
//! A loss restores both rosters exactly as they were before combat.

use hexa_core::{
    ArchetypeKey, Command, Event, Phase, Point, RosterSnapshot, RoundOutcome, Team, UnitPlacement,
    UnitView,
};
use serde::{Deserialize, Serialize};

/// Placement pattern for the extra enemies added after each win.
///
/// The `n`-th reinforcement (zero based) stands `n * step.x` from the
/// origin horizontally; odd reinforcements are additionally offset by
/// `step.y` vertically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reinforcements {
    archetype: ArchetypeKey,
    origin: Point,
    step: Point,
}

impl Reinforcements {
    /// Creates a new reinforcement pattern.
    #[must_use]
    pub fn new(archetype: ArchetypeKey, origin: Point, step: Point) -> Self {
        Self {
            archetype,
            origin,
            step,
        }
    }

    /// Archetype of every reinforcement.
    #[must_use]
    pub fn archetype(&self) -> &ArchetypeKey {
        &self.archetype
    }

    /// Placements for the first `count` reinforcements.
    #[must_use]
    pub fn placements(&self, count: u32) -> Vec<UnitPlacement> {
        (0..count)
            .map(|index| {
                let x = self.origin.x() + index as f32 * self.step.x();
                let y = self.origin.y() + (index % 2) as f32 * self.step.y();
                UnitPlacement::new(self.archetype.clone(), Point::new(x, y))
            })
            .collect()
    }
}

/// Configuration parameters required to construct the round system.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    reward: u32,
    reinforcements: Reinforcements,
}

impl Config {
    /// Creates a new configuration from the win reward and reinforcement pattern.
    #[must_use]
    pub fn new(reward: u32, reinforcements: Reinforcements) -> Self {
        Self {
            reward,
            reinforcements,
        }
    }

    /// Gold granted for every won round.
    #[must_use]
    pub const fn reward(&self) -> u32 {
        self.reward
    }

    /// Reinforcement pattern used after a win.
    #[must_use]
    pub fn reinforcements(&self) -> &Reinforcements {
        &self.reinforcements
    }
}

/// Number of reinforcements added to the enemy roster when `round` begins.
#[must_use]
pub const fn reinforcement_count(round: u32) -> u32 {
    round.saturating_sub(1)
}

/// Pure system that emits roster rebuild commands at the end of combat.
#[derive(Debug)]
pub struct Rounds {
    config: Config,
    player_snapshot: Option<RosterSnapshot>,
    enemy_snapshot: Option<RosterSnapshot>,
}

impl Rounds {
    /// Creates a new round system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            player_snapshot: None,
            enemy_snapshot: None,
        }
    }

    /// Consumes events and the current unit view to emit progression commands.
    ///
    /// `round` is the round that was being fought when combat ended.
    pub fn handle(&mut self, events: &[Event], units: &UnitView, round: u32, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::PhaseChanged {
                    phase: Phase::Combat,
                } => self.capture(units),
                Event::CombatEnded { outcome } => self.conclude(*outcome, round, out),
                _ => {}
            }
        }
    }

    /// Pre-combat roster captured for the player.
    #[must_use]
    pub fn player_snapshot(&self) -> Option<&RosterSnapshot> {
        self.player_snapshot.as_ref()
    }

    /// Pre-combat roster captured for the enemy.
    #[must_use]
    pub fn enemy_snapshot(&self) -> Option<&RosterSnapshot> {
        self.enemy_snapshot.as_ref()
    }

    fn capture(&mut self, units: &UnitView) {
        self.player_snapshot = Some(RosterSnapshot::capture(Team::Player, units));
        self.enemy_snapshot = Some(RosterSnapshot::capture(Team::Enemy, units));
    }

    /// Rebuilds from the captured snapshots; a team without a snapshot is left untouched.
    ///
    /// The winning team is rebuilt first so that its survivors are discarded
    /// before the losing team's placements are reconciled.
    fn conclude(&mut self, outcome: RoundOutcome, round: u32, out: &mut Vec<Command>) {
        match outcome {
            RoundOutcome::Won => {
                let next_round = round.saturating_add(1);
                out.push(Command::AdvanceRound);
                if let Some(player) = self.player_snapshot.clone() {
                    out.push(Command::ReplaceRoster {
                        team: Team::Player,
                        roster: player,
                    });
                }
                if let Some(enemy) = &self.enemy_snapshot {
                    let reinforcements = self
                        .config
                        .reinforcements()
                        .placements(reinforcement_count(next_round));
                    out.push(Command::ReplaceRoster {
                        team: Team::Enemy,
                        roster: enemy.with_additional(reinforcements),
                    });
                }
                out.push(Command::GrantGold {
                    amount: self.config.reward(),
                });
            }
            RoundOutcome::Lost => {
                for snapshot in [&self.enemy_snapshot, &self.player_snapshot]
                    .into_iter()
                    .flatten()
                {
                    out.push(Command::ReplaceRoster {
                        team: snapshot.team(),
                        roster: snapshot.clone(),
                    });
                }
            }
        }
    }
}
