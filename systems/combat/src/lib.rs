#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that drives each unit's combat state machine from world snapshots.
//!
//! Every living unit that is not winding up an action picks a target each
//! tick: healers look for the nearest wounded ally, everybody else for the
//! nearest enemy. The unit then either starts an action, steps toward the
//! target or idles. Decisions are computed from a single snapshot and
//! emitted in unit identifier order so the world can apply them
//! deterministically.

use hexa_core::{
    ActionKind, Command, LivingCounts, Phase, Point, RoundOutcome, Team, UnitId, UnitView,
};

/// Combat decision system that reuses scratch buffers between ticks.
#[derive(Debug, Default)]
pub struct Combat {
    workspace: Vec<Combatant>,
    scratch: Vec<Command>,
}

impl Combat {
    /// Creates a new combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one decision per idle living unit to `out`.
    ///
    /// Nothing is emitted outside the combat phase. Units with a pending
    /// wind-up are skipped because they cannot move or start another action.
    pub fn handle(&mut self, phase: Phase, units: &UnitView, out: &mut Vec<Command>) {
        if phase != Phase::Combat {
            return;
        }

        self.prepare_workspace(units);
        if self.workspace.is_empty() {
            return;
        }

        self.scratch.clear();
        for actor in &self.workspace {
            if actor.busy {
                continue;
            }

            let decision = match actor.heal_range {
                Some(heal_range) => decide_heal(actor, heal_range, &self.workspace),
                None => decide_attack(actor, &self.workspace),
            };
            self.scratch.push(decision);
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }

    fn prepare_workspace(&mut self, units: &UnitView) {
        self.workspace.clear();
        for snapshot in units.living() {
            self.workspace.push(Combatant {
                id: snapshot.id,
                team: snapshot.team,
                position: snapshot.position,
                wounded: snapshot.is_wounded(),
                busy: snapshot.pending.is_some(),
                attack_range: snapshot.attack_range,
                heal_range: snapshot.heal_range,
                attack_ready: snapshot.attack_cooldown == 0,
                heal_ready: snapshot.heal_cooldown == 0,
            });
        }
    }
}

/// Decides the round outcome from the number of living units per team.
///
/// A team without living units loses. When both teams are wiped out on the
/// same tick the player loses.
#[must_use]
pub fn resolve_outcome(counts: LivingCounts) -> Option<RoundOutcome> {
    if counts.player == 0 {
        Some(RoundOutcome::Lost)
    } else if counts.enemy == 0 {
        Some(RoundOutcome::Won)
    } else {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Combatant {
    id: UnitId,
    team: Team,
    position: Point,
    wounded: bool,
    busy: bool,
    attack_range: f32,
    heal_range: Option<f32>,
    attack_ready: bool,
    heal_ready: bool,
}

fn decide_attack(actor: &Combatant, roster: &[Combatant]) -> Command {
    let enemy = actor.team.opponent();
    let Some((target, distance)) = nearest(actor, roster, |candidate| candidate.team == enemy)
    else {
        return Command::IdleUnit { unit: actor.id };
    };

    if distance > actor.attack_range {
        Command::StepUnit {
            unit: actor.id,
            toward: target,
        }
    } else if actor.attack_ready {
        Command::BeginAction {
            unit: actor.id,
            action: ActionKind::Attack,
            target,
        }
    } else {
        Command::IdleUnit { unit: actor.id }
    }
}

fn decide_heal(actor: &Combatant, heal_range: f32, roster: &[Combatant]) -> Command {
    let Some((target, distance)) = nearest(actor, roster, |candidate| {
        candidate.team == actor.team && candidate.id != actor.id && candidate.wounded
    }) else {
        return Command::IdleUnit { unit: actor.id };
    };

    if distance > heal_range {
        Command::StepUnit {
            unit: actor.id,
            toward: target,
        }
    } else if actor.heal_ready {
        Command::BeginAction {
            unit: actor.id,
            action: ActionKind::Heal,
            target,
        }
    } else {
        Command::IdleUnit { unit: actor.id }
    }
}

/// Nearest accepted candidate; the first candidate in roster order wins ties.
fn nearest<F>(actor: &Combatant, roster: &[Combatant], accept: F) -> Option<(UnitId, f32)>
where
    F: Fn(&Combatant) -> bool,
{
    let mut best: Option<(UnitId, f32)> = None;
    for candidate in roster.iter().filter(|candidate| accept(candidate)) {
        let distance = actor.position.distance(candidate.position);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate.id, distance)),
        }
    }
    best
}
