use hexa_core::{
    ActionAnimation, ArchetypeKey, ArchetypeStats, ArchetypeTable, Command, Delivery, Event,
    HealStats, HexLayout, Phase, Point, RoundOutcome, Team,
};
use hexa_system_combat::{resolve_outcome, Combat};
use hexa_world::{self as world, query, World};

const TICK_LIMIT: u32 = 5_000;

#[test]
fn deterministic_replay_of_mixed_skirmish() {
    let first = replay(skirmish());
    let second = replay(skirmish());

    assert_eq!(first, second, "replay diverged between runs");
    assert!(first.outcome.is_some(), "skirmish never finished");
    assert!(
        first
            .events
            .iter()
            .any(|event| matches!(event, Event::ProjectileLaunched { .. })),
        "archers should have fired"
    );
    assert!(
        first
            .events
            .iter()
            .any(|event| matches!(event, Event::UnitHealed { .. })),
        "monks should have healed"
    );
}

#[test]
fn outnumbered_team_loses() {
    let mut script = vec![configure()];
    script.push(spawn("warrior", Team::Player, 900.0, 600.0));
    for x in [800.0, 900.0, 1000.0] {
        script.push(spawn("warrior", Team::Enemy, x, 300.0));
    }

    let outcome = replay(script);
    assert_eq!(outcome.outcome, Some(RoundOutcome::Lost));
    assert_eq!(outcome.final_phase, Phase::Planning);
}

#[test]
fn lone_survivor_wins_against_empty_enemy_roster() {
    let script = vec![configure(), spawn("warrior", Team::Player, 900.0, 600.0)];
    let outcome = replay(script);
    assert_eq!(outcome.outcome, Some(RoundOutcome::Won));
    assert_eq!(outcome.ticks, 1);
}

#[derive(Debug, PartialEq)]
struct ReplayOutcome {
    events: Vec<Event>,
    outcome: Option<RoundOutcome>,
    final_phase: Phase,
    ticks: u32,
}

fn replay(setup: Vec<Command>) -> ReplayOutcome {
    let mut world = World::new(archetypes(), 0);
    let mut combat = Combat::new();
    let mut events = Vec::new();
    let mut commands = Vec::new();

    for command in setup {
        world::apply(&mut world, command, &mut events);
    }
    world::apply(&mut world, Command::ReconcileOccupancy, &mut events);
    world::apply(&mut world, Command::BeginCombat, &mut events);

    let mut outcome = None;
    let mut ticks = 0;
    while outcome.is_none() && ticks < TICK_LIMIT {
        ticks += 1;
        world::apply(&mut world, Command::Tick, &mut events);

        commands.clear();
        combat.handle(query::phase(&world), &query::unit_view(&world), &mut commands);
        for command in commands.drain(..) {
            world::apply(&mut world, command, &mut events);
        }

        outcome = resolve_outcome(query::living_counts(&world));
        if let Some(result) = outcome {
            world::apply(&mut world, Command::EndCombat { outcome: result }, &mut events);
        }
    }

    ReplayOutcome {
        events,
        outcome,
        final_phase: query::phase(&world),
        ticks,
    }
}

fn skirmish() -> Vec<Command> {
    vec![
        configure(),
        spawn("archer", Team::Player, 500.0, 700.0),
        spawn("warrior", Team::Player, 1000.0, 600.0),
        spawn("warrior", Team::Player, 900.0, 600.0),
        spawn("warrior", Team::Player, 800.0, 600.0),
        spawn("monk", Team::Player, 950.0, 700.0),
        spawn("warrior", Team::Enemy, 1000.0, 300.0),
        spawn("warrior", Team::Enemy, 900.0, 300.0),
        spawn("archer", Team::Enemy, 1100.0, 200.0),
        spawn("monk", Team::Enemy, 950.0, 200.0),
    ]
}

fn configure() -> Command {
    Command::ConfigureHexGrid {
        layout: HexLayout::new(6, 9, Point::new(1024.0, 540.0), 64.0, 5.0),
    }
}

fn spawn(archetype: &str, team: Team, x: f32, y: f32) -> Command {
    Command::SpawnUnit {
        archetype: ArchetypeKey::new(archetype),
        team,
        position: Point::new(x, y),
    }
}

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
            ArchetypeStats::new(5, 8, 0, 0.0, 0, 1.2).with_heal(
                HealStats::new(2, 150.0, 90).with_animation(ActionAnimation::new(6, 0.1, 0.5)),
            ),
        ),
    ]
    .into_iter()
    .collect()
}
