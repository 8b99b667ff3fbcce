//! Authoritative unit state and per-tick combat timers.

use std::collections::BTreeMap;

use hexa_core::{
    ActionKind, ArchetypeKey, ArchetypeStats, CellCoord, Health, PendingAction, Point, Team,
    UnitId, UnitSnapshot, UnitStatus,
};

/// Mutable state of a unit stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Unit {
    pub(crate) id: UnitId,
    pub(crate) team: Team,
    pub(crate) archetype: ArchetypeKey,
    pub(crate) stats: ArchetypeStats,
    pub(crate) position: Point,
    pub(crate) health: Health,
    pub(crate) status: UnitStatus,
    attack_cooldown: u32,
    heal_cooldown: u32,
    pending: Option<PendingAction>,
}

impl Unit {
    fn new(
        id: UnitId,
        team: Team,
        archetype: ArchetypeKey,
        stats: ArchetypeStats,
        position: Point,
    ) -> Self {
        Self {
            id,
            team,
            archetype,
            stats,
            position,
            health: Health::new(stats.hp()),
            status: UnitStatus::Idle,
            attack_cooldown: 0,
            heal_cooldown: 0,
            pending: None,
        }
    }

    pub(crate) fn alive(&self) -> bool {
        !self.health.is_depleted()
    }

    pub(crate) fn max_health(&self) -> Health {
        Health::new(self.stats.hp())
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Maximum distance at which the unit may start the action.
    pub(crate) fn range_for(&self, kind: ActionKind) -> Option<f32> {
        match kind {
            ActionKind::Attack if !self.stats.is_healer() => Some(self.stats.attack_range()),
            ActionKind::Attack => None,
            ActionKind::Heal => self.stats.heal().map(|heal| heal.range()),
        }
    }

    pub(crate) fn cooldown_for(&self, kind: ActionKind) -> u32 {
        match kind {
            ActionKind::Attack => self.attack_cooldown,
            ActionKind::Heal => self.heal_cooldown,
        }
    }

    fn windup_for(&self, kind: ActionKind) -> u32 {
        match kind {
            ActionKind::Attack => self.stats.attack_windup_ticks(),
            ActionKind::Heal => self.stats.heal().map_or(0, |heal| heal.windup_ticks()),
        }
    }

    /// Decrements both cooldowns by one tick, saturating at zero.
    pub(crate) fn tick_cooldowns(&mut self) {
        self.attack_cooldown = self.attack_cooldown.saturating_sub(1);
        self.heal_cooldown = self.heal_cooldown.saturating_sub(1);
    }

    /// Records a wind-up and returns its length in ticks.
    ///
    /// A zero-length wind-up is not recorded; callers resolve it at once.
    pub(crate) fn begin(&mut self, kind: ActionKind, target: UnitId) -> u32 {
        let windup = self.windup_for(kind);
        self.status = match kind {
            ActionKind::Attack => UnitStatus::Attacking,
            ActionKind::Heal => UnitStatus::Healing,
        };
        if windup > 0 {
            self.pending = Some(PendingAction {
                kind,
                target,
                remaining: windup,
            });
        }
        windup
    }

    /// Counts the pending wind-up down by one tick.
    ///
    /// Returns the action once its countdown reaches zero.
    pub(crate) fn advance_pending(&mut self) -> Option<PendingAction> {
        let pending = self.pending.as_mut()?;
        pending.remaining = pending.remaining.saturating_sub(1);
        if pending.remaining > 0 {
            return None;
        }
        self.pending.take()
    }

    /// Starts the cooldown of a resolved action and returns to idle.
    pub(crate) fn finish(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::Attack => self.attack_cooldown = self.stats.attack_cooldown(),
            ActionKind::Heal => {
                self.heal_cooldown = self.stats.heal().map_or(0, |heal| heal.cooldown());
            }
        }
        if self.alive() {
            self.status = UnitStatus::Idle;
        }
    }

    /// Applies damage and reports whether this hit killed the unit.
    pub(crate) fn take_damage(&mut self, amount: u32) -> bool {
        if !self.alive() {
            return false;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health.is_depleted() {
            self.status = UnitStatus::Dead;
            self.pending = None;
            return true;
        }
        false
    }

    pub(crate) fn receive_heal(&mut self, amount: u32) {
        if self.alive() {
            self.health = self.health.restored(amount, self.max_health());
        }
    }

    /// Clears any in-flight action state and cooldowns.
    pub(crate) fn reset_combat_state(&mut self) {
        self.pending = None;
        self.attack_cooldown = 0;
        self.heal_cooldown = 0;
        if self.alive() {
            self.status = UnitStatus::Idle;
        }
    }

    pub(crate) fn snapshot(&self, cell: Option<CellCoord>) -> UnitSnapshot {
        UnitSnapshot {
            id: self.id,
            team: self.team,
            archetype: self.archetype.clone(),
            position: self.position,
            cell,
            health: self.health,
            max_health: self.max_health(),
            attack_range: self.stats.attack_range(),
            heal_range: self.stats.heal().map(|heal| heal.range()),
            attack_cooldown: self.attack_cooldown,
            heal_cooldown: self.heal_cooldown,
            status: self.status,
            pending: self.pending,
        }
    }
}

/// Registry that stores units and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct UnitRegistry {
    entries: BTreeMap<UnitId, Unit>,
    next_unit_id: Option<UnitId>,
}

impl UnitRegistry {
    /// Creates an empty unit registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_unit_id: Some(UnitId::new(0)),
        }
    }

    #[cfg(test)]
    fn starting_at(next: u32) -> Self {
        Self {
            entries: BTreeMap::new(),
            next_unit_id: Some(UnitId::new(next)),
        }
    }

    /// Creates a unit at full health and returns its identifier.
    ///
    /// Returns `None` once every identifier has been handed out.
    pub(crate) fn spawn(
        &mut self,
        team: Team,
        archetype: ArchetypeKey,
        stats: ArchetypeStats,
        position: Point,
    ) -> Option<UnitId> {
        let id = self.next_unit_id?;
        self.next_unit_id = id.get().checked_add(1).map(UnitId::new);
        let _ = self
            .entries
            .insert(id, Unit::new(id, team, archetype, stats, position));
        Some(id)
    }

    pub(crate) fn get(&self, id: UnitId) -> Option<&Unit> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.entries.remove(&id)
    }

    /// Removes every unit of the team, returning the removed identifiers.
    pub(crate) fn remove_team(&mut self, team: Team) -> Vec<UnitId> {
        let removed: Vec<UnitId> = self
            .entries
            .values()
            .filter(|unit| unit.team == team)
            .map(|unit| unit.id)
            .collect();
        for id in &removed {
            let _ = self.entries.remove(id);
        }
        removed
    }

    /// Identifiers of living units in ascending order.
    pub(crate) fn living_ids(&self) -> Vec<UnitId> {
        self.entries
            .values()
            .filter(|unit| unit.alive())
            .map(|unit| unit.id)
            .collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.entries.values_mut()
    }
}
