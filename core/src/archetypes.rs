//! Static unit archetype definitions injected as configuration.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

// Wind-up ticks are truncated, so an exact product such as 10 * 0.7 / 0.1
// must not land a hair below its integer value.
const WINDUP_EPSILON: f64 = 1e-3;

/// Name that identifies a unit archetype, such as `"archer"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchetypeKey(String);

impl ArchetypeKey {
    /// Creates a new archetype key from the provided name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the archetype name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchetypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArchetypeKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// How an attack reaches its target once the wind-up completes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Delivery {
    /// Damage lands on the target the moment the attack resolves.
    Melee,
    /// A homing projectile is launched and damages the target on arrival.
    Projectile {
        /// Distance covered by the projectile each tick, in world units.
        speed: f32,
    },
}

/// Animation timing that determines when an action releases its payload.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionAnimation {
    frames: u32,
    playback_speed: f32,
    release_at: f32,
}

impl ActionAnimation {
    /// Creates an animation description.
    ///
    /// `playback_speed` is the number of frames advanced per tick and
    /// `release_at` is the fraction of the animation at which the payload
    /// is delivered.
    #[must_use]
    pub const fn new(frames: u32, playback_speed: f32, release_at: f32) -> Self {
        Self {
            frames,
            playback_speed,
            release_at,
        }
    }

    /// Number of frames contained in the animation strip.
    #[must_use]
    pub const fn frames(&self) -> u32 {
        self.frames
    }

    /// Frames advanced per simulation tick.
    #[must_use]
    pub const fn playback_speed(&self) -> f32 {
        self.playback_speed
    }

    /// Fraction of the animation at which the payload is released.
    #[must_use]
    pub const fn release_at(&self) -> f32 {
        self.release_at
    }

    /// Number of ticks between starting the action and releasing its payload.
    ///
    /// Degenerate animations (no frames, non-positive speed or release
    /// fraction) release immediately.
    #[must_use]
    pub fn windup_ticks(&self) -> u32 {
        if self.frames == 0 || self.playback_speed <= 0.0 || self.release_at <= 0.0 {
            return 0;
        }

        let ticks = f64::from(self.frames) * f64::from(self.release_at)
            / f64::from(self.playback_speed);
        let ticks = (ticks + WINDUP_EPSILON).floor();
        if ticks >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            ticks as u32
        }
    }
}

/// Healing capability carried by support archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealStats {
    amount: u32,
    range: f32,
    cooldown: u32,
    #[serde(default)]
    animation: Option<ActionAnimation>,
}

impl HealStats {
    /// Creates healing stats without a wind-up animation.
    #[must_use]
    pub const fn new(amount: u32, range: f32, cooldown: u32) -> Self {
        Self {
            amount,
            range,
            cooldown,
            animation: None,
        }
    }

    /// Attaches the animation that delays the heal payload.
    #[must_use]
    pub const fn with_animation(mut self, animation: ActionAnimation) -> Self {
        self.animation = Some(animation);
        self
    }

    /// Health restored by a single heal.
    #[must_use]
    pub const fn amount(&self) -> u32 {
        self.amount
    }

    /// Maximum distance to the ally for a heal to start.
    #[must_use]
    pub const fn range(&self) -> f32 {
        self.range
    }

    /// Ticks the healer must wait after a heal resolves.
    #[must_use]
    pub const fn cooldown(&self) -> u32 {
        self.cooldown
    }

    /// Ticks between starting a heal and restoring health.
    #[must_use]
    pub fn windup_ticks(&self) -> u32 {
        self.animation.map_or(0, |animation| animation.windup_ticks())
    }
}

/// Fixed base statistics for a unit archetype.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeStats {
    cost: u32,
    hp: u32,
    damage: u32,
    attack_range: f32,
    attack_cooldown: u32,
    move_speed: f32,
    #[serde(default = "default_delivery")]
    delivery: Delivery,
    #[serde(default)]
    attack_animation: Option<ActionAnimation>,
    #[serde(default)]
    heal: Option<HealStats>,
}

fn default_delivery() -> Delivery {
    Delivery::Melee
}

impl ArchetypeStats {
    /// Creates a melee archetype whose attacks resolve instantly.
    #[must_use]
    pub const fn new(
        cost: u32,
        hp: u32,
        damage: u32,
        attack_range: f32,
        attack_cooldown: u32,
        move_speed: f32,
    ) -> Self {
        Self {
            cost,
            hp,
            damage,
            attack_range,
            attack_cooldown,
            move_speed,
            delivery: Delivery::Melee,
            attack_animation: None,
            heal: None,
        }
    }

    /// Replaces the attack delivery mode.
    #[must_use]
    pub const fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Attaches the animation that delays attack resolution.
    #[must_use]
    pub const fn with_attack_animation(mut self, animation: ActionAnimation) -> Self {
        self.attack_animation = Some(animation);
        self
    }

    /// Turns the archetype into a healer.
    #[must_use]
    pub const fn with_heal(mut self, heal: HealStats) -> Self {
        self.heal = Some(heal);
        self
    }

    /// Gold required to purchase the archetype.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Starting and maximum health.
    #[must_use]
    pub const fn hp(&self) -> u32 {
        self.hp
    }

    /// Damage dealt by a single attack.
    #[must_use]
    pub const fn damage(&self) -> u32 {
        self.damage
    }

    /// Maximum distance to the enemy for an attack to start.
    #[must_use]
    pub const fn attack_range(&self) -> f32 {
        self.attack_range
    }

    /// Ticks the unit must wait after an attack resolves.
    #[must_use]
    pub const fn attack_cooldown(&self) -> u32 {
        self.attack_cooldown
    }

    /// Distance travelled per tick while seeking a target.
    #[must_use]
    pub const fn move_speed(&self) -> f32 {
        self.move_speed
    }

    /// Attack delivery mode.
    #[must_use]
    pub const fn delivery(&self) -> Delivery {
        self.delivery
    }

    /// Optional healing capability.
    #[must_use]
    pub const fn heal(&self) -> Option<HealStats> {
        self.heal
    }

    /// Reports whether attacks launch projectiles.
    #[must_use]
    pub const fn is_ranged(&self) -> bool {
        matches!(self.delivery, Delivery::Projectile { .. })
    }

    /// Reports whether the archetype heals allies instead of attacking.
    #[must_use]
    pub const fn is_healer(&self) -> bool {
        self.heal.is_some()
    }

    /// Ticks between starting an attack and resolving it.
    #[must_use]
    pub fn attack_windup_ticks(&self) -> u32 {
        self.attack_animation
            .map_or(0, |animation| animation.windup_ticks())
    }
}

/// Lookup table from archetype name to stats.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchetypeTable {
    entries: BTreeMap<ArchetypeKey, ArchetypeStats>,
}

impl ArchetypeTable {
    /// Looks up the stats registered for an archetype.
    #[must_use]
    pub fn get(&self, key: &ArchetypeKey) -> Option<&ArchetypeStats> {
        self.entries.get(key)
    }

    /// Reports whether the archetype is registered.
    #[must_use]
    pub fn contains(&self, key: &ArchetypeKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates archetypes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&ArchetypeKey, &ArchetypeStats)> {
        self.entries.iter()
    }

    /// Reports whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(ArchetypeKey, ArchetypeStats)> for ArchetypeTable {
    fn from_iter<T: IntoIterator<Item = (ArchetypeKey, ArchetypeStats)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archer_windup_matches_release_fraction() {
        let animation = ActionAnimation::new(8, 0.15, 0.7);
        assert_eq!(animation.windup_ticks(), 37);
    }

    #[test]
    fn exact_products_are_not_truncated_down() {
        let animation = ActionAnimation::new(10, 0.1, 0.7);
        assert_eq!(animation.windup_ticks(), 70);
    }

    #[test]
    fn degenerate_animation_releases_immediately() {
        assert_eq!(ActionAnimation::new(0, 0.1, 0.5).windup_ticks(), 0);
        assert_eq!(ActionAnimation::new(6, 0.0, 0.5).windup_ticks(), 0);
    }

    #[test]
    fn instant_melee_has_no_windup() {
        let warrior = ArchetypeStats::new(3, 10, 2, 60.0, 60, 1.5);
        assert_eq!(warrior.attack_windup_ticks(), 0);
        assert!(!warrior.is_ranged());
        assert!(!warrior.is_healer());
    }

    #[test]
    fn heal_without_animation_is_instant() {
        let heal = HealStats::new(2, 150.0, 90);
        assert_eq!(heal.windup_ticks(), 0);
        let animated = heal.with_animation(ActionAnimation::new(6, 0.1, 0.5));
        assert_eq!(animated.windup_ticks(), 30);
    }

    #[test]
    fn table_preserves_name_order() {
        let table: ArchetypeTable = [
            (
                ArchetypeKey::new("warrior"),
                ArchetypeStats::new(3, 10, 2, 60.0, 60, 1.5),
            ),
            (
                ArchetypeKey::new("archer"),
                ArchetypeStats::new(3, 6, 2, 300.0, 90, 1.2),
            ),
        ]
        .into_iter()
        .collect();

        let names: Vec<&str> = table.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(names, vec!["archer", "warrior"]);
    }
}
