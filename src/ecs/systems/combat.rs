use crate::ecs::components::Stats;
use crate::ecs::store::EntityStore;
use crate::error::GameError;
use crate::protocol::EntityId;

/// What a single attack did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackOutcome {
    pub message: String,
    pub damage: i32,
    pub defender_died: bool,
}

/// Damage is the attacker's strength, no roll and no mitigation. Returns
/// the damage dealt and whether the defender dropped to zero or below.
pub fn apply_damage(attacker: &Stats, defender: &mut Stats) -> (i32, bool) {
    let damage = attacker.strength;
    defender.health -= damage;
    (damage, defender.health <= 0)
}

/// Resolve `attacker` hitting `defender`.
///
/// A defeated defender is soft-deleted (inactive, dirty). A surviving one
/// is marked dirty so its health is replicated.
pub fn resolve_attack(
    store: &mut EntityStore,
    attacker: EntityId,
    defender: EntityId,
) -> Result<AttackOutcome, GameError> {
    let attacker_stats = store
        .component::<Stats>(attacker)
        .ok_or(GameError::MissingComponent {
            entity: attacker,
            component: "stats",
        })?;

    let (damage, died) = store
        .with_mut::<Stats, _>(defender, |stats| apply_damage(&attacker_stats, stats))
        .ok_or(GameError::MissingComponent {
            entity: defender,
            component: "stats",
        })?;

    let name = store.display_name(defender);
    let message = if died {
        store.deactivate(defender);
        format!("You defeated {} [{} damage]", name, damage)
    } else {
        store.mark_updated(defender);
        format!("You attacked {} for {} damage", name, damage)
    };

    Ok(AttackOutcome {
        message,
        damage,
        defender_died: died,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::{Component, Name};

    fn fighter(store: &mut EntityStore, name: &str, health: i32, strength: i32) -> EntityId {
        let id = store.create_entity();
        store
            .add_component(id, Component::Stats(Stats { health, strength }))
            .unwrap();
        store
            .add_component(id, Component::Name(Name(name.to_string())))
            .unwrap();
        id
    }

    #[test]
    fn two_hits_defeat_a_ten_health_defender() {
        let mut store = EntityStore::new();
        let hero = fighter(&mut store, "hero", 20, 5);
        let slime = fighter(&mut store, "Slime", 10, 1);

        let first = resolve_attack(&mut store, hero, slime).unwrap();
        assert!(!first.defender_died);
        assert!(first.message.contains("5 damage"));
        assert!(first.message.contains("Slime"));
        assert_eq!(store.component::<Stats>(slime).unwrap().health, 5);
        assert!(store.is_active(slime));

        let second = resolve_attack(&mut store, hero, slime).unwrap();
        assert!(second.defender_died);
        assert!(second.message.starts_with("You defeated Slime"));
        assert_eq!(store.component::<Stats>(slime).unwrap().health, 0);
        assert!(!store.is_active(slime));
        assert!(store.is_updated(slime));
    }

    #[test]
    fn hit_marks_defender_dirty() {
        let mut store = EntityStore::new();
        let hero = fighter(&mut store, "hero", 20, 1);
        let slime = fighter(&mut store, "Slime", 10, 1);
        store.clear_updated(slime);
        resolve_attack(&mut store, hero, slime).unwrap();
        assert!(store.is_updated(slime));
    }

    #[test]
    fn overkill_still_defeats() {
        let mut defender = Stats {
            health: 2,
            strength: 0,
        };
        let (damage, died) = apply_damage(
            &Stats {
                health: 1,
                strength: 9,
            },
            &mut defender,
        );
        assert_eq!(damage, 9);
        assert!(died);
        assert_eq!(defender.health, -7);
    }

    #[test]
    fn missing_stats_is_an_error() {
        let mut store = EntityStore::new();
        let hero = fighter(&mut store, "hero", 20, 5);
        let rock = store.create_entity();
        assert!(matches!(
            resolve_attack(&mut store, hero, rock),
            Err(GameError::MissingComponent { .. })
        ));
        assert!(store.is_active(rock));
    }
}
