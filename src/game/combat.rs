//! Combat pipeline - contact damage, aggregation, application, attacks
//!
//! Stages run in this order within a tick, each followed by a flush:
//! `detect_contacts` -> `aggregate_damage` -> `apply_damage`. Attack
//! execution runs earlier in the tick and only spawns projectiles.

use std::collections::HashSet;

use tracing::{debug, trace};

use super::archetypes::Blueprint;
use super::components::look_rotation;
use super::deferred::{EntityCommand, EntityCommands};
use super::physics::PhysicsQuery;
use super::targeting::TargetingSystem;
use super::tick::Tick;
use super::world::{Entity, World};

pub struct CombatSystem;

impl CombatSystem {
    /// Turn this tick's contact events into pending damage.
    ///
    /// A dealer damages each receiver at most once over its lifetime and is
    /// marked for destruction after a successful hit. With `screen_teams`,
    /// contacts between entities on the same team are ignored.
    pub fn detect_contacts(
        world: &World,
        physics: &mut dyn PhysicsQuery,
        screen_teams: bool,
        commands: &mut EntityCommands,
    ) -> usize {
        let events = physics.contact_events(world);
        let mut hit_this_tick: HashSet<(Entity, Entity)> = HashSet::new();

        for event in events {
            if !world.is_alive(event.a) || !world.is_alive(event.b) {
                continue;
            }

            if screen_teams {
                let team_a = world.teams.get(event.a).copied().unwrap_or_default();
                let team_b = world.teams.get(event.b).copied().unwrap_or_default();
                if team_a.is_friendly_with(team_b) {
                    continue;
                }
            }

            for (dealer, receiver) in [(event.a, event.b), (event.b, event.a)] {
                let Some(damage) = world.damage_dealers.get(dealer) else {
                    continue;
                };
                if damage.kind != event.kind || !world.pending_damage.contains(receiver) {
                    continue;
                }
                if damage.has_damaged(receiver) || !hit_this_tick.insert((dealer, receiver)) {
                    trace!(dealer = ?dealer, receiver = ?receiver, "Repeated contact ignored");
                    continue;
                }

                commands.push(EntityCommand::AppendDamage {
                    receiver,
                    amount: damage.value,
                });
                commands.mark_for_destroy(dealer);
                commands.push(EntityCommand::RecordDamaged { dealer, receiver });
            }
        }

        hit_this_tick.len()
    }

    /// Sum each pending mailbox into the damage history for `now`.
    ///
    /// An empty mailbox still records an explicit zero for the tick.
    pub fn aggregate_damage(world: &mut World, now: Tick) {
        for (entity, pending) in world.pending_damage.iter_mut() {
            let total: i32 = pending.drain(..).sum();
            if let Some(history) = world.damage_history.get_mut(entity) {
                history.set(now, total);
            }
        }
    }

    /// Apply the damage recorded for exactly `now`. Returns the entities
    /// whose hit points were depleted.
    pub fn apply_damage(world: &mut World, now: Tick, commands: &mut EntityCommands) -> Vec<Entity> {
        let mut depleted = Vec::new();

        for (entity, history) in world.damage_history.iter() {
            let Some(&amount) = history.get_exact(now) else {
                continue;
            };
            let Some(hit_points) = world.hit_points.get_mut(entity) else {
                continue;
            };

            hit_points.current -= amount;
            if hit_points.is_depleted() {
                commands.mark_for_destroy(entity);
                depleted.push(entity);
            }
        }

        depleted
    }

    /// Fire at current targets. Attackers still on cooldown are skipped.
    ///
    /// Firing snaps the attacker to face its target, spawns a projectile at
    /// the fire point and stores the new cooldown expiry for `now`.
    pub fn execute_attacks(
        world: &World,
        now: Tick,
        tick_rate: u32,
        commands: &mut EntityCommands,
    ) -> usize {
        let mut fired = 0;

        for (attacker, attack) in world.attacks.iter() {
            let Some((target, target_position)) = TargetingSystem::resolve(world, attacker) else {
                continue;
            };

            let ready = world
                .attack_cooldowns
                .get(attacker)
                .and_then(|cooldowns| cooldowns.get_at_or_before(now))
                .map_or(true, |expires_at| now.is_newer_or_equal(*expires_at));
            if !ready {
                continue;
            }

            let Some(position) = world.position(attacker) else {
                continue;
            };
            let team = world.teams.get(attacker).copied().unwrap_or_default();

            commands.push(EntityCommand::SetRotation {
                entity: attacker,
                rotation: look_rotation(target_position - position),
            });

            let spawn_position = position + attack.fire_point_offset;
            commands.spawn(Blueprint::projectile(
                &attack.projectile,
                team,
                spawn_position,
                target_position - spawn_position,
                tick_rate,
            ));

            commands.push(EntityCommand::SetAttackCooldown {
                entity: attacker,
                tick: now,
                expires_at: now.add(attack.cooldown_ticks),
            });

            debug!(attacker = ?attacker, target = ?target, tick = %now, "Attack fired");
            fired += 1;
        }

        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::game::components::{ContactKind, DamageOnContact, EntityKind, NetworkId, Owner, TeamAffiliation, Transform};
    use crate::game::physics::{ContactEvent, ScriptedPhysics};
    use glam::Vec3;

    fn player(world: &mut World) -> Entity {
        let connection = world.spawn_connection(NetworkId(1));
        let owner = Owner {
            network_id: NetworkId(1),
            connection,
        };
        world
            .spawn(Blueprint::player(&SimConfig::default(), Vec3::ZERO, owner), Tick::new(0), 16)
            .unwrap()
    }

    fn projectile(world: &mut World, damage: i32, team: TeamAffiliation) -> Entity {
        let mut bp = Blueprint::new(EntityKind::Projectile, Transform::default(), team);
        bp.damage_on_contact = Some(DamageOnContact::new(damage, ContactKind::Trigger));
        world.spawn(bp, Tick::new(0), 16).unwrap()
    }

    fn flush(world: &mut World, commands: &mut EntityCommands, now: Tick) {
        commands.apply(world, now, 16);
    }

    #[test]
    fn replayed_contact_damages_once() {
        let mut world = World::new();
        let target = player(&mut world);
        let shot = projectile(&mut world, 25, TeamAffiliation::Enemy);
        let mut physics = ScriptedPhysics::new();
        let mut commands = EntityCommands::new();

        physics.push_contact(ContactEvent::trigger(shot, target));
        physics.push_contact(ContactEvent::trigger(target, shot));
        CombatSystem::detect_contacts(&world, &mut physics, true, &mut commands);
        flush(&mut world, &mut commands, Tick::new(1));

        // Same pair again on a later tick, dealer still alive because no sweep ran
        physics.push_contact(ContactEvent::trigger(shot, target));
        CombatSystem::detect_contacts(&world, &mut physics, true, &mut commands);
        flush(&mut world, &mut commands, Tick::new(2));

        assert_eq!(world.pending_damage.get(target).unwrap(), &vec![25]);
        assert!(world.destroy_marked.contains(shot));
        assert!(world.damage_dealers.get(shot).unwrap().has_damaged(target));
    }

    #[test]
    fn same_team_contacts_are_screened() {
        let mut world = World::new();
        let target = player(&mut world);
        let shot = projectile(&mut world, 25, TeamAffiliation::Player);
        let mut physics = ScriptedPhysics::new();
        let mut commands = EntityCommands::new();

        physics.push_contact(ContactEvent::trigger(shot, target));
        CombatSystem::detect_contacts(&world, &mut physics, true, &mut commands);
        assert!(commands.is_empty());

        physics.push_contact(ContactEvent::trigger(shot, target));
        CombatSystem::detect_contacts(&world, &mut physics, false, &mut commands);
        assert!(!commands.is_empty());
    }

    #[test]
    fn contact_kind_must_match_dealer() {
        let mut world = World::new();
        let target = player(&mut world);
        let shot = projectile(&mut world, 25, TeamAffiliation::Enemy);
        let mut physics = ScriptedPhysics::new();
        let mut commands = EntityCommands::new();

        physics.push_contact(ContactEvent::collision(shot, target));
        CombatSystem::detect_contacts(&world, &mut physics, true, &mut commands);
        assert!(commands.is_empty());
    }

    #[test]
    fn empty_mailbox_records_zero() {
        let mut world = World::new();
        let target = player(&mut world);

        CombatSystem::aggregate_damage(&mut world, Tick::new(5));
        let history = world.damage_history.get(target).unwrap();
        assert_eq!(history.get_exact(Tick::new(5)), Some(&0));
    }

    #[test]
    fn only_damage_for_the_current_tick_applies() {
        let mut world = World::new();
        let target = player(&mut world);
        world.pending_damage.get_mut(target).unwrap().extend([10, 20]);
        CombatSystem::aggregate_damage(&mut world, Tick::new(5));

        let mut commands = EntityCommands::new();
        CombatSystem::apply_damage(&mut world, Tick::new(6), &mut commands);
        assert_eq!(world.hit_points.get(target).unwrap().current, 100);

        CombatSystem::apply_damage(&mut world, Tick::new(5), &mut commands);
        assert_eq!(world.hit_points.get(target).unwrap().current, 70);
        assert!(commands.is_empty());
    }

    #[test]
    fn lethal_damage_marks_for_destroy() {
        let mut world = World::new();
        let target = player(&mut world);
        world.pending_damage.get_mut(target).unwrap().extend([60, 60]);
        CombatSystem::aggregate_damage(&mut world, Tick::new(3));

        let mut commands = EntityCommands::new();
        let depleted = CombatSystem::apply_damage(&mut world, Tick::new(3), &mut commands);
        flush(&mut world, &mut commands, Tick::new(3));

        assert_eq!(depleted, vec![target]);
        assert_eq!(world.hit_points.get(target).unwrap().current, -20);
        assert_eq!(world.hit_points.get(target).unwrap().displayed(), 0);
        assert!(world.destroy_marked.contains(target));
    }

    #[test]
    fn attacker_respects_cooldown() {
        let config = SimConfig::default();
        let mut world = World::new();
        let target = player(&mut world);
        world.transforms.get_mut(target).unwrap().position = Vec3::new(0.0, 0.0, 5.0);
        let rogue = world
            .spawn(Blueprint::rogue(&config, Vec3::ZERO), Tick::new(0), 16)
            .unwrap();
        world.targets.insert(rogue, Some(target));

        let mut commands = EntityCommands::new();
        let start = Tick::new(10);
        assert_eq!(CombatSystem::execute_attacks(&world, start, 60, &mut commands), 1);
        let report = commands.apply(&mut world, start, 16);
        assert_eq!(report.spawned.len(), 1);

        let cooldown = config.rogue_attack.cooldown_ticks;
        let blocked = start.add(cooldown - 1);
        assert_eq!(CombatSystem::execute_attacks(&world, blocked, 60, &mut commands), 0);
        assert!(commands.is_empty());

        let ready = start.add(cooldown);
        assert_eq!(CombatSystem::execute_attacks(&world, ready, 60, &mut commands), 1);

        let projectile = report.spawned[0];
        assert_eq!(world.teams.get(projectile), Some(&TeamAffiliation::Enemy));
        let transform = world.transforms.get(projectile).unwrap();
        assert_eq!(transform.position, Vec3::new(0.0, 1.0, 0.0));
        let aim = (Vec3::new(0.0, 0.0, 5.0) - transform.position).normalize();
        assert!((transform.forward() - aim).length() < 1e-4);
    }

    #[test]
    fn attacker_without_target_does_nothing() {
        let mut world = World::new();
        world
            .spawn(Blueprint::rogue(&SimConfig::default(), Vec3::ZERO), Tick::new(0), 16)
            .unwrap();
        let mut commands = EntityCommands::new();
        assert_eq!(CombatSystem::execute_attacks(&world, Tick::new(1), 60, &mut commands), 0);
    }
}
