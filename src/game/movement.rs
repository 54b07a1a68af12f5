//! Velocity and rotation updates, followed by position integration

use glam::Vec3;

use super::components::{look_rotation, PlayerInput, SprintState};
use super::targeting::TargetingSystem;
use super::tick::Tick;
use super::world::World;

impl SprintState {
    /// Advance the sprint pool by one step and return the speed to move at.
    ///
    /// Sprinting drains the pool while moving. Draining it completely locks
    /// sprinting for the cooldown, after which the pool is full again.
    pub fn step(&mut self, wants_sprint: bool, moving: bool, dt: f32) -> f32 {
        if self.in_cooldown {
            self.cooldown_remaining -= dt;
            if self.cooldown_remaining <= 0.0 {
                self.cooldown_remaining = 0.0;
                self.in_cooldown = false;
                self.remaining = self.sprint_duration;
            }
            return self.walk_speed;
        }

        if wants_sprint && moving && self.remaining > 0.0 {
            self.remaining -= dt;
            if self.remaining <= 0.0 {
                self.remaining = 0.0;
                self.in_cooldown = true;
                self.cooldown_remaining = self.cooldown_duration;
            }
            return self.sprint_speed;
        }

        self.walk_speed
    }
}

pub struct MovementSystem;

impl MovementSystem {
    /// Steer player avatars from the input effective at `now`.
    ///
    /// `smoothing` scales both the velocity blend and the look rotation blend.
    pub fn update_players(world: &mut World, now: Tick, dt: f32, smoothing: f32) {
        let blend = (dt * smoothing).clamp(0.0, 1.0);

        for entity in world.sprint.entities() {
            let input = world
                .inputs
                .get(entity)
                .and_then(|inputs| inputs.get_at_or_before(now))
                .copied()
                .unwrap_or_default();

            let Some(sprint) = world.sprint.get_mut(entity) else {
                continue;
            };
            let moving = input.movement != glam::Vec2::ZERO;
            let speed = sprint.step(input.sprint, moving, dt);
            let desired = ground_direction(&input) * speed;

            if let Some(velocity) = world.velocities.get_mut(entity) {
                *velocity = velocity.lerp(desired, blend);
            }
            if moving {
                if let Some(transform) = world.transforms.get_mut(entity) {
                    transform.rotation = transform.rotation.slerp(look_rotation(desired), blend);
                }
            }
        }
    }

    /// Move chasers straight at their target, or stop them if it is gone
    pub fn update_chasers(world: &mut World, dt: f32, smoothing: f32) {
        let blend = (dt * smoothing).clamp(0.0, 1.0);

        for (entity, chase) in world.chasers.iter() {
            let Some(position) = world.position(entity) else {
                continue;
            };
            let direction = TargetingSystem::resolve(world, entity)
                .map(|(_, target)| {
                    let to_target = target - position;
                    Vec3::new(to_target.x, 0.0, to_target.z).normalize_or_zero()
                })
                .unwrap_or(Vec3::ZERO);

            if let Some(velocity) = world.velocities.get_mut(entity) {
                *velocity = direction * chase.speed;
            }
            if direction != Vec3::ZERO {
                if let Some(transform) = world.transforms.get_mut(entity) {
                    transform.rotation = transform.rotation.slerp(look_rotation(direction), blend);
                }
            }
        }
    }

    /// Projectiles keep flying along their facing
    pub fn update_forward_motion(world: &mut World) {
        for (entity, motion) in world.forward_motion.iter() {
            let Some(forward) = world.transforms.get(entity).map(|t| t.forward()) else {
                continue;
            };
            if let Some(velocity) = world.velocities.get_mut(entity) {
                *velocity = forward * motion.speed;
            }
        }
    }

    pub fn integrate(world: &mut World, dt: f32) {
        for (entity, velocity) in world.velocities.iter() {
            if let Some(transform) = world.transforms.get_mut(entity) {
                transform.position += *velocity * dt;
            }
        }
    }
}

/// Map the 2D input onto the ground plane (x stays x, y becomes z)
fn ground_direction(input: &PlayerInput) -> Vec3 {
    Vec3::new(input.movement.x, 0.0, input.movement.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::game::archetypes::Blueprint;
    use crate::game::components::{NetworkId, Owner};
    use crate::game::world::Entity;
    use glam::Vec2;

    const DT: f32 = 1.0 / 60.0;

    fn sprint_state() -> SprintState {
        SprintState::new(5.0, 9.0, 0.5, 1.0)
    }

    fn spawn_player(world: &mut World) -> Entity {
        let connection = world.spawn_connection(NetworkId(1));
        let owner = Owner {
            network_id: NetworkId(1),
            connection,
        };
        world
            .spawn(Blueprint::player(&SimConfig::default(), Vec3::ZERO, owner), Tick::new(0), 16)
            .unwrap()
    }

    #[test]
    fn sprint_drains_then_locks_then_refills() {
        let mut state = sprint_state();
        let mut sprint_ticks = 0;
        while state.step(true, true, 0.125) == 9.0 {
            sprint_ticks += 1;
        }
        // The call that ended the loop already spent one cooldown step
        assert_eq!(sprint_ticks, 4);
        assert!(state.in_cooldown);

        for _ in 0..6 {
            assert_eq!(state.step(true, true, 0.125), 5.0);
            assert!(state.in_cooldown);
        }
        assert_eq!(state.step(true, true, 0.125), 5.0);
        assert!(!state.in_cooldown);
        assert_eq!(state.remaining, state.sprint_duration);
        assert_eq!(state.step(true, true, 0.125), 9.0);
    }

    #[test]
    fn sprint_needs_movement() {
        let mut state = sprint_state();
        assert_eq!(state.step(true, false, 0.125), 5.0);
        assert_eq!(state.remaining, 0.5);
    }

    #[test]
    fn player_reads_latest_input_at_or_before_tick() {
        let mut world = World::new();
        let player = spawn_player(&mut world);
        world
            .inputs
            .get_mut(player)
            .unwrap()
            .set(Tick::new(1), PlayerInput::new(Vec2::new(1.0, 0.0), false));

        for tick in 1..=120u32 {
            MovementSystem::update_players(&mut world, Tick::new(tick), DT, 10.0);
            MovementSystem::integrate(&mut world, DT);
        }

        let velocity = *world.velocities.get(player).unwrap();
        assert!((velocity.x - 5.0).abs() < 0.01);
        assert!(world.position(player).unwrap().x > 5.0);
        let forward = world.transforms.get(player).unwrap().forward();
        assert!((forward - Vec3::X).length() < 0.01);
    }

    #[test]
    fn chaser_without_target_stands_still() {
        let mut world = World::new();
        let slime = world
            .spawn(Blueprint::slime(&SimConfig::default(), Vec3::ZERO), Tick::new(0), 8)
            .unwrap();
        world.velocities.insert(slime, Vec3::X);

        MovementSystem::update_chasers(&mut world, DT, 10.0);
        assert_eq!(world.velocities.get(slime), Some(&Vec3::ZERO));
    }

    #[test]
    fn chaser_heads_for_target() {
        let mut world = World::new();
        let player = spawn_player(&mut world);
        world.transforms.get_mut(player).unwrap().position = Vec3::new(0.0, 0.0, 4.0);
        let slime = world
            .spawn(Blueprint::slime(&SimConfig::default(), Vec3::ZERO), Tick::new(0), 8)
            .unwrap();
        world.targets.insert(slime, Some(player));

        MovementSystem::update_chasers(&mut world, DT, 10.0);
        let velocity = *world.velocities.get(slime).unwrap();
        assert!((velocity - Vec3::new(0.0, 0.0, 3.0)).length() < 1e-5);
    }
}
