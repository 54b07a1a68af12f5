//! Enemy population control and player spawn placement

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::archetypes::Blueprint;
use super::components::EntityKind;
use super::deferred::EntityCommands;
use crate::config::{EnemyConfig, SimConfig};

/// One enemy archetype's timer, counter and cap
#[derive(Debug, Clone)]
pub struct SpawnTrack {
    pub kind: EntityKind,
    pub cap: u32,
    pub cooldown: f32,
    pub timer: f32,
    pub spawned: u32,
}

impl SpawnTrack {
    pub fn new(kind: EntityKind, config: &EnemyConfig) -> Self {
        Self {
            kind,
            cap: config.cap,
            cooldown: config.spawn_cooldown_seconds,
            timer: config.spawn_cooldown_seconds,
            spawned: 0,
        }
    }

    pub fn can_spawn(&self) -> bool {
        self.timer <= 0.0 && self.spawned < self.cap
    }
}

/// Two independent tracks sharing the spawn points and jitter.
///
/// Deaths never decrement the counters: the caps bound total spawns over
/// the match, not the live population.
#[derive(Debug, Clone)]
pub struct EnemySpawner {
    pub slime: SpawnTrack,
    pub rogue: SpawnTrack,
    spawn_points: Vec<Vec3>,
    jitter_range: f32,
    jitter: f32,
}

impl EnemySpawner {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            slime: SpawnTrack::new(EntityKind::Slime, &config.slime),
            rogue: SpawnTrack::new(EntityKind::Rogue, &config.rogue),
            spawn_points: config.spawn_points.clone(),
            jitter_range: config.spawn_jitter_range.abs(),
            jitter: config.spawn_jitter_range.abs(),
        }
    }

    pub fn jitter(&self) -> f32 {
        self.jitter
    }

    /// Advance timers by `dt` and queue at most one spawn per track
    pub fn update(&mut self, config: &SimConfig, dt: f32, commands: &mut EntityCommands) -> usize {
        if self.spawn_points.is_empty() {
            return 0;
        }

        self.slime.timer -= dt;
        self.rogue.timer -= dt;
        if self.jitter > -self.jitter_range {
            self.jitter -= dt;
        } else {
            self.jitter = self.jitter_range;
        }

        let mut spawned = 0;
        if self.slime.can_spawn() {
            let position = self.next_position(self.slime.spawned);
            commands.spawn(Blueprint::slime(config, position));
            Self::record_spawn(&mut self.slime, position);
            spawned += 1;
        }
        if self.rogue.can_spawn() {
            let position = self.next_position(self.rogue.spawned);
            commands.spawn(Blueprint::rogue(config, position));
            Self::record_spawn(&mut self.rogue, position);
            spawned += 1;
        }
        spawned
    }

    /// Round-robin spawn point plus the current jitter
    fn next_position(&self, counter: u32) -> Vec3 {
        let point = self.spawn_points[counter as usize % self.spawn_points.len()];
        point + Vec3::new(self.jitter, 0.0, -self.jitter)
    }

    fn record_spawn(track: &mut SpawnTrack, position: Vec3) {
        track.spawned += 1;
        track.timer = track.cooldown;
        debug!(
            kind = ?track.kind,
            spawned = track.spawned,
            cap = track.cap,
            x = position.x,
            z = position.z,
            "Enemy spawned"
        );
    }
}

/// Seeded placement for player avatars along the x axis
#[derive(Debug, Clone)]
pub struct PlayerPlacement {
    rng: ChaCha8Rng,
    half_width: f32,
}

impl PlayerPlacement {
    pub fn new(seed: u64, half_width: f32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            half_width: half_width.abs(),
        }
    }

    pub fn next_position(&mut self) -> Vec3 {
        if self.half_width == 0.0 {
            return Vec3::ZERO;
        }
        let x = self.rng.gen_range(-self.half_width..self.half_width);
        Vec3::new(x, 0.0, 0.0)
    }
}
