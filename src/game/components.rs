//! Component types attached to entities

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::world::Entity;

/// Team an entity fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamAffiliation {
    #[default]
    None,
    Player,
    Enemy,
    AutoAssign,
}

impl TeamAffiliation {
    /// Whether two affiliations count as the same side for friendly-fire screening
    pub fn is_friendly_with(self, other: TeamAffiliation) -> bool {
        self == other && !matches!(self, TeamAffiliation::None | TeamAffiliation::AutoAssign)
    }
}

/// Archetype tag, used for snapshots and kind-specific lifecycle rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Rogue,
    Slime,
    Projectile,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Facing direction (+Z rotated by the transform's rotation)
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

/// Rotation that faces `direction` on the ground plane.
///
/// Falls back to identity when the direction has no horizontal component.
pub fn look_rotation(direction: Vec3) -> Quat {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    if flat.length_squared() <= f32::EPSILON {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_y(flat.x.atan2(flat.z))
}

/// Rotation whose forward axis points along `direction`, pitch included.
///
/// Projectiles fly along their forward axis, so a shot fired from above its
/// target has to descend toward it.
pub fn aim_rotation(direction: Vec3) -> Quat {
    match direction.try_normalize() {
        Some(dir) => Quat::from_rotation_arc(Vec3::Z, dir),
        None => Quat::IDENTITY,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitPoints {
    pub current: i32,
    pub max: i32,
}

impl HitPoints {
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Value shown to players. Internal hit points may go below zero.
    pub fn displayed(&self) -> i32 {
        self.current.max(0)
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    Trigger,
    Collision,
}

/// Deals a fixed amount of damage to whatever it touches, once per receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageOnContact {
    pub value: i32,
    pub kind: ContactKind,
    /// Receivers this dealer has already hit
    pub already_damaged: Vec<Entity>,
}

impl DamageOnContact {
    pub fn new(value: i32, kind: ContactKind) -> Self {
        Self {
            value,
            kind,
            already_damaged: Vec::new(),
        }
    }

    pub fn has_damaged(&self, receiver: Entity) -> bool {
        self.already_damaged.contains(&receiver)
    }
}

/// Spatial search parameters for the targeting engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSeeker {
    pub radius: f32,
    /// Layers the overlap query may hit
    pub mask: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    pub damage: i32,
    pub speed: f32,
    pub lifetime_seconds: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackProperties {
    /// Offset from the attacker's position where projectiles appear
    pub fire_point_offset: Vec3,
    pub cooldown_ticks: u32,
    pub projectile: ProjectileSpec,
}

/// NPC locomotion toward the current target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaseTarget {
    pub speed: f32,
}

/// Straight-line motion along the entity's facing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForwardMotion {
    pub speed: f32,
}

/// Intent submitted by a client for one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerInput {
    pub movement: Vec2,
    pub sprint: bool,
}

impl PlayerInput {
    pub fn new(movement: Vec2, sprint: bool) -> Self {
        let movement = if movement.is_finite() {
            movement.clamp_length_max(1.0)
        } else {
            Vec2::ZERO
        };
        Self { movement, sprint }
    }
}

/// Sprint pool and cooldown, advanced once per tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SprintState {
    pub walk_speed: f32,
    pub sprint_speed: f32,
    pub sprint_duration: f32,
    pub cooldown_duration: f32,
    pub remaining: f32,
    pub cooldown_remaining: f32,
    pub in_cooldown: bool,
}

impl SprintState {
    pub fn new(walk_speed: f32, sprint_speed: f32, sprint_duration: f32, cooldown_duration: f32) -> Self {
        Self {
            walk_speed,
            sprint_speed,
            sprint_duration,
            cooldown_duration,
            remaining: sprint_duration,
            cooldown_remaining: 0.0,
            in_cooldown: false,
        }
    }
}

/// Stable per-connection id assigned by the network layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub u32);

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection entity data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub network_id: NetworkId,
    /// Set once the join request has been processed
    pub in_game: bool,
    /// Entities destroyed together with this connection
    pub linked: Vec<Entity>,
}

impl Connection {
    pub fn new(network_id: NetworkId) -> Self {
        Self {
            network_id,
            in_game: false,
            linked: Vec::new(),
        }
    }
}

/// Back-reference from a player entity to the connection that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub network_id: NetworkId,
    pub connection: Entity,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub radius: f32,
    /// Layers this collider is on
    pub belongs_to: u32,
    /// Layers this collider reports contacts with
    pub collides_with: u32,
    pub is_trigger: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_rotation_faces_direction() {
        let rot = look_rotation(Vec3::new(1.0, 0.0, 0.0));
        let forward = rot * Vec3::Z;
        assert!((forward - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn aim_rotation_keeps_pitch() {
        let direction = Vec3::new(0.0, -1.0, -5.0);
        let forward = aim_rotation(direction) * Vec3::Z;
        assert!((forward - direction.normalize()).length() < 1e-5);
        assert!(forward.y < 0.0);

        let backward = aim_rotation(-Vec3::Z) * Vec3::Z;
        assert!((backward + Vec3::Z).length() < 1e-5);
        assert_eq!(aim_rotation(Vec3::ZERO), Quat::IDENTITY);
    }

    #[test]
    fn look_rotation_of_vertical_is_identity() {
        assert_eq!(look_rotation(Vec3::Y), Quat::IDENTITY);
        assert_eq!(look_rotation(Vec3::ZERO), Quat::IDENTITY);
    }

    #[test]
    fn displayed_hit_points_never_negative() {
        let hp = HitPoints { current: -15, max: 100 };
        assert_eq!(hp.displayed(), 0);
        assert!(hp.is_depleted());
    }

    #[test]
    fn friendly_fire_ignores_unassigned_teams() {
        assert!(TeamAffiliation::Enemy.is_friendly_with(TeamAffiliation::Enemy));
        assert!(!TeamAffiliation::Enemy.is_friendly_with(TeamAffiliation::Player));
        assert!(!TeamAffiliation::None.is_friendly_with(TeamAffiliation::None));
    }

    #[test]
    fn input_is_clamped_to_unit_length() {
        let input = PlayerInput::new(Vec2::new(3.0, 4.0), false);
        assert!((input.movement.length() - 1.0).abs() < 1e-5);
        assert_eq!(PlayerInput::new(Vec2::new(f32::NAN, 0.0), true).movement, Vec2::ZERO);
    }
}
