//! Entity blueprints
//!
//! A blueprint is the full component bag for one entity. Capabilities are
//! optional fields; `World::spawn` attaches exactly the ones that are set.

use glam::Vec3;

use super::components::{
    aim_rotation, AttackProperties, ChaseTarget, Collider, ContactKind, DamageOnContact,
    EntityKind, ForwardMotion, Owner, ProjectileSpec, SprintState, TargetSeeker,
    TeamAffiliation, Transform,
};
use super::physics::layers;
use crate::config::{AttackConfig, EnemyConfig, SimConfig};

#[derive(Debug, Clone)]
pub struct Blueprint {
    pub kind: EntityKind,
    pub transform: Transform,
    pub team: TeamAffiliation,
    /// Attach a velocity integrated by the movement stage
    pub velocity: bool,
    pub collider: Option<Collider>,
    /// Maximum hit points; also attaches the damage mailbox and history
    pub hit_points: Option<i32>,
    pub damage_on_contact: Option<DamageOnContact>,
    pub seeker: Option<TargetSeeker>,
    pub attack: Option<AttackProperties>,
    pub chase: Option<ChaseTarget>,
    pub forward_motion: Option<ForwardMotion>,
    pub sprint: Option<SprintState>,
    pub owner: Option<Owner>,
    /// Destroy this many ticks after spawning
    pub lifetime_ticks: Option<u32>,
}

impl Blueprint {
    pub fn new(kind: EntityKind, transform: Transform, team: TeamAffiliation) -> Self {
        Self {
            kind,
            transform,
            team,
            velocity: false,
            collider: None,
            hit_points: None,
            damage_on_contact: None,
            seeker: None,
            attack: None,
            chase: None,
            forward_motion: None,
            sprint: None,
            owner: None,
            lifetime_ticks: None,
        }
    }

    /// Player avatar bound to a connection
    pub fn player(config: &SimConfig, position: Vec3, owner: Owner) -> Self {
        let p = &config.player;
        let mut bp = Self::new(
            EntityKind::Player,
            Transform::from_position(position),
            TeamAffiliation::Player,
        );
        bp.velocity = true;
        bp.collider = Some(Collider {
            radius: p.collider_radius,
            belongs_to: layers::PLAYER,
            collides_with: layers::ENEMY | layers::PROJECTILE,
            is_trigger: false,
        });
        bp.hit_points = Some(p.max_hit_points);
        bp.sprint = Some(SprintState::new(
            p.walk_speed,
            p.sprint_speed,
            p.sprint_duration,
            p.sprint_cooldown,
        ));
        bp.owner = Some(owner);
        bp
    }

    /// Ranged enemy: aims at players and structures and fires projectiles
    pub fn rogue(config: &SimConfig, position: Vec3) -> Self {
        let mut bp = Self::enemy(EntityKind::Rogue, &config.rogue, position);
        bp.seeker = Some(TargetSeeker {
            radius: config.rogue.target_radius,
            mask: layers::PLAYER | layers::STRUCTURE,
        });
        bp.attack = Some(attack_properties(&config.rogue_attack));
        bp
    }

    /// Melee enemy: chases players and hurts them on collision
    pub fn slime(config: &SimConfig, position: Vec3) -> Self {
        let mut bp = Self::enemy(EntityKind::Slime, &config.slime, position);
        bp.seeker = Some(TargetSeeker {
            radius: config.slime.target_radius,
            mask: layers::PLAYER,
        });
        bp
    }

    fn enemy(kind: EntityKind, track: &EnemyConfig, position: Vec3) -> Self {
        let mut bp = Self::new(kind, Transform::from_position(position), TeamAffiliation::Enemy);
        bp.velocity = true;
        bp.collider = Some(Collider {
            radius: track.collider_radius,
            belongs_to: layers::ENEMY,
            collides_with: layers::PLAYER | layers::PROJECTILE,
            is_trigger: false,
        });
        bp.hit_points = Some(track.max_hit_points);
        if track.move_speed > 0.0 {
            bp.chase = Some(ChaseTarget {
                speed: track.move_speed,
            });
        }
        if track.contact_damage > 0 {
            bp.damage_on_contact = Some(DamageOnContact::new(
                track.contact_damage,
                ContactKind::Collision,
            ));
        }
        bp
    }

    /// Single-use projectile flying along `direction`
    pub fn projectile(
        spec: &ProjectileSpec,
        team: TeamAffiliation,
        position: Vec3,
        direction: Vec3,
        tick_rate: u32,
    ) -> Self {
        let transform = Transform::from_position_rotation(position, aim_rotation(direction));
        let mut bp = Self::new(EntityKind::Projectile, transform, team);
        bp.velocity = true;
        bp.collider = Some(Collider {
            radius: spec.radius,
            belongs_to: layers::PROJECTILE,
            collides_with: layers::PLAYER | layers::ENEMY | layers::STRUCTURE,
            is_trigger: true,
        });
        bp.damage_on_contact = Some(DamageOnContact::new(spec.damage, ContactKind::Trigger));
        bp.forward_motion = Some(ForwardMotion { speed: spec.speed });
        bp.lifetime_ticks = Some((spec.lifetime_seconds.max(0.0) * tick_rate as f32) as u32);
        bp
    }
}

fn attack_properties(attack: &AttackConfig) -> AttackProperties {
    AttackProperties {
        fire_point_offset: attack.fire_point_offset,
        cooldown_ticks: attack.cooldown_ticks,
        projectile: ProjectileSpec {
            damage: attack.projectile_damage,
            speed: attack.projectile_speed,
            lifetime_seconds: attack.projectile_lifetime_seconds,
            radius: attack.projectile_radius,
        },
    }
}
