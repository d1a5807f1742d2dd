//! Collision pass.
//!
//! Broad phase indexes every collider's x extent in an interval tree and
//! keeps the pairs whose boxes also overlap vertically. Pairs are resolved
//! one at a time afterwards, so each resolution sees the effects of the
//! ones before it (a shot that already hit something is spent).

use crate::entity::{CollisionClass, Entity, EntityKind, Side, TickContext};
use crate::leaderboard::Stat;
use crate::spatial::IntervalTree;
use shared::Registry;

#[derive(Debug, Clone, Copy)]
struct Body {
    id: u32,
    x: f32,
    y: f32,
    half_width: f32,
    half_height: f32,
    class: CollisionClass,
    is_player: bool,
    projectile: bool,
    /// Player credited for damage this body deals.
    credit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Interaction {
    PushOut { player: u32, dx: f32, dy: f32 },
    Pickup { drop: u32, player: u32 },
    Hit { a: usize, b: usize },
}

fn bodies(entities: &Registry<Entity>) -> Vec<Body> {
    entities
        .iter()
        .filter(|entity| !entity.core.mark_to_destroy)
        .filter_map(|entity| {
            let collider = entity.collider()?;
            let credit = match &entity.kind {
                EntityKind::Player(_) => Some(entity.id()),
                EntityKind::PlayerWeapon(shot) => Some(shot.owner_id),
                _ => None,
            };
            Some(Body {
                id: entity.id(),
                x: entity.core.x,
                y: entity.core.y,
                half_width: collider.width / 2.0,
                half_height: collider.height / 2.0,
                class: collider.class,
                is_player: entity.is_player(),
                projectile: matches!(
                    entity.kind,
                    EntityKind::PlayerWeapon(_) | EntityKind::EnemyShot(_)
                ),
                credit,
            })
        })
        .collect()
}

/// Every overlapping pair, each once, lower index first.
fn overlapping_pairs(bodies: &[Body]) -> Vec<(usize, usize)> {
    let mut builder = IntervalTree::builder();
    for (index, body) in bodies.iter().enumerate() {
        builder.insert(body.x - body.half_width, body.x + body.half_width, index);
    }
    let tree = builder.build();

    let mut pairs = Vec::new();
    for (i, body) in bodies.iter().enumerate() {
        tree.visit(body.x - body.half_width, body.x + body.half_width, |&j| {
            if j <= i {
                return;
            }
            let other = &bodies[j];
            if (body.y - other.y).abs() <= body.half_height + other.half_height {
                pairs.push((i, j));
            }
        });
    }
    pairs.sort_unstable();
    pairs
}

fn classify(bodies: &[Body], i: usize, j: usize) -> Option<Interaction> {
    let (a, b) = (&bodies[i], &bodies[j]);
    match (a.class, b.class) {
        (CollisionClass::Solid, _) if b.is_player => Some(push_out(b, a)),
        (_, CollisionClass::Solid) if a.is_player => Some(push_out(a, b)),
        (CollisionClass::Pickup, _) if b.is_player => Some(Interaction::Pickup {
            drop: a.id,
            player: b.id,
        }),
        (_, CollisionClass::Pickup) if a.is_player => Some(Interaction::Pickup {
            drop: b.id,
            player: a.id,
        }),
        (
            CollisionClass::Weapon { side: side_a, .. },
            CollisionClass::Weapon { side: side_b, .. },
        ) if side_a != side_b && !(a.projectile && b.projectile) => {
            Some(Interaction::Hit { a: i, b: j })
        }
        _ => None,
    }
}

/// Moves the player out of the wall along the axis with the smaller overlap.
fn push_out(player: &Body, wall: &Body) -> Interaction {
    let overlap_x = player.half_width + wall.half_width - (player.x - wall.x).abs();
    let overlap_y = player.half_height + wall.half_height - (player.y - wall.y).abs();
    let (dx, dy) = if overlap_x < overlap_y {
        (overlap_x.copysign(player.x - wall.x), 0.0)
    } else {
        (0.0, overlap_y.copysign(player.y - wall.y))
    };
    Interaction::PushOut {
        player: player.id,
        dx,
        dy,
    }
}

fn is_live(entities: &Registry<Entity>, id: u32) -> bool {
    entities
        .lookup(id)
        .is_some_and(|entity| !entity.core.mark_to_destroy)
}

/// Applies `damage` to one entity. Returns true if it was killed by it.
fn hurt(entities: &mut Registry<Entity>, id: u32, damage: u8, ctx: &mut TickContext<'_>) -> bool {
    let shield_id = entities
        .lookup(id)
        .and_then(|entity| entity.as_player())
        .and_then(|player| player.shield_id);
    let remaining = match shield_id.and_then(|sid| entities.lookup_mut(sid)) {
        Some(Entity {
            kind: EntityKind::PlayerShield(shield),
            ..
        }) => shield.absorb(damage),
        _ => damage,
    };

    let Some(Entity { core, kind }) = entities.lookup_mut(id) else {
        return false;
    };
    match kind {
        EntityKind::Player(player) => {
            player.take_damage(core, damage, remaining, ctx);
            false
        }
        EntityKind::Meteor(meteor) => meteor.hurt(core, damage, ctx),
        EntityKind::SwoopingEnemy(enemy) => enemy.hurt(core, damage, ctx),
        EntityKind::EnemyShot(_) | EntityKind::PlayerWeapon(_) => {
            core.destroy();
            false
        }
        _ => false,
    }
}

fn damage_of(body: &Body) -> u8 {
    match body.class {
        CollisionClass::Weapon { damage, .. } => damage,
        _ => 0,
    }
}

fn resolve_hit(
    entities: &mut Registry<Entity>,
    a: &Body,
    b: &Body,
    ctx: &mut TickContext<'_>,
) {
    if !is_live(entities, a.id) || !is_live(entities, b.id) {
        return;
    }
    for (target, attacker) in [(a, b), (b, a)] {
        let damage = damage_of(attacker);
        let killed = hurt(entities, target.id, damage, ctx);
        let target_is_enemy = matches!(target.class, CollisionClass::Weapon { side: Side::Enemy, .. })
            && !target.projectile;
        if let (true, Some(player)) = (target_is_enemy, attacker.credit) {
            ctx.leaderboard.increase(player, Stat::DamageGiven, damage as u32);
            if killed {
                ctx.leaderboard.increase(player, Stat::EnemiesKilled, 1);
            }
        }
    }
}

fn resolve_pickup(entities: &mut Registry<Entity>, drop: u32, player: u32) {
    if !is_live(entities, drop) || !is_live(entities, player) {
        return;
    }
    let Some(kind) = entities.lookup_mut(drop).and_then(|entity| {
        let EntityKind::Drop(item) = &entity.kind else {
            return None;
        };
        let kind = item.kind;
        entity.core.destroy();
        Some(kind)
    }) else {
        return;
    };
    let upgrade = entities
        .lookup_mut(player)
        .and_then(|entity| entity.as_player_mut())
        .and_then(|(_, player)| player.add_drop(&kind));
    if let Some((shield_id, level)) = upgrade {
        if let Some(Entity {
            kind: EntityKind::PlayerShield(shield),
            ..
        }) = entities.lookup_mut(shield_id)
        {
            shield.upgrade(level);
        }
    }
}

/// Detects and resolves every collision among live entities.
pub fn run_collisions(entities: &mut Registry<Entity>, ctx: &mut TickContext<'_>) {
    let bodies = bodies(entities);
    let interactions: Vec<Interaction> = overlapping_pairs(&bodies)
        .into_iter()
        .filter_map(|(i, j)| classify(&bodies, i, j))
        .collect();

    for interaction in interactions {
        match interaction {
            Interaction::PushOut { player, dx, dy } => {
                if let Some((core, player)) = entities
                    .lookup_mut(player)
                    .and_then(|entity| entity.as_player_mut())
                {
                    player.push_out(core, dx, dy);
                }
            }
            Interaction::Pickup { drop, player } => resolve_pickup(entities, drop, player),
            Interaction::Hit { a, b } => resolve_hit(entities, &bodies[a], &bodies[b], ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_support::Harness;
    use crate::entity::{Drop, EnemyShot, Meteor, Player, PlayerShield, PlayerWeaponShot, Wall};
    use shared::models::{DropKind, MeteorColor, MeteorSize, PlayerColor, ShieldLevel, ShieldStrength};
    use shared::PlayerWeapon;

    fn player_with_shield(entities: &mut Registry<Entity>, id: u32, shield_id: u32, x: f32, y: f32) {
        let mut player = Player::new(PlayerColor::Blue);
        player.shield_id = Some(shield_id);
        entities.push(Entity::new(id, x, y, EntityKind::Player(player)));
        entities.push(Entity::new(
            shield_id,
            0.0,
            0.0,
            EntityKind::PlayerShield(PlayerShield::new(id)),
        ));
    }

    fn player(entities: &Registry<Entity>, id: u32) -> &Player {
        entities.lookup(id).and_then(|e| e.as_player()).unwrap()
    }

    #[test]
    fn test_shot_kills_meteor_and_credits_owner() {
        let mut harness = Harness::new();
        harness.leaderboard.add_player(1);
        let mut entities = Registry::new();
        player_with_shield(&mut entities, 1, 2, 0.0, 700.0);
        entities.push(Entity::new(
            3,
            500.0,
            300.0,
            EntityKind::Meteor(Meteor::new(MeteorColor::Grey, MeteorSize::Tiny, 0)),
        ));
        entities.push(Entity::new(
            4,
            505.0,
            310.0,
            EntityKind::PlayerWeapon(PlayerWeaponShot::new(1, PlayerWeapon::Laser1, 700.0)),
        ));

        let mut ctx = harness.ctx();
        run_collisions(&mut entities, &mut ctx);
        ctx.apply(&mut entities);

        assert!(entities.lookup(3).unwrap().core.mark_to_destroy);
        assert!(entities.lookup(4).unwrap().core.mark_to_destroy);
        let entry = harness.leaderboard.entry(1).unwrap();
        assert_eq!(entry.damage_given, 1);
        assert_eq!(entry.enemies_killed, 1);
    }

    #[test]
    fn test_shield_absorbs_before_health() {
        let mut harness = Harness::new();
        harness.leaderboard.add_player(1);
        let mut entities = Registry::new();
        player_with_shield(&mut entities, 1, 2, 0.0, 500.0);
        for (id, y) in [(10, 490.0), (11, 495.0), (12, 500.0), (13, 505.0), (14, 510.0), (15, 515.0)] {
            entities.push(Entity::new(id, 0.0, y, EntityKind::EnemyShot(EnemyShot)));
        }

        let mut ctx = harness.ctx();
        run_collisions(&mut entities, &mut ctx);
        ctx.apply(&mut entities);

        // six shots of 2: the small shield soaks 10, the player takes 2
        assert_eq!(player(&entities, 1).health, 23);
        let Some(Entity {
            kind: EntityKind::PlayerShield(shield),
            ..
        }) = entities.lookup(2)
        else {
            panic!("shield missing");
        };
        assert!(shield.depleted);
        assert_eq!(harness.leaderboard.entry(1).unwrap().damage_taken, 12);
    }

    #[test]
    fn test_pickup_applies_once() {
        let mut harness = Harness::new();
        let mut entities = Registry::new();
        player_with_shield(&mut entities, 1, 2, 0.0, 500.0);
        player_with_shield(&mut entities, 3, 4, 10.0, 500.0);
        entities.push(Entity::new(
            5,
            5.0,
            500.0,
            EntityKind::Drop(Drop::new(DropKind::Shield {
                level: ShieldLevel::Big,
            })),
        ));

        let mut ctx = harness.ctx();
        run_collisions(&mut entities, &mut ctx);
        ctx.apply(&mut entities);

        assert!(entities.lookup(5).unwrap().core.mark_to_destroy);
        let strengths: Vec<ShieldStrength> = [2, 4]
            .iter()
            .filter_map(|id| match entities.lookup(*id).map(|e| &e.kind) {
                Some(EntityKind::PlayerShield(shield)) => Some(shield.strength),
                _ => None,
            })
            .collect();
        assert_eq!(strengths, vec![ShieldStrength::Big, ShieldStrength::Small]);
    }

    #[test]
    fn test_wall_pushes_player_out() {
        let mut harness = Harness::new();
        let mut entities = Registry::new();
        player_with_shield(&mut entities, 1, 2, 0.0, 500.0);
        entities.push(Entity::new(
            3,
            80.0,
            500.0,
            EntityKind::Wall(Wall {
                width: 100,
                height: 400,
            }),
        ));

        let mut ctx = harness.ctx();
        run_collisions(&mut entities, &mut ctx);

        let core = &entities.lookup(1).unwrap().core;
        assert_eq!(core.x, -19.5);
        assert_eq!(core.y, 500.0);
    }

    #[test]
    fn test_same_side_and_projectile_pairs_ignored() {
        let mut harness = Harness::new();
        let mut entities = Registry::new();
        player_with_shield(&mut entities, 1, 2, 0.0, 500.0);
        player_with_shield(&mut entities, 3, 4, 0.0, 500.0);
        entities.push(Entity::new(5, 0.0, 500.0, EntityKind::EnemyShot(EnemyShot)));
        entities.push(Entity::new(
            6,
            0.0,
            500.0,
            EntityKind::PlayerWeapon(PlayerWeaponShot::new(1, PlayerWeapon::Rocket, 500.0)),
        ));

        let mut ctx = harness.ctx();
        run_collisions(&mut entities, &mut ctx);

        // the enemy shot is spent on the first player only
        assert!(entities.lookup(5).unwrap().core.mark_to_destroy);
        assert!(!entities.lookup(6).unwrap().core.mark_to_destroy);
        let shield_health = |id| match entities.lookup(id).map(|e| &e.kind) {
            Some(EntityKind::PlayerShield(shield)) => shield.health,
            _ => 0,
        };
        assert_eq!(shield_health(2) + shield_health(4), 18);
    }
}
