use std::f32::consts::TAU;
use std::time::Duration;

use anyhow::Result;
use behave2d::{
    AttrValue, Canvas, CategoryBehavior, ContactHandlers, Easing, Entity, EntityId, Key, Session, Spawn,
    SpawnRule, TimerKey, Vec2,
};

pub const WIDTH: f32 = 320.0;
pub const HEIGHT: f32 = 240.0;

const PLAYER_LIFE: i32 = 3;
const PLAYER_SPEED: f32 = 20.0;
const MAGNET_RADIUS: f32 = 50.0;
const BULLET_SPEED: f32 = 100.0;
const KNOCKBACK: f32 = 200.0;
const EXP_PULL: f32 = 200.0;
const EXP_PER_KILL: usize = 5;
const BATS_EVERY: i64 = 100;

const SOUND_PICKUP: usize = 0;
const SOUND_SHOT: usize = 1;
const SOUND_HURT: usize = 2;
const SOUND_KILL: usize = 3;

const EXP: &str = "exp";

fn random_dir() -> Vec2 {
    Vec2::from_angle(fastrand::f32() * TAU)
}

fn rand_range(lo: f32, hi: f32) -> f32 {
    lo + fastrand::f32() * (hi - lo)
}

/// The player, if it is still around.
pub fn player(s: &Session) -> Option<EntityId> {
    s.each("player").next(s.world())
}

fn player_position(s: &Session) -> Option<Vec2> {
    player(s).and_then(|id| s.position(id))
}

pub fn setup(session: &mut Session) -> Result<EntityId> {
    session.register_behavior(
        "player",
        CategoryBehavior::new().update(update_player).draw(draw_player),
    )?;
    session.register_behavior(
        "magnet",
        CategoryBehavior::new().update(follow_player).draw(draw_magnet),
    )?;
    session.register_behavior("enemy", CategoryBehavior::new().update(chase))?;
    session.register_behavior("exp", CategoryBehavior::new().update(scatter))?;

    session.on_contact(
        "enemy",
        "player",
        ContactHandlers::new().begin(|s, c| {
            let (Some(enemy), Some(player)) = (s.position(c.this), s.position(c.other)) else {
                return;
            };
            s.damage(c.other, 1);
            s.set_velocity(c.other, (player - enemy).normalize_or_zero() * KNOCKBACK);
            s.play_sound(SOUND_HURT, 1.0);
        }),
    );
    session.on_contact(
        "bullet",
        "enemy",
        ContactHandlers::new().begin(|s, c| {
            s.despawn(c.this);
            s.despawn(c.other);
            s.play_sound(SOUND_KILL, 0.2);
        }),
    );
    session.on_contact(
        "exp",
        "magnet",
        ContactHandlers::new().begin(|s, c| {
            let orb = c.this;
            s.every_for(
                orb,
                Duration::from_millis(100),
                move |s| {
                    let (Some(target), Some(pos)) = (player_position(s), s.position(orb)) else {
                        return;
                    };
                    s.set_velocity(orb, (target - pos).normalize_or_zero() * EXP_PULL);
                },
                Some(TimerKey::Entity(orb)),
                true,
            );
        }),
    );
    session.on_contact(
        "exp",
        "player",
        ContactHandlers::new().begin(|s, c| {
            s.despawn(c.this);
            s.play_sound(SOUND_PICKUP, 1.0);
            let total = s.counters_mut().add(EXP, 1);
            if total % BATS_EVERY == 0 {
                spawn_bats(s);
            }
        }),
    );

    // Every kill scatters a handful of experience orbs.
    session.on_despawn(
        "enemy",
        SpawnRule::new(EXP_PER_KILL, |remains, _| {
            Spawn::new("exp")
                .at(remains.position)
                .size(4.0, 4.0)
                .attr("scatter", random_dir() * rand_range(5.0, 20.0))
        }),
    )?;

    let player = session.spawn(
        Spawn::new("player")
            .at(Vec2::new(WIDTH / 2.0, HEIGHT / 2.0))
            .size(8.0, 8.0)
            .dynamic()
            .life(PLAYER_LIFE),
    )?;
    session.spawn(
        Spawn::new("magnet")
            .at(Vec2::new(WIDTH / 2.0, HEIGHT / 2.0))
            .circle(MAGNET_RADIUS)
            .sensor(true),
    )?;

    session.every(Duration::from_secs(1), shoot, Some("shoot".into()), false);
    spawn_enemy(session);
    Ok(player)
}

fn spawn_enemy(s: &mut Session) {
    if let Some(pos) = new_enemy_pos(s) {
        new_enemy(s, pos, 10.0, None);
    }
    let next = Duration::from_secs_f32(rand_range(0.1, 1.0));
    s.after(next, spawn_enemy, Some("spawn_enemy".into()));
}

/// A swarm that flies straight through the player's position and beyond.
pub fn spawn_bats(s: &mut Session) {
    let (Some(pos), Some(center)) = (new_enemy_pos(s), player_position(s)) else {
        return;
    };
    let target = center + (center - pos) * 10.0;
    for _ in 0..30 {
        let jitter = Vec2::new(fastrand::f32(), fastrand::f32());
        new_enemy(s, pos + jitter, 100.0, Some(target));
    }
    log::info!("bats released towards {target}");
}

fn new_enemy_pos(s: &Session) -> Option<Vec2> {
    let center = player_position(s)?;
    Some(center + random_dir() * Vec2::new(WIDTH / 2.0, HEIGHT / 2.0).length())
}

fn new_enemy(s: &mut Session, pos: Vec2, speed: f32, target: Option<Vec2>) {
    let mut spawn = Spawn::new("enemy")
        .at(pos)
        .size(8.0, 8.0)
        .dynamic()
        .attr("speed", speed);
    if let Some(target) = target {
        spawn = spawn.attr("target", target).ttl(Duration::from_secs(15));
    }
    if let Err(err) = s.spawn(spawn) {
        log::warn!("enemy spawn failed: {err}");
    }
}

fn shoot(s: &mut Session) {
    let Some(origin) = player_position(s) else {
        return;
    };
    let Some(target) = s.nearest("enemy", origin).and_then(|id| s.position(id)) else {
        return;
    };

    let spawned = s.spawn(
        Spawn::new("bullet")
            .at(origin)
            .size(4.0, 4.0)
            .velocity((target - origin).normalize_or_zero() * BULLET_SPEED)
            .dynamic()
            .sensor(true)
            .ttl(Duration::from_secs(5)),
    );
    match spawned {
        Ok(_) => s.play_sound(SOUND_SHOT, 1.0),
        Err(err) => log::warn!("bullet spawn failed: {err}"),
    }
}

fn update_player(s: &mut Session, id: EntityId, _dt: f32) {
    let Some(velocity) = s.get(id).map(Entity::velocity) else {
        return;
    };
    let steer = s.input().arrows() * PLAYER_SPEED;
    s.set_velocity(id, (velocity + steer) * 0.8);

    if s.input().is_key_pressed(Key::Escape) {
        spawn_bats(s);
    }
}

fn follow_player(s: &mut Session, id: EntityId, _dt: f32) {
    if let Some(center) = player_position(s) {
        s.set_position(id, center);
    }
}

fn chase(s: &mut Session, id: EntityId, _dt: f32) {
    let Some(enemy) = s.get(id) else {
        return;
    };
    let pos = enemy.position();
    let speed = enemy.attrs.float("speed").unwrap_or(10.0);
    let target = enemy.attrs.vec2("target").or_else(|| player_position(s));
    if let Some(target) = target {
        s.set_velocity(id, (target - pos).normalize_or_zero() * speed);
    }
}

/// Fresh orbs fly a short way out from where the enemy died.
fn scatter(s: &mut Session, id: EntityId, _dt: f32) {
    let Some(offset) = s.get_mut(id).and_then(|e| e.attrs.remove("scatter")) else {
        return;
    };
    if let (AttrValue::Vec2(offset), Some(pos)) = (offset, s.position(id)) {
        s.animate_position(id, pos + offset, Duration::from_millis(500), Easing::QuintOut);
    }
}

fn draw_player(_: &Session, player: &Entity, canvas: &mut dyn Canvas) {
    let size = player.body().size();
    let top_left = player.position() - size * 0.5;
    canvas.rect(top_left, size, [1.0, 1.0, 1.0, 1.0]);

    let fraction = player.life.map_or(0.0, |l| l.fraction());
    let bar = top_left - Vec2::new(0.0, 2.0);
    canvas.rect(bar, Vec2::new(size.x, 1.0), [1.0, 0.0, 0.0, 1.0]);
    canvas.rect(bar, Vec2::new(size.x * fraction, 1.0), [0.0, 1.0, 0.0, 1.0]);
}

fn draw_magnet(_: &Session, magnet: &Entity, canvas: &mut dyn Canvas) {
    canvas.circle(magnet.position(), MAGNET_RADIUS, [1.0, 1.0, 1.0, 0.125]);
}

pub fn exp(s: &Session) -> i64 {
    s.counters().get(EXP)
}

pub fn life(s: &Session) -> i32 {
    player(s)
        .and_then(|id| s.get(id))
        .and_then(|p| p.life)
        .map_or(0, |l| l.current())
}

pub fn draw_hud(s: &Session, canvas: &mut dyn Canvas) {
    canvas.text(&format!("EXP: {}", exp(s)), Vec2::new(10.0, 20.0), 8.0, [1.0, 1.0, 1.0, 1.0]);
    if life(s) == 0 {
        canvas.text("GAME OVER!", Vec2::new(WIDTH / 2.0, HEIGHT / 2.0), 30.0, [1.0, 0.4, 0.4, 1.0]);
    }
}
