use std::time::Duration;

use anyhow::Result;
use behave2d::{
    Canvas, CategoryBehavior, ContactHandlers, Entity, EntityId, Key, Session, Spawn, TimerKey,
    Vec2,
};

pub const WIDTH: f32 = 160.0;
pub const HEIGHT: f32 = 120.0;

const PLAYER_SPEED: f32 = 20.0;
const BULLET_SPEED: f32 = 200.0;

const SOUND_SHOT: usize = 0;
const SOUND_HIT: usize = 1;

const SCORE: &str = "score";
const GAME_OVER: &str = "gameover";

/// Register behaviors and contact rules, spawn the player and start the
/// enemy spawner.
pub fn setup(session: &mut Session) -> Result<EntityId> {
    session.register_behavior("player", CategoryBehavior::new().update(update_player))?;
    session.register_behavior("bullet", CategoryBehavior::new().draw(draw_bullet))?;

    session.on_contact(
        "bullet",
        "enemy",
        ContactHandlers::new().begin(|s, contact| {
            s.despawn(contact.this);
            s.despawn(contact.other);
            s.counters_mut().add(SCORE, 10);
            s.play_sound(SOUND_HIT, 0.3);
        }),
    );
    session.on_contact(
        "enemy",
        "player",
        ContactHandlers::new().begin(|s, _| {
            if s.counters_mut().set(GAME_OVER, 1) == 0 {
                log::info!("game over at {:?}", s.now());
            }
            s.play_sound(SOUND_HIT, 0.5);
        }),
    );

    let player = session.spawn(
        Spawn::new("player")
            .at(Vec2::new(WIDTH / 2.0, HEIGHT - 16.0))
            .size(8.0, 8.0)
            .dynamic(),
    )?;

    spawn_enemy(session);
    Ok(player)
}

fn spawn_enemy(s: &mut Session) {
    let speed = fastrand::f32() * 10.0 + 20.0;
    let dir = if fastrand::bool() { -1.0 } else { 1.0 };
    let enemy = s.spawn(
        Spawn::new("enemy")
            .at(Vec2::new(fastrand::f32() * WIDTH, -10.0))
            .size(8.0, 8.0)
            .velocity(Vec2::new(dir, 1.0) * speed)
            .dynamic()
            .ttl(Duration::from_secs(10)),
    );

    match enemy {
        Ok(enemy) => {
            let flip = Duration::from_secs_f32(0.1 + fastrand::f32() * 0.2);
            s.every_for(
                enemy,
                flip,
                move |s| {
                    if let Some(v) = s.get(enemy).map(|e| e.velocity()) {
                        s.set_velocity(enemy, Vec2::new(-v.x, v.y));
                    }
                },
                Some(TimerKey::Scoped(enemy, "zigzag".into())),
                false,
            );
        }
        Err(err) => log::warn!("enemy spawn failed: {err}"),
    }

    let next = Duration::from_secs_f32(0.2 + fastrand::f32() * 0.8);
    s.after(next, spawn_enemy, Some("spawn_enemy".into()));
}

fn update_player(s: &mut Session, id: EntityId, _dt: f32) {
    let Some(velocity) = s.get(id).map(|e| e.velocity()) else {
        return;
    };
    let input = s.input();
    let steer = input.arrows() * PLAYER_SPEED;
    let start_shooting = input.is_key_pressed(Key::Space);
    let stop_shooting = input.is_key_released(Key::Space);

    s.set_velocity(id, (velocity + steer) * 0.8);

    if start_shooting {
        s.every(
            Duration::from_millis(100),
            move |s| {
                if let Some(origin) = s.position(id) {
                    add_bullet(s, origin);
                }
            },
            Some("shoot".into()),
            true,
        );
    }
    if stop_shooting {
        s.cancel("shoot");
    }
}

fn add_bullet(s: &mut Session, origin: Vec2) {
    let bullet = match s.spawn(
        Spawn::new("bullet")
            .at(origin)
            .size(3.0, 4.0)
            .velocity(Vec2::new(0.0, -BULLET_SPEED))
            .dynamic()
            .sensor(true),
    ) {
        Ok(id) => id,
        Err(err) => {
            log::warn!("bullet spawn failed: {err}");
            return;
        }
    };

    // Bullets that left the screen are swept once a second.
    s.every_for(
        bullet,
        Duration::from_secs(1),
        move |s| {
            if s.position(bullet).is_some_and(|p| p.y < -10.0) {
                s.despawn(bullet);
            }
        },
        Some(TimerKey::Entity(bullet)),
        false,
    );
    s.play_sound(SOUND_SHOT, 0.5);
}

fn draw_bullet(_: &Session, bullet: &Entity, canvas: &mut dyn Canvas) {
    let size = bullet.body().size();
    canvas.rect(bullet.position() - size * 0.5, size, [1.0, 1.0, 0.3, 1.0]);
}

pub fn draw_hud(s: &Session, canvas: &mut dyn Canvas) {
    canvas.text(
        &format!("SCORE: {}", s.counters().get(SCORE)),
        Vec2::new(4.0, 16.0),
        8.0,
        [1.0, 1.0, 1.0, 1.0],
    );
    if is_game_over(s) {
        canvas.text("GAME OVER!", Vec2::new(WIDTH / 2.0, HEIGHT / 2.0), 20.0, [1.0, 0.4, 0.4, 1.0]);
    }
}

pub fn score(s: &Session) -> i64 {
    s.counters().get(SCORE)
}

pub fn is_game_over(s: &Session) -> bool {
    s.counters().get(GAME_OVER) > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use behave2d::{NullHost, RigidBodyType, SessionConfig};

    #[test]
    fn bullets_are_dynamic_sensors_swept_by_their_own_timer() {
        let mut s = Session::new(SessionConfig::default(), Box::new(NullHost::new()));
        add_bullet(&mut s, Vec2::new(10.0, 20.0));

        let bullet = s.each("bullet").next(s.world()).unwrap();
        let body = s.get(bullet).unwrap().body();
        assert_eq!(body.body_type, RigidBodyType::Dynamic);
        assert!(body.sensor);
        assert!(s.has_timer(&TimerKey::Entity(bullet)));
    }
}
