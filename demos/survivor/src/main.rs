mod game;

use std::path::Path;

use anyhow::{Context, Result};
use behave2d::{Key, RapierHost, RecordingCanvas, Session, SessionConfig};

const FRAMES: u64 = 60 * 30;

/// Scripted keyboard: walk a square and call in a bat swarm halfway.
fn script(session: &mut Session, frame: u64) {
    const WALK: [Key; 4] = [Key::Right, Key::Down, Key::Left, Key::Up];
    let input = session.input_mut();

    if frame % 90 == 0 {
        let leg = (frame / 90) as usize;
        input.release(WALK[(leg + WALK.len() - 1) % WALK.len()]);
        input.press(WALK[leg % WALK.len()]);
    }
    if frame == FRAMES / 2 {
        input.press(Key::Escape);
    } else if frame == FRAMES / 2 + 1 {
        input.release(Key::Escape);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::load_from_file(Path::new(&path))
            .with_context(|| format!("loading session config from {path}"))?,
        None => SessionConfig::default().with_draw_order(["magnet", "exp", "enemy", "bullet"]),
    };
    fastrand::seed(42);

    let host = RapierHost::from_config(&config);
    let mut session = Session::new(config, Box::new(host));
    game::setup(&mut session)?;

    let mut canvas = RecordingCanvas::new();
    for frame in 0..FRAMES {
        script(&mut session, frame);
        session.step();

        canvas.clear();
        session.draw(&mut canvas);
        game::draw_hud(&session, &mut canvas);

        if frame % 300 == 0 {
            log::info!(
                "frame {frame}: {} enemies, {} orbs, exp {}, life {}",
                session.count("enemy"),
                session.count("exp"),
                game::exp(&session),
                game::life(&session)
            );
        }
    }

    log::info!(
        "finished after {:?}: exp {}, life {}",
        session.now(),
        game::exp(&session),
        game::life(&session)
    );
    session.shutdown();
    Ok(())
}
