mod game;

use std::path::Path;

use anyhow::{Context, Result};
use behave2d::{Key, RapierHost, RecordingCanvas, Session, SessionConfig};

const FRAMES: u64 = 60 * 20;

/// Scripted keyboard: weave left and right while holding fire for a while.
fn script(session: &mut Session, frame: u64) {
    let input = session.input_mut();
    match frame {
        30 => input.press(Key::Space),
        600 => input.release(Key::Space),
        _ => {}
    }
    if frame % 120 == 0 {
        input.release(Key::Right);
        input.press(Key::Left);
    } else if frame % 120 == 60 {
        input.release(Key::Left);
        input.press(Key::Right);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::load_from_file(Path::new(&path))
            .with_context(|| format!("loading session config from {path}"))?,
        None => SessionConfig::default(),
    };
    fastrand::seed(7);

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
                "frame {frame}: {} entities, score {}",
                session.world().len(),
                game::score(&session)
            );
        }
    }

    log::info!(
        "finished after {:?}: score {}, game over: {}",
        session.now(),
        game::score(&session),
        game::is_game_over(&session)
    );
    session.shutdown();
    Ok(())
}
