//! Bricker entry point
//!
//! Runs a headless game in idle mode: the paddle follows the ball on its own
//! until every brick is gone or the last life is lost.
//!
//! Usage: `bricker [settings.json]`

use bricker::Settings;
use bricker::platform::AssetTable;
use bricker::sim::{GameEvent, GamePhase, GameState, TickInput, tick};

/// Ten simulated minutes at the default frame rate
const MAX_FRAMES: u64 = 80 * 60 * 10;

fn main() {
    env_logger::init();
    log::info!("Bricker (headless) starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };

    let mut assets = AssetTable::new();
    let mut state = GameState::new(&settings, &mut assets);
    log::info!(
        "Game initialized with seed: {} ({} images, {} sounds)",
        state.seed,
        assets.image_count(),
        assets.sound_count()
    );

    let input = TickInput {
        idle_mode: true,
        ..Default::default()
    };
    let dt = settings.frame_dt();

    while state.phase == GamePhase::Playing && state.frame < MAX_FRAMES {
        tick(&mut state, &input, dt);
        for event in state.drain_events() {
            match event {
                GameEvent::PlaySound(handle) => {
                    log::trace!("Play {}", assets.sound_path(handle).unwrap_or("<unknown>"));
                }
                GameEvent::LifeLost { lives_left } => {
                    log::info!("Frame {}: life lost, {lives_left} left", state.frame);
                }
                other => log::debug!("Frame {}: {other:?}", state.frame),
            }
        }
    }

    match state.phase {
        GamePhase::Won => println!("You win! Cleared the board in {} frames.", state.frame),
        GamePhase::Lost => println!(
            "You lose! {} bricks left after {} frames.",
            state.ctx.bricks_left, state.frame
        ),
        GamePhase::Playing => println!(
            "Stopped after {} frames with {} bricks and {} lives left.",
            state.frame, state.ctx.bricks_left, state.ctx.lives
        ),
    }
}
