//! Asteroid Navigator headless runner
//!
//! Plays one autopiloted session against a logging presenter and prints
//! the final report as JSON.
//!
//! Usage: `asteroid-navigator [seed] [tuning.json]`

use asteroid_navigator::consts::SIM_DT;
use asteroid_navigator::error::PresentError;
use asteroid_navigator::sim::{EventBatch, GameLoop, GamePhase, Presenter, RenderEvent, Rules, TickInput};
use asteroid_navigator::tuning::Tuning;

/// Session length in seconds
const SESSION_SECS: f32 = 60.0;
/// Simulated display refresh
const FRAME_DT: f32 = 1.0 / 60.0;

/// Stands in for the renderer and mixer: counts what it is handed
#[derive(Default)]
struct LogPresenter {
    draws: usize,
    removals: usize,
    cues: usize,
}

impl Presenter for LogPresenter {
    fn present(&mut self, batch: &EventBatch) -> Result<(), PresentError> {
        for event in &batch.render {
            match event {
                RenderEvent::Draw { .. } => self.draws += 1,
                RenderEvent::Remove { entity_id, reason } => {
                    self.removals += 1;
                    log::debug!("tick {}: entity {entity_id} removed ({reason:?})", batch.tick);
                }
                _ => {}
            }
        }
        for audio in &batch.audio {
            self.cues += 1;
            log::debug!("tick {}: play {:?} after {:.2}s", batch.tick, audio.cue, audio.delay);
        }
        Ok(())
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let seed = match args.next().map(|s| s.parse::<u64>()) {
        None => 42,
        Some(Ok(seed)) => seed,
        Some(Err(e)) => {
            log::error!("Seed must be an unsigned integer: {e}");
            std::process::exit(2);
        }
    };

    let tuning = match args.next() {
        Some(path) => match Tuning::load(&path) {
            Ok(tuning) => tuning,
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        },
        None => Tuning::default(),
    };

    let rules = match Rules::new(tuning) {
        Ok(rules) => rules,
        Err(e) => {
            log::error!("Invalid tuning: {e}");
            std::process::exit(1);
        }
    };

    log::info!("Asteroid Navigator (headless) starting, seed {seed}");
    let mut game = GameLoop::new(rules, seed);
    let mut presenter = LogPresenter::default();
    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };

    let frames = (SESSION_SECS / FRAME_DT).round() as usize;
    let mut ticks = 0;
    for _ in 0..frames {
        ticks += game.run_frame(FRAME_DT, &input, &mut presenter);
        if game.state().phase == GamePhase::GameOver {
            break;
        }
    }

    let state = game.state();
    log::info!(
        "{ticks} ticks ({:.1}s simulated), {} draws, {} removals, {} cues",
        ticks as f32 * SIM_DT,
        presenter.draws,
        presenter.removals,
        presenter.cues
    );

    let summary = serde_json::json!({
        "seed": state.seed,
        "score": state.score,
        "health": state.ship.health,
        "tier": state.difficulty.current.tier,
        "survived_secs": state.difficulty.elapsed,
        "game_over": state.game_over,
    });
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Failed to encode summary: {e}"),
    }
}
