//! Host-facing driver
//!
//! Turns variable frame deltas into fixed ticks and hands each tick's
//! batch to the presentation side.

use super::events::EventBatch;
use super::rules::Rules;
use super::state::{GamePhase, GameState};
use super::tick::{TickInput, tick};
use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use crate::error::PresentError;

/// Rendering/audio collaborator. Failures are logged, never fatal.
pub trait Presenter {
    fn present(&mut self, batch: &EventBatch) -> Result<(), PresentError>;
}

pub struct GameLoop {
    rules: Rules,
    state: GameState,
    accumulator: f32,
    /// One-shot signals waiting for the next tick to run
    pending_pause: bool,
    pending_select: bool,
}

impl GameLoop {
    pub fn new(rules: Rules, seed: u64) -> Self {
        let state = GameState::new(seed, &rules);
        log::info!("New run, seed {seed}");
        Self {
            rules,
            state,
            accumulator: 0.0,
            pending_pause: false,
            pending_select: false,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Start a new run on the next seed
    pub fn restart(&mut self) {
        self.restart_with_seed(self.state.seed.wrapping_add(1));
    }

    /// Discard the whole run and start over. The state is swapped in a
    /// single assignment between ticks.
    pub fn restart_with_seed(&mut self, seed: u64) {
        self.state = GameState::new(seed, &self.rules);
        self.accumulator = 0.0;
        self.pending_pause = false;
        self.pending_select = false;
        log::info!("Restarted, seed {seed}");
    }

    /// Run as many fixed ticks as `frame_dt` pays for
    pub fn update(&mut self, frame_dt: f32, input: &TickInput) -> Vec<EventBatch> {
        self.pending_pause |= input.pause;
        self.pending_select |= input.select;

        if self.pending_select && self.state.phase == GamePhase::GameOver {
            self.restart();
        }

        // A bad clock reading must not poison the accumulator
        let dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };
        self.accumulator += dt;

        let mut batches = Vec::new();
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = TickInput {
                pause: self.pending_pause,
                select: self.pending_select,
                ..input.clone()
            };
            batches.push(tick(&mut self.state, &self.rules, &input, SIM_DT));
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            self.pending_pause = false;
            self.pending_select = false;
        }

        batches
    }

    /// [`update`](Self::update), then present every batch in tick order.
    /// Returns the number of ticks run.
    pub fn run_frame<P: Presenter + ?Sized>(
        &mut self,
        frame_dt: f32,
        input: &TickInput,
        presenter: &mut P,
    ) -> usize {
        let batches = self.update(frame_dt, input);
        for batch in &batches {
            if let Err(e) = presenter.present(batch) {
                log::warn!("Present error on tick {}: {e}", batch.tick);
            }
        }
        batches.len()
    }
}
