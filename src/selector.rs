use rand::Rng;
use std::ops::ControlFlow;
use std::time::Duration;

use crate::comment::{CommentBatch, CommentRecord};
use crate::error::{Result, SorteioError};

/// Picks one comment uniformly at random. The batch is only read.
pub fn select_winner<'a, R: Rng + ?Sized>(batch: &'a CommentBatch, rng: &mut R) -> Result<&'a CommentRecord> {
    let index = pick_index(batch, rng)?;
    batch.get(index).ok_or(SorteioError::EmptyBatch)
}

fn pick_index<R: Rng + ?Sized>(batch: &CommentBatch, rng: &mut R) -> Result<usize> {
    if batch.is_empty() {
        return Err(SorteioError::EmptyBatch);
    }
    Ok(rng.random_range(0..batch.len()))
}

/// Timing of the decelerating reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    pub iterations: u32,
    pub base_delay: Duration,
    pub delay_step: Duration,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            iterations: 20,
            base_delay: Duration::from_millis(50),
            delay_step: Duration::from_millis(10),
        }
    }
}

impl Animation {
    /// Wait after the `picks`-th pick.
    pub fn delay_after(&self, picks: u32) -> Duration {
        self.base_delay + self.delay_step * picks
    }
}

/// Indices point into the batch the draw was started on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawState {
    #[default]
    Idle,
    /// `step` picks made so far; the next one is due after `delay`.
    Animating { step: u32, delay: Duration, current: usize },
    Done(usize),
}

impl DrawState {
    pub fn is_animating(&self) -> bool {
        matches!(self, DrawState::Animating { .. })
    }

    /// Transient pick while animating, or the final winner.
    pub fn current(&self) -> Option<usize> {
        match *self {
            DrawState::Idle => None,
            DrawState::Animating { current, .. } => Some(current),
            DrawState::Done(winner) => Some(winner),
        }
    }

    pub fn winner(&self) -> Option<usize> {
        match *self {
            DrawState::Done(winner) => Some(winner),
            _ => None,
        }
    }
}

/// The reveal as a state machine: `Idle -> Animating -> Done`.
#[derive(Debug, Clone, Default)]
pub struct Draw {
    animation: Animation,
    state: DrawState,
}

impl Draw {
    pub fn new(animation: Animation) -> Self {
        Self { animation, state: DrawState::Idle }
    }

    pub fn state(&self) -> DrawState { self.state }

    /// Makes the first pick. Rejected while another draw is running.
    pub fn start<R: Rng + ?Sized>(&mut self, batch: &CommentBatch, rng: &mut R) -> Result<DrawState> {
        if self.state.is_animating() {
            return Err(SorteioError::DrawInProgress);
        }
        let current = pick_index(batch, rng)?;
        self.state = self.after_pick(1, current);
        Ok(self.state)
    }

    /// Makes the next pick. Outside an animation this is a no-op.
    pub fn advance<R: Rng + ?Sized>(&mut self, batch: &CommentBatch, rng: &mut R) -> Result<DrawState> {
        if let DrawState::Animating { step, .. } = self.state {
            let current = pick_index(batch, rng)?;
            self.state = self.after_pick(step + 1, current);
        }
        Ok(self.state)
    }

    /// Drops the draw, including any pending pick.
    pub fn cancel(&mut self) {
        self.state = DrawState::Idle;
    }

    fn after_pick(&self, picks: u32, current: usize) -> DrawState {
        if picks < self.animation.iterations {
            DrawState::Animating { step: picks, delay: self.animation.delay_after(picks), current }
        } else {
            DrawState::Done(current)
        }
    }
}

/// Decides when the next transition of a draw happens.
pub trait Scheduler {
    /// Returns `Break` to cancel the draw instead of continuing.
    fn wait(&mut self, delay: Duration) -> ControlFlow<()>;
}

/// Blocks the current thread for each delay.
#[derive(Debug, Default, Clone, Copy)]
pub struct SleepScheduler;

impl Scheduler for SleepScheduler {
    fn wait(&mut self, delay: Duration) -> ControlFlow<()> {
        std::thread::sleep(delay);
        ControlFlow::Continue(())
    }
}

/// Runs every transition back to back.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn wait(&mut self, _delay: Duration) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}
