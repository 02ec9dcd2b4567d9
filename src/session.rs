use rand::Rng;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::comment::{self, CommentBatch, CommentRecord};
use crate::error::{Result, SorteioError};
use crate::normalizer;
use crate::resolver;
use crate::selector::{Animation, Draw, DrawState, Scheduler};

/// Everything the presentation layer shows: the loaded batch and the draw.
///
/// A load replaces the batch and clears the winner. A failed load leaves an
/// empty batch behind.
#[derive(Debug, Default)]
pub struct Session {
    batch: CommentBatch,
    draw: Draw,
}

impl Session {
    pub fn new(animation: Animation) -> Self {
        Self { batch: CommentBatch::empty(), draw: Draw::new(animation) }
    }

    pub fn comments(&self) -> &CommentBatch { &self.batch }
    pub fn draw_state(&self) -> DrawState { self.draw.state() }
    pub fn is_animating(&self) -> bool { self.draw.state().is_animating() }

    /// Final winner, only once the reveal has finished.
    pub fn winner(&self) -> Option<&CommentRecord> {
        self.draw.state().winner().and_then(|i| self.batch.get(i))
    }

    /// Whatever is highlighted right now, transient or final.
    pub fn current_pick(&self) -> Option<&CommentRecord> {
        self.draw.state().current().and_then(|i| self.batch.get(i))
    }

    pub fn announcement(&self) -> Option<String> {
        self.winner().map(comment::announcement)
    }

    pub fn load_text(&mut self, raw: &str) -> Result<usize> {
        self.replace(normalizer::normalize(raw))
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading comments from file");
        self.replace(comment::read_comments_from_file(path))
    }

    pub fn load_link(&mut self, url: &str) -> Result<usize> {
        self.replace(resolver::resolve_post(url))
    }

    fn replace(&mut self, loaded: Result<CommentBatch>) -> Result<usize> {
        self.draw.cancel();
        match loaded {
            Ok(batch) => {
                info!(count = batch.len(), "comments loaded");
                self.batch = batch;
                Ok(self.batch.len())
            }
            Err(e) => {
                warn!(error = %e, "failed to load comments");
                self.batch = CommentBatch::empty();
                Err(e)
            }
        }
    }

    pub fn start_draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<DrawState> {
        let state = self.draw.start(&self.batch, rng)?;
        debug!(comments = self.batch.len(), "draw started");
        Ok(state)
    }

    pub fn advance_draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<DrawState> {
        self.draw.advance(&self.batch, rng)
    }

    pub fn cancel_draw(&mut self) {
        if self.is_animating() {
            debug!("draw cancelled");
        }
        self.draw.cancel();
    }

    /// Clears the batch and drops any draw still in flight.
    pub fn reset(&mut self) {
        self.cancel_draw();
        self.batch = CommentBatch::empty();
    }

    /// Runs a whole draw, letting `scheduler` pace the picks. `on_pick` sees
    /// every transient pick and finally the winner. Returns `None` when the
    /// scheduler cancelled the draw.
    pub fn run_draw<R, S, F>(&mut self, rng: &mut R, scheduler: &mut S, mut on_pick: F) -> Result<Option<&CommentRecord>>
    where
        R: Rng + ?Sized,
        S: Scheduler + ?Sized,
        F: FnMut(&CommentRecord, DrawState),
    {
        let mut state = self.start_draw(rng)?;
        loop {
            if let Some(pick) = state.current().and_then(|i| self.batch.get(i)) {
                on_pick(pick, state);
            }
            match state {
                DrawState::Animating { delay, .. } => {
                    if scheduler.wait(delay).is_break() {
                        self.cancel_draw();
                        return Ok(None);
                    }
                    state = self.advance_draw(rng)?;
                }
                DrawState::Done(_) => break,
                DrawState::Idle => return Ok(None),
            }
        }

        let winner = self.winner().ok_or(SorteioError::EmptyBatch)?;
        info!(username = winner.username(), id = %winner.id(), "winner drawn");
        Ok(Some(winner))
    }
}
