use super::Candidate;
use crate::types::ObjectId;
use std::collections::VecDeque;

/// Number of deep candidates that make it into a result list.
pub const MAX_DEEP_COMPLETIONS: usize = 3;

/// Breadth-first search state for candidates reached through fields and
/// methods of other candidates, e.g. `a.b.c`.
#[derive(Clone, Debug, Default)]
pub struct DeepCompletionState {
    pub enabled: bool,
    this_queue: VecDeque<Candidate>,
    next_queue: Vec<Candidate>,
    high_scores: [f64; MAX_DEEP_COMPLETIONS],
}

impl DeepCompletionState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn enqueue(&mut self, cand: Candidate) {
        self.next_queue.push(cand);
    }

    /// Next candidate of the current depth, moving on to the next depth once
    /// the current one is exhausted.
    pub fn dequeue(&mut self) -> Option<Candidate> {
        if self.this_queue.is_empty() {
            self.this_queue = self.next_queue.drain(..).collect();
        }
        self.this_queue.pop_front()
    }

    /// Whether `score` is among the best [`MAX_DEEP_COMPLETIONS`] deep
    /// scores seen so far. A qualifying score is recorded, displacing the
    /// lowest one.
    pub fn is_high_score(&mut self, score: f64) -> bool {
        if score <= 0.0 {
            return false;
        }
        for idx in 0..MAX_DEEP_COMPLETIONS {
            if score > self.high_scores[idx] {
                self.high_scores.copy_within(idx..MAX_DEEP_COMPLETIONS - 1, idx + 1);
                self.high_scores[idx] = score;
                return true;
            }
        }
        false
    }

    /// Multiplier that favours shallow candidates, reaching zero at depth 10.
    pub fn score_penalty(cand: &Candidate) -> f64 {
        1.0 - (cand.path.len() as f64 / 10.0).min(1.0)
    }

    /// Path from the search root to `obj` through `cand`.
    pub fn new_path(cand: &Candidate, obj: ObjectId) -> Vec<ObjectId> {
        let mut path = cand.path.clone();
        path.push(obj);
        path
    }
}
