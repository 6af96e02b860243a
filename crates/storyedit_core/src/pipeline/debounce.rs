//! Trailing-edge debounce between the editing surface and the story store.
//!
//! # Responsibility
//! - Mirror every local edit immediately and commit it to the story only
//!   after a quiet period.
//! - Re-point a pending commit when its target changes.
//!
//! # Invariants
//! - At most one commit is pending; every reschedule replaces the deadline.
//! - External text never overwrites a pending local edit.
//! - `teardown` drops a pending commit. That window is bounded by the
//!   debounce interval and is logged when it happens.

use log::{debug, warn};
use std::rc::Rc;

/// Authoritative write for buffered text.
pub type CommitTarget = Rc<dyn Fn(&str)>;

/// Pipeline state.
#[derive(Clone)]
pub enum PipelineState {
    Idle,
    Pending {
        buffered: String,
        target: CommitTarget,
        deadline_ms: u64,
    },
}

impl std::fmt::Debug for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::Pending {
                buffered,
                deadline_ms,
                ..
            } => f
                .debug_struct("Pending")
                .field("buffered_chars", &buffered.chars().count())
                .field("deadline_ms", deadline_ms)
                .finish(),
        }
    }
}

/// Locally mirrored text with a debounced authoritative commit.
pub struct DebouncedText {
    local: String,
    target: CommitTarget,
    delay_ms: u64,
    state: PipelineState,
}

impl DebouncedText {
    pub fn new(initial: impl Into<String>, target: CommitTarget, delay_ms: u64) -> Self {
        Self {
            local: initial.into(),
            target,
            delay_ms,
            state: PipelineState::Idle,
        }
    }

    /// Records a local edit and restarts the quiet period.
    pub fn local_change(&mut self, text: &str, now_ms: u64) {
        self.local = text.to_string();
        self.state = PipelineState::Pending {
            buffered: text.to_string(),
            target: Rc::clone(&self.target),
            deadline_ms: now_ms + self.delay_ms,
        };
    }

    /// Points future commits (and a pending one) at `target`.
    ///
    /// Returns `false` when `target` is the current one.
    pub fn retarget(&mut self, target: CommitTarget, now_ms: u64) -> bool {
        if Rc::ptr_eq(&self.target, &target) {
            return false;
        }
        self.target = Rc::clone(&target);
        if let PipelineState::Pending { buffered, .. } = &self.state {
            let buffered = buffered.clone();
            debug!(
                "event=debounce_retarget module=pipeline status=ok deadline_ms={}",
                now_ms + self.delay_ms
            );
            self.state = PipelineState::Pending {
                buffered,
                target,
                deadline_ms: now_ms + self.delay_ms,
            };
        }
        true
    }

    /// Reflects authoritative text locally unless a local edit is pending.
    ///
    /// Returns whether the local text changed.
    pub fn external_change(&mut self, text: &str) -> bool {
        if self.is_pending() || self.local == text {
            return false;
        }
        self.local = text.to_string();
        true
    }

    /// Fires the pending commit once its deadline has passed.
    ///
    /// Returns whether a commit fired.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let due = matches!(
            &self.state,
            PipelineState::Pending { deadline_ms, .. } if now_ms >= *deadline_ms
        );
        if !due {
            return false;
        }
        if let PipelineState::Pending {
            buffered, target, ..
        } = std::mem::replace(&mut self.state, PipelineState::Idle)
        {
            target(&buffered);
            debug!(
                "event=debounce_commit module=pipeline status=ok chars={}",
                buffered.chars().count()
            );
        }
        true
    }

    pub fn next_deadline(&self) -> Option<u64> {
        match &self.state {
            PipelineState::Idle => None,
            PipelineState::Pending { deadline_ms, .. } => Some(*deadline_ms),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, PipelineState::Pending { .. })
    }

    pub fn local_text(&self) -> &str {
        &self.local
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Drops a pending commit. Returns whether one was dropped.
    pub fn teardown(&mut self) -> bool {
        match std::mem::replace(&mut self.state, PipelineState::Idle) {
            PipelineState::Idle => false,
            PipelineState::Pending {
                buffered,
                deadline_ms,
                ..
            } => {
                warn!(
                    "event=debounce_dropped module=pipeline status=error chars={} deadline_ms={}",
                    buffered.chars().count(),
                    deadline_ms
                );
                true
            }
        }
    }
}
