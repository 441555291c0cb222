//! Staircase stimulus: duty levels, per-level dwell, and the run state machine.

use rpmlab_traits::clock::ticks_diff;

use crate::error::{RigError, RigResult};

/// Dwell per staircase level.
pub const DEFAULT_STEP_DURATION_MS: u32 = 2_000;
/// Duration of a fixed-duty hold capture.
pub const DEFAULT_HOLD_DURATION_MS: u32 = 15_000;

/// Validate a step increment in `1..=100`.
pub fn validate_step(step: i32) -> RigResult<u8> {
    if !(1..=100).contains(&step) {
        return Err(RigError::invalid(format!(
            "step increment must be in 1..=100, got {step}"
        )));
    }
    Ok(step as u8)
}

/// Ascending-then-descending duty levels for a step increment `k`.
///
/// Ascends `0, k, 2k, …` while `≤ 100`, then descends from the last
/// ascending value in steps of `k` down to exactly one trailing 0. Every
/// value is a multiple of `k`.
///
/// `k = 20` yields `[0, 20, 40, 60, 80, 100, 80, 60, 40, 20, 0]`.
pub fn staircase_levels(step: i32) -> RigResult<Vec<u8>> {
    let k = validate_step(step)?;
    let ascending: Vec<u8> = (0..=100u8).step_by(usize::from(k)).collect();
    let peak = ascending.last().copied().unwrap_or(0);
    let mut levels = ascending;
    let mut level = peak;
    while level >= k {
        level -= k;
        levels.push(level);
    }
    Ok(levels)
}

/// What kind of stimulus a run applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    Staircase { step: u8 },
    Hold { duty: u8 },
}

/// Levels plus per-level dwell for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturePlan {
    pub kind: CaptureKind,
    pub levels: Vec<u8>,
    pub dwell_ms: u32,
}

impl CapturePlan {
    pub fn staircase(step: i32, dwell_ms: u32) -> RigResult<Self> {
        let levels = staircase_levels(step)?;
        Ok(Self {
            kind: CaptureKind::Staircase { step: step as u8 },
            levels,
            dwell_ms,
        })
    }

    /// A single level held for `duration_ms`.
    pub fn hold(duty: i32, duration_ms: u32) -> RigResult<Self> {
        if !(0..=100).contains(&duty) {
            return Err(RigError::invalid(format!(
                "duty must be in 0..=100, got {duty}"
            )));
        }
        if duration_ms == 0 {
            return Err(RigError::invalid("hold duration must be > 0 ms"));
        }
        Ok(Self {
            kind: CaptureKind::Hold { duty: duty as u8 },
            levels: vec![duty as u8],
            dwell_ms: duration_ms,
        })
    }

    /// Nominal run length.
    pub fn total_ms(&self) -> u64 {
        self.levels.len() as u64 * u64::from(self.dwell_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencerState {
    #[default]
    Idle,
    Running { level_index: usize },
}

/// Outcome of `Sequencer::advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelEvent {
    /// Keep the current level.
    Hold(u8),
    /// Dwell elapsed; switch to this level now.
    Next(u8),
    /// All levels done; the sequencer is Idle again.
    Finished,
}

#[derive(Debug, Default)]
pub struct Sequencer {
    plan: Option<CapturePlan>,
    state: SequencerState,
    level_start_ms: u32,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SequencerState::Running { .. })
    }

    pub fn plan(&self) -> Option<&CapturePlan> {
        self.plan.as_ref()
    }

    /// Current level while running.
    pub fn current_level(&self) -> Option<u8> {
        match (self.state, &self.plan) {
            (SequencerState::Running { level_index }, Some(plan)) => {
                plan.levels.get(level_index).copied()
            }
            _ => None,
        }
    }

    /// Enter Running at the first level. Returns the level to apply.
    pub fn begin(&mut self, plan: CapturePlan, now_ms: u32) -> RigResult<u8> {
        if self.is_running() {
            return Err(RigError::CaptureInProgress);
        }
        let first = plan
            .levels
            .first()
            .copied()
            .ok_or_else(|| RigError::invalid("capture plan has no levels"))?;
        self.plan = Some(plan);
        self.state = SequencerState::Running { level_index: 0 };
        self.level_start_ms = now_ms;
        Ok(first)
    }

    /// Move to the next level once the dwell has elapsed.
    pub fn advance(&mut self, now_ms: u32) -> LevelEvent {
        let (SequencerState::Running { level_index }, Some(plan)) = (self.state, &self.plan) else {
            return LevelEvent::Finished;
        };
        let current = plan.levels[level_index];
        if ticks_diff(now_ms, self.level_start_ms) < plan.dwell_ms {
            return LevelEvent::Hold(current);
        }
        let next_index = level_index + 1;
        match plan.levels.get(next_index).copied() {
            Some(next) => {
                self.state = SequencerState::Running {
                    level_index: next_index,
                };
                self.level_start_ms = now_ms;
                LevelEvent::Next(next)
            }
            None => {
                self.state = SequencerState::Idle;
                LevelEvent::Finished
            }
        }
    }

    /// Abort a run; returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        let was_running = self.is_running();
        self.state = SequencerState::Idle;
        was_running
    }
}
