use crate::direction::{ApproachGroup, Direction};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Seconds of green left on the phase timer after an emergency override
/// forces a group change, so normal sequencing winds down quickly once the
/// override clears.
const PREEMPT_REWIND_SEC: f64 = 5.0; // s

/// Stage durations of the signal cycle.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignalTiming {
    /// Green stage duration in s.
    pub green: f64,
    /// Yellow stage duration in s.
    pub yellow: f64,
    /// All-red clearance duration in s.
    pub all_red: f64,
}

/// The stage of the signal cycle for the group that holds right-of-way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Stage {
    Green,
    Yellow,
    AllRed,
}

/// The signal controller for the intersection.
///
/// One group at a time holds right-of-way. The stage is not stored: it is
/// derived from a single phase timer that resets only when the group
/// changes, so the cycle is a strict green, yellow, all-red ring. The
/// emergency override is an orthogonal layer on top; it freezes normal
/// sequencing without disturbing the timer bookkeeping.
#[derive(Clone, Debug)]
pub struct SignalController {
    timing: SignalTiming,
    group: ApproachGroup,
    /// Seconds since the group last changed.
    phase_timer: f64,
    /// The direction forced green by the emergency override, if active.
    emergency: Option<Direction>,
}

impl Default for SignalTiming {
    fn default() -> Self {
        Self {
            green: 30.0,
            yellow: 3.0,
            all_red: 2.0,
        }
    }
}

impl SignalTiming {
    /// Total length of one group's cycle in s.
    pub fn cycle(&self) -> f64 {
        self.green + self.yellow + self.all_red
    }
}

impl SignalController {
    /// Creates a controller at the start of an NS green.
    pub fn new(timing: SignalTiming) -> Self {
        Self {
            timing,
            group: ApproachGroup::NS,
            phase_timer: 0.0,
            emergency: None,
        }
    }

    /// Advances the phase timer by `dt` seconds and flips the group once the
    /// cycle completes. While the emergency override is active only the
    /// timer advances; the stage machine is held.
    pub fn update(&mut self, dt: f64) {
        self.phase_timer += dt;
        if self.emergency.is_some() {
            return;
        }
        if self.phase_timer >= self.timing.cycle() {
            self.group = self.group.opposite();
            self.phase_timer = 0.0;
        }
    }

    /// The stage derived from the phase timer. Total even when the timer has
    /// overrun the cycle under an emergency hold.
    pub fn stage(&self) -> Stage {
        if self.phase_timer < self.timing.green {
            Stage::Green
        } else if self.phase_timer < self.timing.green + self.timing.yellow {
            Stage::Yellow
        } else {
            Stage::AllRed
        }
    }

    /// Whether vehicles from `dir` may enter the junction. Yellow and
    /// all-red are not traversable. Under the emergency override exactly the
    /// forced direction is clear.
    pub fn is_clear(&self, dir: Direction) -> bool {
        match self.emergency {
            Some(forced) => dir == forced,
            None => dir.group() == self.group && self.stage() == Stage::Green,
        }
    }

    /// Immediately hands right-of-way to `group` and restarts its cycle.
    pub fn force_phase(&mut self, group: ApproachGroup) {
        self.group = group;
        self.phase_timer = 0.0;
    }

    /// Immediately hands right-of-way to the opposing group.
    pub fn cycle_phase(&mut self) {
        self.force_phase(self.group.opposite());
    }

    /// Engages or releases the emergency override.
    ///
    /// Engaging forces the direction's group to hold right-of-way; when that
    /// requires a group change the phase timer is wound to near the end of
    /// green. Releasing resumes threshold sequencing from wherever the timer
    /// stands.
    pub fn set_emergency(&mut self, dir: Option<Direction>) {
        if let Some(dir) = dir {
            if dir.group() != self.group {
                self.group = dir.group();
                self.phase_timer = self.timing.green - PREEMPT_REWIND_SEC;
            }
        }
        self.emergency = dir;
    }

    /// The group currently holding right-of-way.
    pub fn group(&self) -> ApproachGroup {
        self.group
    }

    /// Seconds since the group last changed.
    pub fn phase_timer(&self) -> f64 {
        self.phase_timer
    }

    /// The direction forced green by the emergency override, if active.
    pub fn emergency(&self) -> Option<Direction> {
        self.emergency
    }

    /// Seconds until the next scheduled group change.
    pub fn time_until_change(&self) -> f64 {
        (self.timing.cycle() - self.phase_timer).max(0.0)
    }
}
