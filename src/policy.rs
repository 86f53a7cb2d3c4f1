//! Right-of-way arbitration.
//!
//! [`recommend`] is a pure function from a congestion sample and the live
//! phase timing to a [`Decision`]. It never fails: an empty junction simply
//! recommends staying put. Recommendations do not mutate the signal; the
//! simulation's switch gate re-validates them first.

use crate::analyzer::AnalysisSummary;
use crate::direction::{ApproachGroup, Direction};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The opposing group's score must exceed this before an empty current
/// group gives way early.
const STARVATION_SCORE: f64 = 10.0;

/// The opposing group's score must exceed this multiple of the current
/// group's before an imbalance switch is recommended.
pub(crate) const IMBALANCE_RATIO: f64 = 2.0;

/// Minimum seconds into a phase before an imbalance switch is considered.
const IMBALANCE_MIN_ELAPSED_SEC: f64 = 20.0; // s

/// One arbitration verdict.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Decision {
    /// The group that should hold right-of-way.
    pub recommended_group: ApproachGroup,
    /// The group holding right-of-way when the verdict was made.
    pub current_group: ApproachGroup,
    /// Human-readable justification.
    pub reason: String,
    pub ns_score: f64,
    pub ew_score: f64,
    pub ns_count: usize,
    pub ew_count: usize,
    /// The approach an emergency vehicle is held on, if any.
    pub emergency: Option<Direction>,
    /// Whether the recommendation departs from the current group.
    pub should_switch: bool,
}

impl Decision {
    /// The sampled score for a group.
    pub fn score(&self, group: ApproachGroup) -> f64 {
        match group {
            ApproachGroup::NS => self.ns_score,
            ApproachGroup::EW => self.ew_score,
        }
    }

    /// The sampled held-vehicle count for a group.
    pub fn count(&self, group: ApproachGroup) -> usize {
        match group {
            ApproachGroup::NS => self.ns_count,
            ApproachGroup::EW => self.ew_count,
        }
    }

    /// Whether the verdict was driven by an emergency vehicle.
    pub fn has_emergency(&self) -> bool {
        self.emergency.is_some()
    }
}

/// Produces a right-of-way recommendation from the latest congestion
/// sample and the live phase timing.
///
/// Rules are evaluated in strict priority order: an emergency overrides
/// everything; a starved opposing group overrides timing; an imbalance
/// only counts once the phase is mature; otherwise hold the current group.
pub fn recommend(
    summary: &AnalysisSummary,
    current: ApproachGroup,
    phase_elapsed: f64,
) -> Decision {
    let other = current.opposite();
    let current_score = summary.score(current);
    let other_score = summary.score(other);

    let (recommended, reason) = if let Some(dir) = summary.emergency {
        (
            dir.group(),
            format!("emergency vehicle approaching from {dir}"),
        )
    } else if current_score == 0.0 && other_score > STARVATION_SCORE {
        (
            other,
            format!(
                "no vehicles waiting {current}, but {} waiting {other}",
                summary.count(other)
            ),
        )
    } else if other_score > current_score * IMBALANCE_RATIO
        && phase_elapsed > IMBALANCE_MIN_ELAPSED_SEC
    {
        (
            other,
            format!(
                "{other} has {} vehicles ({other_score:.1}) vs {current} {} vehicles ({current_score:.1})",
                summary.count(other),
                summary.count(current)
            ),
        )
    } else {
        (
            current,
            format!(
                "{current} has {} vehicles, {other} has {} vehicles",
                summary.count(current),
                summary.count(other)
            ),
        )
    };

    Decision {
        recommended_group: recommended,
        current_group: current,
        reason,
        ns_score: summary.ns_score,
        ew_score: summary.ew_score,
        ns_count: summary.ns_count,
        ew_count: summary.ew_count,
        emergency: summary.emergency,
        should_switch: recommended != current,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn summary(ns_score: f64, ew_score: f64, ns_count: usize, ew_count: usize) -> AnalysisSummary {
        AnalysisSummary {
            ns_score,
            ew_score,
            ns_count,
            ew_count,
            emergency: None,
        }
    }

    #[test]
    fn empty_junction_recommends_staying() {
        let decision = recommend(&AnalysisSummary::default(), ApproachGroup::NS, 0.0);
        assert_eq!(decision.recommended_group, ApproachGroup::NS);
        assert!(!decision.should_switch);
    }

    #[test]
    fn starved_current_group_gives_way() {
        let decision = recommend(&summary(0.0, 12.0, 0, 5), ApproachGroup::NS, 5.0);
        assert_eq!(decision.recommended_group, ApproachGroup::EW);
        assert!(decision.should_switch);
        assert!(decision.reason.contains("no vehicles waiting NS"));
    }

    #[test]
    fn light_opposing_traffic_is_not_starvation() {
        // Score of 10 does not clear the threshold.
        let decision = recommend(&summary(0.0, 10.0, 0, 4), ApproachGroup::NS, 5.0);
        assert!(!decision.should_switch);
    }

    #[test]
    fn imbalance_switches_once_the_phase_is_mature() {
        let decision = recommend(&summary(10.0, 21.0, 4, 9), ApproachGroup::NS, 25.0);
        assert_eq!(decision.recommended_group, ApproachGroup::EW);
        assert!(decision.should_switch);
    }

    #[test]
    fn imbalance_waits_out_a_young_phase() {
        let decision = recommend(&summary(10.0, 21.0, 4, 9), ApproachGroup::NS, 15.0);
        assert!(!decision.should_switch);
    }

    #[test]
    fn exactly_double_is_not_an_imbalance() {
        let decision = recommend(&summary(10.0, 20.0, 4, 8), ApproachGroup::NS, 25.0);
        assert!(!decision.should_switch);
    }

    #[test]
    fn emergency_overrides_every_timer() {
        let mut sample = summary(50.0, 1.0, 20, 1);
        sample.emergency = Some(Direction::West);
        let decision = recommend(&sample, ApproachGroup::NS, 1.0);
        assert_eq!(decision.recommended_group, ApproachGroup::EW);
        assert!(decision.should_switch);
        assert!(decision.has_emergency());
        assert!(decision.reason.contains("west"));
    }

    #[test]
    fn emergency_on_the_current_group_stays() {
        let mut sample = summary(30.0, 28.0, 10, 9);
        sample.emergency = Some(Direction::North);
        let decision = recommend(&sample, ApproachGroup::NS, 40.0);
        assert_eq!(decision.recommended_group, ApproachGroup::NS);
        assert!(!decision.should_switch);
        assert!(decision.has_emergency());
    }

    #[test]
    fn symmetric_rules_apply_from_ew_too() {
        let decision = recommend(&summary(24.0, 0.0, 11, 0), ApproachGroup::EW, 3.0);
        assert_eq!(decision.recommended_group, ApproachGroup::NS);
        assert!(decision.should_switch);
    }
}
