//! Stuck stages and the analysis outcomes that drive them.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::navigation::{BlockerKind, NavigationState, PathStatus, WaitReason};

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Corrective stages, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Ask whatever blocks the entity to step aside.
    WaitForEvade,
    /// Close the current lane for routing and plan around it.
    BlockLaneAndReplan,
    /// Give up. Terminal until the resolver is cleared.
    Fail,
}

impl Stage {
    /// The stage after `current`; a fresh resolver starts at
    /// [`Stage::WaitForEvade`] and [`Stage::Fail`] stays put.
    pub fn increment(current: Option<Stage>) -> Stage {
        match current {
            None => Stage::WaitForEvade,
            Some(Stage::WaitForEvade) => Stage::BlockLaneAndReplan,
            Some(Stage::BlockLaneAndReplan) | Some(Stage::Fail) => Stage::Fail,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::WaitForEvade => "wait_for_evade",
            Stage::BlockLaneAndReplan => "block_lane_and_replan",
            Stage::Fail => "fail",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Result of classifying one entity's movement situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Analysis {
    /// No navigation available, or the query failed.
    #[default]
    NoNaviNoStuck,
    Idle,
    Moving,
    Arrived,
    Evading,
    WaitingForPassengers,

    // Traffic impediments: stuck only when the resolver says so.
    WaitingAtTrafficLight,
    WaitingForRightOfWay,
    WaitingInTrafficJam,
    WaitingForPedestrian,

    BlockedByVehicle,
    BlockedByPerson,
    BlockedByPlayerUnit,
    BlockedByObstacle,
    NoPathFound,
    PathBlocked,
    OffNavigation,
    StandingTooLong,
    /// Part of a ring of entities waiting on each other.
    CyclicStuck,
}

impl Analysis {
    /// Every outcome, for exhaustive checks.
    pub const ALL: [Analysis; 19] = [
        Analysis::NoNaviNoStuck,
        Analysis::Idle,
        Analysis::Moving,
        Analysis::Arrived,
        Analysis::Evading,
        Analysis::WaitingForPassengers,
        Analysis::WaitingAtTrafficLight,
        Analysis::WaitingForRightOfWay,
        Analysis::WaitingInTrafficJam,
        Analysis::WaitingForPedestrian,
        Analysis::BlockedByVehicle,
        Analysis::BlockedByPerson,
        Analysis::BlockedByPlayerUnit,
        Analysis::BlockedByObstacle,
        Analysis::NoPathFound,
        Analysis::PathBlocked,
        Analysis::OffNavigation,
        Analysis::StandingTooLong,
        Analysis::CyclicStuck,
    ];

    pub fn is_traffic_impediment(self) -> bool {
        matches!(
            self,
            Analysis::WaitingAtTrafficLight
                | Analysis::WaitingForRightOfWay
                | Analysis::WaitingInTrafficJam
                | Analysis::WaitingForPedestrian
        )
    }

    /// Outcomes that mean the entity waits behind another entity.
    pub fn is_blocked_behind_entity(self) -> bool {
        matches!(
            self,
            Analysis::BlockedByVehicle | Analysis::BlockedByPerson | Analysis::BlockedByPlayerUnit
        )
    }
}

/// Partition of [`Analysis`] outcomes into stuck and not stuck.
pub fn is_stuck(analysis: Analysis, regard_traffic_impediments_as_stuck: bool) -> bool {
    match analysis {
        Analysis::NoNaviNoStuck
        | Analysis::Idle
        | Analysis::Moving
        | Analysis::Arrived
        | Analysis::Evading
        | Analysis::WaitingForPassengers => false,

        Analysis::WaitingAtTrafficLight
        | Analysis::WaitingForRightOfWay
        | Analysis::WaitingInTrafficJam
        | Analysis::WaitingForPedestrian => regard_traffic_impediments_as_stuck,

        Analysis::BlockedByVehicle
        | Analysis::BlockedByPerson
        | Analysis::BlockedByPlayerUnit
        | Analysis::BlockedByObstacle
        | Analysis::NoPathFound
        | Analysis::PathBlocked
        | Analysis::OffNavigation
        | Analysis::StandingTooLong
        | Analysis::CyclicStuck => true,
    }
}

/// Classify a navigation snapshot.
///
/// Path failures win over everything else. A standing entity is only blamed
/// on its blocker (or on traffic) once it has stood for `stuck_after`.
pub fn classify(state: &NavigationState, stuck_after: Duration) -> Analysis {
    match state.path {
        PathStatus::NotFound => return Analysis::NoPathFound,
        PathStatus::Blocked => return Analysis::PathBlocked,
        PathStatus::OffNavigation => return Analysis::OffNavigation,
        PathStatus::NoTarget => return Analysis::Idle,
        PathStatus::Reached => return Analysis::Arrived,
        PathStatus::Following => {}
    }
    if state.evading {
        return Analysis::Evading;
    }
    if state.moving || state.standing_for < stuck_after {
        return Analysis::Moving;
    }
    if let Some(blocker) = state.blocked_behind {
        return match blocker.kind {
            BlockerKind::Vehicle => Analysis::BlockedByVehicle,
            BlockerKind::Person => Analysis::BlockedByPerson,
            BlockerKind::PlayerUnit => Analysis::BlockedByPlayerUnit,
            BlockerKind::Obstacle => Analysis::BlockedByObstacle,
        };
    }
    match state.waiting_for {
        Some(WaitReason::TrafficLight) => Analysis::WaitingAtTrafficLight,
        Some(WaitReason::RightOfWay) => Analysis::WaitingForRightOfWay,
        Some(WaitReason::TrafficJam) => Analysis::WaitingInTrafficJam,
        Some(WaitReason::Pedestrian) => Analysis::WaitingForPedestrian,
        Some(WaitReason::Passengers) => Analysis::WaitingForPassengers,
        None => Analysis::StandingTooLong,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::Blocker;

    #[test]
    fn increment_walks_forward_and_saturates() {
        assert_eq!(Stage::increment(None), Stage::WaitForEvade);
        assert_eq!(
            Stage::increment(Some(Stage::WaitForEvade)),
            Stage::BlockLaneAndReplan
        );
        assert_eq!(Stage::increment(Some(Stage::BlockLaneAndReplan)), Stage::Fail);
        assert_eq!(Stage::increment(Some(Stage::Fail)), Stage::Fail);
        assert!(Stage::WaitForEvade < Stage::BlockLaneAndReplan);
        assert!(Stage::BlockLaneAndReplan < Stage::Fail);
    }

    #[test]
    fn traffic_impediments_follow_the_flag() {
        for analysis in Analysis::ALL {
            if analysis.is_traffic_impediment() {
                assert!(!is_stuck(analysis, false), "{analysis:?}");
                assert!(is_stuck(analysis, true), "{analysis:?}");
            } else {
                assert_eq!(is_stuck(analysis, false), is_stuck(analysis, true));
            }
        }
        assert!(!is_stuck(Analysis::NoNaviNoStuck, true));
        assert!(is_stuck(Analysis::CyclicStuck, false));
    }

    #[test]
    fn short_stops_are_not_blamed_on_the_blocker() {
        let mut state = NavigationState {
            path: PathStatus::Following,
            blocked_behind: Some(Blocker {
                entity: None,
                kind: BlockerKind::Vehicle,
            }),
            standing_for: Duration::from_secs(1),
            ..NavigationState::default()
        };
        let after = Duration::from_secs(5);
        assert_eq!(classify(&state, after), Analysis::Moving);
        state.standing_for = Duration::from_secs(6);
        assert_eq!(classify(&state, after), Analysis::BlockedByVehicle);
        state.path = PathStatus::NotFound;
        assert_eq!(classify(&state, after), Analysis::NoPathFound);
    }

    #[test]
    fn standing_without_reason_is_stuck() {
        let state = NavigationState {
            path: PathStatus::Following,
            standing_for: Duration::from_secs(30),
            ..NavigationState::default()
        };
        assert_eq!(
            classify(&state, Duration::from_secs(10)),
            Analysis::StandingTooLong
        );
    }
}
