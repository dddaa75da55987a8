//! Per-entity stuck resolver state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::{self, Analysis, Stage};
use crate::system::StuckResolvingConfig;
use crate::unit_tag::UnitTag;

/// Escalation state of one entity.
///
/// `current_stage` only moves forward; [`clear_state`](Self::clear_state)
/// is the only way back. `stage_started_at` is set when a stage begins and
/// is the single time reference for the stage switch delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StuckResolverComponent {
    /// `None` until the first stage ran since the last clear.
    pub current_stage: Option<Stage>,
    pub current_analysis: Analysis,
    pub stage_started_at: Option<Duration>,
    pub stage_switch_delay: Duration,
    pub regard_traffic_impediments_as_stuck: bool,
    /// The game may delete the entity once it failed.
    pub can_be_deleted: bool,
    /// Maintained by the renderer. Visible entities are never deleted.
    pub visible_by_camera: bool,
}

impl Default for StuckResolverComponent {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl StuckResolverComponent {
    pub fn new(stage_switch_delay: Duration) -> Self {
        Self {
            current_stage: None,
            current_analysis: Analysis::NoNaviNoStuck,
            stage_started_at: None,
            stage_switch_delay,
            regard_traffic_impediments_as_stuck: false,
            can_be_deleted: false,
            visible_by_camera: false,
        }
    }

    /// Resolver tuned for a unit type.
    ///
    /// Emergency units do not wait out traffic, civilian traffic may be
    /// deleted when it fails.
    pub fn for_unit(tag: UnitTag, config: &StuckResolvingConfig) -> Self {
        Self {
            regard_traffic_impediments_as_stuck: tag.is_emergency_unit(),
            can_be_deleted: tag.is_civilian_traffic(),
            ..Self::new(config.stage_switch_delay())
        }
    }

    /// The stage that follows `current`. Saturates at [`Stage::Fail`].
    pub fn increment_stage(current: Option<Stage>) -> Stage {
        Stage::increment(current)
    }

    /// Begin `stage` at `now`.
    ///
    /// Returns `false` and changes nothing for a stage below the current one.
    /// Starting [`Stage::Fail`] again keeps the original start time.
    pub fn start_stage(&mut self, stage: Stage, now: Duration) -> bool {
        match self.current_stage {
            Some(current) if stage < current => {
                tracing::warn!(
                    %current,
                    requested = %stage,
                    "refusing to move a stuck resolver backwards"
                );
                return false;
            }
            Some(Stage::Fail) if stage == Stage::Fail && self.stage_started_at.is_some() => {
                return true;
            }
            _ => {}
        }
        self.current_stage = Some(stage);
        self.stage_started_at = Some(now);
        true
    }

    pub fn has_running_stage(&self) -> bool {
        self.current_stage.is_some() && self.stage_started_at.is_some()
    }

    /// `true` while the running stage is younger than the switch delay.
    pub fn should_wait_before_trying_next_stage(&self, now: Duration) -> bool {
        match self.stage_started_at {
            Some(started_at) => now.saturating_sub(started_at) < self.stage_switch_delay,
            None => false,
        }
    }

    /// Forget every stage; the next stuck situation starts over.
    pub fn clear_state(&mut self) {
        self.current_stage = None;
        self.stage_started_at = None;
    }

    pub fn is_stuck(&self) -> bool {
        analysis::is_stuck(
            self.current_analysis,
            self.regard_traffic_impediments_as_stuck,
        )
    }

    pub fn has_failed(&self) -> bool {
        self.current_stage == Some(Stage::Fail)
    }
}
