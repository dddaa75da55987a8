//! The stuck resolving pass.
//!
//! Each tick the system:
//!
//! 1. classifies every entity carrying a [`StuckResolverComponent`], in
//!    ascending [`EntityId`] order;
//! 2. looks for rings of entities waiting behind each other and hands each
//!    ring to [`on_cyclic_stuck_situation_detected`], which escalates exactly
//!    one member;
//! 3. escalates every other stuck entity by one stage once the running stage
//!    had its time, and clears the ones that are no longer stuck.
//!
//! A failing entity (navigation refused an action, entity vanished) is logged
//! and counted; the rest of the pass still runs.
//!
//! [`on_cyclic_stuck_situation_detected`]: StuckResolvingSystem::on_cyclic_stuck_situation_detected

use std::collections::BTreeSet;
use std::time::Duration;

use em5_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::{classify, Analysis, Stage};
use crate::component::StuckResolverComponent;
use crate::navigation::Navigation;
use crate::StuckResolvingError;

// ---------------------------------------------------------------------------
// StuckResolvingConfig
// ---------------------------------------------------------------------------

/// Tuning of the stuck resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StuckResolvingConfig {
    /// Seconds a stage runs before the next one may start.
    pub stage_switch_delay_secs: f32,
    /// Seconds an entity must stand before it counts as stuck.
    pub stuck_after_secs: f32,
    /// Longest waiting ring the cycle search follows.
    pub max_cycle_length: usize,
}

impl Default for StuckResolvingConfig {
    fn default() -> Self {
        Self {
            stage_switch_delay_secs: 5.0,
            stuck_after_secs: 10.0,
            max_cycle_length: 8,
        }
    }
}

/// Negative and NaN give zero; anything past `Duration::MAX` saturates.
fn saturating_secs(secs: f32) -> Duration {
    Duration::try_from_secs_f32(secs.max(0.0)).unwrap_or(Duration::MAX)
}

impl StuckResolvingConfig {
    pub fn stage_switch_delay(&self) -> Duration {
        saturating_secs(self.stage_switch_delay_secs)
    }

    pub fn stuck_after(&self) -> Duration {
        saturating_secs(self.stuck_after_secs)
    }
}

// ---------------------------------------------------------------------------
// StuckResolvingReport
// ---------------------------------------------------------------------------

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StuckResolvingReport {
    pub processed: usize,
    pub stuck: usize,
    /// Stages started this pass.
    pub escalations: Vec<(EntityId, Stage)>,
    /// Resolvers reset because their entity moves again.
    pub cleared: usize,
    /// Members of every waiting ring found, ascending.
    pub cycles: Vec<Vec<EntityId>>,
    pub despawned: Vec<EntityId>,
    /// Entities whose update failed.
    pub faults: usize,
}

// ---------------------------------------------------------------------------
// StuckResolvingSystem
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StuckResolvingSystem {
    config: StuckResolvingConfig,
    /// Rebuilt every pass; never read across ticks.
    cyclic_stuck_participants: BTreeSet<EntityId>,
}

impl StuckResolvingSystem {
    pub fn new(config: StuckResolvingConfig) -> Self {
        Self {
            config,
            cyclic_stuck_participants: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &StuckResolvingConfig {
        &self.config
    }

    /// Run one pass over every resolver in `world`.
    pub fn update<N: Navigation + ?Sized>(
        &mut self,
        world: &mut World,
        navigation: &mut N,
        clock: &Clock,
    ) -> StuckResolvingReport {
        let now = clock.now();
        let stuck_after = self.config.stuck_after();
        let mut report = StuckResolvingReport::default();
        self.cyclic_stuck_participants.clear();

        let entities = world.entities_with::<StuckResolverComponent>();
        let mut waiting_behind: Vec<(EntityId, EntityId)> = Vec::new();

        for &entity in &entities {
            report.processed += 1;
            let state = match navigation.navigation_state(entity) {
                Ok(state) => Some(state),
                Err(e) => {
                    tracing::debug!(entity = %entity, error = %e, "no navigation state, not stuck");
                    None
                }
            };
            let analysis = state
                .as_ref()
                .map_or(Analysis::NoNaviNoStuck, |s| classify(s, stuck_after));

            let Some(resolver) = world.get_component_mut::<StuckResolverComponent>(entity) else {
                continue;
            };
            resolver.current_analysis = analysis;
            if !resolver.is_stuck() {
                continue;
            }
            report.stuck += 1;
            if analysis.is_blocked_behind_entity() {
                if let Some(blocker) = state.as_ref().and_then(|s| s.blocking_entity()) {
                    waiting_behind.push((entity, blocker));
                }
            }
        }

        for (entity, blocker) in waiting_behind {
            if self.cyclic_stuck_participants.contains(&entity) {
                continue;
            }
            let mut cycle = BTreeSet::new();
            if self.check_for_cyclic_stuck_situation(entity, blocker, &*navigation, &mut cycle) {
                self.cyclic_stuck_participants.extend(cycle.iter().copied());
                self.on_cyclic_stuck_situation_detected(world, navigation, &cycle, now, &mut report);
            }
        }

        for &entity in &entities {
            if self.cyclic_stuck_participants.contains(&entity) {
                continue;
            }
            if let Err(e) = self.resolve_entity(world, navigation, entity, now, &mut report) {
                tracing::warn!(entity = %entity, error = %e, "stuck resolving failed for entity");
                report.faults += 1;
            }
        }

        if report.escalations.len() + report.faults > 0 {
            tracing::debug!(
                processed = report.processed,
                stuck = report.stuck,
                escalations = report.escalations.len(),
                faults = report.faults,
                "stuck resolving pass"
            );
        }
        report
    }

    /// Follow the "waits behind" relation from `start` over `next`.
    ///
    /// Returns `true` when the walk meets an entity it already visited within
    /// `max_cycle_length` steps; the members of that ring are added to `out`.
    /// A walk that reaches an entity waiting behind nothing returns `false`.
    pub fn check_for_cyclic_stuck_situation<N: Navigation + ?Sized>(
        &self,
        start: EntityId,
        next: EntityId,
        navigation: &N,
        out: &mut BTreeSet<EntityId>,
    ) -> bool {
        let mut path = vec![start];
        let mut current = next;

        while path.len() <= self.config.max_cycle_length {
            if let Some(position) = path.iter().position(|e| *e == current) {
                out.extend(path[position..].iter().copied());
                return true;
            }
            path.push(current);
            match navigation
                .navigation_state(current)
                .ok()
                .and_then(|s| s.blocking_entity())
            {
                Some(blocker) => current = blocker,
                None => return false,
            }
        }
        tracing::trace!(start = %start, length = path.len(), "waiting chain longer than cycle limit");
        false
    }

    /// Handle a ring of entities waiting on each other as one event.
    ///
    /// Every member is marked [`Analysis::CyclicStuck`]; the lowest id
    /// escalates, the others wait for it. Returns the escalating member.
    pub fn on_cyclic_stuck_situation_detected<N: Navigation + ?Sized>(
        &self,
        world: &mut World,
        navigation: &mut N,
        cycle: &BTreeSet<EntityId>,
        now: Duration,
        report: &mut StuckResolvingReport,
    ) -> Option<EntityId> {
        let members: Vec<EntityId> = cycle
            .iter()
            .copied()
            .filter(|e| world.has_component::<StuckResolverComponent>(*e))
            .collect();
        for &member in &members {
            if let Some(resolver) = world.get_component_mut::<StuckResolverComponent>(member) {
                resolver.current_analysis = Analysis::CyclicStuck;
            }
        }

        let leader = *members.first()?;
        tracing::info!(members = ?members, leader = %leader, "cyclic stuck situation detected");
        report.cycles.push(members);

        if let Err(e) = self.escalate(world, navigation, leader, now, report) {
            tracing::warn!(entity = %leader, error = %e, "resolving cyclic stuck situation failed");
            report.faults += 1;
        }
        Some(leader)
    }

    // -- per entity ---------------------------------------------------------

    fn resolve_entity<N: Navigation + ?Sized>(
        &self,
        world: &mut World,
        navigation: &mut N,
        entity: EntityId,
        now: Duration,
        report: &mut StuckResolvingReport,
    ) -> Result<(), StuckResolvingError> {
        let resolver = world
            .get_component_mut::<StuckResolverComponent>(entity)
            .ok_or(EcsError::StaleEntity { entity })?;

        if !resolver.is_stuck() {
            if resolver.current_stage.is_some() {
                tracing::debug!(
                    entity = %entity,
                    analysis = ?resolver.current_analysis,
                    "no longer stuck, clearing stage"
                );
                resolver.clear_state();
                report.cleared += 1;
            }
            return Ok(());
        }

        self.escalate(world, navigation, entity, now, report)
    }

    fn escalate<N: Navigation + ?Sized>(
        &self,
        world: &mut World,
        navigation: &mut N,
        entity: EntityId,
        now: Duration,
        report: &mut StuckResolvingReport,
    ) -> Result<(), StuckResolvingError> {
        let resolver = world
            .get_component_mut::<StuckResolverComponent>(entity)
            .ok_or(EcsError::StaleEntity { entity })?;

        if resolver.has_running_stage() && resolver.should_wait_before_trying_next_stage(now) {
            return Ok(());
        }

        // A failed resolver retries its action without restarting the stage.
        let stage = if resolver.has_failed() {
            Stage::Fail
        } else {
            let next = StuckResolverComponent::increment_stage(resolver.current_stage);
            resolver.start_stage(next, now);
            tracing::info!(
                entity = %entity,
                stage = %next,
                analysis = ?resolver.current_analysis,
                "stuck resolver escalated"
            );
            report.escalations.push((entity, next));
            next
        };
        let deletable = resolver.can_be_deleted && !resolver.visible_by_camera;

        match stage {
            Stage::WaitForEvade => {
                match navigation
                    .navigation_state(entity)
                    .ok()
                    .and_then(|s| s.blocking_entity())
                {
                    Some(blocker) => navigation.request_evade(blocker, entity)?,
                    None => tracing::debug!(entity = %entity, "nothing to ask for evasion"),
                }
            }
            Stage::BlockLaneAndReplan => navigation.block_lane_and_replan(entity)?,
            Stage::Fail if deletable => {
                world.despawn(entity)?;
                tracing::info!(entity = %entity, "deleted unit that could not be unstuck");
                report.despawned.push(entity);
            }
            Stage::Fail => {
                tracing::trace!(entity = %entity, "stuck unit failed, kept while visible or protected");
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
