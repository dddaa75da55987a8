//! The navigation collaborator the stuck resolver queries.
//!
//! Path following, lane management and evasion live outside this crate. The
//! resolver only needs to know what an entity is doing right now, who it is
//! waiting behind, and two corrective actions.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use em5_ecs::prelude::*;

use crate::NavigationError;

// ---------------------------------------------------------------------------
// NavigationState
// ---------------------------------------------------------------------------

/// Where the path follower is on its current path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathStatus {
    /// No movement order.
    #[default]
    NoTarget,
    Following,
    Reached,
    NotFound,
    /// A path exists but a segment of it is closed.
    Blocked,
    /// The entity left the navigation map.
    OffNavigation,
}

/// Why a moving entity is standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    TrafficLight,
    RightOfWay,
    TrafficJam,
    Pedestrian,
    Passengers,
}

/// What an entity is standing behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockerKind {
    Vehicle,
    Person,
    /// A unit under player control.
    PlayerUnit,
    Obstacle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blocker {
    /// `None` for static obstacles that are not entities.
    pub entity: Option<EntityId>,
    pub kind: BlockerKind,
}

/// Snapshot of one entity's movement, as reported by the navigation layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavigationState {
    pub path: PathStatus,
    pub moving: bool,
    pub evading: bool,
    pub waiting_for: Option<WaitReason>,
    pub blocked_behind: Option<Blocker>,
    /// How long the entity has not moved.
    pub standing_for: Duration,
}

impl NavigationState {
    /// The blocking entity, if the entity waits behind one.
    pub fn blocking_entity(&self) -> Option<EntityId> {
        self.blocked_behind.and_then(|b| b.entity)
    }
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Queries and corrective actions the stuck resolver needs.
pub trait Navigation {
    /// Current movement state of `entity`.
    fn navigation_state(&self, entity: EntityId) -> Result<NavigationState, NavigationError>;

    /// Ask `blocker` to step aside for `requester`.
    fn request_evade(
        &mut self,
        blocker: EntityId,
        requester: EntityId,
    ) -> Result<(), NavigationError>;

    /// Close the lane `entity` is standing on for routing and plan a new path.
    fn block_lane_and_replan(&mut self, entity: EntityId) -> Result<(), NavigationError>;
}

// ---------------------------------------------------------------------------
// StaticNavigation
// ---------------------------------------------------------------------------

/// Table-driven [`Navigation`] that records the actions it receives.
///
/// Entities without a state report [`NavigationError::NoNavigation`].
#[derive(Debug, Clone, Default)]
pub struct StaticNavigation {
    states: BTreeMap<EntityId, NavigationState>,
    /// Entities whose corrective actions fail.
    refusing: BTreeSet<EntityId>,
    evade_requests: Vec<(EntityId, EntityId)>,
    replans: Vec<EntityId>,
}

impl StaticNavigation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&mut self, entity: EntityId, state: NavigationState) {
        self.states.insert(entity, state);
    }

    pub fn remove_state(&mut self, entity: EntityId) {
        self.states.remove(&entity);
    }

    /// Make `entity` blocked behind `blocker`, standing for `standing_for`.
    pub fn block(
        &mut self,
        entity: EntityId,
        blocker: EntityId,
        kind: BlockerKind,
        standing_for: Duration,
    ) {
        self.states.insert(
            entity,
            NavigationState {
                path: PathStatus::Following,
                blocked_behind: Some(Blocker {
                    entity: Some(blocker),
                    kind,
                }),
                standing_for,
                ..NavigationState::default()
            },
        );
    }

    /// Corrective actions for `entity` fail from now on.
    pub fn refuse_actions_for(&mut self, entity: EntityId) {
        self.refusing.insert(entity);
    }

    /// `(blocker, requester)` pairs in request order.
    pub fn evade_requests(&self) -> &[(EntityId, EntityId)] {
        &self.evade_requests
    }

    pub fn replans(&self) -> &[EntityId] {
        &self.replans
    }
}

impl Navigation for StaticNavigation {
    fn navigation_state(&self, entity: EntityId) -> Result<NavigationState, NavigationError> {
        self.states
            .get(&entity)
            .cloned()
            .ok_or(NavigationError::NoNavigation { entity })
    }

    fn request_evade(
        &mut self,
        blocker: EntityId,
        requester: EntityId,
    ) -> Result<(), NavigationError> {
        if self.refusing.contains(&blocker) {
            return Err(NavigationError::ActionRejected {
                entity: blocker,
                reason: "cannot evade".to_owned(),
            });
        }
        self.evade_requests.push((blocker, requester));
        Ok(())
    }

    fn block_lane_and_replan(&mut self, entity: EntityId) -> Result<(), NavigationError> {
        if self.refusing.contains(&entity) {
            return Err(NavigationError::ActionRejected {
                entity,
                reason: "no alternative route".to_owned(),
            });
        }
        self.replans.push(entity);
        Ok(())
    }
}
