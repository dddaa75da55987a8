//! Activity assets: named states holding ordered steps.
//!
//! An [`Activity`] is built from an [`ActivityAsset`] (the deserialized
//! JSON form) and validated on the way: the initial state and every
//! `switch_state` target must name a state of the same activity. Once built
//! it is never mutated; a reload replaces it as a whole.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use em5_ecs::hash::StringHash;
use serde::{Deserialize, Serialize};

use crate::step::ActivityStep;
use crate::ActivityError;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Hash of an activity name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityId(pub u32);

impl ActivityId {
    pub fn from_name(name: &str) -> Self {
        Self(StringHash::new(name).raw())
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Hash of a state name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub u32);

impl StateId {
    pub fn from_name(name: &str) -> Self {
        Self(StringHash::new(name).raw())
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Asset form
// ---------------------------------------------------------------------------

/// Serialized form of an activity.
///
/// ```json
/// {
///   "name": "patrol",
///   "initial_state": "walk",
///   "states": [
///     { "name": "walk", "steps": [ { "type": "wait", "seconds": 2.0 },
///                                  { "type": "switch_state", "state": "rest" } ] },
///     { "name": "rest", "steps": [ { "type": "stop" } ] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityAsset {
    pub name: String,
    pub initial_state: String,
    pub states: Vec<StateAsset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateAsset {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<ActivityStep>,
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub name: String,
    pub steps: Vec<ActivityStep>,
}

/// A validated, immutable activity.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    id: ActivityId,
    name: String,
    initial_state: StateId,
    states: BTreeMap<StateId, State>,
    /// Set by the library when the activity is inserted.
    pub(crate) load_version: u32,
}

impl Activity {
    /// Validate `asset` and build the activity.
    pub fn from_asset(asset: ActivityAsset) -> Result<Self, ActivityError> {
        let invalid = |reason: String| ActivityError::InvalidAsset {
            activity: asset.name.clone(),
            reason,
        };

        let mut states = BTreeMap::new();
        for state in &asset.states {
            let id = StateId::from_name(&state.name);
            let previous = states.insert(
                id,
                State {
                    name: state.name.clone(),
                    steps: state.steps.clone(),
                },
            );
            if let Some(previous) = previous {
                return Err(invalid(if previous.name == state.name {
                    format!("duplicate state '{}'", state.name)
                } else {
                    format!("states '{}' and '{}' hash alike", previous.name, state.name)
                }));
            }
        }

        let initial_state = StateId::from_name(&asset.initial_state);
        if !states.contains_key(&initial_state) {
            return Err(invalid(format!(
                "initial state '{}' does not exist",
                asset.initial_state
            )));
        }

        let names: HashSet<&str> = asset.states.iter().map(|s| s.name.as_str()).collect();
        for state in &asset.states {
            for target in state.steps.iter().filter_map(ActivityStep::switch_target) {
                if !names.contains(target) {
                    return Err(invalid(format!(
                        "state '{}' switches to unknown state '{target}'",
                        state.name
                    )));
                }
            }
        }

        Ok(Self {
            id: ActivityId::from_name(&asset.name),
            name: asset.name,
            initial_state,
            states,
            load_version: 0,
        })
    }

    pub fn id(&self) -> ActivityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_state(&self) -> StateId {
        self.initial_state
    }

    pub fn load_version(&self) -> u32 {
        self.load_version
    }

    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(&id)
    }

    pub fn state_by_name(&self, name: &str) -> Option<&State> {
        self.state(StateId::from_name(name))
    }

    pub fn step(&self, state: StateId, index: usize) -> Option<&ActivityStep> {
        self.state(state)?.steps.get(index)
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }
}
