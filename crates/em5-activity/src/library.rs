//! The set of loaded activities.
//!
//! Players never hold a reference into the library. They keep an
//! [`ActivityHandle`] and re-resolve it every tick; inserting an activity
//! under an existing id bumps its load version so stale handles are caught.

use std::collections::BTreeMap;

use crate::activity::{Activity, ActivityAsset, ActivityId};
use crate::ActivityError;

/// Id plus the load version the holder started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivityHandle {
    pub id: ActivityId,
    pub load_version: u32,
}

#[derive(Debug, Default)]
pub struct ActivityLibrary {
    activities: BTreeMap<ActivityId, Activity>,
}

impl ActivityLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `activity`, replacing any activity with the same id.
    ///
    /// A replacement gets the previous load version plus one.
    pub fn insert(&mut self, mut activity: Activity) -> ActivityHandle {
        let id = activity.id();
        activity.load_version = match self.activities.get(&id) {
            Some(previous) => {
                let version = previous.load_version.wrapping_add(1);
                tracing::info!(
                    activity = activity.name(),
                    load_version = version,
                    "activity reloaded"
                );
                version
            }
            None => 1,
        };
        let handle = ActivityHandle {
            id,
            load_version: activity.load_version,
        };
        self.activities.insert(id, activity);
        handle
    }

    /// Parse, validate and insert an activity from JSON.
    pub fn load_json(&mut self, json: &str) -> Result<ActivityHandle, ActivityError> {
        let asset: ActivityAsset = serde_json::from_str(json)?;
        let activity = Activity::from_asset(asset)?;
        tracing::debug!(
            activity = activity.name(),
            states = activity.state_count(),
            "activity loaded"
        );
        Ok(self.insert(activity))
    }

    pub fn get(&self, id: ActivityId) -> Option<&Activity> {
        self.activities.get(&id)
    }

    /// Handle to the currently loaded version of `id`.
    pub fn handle(&self, id: ActivityId) -> Option<ActivityHandle> {
        self.get(id).map(|activity| ActivityHandle {
            id,
            load_version: activity.load_version,
        })
    }

    /// The activity behind `handle`, if it was not replaced or removed.
    pub fn resolve(&self, handle: ActivityHandle) -> Result<&Activity, ActivityError> {
        let activity = self
            .get(handle.id)
            .ok_or(ActivityError::UnknownActivity { id: handle.id })?;
        if activity.load_version != handle.load_version {
            return Err(ActivityError::Reloaded {
                activity: activity.name().to_owned(),
                expected: handle.load_version,
                found: activity.load_version,
            });
        }
        Ok(activity)
    }

    pub fn remove(&mut self, id: ActivityId) -> Option<Activity> {
        self.activities.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}
