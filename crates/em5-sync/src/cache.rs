//! The data cache: every tracked entity with one item per replicated aspect.
//!
//! # Wire layout of one update
//!
//! ```text
//! [u32 removed count][u64 entity ref] * removed
//! [u32 entity count]
//!   per entity: [u64 entity ref]
//!     per item kind, fixed order: [present bit][item payload if present]
//! ```
//!
//! An entity is written only when at least one of its items changed (or the
//! update is forced). Both sides must be built with the same item kinds.
//!
//! On the receiver, unknown entity refs are registered on first sight and
//! bound to a locally spawned proxy entity at the first interpolation that
//! has something to apply. Removals are queued under the host tick that
//! announced them and applied once the clock reaches or passes that tick.

use std::collections::{BTreeMap, VecDeque};

use em5_ecs::prelude::*;

use crate::bit_stream::{BitReader, BitWriter};
use crate::item::DataCacheItem;
use crate::items::{GameLogicData, GhostData, HealthData};
use crate::SyncError;

// ---------------------------------------------------------------------------
// CacheItemKind / CacheItem
// ---------------------------------------------------------------------------

/// The closed set of replicated aspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheItemKind {
    GameLogic,
    Ghost,
    Health,
}

impl CacheItemKind {
    /// Every kind, in wire order.
    pub const ALL: [CacheItemKind; 3] = [
        CacheItemKind::GameLogic,
        CacheItemKind::Ghost,
        CacheItemKind::Health,
    ];

    pub fn create(self) -> CacheItem {
        match self {
            CacheItemKind::GameLogic => CacheItem::GameLogic(GameLogicData::new()),
            CacheItemKind::Ghost => CacheItem::Ghost(GhostData::new()),
            CacheItemKind::Health => CacheItem::Health(HealthData::new()),
        }
    }
}

/// One item of a tracked entity.
#[derive(Debug)]
pub enum CacheItem {
    GameLogic(GameLogicData),
    Ghost(GhostData),
    Health(HealthData),
}

impl CacheItem {
    pub fn kind(&self) -> CacheItemKind {
        match self {
            CacheItem::GameLogic(_) => CacheItemKind::GameLogic,
            CacheItem::Ghost(_) => CacheItemKind::Ghost,
            CacheItem::Health(_) => CacheItemKind::Health,
        }
    }

    /// Move the queued history of `decoded` behind this item's own.
    /// Items of different kinds are left alone.
    fn absorb(&mut self, decoded: CacheItem) {
        match (self, decoded) {
            (CacheItem::GameLogic(item), CacheItem::GameLogic(mut other)) => {
                item.append_history(&mut other)
            }
            (CacheItem::Ghost(item), CacheItem::Ghost(mut other)) => item.append_history(&mut other),
            (CacheItem::Health(item), CacheItem::Health(mut other)) => {
                item.append_history(&mut other)
            }
            (item, other) => tracing::warn!(
                expected = ?item.kind(),
                found = ?other.kind(),
                "decoded cache item of the wrong kind"
            ),
        }
    }

    fn inner(&self) -> &dyn DataCacheItem {
        match self {
            CacheItem::GameLogic(item) => item,
            CacheItem::Ghost(item) => item,
            CacheItem::Health(item) => item,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn DataCacheItem {
        match self {
            CacheItem::GameLogic(item) => item,
            CacheItem::Ghost(item) => item,
            CacheItem::Health(item) => item,
        }
    }
}

impl DataCacheItem for CacheItem {
    fn component_name(&self) -> &'static str {
        self.inner().component_name()
    }

    fn prepare_for_update(&mut self, world: &World, entity: EntityId, clock: &Clock) -> bool {
        self.inner_mut().prepare_for_update(world, entity, clock)
    }

    fn update_data(&mut self, writer: &mut BitWriter, force: bool) -> Result<(), SyncError> {
        self.inner_mut().update_data(writer, force)
    }

    fn set_data(
        &mut self,
        reader: &mut BitReader<'_>,
        received_host_tick: i32,
    ) -> Result<(), SyncError> {
        self.inner_mut().set_data(reader, received_host_tick)
    }

    fn interpolate(
        &mut self,
        world: &mut World,
        entity: EntityId,
        clock: &Clock,
        received_host_tick: i32,
    ) -> usize {
        self.inner_mut()
            .interpolate(world, entity, clock, received_host_tick)
    }

    fn pending_entries(&self) -> usize {
        self.inner().pending_entries()
    }
}

// ---------------------------------------------------------------------------
// DataCache
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct TrackedEntity {
    /// Local entity; `None` on a receiver until the proxy is spawned.
    local: Option<EntityId>,
    items: Vec<CacheItem>,
}

impl TrackedEntity {
    fn new(local: Option<EntityId>, kinds: &[CacheItemKind]) -> Self {
        Self {
            local,
            items: kinds.iter().map(|kind| kind.create()).collect(),
        }
    }

    fn pending_entries(&self) -> usize {
        self.items.iter().map(DataCacheItem::pending_entries).sum()
    }
}

/// Outcome of one receiver-side [`DataCache::interpolate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpolationReport {
    /// History entries applied across all items.
    pub applied: usize,
    /// Proxy entities spawned for newly seen refs.
    pub spawned: Vec<EntityId>,
    /// Proxy entities despawned by removals.
    pub removed: Vec<EntityId>,
}

/// A decoded update held back from the receiver queues.
#[derive(Debug)]
pub struct StagedUpdate {
    host_tick: i32,
    removals: Vec<u64>,
    entities: Vec<(u64, Vec<CacheItem>)>,
}

impl StagedUpdate {
    pub fn host_tick(&self) -> i32 {
        self.host_tick
    }

    /// Entities the update carried.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

/// All cache items of a sender or a receiver.
#[derive(Debug)]
pub struct DataCache {
    kinds: Vec<CacheItemKind>,
    entries: BTreeMap<u64, TrackedEntity>,
    /// Sender: refs to announce as removed in the next update.
    pending_removals: Vec<u64>,
    /// Receiver: announced removals with their host tick.
    scheduled_removals: VecDeque<(i32, u64)>,
    last_received_host_tick: Option<i32>,
}

impl Default for DataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DataCache {
    /// A cache replicating every [`CacheItemKind`].
    pub fn new() -> Self {
        Self::with_kinds(&CacheItemKind::ALL)
    }

    /// A cache replicating only `kinds` (wire order stays [`CacheItemKind::ALL`]
    /// order regardless of the order given here).
    pub fn with_kinds(kinds: &[CacheItemKind]) -> Self {
        let mut kinds = kinds.to_vec();
        kinds.sort();
        kinds.dedup();
        Self {
            kinds,
            entries: BTreeMap::new(),
            pending_removals: Vec::new(),
            scheduled_removals: VecDeque::new(),
            last_received_host_tick: None,
        }
    }

    pub fn kinds(&self) -> &[CacheItemKind] {
        &self.kinds
    }

    /// Sender: start replicating `entity`, using its raw handle as ref.
    pub fn track(&mut self, entity: EntityId) {
        self.track_as(entity.tracked_ref(), entity);
    }

    /// Track `entity_ref` bound to `local`. Re-tracking rebinds without
    /// losing item state.
    pub fn track_as(&mut self, entity_ref: u64, local: EntityId) {
        let kinds = &self.kinds;
        self.entries
            .entry(entity_ref)
            .or_insert_with(|| TrackedEntity::new(None, kinds))
            .local = Some(local);
        self.pending_removals.retain(|r| *r != entity_ref);
    }

    /// Sender: stop replicating `entity_ref` and announce the removal in the
    /// next update. Returns `false` if it was not tracked.
    pub fn untrack(&mut self, entity_ref: u64) -> bool {
        if self.entries.remove(&entity_ref).is_none() {
            return false;
        }
        self.pending_removals.push(entity_ref);
        true
    }

    pub fn is_tracked(&self, entity_ref: u64) -> bool {
        self.entries.contains_key(&entity_ref)
    }

    /// Local entity bound to `entity_ref`, if any.
    pub fn local_entity(&self, entity_ref: u64) -> Option<EntityId> {
        self.entries.get(&entity_ref)?.local
    }

    /// Number of tracked entities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Receiver: queued entries over all items.
    pub fn pending_entries(&self) -> usize {
        self.entries.values().map(TrackedEntity::pending_entries).sum()
    }

    /// Host tick of the last decoded update.
    pub fn last_received_host_tick(&self) -> Option<i32> {
        self.last_received_host_tick
    }

    // -- sender -------------------------------------------------------------

    /// Prepare every item and write one update. Returns the number of
    /// entities written.
    ///
    /// Tracked entities that died since the last update are dropped and
    /// announced as removed.
    pub fn write_update(
        &mut self,
        world: &World,
        clock: &Clock,
        writer: &mut BitWriter,
        force: bool,
    ) -> Result<usize, SyncError> {
        let dead: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, tracked)| tracked.local.is_some_and(|e| !world.is_alive(e)))
            .map(|(entity_ref, _)| *entity_ref)
            .collect();
        for entity_ref in dead {
            tracing::debug!(entity_ref, "tracked entity despawned, announcing removal");
            self.untrack(entity_ref);
        }

        writer.write(&(self.pending_removals.len() as u32));
        for entity_ref in self.pending_removals.drain(..) {
            writer.write(&entity_ref);
        }

        let mut dirty: Vec<(u64, Vec<bool>)> = Vec::new();
        for (entity_ref, tracked) in self.entries.iter_mut() {
            let Some(local) = tracked.local else {
                continue;
            };
            let changed: Vec<bool> = tracked
                .items
                .iter_mut()
                .map(|item| item.prepare_for_update(world, local, clock) || force)
                .collect();
            if changed.iter().any(|c| *c) {
                dirty.push((*entity_ref, changed));
            }
        }

        writer.write(&(dirty.len() as u32));
        for (entity_ref, changed) in &dirty {
            writer.write(entity_ref);
            let Some(tracked) = self.entries.get_mut(entity_ref) else {
                continue;
            };
            for (item, present) in tracked.items.iter_mut().zip(changed) {
                writer.write_bit(*present);
                if *present {
                    item.update_data(writer, force)?;
                }
            }
        }

        Ok(dirty.len())
    }

    // -- receiver -----------------------------------------------------------

    /// Decode one update stamped with `host_tick` and queue it. Returns the
    /// number of entities it carried.
    ///
    /// Nothing is queued when decoding fails.
    pub fn read_update(
        &mut self,
        reader: &mut BitReader<'_>,
        host_tick: i32,
    ) -> Result<usize, SyncError> {
        let staged = self.decode_update(reader, host_tick)?;
        Ok(self.commit_update(staged))
    }

    /// Decode one update into scratch items without touching the cache.
    ///
    /// Pair with [`commit_update`](Self::commit_update) once the caller has
    /// accepted the whole packet; dropping the result discards it.
    pub fn decode_update(
        &self,
        reader: &mut BitReader<'_>,
        host_tick: i32,
    ) -> Result<StagedUpdate, SyncError> {
        let removed: u32 = reader.read()?;
        let mut removals = Vec::new();
        for _ in 0..removed {
            removals.push(reader.read::<u64>()?);
        }

        let count: u32 = reader.read()?;
        let mut entities = Vec::new();
        for _ in 0..count {
            let entity_ref: u64 = reader.read()?;
            let mut items: Vec<CacheItem> = self.kinds.iter().map(|kind| kind.create()).collect();
            for item in items.iter_mut() {
                if reader.read_bit()? {
                    item.set_data(reader, host_tick)?;
                }
            }
            entities.push((entity_ref, items));
        }

        Ok(StagedUpdate {
            host_tick,
            removals,
            entities,
        })
    }

    /// Queue a decoded update. Unknown refs are registered here. Returns the
    /// number of entities it carried.
    pub fn commit_update(&mut self, staged: StagedUpdate) -> usize {
        let StagedUpdate {
            host_tick,
            removals,
            entities,
        } = staged;
        let count = entities.len();

        for entity_ref in removals {
            self.scheduled_removals.push_back((host_tick, entity_ref));
        }
        for (entity_ref, items) in entities {
            let kinds = &self.kinds;
            let tracked = self
                .entries
                .entry(entity_ref)
                .or_insert_with(|| TrackedEntity::new(None, kinds));
            for (item, decoded) in tracked.items.iter_mut().zip(items) {
                item.absorb(decoded);
            }
        }

        self.last_received_host_tick = Some(host_tick);
        count
    }

    /// Apply everything due at `clock.signal_counter()`.
    ///
    /// Each item drains its own queue, so an entry waiting for a later tick
    /// only holds back the item it belongs to.
    pub fn interpolate(&mut self, world: &mut World, clock: &Clock) -> InterpolationReport {
        let mut report = InterpolationReport::default();
        let received_host_tick = self
            .last_received_host_tick
            .unwrap_or_else(|| clock.signal_counter());

        for (entity_ref, tracked) in self.entries.iter_mut() {
            let local = match tracked.local {
                Some(local) => local,
                None if tracked.pending_entries() == 0 => continue,
                None => {
                    let local = world.spawn();
                    tracing::debug!(
                        host_entity = %EntityId::from_tracked_ref(*entity_ref),
                        proxy = %local,
                        "spawned replica proxy"
                    );
                    tracked.local = Some(local);
                    report.spawned.push(local);
                    local
                }
            };
            for item in tracked.items.iter_mut() {
                report.applied += item.interpolate(world, local, clock, received_host_tick);
            }
        }

        let tick = clock.signal_counter();
        while self
            .scheduled_removals
            .front()
            .is_some_and(|(removal_tick, _)| tick.wrapping_sub(*removal_tick) >= 0)
        {
            let Some((_, entity_ref)) = self.scheduled_removals.pop_front() else {
                break;
            };
            let Some(local) = self.entries.remove(&entity_ref).and_then(|t| t.local) else {
                continue;
            };
            match world.despawn(local) {
                Ok(()) => report.removed.push(local),
                Err(e) => tracing::warn!(
                    host_entity = %EntityId::from_tracked_ref(entity_ref),
                    error = %e,
                    "replica proxy already gone"
                ),
            }
        }

        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
