//! The data cache item protocol.
//!
//! A [`DataCacheItem`] replicates one aspect of one entity. The sender runs
//! [`prepare_for_update`](DataCacheItem::prepare_for_update) followed by
//! [`update_data`](DataCacheItem::update_data) each tick; the receiver runs
//! [`set_data`](DataCacheItem::set_data) when a packet arrives and
//! [`interpolate`](DataCacheItem::interpolate) every tick.
//!
//! Received deltas wait in a FIFO [`HistoryEntry`] queue until the local
//! clock reaches their tick. Matching is by equality on the signal counter:
//! the queue is never reordered, deduplicated or renumbered here, that is
//! the transport's job.

use em5_ecs::prelude::*;

use crate::bit_stream::{BitReader, BitWriter};
use crate::SyncError;

/// One received delta, stamped with the host tick it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry<D> {
    pub tick: i32,
    /// Existence bit as sent.
    pub has_component: bool,
    /// Changed fields, present iff `has_component`.
    pub delta: Option<D>,
}

/// Sender and receiver side of one replicated aspect.
pub trait DataCacheItem {
    /// Name of the backing component, for diagnostics.
    fn component_name(&self) -> &'static str;

    /// Re-read the live component and recompute all change flags.
    ///
    /// Returns whether the existence or any field changed since the last
    /// [`update_data`](Self::update_data). Calling it repeatedly without
    /// writing in between returns the same answer.
    fn prepare_for_update(&mut self, world: &World, entity: EntityId, clock: &Clock) -> bool;

    /// Write `[existence bit][if present: per field changed bit + value]`
    /// and commit the written values as the new snapshot.
    ///
    /// `force` sets every changed bit, for a full resync.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotPrepared`] when no
    /// [`prepare_for_update`](Self::prepare_for_update) preceded this call.
    fn update_data(&mut self, writer: &mut BitWriter, force: bool) -> Result<(), SyncError>;

    /// Decode one delta and queue it under `received_host_tick`. Live state
    /// is not touched.
    fn set_data(
        &mut self,
        reader: &mut BitReader<'_>,
        received_host_tick: i32,
    ) -> Result<(), SyncError>;

    /// Apply queued deltas whose tick equals `clock.signal_counter()`, in
    /// arrival order. Returns the number of entries applied.
    fn interpolate(
        &mut self,
        world: &mut World,
        entity: EntityId,
        clock: &Clock,
        received_host_tick: i32,
    ) -> usize;

    /// Number of queued, not yet applied entries.
    fn pending_entries(&self) -> usize;
}
