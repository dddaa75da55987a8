//! Host and client ends of a replication session.
//!
//! A [`HostSession`] turns the tracked part of a world into one packet per
//! tick; a [`ClientSession`] decodes those packets into its [`DataCache`] and
//! applies them to its own world when its clock reaches the host tick.
//!
//! # Packet layout
//!
//! ```text
//! [4 bytes checksum][u32 LE payload bit length][payload]
//! payload: [i32 host tick][data cache update]
//! ```
//!
//! The checksum is the first four bytes of the BLAKE3 digest of everything
//! after it. The transport is expected to deliver packets whole and in
//! order; the client still drops duplicates and packets older than the last
//! one it accepted.
//!
//! ```
//! use em5_engine::prelude::*;
//!
//! let mut world = World::new();
//! let unit = world.spawn_with(HealthComponent { life_energy: 80.0, ..Default::default() });
//! let mut clock = Clock::new();
//! clock.advance(std::time::Duration::from_millis(100));
//!
//! let mut host = HostSession::new();
//! host.track(unit);
//! let packet = host.build_packet(&world, &clock).unwrap();
//!
//! let mut replica = World::new();
//! let mut client = ClientSession::new();
//! client.receive_packet(&packet).unwrap();
//! client.interpolate(&mut replica, &clock);
//!
//! let proxy = client.local_entity(unit).unwrap();
//! assert_eq!(replica.get_component::<HealthComponent>(proxy).unwrap().life_energy, 80.0);
//! ```

use anyhow::Context;

use em5_ecs::prelude::*;
use em5_sync::prelude::*;

const CHECKSUM_LEN: usize = 4;
const HEADER_LEN: usize = CHECKSUM_LEN + 4;

fn checksum(body: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = blake3::hash(body);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest.as_bytes()[..CHECKSUM_LEN]);
    out
}

// ---------------------------------------------------------------------------
// HostSession
// ---------------------------------------------------------------------------

/// Sender side: owns the sender [`DataCache`].
#[derive(Debug, Default)]
pub struct HostSession {
    cache: DataCache,
    force_next: bool,
    packets_sent: u64,
}

impl HostSession {
    /// A session replicating every item kind.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kinds(kinds: &[CacheItemKind]) -> Self {
        Self {
            cache: DataCache::with_kinds(kinds),
            ..Self::default()
        }
    }

    pub fn track(&mut self, entity: EntityId) {
        self.cache.track(entity);
    }

    /// Stop replicating `entity`; clients despawn their proxy.
    pub fn untrack(&mut self, entity: EntityId) -> bool {
        self.cache.untrack(entity.tracked_ref())
    }

    /// Write every field of every tracked entity in the next packet, e.g.
    /// after a client joined.
    pub fn request_full_sync(&mut self) {
        self.force_next = true;
    }

    pub fn cache(&self) -> &DataCache {
        &self.cache
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    /// Encode this tick's changes, stamped with `clock.signal_counter()`.
    pub fn build_packet(&mut self, world: &World, clock: &Clock) -> anyhow::Result<Vec<u8>> {
        let host_tick = clock.signal_counter();
        let force = std::mem::take(&mut self.force_next);

        let mut writer = BitWriter::new();
        writer.write(&host_tick);
        let entities = self
            .cache
            .write_update(world, clock, &mut writer, force)
            .with_context(|| format!("cannot encode update for host tick {host_tick}"))?;

        let bit_length = u32::try_from(writer.bit_length())
            .context("update does not fit into one packet")?;
        let mut body = Vec::with_capacity(4 + writer.as_bytes().len());
        body.extend_from_slice(&bit_length.to_le_bytes());
        body.extend_from_slice(writer.as_bytes());

        let mut packet = Vec::with_capacity(CHECKSUM_LEN + body.len());
        packet.extend_from_slice(&checksum(&body));
        packet.extend_from_slice(&body);

        self.packets_sent += 1;
        tracing::trace!(host_tick, entities, bits = bit_length, force, "packet built");
        Ok(packet)
    }
}

// ---------------------------------------------------------------------------
// ClientSession
// ---------------------------------------------------------------------------

/// Header facts of an accepted packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedPacket {
    pub host_tick: i32,
    /// Entities the update carried.
    pub entities: usize,
}

/// Receiver side: owns the receiver [`DataCache`].
#[derive(Debug, Default)]
pub struct ClientSession {
    cache: DataCache,
    last_host_tick: Option<i32>,
}

impl ClientSession {
    /// A session expecting every item kind.
    pub fn new() -> Self {
        Self::default()
    }

    /// Must name the same kinds as the host.
    pub fn with_kinds(kinds: &[CacheItemKind]) -> Self {
        Self {
            cache: DataCache::with_kinds(kinds),
            last_host_tick: None,
        }
    }

    pub fn cache(&self) -> &DataCache {
        &self.cache
    }

    pub fn last_host_tick(&self) -> Option<i32> {
        self.last_host_tick
    }

    /// Local proxy of the host's `entity`, once spawned.
    pub fn local_entity(&self, host_entity: EntityId) -> Option<EntityId> {
        self.cache.local_entity(host_entity.tracked_ref())
    }

    /// Validate and decode one packet.
    ///
    /// Returns `Ok(None)` for a duplicate or out-of-date packet. A bad
    /// checksum, a truncated packet or a payload that does not decode to
    /// exactly its declared length is an error. A rejected packet queues
    /// nothing; the host has to follow up with a full sync.
    pub fn receive_packet(&mut self, packet: &[u8]) -> anyhow::Result<Option<ReceivedPacket>> {
        if packet.len() < HEADER_LEN {
            anyhow::bail!("packet of {} bytes is shorter than its header", packet.len());
        }
        let (expected, body) = packet.split_at(CHECKSUM_LEN);
        if checksum(body) != expected {
            anyhow::bail!("packet checksum mismatch");
        }
        let (length, payload) = body.split_at(4);
        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(length);
        let bit_length = u32::from_le_bytes(length_bytes) as usize;
        if bit_length > payload.len() * 8 {
            anyhow::bail!(
                "packet declares {bit_length} bits but carries {}",
                payload.len() * 8
            );
        }

        let mut reader = BitReader::with_bit_length(payload, bit_length);
        let host_tick: i32 = reader.read().context("packet has no host tick")?;
        if let Some(last) = self.last_host_tick {
            if host_tick.wrapping_sub(last) <= 0 {
                tracing::debug!(host_tick, last, "dropping stale packet");
                return Ok(None);
            }
        }

        let staged = self
            .cache
            .decode_update(&mut reader, host_tick)
            .with_context(|| format!("cannot decode update for host tick {host_tick}"))?;
        if reader.remaining_bits() != 0 {
            anyhow::bail!(
                "update for host tick {host_tick} left {} bits unread",
                reader.remaining_bits()
            );
        }
        let entities = self.cache.commit_update(staged);

        self.last_host_tick = Some(host_tick);
        Ok(Some(ReceivedPacket {
            host_tick,
            entities,
        }))
    }

    /// Apply everything due at `clock`'s tick to `world`.
    pub fn interpolate(&mut self, world: &mut World, clock: &Clock) -> InterpolationReport {
        self.cache.interpolate(world, clock)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
