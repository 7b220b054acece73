//! Concurrent registry of mass-bearing bodies.
//!
//! The registry is the source of truth for which bodies currently exist. It
//! holds weak references only; bodies are owned by their hosts. Every
//! operation takes the single registry lock for its whole duration, and all
//! reads hand out snapshots so no caller ever holds a reference into the
//! registry's containers.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use bevy::math::DVec3;
use bevy::prelude::*;
use parking_lot::Mutex;

use crate::body::{BodyRef, MassBody};
use crate::scale::ScaleEngine;

/// A universe translation as sent to other observers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TranslationMessage {
    pub offset: DVec3,
    /// Monotonic per-authority sequence number.
    pub sequence: u64,
}

/// Replication hook notified after every local translation.
///
/// Peers receiving a message must apply it through
/// [`BodyRegistry::apply_remote_translation`], never recompute it.
pub trait TranslationBroadcast: Send + Sync {
    fn broadcast_translation(&self, message: TranslationMessage);
}

/// Counters for the debug overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RegistryStats {
    pub registered: usize,
    pub live: usize,
    pub translations: u64,
    pub last_sequence: u64,
    /// Remote translations received ahead of a missing sequence.
    pub pending_remote: usize,
    pub total_translation: DVec3,
}

struct Entry {
    name: String,
    body: Weak<dyn MassBody>,
}

impl Entry {
    /// Strong handle if the body is still alive and valid.
    fn live(&self) -> Option<BodyRef> {
        self.body.upgrade().filter(|b| b.is_valid())
    }
}

#[derive(Default)]
struct RegistryState {
    bodies: Vec<Entry>,
    lookup: HashMap<String, Weak<dyn MassBody>>,
    translations: u64,
    local_sequence: u64,
    /// Last remote sequence applied; authorities number from 1.
    applied_remote: u64,
    pending_remote: BTreeMap<u64, DVec3>,
    total_translation: DVec3,
}

impl RegistryState {
    fn live_bodies(&self) -> Vec<BodyRef> {
        self.bodies.iter().filter_map(Entry::live).collect()
    }

    fn apply_offset(&mut self, offset: DVec3) -> usize {
        let mut moved = 0;
        for body in self.bodies.iter().filter_map(Entry::live) {
            body.apply_position_offset(offset);
            moved += 1;
        }
        self.translations += 1;
        self.total_translation += offset;
        moved
    }

    fn remove(&mut self, name: &str) -> bool {
        if self.lookup.remove(name).is_none() {
            return false;
        }
        self.bodies.retain(|entry| entry.name != name);
        true
    }
}

/// Thread-safe set of registered bodies.
///
/// `broadcast` is always taken before `state`. It is held for the whole of
/// [`translate_all`](BodyRegistry::translate_all), so the hook sees messages in
/// sequence order.
#[derive(Default)]
pub struct BodyRegistry {
    state: Mutex<RegistryState>,
    broadcast: Mutex<Option<Arc<dyn TranslationBroadcast>>>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the hook that relays translations to other observers.
    pub fn set_broadcast(&self, hook: Arc<dyn TranslationBroadcast>) {
        *self.broadcast.lock() = Some(hook);
    }

    // === Registration ===

    /// Register a body. Returns false for invalid bodies and already-registered names.
    ///
    /// Only a weak reference is stored; the body leaves every query once the
    /// caller's last `Arc` is dropped.
    pub fn register<B: MassBody + 'static>(&self, body: &Arc<B>) -> bool {
        let name = body.identifier().to_string();
        if name.is_empty() {
            warn!("refusing to register a body without an identifier");
            return false;
        }
        if !body.is_valid() {
            warn!("refusing to register destroyed body '{}'", name);
            return false;
        }

        let mut state = self.state.lock();
        if let Some(existing) = state.lookup.get(&name) {
            if existing.strong_count() > 0 {
                return false;
            }
            // The previous owner dropped without unregistering; take over the slot.
            debug!("replacing dropped registration for '{}'", name);
            state.remove(&name);
        }

        let weak: Weak<B> = Arc::downgrade(body);
        let weak: Weak<dyn MassBody> = weak;
        state.lookup.insert(name.clone(), weak.clone());
        state.bodies.push(Entry { name, body: weak });
        true
    }

    /// Remove a body by its identifier. Returns false if it was not registered.
    pub fn unregister(&self, body: &dyn MassBody) -> bool {
        self.unregister_by_name(body.identifier())
    }

    pub fn unregister_by_name(&self, name: &str) -> bool {
        self.state.lock().remove(name)
    }

    /// Empty the registry. Intended for teardown.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.bodies.clear();
        state.lookup.clear();
    }

    // === Queries ===

    /// Snapshot of every live body.
    pub fn all_bodies(&self) -> Vec<BodyRef> {
        self.state.lock().live_bodies()
    }

    pub fn find_by_name(&self, name: &str) -> Option<BodyRef> {
        let state = self.state.lock();
        state
            .lookup
            .get(name)
            .and_then(Weak::upgrade)
            .filter(|b| b.is_valid())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().lookup.contains_key(name)
    }

    /// Number of registrations, including ones whose body has since died.
    pub fn len(&self) -> usize {
        self.state.lock().bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().bodies.is_empty()
    }

    /// Registered identifiers in internal order.
    pub fn identifiers(&self) -> Vec<String> {
        self.state
            .lock()
            .bodies
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    /// True when the body list and the name lookup hold the same identifiers once each.
    pub fn is_consistent(&self) -> bool {
        let state = self.state.lock();
        if state.bodies.len() != state.lookup.len() {
            return false;
        }
        let mut seen = std::collections::HashSet::with_capacity(state.bodies.len());
        state
            .bodies
            .iter()
            .all(|e| seen.insert(e.name.as_str()) && state.lookup.contains_key(&e.name))
    }

    /// Live bodies within `max_distance` of `point`.
    pub fn bodies_in_range(&self, point: DVec3, max_distance: f64) -> Vec<BodyRef> {
        if !(max_distance >= 0.0) {
            return Vec::new();
        }
        let max_sq = max_distance * max_distance;
        let state = self.state.lock();
        state
            .bodies
            .iter()
            .filter_map(Entry::live)
            .filter(|b| b.position().distance_squared(point) <= max_sq)
            .collect()
    }

    /// Up to `count` live bodies ordered nearest first. Ties keep registry order.
    pub fn nearest_bodies(&self, point: DVec3, count: usize) -> Vec<BodyRef> {
        let state = self.state.lock();
        let mut ranked: Vec<(f64, BodyRef)> = state
            .bodies
            .iter()
            .filter_map(Entry::live)
            .map(|b| (b.position().distance_squared(point), b))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
        ranked.truncate(count);
        ranked.into_iter().map(|(_, b)| b).collect()
    }

    /// Reorder the internal list by distance to `point`. Dead entries sink to the end.
    pub fn sort_by_distance(&self, point: DVec3) {
        let mut state = self.state.lock();
        state.bodies.sort_by_cached_key(|entry| {
            let d = entry
                .live()
                .map(|b| b.position().distance_squared(point))
                .unwrap_or(f64::INFINITY);
            // Non-negative floats order the same as their bit patterns.
            d.to_bits()
        });
    }

    // === Bulk operations ===

    /// Shift every live body by `offset` and notify the broadcast hook.
    ///
    /// No reader observes a partially translated set, and concurrent callers
    /// reach the hook in sequence order. Returns the sequence number attached
    /// to the broadcast.
    pub fn translate_all(&self, offset: DVec3) -> u64 {
        let hook = self.broadcast.lock();
        let (message, moved) = {
            let mut state = self.state.lock();
            let moved = state.apply_offset(offset);
            state.local_sequence += 1;
            (
                TranslationMessage {
                    offset,
                    sequence: state.local_sequence,
                },
                moved,
            )
        };

        debug!(
            "translated {} bodies by ({:.1}, {:.1}, {:.1}), sequence {}",
            moved, offset.x, offset.y, offset.z, message.sequence
        );

        if let Some(hook) = hook.as_ref() {
            hook.broadcast_translation(message);
        }
        message.sequence
    }

    /// Apply a translation received from the authority.
    ///
    /// Translations are applied strictly in sequence order. A message that
    /// arrives ahead of a gap is held until the gap fills. Duplicates are
    /// ignored, so redelivery is harmless. Returns false only for duplicates.
    pub fn apply_remote_translation(&self, message: TranslationMessage) -> bool {
        let mut state = self.state.lock();
        if message.sequence <= state.applied_remote
            || state.pending_remote.contains_key(&message.sequence)
        {
            trace!("ignoring duplicate translation {}", message.sequence);
            return false;
        }

        state.pending_remote.insert(message.sequence, message.offset);
        loop {
            let next = state.applied_remote + 1;
            let Some(offset) = state.pending_remote.remove(&next) else {
                break;
            };
            state.apply_offset(offset);
            state.applied_remote = next;
        }
        if !state.pending_remote.is_empty() {
            debug!(
                "holding {} translations until sequence {} arrives",
                state.pending_remote.len(),
                state.applied_remote + 1
            );
        }
        true
    }

    /// Snap every live body to its distance-based scale as seen from `viewer`.
    ///
    /// The body list is snapshotted first so the scale engine's lock is never
    /// taken while the registry lock is held. Returns the number of bodies updated.
    pub fn update_all_scales(&self, viewer: DVec3, engine: &ScaleEngine) -> usize {
        let bodies = self.all_bodies();
        for body in &bodies {
            let scale = engine.scale_for_body(body.as_ref(), viewer);
            body.set_target_scale(scale);
            body.set_scale(scale);
        }
        bodies.len()
    }

    pub fn stats(&self) -> RegistryStats {
        let state = self.state.lock();
        RegistryStats {
            registered: state.bodies.len(),
            live: state.bodies.iter().filter(|e| e.live().is_some()).count(),
            translations: state.translations,
            last_sequence: state.local_sequence,
            pending_remote: state.pending_remote.len(),
            total_translation: state.total_translation,
        }
    }
}
