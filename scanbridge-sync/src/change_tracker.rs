//! Per-resource modification history.
//!
//! Process-wide and in memory only: a cold start re-exports every resource
//! once. Entries for different resources are written concurrently; access to
//! one resource goes through a [`ResourceClaim`], which holds that
//! resource's lock for the whole sync attempt and records the new stamp only
//! on [`ResourceClaim::commit`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

use scanbridge_core::{ModificationStamp, ResourceName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResourceState {
    last_known_modification: ModificationStamp,
}

type Slot = Arc<Mutex<Option<ResourceState>>>;

#[derive(Debug, Default)]
pub struct ChangeTracker {
    slots: StdMutex<HashMap<ResourceName, Slot>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, name: &ResourceName) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        slots.entry(name.clone()).or_default().clone()
    }

    /// Take exclusive access to `name` for one sync attempt.
    pub async fn claim(&self, name: &ResourceName) -> ResourceClaim {
        ResourceClaim {
            name: name.clone(),
            guard: self.slot(name).lock_owned().await,
        }
    }

    pub async fn is_registered(&self, name: &ResourceName) -> bool {
        self.claim(name).await.is_registered()
    }

    /// `false` for an unknown resource: callers check
    /// [`is_registered`](Self::is_registered) first.
    pub async fn has_changed(&self, name: &ResourceName, current: ModificationStamp) -> bool {
        self.claim(name).await.has_changed(current)
    }

    /// Record the initial stamp. Calling it again overwrites.
    pub async fn register(&self, name: &ResourceName, stamp: ModificationStamp) {
        self.claim(name).await.commit(stamp);
    }

    /// Record a successfully exported stamp.
    pub async fn update(&self, name: &ResourceName, stamp: ModificationStamp) {
        self.claim(name).await.commit(stamp);
    }

    pub async fn last_known(&self, name: &ResourceName) -> Option<ModificationStamp> {
        self.claim(name).await.last_known()
    }
}

/// Exclusive handle on one resource's history entry.
///
/// Dropping the claim without calling [`commit`](Self::commit) leaves the
/// entry exactly as it was.
#[derive(Debug)]
pub struct ResourceClaim {
    name: ResourceName,
    guard: OwnedMutexGuard<Option<ResourceState>>,
}

impl ResourceClaim {
    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    pub fn is_registered(&self) -> bool {
        self.guard.is_some()
    }

    pub fn has_changed(&self, current: ModificationStamp) -> bool {
        self.guard
            .is_some_and(|state| state.last_known_modification != current)
    }

    pub fn last_known(&self) -> Option<ModificationStamp> {
        self.guard.map(|state| state.last_known_modification)
    }

    /// Register or update the entry and release the claim.
    pub fn commit(mut self, stamp: ModificationStamp) {
        *self.guard = Some(ResourceState {
            last_known_modification: stamp,
        });
    }
}
