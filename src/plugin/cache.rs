//! Request-coalescing module cache.
//!
//! One slot per exact module id:
//! - `Pending` while a leader computes it, collecting waiters
//! - `Ready` once it succeeded, for the rest of the plugin's lifetime
//!
//! A failed computation is broadcast to the waiters and its slot removed,
//! so the next request for the id tries again.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crossbeam::channel::{self, Receiver, Sender};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxBuildHasher;

use super::GeneratedModule;
use crate::error::{Error, Result, render_chain};

/// Leader's result as seen by waiters.
type Outcome = std::result::Result<GeneratedModule, String>;

type Waiter = Sender<Outcome>;

enum Slot {
    Pending(Vec<Waiter>),
    Ready(GeneratedModule),
}

enum Role {
    Leader,
    Waiter(Receiver<Outcome>),
}

/// Per-plugin memoisation of generated modules, keyed by exact id.
#[derive(Default)]
pub struct ModuleCache {
    slots: DashMap<String, Slot, FxBuildHasher>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the module for `id`, computing it at most once at a time.
    ///
    /// The first caller becomes the leader and runs `compute`; concurrent
    /// callers block until the leader finishes and share its result.
    pub fn get_or_load<F>(&self, id: &str, compute: F) -> Result<GeneratedModule>
    where
        F: FnOnce() -> Result<GeneratedModule>,
    {
        // The entry guard must be gone before computing: compute may
        // re-enter the cache for other ids on the same shard.
        let role = match self.slots.entry(id.to_string()) {
            Entry::Occupied(mut e) => match e.get_mut() {
                Slot::Ready(module) => return Ok(module.clone()),
                Slot::Pending(waiters) => {
                    let (tx, rx) = channel::bounded(1);
                    waiters.push(tx);
                    Role::Waiter(rx)
                }
            },
            Entry::Vacant(e) => {
                e.insert(Slot::Pending(Vec::new()));
                Role::Leader
            }
        };

        match role {
            Role::Waiter(rx) => Self::wait(id, rx),
            Role::Leader => self.lead(id, compute),
        }
    }

    fn lead<F>(&self, id: &str, compute: F) -> Result<GeneratedModule>
    where
        F: FnOnce() -> Result<GeneratedModule>,
    {
        // Catch panics to ensure waiters always receive a result
        let result = catch_unwind(AssertUnwindSafe(compute)).unwrap_or_else(|_| {
            Err(Error::Load {
                id: id.to_string(),
                message: "load panicked".into(),
            })
        });

        let waiters = match &result {
            Ok(module) => match self.slots.insert(id.to_string(), Slot::Ready(module.clone())) {
                Some(Slot::Pending(waiters)) => waiters,
                _ => Vec::new(),
            },
            Err(_) => match self.slots.remove(id) {
                Some((_, Slot::Pending(waiters))) => waiters,
                _ => Vec::new(),
            },
        };

        if !waiters.is_empty() {
            let outcome = match &result {
                Ok(module) => Ok(module.clone()),
                Err(e) => Err(render_chain(e)),
            };
            Self::broadcast(&waiters, &outcome);
        }

        result
    }

    fn wait(id: &str, rx: Receiver<Outcome>) -> Result<GeneratedModule> {
        let outcome = rx
            .recv()
            .unwrap_or_else(|_| Err("leader went away without a result".into()));
        outcome.map_err(|message| Error::Load {
            id: id.to_string(),
            message,
        })
    }

    fn broadcast(waiters: &[Waiter], outcome: &Outcome) {
        for tx in waiters {
            let _ = tx.send(outcome.clone());
        }
    }

    /// Whether a finished module is cached for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.slots
            .get(id)
            .is_some_and(|slot| matches!(*slot, Slot::Ready(_)))
    }

    /// Number of cached or in-flight ids.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
