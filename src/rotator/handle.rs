//! Cross-task access to a running rotator.
//!
//! A [`RotatorHandle`] is the host page's global accessor: cheap to clone,
//! usable from any task, forwarding requests to the task that owns the
//! [`AdRotator`](crate::rotator::AdRotator).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, oneshot};

use crate::error::{AppError, Result};
use crate::models::{AdStats, NewAd};
use crate::rotator::RotationState;

/// Result of a load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The active list was rebuilt
    Loaded {
        count: usize,
        /// Whether the list is the built-in default record
        fallback: bool,
    },
    /// Another load was already in flight; this request was ignored
    Skipped,
}

/// Single-slot guard against overlapping loads.
#[derive(Debug, Clone, Default)]
pub struct LoadSlot {
    busy: Arc<AtomicBool>,
}

impl LoadSlot {
    /// Claim the slot, or `None` while another load holds it.
    pub fn try_acquire(&self) -> Option<LoadGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LoadGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the load slot when dropped.
#[derive(Debug)]
pub struct LoadGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Point-in-time view of the rotator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatorSnapshot {
    pub current_index: usize,
    pub ad_ids: Vec<String>,
    pub state: RotationState,
}

impl RotatorSnapshot {
    /// Id of the ad currently on display.
    pub fn current_id(&self) -> Option<&str> {
        self.ad_ids.get(self.current_index).map(String::as_str)
    }
}

/// Requests processed by the rotator task.
pub(crate) enum Command {
    Refresh {
        guard: LoadGuard,
        reply: oneshot::Sender<LoadOutcome>,
    },
    Stats {
        reply: oneshot::Sender<Result<AdStats>>,
    },
    Add {
        ad: NewAd,
        reply: oneshot::Sender<Result<String>>,
    },
    Remove {
        id: String,
        reply: oneshot::Sender<Result<bool>>,
    },
    Click {
        ad_id: String,
    },
    Next,
    Snapshot {
        reply: oneshot::Sender<RotatorSnapshot>,
    },
    Shutdown,
}

/// Cloneable front door to a running rotator.
#[derive(Debug, Clone)]
pub struct RotatorHandle {
    commands: mpsc::Sender<Command>,
    load_slot: LoadSlot,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::Refresh { .. } => "Refresh",
            Command::Stats { .. } => "Stats",
            Command::Add { .. } => "Add",
            Command::Remove { .. } => "Remove",
            Command::Click { .. } => "Click",
            Command::Next => "Next",
            Command::Snapshot { .. } => "Snapshot",
            Command::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

impl RotatorHandle {
    pub(crate) fn new(commands: mpsc::Sender<Command>, load_slot: LoadSlot) -> Self {
        Self {
            commands,
            load_slot,
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| AppError::ControllerClosed)
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.send(build(reply)).await?;
        response.await.map_err(|_| AppError::ControllerClosed)
    }

    /// Re-run the full load sequence.
    ///
    /// Returns [`LoadOutcome::Skipped`] without queueing anything when a load
    /// is already in flight.
    pub async fn refresh(&self) -> Result<LoadOutcome> {
        let Some(guard) = self.load_slot.try_acquire() else {
            log::info!("Refresh ignored: a load is already in flight");
            return Ok(LoadOutcome::Skipped);
        };
        self.request(|reply| Command::Refresh { guard, reply }).await
    }

    /// Counters over the persisted records.
    pub async fn stats(&self) -> Result<AdStats> {
        self.request(|reply| Command::Stats { reply }).await?
    }

    /// Add a record and return its id.
    pub async fn add(&self, ad: NewAd) -> Result<String> {
        self.request(|reply| Command::Add { ad, reply }).await?
    }

    /// Remove a record by id. Returns whether anything was removed.
    pub async fn remove(&self, id: impl Into<String>) -> Result<bool> {
        let id = id.into();
        self.request(|reply| Command::Remove { id, reply }).await?
    }

    /// Record a click without waiting for it to be stored.
    pub async fn record_click(&self, ad_id: impl Into<String>) -> Result<()> {
        self.send(Command::Click {
            ad_id: ad_id.into(),
        })
        .await
    }

    /// Advance to the next ad immediately.
    pub async fn next(&self) -> Result<()> {
        self.send(Command::Next).await
    }

    pub async fn snapshot(&self) -> Result<RotatorSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Stop the rotator task.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_slot_is_single_entry() {
        let slot = LoadSlot::default();
        let guard = slot.try_acquire().expect("first acquire");
        assert!(slot.is_busy());
        assert!(slot.clone().try_acquire().is_none());

        drop(guard);
        assert!(!slot.is_busy());
        assert!(slot.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_refresh_skipped_while_busy() {
        let (tx, _rx) = mpsc::channel(4);
        let slot = LoadSlot::default();
        let handle = RotatorHandle::new(tx, slot.clone());

        let _held = slot.try_acquire().unwrap();
        assert_eq!(handle.refresh().await.unwrap(), LoadOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_closed_controller() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let slot = LoadSlot::default();
        let handle = RotatorHandle::new(tx, slot.clone());

        assert!(matches!(handle.stats().await, Err(AppError::ControllerClosed)));
        assert!(matches!(handle.refresh().await, Err(AppError::ControllerClosed)));
        // The guard travelled with the failed command and was released.
        assert!(!slot.is_busy());
    }

    #[test]
    fn test_snapshot_current_id() {
        let snapshot = RotatorSnapshot {
            current_index: 1,
            ad_ids: vec!["ad_1".into(), "ad_2".into()],
            state: RotationState::Running,
        };
        assert_eq!(snapshot.current_id(), Some("ad_2"));
    }
}
