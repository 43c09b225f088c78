//! # Cleanup Scheduler
//!
//! A singleton background task on a fixed cadence (hourly by default). Each
//! cycle deletes the messages of expired rooms (the room rows themselves
//! stay queryable) and keeps the official room catalog alive: missing
//! official rooms are created, expired ones get their messages purged and
//! their expiry pushed forward. Every step is best-effort: a failure is
//! logged and the next scheduled run retries naturally.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use em_core::error::Result;
use em_core::models::Room;
use em_core::traits::ContentStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::expiry;

/// Well-known system account that owns official rooms.
pub const SYSTEM_USER_ID: Uuid = uuid::uuid!("00000000-0000-7000-8000-000000000001");

/// Default sweep cadence.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// An entry of the official room catalog, keyed by name.
#[derive(Debug, Clone, Copy)]
pub struct OfficialRoomSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub duration_hours: i64,
    pub max_users: i64,
}

/// The fixed catalog of official rooms the scheduler keeps alive.
pub const OFFICIAL_ROOMS: &[OfficialRoomSpec] = &[
    OfficialRoomSpec {
        name: "The Commons",
        description: "The always-on general hangout. Resets daily.",
        duration_hours: 24,
        max_users: 100,
    },
    OfficialRoomSpec {
        name: "Night Owls",
        description: "For whoever is still awake. Resets every 12 hours.",
        duration_hours: 12,
        max_users: 100,
    },
    OfficialRoomSpec {
        name: "Music Corner",
        description: "Share what you're listening to.",
        duration_hours: 24,
        max_users: 50,
    },
    OfficialRoomSpec {
        name: "Game Room",
        description: "Pick-up groups and gaming chat.",
        duration_hours: 24,
        max_users: 50,
    },
];

/// The periodic sweep over the content store.
pub struct CleanupScheduler {
    store: Arc<dyn ContentStore>,
    interval: Duration,
}

/// Handle to a running scheduler; dropping it leaves the task running,
/// `stop()` shuts it down and waits for the current cycle to finish.
pub struct SweeperHandle {
    task: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl SweeperHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl CleanupScheduler {
    pub fn new(store: Arc<dyn ContentStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Spawns the recurring task. The first cycle runs immediately so a
    /// fresh deployment gets its official rooms without waiting an hour.
    pub fn start(self) -> SweeperHandle {
        let (shutdown, mut rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            log::info!("cleanup scheduler started, cadence {:?}", self.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.run_once(Utc::now()).await,
                    _ = rx.changed() => break,
                }
            }
            log::info!("cleanup scheduler stopped");
        });
        SweeperHandle { task, shutdown }
    }

    /// One full cycle. The two steps are independent: a sweep failure does
    /// not stop the official room pass.
    pub async fn run_once(&self, now: DateTime<Utc>) {
        match self.sweep_expired_rooms(now).await {
            Ok(0) => {}
            Ok(deleted) => log::info!("sweep removed {deleted} messages from expired rooms"),
            Err(err) => log::error!("sweep failed: {err}"),
        }
        self.ensure_official_rooms(now).await;
    }

    /// Bulk-deletes every message belonging to an expired room. Room rows
    /// are never deleted here: they stay queryable as expired/inert so
    /// back-references (creator stats, history) keep resolving.
    pub async fn sweep_expired_rooms(&self, now: DateTime<Utc>) -> Result<u64> {
        let room_ids = self.store.expired_room_ids(now).await?;
        if room_ids.is_empty() {
            return Ok(0);
        }
        self.store.delete_messages_for_rooms(&room_ids).await
    }

    /// Idempotently materializes the official catalog: creates what is
    /// missing, resets what has expired. One room's failure never blocks
    /// the rest.
    pub async fn ensure_official_rooms(&self, now: DateTime<Utc>) {
        for spec in OFFICIAL_ROOMS {
            if let Err(err) = self.ensure_official_room(spec, now).await {
                log::error!("official room '{}' upkeep failed: {err}", spec.name);
            }
        }
    }

    async fn ensure_official_room(&self, spec: &OfficialRoomSpec, now: DateTime<Utc>) -> Result<()> {
        match self.store.find_official_room(spec.name).await? {
            None => {
                let room = Room {
                    id: Uuid::now_v7(),
                    creator_id: SYSTEM_USER_ID,
                    name: spec.name.to_string(),
                    description: spec.description.to_string(),
                    tags: vec!["official".to_string()],
                    duration_hours: spec.duration_hours,
                    expires_at: expiry::calculate_expiration_date(now, spec.duration_hours),
                    max_users: spec.max_users,
                    is_official: true,
                    created_at: now,
                    participants: vec![],
                };
                self.store.create_room(&room).await?;
                log::info!("official room '{}' created", spec.name);
            }
            Some(room) if room.is_expired_at(now) => {
                // Pseudo-reset: purge messages and push the window forward
                // rather than recreating the room.
                self.store.delete_messages_for_rooms(&[room.id]).await?;
                let next = expiry::calculate_expiration_date(now, spec.duration_hours);
                self.store.reset_room_expiry(room.id, next).await?;
                log::info!("official room '{}' reset until {next}", spec.name);
            }
            Some(_) => {}
        }
        Ok(())
    }
}
