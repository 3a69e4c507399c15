//! Ad rotation controller.
//!
//! [`AdRotator`] owns the active list, the current index and the rotation
//! timer. The host constructs it once, then either drives it directly or
//! moves it into a task with [`AdRotator::spawn`] and talks to it through
//! a [`RotatorHandle`].
//!
//! ## Task loop
//!
//! ```text
//! load → render → start timer
//!   loop select (biased):
//!     deadline        → next_ad
//!     DisplayEvent    → pause / resume / record_click
//!     Command         → refresh / stats / add / remove / ...
//! ```

pub mod handle;
pub mod timer;

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use crate::display::{AdFragment, DisplayEvent, DisplaySurface};
use crate::error::{AppError, Result};
use crate::models::{AdRecord, AdStats, Config, DEFAULT_AD_ID, NewAd};
use crate::pipeline::{ExpiryFilter, SourceLoader, build_active_list};
use crate::services::{ClickOutcome, ClickTracker, sources_from_config, tracker_from_config};
use crate::storage::{KeyValueStore, prefixed_keys};
use crate::utils::http;

pub use handle::{LoadGuard, LoadOutcome, LoadSlot, RotatorHandle, RotatorSnapshot};
pub use timer::{RotationState, RotationTimer};

use handle::Command;

const COMMAND_BUFFER: usize = 32;

/// The ad rotation controller.
pub struct AdRotator {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    loader: SourceLoader,
    filter: ExpiryFilter,
    tracker: Box<dyn ClickTracker>,
    surface: Box<dyn DisplaySurface>,
    ads: Vec<AdRecord>,
    current_index: usize,
    timer: RotationTimer,
    load_slot: LoadSlot,
}

impl AdRotator {
    /// Assemble a rotator from explicit parts.
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        loader: SourceLoader,
        tracker: Box<dyn ClickTracker>,
        surface: Box<dyn DisplaySurface>,
    ) -> Self {
        Self {
            filter: ExpiryFilter::new(config.expiry.calendar),
            timer: RotationTimer::new(config.rotation.interval()),
            config,
            store,
            loader,
            tracker,
            surface,
            ads: Vec::new(),
            current_index: 0,
            load_slot: LoadSlot::default(),
        }
    }

    /// Build sources and click tracking from configuration.
    pub fn from_config(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        surface: Box<dyn DisplaySurface>,
    ) -> Result<Self> {
        let client = http::create_async_client(&config.http)?;
        let loader = SourceLoader::new(sources_from_config(&config, Arc::clone(&store), &client)?);
        let tracker = tracker_from_config(&config, Arc::clone(&store), &client)?;
        log::debug!("Source priority: {:?}", loader.source_names());
        Ok(Self::new(config, store, loader, tracker, surface))
    }

    /// The active list.
    pub fn ads(&self) -> &[AdRecord] {
        &self.ads
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The record currently on display.
    pub fn current_ad(&self) -> Option<&AdRecord> {
        self.ads.get(self.current_index)
    }

    pub fn state(&self) -> RotationState {
        self.timer.state()
    }

    /// Shared slot used to reject overlapping loads.
    pub fn load_slot(&self) -> &LoadSlot {
        &self.load_slot
    }

    pub fn snapshot(&self) -> RotatorSnapshot {
        RotatorSnapshot {
            current_index: self.current_index,
            ad_ids: self.ads.iter().map(|a| a.id.clone()).collect(),
            state: self.timer.state(),
        }
    }

    // --- Loading ---

    /// Rebuild the active list from the sources and render it.
    ///
    /// Ignored while another load is in flight.
    pub async fn load(&mut self) -> LoadOutcome {
        match self.load_slot.try_acquire() {
            Some(guard) => self.load_with(guard).await,
            None => {
                log::info!("Load ignored: a load is already in flight");
                LoadOutcome::Skipped
            }
        }
    }

    async fn load_with(&mut self, _guard: LoadGuard) -> LoadOutcome {
        let ads = build_active_list(
            &self.loader,
            &self.filter,
            &self.config.default_ad,
            Utc::now(),
        )
        .await;

        let fallback = ads.len() == 1 && ads[0].is_default();
        self.ads = ads;
        self.clamp_index();
        log::info!("{} ads loaded", self.ads.len());

        self.render_current().await;
        LoadOutcome::Loaded {
            count: self.ads.len(),
            fallback,
        }
    }

    fn clamp_index(&mut self) {
        if self.current_index >= self.ads.len() {
            self.current_index = 0;
        }
    }

    // --- Rendering and rotation ---

    /// Render the record at the current index. Returns whether anything was drawn.
    pub async fn render_current(&self) -> bool {
        let Some(ad) = self.current_ad() else {
            log::info!("No ads to display");
            return false;
        };
        if !self.surface.is_available().await {
            log::warn!("Display region {} not found", self.surface.region());
            return false;
        }

        let fragment = AdFragment::from_record(ad, &self.config.display);
        match self.surface.render(&fragment).await {
            Ok(()) => {
                log::debug!("Showing ad {} ({})", ad.id, ad.title);
                true
            }
            Err(e) => {
                log::error!("Failed to render ad {}: {}", ad.id, e);
                false
            }
        }
    }

    /// Advance to the next record and render it.
    ///
    /// A single record is re-rendered in place; an empty list is a no-op.
    pub async fn next_ad(&mut self) {
        match self.ads.len() {
            0 => return,
            1 => {}
            len => {
                self.current_index = (self.current_index + 1) % len;
                log::debug!("Rotating to ad {} of {}", self.current_index + 1, len);
            }
        }
        self.render_current().await;
    }

    /// Start (or restart) the rotation timer.
    pub fn start_rotation(&mut self) {
        self.timer.start(Instant::now());
        log::info!(
            "Rotation running every {}s",
            self.timer.period().as_secs_f32()
        );
    }

    /// Stop advancing; the index is left untouched.
    pub fn pause(&mut self) {
        if self.timer.state() == RotationState::Running {
            log::debug!("Rotation paused");
        }
        self.timer.pause();
    }

    /// Resume with a fresh full period.
    pub fn resume(&mut self) {
        self.timer.start(Instant::now());
        log::debug!("Rotation resumed");
    }

    // --- Clicks ---

    /// Record a click on `ad_id`.
    ///
    /// The default ad is never counted. Failures are logged, not returned.
    pub async fn record_click(&mut self, ad_id: &str) -> Option<ClickOutcome> {
        log::info!("Click on ad {}", ad_id);
        if ad_id == DEFAULT_AD_ID {
            return None;
        }

        let now = Utc::now();
        match self.tracker.record(ad_id, now).await {
            Ok(ClickOutcome::Recorded { clicks }) => {
                if let Some(clicks) = clicks {
                    if let Some(ad) = self.ads.iter_mut().find(|a| a.id == ad_id) {
                        ad.clicks = ad.clicks.max(clicks);
                        ad.last_click = Some(now);
                    }
                    log::info!("Click recorded for {} ({} total)", ad_id, clicks);
                }
                Some(ClickOutcome::Recorded { clicks })
            }
            Ok(ClickOutcome::Missing) => {
                log::warn!("Click on unknown ad {}", ad_id);
                Some(ClickOutcome::Missing)
            }
            Err(e) => {
                log::warn!("Failed to record click on {}: {}", ad_id, e);
                None
            }
        }
    }

    // --- Administration ---

    /// Persist a new record, append it to the active list and re-render.
    pub async fn add(&mut self, new_ad: NewAd) -> Result<String> {
        if new_ad.title.trim().is_empty() || new_ad.image.trim().is_empty() {
            return Err(AppError::validation("an ad needs a title and an image"));
        }

        let now = Utc::now();
        let id = self.unique_id(now.timestamp_millis()).await?;
        let ad = AdRecord::from_new(id.clone(), new_ad, now);

        self.store.set(&id, &serde_json::to_string(&ad)?).await?;
        log::info!("Added ad {}: {}", id, ad.title);
        self.ads.push(ad);

        self.render_current().await;
        Ok(id)
    }

    async fn unique_id(&self, millis: i64) -> Result<String> {
        let prefix = &self.config.store.key_prefix;
        let base = format!("{prefix}{millis}");
        let mut candidate = base.clone();
        let mut suffix = 1;
        while self.ads.iter().any(|a| a.id == candidate) || self.store.contains(&candidate).await? {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        Ok(candidate)
    }

    /// Delete a record from the active list and the store, then re-render.
    pub async fn remove(&mut self, id: &str) -> Result<bool> {
        let stored = self.store.remove(id).await?;

        let position = self.ads.iter().position(|a| a.id == id);
        if let Some(position) = position {
            self.ads.remove(position);
            if position < self.current_index {
                self.current_index -= 1;
            }
            self.clamp_index();
        }

        let removed = stored || position.is_some();
        if removed {
            log::info!("Removed ad {}", id);
        }
        self.render_current().await;
        Ok(removed)
    }

    /// Count persisted records and sum their clicks.
    pub async fn stats(&self) -> Result<AdStats> {
        let mut stats = AdStats {
            active_ads_count: self.ads.len(),
            ..AdStats::default()
        };

        for key in prefixed_keys(self.store.as_ref(), &self.config.store.key_prefix).await? {
            let raw = match self.store.get(&key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Stats: skipping unreadable record {}: {}", key, e);
                    continue;
                }
            };
            match serde_json::from_str::<AdRecord>(&raw) {
                Ok(ad) => {
                    stats.total_ads += 1;
                    stats.total_clicks = stats.total_clicks.saturating_add(ad.clicks);
                }
                Err(e) => log::debug!("Stats: skipping corrupt record {}: {}", key, e),
            }
        }
        Ok(stats)
    }

    // --- Task ---

    /// Move the rotator onto the runtime.
    pub fn spawn(self, events: mpsc::Receiver<DisplayEvent>) -> (RotatorHandle, JoinHandle<()>) {
        let (handle, task) = self.into_task(events);
        (handle, tokio::spawn(task))
    }

    /// Split into a handle and the future that runs the rotation loop.
    pub fn into_task(
        self,
        events: mpsc::Receiver<DisplayEvent>,
    ) -> (RotatorHandle, impl Future<Output = ()> + Send + 'static) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = RotatorHandle::new(tx, self.load_slot.clone());
        (handle, self.run(events, rx))
    }

    async fn run(
        mut self,
        mut events: mpsc::Receiver<DisplayEvent>,
        mut commands: mpsc::Receiver<Command>,
    ) {
        self.load().await;
        self.start_rotation();

        let mut events_open = true;
        let mut commands_open = true;

        while events_open || commands_open {
            let deadline = self.timer.deadline();

            tokio::select! {
                biased;

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.timer.fired(Instant::now());
                    self.next_ad().await;
                }

                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event).await,
                    None => events_open = false,
                },

                command = commands.recv(), if commands_open => match command {
                    Some(Command::Shutdown) => break,
                    Some(command) => self.handle_command(command).await,
                    None => commands_open = false,
                },
            }
        }

        log::info!("Rotator stopped");
    }

    async fn handle_event(&mut self, event: DisplayEvent) {
        match event {
            DisplayEvent::PointerEnter => self.pause(),
            DisplayEvent::PointerLeave => self.resume(),
            DisplayEvent::Activate { ad_id } => {
                self.record_click(&ad_id).await;
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Refresh { guard, reply } => {
                let outcome = self.load_with(guard).await;
                let _ = reply.send(outcome);
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.stats().await);
            }
            Command::Add { ad, reply } => {
                let _ = reply.send(self.add(ad).await);
            }
            Command::Remove { id, reply } => {
                let _ = reply.send(self.remove(&id).await);
            }
            Command::Click { ad_id } => {
                self.record_click(&ad_id).await;
            }
            Command::Next => self.next_ad().await,
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown => {}
        }
    }
}

#[cfg(test)]
mod tests;
