//! Session management.
//!
//! `Session` owns the tab store and the token meter, and snapshots both to
//! a [`SessionStore`] after every change. Persistence is best-effort: a
//! failed write is logged and returned to the caller, but the in-memory
//! change stands.
//!
//! ## Persisted layout
//!
//! | key                          | value                                  |
//! |------------------------------|----------------------------------------|
//! | `<prefix>-tabs`              | `[{"name": .., "content": ..}, ..]`    |
//! | `<prefix>-active-tab`        | `"file1.js"` or `null`                 |
//! | `<prefix>-remaining-quota`   | `940`                                  |
//! | `<prefix>-charged-per-tab`   | `{"file1.js": 60}`                     |
//!
//! A snapshot exists iff the tabs key does.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;

use crate::config::SessionConfig;
use crate::event::{EventBus, SessionEvent};
use crate::meter::{ChargeOutcome, TokenMeter};
use crate::store::SessionStore;
use crate::tab::{Tab, TabStore};
use crate::{CoreError, CoreResult};

/// The full persisted snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub tabs: Vec<Tab>,
    pub active_tab: Option<String>,
    pub remaining_quota: u64,
    pub charged: HashMap<String, u64>,
}

/// Store keys for one session.
#[derive(Debug, Clone)]
struct StateKeys {
    tabs: String,
    active: String,
    quota: String,
    charged: String,
}

impl StateKeys {
    fn new(prefix: &str) -> Self {
        Self {
            tabs: format!("{prefix}-tabs"),
            active: format!("{prefix}-active-tab"),
            quota: format!("{prefix}-remaining-quota"),
            charged: format!("{prefix}-charged-per-tab"),
        }
    }

    fn all(&self) -> [&str; 4] {
        [&self.tabs, &self.active, &self.quota, &self.charged]
    }
}

/// One user's editing session.
pub struct Session<S: SessionStore> {
    tabs: TabStore,
    meter: TokenMeter,
    store: S,
    keys: StateKeys,
    config: SessionConfig,
    events: EventBus<SessionEvent>,
}

impl<S: SessionStore> Session<S> {
    /// Creates an empty, not yet bootstrapped session over `store`.
    pub fn new(store: S, config: SessionConfig, key_prefix: &str) -> Self {
        Self {
            tabs: TabStore::new(config.naming, config.new_tab_content.clone()),
            meter: TokenMeter::new(config.default_quota),
            store,
            keys: StateKeys::new(key_prefix),
            config,
            events: EventBus::new(),
        }
    }

    /// Creates and bootstraps a session. A failure to write the initial
    /// snapshot is logged and otherwise ignored.
    pub fn open(store: S, config: SessionConfig, key_prefix: &str) -> Self {
        let mut session = Self::new(store, config, key_prefix);
        if let Err(e) = session.bootstrap() {
            tracing::warn!("Session running without persistence: {}", e);
        }
        session
    }

    // ==================== Bootstrap ====================

    /// Loads the persisted snapshot, or builds the default state when there
    /// is none or it cannot be read. Always ends with an active tab.
    ///
    /// Only a failure to write the reconciled snapshot is returned.
    pub fn bootstrap(&mut self) -> CoreResult<()> {
        let (tabs, meter) = match self.load() {
            Ok(Some(loaded)) => loaded,
            Ok(None) => {
                tracing::info!("No persisted session, starting fresh");
                self.default_parts()
            }
            Err(e) => {
                tracing::warn!("Discarding persisted session: {}", e);
                self.default_parts()
            }
        };
        self.finish_bootstrap(tabs, meter)
    }

    /// Installs loaded or default parts, restores the active-tab invariant
    /// and writes the reconciled snapshot.
    fn finish_bootstrap(&mut self, tabs: TabStore, meter: TokenMeter) -> CoreResult<()> {
        self.tabs = tabs;
        self.meter = meter;

        if self.tabs.is_empty() {
            let tab = self.tabs.add_tab()?;
            self.events.emit(SessionEvent::TabAdded(tab.name.clone()));
        }

        if let Some(active) = self.tabs.active_name() {
            self.events.emit(SessionEvent::TabSelected(active.to_string()));
        }

        tracing::info!(
            tabs = self.tabs.len(),
            active = ?self.tabs.active_name(),
            remaining = self.meter.remaining(),
            "Bootstrapped session"
        );

        self.persist()
    }

    /// Drops the persisted snapshot and starts over with defaults.
    ///
    /// The store is never read back, so a store that refuses writes still
    /// leaves the session reset in memory.
    pub fn reset(&mut self) -> CoreResult<()> {
        for key in self.keys.all() {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, "Failed to remove persisted key: {}", e);
            }
        }
        tracing::info!("Reset session");
        let (tabs, meter) = self.default_parts();
        self.finish_bootstrap(tabs, meter)
    }

    fn default_parts(&self) -> (TabStore, TokenMeter) {
        (
            TabStore::new(self.config.naming, self.config.new_tab_content.clone()),
            TokenMeter::new(self.config.default_quota),
        )
    }

    fn load(&self) -> CoreResult<Option<(TabStore, TokenMeter)>> {
        let Some(tabs) = self.read_key::<Vec<Tab>>(&self.keys.tabs)? else {
            return Ok(None);
        };
        let active = self.read_key::<Option<String>>(&self.keys.active)?.flatten();
        let remaining = self
            .read_key::<u64>(&self.keys.quota)?
            .unwrap_or(self.config.default_quota);
        let charged = self
            .read_key::<HashMap<String, u64>>(&self.keys.charged)?
            .unwrap_or_default();

        let tabs = TabStore::restore(
            tabs,
            active,
            self.config.naming,
            self.config.new_tab_content.clone(),
        )
        .map_err(|e| CoreError::MalformedState {
            key: self.keys.tabs.clone(),
            reason: e.to_string(),
        })?;

        let mut meter = TokenMeter::restore(remaining, charged);
        meter.retain(|name| tabs.contains(name));

        Ok(Some((tabs, meter)))
    }

    fn read_key<T: DeserializeOwned>(&self, key: &str) -> CoreResult<Option<T>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CoreError::MalformedState {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    // ==================== Persistence ====================

    /// Writes the full snapshot to the store.
    pub fn persist(&mut self) -> CoreResult<()> {
        let result = self.write_snapshot();
        if let Err(e) = &result {
            tracing::warn!("Failed to persist session: {}", e);
            self.events.emit(SessionEvent::PersistFailed(e.to_string()));
        }
        result
    }

    fn write_snapshot(&mut self) -> CoreResult<()> {
        let tabs = serde_json::to_string(self.tabs.tabs())?;
        let active = serde_json::to_string(&self.tabs.active_name())?;
        let quota = serde_json::to_string(&self.meter.remaining())?;
        let charged = serde_json::to_string(self.meter.charges())?;

        self.store.set_many(&[
            (self.keys.tabs.as_str(), tabs.as_str()),
            (self.keys.active.as_str(), active.as_str()),
            (self.keys.quota.as_str(), quota.as_str()),
            (self.keys.charged.as_str(), charged.as_str()),
        ])?;
        Ok(())
    }

    // ==================== Tab Operations ====================

    /// Creates a new tab and makes it active.
    pub fn add_tab(&mut self) -> CoreResult<Tab> {
        let tab = self.tabs.add_tab()?;
        tracing::info!(tab = %tab.name, "Added tab");
        self.events.emit(SessionEvent::TabAdded(tab.name.clone()));
        self.events.emit(SessionEvent::TabSelected(tab.name.clone()));
        self.persist()?;
        Ok(tab)
    }

    /// Closes a tab. Returns false, and changes nothing, if it does not
    /// exist.
    pub fn close_tab(&mut self, name: &str) -> CoreResult<bool> {
        let was_active = self.tabs.active_name() == Some(name);
        if !self.tabs.close_tab(name) {
            return Ok(false);
        }
        self.meter.forget(name);

        tracing::info!(tab = %name, "Closed tab");
        self.events.emit(SessionEvent::TabClosed(name.to_string()));
        if was_active {
            if let Some(active) = self.tabs.active_name() {
                self.events.emit(SessionEvent::TabSelected(active.to_string()));
            }
        }

        self.persist()?;
        Ok(true)
    }

    /// Makes `name` the active tab.
    pub fn select_tab(&mut self, name: &str) -> CoreResult<()> {
        if self.tabs.active_name() == Some(name) {
            return Ok(());
        }
        self.tabs.select_tab(name)?;
        self.events.emit(SessionEvent::TabSelected(name.to_string()));
        self.persist()
    }

    // ==================== Editing ====================

    /// Applies a content change reported by the editing surface to the
    /// active tab and meters it.
    ///
    /// Empty or missing text, no active tab, and an exhausted quota are all
    /// silent no-ops (`Ok(None)`). Otherwise the content update and the
    /// charge are applied together.
    pub fn on_surface_edit(&mut self, new_text: Option<&str>) -> CoreResult<Option<ChargeOutcome>> {
        let Some(text) = new_text.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let Some(active) = self.tabs.active_name().map(str::to_string) else {
            return Ok(None);
        };
        if self.meter.is_exhausted() {
            tracing::debug!(tab = %active, "Edit ignored: {}", CoreError::QuotaExhausted);
            return Ok(None);
        }

        let outcome = self.meter.preview(&active, text);
        self.tabs.update_content(&active, text)?;
        self.meter.commit(&active, outcome);

        tracing::debug!(
            tab = %active,
            cost = outcome.cost,
            previous = outcome.previous,
            deducted = outcome.deducted,
            remaining = outcome.remaining,
            "Charged edit"
        );

        self.events.emit(SessionEvent::ContentChanged {
            tab: active,
            cost: outcome.cost,
        });
        if outcome.deducted > 0 {
            self.events.emit(SessionEvent::QuotaChanged {
                remaining: outcome.remaining,
            });
        }
        if outcome.exhausted() {
            tracing::info!("Edit quota exhausted");
            self.events.emit(SessionEvent::QuotaExhausted);
        }

        self.persist()?;
        Ok(Some(outcome))
    }

    // ==================== Queries ====================

    /// All tabs in display order.
    pub fn tabs(&self) -> &[Tab] {
        self.tabs.tabs()
    }

    /// A tab by name.
    pub fn tab(&self, name: &str) -> Option<&Tab> {
        self.tabs.get(name)
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.tabs.active()
    }

    /// Text of the active tab, for consumers that run or render it.
    pub fn active_content(&self) -> Option<&str> {
        self.tabs.active().map(|t| t.content.as_str())
    }

    pub fn remaining_quota(&self) -> u64 {
        self.meter.remaining()
    }

    /// Tokens charged to a tab so far (its high-water mark).
    pub fn charged(&self, name: &str) -> u64 {
        self.meter.charged(name)
    }

    /// True once the quota is spent; the surface should refuse edits.
    pub fn is_read_only(&self) -> bool {
        self.meter.is_exhausted()
    }

    /// A copy of the full session state.
    pub fn snapshot(&self) -> SessionState {
        SessionState {
            tabs: self.tabs.tabs().to_vec(),
            active_tab: self.tabs.active_name().map(str::to_string),
            remaining_quota: self.meter.remaining(),
            charged: self.meter.charges().clone(),
        }
    }

    /// Subscribes to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consumes the session, returning its store.
    pub fn into_store(self) -> S {
        self.store
    }
}
