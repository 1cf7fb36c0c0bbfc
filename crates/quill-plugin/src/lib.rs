//! # Quill Plugin System
//!
//! Plugins are named extensions that attach behavior to the editing
//! surface when activated and remove it when deactivated: binding a
//! command, switching the theme, and so on.
//!
//! ## Activation rules
//!
//! - A name is active iff its `activate` ran more recently than any
//!   `deactivate` for it.
//! - Loading a name that is already active logs a warning and does nothing.
//! - Unloading a name that is not active logs a warning and does nothing.
//! - `deactivate` runs at most once per `activate`.
//!
//! Registry state is process-local and never persisted.

pub mod builtin;

use std::collections::HashMap;

use quill_core::{CoreError, EditingSurface};

pub use builtin::{FindReplacePlugin, ThemePlugin};

/// Plugin system errors.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Plugin {name} failed to activate: {reason}")]
    ActivationFailed { name: String, reason: String },

    #[error("Plugin {name} failed to deactivate: {reason}")]
    DeactivationFailed { name: String, reason: String },

    #[error("Unknown plugin: {0}")]
    Unknown(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type PluginResult<T> = Result<T, PluginError>;

/// The capability every plugin provides.
///
/// The registry knows nothing else about a plugin; whatever it does to the
/// surface in `activate` it is expected to undo in `deactivate`.
pub trait Plugin: Send + Sync {
    /// Called when the plugin is loaded.
    fn activate(&mut self, surface: &mut dyn EditingSurface) -> PluginResult<()>;

    /// Called when the plugin is unloaded.
    fn deactivate(&mut self, surface: &mut dyn EditingSurface) -> PluginResult<()>;
}

/// Tracks active plugins for one editing surface.
#[derive(Default)]
pub struct PluginRegistry {
    active: HashMap<String, Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates `plugin` under `name`.
    ///
    /// Returns `Ok(false)` without touching the surface if `name` is
    /// already active. If `activate` fails the plugin is not recorded.
    pub fn load(
        &mut self,
        name: &str,
        mut plugin: Box<dyn Plugin>,
        surface: &mut dyn EditingSurface,
    ) -> PluginResult<bool> {
        if self.active.contains_key(name) {
            tracing::warn!(plugin = %name, "Plugin is already loaded");
            return Ok(false);
        }

        plugin
            .activate(surface)
            .map_err(|e| PluginError::ActivationFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        self.active.insert(name.to_string(), plugin);
        tracing::info!(plugin = %name, "Activated plugin");
        Ok(true)
    }

    /// Deactivates and forgets `name`.
    ///
    /// Returns `Ok(false)` if it was not active. The record is removed even
    /// when `deactivate` fails, so it is never called twice.
    pub fn unload(&mut self, name: &str, surface: &mut dyn EditingSurface) -> PluginResult<bool> {
        let Some(mut plugin) = self.active.remove(name) else {
            tracing::warn!(plugin = %name, "Plugin is not loaded");
            return Ok(false);
        };

        plugin
            .deactivate(surface)
            .map_err(|e| PluginError::DeactivationFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        tracing::info!(plugin = %name, "Deactivated plugin");
        Ok(true)
    }

    /// Deactivates every active plugin, for surface teardown.
    ///
    /// Every plugin is unloaded even if some fail; the first failure is
    /// returned.
    pub fn unload_all(&mut self, surface: &mut dyn EditingSurface) -> PluginResult<usize> {
        let names: Vec<String> = self.list_active().into_iter().map(String::from).collect();
        let mut first_err = None;

        for name in &names {
            if let Err(e) = self.unload(name, surface) {
                tracing::warn!("{}", e);
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(names.len()),
        }
    }

    /// Names of active plugins, sorted.
    pub fn list_active(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.active.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::BufferSurface;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counts {
        activated: AtomicUsize,
        deactivated: AtomicUsize,
    }

    struct Probe {
        counts: Arc<Counts>,
        fail_activate: bool,
        fail_deactivate: bool,
    }

    impl Probe {
        fn new(counts: &Arc<Counts>) -> Box<Self> {
            Box::new(Self {
                counts: Arc::clone(counts),
                fail_activate: false,
                fail_deactivate: false,
            })
        }
    }

    impl Plugin for Probe {
        fn activate(&mut self, _surface: &mut dyn EditingSurface) -> PluginResult<()> {
            if self.fail_activate {
                return Err(PluginError::Unknown("probe".into()));
            }
            self.counts.activated.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn deactivate(&mut self, _surface: &mut dyn EditingSurface) -> PluginResult<()> {
            self.counts.deactivated.fetch_add(1, Ordering::SeqCst);
            if self.fail_deactivate {
                return Err(PluginError::Unknown("probe".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_double_load_activates_once() {
        let mut surface = BufferSurface::default();
        let mut registry = PluginRegistry::new();
        let counts = Arc::new(Counts::default());

        assert!(registry.load("p", Probe::new(&counts), &mut surface).unwrap());
        assert!(!registry.load("p", Probe::new(&counts), &mut surface).unwrap());

        assert_eq!(counts.activated.load(Ordering::SeqCst), 1);
        assert_eq!(registry.list_active(), vec!["p"]);
    }

    #[test]
    fn test_unload_twice_is_noop() {
        let mut surface = BufferSurface::default();
        let mut registry = PluginRegistry::new();
        let counts = Arc::new(Counts::default());

        registry.load("p", Probe::new(&counts), &mut surface).unwrap();
        assert!(registry.unload("p", &mut surface).unwrap());
        assert!(!registry.unload("p", &mut surface).unwrap());

        assert_eq!(counts.deactivated.load(Ordering::SeqCst), 1);
        assert!(registry.list_active().is_empty());
    }

    #[test]
    fn test_unload_unknown_is_noop() {
        let mut surface = BufferSurface::default();
        let mut registry = PluginRegistry::new();
        assert!(!registry.unload("never-loaded", &mut surface).unwrap());
    }

    #[test]
    fn test_reload_after_unload() {
        let mut surface = BufferSurface::default();
        let mut registry = PluginRegistry::new();
        let counts = Arc::new(Counts::default());

        registry.load("p", Probe::new(&counts), &mut surface).unwrap();
        registry.unload("p", &mut surface).unwrap();
        assert!(registry.load("p", Probe::new(&counts), &mut surface).unwrap());

        assert_eq!(counts.activated.load(Ordering::SeqCst), 2);
        assert!(registry.is_active("p"));
    }

    #[test]
    fn test_failed_activation_is_not_recorded() {
        let mut surface = BufferSurface::default();
        let mut registry = PluginRegistry::new();
        let counts = Arc::new(Counts::default());
        let mut probe = Probe::new(&counts);
        probe.fail_activate = true;

        let err = registry.load("p", probe, &mut surface).unwrap_err();
        assert!(matches!(err, PluginError::ActivationFailed { .. }));
        assert!(!registry.is_active("p"));
    }

    #[test]
    fn test_failed_deactivation_still_unloads() {
        let mut surface = BufferSurface::default();
        let mut registry = PluginRegistry::new();
        let counts = Arc::new(Counts::default());
        let mut probe = Probe::new(&counts);
        probe.fail_deactivate = true;

        registry.load("p", probe, &mut surface).unwrap();
        assert!(registry.unload("p", &mut surface).is_err());
        assert!(!registry.is_active("p"));
        assert!(!registry.unload("p", &mut surface).unwrap());
        assert_eq!(counts.deactivated.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unload_all() {
        let mut surface = BufferSurface::default();
        let mut registry = PluginRegistry::new();
        let counts = Arc::new(Counts::default());

        registry.load("a", Probe::new(&counts), &mut surface).unwrap();
        registry.load("b", Probe::new(&counts), &mut surface).unwrap();

        assert_eq!(registry.unload_all(&mut surface).unwrap(), 2);
        assert!(registry.is_empty());
        assert_eq!(counts.deactivated.load(Ordering::SeqCst), 2);
    }
}
