//! Wires a session, an editing surface and the plugin registry together.
//!
//! The surface reports every content change as an event; the workbench
//! drains those into [`Session::on_surface_edit`] after each action and
//! keeps the surface read-only once the quota is spent.

use anyhow::{Context, Result};
use tokio::sync::broadcast;

use quill_core::event::drain;
use quill_core::{
    BufferSurface, Config, EditingSurface, KeyChord, Session, SessionStore, SurfaceEvent, Tab,
    TextEdit, replace_edit,
};
use quill_plugin::{PluginRegistry, builtin};

pub struct Workbench<S: SessionStore> {
    session: Session<S>,
    surface: BufferSurface,
    plugins: PluginRegistry,
    changes: broadcast::Receiver<SurfaceEvent>,
}

impl<S: SessionStore> Workbench<S> {
    /// Bootstraps a session over `store` and loads its active tab.
    pub fn open(store: S, config: &Config) -> Self {
        let session = Session::open(
            store,
            config.session.clone(),
            &config.storage.key_prefix,
        );
        let surface = BufferSurface::new(config.surface.theme.clone());
        Self::new(session, surface)
    }

    pub fn new(session: Session<S>, surface: BufferSurface) -> Self {
        let changes = surface.subscribe();
        let mut workbench = Self {
            session,
            surface,
            plugins: PluginRegistry::new(),
            changes,
        };
        workbench.load_active();
        workbench
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn surface(&self) -> &BufferSurface {
        &self.surface
    }

    // ==================== Tabs ====================

    pub fn add_tab(&mut self) -> Result<Tab> {
        let result = self.session.add_tab();
        self.load_active();
        Ok(result?)
    }

    pub fn close_tab(&mut self, name: &str) -> Result<bool> {
        let result = self.session.close_tab(name);
        self.load_active();
        Ok(result?)
    }

    pub fn select_tab(&mut self, name: &str) -> Result<()> {
        let result = self.session.select_tab(name);
        self.load_active();
        Ok(result?)
    }

    /// Discards the persisted session and starts over with defaults.
    pub fn reset(&mut self) -> Result<()> {
        let result = self.session.reset();
        self.load_active();
        Ok(result?)
    }

    /// Loads the active tab into the surface without emitting a change.
    fn load_active(&mut self) {
        match self.session.active_content() {
            Some(text) => self.surface.set_content(text),
            None => self.surface.unload(),
        }
        // Loading is not an edit; drop anything queued before it.
        drain(&mut self.changes);
        self.sync_read_only();
    }

    fn sync_read_only(&mut self) {
        self.surface.set_read_only(self.session.is_read_only());
    }

    // ==================== Editing ====================

    /// Appends text at the end of the buffer, the way typing would.
    pub fn type_text(&mut self, text: &str) -> Result<()> {
        let end = self
            .surface
            .len_chars()
            .context("no tab is open")?;
        self.surface.insert(end, text)?;
        self.pump()
    }

    /// Replaces the whole buffer.
    pub fn write_all(&mut self, text: &str) -> Result<()> {
        let len = self.surface.len_chars().context("no tab is open")?;
        self.surface.apply_edit(TextEdit::whole(len, text))?;
        self.pump()
    }

    /// Regex replace-all over the active buffer. Returns false when
    /// nothing was applied (empty pattern or no open tab).
    pub fn replace_all(&mut self, pattern: &str, replacement: &str) -> Result<bool> {
        let Some(edit) = replace_edit(&self.surface, pattern, replacement)? else {
            return Ok(false);
        };
        self.surface.apply_edit(edit)?;
        self.pump()?;
        Ok(true)
    }

    /// Runs a surface command. Returns false if nothing is bound to
    /// `chord`.
    pub fn run_command(&mut self, chord: &KeyChord, args: &[String]) -> Result<bool> {
        let ran = self.surface.run_command(chord, args);
        self.pump()?;
        Ok(ran?)
    }

    /// Feeds queued surface changes to the session.
    ///
    /// Every change is offered even if an earlier one failed to persist;
    /// the first error is returned.
    pub fn pump(&mut self) -> Result<()> {
        let mut first_err = None;
        for event in drain(&mut self.changes) {
            if let SurfaceEvent::ContentChanged(text) = event {
                if let Err(e) = self.session.on_surface_edit(Some(text.as_str())) {
                    first_err.get_or_insert(e);
                }
            }
        }

        if self.session.is_read_only() {
            // Edits refused by the session must not linger on the surface.
            self.load_active();
        } else {
            self.sync_read_only();
        }

        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    // ==================== Plugins ====================

    pub fn load_plugin(&mut self, name: &str) -> Result<bool> {
        let plugin = builtin::builtin(name)?;
        Ok(self.plugins.load(name, plugin, &mut self.surface)?)
    }

    pub fn unload_plugin(&mut self, name: &str) -> Result<bool> {
        Ok(self.plugins.unload(name, &mut self.surface)?)
    }

    pub fn active_plugins(&self) -> Vec<&str> {
        self.plugins.list_active()
    }

    /// Deactivates all plugins before the surface goes away.
    pub fn shutdown(&mut self) -> Result<()> {
        self.plugins.unload_all(&mut self.surface)?;
        Ok(())
    }
}
