//! Plugins shipped with Quill.

use std::sync::Arc;

use quill_core::{CommandHandler, EditingSurface, KeyChord, replace_edit};

use crate::{Plugin, PluginError, PluginResult};

/// Name the find/replace plugin is registered under.
pub const FIND_REPLACE: &str = "find-replace";

/// Name the theme plugin is registered under.
pub const THEME: &str = "theme";

/// Names of every built-in plugin.
pub const BUILTINS: [&str; 2] = [FIND_REPLACE, THEME];

/// Creates a built-in plugin by name.
pub fn builtin(name: &str) -> PluginResult<Box<dyn Plugin>> {
    match name {
        FIND_REPLACE => Ok(Box::new(FindReplacePlugin::default())),
        THEME => Ok(Box::new(ThemePlugin::default())),
        _ => Err(PluginError::Unknown(name.to_string())),
    }
}

/// Binds a replace-all command to a chord (`Ctrl+H` by default).
///
/// The command takes `[pattern, replacement]`. The pattern is a regular
/// expression; a missing or empty pattern does nothing. The result is
/// applied as one edit spanning the whole buffer.
pub struct FindReplacePlugin {
    chord: KeyChord,
}

impl FindReplacePlugin {
    pub fn new(chord: KeyChord) -> Self {
        Self { chord }
    }

    fn handler() -> CommandHandler {
        Arc::new(|surface: &mut dyn EditingSurface, args: &[String]| {
            let pattern = args.first().map(String::as_str).unwrap_or_default();
            let replacement = args.get(1).map(String::as_str).unwrap_or_default();

            match replace_edit(surface, pattern, replacement)? {
                Some(edit) => surface.apply_edit(edit),
                None => Ok(()),
            }
        })
    }
}

impl Default for FindReplacePlugin {
    fn default() -> Self {
        Self::new(KeyChord::ctrl('h'))
    }
}

impl Plugin for FindReplacePlugin {
    fn activate(&mut self, surface: &mut dyn EditingSurface) -> PluginResult<()> {
        surface.register_command(self.chord, Self::handler());
        Ok(())
    }

    fn deactivate(&mut self, surface: &mut dyn EditingSurface) -> PluginResult<()> {
        surface.unregister_command(&self.chord);
        Ok(())
    }
}

/// Switches the surface to a custom theme while active.
pub struct ThemePlugin {
    theme: String,
    previous: Option<String>,
}

impl ThemePlugin {
    pub fn new(theme: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            previous: None,
        }
    }
}

impl Default for ThemePlugin {
    fn default() -> Self {
        Self::new("custom-dark")
    }
}

impl Plugin for ThemePlugin {
    fn activate(&mut self, surface: &mut dyn EditingSurface) -> PluginResult<()> {
        self.previous = Some(surface.theme().to_string());
        surface.set_theme(&self.theme);
        Ok(())
    }

    fn deactivate(&mut self, surface: &mut dyn EditingSurface) -> PluginResult<()> {
        let previous = self.previous.take().unwrap_or_else(|| "vs-dark".to_string());
        surface.set_theme(&previous);
        Ok(())
    }
}
