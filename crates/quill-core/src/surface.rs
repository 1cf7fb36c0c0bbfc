//! The editing surface capability.
//!
//! The session never renders text. It talks to whatever widget hosts the
//! buffer through [`EditingSurface`]: load text, apply edits, bind commands
//! to key chords, switch themes, and listen for content changes.
//!
//! [`BufferSurface`] is a headless implementation over a rope, used by the
//! CLI and in tests.

use ropey::Rope;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::event::{EventBus, SurfaceEvent};
use crate::keymap::KeyChord;
use crate::{CoreError, CoreResult};

/// A command bound to a key chord. Receives the surface and the
/// command's arguments.
pub type CommandHandler =
    Arc<dyn Fn(&mut dyn EditingSurface, &[String]) -> CoreResult<()> + Send + Sync>;

/// Replacement of a character range with new text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// Character offsets, end exclusive
    pub range: Range<usize>,
    pub text: String,
}

impl TextEdit {
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    /// An edit replacing the whole of a `len`-character buffer.
    pub fn whole(len: usize, text: impl Into<String>) -> Self {
        Self::new(0..len, text)
    }
}

/// What the session needs from an editing widget.
pub trait EditingSurface {
    /// Full text of the content model, or `None` if no model is loaded.
    fn content(&self) -> Option<String>;

    /// Length of the content model in characters.
    fn len_chars(&self) -> Option<usize>;

    /// Loads text as the content model. Does not emit a change.
    fn set_content(&mut self, text: &str);

    /// Applies an edit and emits `ContentChanged`.
    fn apply_edit(&mut self, edit: TextEdit) -> CoreResult<()>;

    /// Binds a command to a chord, replacing any previous binding.
    fn register_command(&mut self, chord: KeyChord, handler: CommandHandler);

    /// Removes a binding. Returns false if nothing was bound.
    fn unregister_command(&mut self, chord: &KeyChord) -> bool;

    /// Runs the command bound to `chord`. Returns false if none is bound.
    fn run_command(&mut self, chord: &KeyChord, args: &[String]) -> CoreResult<bool>;

    fn set_theme(&mut self, theme: &str);

    fn theme(&self) -> &str;

    fn set_read_only(&mut self, read_only: bool);

    fn is_read_only(&self) -> bool;

    /// Subscribes to surface notifications.
    fn subscribe(&self) -> broadcast::Receiver<SurfaceEvent>;
}

/// Headless surface backed by a rope.
pub struct BufferSurface {
    model: Option<Rope>,
    commands: HashMap<KeyChord, CommandHandler>,
    theme: String,
    read_only: bool,
    events: EventBus<SurfaceEvent>,
}

impl BufferSurface {
    /// A surface with no content model loaded.
    pub fn new(theme: impl Into<String>) -> Self {
        Self {
            model: None,
            commands: HashMap::new(),
            theme: theme.into(),
            read_only: false,
            events: EventBus::new(),
        }
    }

    /// Drops the content model.
    pub fn unload(&mut self) {
        self.model = None;
    }

    /// Inserts text at a character offset, the way typing would.
    pub fn insert(&mut self, at: usize, text: &str) -> CoreResult<()> {
        self.apply_edit(TextEdit::new(at..at, text))
    }

    /// Chords with a bound command.
    pub fn commands(&self) -> impl Iterator<Item = &KeyChord> {
        self.commands.keys()
    }
}

impl Default for BufferSurface {
    fn default() -> Self {
        Self::new("vs-dark")
    }
}

impl fmt::Debug for BufferSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferSurface")
            .field("chars", &self.len_chars())
            .field("commands", &self.commands.len())
            .field("theme", &self.theme)
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl EditingSurface for BufferSurface {
    fn content(&self) -> Option<String> {
        self.model.as_ref().map(|rope| rope.to_string())
    }

    fn len_chars(&self) -> Option<usize> {
        self.model.as_ref().map(|rope| rope.len_chars())
    }

    fn set_content(&mut self, text: &str) {
        self.model = Some(Rope::from_str(text));
    }

    fn apply_edit(&mut self, edit: TextEdit) -> CoreResult<()> {
        if self.read_only {
            return Err(CoreError::Surface("surface is read-only".into()));
        }
        let rope = self
            .model
            .as_mut()
            .ok_or_else(|| CoreError::Surface("no content model loaded".into()))?;

        let Range { start, end } = edit.range;
        if start > end || end > rope.len_chars() {
            return Err(CoreError::Surface(format!(
                "edit range {}..{} outside 0..{}",
                start,
                end,
                rope.len_chars()
            )));
        }

        rope.remove(start..end);
        rope.insert(start, &edit.text);

        let text = rope.to_string();
        self.events.emit(SurfaceEvent::ContentChanged(text));
        Ok(())
    }

    fn register_command(&mut self, chord: KeyChord, handler: CommandHandler) {
        tracing::debug!(chord = %chord, "Registered surface command");
        self.commands.insert(chord, handler);
    }

    fn unregister_command(&mut self, chord: &KeyChord) -> bool {
        self.commands.remove(chord).is_some()
    }

    fn run_command(&mut self, chord: &KeyChord, args: &[String]) -> CoreResult<bool> {
        let Some(handler) = self.commands.get(chord).cloned() else {
            return Ok(false);
        };
        handler(self as &mut dyn EditingSurface, args)?;
        Ok(true)
    }

    fn set_theme(&mut self, theme: &str) {
        if self.theme != theme {
            self.theme = theme.to_string();
            self.events.emit(SurfaceEvent::ThemeChanged(self.theme.clone()));
        }
    }

    fn theme(&self) -> &str {
        &self.theme
    }

    fn set_read_only(&mut self, read_only: bool) {
        if self.read_only != read_only {
            self.read_only = read_only;
            self.events.emit(SurfaceEvent::ReadOnlyChanged(read_only));
        }
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn subscribe(&self) -> broadcast::Receiver<SurfaceEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::drain;

    #[test]
    fn test_no_model_until_loaded() {
        let mut surface = BufferSurface::default();
        assert_eq!(surface.content(), None);
        assert!(surface.insert(0, "x").is_err());

        surface.set_content("hello");
        assert_eq!(surface.content().as_deref(), Some("hello"));
        assert_eq!(surface.len_chars(), Some(5));
    }

    #[test]
    fn test_set_content_is_silent() {
        let mut surface = BufferSurface::default();
        let mut rx = surface.subscribe();
        surface.set_content("hello");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_apply_edit_emits_full_text() {
        let mut surface = BufferSurface::default();
        surface.set_content("hello world");
        let mut rx = surface.subscribe();

        surface.apply_edit(TextEdit::new(6..11, "rope")).unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![SurfaceEvent::ContentChanged("hello rope".into())]
        );
    }

    #[test]
    fn test_edit_range_checked() {
        let mut surface = BufferSurface::default();
        surface.set_content("abc");
        assert!(surface.apply_edit(TextEdit::new(2..9, "x")).is_err());
        assert_eq!(surface.content().as_deref(), Some("abc"));
    }

    #[test]
    fn test_read_only_rejects_edits() {
        let mut surface = BufferSurface::default();
        surface.set_content("abc");
        surface.set_read_only(true);
        assert!(surface.insert(3, "d").is_err());

        surface.set_read_only(false);
        surface.insert(3, "d").unwrap();
        assert_eq!(surface.content().as_deref(), Some("abcd"));
    }

    #[test]
    fn test_run_command() {
        let mut surface = BufferSurface::default();
        surface.set_content("abc");

        let handler: CommandHandler = Arc::new(|surface: &mut dyn EditingSurface, args: &[String]| {
            let len = surface.len_chars().unwrap_or(0);
            surface.apply_edit(TextEdit::whole(len, args.join(" ")))
        });
        surface.register_command(KeyChord::ctrl('j'), handler);

        let ran = surface
            .run_command(&KeyChord::ctrl('j'), &["x".into(), "y".into()])
            .unwrap();
        assert!(ran);
        assert_eq!(surface.content().as_deref(), Some("x y"));

        assert!(surface.unregister_command(&KeyChord::ctrl('j')));
        assert!(!surface.run_command(&KeyChord::ctrl('j'), &[]).unwrap());
    }

    #[test]
    fn test_theme_change_emits_once() {
        let mut surface = BufferSurface::new("vs-dark");
        let mut rx = surface.subscribe();
        surface.set_theme("custom-dark");
        surface.set_theme("custom-dark");
        assert_eq!(
            drain(&mut rx),
            vec![SurfaceEvent::ThemeChanged("custom-dark".into())]
        );
    }
}
