//! Tab storage.
//!
//! A tab is a named buffer. The name is both the label shown to the user
//! and the lookup key, so the store never holds two tabs with the same
//! name, and the active reference always names a tab that exists.

use serde::{Deserialize, Serialize};

use crate::config::TabNaming;
use crate::{CoreError, CoreResult};

/// One named, independently editable buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub name: String,
    pub content: String,
}

impl Tab {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Ordered collection of tabs plus the active selection.
#[derive(Debug, Clone)]
pub struct TabStore {
    /// Tabs in display order
    tabs: Vec<Tab>,

    /// Name of the active tab
    active: Option<String>,

    /// Tab that was active before the last `add_tab`; cleared by any
    /// other selection change or content update
    return_to: Option<String>,

    naming: TabNaming,

    new_tab_content: String,
}

impl TabStore {
    /// Creates an empty store.
    pub fn new(naming: TabNaming, new_tab_content: impl Into<String>) -> Self {
        Self {
            tabs: Vec::new(),
            active: None,
            return_to: None,
            naming,
            new_tab_content: new_tab_content.into(),
        }
    }

    /// Rebuilds a store from persisted parts.
    ///
    /// Duplicate names are rejected. A missing or dangling `active` falls
    /// back to the first tab.
    pub fn restore(
        tabs: Vec<Tab>,
        active: Option<String>,
        naming: TabNaming,
        new_tab_content: impl Into<String>,
    ) -> CoreResult<Self> {
        for (i, tab) in tabs.iter().enumerate() {
            if tabs[..i].iter().any(|t| t.name == tab.name) {
                return Err(CoreError::DuplicateTab(tab.name.clone()));
            }
        }

        let active = match active {
            Some(name) if tabs.iter().any(|t| t.name == name) => Some(name),
            _ => tabs.first().map(|t| t.name.clone()),
        };

        Ok(Self {
            tabs,
            active,
            return_to: None,
            naming,
            new_tab_content: new_tab_content.into(),
        })
    }

    /// Name the next `add_tab` would use.
    pub fn next_name(&self) -> String {
        let base = self.tabs.len() + 1;
        match self.naming {
            TabNaming::Count => format!("file{base}.js"),
            TabNaming::Monotonic => (base..)
                .map(|n| format!("file{n}.js"))
                .find(|name| !self.contains(name))
                .unwrap_or_else(|| format!("file{base}.js")),
        }
    }

    /// Creates a tab with a generated name and makes it active.
    ///
    /// Under [`TabNaming::Count`] the generated name can already be taken
    /// once tabs have been closed; that case fails with `DuplicateTab` and
    /// leaves the store untouched.
    pub fn add_tab(&mut self) -> CoreResult<Tab> {
        let name = self.next_name();
        if self.contains(&name) {
            return Err(CoreError::DuplicateTab(name));
        }

        let tab = Tab::new(name.clone(), self.new_tab_content.clone());
        self.tabs.push(tab.clone());
        self.return_to = self.active.replace(name);
        Ok(tab)
    }

    /// Removes a tab. Returns false if no tab had that name.
    ///
    /// Closing the active tab activates the tab it was opened from, if it
    /// was added and then closed with no edit or selection in between.
    /// Otherwise the first remaining tab becomes active. The return slot is
    /// not persisted, so after a reload the first tab is always used.
    pub fn close_tab(&mut self, name: &str) -> bool {
        let Some(idx) = self.position(name) else {
            return false;
        };
        self.tabs.remove(idx);

        if self.active.as_deref() == Some(name) {
            let restored = self.return_to.take().filter(|prev| self.contains(prev));
            self.active = restored.or_else(|| self.tabs.first().map(|t| t.name.clone()));
        } else if self.return_to.as_deref() == Some(name) {
            self.return_to = None;
        }

        true
    }

    /// Makes `name` the active tab.
    pub fn select_tab(&mut self, name: &str) -> CoreResult<()> {
        if !self.contains(name) {
            return Err(CoreError::no_tab(name));
        }
        if self.active.as_deref() != Some(name) {
            self.active = Some(name.to_string());
            self.return_to = None;
        }
        Ok(())
    }

    /// Replaces a tab's content verbatim.
    pub fn update_content(&mut self, name: &str, text: &str) -> CoreResult<()> {
        let tab = self
            .tabs
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| CoreError::no_tab(name))?;
        tab.content = text.to_string();
        self.return_to = None;
        Ok(())
    }

    /// Returns a tab by name.
    pub fn get(&self, name: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.name == name)
    }

    /// Returns true if a tab has this name.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.name == name)
    }

    /// Name of the active tab.
    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The active tab.
    pub fn active(&self) -> Option<&Tab> {
        self.active.as_deref().and_then(|name| self.get(name))
    }

    /// All tabs in display order.
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}
