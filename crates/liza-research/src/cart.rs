//! The user's keyword selection.
//!
//! Lives outside the search session: restarts, cancellations and stream
//! errors never touch it.

use std::fmt;

use crate::types::SelectionItem;

/// Notification sent to listeners after a successful mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    Added(SelectionItem),
    Removed(SelectionItem),
}

type Listener = Box<dyn Fn(&CartEvent) + Send + Sync>;

/// Insertion-ordered set of selected keywords, unique by exact keyword.
#[derive(Default)]
pub struct SelectionSet {
    items: Vec<SelectionItem>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionSet")
            .field("items", &self.items)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl SelectionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `item` unless an entry with the same keyword exists. Returns
    /// whether the set changed.
    pub fn add(&mut self, item: SelectionItem) -> bool {
        if self.contains(&item.keyword) {
            return false;
        }
        self.items.push(item.clone());
        self.notify(&CartEvent::Added(item));
        true
    }

    /// Removes the entry for `keyword`, if any.
    pub fn remove(&mut self, keyword: &str) -> Option<SelectionItem> {
        let idx = self.items.iter().position(|i| i.keyword == keyword)?;
        let removed = self.items.remove(idx);
        self.notify(&CartEvent::Removed(removed.clone()));
        Some(removed)
    }

    #[must_use]
    pub fn contains(&self, keyword: &str) -> bool {
        self.items.iter().any(|i| i.keyword == keyword)
    }

    #[must_use]
    pub fn list(&self) -> &[SelectionItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Registers a listener for add/remove notifications.
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: Fn(&CartEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&self, event: &CartEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}
