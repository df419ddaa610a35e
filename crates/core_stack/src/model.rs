//! Item model: the ordered tab collection and the per-item layout tags.
//!
//! Tags are owned by the model and keyed by item identity. Tab ids are handed
//! out by a monotonic counter and never reused, so a newly added tab can never
//! inherit the tag of a tab that was removed before it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::StackError;

/// Stable identity of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of an item in the visible sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKey {
    /// The virtual "add tab" affordance, always at index 0 when shown.
    AddButton,
    /// A real tab.
    Tab(TabId),
}

impl ItemKey {
    pub fn tab_id(self) -> Option<TabId> {
        match self {
            ItemKey::Tab(id) => Some(id),
            ItemKey::AddButton => None,
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::AddButton => write!(f, "add-button"),
            ItemKey::Tab(id) => write!(f, "tab {}", id),
        }
    }
}

/// Discrete visual regime of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Part of the start stack, below another stacked card.
    StackedStart,
    /// Topmost card of the start stack.
    StackedStartAtop,
    /// Freely positioned between the stacks.
    Floating,
    /// Part of the end stack.
    StackedEnd,
    /// Not rendered.
    #[default]
    Hidden,
}

impl State {
    pub fn is_visible(self) -> bool {
        self != State::Hidden
    }

    pub fn is_stacked_at_start(self) -> bool {
        matches!(self, State::StackedStart | State::StackedStartAtop)
    }
}

/// Mutable layout state of one item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tag {
    /// Offset along the dragging axis; NaN until first computed.
    pub position: f32,
    pub state: State,
    /// Set while the item is dragged or animated toward removal.
    pub closing: bool,
}

impl Default for Tag {
    fn default() -> Self {
        Self {
            position: f32::NAN,
            state: State::Hidden,
            closing: false,
        }
    }
}

impl Tag {
    pub fn new(position: f32, state: State) -> Self {
        Self {
            position,
            state,
            closing: false,
        }
    }

    /// Whether a position has been computed for this tag.
    pub fn is_resolved(&self) -> bool {
        !self.position.is_nan()
    }
}

/// Description of a tab to be added.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TabSpec {
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_closeable")]
    pub closeable: bool,
    /// Opaque parameters carried for the host.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

fn default_closeable() -> bool {
    true
}

impl TabSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            icon: None,
            closeable: true,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn closeable(mut self, closeable: bool) -> Self {
        self.closeable = closeable;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// A tab owned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub closeable: bool,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Tab {
    fn from_spec(id: TabId, spec: TabSpec) -> Self {
        Self {
            id,
            title: spec.title,
            icon: spec.icon,
            closeable: spec.closeable,
            parameters: spec.parameters,
        }
    }
}

/// An item of the visible sequence together with a copy of its tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Item {
    pub index: usize,
    pub key: ItemKey,
    pub tag: Tag,
}

/// The ordered tab collection.
#[derive(Debug, Clone, Default)]
pub struct TabModel {
    tabs: Vec<Tab>,
    tags: HashMap<ItemKey, Tag>,
    selected: Option<TabId>,
    add_button_shown: bool,
    next_id: u64,
}

impl TabModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of visible positions: tabs plus the add button when shown.
    pub fn count(&self) -> usize {
        self.tabs.len() + usize::from(self.add_button_shown)
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    pub fn contains(&self, key: ItemKey) -> bool {
        match key {
            ItemKey::AddButton => self.add_button_shown,
            ItemKey::Tab(id) => self.tab(id).is_some(),
        }
    }

    pub fn add_button_shown(&self) -> bool {
        self.add_button_shown
    }

    /// Show or hide the add button. Hiding it drops its tag.
    pub fn set_add_button_shown(&mut self, shown: bool) {
        self.add_button_shown = shown;
        if !shown {
            self.tags.remove(&ItemKey::AddButton);
        }
    }

    fn offset(&self) -> usize {
        usize::from(self.add_button_shown)
    }

    /// Visible index of the tab with the given id.
    pub fn index_of(&self, id: TabId) -> Option<usize> {
        self.tabs
            .iter()
            .position(|tab| tab.id == id)
            .map(|position| position + self.offset())
    }

    /// Visible index of an item.
    pub fn item_index(&self, key: ItemKey) -> Option<usize> {
        match key {
            ItemKey::AddButton => self.add_button_shown.then_some(0),
            ItemKey::Tab(id) => self.index_of(id),
        }
    }

    /// Key of the item at a visible index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not in `[0, count)`.
    pub fn key_at(&self, index: usize) -> ItemKey {
        assert!(
            index < self.count(),
            "item index {} out of bounds (count: {})",
            index,
            self.count()
        );
        if self.add_button_shown {
            if index == 0 {
                ItemKey::AddButton
            } else {
                ItemKey::Tab(self.tabs[index - 1].id)
            }
        } else {
            ItemKey::Tab(self.tabs[index].id)
        }
    }

    /// The item at a visible index with a copy of its current tag.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not in `[0, count)`.
    pub fn item_at(&self, index: usize) -> Item {
        let key = self.key_at(index);
        Item {
            index,
            key,
            tag: self.stored_tag(key),
        }
    }

    /// Keys of all items in visible order.
    pub fn keys(&self) -> impl Iterator<Item = ItemKey> + '_ {
        self.add_button_shown
            .then_some(ItemKey::AddButton)
            .into_iter()
            .chain(self.tabs.iter().map(|tab| ItemKey::Tab(tab.id)))
    }

    /// A copy of the item's tag, or the default tag if none was created yet.
    pub fn stored_tag(&self, key: ItemKey) -> Tag {
        self.tags.get(&key).copied().unwrap_or_default()
    }

    /// The item's tag, created lazily.
    pub fn tag_mut(&mut self, key: ItemKey) -> &mut Tag {
        self.tags.entry(key).or_default()
    }

    pub fn set_tag(&mut self, key: ItemKey, tag: Tag) {
        if self.contains(key) {
            self.tags.insert(key, tag);
        }
    }

    /// Write back the tags of resolved items.
    pub fn apply(&mut self, items: &[Item]) {
        for item in items {
            self.set_tag(item.key, item.tag);
        }
    }

    /// Forget every computed layout.
    pub fn reset_tags(&mut self) {
        self.tags.clear();
    }

    pub fn is_closeable(&self, key: ItemKey) -> bool {
        match key {
            ItemKey::AddButton => false,
            ItemKey::Tab(id) => self.tab(id).is_some_and(|tab| tab.closeable),
        }
    }

    pub fn selected(&self) -> Option<TabId> {
        self.selected
    }

    /// Visible index of the selected tab.
    pub fn selected_index(&self) -> Option<usize> {
        self.selected.and_then(|id| self.index_of(id))
    }

    pub fn is_selected(&self, key: ItemKey) -> bool {
        key.tab_id().is_some() && key.tab_id() == self.selected
    }

    pub fn select(&mut self, id: TabId) -> Result<(), StackError> {
        if self.tab(id).is_none() {
            return Err(StackError::TabNotFound(id));
        }
        self.selected = Some(id);
        Ok(())
    }

    /// Insert a tab at a tab index (not counting the add button).
    ///
    /// The first tab added to an empty model becomes selected.
    pub fn insert_tab(&mut self, spec: TabSpec, tab_index: usize) -> Result<TabId, StackError> {
        if tab_index > self.tabs.len() {
            return Err(StackError::IndexOutOfBounds(tab_index, self.tabs.len()));
        }

        let id = TabId(self.next_id);
        self.next_id += 1;
        self.tabs.insert(tab_index, Tab::from_spec(id, spec));

        if self.selected.is_none() {
            self.selected = Some(id);
        }
        Ok(id)
    }

    /// Remove a tab, returning its former visible index and the tab itself.
    ///
    /// When the selected tab is removed, its predecessor (or the new first tab)
    /// becomes selected.
    pub fn remove_tab(&mut self, id: TabId) -> Result<(usize, Tab), StackError> {
        let position = self
            .tabs
            .iter()
            .position(|tab| tab.id == id)
            .ok_or(StackError::TabNotFound(id))?;
        let index = position + self.offset();
        let tab = self.tabs.remove(position);
        self.tags.remove(&ItemKey::Tab(id));

        if self.selected == Some(id) {
            self.selected = if self.tabs.is_empty() {
                None
            } else {
                Some(self.tabs[position.saturating_sub(1).min(self.tabs.len() - 1)].id)
            };
        }
        Ok((index, tab))
    }

    /// Remove all tabs.
    pub fn clear(&mut self) -> Vec<Tab> {
        self.selected = None;
        self.tags.retain(|key, _| *key == ItemKey::AddButton);
        std::mem::take(&mut self.tabs)
    }

    /// Replace the collection with restored tabs. Ids keep their values and the
    /// id allocator resumes above the largest one.
    pub fn restore(
        &mut self,
        tabs: Vec<Tab>,
        selected: Option<TabId>,
        add_button_shown: bool,
    ) -> Result<(), StackError> {
        if let Some(id) = selected {
            if !tabs.iter().any(|tab| tab.id == id) {
                return Err(StackError::SnapshotMismatch(format!(
                    "selected tab {} is not part of the snapshot",
                    id
                )));
            }
        }
        let max_id = tabs.iter().map(|tab| tab.id.0).max();
        self.next_id = self.next_id.max(max_id.map_or(0, |id| id + 1));
        self.tabs = tabs;
        self.tags.clear();
        self.selected = selected;
        self.add_button_shown = add_button_shown;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with(count: usize) -> (TabModel, Vec<TabId>) {
        let mut model = TabModel::new();
        let ids = (0..count)
            .map(|i| {
                model
                    .insert_tab(TabSpec::new(format!("Tab {}", i)), i)
                    .unwrap()
            })
            .collect();
        (model, ids)
    }

    #[test]
    fn test_empty_model() {
        let model = TabModel::new();
        assert!(model.is_empty());
        assert_eq!(model.count(), 0);
        assert_eq!(model.selected(), None);
    }

    #[test]
    fn test_first_tab_becomes_selected() {
        let (model, ids) = model_with(3);
        assert_eq!(model.count(), 3);
        assert_eq!(model.selected(), Some(ids[0]));
        assert_eq!(model.selected_index(), Some(0));
    }

    #[test]
    fn test_add_button_shifts_indices() {
        let (mut model, ids) = model_with(2);
        model.set_add_button_shown(true);
        assert_eq!(model.count(), 3);
        assert_eq!(model.key_at(0), ItemKey::AddButton);
        assert_eq!(model.key_at(1), ItemKey::Tab(ids[0]));
        assert_eq!(model.index_of(ids[1]), Some(2));
        assert!(!model.is_closeable(ItemKey::AddButton));

        let keys: Vec<_> = model.keys().collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0], ItemKey::AddButton);
    }

    #[test]
    fn test_tag_created_lazily() {
        let (mut model, ids) = model_with(1);
        let key = ItemKey::Tab(ids[0]);
        let tag = model.stored_tag(key);
        assert!(!tag.is_resolved());
        assert_eq!(tag.state, State::Hidden);

        model.tag_mut(key).position = 42.0;
        assert_eq!(model.stored_tag(key).position, 42.0);
    }

    #[test]
    fn test_new_tab_never_inherits_removed_tag() {
        let (mut model, ids) = model_with(2);
        let key = ItemKey::Tab(ids[1]);
        model.set_tag(key, Tag::new(100.0, State::Floating));
        model.remove_tab(ids[1]).unwrap();

        let id = model.insert_tab(TabSpec::new("Again"), 1).unwrap();
        assert_ne!(id, ids[1]);
        assert!(!model.stored_tag(ItemKey::Tab(id)).is_resolved());
    }

    #[test]
    fn test_remove_selected_selects_predecessor() {
        let (mut model, ids) = model_with(3);
        model.select(ids[2]).unwrap();
        let (index, tab) = model.remove_tab(ids[2]).unwrap();
        assert_eq!(index, 2);
        assert_eq!(tab.id, ids[2]);
        assert_eq!(model.selected(), Some(ids[1]));

        model.select(ids[0]).unwrap();
        model.remove_tab(ids[0]).unwrap();
        assert_eq!(model.selected(), Some(ids[1]));

        model.remove_tab(ids[1]).unwrap();
        assert_eq!(model.selected(), None);
    }

    #[test]
    fn test_remove_unknown_tab() {
        let (mut model, _) = model_with(1);
        assert_eq!(
            model.remove_tab(TabId(99)),
            Err(StackError::TabNotFound(TabId(99)))
        );
    }

    #[test]
    fn test_insert_out_of_bounds() {
        let (mut model, _) = model_with(1);
        assert_eq!(
            model.insert_tab(TabSpec::new("x"), 5),
            Err(StackError::IndexOutOfBounds(5, 1))
        );
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_key_at_out_of_bounds_panics() {
        let (model, _) = model_with(2);
        model.key_at(2);
    }

    #[test]
    fn test_set_tag_ignores_unknown_items() {
        let (mut model, _) = model_with(1);
        model.set_tag(ItemKey::Tab(TabId(77)), Tag::new(1.0, State::Floating));
        assert!(!model.stored_tag(ItemKey::Tab(TabId(77))).is_resolved());
    }

    #[test]
    fn test_clear_keeps_add_button() {
        let (mut model, _) = model_with(3);
        model.set_add_button_shown(true);
        let removed = model.clear();
        assert_eq!(removed.len(), 3);
        assert_eq!(model.count(), 1);
        assert_eq!(model.selected(), None);
    }

    #[test]
    fn test_restore_resumes_ids() {
        let (source, _) = model_with(3);
        let tabs = source.tabs().to_vec();
        let selected = source.selected();

        let mut model = TabModel::new();
        model.restore(tabs, selected, false).unwrap();
        assert_eq!(model.count(), 3);
        let id = model.insert_tab(TabSpec::new("new"), 0).unwrap();
        assert_eq!(id, TabId(3));
    }

    #[test]
    fn test_restore_rejects_unknown_selection() {
        let mut model = TabModel::new();
        assert!(matches!(
            model.restore(Vec::new(), Some(TabId(4)), false),
            Err(StackError::SnapshotMismatch(_))
        ));
    }

    #[test]
    fn test_tab_spec_builder() {
        let spec = TabSpec::new("Docs")
            .with_icon("doc.png")
            .closeable(false)
            .with_parameter("url", "https://example.org");
        assert_eq!(spec.icon.as_deref(), Some("doc.png"));
        assert!(!spec.closeable);
        assert_eq!(spec.parameters.get("url").map(String::as_str), Some("https://example.org"));
    }
}
