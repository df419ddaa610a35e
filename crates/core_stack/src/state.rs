//! Persisted switcher state.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{ItemKey, Tab, TabId};
use crate::StackError;

/// Reference item of a saved stack layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FirstVisible {
    pub key: ItemKey,
    pub position: f32,
}

/// Opaque per-tab state of the content shown inside the cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentState {
    #[serde(default)]
    was_shown: BTreeMap<TabId, bool>,
    #[serde(default)]
    blobs: BTreeMap<TabId, Vec<u8>>,
}

impl ContentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that the content of a tab has been displayed at least once.
    pub fn mark_shown(&mut self, id: TabId) {
        self.was_shown.insert(id, true);
    }

    pub fn was_shown(&self, id: TabId) -> bool {
        self.was_shown.get(&id).copied().unwrap_or(false)
    }

    pub fn save_blob(&mut self, id: TabId, blob: Vec<u8>) {
        self.blobs.insert(id, blob);
    }

    pub fn blob(&self, id: TabId) -> Option<&[u8]> {
        self.blobs.get(&id).map(Vec::as_slice)
    }

    /// Forget everything stored for a tab.
    pub fn remove(&mut self, id: TabId) {
        self.was_shown.remove(&id);
        self.blobs.remove(&id);
    }

    /// Keep only the entries of the given tabs.
    pub fn retain(&mut self, ids: &BTreeSet<TabId>) {
        self.was_shown.retain(|id, _| ids.contains(id));
        self.blobs.retain(|id, _| ids.contains(id));
    }

    pub fn clear(&mut self) {
        self.was_shown.clear();
        self.blobs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.was_shown.is_empty() && self.blobs.is_empty()
    }
}

/// Everything needed to rebuild a switcher after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitcherSnapshot {
    pub tabs: Vec<Tab>,
    pub selected: Option<TabId>,
    pub switcher_shown: bool,
    pub add_button_shown: bool,
    /// Item the stack was laid out around, if it was shown.
    #[serde(default)]
    pub first_visible: Option<FirstVisible>,
    #[serde(default)]
    pub content: ContentState,
}

impl SwitcherSnapshot {
    /// Check that the snapshot describes a consistent model.
    pub fn validate(&self) -> Result<(), StackError> {
        let mut ids = BTreeSet::new();
        for tab in &self.tabs {
            if !ids.insert(tab.id) {
                return Err(StackError::SnapshotMismatch(format!(
                    "tab {} appears twice",
                    tab.id
                )));
            }
        }
        if let Some(selected) = self.selected {
            if !ids.contains(&selected) {
                return Err(StackError::SnapshotMismatch(format!(
                    "selected tab {} is not part of the snapshot",
                    selected
                )));
            }
        } else if !self.tabs.is_empty() {
            return Err(StackError::SnapshotMismatch(
                "tabs without a selection".to_string(),
            ));
        }
        if let Some(first_visible) = &self.first_visible {
            let known = match first_visible.key {
                ItemKey::AddButton => self.add_button_shown,
                ItemKey::Tab(id) => ids.contains(&id),
            };
            if !known {
                return Err(StackError::SnapshotMismatch(format!(
                    "first visible item {} is not part of the snapshot",
                    first_visible.key
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TabModel, TabSpec};

    fn snapshot() -> SwitcherSnapshot {
        let mut model = TabModel::new();
        let first = model.insert_tab(TabSpec::new("one"), 0).unwrap();
        model
            .insert_tab(TabSpec::new("two").with_parameter("url", "about:blank"), 1)
            .unwrap();
        let mut content = ContentState::new();
        content.mark_shown(first);
        content.save_blob(first, vec![1, 2, 3]);
        SwitcherSnapshot {
            tabs: model.tabs().to_vec(),
            selected: Some(first),
            switcher_shown: true,
            add_button_shown: false,
            first_visible: Some(FirstVisible {
                key: ItemKey::Tab(first),
                position: 320.0,
            }),
            content,
        }
    }

    #[test]
    fn test_snapshot_json() {
        let snapshot = snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: SwitcherSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, snapshot);
        assert!(restored.validate().is_ok());
        assert!(restored.content.was_shown(TabId(0)));
        assert_eq!(restored.content.blob(TabId(0)), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_content_defaults_when_missing() {
        let json = r#"{"tabs":[],"selected":null,"switcher_shown":false,"add_button_shown":true}"#;
        let snapshot: SwitcherSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.content.is_empty());
        assert!(snapshot.first_visible.is_none());
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inconsistent_snapshots() {
        let mut duplicate = snapshot();
        duplicate.tabs.push(duplicate.tabs[0].clone());
        assert!(matches!(
            duplicate.validate(),
            Err(StackError::SnapshotMismatch(_))
        ));

        let mut unknown = snapshot();
        unknown.selected = Some(TabId(99));
        assert!(unknown.validate().is_err());

        let mut unselected = snapshot();
        unselected.selected = None;
        assert!(unselected.validate().is_err());

        let mut add_button = snapshot();
        add_button.first_visible = Some(FirstVisible {
            key: ItemKey::AddButton,
            position: 0.0,
        });
        assert!(add_button.validate().is_err());
    }

    #[test]
    fn test_content_retain() {
        let mut content = ContentState::new();
        content.mark_shown(TabId(1));
        content.mark_shown(TabId(2));
        content.save_blob(TabId(2), vec![7]);
        content.retain(&BTreeSet::from([TabId(1)]));
        assert!(content.was_shown(TabId(1)));
        assert!(!content.was_shown(TabId(2)));
        assert!(content.blob(TabId(2)).is_none());
        content.remove(TabId(1));
        assert!(content.is_empty());
    }
}
