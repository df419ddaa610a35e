//! Tabstack Driver Protocol
//!
//! Line-delimited JSON messages exchanged with the `tabstack` driver: one
//! command per input line, one response per output line.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tabstack_core::{AnimationStyle, ItemKey, Placement, State, SwitcherEvent, TouchAction};

/// Commands understood by the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Feed a touch event.
    Touch {
        action: TouchAction,
        x: f32,
        y: f32,
        /// Event time; the driver clock is used when omitted.
        #[serde(default)]
        time_ms: Option<u64>,
        #[serde(default)]
        pointer_id: u32,
    },

    /// Add a tab.
    AddTab {
        title: String,
        #[serde(default)]
        icon: Option<String>,
        #[serde(default = "default_closeable")]
        closeable: bool,
        /// Tab index; the front of the stack when omitted.
        #[serde(default)]
        index: Option<usize>,
        #[serde(default)]
        style: AnimationStyle,
        #[serde(default)]
        parameters: BTreeMap<String, String>,
    },

    /// Remove a tab.
    RemoveTab {
        id: u64,
        #[serde(default)]
        style: AnimationStyle,
    },

    SelectTab {
        id: u64,
    },

    /// Remove every tab.
    Clear,

    ShowSwitcher,
    HideSwitcher,
    ToggleSwitcher,

    ShowAddButton {
        shown: bool,
    },

    /// Resize the container.
    Resize {
        width: f32,
        height: f32,
    },

    /// Advance the virtual clock (script mode).
    Advance {
        ms: u64,
    },

    /// Report every bound surface.
    Query,
    /// Drain the recorded switcher events.
    Events,

    /// Write the switcher state to the state file.
    Save,
    /// Replace the switcher state with the contents of the state file.
    Restore,

    /// Stop the driver.
    Stop,
}

fn default_closeable() -> bool {
    true
}

/// Responses written by the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    /// Command executed successfully.
    Ok,
    /// Command failed.
    Error {
        message: String,
    },
    /// A tab was added.
    TabAdded {
        id: u64,
    },
    /// Current placements.
    Frame {
        time_ms: u64,
        shown: bool,
        animating: bool,
        placements: Vec<PlacementInfo>,
    },
    /// Drained events, oldest first.
    Events {
        events: Vec<SwitcherEvent>,
    },
}

impl Response {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Kind of item a placement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Tab,
    AddButton,
}

/// Wire form of a [`Placement`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementInfo {
    /// Tab id, absent for the add button.
    #[serde(default)]
    pub id: Option<u64>,
    pub kind: ItemKind,
    /// Index in the visible sequence, absent while a removed tab animates out.
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub state: Option<State>,
    /// Position along the dragging axis.
    #[serde(default)]
    pub position: Option<f32>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub rotation_x: f32,
    pub rotation_y: f32,
    pub alpha: f32,
    pub visible: bool,
}

impl From<&Placement> for PlacementInfo {
    fn from(placement: &Placement) -> Self {
        let (id, kind) = match placement.key {
            ItemKey::Tab(id) => (Some(id.0), ItemKind::Tab),
            ItemKey::AddButton => (None, ItemKind::AddButton),
        };
        let surface = &placement.surface;
        Self {
            id,
            kind,
            index: placement.index,
            state: placement.tag.map(|tag| tag.state),
            position: placement
                .tag
                .map(|tag| tag.position)
                .filter(|position| position.is_finite()),
            x: surface.x,
            y: surface.y,
            width: surface.width,
            height: surface.height,
            scale: surface.scale,
            rotation_x: surface.rotation_x,
            rotation_y: surface.rotation_y,
            alpha: surface.alpha,
            visible: surface.visible,
        }
    }
}

/// Parse one input line. Returns `None` for blank lines and `#` comments.
pub fn parse_command(line: &str) -> Option<Result<Command, serde_json::Error>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(serde_json::from_str(line))
}

/// Encode a response as one output line, newline included.
pub fn encode_response(response: &Response) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabstack_core::{Surface, SwipeDirection, TabId, Tag};

    #[test]
    fn test_command_serialization() {
        let cmd = Command::ShowSwitcher;
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"type":"show_switcher"}"#);

        let cmd2: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(cmd, cmd2);
    }

    #[test]
    fn test_touch_defaults() {
        let cmd: Command =
            serde_json::from_str(r#"{"type":"touch","action":"down","x":10,"y":20.5}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Touch {
                action: TouchAction::Down,
                x: 10.0,
                y: 20.5,
                time_ms: None,
                pointer_id: 0,
            }
        );
    }

    #[test]
    fn test_add_tab_defaults() {
        let cmd: Command = serde_json::from_str(r#"{"type":"add_tab","title":"News"}"#).unwrap();
        match cmd {
            Command::AddTab {
                title,
                icon,
                closeable,
                index,
                style,
                parameters,
            } => {
                assert_eq!(title, "News");
                assert!(icon.is_none());
                assert!(closeable);
                assert!(index.is_none());
                assert_eq!(style, AnimationStyle::default());
                assert!(parameters.is_empty());
            }
            other => panic!("Expected AddTab, got {:?}", other),
        }
    }

    #[test]
    fn test_remove_tab_with_style() {
        let cmd: Command = serde_json::from_str(
            r#"{"type":"remove_tab","id":3,"style":{"style":"swipe","direction":"left"}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::RemoveTab {
                id: 3,
                style: AnimationStyle::Swipe {
                    direction: SwipeDirection::Left,
                    duration_ms: None,
                },
            }
        );
    }

    #[test]
    fn test_response_serialization() {
        let json = encode_response(&Response::TabAdded { id: 7 }).unwrap();
        assert_eq!(json, "{\"status\":\"tab_added\",\"id\":7}\n");

        let resp: Response = serde_json::from_str(json.trim()).unwrap();
        assert_eq!(resp, Response::TabAdded { id: 7 });
    }

    #[test]
    fn test_events_response() {
        let resp = Response::Events {
            events: vec![
                SwitcherEvent::TabAdded {
                    id: TabId(1),
                    index: 0,
                },
                SwitcherEvent::SwitcherShown,
            ],
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""event":"tab_added""#));
        assert!(json.contains(r#""event":"switcher_shown""#));
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, resp);
    }

    #[test]
    fn test_error_response() {
        let resp = Response::error("Tab #4 not found");
        if let Response::Error { message } = resp {
            assert_eq!(message, "Tab #4 not found");
        } else {
            panic!("Expected Error response");
        }
    }

    #[test]
    fn test_placement_info() {
        let placement = Placement {
            key: ItemKey::Tab(TabId(2)),
            index: Some(1),
            tag: Some(Tag::new(500.0, State::Floating)),
            surface: Surface {
                visible: true,
                ..Surface::default()
            },
        };
        let info = PlacementInfo::from(&placement);
        assert_eq!(info.id, Some(2));
        assert_eq!(info.kind, ItemKind::Tab);
        assert_eq!(info.state, Some(State::Floating));
        assert_eq!(info.position, Some(500.0));
        assert!(info.visible);

        let detaching = Placement {
            key: ItemKey::AddButton,
            index: None,
            tag: Some(Tag::default()),
            surface: Surface::default(),
        };
        let info = PlacementInfo::from(&detaching);
        assert_eq!(info.kind, ItemKind::AddButton);
        assert!(info.id.is_none());
        assert!(info.position.is_none());
    }

    #[test]
    fn test_parse_command_skips_comments() {
        assert!(parse_command("").is_none());
        assert!(parse_command("   # setup").is_none());
        assert!(matches!(
            parse_command(r#"{"type":"advance","ms":16}"#),
            Some(Ok(Command::Advance { ms: 16 }))
        ));
        assert!(matches!(parse_command("not json"), Some(Err(_))));
    }

    #[test]
    fn test_invalid_json_handling() {
        let result: Result<Command, _> = serde_json::from_str(r#"{"type": "unknown_command"}"#);
        assert!(result.is_err());

        let result: Result<Response, _> = serde_json::from_str(r#"{"status": "invalid"}"#);
        assert!(result.is_err());
    }
}
