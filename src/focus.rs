use serde::{Deserialize, Serialize};

// The two panels that can hold input focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    Player,
    Editor,
}

impl Panel {
    pub fn other(self) -> Panel {
        match self {
            Panel::Player => Panel::Editor,
            Panel::Editor => Panel::Player,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Panel::Player => "player",
            Panel::Editor => "editor",
        }
    }
}

// Which panel currently owns keyboard input. `None` only shows up while a
// toggle is being resolved; the router itself never rests there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivePanel {
    Player,
    Editor,
    None,
}

impl ActivePanel {
    pub fn panel(self) -> Option<Panel> {
        match self {
            ActivePanel::Player => Some(Panel::Player),
            ActivePanel::Editor => Some(Panel::Editor),
            ActivePanel::None => None,
        }
    }
}

impl From<Panel> for ActivePanel {
    fn from(panel: Panel) -> Self {
        match panel {
            Panel::Player => ActivePanel::Player,
            Panel::Editor => ActivePanel::Editor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEvent {
    /// A panel received native input focus (pointer click, tab, ...).
    PanelFocused(Panel),
    ToggleKeyPressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "command", content = "panel", rename_all = "lowercase")]
pub enum FocusCommand {
    Focus(Panel),
}

/// Imperative focus handle implemented by whatever renders a panel.
pub trait PanelHandle {
    fn focus(&mut self);
    fn blur(&mut self);
}

/// Where a key press should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRoute {
    /// The toggle key was consumed by the router. The key's default effect
    /// (inserting the character) must be suppressed.
    Toggle {
        command: FocusCommand,
        prevent_default: bool,
    },
    /// Hand the key to this panel and no other.
    Deliver(Panel),
}

pub const TOGGLE_KEYS: [&str; 2] = ["`", "\u{00B7}"];

pub fn is_toggle_key(key: &str) -> bool {
    TOGGLE_KEYS.contains(&key)
}

/// Tracks the active panel and decides where focus moves.
///
/// The router never blurs the previously active panel; the panel that
/// receives focus takes native focus away from it.
#[derive(Debug, Clone)]
pub struct FocusRouter {
    active: ActivePanel,
}

impl Default for FocusRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusRouter {
    pub fn new() -> Self {
        Self {
            active: ActivePanel::Player,
        }
    }

    pub fn active(&self) -> ActivePanel {
        self.active
    }

    pub fn is_active(&self, panel: Panel) -> bool {
        self.active == ActivePanel::from(panel)
    }

    pub fn handle(&mut self, event: FocusEvent) -> Option<FocusCommand> {
        match event {
            FocusEvent::PanelFocused(panel) => {
                self.active = panel.into();
                None
            }
            FocusEvent::ToggleKeyPressed => {
                let next = match self.active.panel() {
                    Some(current) => current.other(),
                    None => Panel::Player,
                };
                self.active = next.into();
                tracing::debug!(panel = next.as_str(), "focus toggled");
                Some(FocusCommand::Focus(next))
            }
        }
    }

    pub fn route_key(&mut self, key: &str) -> KeyRoute {
        if is_toggle_key(key) {
            // handle() always yields a command for a toggle
            let command = self
                .handle(FocusEvent::ToggleKeyPressed)
                .unwrap_or(FocusCommand::Focus(Panel::Player));
            return KeyRoute::Toggle {
                command,
                prevent_default: true,
            };
        }

        // Outside a toggle the router always rests on a working panel
        KeyRoute::Deliver(self.active.panel().unwrap_or(Panel::Player))
    }
}
