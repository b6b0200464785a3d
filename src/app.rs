use serde::Serialize;

use crate::editor::{BlockAction, BlockDocument, EditorError, EditorPanel};
use crate::focus::{ActivePanel, FocusCommand, FocusEvent, FocusRouter, KeyRoute, Panel, PanelHandle};
use crate::player::{Keymap, MediaTransport, PlayerPanel};
use crate::sidebar::{HostBridge, Sidebar, Toast};

// What the frontend should do with a key it forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyResponse {
    pub prevent_default: bool,
    pub handled: bool,
    pub focus: Option<Panel>,
}

/// The whole window: sidebar, player and editor wired through one router.
pub struct AppView<T: MediaTransport, E: PanelHandle> {
    router: FocusRouter,
    player: PlayerPanel<T>,
    editor: EditorPanel<E>,
    sidebar: Sidebar,
}

impl<T: MediaTransport, E: PanelHandle> AppView<T, E> {
    pub fn new(transport: T, editor_handle: E, keymap: Keymap) -> Self {
        Self {
            router: FocusRouter::new(),
            player: PlayerPanel::new(transport, keymap),
            editor: EditorPanel::new(editor_handle),
            sidebar: Sidebar::new(),
        }
    }

    pub fn active(&self) -> ActivePanel {
        self.router.active()
    }

    pub fn player(&self) -> &PlayerPanel<T> {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut PlayerPanel<T> {
        &mut self.player
    }

    pub fn editor(&self) -> &EditorPanel<E> {
        &self.editor
    }

    pub fn sidebar(&self) -> &Sidebar {
        &self.sidebar
    }

    pub fn sidebar_mut(&mut self) -> &mut Sidebar {
        &mut self.sidebar
    }

    pub fn key_down(&mut self, key: &str) -> KeyResponse {
        match self.router.route_key(key) {
            KeyRoute::Toggle {
                command,
                prevent_default,
            } => {
                let FocusCommand::Focus(panel) = command;
                self.focus_panel(panel);
                KeyResponse {
                    prevent_default,
                    handled: true,
                    focus: Some(panel),
                }
            }
            KeyRoute::Deliver(Panel::Player) => {
                let handled = self.player.handle_key(key, self.router.active());
                KeyResponse {
                    prevent_default: handled,
                    handled,
                    focus: None,
                }
            }
            // The editor consumes its own typing natively
            KeyRoute::Deliver(Panel::Editor) => KeyResponse::default(),
        }
    }

    fn focus_panel(&mut self, panel: Panel) {
        match panel {
            Panel::Player => self.player.focus(),
            Panel::Editor => self.editor.focus(),
        }
    }

    pub fn panel_focused(&mut self, panel: Panel) {
        let event = match panel {
            Panel::Player => self.player.on_focus(),
            Panel::Editor => self.editor.on_focus(),
        };
        self.router.handle(event);
    }

    pub fn panel_blurred(&mut self, panel: Panel) {
        if panel == Panel::Player {
            self.player.on_blur();
        }
    }

    pub fn toggle_focus(&mut self) -> Option<Panel> {
        let FocusCommand::Focus(panel) = self.router.handle(FocusEvent::ToggleKeyPressed)?;
        self.focus_panel(panel);
        Some(panel)
    }

    pub fn set_video_source(&mut self, source: &str) -> bool {
        match self.sidebar.set_video_source(source) {
            Some(stored) => {
                let stored = stored.to_string();
                self.player.set_source(&stored);
                true
            }
            None => false,
        }
    }

    pub fn insert_link<H: HostBridge>(&mut self, host: &H) -> Option<Toast> {
        let toast = self.sidebar.insert_link(host)?;
        if let Some(source) = self.sidebar.video_source().map(str::to_string) {
            self.player.set_source(&source);
        }
        Some(toast)
    }

    pub fn editor_action<D: BlockDocument>(
        &mut self,
        doc: &mut D,
        action: &BlockAction,
    ) -> Result<bool, EditorError> {
        let active = self.router.active();
        self.editor.run_action(doc, action, active)
    }
}
