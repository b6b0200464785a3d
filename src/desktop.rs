use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tauri::{AppHandle, Emitter, Manager, State, WebviewUrl, WebviewWindowBuilder};
use tauri_plugin_clipboard_manager::ClipboardExt;
use tauri_plugin_dialog::DialogExt;
use tauri_plugin_opener::OpenerExt;

use crate::app::{AppView, KeyResponse};
use crate::editor::{Block, BlockAction, BlockDocument, BlockTree};
use crate::focus::{ActivePanel, Panel, PanelHandle, TOGGLE_KEYS};
use crate::naming;
use crate::player::{MediaTransport, PlayerStatus};
use crate::save::{SaveBridge, SaveOutcome};
use crate::settings::{self, Settings};
use crate::sidebar::{HostBridge, HostError, Toast};

// ── Frontend bridges ───────────────────────────────────────────────────────

// Media commands the webview's video element carries out
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum MediaCommand {
    Load { source: String },
    Seek { seconds: f64 },
    Play,
    Pause,
    SetRate { rate: f64 },
    SetMuted { muted: bool },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PanelFocusEvent {
    panel: Panel,
    focus: bool,
}

pub struct WebviewTransport {
    app: AppHandle,
    time: f64,
    paused: bool,
}

impl WebviewTransport {
    fn new(app: AppHandle) -> Self {
        Self {
            app,
            time: 0.0,
            paused: true,
        }
    }

    fn send(&self, command: MediaCommand) {
        if let Err(e) = self.app.emit("player-command", command) {
            tracing::warn!("failed to emit player command: {}", e);
        }
    }

    fn set_reported_time(&mut self, seconds: f64) {
        self.time = seconds;
    }

    fn set_reported_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}

impl PanelHandle for WebviewTransport {
    fn focus(&mut self) {
        emit_panel_focus(&self.app, Panel::Player, true);
    }

    fn blur(&mut self) {
        emit_panel_focus(&self.app, Panel::Player, false);
    }
}

impl MediaTransport for WebviewTransport {
    fn load(&mut self, source: &str) {
        self.time = 0.0;
        self.paused = true;
        self.send(MediaCommand::Load {
            source: source.to_string(),
        });
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn seek_to(&mut self, seconds: f64) {
        self.time = seconds;
        self.send(MediaCommand::Seek { seconds });
    }

    fn play(&mut self) {
        self.paused = false;
        self.send(MediaCommand::Play);
    }

    fn pause(&mut self) {
        self.paused = true;
        self.send(MediaCommand::Pause);
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.send(MediaCommand::SetRate { rate });
    }

    fn set_muted(&mut self, muted: bool) {
        self.send(MediaCommand::SetMuted { muted });
    }
}

pub struct WebviewPanel {
    app: AppHandle,
    panel: Panel,
}

impl PanelHandle for WebviewPanel {
    fn focus(&mut self) {
        emit_panel_focus(&self.app, self.panel, true);
    }

    fn blur(&mut self) {
        emit_panel_focus(&self.app, self.panel, false);
    }
}

fn emit_panel_focus(app: &AppHandle, panel: Panel, focus: bool) {
    if let Err(e) = app.emit("panel-focus", PanelFocusEvent { panel, focus }) {
        tracing::warn!(panel = panel.as_str(), "failed to emit focus event: {}", e);
    }
}

pub struct TauriHost {
    app: AppHandle,
}

impl HostBridge for TauriHost {
    fn pick_folder(&self) -> Option<PathBuf> {
        self.app
            .dialog()
            .file()
            .blocking_pick_folder()
            .and_then(|path| path.into_path().ok())
    }

    fn read_clipboard_text(&self) -> Result<String, HostError> {
        self.app
            .clipboard()
            .read_text()
            .map_err(|e| HostError::Clipboard(e.to_string()))
    }

    fn write_clipboard_text(&self, text: &str) -> Result<(), HostError> {
        self.app
            .clipboard()
            .write_text(text.to_string())
            .map_err(|e| HostError::Clipboard(e.to_string()))
    }
}

// ── App state ──────────────────────────────────────────────────────────────

type View = AppView<WebviewTransport, WebviewPanel>;

pub struct DesktopState {
    view: Mutex<View>,
    bridge: SaveBridge,
    settings: RwLock<Settings>,
    settings_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SidebarStatus {
    folder: Option<String>,
    video_source: Option<String>,
    can_save: bool,
    saving: bool,
}

fn lock_view<'a>(state: &'a State<'_, DesktopState>) -> Result<std::sync::MutexGuard<'a, View>, String> {
    state.view.lock().map_err(|_| "Failed to lock view state".to_string())
}

fn sidebar_status(view: &View, bridge: &SaveBridge) -> SidebarStatus {
    let sidebar = view.sidebar();
    SidebarStatus {
        folder: sidebar.folder().map(|p| p.to_string_lossy().into_owned()),
        video_source: sidebar.video_source().map(str::to_string),
        can_save: sidebar.can_save(),
        saving: bridge.is_busy(),
    }
}

fn remember_folder(state: &DesktopState, folder: &Path) -> anyhow::Result<()> {
    let mut settings = state.settings.write().expect("settings write lock");
    settings.last_folder = Some(folder.to_string_lossy().into_owned());
    settings::save_settings(&state.settings_path, &settings)
}

// TAURI COMMANDS

// Runs off the main thread so the blocking dialog can't stall the event
// loop. The dialog must finish before the view lock is taken.
#[tauri::command]
async fn select_folder(app: AppHandle, state: State<'_, DesktopState>) -> Result<String, String> {
    let picked = TauriHost { app }.pick_folder();
    let folder = {
        let mut view = lock_view(&state)?;
        view.sidebar_mut()
            .apply_picked_folder(picked)
            .map(Path::to_path_buf)
            .ok_or("No folder selected")?
    };

    if let Err(e) = remember_folder(&state, &folder) {
        tracing::warn!("could not persist last folder: {}", e);
    }
    Ok(folder.to_string_lossy().into_owned())
}

#[tauri::command]
fn get_sidebar(state: State<DesktopState>) -> Result<SidebarStatus, String> {
    let view = lock_view(&state)?;
    Ok(sidebar_status(&view, &state.bridge))
}

#[tauri::command]
async fn get_next_filename(folder_path: String) -> Result<String, String> {
    naming::next_filename(Path::new(&folder_path))
        .await
        .map_err(|e| e.to_string())
}

/// Saves the current video into the selected folder. Both come from the
/// sidebar state set by `select_folder`, `insert_link` and
/// `set_video_source`, so the command takes no arguments. Returns `None`
/// while either is missing and the save action is disabled.
#[tauri::command]
async fn save_video(state: State<'_, DesktopState>) -> Result<Option<SaveOutcome>, String> {
    // Disabled until both a folder and a video are set
    let request = {
        let view = lock_view(&state)?;
        view.sidebar().save_request()
    };
    let Some(request) = request else {
        return Ok(None);
    };

    state
        .bridge
        .save(&request)
        .await
        .map(Some)
        .map_err(|e| e.to_string())
}

#[tauri::command]
fn insert_link(app: AppHandle, state: State<DesktopState>) -> Result<Option<Toast>, String> {
    let host = TauriHost { app };
    let mut view = lock_view(&state)?;
    Ok(view.insert_link(&host))
}

#[tauri::command]
fn copy_to_clipboard(app: AppHandle, state: State<DesktopState>) -> Result<Option<Toast>, String> {
    let host = TauriHost { app };
    let view = lock_view(&state)?;
    Ok(view.sidebar().copy_video_url(&host))
}

#[tauri::command]
fn set_video_source(source: String, state: State<DesktopState>) -> Result<bool, String> {
    let mut view = lock_view(&state)?;
    Ok(view.set_video_source(&source))
}

/// Keys the frontend must `preventDefault()` on synchronously, in its own
/// keydown listener. The answer from `key_down` arrives after the browser
/// has already run the default action.
#[tauri::command]
fn toggle_keys() -> Vec<&'static str> {
    TOGGLE_KEYS.to_vec()
}

/// Routes a keydown. `prevent_default` in the response is informational
/// only; toggle keys have to be suppressed up front (see `toggle_keys`).
#[tauri::command]
fn key_down(key: String, state: State<DesktopState>) -> Result<KeyResponse, String> {
    let mut view = lock_view(&state)?;
    Ok(view.key_down(&key))
}

#[tauri::command]
fn panel_focused(panel: Panel, state: State<DesktopState>) -> Result<ActivePanel, String> {
    let mut view = lock_view(&state)?;
    view.panel_focused(panel);
    Ok(view.active())
}

#[tauri::command]
fn panel_blurred(panel: Panel, state: State<DesktopState>) -> Result<(), String> {
    let mut view = lock_view(&state)?;
    view.panel_blurred(panel);
    Ok(())
}

#[tauri::command]
fn toggle_focus(state: State<DesktopState>) -> Result<Option<Panel>, String> {
    let mut view = lock_view(&state)?;
    Ok(view.toggle_focus())
}

#[tauri::command]
fn report_progress(
    played_seconds: f64,
    paused: Option<bool>,
    state: State<DesktopState>,
) -> Result<PlayerStatus, String> {
    let mut view = lock_view(&state)?;
    let player = view.player_mut();
    player.transport_mut().set_reported_time(played_seconds);
    if let Some(paused) = paused {
        player.transport_mut().set_reported_paused(paused);
    }
    player.report_progress(played_seconds);
    Ok(player.status())
}

#[tauri::command]
fn report_duration(seconds: f64, state: State<DesktopState>) -> Result<PlayerStatus, String> {
    let mut view = lock_view(&state)?;
    view.player_mut().report_duration(seconds);
    Ok(view.player().status())
}

#[tauri::command]
fn seek_to_percent(percent: f64, state: State<DesktopState>) -> Result<PlayerStatus, String> {
    let mut view = lock_view(&state)?;
    view.player_mut().seek_to_percent(percent);
    Ok(view.player().status())
}

#[tauri::command]
fn apply_block_action(
    blocks: Vec<Block>,
    action: BlockAction,
    state: State<DesktopState>,
) -> Result<Vec<Block>, String> {
    let mut doc = BlockTree::new(blocks);
    let mut view = lock_view(&state)?;
    view.editor_action(&mut doc, &action)
        .map_err(|e| e.to_string())?;
    Ok(doc.blocks().to_vec())
}

#[tauri::command]
fn get_settings(state: State<DesktopState>) -> Settings {
    state.settings.read().expect("settings read lock").clone()
}

#[tauri::command]
fn update_settings(new_settings: Settings, state: State<DesktopState>) -> Result<(), String> {
    {
        let mut view = lock_view(&state)?;
        view.player_mut().set_keymap(new_settings.keymap.clone());
    }
    {
        let mut settings = state.settings.write().expect("settings write lock");
        *settings = new_settings;
    }

    let settings = state.settings.read().expect("settings read lock");
    settings::save_settings(&state.settings_path, &settings).map_err(|e| e.to_string())?;

    Ok(())
}

#[tauri::command]
fn reveal_saved_video(app: AppHandle, path: String) -> Result<(), String> {
    app.opener()
        .reveal_item_in_dir(&path)
        .map_err(|e| e.to_string())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    crate::logging::init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_clipboard_manager::init())
        .setup(|app| {
            let settings_path = settings::settings_path(&app.path().app_data_dir()?)?;
            let settings = settings::load_settings(&settings_path);

            let handle = app.handle().clone();
            let mut view = AppView::new(
                WebviewTransport::new(handle.clone()),
                WebviewPanel {
                    app: handle,
                    panel: Panel::Editor,
                },
                settings.keymap.clone(),
            );
            if let Some(folder) = settings.startup_folder() {
                tracing::info!(folder = %folder.display(), "restoring last folder");
                view.sidebar_mut().set_folder(folder);
            }

            WebviewWindowBuilder::new(app, "main", WebviewUrl::default())
                .title("")
                .inner_size(settings.window.width, settings.window.height)
                .theme(Some(tauri::Theme::Dark))
                .build()?;

            app.manage(DesktopState {
                view: Mutex::new(view),
                bridge: SaveBridge::new(),
                settings: RwLock::new(settings),
                settings_path,
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            select_folder,
            get_sidebar,
            get_next_filename,
            save_video,
            insert_link,
            copy_to_clipboard,
            set_video_source,
            toggle_keys,
            key_down,
            panel_focused,
            panel_blurred,
            toggle_focus,
            report_progress,
            report_duration,
            seek_to_percent,
            apply_block_action,
            get_settings,
            update_settings,
            reveal_saved_video,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
