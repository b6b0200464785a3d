use serde::{Deserialize, Serialize};

use crate::focus::{ActivePanel, FocusEvent, Panel, PanelHandle};

// Playback speed cycle: 0.5x -> 1x -> 2x -> 0.5x
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackSpeed {
    Half,
    #[default]
    Normal,
    Double,
}

impl PlaybackSpeed {
    pub fn next(self) -> Self {
        match self {
            PlaybackSpeed::Half => PlaybackSpeed::Normal,
            PlaybackSpeed::Normal => PlaybackSpeed::Double,
            PlaybackSpeed::Double => PlaybackSpeed::Half,
        }
    }

    pub fn rate(self) -> f64 {
        match self {
            PlaybackSpeed::Half => 0.5,
            PlaybackSpeed::Normal => 1.0,
            PlaybackSpeed::Double => 2.0,
        }
    }
}

// Seek step cycle: 1s -> 2s -> 5s -> 1s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipInterval {
    #[default]
    One,
    Two,
    Five,
}

impl SkipInterval {
    pub fn next(self) -> Self {
        match self {
            SkipInterval::One => SkipInterval::Two,
            SkipInterval::Two => SkipInterval::Five,
            SkipInterval::Five => SkipInterval::One,
        }
    }

    pub fn seconds(self) -> f64 {
        match self {
            SkipInterval::One => 1.0,
            SkipInterval::Two => 2.0,
            SkipInterval::Five => 5.0,
        }
    }
}

// Transport key bindings, stored in settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Keymap {
    pub seek_back: String,
    pub seek_forward: String,
    pub play_pause: String,
    pub cycle_skip: String,
    pub cycle_speed: String,
    pub toggle_mute: String,
}

impl Default for Keymap {
    fn default() -> Self {
        Self {
            seek_back: "ArrowLeft".to_string(),
            seek_forward: "ArrowRight".to_string(),
            play_pause: " ".to_string(),
            cycle_skip: "s".to_string(),
            cycle_speed: "x".to_string(),
            toggle_mute: "m".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAction {
    SeekBack,
    SeekForward,
    PlayPause,
    CycleSkip,
    CycleSpeed,
    ToggleMute,
}

impl Keymap {
    pub fn action_for(&self, key: &str) -> Option<TransportAction> {
        let table = [
            (&self.seek_back, TransportAction::SeekBack),
            (&self.seek_forward, TransportAction::SeekForward),
            (&self.play_pause, TransportAction::PlayPause),
            (&self.cycle_skip, TransportAction::CycleSkip),
            (&self.cycle_speed, TransportAction::CycleSpeed),
            (&self.toggle_mute, TransportAction::ToggleMute),
        ];
        table
            .into_iter()
            .find(|(bound, _)| bound.as_str() == key)
            .map(|(_, action)| action)
    }
}

/// The media component doing the actual decoding and playback.
pub trait MediaTransport: PanelHandle {
    fn load(&mut self, source: &str);
    fn current_time(&self) -> f64;
    fn seek_to(&mut self, seconds: f64);
    fn play(&mut self);
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn set_playback_rate(&mut self, rate: f64);
    fn set_muted(&mut self, muted: bool);
}

// Snapshot sent to the frontend after each change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    pub source: Option<String>,
    pub progress: f64,
    pub duration: f64,
    pub speed: f64,
    pub skip_seconds: f64,
    pub muted: bool,
}

pub struct PlayerPanel<T: MediaTransport> {
    transport: T,
    keymap: Keymap,
    source: Option<String>,
    progress: f64,
    duration: f64,
    speed: PlaybackSpeed,
    skip: SkipInterval,
    muted: bool,
}

impl<T: MediaTransport> PlayerPanel<T> {
    pub fn new(transport: T, keymap: Keymap) -> Self {
        Self {
            transport,
            keymap,
            source: None,
            progress: 0.0,
            duration: 0.0,
            speed: PlaybackSpeed::default(),
            skip: SkipInterval::default(),
            muted: false,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn set_keymap(&mut self, keymap: Keymap) {
        self.keymap = keymap;
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn skip(&self) -> SkipInterval {
        self.skip
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_source(&mut self, source: &str) {
        self.transport.load(source);
        self.source = Some(source.to_string());
        self.progress = 0.0;
        self.duration = 0.0;
    }

    /// Runs the transport action bound to `key`. Returns whether the key
    /// was consumed; keys are ignored unless the player is the active panel.
    pub fn handle_key(&mut self, key: &str, active: ActivePanel) -> bool {
        if active != ActivePanel::Player {
            return false;
        }
        let Some(action) = self.keymap.action_for(key) else {
            return false;
        };
        self.apply(action);
        true
    }

    fn apply(&mut self, action: TransportAction) {
        match action {
            TransportAction::SeekBack => {
                let target = (self.transport.current_time() - self.skip.seconds()).max(0.0);
                self.transport.seek_to(target);
                self.transport.pause();
                self.progress = target;
            }
            TransportAction::SeekForward => {
                let mut target = self.transport.current_time() + self.skip.seconds();
                if self.duration > 0.0 {
                    target = target.min(self.duration);
                }
                self.transport.seek_to(target);
                self.transport.pause();
                self.progress = target;
            }
            TransportAction::PlayPause => {
                if self.transport.is_paused() {
                    self.transport.play();
                } else {
                    self.transport.pause();
                }
            }
            TransportAction::CycleSkip => {
                self.skip = self.skip.next();
            }
            TransportAction::CycleSpeed => {
                self.speed = self.speed.next();
                self.transport.set_playback_rate(self.speed.rate());
            }
            TransportAction::ToggleMute => {
                self.muted = !self.muted;
                self.transport.set_muted(self.muted);
            }
        }
    }

    pub fn on_focus(&self) -> FocusEvent {
        FocusEvent::PanelFocused(Panel::Player)
    }

    // Playback never continues unattended once the player loses focus.
    // The paused flag may lag behind the media element, so always pause.
    pub fn on_blur(&mut self) {
        self.transport.pause();
    }

    pub fn focus(&mut self) {
        self.transport.focus();
    }

    pub fn blur(&mut self) {
        self.transport.blur();
    }

    pub fn report_progress(&mut self, played_seconds: f64) {
        self.progress = played_seconds.max(0.0);
    }

    pub fn report_duration(&mut self, seconds: f64) {
        self.duration = seconds.max(0.0);
    }

    /// Seek from the progress slider, `percent` in 0..=100.
    pub fn seek_to_percent(&mut self, percent: f64) {
        if !percent.is_finite() || self.duration <= 0.0 {
            return;
        }
        let time = (percent.clamp(0.0, 100.0) / 100.0) * self.duration;
        self.progress = time;
        self.transport.seek_to(time);
    }

    pub fn progress_percent(&self) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        (self.progress / self.duration * 100.0).clamp(0.0, 100.0)
    }

    pub fn progress_label(&self) -> String {
        format!("{:.2}s", self.progress)
    }

    pub fn duration_label(&self) -> String {
        format!("{:.2}s", self.duration)
    }

    pub fn status(&self) -> PlayerStatus {
        PlayerStatus {
            source: self.source.clone(),
            progress: self.progress,
            duration: self.duration,
            speed: self.speed.rate(),
            skip_seconds: self.skip.seconds(),
            muted: self.muted,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct FakeTransport {
        pub loaded: Vec<String>,
        pub time: f64,
        pub paused: bool,
        pub rate: f64,
        pub muted: bool,
        pub focus_calls: usize,
        pub blur_calls: usize,
        pub pause_calls: usize,
        pub calls: usize,
    }

    impl PanelHandle for FakeTransport {
        fn focus(&mut self) {
            self.focus_calls += 1;
        }

        fn blur(&mut self) {
            self.blur_calls += 1;
        }
    }

    impl MediaTransport for FakeTransport {
        fn load(&mut self, source: &str) {
            self.loaded.push(source.to_string());
            self.time = 0.0;
            self.paused = true;
        }

        fn current_time(&self) -> f64 {
            self.time
        }

        fn seek_to(&mut self, seconds: f64) {
            self.calls += 1;
            self.time = seconds;
        }

        fn play(&mut self) {
            self.calls += 1;
            self.paused = false;
        }

        fn pause(&mut self) {
            self.calls += 1;
            self.pause_calls += 1;
            self.paused = true;
        }

        fn is_paused(&self) -> bool {
            self.paused
        }

        fn set_playback_rate(&mut self, rate: f64) {
            self.calls += 1;
            self.rate = rate;
        }

        fn set_muted(&mut self, muted: bool) {
            self.calls += 1;
            self.muted = muted;
        }
    }

    fn player() -> PlayerPanel<FakeTransport> {
        let mut p = PlayerPanel::new(FakeTransport::default(), Keymap::default());
        p.set_source("https://example.com/a.mp4");
        p
    }

    #[test]
    fn test_speed_cycle_order() {
        let cases = [
            (PlaybackSpeed::Half, [1.0, 2.0, 0.5]),
            (PlaybackSpeed::Normal, [2.0, 0.5, 1.0]),
            (PlaybackSpeed::Double, [0.5, 1.0, 2.0]),
        ];
        for (start, expected) in cases {
            let mut speed = start;
            for rate in expected {
                speed = speed.next();
                assert_eq!(speed.rate(), rate);
            }
            assert_eq!(speed, start);
        }
    }

    #[test]
    fn test_skip_cycle_order() {
        let cases = [
            (SkipInterval::One, [2.0, 5.0, 1.0]),
            (SkipInterval::Two, [5.0, 1.0, 2.0]),
            (SkipInterval::Five, [1.0, 2.0, 5.0]),
        ];
        for (start, expected) in cases {
            let mut skip = start;
            for secs in expected {
                skip = skip.next();
                assert_eq!(skip.seconds(), secs);
            }
            assert_eq!(skip, start);
        }
    }

    #[test]
    fn test_keys_ignored_when_editor_active() {
        let mut p = player();
        let calls_before = p.transport().calls;
        for key in ["ArrowLeft", "ArrowRight", " ", "s", "x", "m"] {
            assert!(!p.handle_key(key, ActivePanel::Editor));
            assert!(!p.handle_key(key, ActivePanel::None));
        }
        assert_eq!(p.transport().calls, calls_before);
        assert_eq!(p.speed(), PlaybackSpeed::Normal);
        assert_eq!(p.skip(), SkipInterval::One);
        assert!(!p.is_muted());
    }

    #[test]
    fn test_seek_back_clamps_and_pauses() {
        let mut p = player();
        p.transport_mut().time = 0.4;
        p.transport_mut().paused = false;
        assert!(p.handle_key("ArrowLeft", ActivePanel::Player));
        assert_eq!(p.transport().time, 0.0);
        assert!(p.transport().paused);
    }

    #[test]
    fn test_seek_uses_skip_interval() {
        let mut p = player();
        p.report_duration(100.0);
        p.transport_mut().time = 10.0;
        p.handle_key("s", ActivePanel::Player);
        p.handle_key("s", ActivePanel::Player);
        assert_eq!(p.skip(), SkipInterval::Five);
        p.handle_key("ArrowRight", ActivePanel::Player);
        assert_eq!(p.transport().time, 15.0);
        p.handle_key("ArrowLeft", ActivePanel::Player);
        assert_eq!(p.transport().time, 10.0);
    }

    #[test]
    fn test_seek_forward_stops_at_duration() {
        let mut p = player();
        p.report_duration(3.0);
        p.transport_mut().time = 2.5;
        p.handle_key("ArrowRight", ActivePanel::Player);
        assert_eq!(p.transport().time, 3.0);
    }

    #[test]
    fn test_play_pause_toggles() {
        let mut p = player();
        assert!(p.transport().paused);
        p.handle_key(" ", ActivePanel::Player);
        assert!(!p.transport().paused);
        p.handle_key(" ", ActivePanel::Player);
        assert!(p.transport().paused);
    }

    #[test]
    fn test_speed_and_mute_reach_transport() {
        let mut p = player();
        p.handle_key("x", ActivePanel::Player);
        assert_eq!(p.transport().rate, 2.0);
        p.handle_key("m", ActivePanel::Player);
        assert!(p.transport().muted);
        p.handle_key("m", ActivePanel::Player);
        assert!(!p.transport().muted);
    }

    #[test]
    fn test_unbound_key_not_consumed() {
        let mut p = player();
        assert!(!p.handle_key("q", ActivePanel::Player));
    }

    #[test]
    fn test_blur_pauses_playback() {
        let mut p = player();
        p.handle_key(" ", ActivePanel::Player);
        assert!(!p.transport().paused);
        p.on_blur();
        assert!(p.transport().paused);
    }

    #[test]
    fn test_blur_pauses_even_when_reported_paused() {
        let mut p = player();
        assert!(p.transport().paused);
        p.on_blur();
        assert_eq!(p.transport().pause_calls, 1);
    }

    #[test]
    fn test_custom_keymap() {
        let mut p = player();
        p.set_keymap(Keymap {
            play_pause: "k".to_string(),
            ..Keymap::default()
        });
        assert!(!p.handle_key(" ", ActivePanel::Player));
        assert!(p.handle_key("k", ActivePanel::Player));
    }

    #[test]
    fn test_progress_reporting() {
        let mut p = player();
        assert_eq!(p.progress_percent(), 0.0);
        p.report_duration(200.0);
        p.report_progress(50.0);
        assert_eq!(p.progress_percent(), 25.0);
        assert_eq!(p.progress_label(), "50.00s");
        assert_eq!(p.duration_label(), "200.00s");

        p.seek_to_percent(50.0);
        assert_eq!(p.transport().time, 100.0);
        assert_eq!(p.status().progress, 100.0);
    }

    #[test]
    fn test_seek_ignores_non_finite_percent() {
        let mut p = player();
        p.report_duration(200.0);
        p.seek_to_percent(25.0);
        let calls = p.transport().calls;

        for percent in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            p.seek_to_percent(percent);
        }
        assert_eq!(p.transport().calls, calls);
        assert_eq!(p.transport().time, 50.0);
        assert_eq!(p.status().progress, 50.0);
    }

    #[test]
    fn test_set_source_resets_progress() {
        let mut p = player();
        p.report_duration(10.0);
        p.report_progress(5.0);
        p.set_source("/videos/b.mp4");
        assert_eq!(p.source(), Some("/videos/b.mp4"));
        assert_eq!(p.status().progress, 0.0);
        assert_eq!(p.status().duration, 0.0);
        assert_eq!(p.transport().loaded.len(), 2);
    }
}
