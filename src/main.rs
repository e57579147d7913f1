mod audio;
mod config;
mod countdown;
mod storage;
mod ui;

use std::error::Error;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Local;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use ratatui::backend::CrosstermBackend;
use ratatui::{Frame, Terminal};
use timer_core::CountdownEngine;
use tracing_subscriber::EnvFilter;

use crate::audio::{AudioManager, SoundKind};
use crate::config::{AppPaths, Args, APP_NAME};
use crate::countdown::{CountdownState, EngineEvent, ToggleAction};
use crate::storage::{AppearanceMode, SettingsStore, KEY_APPEARANCE_MODE};
use crate::ui::{SettingsView, Theme};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const SOUND_TEST_LENGTH: Duration = Duration::from_secs(1);
const VOLUME_STEP: f64 = 0.05;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AppMode {
    Countdown,
    Settings,
}

#[derive(Clone, Copy, PartialEq, Debug, FromPrimitive)]
enum SettingsRow {
    TickVolume = 0,
    TestTick,
    SelectTick,
    AlarmVolume,
    TestAlarm,
    SelectAlarm,
    Appearance,
    Reset,
    Back,
}

const SETTINGS_ROWS: usize = 9;

struct SoundPrompt {
    kind: SoundKind,
    input: String,
}

struct TimerApp {
    store: SettingsStore,
    audio: AudioManager,
    engine: CountdownEngine,
    events: Receiver<EngineEvent>,

    mode: AppMode,
    countdown: CountdownState,
    settings_cursor: usize,
    appearance: AppearanceMode,
    theme: Theme,

    help_visible: bool,
    confirm_reset: bool,
    prompt: Option<SoundPrompt>,
    message: Option<String>,
    sound_test: Option<(SoundKind, Instant)>,
    quit: bool,
}

/// Engine whose callbacks forward onto `tx` so the UI thread handles them.
fn channel_engine(tx: Sender<EngineEvent>) -> CountdownEngine {
    let finish_tx = tx.clone();
    CountdownEngine::new(
        move |hours, minutes, seconds| {
            tx.send(EngineEvent::Tick { hours, minutes, seconds }).ok();
        },
        move || {
            finish_tx.send(EngineEvent::Finished).ok();
        },
    )
}

impl TimerApp {
    fn new(
        store: SettingsStore,
        audio: AudioManager,
        engine: CountdownEngine,
        events: Receiver<EngineEvent>,
        entry: Option<&str>,
    ) -> Self {
        let appearance = store.record().appearance_mode;
        let countdown = match entry {
            Some(text) => CountdownState::with_entry(text),
            None => CountdownState::new(),
        };

        Self {
            store,
            audio,
            engine,
            events,
            mode: AppMode::Countdown,
            countdown,
            settings_cursor: 0,
            appearance,
            theme: Theme::for_mode(appearance),
            help_visible: false,
            confirm_reset: false,
            prompt: None,
            message: None,
            sound_test: None,
            quit: false,
        }
    }

    fn draw(&self, f: &mut Frame) {
        match self.mode {
            AppMode::Countdown => ui::draw_countdown(f, &self.theme, &self.countdown),
            AppMode::Settings => {
                let view = SettingsView {
                    cursor: self.settings_cursor,
                    tick_volume: self.audio.tick_volume(),
                    alarm_volume: self.audio.alarm_volume(),
                    tick_sound: file_name(self.audio.sound_path(SoundKind::Tick)),
                    alarm_sound: file_name(self.audio.sound_path(SoundKind::Alarm)),
                    appearance: self.appearance,
                };
                ui::draw_settings(f, &self.theme, &view);
            }
        }

        if let Some(message) = &self.message {
            ui::draw_status(f, &self.theme, message);
        }
        if let Some(prompt) = &self.prompt {
            ui::draw_sound_prompt(f, &self.theme, prompt.kind, &prompt.input);
        }
        if self.confirm_reset {
            ui::draw_confirm_reset(f, &self.theme);
        }
        if self.help_visible {
            ui::draw_help(f, &self.theme, self.help_text());
        }
    }

    fn handle_pump(&mut self) {
        while let Ok(ev) = self.events.try_recv() {
            match ev {
                EngineEvent::Tick { hours, minutes, seconds } => {
                    if self.countdown.on_tick(hours, minutes, seconds) {
                        self.audio.play_tick();
                    }
                }
                EngineEvent::Finished => {
                    if self.countdown.on_finish(Local::now()) {
                        log::info!("Countdown finished");
                        self.audio.play_alarm_loop();
                    }
                }
            }
        }

        if let Some((kind, started)) = self.sound_test {
            if started.elapsed() >= SOUND_TEST_LENGTH {
                match kind {
                    SoundKind::Tick => self.audio.stop_tick(),
                    SoundKind::Alarm => self.audio.stop_alarm(),
                }
                self.sound_test = None;
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.shutdown();
            return;
        }

        // If help screen is showing, any key dismisses it
        if self.help_visible {
            self.help_visible = false;
            return;
        }
        if self.prompt.is_some() {
            self.handle_key_prompt(key);
            return;
        }
        if self.confirm_reset {
            match key.code {
                KeyCode::Char('y') => {
                    self.confirm_reset = false;
                    self.reset_settings();
                }
                KeyCode::Char('n') | KeyCode::Esc => self.confirm_reset = false,
                _ => {}
            }
            return;
        }

        self.message = None;
        if key.code == KeyCode::Char('?') || key.code == KeyCode::F(1) {
            self.help_visible = true;
            return;
        }

        match self.mode {
            AppMode::Countdown => self.handle_key_countdown(key),
            AppMode::Settings => self.handle_key_settings(key),
        }
    }

    fn help_text(&self) -> &'static str {
        match self.mode {
            AppMode::Countdown => {
                "COUNTDOWN HELP\n\n\
                 0-9          Enter HH:MM:SS\n\
                 Backspace    Delete digit\n\
                 Enter/Space  Start / Stop / Reset\n\
                 s            Settings\n\
                 ?            Help\n\
                 q/Esc        Quit"
            }
            AppMode::Settings => {
                "SETTINGS HELP\n\n\
                 Up/Dn        Move cursor\n\
                 Left/Right   Adjust volume or appearance\n\
                 Enter        Activate row\n\
                 ?            Help\n\
                 q/Esc        Back to timer"
            }
        }
    }

    fn handle_key_countdown(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() => self.countdown.push_digit(c),
            KeyCode::Backspace => self.countdown.pop_digit(),
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_timer(),
            KeyCode::Char('s') => {
                self.mode = AppMode::Settings;
                self.settings_cursor = 0;
            }
            KeyCode::Char('q') | KeyCode::Esc => self.shutdown(),
            _ => {}
        }
    }

    fn toggle_timer(&mut self) {
        match self.countdown.toggle(Local::now()) {
            ToggleAction::Start(total) => {
                log::info!("Countdown started for {} s", total);
                self.engine.start(total);
            }
            ToggleAction::Stop => {
                log::info!("Countdown stopped");
                self.engine.stop();
            }
            ToggleAction::Reset => self.audio.stop_alarm(),
            ToggleAction::Nothing => {}
        }
    }

    fn handle_key_settings(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                if self.settings_cursor > 0 {
                    self.settings_cursor -= 1;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.settings_cursor + 1 < SETTINGS_ROWS {
                    self.settings_cursor += 1;
                }
            }
            KeyCode::Left | KeyCode::Char('h') => self.adjust_setting(-1),
            KeyCode::Right | KeyCode::Char('l') => self.adjust_setting(1),
            KeyCode::Enter => self.activate_setting(),
            KeyCode::Char('q') | KeyCode::Esc => self.show_timer(),
            _ => {}
        }
    }

    fn adjust_setting(&mut self, direction: i8) {
        let delta = VOLUME_STEP * f64::from(direction);
        match SettingsRow::from_usize(self.settings_cursor) {
            Some(SettingsRow::TickVolume) => {
                let volume = step_volume(self.audio.tick_volume(), delta);
                self.audio.set_tick_volume(&mut self.store, volume);
            }
            Some(SettingsRow::AlarmVolume) => {
                let volume = step_volume(self.audio.alarm_volume(), delta);
                self.audio.set_alarm_volume(&mut self.store, volume);
            }
            Some(SettingsRow::Appearance) => {
                let mode = if direction > 0 {
                    self.appearance.next()
                } else {
                    self.appearance.next().next()
                };
                self.set_appearance(mode);
            }
            _ => {}
        }
    }

    fn activate_setting(&mut self) {
        match SettingsRow::from_usize(self.settings_cursor) {
            Some(SettingsRow::TestTick) => {
                self.audio.play_tick();
                self.sound_test = Some((SoundKind::Tick, Instant::now()));
            }
            Some(SettingsRow::TestAlarm) => {
                self.audio.play_alarm();
                self.sound_test = Some((SoundKind::Alarm, Instant::now()));
            }
            Some(SettingsRow::SelectTick) => self.open_prompt(SoundKind::Tick),
            Some(SettingsRow::SelectAlarm) => self.open_prompt(SoundKind::Alarm),
            Some(SettingsRow::Appearance) => self.set_appearance(self.appearance.next()),
            Some(SettingsRow::Reset) => self.confirm_reset = true,
            Some(SettingsRow::Back) => self.show_timer(),
            Some(SettingsRow::TickVolume) | Some(SettingsRow::AlarmVolume) | None => {}
        }
    }

    fn open_prompt(&mut self, kind: SoundKind) {
        let input = self
            .audio
            .sound_path(kind)
            .and_then(Path::parent)
            .map(|dir| format!("{}/", dir.display()))
            .unwrap_or_default();
        self.prompt = Some(SoundPrompt { kind, input });
    }

    fn handle_key_prompt(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => {
                if let Some(prompt) = &mut self.prompt {
                    prompt.input.push(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(prompt) = &mut self.prompt {
                    prompt.input.pop();
                }
            }
            KeyCode::Esc => self.prompt = None,
            KeyCode::Enter => {
                if let Some(prompt) = self.prompt.take() {
                    self.select_sound(prompt.kind, prompt.input.trim());
                }
            }
            _ => {}
        }
    }

    fn select_sound(&mut self, kind: SoundKind, input: &str) {
        if input.is_empty() {
            return;
        }
        let path = PathBuf::from(input);
        let (result, label) = match kind {
            SoundKind::Tick => (self.audio.change_tick_sound(&mut self.store, &path), "Tick"),
            SoundKind::Alarm => (self.audio.change_alarm_sound(&mut self.store, &path), "Alarm"),
        };
        self.message = Some(match result {
            Ok(()) => format!(
                "{} sound set to: {}",
                label,
                file_name(Some(path.as_path())).unwrap_or(input)
            ),
            Err(e) => {
                log::error!("Failed to load {} sound {}: {}", label, path.display(), e);
                format!("Failed to load {} sound: {}", label.to_lowercase(), e)
            }
        });
    }

    fn set_appearance(&mut self, mode: AppearanceMode) {
        self.appearance = mode;
        self.theme = Theme::for_mode(mode);
        self.store.set(KEY_APPEARANCE_MODE, mode);
    }

    fn reset_settings(&mut self) {
        self.audio.reset_to_defaults(&mut self.store);
        let mode = self.store.record().appearance_mode;
        self.appearance = mode;
        self.theme = Theme::for_mode(mode);
        self.message = Some("Settings have been reset to defaults.".to_string());
        log::info!("Settings reset to defaults");
    }

    fn show_timer(&mut self) {
        self.mode = AppMode::Countdown;
        self.audio.stop_alarm();
    }

    fn shutdown(&mut self) {
        self.engine.stop();
        self.audio.stop_alarm();
        self.audio.stop_tick();
        self.quit = true;
    }
}

fn step_volume(volume: f64, delta: f64) -> f64 {
    (((volume + delta) * 100.0).round() / 100.0).clamp(0.0, 1.0)
}

fn file_name(path: Option<&Path>) -> Option<&str> {
    path.and_then(Path::file_name).and_then(|name| name.to_str())
}

fn init_logging(log_file: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| e as Box<dyn Error>)?;
    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut TimerApp) -> io::Result<()> {
    while !app.quit {
        app.handle_pump();
        terminal.draw(|f| app.draw(f))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let paths = AppPaths::resolve(&args);
    init_logging(&paths.log_file)?;
    log::info!("{} starting, root {}", APP_NAME, paths.root.display());

    let store = SettingsStore::open(&paths.settings);
    let audio = AudioManager::new(&paths, &store.record());
    let (tx, rx) = mpsc::channel();
    let engine = channel_engine(tx);
    let mut app = TimerApp::new(store, audio, engine, rx, args.duration.as_deref());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &res {
        log::error!("UI loop failed: {}", e);
    }
    log::info!("{} exiting", APP_NAME);
    res.map_err(Into::into)
}
