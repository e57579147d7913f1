use chrono::{DateTime, Local, TimeDelta};
use timer_core::{entry_digits, format_entry, hms_to_seconds, parse_hms, MAX_ENTRY_DIGITS};

/// Below this many seconds the display blinks on every tick.
const ALERT_THRESHOLD_SECS: u64 = 60;
const IDLE_DISPLAY: &str = "00:00:00";

/// Messages from the countdown worker, drained on the UI thread.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum EngineEvent {
    Tick { hours: u64, minutes: u64, seconds: u64 },
    Finished,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Button {
    Start,
    Stop,
    Reset,
}

impl Button {
    pub fn label(self) -> &'static str {
        match self {
            Button::Start => "Start",
            Button::Stop => "Stop",
            Button::Reset => "Reset",
        }
    }
}

/// What the app has to do with the engine and audio after a toggle.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ToggleAction {
    Start(u64),
    Stop,
    Reset,
    Nothing,
}

pub struct CountdownState {
    digits: String,
    display: Option<String>,
    pub button: Button,
    pub end_label: Option<String>,
    pub alert: bool,
}

impl CountdownState {
    pub fn new() -> Self {
        Self {
            digits: String::new(),
            display: None,
            button: Button::Start,
            end_label: None,
            alert: false,
        }
    }

    pub fn with_entry(text: &str) -> Self {
        let mut state = Self::new();
        state.digits = entry_digits(text);
        state
    }

    /// Text shown in the time field.
    pub fn display(&self) -> String {
        match &self.display {
            Some(shown) => shown.clone(),
            None if self.digits.is_empty() => IDLE_DISPLAY.to_string(),
            None => format_entry(&self.digits),
        }
    }

    pub fn editable(&self) -> bool {
        self.button == Button::Start
    }

    pub fn push_digit(&mut self, c: char) {
        if !self.editable() || !c.is_ascii_digit() || self.digits.len() >= MAX_ENTRY_DIGITS {
            return;
        }
        self.digits.push(c);
    }

    pub fn pop_digit(&mut self) {
        if self.editable() {
            self.digits.pop();
        }
    }

    pub fn entered_seconds(&self) -> u64 {
        let (h, m, s) = parse_hms(&self.display());
        hms_to_seconds(h, m, s)
    }

    pub fn toggle(&mut self, now: DateTime<Local>) -> ToggleAction {
        match self.button {
            Button::Stop => {
                self.button = Button::Reset;
                self.end_label = None;
                self.alert = false;
                ToggleAction::Stop
            }
            Button::Reset => {
                *self = Self::new();
                ToggleAction::Reset
            }
            Button::Start => {
                let total = self.entered_seconds();
                if total == 0 {
                    return ToggleAction::Nothing;
                }
                let ends = now + TimeDelta::seconds(total as i64);
                self.end_label = Some(format!("Ends at {}", ends.format("%H:%M:%S")));
                self.display = Some(self.display());
                self.button = Button::Stop;
                ToggleAction::Start(total)
            }
        }
    }

    /// Apply a tick. Returns false for ticks that arrive after the run was
    /// stopped, which the caller should ignore.
    pub fn on_tick(&mut self, hours: u64, minutes: u64, seconds: u64) -> bool {
        if self.button != Button::Stop {
            return false;
        }
        self.display = Some(format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
        if hms_to_seconds(hours, minutes, seconds) < ALERT_THRESHOLD_SECS {
            self.alert = !self.alert;
        } else {
            self.alert = false;
        }
        true
    }

    pub fn on_finish(&mut self, now: DateTime<Local>) -> bool {
        if self.button != Button::Stop {
            return false;
        }
        self.button = Button::Reset;
        self.alert = false;
        self.end_label = Some(format!("Finished at {}", now.format("%H:%M:%S")));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn type_digits(state: &mut CountdownState, digits: &str) {
        for c in digits.chars() {
            state.push_digit(c);
        }
    }

    #[test]
    fn test_entry_formatting() {
        let mut cd = CountdownState::new();
        assert_eq!(cd.display(), "00:00:00");
        type_digits(&mut cd, "1");
        assert_eq!(cd.display(), "1");
        type_digits(&mut cd, "23");
        assert_eq!(cd.display(), "12:3");
        type_digits(&mut cd, "4567");
        assert_eq!(cd.display(), "12:34:56");
        cd.pop_digit();
        assert_eq!(cd.display(), "12:34:5");
    }

    #[test]
    fn test_non_digits_are_ignored() {
        let mut cd = CountdownState::new();
        type_digits(&mut cd, "a1:b");
        assert_eq!(cd.display(), "1");
    }

    #[test]
    fn test_start_sets_end_label() {
        let mut cd = CountdownState::new();
        type_digits(&mut cd, "000130");
        assert_eq!(cd.toggle(noon()), ToggleAction::Start(90));
        assert_eq!(cd.button, Button::Stop);
        assert_eq!(cd.end_label.as_deref(), Some("Ends at 12:01:30"));
        assert!(!cd.editable());
    }

    #[test]
    fn test_zero_entry_does_not_start() {
        let mut cd = CountdownState::new();
        assert_eq!(cd.toggle(noon()), ToggleAction::Nothing);
        type_digits(&mut cd, "0000");
        assert_eq!(cd.toggle(noon()), ToggleAction::Nothing);
        assert_eq!(cd.button, Button::Start);
    }

    #[test]
    fn test_partial_entry_is_hours_first() {
        let cd = CountdownState::with_entry("123");
        // "12:3" reads as 12 hours 3 minutes
        assert_eq!(cd.entered_seconds(), 12 * 3600 + 3 * 60);
    }

    #[test]
    fn test_stop_then_reset() {
        let mut cd = CountdownState::with_entry("000010");
        cd.toggle(noon());
        cd.on_tick(0, 0, 10);
        cd.on_tick(0, 0, 9);

        assert_eq!(cd.toggle(noon()), ToggleAction::Stop);
        assert_eq!(cd.button, Button::Reset);
        assert_eq!(cd.end_label, None);
        assert_eq!(cd.display(), "00:00:09");

        assert_eq!(cd.toggle(noon()), ToggleAction::Reset);
        assert_eq!(cd.button, Button::Start);
        assert_eq!(cd.display(), "00:00:00");
    }

    #[test]
    fn test_ticks_update_display_and_blink_under_a_minute() {
        let mut cd = CountdownState::with_entry("000200");
        cd.toggle(noon());

        assert!(cd.on_tick(0, 2, 0));
        assert_eq!(cd.display(), "00:02:00");
        assert!(!cd.alert);

        assert!(cd.on_tick(0, 0, 59));
        assert!(cd.alert);
        assert!(cd.on_tick(0, 0, 58));
        assert!(!cd.alert);
        assert!(cd.on_tick(0, 0, 57));
        assert!(cd.alert);
    }

    #[test]
    fn test_finish() {
        let mut cd = CountdownState::with_entry("1");
        cd.toggle(noon());
        cd.on_tick(0, 0, 0);
        assert!(cd.on_finish(noon()));
        assert_eq!(cd.button, Button::Reset);
        assert_eq!(cd.end_label.as_deref(), Some("Finished at 12:00:00"));
    }

    #[test]
    fn test_stale_events_after_stop_are_ignored() {
        let mut cd = CountdownState::with_entry("000005");
        cd.toggle(noon());
        cd.on_tick(0, 0, 5);
        cd.toggle(noon());

        assert!(!cd.on_tick(0, 0, 4));
        assert!(!cd.on_finish(noon()));
        assert_eq!(cd.display(), "00:00:05");
        assert_eq!(cd.button, Button::Reset);
    }

    #[test]
    fn test_digits_locked_while_running() {
        let mut cd = CountdownState::with_entry("5");
        cd.toggle(noon());
        cd.push_digit('9');
        cd.pop_digit();
        assert_eq!(cd.display(), "5");
    }
}
