use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph, Wrap};

use crate::audio::SoundKind;
use crate::countdown::CountdownState;
use crate::storage::AppearanceMode;

/// Colours for one appearance mode. `System` keeps the terminal's own palette.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Theme {
    pub fg: Color,
    pub bg: Color,
    pub dim: Color,
    pub accent: Color,
    pub alert: Color,
}

impl Theme {
    pub fn for_mode(mode: AppearanceMode) -> Self {
        match mode {
            AppearanceMode::Light => Self {
                fg: Color::Black,
                bg: Color::White,
                dim: Color::DarkGray,
                accent: Color::Blue,
                alert: Color::Red,
            },
            AppearanceMode::Dark => Self {
                fg: Color::White,
                bg: Color::Black,
                dim: Color::Gray,
                accent: Color::Cyan,
                alert: Color::LightRed,
            },
            AppearanceMode::System => Self {
                fg: Color::Reset,
                bg: Color::Reset,
                dim: Color::DarkGray,
                accent: Color::Cyan,
                alert: Color::Red,
            },
        }
    }

    fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }
}

/// Everything the settings page shows, gathered by the app before drawing.
pub struct SettingsView<'a> {
    pub cursor: usize,
    pub tick_volume: f64,
    pub alarm_volume: f64,
    pub tick_sound: Option<&'a str>,
    pub alarm_sound: Option<&'a str>,
    pub appearance: AppearanceMode,
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn page_frame(f: &mut Frame, theme: &Theme, title: &str, footer: &str) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.dim))
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ))
        .style(theme.base());
    let inner = block.inner(chunks[0]);
    f.render_widget(block, chunks[0]);

    let nav = Paragraph::new(footer)
        .style(theme.base().fg(theme.dim))
        .alignment(Alignment::Center);
    f.render_widget(nav, chunks[1]);

    inner
}

fn volume_bar(volume: f64) -> String {
    let filled = (volume * 20.0).round() as usize;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(20 - filled.min(20)),
        (volume * 100.0).round() as u32
    )
}

pub fn draw_countdown(f: &mut Frame, theme: &Theme, state: &CountdownState) {
    let area = page_frame(
        f,
        theme,
        "COUNTDOWN",
        "0-9=set time  ENTER/SPACE=start/stop  s=settings  ?=help  q=quit",
    );

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Length(1), // time
            Constraint::Length(1),
            Constraint::Length(1), // end label
            Constraint::Length(1),
            Constraint::Length(1), // button
            Constraint::Min(0),
        ])
        .split(area);

    let time_style = if state.alert {
        Style::default().fg(theme.alert)
    } else if state.editable() {
        Style::default().fg(theme.dim)
    } else {
        Style::default().fg(theme.fg)
    };
    let time = Paragraph::new(state.display())
        .style(time_style.add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(time, sections[1]);

    if let Some(label) = &state.end_label {
        let end = Paragraph::new(label.as_str())
            .style(Style::default().fg(theme.dim))
            .alignment(Alignment::Center);
        f.render_widget(end, sections[3]);
    }

    let button = Paragraph::new(format!("[ {} ]", state.button.label()))
        .style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(button, sections[5]);
}

pub fn draw_settings(f: &mut Frame, theme: &Theme, view: &SettingsView) {
    let area = page_frame(
        f,
        theme,
        "SETTINGS",
        "arrows=select  LEFT/RIGHT=adjust  ENTER=activate  ?=help  q=back",
    );

    let sound_name = |path: Option<&str>| path.unwrap_or("(none)").to_string();
    let rows = [
        format!("Tick volume      {}", volume_bar(view.tick_volume)),
        "Test tick sound".to_string(),
        format!("Select tick sound  {}", sound_name(view.tick_sound)),
        format!("Alarm volume     {}", volume_bar(view.alarm_volume)),
        "Test alarm sound".to_string(),
        format!("Select alarm sound {}", sound_name(view.alarm_sound)),
        format!("Appearance       < {} >", view.appearance.label()),
        "Reset to default settings".to_string(),
        "Back to timer".to_string(),
    ];

    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            if i == view.cursor {
                Line::from(Span::styled(
                    format!("> {}", row),
                    Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(Span::styled(format!("  {}", row), Style::default().fg(theme.fg)))
            }
        })
        .collect();

    let list = Paragraph::new(lines).block(Block::default().padding(Padding::new(2, 2, 1, 0)));
    f.render_widget(list, area);
}

pub fn draw_status(f: &mut Frame, theme: &Theme, message: &str) {
    let area = f.area();
    if area.height < 3 {
        return;
    }
    let line = Rect::new(area.x + 1, area.y + area.height - 3, area.width.saturating_sub(2), 1);
    let status = Paragraph::new(message)
        .style(theme.base().fg(theme.accent))
        .alignment(Alignment::Center);
    f.render_widget(status, line);
}

pub fn draw_help(f: &mut Frame, theme: &Theme, help_text: &str) {
    let area = centered_rect(60, 70, f.area());
    f.render_widget(Clear, area);
    let widget = Paragraph::new(help_text)
        .style(theme.base())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" HELP - any key to close ")
                .border_style(Style::default().fg(theme.accent)),
        );
    f.render_widget(widget, area);
}

pub fn draw_confirm_reset(f: &mut Frame, theme: &Theme) {
    let area = centered_rect(50, 30, f.area());
    f.render_widget(Clear, area);
    let widget = Paragraph::new("Reset all settings to defaults?\n\n  y = Reset\n  n = Cancel")
        .style(theme.base())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" Reset Settings ")
                .border_style(Style::default().fg(theme.alert)),
        );
    f.render_widget(widget, area);
}

pub fn draw_sound_prompt(f: &mut Frame, theme: &Theme, kind: SoundKind, input: &str) {
    let area = centered_rect(70, 25, f.area());
    f.render_widget(Clear, area);
    let title = match kind {
        SoundKind::Tick => " Select Tick Sound ",
        SoundKind::Alarm => " Select Alarm Sound ",
    };
    let text = format!(
        "Path to an audio file (mp3, wav, ogg, flac):\n\n> {}_\n\nENTER=load  ESC=cancel",
        input
    );
    let widget = Paragraph::new(text)
        .style(theme.base())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(title)
                .border_style(Style::default().fg(theme.accent)),
        );
    f.render_widget(widget, area);
}
