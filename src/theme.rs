use crate::notes::NoteState;
use ratatui::style::{Color, Modifier, Style};

pub(crate) const BASE_STYLE: Style = Style::new().fg(Color::White).bg(Color::Black);

pub(crate) const TITLE_STYLE: Style = BASE_STYLE.add_modifier(Modifier::BOLD);

pub(crate) const WEEKDAY_STYLE: Style = BASE_STYLE.add_modifier(Modifier::BOLD);

pub(crate) const PERIOD_NUMBER_STYLE: Style = BASE_STYLE.fg(Color::DarkGray);

pub(crate) const OUTSIDE_MONTH_STYLE: Style = BASE_STYLE.fg(Color::DarkGray);

pub(crate) const SELECTED_STYLE: Style = BASE_STYLE.add_modifier(Modifier::REVERSED);

pub(crate) const NOTICE_STYLE: Style = BASE_STYLE.fg(Color::LightRed);

pub(crate) const HINT_STYLE: Style = BASE_STYLE.fg(Color::DarkGray);

pub(crate) const ACTIVE_TAB_STYLE: Style = BASE_STYLE
    .add_modifier(Modifier::BOLD)
    .add_modifier(Modifier::UNDERLINED);

pub(crate) mod jumpto {
    use super::*;

    pub(crate) const PLACEHOLDER_STYLE: Style = BASE_STYLE.fg(Color::DarkGray);

    pub(crate) const ERROR_STYLE: Style = BASE_STYLE.fg(Color::LightRed);
}

/// User-adjustable colors and toggles for the calendar
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Theme {
    pub(crate) created: Color,
    pub(crate) modified: Color,
    pub(crate) other: Color,
    pub(crate) today: Color,
    pub(crate) show_period_numbers: bool,
    pub(crate) show_other_notes: bool,
}

impl Theme {
    pub(crate) fn status_style(&self, state: NoteState) -> Style {
        match state {
            NoteState::None => BASE_STYLE,
            NoteState::Created => BASE_STYLE.fg(self.created),
            NoteState::Modified => BASE_STYLE.fg(self.modified),
        }
    }

    pub(crate) fn other_style(&self) -> Style {
        BASE_STYLE.fg(self.other)
    }

    pub(crate) fn today_style(&self) -> Style {
        BASE_STYLE.fg(self.today).add_modifier(Modifier::BOLD)
    }
}
