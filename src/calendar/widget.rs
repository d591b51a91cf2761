use super::grid::DayCell;
use super::util::WeekdayExt;
use super::view::CalendarView;
use crate::datefmt::DatePattern;
use crate::notes::NoteState;
use crate::theme::{
    Theme, HINT_STYLE, OUTSIDE_MONTH_STYLE, PERIOD_NUMBER_STYLE, SELECTED_STYLE, TITLE_STYLE,
    WEEKDAY_STYLE,
};
use ratatui::{prelude::*, widgets::*};
use time::Weekday;

/// Width of the calendar in columns, not counting the period numbers in the
/// margin
const MAIN_WIDTH: u16 = 46;

/// Number of columns on the left side of the calendar, used as the margin in
/// which period numbers are written
const LEFT_MARGIN: u16 = 6;

const TOTAL_WIDTH: u16 = LEFT_MARGIN + MAIN_WIDTH;

/// Number of lines taken up by the title, the weekday header, and its rule
const HEADER_LINES: u16 = 3;

/// Number of lines taken up by each week of the calendar: the day numbers
/// and the note markers below them
const WEEK_LINES: u16 = 2;

/// Number of columns per day of week
const DAY_WIDTH: u16 = 7;

/// At most this many other-note markers are drawn under a day
const MAX_OTHER_MARKERS: usize = 3;

const ACS_HLINE: char = '─';
const STATUS_MARKER: char = '●';
const OTHER_MARKER: char = '•';

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Calendar<'a> {
    theme: Theme,
    title: &'a DatePattern,
}

impl<'a> Calendar<'a> {
    pub(crate) fn new(theme: Theme, title: &'a DatePattern) -> Calendar<'a> {
        Calendar { theme, title }
    }

    fn day_style(&self, cell: &DayCell, selected: bool) -> Style {
        let style = if cell.is_today {
            self.theme.today_style()
        } else if !cell.in_current_month {
            OUTSIDE_MONTH_STYLE
        } else {
            self.theme.status_style(cell.status)
        };
        if selected {
            style.patch(SELECTED_STYLE)
        } else {
            style
        }
    }
}

impl StatefulWidget for Calendar<'_> {
    type State = CalendarView;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let left = (area.width.saturating_sub(MAIN_WIDTH) / 2).max(LEFT_MARGIN) - LEFT_MARGIN;
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(left),
                Constraint::Length(TOTAL_WIDTH.min(area.width)),
                Constraint::Min(0),
            ])
            .split(area);
        let mut canvas = BufferCanvas::new(chunks[1], buf);
        let Some(grid) = state.grid() else {
            canvas.draw_centered(0, "Loading…", HINT_STYLE);
            return;
        };
        canvas.draw_centered(0, &self.title.format(grid.anchor().date()), TITLE_STYLE);
        canvas.draw_header(grid.first_weekday());
        let selected = state.selected();
        for (i, row) in std::iter::zip(0u16.., grid.rows()) {
            if self.theme.show_period_numbers {
                canvas.draw_period_number(i, row.number);
            }
            for (col, cell) in std::iter::zip(0u16.., &row.cells) {
                let text = if cell.is_today {
                    format!("[{:>2}]", cell.date.day())
                } else {
                    format!(" {:>2} ", cell.date.day())
                };
                canvas.draw_day(i, col, &text, self.day_style(cell, cell.date == selected));
                canvas.draw_markers(i, col, cell, &self.theme);
            }
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
struct BufferCanvas<'a> {
    area: Rect,
    buf: &'a mut Buffer,
}

impl<'a> BufferCanvas<'a> {
    fn new(area: Rect, buf: &'a mut Buffer) -> Self {
        Self { area, buf }
    }

    fn draw_centered(&mut self, y: u16, text: &str, style: Style) {
        let width = u16::try_from(Line::raw(text).width()).unwrap_or(u16::MAX);
        let x = LEFT_MARGIN + MAIN_WIDTH.saturating_sub(width) / 2;
        self.mvprint(y, x, text, Some(style));
    }

    fn draw_header(&mut self, first_weekday: Weekday) {
        let header = std::iter::successors(Some(first_weekday), |wd| Some(wd.next()))
            .take(7)
            .map(|wd| format!(" {}    ", wd.short_name()))
            .collect::<String>();
        self.mvprint(1, LEFT_MARGIN, header.trim_end(), Some(WEEKDAY_STYLE));
        self.hline(2, LEFT_MARGIN, ACS_HLINE, MAIN_WIDTH);
    }

    fn draw_period_number(&mut self, row: u16, number: i64) {
        let text = format!("{number:>4}");
        if text.len() < usize::from(LEFT_MARGIN) {
            self.mvprint(
                row * WEEK_LINES + HEADER_LINES,
                0,
                text,
                Some(PERIOD_NUMBER_STYLE),
            );
        }
    }

    fn draw_day(&mut self, row: u16, col: u16, text: &str, style: Style) {
        self.mvprint(
            row * WEEK_LINES + HEADER_LINES,
            LEFT_MARGIN + DAY_WIDTH * col,
            text,
            Some(style),
        );
    }

    fn draw_markers(&mut self, row: u16, col: u16, cell: &DayCell, theme: &Theme) {
        let y = row * WEEK_LINES + HEADER_LINES + 1;
        let x = LEFT_MARGIN + DAY_WIDTH * col + 1;
        if cell.status != NoteState::None {
            self.mvaddch(y, x, STATUS_MARKER, theme.status_style(cell.status));
        }
        if theme.show_other_notes {
            for i in (1u16..).take(cell.other_notes.min(MAX_OTHER_MARKERS)) {
                self.mvaddch(y, x + i, OTHER_MARKER, theme.other_style());
            }
        }
    }

    fn mvaddch(&mut self, y: u16, x: u16, ch: char, style: Style) {
        if y < self.area.height && x < self.area.width {
            if let Some(cell) = self.buf.cell_mut((x + self.area.x, y + self.area.y)) {
                cell.set_char(ch).set_style(style);
            }
        }
    }

    fn mvprint<S: AsRef<str>>(&mut self, y: u16, x: u16, s: S, style: Option<Style>) {
        if y < self.area.height && x < self.area.width {
            let text = Text::styled(s.as_ref(), style.unwrap_or_default());
            let width = u16::try_from(text.width()).unwrap_or(u16::MAX);
            // Using a Paragraph lets us truncate text that extends beyond the
            // calendar's area, though we need to be sure that the Rect passed
            // to the Paragraph is entirely within the frame lest a panic
            // result.
            Paragraph::new(text).render(
                Rect {
                    x: x + self.area.x,
                    y: y + self.area.y,
                    width: (self.area.width - x).min(width),
                    height: 1,
                },
                self.buf,
            );
        }
    }

    fn hline(&mut self, y: u16, x: u16, ch: char, length: u16) {
        self.mvprint(y, x, String::from(ch).repeat(length.into()), None);
    }
}
