use crate::notes::{NoteState, NoteStatus};
use crate::theme::{Theme, BASE_STYLE, HINT_STYLE, SELECTED_STYLE, TITLE_STYLE};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph, StatefulWidget, Widget},
};
use time::Date;

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct NoteEntry {
    pub(crate) path: String,
    /// `Some` for the day's canonical daily note
    pub(crate) daily: Option<NoteState>,
}

/// The notes attached to the selected day
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct NoteListState {
    date: Option<Date>,
    entries: Vec<NoteEntry>,
    list: ListState,
}

impl NoteListState {
    pub(crate) fn new() -> NoteListState {
        NoteListState::default()
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[NoteEntry] {
        &self.entries
    }

    /// Replace the listed notes with those of `status`.  The selection stays
    /// on the same note if it is still listed.
    pub(crate) fn refresh(&mut self, date: Date, status: &NoteStatus) {
        let previous = (self.date == Some(date))
            .then(|| self.selected().map(|e| e.path.clone()))
            .flatten();
        self.date = Some(date);
        self.entries = status
            .daily_path
            .iter()
            .map(|path| NoteEntry {
                path: path.clone(),
                daily: Some(status.state),
            })
            .chain(status.other_notes.iter().map(|path| NoteEntry {
                path: path.clone(),
                daily: None,
            }))
            .collect();
        let index = previous
            .and_then(|p| self.entries.iter().position(|e| e.path == p))
            .or_else(|| (!self.entries.is_empty()).then_some(0));
        self.list.select(index);
    }

    pub(crate) fn selected(&self) -> Option<&NoteEntry> {
        self.list.selected().and_then(|i| self.entries.get(i))
    }

    pub(crate) fn select_next(&mut self) -> bool {
        match self.list.selected() {
            Some(i) if i + 1 < self.entries.len() => {
                self.list.select(Some(i + 1));
                true
            }
            _ => false,
        }
    }

    pub(crate) fn select_previous(&mut self) -> bool {
        match self.list.selected() {
            Some(i) if i > 0 => {
                self.list.select(Some(i - 1));
                true
            }
            _ => false,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct NoteList<'a> {
    theme: &'a Theme,
    heading: &'a str,
}

impl<'a> NoteList<'a> {
    pub(crate) fn new(theme: &'a Theme, heading: &'a str) -> NoteList<'a> {
        NoteList { theme, heading }
    }

    fn item(&self, entry: &NoteEntry) -> ListItem<'static> {
        let (marker, style) = match entry.daily {
            Some(state) => ("● ", self.theme.status_style(state)),
            None => ("• ", self.theme.other_style()),
        };
        ListItem::new(Line::from_iter([
            Span::styled(marker, style),
            Span::styled(entry.path.clone(), BASE_STYLE),
        ]))
    }
}

impl StatefulWidget for NoteList<'_> {
    type State = NoteListState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let [heading_area, list_area] =
            Layout::vertical([Constraint::Length(2), Constraint::Min(0)]).areas(area);
        Paragraph::new(Line::styled(self.heading, TITLE_STYLE)).render(heading_area, buf);
        if state.entries.is_empty() {
            Paragraph::new(Line::styled(
                "No notes for this day. Press ENTER to create the daily note.",
                HINT_STYLE,
            ))
            .render(list_area, buf);
            return;
        }
        let items = state
            .entries
            .iter()
            .map(|e| self.item(e))
            .collect::<Vec<_>>();
        let list = List::new(items)
            .style(BASE_STYLE)
            .highlight_style(SELECTED_STYLE);
        StatefulWidget::render(list, list_area, buf, &mut state.list);
    }
}
