use super::grid::{compute_cells, PeriodAnchor, PeriodGrid, PeriodKind};
use crate::notes::NoteLookup;
use crate::refresh::Redraw;
use thiserror::Error;
use time::{Date, Duration};

/// Outcome of a navigation command
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Moved {
    /// Only the selected day changed; the grid still shows the same period
    Selection,
    /// A different period must be laid out
    Period,
}

/// The calendar as currently laid out: the anchor (which is also the selected
/// day) and the cached grid for it
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct CalendarView {
    today: Date,
    reference: Date,
    anchor: PeriodAnchor,
    grid: Option<PeriodGrid>,
}

impl CalendarView {
    pub(crate) fn new(today: Date, reference: Date) -> Self {
        CalendarView {
            today,
            reference,
            anchor: PeriodAnchor::new(today, PeriodKind::Month),
            grid: None,
        }
    }

    pub(crate) fn start_date(mut self, date: Date) -> Self {
        self.anchor = self.anchor.with_date(date);
        self
    }

    #[cfg(test)]
    pub(crate) fn today(&self) -> Date {
        self.today
    }

    pub(crate) fn selected(&self) -> Date {
        self.anchor.date()
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> PeriodKind {
        self.anchor.kind()
    }

    pub(crate) fn grid(&self) -> Option<&PeriodGrid> {
        self.grid.as_ref()
    }

    /// Returns `true` if the date changed, in which case the grid needs a
    /// full redraw to move the today marker.
    pub(crate) fn set_today(&mut self, today: Date) -> bool {
        std::mem::replace(&mut self.today, today) != today
    }

    pub(crate) fn set_reference(&mut self, reference: Date) {
        self.reference = reference;
    }

    fn move_to(&mut self, anchor: PeriodAnchor) -> Moved {
        let same = self
            .anchor
            .same_period(&anchor, self.reference.weekday());
        self.anchor = anchor;
        if same {
            Moved::Selection
        } else {
            Moved::Period
        }
    }

    pub(crate) fn jump_to_date(&mut self, date: Date) -> Moved {
        self.move_to(self.anchor.with_date(date))
    }

    pub(crate) fn jump_to_today(&mut self) -> Moved {
        self.jump_to_date(self.today)
    }

    pub(crate) fn move_days(&mut self, days: i64) -> Result<Moved, OutOfTimeError> {
        let date = self
            .anchor
            .date()
            .checked_add(Duration::days(days))
            .ok_or(OutOfTimeError)?;
        let anchor = self.anchor.with_date(date);
        if anchor.date() == self.anchor.date() {
            return Err(OutOfTimeError);
        }
        Ok(self.move_to(anchor))
    }

    pub(crate) fn next_period(&mut self) -> Result<Moved, OutOfTimeError> {
        let anchor = self.anchor.next().ok_or(OutOfTimeError)?;
        Ok(self.move_to(anchor))
    }

    pub(crate) fn previous_period(&mut self) -> Result<Moved, OutOfTimeError> {
        let anchor = self.anchor.previous().ok_or(OutOfTimeError)?;
        Ok(self.move_to(anchor))
    }

    pub(crate) fn toggle_kind(&mut self) -> Moved {
        self.move_to(self.anchor.with_kind(self.anchor.kind().toggled()))
    }

    /// Bring the cached grid up to date.  Returns the number of cells whose
    /// status was recomputed.
    pub(crate) fn apply<N: NoteLookup>(&mut self, redraw: &Redraw, notes: N) -> usize {
        match (redraw, self.grid.as_mut()) {
            (Redraw::Cells(dates), Some(grid)) if grid.anchor() == self.anchor => {
                let mut touched = 0;
                for cell in grid.cells_mut().filter(|c| dates.contains(&c.date)) {
                    cell.status = notes.state(cell.date);
                    cell.other_notes = notes.other_count(cell.date);
                    touched += 1;
                }
                touched
            }
            _ => {
                let mut grid = compute_cells(self.anchor, self.reference, self.today);
                let mut touched = 0;
                for cell in grid.cells_mut() {
                    cell.status = notes.state(cell.date);
                    cell.other_notes = notes.other_count(cell.date);
                    touched += 1;
                }
                self.grid = Some(grid);
                touched
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, Error, PartialEq)]
#[error("reached the end of time")]
pub(crate) struct OutOfTimeError;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::NoteState;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, BTreeSet};
    use time::macros::date;

    /// Records every date it is asked about
    #[derive(Debug, Default)]
    struct Recorder {
        states: BTreeMap<Date, NoteState>,
        asked: RefCell<Vec<Date>>,
    }

    impl NoteLookup for Recorder {
        fn state(&self, date: Date) -> NoteState {
            self.asked.borrow_mut().push(date);
            self.states.get(&date).copied().unwrap_or_default()
        }

        fn other_count(&self, _date: Date) -> usize {
            0
        }
    }

    fn view() -> CalendarView {
        CalendarView::new(date!(2025 - 03 - 02), date!(2023 - 01 - 01))
    }

    #[test]
    fn test_full_then_scoped_redraw() {
        let mut view = view();
        let mut notes = Recorder::default();
        assert_eq!(view.apply(&Redraw::Full, &notes), 42);
        notes
            .states
            .insert(date!(2025 - 03 - 05), NoteState::Created);
        notes.asked.borrow_mut().clear();
        let touched = view.apply(
            &Redraw::Cells(BTreeSet::from([date!(2025 - 03 - 05), date!(2031 - 01 - 01)])),
            &notes,
        );
        assert_eq!(touched, 1);
        assert_eq!(*notes.asked.borrow(), [date!(2025 - 03 - 05)]);
        let grid = view.grid().unwrap();
        for cell in grid.cells() {
            let expected = if cell.date == date!(2025 - 03 - 05) {
                NoteState::Created
            } else {
                NoteState::None
            };
            assert_eq!(cell.status, expected, "{}", cell.date);
        }
    }

    #[test]
    fn test_scoped_redraw_without_grid_is_full() {
        let mut view = view();
        let touched = view.apply(
            &Redraw::Cells(BTreeSet::from([date!(2025 - 03 - 05)])),
            &Recorder::default(),
        );
        assert_eq!(touched, 42);
    }

    #[test]
    fn test_scoped_redraw_after_navigation_is_full() {
        let mut view = view();
        view.apply(&Redraw::Full, &Recorder::default());
        assert_eq!(view.next_period(), Ok(Moved::Period));
        let touched = view.apply(
            &Redraw::Cells(BTreeSet::from([date!(2025 - 04 - 05)])),
            &Recorder::default(),
        );
        assert_eq!(touched, 42);
        assert_eq!(view.grid().unwrap().anchor().date(), date!(2025 - 04 - 02));
    }

    #[test]
    fn test_move_days() {
        let mut view = view();
        assert_eq!(view.move_days(7), Ok(Moved::Selection));
        assert_eq!(view.selected(), date!(2025 - 03 - 09));
        assert_eq!(view.move_days(-9), Ok(Moved::Period));
        assert_eq!(view.selected(), date!(2025 - 02 - 28));
        assert_eq!(view.jump_to_today(), Moved::Period);
        assert_eq!(view.selected(), date!(2025 - 03 - 02));
    }

    #[test]
    fn test_week_mode_navigation() {
        let mut view = view();
        assert_eq!(view.toggle_kind(), Moved::Period);
        assert_eq!(view.kind(), PeriodKind::Week);
        assert_eq!(view.move_days(6), Ok(Moved::Selection));
        assert_eq!(view.move_days(1), Ok(Moved::Period));
        assert_eq!(view.next_period(), Ok(Moved::Period));
        assert_eq!(view.selected(), date!(2025 - 03 - 16));
        assert_eq!(view.apply(&Redraw::Full, &Recorder::default()), 7);
    }

    #[test]
    fn test_end_of_time() {
        let mut view = view().start_date(Date::MAX);
        assert_eq!(view.next_period(), Err(OutOfTimeError));
        assert_eq!(view.move_days(60), Err(OutOfTimeError));
    }

    #[test]
    fn test_set_today() {
        let mut view = view();
        assert!(!view.set_today(date!(2025 - 03 - 02)));
        assert!(view.set_today(date!(2025 - 03 - 03)));
        assert_eq!(view.today(), date!(2025 - 03 - 03));
    }
}
