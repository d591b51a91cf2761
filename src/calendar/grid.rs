use super::util::{
    add_months, earliest_anchor, first_of_month, iter_days_from, latest_anchor, WeekdayExt,
    DAYS_IN_WEEK,
};
use crate::notes::NoteState;
use time::{Date, Duration, Weekday};

/// Number of week rows in a month grid.  Every month fits in six rows
/// whatever the first day of the week, so all month grids share one shape.
pub(crate) const MONTH_ROWS: usize = 6;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub(crate) enum PeriodKind {
    #[default]
    Month,
    Week,
}

impl PeriodKind {
    fn rows(self) -> usize {
        match self {
            PeriodKind::Month => MONTH_ROWS,
            PeriodKind::Week => 1,
        }
    }

    pub(crate) fn toggled(self) -> PeriodKind {
        match self {
            PeriodKind::Month => PeriodKind::Week,
            PeriodKind::Week => PeriodKind::Month,
        }
    }
}

/// The date the calendar is centered on and the kind of period shown around
/// it
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct PeriodAnchor {
    date: Date,
    kind: PeriodKind,
}

impl PeriodAnchor {
    /// Dates too close to the ends of representable time are clamped so that
    /// every cell of the grid exists.
    pub(crate) fn new(date: Date, kind: PeriodKind) -> PeriodAnchor {
        PeriodAnchor {
            date: date.clamp(earliest_anchor(), latest_anchor()),
            kind,
        }
    }

    pub(crate) fn date(&self) -> Date {
        self.date
    }

    pub(crate) fn kind(&self) -> PeriodKind {
        self.kind
    }

    pub(crate) fn with_date(self, date: Date) -> PeriodAnchor {
        PeriodAnchor::new(date, self.kind)
    }

    pub(crate) fn with_kind(self, kind: PeriodKind) -> PeriodAnchor {
        PeriodAnchor::new(self.date, kind)
    }

    /// The first day shown in the grid for this anchor
    fn grid_start(&self, first_weekday: Weekday) -> Date {
        let base = match self.kind {
            PeriodKind::Month => first_of_month(self.date),
            PeriodKind::Week => self.date,
        };
        base - Duration::days(i64::from(base.weekday().column_from(first_weekday)))
    }

    /// Whether `other` is shown by the same grid as `self`
    pub(crate) fn same_period(&self, other: &PeriodAnchor, first_weekday: Weekday) -> bool {
        self.kind == other.kind && self.grid_start(first_weekday) == other.grid_start(first_weekday)
    }

    pub(crate) fn next(&self) -> Option<PeriodAnchor> {
        let date = match self.kind {
            PeriodKind::Month => add_months(self.date, 1)?,
            PeriodKind::Week => self.date.checked_add(Duration::weeks(1))?,
        };
        let anchor = self.with_date(date);
        (anchor.date > self.date).then_some(anchor)
    }

    pub(crate) fn previous(&self) -> Option<PeriodAnchor> {
        let date = match self.kind {
            PeriodKind::Month => add_months(self.date, -1)?,
            PeriodKind::Week => self.date.checked_sub(Duration::weeks(1))?,
        };
        let anchor = self.with_date(date);
        (anchor.date < self.date).then_some(anchor)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct DayCell {
    pub(crate) date: Date,
    pub(crate) in_current_month: bool,
    pub(crate) is_today: bool,
    pub(crate) status: NoteState,
    pub(crate) other_notes: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct PeriodRow {
    /// Whole weeks between the reference date and the first day of the row
    pub(crate) number: i64,
    pub(crate) cells: [DayCell; DAYS_IN_WEEK],
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct PeriodGrid {
    anchor: PeriodAnchor,
    first_weekday: Weekday,
    rows: Vec<PeriodRow>,
}

impl PeriodGrid {
    pub(crate) fn anchor(&self) -> PeriodAnchor {
        self.anchor
    }

    pub(crate) fn first_weekday(&self) -> Weekday {
        self.first_weekday
    }

    pub(crate) fn rows(&self) -> &[PeriodRow] {
        &self.rows
    }

    #[cfg(test)]
    pub(crate) fn cells(&self) -> impl Iterator<Item = &DayCell> {
        self.rows.iter().flat_map(|r| r.cells.iter())
    }

    pub(crate) fn cells_mut(&mut self) -> impl Iterator<Item = &mut DayCell> {
        self.rows.iter_mut().flat_map(|r| r.cells.iter_mut())
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, date: Date) -> bool {
        self.cells().any(|c| c.date == date)
    }
}

/// Lay out the days of the period around `anchor`.
///
/// Weeks start on the weekday of `reference`, and each row is numbered by
/// whole weeks since `reference`, so numbering does not reset at year
/// boundaries.  Cells carry no note status; that is filled in by the caller.
pub(crate) fn compute_cells(anchor: PeriodAnchor, reference: Date, today: Date) -> PeriodGrid {
    let first_weekday = reference.weekday();
    let start = anchor.grid_start(first_weekday);
    let month = anchor.date.month();
    let year = anchor.date.year();
    let days = iter_days_from(start)
        .take(anchor.kind.rows() * DAYS_IN_WEEK)
        .map(|date| DayCell {
            date,
            in_current_month: date.month() == month && date.year() == year,
            is_today: date == today,
            status: NoteState::None,
            other_notes: 0,
        })
        .collect::<Vec<_>>();
    let rows = days
        .chunks_exact(DAYS_IN_WEEK)
        .filter_map(|chunk| {
            let cells = <[DayCell; DAYS_IN_WEEK]>::try_from(chunk).ok()?;
            let number = (cells[0].date - reference).whole_days().div_euclid(7);
            Some(PeriodRow { number, cells })
        })
        .collect();
    PeriodGrid {
        anchor,
        first_weekday,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    // A Sunday
    const SUNDAY_REF: Date = date!(2023 - 01 - 01);

    // A Monday
    const MONDAY_REF: Date = date!(2024 - 01 - 01);

    fn month(date: Date) -> PeriodAnchor {
        PeriodAnchor::new(date, PeriodKind::Month)
    }

    #[test]
    fn test_month_grid_shape() {
        let grid = compute_cells(
            month(date!(2025 - 03 - 15)),
            SUNDAY_REF,
            date!(2025 - 03 - 02),
        );
        assert_eq!(grid.rows().len(), MONTH_ROWS);
        let first = grid.rows()[0].cells[0];
        assert_eq!(first.date, date!(2025 - 02 - 23));
        assert!(!first.in_current_month);
        let march1 = grid.rows()[0].cells[6];
        assert_eq!(march1.date, date!(2025 - 03 - 01));
        assert!(march1.in_current_month);
        let last = grid.rows()[5].cells[6];
        assert_eq!(last.date, date!(2025 - 04 - 05));
        assert!(!last.in_current_month);
        assert_eq!(grid.cells().filter(|c| c.in_current_month).count(), 31);
        let todays = grid.cells().filter(|c| c.is_today).collect::<Vec<_>>();
        assert_eq!(todays.len(), 1);
        assert_eq!(todays[0].date, date!(2025 - 03 - 02));
    }

    #[test]
    fn test_weeks_start_on_reference_weekday() {
        let grid = compute_cells(
            month(date!(2025 - 03 - 15)),
            MONDAY_REF,
            date!(2025 - 03 - 02),
        );
        assert_eq!(grid.first_weekday(), Weekday::Monday);
        assert_eq!(grid.rows()[0].cells[0].date, date!(2025 - 02 - 24));
        assert_eq!(grid.rows()[0].cells[5].date, date!(2025 - 03 - 01));
        for row in grid.rows() {
            assert_eq!(row.cells[0].date.weekday(), Weekday::Monday);
        }
    }

    #[test]
    fn test_month_starting_on_first_weekday() {
        // June 2025 starts on a Sunday
        let grid = compute_cells(
            month(date!(2025 - 06 - 10)),
            SUNDAY_REF,
            date!(2025 - 03 - 02),
        );
        assert_eq!(grid.rows()[0].cells[0].date, date!(2025 - 06 - 01));
        assert!(grid.cells().all(|c| !c.is_today));
    }

    #[test]
    fn test_leap_february() {
        let grid = compute_cells(
            month(date!(2024 - 02 - 29)),
            SUNDAY_REF,
            date!(2024 - 02 - 29),
        );
        let feb = grid
            .cells()
            .filter(|c| c.in_current_month)
            .map(|c| c.date)
            .collect::<Vec<_>>();
        assert_eq!(feb.len(), 29);
        assert_eq!(feb.last(), Some(&date!(2024 - 02 - 29)));
        assert!(grid.contains(date!(2024 - 03 - 01)));
    }

    #[test]
    fn test_period_numbers_cross_year_boundary() {
        let grid = compute_cells(
            month(date!(2024 - 01 - 10)),
            SUNDAY_REF,
            date!(2024 - 01 - 10),
        );
        let numbers = grid.rows().iter().map(|r| r.number).collect::<Vec<_>>();
        // 2023-12-31 is 52 weeks after 2023-01-01
        assert_eq!(numbers, [52, 53, 54, 55, 56, 57]);
    }

    #[test]
    fn test_period_numbers_before_reference() {
        let grid = compute_cells(
            PeriodAnchor::new(date!(2022 - 12 - 28), PeriodKind::Week),
            SUNDAY_REF,
            date!(2022 - 12 - 28),
        );
        assert_eq!(grid.rows().len(), 1);
        assert_eq!(grid.rows()[0].number, -1);
        assert_eq!(grid.rows()[0].cells[0].date, date!(2022 - 12 - 25));
    }

    #[test]
    fn test_week_grid() {
        let grid = compute_cells(
            PeriodAnchor::new(date!(2025 - 03 - 01), PeriodKind::Week),
            SUNDAY_REF,
            date!(2025 - 03 - 02),
        );
        assert_eq!(grid.rows().len(), 1);
        let row = &grid.rows()[0];
        assert_eq!(row.cells[0].date, date!(2025 - 02 - 23));
        assert_eq!(row.cells[6].date, date!(2025 - 03 - 01));
        assert!(row.cells[6].in_current_month);
        assert!(!row.cells[0].in_current_month);
        assert!(row.cells.iter().all(|c| !c.is_today));
    }

    #[test]
    fn test_recompute_is_identical() {
        let anchor = month(date!(2025 - 03 - 15));
        let a = compute_cells(anchor, SUNDAY_REF, date!(2025 - 03 - 02));
        let b = compute_cells(anchor, SUNDAY_REF, date!(2025 - 03 - 02));
        assert_eq!(a, b);
    }

    #[test]
    fn test_grid_near_end_of_time() {
        let grid = compute_cells(month(Date::MAX), SUNDAY_REF, Date::MAX);
        assert_eq!(grid.rows().len(), MONTH_ROWS);
        let grid = compute_cells(month(Date::MIN), SUNDAY_REF, Date::MIN);
        assert_eq!(grid.rows().len(), MONTH_ROWS);
    }

    #[test]
    fn test_navigation() {
        let anchor = month(date!(2025 - 01 - 31));
        let next = anchor.next().unwrap();
        assert_eq!(next.date(), date!(2025 - 02 - 28));
        assert_eq!(next.previous().unwrap().date(), date!(2025 - 01 - 28));
        let week = anchor.with_kind(PeriodKind::Week);
        assert_eq!(week.next().unwrap().date(), date!(2025 - 02 - 07));
        assert_eq!(month(Date::MAX).next(), None);
        assert_eq!(month(Date::MIN).previous(), None);
    }

    #[test]
    fn test_same_period() {
        let a = month(date!(2025 - 03 - 01));
        let b = month(date!(2025 - 03 - 31));
        let c = month(date!(2025 - 04 - 01));
        assert!(a.same_period(&b, Weekday::Sunday));
        assert!(!a.same_period(&c, Weekday::Sunday));
        let w1 = PeriodAnchor::new(date!(2025 - 03 - 02), PeriodKind::Week);
        let w2 = PeriodAnchor::new(date!(2025 - 03 - 03), PeriodKind::Week);
        assert!(w1.same_period(&w2, Weekday::Sunday));
        assert!(!w1.same_period(&w2, Weekday::Monday));
    }
}
