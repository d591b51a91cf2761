mod grid;
mod util;
mod view;
mod widget;
#[cfg(test)]
pub(crate) use self::grid::PeriodKind;
pub(crate) use self::view::{CalendarView, Moved, OutOfTimeError};
pub(crate) use self::widget::Calendar;
