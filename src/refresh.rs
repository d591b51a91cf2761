//! Coalescing of redraw requests.
//!
//! File events and navigation only *schedule* work here.  Cell invalidations
//! are debounced: a redraw fires once no new invalidation has arrived for the
//! debounce window, or once the maximum wait since the first pending
//! invalidation has elapsed, whichever comes first.  Navigation needs the
//! whole grid and is due at once.
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use time::Date;

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Redraw {
    /// Recompute the whole grid
    Full,
    /// Refresh the status of just these dates' cells
    Cells(BTreeSet<Date>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum State {
    Idle,
    Pending {
        scope: Redraw,
        first_at: Instant,
        deadline: Instant,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct RefreshCoordinator {
    debounce: Duration,
    max_wait: Duration,
    state: State,
}

impl RefreshCoordinator {
    pub(crate) fn new(debounce: Duration, max_wait: Duration) -> RefreshCoordinator {
        RefreshCoordinator {
            debounce,
            max_wait: max_wait.max(debounce),
            state: State::Idle,
        }
    }

    pub(crate) fn set_timing(&mut self, debounce: Duration, max_wait: Duration) {
        self.debounce = debounce;
        self.max_wait = max_wait.max(debounce);
    }

    #[cfg(test)]
    pub(crate) fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            State::Idle => None,
            State::Pending { deadline, .. } => Some(deadline),
        }
    }

    pub(crate) fn schedule(&mut self, dates: BTreeSet<Date>, now: Instant) {
        if dates.is_empty() {
            return;
        }
        match &mut self.state {
            State::Idle => {
                self.state = State::Pending {
                    scope: Redraw::Cells(dates),
                    first_at: now,
                    deadline: later(now, self.debounce),
                };
            }
            State::Pending {
                scope,
                first_at,
                deadline,
            } => {
                // A full redraw already covers every cell and is due
                // immediately, so it needs no new deadline
                if let Redraw::Cells(pending) = scope {
                    pending.extend(dates);
                    *deadline = later(now, self.debounce).min(later(*first_at, self.max_wait));
                }
            }
        }
    }

    pub(crate) fn on_navigate(&mut self, now: Instant) {
        let first_at = match self.state {
            State::Idle => now,
            State::Pending { first_at, .. } => first_at,
        };
        self.state = State::Pending {
            scope: Redraw::Full,
            first_at,
            deadline: now,
        };
    }

    /// Returns the redraw that is due at `now`, if any
    pub(crate) fn poll(&mut self, now: Instant) -> Option<Redraw> {
        match self.state {
            State::Pending { deadline, .. } if deadline <= now => {
                match std::mem::replace(&mut self.state, State::Idle) {
                    State::Pending { scope, .. } => Some(scope),
                    State::Idle => None,
                }
            }
            _ => None,
        }
    }
}

fn later(t: Instant, d: Duration) -> Instant {
    t.checked_add(d).unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const DEBOUNCE: Duration = Duration::from_millis(500);
    const MAX_WAIT: Duration = Duration::from_millis(2000);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_coalesces_invalidations() {
        let start = Instant::now();
        let mut rc = RefreshCoordinator::new(DEBOUNCE, MAX_WAIT);
        let dates = [
            date!(2025 - 03 - 02),
            date!(2025 - 03 - 03),
            date!(2025 - 03 - 04),
            date!(2025 - 03 - 02),
            date!(2025 - 03 - 09),
        ];
        for (i, d) in (0u64..).zip(dates) {
            rc.schedule(BTreeSet::from([d]), start + ms(i * 100));
            assert_eq!(rc.poll(start + ms(i * 100)), None);
        }
        assert_eq!(rc.next_deadline(), Some(start + ms(900)));
        assert_eq!(rc.poll(start + ms(899)), None);
        let mut passes = Vec::new();
        for t in (900..3000).step_by(50) {
            passes.extend(rc.poll(start + ms(t)));
        }
        assert_eq!(
            passes,
            [Redraw::Cells(BTreeSet::from([
                date!(2025 - 03 - 02),
                date!(2025 - 03 - 03),
                date!(2025 - 03 - 04),
                date!(2025 - 03 - 09),
            ]))]
        );
        assert!(rc.is_idle());
    }

    #[test]
    fn test_max_wait_bounds_deferral() {
        let start = Instant::now();
        let mut rc = RefreshCoordinator::new(DEBOUNCE, MAX_WAIT);
        let mut fired = None;
        for t in (0..5000).step_by(250) {
            let now = start + ms(t);
            if let Some(redraw) = rc.poll(now) {
                fired = Some((t, redraw));
                break;
            }
            rc.schedule(BTreeSet::from([date!(2025 - 03 - 02)]), now);
        }
        let (t, redraw) = fired.unwrap();
        assert_eq!(t, 2000);
        assert_eq!(redraw, Redraw::Cells(BTreeSet::from([date!(2025 - 03 - 02)])));
    }

    #[test]
    fn test_navigation_is_immediate_and_full() {
        let start = Instant::now();
        let mut rc = RefreshCoordinator::new(DEBOUNCE, MAX_WAIT);
        rc.schedule(BTreeSet::from([date!(2025 - 03 - 02)]), start);
        rc.on_navigate(start + ms(10));
        rc.schedule(BTreeSet::from([date!(2025 - 03 - 03)]), start + ms(20));
        assert_eq!(rc.poll(start + ms(20)), Some(Redraw::Full));
        assert_eq!(rc.poll(start + ms(20)), None);
    }

    #[test]
    fn test_empty_schedule_is_ignored() {
        let mut rc = RefreshCoordinator::new(DEBOUNCE, MAX_WAIT);
        rc.schedule(BTreeSet::new(), Instant::now());
        assert!(rc.is_idle());
        assert_eq!(rc.next_deadline(), None);
    }
}
