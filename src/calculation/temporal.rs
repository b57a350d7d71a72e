//! Temporal validity filtering.
//!
//! Every time-bounded entity (rules, memberships, contracts, positions)
//! answers "is this in force at instant T?" with the same predicate:
//! `valid_from <= T` and `valid_until` absent or `valid_until >= T`.
//! The upper bound is inclusive of its boundary.

/// A validity interval with an inclusive lower bound and an optional,
/// inclusive upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow<T> {
    /// Start of validity (inclusive).
    pub from: T,
    /// End of validity (inclusive); `None` means open-ended.
    pub until: Option<T>,
}

impl<T: PartialOrd + Copy> ValidityWindow<T> {
    /// Creates a window.
    pub fn new(from: T, until: Option<T>) -> Self {
        Self { from, until }
    }

    /// Returns true when `at` falls inside the window.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::calculation::ValidityWindow;
    ///
    /// let window = ValidityWindow::new(10, Some(20));
    /// assert!(window.contains(10));
    /// assert!(window.contains(20));
    /// assert!(!window.contains(9));
    /// assert!(!window.contains(21));
    /// assert!(ValidityWindow::new(10, None).contains(1_000));
    /// ```
    pub fn contains(&self, at: T) -> bool {
        self.from <= at && self.until.is_none_or(|until| until >= at)
    }
}

/// An entity with a validity window and an activity flag.
pub trait TimeBounded {
    /// The time type the window is expressed in.
    type Point: PartialOrd + Copy;

    /// Returns the validity window.
    fn validity(&self) -> ValidityWindow<Self::Point>;

    /// Returns the soft-delete flag; defaults to active.
    fn is_active(&self) -> bool {
        true
    }
}

/// Returns true when the candidate's window contains `instant`.
///
/// This checks the window only; see [`is_effective_at`] for the check that
/// also honours the activity flag.
pub fn is_valid_at<C: TimeBounded + ?Sized>(candidate: &C, instant: C::Point) -> bool {
    candidate.validity().contains(instant)
}

/// Returns true when the candidate is active and valid at `instant`.
pub fn is_effective_at<C: TimeBounded + ?Sized>(candidate: &C, instant: C::Point) -> bool {
    candidate.is_active() && is_valid_at(candidate, instant)
}

/// Keeps only the candidates effective at `instant`, preserving input order.
pub fn filter_effective<'a, C, I>(candidates: I, instant: C::Point) -> Vec<&'a C>
where
    C: TimeBounded + 'a,
    I: IntoIterator<Item = &'a C>,
{
    candidates
        .into_iter()
        .filter(|candidate| is_effective_at(*candidate, instant))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    struct Window {
        from: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
        active: bool,
    }

    impl TimeBounded for Window {
        type Point = DateTime<Utc>;

        fn validity(&self) -> ValidityWindow<DateTime<Utc>> {
            ValidityWindow::new(self.from, self.until)
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn window(from: DateTime<Utc>, until: Option<DateTime<Utc>>) -> Window {
        Window {
            from,
            until,
            active: true,
        }
    }

    #[test]
    fn test_valid_from_boundary_is_included() {
        let w = window(at(2024, 1, 1), None);
        assert!(is_valid_at(&w, at(2024, 1, 1)));
    }

    #[test]
    fn test_valid_until_boundary_is_included() {
        let w = window(at(2024, 1, 1), Some(at(2024, 6, 30)));
        assert!(is_valid_at(&w, at(2024, 6, 30)));
    }

    #[test]
    fn test_expired_window_is_excluded() {
        let w = window(at(2023, 1, 1), Some(at(2023, 12, 31)));
        assert!(!is_valid_at(&w, at(2024, 1, 1)));
    }

    #[test]
    fn test_future_window_is_excluded() {
        let w = window(at(2025, 1, 1), None);
        assert!(!is_valid_at(&w, at(2024, 1, 1)));
    }

    #[test]
    fn test_inactive_candidate_is_valid_but_not_effective() {
        let w = Window {
            from: at(2024, 1, 1),
            until: None,
            active: false,
        };
        assert!(is_valid_at(&w, at(2024, 3, 1)));
        assert!(!is_effective_at(&w, at(2024, 3, 1)));
    }

    #[test]
    fn test_filter_preserves_order() {
        let windows = vec![
            window(at(2024, 1, 1), None),
            window(at(2025, 1, 1), None),
            window(at(2023, 1, 1), Some(at(2024, 12, 31))),
        ];
        let kept = filter_effective(&windows, at(2024, 6, 1));
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].from, at(2024, 1, 1));
        assert_eq!(kept[1].from, at(2023, 1, 1));
    }
}
