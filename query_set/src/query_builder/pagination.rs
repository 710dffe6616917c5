//! Pagination composer
//!
//! Every `slice` in a chain narrows the window left by the slices before it.
//! Bounds are relative to the current window, so the start of the composed
//! window only ever moves forward and its end only ever moves back.

use std::ops::{Bound, RangeBounds};

/// Half-open row window; `end: None` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: u64,
    pub end: Option<u64>,
}

impl Default for Window {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Window {
    pub fn unbounded() -> Self {
        Self {
            start: 0,
            end: None,
        }
    }

    pub fn new(start: u64, end: Option<u64>) -> Self {
        Self { start, end }
    }

    pub fn from_range(range: impl RangeBounds<u64>) -> Self {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => Some(e.saturating_add(1)),
            Bound::Excluded(&e) => Some(e),
            Bound::Unbounded => None,
        };
        Self { start, end }
    }

    /// Narrow `self` by a window expressed relative to it
    pub fn narrow(self, relative: Window) -> Window {
        let start = self.start.saturating_add(relative.start);
        let end = match (relative.end.map(|e| self.start.saturating_add(e)), self.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, b) => b,
        };
        Window { start, end }
    }

    /// Fold windows in root-to-leaf order
    pub fn compose<'a>(windows: impl IntoIterator<Item = &'a Window>) -> Window {
        windows
            .into_iter()
            .fold(Window::unbounded(), |acc, w| acc.narrow(*w))
    }

    pub fn offset(&self) -> u64 {
        self.start
    }

    pub fn limit(&self) -> Option<u64> {
        self.end.map(|end| end.saturating_sub(self.start))
    }

    pub fn to_sql(&self) -> String {
        match self.limit() {
            Some(limit) => format!("LIMIT {} OFFSET {}", limit, self.start),
            None => format!("LIMIT ALL OFFSET {}", self.start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_slices_compose() {
        let window = Window::compose(&[Window::from_range(10..20), Window::from_range(2..5)]);
        assert_eq!(window.offset(), 12);
        assert_eq!(window.limit(), Some(3));
        assert_eq!(window.to_sql(), "LIMIT 3 OFFSET 12");
    }

    #[test]
    fn test_open_ended_slice() {
        let window = Window::compose(&[Window::from_range(5..)]);
        assert_eq!(window.to_sql(), "LIMIT ALL OFFSET 5");
    }

    #[test]
    fn test_no_slices_is_unbounded() {
        assert_eq!(Window::compose(&[]).to_sql(), "LIMIT ALL OFFSET 0");
    }

    #[test]
    fn test_inner_slice_cannot_widen_outer() {
        let window = Window::compose(&[Window::from_range(0..5), Window::from_range(3..50)]);
        assert_eq!(window.offset(), 3);
        assert_eq!(window.limit(), Some(2));
    }

    #[test]
    fn test_slice_past_end_is_empty() {
        let window = Window::compose(&[Window::from_range(0..5), Window::from_range(8..10)]);
        assert_eq!(window.offset(), 8);
        assert_eq!(window.limit(), Some(0));
    }

    #[test]
    fn test_open_slice_keeps_outer_end() {
        let window = Window::compose(&[Window::from_range(10..20), Window::from_range(4..)]);
        assert_eq!(window.offset(), 14);
        assert_eq!(window.limit(), Some(6));
    }

    #[test]
    fn test_inclusive_range() {
        assert_eq!(Window::from_range(2..=4), Window::new(2, Some(5)));
    }
}
