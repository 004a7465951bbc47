/// Pagination for the review grid
///
/// Pure arithmetic over the image count; the caller owns the file list.

use std::ops::Range;

use crate::config::{DEFAULT_IMAGES_PER_PAGE, GRID_COLUMNS};

/// What the user asked the paginator to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest<'a> {
    /// Recompute only (e.g. after the file list changed)
    Stay,
    /// Move relative to the current page (-1 = previous, +1 = next)
    Step(i64),
    /// Jump to the page typed into the "Go to page" box
    Goto(&'a str),
}

/// Result of a navigation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Moved,
    /// The goto text was not a number; the page did not change
    InvalidGoto(String),
}

/// Page state of the review step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    pub page_size: usize,
    pub current_page: usize,
    pub total_pages: usize,
    /// Bumped on every navigation so the grid knows to redraw
    pub refresh: u64,
}

impl Default for PageState {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGES_PER_PAGE)
    }
}

/// `ceil(count / page_size)`, never less than one page
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    count.div_ceil(page_size).max(1)
}

impl PageState {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            current_page: 1,
            total_pages: 1,
            refresh: 0,
        }
    }

    /// Start over on page one for a freshly listed folder
    pub fn reset(&mut self, count: usize) {
        self.total_pages = total_pages(count, self.page_size);
        self.current_page = 1;
        self.refresh += 1;
    }

    /// Apply a navigation request against `count` images
    pub fn navigate(&mut self, count: usize, request: PageRequest<'_>) -> Navigation {
        self.total_pages = total_pages(count, self.page_size);
        self.refresh += 1;

        let target = match request {
            PageRequest::Stay => self.current_page as i64,
            PageRequest::Step(delta) => self.current_page as i64 + delta,
            PageRequest::Goto(raw) => match raw.trim().parse::<i64>() {
                Ok(page) => page,
                Err(_) => {
                    tracing::warn!("Invalid page number entered: {:?}", raw);
                    self.current_page = self.clamp(self.current_page as i64);
                    return Navigation::InvalidGoto(raw.to_string());
                }
            },
        };

        self.current_page = self.clamp(target);
        tracing::debug!(
            "Pagination: ipp={}, page={}, total={}",
            self.page_size,
            self.current_page,
            self.total_pages
        );
        Navigation::Moved
    }

    /// Change the page size from the picker's raw value; garbage falls back to the default
    pub fn set_page_size(&mut self, raw: &str, count: usize) {
        self.page_size = raw
            .trim()
            .parse::<usize>()
            .unwrap_or(DEFAULT_IMAGES_PER_PAGE);
        self.navigate(count, PageRequest::Stay);
    }

    /// Indices of the images on the current page, capped at the grid capacity
    pub fn page_range(&self, count: usize, capacity: usize) -> Range<usize> {
        let start = (self.current_page - 1).saturating_mul(self.page_size);
        let visible = self.page_size.min(capacity);
        let end = start.saturating_add(visible).min(count);
        start.min(end)..end
    }

    /// Grid rows needed to show `visible` images
    pub fn rows_needed(visible: usize) -> usize {
        visible.div_ceil(GRID_COLUMNS)
    }

    pub fn label(&self) -> String {
        format!("Page {} / {}", self.current_page, self.total_pages)
    }

    fn clamp(&self, page: i64) -> usize {
        page.clamp(1, self.total_pages as i64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 9), 1);
        assert_eq!(total_pages(9, 9), 1);
        assert_eq!(total_pages(10, 9), 2);
        assert_eq!(total_pages(27, 9), 3);
        assert_eq!(total_pages(5, 0), 1);
    }

    #[test]
    fn test_navigation_stays_in_bounds() {
        for page_size in [1usize, 3, 9, 18] {
            for count in [0usize, 1, 8, 9, 10, 40] {
                let mut page = PageState::new(page_size);
                page.reset(count);
                for request in [
                    PageRequest::Step(-1),
                    PageRequest::Step(1),
                    PageRequest::Step(1),
                    PageRequest::Goto("999"),
                    PageRequest::Step(1),
                    PageRequest::Goto("-4"),
                    PageRequest::Step(-1),
                ] {
                    page.navigate(count, request);
                    assert_eq!(page.total_pages, total_pages(count, page_size));
                    assert!(page.current_page >= 1);
                    assert!(page.current_page <= page.total_pages);
                }
            }
        }
    }

    #[test]
    fn test_goto() {
        let mut page = PageState::new(9);
        page.reset(50);
        assert_eq!(page.navigate(50, PageRequest::Goto(" 4 ")), Navigation::Moved);
        assert_eq!(page.current_page, 4);
        page.navigate(50, PageRequest::Goto("100"));
        assert_eq!(page.current_page, 6);
    }

    #[test]
    fn test_invalid_goto_keeps_page() {
        let mut page = PageState::new(9);
        page.reset(50);
        page.navigate(50, PageRequest::Step(1));
        let before = page;

        let nav = page.navigate(50, PageRequest::Goto("abc"));

        assert_eq!(nav, Navigation::InvalidGoto("abc".to_string()));
        assert_eq!(page.current_page, before.current_page);
        assert_eq!(page.total_pages, before.total_pages);
        assert_eq!(page.page_size, before.page_size);
    }

    #[test]
    fn test_refresh_counter_increments() {
        let mut page = PageState::new(3);
        page.reset(10);
        let first = page.refresh;
        page.navigate(10, PageRequest::Goto("x"));
        page.navigate(10, PageRequest::Step(1));
        assert_eq!(page.refresh, first + 2);
    }

    #[test]
    fn test_set_page_size_reclamps() {
        let mut page = PageState::new(3);
        page.reset(10);
        page.navigate(10, PageRequest::Goto("4"));
        assert_eq!(page.current_page, 4);

        page.set_page_size("18", 10);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.current_page, 1);

        page.set_page_size("lots", 10);
        assert_eq!(page.page_size, DEFAULT_IMAGES_PER_PAGE);
    }

    #[test]
    fn test_page_range() {
        let mut page = PageState::new(9);
        page.reset(20);
        assert_eq!(page.page_range(20, 18), 0..9);
        page.navigate(20, PageRequest::Goto("3"));
        assert_eq!(page.page_range(20, 18), 18..20);
        assert_eq!(PageState::rows_needed(2), 1);
        assert_eq!(PageState::rows_needed(9), 3);
        assert_eq!(page.label(), "Page 3 / 3");
    }
}
