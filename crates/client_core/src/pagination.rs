use shared::protocol::Page;

/// Most page buttons shown at once, ellipses included.
pub const MAX_VISIBLE_SLOTS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    /// Zero-based page index.
    Page(u32),
    Ellipsis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub current: u32,
    pub total_pages: u32,
    pub total_elements: u64,
    pub page_size: u32,
}

impl Pager {
    pub fn from_page<T>(page: &Page<T>) -> Self {
        Self {
            current: page.number,
            total_pages: page.total_pages,
            total_elements: page.total_elements,
            page_size: page.size,
        }
    }

    /// A single page needs no controls.
    pub fn is_visible(&self) -> bool {
        self.total_pages > 1
    }

    pub fn has_previous(&self) -> bool {
        self.current > 0
    }

    pub fn has_next(&self) -> bool {
        self.current + 1 < self.total_pages
    }

    pub fn previous(&self) -> Option<u32> {
        self.has_previous().then(|| self.current - 1)
    }

    pub fn next(&self) -> Option<u32> {
        self.has_next().then(|| self.current + 1)
    }

    pub fn slots(&self) -> Vec<PageSlot> {
        page_window(self.current, self.total_pages)
    }

    /// One-based inclusive range of the items on the current page.
    pub fn item_range(&self) -> (u64, u64) {
        let size = u64::from(self.page_size);
        let start = u64::from(self.current) * size + 1;
        let end = ((u64::from(self.current) + 1) * size).min(self.total_elements);
        (start, end)
    }

    pub fn summary(&self) -> String {
        let (start, end) = self.item_range();
        format!("Showing {start} to {end} of {} results", self.total_elements)
    }
}

/// First and last page are always present; the current page keeps one neighbour on
/// each side.
pub fn page_window(current: u32, total_pages: u32) -> Vec<PageSlot> {
    if total_pages <= MAX_VISIBLE_SLOTS {
        return (0..total_pages).map(PageSlot::Page).collect();
    }

    let last = total_pages - 1;
    let mut slots = vec![PageSlot::Page(0)];
    if current > 2 {
        slots.push(PageSlot::Ellipsis);
    }
    let from = current.saturating_sub(1).max(1);
    let to = (current + 1).min(last - 1);
    slots.extend((from..=to).map(PageSlot::Page));
    if current + 3 < total_pages {
        slots.push(PageSlot::Ellipsis);
    }
    slots.push(PageSlot::Page(last));
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::PageSlot::{Ellipsis, Page as P};

    #[test]
    fn short_ranges_show_every_page() {
        assert_eq!(page_window(0, 3), vec![P(0), P(1), P(2)]);
        assert_eq!(page_window(4, 7).len(), 7);
        assert!(page_window(0, 0).is_empty());
    }

    #[test]
    fn long_ranges_collapse_around_current() {
        assert_eq!(page_window(0, 10), vec![P(0), P(1), Ellipsis, P(9)]);
        assert_eq!(
            page_window(5, 10),
            vec![P(0), Ellipsis, P(4), P(5), P(6), Ellipsis, P(9)]
        );
        assert_eq!(page_window(9, 10), vec![P(0), Ellipsis, P(8), P(9)]);
        assert_eq!(page_window(2, 10), vec![P(0), P(1), P(2), P(3), Ellipsis, P(9)]);
        assert_eq!(page_window(7, 10), vec![P(0), Ellipsis, P(6), P(7), P(8), P(9)]);
    }

    #[test]
    fn item_range_is_clamped_to_total() {
        let pager = Pager {
            current: 2,
            total_pages: 3,
            total_elements: 25,
            page_size: 10,
        };
        assert_eq!(pager.item_range(), (21, 25));
        assert_eq!(pager.summary(), "Showing 21 to 25 of 25 results");
        assert_eq!(pager.previous(), Some(1));
        assert_eq!(pager.next(), None);
    }

    #[test]
    fn single_page_is_hidden() {
        let page: Page<u8> = Page::empty(10);
        let pager = Pager::from_page(&page);
        assert!(!pager.is_visible());
        assert!(!pager.has_next());
    }
}
