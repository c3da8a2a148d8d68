use crate::model::group::GroupMarker;
use crate::model::post::Post;
use crate::model::user::UserMarker;
use crate::model::Id;
use serde::Serialize;

/// Posts per feed page. Fixed, not caller-controlled.
pub const PAGE_SIZE: u64 = 10;

/// The filter basis of a feed query.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum FeedScope {
    /// Every post.
    All,
    /// Posts tagged to one group.
    Group(Id<GroupMarker>),
    /// Posts written by one author.
    Author(Id<UserMarker>),
    /// Posts written by anyone the given user follows.
    Following(Id<UserMarker>),
}

/// One page of a composed feed, newest post first.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct FeedPage {
    pub items: Vec<Post>,
    pub page: u64,
    pub page_size: u64,
    pub total_count: u64,
    pub total_pages: u64,
}

/// The resolved slice of a feed, after clamping the requested page number.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct PageWindow {
    pub page: u64,
    pub offset: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl PageWindow {
    /// Resolves a 1-based page request against the scope's total count.
    ///
    /// Requests past the end are clamped to the last page rather than
    /// rejected, and a page number of zero also resolves to the last page;
    /// both are long-standing behavior that callers rely on. An absent page
    /// number means page one. An empty scope still has one (empty) page.
    #[must_use]
    pub fn resolve(requested: Option<u64>, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(PAGE_SIZE).max(1);
        let page = match requested {
            None => 1,
            Some(0) => total_pages,
            Some(number) => number.min(total_pages),
        };

        Self {
            page,
            offset: (page - 1) * PAGE_SIZE,
            limit: PAGE_SIZE,
            total_pages,
        }
    }
}

impl FeedPage {
    #[must_use]
    pub fn new(items: Vec<Post>, window: PageWindow, total_count: u64) -> Self {
        Self {
            items,
            page: window.page,
            page_size: PAGE_SIZE,
            total_count,
            total_pages: window.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::feed::{PAGE_SIZE, PageWindow};

    #[test]
    fn first_page_by_default() {
        let window = PageWindow::resolve(None, 42);

        assert_eq!(window.page, 1);
        assert_eq!(window.offset, 0);
        assert_eq!(window.limit, PAGE_SIZE);
        assert_eq!(window.total_pages, 5);
    }

    #[test]
    fn twelve_posts_make_two_pages() {
        let first = PageWindow::resolve(Some(1), 12);
        assert_eq!((first.page, first.offset), (1, 0));

        let second = PageWindow::resolve(Some(2), 12);
        assert_eq!((second.page, second.offset), (2, 10));
        assert_eq!(second.total_pages, 2);
    }

    #[test]
    fn out_of_range_requests_clamp_to_the_last_page() {
        let window = PageWindow::resolve(Some(99), 12);
        assert_eq!((window.page, window.offset), (2, 10));

        let zero = PageWindow::resolve(Some(0), 12);
        assert_eq!((zero.page, zero.offset), (2, 10));
    }

    #[test]
    fn empty_scope_has_a_single_empty_page() {
        let window = PageWindow::resolve(Some(7), 0);

        assert_eq!(window.page, 1);
        assert_eq!(window.offset, 0);
        assert_eq!(window.total_pages, 1);
    }

    #[test]
    fn exact_multiple_has_no_trailing_page() {
        let window = PageWindow::resolve(Some(3), 20);

        assert_eq!(window.page, 2);
        assert_eq!(window.total_pages, 2);
    }
}
