//! Queries over a materialized snapshot: filtering, sorting, pagination,
//! aggregates and CSV export.
//!
//! Everything here is pure and works on `&[Event]`, typically
//! `manager.state().events()`.

mod export;
mod filter;
mod sort;
mod summary;

pub use export::{export_csv, export_file_name};
pub use filter::{DateRange, EventFilter};
pub use sort::{paginate, sort_events, Page, SortDirection, SortField, SortOrder};
pub use summary::{timeline, EventStats, Facets, TimelineDay};

use crate::event::Event;

/// Filter, sort and page in one step.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedQuery {
    pub filter: EventFilter,
    pub order: SortOrder,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl FeedQuery {
    pub fn new(page_size: usize) -> Self {
        Self {
            filter: EventFilter::default(),
            order: SortOrder::default(),
            page: 1,
            page_size,
        }
    }

    /// Replace the filter and go back to the first page.
    pub fn set_filter(&mut self, filter: EventFilter) {
        self.filter = filter;
        self.page = 1;
    }

    /// Matching events in sort order, before paging.
    pub fn matching(&self, events: &[Event]) -> Vec<Event> {
        let mut matched = self.filter.apply(events);
        sort_events(&mut matched, self.order);
        matched
    }

    pub fn run(&self, events: &[Event]) -> Page<Event> {
        paginate(&self.matching(events), self.page, self.page_size)
    }
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self::new(10)
    }
}
