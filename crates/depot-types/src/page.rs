use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Page size used when a caller does not supply one.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Upper bound on page size; larger requests are clamped.
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Offset-based page boundaries for a listing.
///
/// `limit` is always within `1..=MAX_PAGE_SIZE`. Requests may also be built
/// from a zero-based page number and a page size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    offset: u64,
    limit: u64,
}

impl PageRequest {
    /// Page starting at `offset` holding at most `limit` items.
    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Zero-based page `number` of `size` items.
    pub fn page(number: u64, size: u64) -> Self {
        let limit = size.clamp(1, MAX_PAGE_SIZE);
        Self {
            offset: number.saturating_mul(limit),
            limit,
        }
    }

    /// First page of `size` items.
    pub fn first(size: u64) -> Self {
        Self::page(0, size)
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Zero-based page number this request falls on.
    pub fn number(&self) -> u64 {
        self.offset / self.limit
    }

    /// The request for the following page.
    pub fn next(&self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            limit: self.limit,
        }
    }

    /// Index range this page selects out of `len` ordered items.
    ///
    /// Empty when the offset lies beyond the data.
    pub fn window(&self, len: usize) -> Range<usize> {
        let start = usize::try_from(self.offset).unwrap_or(usize::MAX).min(len);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        start..start.saturating_add(limit).min(len)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

/// A bounded slice of a listing plus the total count for its scope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            request,
        }
    }

    /// Page of `request` cut out of the full ordered scope.
    pub fn from_scope(scope: Vec<T>, request: PageRequest) -> Self {
        let total = scope.len() as u64;
        let window = request.window(scope.len());
        let items = scope
            .into_iter()
            .skip(window.start)
            .take(window.len())
            .collect();
        Self::new(items, total, request)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of pages of `request.limit()` items needed to cover `total`.
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.request.limit())
    }

    pub fn has_next(&self) -> bool {
        self.request.offset().saturating_add(self.request.limit()) < self.total
    }

    /// Transform the items, keeping the totals and request.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}
