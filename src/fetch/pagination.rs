//! Shared pagination loop for vendor list endpoints.
//!
//! Vendors disagree on how the next page is addressed (page numbers, offset
//! starts, response headers); the loop below is generic over an opaque cursor
//! and leaves cursor extraction to the per-vendor fetch closure.

use std::future::Future;

use crate::error::Result;

/// One fetched page: its items and the cursor of the page after it, if any.
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

/// Follows pages from `first` until the vendor reports no further page or
/// `max_results` items are collected, whichever comes first.
pub async fn collect<T, C, F, Fut>(first: C, max_results: usize, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<Page<T, C>>>,
{
    let mut items = Vec::new();
    let mut cursor = Some(first);

    while let Some(current) = cursor.take() {
        let page = fetch(current).await?;
        items.extend(page.items);
        if items.len() >= max_results {
            items.truncate(max_results);
            break;
        }
        cursor = page.next;
    }

    Ok(items)
}
