use lazy_static::lazy_static;
use scraper::{Html, Selector};

use crate::djinni::{Error, Result};

lazy_static! {
    static ref PAGINATION: Selector = Selector::parse(".pagination_with_numbers").unwrap();
    static ref PAGE_ITEM: Selector = Selector::parse("li").unwrap();
}

/// Total number of listing pages, read off the first one.
///
/// Without a pagination control everything fits on one page. Otherwise the
/// last indicator is the "next" arrow and the one before it is the last page.
pub fn page_count(first_page: &Html) -> Result<u32> {
    let pagination = match first_page.select(&PAGINATION).next() {
        Some(pagination) => pagination,
        None => return Ok(1),
    };
    let items = pagination.select(&PAGE_ITEM).collect::<Vec<_>>();
    let last_page = items
        .len()
        .checked_sub(2)
        .map(|i| items[i])
        .ok_or(Error::ContentNotFound("pagination last page"))?;
    let text = last_page.text().collect::<String>();
    text.trim()
        .parse()
        .map_err(|_| Error::UnexpectedContent {
            what: "pagination last page",
            text,
        })
}
