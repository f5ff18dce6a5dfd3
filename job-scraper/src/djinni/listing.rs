use lazy_static::lazy_static;
use scraper::{Html, Selector};

use crate::djinni::{Error, Result};

lazy_static! {
    static ref JOB_LINK: Selector = Selector::parse(".list-jobs__title a.profile").unwrap();
}

/// Links to the detail pages on one listing page, in document order.
/// Hrefs are returned as found; they are resolved when fetched.
pub fn detail_links(listing_page: &Html) -> Result<Vec<String>> {
    listing_page
        .select(&JOB_LINK)
        .map(|el| {
            el.value()
                .attr("href")
                .map(String::from)
                .ok_or(Error::ContentNotFound("job link href"))
        })
        .collect()
}
