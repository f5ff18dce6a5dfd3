use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::djinni::types::Job;
use crate::djinni::{Error, Result};

lazy_static! {
    static ref TITLE: Selector = Selector::parse(".detail--title-wrapper h1").unwrap();
    static ref ADDITIONAL_INFO: Selector = Selector::parse(".job-additional-info--body").unwrap();
    static ref INFO_ITEM: Selector = Selector::parse(".job-additional-info--item").unwrap();
    static ref INFO_ITEM_TEXT: Selector =
        Selector::parse(".job-additional-info--item-text").unwrap();
    static ref TECHNOLOGY_TAG: Selector =
        Selector::parse(".job-additional-info--item-text span").unwrap();
    static ref SALARY: Selector = Selector::parse(".public-salary-item").unwrap();
    static ref PROFILE_SECTION: Selector = Selector::parse(".profile-page-section").unwrap();
    static ref PARAGRAPH: Selector = Selector::parse("p").unwrap();
    static ref SALARY_AMOUNT: Regex = Regex::new(r"^\$(\d+)").unwrap();
}

/// Parse a job detail page into a [`Job`].
///
/// Title, additional info and the views/applications block are required.
/// Experience, salary and technologies fall back to `0` / `None` when the
/// page doesn't state them in the expected shape.
pub fn extract(detail_page: &Html) -> Result<Job> {
    let info = detail_page
        .select(&ADDITIONAL_INFO)
        .next()
        .ok_or(Error::ContentNotFound("additional info"))?;
    let (views, applications) = views_and_applications(detail_page)?;
    Ok(Job::new(
        title(detail_page)?,
        technologies(info)?,
        experience_years(info)?,
        salary(detail_page),
        views,
        applications,
    ))
}

fn text_of(el: ElementRef) -> String {
    el.text().collect()
}

fn title(detail_page: &Html) -> Result<String> {
    let heading = detail_page
        .select(&TITLE)
        .next()
        .ok_or(Error::ContentNotFound("title"))?;
    let text = text_of(heading);
    let first_line = text.trim().lines().next().unwrap_or_default();
    Ok(first_line.trim().to_owned())
}

/// `None` rather than an empty list when the item carries no tags.
fn technologies(info: ElementRef) -> Result<Option<Vec<String>>> {
    let item = info
        .select(&INFO_ITEM)
        .nth(1)
        .ok_or(Error::ContentNotFound("technologies item"))?;
    let tags = item
        .select(&TECHNOLOGY_TAG)
        .map(|span| text_of(span).to_lowercase())
        .collect::<Vec<_>>();
    if tags.is_empty() {
        Ok(None)
    } else {
        Ok(Some(tags))
    }
}

fn experience_years(info: ElementRef) -> Result<u32> {
    let item = info
        .select(&INFO_ITEM)
        .last()
        .ok_or(Error::ContentNotFound("experience item"))?;
    let text = item
        .select(&INFO_ITEM_TEXT)
        .next()
        .map(text_of)
        .ok_or(Error::ContentNotFound("experience text"))?;
    let token = text
        .split_whitespace()
        .next()
        .ok_or(Error::ContentNotFound("experience text"))?;
    // "No experience", "Senior" and the like count as zero years
    if !token.chars().all(|c| c.is_ascii_digit()) {
        return Ok(0);
    }
    Ok(token.parse().unwrap_or_else(|_| {
        log::warn!("experience out of range: '{}', using 0", token);
        0
    }))
}

/// Lower bound of the advertised range; absent, unmatched or out of range
/// amounts all read as no salary.
fn salary(detail_page: &Html) -> Option<u32> {
    let text = text_of(detail_page.select(&SALARY).next()?);
    let captures = SALARY_AMOUNT.captures(&text)?;
    let amount = &captures[1];
    match amount.parse() {
        Ok(amount) => Some(amount),
        Err(_) => {
            log::warn!("salary out of range: '{}', ignoring", amount);
            None
        }
    }
}

/// The stats paragraph ends with "<views> <label> <applications> <label>".
fn views_and_applications(detail_page: &Html) -> Result<(u32, u32)> {
    let section = detail_page
        .select(&PROFILE_SECTION)
        .last()
        .ok_or(Error::ContentNotFound("profile section"))?;
    let paragraph = section
        .select(&PARAGRAPH)
        .next()
        .ok_or(Error::ContentNotFound("profile section paragraph"))?;
    let text = text_of(paragraph);
    let tokens = text.split_whitespace().collect::<Vec<_>>();
    let tail = &tokens[tokens.len().saturating_sub(4)..];
    Ok((
        count(tail.first().copied(), "views")?,
        count(tail.get(2).copied(), "applications")?,
    ))
}

fn count(token: Option<&str>, field: &'static str) -> Result<u32> {
    let token = token.ok_or(Error::ContentNotFound(field))?;
    token.parse().map_err(|_| Error::DataFormat {
        field,
        value: token.to_owned(),
    })
}
