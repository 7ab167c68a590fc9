//! List, week and month layouts.
//!
//! # Invariants
//! - Per-date lesson groups are sorted ascending by `order` (stable on ties).
//! - Week runs never exceed 5 days and never span a Monday boundary.
//! - Month grids start on Monday and always contain whole weeks.

use crate::dates::{format_display, to_date_key};
use crate::model::lesson::Lesson;
use chrono::{Datelike, Months, NaiveDate, Weekday};
use std::collections::BTreeMap;
use std::{iter, mem};

const DAYS_PER_WEEK: usize = 7;
const SCHOOL_DAYS_PER_WEEK: usize = 5;

/// One cell of a month grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthCell {
    /// Padding before the 1st or after the last day.
    Empty,
    Day(NaiveDate),
}

impl MonthCell {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Empty => None,
            Self::Day(date) => Some(*date),
        }
    }
}

/// Groups `lessons` under each of `dates`, keyed by canonical date string.
///
/// Every requested date gets an entry, empty when no lesson falls on it.
/// Lessons on dates that were not requested are dropped.
pub fn lessons_by_date<'a, I>(lessons: I, dates: &[NaiveDate]) -> BTreeMap<String, Vec<&'a Lesson>>
where
    I: IntoIterator<Item = &'a Lesson>,
{
    let mut grouped: BTreeMap<String, Vec<&'a Lesson>> = dates
        .iter()
        .map(|date| (to_date_key(*date), Vec::new()))
        .collect();

    for lesson in lessons {
        if let Some(bucket) = grouped.get_mut(&to_date_key(lesson.date)) {
            bucket.push(lesson);
        }
    }
    for bucket in grouped.values_mut() {
        bucket.sort_by_key(|lesson| lesson.order);
    }
    grouped
}

/// Splits ascending weekdays into calendar-week runs of at most 5 days.
///
/// A run closes when it reaches 5 days or when the next date is a Monday.
pub fn weeks_from(weekdays: &[NaiveDate]) -> Vec<Vec<NaiveDate>> {
    let mut weeks = Vec::new();
    let mut current = Vec::with_capacity(SCHOOL_DAYS_PER_WEEK);

    for (index, date) in weekdays.iter().enumerate() {
        current.push(*date);
        let next_is_monday = weekdays
            .get(index + 1)
            .is_some_and(|next| next.weekday() == Weekday::Mon);
        if current.len() == SCHOOL_DAYS_PER_WEEK || next_is_monday {
            weeks.push(mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        weeks.push(current);
    }
    weeks
}

/// Header label for one week run, e.g. `Week of Mon, Jan 1 - Fri, Jan 5`.
pub fn week_label(week: &[NaiveDate]) -> Option<String> {
    let first = week.first()?;
    let last = week.last()?;
    Some(format!(
        "Week of {} - {}",
        format_display(*first),
        format_display(*last)
    ))
}

/// Lays out one month as Monday-first weeks.
///
/// Returns `None` for an invalid `year`/`month` pair. `month` is 1-based.
pub fn month_grid(year: i32, month: u32) -> Option<Vec<MonthCell>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = first.checked_add_months(Months::new(1))?;
    let leading = first.weekday().num_days_from_monday() as usize;

    let mut cells = vec![MonthCell::Empty; leading];
    cells.extend(
        first
            .iter_days()
            .take_while(|day| *day < next_month)
            .map(MonthCell::Day),
    );

    let trailing = (DAYS_PER_WEEK - cells.len() % DAYS_PER_WEEK) % DAYS_PER_WEEK;
    cells.extend(iter::repeat(MonthCell::Empty).take(trailing));
    Some(cells)
}

/// Groups lessons falling inside one month by canonical date string.
pub fn lessons_in_month<'a, I>(
    lessons: I,
    year: i32,
    month: u32,
) -> BTreeMap<String, Vec<&'a Lesson>>
where
    I: IntoIterator<Item = &'a Lesson>,
{
    let mut grouped: BTreeMap<String, Vec<&'a Lesson>> = BTreeMap::new();
    for lesson in lessons {
        if lesson.date.year() == year && lesson.date.month() == month {
            grouped
                .entry(to_date_key(lesson.date))
                .or_default()
                .push(lesson);
        }
    }
    for bucket in grouped.values_mut() {
        bucket.sort_by_key(|lesson| lesson.order);
    }
    grouped
}
