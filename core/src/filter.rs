use crate::model::{ResultItem, ResultSet, Timestamp};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Keep upstream order; each API already ranks by its own relevance.
    #[default]
    Relevance,
    Date,
    Score,
    Comments,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    #[default]
    All,
    Day,
    Week,
    Month,
    Year,
}

impl TimeWindow {
    /// Fixed window length. Calendar-naive: a month is 30 days, a year 365.
    pub fn seconds(self) -> Option<i64> {
        match self {
            TimeWindow::All => None,
            TimeWindow::Day => Some(86_400),
            TimeWindow::Week => Some(604_800),
            TimeWindow::Month => Some(2_592_000),
            TimeWindow::Year => Some(31_536_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown filter value '{0}'")]
pub struct ParseCriterionError(String);

impl FromStr for SortKey {
    type Err = ParseCriterionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "relevance" => Ok(SortKey::Relevance),
            "date" => Ok(SortKey::Date),
            "score" => Ok(SortKey::Score),
            "comments" => Ok(SortKey::Comments),
            other => Err(ParseCriterionError(other.to_string())),
        }
    }
}

impl FromStr for TimeWindow {
    type Err = ParseCriterionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(TimeWindow::All),
            "day" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            "month" => Ok(TimeWindow::Month),
            "year" => Ok(TimeWindow::Year),
            other => Err(ParseCriterionError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub sort_key: SortKey,
    #[serde(default)]
    pub time_window: TimeWindow,
}

impl FilterCriteria {
    pub fn new(sort_key: SortKey, time_window: TimeWindow) -> Self {
        Self { sort_key, time_window }
    }
}

/// Filter and sort against the current wall clock.
pub fn apply_filters(input: &ResultSet, criteria: &FilterCriteria) -> ResultSet {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    apply_filters_at(input, criteria, now)
}

/// Returns a new result set; `input` is only borrowed and never reordered.
pub fn apply_filters_at(input: &ResultSet, criteria: &FilterCriteria, now: Timestamp) -> ResultSet {
    let cutoff = criteria.time_window.seconds().map(|window| now - window);
    let out = ResultSet {
        reddit: filter_source(&input.reddit, criteria.sort_key, cutoff),
        stack_overflow: filter_source(&input.stack_overflow, criteria.sort_key, cutoff),
    };
    tracing::debug!(
        sort = ?criteria.sort_key,
        window = ?criteria.time_window,
        before = input.len(),
        after = out.len(),
        "applied filters"
    );
    out
}

fn filter_source(
    items: &[ResultItem],
    sort_key: SortKey,
    cutoff: Option<Timestamp>,
) -> Vec<ResultItem> {
    let mut kept: Vec<ResultItem> = items
        .iter()
        .filter(|item| cutoff.map_or(true, |c| item.created_at > c))
        .cloned()
        .collect();
    match sort_key {
        SortKey::Relevance => {}
        SortKey::Date => kept.sort_by_key(|item| Reverse(item.created_at)),
        SortKey::Score => kept.sort_by_key(|item| Reverse(item.score)),
        SortKey::Comments => kept.sort_by_key(|item| Reverse(item.secondary_metric)),
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lowercase_values() {
        assert_eq!("Score".parse::<SortKey>().unwrap(), SortKey::Score);
        assert_eq!("month".parse::<TimeWindow>().unwrap(), TimeWindow::Month);
        assert!("hour".parse::<TimeWindow>().is_err());
    }

    #[test]
    fn month_is_thirty_days() {
        assert_eq!(TimeWindow::Month.seconds(), Some(30 * 24 * 60 * 60));
        assert_eq!(TimeWindow::All.seconds(), None);
    }

    #[test]
    fn criteria_default_from_empty_json() {
        let c: FilterCriteria = serde_json::from_str("{}").unwrap();
        assert_eq!(c, FilterCriteria::new(SortKey::Relevance, TimeWindow::All));
    }
}
