//! Multi-stage search pipeline.
//!
//! Fixed stage order: date filtering (upstream expression where the
//! selected field allows it, client-side otherwise), keyword filtering
//! (always client-side), then truncation to the configured cap. The walk
//! stops pulling pages the moment the cap is reached, so truncation also
//! bounds upstream cost.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use client::{ListQuery, MemosClient};
use errors::ToolError;
use mm_core::{DateField, Memo, MemoState, SearchQuery};

/// Why the page walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ReachMaxCount,
    NoMorePages,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::ReachMaxCount => write!(f, "reach_search_max_count"),
            StopReason::NoMorePages => write!(f, "no_more_pages"),
        }
    }
}

/// Counters reported into the audit trail after a run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineStats {
    pub pages: u32,
    pub scanned: usize,
    pub date_kept: usize,
    pub keyword_kept: usize,
    pub final_count: usize,
    pub stop_reason: StopReason,
}

/// Runs the pipeline. The returned list is at most `query.max_count`
/// long, ordered by the selected date field most recent first, missing
/// timestamps last, memo name ascending as the tie-break.
pub async fn run(
    client: &MemosClient,
    query: &SearchQuery,
) -> Result<(Vec<Memo>, PipelineStats), ToolError> {
    let start = parse_date_bound(query.start_date.as_deref(), "start_date", false)?;
    let end = parse_date_bound(query.end_date.as_deref(), "end_date", true)?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(ToolError::invalid_input(
                "start_date",
                "start_date must be earlier than or equal to end_date",
            ));
        }
    }

    let old_filter = build_old_filter(query.date_field, start, end);
    let keyword = query
        .query
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let state = MemoState::from_archived(query.archived_only);

    let mut pager = client.pager(ListQuery::with_filter(state, old_filter));
    let mut results: Vec<Memo> = Vec::new();
    let mut date_kept = 0usize;
    let mut keyword_kept = 0usize;
    let mut stop_reason = StopReason::NoMorePages;

    'pages: while let Some(page) = pager.next_page().await? {
        for memo in page {
            if !within_date_bounds(&memo, query.date_field, start, end) {
                continue;
            }
            date_kept += 1;
            if let Some(q) = keyword {
                if !matches_keyword(&memo, q) {
                    continue;
                }
            }
            keyword_kept += 1;
            results.push(memo);
            if results.len() >= query.max_count {
                stop_reason = StopReason::ReachMaxCount;
                break 'pages;
            }
        }
    }

    order_results(&mut results, query.date_field);

    let stats = PipelineStats {
        pages: pager.pages_fetched(),
        scanned: pager.scanned(),
        date_kept,
        keyword_kept,
        final_count: results.len(),
        stop_reason,
    };
    Ok((results, stats))
}

/// Parses a user-provided date bound. `YYYY-MM-DD` is a full-day bound
/// (00:00:00 or 23:59:59 in the local offset); anything longer must be an
/// ISO-8601 timestamp, with naive timestamps assumed local. Everything is
/// normalized to UTC.
pub fn parse_date_bound(
    raw: Option<&str>,
    field: &str,
    is_end: bool,
) -> Result<Option<DateTime<Utc>>, ToolError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let text = raw.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let invalid = || ToolError::invalid_input(field, format!("invalid date format: {raw}"));

    if text.len() == 10 {
        let day = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid())?;
        let naive = if is_end {
            day.and_hms_opt(23, 59, 59)
        } else {
            day.and_hms_opt(0, 0, 0)
        }
        .ok_or_else(&invalid)?;
        return local_to_utc(naive).map(Some).ok_or_else(&invalid);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return local_to_utc(naive).map(Some).ok_or_else(&invalid);
        }
    }
    Err(invalid())
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// For `display_time` the bounds compile to the upstream legacy filter
/// expression; the other fields are filtered client-side.
fn build_old_filter(
    field: DateField,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Option<String> {
    if field != DateField::DisplayTime {
        return None;
    }
    let mut parts = Vec::new();
    if let Some(start) = start {
        parts.push(format!("display_time_after == {}", start.timestamp()));
    }
    if let Some(end) = end {
        parts.push(format!("display_time_before == {}", end.timestamp()));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" && "))
    }
}

/// Client-side date check for create/update_time. A memo whose selected
/// field is missing or unparseable is dropped.
fn within_date_bounds(
    memo: &Memo,
    field: DateField,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    if field == DateField::DisplayTime {
        // Bound upstream through the filter expression.
        return true;
    }
    let Some(target) = memo.field_time(field) else {
        return false;
    };
    if let Some(start) = start {
        if target < start {
            return false;
        }
    }
    if let Some(end) = end {
        if target > end {
            return false;
        }
    }
    true
}

/// Case-insensitive substring match over content, snippet, and tags.
fn matches_keyword(memo: &Memo, query: &str) -> bool {
    let haystack = format!(
        "{}\n{}\n{}",
        memo.content,
        memo.snippet,
        memo.tags.join(" ")
    )
    .to_lowercase();
    haystack.contains(&query.to_lowercase())
}

/// Deterministic ordering of the final window: selected field most recent
/// first, missing timestamps last, memo name ascending as tie-break.
fn order_results(memos: &mut [Memo], field: DateField) {
    memos.sort_by(|a, b| {
        match (b.field_time(field), a.field_time(field)) {
            (Some(tb), Some(ta)) => tb.cmp(&ta).then_with(|| a.name.cmp(&b.name)),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => a.name.cmp(&b.name),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::Visibility;

    fn memo_with_times(
        name: &str,
        content: &str,
        display: Option<&str>,
        update: Option<&str>,
    ) -> Memo {
        let parse = |raw: Option<&str>| {
            raw.map(|r| {
                DateTime::parse_from_rfc3339(r)
                    .unwrap()
                    .with_timezone(&Utc)
            })
        };
        Memo {
            name: name.to_string(),
            content: content.to_string(),
            visibility: Visibility::Private,
            tags: vec![],
            pinned: false,
            archived: false,
            snippet: String::new(),
            creator: String::new(),
            create_time: None,
            update_time: parse(update),
            display_time: parse(display),
        }
    }

    #[test]
    fn test_parse_date_bound_absent() {
        assert_eq!(parse_date_bound(None, "start_date", false).unwrap(), None);
        assert_eq!(parse_date_bound(Some("  "), "start_date", false).unwrap(), None);
    }

    #[test]
    fn test_parse_date_bound_full_day() {
        let start = parse_date_bound(Some("2026-01-01"), "start_date", false)
            .unwrap()
            .unwrap();
        let end = parse_date_bound(Some("2026-01-01"), "end_date", true)
            .unwrap()
            .unwrap();
        // Same day: start-of-day and end-of-day are 23:59:59 apart
        // regardless of the local offset.
        assert_eq!((end - start).num_seconds(), 86399);
        assert!(start < end);
    }

    #[test]
    fn test_parse_date_bound_iso_with_zone() {
        let dt = parse_date_bound(Some("2026-01-15T10:00:00Z"), "start_date", false)
            .unwrap()
            .unwrap();
        assert_eq!(dt.timestamp(), 1768471200);

        let offset = parse_date_bound(Some("2026-01-15T10:00:00+02:00"), "start_date", false)
            .unwrap()
            .unwrap();
        assert_eq!(offset.timestamp(), 1768471200 - 7200);
    }

    #[test]
    fn test_parse_date_bound_invalid() {
        assert!(parse_date_bound(Some("01/15/2026"), "start_date", false).is_err());
        assert!(parse_date_bound(Some("2026-13-40"), "start_date", false).is_err());
        assert!(parse_date_bound(Some("soon"), "end_date", true).is_err());
    }

    #[test]
    fn test_build_old_filter_display_time_only() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 31, 23, 59, 59).unwrap();

        let filter = build_old_filter(DateField::DisplayTime, Some(start), Some(end)).unwrap();
        assert_eq!(
            filter,
            format!(
                "display_time_after == {} && display_time_before == {}",
                start.timestamp(),
                end.timestamp()
            )
        );

        assert!(build_old_filter(DateField::CreateTime, Some(start), Some(end)).is_none());
        assert!(build_old_filter(DateField::DisplayTime, None, None).is_none());
    }

    #[test]
    fn test_within_date_bounds_client_side() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 31, 23, 59, 59).unwrap();

        let inside = memo_with_times("memos/1", "x", None, Some("2026-01-15T10:00:00Z"));
        let before = memo_with_times("memos/2", "x", None, Some("2025-12-31T10:00:00Z"));
        let missing = memo_with_times("memos/3", "x", None, None);

        assert!(within_date_bounds(&inside, DateField::UpdateTime, Some(start), Some(end)));
        assert!(!within_date_bounds(&before, DateField::UpdateTime, Some(start), Some(end)));
        assert!(!within_date_bounds(&missing, DateField::UpdateTime, Some(start), Some(end)));
        // display_time bounds are delegated upstream
        assert!(within_date_bounds(&missing, DateField::DisplayTime, Some(start), Some(end)));
    }

    #[test]
    fn test_matches_keyword_over_haystack() {
        let mut memo = memo_with_times("memos/1", "Release notes for v2", None, None);
        assert!(matches_keyword(&memo, "release"));
        assert!(matches_keyword(&memo, "RELEASE"));
        assert!(!matches_keyword(&memo, "deploy"));

        memo.content = String::new();
        memo.snippet = "deploy checklist".to_string();
        assert!(matches_keyword(&memo, "deploy"));

        memo.snippet = String::new();
        memo.tags = vec!["ops".to_string(), "Weekly".to_string()];
        assert!(matches_keyword(&memo, "weekly"));
    }

    #[test]
    fn test_order_results_recency_then_name() {
        let mut memos = vec![
            memo_with_times("memos/b", "x", Some("2026-01-10T00:00:00Z"), None),
            memo_with_times("memos/d", "x", None, None),
            memo_with_times("memos/c", "x", Some("2026-01-20T00:00:00Z"), None),
            memo_with_times("memos/a", "x", Some("2026-01-10T00:00:00Z"), None),
        ];
        order_results(&mut memos, DateField::DisplayTime);
        let names: Vec<&str> = memos.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["memos/c", "memos/a", "memos/b", "memos/d"]);
    }
}
