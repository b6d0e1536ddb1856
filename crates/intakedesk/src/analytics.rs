//! Dashboard KPIs computed on read from the full intake set.
//!
//! Every view takes `now` explicitly so results are reproducible in tests.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::Serialize;

use crate::format::{format_hours_saved, format_minutes_seconds};
use crate::model::{Intake, IntakeStatus};

/// Placeholder shown when no record qualifies for speed-to-lead.
pub const NO_VALUE: &str = "—";

const MONTHLY_WINDOW: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunnelStage {
    pub label: &'static str,
    pub count: usize,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub month: String,
    pub intakes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InjurySplit {
    pub bodily_injury: usize,
    pub property_damage_only: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSaved {
    pub sent_this_month: usize,
    pub display: String,
}

/// Everything the dashboard's analytics section shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub intakes_this_month: usize,
    pub speed_to_lead: String,
    pub time_saved: TimeSaved,
    pub needs_attention: usize,
    pub funnel: Vec<FunnelStage>,
    pub injury_split: InjurySplit,
    pub monthly_volume: Vec<MonthlyCount>,
    pub generated_at: DateTime<Utc>,
}

impl DashboardSummary {
    pub fn compute(intakes: &[Intake], now: DateTime<Utc>) -> Self {
        Self {
            total: intakes.len(),
            intakes_this_month: intakes_this_month(intakes, now),
            speed_to_lead: speed_to_lead(intakes),
            time_saved: time_saved(intakes, now),
            needs_attention: needs_attention(intakes),
            funnel: funnel(intakes),
            injury_split: injury_split(intakes),
            monthly_volume: monthly_volume(intakes, now),
            generated_at: now,
        }
    }
}

fn same_month(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

fn percent_of(count: usize, total: usize) -> u32 {
    let total = total.max(1);
    ((count as f64 / total as f64) * 100.0).round() as u32
}

/// Uploaded ⊇ In Review ⊇ Approved ⊇ Sent.
pub fn funnel(intakes: &[Intake]) -> Vec<FunnelStage> {
    use IntakeStatus::*;

    fn count_in(intakes: &[Intake], statuses: &[IntakeStatus]) -> usize {
        intakes
            .iter()
            .filter(|i| statuses.contains(&i.status))
            .count()
    }

    let total = intakes.len();
    let stages = [
        ("Uploaded", total),
        ("In Review", count_in(intakes, &[Review, Flagged, Approved, Sent])),
        ("Approved", count_in(intakes, &[Approved, Sent])),
        ("Sent", count_in(intakes, &[Sent])),
    ];

    stages
        .into_iter()
        .map(|(label, count)| FunnelStage {
            label,
            count,
            percent: percent_of(count, total),
        })
        .collect()
}

/// Mean upload-to-send time across records with both timestamps.
pub fn mean_speed_to_lead_secs(intakes: &[Intake]) -> Option<i64> {
    let spans: Vec<i64> = intakes
        .iter()
        .filter_map(|i| {
            let sent = i.sent_at?;
            (sent >= i.uploaded_at).then(|| (sent - i.uploaded_at).num_milliseconds())
        })
        .collect();

    if spans.is_empty() {
        return None;
    }
    let mean_millis = spans.iter().sum::<i64>() / spans.len() as i64;
    Some(mean_millis / 1000)
}

/// `"{m}m {s}s"`, or `"—"` when nothing has been sent.
pub fn speed_to_lead(intakes: &[Intake]) -> String {
    match mean_speed_to_lead_secs(intakes) {
        Some(secs) => format_minutes_seconds(secs),
        None => NO_VALUE.to_string(),
    }
}

/// Counts per calendar month of creation over the trailing six months
/// (current month included), oldest first. Months without records are
/// omitted.
pub fn monthly_volume(intakes: &[Intake], now: DateTime<Utc>) -> Vec<MonthlyCount> {
    let Some(current) = NaiveDate::from_ymd_opt(now.year(), now.month(), 1) else {
        return Vec::new();
    };
    let Some(window_start) = current.checked_sub_months(Months::new(MONTHLY_WINDOW - 1)) else {
        return Vec::new();
    };

    let mut buckets: Vec<(NaiveDate, usize)> = Vec::new();
    for intake in intakes {
        let created = intake.created_at;
        let Some(month) = NaiveDate::from_ymd_opt(created.year(), created.month(), 1) else {
            continue;
        };
        if month < window_start || month > current {
            continue;
        }
        match buckets.iter_mut().find(|(m, _)| *m == month) {
            Some((_, count)) => *count += 1,
            None => buckets.push((month, 1)),
        }
    }

    buckets.sort_by_key(|(month, _)| *month);
    buckets
        .into_iter()
        .map(|(month, intakes)| MonthlyCount {
            month: month.format("%b %y").to_string(),
            intakes,
        })
        .collect()
}

pub fn injury_split(intakes: &[Intake]) -> InjurySplit {
    let bodily_injury = intakes.iter().filter(|i| i.case.injury_flag).count();
    InjurySplit {
        bodily_injury,
        property_damage_only: intakes.len() - bodily_injury,
    }
}

/// 45 minutes for every record sent during the current calendar month.
pub fn time_saved(intakes: &[Intake], now: DateTime<Utc>) -> TimeSaved {
    let sent_this_month = intakes
        .iter()
        .filter(|i| i.status == IntakeStatus::Sent)
        .filter(|i| i.sent_at.is_some_and(|sent| same_month(sent, now)))
        .count();
    TimeSaved {
        sent_this_month,
        display: format_hours_saved(sent_this_month),
    }
}

pub fn intakes_this_month(intakes: &[Intake], now: DateTime<Utc>) -> usize {
    intakes
        .iter()
        .filter(|i| same_month(i.created_at, now))
        .count()
}

/// Records with the injury flag set or sitting in `Flagged`.
pub fn needs_attention(intakes: &[Intake]) -> usize {
    intakes
        .iter()
        .filter(|i| i.case.injury_flag || i.status == IntakeStatus::Flagged)
        .count()
}
