//! Month-over-month deltas between the latest and the previous period.

use serde::Serialize;

use crate::models::{OrganicPeriod, PaidPeriod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Clicks,
    Impressions,
    Conversions,
    ConversionRate,
    CostPerClick,
    TotalSpent,
    Sessions,
    Users,
    PageViews,
    OrganicConversions,
}

impl Metric {
    /// Cost metrics improve when they go down.
    pub fn is_cost(self) -> bool {
        matches!(self, Metric::CostPerClick | Metric::TotalSpent)
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Clicks => "Clicks",
            Metric::Impressions => "Impressions",
            Metric::Conversions => "Conversions",
            Metric::ConversionRate => "Conversion rate",
            Metric::CostPerClick => "CPC",
            Metric::TotalSpent => "Total spent",
            Metric::Sessions => "Sessions",
            Metric::Users => "Users",
            Metric::PageViews => "Page views",
            Metric::OrganicConversions => "Conversions",
        }
    }
}

pub const PAID_METRICS: [Metric; 6] = [
    Metric::Clicks,
    Metric::Impressions,
    Metric::Conversions,
    Metric::ConversionRate,
    Metric::CostPerClick,
    Metric::TotalSpent,
];

pub const ORGANIC_METRICS: [Metric; 7] = [
    Metric::Impressions,
    Metric::Clicks,
    Metric::Sessions,
    Metric::Users,
    Metric::PageViews,
    Metric::OrganicConversions,
    Metric::ConversionRate,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Trend {
    Favorable,
    Unfavorable,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub metric: Metric,
    pub label: &'static str,
    pub current: f64,
    pub previous: f64,
    pub change: f64,
    pub change_percent: f64,
    pub trend: Trend,
}

impl Comparison {
    pub fn new(metric: Metric, current: f64, previous: f64) -> Self {
        let change = current - previous;
        let change_percent = if previous != 0.0 {
            change / previous * 100.0
        } else {
            0.0
        };

        let trend = if change == 0.0 {
            Trend::Neutral
        } else if (change < 0.0) == metric.is_cost() {
            Trend::Favorable
        } else {
            Trend::Unfavorable
        };

        Self {
            metric,
            label: metric.label(),
            current,
            previous,
            change,
            change_percent,
            trend,
        }
    }
}

fn paid_value(p: &PaidPeriod, metric: Metric) -> f64 {
    match metric {
        Metric::Clicks => p.clicks,
        Metric::Impressions => p.impressions,
        Metric::Conversions => p.conversions,
        Metric::ConversionRate => p.conversion_rate,
        Metric::CostPerClick => p.cost_per_click,
        Metric::TotalSpent => p.total_spent,
        _ => 0.0,
    }
}

fn organic_value(p: &OrganicPeriod, metric: Metric) -> f64 {
    match metric {
        Metric::Clicks => p.clicks,
        Metric::Impressions => p.impressions,
        Metric::Sessions => p.sessions.unwrap_or(0.0),
        Metric::Users => p.users.unwrap_or(0.0),
        Metric::PageViews => p.page_views.unwrap_or(0.0),
        Metric::OrganicConversions => p.organic_conversions.unwrap_or(0.0),
        Metric::ConversionRate => p.conversion_rate.unwrap_or(0.0),
        _ => 0.0,
    }
}

pub fn compare_paid(current: &PaidPeriod, previous: &PaidPeriod) -> Vec<Comparison> {
    PAID_METRICS
        .iter()
        .map(|&m| Comparison::new(m, paid_value(current, m), paid_value(previous, m)))
        .collect()
}

pub fn compare_organic(current: &OrganicPeriod, previous: &OrganicPeriod) -> Vec<Comparison> {
    ORGANIC_METRICS
        .iter()
        .map(|&m| Comparison::new(m, organic_value(current, m), organic_value(previous, m)))
        .collect()
}

/// Compare the two newest entries of a newest-first list. Empty when there
/// is no previous period.
pub fn compare_latest_paid(periods: &[PaidPeriod]) -> Vec<Comparison> {
    match periods {
        [latest, previous, ..] => compare_paid(latest, previous),
        _ => Vec::new(),
    }
}

pub fn compare_latest_organic(periods: &[OrganicPeriod]) -> Vec<Comparison> {
    match periods {
        [latest, previous, ..] => compare_organic(latest, previous),
        _ => Vec::new(),
    }
}
