//! Collapse a selection of monthly periods into one synthetic period for the
//! dashboard's multi-month view.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{OrganicPeriod, PaidPeriod, TrafficPeriod};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPaid {
    pub clicks: f64,
    pub impressions: f64,
    pub conversions: f64,
    pub total_spent: f64,
    pub cost_per_click: f64,
    pub conversion_rate: f64,
    pub period_count: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedOrganic {
    pub impressions: f64,
    pub clicks: f64,
    pub average_position: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_views: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_session_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounce_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organic_conversions: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_rate: Option<f64>,
    pub period_count: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Earliest start and latest end across the selection. The range is not
/// required to be calendar-continuous.
fn date_span<P: TrafficPeriod>(periods: &[&P]) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let start = periods.iter().map(|p| p.start_date()).min();
    let end = periods.iter().map(|p| p.end_date()).max();
    (start, end)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn present(value: f64) -> Option<f64> {
    (value > 0.0).then_some(value)
}

/// Sum the additive paid metrics and recompute CPC and conversion rate from
/// the totals.
pub fn aggregate_paid(periods: &[&PaidPeriod]) -> AggregatedPaid {
    if periods.is_empty() {
        return AggregatedPaid::default();
    }

    let mut agg = AggregatedPaid::default();
    for p in periods {
        agg.clicks += p.clicks;
        agg.impressions += p.impressions;
        agg.conversions += p.conversions;
        agg.total_spent += p.total_spent;
    }

    agg.cost_per_click = ratio(agg.total_spent, agg.clicks);
    agg.conversion_rate = ratio(agg.conversions, agg.clicks) * 100.0;
    agg.period_count = periods.len();
    (agg.start_date, agg.end_date) = date_span(periods);
    agg
}

/// Sum organic totals, average the per-period averages (unweighted), and
/// report optional metrics that come out as zero as absent.
pub fn aggregate_organic(periods: &[&OrganicPeriod]) -> AggregatedOrganic {
    if periods.is_empty() {
        return AggregatedOrganic::default();
    }

    let n = periods.len() as f64;
    let sum = |f: fn(&OrganicPeriod) -> f64| periods.iter().map(|p| f(p)).sum::<f64>();

    let impressions = sum(|p| p.impressions);
    let clicks = sum(|p| p.clicks);
    let sessions = sum(|p| p.sessions.unwrap_or(0.0));
    let users = sum(|p| p.users.unwrap_or(0.0));
    let page_views = sum(|p| p.page_views.unwrap_or(0.0));
    let organic_conversions = sum(|p| p.organic_conversions.unwrap_or(0.0));

    let average_position = sum(|p| p.average_position) / n;
    let avg_session_duration = sum(|p| p.avg_session_duration.unwrap_or(0.0)) / n;
    let bounce_rate = sum(|p| p.bounce_rate.unwrap_or(0.0)) / n;
    let conversion_rate = ratio(organic_conversions, sessions) * 100.0;

    let (start_date, end_date) = date_span(periods);

    AggregatedOrganic {
        impressions,
        clicks,
        average_position,
        sessions: present(sessions),
        users: present(users),
        page_views: present(page_views),
        avg_session_duration: present(avg_session_duration),
        bounce_rate: present(bounce_rate),
        organic_conversions: present(organic_conversions),
        conversion_rate: present(conversion_rate),
        period_count: periods.len(),
        start_date,
        end_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{date, organic, paid};

    #[test]
    fn paid_sums_and_weighted_ratios() {
        let jan = paid("1", "2025-01", 100.0, 1000.0, 5.0, 150.0);
        let feb = paid("2", "2025-02", 300.0, 4000.0, 15.0, 300.0);
        let agg = aggregate_paid(&[&feb, &jan]);

        assert_eq!(agg.clicks, 400.0);
        assert_eq!(agg.impressions, 5000.0);
        assert_eq!(agg.conversions, 20.0);
        assert_eq!(agg.total_spent, 450.0);
        assert_eq!(agg.cost_per_click, 450.0 / 400.0);
        assert_eq!(agg.conversion_rate, 5.0);
        assert_eq!(agg.period_count, 2);
        assert_eq!(agg.start_date, Some(date("2025-01-01")));
        assert_eq!(agg.end_date, Some(date("2025-02-28")));
    }

    #[test]
    fn paid_without_clicks_has_zero_ratios() {
        let p = paid("1", "2025-01", 0.0, 800.0, 0.0, 40.0);
        let agg = aggregate_paid(&[&p]);
        assert_eq!(agg.cost_per_click, 0.0);
        assert_eq!(agg.conversion_rate, 0.0);
        assert_eq!(agg.total_spent, 40.0);
    }

    #[test]
    fn date_span_uses_min_start_and_max_end() {
        let mut a = paid("a", "2025-03", 1.0, 1.0, 0.0, 1.0);
        a.start_date = date("2025-03-10");
        a.end_date = date("2025-03-31");
        let mut b = paid("b", "2025-01", 1.0, 1.0, 0.0, 1.0);
        b.start_date = date("2025-01-05");
        b.end_date = date("2025-01-20");
        let agg = aggregate_paid(&[&a, &b]);
        assert_eq!(agg.start_date, Some(date("2025-01-05")));
        assert_eq!(agg.end_date, Some(date("2025-03-31")));
    }

    #[test]
    fn empty_selection_is_all_zero() {
        assert_eq!(aggregate_paid(&[]), AggregatedPaid::default());
        let organic = aggregate_organic(&[]);
        assert_eq!(organic.period_count, 0);
        assert!(organic.start_date.is_none());
        assert!(organic.sessions.is_none());
    }

    #[test]
    fn organic_averages_are_unweighted() {
        let mut a = organic("a", "2025-01", 1000.0, 50.0, 4.0);
        a.bounce_rate = Some(40.0);
        a.avg_session_duration = Some(120.0);
        let mut b = organic("b", "2025-02", 9000.0, 450.0, 8.0);
        b.bounce_rate = Some(60.0);

        let agg = aggregate_organic(&[&a, &b]);
        assert_eq!(agg.impressions, 10000.0);
        assert_eq!(agg.clicks, 500.0);
        assert_eq!(agg.average_position, 6.0);
        assert_eq!(agg.bounce_rate, Some(50.0));
        // missing values count as zero in the average
        assert_eq!(agg.avg_session_duration, Some(60.0));
    }

    #[test]
    fn organic_conversion_rate_needs_sessions() {
        let mut a = organic("a", "2025-01", 100.0, 10.0, 2.0);
        a.organic_conversions = Some(3.0);
        let agg = aggregate_organic(&[&a]);
        assert_eq!(agg.organic_conversions, Some(3.0));
        assert_eq!(agg.conversion_rate, None);

        a.sessions = Some(60.0);
        let agg = aggregate_organic(&[&a]);
        assert_eq!(agg.sessions, Some(60.0));
        assert_eq!(agg.conversion_rate, Some(5.0));
    }

    #[test]
    fn organic_zero_totals_are_absent() {
        let mut a = organic("a", "2025-01", 100.0, 10.0, 2.0);
        a.users = Some(0.0);
        let agg = aggregate_organic(&[&a]);
        assert_eq!(agg.users, None);
        assert_eq!(agg.page_views, None);
    }
}
