//! Domain and hosting expiry bookkeeping for the control dashboard.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{Client, ClientControl};

/// Days ahead of expiry at which a service counts as due soon.
pub const DUE_SOON_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Service {
    Domain,
    Hosting,
}

/// Extend an expiry by `months`. A lapsed (or unset) expiry renews from
/// `today`; an expiry still in the future is extended from itself. Month
/// overflow clamps to the last day of the target month.
pub fn renew(expiry: Option<NaiveDate>, months: u32, today: NaiveDate) -> NaiveDate {
    let base = match expiry {
        Some(date) if date > today => date,
        _ => today,
    };
    base.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Apply a renewal to the matching field of `control` and return the new date.
pub fn renew_service(control: &mut ClientControl, service: Service, months: u32, today: NaiveDate) -> NaiveDate {
    let slot = match service {
        Service::Domain => &mut control.domain_expiry,
        Service::Hosting => &mut control.hosting_expiry,
    };
    let renewed = renew(*slot, months, today);
    *slot = Some(renewed);
    renewed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpiryState {
    Expired,
    DueSoon,
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryStatus {
    pub date: NaiveDate,
    /// Negative once the date has passed.
    pub days_left: i64,
    pub state: ExpiryState,
}

impl ExpiryStatus {
    pub fn of(date: NaiveDate, today: NaiveDate) -> Self {
        let days_left = (date - today).num_days();
        let state = if days_left < 0 {
            ExpiryState::Expired
        } else if days_left <= DUE_SOON_DAYS {
            ExpiryState::DueSoon
        } else {
            ExpiryState::Ok
        };
        Self {
            date,
            days_left,
            state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientExpiry {
    pub client_id: String,
    pub client_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<ExpiryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosting: Option<ExpiryStatus>,
}

impl ClientExpiry {
    fn any(&self, state: ExpiryState) -> bool {
        [self.domain, self.hosting]
            .iter()
            .flatten()
            .any(|s| s.state == state)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlOverview {
    pub total_clients: usize,
    pub clients_with_control: usize,
    pub total_annual_fees: f64,
    pub expired: Vec<ClientExpiry>,
    pub due_soon: Vec<ClientExpiry>,
}

/// Summarise expiries across clients. A client with one expired and one
/// due-soon service appears in both lists.
pub fn overview(clients: &[Client], today: NaiveDate) -> ControlOverview {
    let mut out = ControlOverview {
        total_clients: clients.len(),
        ..Default::default()
    };

    for client in clients {
        let Some(control) = &client.control else {
            continue;
        };
        out.clients_with_control += 1;
        out.total_annual_fees += control.annual_fee.unwrap_or(0.0);

        let entry = ClientExpiry {
            client_id: client.id.clone(),
            client_name: client.name.clone(),
            domain: control.domain_expiry.map(|d| ExpiryStatus::of(d, today)),
            hosting: control.hosting_expiry.map(|d| ExpiryStatus::of(d, today)),
        };
        if entry.any(ExpiryState::Expired) {
            out.expired.push(entry.clone());
        }
        if entry.any(ExpiryState::DueSoon) {
            out.due_soon.push(entry);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{client, date};

    #[test]
    fn lapsed_expiry_renews_from_today() {
        let renewed = renew(Some(date("2023-01-01")), 12, date("2025-01-01"));
        assert_eq!(renewed, date("2026-01-01"));
    }

    #[test]
    fn future_expiry_extends_from_itself() {
        let renewed = renew(Some(date("2026-01-01")), 12, date("2025-06-15"));
        assert_eq!(renewed, date("2027-01-01"));
    }

    #[test]
    fn expiry_today_counts_as_lapsed() {
        assert_eq!(renew(Some(date("2025-03-10")), 1, date("2025-03-10")), date("2025-04-10"));
        assert_eq!(renew(None, 6, date("2025-03-10")), date("2025-09-10"));
    }

    #[test]
    fn month_end_clamps() {
        assert_eq!(renew(None, 1, date("2025-01-31")), date("2025-02-28"));
    }

    #[test]
    fn renew_service_updates_the_right_field() {
        let mut control = ClientControl {
            domain_expiry: Some(date("2026-05-01")),
            ..Default::default()
        };
        renew_service(&mut control, Service::Hosting, 12, date("2025-05-01"));
        assert_eq!(control.hosting_expiry, Some(date("2026-05-01")));
        assert_eq!(control.domain_expiry, Some(date("2026-05-01")));

        renew_service(&mut control, Service::Domain, 24, date("2025-05-01"));
        assert_eq!(control.domain_expiry, Some(date("2028-05-01")));
    }

    #[test]
    fn status_thresholds() {
        let today = date("2025-06-01");
        assert_eq!(ExpiryStatus::of(date("2025-05-31"), today).state, ExpiryState::Expired);
        assert_eq!(ExpiryStatus::of(today, today).state, ExpiryState::DueSoon);
        assert_eq!(ExpiryStatus::of(date("2025-07-01"), today).state, ExpiryState::DueSoon);
        assert_eq!(ExpiryStatus::of(date("2025-07-02"), today).state, ExpiryState::Ok);
        assert_eq!(ExpiryStatus::of(date("2025-05-29"), today).days_left, -3);
    }

    #[test]
    fn overview_groups_clients() {
        let today = date("2025-06-01");
        let mut a = client("a", "Alpha");
        a.control = Some(ClientControl {
            domain_expiry: Some(date("2025-05-01")),
            hosting_expiry: Some(date("2025-06-10")),
            annual_fee: Some(1200.0),
            ..Default::default()
        });
        let mut b = client("b", "Beta");
        b.control = Some(ClientControl {
            hosting_expiry: Some(date("2026-01-01")),
            annual_fee: Some(800.0),
            ..Default::default()
        });
        let c = client("c", "Gamma");

        let ov = overview(&[a, b, c], today);
        assert_eq!(ov.total_clients, 3);
        assert_eq!(ov.clients_with_control, 2);
        assert_eq!(ov.total_annual_fees, 2000.0);
        assert_eq!(ov.expired.len(), 1);
        assert_eq!(ov.due_soon.len(), 1);
        assert_eq!(ov.expired[0].client_id, "a");
        assert_eq!(ov.due_soon[0].hosting.map(|s| s.days_left), Some(9));
    }
}
