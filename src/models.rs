use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ── Traffic periods ────────────────────────────────────────────────────────

/// A single paid-search keyword row attached to a paid period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyword {
    pub id: String,
    pub name: String,
    pub clicks: f64,
    pub impressions: f64,
    /// Cost per click.
    pub cpc: f64,
    pub conversions: f64,
    /// Total cost.
    pub cost: f64,
}

/// A single organic keyword row attached to an organic period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganicKeyword {
    pub id: String,
    pub name: String,
    pub clicks: f64,
    pub impressions: f64,
}

/// One month of paid (ads) traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidPeriod {
    pub id: String,
    /// `YYYY-MM`
    pub month: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub clicks: f64,
    pub conversions: f64,
    pub cost_per_click: f64,
    pub total_spent: f64,
    pub impressions: f64,
    /// Percentage, e.g. `4.5` for 4.5 %.
    pub conversion_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<Keyword>>,
    /// Legacy free-text keyword summary, kept for older data files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_keywords: Option<String>,
}

/// One month of organic (SEO) traffic. Everything past `average_position`
/// is optional because not every analytics source reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganicPeriod {
    pub id: String,
    pub month: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub impressions: f64,
    pub clicks: f64,
    pub average_position: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_views: Option<f64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_session_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounce_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organic_conversions: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<OrganicKeyword>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_keywords: Option<Vec<String>>,
}

/// Shared view over paid and organic periods.
pub trait TrafficPeriod {
    fn id(&self) -> &str;
    fn month(&self) -> &str;
    fn start_date(&self) -> NaiveDate;
    fn end_date(&self) -> NaiveDate;

    /// `true` when the end date falls inside the labelled month.
    fn end_date_in_month(&self) -> bool {
        month_label(self.end_date()) == self.month()
    }
}

impl TrafficPeriod for PaidPeriod {
    fn id(&self) -> &str {
        &self.id
    }
    fn month(&self) -> &str {
        &self.month
    }
    fn start_date(&self) -> NaiveDate {
        self.start_date
    }
    fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}

impl TrafficPeriod for OrganicPeriod {
    fn id(&self) -> &str {
        &self.id
    }
    fn month(&self) -> &str {
        &self.month
    }
    fn start_date(&self) -> NaiveDate {
        self.start_date
    }
    fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}

/// The `YYYY-MM` label a period ending on `date` belongs to.
pub fn month_label(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Insert `period` keeping the list newest-first by month.
fn insert_newest_first<P: TrafficPeriod>(list: &mut Vec<P>, period: P) {
    let pos = list
        .iter()
        .position(|p| p.month() < period.month())
        .unwrap_or(list.len());
    list.insert(pos, period);
}

// ── Client ─────────────────────────────────────────────────────────────────

/// A generated AI report stored on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedReport {
    pub id: String,
    pub month: String,
    pub generated_at: DateTime<Utc>,
    pub html_content: String,
    pub has_paid_traffic: bool,
    pub has_organic_traffic: bool,
}

/// Domain / hosting bookkeeping for a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientControl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_expiry: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosting_expiry: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Paid traffic, newest month first.
    #[serde(default)]
    pub monthly_data: Vec<PaidPeriod>,
    /// Organic traffic, newest month first.
    #[serde(default)]
    pub organic_data: Vec<OrganicPeriod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_reports: Option<Vec<SavedReport>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<ClientControl>,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn insert_paid(&mut self, period: PaidPeriod) {
        insert_newest_first(&mut self.monthly_data, period);
    }

    pub fn insert_organic(&mut self, period: OrganicPeriod) {
        insert_newest_first(&mut self.organic_data, period);
    }

    /// Reorder both period lists newest-first by month. Periods sharing a
    /// month keep their relative order.
    pub fn sort_periods(&mut self) {
        for period in std::mem::take(&mut self.monthly_data) {
            self.insert_paid(period);
        }
        for period in std::mem::take(&mut self.organic_data) {
            self.insert_organic(period);
        }
    }

    pub fn push_report(&mut self, report: SavedReport) {
        self.saved_reports.get_or_insert_with(Vec::new).push(report);
    }

    pub fn report(&self, report_id: &str) -> Option<&SavedReport> {
        self.saved_reports
            .as_deref()
            .and_then(|reports| reports.iter().find(|r| r.id == report_id))
    }

    /// Return the first period whose end date lies outside its month label,
    /// as `(period id, month)`.
    pub fn misplaced_period(&self) -> Option<(&str, &str)> {
        self.monthly_data
            .iter()
            .map(|p| p as &dyn TrafficPeriod)
            .chain(self.organic_data.iter().map(|p| p as &dyn TrafficPeriod))
            .find(|p| !p.end_date_in_month())
            .map(|p| (p.id(), p.month()))
    }
}

// ── Service orders ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pendente",
            OrderStatus::InProgress => "Em andamento",
            OrderStatus::Completed => "Concluída",
            OrderStatus::Cancelled => "Cancelada",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl OrderPriority {
    pub fn label(self) -> &'static str {
        match self {
            OrderPriority::Low => "Baixa",
            OrderPriority::Medium => "Média",
            OrderPriority::High => "Alta",
            OrderPriority::Urgent => "Urgente",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrderItem {
    pub id: String,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrder {
    pub id: String,
    /// Human-readable number, e.g. `OS-2025-1001`.
    pub number: String,
    pub client_id: String,
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_address: Option<String>,
    pub status: OrderStatus,
    pub priority: OrderPriority,
    pub title: String,
    pub description: String,
    pub items: Vec<ServiceOrderItem>,
    pub subtotal: f64,
    /// Discount as an absolute value.
    pub discount: f64,
    pub discount_percent: f64,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: String,
}

// ── On-disk documents ──────────────────────────────────────────────────────

/// `data.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientsDocument {
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// `service-orders.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrdersDocument {
    #[serde(default)]
    pub service_orders: Vec<ServiceOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// `auth.json`. `password` holds a PHC-formatted hash, never plain text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}
