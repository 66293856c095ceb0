//! Printable HTML views for the browser's print-to-PDF.

use crate::{
    auth::AuthUser,
    error::ApiError,
    format,
    models::{Client, SavedReport, ServiceOrder},
    AppState,
};
use askama::Template;
use axum::extract::{Path, State};
use std::sync::Arc;

// ── Template structs ───────────────────────────────────────────────────────

pub struct ItemRow {
    description: String,
    quantity: String,
    unit_price: String,
    total: String,
}

#[derive(Template)]
#[template(path = "service_order.html")]
pub struct ServiceOrderTemplate {
    number: String,
    title: String,
    status: &'static str,
    priority: &'static str,
    created: String,
    completed: String,
    client_name: String,
    client_email: String,
    client_phone: String,
    client_address: String,
    description: String,
    items: Vec<ItemRow>,
    subtotal: String,
    has_discount: bool,
    discount: String,
    discount_percent: String,
    total: String,
    terms: String,
}

impl From<&ServiceOrder> for ServiceOrderTemplate {
    fn from(order: &ServiceOrder) -> Self {
        let text = |s: &Option<String>| s.clone().unwrap_or_default();

        Self {
            number: order.number.clone(),
            title: order.title.clone(),
            status: order.status.label(),
            priority: order.priority.label(),
            created: format::date(order.created_at.date_naive()),
            completed: order
                .completed_at
                .map(|d| format::date(d.date_naive()))
                .unwrap_or_default(),
            client_name: order.client_name.clone(),
            client_email: text(&order.client_email),
            client_phone: text(&order.client_phone),
            client_address: text(&order.client_address),
            description: order.description.clone(),
            items: order
                .items
                .iter()
                .map(|i| ItemRow {
                    description: i.description.clone(),
                    quantity: format::decimal(i.quantity, if i.quantity.fract() == 0.0 { 0 } else { 2 }),
                    unit_price: format::money(i.unit_price),
                    total: format::money(i.total),
                })
                .collect(),
            subtotal: format::money(order.subtotal),
            has_discount: order.discount > 0.0,
            discount: format::money(order.discount),
            discount_percent: format::percent(order.discount_percent),
            total: format::money(order.total),
            terms: text(&order.terms),
        }
    }
}

#[derive(Template)]
#[template(path = "report.html")]
pub struct ReportTemplate {
    client_name: String,
    company: String,
    month: String,
    generated: String,
    coverage: &'static str,
    html_content: String,
}

impl ReportTemplate {
    fn new(client: &Client, report: &SavedReport) -> Self {
        let coverage = match (report.has_paid_traffic, report.has_organic_traffic) {
            (true, true) => "Tráfego pago e orgânico",
            (true, false) => "Tráfego pago",
            (false, true) => "Tráfego orgânico",
            (false, false) => "Sem dados de tráfego",
        };

        Self {
            client_name: client.name.clone(),
            company: client.company.clone().unwrap_or_default(),
            month: format::month(&report.month),
            generated: format::date(report.generated_at.date_naive()),
            coverage,
            html_content: report.html_content.clone(),
        }
    }
}

// ── Handlers ───────────────────────────────────────────────────────────────

/// GET /api/service-orders/:id/print
pub async fn service_order(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ServiceOrderTemplate, ApiError> {
    let doc = state.store.load_orders().await?;
    let order = doc
        .service_orders
        .iter()
        .find(|o| o.id == id)
        .ok_or(ApiError::NotFound("Service order"))?;
    Ok(order.into())
}

/// GET /api/clients/:id/reports/:report_id/print
pub async fn report(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((client_id, report_id)): Path<(String, String)>,
) -> Result<ReportTemplate, ApiError> {
    let clients = state.store.load_clients().await?;
    let client = clients
        .iter()
        .find(|c| c.id == client_id)
        .ok_or(ApiError::NotFound("Client"))?;
    let report = client
        .report(&report_id)
        .ok_or(ApiError::NotFound("Report"))?;
    Ok(ReportTemplate::new(client, report))
}
