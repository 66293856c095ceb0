use crate::{
    aggregate::{aggregate_organic, aggregate_paid},
    auth::{self, AuthUser},
    comparison::{compare_latest_organic, compare_latest_paid, Comparison},
    error::{ApiError, Json},
    models::{Client, ClientControl, Credentials, ServiceOrder, ServiceOrdersDocument, TrafficPeriod},
    orders::{self, OrderDraft, OrderStatistics},
    renewal::{self, ControlOverview, Service},
    report::ReportInput,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{Datelike, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{collections::HashSet, sync::Arc, time::Duration};

/// Pause before answering a failed login to blunt brute-force attempts.
const LOGIN_FAILURE_DELAY: Duration = Duration::from_millis(500);

// ── Request / response types ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
    username: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOrdersRequest {
    #[serde(default)]
    service_orders: Vec<ServiceOrder>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Traffic {
    #[default]
    Paid,
    Organic,
}

#[derive(Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    traffic: Traffic,
    /// Comma-separated period ids; the latest period when absent.
    periods: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary<A> {
    traffic: Traffic,
    is_aggregated: bool,
    aggregate: A,
    /// Latest vs. previous period, independent of the selection.
    comparison: Vec<Comparison>,
}

#[derive(Deserialize)]
pub struct RenewRequest {
    service: Service,
    months: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    month: String,
    #[serde(default)]
    additional_context: Option<String>,
}

fn success(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "success": true, "message": message.into() }))
}

// ── Public ─────────────────────────────────────────────────────────────────

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Server running" }))
}

/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let creds = state.store.load_credentials().await?;

    let valid =
        req.username == creds.username && auth::verify_password(&req.password, &creds.password)?;
    if !valid {
        tracing::warn!("Failed login attempt for '{}'", req.username);
        tokio::time::sleep(LOGIN_FAILURE_DELAY).await;
        return Err(ApiError::InvalidCredentials);
    }

    if auth::is_legacy_hash(&creds.password) {
        let upgraded = Credentials {
            username: creds.username.clone(),
            password: auth::hash_password(&req.password)?,
        };
        state.store.save_credentials(&upgraded).await?;
        tracing::info!("Upgraded stored password hash for {} to Argon2", creds.username);
    }

    let token = state.tokens.issue(&creds.username)?;
    tracing::info!("Login succeeded: {}", creds.username);

    Ok(Json(LoginResponse {
        token,
        username: creds.username,
    }))
}

// ── Account ────────────────────────────────────────────────────────────────

/// POST /api/change-password
pub async fn change_password(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.new_password.is_empty() {
        return Err(ApiError::BadRequest("New password must not be empty".into()));
    }

    let creds = state.store.load_credentials().await?;
    if !auth::verify_password(&req.current_password, &creds.password)? {
        return Err(ApiError::WrongCurrentPassword);
    }

    let updated = Credentials {
        username: creds.username,
        password: auth::hash_password(&req.new_password)?,
    };
    state.store.save_credentials(&updated).await?;
    tracing::info!("Password changed for {}", user.username);

    Ok(success("Password changed"))
}

// ── Clients ────────────────────────────────────────────────────────────────

/// GET /api/clients
pub async fn get_clients(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Client>>, ApiError> {
    Ok(Json(state.store.load_clients().await?))
}

/// POST /api/clients
/// Replaces the whole client list with the request body.
pub async fn save_clients(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(mut clients): Json<Vec<Client>>,
) -> Result<Json<Value>, ApiError> {
    clients.iter_mut().for_each(Client::sort_periods);
    state.store.save_clients(clients).await?;
    Ok(success("Data saved"))
}

/// GET /api/clients/:id/summary
pub async fn client_summary(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> Result<Response, ApiError> {
    let clients = state.store.load_clients().await?;
    let client = find_client(&clients, &id)?;
    let ids = parse_ids(query.periods.as_deref());

    let response = match query.traffic {
        Traffic::Paid => {
            let selected = select_periods(&client.monthly_data, &ids)?;
            let aggregate = aggregate_paid(&selected);
            Json(Summary {
                traffic: query.traffic,
                is_aggregated: aggregate.period_count > 1,
                aggregate,
                comparison: compare_latest_paid(&client.monthly_data),
            })
            .into_response()
        }
        Traffic::Organic => {
            let selected = select_periods(&client.organic_data, &ids)?;
            let aggregate = aggregate_organic(&selected);
            Json(Summary {
                traffic: query.traffic,
                is_aggregated: aggregate.period_count > 1,
                aggregate,
                comparison: compare_latest_organic(&client.organic_data),
            })
            .into_response()
        }
    };
    Ok(response)
}

/// POST /api/clients/:id/renew
pub async fn renew_service(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RenewRequest>,
) -> Result<Json<ClientControl>, ApiError> {
    if req.months == 0 {
        return Err(ApiError::BadRequest("months must be at least 1".into()));
    }

    let today = Local::now().date_naive();
    let control = state
        .store
        .update_clients(|clients| {
            let client = clients
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(ApiError::NotFound("Client"))?;
            let control = client.control.get_or_insert_with(ClientControl::default);
            let renewed = renewal::renew_service(control, req.service, req.months, today);
            tracing::info!("Renewed {:?} for client {} until {}", req.service, id, renewed);
            Ok::<_, ApiError>(control.clone())
        })
        .await?;

    Ok(Json(control))
}

/// POST /api/clients/:id/reports
pub async fn generate_report(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<GenerateReportRequest>,
) -> Result<Response, ApiError> {
    if !state.reports.is_configured() {
        return Err(ApiError::ReportUnavailable);
    }

    let clients = state.store.load_clients().await?;
    let client = find_client(&clients, &id)?;
    let input = ReportInput::select(client, &req.month, req.additional_context)
        .ok_or_else(|| ApiError::BadRequest(format!("No data for month {}", req.month)))?;

    let html = state.reports.generate(&input).await?;
    let saved = input.into_saved_report(html);

    state
        .store
        .update_clients(|clients| {
            let client = clients
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(ApiError::NotFound("Client"))?;
            client.push_report(saved.clone());
            Ok::<_, ApiError>(())
        })
        .await?;

    Ok((StatusCode::CREATED, Json(saved)).into_response())
}

/// GET /api/control/overview
pub async fn control_overview(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ControlOverview>, ApiError> {
    let clients = state.store.load_clients().await?;
    Ok(Json(renewal::overview(&clients, Local::now().date_naive())))
}

// ── Export / import ────────────────────────────────────────────────────────

/// GET /api/export
pub async fn export_clients(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let clients = state.store.load_clients().await?;
    let body = serde_json::to_string_pretty(&clients).map_err(anyhow::Error::from)?;
    let filename = format!(
        "attachment; filename=\"adspanel-backup-{}.json\"",
        Local::now().format("%Y-%m-%d")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_owned()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        body,
    )
        .into_response())
}

/// POST /api/import
pub async fn import_clients(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(mut clients): Json<Vec<Client>>,
) -> Result<Json<Value>, ApiError> {
    let mut seen = HashSet::new();
    for client in &clients {
        if !seen.insert(client.id.as_str()) {
            return Err(ApiError::BadRequest(format!("Duplicate client id {}", client.id)));
        }
        if let Some((period, month)) = client.misplaced_period() {
            return Err(ApiError::BadRequest(format!(
                "Period {period} of client {} ends outside {month}",
                client.id
            )));
        }
    }

    clients.iter_mut().for_each(Client::sort_periods);
    let count = clients.len();
    state.store.save_clients(clients).await?;
    Ok(success(format!("Imported {count} client(s)")))
}

// ── Service orders ─────────────────────────────────────────────────────────

/// GET /api/service-orders
pub async fn get_orders(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ServiceOrdersDocument>, ApiError> {
    Ok(Json(state.store.load_orders().await?))
}

/// POST /api/service-orders
/// Replaces the whole order list with `serviceOrders` from the body.
pub async fn save_orders(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveOrdersRequest>,
) -> Result<Json<Value>, ApiError> {
    state.store.save_orders(req.service_orders).await?;
    Ok(success("Orders saved"))
}

/// POST /api/service-orders/new
pub async fn create_order(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(draft): Json<OrderDraft>,
) -> Result<Response, ApiError> {
    if draft.client_name.trim().is_empty() || draft.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Client name and title are required".into()));
    }

    let now = Utc::now();
    let year = Local::now().year();
    let order = state
        .store
        .update_orders(|orders| {
            let number = orders::next_order_number(orders, year);
            let order = draft.into_order(number, &user.username, now);
            orders.push(order.clone());
            Ok::<_, ApiError>(order)
        })
        .await?;

    tracing::info!("Created service order {}", order.number);
    Ok((StatusCode::CREATED, Json(order)).into_response())
}

/// GET /api/service-orders/stats
pub async fn order_stats(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<OrderStatistics>, ApiError> {
    let doc = state.store.load_orders().await?;
    Ok(Json(orders::statistics(&doc.service_orders)))
}

/// Fallback for unknown `/api/*` routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route")
}

// ── Private helpers ────────────────────────────────────────────────────────

fn find_client<'a>(clients: &'a [Client], id: &str) -> Result<&'a Client, ApiError> {
    clients
        .iter()
        .find(|c| c.id == id)
        .ok_or(ApiError::NotFound("Client"))
}

fn parse_ids(raw: Option<&str>) -> Vec<&str> {
    raw.map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

/// Periods matching `ids` in list order, or just the newest one when `ids`
/// is empty.
fn select_periods<'a, P: TrafficPeriod>(periods: &'a [P], ids: &[&str]) -> Result<Vec<&'a P>, ApiError> {
    if ids.is_empty() {
        return Ok(periods.first().into_iter().collect());
    }
    if let Some(unknown) = ids.iter().find(|id| !periods.iter().any(|p| p.id() == **id)) {
        return Err(ApiError::BadRequest(format!("Unknown period {unknown}")));
    }
    Ok(periods.iter().filter(|p| ids.contains(&p.id())).collect())
}
