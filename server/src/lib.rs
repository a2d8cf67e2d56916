use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use codequest_core::{
    apply_filters, render_digest_with, Branding, FilterCriteria, ResultSet, SortKey, TimeWindow,
};
use codequest_mailer::{DeliveryError, DeliveryGateway};
use codequest_upstream::{SearchFailure, UpstreamClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub sort: Option<SortKey>,
    #[serde(default)]
    pub time: Option<TimeWindow>,
}

#[derive(Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub results: Option<ResultSet>,
    #[serde(flatten)]
    pub criteria: FilterCriteria,
}

#[derive(Deserialize)]
pub struct SendEmailRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub results: Option<ResultSet>,
    #[serde(default)]
    pub query: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success: bool,
    pub message: String,
    pub message_id: String,
    /// e.g. "12.34KB"
    pub email_size: String,
}

/// Long-lived handles shared by every request. The gateway's relay is built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    pub gateway: DeliveryGateway,
    pub branding: Arc<Branding>,
}

impl AppState {
    pub fn new(upstream: UpstreamClient, gateway: DeliveryGateway, branding: Branding) -> Self {
        Self { upstream: Arc::new(upstream), gateway, branding: Arc::new(branding) }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ApiError {
    fn bad_request(error: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, error: error.into(), details: None }
    }

    fn internal(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.error, details: self.details })).into_response()
    }
}

impl From<SearchFailure> for ApiError {
    fn from(err: SearchFailure) -> Self {
        match err {
            SearchFailure::EmptyQuery => ApiError::bad_request(err.to_string()),
            other => ApiError::internal("Search failed", other.to_string()),
        }
    }
}

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        if err.is_validation() {
            ApiError { status: StatusCode::BAD_REQUEST, error: err.to_string(), details: None }
        } else {
            ApiError::internal("Failed to send email", err.to_string())
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let api = Router::new()
        .route("/search", get(search_handler))
        .route("/filter", post(filter_handler))
        .route("/send-email", post(send_email_handler));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ResultSet>, ApiError> {
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Search query is required"))?;

    let results = state.upstream.fetch_results(query).await?;
    // Raw normalized order unless the caller asked for filtering.
    let results = if params.sort.is_some() || params.time.is_some() {
        let criteria =
            FilterCriteria::new(params.sort.unwrap_or_default(), params.time.unwrap_or_default());
        apply_filters(&results, &criteria)
    } else {
        results
    };
    Ok(Json(results))
}

pub async fn filter_handler(Json(req): Json<FilterRequest>) -> Result<Json<ResultSet>, ApiError> {
    let results = req.results.ok_or_else(|| ApiError::bad_request("Missing required fields"))?;
    Ok(Json(apply_filters(&results, &req.criteria)))
}

pub async fn send_email_handler(
    State(state): State<AppState>,
    Json(req): Json<SendEmailRequest>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    let (email, results) = match (req.email.as_deref().map(str::trim), req.results) {
        (Some(email), Some(results)) if !email.is_empty() => (email.to_string(), results),
        _ => return Err(ApiError::bad_request("Missing required fields")),
    };
    if !email.contains('@') {
        return Err(ApiError::bad_request("Please enter a valid email address"));
    }
    if results.is_empty() {
        return Err(ApiError::bad_request("No results to send"));
    }

    let digest = render_digest_with(&results, &req.query, &state.branding).map_err(|e| {
        tracing::warn!(error = %e, "digest render failed");
        ApiError::internal("Failed to send email", e.to_string())
    })?;
    let receipt = state.gateway.send(&email, &digest).await.map_err(|e| {
        tracing::error!(error = %e, "email send failed");
        ApiError::from(e)
    })?;

    Ok(Json(SendEmailResponse {
        success: true,
        message: "Email sent successfully".to_string(),
        message_id: receipt.message_id,
        email_size: format!("{:.2}KB", receipt.size_kb),
    }))
}
