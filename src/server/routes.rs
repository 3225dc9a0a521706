use crate::db::{self, CalculationRecord, CalculationSummary};
use crate::errors::{AppError, AppResult};
use crate::execution::batch;
use crate::models::black_scholes;
use crate::models::{OptionPricer, PricingRequest};
use crate::state::{AppState, CounterSnapshot};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use portable_atomic::Ordering::Relaxed;
use std::sync::Arc;

#[derive(Debug, serde::Deserialize)]
pub struct HistoryQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, serde::Deserialize)]
pub struct BatchRequest {
    pub calculations: Vec<PricingRequest>,
}

#[derive(Debug, serde::Serialize)]
pub struct BatchItemError {
    pub index: usize,
    pub field: &'static str,
    pub detail: String,
}

#[derive(Debug, serde::Serialize)]
pub struct BatchResponse {
    pub results: Vec<CalculationRecord>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<BatchItemError>,
}

#[derive(Debug, serde::Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
}

/// Turn a body rejection into the same `{"detail": ..}` shape as other errors.
fn json_body<T>(state: &AppState, payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        state.counters.requests_rejected.fetch_add(1, Relaxed);
        AppError::Validation {
            field: "body",
            reason: rejection.body_text(),
        }
    })
}

/// Same treatment for query strings, e.g. `?skip=-1`.
fn query_params<T>(state: &AppState, params: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    params.map(|Query(query)| query).map_err(|rejection| {
        state.counters.requests_rejected.fetch_add(1, Relaxed);
        AppError::Validation {
            field: "query",
            reason: rejection.body_text(),
        }
    })
}

/// Boundary check: spot, strike, maturity and volatility must be positive
/// before the pricing core is invoked.
fn check_bounds(state: &AppState, request: &PricingRequest) -> AppResult<()> {
    black_scholes::validate(request).map_err(|e| {
        state.counters.requests_rejected.fetch_add(1, Relaxed);
        AppError::Validation {
            field: e.field(),
            reason: "must be greater than 0".into(),
        }
    })
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /api/calculate -- price one parameter set and persist it
pub async fn create_calculation(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PricingRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CalculationRecord>)> {
    let request = json_body(&state, payload)?;
    check_bounds(&state, &request)?;

    let result = state.pricer.price(&request).inspect_err(|_| state.record_failed(1))?;
    state.record_priced(1);

    let record = db::insert_calculation(&state.db, &request, &result)?;
    tracing::info!(
        id = record.id,
        call = result.call_price,
        put = result.put_price,
        "calculation stored"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /api/calculate/batch -- price each item independently, persist successes
pub async fn batch_calculate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> AppResult<Json<BatchResponse>> {
    let body = json_body(&state, payload)?;
    let max = state.config.batch_max_items;
    if body.calculations.is_empty() || body.calculations.len() > max {
        state.counters.requests_rejected.fetch_add(1, Relaxed);
        return Err(AppError::Validation {
            field: "calculations",
            reason: format!("expected between 1 and {max} items, got {}", body.calculations.len()),
        });
    }

    let outcome = batch::price_batch(&state.pricer, &body.calculations);
    state.record_priced(outcome.successful() as u64);
    state.record_failed(outcome.failed() as u64);
    state.counters.batches_processed.fetch_add(1, Relaxed);

    let rows: Vec<_> = outcome.successes.iter().map(|s| (s.request, s.result)).collect();
    let stored = db::insert_calculations(&state.db, &rows)?;

    let mut errors: Vec<BatchItemError> = outcome
        .failures
        .iter()
        .map(|f| BatchItemError {
            index: f.index,
            field: f.error.field(),
            detail: f.error.to_string(),
        })
        .collect();
    let mut results = Vec::with_capacity(stored.len());
    for (success, row) in outcome.successes.iter().zip(stored) {
        match row {
            Ok(record) => results.push(record),
            Err(e) => {
                tracing::warn!(index = success.index, error = %e, "batch item not stored");
                errors.push(BatchItemError {
                    index: success.index,
                    field: "record",
                    detail: e.to_string(),
                });
            }
        }
    }
    errors.sort_by_key(|e| e.index);

    tracing::info!(
        total = outcome.total(),
        successful = results.len(),
        failed = errors.len(),
        "batch processed"
    );

    Ok(Json(BatchResponse {
        total: outcome.total(),
        successful: results.len(),
        failed: errors.len(),
        results,
        errors,
    }))
}

/// GET /api/history -- newest first, offset/limit pagination
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    params: Result<Query<HistoryQuery>, QueryRejection>,
) -> AppResult<Json<Vec<CalculationSummary>>> {
    let params = query_params(&state, params)?;
    let limit = params
        .limit
        .unwrap_or(state.config.history_default_limit)
        .min(state.config.history_max_limit);
    let skip = params.skip.unwrap_or(0);
    Ok(Json(db::list_calculations(&state.db, skip, limit)?))
}

/// GET /api/history/count
pub async fn history_count(State(state): State<Arc<AppState>>) -> AppResult<Json<serde_json::Value>> {
    let total = db::count_calculations(&state.db)?;
    Ok(Json(serde_json::json!({ "total": total })))
}

/// GET /api/history/{id}
pub async fn get_calculation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<CalculationRecord>> {
    db::get_calculation(&state.db, id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Calculation not found.".into()))
}

/// DELETE /api/history -- remove by id; unknown ids are ignored
pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> AppResult<StatusCode> {
    let body = json_body(&state, payload)?;
    let deleted = db::delete_calculations(&state.db, &body.ids)?;
    state.counters.records_deleted.fetch_add(deleted as u64, Relaxed);
    tracing::info!(requested = body.ids.len(), deleted = deleted, "history deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/counters -- lock-free reads
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<CounterSnapshot> {
    Json(state.counters.snapshot())
}
