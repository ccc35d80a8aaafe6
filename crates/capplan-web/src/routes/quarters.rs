//! Quarter route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use capplan_core::aggregate::{status_strip, TeamSummary};
use capplan_core::quarter::{
    self,
    model::{parse_dataset, QuarterRecord, QuarterSummary, QuarterUpdate},
};
use capplan_core::{CapError, WorkingDataset};
use serde::Deserialize;
use serde_json::Value;

use super::error_response;
use crate::state::AppState;

type ApiResult<T> = Result<T, (StatusCode, String)>;

#[derive(Deserialize)]
pub struct CreateQuarterRequest {
    pub name: Option<String>,
    pub data: Option<Value>,
}

#[derive(Deserialize)]
pub struct UpdateQuarterRequest {
    pub name: Option<String>,
    pub data: Option<Value>,
}

#[derive(Deserialize)]
pub struct BaselineRequest {
    pub data: Option<Value>,
}

fn required_dataset(data: Option<Value>) -> Result<WorkingDataset, CapError> {
    match data {
        None | Some(Value::Null) => Err(CapError::validation("data is required")),
        Some(value) => parse_dataset(value)
            .map_err(|e| CapError::validation(format!("invalid data: {}", e))),
    }
}

fn record(quarter: capplan_core::quarter::model::Quarter) -> ApiResult<Json<QuarterRecord>> {
    quarter.to_record().map(Json).map_err(error_response)
}

pub async fn list_quarters(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<QuarterSummary>>> {
    let quarters = quarter::list_quarters(state.store.as_ref())
        .await
        .map_err(error_response)?;
    Ok(Json(quarters))
}

pub async fn get_active_quarter(State(state): State<AppState>) -> ApiResult<Json<QuarterRecord>> {
    let quarter = quarter::require_active_quarter(state.store.as_ref())
        .await
        .map_err(error_response)?;
    record(quarter)
}

pub async fn get_quarter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<QuarterRecord>> {
    let quarter = state.store.get_quarter(&id).await.map_err(error_response)?;
    record(quarter)
}

pub async fn create_quarter(
    State(state): State<AppState>,
    Json(req): Json<CreateQuarterRequest>,
) -> ApiResult<(StatusCode, Json<QuarterRecord>)> {
    let name = req
        .name
        .ok_or_else(|| error_response(CapError::validation("name is required")))?;
    let data = required_dataset(req.data).map_err(error_response)?;

    let quarter = quarter::create_quarter(state.store.as_ref(), &name, &data)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, record(quarter)?))
}

pub async fn update_quarter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateQuarterRequest>,
) -> ApiResult<Json<QuarterRecord>> {
    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(error_response(CapError::validation("name must not be blank")));
        }
    }
    let data = match req.data {
        Some(_) => Some(required_dataset(req.data).map_err(error_response)?),
        None => None,
    };
    let update = QuarterUpdate {
        name: req.name.map(|n| n.trim().to_string()),
        data,
    };
    let quarter = state
        .store
        .update_quarter(&id, update)
        .await
        .map_err(error_response)?;
    record(quarter)
}

pub async fn activate_quarter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<QuarterRecord>> {
    let quarter = state
        .store
        .activate_quarter(&id)
        .await
        .map_err(error_response)?;
    record(quarter)
}

/// Remove a quarter. Reassigning the active flag is left to the caller.
pub async fn delete_quarter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_quarter(&id).await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_baseline(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<BaselineRequest>,
) -> ApiResult<Json<QuarterRecord>> {
    let data = required_dataset(req.data).map_err(error_response)?;
    let quarter = state
        .store
        .set_baseline(&id, &data)
        .await
        .map_err(error_response)?;
    record(quarter)
}

/// Status strip of the live dataset.
pub async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<TeamSummary>>> {
    let quarter = state.store.get_quarter(&id).await.map_err(error_response)?;
    Ok(Json(status_strip(&quarter.data)))
}

#[cfg(test)]
mod tests {
    use crate::{create_router, state::AppState};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use capplan_core::store::MemoryStore;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(AppState::new(Arc::new(MemoryStore::new())))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn dataset() -> Value {
        json!({
            "projects": [{"id": 1, "epic": "Checkout", "backend": "10", "backend_1": "4"}],
            "backendSprints": [{"id": 1, "name": "S1", "capacity": "6"}],
            "androidSprints": [],
            "iosSprints": [],
            "techReviews": []
        })
    }

    #[tokio::test]
    async fn test_create_and_fetch_quarter() {
        let app = app();
        let (status, created) = call(
            &app,
            "POST",
            "/api/quarters",
            Some(json!({"name": "Q1", "data": dataset()})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["baseline_data"], Value::Null);
        assert_eq!(created["is_active"], false);

        let (status, fetched) = call(&app, "GET", &format!("/api/quarters/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["data"]["projects"][0]["backend_1"], "4");

        let (_, listed) = call(&app, "GET", "/api/quarters", None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert!(listed[0].get("data").is_none());
    }

    #[tokio::test]
    async fn test_create_requires_name_and_data() {
        let app = app();
        let (status, _) = call(&app, "POST", "/api/quarters", Some(json!({"data": dataset()}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = call(&app, "POST", "/api/quarters", Some(json!({"name": "Q1"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (_, listed) = call(&app, "GET", "/api/quarters", None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activation_and_active_lookup() {
        let app = app();
        let (status, _) = call(&app, "GET", "/api/quarters/active", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, q1) = call(&app, "POST", "/api/quarters", Some(json!({"name": "Q1", "data": {}}))).await;
        let (_, q2) = call(&app, "POST", "/api/quarters", Some(json!({"name": "Q2", "data": {}}))).await;
        let q1 = q1["id"].as_str().unwrap().to_string();
        let q2 = q2["id"].as_str().unwrap().to_string();

        call(&app, "POST", &format!("/api/quarters/{}/activate", q1), None).await;
        let (status, _) = call(&app, "POST", &format!("/api/quarters/{}/activate", q2), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, active) = call(&app, "GET", "/api/quarters/active", None).await;
        assert_eq!(active["id"], q2.as_str());
        let (_, listed) = call(&app, "GET", "/api/quarters", None).await;
        let active_count = listed
            .as_array()
            .unwrap()
            .iter()
            .filter(|q| q["is_active"] == true)
            .count();
        assert_eq!(active_count, 1);
    }

    #[tokio::test]
    async fn test_baseline_and_summary() {
        let app = app();
        let (_, q) = call(
            &app,
            "POST",
            "/api/quarters",
            Some(json!({"name": "Q1", "data": dataset()})),
        )
        .await;
        let id = q["id"].as_str().unwrap().to_string();

        let (status, _) = call(&app, "POST", &format!("/api/quarters/{}/baseline", id), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, updated) = call(
            &app,
            "POST",
            &format!("/api/quarters/{}/baseline", id),
            Some(json!({"data": dataset()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["baseline_data"]["projects"][0]["epic"], "Checkout");

        let (_, summary) = call(&app, "GET", &format!("/api/quarters/{}/summary", id), None).await;
        assert_eq!(summary[0]["team"], "backend");
        assert_eq!(summary[0]["balance"], -4.0);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = app();
        let (_, q) = call(&app, "POST", "/api/quarters", Some(json!({"name": "Q1", "data": {}}))).await;
        let id = q["id"].as_str().unwrap().to_string();

        let (status, renamed) = call(
            &app,
            "PUT",
            &format!("/api/quarters/{}", id),
            Some(json!({"name": "Q1 2027"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["name"], "Q1 2027");

        let (status, _) = call(&app, "DELETE", &format!("/api/quarters/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &format!("/api/quarters/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "DELETE", &format!("/api/quarters/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
