use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use guardrail_core::GuardrailError;
use guardrail_engine::CancellationFlag;
use guardrail_sources::{Application, DataSourceBag, LenderConfiguration, UserAuthorizationMatrix};
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::error::ServerError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/evaluate", post(evaluate))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

/// The request router: validates the envelope, assembles a data-source bag
/// (from the request's `datasets` in test mode, or from live sources
/// otherwise), loads the ruleset, and runs the engine.
#[instrument(skip(state, request), fields(application_id = request.application_id, type_ = %request.type_, area = %request.area))]
async fn evaluate(
    State(state): State<AppState>,
    Json(request): Json<RequestEnvelope>,
) -> Result<Json<ResponseEnvelope>, ServerError> {
    request.validate()?;

    let bag = if request.testing {
        let mut bag = DataSourceBag::new();
        for (name, value) in request.datasets_as_values() {
            bag.insert(name, value);
        }
        bag
    } else {
        assemble_live_bag(&state, request.application_id).await?
    };

    let rule_set = state
        .rules
        .get_rule_set(&request.type_, &request.area)
        .await
        .map_err(|e| GuardrailError::Configuration(e.to_string()))?;

    let result = state.engine.evaluate(&rule_set, &bag, &CancellationFlag::new())?;
    Ok(Json(ResponseEnvelope::ok(result)))
}

/// Live (non-test) data-source assembly: fetch `application`, then read its
/// `lender_id` field to construct `lender_configuration`, then
/// `user_authorization_matrix` (which needs no per-request id).
///
/// The wire contract only specifies `application_id`; where the requested
/// lender comes from for a live request is not otherwise fixed, so this
/// derives it from the fetched application payload.
async fn assemble_live_bag(state: &AppState, application_id: i64) -> Result<DataSourceBag, ServerError> {
    let application = Application::new(application_id, state.store.clone());
    let mut bag = DataSourceBag::new();
    bag.fetch_and_insert(&application)
        .await
        .map_err(|e| GuardrailError::DataSource(e.to_string()))?;

    let lender_id = bag
        .get("application")
        .and_then(|v| v.field("lender_id"))
        .and_then(guardrail_core::Value::as_f64)
        .map(|f| f as i64)
        .ok_or_else(|| GuardrailError::DataSource("application payload has no lender_id".into()))?;

    let lender_configuration = LenderConfiguration::new(
        application_id,
        lender_id,
        state.store.clone(),
        state.cache.clone(),
        state.cache_settings.clone(),
    )
    .map_err(|e| GuardrailError::DataSource(e.to_string()))?;
    bag.fetch_and_insert(&lender_configuration)
        .await
        .map_err(|e| GuardrailError::DataSource(e.to_string()))?;

    let authorization_matrix =
        UserAuthorizationMatrix::new(state.store.clone(), state.cache.clone(), state.cache_settings.clone());
    bag.fetch_and_insert(&authorization_matrix)
        .await
        .map_err(|e| GuardrailError::DataSource(e.to_string()))?;

    Ok(bag)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use guardrail_store::{CacheSettings, MemoryKVCache, MemoryRecordStore, Row};
    use tower::ServiceExt;

    use super::*;

    fn rule_row() -> Row {
        let mut row = Row::new();
        row.insert("type".into(), guardrail_core::Value::String("app".into()));
        row.insert("area".into(), guardrail_core::Value::String("guardrail".into()));
        row.insert("sequence".into(), guardrail_core::Value::Int(1));
        row.insert("target".into(), guardrail_core::Value::String(r#"["test.field_a"]"#.into()));
        row.insert("operator_id".into(), guardrail_core::Value::Int(1));
        row.insert("criteria".into(), guardrail_core::Value::Null);
        row.insert("sub_rule".into(), guardrail_core::Value::Null);
        row.insert("on_pass".into(), guardrail_core::Value::String("CONTINUE".into()));
        row.insert("on_fail".into(), guardrail_core::Value::String("RESTRICT".into()));
        row.insert("pass".into(), guardrail_core::Value::String("ok".into()));
        row.insert("fail".into(), guardrail_core::Value::String("bad".into()));
        row.insert("warn".into(), guardrail_core::Value::String(String::new()));
        row
    }

    #[tokio::test]
    async fn health_returns_200() {
        let store = Arc::new(MemoryRecordStore::new());
        let cache = Arc::new(MemoryKVCache::new());
        let app = router(AppState::new(store, cache, CacheSettings::default()));

        let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn evaluate_in_test_mode_skips_live_sources() {
        let store = Arc::new(MemoryRecordStore::new());
        store.register("wf_guardrail_rules_get", vec![rule_row()]);
        let cache = Arc::new(MemoryKVCache::new());
        let app = router(AppState::new(store, cache, CacheSettings::default()));

        let body = serde_json::json!({
            "application_id": 1,
            "type": "app",
            "area": "guardrail",
            "testing": true,
            "datasets": { "test": { "field_a": "abc" } }
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/evaluate")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn evaluate_rejects_invalid_envelope() {
        let store = Arc::new(MemoryRecordStore::new());
        let cache = Arc::new(MemoryKVCache::new());
        let app = router(AppState::new(store, cache, CacheSettings::default()));

        let body = serde_json::json!({ "application_id": 0, "type": "app", "area": "guardrail" });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/evaluate")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
