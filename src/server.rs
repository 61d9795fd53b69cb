//! HTTP surface for trajectory predictions.
//!
//! Two endpoints: `POST /predict` scores a rookie profile against the
//! loaded model bank, `GET /health` reports how many models are loaded.
//! The bank is immutable for the lifetime of the process; refreshing it
//! means restarting the service.

use crate::bank::ModelBank;
use crate::predict::{project, PlayerInput, PredictError};
use serde::Serialize;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::Filter;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub models_dir: String,
    pub loaded_models: usize,
    pub model_keys: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Process-wide immutable state shared by all request handlers.
#[derive(Clone)]
pub struct ServerState {
    pub bank: Arc<ModelBank>,
    pub models_dir: String,
}

async fn handle_predict(
    input: PlayerInput,
    state: ServerState,
) -> Result<impl warp::Reply, warp::Rejection> {
    match project(&state.bank, &input) {
        Ok(projection) => Ok(warp::reply::with_status(
            warp::reply::json(&projection),
            StatusCode::OK,
        )),
        Err(PredictError::NoModels) => Ok(warp::reply::with_status(
            warp::reply::json(&ErrorResponse {
                error: "no models loaded".to_string(),
            }),
            StatusCode::SERVICE_UNAVAILABLE,
        )),
    }
}

async fn handle_health(state: ServerState) -> Result<impl warp::Reply, warp::Rejection> {
    let response = HealthResponse {
        status: "ok",
        models_dir: state.models_dir.clone(),
        loaded_models: state.bank.len(),
        model_keys: state.bank.target_keys(),
    };
    Ok(warp::reply::json(&response))
}

/// Build the full route tree for the prediction service.
pub fn create_routes(
    state: ServerState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let state_filter = warp::any().map(move || state.clone());

    let predict = warp::path("predict")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_predict);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter)
        .and_then(handle_health);

    predict.or(health).with(
        warp::cors()
            .allow_any_origin()
            .allow_headers(vec!["content-type"])
            .allow_methods(vec!["GET", "POST", "OPTIONS"]),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GbmParams, GradientBoostedRegressor, TargetKey};

    fn trained_model(offset: f64) -> GradientBoostedRegressor {
        let x = [[75.0, 10.0, 3.0, 4.0], [80.0, 20.0, 5.0, 8.0]];
        let y = [10.0 + offset, 20.0 + offset];
        GradientBoostedRegressor::fit(
            &x,
            &y,
            &GbmParams {
                n_trees: 5,
                max_depth: 2,
                learning_rate: 0.5,
                ..GbmParams::default()
            },
        )
    }

    fn full_state() -> ServerState {
        let models = TargetKey::all().map(|key| (key, trained_model(key.year() as f64)));
        ServerState {
            bank: Arc::new(ModelBank::from_models(models)),
            models_dir: "models".to_string(),
        }
    }

    fn empty_state() -> ServerState {
        ServerState {
            bank: Arc::new(ModelBank::default()),
            models_dir: "models".to_string(),
        }
    }

    fn sample_body() -> serde_json::Value {
        serde_json::json!({
            "height_in": 79.0,
            "rookie_ppg": 10.0,
            "rookie_apg": 3.0,
            "rookie_rpg": 4.0
        })
    }

    #[tokio::test]
    async fn predict_returns_projection_for_loaded_bank() {
        let routes = create_routes(full_state());
        let response = warp::test::request()
            .method("POST")
            .path("/predict")
            .json(&sample_body())
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        let yearly = body["yearly"].as_array().unwrap();
        assert_eq!(yearly.len(), 5);
        assert_eq!(yearly[0]["year"], 2);
        assert!(yearly[0]["PPG"].is_number());
        assert!(body["summary"].as_str().unwrap().contains("10.0"));
    }

    #[tokio::test]
    async fn predict_with_empty_bank_is_service_unavailable() {
        let routes = create_routes(empty_state());
        let response = warp::test::request()
            .method("POST")
            .path("/predict")
            .json(&sample_body())
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"], "no models loaded");
    }

    #[tokio::test]
    async fn predict_rejects_malformed_body() {
        let routes = create_routes(full_state());
        let response = warp::test::request()
            .method("POST")
            .path("/predict")
            .body("{\"height_in\": \"tall\"}")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_reports_loaded_model_keys() {
        let routes = create_routes(full_state());
        let response = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["loaded_models"], 15);
        let keys = body["model_keys"].as_array().unwrap();
        assert_eq!(keys.len(), 15);
        assert_eq!(keys[0], "ppg_y2");
    }

    #[tokio::test]
    async fn health_with_empty_bank_still_answers() {
        let routes = create_routes(empty_state());
        let response = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["loaded_models"], 0);
    }
}
