use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use spacecraft::{Simulation, SimulationData, SimulationErrors};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, warn};

pub const DEFAULT_DURATION: f64 = 10.0;
pub const DEFAULT_TIMESTEP: f64 = 0.01;

#[derive(Debug, Error)]
pub enum ApiErrors {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Simulation(#[from] SimulationErrors),
    #[error("simulation task failed: {0}")]
    Task(#[from] JoinError),
}

impl ApiErrors {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrors::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiErrors::Simulation(e) if e.is_invalid_input() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiErrors {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, "request rejected");
        }
        (status, Json(StatusMessage::error(self.to_string()))).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".into(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub result: i64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SimulateParams {
    pub duration: Option<f64>,
    pub timestep: Option<f64>,
    pub seed: Option<u64>,
}

#[derive(Clone)]
pub struct AppState {
    simulation: Arc<Simulation>,
}

impl AppState {
    pub fn new(simulation: Simulation) -> Self {
        Self {
            simulation: Arc::new(simulation),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/healthchecker", get(healthchecker))
        .route("/api/multiply/{number_1}/{number_2}", get(multiply))
        .route("/api/simulate", get(simulate))
        .with_state(state)
}

pub async fn healthchecker() -> Json<StatusMessage> {
    Json(health())
}

pub fn health() -> StatusMessage {
    StatusMessage::success("spacecraft attitude simulation service is running")
}

pub async fn multiply(
    Path((number_1, number_2)): Path<(i64, i64)>,
) -> Result<Json<Product>, ApiErrors> {
    checked_product(number_1, number_2).map(Json)
}

pub fn checked_product(number_1: i64, number_2: i64) -> Result<Product, ApiErrors> {
    number_1
        .checked_mul(number_2)
        .map(|result| Product { result })
        .ok_or_else(|| {
            ApiErrors::BadRequest(format!("{number_1} * {number_2} overflows a 64 bit integer"))
        })
}

/// Runs on the blocking pool, a long simulation would otherwise stall the runtime.
pub async fn simulate(
    State(state): State<AppState>,
    Query(params): Query<SimulateParams>,
) -> Result<Json<SimulationData>, ApiErrors> {
    let duration = params.duration.unwrap_or(DEFAULT_DURATION);
    let timestep = params.timestep.unwrap_or(DEFAULT_TIMESTEP);
    let simulation = state.simulation.clone();

    let samples = tokio::task::spawn_blocking(move || match params.seed {
        Some(seed) => simulation.run_from(&simulation.seeded_state(seed), duration, timestep),
        None => simulation.run(duration, timestep),
    })
    .await??;

    Ok(Json(samples.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacecraft::SimulationConfig;

    fn state() -> AppState {
        AppState::new(Simulation::new(SimulationConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_healthchecker() {
        let Json(body) = healthchecker().await;
        assert_eq!(body.status, "success");
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["message"].is_string());
    }

    #[tokio::test]
    async fn test_multiply() {
        let Json(product) = multiply(Path((6, -7))).await.unwrap();
        assert_eq!(product, Product { result: -42 });
        assert_eq!(
            serde_json::to_string(&product).unwrap(),
            r#"{"result":-42}"#
        );
    }

    #[tokio::test]
    async fn test_multiply_overflow_is_bad_request() {
        let err = multiply(Path((i64::MAX, 2))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_simulate() {
        let params = SimulateParams {
            duration: Some(10.0),
            timestep: Some(0.1),
            seed: Some(1),
        };
        let Json(data) = simulate(State(state()), Query(params)).await.unwrap();
        assert_eq!(data.simulation_data.len(), 100);
        assert_eq!(data.simulation_data[0].time, 0.0);
        assert!(data.simulation_data[99].time < 10.0);

        let json = serde_json::to_value(&data).unwrap();
        let first = &json["simulation_data"][0];
        assert_eq!(first["angular_velocity"].as_array().unwrap().len(), 3);
        assert_eq!(first["quaternion"].as_array().unwrap().len(), 4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_simulate_defaults() {
        let Json(data) = simulate(State(state()), Query(SimulateParams::default()))
            .await
            .unwrap();
        assert_eq!(data.simulation_data.len(), 1000);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_simulate_same_seed_same_data() {
        let params = SimulateParams {
            duration: Some(1.0),
            timestep: Some(0.1),
            seed: Some(9),
        };
        let Json(a) = simulate(State(state()), Query(params)).await.unwrap();
        let Json(b) = simulate(State(state()), Query(params)).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_simulate_rejects_bad_input() {
        let params = SimulateParams {
            duration: Some(-1.0),
            timestep: None,
            seed: None,
        };
        let err = simulate(State(state()), Query(params)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let params = SimulateParams {
            duration: Some(1e9),
            timestep: Some(1e-3),
            seed: None,
        };
        let err = simulate(State(state()), Query(params)).await.unwrap_err();
        assert!(matches!(
            err,
            ApiErrors::Simulation(SimulationErrors::TooManySamples { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_timestep_longer_than_duration_is_empty() {
        let params = SimulateParams {
            duration: Some(1.0),
            timestep: Some(5.0),
            seed: None,
        };
        let Json(data) = simulate(State(state()), Query(params)).await.unwrap();
        assert!(data.simulation_data.is_empty());
    }

    #[test]
    fn test_router_builds() {
        let _ = router(state());
    }
}
