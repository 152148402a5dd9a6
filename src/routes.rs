//! HTTP API
//!
//! The four routes the web client talks to: run a test batch, prepare a
//! visualization, and list past results of either kind. Request and response
//! field names match the original web client.

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::config::AppConfig;
use crate::machine::Verdict;
use crate::repository::{NewTestRun, NewVisualization, ResultStore, TestRun, VisualizationRecord};
use crate::runner::{ProgramRunner, Workspace};
use crate::tester::{self, TestPlan, TestSummary, TrialError, TrialReport};
use crate::visualizer;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ResultStore>,
    pub runner: Arc<dyn ProgramRunner>,
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/api/test", post(run_tests))
        .route("/api/visualize", post(visualize))
        .route("/api/test-results", get(list_test_results))
        .route("/api/visualizations", get(list_visualizations))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Error envelope every failing route returns: a status plus `{ "error": … }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(context: &str, err: anyhow::Error) -> Self {
        error!("{}: {:#}", context, err);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: context.to_string(),
        }
    }
}

impl From<TrialError> for ApiError {
    fn from(err: TrialError) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TestResponse {
    test_result: TestRun,
    details: Vec<TrialReport>,
    summary: TestSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VisualizeResponse {
    visualization: VisualizationRecord,
    numbers: Vec<i32>,
    operations: Vec<String>,
    verdict: Verdict,
}

async fn run_tests(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TestResponse>, ApiError> {
    let mut push_swap_file: Option<Vec<u8>> = None;
    let mut checker_file: Option<Vec<u8>> = None;
    let mut list_size: Option<u32> = None;
    let mut max_operations: Option<u32> = None;
    let mut test_count: Option<u32> = None;
    let mut show_args = false;

    while let Some(field) = multipart.next_field().await.map_err(multipart_err)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "pushSwapFile" => {
                push_swap_file = Some(field.bytes().await.map_err(multipart_err)?.to_vec())
            }
            "checkerFile" => {
                checker_file = Some(field.bytes().await.map_err(multipart_err)?.to_vec())
            }
            "listSize" => {
                list_size = Some(parse_count(
                    "listSize",
                    &field.text().await.map_err(multipart_err)?,
                )?)
            }
            "maxOperations" => {
                max_operations = Some(parse_count(
                    "maxOperations",
                    &field.text().await.map_err(multipart_err)?,
                )?)
            }
            "testCount" => {
                test_count = Some(parse_count(
                    "testCount",
                    &field.text().await.map_err(multipart_err)?,
                )?)
            }
            "showArgs" => show_args = field.text().await.map_err(multipart_err)? == "true",
            _ => {}
        }
    }

    let push_swap_file = push_swap_file
        .ok_or_else(|| ApiError::bad_request("Both push_swap and checker files are required"))?;
    let checker_file = checker_file
        .ok_or_else(|| ApiError::bad_request("Both push_swap and checker files are required"))?;

    let plan = TestPlan {
        list_size: require_bounded("listSize", list_size, state.config.max_list_size)?,
        max_operations: require_positive("maxOperations", max_operations)?,
        test_count: require_bounded("testCount", test_count, state.config.max_test_count)?,
        show_args,
    };

    let workspace = Workspace::new().map_err(|e| ApiError::internal("Test execution failed", e))?;
    let push_swap = workspace
        .install_binary("push_swap", &push_swap_file)
        .await
        .map_err(|e| ApiError::internal("Test execution failed", e))?;
    let checker = workspace
        .install_binary("checker", &checker_file)
        .await
        .map_err(|e| ApiError::internal("Test execution failed", e))?;

    let outcome = tester::run_test_batch(state.runner.as_ref(), &push_swap, &checker, &plan).await;

    let test_result = state
        .store
        .create_test_run(NewTestRun {
            list_size: plan.list_size,
            max_operations: plan.max_operations,
            test_count: plan.test_count,
            validation_tests: plan.test_count,
            performance_tests: plan.test_count,
            validation_passed: outcome.summary.validation_passed,
            performance_passed: outcome.summary.performance_passed,
        })
        .await;

    Ok(Json(TestResponse {
        test_result,
        details: outcome.details,
        summary: outcome.summary,
    }))
}

async fn visualize(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<VisualizeResponse>, ApiError> {
    let mut push_swap_file: Option<Vec<u8>> = None;
    let mut list_size: Option<u32> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_err)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "pushSwapFile" => {
                push_swap_file = Some(field.bytes().await.map_err(multipart_err)?.to_vec())
            }
            "listSize" => {
                list_size = Some(parse_count(
                    "listSize",
                    &field.text().await.map_err(multipart_err)?,
                )?)
            }
            _ => {}
        }
    }

    let push_swap_file =
        push_swap_file.ok_or_else(|| ApiError::bad_request("push_swap file is required"))?;
    let list_size = require_bounded("listSize", list_size, state.config.max_list_size)?;

    let workspace =
        Workspace::new().map_err(|e| ApiError::internal("Visualization failed", e))?;
    let push_swap = workspace
        .install_binary("push_swap", &push_swap_file)
        .await
        .map_err(|e| ApiError::internal("Visualization failed", e))?;

    let outcome = visualizer::prepare(state.runner.as_ref(), &push_swap, list_size).await?;

    let visualization = state
        .store
        .create_visualization(NewVisualization {
            list_size,
            operations: outcome.operations.join("\n"),
            numbers: outcome
                .numbers
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" "),
        })
        .await;

    Ok(Json(VisualizeResponse {
        visualization,
        numbers: outcome.numbers,
        operations: outcome.operations,
        verdict: outcome.verdict,
    }))
}

async fn list_test_results(State(state): State<AppState>) -> Json<Vec<TestRun>> {
    Json(state.store.list_test_runs().await)
}

async fn list_visualizations(State(state): State<AppState>) -> Json<Vec<VisualizationRecord>> {
    Json(state.store.list_visualizations().await)
}

fn multipart_err(err: MultipartError) -> ApiError {
    ApiError::bad_request(format!("Malformed upload: {}", err))
}

fn parse_count(name: &str, raw: &str) -> Result<u32, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("{} must be a positive integer", name)))
}

fn require_bounded(name: &str, value: Option<u32>, max: u32) -> Result<u32, ApiError> {
    let value = value.ok_or_else(|| ApiError::bad_request(format!("{} is required", name)))?;
    if value == 0 || value > max {
        return Err(ApiError::bad_request(format!(
            "{} must be between 1 and {}",
            name, max
        )));
    }
    Ok(value)
}

fn require_positive(name: &str, value: Option<u32>) -> Result<u32, ApiError> {
    let value = value.ok_or_else(|| ApiError::bad_request(format!("{} is required", name)))?;
    if value == 0 {
        return Err(ApiError::bad_request(format!(
            "{} must be at least 1",
            name
        )));
    }
    Ok(value)
}
