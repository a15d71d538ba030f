//! HTTP request handlers
//!
//! Implements the REST API of the bedtime screen.

use actix_web::{web, HttpRequest, HttpResponse, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{json_error_handler, AppError};
use crate::form::{BedtimeForm, FormSnapshot};
use crate::models::{
    CalculationOutcome, CoffeeAmountInput, EstimateInput, FormAction, HealthCheck,
    SleepAmountInput, WakeTimeInput,
};
use crate::state::AppState;
use crate::validation::{validate_coffee_input, validate_estimate_input, validate_sleep_input};
use crate::websocket::WsSession;

/// Configure all application routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(
            web::scope("/api")
                // Health check
                .route("/health", web::get().to(health_check))
                // Stateless estimate
                .route("/estimate", web::post().to(estimate))
                // Form endpoints
                .route("/form", web::get().to(get_form))
                .route("/form/actions", web::post().to(apply_action))
                .route("/form/calculate", web::post().to(calculate))
                .route("/form/alert/dismiss", web::post().to(dismiss_alert))
                .route("/form/wake-time", web::put().to(set_wake_time))
                .route("/form/sleep-amount", web::put().to(set_sleep_amount))
                .route(
                    "/form/sleep-amount/increment",
                    web::post().to(increment_sleep),
                )
                .route(
                    "/form/sleep-amount/decrement",
                    web::post().to(decrement_sleep),
                )
                .route("/form/coffee-amount", web::put().to(set_coffee_amount))
                .route(
                    "/form/coffee-amount/increment",
                    web::post().to(increment_coffee),
                )
                .route(
                    "/form/coffee-amount/decrement",
                    web::post().to(decrement_coffee),
                ),
        )
        // WebSocket endpoint
        .route("/ws", web::get().to(websocket_handler));
}

/// Fallback for unknown routes
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound(format!("No route for {}", req.path())))
}

/// Health check endpoint
///
/// GET /api/health
///
/// Returns service status, uptime and calculation counters.
pub async fn health_check(
    state: web::Data<Arc<RwLock<AppState>>>,
) -> Result<HttpResponse, AppError> {
    let state = state.read().await;

    let health = HealthCheck {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        uptime_seconds: state.uptime_seconds(),
        estimator: state.estimator_name().to_string(),
        clock_format: state.clock_format(),
        connected_clients: state.client_count(),
        total_calculations: state.total_calculations(),
        failed_calculations: state.failed_calculations(),
    };

    Ok(HttpResponse::Ok().json(health))
}

/// Current form
///
/// GET /api/form
pub async fn get_form(
    state: web::Data<Arc<RwLock<AppState>>>,
) -> Result<HttpResponse, AppError> {
    let state = state.read().await;
    Ok(HttpResponse::Ok().json(state.snapshot()))
}

#[derive(Serialize)]
struct ActionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<CalculationOutcome>,
    form: FormSnapshot,
}

/// Apply an action and answer with the resulting form
async fn run_action(
    state: &web::Data<Arc<RwLock<AppState>>>,
    action: FormAction,
) -> Result<HttpResponse, AppError> {
    let mut state = state.write().await;
    let outcome = state.apply(action)?;

    Ok(HttpResponse::Ok().json(ActionResponse {
        outcome,
        form: state.snapshot(),
    }))
}

/// Apply any form action
///
/// POST /api/form/actions
/// Body: `{"action": "increment_sleep"}` or `{"action": "set_wake_time", "value": "07:00"}`
pub async fn apply_action(
    state: web::Data<Arc<RwLock<AppState>>>,
    body: web::Json<FormAction>,
) -> Result<HttpResponse, AppError> {
    run_action(&state, body.into_inner()).await
}

/// Calculate the bedtime for the current form
///
/// POST /api/form/calculate
///
/// Estimator failures are reported through the alert with a 200 status.
pub async fn calculate(
    state: web::Data<Arc<RwLock<AppState>>>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let correlation_id = extract_correlation_id(&req);
    info!(correlation_id = %correlation_id, "Received bedtime calculation request");

    run_action(&state, FormAction::Calculate).await
}

/// POST /api/form/alert/dismiss
pub async fn dismiss_alert(
    state: web::Data<Arc<RwLock<AppState>>>,
) -> Result<HttpResponse, AppError> {
    run_action(&state, FormAction::DismissAlert).await
}

/// PUT /api/form/wake-time
pub async fn set_wake_time(
    state: web::Data<Arc<RwLock<AppState>>>,
    body: web::Json<WakeTimeInput>,
) -> Result<HttpResponse, AppError> {
    run_action(&state, FormAction::SetWakeTime(body.wake_time)).await
}

/// PUT /api/form/sleep-amount
pub async fn set_sleep_amount(
    state: web::Data<Arc<RwLock<AppState>>>,
    body: web::Json<SleepAmountInput>,
) -> Result<HttpResponse, AppError> {
    let sleep = validate_sleep_input(&body)?;
    run_action(&state, FormAction::SetSleepAmount(sleep.hours())).await
}

/// POST /api/form/sleep-amount/increment
pub async fn increment_sleep(
    state: web::Data<Arc<RwLock<AppState>>>,
) -> Result<HttpResponse, AppError> {
    run_action(&state, FormAction::IncrementSleep).await
}

/// POST /api/form/sleep-amount/decrement
pub async fn decrement_sleep(
    state: web::Data<Arc<RwLock<AppState>>>,
) -> Result<HttpResponse, AppError> {
    run_action(&state, FormAction::DecrementSleep).await
}

/// PUT /api/form/coffee-amount
pub async fn set_coffee_amount(
    state: web::Data<Arc<RwLock<AppState>>>,
    body: web::Json<CoffeeAmountInput>,
) -> Result<HttpResponse, AppError> {
    let coffee = validate_coffee_input(&body)?;
    run_action(&state, FormAction::SetCoffeeAmount(coffee.cups())).await
}

/// POST /api/form/coffee-amount/increment
pub async fn increment_coffee(
    state: web::Data<Arc<RwLock<AppState>>>,
) -> Result<HttpResponse, AppError> {
    run_action(&state, FormAction::IncrementCoffee).await
}

/// POST /api/form/coffee-amount/decrement
pub async fn decrement_coffee(
    state: web::Data<Arc<RwLock<AppState>>>,
) -> Result<HttpResponse, AppError> {
    run_action(&state, FormAction::DecrementCoffee).await
}

/// Stateless bedtime estimate
///
/// POST /api/estimate
///
/// Runs one calculation on the given inputs without touching the shared form.
pub async fn estimate(
    state: web::Data<Arc<RwLock<AppState>>>,
    body: web::Json<EstimateInput>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let correlation_id = extract_correlation_id(&req);

    info!(
        correlation_id = %correlation_id,
        "Received stateless estimate request"
    );

    let (sleep, coffee) = validate_estimate_input(&body)?;
    let form = BedtimeForm::with_inputs(body.wake_time, sleep, coffee);

    let outcome = {
        let mut state = state.write().await;
        state.estimate_detached(form)
    };

    info!(
        correlation_id = %correlation_id,
        status = ?outcome.status,
        "Stateless estimate finished"
    );

    Ok(HttpResponse::Ok().json(outcome))
}

/// WebSocket upgrade handler
///
/// GET /ws
pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<Arc<RwLock<AppState>>>,
) -> Result<HttpResponse, actix_web::Error> {
    let client_id = Uuid::new_v4().to_string();

    info!(client_id = %client_id, "WebSocket connection request");

    // Register client
    {
        let mut state = state.write().await;
        state.add_client(client_id.clone());
    }

    let ws_session = WsSession::new(client_id.clone(), state.get_ref().clone());

    match actix_web_actors::ws::start(ws_session, &req, stream) {
        Ok(response) => Ok(response),
        Err(e) => {
            // no session was started, so nothing else will unregister it
            warn!(client_id = %client_id, error = %e, "WebSocket handshake failed");
            state.write().await.remove_client(&client_id);
            Err(e)
        }
    }
}

/// Extract or generate correlation ID from request headers
fn extract_correlation_id(req: &HttpRequest) -> String {
    req.headers()
        .get("X-Correlation-ID")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bedtime::ClockFormat;
    use crate::estimator::testing::{FailingEstimator, FixedEstimator};
    use crate::estimator::BedtimeEstimator;
    use crate::models::{Alert, CalculationStatus};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    fn shared_state(estimator: Arc<dyn BedtimeEstimator>) -> Arc<RwLock<AppState>> {
        Arc::new(RwLock::new(AppState::new(
            estimator,
            ClockFormat::TwentyFourHour,
        )))
    }

    #[actix_web::test]
    async fn test_health_check() {
        let state = shared_state(Arc::new(FixedEstimator(27_000.0)));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_get_form_defaults() {
        let state = shared_state(Arc::new(FixedEstimator(27_000.0)));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/form").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["wake_time"], "06:00");
        assert_eq!(body["sleep_amount"], 8.0);
        assert_eq!(body["coffee_amount"], 1);
        assert_eq!(body["coffee_label"], "1 cup");
        assert_eq!(body["showing_alert"], false);
    }

    #[actix_web::test]
    async fn test_calculate_after_setting_wake_time() {
        let state = shared_state(Arc::new(FixedEstimator(27_000.0)));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/api/form/wake-time")
            .set_json(json!({ "wake_time": "07:00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/form/calculate")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["outcome"]["status"], "resolved");
        assert_eq!(body["outcome"]["bedtime"], "23:30");
        assert_eq!(body["form"]["alert"]["message"], "23:30");
        assert_eq!(body["form"]["showing_alert"], true);

        assert_eq!(state.read().await.total_calculations(), 1);
    }

    #[actix_web::test]
    async fn test_estimator_failure_is_alert_not_error() {
        let state = shared_state(Arc::new(FailingEstimator));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/form/calculate")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["outcome"]["status"], "failed");
        assert_eq!(body["form"]["alert"]["title"], Alert::FAILURE_TITLE);
        assert_eq!(body["form"]["alert"]["message"], Alert::FAILURE_MESSAGE);
    }

    #[actix_web::test]
    async fn test_stepper_endpoints_clamp() {
        let state = shared_state(Arc::new(FixedEstimator(27_000.0)));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/form/coffee-amount/decrement")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::put()
            .uri("/api/form/sleep-amount")
            .set_json(json!({ "hours": 12.0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/form/sleep-amount/increment")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["form"]["sleep_amount"], 12.0);
        assert_eq!(body["form"]["coffee_amount"], 1);
    }

    #[actix_web::test]
    async fn test_invalid_direct_set_rejected() {
        let state = shared_state(Arc::new(FixedEstimator(27_000.0)));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/api/form/coffee-amount")
            .set_json(json!({ "cups": 25 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let req = test::TestRequest::put()
            .uri("/api/form/wake-time")
            .set_json(json!({ "wake_time": "31:00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let state = state.read().await;
        assert_eq!(state.snapshot().coffee_amount, 1);
        assert_eq!(state.revision(), 0);
    }

    #[actix_web::test]
    async fn test_actions_endpoint() {
        let state = shared_state(Arc::new(FixedEstimator(27_000.0)));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/form/actions")
            .set_json(json!({ "action": "increment_coffee" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["form"]["coffee_label"], "2 cups");
        assert!(body.get("outcome").is_none());
    }

    #[actix_web::test]
    async fn test_stateless_estimate() {
        let state = shared_state(Arc::new(FixedEstimator(27_000.0)));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        let input = json!({ "wake_time": "07:00", "sleep_amount": 7.5, "coffee_amount": 2 });
        let req = test::TestRequest::post()
            .uri("/api/estimate")
            .set_json(&input)
            .to_request();
        let outcome: CalculationOutcome = test::call_and_read_body_json(&app, req).await;

        assert_eq!(outcome.status, CalculationStatus::Resolved);
        assert_eq!(outcome.bedtime.as_deref(), Some("23:30"));
        assert_eq!(state.read().await.revision(), 0);
    }

    #[actix_web::test]
    async fn test_stateless_estimate_invalid_input() {
        let state = shared_state(Arc::new(FixedEstimator(27_000.0)));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let input = json!({ "wake_time": "07:00", "sleep_amount": 15.0, "coffee_amount": 2 });
        let req = test::TestRequest::post()
            .uri("/api/estimate")
            .set_json(&input)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_failed_websocket_handshake_unregisters_client() {
        let state = shared_state(Arc::new(FixedEstimator(27_000.0)));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        for _ in 0..3 {
            let req = test::TestRequest::get().uri("/ws").to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 400);
        }

        assert_eq!(state.read().await.client_count(), 0);
    }

    #[actix_web::test]
    async fn test_unknown_route() {
        let state = shared_state(Arc::new(FixedEstimator(27_000.0)));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes)
                .default_service(web::to(not_found)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/nothing").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 404);
    }
}
