use std::sync::Arc;

use axum::http::Method;
use axum::middleware;
use axum::routing::{get, patch};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::docs;
use crate::errors::AppError;
use crate::events::{init_event_bus, start_activity_listener, EventBus};
use crate::jwt::JwtConfig;
use crate::lifecycle::{Clock, SystemClock};
use crate::routes::{additional_payments, health, leaves, payrolls, users};
use crate::throttle::{throttle_mutations, RateLimiter, ThrottleConfig};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub event_bus: EventBus,
    pub limiter: Arc<RateLimiter>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, throttle: ThrottleConfig, event_bus: EventBus) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            event_bus,
            limiter: Arc::new(RateLimiter::new(throttle)),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let throttle = ThrottleConfig::from_env()?;

    let (event_bus, rx) = init_event_bus();
    tokio::spawn(start_activity_listener(rx, pool.clone()));

    let state = AppState::new(pool, jwt_config, throttle, event_bus);
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let payroll_routes = Router::new()
        .route("/", get(payrolls::list_payrolls).post(payrolls::create_payroll))
        .route(
            "/:id",
            get(payrolls::get_payroll)
                .put(payrolls::update_payroll)
                .delete(payrolls::delete_payroll),
        )
        .route("/:id/status", patch(payrolls::update_payroll_status).put(payrolls::update_payroll_status));

    let additional_payment_routes = Router::new()
        .route(
            "/",
            get(additional_payments::list_additional_payments).post(additional_payments::create_additional_payment),
        )
        .route(
            "/:id",
            get(additional_payments::get_additional_payment)
                .put(additional_payments::update_additional_payment)
                .delete(additional_payments::delete_additional_payment),
        )
        .route(
            "/:id/status",
            patch(additional_payments::update_additional_payment_status)
                .put(additional_payments::update_additional_payment_status),
        );

    let leave_routes = Router::new()
        .route("/", get(leaves::list_leaves).post(leaves::create_leave))
        .route(
            "/:id",
            get(leaves::get_leave).put(leaves::update_leave).delete(leaves::delete_leave),
        )
        .route("/:id/status", patch(leaves::update_leave_status).put(leaves::update_leave_status));

    let throttle = middleware::from_fn_with_state(Arc::clone(&state.limiter), throttle_mutations);

    Router::new()
        .route("/api/health", get(health::health))
        .route("/auth/me", get(users::me))
        .route("/users", get(users::list_users))
        .nest("/payrolls", payroll_routes)
        .nest("/additional-payments", additional_payment_routes)
        .nest("/leaves", leave_routes)
        .layer(throttle)
        .with_state(state)
        .merge(docs::swagger_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
