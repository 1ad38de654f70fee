use axum::routing::{get, post, put};
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{auth, events, health_check, messages};
use crate::models::AccountKind;
use crate::state::AppState;
use crate::store::Store;

pub fn create_routes<S: Store>(state: AppState<S>, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config.is_production()))
        .layer(create_cors_layer(config.cors_allowed_origins.as_deref()))
}

pub fn api_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .nest("/events", event_routes())
        .nest("/auth", account_routes(AccountKind::User))
        .nest("/member", account_routes(AccountKind::Member))
        .nest("/messages", message_routes())
}

fn event_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/",
            get(events::list_events::<S>).post(events::create_event::<S>),
        )
        .route(
            "/admin/all-registrations",
            get(events::all_registrations::<S>),
        )
        .route(
            "/registrations/:id/status",
            put(events::set_registration_status::<S>),
        )
        .route(
            "/:id",
            get(events::get_event::<S>)
                .put(events::update_event::<S>)
                .delete(events::delete_event::<S>),
        )
        .route(
            "/:id/registrations",
            get(events::event_registrations::<S>),
        )
        .route("/:id/register", post(events::register_for_event::<S>))
}

/// Users and members share one set of account routes.
fn account_routes<S: Store>(kind: AccountKind) -> Router<AppState<S>> {
    Router::new()
        .route("/register", post(auth::register::<S>))
        .route("/verify", post(auth::verify::<S>))
        .route("/resend-code", post(auth::resend_code::<S>))
        .route("/login", post(auth::login::<S>))
        .layer(Extension(kind))
}

fn message_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/send", post(messages::send_message::<S>))
        .route("/conversation/:user_id", get(messages::conversation::<S>))
        .route("/read/:user_id", put(messages::mark_read::<S>))
        .route("/conversations", get(messages::conversations::<S>))
        .route("/broadcast", post(messages::broadcast::<S>))
}
