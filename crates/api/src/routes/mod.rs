//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};

pub mod auth;
pub mod expenses;
pub mod families;
pub mod health;
pub mod projects;
pub mod wallets;

/// Deserializes a JSON field that distinguishes "absent" from "null".
///
/// Wrap the target in `Option<Option<T>>` and mark the field
/// `#[serde(default, deserialize_with = "double_option")]`: absent stays
/// `None`, `null` becomes `Some(None)`, a value becomes `Some(Some(v))`.
pub(crate) fn double_option<'de, T, D>(
    deserializer: D,
) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Creates the API router with all routes, applying the auth middleware to
/// everything except health checks and the auth endpoints themselves.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(auth::protected_routes())
        .merge(families::routes())
        .merge(expenses::routes())
        .merge(projects::routes())
        .merge(wallets::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(protected_routes)
}
