use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::authz::{visible_records, ResourceKind};
use crate::db::principals;
use crate::errors::AppResult;
use crate::jwt::CurrentPrincipal;
use crate::models::user::{PrincipalSummary, User};

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Users",
    responses(
        (status = 200, description = "Resolved principal of the caller", body = PrincipalSummary),
        (status = 401, description = "Missing, invalid or deactivated credentials"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn me(CurrentPrincipal(principal): CurrentPrincipal) -> Json<PrincipalSummary> {
    Json(PrincipalSummary::from(&principal))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses((status = 200, description = "Employee directory filtered by scope", body = [User])),
    security(("bearerAuth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<Json<Vec<User>>> {
    let users = principals::list_users(&state.pool).await?;
    let directory = principals::directory(&state.pool).await?;
    Ok(Json(visible_records(Some(&principal), ResourceKind::Users, users, &directory)))
}
