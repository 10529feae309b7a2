use crate::core::auth::UserInfo;
use crate::core::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::Result;
use crate::core::response::DataResponse;
use axum::extract::State;
use tracing::info;

/// GET /auth/me
pub async fn me(State(state): State<AppState>, ctx: Ctx) -> Result<DataResponse<UserInfo>> {
    info!("GET /auth/me - {}", ctx.user_id());
    let user = state.auth.get_user(ctx.user_id()).await?;
    Ok(DataResponse::ok(user.into()))
}
