use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::analytics::dashboard::{self, Overview};
use crate::analytics::{Window, WINDOW_DAYS};
use crate::auth::extractor::AuthUser;
use crate::error::AppError;
use crate::state::SharedState;

pub async fn personal(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Overview>, AppError> {
    let window = Window::trailing_days(Utc::now(), WINDOW_DAYS);
    let overview = dashboard::personal(&state.pool, &auth.own_scope(), &window).await?;
    Ok(Json(overview))
}
