use super::ui;
use crate::error::AppResult;
use crate::middleware::admin::staff_required;
use crate::session::CurrentUser;
use crate::AppState;
use axum::{
    extract::Extension,
    response::Html,
    routing::{get, Router},
};
use std::sync::Arc;

pub fn admin_routes() -> Router {
    Router::new()
        .route("/admin/", get(admin_overview))
        .route_layer(axum::middleware::from_fn(staff_required))
}

async fn admin_overview(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Html<String>> {
    let rows = state.store.user_activity().await?;
    Ok(Html(ui::admin_page(&current.user, &rows)))
}
