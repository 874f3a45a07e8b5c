//! Notification feed handler

use crate::models::{NotificationQuery, SuccessResponse};
use crate::registry::Notification;
use crate::routes::DEFAULT_PAGE_LIMIT;
use crate::state::SharedState;
use axum::extract::{Query, State};
use axum::Json;

/// Records with a sequence number greater than `after`, oldest first
pub async fn list_notifications(
    State(state): State<SharedState>,
    Query(query): Query<NotificationQuery>,
) -> Json<SuccessResponse<Vec<Notification>>> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let records = state.registry.notifications(query.after, limit).await;
    Json(SuccessResponse::with_data(
        format!("{} notification(s) after #{}", records.len(), query.after),
        records,
    ))
}
