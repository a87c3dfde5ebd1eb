use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json,
};
use studiocard_collab::PrimaryKey;

use crate::{
    auth::StudentSession,
    context::ServerContext,
    errors::ServerResult,
    serialized::{LessonWithAudio, Progress, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/lessons/{id}",
    tag = "lessons",
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = LessonWithAudio),
        (status = 403, description = "The lesson belongs to another teacher")
    )
)]
pub(crate) async fn lesson(
    student: StudentSession,
    State(context): State<ServerContext>,
    Path(lesson_id): Path<PrimaryKey>,
) -> ServerResult<Json<LessonWithAudio>> {
    let details = context
        .studio
        .lessons
        .details_for(&student.student, lesson_id)
        .await?;
    Ok(Json(details.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/lessons/{id}/complete",
    tag = "lessons",
    security(("BearerAuth" = [])),
    responses((status = 200, body = Progress))
)]
pub(crate) async fn complete(
    student: StudentSession,
    State(context): State<ServerContext>,
    Path(lesson_id): Path<PrimaryKey>,
) -> ServerResult<Json<Progress>> {
    let progress = context
        .studio
        .lessons
        .complete(&student.student, lesson_id)
        .await?;

    Ok(Json(progress.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/:id", get(lesson))
        .route("/:id/complete", post(complete))
}
