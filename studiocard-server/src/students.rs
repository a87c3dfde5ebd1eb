use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    routing::{get, post},
    Json,
};
use studiocard_collab::{PageAccess, PrimaryKey};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{AccessQuery, ProfileUpdateSchema, TitleQuery, UnlockSchema, ValidatedJson},
    serialized::{Profile, Progress, Student, ToSerialized, Track},
    Router, MAX_UPLOAD_SIZE,
};

/// Builds the access of this request from an access code and a session, if given
async fn page_access(
    context: &ServerContext,
    student_id: PrimaryKey,
    code: Option<&str>,
    session: Option<Session>,
) -> ServerResult<PageAccess> {
    let student = context.studio.students.get(student_id).await?;
    let mut access = PageAccess::for_student(&student);

    if let Some(code) = code {
        access.unlock_read(&student, code)?;
    }

    if let Some(Session(session)) = session {
        access.grant_session(session);
    }

    Ok(access)
}

#[utoipa::path(
    get,
    path = "/v1/students/{id}",
    tag = "students",
    params(AccessQuery),
    responses(
        (status = 200, body = Profile),
        (status = 403, description = "Incorrect access code")
    )
)]
pub(crate) async fn profile(
    session: Option<Session>,
    State(context): State<ServerContext>,
    Path(student_id): Path<PrimaryKey>,
    Query(query): Query<AccessQuery>,
) -> ServerResult<Json<Profile>> {
    let access = page_access(&context, student_id, query.code.as_deref(), session).await?;
    let profile = context.studio.students.profile(&access).await?;

    Ok(Json(profile.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/students/{id}/unlock",
    tag = "students",
    request_body = UnlockSchema,
    responses(
        (status = 200, body = Profile),
        (status = 403, description = "Incorrect access code")
    )
)]
pub(crate) async fn unlock(
    State(context): State<ServerContext>,
    Path(student_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<UnlockSchema>,
) -> ServerResult<Json<Profile>> {
    let access = page_access(&context, student_id, Some(&body.code), None).await?;
    let profile = context.studio.students.profile(&access).await?;

    Ok(Json(profile.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/students/{id}",
    tag = "students",
    request_body = ProfileUpdateSchema,
    security(("BearerAuth" = [])),
    responses((status = 200, body = Student))
)]
pub(crate) async fn update_profile(
    session: Session,
    State(context): State<ServerContext>,
    Path(student_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<ProfileUpdateSchema>,
) -> ServerResult<Json<Student>> {
    let student = context
        .studio
        .students
        .update_profile(&session, student_id, body.into())
        .await?;

    Ok(Json(student.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/students/{id}/image",
    tag = "students",
    request_body(content = Vec<u8>, content_type = "image/jpeg"),
    security(("BearerAuth" = [])),
    responses((status = 200, body = Student))
)]
pub(crate) async fn upload_image(
    session: Session,
    State(context): State<ServerContext>,
    Path(student_id): Path<PrimaryKey>,
    body: Bytes,
) -> ServerResult<Json<Student>> {
    let student = context
        .studio
        .students
        .upload_profile_image(&session, student_id, &body)
        .await?;

    Ok(Json(student.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/students/{id}/tracks",
    tag = "students",
    params(AccessQuery),
    responses((status = 200, body = Vec<Track>))
)]
pub(crate) async fn tracks(
    session: Option<Session>,
    State(context): State<ServerContext>,
    Path(student_id): Path<PrimaryKey>,
    Query(query): Query<AccessQuery>,
) -> ServerResult<Json<Vec<Track>>> {
    let access = page_access(&context, student_id, query.code.as_deref(), session).await?;
    let tracks = context.studio.tracks.list(&access).await?;

    Ok(Json(tracks.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/students/{id}/tracks",
    tag = "students",
    params(TitleQuery),
    request_body(content = Vec<u8>, content_type = "audio/webm"),
    security(("BearerAuth" = [])),
    responses((status = 200, body = Track))
)]
pub(crate) async fn upload_track(
    session: Session,
    State(context): State<ServerContext>,
    Path(student_id): Path<PrimaryKey>,
    Query(query): Query<TitleQuery>,
    body: Bytes,
) -> ServerResult<Json<Track>> {
    let track = context
        .studio
        .tracks
        .upload(&session, student_id, query.title, &body)
        .await?;

    Ok(Json(track.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/students/{id}/progress",
    tag = "students",
    security(("BearerAuth" = [])),
    responses((status = 200, body = Vec<Progress>))
)]
pub(crate) async fn progress(
    session: Session,
    State(context): State<ServerContext>,
    Path(student_id): Path<PrimaryKey>,
) -> ServerResult<Json<Vec<Progress>>> {
    let progress = context
        .studio
        .lessons
        .progress(&session, student_id)
        .await?;

    Ok(Json(progress.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/:id", get(profile).patch(update_profile))
        .route("/:id/unlock", post(unlock))
        .route("/:id/progress", get(progress))
        .route(
            "/:id/tracks",
            get(tracks)
                .post(upload_track)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE)),
        )
        .route(
            "/:id/image",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE)),
        )
}
