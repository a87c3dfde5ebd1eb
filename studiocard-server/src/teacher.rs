//! Everything behind the route gate

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    routing::{delete, get, patch, post, put},
    Json,
};
use studiocard_collab::PrimaryKey;

use crate::{
    auth::TeacherSession,
    context::ServerContext,
    errors::ServerResult,
    schemas::{
        CardSchema, NewLessonSchema, NewRecitalSchema, NewSlotSchema, PerformerSchema,
        ReorderSchema, SettingsSchema, StudentNotesSchema, TitleQuery, ValidatedJson,
    },
    serialized::{
        Lesson, LessonAudio, Performer, Recital, RosterStudent, ScheduleSlot, Teacher, ToSerialized,
    },
    Router, MAX_UPLOAD_SIZE,
};

#[utoipa::path(
    get,
    path = "/v1/teacher/students",
    tag = "teacher",
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = Vec<RosterStudent>),
        (status = 303, description = "Not signed in as a teacher, redirected to the login")
    )
)]
pub(crate) async fn roster(
    gate: TeacherSession,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<RosterStudent>>> {
    let students = context.studio.students.roster(&gate.teacher).await?;
    Ok(Json(students.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/teacher/students/{id}",
    tag = "teacher",
    request_body = StudentNotesSchema,
    security(("BearerAuth" = [])),
    responses((status = 200, body = RosterStudent))
)]
pub(crate) async fn update_student(
    gate: TeacherSession,
    State(context): State<ServerContext>,
    Path(student_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<StudentNotesSchema>,
) -> ServerResult<Json<RosterStudent>> {
    let student = context
        .studio
        .students
        .update_by_teacher(&gate.session, student_id, body.into())
        .await?;

    Ok(Json(student.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/teacher/lessons",
    tag = "teacher",
    security(("BearerAuth" = [])),
    responses((status = 200, body = Vec<Lesson>))
)]
pub(crate) async fn lessons(
    gate: TeacherSession,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Lesson>>> {
    let lessons = context.studio.lessons.list(gate.teacher.id).await?;
    Ok(Json(lessons.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/teacher/lessons",
    tag = "teacher",
    request_body = NewLessonSchema,
    security(("BearerAuth" = [])),
    responses((status = 200, body = Lesson))
)]
pub(crate) async fn create_lesson(
    gate: TeacherSession,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewLessonSchema>,
) -> ServerResult<Json<Lesson>> {
    let lesson = context
        .studio
        .lessons
        .create(&gate.teacher, body.title, body.description)
        .await?;

    Ok(Json(lesson.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/teacher/lessons/{id}/audio",
    tag = "teacher",
    params(TitleQuery),
    request_body(content = Vec<u8>, content_type = "audio/webm"),
    security(("BearerAuth" = [])),
    responses((status = 200, body = LessonAudio))
)]
pub(crate) async fn add_lesson_audio(
    gate: TeacherSession,
    State(context): State<ServerContext>,
    Path(lesson_id): Path<PrimaryKey>,
    Query(query): Query<TitleQuery>,
    body: Bytes,
) -> ServerResult<Json<LessonAudio>> {
    let audio = context
        .studio
        .lessons
        .add_audio(&gate.teacher, lesson_id, query.title, &body)
        .await?;

    Ok(Json(audio.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/teacher/schedule",
    tag = "teacher",
    security(("BearerAuth" = [])),
    responses((status = 200, body = Vec<ScheduleSlot>))
)]
pub(crate) async fn schedule(
    gate: TeacherSession,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<ScheduleSlot>>> {
    let slots = context.studio.schedule.list(&gate.teacher).await?;
    Ok(Json(slots.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/teacher/schedule",
    tag = "teacher",
    request_body = NewSlotSchema,
    security(("BearerAuth" = [])),
    responses((status = 200, body = ScheduleSlot))
)]
pub(crate) async fn create_slot(
    gate: TeacherSession,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewSlotSchema>,
) -> ServerResult<Json<ScheduleSlot>> {
    let slot = context
        .studio
        .schedule
        .create(&gate.teacher, body.into())
        .await?;

    Ok(Json(slot.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/teacher/schedule/{id}",
    tag = "teacher",
    security(("BearerAuth" = [])),
    responses((status = 200, description = "The slot was removed"))
)]
pub(crate) async fn delete_slot(
    gate: TeacherSession,
    State(context): State<ServerContext>,
    Path(slot_id): Path<PrimaryKey>,
) -> ServerResult<()> {
    context.studio.schedule.delete(&gate.teacher, slot_id).await?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/teacher/recitals",
    tag = "teacher",
    security(("BearerAuth" = [])),
    responses((status = 200, body = Vec<Recital>))
)]
pub(crate) async fn recitals(
    gate: TeacherSession,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Recital>>> {
    let recitals = context.studio.recitals.list(&gate.teacher).await?;
    Ok(Json(recitals.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/teacher/recitals",
    tag = "teacher",
    request_body = NewRecitalSchema,
    security(("BearerAuth" = [])),
    responses((status = 200, body = Recital))
)]
pub(crate) async fn create_recital(
    gate: TeacherSession,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewRecitalSchema>,
) -> ServerResult<Json<Recital>> {
    let recital = context
        .studio
        .recitals
        .create(&gate.teacher, body.title, body.venue, body.date)
        .await?;

    Ok(Json(recital.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/teacher/recitals/{id}/performers",
    tag = "teacher",
    request_body = PerformerSchema,
    security(("BearerAuth" = [])),
    responses((status = 200, body = Performer))
)]
pub(crate) async fn add_performer(
    gate: TeacherSession,
    State(context): State<ServerContext>,
    Path(recital_id): Path<PrimaryKey>,
    Json(body): Json<PerformerSchema>,
) -> ServerResult<Json<Performer>> {
    let performer = context
        .studio
        .recitals
        .add_performer(&gate.teacher, recital_id, body.into())
        .await?;

    Ok(Json(performer.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/teacher/recitals/{id}/performers/{performer_id}",
    tag = "teacher",
    security(("BearerAuth" = [])),
    responses((status = 200, body = Recital))
)]
pub(crate) async fn remove_performer(
    gate: TeacherSession,
    State(context): State<ServerContext>,
    Path((recital_id, performer_id)): Path<(PrimaryKey, PrimaryKey)>,
) -> ServerResult<Json<Recital>> {
    let recital = context
        .studio
        .recitals
        .remove_performer(&gate.teacher, recital_id, performer_id)
        .await?;

    Ok(Json(recital.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/teacher/recitals/{id}/order",
    tag = "teacher",
    request_body = ReorderSchema,
    security(("BearerAuth" = [])),
    responses((status = 200, body = Recital))
)]
pub(crate) async fn reorder(
    gate: TeacherSession,
    State(context): State<ServerContext>,
    Path(recital_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<ReorderSchema>,
) -> ServerResult<Json<Recital>> {
    let recital = context
        .studio
        .recitals
        .reorder(&gate.teacher, recital_id, body.order)
        .await?;

    Ok(Json(recital.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/teacher/card",
    tag = "teacher",
    request_body = CardSchema,
    security(("BearerAuth" = [])),
    responses((status = 200, description = "The card was saved"))
)]
pub(crate) async fn update_card(
    gate: TeacherSession,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<CardSchema>,
) -> ServerResult<()> {
    context
        .studio
        .teachers
        .update_card(&gate.teacher, body.into())
        .await?;

    Ok(())
}

#[utoipa::path(
    patch,
    path = "/v1/teacher/settings",
    tag = "teacher",
    request_body = SettingsSchema,
    security(("BearerAuth" = [])),
    responses((status = 200, body = Teacher))
)]
pub(crate) async fn update_settings(
    gate: TeacherSession,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<SettingsSchema>,
) -> ServerResult<Json<Teacher>> {
    let teacher = context
        .studio
        .teachers
        .update_settings(&gate.teacher, body.display_name)
        .await?;

    Ok(Json(teacher.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/students", get(roster))
        .route("/students/:id", patch(update_student))
        .route("/lessons", get(lessons).post(create_lesson))
        .route(
            "/lessons/:id/audio",
            post(add_lesson_audio).layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE)),
        )
        .route("/schedule", get(schedule).post(create_slot))
        .route("/schedule/:id", delete(delete_slot))
        .route("/recitals", get(recitals).post(create_recital))
        .route("/recitals/:id/performers", post(add_performer))
        .route(
            "/recitals/:id/performers/:performer_id",
            delete(remove_performer),
        )
        .route("/recitals/:id/order", put(reorder))
        .route("/card", put(update_card))
        .route("/settings", patch(update_settings))
}
