use std::ops::Deref;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, put},
    Json,
};
use log::info;
use studiocard_collab::{require_student, require_teacher, SessionData, StudentData, TeacherData};

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{
        EmailSchema, PasswordSchema, StudentLoginSchema, StudentSignupSchema, TeacherLoginSchema,
        TeacherSignupSchema, ValidatedJson,
    },
    serialized::{LoginResult, SessionRole, Student, Teacher, ToSerialized},
    Router,
};

/// Where the route gate sends anyone who isn't a signed in teacher
pub const TEACHER_LOGIN_PATH: &str = "/teacher/login";

/// Wraps [SessionData] so [FromRequestParts] can be implemented for it
pub struct Session(pub(crate) SessionData);

impl Deref for Session {
    type Target = SessionData;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, (StatusCode, &'static str)> {
    let header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|x| x.to_str().ok())
        .ok_or((StatusCode::UNAUTHORIZED, "Missing authorization"))?;

    let segments: Vec<_> = header.split_ascii_whitespace().collect();

    if segments.first() != Some(&"Bearer") {
        return Err((StatusCode::BAD_REQUEST, "Authorization must be Bearer"));
    }

    Ok(segments.last().copied().unwrap_or_default())
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    ServerContext: FromRef<S>,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);
        let token = bearer_token(parts)?;

        let session = context
            .studio
            .auth
            .session(token)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Session does not exist"))?;

        Ok(Self(session))
    }
}

/// The route gate. Only sessions of teachers get through,
/// everyone else is redirected to the teacher login.
pub struct TeacherSession {
    pub session: SessionData,
    pub teacher: TeacherData,
}

#[async_trait]
impl<S> FromRequestParts<S> for TeacherSession
where
    S: Send + Sync,
    ServerContext: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);
        let redirect = || Redirect::to(TEACHER_LOGIN_PATH).into_response();

        let Session(session) = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| redirect())?;

        let teacher = require_teacher(&context.studio.auth, &session)
            .await
            .map_err(|_| redirect())?;

        Ok(Self { session, teacher })
    }
}

/// A session that belongs to a student
pub struct StudentSession {
    pub session: SessionData,
    pub student: StudentData,
}

#[async_trait]
impl<S> FromRequestParts<S> for StudentSession
where
    S: Send + Sync,
    ServerContext: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);

        let Session(session) = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let student = require_student(&context.studio.auth, &session)
            .await
            .map_err(|_| (StatusCode::FORBIDDEN, "Only students can do that").into_response())?;

        Ok(Self { session, student })
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/students/login",
    tag = "auth",
    request_body = StudentLoginSchema,
    responses(
        (status = 200, body = LoginResult),
        (status = 401, description = "Incorrect passcode or handle")
    )
)]
pub(crate) async fn student_login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<StudentLoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .studio
        .auth
        .sign_in_student(body.student_id, &body.passcode)
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/teachers/login",
    tag = "auth",
    request_body = TeacherLoginSchema,
    responses(
        (status = 200, body = LoginResult),
        (status = 401, description = "Incorrect passcode or handle")
    )
)]
pub(crate) async fn teacher_login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<TeacherLoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .studio
        .auth
        .sign_in_teacher(&body.email, &body.password)
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "auth",
    security(("BearerAuth" = [])),
    responses((status = 200, description = "The session was deleted"))
)]
pub(crate) async fn logout(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<()> {
    context.studio.auth.sign_out(&session.token).await?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    tag = "auth",
    security(("BearerAuth" = [])),
    responses((status = 200, body = SessionRole))
)]
pub(crate) async fn current_session(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<SessionRole>> {
    let role = context.studio.auth.resolve_role(&session).await?;
    Ok(Json(role.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/students/signup",
    tag = "auth",
    request_body = StudentSignupSchema,
    responses(
        (status = 200, body = Student),
        (status = 402, description = "The teacher's studio is full")
    )
)]
pub(crate) async fn student_signup(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<StudentSignupSchema>,
) -> ServerResult<Json<Student>> {
    let student = context.studio.auth.register_student(body.into()).await?;
    Ok(Json(student.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/teachers/signup",
    tag = "auth",
    request_body = TeacherSignupSchema,
    responses(
        (status = 200, body = Teacher),
        (status = 409, description = "The license key was already used")
    )
)]
pub(crate) async fn teacher_signup(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<TeacherSignupSchema>,
) -> ServerResult<Json<Teacher>> {
    let teacher = context.studio.auth.redeem_license(body.into()).await?;

    info!("Teacher {} signed up", teacher.username);
    Ok(Json(teacher.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/auth/password",
    tag = "auth",
    request_body = PasswordSchema,
    security(("BearerAuth" = [])),
    responses((status = 200, description = "The password or passcode was changed"))
)]
pub(crate) async fn change_password(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<PasswordSchema>,
) -> ServerResult<()> {
    context
        .studio
        .auth
        .change_password(&session, body.password)
        .await?;

    Ok(())
}

#[utoipa::path(
    put,
    path = "/v1/auth/email",
    tag = "auth",
    request_body = EmailSchema,
    security(("BearerAuth" = [])),
    responses((status = 200, description = "The email was changed"))
)]
pub(crate) async fn change_email(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<EmailSchema>,
) -> ServerResult<()> {
    context.studio.auth.change_email(&session, body.email).await?;

    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/students/login", post(student_login))
        .route("/teachers/login", post(teacher_login))
        .route("/students/signup", post(student_signup))
        .route("/teachers/signup", post(teacher_signup))
        .route("/logout", post(logout))
        .route("/session", get(current_session))
        .route("/password", put(change_password))
        .route("/email", put(change_email))
}
