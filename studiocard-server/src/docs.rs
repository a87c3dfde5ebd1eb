use std::borrow::BorrowMut;

use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{auth, lessons, public, schemas, serialized, students, teacher, tracks};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::student_login,
        auth::teacher_login,
        auth::logout,
        auth::current_session,
        auth::student_signup,
        auth::teacher_signup,
        auth::change_password,
        auth::change_email,
        students::profile,
        students::unlock,
        students::update_profile,
        students::upload_image,
        students::tracks,
        students::upload_track,
        students::progress,
        tracks::set_visibility,
        tracks::delete_track,
        lessons::lesson,
        lessons::complete,
        teacher::roster,
        teacher::update_student,
        teacher::lessons,
        teacher::create_lesson,
        teacher::add_lesson_audio,
        teacher::schedule,
        teacher::create_slot,
        teacher::delete_slot,
        teacher::recitals,
        teacher::create_recital,
        teacher::add_performer,
        teacher::remove_performer,
        teacher::reorder,
        teacher::update_card,
        teacher::update_settings,
        public::card,
        public::contact,
        public::checkout,
    ),
    components(schemas(
        schemas::StudentLoginSchema,
        schemas::TeacherLoginSchema,
        schemas::StudentSignupSchema,
        schemas::TeacherSignupSchema,
        schemas::PasswordSchema,
        schemas::EmailSchema,
        schemas::UnlockSchema,
        schemas::ProfileUpdateSchema,
        schemas::StudentNotesSchema,
        schemas::VisibilitySchema,
        schemas::NewLessonSchema,
        schemas::NewSlotSchema,
        schemas::NewRecitalSchema,
        schemas::PerformerSchema,
        schemas::ReorderSchema,
        schemas::CardSchema,
        schemas::SettingsSchema,
        schemas::ContactSchema,
        schemas::TierSchema,
        schemas::CheckoutSchema,
        serialized::Student,
        serialized::RosterStudent,
        serialized::Profile,
        serialized::Teacher,
        serialized::LoginResult,
        serialized::SessionRole,
        serialized::Track,
        serialized::Lesson,
        serialized::LessonAudio,
        serialized::LessonWithAudio,
        serialized::Progress,
        serialized::ScheduleSlot,
        serialized::Recital,
        serialized::Performer,
        serialized::TeacherCard,
        serialized::Inquiry,
        serialized::CheckoutResult,
    )),
    modifiers(&Security),
    info(
        description = "studiocard-server exposes endpoints for students, teachers, and visitors of a studio"
    )
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.borrow_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("Bearer <token>")
                .build();

            components.add_security_scheme("BearerAuth", SecurityScheme::Http(scheme))
        }
    }
}

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
