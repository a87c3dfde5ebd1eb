use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;
pub type ArcedDatabase = Arc<dyn Database>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    /// A row was read but doesn't form a valid record
    #[error("{resource} row is malformed: {reason}")]
    Malformed {
        resource: &'static str,
        reason: String,
    },
}

impl DatabaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(DatabaseError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Represents a type that can store studio data
#[async_trait]
pub trait Database: Send + Sync {
    async fn account_by_id(&self, account_id: PrimaryKey) -> Result<AccountData>;
    async fn account_by_email(&self, email: &str) -> Result<AccountData>;
    async fn create_account(&self, new_account: NewAccountRow) -> Result<AccountData>;
    async fn update_account(&self, updated_account: UpdatedAccount) -> Result<AccountData>;
    /// Deletes the account along with its sessions
    async fn delete_account(&self, account_id: PrimaryKey) -> Result<()>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn teacher_by_id(&self, teacher_id: PrimaryKey) -> Result<TeacherData>;
    async fn teacher_by_username(&self, username: &str) -> Result<TeacherData>;
    async fn create_teacher(&self, new_teacher: NewTeacher) -> Result<TeacherData>;
    async fn update_teacher(&self, updated_teacher: UpdatedTeacher) -> Result<TeacherData>;
    async fn delete_teacher(&self, teacher_id: PrimaryKey) -> Result<()>;

    async fn card_by_teacher(&self, teacher_id: PrimaryKey) -> Result<TeacherCardData>;
    async fn upsert_card(&self, card: TeacherCardData) -> Result<TeacherCardData>;

    async fn subscription_code(&self, code: &str) -> Result<SubscriptionCodeData>;
    async fn create_subscription_code(
        &self,
        new_code: NewSubscriptionCode,
    ) -> Result<SubscriptionCodeData>;
    /// Marks the code as used by the teacher, only if it's unused.
    /// Returns a conflict if someone else got there first.
    async fn claim_subscription_code(
        &self,
        code: &str,
        teacher_id: PrimaryKey,
    ) -> Result<SubscriptionCodeData>;

    async fn student_by_id(&self, student_id: PrimaryKey) -> Result<StudentData>;
    async fn students_by_teacher(&self, teacher_id: PrimaryKey) -> Result<Vec<StudentData>>;
    async fn count_students(&self, teacher_id: PrimaryKey) -> Result<u32>;
    async fn create_student(&self, new_student: NewStudent) -> Result<StudentData>;
    async fn update_student(&self, updated_student: UpdatedStudent) -> Result<StudentData>;

    async fn track_by_id(&self, track_id: PrimaryKey) -> Result<TrackData>;
    async fn tracks_by_student(&self, student_id: PrimaryKey) -> Result<Vec<TrackData>>;
    async fn create_track(&self, new_track: NewTrack) -> Result<TrackData>;
    async fn update_track_visibility(&self, track_id: PrimaryKey, is_public: bool)
        -> Result<TrackData>;
    async fn delete_track(&self, track_id: PrimaryKey) -> Result<()>;

    async fn lesson_by_id(&self, lesson_id: PrimaryKey) -> Result<LessonData>;
    async fn lessons_by_teacher(&self, teacher_id: PrimaryKey) -> Result<Vec<LessonData>>;
    async fn create_lesson(&self, new_lesson: NewLesson) -> Result<LessonData>;
    async fn lesson_audios(&self, lesson_id: PrimaryKey) -> Result<Vec<LessonAudioData>>;
    async fn create_lesson_audio(&self, new_audio: NewLessonAudio) -> Result<LessonAudioData>;

    /// Always inserts, progress rows are never updated or removed
    async fn create_progress(&self, new_progress: NewProgress) -> Result<ProgressData>;
    async fn progress_by_student(&self, student_id: PrimaryKey) -> Result<Vec<ProgressData>>;

    async fn schedule_by_teacher(&self, teacher_id: PrimaryKey) -> Result<Vec<ScheduleSlotData>>;
    async fn create_schedule_slot(&self, new_slot: NewScheduleSlot) -> Result<ScheduleSlotData>;
    async fn delete_schedule_slot(&self, slot_id: PrimaryKey) -> Result<()>;

    async fn recital_by_id(&self, recital_id: PrimaryKey) -> Result<RecitalData>;
    async fn recitals_by_teacher(&self, teacher_id: PrimaryKey) -> Result<Vec<RecitalData>>;
    async fn create_recital(&self, new_recital: NewRecital) -> Result<RecitalData>;
    async fn create_performer(&self, new_performer: NewPerformer) -> Result<PerformerData>;
    async fn delete_performer(&self, performer_id: PrimaryKey) -> Result<()>;
    /// Rewrites the sort order of every given performer
    async fn set_performer_order(
        &self,
        recital_id: PrimaryKey,
        order: Vec<(PrimaryKey, i32)>,
    ) -> Result<()>;

    async fn create_inquiry(&self, new_inquiry: NewInquiry) -> Result<InquiryData>;
}

#[derive(Debug)]
pub struct NewAccountRow {
    pub id: PrimaryKey,
    pub email: String,
    /// Already hashed
    pub password: String,
}

#[derive(Debug, Default)]
pub struct UpdatedAccount {
    pub id: PrimaryKey,
    pub email: Option<String>,
    /// Already hashed
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub account_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewTeacher {
    pub id: PrimaryKey,
    pub username: String,
    pub display_name: String,
    pub tier: SubscriptionTier,
    pub max_students: u32,
}

#[derive(Debug, Default)]
pub struct UpdatedTeacher {
    pub id: PrimaryKey,
    pub display_name: Option<String>,
    pub tier: Option<SubscriptionTier>,
    pub status: Option<SubscriptionStatus>,
    pub max_students: Option<u32>,
}

#[derive(Debug)]
pub struct NewSubscriptionCode {
    pub code: String,
    pub tier: SubscriptionTier,
    pub max_students: u32,
}

#[derive(Debug)]
pub struct NewStudent {
    pub id: PrimaryKey,
    pub display_name: String,
    pub access_code: String,
    pub is_private: bool,
    pub teacher_id: Option<PrimaryKey>,
    pub color: String,
}

#[derive(Debug, Default)]
pub struct UpdatedStudent {
    pub id: PrimaryKey,
    pub display_name: Option<String>,
    pub access_code: Option<String>,
    pub is_private: Option<bool>,
    pub color: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub notes: Option<String>,
    pub tracks_public_by_default: Option<bool>,
}

#[derive(Debug)]
pub struct NewTrack {
    pub student_id: PrimaryKey,
    pub title: String,
    pub url: String,
    pub path: String,
    pub is_public: bool,
}

#[derive(Debug)]
pub struct NewLesson {
    pub teacher_id: PrimaryKey,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug)]
pub struct NewLessonAudio {
    pub lesson_id: PrimaryKey,
    pub title: String,
    pub url: String,
    pub sort_order: i32,
}

#[derive(Debug)]
pub struct NewProgress {
    pub student_id: PrimaryKey,
    pub lesson_id: PrimaryKey,
}

#[derive(Debug)]
pub struct NewScheduleSlot {
    pub teacher_id: PrimaryKey,
    pub student_id: PrimaryKey,
    pub weekday: u8,
    pub start_minute: u16,
    pub duration_minutes: u16,
}

#[derive(Debug)]
pub struct NewRecital {
    pub teacher_id: PrimaryKey,
    pub title: String,
    pub venue: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct NewPerformer {
    pub recital_id: PrimaryKey,
    pub sort_order: i32,
    pub kind: PerformerKind,
}

#[derive(Debug)]
pub struct NewInquiry {
    pub name: String,
    pub email: String,
    pub message: String,
}
