use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The type used for primary keys in the database.
pub type PrimaryKey = Uuid;

/// A login account held by the identity provider
#[derive(Debug, Clone)]
pub struct AccountData {
    pub id: PrimaryKey,
    /// A real email for teachers, a synthesized one for students
    pub email: String,
    /// The hashed password
    pub password: String,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The account that is logged in
    pub account: AccountData,
}

impl SessionData {
    /// The id of the principal this session belongs to
    pub fn principal_id(&self) -> PrimaryKey {
        self.account.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Studio,
    Academy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Canceled,
}

/// A teacher, authenticating with a real email
#[derive(Debug, Clone)]
pub struct TeacherData {
    /// Same as the provider account id
    pub id: PrimaryKey,
    /// Public slug, immutable after creation
    pub username: String,
    pub display_name: String,
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    pub max_students: u32,
    pub created_at: DateTime<Utc>,
}

/// The public card of a teacher's studio
#[derive(Debug, Clone)]
pub struct TeacherCardData {
    pub teacher_id: PrimaryKey,
    pub headline: String,
    pub bio: String,
    pub instruments: Vec<String>,
    pub image_url: Option<String>,
}

/// A one-time license key that unlocks teacher signup
#[derive(Debug, Clone)]
pub struct SubscriptionCodeData {
    pub code: String,
    pub tier: SubscriptionTier,
    pub max_students: u32,
    pub used: bool,
    pub used_by: Option<PrimaryKey>,
    pub used_at: Option<DateTime<Utc>>,
}

/// A student, also called an artist
#[derive(Debug, Clone)]
pub struct StudentData {
    /// Same as the provider account id
    pub id: PrimaryKey,
    pub display_name: String,
    /// Gates read-only viewing of a private profile, independent of the passcode
    pub access_code: String,
    pub is_private: bool,
    pub teacher_id: Option<PrimaryKey>,
    pub color: String,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    /// Notes left by the owning teacher
    pub notes: Option<String>,
    /// Whether newly recorded tracks start out public
    pub tracks_public_by_default: bool,
    pub created_at: DateTime<Utc>,
}

/// A recording owned by a student
#[derive(Debug, Clone)]
pub struct TrackData {
    pub id: PrimaryKey,
    pub student_id: PrimaryKey,
    pub title: String,
    pub url: String,
    /// Object storage path, used for removal
    pub path: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct LessonData {
    pub id: PrimaryKey,
    pub teacher_id: PrimaryKey,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single audio segment of a lesson
#[derive(Debug, Clone, FromRow)]
pub struct LessonAudioData {
    pub id: PrimaryKey,
    pub lesson_id: PrimaryKey,
    pub title: String,
    pub url: String,
    pub sort_order: i32,
}

/// The presence of a row means the lesson was completed
#[derive(Debug, Clone)]
pub struct ProgressData {
    pub id: PrimaryKey,
    pub student_id: PrimaryKey,
    pub lesson_id: PrimaryKey,
    pub created_at: DateTime<Utc>,
}

/// A recurring weekly lesson slot
#[derive(Debug, Clone)]
pub struct ScheduleSlotData {
    pub id: PrimaryKey,
    pub teacher_id: PrimaryKey,
    pub student_id: PrimaryKey,
    /// 0 is Monday
    pub weekday: u8,
    /// Minutes since midnight
    pub start_minute: u16,
    pub duration_minutes: u16,
}

#[derive(Debug, Clone)]
pub struct RecitalData {
    pub id: PrimaryKey,
    pub teacher_id: PrimaryKey,
    pub title: String,
    pub venue: Option<String>,
    pub date: Option<DateTime<Utc>>,
    /// Always sorted by sort order
    pub performers: Vec<PerformerData>,
}

/// An entry in a recital program
#[derive(Debug, Clone)]
pub struct PerformerData {
    pub id: PrimaryKey,
    pub recital_id: PrimaryKey,
    pub sort_order: i32,
    pub kind: PerformerKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerformerKind {
    /// A real student, with name and image copied in when added
    Student {
        student_id: PrimaryKey,
        name: String,
        image_url: Option<String>,
        piece: String,
        composer: String,
    },
    /// A typed in name with no profile behind it
    Manual {
        name: String,
        piece: String,
        composer: String,
    },
    Intermission,
}

impl PerformerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student { .. } => "student",
            Self::Manual { .. } => "manual",
            Self::Intermission => "intermission",
        }
    }
}

/// A message sent through the marketing site contact form
#[derive(Debug, Clone, FromRow)]
pub struct InquiryData {
    pub id: PrimaryKey,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Returned when a stored enum value doesn't match any variant
#[derive(Debug)]
pub struct UnknownVariant(pub String);

impl Display for UnknownVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown variant {}", self.0)
    }
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Studio => "studio",
            Self::Academy => "academy",
        }
    }
}

impl FromStr for SubscriptionTier {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "studio" => Ok(Self::Studio),
            "academy" => Ok(Self::Academy),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "past_due" => Ok(Self::PastDue),
            "canceled" => Ok(Self::Canceled),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}
