//! All schemas that are exposed from endpoints are defined here
//! along with the ToSerialized impls

use chrono::{DateTime, Utc};
use serde::Serialize;
use studiocard_collab::{
    InquiryData, LessonAudioData, LessonData, LessonDetails, PerformerData, PerformerKind,
    ProgressData, RecitalData, Role, ScheduleSlotData, SessionData, StudentData, StudentProfile,
    TeacherCard as CollabTeacherCard, TeacherData, TrackData,
};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    id: Uuid,
    display_name: String,
    color: String,
    bio: Option<String>,
    image_url: Option<String>,
    is_private: bool,
    teacher_id: Option<Uuid>,
    tracks_public_by_default: bool,
    created_at: DateTime<Utc>,
}

/// A student as their teacher sees them
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RosterStudent {
    student: Student,
    access_code: String,
    notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", tag = "access")]
pub enum Profile {
    /// The page is private and no code was given
    #[serde(rename_all = "camelCase")]
    Locked {
        id: Uuid,
        display_name: String,
        color: String,
        image_url: Option<String>,
    },
    Full {
        student: Student,
    },
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    id: Uuid,
    username: String,
    display_name: String,
    tier: String,
    status: String,
    max_students: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    token: String,
    principal_id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", tag = "role")]
pub enum SessionRole {
    Teacher { teacher: Teacher },
    Student { student: Student },
    /// Signed in, but neither a teacher nor a student
    None,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    id: Uuid,
    student_id: Uuid,
    title: String,
    url: String,
    is_public: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    id: Uuid,
    teacher_id: Uuid,
    title: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonAudio {
    id: Uuid,
    title: String,
    url: String,
    sort_order: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonWithAudio {
    lesson: Lesson,
    audios: Vec<LessonAudio>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    id: Uuid,
    lesson_id: Uuid,
    completed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    id: Uuid,
    student_id: Uuid,
    weekday: u8,
    start_minute: u16,
    duration_minutes: u16,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recital {
    id: Uuid,
    title: String,
    venue: Option<String>,
    date: Option<DateTime<Utc>>,
    performers: Vec<Performer>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Performer {
    id: Uuid,
    sort_order: i32,
    kind: String,
    student_id: Option<Uuid>,
    name: Option<String>,
    image_url: Option<String>,
    piece: Option<String>,
    composer: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherCard {
    username: String,
    display_name: String,
    headline: Option<String>,
    bio: Option<String>,
    instruments: Vec<String>,
    image_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResult {
    pub url: String,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<Student> for StudentData {
    fn to_serialized(&self) -> Student {
        Student {
            id: self.id,
            display_name: self.display_name.clone(),
            color: self.color.clone(),
            bio: self.bio.clone(),
            image_url: self.image_url.clone(),
            is_private: self.is_private,
            teacher_id: self.teacher_id,
            tracks_public_by_default: self.tracks_public_by_default,
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<RosterStudent> for StudentData {
    fn to_serialized(&self) -> RosterStudent {
        RosterStudent {
            student: self.to_serialized(),
            access_code: self.access_code.clone(),
            notes: self.notes.clone(),
        }
    }
}

impl ToSerialized<Profile> for StudentProfile {
    fn to_serialized(&self) -> Profile {
        match self {
            StudentProfile::Locked(locked) => Profile::Locked {
                id: locked.id,
                display_name: locked.display_name.clone(),
                color: locked.color.clone(),
                image_url: locked.image_url.clone(),
            },
            StudentProfile::Full(student) => Profile::Full {
                student: student.to_serialized(),
            },
        }
    }
}

impl ToSerialized<Teacher> for TeacherData {
    fn to_serialized(&self) -> Teacher {
        Teacher {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            tier: self.tier.as_str().to_string(),
            status: self.status.as_str().to_string(),
            max_students: self.max_students,
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            principal_id: self.principal_id(),
            expires_at: self.expires_at,
        }
    }
}

impl ToSerialized<SessionRole> for Role {
    fn to_serialized(&self) -> SessionRole {
        match self {
            Role::Teacher(teacher) => SessionRole::Teacher {
                teacher: teacher.to_serialized(),
            },
            Role::Student(student) => SessionRole::Student {
                student: student.to_serialized(),
            },
            Role::None => SessionRole::None,
        }
    }
}

impl ToSerialized<Track> for TrackData {
    fn to_serialized(&self) -> Track {
        Track {
            id: self.id,
            student_id: self.student_id,
            title: self.title.clone(),
            url: self.url.clone(),
            is_public: self.is_public,
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<Lesson> for LessonData {
    fn to_serialized(&self) -> Lesson {
        Lesson {
            id: self.id,
            teacher_id: self.teacher_id,
            title: self.title.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<LessonAudio> for LessonAudioData {
    fn to_serialized(&self) -> LessonAudio {
        LessonAudio {
            id: self.id,
            title: self.title.clone(),
            url: self.url.clone(),
            sort_order: self.sort_order,
        }
    }
}

impl ToSerialized<LessonWithAudio> for LessonDetails {
    fn to_serialized(&self) -> LessonWithAudio {
        LessonWithAudio {
            lesson: self.lesson.to_serialized(),
            audios: self.audios.to_serialized(),
        }
    }
}

impl ToSerialized<Progress> for ProgressData {
    fn to_serialized(&self) -> Progress {
        Progress {
            id: self.id,
            lesson_id: self.lesson_id,
            completed_at: self.created_at,
        }
    }
}

impl ToSerialized<ScheduleSlot> for ScheduleSlotData {
    fn to_serialized(&self) -> ScheduleSlot {
        ScheduleSlot {
            id: self.id,
            student_id: self.student_id,
            weekday: self.weekday,
            start_minute: self.start_minute,
            duration_minutes: self.duration_minutes,
        }
    }
}

impl ToSerialized<Recital> for RecitalData {
    fn to_serialized(&self) -> Recital {
        Recital {
            id: self.id,
            title: self.title.clone(),
            venue: self.venue.clone(),
            date: self.date,
            performers: self.performers.to_serialized(),
        }
    }
}

impl ToSerialized<Performer> for PerformerData {
    fn to_serialized(&self) -> Performer {
        let mut performer = Performer {
            id: self.id,
            sort_order: self.sort_order,
            kind: self.kind.as_str().to_string(),
            student_id: None,
            name: None,
            image_url: None,
            piece: None,
            composer: None,
        };

        match &self.kind {
            PerformerKind::Student {
                student_id,
                name,
                image_url,
                piece,
                composer,
            } => {
                performer.student_id = Some(*student_id);
                performer.name = Some(name.clone());
                performer.image_url = image_url.clone();
                performer.piece = Some(piece.clone());
                performer.composer = Some(composer.clone());
            }
            PerformerKind::Manual {
                name,
                piece,
                composer,
            } => {
                performer.name = Some(name.clone());
                performer.piece = Some(piece.clone());
                performer.composer = Some(composer.clone());
            }
            PerformerKind::Intermission => {}
        }

        performer
    }
}

impl ToSerialized<TeacherCard> for CollabTeacherCard {
    fn to_serialized(&self) -> TeacherCard {
        TeacherCard {
            username: self.teacher.username.clone(),
            display_name: self.teacher.display_name.clone(),
            headline: self.card.as_ref().map(|c| c.headline.clone()),
            bio: self.card.as_ref().map(|c| c.bio.clone()),
            instruments: self
                .card
                .as_ref()
                .map(|c| c.instruments.clone())
                .unwrap_or_default(),
            image_url: self.card.as_ref().and_then(|c| c.image_url.clone()),
        }
    }
}

impl ToSerialized<Inquiry> for InquiryData {
    fn to_serialized(&self) -> Inquiry {
        Inquiry {
            id: self.id,
            created_at: self.created_at,
        }
    }
}
