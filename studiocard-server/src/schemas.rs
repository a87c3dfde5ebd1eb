use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use studiocard_collab::{
    CardUpdate, NewInquiry, NewStudentSignup, NewTeacherSignup, PerformerRequest, ProfileUpdate,
    SlotRequest, SubscriptionTier, TeacherUpdate,
};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudentLoginSchema {
    pub student_id: Uuid,
    #[validate(length(max = 8))]
    pub passcode: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TeacherLoginSchema {
    #[validate(length(max = 256))]
    pub email: String,
    #[validate(length(max = 128))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudentSignupSchema {
    #[validate(length(min = 1, max = 64))]
    pub display_name: String,
    #[validate(length(min = 4, max = 8))]
    pub passcode: String,
    #[validate(length(min = 4, max = 8))]
    pub access_code: String,
    #[serde(default)]
    pub is_private: bool,
    pub teacher_id: Option<Uuid>,
    #[validate(length(equal = 7))]
    pub color: String,
}

impl From<StudentSignupSchema> for NewStudentSignup {
    fn from(value: StudentSignupSchema) -> Self {
        Self {
            display_name: value.display_name,
            passcode: value.passcode,
            access_code: value.access_code,
            is_private: value.is_private,
            teacher_id: value.teacher_id,
            color: value.color,
        }
    }
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TeacherSignupSchema {
    #[validate(length(min = 1, max = 64))]
    pub license_key: String,
    #[validate(email, length(max = 256))]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(min = 1, max = 64))]
    pub display_name: String,
}

impl From<TeacherSignupSchema> for NewTeacherSignup {
    fn from(value: TeacherSignupSchema) -> Self {
        Self {
            license_key: value.license_key,
            email: value.email,
            password: value.password,
            username: value.username,
            display_name: value.display_name,
        }
    }
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PasswordSchema {
    #[validate(length(min = 4, max = 128))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmailSchema {
    #[validate(email, length(max = 256))]
    pub email: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UnlockSchema {
    #[validate(length(max = 8))]
    pub code: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AccessQuery {
    /// The access code of a private page
    pub code: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TitleQuery {
    pub title: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileUpdateSchema {
    #[validate(length(min = 1, max = 64))]
    pub display_name: Option<String>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
    pub color: Option<String>,
    pub access_code: Option<String>,
    pub is_private: Option<bool>,
}

impl From<ProfileUpdateSchema> for ProfileUpdate {
    fn from(value: ProfileUpdateSchema) -> Self {
        Self {
            display_name: value.display_name,
            bio: value.bio,
            color: value.color,
            access_code: value.access_code,
            is_private: value.is_private,
        }
    }
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudentNotesSchema {
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
    pub is_private: Option<bool>,
    pub tracks_public_by_default: Option<bool>,
}

impl From<StudentNotesSchema> for TeacherUpdate {
    fn from(value: StudentNotesSchema) -> Self {
        Self {
            notes: value.notes,
            is_private: value.is_private,
            tracks_public_by_default: value.tracks_public_by_default,
        }
    }
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VisibilitySchema {
    pub is_public: bool,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewLessonSchema {
    #[validate(length(min = 1, max = 128))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewSlotSchema {
    pub student_id: Uuid,
    #[validate(range(max = 6))]
    pub weekday: u8,
    #[validate(range(max = 1439))]
    pub start_minute: u16,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: u16,
}

impl From<NewSlotSchema> for SlotRequest {
    fn from(value: NewSlotSchema) -> Self {
        Self {
            student_id: value.student_id,
            weekday: value.weekday,
            start_minute: value.start_minute,
            duration_minutes: value.duration_minutes,
        }
    }
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRecitalSchema {
    #[validate(length(min = 1, max = 128))]
    pub title: String,
    #[validate(length(max = 256))]
    pub venue: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, ToSchema, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PerformerSchema {
    #[serde(rename_all = "camelCase")]
    Student {
        student_id: Uuid,
        piece: String,
        composer: String,
    },
    Manual {
        name: String,
        piece: String,
        composer: String,
    },
    Intermission,
}

impl From<PerformerSchema> for PerformerRequest {
    fn from(value: PerformerSchema) -> Self {
        match value {
            PerformerSchema::Student {
                student_id,
                piece,
                composer,
            } => Self::Student {
                student_id,
                piece,
                composer,
            },
            PerformerSchema::Manual {
                name,
                piece,
                composer,
            } => Self::Manual {
                name,
                piece,
                composer,
            },
            PerformerSchema::Intermission => Self::Intermission,
        }
    }
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReorderSchema {
    /// Every performer of the recital, in the new order
    #[validate(length(max = 500))]
    pub order: Vec<Uuid>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CardSchema {
    #[validate(length(max = 128))]
    pub headline: String,
    #[validate(length(max = 5000))]
    pub bio: String,
    pub instruments: Vec<String>,
    #[validate(url)]
    pub image_url: Option<String>,
}

impl From<CardSchema> for CardUpdate {
    fn from(value: CardSchema) -> Self {
        Self {
            headline: value.headline,
            bio: value.bio,
            instruments: value.instruments,
            image_url: value.image_url,
        }
    }
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsSchema {
    #[validate(length(min = 1, max = 64))]
    pub display_name: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

impl From<ContactSchema> for NewInquiry {
    fn from(value: ContactSchema) -> Self {
        Self {
            name: value.name,
            email: value.email,
            message: value.message,
        }
    }
}

#[derive(Debug, Clone, Copy, ToSchema, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierSchema {
    Free,
    Studio,
    Academy,
}

impl From<TierSchema> for SubscriptionTier {
    fn from(value: TierSchema) -> Self {
        match value {
            TierSchema::Free => Self::Free,
            TierSchema::Studio => Self::Studio,
            TierSchema::Academy => Self::Academy,
        }
    }
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckoutSchema {
    pub tier: TierSchema,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| (StatusCode::BAD_REQUEST, "Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}
