use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use sqlx::{
    migrate::Migrator, postgres::PgPoolOptions, query, query_as, query_scalar, Error as SqlxError,
    FromRow, PgPool,
};

use crate::{
    AccountData, Database, DatabaseError, DatabaseResult, InquiryData, IntoDatabaseError,
    LessonAudioData, LessonData, NewAccountRow, NewInquiry, NewLesson, NewLessonAudio,
    NewPerformer, NewProgress, NewRecital, NewScheduleSlot, NewSession, NewStudent,
    NewSubscriptionCode, NewTeacher, NewTrack, PerformerData, PerformerKind, PrimaryKey,
    ProgressData, RecitalData, Result, ScheduleSlotData, SessionData, StudentData,
    SubscriptionCodeData, TeacherCardData, TeacherData, TrackData, UpdatedAccount,
    UpdatedStudent, UpdatedTeacher,
};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// A postgres database implementation for studiocard
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| e.any())?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }

    async fn performers(&self, recital_id: PrimaryKey) -> Result<Vec<PerformerData>> {
        query_as::<_, PerformerRow>(
            "SELECT * FROM recital_performers WHERE recital_id = $1 ORDER BY sort_order",
        )
        .bind(recital_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?
        .into_iter()
        .map(TryInto::try_into)
        .collect()
    }

    async fn recital_from_row(&self, row: RecitalRow) -> Result<RecitalData> {
        let performers = self.performers(row.id).await?;

        Ok(RecitalData {
            id: row.id,
            teacher_id: row.teacher_id,
            title: row.title,
            venue: row.venue,
            date: row.date,
            performers,
        })
    }
}

// Rows as they come out of postgres. Conversions into the record types
// reject anything that doesn't form a valid record.

#[derive(FromRow)]
struct AccountRow {
    id: PrimaryKey,
    email: String,
    password: String,
}

#[derive(FromRow)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    expires_at: DateTime<Utc>,
    account_id: PrimaryKey,
    email: String,
    password: String,
}

#[derive(FromRow)]
struct TeacherRow {
    id: PrimaryKey,
    username: String,
    display_name: String,
    tier: String,
    status: String,
    max_students: i32,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct CardRow {
    teacher_id: PrimaryKey,
    headline: String,
    bio: String,
    instruments: Vec<String>,
    image_url: Option<String>,
}

#[derive(FromRow)]
struct CodeRow {
    code: String,
    tier: String,
    max_students: i32,
    used: bool,
    used_by: Option<PrimaryKey>,
    used_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct StudentRow {
    id: PrimaryKey,
    display_name: String,
    access_code: String,
    is_private: bool,
    teacher_id: Option<PrimaryKey>,
    color: String,
    bio: Option<String>,
    image_url: Option<String>,
    notes: Option<String>,
    tracks_public_by_default: bool,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct TrackRow {
    id: PrimaryKey,
    artist_id: PrimaryKey,
    title: String,
    url: String,
    path: String,
    is_public: bool,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ProgressRow {
    id: PrimaryKey,
    artist_id: PrimaryKey,
    lesson_id: PrimaryKey,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ScheduleRow {
    id: PrimaryKey,
    teacher_id: PrimaryKey,
    artist_id: PrimaryKey,
    weekday: i16,
    start_minute: i32,
    duration_minutes: i32,
}

#[derive(FromRow)]
struct RecitalRow {
    id: PrimaryKey,
    teacher_id: PrimaryKey,
    title: String,
    venue: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct PerformerRow {
    id: PrimaryKey,
    recital_id: PrimaryKey,
    sort_order: i32,
    kind: String,
    artist_id: Option<PrimaryKey>,
    name: Option<String>,
    image_url: Option<String>,
    piece: Option<String>,
    composer: Option<String>,
}

fn malformed(resource: &'static str, reason: impl ToString) -> DatabaseError {
    DatabaseError::Malformed {
        resource,
        reason: reason.to_string(),
    }
}

fn unsigned<T: TryFrom<i64>>(resource: &'static str, value: i64) -> Result<T> {
    T::try_from(value).map_err(|_| malformed(resource, format!("{value} is out of range")))
}

impl From<AccountRow> for AccountData {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password: row.password,
        }
    }
}

impl From<SessionRow> for SessionData {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            token: row.token,
            expires_at: row.expires_at,
            account: AccountData {
                id: row.account_id,
                email: row.email,
                password: row.password,
            },
        }
    }
}

impl TryFrom<TeacherRow> for TeacherData {
    type Error = DatabaseError;

    fn try_from(row: TeacherRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
            tier: row.tier.parse().map_err(|e| malformed("teacher", e))?,
            status: row.status.parse().map_err(|e| malformed("teacher", e))?,
            max_students: unsigned("teacher", row.max_students.into())?,
            created_at: row.created_at,
        })
    }
}

impl From<CardRow> for TeacherCardData {
    fn from(row: CardRow) -> Self {
        Self {
            teacher_id: row.teacher_id,
            headline: row.headline,
            bio: row.bio,
            instruments: row.instruments,
            image_url: row.image_url,
        }
    }
}

impl TryFrom<CodeRow> for SubscriptionCodeData {
    type Error = DatabaseError;

    fn try_from(row: CodeRow) -> Result<Self> {
        Ok(Self {
            code: row.code,
            tier: row
                .tier
                .parse()
                .map_err(|e| malformed("subscription code", e))?,
            max_students: unsigned("subscription code", row.max_students.into())?,
            used: row.used,
            used_by: row.used_by,
            used_at: row.used_at,
        })
    }
}

impl From<StudentRow> for StudentData {
    fn from(row: StudentRow) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name,
            access_code: row.access_code,
            is_private: row.is_private,
            teacher_id: row.teacher_id,
            color: row.color,
            bio: row.bio,
            image_url: row.image_url,
            notes: row.notes,
            tracks_public_by_default: row.tracks_public_by_default,
            created_at: row.created_at,
        }
    }
}

impl From<TrackRow> for TrackData {
    fn from(row: TrackRow) -> Self {
        Self {
            id: row.id,
            student_id: row.artist_id,
            title: row.title,
            url: row.url,
            path: row.path,
            is_public: row.is_public,
            created_at: row.created_at,
        }
    }
}

impl From<ProgressRow> for ProgressData {
    fn from(row: ProgressRow) -> Self {
        Self {
            id: row.id,
            student_id: row.artist_id,
            lesson_id: row.lesson_id,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<ScheduleRow> for ScheduleSlotData {
    type Error = DatabaseError;

    fn try_from(row: ScheduleRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            teacher_id: row.teacher_id,
            student_id: row.artist_id,
            weekday: unsigned("schedule slot", row.weekday.into())?,
            start_minute: unsigned("schedule slot", row.start_minute.into())?,
            duration_minutes: unsigned("schedule slot", row.duration_minutes.into())?,
        })
    }
}

impl TryFrom<PerformerRow> for PerformerData {
    type Error = DatabaseError;

    fn try_from(row: PerformerRow) -> Result<Self> {
        let kind = match (row.kind.as_str(), row.artist_id) {
            ("intermission", _) => PerformerKind::Intermission,
            ("student", Some(student_id)) => PerformerKind::Student {
                student_id,
                name: row.name.unwrap_or_default(),
                image_url: row.image_url,
                piece: row.piece.unwrap_or_default(),
                composer: row.composer.unwrap_or_default(),
            },
            // A student performer whose profile is gone keeps its copied name
            ("student", None) | ("manual", _) => PerformerKind::Manual {
                name: row
                    .name
                    .ok_or_else(|| malformed("recital performer", "missing name"))?,
                piece: row.piece.unwrap_or_default(),
                composer: row.composer.unwrap_or_default(),
            },
            (other, _) => {
                return Err(malformed(
                    "recital performer",
                    format!("unknown kind {other}"),
                ))
            }
        };

        Ok(Self {
            id: row.id,
            recital_id: row.recital_id,
            sort_order: row.sort_order,
            kind,
        })
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn account_by_id(&self, account_id: PrimaryKey) -> Result<AccountData> {
        query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("account", "id"))
    }

    async fn account_by_email(&self, email: &str) -> Result<AccountData> {
        query_as::<_, AccountRow>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("account", "email"))
    }

    async fn create_account(&self, new_account: NewAccountRow) -> Result<AccountData> {
        self.account_by_email(&new_account.email)
            .await
            .conflict_or_ok("account", "email", &new_account.email)?;

        self.account_by_id(new_account.id).await.conflict_or_ok(
            "account",
            "id",
            &new_account.id.to_string(),
        )?;

        query_as::<_, AccountRow>(
            "INSERT INTO accounts (id, email, password) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(new_account.id)
        .bind(&new_account.email)
        .bind(&new_account.password)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn update_account(&self, updated_account: UpdatedAccount) -> Result<AccountData> {
        let account = self.account_by_id(updated_account.id).await?;

        if let Some(email) = &updated_account.email {
            match self.account_by_email(email).await {
                Ok(other) if other.id != account.id => {
                    return Err(DatabaseError::Conflict {
                        resource: "account",
                        field: "email",
                        value: email.clone(),
                    })
                }
                Err(e) if !e.is_not_found() => return Err(e),
                _ => {}
            }
        }

        query("UPDATE accounts SET email = $1, password = $2 WHERE id = $3")
            .bind(updated_account.email.unwrap_or(account.email))
            .bind(updated_account.password.unwrap_or(account.password))
            .bind(updated_account.id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.account_by_id(updated_account.id).await
    }

    async fn delete_account(&self, account_id: PrimaryKey) -> Result<()> {
        // Ensure account exists
        let _ = self.account_by_id(account_id).await?;

        query("DELETE FROM accounts WHERE id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        query_as::<_, SessionRow>(
            "SELECT
                sessions.*,
                accounts.email,
                accounts.password
            FROM sessions
                INNER JOIN accounts ON sessions.account_id = accounts.id
            WHERE token = $1",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("session", "token"))
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        query("INSERT INTO sessions (token, account_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&new_session.token)
            .bind(new_session.account_id)
            .bind(new_session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.session_by_token(&new_session.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        query("DELETE FROM sessions WHERE now() > expires_at")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn teacher_by_id(&self, teacher_id: PrimaryKey) -> Result<TeacherData> {
        query_as::<_, TeacherRow>("SELECT * FROM teachers WHERE id = $1")
            .bind(teacher_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("teacher", "id"))?
            .try_into()
    }

    async fn teacher_by_username(&self, username: &str) -> Result<TeacherData> {
        query_as::<_, TeacherRow>("SELECT * FROM teachers WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("teacher", "username"))?
            .try_into()
    }

    async fn create_teacher(&self, new_teacher: NewTeacher) -> Result<TeacherData> {
        self.teacher_by_username(&new_teacher.username)
            .await
            .conflict_or_ok("teacher", "username", &new_teacher.username)?;

        query_as::<_, TeacherRow>(
            "INSERT INTO teachers (id, username, display_name, tier, max_students)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *",
        )
        .bind(new_teacher.id)
        .bind(&new_teacher.username)
        .bind(&new_teacher.display_name)
        .bind(new_teacher.tier.as_str())
        .bind(new_teacher.max_students as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn update_teacher(&self, updated_teacher: UpdatedTeacher) -> Result<TeacherData> {
        let teacher = self.teacher_by_id(updated_teacher.id).await?;

        query(
            "UPDATE teachers SET
                display_name = $1,
                tier = $2,
                status = $3,
                max_students = $4
            WHERE id = $5",
        )
        .bind(
            updated_teacher
                .display_name
                .unwrap_or(teacher.display_name),
        )
        .bind(updated_teacher.tier.unwrap_or(teacher.tier).as_str())
        .bind(updated_teacher.status.unwrap_or(teacher.status).as_str())
        .bind(updated_teacher.max_students.unwrap_or(teacher.max_students) as i32)
        .bind(updated_teacher.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.teacher_by_id(updated_teacher.id).await
    }

    async fn delete_teacher(&self, teacher_id: PrimaryKey) -> Result<()> {
        // Ensure teacher exists
        let _ = self.teacher_by_id(teacher_id).await?;

        query("DELETE FROM teachers WHERE id = $1")
            .bind(teacher_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn card_by_teacher(&self, teacher_id: PrimaryKey) -> Result<TeacherCardData> {
        query_as::<_, CardRow>("SELECT * FROM teacher_cards WHERE teacher_id = $1")
            .bind(teacher_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("teacher card", "teacher_id"))
    }

    async fn upsert_card(&self, card: TeacherCardData) -> Result<TeacherCardData> {
        // Ensure teacher exists
        let _ = self.teacher_by_id(card.teacher_id).await?;

        query_as::<_, CardRow>(
            "INSERT INTO teacher_cards (teacher_id, headline, bio, instruments, image_url)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (teacher_id) DO UPDATE SET
                headline = EXCLUDED.headline,
                bio = EXCLUDED.bio,
                instruments = EXCLUDED.instruments,
                image_url = EXCLUDED.image_url
            RETURNING *",
        )
        .bind(card.teacher_id)
        .bind(&card.headline)
        .bind(&card.bio)
        .bind(&card.instruments)
        .bind(&card.image_url)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn subscription_code(&self, code: &str) -> Result<SubscriptionCodeData> {
        query_as::<_, CodeRow>("SELECT * FROM subscription_codes WHERE code = $1")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("subscription code", "code"))?
            .try_into()
    }

    async fn create_subscription_code(
        &self,
        new_code: NewSubscriptionCode,
    ) -> Result<SubscriptionCodeData> {
        self.subscription_code(&new_code.code).await.conflict_or_ok(
            "subscription code",
            "code",
            &new_code.code,
        )?;

        query_as::<_, CodeRow>(
            "INSERT INTO subscription_codes (code, tier, max_students)
            VALUES ($1, $2, $3)
            RETURNING *",
        )
        .bind(&new_code.code)
        .bind(new_code.tier.as_str())
        .bind(new_code.max_students as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn claim_subscription_code(
        &self,
        code: &str,
        teacher_id: PrimaryKey,
    ) -> Result<SubscriptionCodeData> {
        let claimed = query_as::<_, CodeRow>(
            "UPDATE subscription_codes SET
                used = true,
                used_by = $2,
                used_at = now()
            WHERE code = $1 AND used = false
            RETURNING *",
        )
        .bind(code)
        .bind(teacher_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())?;

        match claimed {
            Some(row) => row.try_into(),
            None => {
                // Either it doesn't exist, or somebody else claimed it
                self.subscription_code(code).await?;

                Err(DatabaseError::Conflict {
                    resource: "subscription code",
                    field: "code",
                    value: code.to_string(),
                })
            }
        }
    }

    async fn student_by_id(&self, student_id: PrimaryKey) -> Result<StudentData> {
        query_as::<_, StudentRow>("SELECT * FROM artists WHERE id = $1")
            .bind(student_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("student", "id"))
    }

    async fn students_by_teacher(&self, teacher_id: PrimaryKey) -> Result<Vec<StudentData>> {
        query_as::<_, StudentRow>(
            "SELECT * FROM artists WHERE teacher_id = $1 ORDER BY created_at",
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
        .map_err(|e| e.any())
    }

    async fn count_students(&self, teacher_id: PrimaryKey) -> Result<u32> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM artists WHERE teacher_id = $1")
            .bind(teacher_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())?;

        unsigned("student", count)
    }

    async fn create_student(&self, new_student: NewStudent) -> Result<StudentData> {
        self.student_by_id(new_student.id).await.conflict_or_ok(
            "student",
            "id",
            &new_student.id.to_string(),
        )?;

        if let Some(teacher_id) = new_student.teacher_id {
            let _ = self.teacher_by_id(teacher_id).await?;
        }

        query_as::<_, StudentRow>(
            "INSERT INTO artists (id, display_name, access_code, is_private, teacher_id, color)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *",
        )
        .bind(new_student.id)
        .bind(&new_student.display_name)
        .bind(&new_student.access_code)
        .bind(new_student.is_private)
        .bind(new_student.teacher_id)
        .bind(&new_student.color)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn update_student(&self, updated_student: UpdatedStudent) -> Result<StudentData> {
        let student = self.student_by_id(updated_student.id).await?;

        query(
            "UPDATE artists SET
                display_name = $1,
                access_code = $2,
                is_private = $3,
                color = $4,
                bio = $5,
                image_url = $6,
                notes = $7,
                tracks_public_by_default = $8
            WHERE id = $9",
        )
        .bind(updated_student.display_name.unwrap_or(student.display_name))
        .bind(updated_student.access_code.unwrap_or(student.access_code))
        .bind(updated_student.is_private.unwrap_or(student.is_private))
        .bind(updated_student.color.unwrap_or(student.color))
        .bind(updated_student.bio.or(student.bio))
        .bind(updated_student.image_url.or(student.image_url))
        .bind(updated_student.notes.or(student.notes))
        .bind(
            updated_student
                .tracks_public_by_default
                .unwrap_or(student.tracks_public_by_default),
        )
        .bind(updated_student.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.student_by_id(updated_student.id).await
    }

    async fn track_by_id(&self, track_id: PrimaryKey) -> Result<TrackData> {
        query_as::<_, TrackRow>("SELECT * FROM tracks WHERE id = $1")
            .bind(track_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("track", "id"))
    }

    async fn tracks_by_student(&self, student_id: PrimaryKey) -> Result<Vec<TrackData>> {
        query_as::<_, TrackRow>(
            "SELECT * FROM tracks WHERE artist_id = $1 ORDER BY created_at DESC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
        .map_err(|e| e.any())
    }

    async fn create_track(&self, new_track: NewTrack) -> Result<TrackData> {
        // Ensure student exists
        let _ = self.student_by_id(new_track.student_id).await?;

        query_as::<_, TrackRow>(
            "INSERT INTO tracks (artist_id, title, url, path, is_public)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *",
        )
        .bind(new_track.student_id)
        .bind(&new_track.title)
        .bind(&new_track.url)
        .bind(&new_track.path)
        .bind(new_track.is_public)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn update_track_visibility(
        &self,
        track_id: PrimaryKey,
        is_public: bool,
    ) -> Result<TrackData> {
        query_as::<_, TrackRow>("UPDATE tracks SET is_public = $1 WHERE id = $2 RETURNING *")
            .bind(is_public)
            .bind(track_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("track", "id"))
    }

    async fn delete_track(&self, track_id: PrimaryKey) -> Result<()> {
        // Ensure track exists
        let _ = self.track_by_id(track_id).await?;

        query("DELETE FROM tracks WHERE id = $1")
            .bind(track_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn lesson_by_id(&self, lesson_id: PrimaryKey) -> Result<LessonData> {
        query_as::<_, LessonData>("SELECT * FROM lessons WHERE id = $1")
            .bind(lesson_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("lesson", "id"))
    }

    async fn lessons_by_teacher(&self, teacher_id: PrimaryKey) -> Result<Vec<LessonData>> {
        query_as::<_, LessonData>(
            "SELECT * FROM lessons WHERE teacher_id = $1 ORDER BY created_at",
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn create_lesson(&self, new_lesson: NewLesson) -> Result<LessonData> {
        // Ensure teacher exists
        let _ = self.teacher_by_id(new_lesson.teacher_id).await?;

        query_as::<_, LessonData>(
            "INSERT INTO lessons (teacher_id, title, description)
            VALUES ($1, $2, $3)
            RETURNING *",
        )
        .bind(new_lesson.teacher_id)
        .bind(&new_lesson.title)
        .bind(&new_lesson.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn lesson_audios(&self, lesson_id: PrimaryKey) -> Result<Vec<LessonAudioData>> {
        query_as::<_, LessonAudioData>(
            "SELECT * FROM lesson_audios WHERE lesson_id = $1 ORDER BY sort_order",
        )
        .bind(lesson_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn create_lesson_audio(&self, new_audio: NewLessonAudio) -> Result<LessonAudioData> {
        // Ensure lesson exists
        let _ = self.lesson_by_id(new_audio.lesson_id).await?;

        query_as::<_, LessonAudioData>(
            "INSERT INTO lesson_audios (lesson_id, title, url, sort_order)
            VALUES ($1, $2, $3, $4)
            RETURNING *",
        )
        .bind(new_audio.lesson_id)
        .bind(&new_audio.title)
        .bind(&new_audio.url)
        .bind(new_audio.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn create_progress(&self, new_progress: NewProgress) -> Result<ProgressData> {
        query_as::<_, ProgressRow>(
            "INSERT INTO student_progress (artist_id, lesson_id)
            VALUES ($1, $2)
            RETURNING *",
        )
        .bind(new_progress.student_id)
        .bind(new_progress.lesson_id)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn progress_by_student(&self, student_id: PrimaryKey) -> Result<Vec<ProgressData>> {
        query_as::<_, ProgressRow>(
            "SELECT * FROM student_progress WHERE artist_id = $1 ORDER BY created_at",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
        .map_err(|e| e.any())
    }

    async fn schedule_by_teacher(&self, teacher_id: PrimaryKey) -> Result<Vec<ScheduleSlotData>> {
        query_as::<_, ScheduleRow>(
            "SELECT * FROM lesson_schedule
            WHERE teacher_id = $1
            ORDER BY weekday, start_minute",
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?
        .into_iter()
        .map(TryInto::try_into)
        .collect()
    }

    async fn create_schedule_slot(&self, new_slot: NewScheduleSlot) -> Result<ScheduleSlotData> {
        query_as::<_, ScheduleRow>(
            "INSERT INTO lesson_schedule (teacher_id, artist_id, weekday, start_minute, duration_minutes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *",
        )
        .bind(new_slot.teacher_id)
        .bind(new_slot.student_id)
        .bind(i16::from(new_slot.weekday))
        .bind(i32::from(new_slot.start_minute))
        .bind(i32::from(new_slot.duration_minutes))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn delete_schedule_slot(&self, slot_id: PrimaryKey) -> Result<()> {
        let result = query("DELETE FROM lesson_schedule WHERE id = $1")
            .bind(slot_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "schedule slot",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn recital_by_id(&self, recital_id: PrimaryKey) -> Result<RecitalData> {
        let row = query_as::<_, RecitalRow>("SELECT * FROM recitals WHERE id = $1")
            .bind(recital_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("recital", "id"))?;

        self.recital_from_row(row).await
    }

    async fn recitals_by_teacher(&self, teacher_id: PrimaryKey) -> Result<Vec<RecitalData>> {
        let rows = query_as::<_, RecitalRow>(
            "SELECT * FROM recitals WHERE teacher_id = $1 ORDER BY date NULLS LAST",
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        try_join_all(rows.into_iter().map(|row| self.recital_from_row(row))).await
    }

    async fn create_recital(&self, new_recital: NewRecital) -> Result<RecitalData> {
        let row = query_as::<_, RecitalRow>(
            "INSERT INTO recitals (teacher_id, title, venue, date)
            VALUES ($1, $2, $3, $4)
            RETURNING *",
        )
        .bind(new_recital.teacher_id)
        .bind(&new_recital.title)
        .bind(&new_recital.venue)
        .bind(new_recital.date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.recital_from_row(row).await
    }

    async fn create_performer(&self, new_performer: NewPerformer) -> Result<PerformerData> {
        let kind = new_performer.kind.as_str();

        let (student_id, name, image_url, piece, composer) = match new_performer.kind {
            PerformerKind::Student {
                student_id,
                name,
                image_url,
                piece,
                composer,
            } => (Some(student_id), Some(name), image_url, Some(piece), Some(composer)),
            PerformerKind::Manual {
                name,
                piece,
                composer,
            } => (None, Some(name), None, Some(piece), Some(composer)),
            PerformerKind::Intermission => (None, None, None, None, None),
        };

        query_as::<_, PerformerRow>(
            "INSERT INTO recital_performers
                (recital_id, sort_order, kind, artist_id, name, image_url, piece, composer)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *",
        )
        .bind(new_performer.recital_id)
        .bind(new_performer.sort_order)
        .bind(kind)
        .bind(student_id)
        .bind(name)
        .bind(image_url)
        .bind(piece)
        .bind(composer)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn delete_performer(&self, performer_id: PrimaryKey) -> Result<()> {
        let result = query("DELETE FROM recital_performers WHERE id = $1")
            .bind(performer_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "recital performer",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn set_performer_order(
        &self,
        recital_id: PrimaryKey,
        order: Vec<(PrimaryKey, i32)>,
    ) -> Result<()> {
        let mut transaction = self.pool.begin().await.map_err(|e| e.any())?;

        for (performer_id, sort_order) in order {
            let result = query(
                "UPDATE recital_performers SET sort_order = $1 WHERE id = $2 AND recital_id = $3",
            )
            .bind(sort_order)
            .bind(performer_id)
            .bind(recital_id)
            .execute(&mut *transaction)
            .await
            .map_err(|e| e.any())?;

            // Dropping the transaction rolls it back
            if result.rows_affected() == 0 {
                return Err(DatabaseError::NotFound {
                    resource: "recital performer",
                    identifier: "id",
                });
            }
        }

        transaction.commit().await.map_err(|e| e.any())
    }

    async fn create_inquiry(&self, new_inquiry: NewInquiry) -> Result<InquiryData> {
        query_as::<_, InquiryData>(
            "INSERT INTO contact_inquiries (name, email, message)
            VALUES ($1, $2, $3)
            RETURNING *",
        )
        .bind(&new_inquiry.name)
        .bind(&new_inquiry.email)
        .bind(&new_inquiry.message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
