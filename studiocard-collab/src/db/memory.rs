use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::{
    AccountData, Database, DatabaseError, InquiryData, LessonAudioData, LessonData, NewAccountRow,
    NewInquiry, NewLesson, NewLessonAudio, NewPerformer, NewProgress, NewRecital,
    NewScheduleSlot, NewSession, NewStudent, NewSubscriptionCode, NewTeacher, NewTrack,
    PerformerData, PerformerKind, PrimaryKey, ProgressData, RecitalData, Result,
    ScheduleSlotData, SessionData, StudentData, SubscriptionCodeData, SubscriptionStatus,
    TeacherCardData, TeacherData, TrackData, UpdatedAccount, UpdatedStudent, UpdatedTeacher,
};

/// An in-memory database, used in tests and when no database url is configured.
/// Every operation takes the same lock, so each call is atomic.
/// Deletes cascade the same way the postgres schema does.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    accounts: HashMap<PrimaryKey, AccountData>,
    sessions: Vec<StoredSession>,
    teachers: HashMap<PrimaryKey, TeacherData>,
    cards: HashMap<PrimaryKey, TeacherCardData>,
    codes: HashMap<String, SubscriptionCodeData>,
    students: HashMap<PrimaryKey, StudentData>,
    tracks: Vec<TrackData>,
    lessons: Vec<LessonData>,
    lesson_audios: Vec<LessonAudioData>,
    progress: Vec<ProgressData>,
    schedule: Vec<ScheduleSlotData>,
    recitals: Vec<StoredRecital>,
    performers: Vec<PerformerData>,
    inquiries: Vec<InquiryData>,
}

struct StoredSession {
    id: PrimaryKey,
    token: String,
    account_id: PrimaryKey,
    expires_at: chrono::DateTime<Utc>,
}

struct StoredRecital {
    id: PrimaryKey,
    teacher_id: PrimaryKey,
    title: String,
    venue: Option<String>,
    date: Option<chrono::DateTime<Utc>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(resource: &'static str, identifier: &'static str) -> DatabaseError {
    DatabaseError::NotFound {
        resource,
        identifier,
    }
}

fn conflict(resource: &'static str, field: &'static str, value: impl ToString) -> DatabaseError {
    DatabaseError::Conflict {
        resource,
        field,
        value: value.to_string(),
    }
}

impl Tables {
    fn account(&self, id: PrimaryKey) -> Result<AccountData> {
        self.accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("account", "id"))
    }

    fn session(&self, token: &str) -> Result<SessionData> {
        let stored = self
            .sessions
            .iter()
            .find(|s| s.token == token)
            .ok_or_else(|| not_found("session", "token"))?;

        Ok(SessionData {
            id: stored.id,
            token: stored.token.clone(),
            expires_at: stored.expires_at,
            account: self.account(stored.account_id)?,
        })
    }

    fn teacher(&self, id: PrimaryKey) -> Result<TeacherData> {
        self.teachers
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("teacher", "id"))
    }

    fn student(&self, id: PrimaryKey) -> Result<StudentData> {
        self.students
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("student", "id"))
    }

    /// Removes a student and what hangs off it, like the foreign keys of the schema do
    fn remove_student(&mut self, id: PrimaryKey) {
        if self.students.remove(&id).is_none() {
            return;
        }

        self.tracks.retain(|t| t.student_id != id);
        self.progress.retain(|p| p.student_id != id);
        self.schedule.retain(|s| s.student_id != id);

        // Performers keep the copied name once the profile is gone
        for performer in &mut self.performers {
            if let PerformerKind::Student {
                student_id,
                name,
                piece,
                composer,
                ..
            } = &performer.kind
            {
                if *student_id == id {
                    performer.kind = PerformerKind::Manual {
                        name: name.clone(),
                        piece: piece.clone(),
                        composer: composer.clone(),
                    };
                }
            }
        }
    }

    fn remove_teacher(&mut self, id: PrimaryKey) -> bool {
        if self.teachers.remove(&id).is_none() {
            return false;
        }

        self.cards.remove(&id);

        let lessons: Vec<_> = self
            .lessons
            .iter()
            .filter(|l| l.teacher_id == id)
            .map(|l| l.id)
            .collect();

        self.lessons.retain(|l| l.teacher_id != id);
        self.lesson_audios.retain(|a| !lessons.contains(&a.lesson_id));
        self.progress.retain(|p| !lessons.contains(&p.lesson_id));
        self.schedule.retain(|s| s.teacher_id != id);

        let recitals: Vec<_> = self
            .recitals
            .iter()
            .filter(|r| r.teacher_id == id)
            .map(|r| r.id)
            .collect();

        self.recitals.retain(|r| r.teacher_id != id);
        self.performers.retain(|p| !recitals.contains(&p.recital_id));

        for code in self.codes.values_mut() {
            if code.used_by == Some(id) {
                code.used_by = None;
            }
        }

        for student in self.students.values_mut() {
            if student.teacher_id == Some(id) {
                student.teacher_id = None;
            }
        }

        true
    }

    fn recital(&self, id: PrimaryKey) -> Result<RecitalData> {
        let stored = self
            .recitals
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("recital", "id"))?;

        let mut performers: Vec<_> = self
            .performers
            .iter()
            .filter(|p| p.recital_id == id)
            .cloned()
            .collect();

        performers.sort_by_key(|p| p.sort_order);

        Ok(RecitalData {
            id: stored.id,
            teacher_id: stored.teacher_id,
            title: stored.title.clone(),
            venue: stored.venue.clone(),
            date: stored.date,
            performers,
        })
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn account_by_id(&self, account_id: PrimaryKey) -> Result<AccountData> {
        self.tables.lock().account(account_id)
    }

    async fn account_by_email(&self, email: &str) -> Result<AccountData> {
        self.tables
            .lock()
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned()
            .ok_or_else(|| not_found("account", "email"))
    }

    async fn create_account(&self, new_account: NewAccountRow) -> Result<AccountData> {
        let mut tables = self.tables.lock();

        if tables.accounts.contains_key(&new_account.id) {
            return Err(conflict("account", "id", new_account.id));
        }

        if tables.accounts.values().any(|a| a.email == new_account.email) {
            return Err(conflict("account", "email", &new_account.email));
        }

        let account = AccountData {
            id: new_account.id,
            email: new_account.email,
            password: new_account.password,
        };

        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update_account(&self, updated_account: UpdatedAccount) -> Result<AccountData> {
        let mut tables = self.tables.lock();

        if let Some(email) = &updated_account.email {
            let taken = tables
                .accounts
                .values()
                .any(|a| &a.email == email && a.id != updated_account.id);

            if taken {
                return Err(conflict("account", "email", email));
            }
        }

        let account = tables
            .accounts
            .get_mut(&updated_account.id)
            .ok_or_else(|| not_found("account", "id"))?;

        if let Some(email) = updated_account.email {
            account.email = email;
        }

        if let Some(password) = updated_account.password {
            account.password = password;
        }

        Ok(account.clone())
    }

    async fn delete_account(&self, account_id: PrimaryKey) -> Result<()> {
        let mut tables = self.tables.lock();

        tables
            .accounts
            .remove(&account_id)
            .ok_or_else(|| not_found("account", "id"))?;

        tables.sessions.retain(|s| s.account_id != account_id);
        tables.remove_teacher(account_id);
        tables.remove_student(account_id);

        Ok(())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        self.tables.lock().session(token)
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let mut tables = self.tables.lock();

        if tables.sessions.iter().any(|s| s.token == new_session.token) {
            return Err(conflict("session", "token", &new_session.token));
        }

        // Ensure the account exists
        tables.account(new_session.account_id)?;

        tables.sessions.push(StoredSession {
            id: Uuid::new_v4(),
            token: new_session.token.clone(),
            account_id: new_session.account_id,
            expires_at: new_session.expires_at,
        });

        tables.session(&new_session.token)
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        let mut tables = self.tables.lock();
        let before = tables.sessions.len();

        tables.sessions.retain(|s| s.token != token);

        if tables.sessions.len() == before {
            return Err(not_found("session", "token"));
        }

        Ok(())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        let now = Utc::now();
        self.tables.lock().sessions.retain(|s| s.expires_at > now);
        Ok(())
    }

    async fn teacher_by_id(&self, teacher_id: PrimaryKey) -> Result<TeacherData> {
        self.tables.lock().teacher(teacher_id)
    }

    async fn teacher_by_username(&self, username: &str) -> Result<TeacherData> {
        self.tables
            .lock()
            .teachers
            .values()
            .find(|t| t.username == username)
            .cloned()
            .ok_or_else(|| not_found("teacher", "username"))
    }

    async fn create_teacher(&self, new_teacher: NewTeacher) -> Result<TeacherData> {
        let mut tables = self.tables.lock();

        if tables
            .teachers
            .values()
            .any(|t| t.username == new_teacher.username)
        {
            return Err(conflict("teacher", "username", &new_teacher.username));
        }

        if tables.teachers.contains_key(&new_teacher.id) {
            return Err(conflict("teacher", "id", new_teacher.id));
        }

        let teacher = TeacherData {
            id: new_teacher.id,
            username: new_teacher.username,
            display_name: new_teacher.display_name,
            tier: new_teacher.tier,
            status: SubscriptionStatus::Active,
            max_students: new_teacher.max_students,
            created_at: Utc::now(),
        };

        tables.teachers.insert(teacher.id, teacher.clone());
        Ok(teacher)
    }

    async fn update_teacher(&self, updated_teacher: UpdatedTeacher) -> Result<TeacherData> {
        let mut tables = self.tables.lock();
        let teacher = tables
            .teachers
            .get_mut(&updated_teacher.id)
            .ok_or_else(|| not_found("teacher", "id"))?;

        if let Some(display_name) = updated_teacher.display_name {
            teacher.display_name = display_name;
        }
        if let Some(tier) = updated_teacher.tier {
            teacher.tier = tier;
        }
        if let Some(status) = updated_teacher.status {
            teacher.status = status;
        }
        if let Some(max_students) = updated_teacher.max_students {
            teacher.max_students = max_students;
        }

        Ok(teacher.clone())
    }

    async fn delete_teacher(&self, teacher_id: PrimaryKey) -> Result<()> {
        if !self.tables.lock().remove_teacher(teacher_id) {
            return Err(not_found("teacher", "id"));
        }

        Ok(())
    }

    async fn card_by_teacher(&self, teacher_id: PrimaryKey) -> Result<TeacherCardData> {
        self.tables
            .lock()
            .cards
            .get(&teacher_id)
            .cloned()
            .ok_or_else(|| not_found("teacher card", "teacher_id"))
    }

    async fn upsert_card(&self, card: TeacherCardData) -> Result<TeacherCardData> {
        let mut tables = self.tables.lock();

        tables.teacher(card.teacher_id)?;
        tables.cards.insert(card.teacher_id, card.clone());

        Ok(card)
    }

    async fn subscription_code(&self, code: &str) -> Result<SubscriptionCodeData> {
        self.tables
            .lock()
            .codes
            .get(code)
            .cloned()
            .ok_or_else(|| not_found("subscription code", "code"))
    }

    async fn create_subscription_code(
        &self,
        new_code: NewSubscriptionCode,
    ) -> Result<SubscriptionCodeData> {
        let mut tables = self.tables.lock();

        if tables.codes.contains_key(&new_code.code) {
            return Err(conflict("subscription code", "code", &new_code.code));
        }

        let code = SubscriptionCodeData {
            code: new_code.code,
            tier: new_code.tier,
            max_students: new_code.max_students,
            used: false,
            used_by: None,
            used_at: None,
        };

        tables.codes.insert(code.code.clone(), code.clone());
        Ok(code)
    }

    async fn claim_subscription_code(
        &self,
        code: &str,
        teacher_id: PrimaryKey,
    ) -> Result<SubscriptionCodeData> {
        let mut tables = self.tables.lock();
        let stored = tables
            .codes
            .get_mut(code)
            .ok_or_else(|| not_found("subscription code", "code"))?;

        if stored.used {
            return Err(conflict("subscription code", "code", code));
        }

        stored.used = true;
        stored.used_by = Some(teacher_id);
        stored.used_at = Some(Utc::now());

        Ok(stored.clone())
    }

    async fn student_by_id(&self, student_id: PrimaryKey) -> Result<StudentData> {
        self.tables.lock().student(student_id)
    }

    async fn students_by_teacher(&self, teacher_id: PrimaryKey) -> Result<Vec<StudentData>> {
        let mut students: Vec<_> = self
            .tables
            .lock()
            .students
            .values()
            .filter(|s| s.teacher_id == Some(teacher_id))
            .cloned()
            .collect();

        students.sort_by_key(|s| s.created_at);
        Ok(students)
    }

    async fn count_students(&self, teacher_id: PrimaryKey) -> Result<u32> {
        let count = self
            .tables
            .lock()
            .students
            .values()
            .filter(|s| s.teacher_id == Some(teacher_id))
            .count();

        Ok(count as u32)
    }

    async fn create_student(&self, new_student: NewStudent) -> Result<StudentData> {
        let mut tables = self.tables.lock();

        if tables.students.contains_key(&new_student.id) {
            return Err(conflict("student", "id", new_student.id));
        }

        if let Some(teacher_id) = new_student.teacher_id {
            tables.teacher(teacher_id)?;
        }

        let student = StudentData {
            id: new_student.id,
            display_name: new_student.display_name,
            access_code: new_student.access_code,
            is_private: new_student.is_private,
            teacher_id: new_student.teacher_id,
            color: new_student.color,
            bio: None,
            image_url: None,
            notes: None,
            tracks_public_by_default: false,
            created_at: Utc::now(),
        };

        tables.students.insert(student.id, student.clone());
        Ok(student)
    }

    async fn update_student(&self, updated_student: UpdatedStudent) -> Result<StudentData> {
        let mut tables = self.tables.lock();
        let student = tables
            .students
            .get_mut(&updated_student.id)
            .ok_or_else(|| not_found("student", "id"))?;

        if let Some(display_name) = updated_student.display_name {
            student.display_name = display_name;
        }
        if let Some(access_code) = updated_student.access_code {
            student.access_code = access_code;
        }
        if let Some(is_private) = updated_student.is_private {
            student.is_private = is_private;
        }
        if let Some(color) = updated_student.color {
            student.color = color;
        }
        if let Some(bio) = updated_student.bio {
            student.bio = Some(bio);
        }
        if let Some(image_url) = updated_student.image_url {
            student.image_url = Some(image_url);
        }
        if let Some(notes) = updated_student.notes {
            student.notes = Some(notes);
        }
        if let Some(public) = updated_student.tracks_public_by_default {
            student.tracks_public_by_default = public;
        }

        Ok(student.clone())
    }

    async fn track_by_id(&self, track_id: PrimaryKey) -> Result<TrackData> {
        self.tables
            .lock()
            .tracks
            .iter()
            .find(|t| t.id == track_id)
            .cloned()
            .ok_or_else(|| not_found("track", "id"))
    }

    async fn tracks_by_student(&self, student_id: PrimaryKey) -> Result<Vec<TrackData>> {
        let mut tracks: Vec<_> = self
            .tables
            .lock()
            .tracks
            .iter()
            .filter(|t| t.student_id == student_id)
            .cloned()
            .collect();

        tracks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tracks)
    }

    async fn create_track(&self, new_track: NewTrack) -> Result<TrackData> {
        let mut tables = self.tables.lock();

        tables.student(new_track.student_id)?;

        let track = TrackData {
            id: Uuid::new_v4(),
            student_id: new_track.student_id,
            title: new_track.title,
            url: new_track.url,
            path: new_track.path,
            is_public: new_track.is_public,
            created_at: Utc::now(),
        };

        tables.tracks.push(track.clone());
        Ok(track)
    }

    async fn update_track_visibility(
        &self,
        track_id: PrimaryKey,
        is_public: bool,
    ) -> Result<TrackData> {
        let mut tables = self.tables.lock();
        let track = tables
            .tracks
            .iter_mut()
            .find(|t| t.id == track_id)
            .ok_or_else(|| not_found("track", "id"))?;

        track.is_public = is_public;
        Ok(track.clone())
    }

    async fn delete_track(&self, track_id: PrimaryKey) -> Result<()> {
        let mut tables = self.tables.lock();
        let before = tables.tracks.len();

        tables.tracks.retain(|t| t.id != track_id);

        if tables.tracks.len() == before {
            return Err(not_found("track", "id"));
        }

        Ok(())
    }

    async fn lesson_by_id(&self, lesson_id: PrimaryKey) -> Result<LessonData> {
        self.tables
            .lock()
            .lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .cloned()
            .ok_or_else(|| not_found("lesson", "id"))
    }

    async fn lessons_by_teacher(&self, teacher_id: PrimaryKey) -> Result<Vec<LessonData>> {
        Ok(self
            .tables
            .lock()
            .lessons
            .iter()
            .filter(|l| l.teacher_id == teacher_id)
            .cloned()
            .collect())
    }

    async fn create_lesson(&self, new_lesson: NewLesson) -> Result<LessonData> {
        let mut tables = self.tables.lock();

        tables.teacher(new_lesson.teacher_id)?;

        let lesson = LessonData {
            id: Uuid::new_v4(),
            teacher_id: new_lesson.teacher_id,
            title: new_lesson.title,
            description: new_lesson.description,
            created_at: Utc::now(),
        };

        tables.lessons.push(lesson.clone());
        Ok(lesson)
    }

    async fn lesson_audios(&self, lesson_id: PrimaryKey) -> Result<Vec<LessonAudioData>> {
        let mut audios: Vec<_> = self
            .tables
            .lock()
            .lesson_audios
            .iter()
            .filter(|a| a.lesson_id == lesson_id)
            .cloned()
            .collect();

        audios.sort_by_key(|a| a.sort_order);
        Ok(audios)
    }

    async fn create_lesson_audio(&self, new_audio: NewLessonAudio) -> Result<LessonAudioData> {
        let mut tables = self.tables.lock();

        if !tables.lessons.iter().any(|l| l.id == new_audio.lesson_id) {
            return Err(not_found("lesson", "id"));
        }

        let audio = LessonAudioData {
            id: Uuid::new_v4(),
            lesson_id: new_audio.lesson_id,
            title: new_audio.title,
            url: new_audio.url,
            sort_order: new_audio.sort_order,
        };

        tables.lesson_audios.push(audio.clone());
        Ok(audio)
    }

    async fn create_progress(&self, new_progress: NewProgress) -> Result<ProgressData> {
        let mut tables = self.tables.lock();

        tables.student(new_progress.student_id)?;

        let progress = ProgressData {
            id: Uuid::new_v4(),
            student_id: new_progress.student_id,
            lesson_id: new_progress.lesson_id,
            created_at: Utc::now(),
        };

        tables.progress.push(progress.clone());
        Ok(progress)
    }

    async fn progress_by_student(&self, student_id: PrimaryKey) -> Result<Vec<ProgressData>> {
        Ok(self
            .tables
            .lock()
            .progress
            .iter()
            .filter(|p| p.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn schedule_by_teacher(&self, teacher_id: PrimaryKey) -> Result<Vec<ScheduleSlotData>> {
        let mut slots: Vec<_> = self
            .tables
            .lock()
            .schedule
            .iter()
            .filter(|s| s.teacher_id == teacher_id)
            .cloned()
            .collect();

        slots.sort_by_key(|s| (s.weekday, s.start_minute));
        Ok(slots)
    }

    async fn create_schedule_slot(&self, new_slot: NewScheduleSlot) -> Result<ScheduleSlotData> {
        let mut tables = self.tables.lock();

        let slot = ScheduleSlotData {
            id: Uuid::new_v4(),
            teacher_id: new_slot.teacher_id,
            student_id: new_slot.student_id,
            weekday: new_slot.weekday,
            start_minute: new_slot.start_minute,
            duration_minutes: new_slot.duration_minutes,
        };

        tables.schedule.push(slot.clone());
        Ok(slot)
    }

    async fn delete_schedule_slot(&self, slot_id: PrimaryKey) -> Result<()> {
        let mut tables = self.tables.lock();
        let before = tables.schedule.len();

        tables.schedule.retain(|s| s.id != slot_id);

        if tables.schedule.len() == before {
            return Err(not_found("schedule slot", "id"));
        }

        Ok(())
    }

    async fn recital_by_id(&self, recital_id: PrimaryKey) -> Result<RecitalData> {
        self.tables.lock().recital(recital_id)
    }

    async fn recitals_by_teacher(&self, teacher_id: PrimaryKey) -> Result<Vec<RecitalData>> {
        let tables = self.tables.lock();

        tables
            .recitals
            .iter()
            .filter(|r| r.teacher_id == teacher_id)
            .map(|r| tables.recital(r.id))
            .collect()
    }

    async fn create_recital(&self, new_recital: NewRecital) -> Result<RecitalData> {
        let mut tables = self.tables.lock();
        let id = Uuid::new_v4();

        tables.recitals.push(StoredRecital {
            id,
            teacher_id: new_recital.teacher_id,
            title: new_recital.title,
            venue: new_recital.venue,
            date: new_recital.date,
        });

        tables.recital(id)
    }

    async fn create_performer(&self, new_performer: NewPerformer) -> Result<PerformerData> {
        let mut tables = self.tables.lock();

        if !tables.recitals.iter().any(|r| r.id == new_performer.recital_id) {
            return Err(not_found("recital", "id"));
        }

        let performer = PerformerData {
            id: Uuid::new_v4(),
            recital_id: new_performer.recital_id,
            sort_order: new_performer.sort_order,
            kind: new_performer.kind,
        };

        tables.performers.push(performer.clone());
        Ok(performer)
    }

    async fn delete_performer(&self, performer_id: PrimaryKey) -> Result<()> {
        let mut tables = self.tables.lock();
        let before = tables.performers.len();

        tables.performers.retain(|p| p.id != performer_id);

        if tables.performers.len() == before {
            return Err(not_found("recital performer", "id"));
        }

        Ok(())
    }

    async fn set_performer_order(
        &self,
        recital_id: PrimaryKey,
        order: Vec<(PrimaryKey, i32)>,
    ) -> Result<()> {
        let mut tables = self.tables.lock();

        let all_present = order.iter().all(|(id, _)| {
            tables
                .performers
                .iter()
                .any(|p| p.id == *id && p.recital_id == recital_id)
        });

        if !all_present {
            return Err(not_found("recital performer", "id"));
        }

        for (id, sort_order) in order {
            if let Some(performer) = tables.performers.iter_mut().find(|p| p.id == id) {
                performer.sort_order = sort_order;
            }
        }

        Ok(())
    }

    async fn create_inquiry(&self, new_inquiry: NewInquiry) -> Result<InquiryData> {
        let inquiry = InquiryData {
            id: Uuid::new_v4(),
            name: new_inquiry.name,
            email: new_inquiry.email,
            message: new_inquiry.message,
            created_at: Utc::now(),
        };

        self.tables.lock().inquiries.push(inquiry.clone());
        Ok(inquiry)
    }
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use super::MemoryDatabase;
    use crate::{
        Database, NewAccountRow, NewPerformer, NewRecital, NewStudent, NewTeacher, NewTrack,
        PerformerKind, PrimaryKey, SubscriptionTier,
    };

    async fn account(db: &MemoryDatabase) -> PrimaryKey {
        let id = Uuid::new_v4();

        db.create_account(NewAccountRow {
            id,
            email: format!("{id}@example.com"),
            password: "hash".to_string(),
        })
        .await
        .unwrap();

        id
    }

    async fn student(db: &MemoryDatabase, teacher_id: Option<PrimaryKey>) -> PrimaryKey {
        let id = account(db).await;

        db.create_student(NewStudent {
            id,
            display_name: "Mira".to_string(),
            access_code: "2468".to_string(),
            is_private: false,
            teacher_id,
            color: "#aabbcc".to_string(),
        })
        .await
        .unwrap();

        id
    }

    #[tokio::test]
    async fn deleting_a_student_account_removes_the_profile() {
        let db = MemoryDatabase::new();
        let teacher_id = account(&db).await;

        db.create_teacher(NewTeacher {
            id: teacher_id,
            username: "rivera".to_string(),
            display_name: "Ms. Rivera".to_string(),
            tier: SubscriptionTier::Free,
            max_students: 3,
        })
        .await
        .unwrap();

        let student_id = student(&db, Some(teacher_id)).await;
        let track = db
            .create_track(NewTrack {
                student_id,
                title: "Minuet".to_string(),
                url: "url".to_string(),
                path: "path".to_string(),
                is_public: true,
            })
            .await
            .unwrap();

        let recital = db
            .create_recital(NewRecital {
                teacher_id,
                title: "Spring".to_string(),
                venue: None,
                date: None,
            })
            .await
            .unwrap();

        db.create_performer(NewPerformer {
            recital_id: recital.id,
            sort_order: 0,
            kind: PerformerKind::Student {
                student_id,
                name: "Mira".to_string(),
                image_url: None,
                piece: "Minuet".to_string(),
                composer: "Bach".to_string(),
            },
        })
        .await
        .unwrap();

        db.delete_account(student_id).await.unwrap();

        assert!(db.student_by_id(student_id).await.unwrap_err().is_not_found());
        assert!(db.track_by_id(track.id).await.unwrap_err().is_not_found());
        assert_eq!(db.count_students(teacher_id).await.unwrap(), 0);

        let recital = db.recital_by_id(recital.id).await.unwrap();
        assert!(matches!(
            &recital.performers[0].kind,
            PerformerKind::Manual { name, .. } if name == "Mira"
        ));
    }

    #[tokio::test]
    async fn deleting_a_teacher_detaches_their_students() {
        let db = MemoryDatabase::new();
        let teacher_id = account(&db).await;

        db.create_teacher(NewTeacher {
            id: teacher_id,
            username: "rivera".to_string(),
            display_name: "Ms. Rivera".to_string(),
            tier: SubscriptionTier::Free,
            max_students: 3,
        })
        .await
        .unwrap();

        let student_id = student(&db, Some(teacher_id)).await;

        db.delete_account(teacher_id).await.unwrap();

        assert!(db.teacher_by_id(teacher_id).await.is_err());
        assert_eq!(db.student_by_id(student_id).await.unwrap().teacher_id, None);
    }
}
