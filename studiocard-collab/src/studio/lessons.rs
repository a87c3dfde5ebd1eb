use std::collections::HashSet;

use log::info;

use crate::{
    ensure_can_write, events::StudioEvent, lesson_audio_path, upload_with_retry, DatabaseError,
    GateError, LessonAudioData, LessonData, NewLesson, NewLessonAudio, NewProgress, PrimaryKey,
    ProgressData, SessionData, StudentData, StudioContext, TeacherData,
};

use super::{object_name, StudioError};

pub struct Lessons {
    context: StudioContext,
}

/// A lesson along with its audio segments, in order
#[derive(Debug, Clone)]
pub struct LessonDetails {
    pub lesson: LessonData,
    pub audios: Vec<LessonAudioData>,
}

/// Keeps track of which segments of a lesson were listened to the end
#[derive(Debug, Clone)]
pub struct LessonListening {
    lesson_id: PrimaryKey,
    segments: Vec<PrimaryKey>,
    finished: HashSet<PrimaryKey>,
}

impl LessonListening {
    pub fn new(details: &LessonDetails) -> Self {
        Self {
            lesson_id: details.lesson.id,
            segments: details.audios.iter().map(|a| a.id).collect(),
            finished: HashSet::new(),
        }
    }

    /// Marks a segment as played to the end. Returns whether the lesson is now complete.
    pub fn segment_ended(&mut self, audio_id: PrimaryKey) -> bool {
        if self.segments.contains(&audio_id) {
            self.finished.insert(audio_id);
        }

        self.is_complete()
    }

    /// A lesson without segments is never complete
    pub fn is_complete(&self) -> bool {
        !self.segments.is_empty() && self.segments.iter().all(|s| self.finished.contains(s))
    }

    /// Segments not yet listened to, in order
    pub fn remaining(&self) -> Vec<PrimaryKey> {
        self.segments
            .iter()
            .filter(|s| !self.finished.contains(s))
            .copied()
            .collect()
    }

    pub fn lesson_id(&self) -> PrimaryKey {
        self.lesson_id
    }
}

impl Lessons {
    pub fn new(context: &StudioContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn create(
        &self,
        teacher: &TeacherData,
        title: String,
        description: Option<String>,
    ) -> Result<LessonData, StudioError> {
        if title.trim().is_empty() {
            return Err(StudioError::Invalid("Lesson title can't be empty"));
        }

        let lesson = self
            .context
            .database
            .create_lesson(NewLesson {
                teacher_id: teacher.id,
                title,
                description,
            })
            .await?;

        Ok(lesson)
    }

    /// Stores an audio segment and appends it to the lesson
    pub async fn add_audio(
        &self,
        teacher: &TeacherData,
        lesson_id: PrimaryKey,
        title: String,
        bytes: &[u8],
    ) -> Result<LessonAudioData, StudioError> {
        let lesson = self.context.database.lesson_by_id(lesson_id).await?;

        if lesson.teacher_id != teacher.id {
            return Err(GateError::Forbidden.into());
        }

        if bytes.is_empty() {
            return Err(StudioError::Invalid("Recording is empty"));
        }

        let existing = self.context.database.lesson_audios(lesson.id).await?;
        let path = lesson_audio_path(lesson.id, &object_name());
        let config = &self.context.config;

        upload_with_retry(
            self.context.storage.as_ref(),
            &path,
            bytes,
            "audio/webm",
            config.upload_attempts,
            config.upload_backoff,
        )
        .await?;

        let audio = self
            .context
            .database
            .create_lesson_audio(NewLessonAudio {
                lesson_id: lesson.id,
                title,
                url: self.context.storage.public_url(&path),
                sort_order: existing.len() as i32,
            })
            .await?;

        Ok(audio)
    }

    pub async fn list(&self, teacher_id: PrimaryKey) -> Result<Vec<LessonData>, DatabaseError> {
        let mut lessons = self.context.database.lessons_by_teacher(teacher_id).await?;
        lessons.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(lessons)
    }

    pub async fn details(&self, lesson_id: PrimaryKey) -> Result<LessonDetails, DatabaseError> {
        let lesson = self.context.database.lesson_by_id(lesson_id).await?;
        let mut audios = self.context.database.lesson_audios(lesson.id).await?;
        audios.sort_by_key(|a| a.sort_order);

        Ok(LessonDetails { lesson, audios })
    }

    /// A lesson as seen by a student, who may only open lessons of their own teacher
    pub async fn details_for(
        &self,
        student: &StudentData,
        lesson_id: PrimaryKey,
    ) -> Result<LessonDetails, StudioError> {
        let details = self.details(lesson_id).await?;

        if student.teacher_id != Some(details.lesson.teacher_id) {
            return Err(GateError::Forbidden.into());
        }

        Ok(details)
    }

    /// Starts listening to a lesson
    pub async fn listen(&self, lesson_id: PrimaryKey) -> Result<LessonListening, DatabaseError> {
        let details = self.details(lesson_id).await?;
        Ok(LessonListening::new(&details))
    }

    /// Records that the student completed the lesson.
    /// Every call adds a row, completing twice leaves two rows.
    pub async fn complete(
        &self,
        student: &StudentData,
        lesson_id: PrimaryKey,
    ) -> Result<ProgressData, StudioError> {
        let lesson = self.context.database.lesson_by_id(lesson_id).await?;

        if student.teacher_id != Some(lesson.teacher_id) {
            return Err(GateError::Forbidden.into());
        }

        let progress = self
            .context
            .database
            .create_progress(NewProgress {
                student_id: student.id,
                lesson_id: lesson.id,
            })
            .await?;

        info!("Student {} completed lesson {}", student.id, lesson.id);

        self.context.emit(StudioEvent::LessonCompleted {
            student_id: student.id,
            lesson_id: lesson.id,
        });

        Ok(progress)
    }

    /// Progress of a student, visible to the student and their teacher
    pub async fn progress(
        &self,
        session: &SessionData,
        student_id: PrimaryKey,
    ) -> Result<Vec<ProgressData>, StudioError> {
        let student = self.context.database.student_by_id(student_id).await?;
        ensure_can_write(session, &student)?;

        let mut progress = self.context.database.progress_by_student(student.id).await?;
        progress.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(progress)
    }
}

#[cfg(test)]
mod test {
    use crate::{test_util::studio, GateError, StudioError};

    #[tokio::test]
    async fn listening_completes_once_every_segment_ended() {
        let studio = studio();
        let (teacher, _) = studio.seed_teacher("rivera").await;

        let lesson = studio
            .lessons
            .create(&teacher, "Bow hold".to_string(), None)
            .await
            .unwrap();

        let first = studio
            .lessons
            .add_audio(&teacher, lesson.id, "Intro".to_string(), b"webm")
            .await
            .unwrap();
        let second = studio
            .lessons
            .add_audio(&teacher, lesson.id, "Exercise".to_string(), b"webm")
            .await
            .unwrap();

        assert_eq!(first.sort_order, 0);
        assert_eq!(second.sort_order, 1);
        assert_ne!(first.url, second.url);

        let mut listening = studio.lessons.listen(lesson.id).await.unwrap();
        assert!(!listening.is_complete());

        assert!(!listening.segment_ended(second.id));
        assert_eq!(listening.remaining(), vec![first.id]);
        assert!(listening.segment_ended(first.id));
    }

    #[tokio::test]
    async fn completing_twice_keeps_both_rows() {
        let studio = studio();
        let (teacher, teacher_session) = studio.seed_teacher("rivera").await;
        let (student, session) = studio.seed_student("4821", Some(teacher.id)).await;

        let lesson = studio
            .lessons
            .create(&teacher, "Bow hold".to_string(), None)
            .await
            .unwrap();

        studio.lessons.complete(&student, lesson.id).await.unwrap();
        studio.lessons.complete(&student, lesson.id).await.unwrap();

        let own = studio.lessons.progress(&session, student.id).await.unwrap();
        let seen_by_teacher = studio
            .lessons
            .progress(&teacher_session, student.id)
            .await
            .unwrap();

        assert_eq!(own.len(), 2);
        assert_eq!(seen_by_teacher.len(), 2);
        assert!(own.iter().all(|p| p.lesson_id == lesson.id));
    }

    #[tokio::test]
    async fn lessons_belong_to_their_teacher() {
        let studio = studio();
        let (rivera, _) = studio.seed_teacher("rivera").await;
        let (okafor, _) = studio.seed_teacher("okafor").await;
        let (student, _) = studio.seed_student("4821", Some(okafor.id)).await;

        let lesson = studio
            .lessons
            .create(&rivera, "Bow hold".to_string(), None)
            .await
            .unwrap();

        let foreign_audio = studio
            .lessons
            .add_audio(&okafor, lesson.id, "Intro".to_string(), b"webm")
            .await;
        let foreign_student = studio.lessons.complete(&student, lesson.id).await;
        let foreign_details = studio.lessons.details_for(&student, lesson.id).await;

        assert!(matches!(
            foreign_audio,
            Err(StudioError::Gate(GateError::Forbidden))
        ));
        assert!(matches!(
            foreign_student,
            Err(StudioError::Gate(GateError::Forbidden))
        ));
        assert!(matches!(
            foreign_details,
            Err(StudioError::Gate(GateError::Forbidden))
        ));
    }

    #[tokio::test]
    async fn segments_added_back_to_back_get_their_own_objects() {
        let studio = studio();
        let (teacher, _) = studio.seed_teacher("rivera").await;
        let lesson = studio
            .lessons
            .create(&teacher, "Scales".to_string(), None)
            .await
            .unwrap();

        let mut urls = Vec::new();
        for index in 0..20 {
            let audio = studio
                .lessons
                .add_audio(&teacher, lesson.id, format!("Part {index}"), b"webm")
                .await
                .unwrap();

            urls.push(audio.url);
        }

        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), 20);
    }
}
