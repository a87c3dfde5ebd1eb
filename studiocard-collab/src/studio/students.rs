use log::info;
use serde::Serialize;

use crate::{
    ensure_can_write, ensure_teacher_of, profile_image_path, upload_with_retry,
    util::{is_numeric_code, is_valid_color},
    DatabaseError, GateError, PageAccess, PrimaryKey, SessionData, StudentData, StudioContext,
    TeacherData, UpdatedStudent, Writer,
};

use super::{object_name, StudioError};

pub struct Students {
    context: StudioContext,
}

/// What a visitor sees of a student
#[derive(Debug, Clone)]
pub enum StudentProfile {
    /// The page is private and hasn't been unlocked
    Locked(LockedProfile),
    Full(StudentData),
}

/// Enough to show who the page belongs to, and nothing else
#[derive(Debug, Clone, Serialize)]
pub struct LockedProfile {
    pub id: PrimaryKey,
    pub display_name: String,
    pub color: String,
    pub image_url: Option<String>,
}

impl StudentProfile {
    pub fn new(student: &StudentData, access: &PageAccess) -> Self {
        if access.can_view() {
            return Self::Full(student.clone());
        }

        Self::Locked(LockedProfile {
            id: student.id,
            display_name: student.display_name.clone(),
            color: student.color.clone(),
            image_url: student.image_url.clone(),
        })
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked(_))
    }
}

/// Changes a student makes to their own page
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub color: Option<String>,
    pub access_code: Option<String>,
    pub is_private: Option<bool>,
}

/// Changes a teacher makes to one of their students
#[derive(Debug, Default)]
pub struct TeacherUpdate {
    pub notes: Option<String>,
    pub is_private: Option<bool>,
    pub tracks_public_by_default: Option<bool>,
}

impl Students {
    pub fn new(context: &StudioContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn get(&self, student_id: PrimaryKey) -> Result<StudentData, DatabaseError> {
        self.context.database.student_by_id(student_id).await
    }

    /// Returns the profile as far as the access allows
    pub async fn profile(&self, access: &PageAccess) -> Result<StudentProfile, DatabaseError> {
        let student = self.get(access.student_id()).await?;
        Ok(StudentProfile::new(&student, access))
    }

    /// Updates a student's own page. Only the student can do this.
    pub async fn update_profile(
        &self,
        session: &SessionData,
        student_id: PrimaryKey,
        update: ProfileUpdate,
    ) -> Result<StudentData, StudioError> {
        let student = self.get(student_id).await?;

        if ensure_can_write(session, &student)? != Writer::Student {
            return Err(GateError::Forbidden.into());
        }

        if update
            .display_name
            .as_ref()
            .is_some_and(|n| n.trim().is_empty())
        {
            return Err(StudioError::Invalid("Name can't be empty"));
        }

        if update.color.as_ref().is_some_and(|c| !is_valid_color(c)) {
            return Err(StudioError::Invalid("Color must be a hex color"));
        }

        if update
            .access_code
            .as_ref()
            .is_some_and(|c| !is_numeric_code(c))
        {
            return Err(StudioError::Invalid("Access code must be 4 to 8 digits"));
        }

        let updated = self
            .context
            .database
            .update_student(UpdatedStudent {
                id: student.id,
                display_name: update.display_name,
                bio: update.bio,
                color: update.color,
                access_code: update.access_code,
                is_private: update.is_private,
                ..Default::default()
            })
            .await?;

        Ok(updated)
    }

    /// Updates the parts of a student the owning teacher manages
    pub async fn update_by_teacher(
        &self,
        session: &SessionData,
        student_id: PrimaryKey,
        update: TeacherUpdate,
    ) -> Result<StudentData, StudioError> {
        let student = self.get(student_id).await?;
        ensure_teacher_of(session, &student)?;

        let updated = self
            .context
            .database
            .update_student(UpdatedStudent {
                id: student.id,
                notes: update.notes,
                is_private: update.is_private,
                tracks_public_by_default: update.tracks_public_by_default,
                ..Default::default()
            })
            .await?;

        Ok(updated)
    }

    /// Every student of the teacher
    pub async fn roster(&self, teacher: &TeacherData) -> Result<Vec<StudentData>, DatabaseError> {
        let mut students = self.context.database.students_by_teacher(teacher.id).await?;
        students.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        Ok(students)
    }

    /// Stores a new profile image and points the profile at it
    pub async fn upload_profile_image(
        &self,
        session: &SessionData,
        student_id: PrimaryKey,
        bytes: &[u8],
    ) -> Result<StudentData, StudioError> {
        let student = self.get(student_id).await?;
        ensure_can_write(session, &student)?;

        if bytes.is_empty() {
            return Err(StudioError::Invalid("Image is empty"));
        }

        let path = profile_image_path(student.id, &object_name());
        let config = &self.context.config;

        upload_with_retry(
            self.context.storage.as_ref(),
            &path,
            bytes,
            "image/jpeg",
            config.upload_attempts,
            config.upload_backoff,
        )
        .await?;

        let updated = self
            .context
            .database
            .update_student(UpdatedStudent {
                id: student.id,
                image_url: Some(self.context.storage.public_url(&path)),
                ..Default::default()
            })
            .await?;

        info!("Student {} has a new profile image", student.id);
        Ok(updated)
    }
}

#[cfg(test)]
mod test {
    use super::{ProfileUpdate, StudentProfile, TeacherUpdate};
    use crate::{
        test_util::{student_signup, studio},
        GateError, PageAccess, StudioError,
    };

    #[tokio::test]
    async fn private_profiles_are_locked_until_unlocked() {
        let studio = studio();
        let mut signup = student_signup("4821", None);
        signup.is_private = true;
        signup.display_name = "Theo".to_string();

        let student = studio.auth.register_student(signup).await.unwrap();
        let mut access = PageAccess::for_student(&student);

        let locked = studio.students.profile(&access).await.unwrap();
        match locked {
            StudentProfile::Locked(profile) => assert_eq!(profile.display_name, "Theo"),
            StudentProfile::Full(_) => panic!("private profile was not locked"),
        }

        access.unlock_read(&student, "2468").unwrap();

        let unlocked = studio.students.profile(&access).await.unwrap();
        assert!(!unlocked.is_locked());
    }

    #[tokio::test]
    async fn owner_updates_their_own_profile() {
        let studio = studio();
        let (student, session) = studio.seed_student("4821", None).await;

        let updated = studio
            .students
            .update_profile(
                &session,
                student.id,
                ProfileUpdate {
                    bio: Some("Cello, mostly Bach".to_string()),
                    is_private: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.bio.as_deref(), Some("Cello, mostly Bach"));
        assert!(updated.is_private);

        let bad_color = studio
            .students
            .update_profile(
                &session,
                student.id,
                ProfileUpdate {
                    color: Some("blue".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(bad_color, Err(StudioError::Invalid(_))));
    }

    #[tokio::test]
    async fn teacher_notes_are_teacher_only() {
        let studio = studio();
        let (teacher, teacher_session) = studio.seed_teacher("rivera").await;
        let (student, student_session) = studio.seed_student("4821", Some(teacher.id)).await;

        let notes = TeacherUpdate {
            notes: Some("Work on bow hold".to_string()),
            ..Default::default()
        };

        let updated = studio
            .students
            .update_by_teacher(&teacher_session, student.id, notes)
            .await
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("Work on bow hold"));

        let by_student = studio
            .students
            .update_by_teacher(&student_session, student.id, TeacherUpdate::default())
            .await;
        assert!(matches!(
            by_student,
            Err(StudioError::Gate(GateError::Forbidden))
        ));

        // Teachers don't edit the student's own page
        let by_teacher = studio
            .students
            .update_profile(&teacher_session, student.id, ProfileUpdate::default())
            .await;
        assert!(by_teacher.is_err());
    }

    #[tokio::test]
    async fn roster_lists_only_own_students() {
        let studio = studio();
        let (rivera, _) = studio.seed_teacher("rivera").await;
        let (okafor, _) = studio.seed_teacher("okafor").await;

        studio.seed_student("1111", Some(rivera.id)).await;
        studio.seed_student("2222", Some(rivera.id)).await;
        studio.seed_student("3333", Some(okafor.id)).await;

        let roster = studio.students.roster(&rivera).await.unwrap();

        assert_eq!(roster.len(), 2);
        assert!(roster.iter().all(|s| s.teacher_id == Some(rivera.id)));
    }

    #[tokio::test]
    async fn profile_images_are_stored_under_profiles() {
        let studio = studio();
        let (student, session) = studio.seed_student("4821", None).await;

        let updated = studio
            .students
            .upload_profile_image(&session, student.id, b"jpeg bytes")
            .await
            .unwrap();

        let url = updated.image_url.unwrap();
        assert!(url.contains(&format!("profiles/{}-", student.id)));
        assert!(url.ends_with(".jpg"));
    }
}
