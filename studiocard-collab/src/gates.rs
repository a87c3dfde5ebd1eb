//! The three ways access is granted. They don't compose into one another,
//! except that unlocking to manage a page also unlocks viewing it.
//!
//! 1. The read gate compares an access code against the profile. It only
//!    ever flips a flag for the current view and never creates a session.
//! 2. The write gate signs the student in with their passcode.
//! 3. The route gate requires a session whose id is in the teachers table.
//!
//! Everything starts locked.

use log::info;
use thiserror::Error;

use crate::{Auth, AuthError, DatabaseError, PrimaryKey, Role, SessionData, StudentData, TeacherData};

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Incorrect access code")]
    IncorrectCode,
    #[error("Not signed in")]
    NoSession,
    #[error("Only teachers can do that")]
    NotATeacher,
    #[error("Only students can do that")]
    NotAStudent,
    #[error("You can't change this")]
    Forbidden,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// The access state of one view of a student's page
#[derive(Debug, Clone)]
pub struct PageAccess {
    student_id: PrimaryKey,
    teacher_id: Option<PrimaryKey>,
    is_private: bool,
    read_unlocked: bool,
    manager: Option<SessionData>,
}

impl PageAccess {
    pub fn for_student(student: &StudentData) -> Self {
        Self {
            student_id: student.id,
            teacher_id: student.teacher_id,
            is_private: student.is_private,
            read_unlocked: false,
            manager: None,
        }
    }

    /// The read gate. Grants viewing only, for the rest of this view.
    pub fn unlock_read(&mut self, student: &StudentData, code: &str) -> Result<(), GateError> {
        if student.id != self.student_id || student.access_code != code {
            return Err(GateError::IncorrectCode);
        }

        self.read_unlocked = true;
        Ok(())
    }

    /// The write gate. Signs the student in, which also unlocks viewing.
    pub async fn unlock_manager(
        &mut self,
        auth: &Auth,
        student: &StudentData,
        passcode: &str,
    ) -> Result<(), GateError> {
        if student.id != self.student_id {
            return Err(GateError::Forbidden);
        }

        let session = auth.sign_in_student(student.id, passcode).await?;

        info!("Manager unlocked page of student {}", student.id);
        self.manager = Some(session);

        Ok(())
    }

    /// Uses an already established session, if it belongs to the student or their teacher
    pub fn grant_session(&mut self, session: SessionData) -> bool {
        let principal = session.principal_id();
        let allowed = principal == self.student_id || Some(principal) == self.teacher_id;

        if allowed {
            self.manager = Some(session);
        }

        allowed
    }

    pub fn can_view(&self) -> bool {
        !self.is_private || self.read_unlocked || self.manager.is_some()
    }

    pub fn can_manage(&self) -> bool {
        self.manager.is_some()
    }

    /// The session that unlocked managing, if any
    pub fn session(&self) -> Option<&SessionData> {
        self.manager.as_ref()
    }

    pub fn student_id(&self) -> PrimaryKey {
        self.student_id
    }
}

/// Who is writing to a student's records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Writer {
    Student,
    Teacher,
}

/// The row level policy for student records: the student, or their teacher
pub fn ensure_can_write(session: &SessionData, student: &StudentData) -> Result<Writer, GateError> {
    let principal = session.principal_id();

    if principal == student.id {
        Ok(Writer::Student)
    } else if Some(principal) == student.teacher_id {
        Ok(Writer::Teacher)
    } else {
        Err(GateError::Forbidden)
    }
}

/// Like [ensure_can_write], but only the owning teacher passes
pub fn ensure_teacher_of(session: &SessionData, student: &StudentData) -> Result<(), GateError> {
    match ensure_can_write(session, student)? {
        Writer::Teacher => Ok(()),
        Writer::Student => Err(GateError::Forbidden),
    }
}

/// The route gate
pub async fn require_teacher(auth: &Auth, session: &SessionData) -> Result<TeacherData, GateError> {
    match auth.resolve_role(session).await? {
        Role::Teacher(teacher) => Ok(teacher),
        _ => Err(GateError::NotATeacher),
    }
}

pub async fn require_student(auth: &Auth, session: &SessionData) -> Result<StudentData, GateError> {
    match auth.resolve_role(session).await? {
        Role::Student(student) => Ok(student),
        _ => Err(GateError::NotAStudent),
    }
}

#[cfg(test)]
mod test {
    use super::{ensure_can_write, require_teacher, GateError, PageAccess, Writer};
    use crate::{
        test_util::{student_signup, studio, teacher_signup},
        SubscriptionTier, UpdatedStudent,
    };

    #[tokio::test]
    async fn read_gate_never_grants_writes() {
        let studio = studio();
        let mut signup = student_signup("4821", None);
        signup.is_private = true;
        signup.access_code = "2468".to_string();

        let student = studio.auth.register_student(signup).await.unwrap();
        let mut access = PageAccess::for_student(&student);

        assert!(!access.can_view());
        assert!(matches!(
            access.unlock_read(&student, "0000"),
            Err(GateError::IncorrectCode)
        ));
        assert!(!access.can_view());

        access.unlock_read(&student, "2468").unwrap();

        assert!(access.can_view());
        assert!(!access.can_manage());
        assert!(access.session().is_none());
    }

    #[tokio::test]
    async fn passcode_is_not_an_access_code() {
        let studio = studio();
        let mut signup = student_signup("4821", None);
        signup.is_private = true;

        let student = studio.auth.register_student(signup).await.unwrap();
        let mut access = PageAccess::for_student(&student);

        assert!(access.unlock_read(&student, "4821").is_err());
    }

    #[tokio::test]
    async fn manager_unlock_also_unlocks_viewing() {
        let studio = studio();
        let mut signup = student_signup("4821", None);
        signup.is_private = true;

        let student = studio.auth.register_student(signup).await.unwrap();
        let mut access = PageAccess::for_student(&student);

        let wrong = access.unlock_manager(&studio.auth, &student, "0000").await;
        assert!(wrong.is_err());
        assert!(!access.can_view());

        access
            .unlock_manager(&studio.auth, &student, "4821")
            .await
            .unwrap();

        assert!(access.can_manage());
        assert!(access.can_view());
        assert_eq!(access.session().unwrap().principal_id(), student.id);
    }

    #[tokio::test]
    async fn public_pages_are_viewable_but_not_manageable() {
        let studio = studio();
        let student = studio
            .auth
            .register_student(student_signup("4821", None))
            .await
            .unwrap();

        let access = PageAccess::for_student(&student);

        assert!(access.can_view());
        assert!(!access.can_manage());
    }

    #[tokio::test]
    async fn only_owner_and_teacher_may_write() {
        let studio = studio();
        studio.seed_code("KEY-1", SubscriptionTier::Free).await;

        let teacher = studio
            .auth
            .redeem_license(teacher_signup("KEY-1", "rivera"))
            .await
            .unwrap();
        let student = studio
            .auth
            .register_student(student_signup("4821", Some(teacher.id)))
            .await
            .unwrap();
        let other = studio
            .auth
            .register_student(student_signup("1357", None))
            .await
            .unwrap();

        let own = studio.auth.sign_in_student(student.id, "4821").await.unwrap();
        let stranger = studio.auth.sign_in_student(other.id, "1357").await.unwrap();
        let teacher_session = studio
            .auth
            .sign_in_teacher("rivera@example.com", "long enough password")
            .await
            .unwrap();

        assert_eq!(ensure_can_write(&own, &student).unwrap(), Writer::Student);
        assert_eq!(
            ensure_can_write(&teacher_session, &student).unwrap(),
            Writer::Teacher
        );
        assert!(ensure_can_write(&stranger, &student).is_err());

        let mut access = PageAccess::for_student(&student);
        assert!(!access.grant_session(stranger));
        assert!(!access.can_manage());
        assert!(access.grant_session(teacher_session));
        assert!(access.can_manage());
    }

    #[tokio::test]
    async fn route_gate_requires_a_teacher_row() {
        let studio = studio();
        let student = studio
            .auth
            .register_student(student_signup("4821", None))
            .await
            .unwrap();
        let session = studio.auth.sign_in_student(student.id, "4821").await.unwrap();

        let result = require_teacher(&studio.auth, &session).await;
        assert!(matches!(result, Err(GateError::NotATeacher)));

        // Making the profile private doesn't change the role
        studio
            .database
            .update_student(UpdatedStudent {
                id: student.id,
                is_private: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(require_teacher(&studio.auth, &session).await.is_err());
    }
}
