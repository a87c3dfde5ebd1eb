use log::{error, info, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    events::StudioEvent,
    util::{is_numeric_code, is_valid_color, is_valid_username},
    Credentials, DatabaseError, NewAccount, NewStudent, NewTeacher, PrimaryKey, ProviderError,
    SessionData, StudentData, StudioContext, TeacherData,
};

const MIN_PASSWORD_LENGTH: usize = 8;

/// Signs principals in and out, and creates them
pub struct Auth {
    context: StudioContext,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Deliberately doesn't say whether the principal exists
    #[error("Incorrect passcode or handle")]
    InvalidCredentials,
    #[error("This license key is not valid")]
    InvalidLicense,
    #[error("This license key has already been used")]
    LicenseUsed,
    #[error("This studio already has {max} students, upgrade to add more")]
    CapacityReached { max: u32 },
    #[error("An account with email {0} already exists")]
    EmailTaken(String),
    #[error("{0}")]
    Invalid(&'static str),
    #[error("This account can't do that")]
    NotPermitted,
    /// Something went wrong with the database
    #[error(transparent)]
    Db(#[from] DatabaseError),
    /// Something else went wrong with the provider
    #[error(transparent)]
    Provider(ProviderError),
}

impl From<ProviderError> for AuthError {
    fn from(value: ProviderError) -> Self {
        match value {
            ProviderError::InvalidCredentials => Self::InvalidCredentials,
            ProviderError::EmailTaken(email) => Self::EmailTaken(email),
            ProviderError::Db(e) => Self::Db(e),
            e => Self::Provider(e),
        }
    }
}

/// What a session is allowed to act as, derived from which table holds its id
#[derive(Debug, Clone)]
pub enum Role {
    Teacher(TeacherData),
    Student(StudentData),
    None,
}

#[derive(Debug)]
pub struct NewStudentSignup {
    pub display_name: String,
    pub passcode: String,
    pub access_code: String,
    pub is_private: bool,
    pub teacher_id: Option<PrimaryKey>,
    pub color: String,
}

#[derive(Debug)]
pub struct NewTeacherSignup {
    pub license_key: String,
    pub email: String,
    pub password: String,
    pub username: String,
    pub display_name: String,
}

impl Auth {
    pub fn new(context: &StudioContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Signs a student in with their id and passcode
    pub async fn sign_in_student(
        &self,
        student_id: PrimaryKey,
        passcode: &str,
    ) -> Result<SessionData, AuthError> {
        let email = self.context.bridge.email_for(student_id);
        self.sign_in(email, passcode).await
    }

    /// Signs a teacher in with their real email and password
    pub async fn sign_in_teacher(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionData, AuthError> {
        // Shadow accounts can only be reached through the student path
        if self.context.bridge.is_shadow_email(email) {
            return Err(AuthError::InvalidCredentials);
        }

        self.sign_in(email.to_string(), password).await
    }

    async fn sign_in(&self, email: String, password: &str) -> Result<SessionData, AuthError> {
        let result = self
            .context
            .provider
            .sign_in(Credentials {
                email,
                password: password.to_string(),
            })
            .await;

        match result {
            Ok(session) => {
                info!("Principal {} signed in", session.principal_id());

                self.context.emit(StudioEvent::SignedIn {
                    principal_id: session.principal_id(),
                });

                Ok(session)
            }
            Err(ProviderError::InvalidCredentials) => {
                info!("Sign in refused");
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes the associated session, if it exists
    pub async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        Ok(self.context.provider.sign_out(token).await?)
    }

    /// Returns a session if it exists
    pub async fn session(&self, token: &str) -> Result<SessionData, AuthError> {
        Ok(self.context.provider.session(token).await?)
    }

    /// Derives the role of a session from table membership, teachers first
    pub async fn resolve_role(&self, session: &SessionData) -> Result<Role, DatabaseError> {
        let id = session.principal_id();

        match self.context.database.teacher_by_id(id).await {
            Ok(teacher) => return Ok(Role::Teacher(teacher)),
            Err(e) if !e.is_not_found() => return Err(e),
            Err(_) => {}
        }

        match self.context.database.student_by_id(id).await {
            Ok(student) => Ok(Role::Student(student)),
            Err(e) if e.is_not_found() => Ok(Role::None),
            Err(e) => Err(e),
        }
    }

    /// Fails if the teacher can't take on another student
    pub async fn ensure_capacity(&self, teacher_id: PrimaryKey) -> Result<(), AuthError> {
        let teacher = self.context.database.teacher_by_id(teacher_id).await?;
        let count = self.context.database.count_students(teacher_id).await?;

        if count >= teacher.max_students {
            return Err(AuthError::CapacityReached {
                max: teacher.max_students,
            });
        }

        Ok(())
    }

    /// Creates a shadow account and a student profile
    pub async fn register_student(
        &self,
        signup: NewStudentSignup,
    ) -> Result<StudentData, AuthError> {
        if !is_numeric_code(&signup.passcode) || !is_numeric_code(&signup.access_code) {
            return Err(AuthError::Invalid("Passcode and access code must be 4 to 8 digits"));
        }

        if !is_valid_color(&signup.color) {
            return Err(AuthError::Invalid("Color must be a hex color"));
        }

        if let Some(teacher_id) = signup.teacher_id {
            self.ensure_capacity(teacher_id).await?;
        }

        let requested_id = Uuid::new_v4();

        let account = self
            .context
            .provider
            .create_account(NewAccount {
                requested_id: Some(requested_id),
                email: self.context.bridge.email_for(requested_id),
                password: signup.passcode,
            })
            .await?;

        // The provider decides the id, everything from here on uses what it returned
        let id = account.id;

        if id != requested_id {
            warn!(
                "Provider assigned {} instead of requested {}, re-deriving email",
                id, requested_id
            );

            let email = self.context.bridge.email_for(id);

            if let Err(e) = self.context.provider.update_email(id, email).await {
                self.discard_account(id).await;
                return Err(e.into());
            }
        }

        let created = self
            .context
            .database
            .create_student(NewStudent {
                id,
                display_name: signup.display_name,
                access_code: signup.access_code,
                is_private: signup.is_private,
                teacher_id: signup.teacher_id,
                color: signup.color,
            })
            .await;

        let student = match created {
            Ok(student) => student,
            Err(e) => {
                error!("Could not create student profile for {}: {}", id, e);
                self.discard_account(id).await;
                return Err(e.into());
            }
        };

        info!("Student {} registered", student.id);

        self.context.emit(StudioEvent::StudentRegistered {
            student_id: student.id,
            teacher_id: student.teacher_id,
        });

        Ok(student)
    }

    /// Redeems a one-time license key, creating a teacher account and profile
    pub async fn redeem_license(&self, signup: NewTeacherSignup) -> Result<TeacherData, AuthError> {
        if !is_valid_username(&signup.username) {
            return Err(AuthError::Invalid(
                "Username must be 3 to 32 lowercase letters, digits or dashes",
            ));
        }

        if signup.password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Invalid("Password must be at least 8 characters"));
        }

        if self.context.bridge.is_shadow_email(&signup.email) {
            return Err(AuthError::Invalid("This email can't be used"));
        }

        let code = self
            .context
            .database
            .subscription_code(&signup.license_key)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => AuthError::InvalidLicense,
                e => AuthError::Db(e),
            })?;

        if code.used {
            return Err(AuthError::LicenseUsed);
        }

        let account = self
            .context
            .provider
            .create_account(NewAccount {
                requested_id: None,
                email: signup.email,
                password: signup.password,
            })
            .await?;

        let created = self
            .context
            .database
            .create_teacher(NewTeacher {
                id: account.id,
                username: signup.username,
                display_name: signup.display_name,
                tier: code.tier,
                max_students: code.max_students,
            })
            .await;

        let teacher = match created {
            Ok(teacher) => teacher,
            Err(e) => {
                error!("Could not create teacher profile for {}: {}", account.id, e);
                self.discard_account(account.id).await;
                return Err(e.into());
            }
        };

        let claimed = self
            .context
            .database
            .claim_subscription_code(&code.code, teacher.id)
            .await;

        match claimed {
            Ok(_) => {}
            // Another redemption claimed the key while this one was in flight
            Err(DatabaseError::Conflict { .. }) => {
                warn!("License key was claimed concurrently, undoing teacher {}", teacher.id);

                if let Err(e) = self.context.database.delete_teacher(teacher.id).await {
                    error!("Could not delete teacher {}: {}", teacher.id, e);
                }

                self.discard_account(teacher.id).await;
                return Err(AuthError::LicenseUsed);
            }
            // The teacher exists and keeps the studio, the key is not retried
            Err(e) => {
                warn!(
                    "Could not mark license key as used by teacher {}: {}",
                    teacher.id, e
                );
            }
        }

        info!("Teacher {} registered", teacher.username);

        self.context.emit(StudioEvent::TeacherRegistered {
            teacher_id: teacher.id,
            tier: teacher.tier,
        });

        Ok(teacher)
    }

    /// Changes the password of a teacher, or the passcode of a student
    pub async fn change_password(
        &self,
        session: &SessionData,
        new_password: String,
    ) -> Result<(), AuthError> {
        let is_student = self.context.bridge.is_shadow_email(&session.account.email);

        if is_student && !is_numeric_code(&new_password) {
            return Err(AuthError::Invalid("Passcode must be 4 to 8 digits"));
        }

        if !is_student && new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Invalid("Password must be at least 8 characters"));
        }

        self.context
            .provider
            .update_password(session.principal_id(), new_password)
            .await?;

        Ok(())
    }

    /// Changes the email of a teacher. Student emails are derived and can't change.
    pub async fn change_email(&self, session: &SessionData, email: String) -> Result<(), AuthError> {
        if self.context.bridge.is_shadow_email(&session.account.email) {
            return Err(AuthError::NotPermitted);
        }

        if self.context.bridge.is_shadow_email(&email) {
            return Err(AuthError::Invalid("This email can't be used"));
        }

        self.context
            .provider
            .update_email(session.principal_id(), email)
            .await?;

        Ok(())
    }

    /// Deletes a provider account nothing references anymore
    async fn discard_account(&self, account_id: PrimaryKey) {
        match self.context.provider.delete_account(account_id).await {
            Ok(_) => info!("Rolled back account {}", account_id),
            Err(e) => {
                error!("Could not roll back account {}: {}", account_id, e);

                self.context.emit(StudioEvent::Orphaned {
                    resource: "account",
                    identifier: account_id.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::{AuthError, NewStudentSignup, NewTeacherSignup, Role};
    use crate::{
        test_util::{student_signup, studio, studio_with_provider, teacher_signup},
        AccountData, ArcedDatabase, Credentials, IdentityProvider, MemoryDatabase, NewAccount,
        NewStudent, NewSubscriptionCode, PasswordProvider, PrimaryKey, ProviderError,
        SessionData, SubscriptionTier,
    };

    #[tokio::test]
    async fn student_signs_in_with_synthesized_email() {
        let studio = studio();
        let student = studio
            .auth
            .register_student(student_signup("4821", None))
            .await
            .unwrap();

        let session = studio.auth.sign_in_student(student.id, "4821").await.unwrap();

        assert_eq!(session.principal_id(), student.id);
        assert_eq!(
            session.account.email,
            format!("{}@student.studiocard.local", student.id)
        );

        let wrong = studio.auth.sign_in_student(student.id, "0000").await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn unknown_student_gets_the_same_error_as_wrong_passcode() {
        let studio = studio();
        let result = studio.auth.sign_in_student(Uuid::new_v4(), "4821").await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn teachers_cannot_sign_in_through_shadow_emails() {
        let studio = studio();
        let student = studio
            .auth
            .register_student(student_signup("4821", None))
            .await
            .unwrap();

        for email in [
            format!("{}@student.studiocard.local", student.id),
            format!("{}@STUDENT.studiocard.local", student.id),
        ] {
            let result = studio.auth.sign_in_teacher(&email, "4821").await;
            assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        }
    }

    #[tokio::test]
    async fn license_keys_are_single_use() {
        let studio = studio();
        studio.seed_code("KEY-1", SubscriptionTier::Studio).await;

        let teacher = studio
            .auth
            .redeem_license(teacher_signup("KEY-1", "rivera"))
            .await
            .unwrap();

        assert_eq!(teacher.tier, SubscriptionTier::Studio);
        assert_eq!(teacher.max_students, 25);

        let second = studio
            .auth
            .redeem_license(teacher_signup("KEY-1", "okafor"))
            .await;

        assert!(matches!(second, Err(AuthError::LicenseUsed)));

        let code = studio.database.subscription_code("KEY-1").await.unwrap();
        assert!(code.used);
        assert_eq!(code.used_by, Some(teacher.id));
        assert!(studio.database.teacher_by_username("okafor").await.is_err());

        // The losing signup left no account behind
        let orphan = studio
            .auth
            .sign_in_teacher("okafor@example.com", "long enough password")
            .await;
        assert!(matches!(orphan, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn concurrent_redemptions_leave_exactly_one_teacher() {
        let studio = studio();
        studio.seed_code("KEY-1", SubscriptionTier::Free).await;

        let (first, second) = tokio::join!(
            studio.auth.redeem_license(teacher_signup("KEY-1", "rivera")),
            studio.auth.redeem_license(teacher_signup("KEY-1", "okafor")),
        );

        let results = [first, second];
        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();

        assert_eq!(winners.len(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AuthError::LicenseUsed))));

        let rivera = studio.database.teacher_by_username("rivera").await.is_ok();
        let okafor = studio.database.teacher_by_username("okafor").await.is_ok();
        assert!(rivera ^ okafor);

        let code = studio.database.subscription_code("KEY-1").await.unwrap();
        assert_eq!(code.used_by, Some(winners[0].id));
    }

    #[tokio::test]
    async fn unknown_license_is_rejected_before_creating_anything() {
        let studio = studio();
        let result = studio
            .auth
            .redeem_license(teacher_signup("NOPE", "rivera"))
            .await;

        assert!(matches!(result, Err(AuthError::InvalidLicense)));

        let sign_in = studio
            .auth
            .sign_in_teacher("rivera@example.com", "long enough password")
            .await;
        assert!(sign_in.is_err());
    }

    #[tokio::test]
    async fn failed_teacher_insert_rolls_back_the_account() {
        let studio = studio();
        studio.seed_code("KEY-1", SubscriptionTier::Free).await;
        studio.seed_code("KEY-2", SubscriptionTier::Free).await;

        studio
            .auth
            .redeem_license(teacher_signup("KEY-1", "rivera"))
            .await
            .unwrap();

        // Same username, different email
        let result = studio
            .auth
            .redeem_license(NewTeacherSignup {
                email: "someone.else@example.com".to_string(),
                ..teacher_signup("KEY-2", "rivera")
            })
            .await;

        assert!(matches!(result, Err(AuthError::Db(_))));

        let sign_in = studio
            .auth
            .sign_in_teacher("someone.else@example.com", "long enough password")
            .await;
        assert!(matches!(sign_in, Err(AuthError::InvalidCredentials)));

        // The key wasn't burned by the failed attempt
        let code = studio.database.subscription_code("KEY-2").await.unwrap();
        assert!(!code.used);
    }

    /// A provider that ignores the requested id and assigns its own
    struct ReassigningProvider {
        inner: PasswordProvider,
        assigned: PrimaryKey,
    }

    #[async_trait]
    impl IdentityProvider for ReassigningProvider {
        async fn create_account(
            &self,
            new_account: NewAccount,
        ) -> Result<AccountData, ProviderError> {
            self.inner
                .create_account(NewAccount {
                    requested_id: Some(self.assigned),
                    ..new_account
                })
                .await
        }

        async fn sign_in(&self, credentials: Credentials) -> Result<SessionData, ProviderError> {
            self.inner.sign_in(credentials).await
        }

        async fn sign_out(&self, token: &str) -> Result<(), ProviderError> {
            self.inner.sign_out(token).await
        }

        async fn session(&self, token: &str) -> Result<SessionData, ProviderError> {
            self.inner.session(token).await
        }

        async fn delete_account(&self, account_id: PrimaryKey) -> Result<(), ProviderError> {
            self.inner.delete_account(account_id).await
        }

        async fn update_email(
            &self,
            account_id: PrimaryKey,
            email: String,
        ) -> Result<AccountData, ProviderError> {
            self.inner.update_email(account_id, email).await
        }

        async fn update_password(
            &self,
            account_id: PrimaryKey,
            password: String,
        ) -> Result<AccountData, ProviderError> {
            self.inner.update_password(account_id, password).await
        }
    }

    fn reassigning(db: &ArcedDatabase, assigned: PrimaryKey) -> Arc<dyn IdentityProvider> {
        Arc::new(ReassigningProvider {
            inner: PasswordProvider::new(db, 7),
            assigned,
        })
    }

    #[tokio::test]
    async fn trusts_the_id_the_provider_assigned() {
        let db: ArcedDatabase = Arc::new(MemoryDatabase::new());
        let assigned = Uuid::new_v4();
        let studio = studio_with_provider(&db, reassigning(&db, assigned));

        let student = studio
            .auth
            .register_student(student_signup("4821", None))
            .await
            .unwrap();

        assert_eq!(student.id, assigned);

        let account = db.account_by_id(assigned).await.unwrap();
        assert_eq!(
            account.email,
            format!("{assigned}@student.studiocard.local")
        );

        let session = studio.auth.sign_in_student(assigned, "4821").await.unwrap();
        assert_eq!(session.principal_id(), assigned);
    }

    #[tokio::test]
    async fn failed_student_insert_rolls_back_the_account() {
        let db: ArcedDatabase = Arc::new(MemoryDatabase::new());
        let assigned = Uuid::new_v4();
        let studio = studio_with_provider(&db, reassigning(&db, assigned));

        // A leftover profile occupies the id the provider is about to hand out
        db.create_student(NewStudent {
            id: assigned,
            display_name: "Leftover".to_string(),
            access_code: "2468".to_string(),
            is_private: false,
            teacher_id: None,
            color: "#aabbcc".to_string(),
        })
        .await
        .unwrap();

        let result = studio
            .auth
            .register_student(student_signup("1357", None))
            .await;

        assert!(matches!(result, Err(AuthError::Db(_))));

        let sign_in = studio.auth.sign_in_student(assigned, "1357").await;
        assert!(matches!(sign_in, Err(AuthError::InvalidCredentials)));
        assert!(db.account_by_id(assigned).await.is_err());
    }

    #[tokio::test]
    async fn capacity_gate_rejects_before_the_data_layer() {
        let studio = studio();
        studio.seed_code("KEY-1", SubscriptionTier::Free).await;

        let teacher = studio
            .auth
            .redeem_license(teacher_signup("KEY-1", "rivera"))
            .await
            .unwrap();

        assert_eq!(teacher.max_students, 3);

        for passcode in ["1111", "2222", "3333"] {
            studio
                .auth
                .register_student(student_signup(passcode, Some(teacher.id)))
                .await
                .unwrap();
        }

        let fourth = studio
            .auth
            .register_student(student_signup("4444", Some(teacher.id)))
            .await;

        assert!(matches!(fourth, Err(AuthError::CapacityReached { max: 3 })));
        assert_eq!(studio.database.count_students(teacher.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn roles_come_from_table_membership() {
        let studio = studio();
        studio.seed_code("KEY-1", SubscriptionTier::Free).await;

        let teacher = studio
            .auth
            .redeem_license(teacher_signup("KEY-1", "rivera"))
            .await
            .unwrap();
        let student = studio
            .auth
            .register_student(student_signup("4821", None))
            .await
            .unwrap();

        let teacher_session = studio
            .auth
            .sign_in_teacher("rivera@example.com", "long enough password")
            .await
            .unwrap();
        let student_session = studio.auth.sign_in_student(student.id, "4821").await.unwrap();

        let teacher_role = studio.auth.resolve_role(&teacher_session).await.unwrap();
        let student_role = studio.auth.resolve_role(&student_session).await.unwrap();

        assert!(matches!(teacher_role, Role::Teacher(t) if t.id == teacher.id));
        assert!(matches!(student_role, Role::Student(s) if s.id == student.id));

        // A valid session whose id is in neither table
        studio
            .provider()
            .create_account(NewAccount {
                requested_id: None,
                email: "visitor@example.com".to_string(),
                password: "long enough password".to_string(),
            })
            .await
            .unwrap();

        let visitor = studio
            .auth
            .sign_in_teacher("visitor@example.com", "long enough password")
            .await
            .unwrap();

        assert!(matches!(
            studio.auth.resolve_role(&visitor).await.unwrap(),
            Role::None
        ));
    }

    #[tokio::test]
    async fn passcodes_change_but_student_emails_do_not() {
        let studio = studio();
        let student = studio
            .auth
            .register_student(student_signup("4821", None))
            .await
            .unwrap();
        let session = studio.auth.sign_in_student(student.id, "4821").await.unwrap();

        let not_numeric = studio
            .auth
            .change_password(&session, "password".to_string())
            .await;
        assert!(matches!(not_numeric, Err(AuthError::Invalid(_))));

        studio
            .auth
            .change_password(&session, "9753".to_string())
            .await
            .unwrap();
        assert!(studio.auth.sign_in_student(student.id, "9753").await.is_ok());

        let email = studio
            .auth
            .change_email(&session, "me@example.com".to_string())
            .await;
        assert!(matches!(email, Err(AuthError::NotPermitted)));
    }

    #[tokio::test]
    async fn rejects_invalid_signups() {
        let studio = studio();

        let bad_passcode = studio
            .auth
            .register_student(NewStudentSignup {
                passcode: "abcd".to_string(),
                ..student_signup("4821", None)
            })
            .await;
        assert!(matches!(bad_passcode, Err(AuthError::Invalid(_))));

        let bad_username = studio
            .auth
            .redeem_license(teacher_signup("KEY-1", "Not A Slug"))
            .await;
        assert!(matches!(bad_username, Err(AuthError::Invalid(_))));
    }

    #[tokio::test]
    async fn seeded_codes_carry_their_quota() {
        let studio = studio();

        let code = studio
            .database
            .create_subscription_code(NewSubscriptionCode {
                code: "ACADEMY".to_string(),
                tier: SubscriptionTier::Academy,
                max_students: 100,
            })
            .await
            .unwrap();

        assert!(!code.used);
        assert_eq!(code.max_students, 100);
    }
}
