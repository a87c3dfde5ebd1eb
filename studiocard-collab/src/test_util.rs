use std::sync::Arc;

use crate::{
    ArcedDatabase, ArcedProvider, Config, MemoryDatabase, MemoryStorage,
    NewStudentSignup, NewSubscriptionCode, NewTeacherSignup, PrimaryKey, SessionData, Studio,
    StudentData, SubscriptionTier, TeacherData,
};

pub fn studio() -> Studio {
    let database: ArcedDatabase = Arc::new(MemoryDatabase::new());
    Studio::with_password_provider(Config::default(), database, Arc::new(MemoryStorage::new()))
}

pub fn studio_with_provider(database: &ArcedDatabase, provider: ArcedProvider) -> Studio {
    Studio::new(
        Config::default(),
        database.clone(),
        provider,
        Arc::new(MemoryStorage::new()),
    )
}

pub fn student_signup(passcode: &str, teacher_id: Option<PrimaryKey>) -> NewStudentSignup {
    NewStudentSignup {
        display_name: "Mira".to_string(),
        passcode: passcode.to_string(),
        access_code: "2468".to_string(),
        is_private: false,
        teacher_id,
        color: "#aabbcc".to_string(),
    }
}

pub fn teacher_signup(license_key: &str, username: &str) -> NewTeacherSignup {
    NewTeacherSignup {
        license_key: license_key.to_string(),
        email: format!("{username}@example.com"),
        password: "long enough password".to_string(),
        username: username.to_string(),
        display_name: "Ms. Rivera".to_string(),
    }
}

impl Studio {
    pub async fn seed_code(&self, code: &str, tier: SubscriptionTier) {
        self.database
            .create_subscription_code(NewSubscriptionCode {
                code: code.to_string(),
                tier,
                max_students: self.config().max_students(tier),
            })
            .await
            .unwrap();
    }

    /// Redeems a fresh key and signs the teacher in
    pub async fn seed_teacher(&self, username: &str) -> (TeacherData, SessionData) {
        let key = format!("KEY-{username}");
        self.seed_code(&key, SubscriptionTier::Studio).await;

        let teacher = self
            .auth
            .redeem_license(teacher_signup(&key, username))
            .await
            .unwrap();

        let session = self
            .auth
            .sign_in_teacher(&format!("{username}@example.com"), "long enough password")
            .await
            .unwrap();

        (teacher, session)
    }

    /// Registers a student and signs them in
    pub async fn seed_student(
        &self,
        passcode: &str,
        teacher_id: Option<PrimaryKey>,
    ) -> (StudentData, SessionData) {
        let student = self
            .auth
            .register_student(student_signup(passcode, teacher_id))
            .await
            .unwrap();

        let session = self
            .auth
            .sign_in_student(student.id, passcode)
            .await
            .unwrap();

        (student, session)
    }
}
