use std::sync::Arc;

use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::warn;
use rand::rngs::OsRng;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    util::random_string, AccountData, ArcedDatabase, DatabaseError, NewAccountRow, NewSession,
    PrimaryKey, SessionData, UpdatedAccount,
};

pub type ArcedProvider = Arc<dyn IdentityProvider>;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Email or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("An account with email {0} already exists")]
    EmailTaken(String),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

/// An email/password identity provider.
/// Sessions issued here are the only thing that grants write access.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates an account with elevated privileges.
    /// The provider may ignore `requested_id`, so callers must use the returned id.
    async fn create_account(&self, new_account: NewAccount) -> Result<AccountData, ProviderError>;
    async fn sign_in(&self, credentials: Credentials) -> Result<SessionData, ProviderError>;
    async fn sign_out(&self, token: &str) -> Result<(), ProviderError>;
    /// Returns a session if it exists and hasn't expired
    async fn session(&self, token: &str) -> Result<SessionData, ProviderError>;
    async fn delete_account(&self, account_id: PrimaryKey) -> Result<(), ProviderError>;
    async fn update_email(
        &self,
        account_id: PrimaryKey,
        email: String,
    ) -> Result<AccountData, ProviderError>;
    async fn update_password(
        &self,
        account_id: PrimaryKey,
        password: String,
    ) -> Result<AccountData, ProviderError>;
}

#[derive(Debug)]
pub struct NewAccount {
    pub requested_id: Option<PrimaryKey>,
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// The built-in provider, storing argon2 hashed passwords in the database
pub struct PasswordProvider {
    db: ArcedDatabase,
    argon: Argon2<'static>,
    session_duration: Duration,
}

impl PasswordProvider {
    pub fn new(db: &ArcedDatabase, session_duration_in_days: i64) -> Self {
        Self {
            db: db.clone(),
            argon: Argon2::default(),
            session_duration: Duration::days(session_duration_in_days),
        }
    }

    fn hash(&self, password: &str) -> Result<String, ProviderError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ProviderError::HashError(e.to_string()))
    }

    async fn clear_expired(&self) {
        if let Err(e) = self.db.clear_expired_sessions().await {
            warn!("Could not clear expired sessions: {}", e);
        }
    }
}

#[async_trait]
impl IdentityProvider for PasswordProvider {
    async fn create_account(&self, new_account: NewAccount) -> Result<AccountData, ProviderError> {
        let hashed_password = self.hash(&new_account.password)?;

        self.db
            .create_account(NewAccountRow {
                id: new_account.requested_id.unwrap_or_else(Uuid::new_v4),
                email: new_account.email.clone(),
                password: hashed_password,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict { field: "email", .. } => {
                    ProviderError::EmailTaken(new_account.email)
                }
                e => ProviderError::Db(e),
            })
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<SessionData, ProviderError> {
        self.clear_expired().await;

        let account = self
            .db
            .account_by_email(&credentials.email)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => ProviderError::InvalidCredentials,
                err => ProviderError::Db(err),
            })?;

        let stored_password = PasswordHash::parse(&account.password, Encoding::default())
            .map_err(|e| ProviderError::HashError(e.to_string()))?;

        self.argon
            .verify_password(credentials.password.as_bytes(), &stored_password)
            .map_err(|_| ProviderError::InvalidCredentials)?;

        let new_session = NewSession {
            token: random_string(32),
            account_id: account.id,
            expires_at: Utc::now() + self.session_duration,
        };

        self.db
            .create_session(new_session)
            .await
            .map_err(ProviderError::Db)
    }

    async fn sign_out(&self, token: &str) -> Result<(), ProviderError> {
        self.db
            .delete_session_by_token(token)
            .await
            .map_err(ProviderError::Db)
    }

    async fn session(&self, token: &str) -> Result<SessionData, ProviderError> {
        let session = self
            .db
            .session_by_token(token)
            .await
            .map_err(ProviderError::Db)?;

        if session.expires_at <= Utc::now() {
            return Err(ProviderError::Db(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            }));
        }

        Ok(session)
    }

    async fn delete_account(&self, account_id: PrimaryKey) -> Result<(), ProviderError> {
        self.db
            .delete_account(account_id)
            .await
            .map_err(ProviderError::Db)
    }

    async fn update_email(
        &self,
        account_id: PrimaryKey,
        email: String,
    ) -> Result<AccountData, ProviderError> {
        self.db
            .update_account(UpdatedAccount {
                id: account_id,
                email: Some(email.clone()),
                password: None,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict { field: "email", .. } => ProviderError::EmailTaken(email),
                e => ProviderError::Db(e),
            })
    }

    async fn update_password(
        &self,
        account_id: PrimaryKey,
        password: String,
    ) -> Result<AccountData, ProviderError> {
        let hashed_password = self.hash(&password)?;

        self.db
            .update_account(UpdatedAccount {
                id: account_id,
                email: None,
                password: Some(hashed_password),
            })
            .await
            .map_err(ProviderError::Db)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::{Credentials, IdentityProvider, NewAccount, PasswordProvider, ProviderError};
    use crate::{ArcedDatabase, MemoryDatabase};

    fn provider() -> PasswordProvider {
        let db: ArcedDatabase = Arc::new(MemoryDatabase::new());
        PasswordProvider::new(&db, 7)
    }

    #[tokio::test]
    async fn honors_requested_id_and_signs_in() {
        let provider = provider();
        let requested = Uuid::new_v4();

        let account = provider
            .create_account(NewAccount {
                requested_id: Some(requested),
                email: "ada@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(account.id, requested);
        assert_ne!(account.password, "correct horse");

        let session = provider
            .sign_in(Credentials {
                email: "ada@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(session.principal_id(), requested);
        assert_eq!(session.token.len(), 32);

        let restored = provider.session(&session.token).await.unwrap();
        assert_eq!(restored.id, session.id);

        provider.sign_out(&session.token).await.unwrap();
        assert!(provider.session(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_the_same() {
        let provider = provider();

        provider
            .create_account(NewAccount {
                requested_id: None,
                email: "ada@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        let wrong_password = provider
            .sign_in(Credentials {
                email: "ada@example.com".to_string(),
                password: "battery staple".to_string(),
            })
            .await;

        let unknown_email = provider
            .sign_in(Credentials {
                email: "nobody@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await;

        assert!(matches!(wrong_password, Err(ProviderError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(ProviderError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn duplicate_emails_are_rejected() {
        let provider = provider();

        for expect_ok in [true, false] {
            let result = provider
                .create_account(NewAccount {
                    requested_id: None,
                    email: "ada@example.com".to_string(),
                    password: "correct horse".to_string(),
                })
                .await;

            assert_eq!(result.is_ok(), expect_ok);
        }
    }
}
