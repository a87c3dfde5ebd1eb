//! Maps students, who have no email, onto the email/password identity provider.
//!
//! A student's login email is derived from their id and is never entered by
//! anyone. Because ids are random v4 uuids used verbatim as the local part,
//! two students can never share an address.

use crate::PrimaryKey;

/// Returns the shadow account email for the given principal id
pub fn synthesize_email(id: PrimaryKey, domain: &str) -> String {
    format!("{id}@{domain}")
}

/// Synthesizes shadow account emails for a configured domain
#[derive(Debug, Clone)]
pub struct IdentityBridge {
    domain: String,
}

impl IdentityBridge {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    pub fn email_for(&self, id: PrimaryKey) -> String {
        synthesize_email(id, &self.domain)
    }

    /// Whether the email is a shadow account address rather than a real one.
    /// Domains are case insensitive.
    pub fn is_shadow_email(&self, email: &str) -> bool {
        email
            .trim()
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.eq_ignore_ascii_case(&self.domain))
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use uuid::Uuid;

    use super::{synthesize_email, IdentityBridge};

    const DOMAIN: &str = "student.studiocard.local";

    #[test]
    fn different_ids_never_collide() {
        let emails: HashSet<_> = (0..1000)
            .map(|_| synthesize_email(Uuid::new_v4(), DOMAIN))
            .collect();

        assert_eq!(emails.len(), 1000);
    }

    #[test]
    fn same_id_always_yields_same_email() {
        let bridge = IdentityBridge::new(DOMAIN);
        let id = Uuid::new_v4();

        assert_eq!(bridge.email_for(id), bridge.email_for(id));
        assert_eq!(bridge.email_for(id), format!("{id}@{DOMAIN}"));
    }

    #[test]
    fn recognizes_shadow_emails() {
        let bridge = IdentityBridge::new(DOMAIN);

        assert!(bridge.is_shadow_email(&bridge.email_for(Uuid::new_v4())));
        assert!(!bridge.is_shadow_email("teacher@example.com"));
    }

    #[test]
    fn shadow_domain_ignores_case() {
        let bridge = IdentityBridge::new(DOMAIN);
        let id = Uuid::new_v4();

        assert!(bridge.is_shadow_email(&format!("{id}@Student.StudioCard.LOCAL")));
        assert!(bridge.is_shadow_email(&format!(" {id}@student.studiocard.local ")));
    }
}
