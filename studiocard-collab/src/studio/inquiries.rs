use log::info;

use crate::{util::is_valid_email, InquiryData, NewInquiry, StudioContext};

use super::StudioError;

const MAX_MESSAGE_LENGTH: usize = 5000;

/// Messages from the contact form
pub struct Inquiries {
    context: StudioContext,
}

impl Inquiries {
    pub fn new(context: &StudioContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn submit(&self, inquiry: NewInquiry) -> Result<InquiryData, StudioError> {
        if inquiry.name.trim().is_empty() {
            return Err(StudioError::Invalid("Name can't be empty"));
        }

        if !is_valid_email(&inquiry.email) {
            return Err(StudioError::Invalid("Email is not valid"));
        }

        if inquiry.message.trim().is_empty() || inquiry.message.len() > MAX_MESSAGE_LENGTH {
            return Err(StudioError::Invalid(
                "Message must be between 1 and 5000 characters",
            ));
        }

        let inquiry = self.context.database.create_inquiry(inquiry).await?;
        info!("Received inquiry {}", inquiry.id);

        Ok(inquiry)
    }
}

#[cfg(test)]
mod test {
    use crate::{test_util::studio, NewInquiry, StudioError};

    fn inquiry(email: &str, message: &str) -> NewInquiry {
        NewInquiry {
            name: "Sam".to_string(),
            email: email.to_string(),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn stores_valid_inquiries() {
        let studio = studio();

        let stored = studio
            .inquiries
            .submit(inquiry("sam@example.com", "Do you teach viola?"))
            .await
            .unwrap();

        assert_eq!(stored.message, "Do you teach viola?");
    }

    #[tokio::test]
    async fn rejects_invalid_inquiries() {
        let studio = studio();

        for (email, message) in [("sam", "Hello"), ("sam@example.com", "  ")] {
            let result = studio.inquiries.submit(inquiry(email, message)).await;
            assert!(matches!(result, Err(StudioError::Invalid(_))));
        }
    }
}
