use std::time::Duration;

use url::Url;

use crate::SubscriptionTier;

/// The configuration of the studio
#[derive(Debug, Clone)]
pub struct Config {
    /// The domain used for synthesized student emails
    pub student_email_domain: String,
    /// How long a session lasts after signing in
    pub session_duration_in_days: i64,
    /// How many times an upload is attempted before giving up
    pub upload_attempts: u32,
    /// Waited between uploads, multiplied by the attempt number
    pub upload_backoff: Duration,
    /// The bucket holding profile images and recordings
    pub storage_bucket: String,
    /// Where teachers are sent to pay for an upgrade
    pub checkout_url: Url,
}

impl Config {
    /// How many students a teacher on the given tier may have
    pub fn max_students(&self, tier: SubscriptionTier) -> u32 {
        match tier {
            SubscriptionTier::Free => 3,
            SubscriptionTier::Studio => 25,
            SubscriptionTier::Academy => 100,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Not a routable domain, these addresses never receive mail
            student_email_domain: "student.studiocard.local".to_string(),
            session_duration_in_days: 7,
            upload_attempts: 3,
            upload_backoff: Duration::from_millis(500),
            storage_bucket: "audio-tracks".to_string(),
            checkout_url: Url::parse("https://checkout.studiocard.app/session")
                .expect("default checkout url is valid"),
        }
    }
}
