use log::info;
use url::Url;

use crate::{StudioContext, StudioError, SubscriptionTier, TeacherData};

/// Sends teachers to the payment provider to upgrade their studio
pub struct Checkout {
    context: StudioContext,
}

impl Checkout {
    pub fn new(context: &StudioContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Returns where to send the teacher to pay for the tier.
    /// Only upgrades are possible.
    pub fn checkout_url(
        &self,
        teacher: &TeacherData,
        tier: SubscriptionTier,
    ) -> Result<Url, StudioError> {
        if tier <= teacher.tier {
            return Err(StudioError::Invalid("Only upgrades can be purchased"));
        }

        let mut url = self.context.config.checkout_url.clone();

        url.query_pairs_mut()
            .append_pair("teacher", &teacher.id.to_string())
            .append_pair("tier", tier.as_str())
            .append_pair(
                "students",
                &self.context.config.max_students(tier).to_string(),
            );

        info!(
            "Teacher {} is checking out {}",
            teacher.username,
            tier.as_str()
        );

        Ok(url)
    }
}

#[cfg(test)]
mod test {
    use crate::{test_util::studio, StudioError, SubscriptionTier};

    #[tokio::test]
    async fn only_upgrades_get_a_url() {
        let studio = studio();
        let (teacher, _) = studio.seed_teacher("rivera").await;

        assert_eq!(teacher.tier, SubscriptionTier::Studio);

        let url = studio
            .checkout
            .checkout_url(&teacher, SubscriptionTier::Academy)
            .unwrap();

        assert!(url.as_str().starts_with("https://checkout.studiocard.app/session?"));
        assert!(url
            .query_pairs()
            .any(|(k, v)| k == "tier" && v == "academy"));

        for tier in [SubscriptionTier::Free, SubscriptionTier::Studio] {
            assert!(matches!(
                studio.checkout.checkout_url(&teacher, tier),
                Err(StudioError::Invalid(_))
            ));
        }
    }
}
