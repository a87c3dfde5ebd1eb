use std::future::Future;

use log::warn;

/// Applies a change to local state right away, then persists it.
/// If persisting fails the change is reverted and the error returned.
pub async fn optimistic<S, T, E, Fut>(
    state: &mut S,
    apply: impl FnOnce(&mut S),
    revert: impl FnOnce(&mut S),
    persist: Fut,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    apply(state);

    match persist.await {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("Reverting local change: {}", e);
            revert(state);
            Err(e)
        }
    }
}

#[cfg(test)]
mod test {
    use super::optimistic;

    #[tokio::test]
    async fn keeps_the_change_on_success() {
        let mut public = false;

        let result: Result<(), String> =
            optimistic(&mut public, |p| *p = true, |p| *p = false, async { Ok(()) }).await;

        assert!(result.is_ok());
        assert!(public);
    }

    #[tokio::test]
    async fn reverts_on_failure() {
        let mut public = false;

        let result: Result<(), String> = optimistic(
            &mut public,
            |p| *p = true,
            |p| *p = false,
            async { Err("network down".to_string()) },
        )
        .await;

        assert_eq!(result.unwrap_err(), "network down");
        assert!(!public);
    }
}
