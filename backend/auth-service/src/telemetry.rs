/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG`, defaulting to `auth_service=info,info`.
/// Returns `false` when a subscriber is already installed.
pub fn init_tracing(json: bool) -> bool {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.into());

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
            .is_ok()
    }
}

pub const DEFAULT_FILTER: &str = "auth_service=info,info";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        init_tracing(false);
        assert!(!init_tracing(true));
    }
}
