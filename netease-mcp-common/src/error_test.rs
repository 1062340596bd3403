//! Property-based tests for error module.
//!
//! Error messages must carry enough context (endpoint, status) for a caller
//! to tell which gateway call failed.

use proptest::prelude::*;

use crate::error::{ConfigError, Error};

/// Generate valid HTTP status codes (100-599)
fn http_status_strategy() -> impl Strategy<Value = u16> {
    100u16..600u16
}

/// Generate gateway endpoint URLs
fn endpoint_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("http://[a-z]+:[0-9]{4}/[a-z]+(/[a-z]+)?")
        .unwrap()
        .prop_filter("endpoint must be non-empty", |s| !s.is_empty())
}

/// Generate error messages
fn message_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ]{1,100}"
}

/// Generate environment variable names
fn env_var_strategy() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9_]{2,30}"
}

proptest! {
    /// An API error names both the endpoint and the HTTP status.
    #[test]
    fn api_error_includes_endpoint_and_status(
        endpoint in endpoint_strategy(),
        status_code in http_status_strategy(),
        message in message_strategy()
    ) {
        let err = Error::api(&endpoint, status_code, &message);
        let err_string = err.to_string();

        prop_assert!(
            err_string.contains(&endpoint),
            "API error should include endpoint '{}' in message: {}",
            endpoint,
            err_string
        );
        prop_assert!(
            err_string.contains(&status_code.to_string()),
            "API error should include status code '{}' in message: {}",
            status_code,
            err_string
        );
        prop_assert_eq!(err.status_code(), Some(status_code));
    }

    /// Config errors name the offending variable and survive conversion.
    #[test]
    fn config_error_names_variable(name in env_var_strategy(), reason in message_strategy()) {
        let missing: Error = ConfigError::missing_env_var(&name).into();
        prop_assert!(missing.to_string().contains(&name));

        let invalid: Error = ConfigError::invalid_value(&name, &reason).into();
        let msg = invalid.to_string();
        prop_assert!(msg.contains(&name));
        prop_assert!(msg.contains(&reason));
    }

    /// Timeout errors report the configured duration.
    #[test]
    fn timeout_error_reports_seconds(secs in 1u64..10_000) {
        let msg = Error::timeout(secs).to_string();
        prop_assert!(msg.contains(&secs.to_string()));
    }
}
