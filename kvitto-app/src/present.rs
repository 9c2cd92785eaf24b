use rowbase::AuthError;

pub const OFFLINE_MESSAGE: &str = "You're offline. Check your connection and try again.";

/// Whether a single error in a chain is a connectivity failure.
fn cause_is_offline(cause: &(dyn std::error::Error + 'static)) -> bool {
    if let Some(err) = cause.downcast_ref::<reqwest::Error>() {
        if err.is_connect() || err.is_timeout() {
            return true;
        }
    }
    if let Some(err) = cause.downcast_ref::<std::io::Error>() {
        use std::io::ErrorKind;
        if matches!(
            err.kind(),
            ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::NotConnected
                | ErrorKind::TimedOut
        ) {
            return true;
        }
    }
    false
}

/// Offline detection walks the whole source chain: transport errors arrive
/// wrapped in whatever domain error the failing layer produced.
pub fn is_offline(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause_is_offline(cause))
}

/// Specific strings for the auth cases the backend reports in prose.
pub fn auth_message(context: &str, err: &AuthError) -> String {
    match err {
        AuthError::InvalidCredentials => "That email or password is incorrect.".to_string(),
        AuthError::RateLimited => "Too many attempts. Wait a moment and try again.".to_string(),
        AuthError::AlreadyRegistered => {
            "An account with that email already exists. Try signing in.".to_string()
        }
        AuthError::WeakPassword => {
            "Please choose a stronger password (at least 8 characters).".to_string()
        }
        AuthError::EmailNotConfirmed => {
            "Please confirm your email first. Check your inbox for the link.".to_string()
        }
        AuthError::Transport(inner) if inner.is_connect() || inner.is_timeout() => {
            OFFLINE_MESSAGE.to_string()
        }
        other => format!("{}: {}", context, other),
    }
}

/// Map any flow failure to the one string shown to the user. Offline wins,
/// then the auth-specific strings, then `"<context>: <raw message>"`.
pub fn friendly(context: &str, err: &anyhow::Error) -> String {
    if is_offline(err) {
        return OFFLINE_MESSAGE.to_string();
    }
    if let Some(auth) = err.downcast_ref::<AuthError>() {
        return auth_message(context, auth);
    }
    format!("{}: {}", context, err)
}

/// Interaction-layer validation: submission is blocked rather than failing
/// at runtime.
pub fn validate_email(raw: &str) -> bool {
    let raw = raw.trim();
    let mut parts = raw.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    !domain.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

pub fn require_nonempty(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn offline_chain() -> anyhow::Error {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "no route");
        anyhow::Error::new(io)
            .context("fetching invoices")
            .context("loading the invoice list")
    }

    #[test]
    fn offline_is_found_deep_in_a_chain() {
        assert!(is_offline(&offline_chain()));
    }

    #[test]
    fn ordinary_errors_are_not_offline() {
        let err = anyhow::anyhow!("row not found");
        assert!(!is_offline(&err));
    }

    #[test]
    fn offline_replaces_the_raw_error() {
        assert_eq!(friendly("Loading invoices failed", &offline_chain()), OFFLINE_MESSAGE);
    }

    #[test]
    fn auth_errors_map_to_specific_strings() {
        let err = anyhow::Error::new(AuthError::InvalidCredentials);
        assert_eq!(
            friendly("Sign in failed", &err),
            "That email or password is incorrect."
        );
    }

    #[test]
    fn unmatched_errors_fall_back_to_context_and_message() {
        let err = anyhow::anyhow!("row not found");
        assert_eq!(
            friendly("Loading invoices failed", &err),
            "Loading invoices failed: row not found"
        );
    }

    #[test]
    fn unmatched_auth_errors_keep_the_backend_message() {
        let err = AuthError::Backend {
            status: 500,
            message: "database exploded".to_string(),
        };
        assert_eq!(
            auth_message("Sign in failed", &err),
            "Sign in failed: AuthError (500): database exploded"
        );
    }

    #[test]
    fn email_validation_accepts_the_usual_shape() {
        assert!(validate_email("dana@example.com"));
        assert!(validate_email("  dana@example.com  "));
    }

    #[test]
    fn email_validation_rejects_malformed_input() {
        assert!(!validate_email("danaexample.com"));
        assert!(!validate_email("dana@@example.com"));
        assert!(!validate_email("@example.com"));
        assert!(!validate_email("dana@example"));
        assert!(!validate_email("dana@.example.com"));
    }

    #[test]
    fn nonempty_requirement_trims() {
        assert_eq!(require_nonempty("  hi  "), Some("hi"));
        assert_eq!(require_nonempty("   "), None);
    }
}
