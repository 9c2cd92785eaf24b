use url::Url;
use uuid::Uuid;

pub const SCHEME: &str = "kvitto";

/// Callbacks the OS hands back to the app over the custom URL scheme.
#[derive(Debug, Clone, PartialEq)]
pub enum DeepLink {
    /// Email-confirmation callback carrying the verification token.
    AuthConfirm { token_hash: String },
    /// Return from the payment platform's checkout page.
    PaymentReturn {
        invoice_id: Uuid,
        status: Option<String>,
    },
    Unrecognized(String),
}

impl DeepLink {
    pub fn parse(raw: &str) -> Self {
        let Ok(url) = Url::parse(raw) else {
            return DeepLink::Unrecognized(raw.to_string());
        };
        if url.scheme() != SCHEME {
            return DeepLink::Unrecognized(raw.to_string());
        }

        match (url.host_str(), url.path()) {
            (Some("auth"), "/confirm") => match query(&url, "token_hash") {
                Some(token_hash) => DeepLink::AuthConfirm { token_hash },
                None => DeepLink::Unrecognized(raw.to_string()),
            },
            (Some("payments"), "/return") => {
                let invoice_id = query(&url, "invoice").and_then(|v| v.parse().ok());
                match invoice_id {
                    Some(invoice_id) => DeepLink::PaymentReturn {
                        invoice_id,
                        status: query(&url, "status"),
                    },
                    None => DeepLink::Unrecognized(raw.to_string()),
                }
            }
            _ => DeepLink::Unrecognized(raw.to_string()),
        }
    }
}

fn query(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_confirmation_links_parse() {
        let link = DeepLink::parse("kvitto://auth/confirm?token_hash=abc123");
        assert_eq!(
            link,
            DeepLink::AuthConfirm {
                token_hash: "abc123".to_string()
            }
        );
    }

    #[test]
    fn payment_return_links_parse() {
        let id = Uuid::new_v4();
        let link = DeepLink::parse(&format!("kvitto://payments/return?invoice={id}&status=paid"));
        assert_eq!(
            link,
            DeepLink::PaymentReturn {
                invoice_id: id,
                status: Some("paid".to_string()),
            }
        );
    }

    #[test]
    fn foreign_schemes_are_unrecognized() {
        assert!(matches!(
            DeepLink::parse("https://example.com/auth/confirm?token_hash=x"),
            DeepLink::Unrecognized(_)
        ));
    }

    #[test]
    fn missing_required_params_are_unrecognized() {
        assert!(matches!(
            DeepLink::parse("kvitto://auth/confirm"),
            DeepLink::Unrecognized(_)
        ));
        assert!(matches!(
            DeepLink::parse("kvitto://payments/return?invoice=not-a-uuid"),
            DeepLink::Unrecognized(_)
        ));
    }

    #[test]
    fn unknown_routes_are_unrecognized() {
        assert!(matches!(
            DeepLink::parse("kvitto://something/else"),
            DeepLink::Unrecognized(_)
        ));
    }
}
