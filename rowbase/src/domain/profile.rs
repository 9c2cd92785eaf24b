use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-user profile row. The display name stays empty until onboarding
/// completes, which is what the session gate keys off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    #[serde(default)]
    pub display_name: String,
}

impl Profile {
    pub fn needs_onboarding(&self) -> bool {
        self.display_name.trim().is_empty()
    }
}

/// Upsert payload for the `profiles` table.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpsert {
    pub user_id: Uuid,
    pub display_name: String,
}

/// Per-user document branding. All fields are optional and named; the
/// renderer falls back field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branding {
    pub user_id: Uuid,
    pub business_name: Option<String>,
    pub tagline: Option<String>,
    pub accent_color: Option<String>,
    pub logo_path: Option<String>,
    pub footer_text: Option<String>,
}

/// Upsert payload for the `branding` table.
#[derive(Debug, Clone, Serialize)]
pub struct BrandingUpsert {
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_display_name_needs_onboarding() {
        let profile = Profile {
            user_id: Uuid::new_v4(),
            display_name: "   ".to_string(),
        };
        assert!(profile.needs_onboarding());
    }

    #[test]
    fn named_profile_is_ready() {
        let profile = Profile {
            user_id: Uuid::new_v4(),
            display_name: "Dana".to_string(),
        };
        assert!(!profile.needs_onboarding());
    }
}
