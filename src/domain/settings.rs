//! User settings, split into four domains that are updated independently.
//!
//! Updates carry only the fields that change; `UserSettings::apply` merges them one field
//! at a time.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Ar,
    En,
}

impl Language {
    /// Arabic renders right-to-left.
    pub fn is_rtl(self) -> bool {
        matches!(self, Language::Ar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfileVisibility {
    #[default]
    Public,
    Registered,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub language: Language,
    pub currency: String,
    pub theme: Theme,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: Language::default(),
            currency: "SAR".to_string(),
            theme: Theme::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SecuritySettings {
    pub two_factor_enabled: bool,
    pub login_alerts: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub email: bool,
    pub push: bool,
    pub sms: bool,
    pub new_message: bool,
    pub price_drop: bool,
    pub listing_updates: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            sms: false,
            new_message: true,
            price_drop: true,
            listing_updates: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacySettings {
    pub show_phone: bool,
    pub show_email: bool,
    pub profile_visibility: ProfileVisibility,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            show_phone: true,
            show_email: false,
            profile_visibility: ProfileVisibility::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserSettings {
    pub preferences: Preferences,
    pub security: SecuritySettings,
    pub notifications: NotificationSettings,
    pub privacy: PrivacySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PreferencesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SecurityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub two_factor_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_alerts: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NotificationsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_message: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_drop: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_updates: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PrivacyPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_phone: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_email: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_visibility: Option<ProfileVisibility>,
}

/// One settings domain's partial update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "changes", rename_all = "snake_case")]
pub enum SettingsUpdate {
    Preferences(PreferencesPatch),
    Security(SecurityPatch),
    Notifications(NotificationsPatch),
    Privacy(PrivacyPatch),
}

fn merge<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

impl UserSettings {
    pub fn apply(&mut self, update: SettingsUpdate) {
        match update {
            SettingsUpdate::Preferences(p) => {
                merge(&mut self.preferences.language, p.language);
                merge(&mut self.preferences.currency, p.currency);
                merge(&mut self.preferences.theme, p.theme);
            }
            SettingsUpdate::Security(p) => {
                merge(&mut self.security.two_factor_enabled, p.two_factor_enabled);
                merge(&mut self.security.login_alerts, p.login_alerts);
            }
            SettingsUpdate::Notifications(p) => {
                merge(&mut self.notifications.email, p.email);
                merge(&mut self.notifications.push, p.push);
                merge(&mut self.notifications.sms, p.sms);
                merge(&mut self.notifications.new_message, p.new_message);
                merge(&mut self.notifications.price_drop, p.price_drop);
                merge(&mut self.notifications.listing_updates, p.listing_updates);
            }
            SettingsUpdate::Privacy(p) => {
                merge(&mut self.privacy.show_phone, p.show_phone);
                merge(&mut self.privacy.show_email, p.show_email);
                merge(&mut self.privacy.profile_visibility, p.profile_visibility);
            }
        }
    }
}
