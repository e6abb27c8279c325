//! Per-user comfort preferences held by the cloud side.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::settings::ComfortSettings;
use crate::time::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    pub workspace_id: String,
    #[serde(flatten)]
    pub settings: ComfortSettings,
    /// Server-assigned on save; absent for the default set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

impl UserPreferences {
    /// The documented default set for a user/workspace with nothing stored.
    #[must_use]
    pub fn defaults_for(user_id: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            workspace_id: workspace_id.into(),
            settings: ComfortSettings::default(),
            timestamp: None,
        }
    }
}

/// Preferences as submitted by a client; every field is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub preferred_temp: Option<f64>,
    #[serde(default)]
    pub temp_threshold: Option<f64>,
    #[serde(default)]
    pub preferred_humidity: Option<f64>,
    #[serde(default)]
    pub humidity_threshold: Option<f64>,
}

impl PreferencesRequest {
    /// Check presence of every field, then the settings invariants.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MissingField`] naming the first missing field, or
    /// the settings validation error.
    pub fn into_preferences(self, timestamp: Timestamp) -> Result<UserPreferences, ValidationError> {
        fn required<T>(value: Option<T>, name: &'static str) -> Result<T, ValidationError> {
            value.ok_or(ValidationError::MissingField(name))
        }

        let user_id = required(self.user_id.filter(|v| !v.is_empty()), "user_id")?;
        let workspace_id = required(self.workspace_id.filter(|v| !v.is_empty()), "workspace_id")?;
        let settings = ComfortSettings {
            preferred_temp: required(self.preferred_temp, "preferred_temp")?,
            temp_threshold: required(self.temp_threshold, "temp_threshold")?,
            preferred_humidity: required(self.preferred_humidity, "preferred_humidity")?,
            humidity_threshold: required(self.humidity_threshold, "humidity_threshold")?,
        };
        settings.validate()?;

        Ok(UserPreferences {
            user_id,
            workspace_id,
            settings,
            timestamp: Some(timestamp),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn full_request() -> PreferencesRequest {
        PreferencesRequest {
            user_id: Some("user_1".to_string()),
            workspace_id: Some("desk-12".to_string()),
            preferred_temp: Some(21.5),
            temp_threshold: Some(0.5),
            preferred_humidity: Some(45.0),
            humidity_threshold: Some(5.0),
        }
    }

    #[test]
    fn should_tag_defaults_with_ids() {
        let prefs = UserPreferences::defaults_for("user_1", "desk-12");
        assert_eq!(
            serde_json::to_value(&prefs).unwrap(),
            json!({
                "user_id": "user_1",
                "workspace_id": "desk-12",
                "preferred_temp": 23.0,
                "temp_threshold": 1.0,
                "preferred_humidity": 50.0,
                "humidity_threshold": 10.0
            })
        );
    }

    #[test]
    fn should_convert_complete_request_with_timestamp() {
        let now = crate::time::now();
        let prefs = full_request().into_preferences(now).unwrap();
        assert_eq!(prefs.settings.preferred_temp, 21.5);
        assert_eq!(prefs.timestamp, Some(now));
    }

    #[test]
    fn should_report_first_missing_field_in_declared_order() {
        let req = PreferencesRequest {
            temp_threshold: None,
            humidity_threshold: None,
            ..full_request()
        };
        assert_eq!(
            req.into_preferences(crate::time::now()),
            Err(ValidationError::MissingField("temp_threshold"))
        );

        let err = PreferencesRequest::default()
            .into_preferences(crate::time::now())
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("user_id"));
    }

    #[test]
    fn should_reject_negative_threshold() {
        let req = PreferencesRequest {
            humidity_threshold: Some(-3.0),
            ..full_request()
        };
        assert!(matches!(
            req.into_preferences(crate::time::now()),
            Err(ValidationError::NegativeThreshold { .. })
        ));
    }
}
