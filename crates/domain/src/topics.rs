//! Pub/sub topic layout.

use serde::{Deserialize, Serialize};

/// Prefixes from which every topic is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicNaming {
    /// Root of the per-device shadow topics.
    pub shadow_prefix: String,
    /// Root of the per-workspace telemetry topics.
    pub telemetry_prefix: String,
}

impl Default for TopicNaming {
    fn default() -> Self {
        Self {
            shadow_prefix: "$aws/things".to_string(),
            telemetry_prefix: "pczs".to_string(),
        }
    }
}

/// The three shadow topics of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowTopics {
    /// Outbound reported and desired updates.
    pub update: String,
    /// Broker acknowledgment of an accepted update.
    pub accepted: String,
    /// Inbound desired-state deltas.
    pub delta: String,
}

impl TopicNaming {
    #[must_use]
    pub fn shadow_topics(&self, thing_name: &str) -> ShadowTopics {
        let update = format!("{}/{thing_name}/shadow/update", self.shadow_prefix);
        ShadowTopics {
            accepted: format!("{update}/accepted"),
            delta: format!("{update}/delta"),
            update,
        }
    }

    #[must_use]
    pub fn telemetry_topic(&self, workspace_id: &str) -> String {
        format!("{}/{workspace_id}/telemetry", self.telemetry_prefix)
    }

    /// Single-level wildcard filter matching every workspace's telemetry.
    #[must_use]
    pub fn telemetry_filter(&self) -> String {
        format!("{}/+/telemetry", self.telemetry_prefix)
    }

    /// Extract the workspace id from a concrete telemetry topic.
    #[must_use]
    pub fn workspace_of<'a>(&self, topic: &'a str) -> Option<&'a str> {
        let rest = topic.strip_prefix(self.telemetry_prefix.as_str())?;
        let rest = rest.strip_prefix('/')?;
        let workspace = rest.strip_suffix("/telemetry")?;
        (!workspace.is_empty() && !workspace.contains('/')).then_some(workspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_shadow_topics_under_prefix() {
        let topics = TopicNaming::default().shadow_topics("desk-sensor-1");
        assert_eq!(topics.update, "$aws/things/desk-sensor-1/shadow/update");
        assert_eq!(topics.accepted, "$aws/things/desk-sensor-1/shadow/update/accepted");
        assert_eq!(topics.delta, "$aws/things/desk-sensor-1/shadow/update/delta");
    }

    #[test]
    fn should_build_telemetry_topic_and_filter() {
        let naming = TopicNaming::default();
        assert_eq!(naming.telemetry_topic("desk-12"), "pczs/desk-12/telemetry");
        assert_eq!(naming.telemetry_filter(), "pczs/+/telemetry");
    }

    #[test]
    fn should_extract_workspace_from_telemetry_topic() {
        let naming = TopicNaming::default();
        assert_eq!(naming.workspace_of("pczs/desk-12/telemetry"), Some("desk-12"));
        assert_eq!(naming.workspace_of("pczs//telemetry"), None);
        assert_eq!(naming.workspace_of("pczs/a/b/telemetry"), None);
        assert_eq!(naming.workspace_of("other/desk-12/telemetry"), None);
        assert_eq!(naming.workspace_of("pczsx/desk-12/telemetry"), None);
    }

    #[test]
    fn should_deserialize_partial_naming_with_defaults() {
        let naming: TopicNaming = serde_json::from_str(r#"{"telemetry_prefix": "office"}"#).unwrap();
        assert_eq!(naming.shadow_prefix, "$aws/things");
        assert_eq!(naming.telemetry_topic("w"), "office/w/telemetry");
    }
}
