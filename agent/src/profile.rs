//! An agent's own config entry: identity, skills, and visibility, read once
//! at startup per spec.md §4.3 point 1. Kept separate from [`config::AppConfig`]
//! (the ambient infra keys every component shares) since a worker's name,
//! category, and prompt are specific to that one binary's deployment.

use config::AppConfig;
use protocol::Skill;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("read agent profile: {0}")]
    Read(std::io::Error),
    #[error("parse agent profile toml: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// Opaque prompt text (spec.md §1: prompt strings are out of scope as
    /// content, carried here only as configuration data).
    pub system_prompt: String,
    pub url: String,
    #[serde(default)]
    pub expose: bool,
    #[serde(default)]
    pub visible_to: Option<Vec<String>>,
    #[serde(default)]
    pub skills: Vec<SkillEntry>,
    pub registry_url: String,
    #[serde(flatten)]
    pub app: AppConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SkillEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<SkillEntry> for Skill {
    fn from(e: SkillEntry) -> Self {
        Skill { id: e.id, name: e.name, description: e.description }
    }
}

impl AgentProfile {
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ProfileError> {
        let text = std::fs::read_to_string(path).map_err(ProfileError::Read)?;
        Ok(toml::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_agent_profile() {
        let profile = toml::from_str::<AgentProfile>(
            r#"
            name = "Scholar"
            category = "Scholar"
            description = "answers research questions"
            system_prompt = "you are a research assistant"
            url = "http://127.0.0.1:9001"
            expose = true
            visible_to = ["Hospital System"]
            registry_url = "http://127.0.0.1:8000"

            [[skills]]
            id = "lookup"
            name = "Literature lookup"

            [system]
            port = 9001
            keep_alive_interval_secs = 5
            keep_alive_threshold_secs = 15
            "#,
        )
        .unwrap();
        assert_eq!(profile.name, "Scholar");
        assert_eq!(profile.skills.len(), 1);
        assert_eq!(profile.app.system.port, 9001);
    }
}
