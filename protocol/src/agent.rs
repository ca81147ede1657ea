//! Agent graph node types: the registry's view of a worker or a user session.

use crate::ids::{AgentId, ContextId, TaskId};
use crate::message::Message;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Interaction {
    pub dst_id: AgentId,
    pub message_excerpt: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentNode {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub tasks: HashMap<TaskId, Task>,
    pub kind: AgentKind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentKind {
    Public {
        url: String,
        last_seen: u64,
        task_count: u32,
        expose: bool,
        /// `None` means visible to all categories.
        visible_to: Option<Vec<String>>,
    },
    User {
        conversations: HashMap<ContextId, Vec<Message>>,
    },
}

impl AgentNode {
    pub fn new_public(
        name: String,
        category: String,
        url: String,
        last_seen: u64,
        expose: bool,
        visible_to: Option<Vec<String>>,
    ) -> Self {
        Self {
            name,
            category,
            interactions: Vec::new(),
            tasks: HashMap::new(),
            kind: AgentKind::Public {
                url,
                last_seen,
                task_count: 0,
                expose,
                visible_to,
            },
        }
    }

    pub fn new_user(name: String) -> Self {
        Self {
            name,
            category: String::new(),
            interactions: Vec::new(),
            tasks: HashMap::new(),
            kind: AgentKind::User {
                conversations: HashMap::new(),
            },
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self.kind, AgentKind::Public { .. })
    }
}

/// Visibility law: `A` is visible to `R` iff same category, or `A` exposes
/// itself to all (`visible_to: None`) or to `R`'s category explicitly.
pub fn is_visible(requester_category: &str, target: &AgentNode) -> bool {
    if target.category == requester_category {
        return true;
    }
    if let AgentKind::Public { expose, visible_to, .. } = &target.kind {
        if *expose {
            return match visible_to {
                None => true,
                Some(cats) => cats.iter().any(|c| c == requester_category),
            };
        }
    }
    false
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Capabilities {
    pub streaming: bool,
}

/// The self-description a worker serves from its own URL; consumed during discovery.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub capabilities: Capabilities,
    pub skills: Vec<Skill>,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public(category: &str, expose: bool, visible_to: Option<Vec<String>>) -> AgentNode {
        AgentNode::new_public("A".into(), category.into(), "http://a".into(), 0, expose, visible_to)
    }

    #[test]
    fn same_category_always_visible_regardless_of_expose() {
        let target = public("X", false, None);
        assert!(is_visible("X", &target));
    }

    #[test]
    fn expose_with_null_visible_to_means_visible_to_all() {
        let target = public("Y", true, None);
        assert!(is_visible("X", &target));
    }

    #[test]
    fn expose_with_visible_to_restricts_to_listed_categories() {
        let target = public("Y", true, Some(vec!["Z".into()]));
        assert!(!is_visible("X", &target));
        assert!(is_visible("Z", &target));
    }

    #[test]
    fn not_exposed_and_different_category_is_invisible() {
        let target = public("Y", false, Some(vec!["Z".into()]));
        assert!(!is_visible("X", &target));
    }
}
