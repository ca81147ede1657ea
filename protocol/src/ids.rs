//! Opaque identifiers used throughout the fabric.
//!
//! Every id is a random 128-bit value rendered as 32 lowercase hex characters —
//! unguessable, comparable, and cheap to pass across process boundaries.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

fn random_hex128() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(
            Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generates a fresh random id.
            pub fn new() -> Self {
                Self(random_hex128())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

opaque_id!(AgentId);
opaque_id!(UserId);
opaque_id!(TaskId);
opaque_id!(ContextId);
opaque_id!(ArtifactId);
opaque_id!(FileId);
opaque_id!(MessageId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_random_and_lowercase_hex() {
        let a = AgentId::new();
        let b = AgentId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn ids_roundtrip_through_json() {
        let id = TaskId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_str()));
        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
