//! `Part`: the atomic unit of message/artifact content.
//!
//! A `FilePart`'s payload is either inline bytes or a reference into the file
//! store; the registry and the peer-invocation tool rewrite between the two
//! forms at the boundaries where each is needed (inline to cross the wire to
//! a peer, reference to avoid re-transmitting large blobs within one process).

use crate::ids::FileId;
use serde::{Deserialize, Serialize};

/// Either inline bytes (base64 on the wire) or a short reference to the file store.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilePayload {
    Inline {
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },
    Ref {
        file_id: FileId,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    File { mime_type: String, payload: FilePayload },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn file_ref(mime_type: impl Into<String>, file_id: FileId) -> Self {
        Part::File {
            mime_type: mime_type.into(),
            payload: FilePayload::Ref { file_id },
        }
    }

    pub fn file_inline(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Part::File {
            mime_type: mime_type.into(),
            payload: FilePayload::Inline { bytes },
        }
    }

    /// Text content of this part, if any (used to build interaction excerpts and tool-loop text).
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            Part::File { .. } => None,
        }
    }
}

/// Concatenates the text of all `TextPart`s with newlines, matching the
/// teacher's `'\n'.join(get_text_parts(parts))` interaction-excerpt convention.
pub fn concat_text_parts(parts: &[Part]) -> String {
    parts
        .iter()
        .filter_map(|p| p.as_text())
        .collect::<Vec<_>>()
        .join("\n")
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(bytes).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_text_parts_joins_text_only() {
        let parts = vec![
            Part::text("hello"),
            Part::file_inline("image/png", vec![1, 2, 3]),
            Part::text("world"),
        ];
        assert_eq!(concat_text_parts(&parts), "hello\nworld");
    }

    #[test]
    fn file_inline_roundtrips_through_json() {
        let part = Part::file_inline("image/png", vec![0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_string(&part).unwrap();
        let back: Part = serde_json::from_str(&json).unwrap();
        match back {
            Part::File { mime_type, payload: FilePayload::Inline { bytes } } => {
                assert_eq!(mime_type, "image/png");
                assert_eq!(bytes, vec![0xde, 0xad, 0xbe, 0xef]);
            }
            _ => panic!("expected inline file part"),
        }
    }

    #[test]
    fn file_ref_roundtrips_through_json() {
        let id = FileId::new();
        let part = Part::file_ref("image/jpeg", id.clone());
        let json = serde_json::to_string(&part).unwrap();
        let back: Part = serde_json::from_str(&json).unwrap();
        match back {
            Part::File { payload: FilePayload::Ref { file_id }, .. } => assert_eq!(file_id, id),
            _ => panic!("expected file ref part"),
        }
    }
}
