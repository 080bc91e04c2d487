use serde::{Deserialize, Serialize};

/// A change observed in the document store.
///
/// Ids are store keys (vault-relative paths), e.g. `"Notes/Ideas.md"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    Created { id: String },
    Modified { id: String },
    Deleted { id: String },
    Renamed { old_id: String, new_id: String },
}

impl ChangeEvent {
    /// Keys whose index entries this event touches.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            ChangeEvent::Created { id }
            | ChangeEvent::Modified { id }
            | ChangeEvent::Deleted { id } => vec![id.as_str()],
            ChangeEvent::Renamed { old_id, new_id } => vec![old_id.as_str(), new_id.as_str()],
        }
    }

    /// True for events that require reading the document's content.
    pub fn needs_content(&self) -> bool {
        matches!(self, ChangeEvent::Created { .. } | ChangeEvent::Modified { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_touches_both_keys() {
        let ev = ChangeEvent::Renamed {
            old_id: "A.md".into(),
            new_id: "B.md".into(),
        };
        assert_eq!(ev.keys(), vec!["A.md", "B.md"]);
        assert!(!ev.needs_content());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let ev = ChangeEvent::Deleted { id: "A.md".into() };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "deleted", "id": "A.md"}));
    }
}
