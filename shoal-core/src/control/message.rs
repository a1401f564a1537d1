/*
    message.rs - Control message wire format

    The original protocol routed messages through ad hoc string tags; here
    the message set is a closed enum dispatched by pattern matching, with
    serde_json as the wire encoding.
*/

use crate::catalog::{FileId, SnapshotEntry};
use crate::control::errors::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A message on the group control channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMessage {
    /// Broadcast by a newly-participating peer on its first membership
    /// callback. Carries no payload; the sender ignores its own echo.
    Join,

    /// Unicast reply from the designated responder to a joining peer:
    /// the full metadata mapping of the responder's catalog.
    CatalogSnapshot(HashMap<FileId, SnapshotEntry>),

    /// Broadcast when a peer registers a new shared file.
    FileAdd(SnapshotEntry),

    /// Broadcast when a peer unregisters a shared file.
    FileRemove(FileId),
}

impl ControlMessage {
    /// Encode for the group transport
    pub fn encode(&self) -> ControlResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ControlError::Encode(e.to_string()))
    }

    /// Decode an inbound payload
    pub fn decode(payload: &[u8]) -> ControlResult<Self> {
        serde_json::from_slice(payload).map_err(|e| ControlError::Decode(e.to_string()))
    }

    /// Message kind name, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::Join => "join",
            ControlMessage::CatalogSnapshot(_) => "catalog_snapshot",
            ControlMessage::FileAdd(_) => "file_add",
            ControlMessage::FileRemove(_) => "file_remove",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> SnapshotEntry {
        SnapshotEntry(
            FileId::new(id),
            "title".into(),
            "desc".into(),
            "tags".into(),
            64,
        )
    }

    #[test]
    fn test_encode_decode_all_kinds() {
        let mut map = HashMap::new();
        map.insert(FileId::new("a"), entry("a"));

        let messages = vec![
            ControlMessage::Join,
            ControlMessage::CatalogSnapshot(map),
            ControlMessage::FileAdd(entry("b")),
            ControlMessage::FileRemove(FileId::new("c")),
        ];

        for msg in messages {
            let bytes = msg.encode().unwrap();
            let back = ControlMessage::decode(&bytes).unwrap();
            assert_eq!(back, msg);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            ControlMessage::decode(b"not a message"),
            Err(ControlError::Decode(_))
        ));
        assert!(matches!(
            ControlMessage::decode(b"{\"Unknown\": 1}"),
            Err(ControlError::Decode(_))
        ));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ControlMessage::Join.kind(), "join");
        assert_eq!(
            ControlMessage::FileRemove(FileId::new("x")).kind(),
            "file_remove"
        );
    }
}
