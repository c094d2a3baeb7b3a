// Out-of-band control messages from the page
// Author: kelexine (https://github.com/kelexine)

use serde::{Deserialize, Serialize};

/// Messages a page can post to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate a waiting gateway now instead of leaving it parked.
    SkipWaiting,
    /// Delete every cache store, live one included.
    ClearCache,
}

/// Replies sent back over the reply channel, when one was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlReply {
    CacheCleared,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let msg: ControlMessage = serde_json::from_str("\"SKIP_WAITING\"").unwrap();
        assert_eq!(msg, ControlMessage::SkipWaiting);
        let msg: ControlMessage = serde_json::from_str("\"CLEAR_CACHE\"").unwrap();
        assert_eq!(msg, ControlMessage::ClearCache);

        let reply = serde_json::to_value(ControlReply::CacheCleared).unwrap();
        assert_eq!(reply, serde_json::json!({ "type": "CACHE_CLEARED" }));
    }
}
