//! Media-stream wire protocol
//!
//! JSON frames exchanged with the telephony leg over its WebSocket. Inbound
//! frames announce the stream, carry caller audio, confirm playback marks,
//! and signal the end of the stream; outbound frames carry synthesized
//! audio, mark labels, and the clear directive used on barge-in.

use serde::{Deserialize, Serialize};

/// Inbound frame from the telephony leg
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum MediaStreamMessage {
    /// Connection-level handshake, no session content
    Connected,
    /// Media stream opened; carries the stream and call identifiers
    Start { start: StartMeta },
    /// One frame of caller audio
    Media { media: MediaPayload },
    /// The leg finished playing the audio chunk behind this mark
    Mark { mark: MarkMeta },
    /// Media stream ended
    Stop,
}

/// Stream identifiers from the `start` frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartMeta {
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    #[serde(rename = "callSid")]
    pub call_sid: String,
}

/// Base64-encoded media payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPayload {
    pub payload: String,
}

/// Mark label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkMeta {
    pub name: String,
}

/// Outbound frame to the telephony leg
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundFrame {
    /// Synthesized audio
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: MediaPayload,
    },
    /// Mark following an audio chunk; echoed back once played
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkMeta,
    },
    /// Abandon all queued audio
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

impl OutboundFrame {
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        OutboundFrame::Media {
            stream_sid: stream_sid.into(),
            media: MediaPayload {
                payload: payload.into(),
            },
        }
    }

    pub fn mark(stream_sid: impl Into<String>, name: impl Into<String>) -> Self {
        OutboundFrame::Mark {
            stream_sid: stream_sid.into(),
            mark: MarkMeta { name: name.into() },
        }
    }

    pub fn clear(stream_sid: impl Into<String>) -> Self {
        OutboundFrame::Clear {
            stream_sid: stream_sid.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start() {
        let json = r#"{"event":"start","sequenceNumber":"1","start":{"streamSid":"MZ1","callSid":"CA1"}}"#;
        let message: MediaStreamMessage = serde_json::from_str(json).unwrap();
        match message {
            MediaStreamMessage::Start { start } => {
                assert_eq!(start.stream_sid, "MZ1");
                assert_eq!(start.call_sid, "CA1");
            }
            other => panic!("expected start, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_media_and_mark() {
        let media: MediaStreamMessage =
            serde_json::from_str(r#"{"event":"media","media":{"payload":"AAAA"}}"#).unwrap();
        assert!(matches!(media, MediaStreamMessage::Media { .. }));

        let mark: MediaStreamMessage =
            serde_json::from_str(r#"{"event":"mark","sequenceNumber":"4","mark":{"name":"m-1"}}"#)
                .unwrap();
        match mark {
            MediaStreamMessage::Mark { mark } => assert_eq!(mark.name, "m-1"),
            other => panic!("expected mark, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_stop_with_extra_fields() {
        let json = r#"{"event":"stop","stop":{"accountSid":"AC1"}}"#;
        let message: MediaStreamMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(message, MediaStreamMessage::Stop));
    }

    #[test]
    fn test_outbound_frame_shapes() {
        let media = serde_json::to_value(OutboundFrame::media("MZ1", "AAAA")).unwrap();
        assert_eq!(media["event"], "media");
        assert_eq!(media["streamSid"], "MZ1");
        assert_eq!(media["media"]["payload"], "AAAA");

        let clear = serde_json::to_value(OutboundFrame::clear("MZ1")).unwrap();
        assert_eq!(clear["event"], "clear");
    }
}
