//! Message shapes for the Gemini Live bidi protocol.
//!
//! Only the slices of the protocol this tool touches are modeled: the setup
//! handshake, realtime audio input, and the server's transcription content.
//! Unknown fields in server messages are ignored.

use serde::{Deserialize, Serialize};

use crate::audio::AudioPayload;

/// Fixed instruction for the live model: transcribe verbatim, never respond.
pub const SYSTEM_INSTRUCTION: &str = "You are a professional audio transcriber. Your only task is to transcribe the user's speech exactly as spoken.\n\
1. Accurately detect the language (English, Hindi, Hinglish, etc.).\n\
2. Handle code-switching naturally (e.g. Hindi sentences with English words).\n\
3. Do not translate. Transcribe in the original language.\n\
4. Do not provide conversational responses or talk back. Only output the transcription.";

// ---- client -> server ----

#[derive(Debug, Serialize)]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    /// Must be present (even empty) for the service to transcribe input audio
    pub input_audio_transcription: InputAudioTranscription,
    pub system_instruction: Content,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// The protocol requires accepting AUDIO responses; the output is discarded
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct InputAudioTranscription {}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

// ---- server -> client ----

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMessage {
    pub setup_complete: Option<SetupComplete>,
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize)]
pub struct SetupComplete {}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    pub input_transcription: Option<InputTranscription>,
    pub turn_complete: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InputTranscription {
    pub text: Option<String>,
}

/// Build the setup handshake for a live session.
pub fn setup_message(model: &str) -> SetupMessage {
    SetupMessage {
        setup: Setup {
            model: model.to_string(),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
            },
            input_audio_transcription: InputAudioTranscription {},
            system_instruction: Content {
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
        },
    }
}

/// Wrap an encoded PCM frame as a realtime input message.
pub fn realtime_input(payload: AudioPayload) -> RealtimeInputMessage {
    RealtimeInputMessage {
        realtime_input: RealtimeInput {
            media_chunks: vec![MediaChunk {
                mime_type: payload.mime_type.to_string(),
                data: payload.data,
            }],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encode_pcm16;

    #[test]
    fn setup_message_carries_protocol_requirements() {
        let json = serde_json::to_value(setup_message("models/test-model")).unwrap();

        assert_eq!(json["setup"]["model"], "models/test-model");
        assert_eq!(
            json["setup"]["generationConfig"]["responseModalities"][0],
            "AUDIO"
        );
        // Present-but-empty object enables input transcription
        assert!(json["setup"]["inputAudioTranscription"].is_object());
        let instruction = json["setup"]["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap();
        assert!(instruction.contains("Do not translate"));
    }

    #[test]
    fn realtime_input_wraps_payload_with_mime_type() {
        let json = serde_json::to_value(realtime_input(encode_pcm16(&[0.0, 0.5]))).unwrap();

        let chunk = &json["realtimeInput"]["mediaChunks"][0];
        assert_eq!(chunk["mimeType"], "audio/pcm;rate=16000");
        assert!(!chunk["data"].as_str().unwrap().is_empty());
    }

    #[test]
    fn server_transcription_fragment_parses() {
        let msg: ServerMessage = serde_json::from_str(
            r#"{"serverContent":{"inputTranscription":{"text":"hello "},"turnComplete":false}}"#,
        )
        .unwrap();

        let content = msg.server_content.unwrap();
        assert_eq!(content.input_transcription.unwrap().text.unwrap(), "hello ");
        assert_eq!(content.turn_complete, Some(false));
    }

    #[test]
    fn setup_complete_parses_as_empty_object() {
        let msg: ServerMessage = serde_json::from_str(r#"{"setupComplete":{}}"#).unwrap();
        assert!(msg.setup_complete.is_some());
        assert!(msg.server_content.is_none());
    }

    #[test]
    fn unknown_server_fields_are_ignored() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"usageMetadata":{"tokens":12},"serverContent":{}}"#).unwrap();
        assert!(msg.server_content.is_some());
    }
}
