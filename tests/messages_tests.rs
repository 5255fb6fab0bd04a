// Wire-format tests for the live service messages

use parla_live::live::messages::{
    ClientMessage, MediaFrame, ResponseModality, ServerMessage, SessionSetup, TranscriptionConfig,
};

#[test]
fn test_setup_serialization() {
    let msg = ClientMessage::Setup(SessionSetup {
        response_modality: ResponseModality::Audio,
        voice: "Kore".to_string(),
        system_instruction: "Speak only French.".to_string(),
        transcription: TranscriptionConfig {
            input: true,
            output: true,
        },
    });

    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["setup"]["responseModality"], "AUDIO");
    assert_eq!(json["setup"]["voice"], "Kore");
    assert_eq!(json["setup"]["systemInstruction"], "Speak only French.");
    assert_eq!(json["setup"]["transcription"]["input"], true);
    assert_eq!(json["setup"]["transcription"]["output"], true);
}

#[test]
fn test_media_frame_serialization() {
    let msg = ClientMessage::Media(MediaFrame::pcm(16000, "AAAA".to_string()));

    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["media"]["mimeType"], "audio/pcm;rate=16000");
    assert_eq!(json["media"]["data"], "AAAA");
}

#[test]
fn test_media_frame_sample_rate_parsing() {
    assert_eq!(MediaFrame::pcm(24000, String::new()).sample_rate(), Some(24000));

    let no_rate = MediaFrame {
        mime_type: "audio/pcm".to_string(),
        data: String::new(),
    };
    assert_eq!(no_rate.sample_rate(), None);

    let garbled = MediaFrame {
        mime_type: "audio/pcm;rate=fast".to_string(),
        data: String::new(),
    };
    assert_eq!(garbled.sample_rate(), None);
}

#[test]
fn test_transcription_fragment_deserialization() {
    let json = r#"{"outputTranscription":{"text":"Bonjour"}}"#;
    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    assert!(matches!(
        msg,
        ServerMessage::OutputTranscription { ref text } if text == "Bonjour"
    ));

    let json = r#"{"inputTranscription":{"text":"Salut"}}"#;
    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    assert!(matches!(
        msg,
        ServerMessage::InputTranscription { ref text } if text == "Salut"
    ));
}

#[test]
fn test_audio_deserialization() {
    let json = r#"{"audio":{"mimeType":"audio/pcm;rate=24000","data":"UE9O"}}"#;
    let msg: ServerMessage = serde_json::from_str(json).unwrap();

    match msg {
        ServerMessage::Audio(frame) => {
            assert_eq!(frame.sample_rate(), Some(24000));
            assert_eq!(frame.data, "UE9O");
        }
        other => panic!("expected audio, got {other:?}"),
    }
}

#[test]
fn test_marker_events_deserialization() {
    let msg: ServerMessage = serde_json::from_str(r#""turnComplete""#).unwrap();
    assert!(matches!(msg, ServerMessage::TurnComplete));

    let msg: ServerMessage = serde_json::from_str(r#""interrupted""#).unwrap();
    assert!(matches!(msg, ServerMessage::Interrupted));
}

#[test]
fn test_error_deserialization() {
    let json = r#"{"error":{"message":"quota exceeded"}}"#;
    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    assert!(matches!(
        msg,
        ServerMessage::Error { ref message } if message == "quota exceeded"
    ));
}

#[test]
fn test_unrecognized_message_is_an_error() {
    let json = r#"{"heartbeat":{"at":12}}"#;
    assert!(serde_json::from_str::<ServerMessage>(json).is_err());
}
