use floodchat::domains::message::ChatMessageContent;
use floodchat::services::codec::{EnvelopeCodec, FORWARD_HOP_RESERVE};
use floodchat::{ChatMessage, ChatPresence, ChatUser, Envelope, FloodChatError};
use serde_json::{json, Value};
use uuid::Uuid;

#[test]
fn encodes_wire_field_names() {
    let codec = EnvelopeCodec::default();
    let author = ChatUser::new(Some("alice".to_string()));
    let envelope = Envelope::from_sender(author.id, 4).with_chat_messages(vec![ChatMessage::new(
        author.clone(),
        ChatMessageContent::from("hi"),
        None,
        None,
        None,
    )]);

    let raw = codec.encode(&envelope).unwrap();
    let value: Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(value["visitedUsers"], json!([author.id.to_string()]));
    assert_eq!(value["logicalClock"], json!(4));
    assert_eq!(value["addedChatMessages"][0]["content"], json!({"text": "hi"}));
    assert_eq!(value["addedChatMessages"][0]["author"]["name"], json!("alice"));
    // Empty lists stay off the wire.
    assert!(value.get("updatedPresences").is_none());
    assert!(value.get("deleteMessages").is_none());
}

#[test]
fn absent_and_null_lists_decode_as_empty() {
    let codec = EnvelopeCodec::default();
    let user = Uuid::new_v4();
    let raw = json!({
        "visitedUsers": [user.to_string().to_uppercase()],
        "addedChatMessages": null,
        "updatedPresences": [{"user": {"id": user, "logicalClock": 9}, "status": "away", "info": "brb"}],
        "logicalClock": 9
    })
    .to_string();

    let envelope = codec.decode(&raw).unwrap();

    assert!(envelope.has_visited(&user));
    assert!(envelope.added_chat_messages.is_empty());
    assert!(envelope.delete_messages.is_empty());
    assert_eq!(envelope.updated_presences.len(), 1);
    assert_eq!(envelope.updated_presences[0].info, "brb");
    assert_eq!(envelope.logical_clock, Some(9));
}

#[test]
fn decodes_what_it_encodes() {
    let codec = EnvelopeCodec::default();
    let user = ChatUser::new(Some("bob".to_string()));
    let envelope = Envelope::from_sender(user.id, 1).with_presences(vec![ChatPresence::new(user)]);

    let decoded = codec.decode(&codec.encode(&envelope).unwrap()).unwrap();

    assert_eq!(decoded, envelope);
}

#[test]
fn malformed_payloads_are_errors() {
    let codec = EnvelopeCodec::default();

    for raw in ["", "not json", "[1,2,3]", r#"{"visitedUsers": ["nope"]}"#, r#"{"logicalClock": -1}"#] {
        let result = codec.decode(raw);
        assert!(matches!(result, Err(FloodChatError::Serialization(_))), "{raw}");
    }
}

#[test]
fn oversized_payloads_are_rejected() {
    let codec = EnvelopeCodec::new(64);
    let author = ChatUser::new(None);
    let envelope = Envelope::from_sender(author.id, 1).with_chat_messages(vec![ChatMessage::new(
        author,
        ChatMessageContent::from("x".repeat(128)),
        None,
        None,
        None,
    )]);

    assert!(codec.encode_originated(&envelope).is_err());
    assert!(codec.encode(&envelope).is_ok());
    assert!(codec.decode(&" ".repeat(65)).is_err());
}

#[test]
fn originated_envelopes_leave_room_for_forwarding() {
    let codec = EnvelopeCodec::new(8192);
    let author = ChatUser::new(None);
    let mut message = ChatMessage::new(author.clone(), ChatMessageContent::from(""), None, None, None);
    let envelope_for = |message: &ChatMessage| {
        Envelope::from_sender(author.id, 1).with_chat_messages(vec![message.clone()])
    };
    let base = codec.encode(&envelope_for(&message)).unwrap().len();

    message.content = ChatMessageContent::from("y".repeat(codec.origination_budget() - base + 1));
    assert!(codec.encode_originated(&envelope_for(&message)).is_err());

    message.content = ChatMessageContent::from("y".repeat(codec.origination_budget() - base));
    let mut envelope = envelope_for(&message);
    assert_eq!(
        codec.encode_originated(&envelope).unwrap().len(),
        codec.origination_budget()
    );

    for _ in 0..FORWARD_HOP_RESERVE {
        envelope = envelope.forwarded_by(Uuid::new_v4());
    }
    let raw = codec.encode(&envelope).unwrap();
    assert_eq!(raw.len(), 8192);
    assert_eq!(codec.decode(&raw).unwrap(), envelope);
}
