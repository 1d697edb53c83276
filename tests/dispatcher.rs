use std::sync::{Arc, Mutex};

use floodchat::services::directory::PresenceDirectory;
use floodchat::services::dispatcher::EventDispatcher;
use floodchat::{ChatMessage, ChatMessageContent, ChatPresence, ChatUser};
use uuid::Uuid;

#[test]
fn consumers_run_in_registration_order() {
    let mut dispatcher = EventDispatcher::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    for label in ["first", "second", "third"] {
        let calls = calls.clone();
        dispatcher.on_message_added(move |_| calls.lock().unwrap().push(label));
    }

    let message = ChatMessage::new(ChatUser::new(None), ChatMessageContent::from("hi"), None, None, None);
    dispatcher.message_added(&message);

    assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn unsubscribed_consumers_stop_receiving() {
    let mut dispatcher = EventDispatcher::new();
    let count = Arc::new(Mutex::new(0));
    let counter = count.clone();
    let id = dispatcher.on_presence_updated(move |_| *counter.lock().unwrap() += 1);

    let presence = ChatPresence::new(ChatUser::new(None));
    dispatcher.presence_updated(&presence);
    assert!(dispatcher.unsubscribe(id));
    dispatcher.presence_updated(&presence);

    assert_eq!(*count.lock().unwrap(), 1);
    assert!(!dispatcher.unsubscribe(id));
}

#[test]
fn lookup_chain_first_answer_wins() {
    let mut dispatcher = EventDispatcher::new();
    let target = Uuid::new_v4();

    dispatcher.on_identity_lookup(|_: Uuid| -> Option<ChatUser> { None });
    let first = dispatcher.on_identity_lookup(move |id: Uuid| {
        (id == target).then(|| ChatUser::with_id(id, Some("first".to_string())))
    });
    dispatcher.on_identity_lookup(move |id: Uuid| Some(ChatUser::with_id(id, Some("second".to_string()))));

    let found = dispatcher.directory().find_user(target).unwrap();
    assert_eq!(found.name.as_deref(), Some("first"));
    assert_eq!(dispatcher.directory().len(), 3);

    dispatcher.unsubscribe(first);
    let found = dispatcher.directory().find_user(target).unwrap();
    assert_eq!(found.name.as_deref(), Some("second"));
    assert!(dispatcher.directory().find_public_keys(target).is_none());
}

#[test]
fn presence_directory_keeps_the_newest_record() {
    let directory = PresenceDirectory::new();
    assert!(directory.is_empty());
    let mut user = ChatUser::new(Some("old".to_string()));
    user.logical_clock = 5;
    directory.observe(&ChatPresence::new(user.clone()));

    let mut stale = user.clone();
    stale.logical_clock = 3;
    stale.name = Some("stale".to_string());
    directory.observe(&ChatPresence::new(stale));
    assert_eq!(directory.presence(user.id).unwrap().user.name.as_deref(), Some("old"));

    let mut newer = user.clone();
    newer.logical_clock = 6;
    newer.name = Some("new".to_string());
    directory.observe(&ChatPresence::new(newer));
    assert_eq!(directory.presence(user.id).unwrap().user.name.as_deref(), Some("new"));

    directory.observe(&ChatPresence::new(ChatUser::new(None)));
    assert_eq!(directory.len(), 2);
    let nearby = directory.nearby();
    assert!(nearby[0].user.id < nearby[1].user.id);
}
