use std::collections::HashSet;

use cakeroom::relay::{
    ClientEvent, ConnectionId, OUTBOX_CAPACITY, Relay, RoomId, ServerEvent,
};
use serde_json::{Value, json};
use tokio::sync::mpsc::{self, Receiver};

struct Client {
    id: ConnectionId,
    rx: Receiver<ServerEvent>,
}

impl Client {
    fn connect(relay: &Relay) -> Client {
        let (tx, mut rx) = mpsc::channel(OUTBOX_CAPACITY);
        let id = relay.connect(tx, HashSet::new());
        assert_eq!(rx.try_recv().unwrap(), ServerEvent::Connected { id });
        Client { id, rx }
    }

    fn send(&self, relay: &Relay, frame: Value) {
        let event = ClientEvent::parse(&frame.to_string()).unwrap();
        relay.handle(self.id, event).unwrap();
    }

    /// Everything queued for this client, as it would appear on the wire.
    fn frames(&mut self) -> Vec<Value> {
        std::iter::from_fn(|| self.rx.try_recv().ok())
            .map(|event| serde_json::to_value(event).unwrap())
            .collect()
    }
}

fn join(room: &str, name: &str) -> Value {
    json!({ "event": "join-room", "data": { "roomCode": room, "userName": name } })
}

#[tokio::test]
async fn party_end_to_end() {
    let relay = Relay::new();
    let mut alice = Client::connect(&relay);
    let mut bob = Client::connect(&relay);

    alice.send(&relay, join("PARTY1", "Alice"));
    bob.send(&relay, join("party1", "Bob"));

    assert_eq!(
        alice.frames(),
        vec![json!({
            "event": "user-joined",
            "data": { "id": bob.id, "name": "Bob", "isHost": false }
        })]
    );
    assert!(bob.frames().is_empty());

    let chat = json!({
        "user": "Bob",
        "text": "where is the cake?",
        "timestamp": "2026-10-19T18:00:00Z"
    });
    bob.send(&relay, json!({ "event": "message", "data": chat }));
    let expected = vec![json!({ "event": "message", "data": chat })];
    assert_eq!(alice.frames(), expected);
    assert_eq!(bob.frames(), expected);

    alice.send(&relay, json!({ "event": "cut-cake", "data": "PARTY1" }));
    assert_eq!(alice.frames(), vec![json!({ "event": "cake-cut" })]);
    assert_eq!(bob.frames(), vec![json!({ "event": "cake-cut" })]);

    relay.disconnect(alice.id);
    assert_eq!(bob.frames(), vec![json!({ "event": "user-left", "data": alice.id })]);
    relay.disconnect(bob.id);

    let party = RoomId::new("PARTY1").unwrap();
    assert!(relay.members(&party).is_empty());
    assert_eq!(relay.room_count(), 0);
    assert_eq!(relay.connection_count(), 0);
}

#[tokio::test]
async fn video_call_handshake_is_relayed_blind() {
    let relay = Relay::new();
    let mut alice = Client::connect(&relay);
    let mut bob = Client::connect(&relay);
    alice.send(&relay, join("CALL01", "Alice"));
    bob.send(&relay, join("CALL01", "Bob"));
    alice.frames();

    let offer = json!({ "type": "offer", "sdp": "v=0\r\no=- 1 2 IN IP4 127.0.0.1\r\n" });
    alice.send(&relay, json!({ "event": "offer", "data": { "to": bob.id, "offer": offer } }));
    assert_eq!(
        bob.frames(),
        vec![json!({ "event": "offer", "data": { "from": alice.id, "offer": offer } })]
    );

    let answer = json!({ "type": "answer", "sdp": "v=0\r\n" });
    bob.send(&relay, json!({ "event": "answer", "data": { "to": alice.id, "answer": answer } }));
    assert_eq!(
        alice.frames(),
        vec![json!({ "event": "answer", "data": { "from": bob.id, "answer": answer } })]
    );

    let candidate = json!({
        "candidate": "candidate:0 1 UDP 2122252543 192.168.1.4 54400 typ host",
        "sdpMid": "0"
    });
    bob.send(
        &relay,
        json!({ "event": "ice-candidate", "data": { "to": alice.id, "candidate": candidate } }),
    );
    assert_eq!(
        alice.frames(),
        vec![json!({
            "event": "ice-candidate",
            "data": { "from": bob.id, "candidate": candidate }
        })]
    );
    assert!(bob.frames().is_empty());
}

#[tokio::test]
async fn rooms_are_isolated() {
    let relay = Relay::new();
    let mut alice = Client::connect(&relay);
    let mut bob = Client::connect(&relay);
    let mut carol = Client::connect(&relay);
    let mut dave = Client::connect(&relay);

    alice.send(&relay, join("ROOMAA", "Alice"));
    bob.send(&relay, join("ROOMAA", "Bob"));
    carol.send(&relay, join("ROOMBB", "Carol"));
    dave.send(&relay, join("ROOMBB", "Dave"));
    alice.frames();
    carol.frames();

    let a_chat = json!({
        "event": "message",
        "data": { "user": "Alice", "text": "A only", "timestamp": "t1" }
    });
    alice.send(&relay, a_chat.clone());
    carol.send(&relay, json!({ "event": "cut-cake", "data": "ROOMBB" }));

    assert_eq!(alice.frames(), vec![a_chat.clone()]);
    assert_eq!(bob.frames(), vec![a_chat]);
    assert_eq!(carol.frames(), vec![json!({ "event": "cake-cut" })]);
    assert_eq!(dave.frames(), vec![json!({ "event": "cake-cut" })]);
}

#[tokio::test]
async fn misbehaving_client_does_not_disturb_others() {
    let relay = Relay::new();
    let mut alice = Client::connect(&relay);
    let mut mallory = Client::connect(&relay);
    alice.send(&relay, join("SAFE01", "Alice"));

    // trigger and chat before joining
    let early = ClientEvent::parse(r#"{"event":"cut-cake","data":"SAFE01"}"#).unwrap();
    assert!(relay.handle(mallory.id, early).is_err());
    let chat = r#"{"event":"message","data":{"user":"M","text":"spam"}}"#;
    let chat = ClientEvent::parse(chat).unwrap();
    assert!(relay.handle(mallory.id, chat).is_err());

    // trigger aimed at a room it never joined
    mallory.send(&relay, join("OTHER1", "Mallory"));
    let foreign = ClientEvent::parse(r#"{"event":"cut-cake","data":"SAFE01"}"#).unwrap();
    assert!(relay.handle(mallory.id, foreign).is_err());

    assert!(alice.frames().is_empty());
    assert!(mallory.frames().is_empty());
    assert_eq!(relay.member_count(&RoomId::new("SAFE01").unwrap()), 1);
}
