#[cfg(test)]
mod tests {
    use crate::connection::{SinkAdapter, StreamAdapter};
    use crate::message::{
        ClientMessage, ConnectionId, Member, MediaKind, RoomId, ServerMessage, UserId,
    };
    use crate::relay::Relay;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;
    use tokio::sync::mpsc;

    // Mock SinkAdapter recording everything the relay delivers.
    struct MockSink {
        sent: Arc<StdMutex<Vec<ServerMessage>>>,
    }

    #[async_trait]
    impl SinkAdapter for MockSink {
        async fn send(
            &mut self,
            message: ServerMessage,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    // Mock StreamAdapter fed from a channel; dropping the sender acts as an
    // abrupt transport loss.
    struct MockStream {
        rx: mpsc::UnboundedReceiver<ClientMessage>,
    }

    #[async_trait]
    impl StreamAdapter for MockStream {
        async fn next(
            &mut self,
        ) -> Result<ClientMessage, Box<dyn std::error::Error + Send + Sync>> {
            self.rx.recv().await.ok_or_else(|| "stream closed".into())
        }
    }

    struct TestPeer {
        tx: mpsc::UnboundedSender<ClientMessage>,
        received: Arc<StdMutex<Vec<ServerMessage>>>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl TestPeer {
        fn send(&self, message: ClientMessage) {
            self.tx.send(message).unwrap();
        }

        fn join(&self, room: &str, user: &str) {
            self.send(ClientMessage::Join {
                room: RoomId(room.to_string()),
                user: UserId(user.to_string()),
            });
        }

        fn messages(&self) -> Vec<ServerMessage> {
            self.received.lock().unwrap().clone()
        }

        async fn disconnect(self) {
            drop(self.tx);
            let _ = self.handle.await;
        }
    }

    fn connect(relay: &Arc<Relay>, id: u64) -> TestPeer {
        let (tx, rx) = mpsc::unbounded_channel();
        let received = Arc::new(StdMutex::new(Vec::new()));
        let sink = MockSink {
            sent: received.clone(),
        };
        let relay = relay.clone();
        let handle = tokio::spawn(async move {
            let mut stream = MockStream { rx };
            relay.handle_stream(ConnectionId(id), &mut stream, sink).await;
        });
        TestPeer {
            tx,
            received,
            handle,
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    fn member(connection: u64, user: &str) -> Member {
        Member {
            connection: ConnectionId(connection),
            user: UserId(user.to_string()),
        }
    }

    #[tokio::test]
    async fn join_handshake_notifies_both_sides() {
        let relay = Arc::new(Relay::new());

        let a = connect(&relay, 1);
        a.join("x", "u1");
        settle().await;
        assert_eq!(a.messages(), vec![ServerMessage::ExistingUsers(vec![])]);

        let b = connect(&relay, 2);
        b.join("x", "u2");
        settle().await;

        assert_eq!(
            b.messages(),
            vec![ServerMessage::ExistingUsers(vec![member(1, "u1")])]
        );
        assert_eq!(
            a.messages(),
            vec![
                ServerMessage::ExistingUsers(vec![]),
                ServerMessage::UserJoined(member(2, "u2")),
            ]
        );
    }

    #[tokio::test]
    async fn repeat_join_redelivers_without_renotifying() {
        let relay = Arc::new(Relay::new());
        let a = connect(&relay, 1);
        let b = connect(&relay, 2);
        a.join("x", "u1");
        settle().await;
        b.join("x", "u2");
        settle().await;

        a.join("x", "u1");
        settle().await;

        let to_a = a.messages();
        assert_eq!(
            to_a,
            vec![
                ServerMessage::ExistingUsers(vec![]),
                ServerMessage::UserJoined(member(2, "u2")),
                ServerMessage::ExistingUsers(vec![member(2, "u2")]),
            ]
        );

        let joins_seen_by_b = b
            .messages()
            .into_iter()
            .filter(|m| matches!(m, ServerMessage::UserJoined(_)))
            .count();
        assert_eq!(joins_seen_by_b, 0, "no duplicate user_joined");
    }

    #[tokio::test]
    async fn frame_is_stamped_and_fanned_out_to_peers_only() {
        let relay = Arc::new(Relay::new());
        let a = connect(&relay, 1);
        let b = connect(&relay, 2);
        a.join("x", "u1");
        settle().await;
        b.join("x", "u2");
        settle().await;

        a.send(ClientMessage::Frame {
            kind: MediaKind::Video,
            payload: vec![1, 2, 3],
        });
        settle().await;

        let frames_to_b: Vec<_> = b
            .messages()
            .into_iter()
            .filter(|m| matches!(m, ServerMessage::Frame { .. }))
            .collect();
        assert_eq!(
            frames_to_b,
            vec![ServerMessage::Frame {
                sender: member(1, "u1"),
                kind: MediaKind::Video,
                payload: vec![1, 2, 3],
            }]
        );

        // The sender never hears its own frame back.
        assert!(a
            .messages()
            .iter()
            .all(|m| !matches!(m, ServerMessage::Frame { .. })));
    }

    #[tokio::test]
    async fn frame_before_join_is_dropped_silently() {
        let relay = Arc::new(Relay::new());
        let a = connect(&relay, 1);
        let b = connect(&relay, 2);
        b.join("x", "u2");
        settle().await;

        a.send(ClientMessage::Frame {
            kind: MediaKind::Video,
            payload: vec![9],
        });
        settle().await;

        assert!(b
            .messages()
            .iter()
            .all(|m| !matches!(m, ServerMessage::Frame { .. })));
        assert!(a.messages().is_empty());

        // The connection is still healthy and can join afterwards.
        a.join("x", "u1");
        settle().await;
        assert_eq!(
            a.messages(),
            vec![ServerMessage::ExistingUsers(vec![member(2, "u2")])]
        );
    }

    #[tokio::test]
    async fn toggles_and_screen_share_relay_with_sender_stamp() {
        let relay = Arc::new(Relay::new());
        let a = connect(&relay, 1);
        let b = connect(&relay, 2);
        a.join("x", "u1");
        settle().await;
        b.join("x", "u2");
        settle().await;

        a.send(ClientMessage::ToggleAudio { enabled: false });
        a.send(ClientMessage::StartScreenShare);
        a.send(ClientMessage::StopScreenShare);
        settle().await;

        let signals: Vec<_> = b
            .messages()
            .into_iter()
            .filter(|m| !matches!(m, ServerMessage::ExistingUsers(_) | ServerMessage::UserJoined(_)))
            .collect();
        assert_eq!(
            signals,
            vec![
                ServerMessage::ToggleAudio {
                    sender: member(1, "u1"),
                    enabled: false,
                },
                ServerMessage::ScreenShareStarted {
                    sender: member(1, "u1"),
                },
                ServerMessage::ScreenShareStopped {
                    sender: member(1, "u1"),
                },
            ]
        );
    }

    #[tokio::test]
    async fn abrupt_disconnect_notifies_peers_exactly_once() {
        let relay = Arc::new(Relay::new());
        let a = connect(&relay, 1);
        let b = connect(&relay, 2);
        a.join("x", "u1");
        settle().await;
        b.join("x", "u2");
        settle().await;

        a.disconnect().await;
        settle().await;

        let departures: Vec<_> = b
            .messages()
            .into_iter()
            .filter(|m| matches!(m, ServerMessage::ParticipantLeft(_)))
            .collect();
        assert_eq!(departures, vec![ServerMessage::ParticipantLeft(member(1, "u1"))]);
        assert!(relay.registry().rooms_of(ConnectionId(1)).is_empty());
    }

    #[tokio::test]
    async fn no_frames_arrive_after_a_sender_disconnects() {
        let relay = Arc::new(Relay::new());
        let a = connect(&relay, 1);
        let b = connect(&relay, 2);
        a.join("x", "u1");
        settle().await;
        b.join("x", "u2");
        settle().await;

        a.disconnect().await;
        settle().await;
        let count_after_leave = b.messages().len();

        // Nothing else can originate from connection 1 now; give the relay
        // time to prove it.
        settle().await;
        assert_eq!(b.messages().len(), count_after_leave);
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let relay = Arc::new(Relay::new());
        let a = connect(&relay, 1);
        let b = connect(&relay, 2);
        let c = connect(&relay, 3);
        a.join("x", "u1");
        settle().await;
        b.join("x", "u2");
        c.join("y", "u3");
        settle().await;

        a.send(ClientMessage::Frame {
            kind: MediaKind::Video,
            payload: vec![7],
        });
        settle().await;

        assert!(c
            .messages()
            .iter()
            .all(|m| !matches!(m, ServerMessage::Frame { .. })));
    }
}
