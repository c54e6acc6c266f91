//! Integration tests for the TCP client engine.
//!
//! Each test stands up a throwaway server on `127.0.0.1:0` and talks to the client with raw
//! frames, so the bytes on the wire are checked directly.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use racewire_protocol::{
    Chat, ClientList, Message, OpCode, OrderClientList, PlayerEntity, decode, encode,
};
use racewire_transport::{
    ClientConfig, ConnectionState, FatalHandler, TcpClient, TransportError, encode_frame,
    read_frame,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// =========================================================================
// Helpers
// =========================================================================

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl Recorder {
    fn count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl FatalHandler for Recorder {
    fn fatal(&self, error: &TransportError) {
        self.calls.lock().push(error.to_string());
    }
}

async fn listener() -> (TcpListener, ClientConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, ClientConfig::new("127.0.0.1", port))
}

fn client(config: ClientConfig) -> (TcpClient, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let client = TcpClient::new(config, recorder.clone());
    (client, recorder)
}

async fn next_message(stream: &mut TcpStream) -> Message {
    let payload = tokio::time::timeout(Duration::from_secs(5), read_frame(stream, u32::MAX))
        .await
        .expect("frame should arrive")
        .expect("frame should be readable");
    decode(&payload).expect("frame should decode")
}

async fn wait_for_state(client: &TcpClient, target: ConnectionState) {
    let mut rx = client.subscribe_state();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == target))
        .await
        .expect("state should be reached")
        .expect("state channel open");
}

// =========================================================================
// Outbound
// =========================================================================

#[tokio::test]
async fn test_first_frame_is_client_list_request() {
    let (listener, config) = listener().await;
    let (client, recorder) = client(config);

    // Queued before the connection exists; must still go out second.
    client.send(Chat::broadcast("early")).unwrap();
    client.start().unwrap();
    let (mut server, _) = listener.accept().await.unwrap();

    assert_eq!(next_message(&mut server).await, Message::OrderClientList(OrderClientList));
    assert_eq!(next_message(&mut server).await, Message::Chat(Chat::broadcast("early")));

    client.stop().await;
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn test_length_prefix_matches_payload() {
    let (listener, config) = listener().await;
    let (client, _recorder) = client(config);
    client.start().unwrap();
    let (mut server, _) = listener.accept().await.unwrap();
    let _ = next_message(&mut server).await;

    let msg: Message = Chat::broadcast("Race results").into();
    let expected = encode(&msg);
    client.send(msg).unwrap();

    let mut header = [0u8; 4];
    server.read_exact(&mut header).await.unwrap();
    assert_eq!(u32::from_le_bytes(header) as usize, expected.len());
    let mut payload = vec![0u8; expected.len()];
    server.read_exact(&mut payload).await.unwrap();
    assert_eq!(payload, expected);

    client.stop().await;
}

#[tokio::test]
async fn test_concurrent_producers_keep_their_own_order() {
    let (listener, config) = listener().await;
    let (client, recorder) = client(config);
    let client = Arc::new(client);
    client.start().unwrap();
    let (mut server, _) = listener.accept().await.unwrap();
    let _ = next_message(&mut server).await;

    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 50;
    let mut tasks = Vec::new();
    for p in 0..PRODUCERS {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            for n in 0..PER_PRODUCER {
                client.send(Chat::broadcast(format!("{p}:{n}"))).unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let mut last = [None::<usize>; PRODUCERS];
    for _ in 0..PRODUCERS * PER_PRODUCER {
        let Message::Chat(chat) = next_message(&mut server).await else {
            panic!("expected chat");
        };
        let (p, n) = chat.content().split_once(':').unwrap();
        let (p, n): (usize, usize) = (p.parse().unwrap(), n.parse().unwrap());
        assert!(last[p].is_none_or(|prev| n == prev + 1));
        last[p] = Some(n);
    }
    assert!(last.iter().all(|l| *l == Some(PER_PRODUCER - 1)));

    client.stop().await;
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn test_batch_is_sent_contiguously() {
    let (listener, config) = listener().await;
    let (client, _recorder) = client(config);
    client.start().unwrap();
    let (mut server, _) = listener.accept().await.unwrap();
    let _ = next_message(&mut server).await;

    let batch: Vec<Message> = ["Race results", "a: 0", "b: 1"]
        .into_iter()
        .map(|s| Chat::broadcast(s).into())
        .collect();
    client.send_batch(batch.clone()).unwrap();

    for expected in batch {
        assert_eq!(next_message(&mut server).await, expected);
    }
    client.stop().await;
}

// =========================================================================
// Inbound
// =========================================================================

#[tokio::test]
async fn test_received_frames_reach_inbound_queue() {
    let (listener, config) = listener().await;
    let (client, _recorder) = client(config);
    client.start().unwrap();
    let (mut server, _) = listener.accept().await.unwrap();

    let list: Message = ClientList {
        base: OrderClientList,
        players: vec![PlayerEntity::new(1, "alice", 0)],
    }
    .into();
    server.write_all(&encode_frame(&encode(&list))).await.unwrap();

    let received = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let batch = client.recv();
            if !batch.is_empty() {
                return batch;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("message should be received");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], list);
    assert_eq!(received[0].opcode(), OpCode::ClientList);

    client.stop().await;
}

#[tokio::test]
async fn test_oversized_frame_tears_down_without_exit() {
    let (listener, config) = listener().await;
    let (client, recorder) = client(config);
    client.start().unwrap();
    let (mut server, _) = listener.accept().await.unwrap();

    server.write_all(&5000u32.to_le_bytes()).await.unwrap();

    wait_for_state(&client, ConnectionState::Closed).await;
    assert!(client.recv().is_empty());
    assert_eq!(recorder.count(), 0);

    // Client side hung up.
    let mut rest = Vec::new();
    let _ = server.read_to_end(&mut rest).await;
}

#[tokio::test]
async fn test_undecodable_frame_tears_down_without_exit() {
    let (listener, config) = listener().await;
    let (client, recorder) = client(config);
    client.start().unwrap();
    let (mut server, _) = listener.accept().await.unwrap();

    server.write_all(&encode_frame(&0u32.to_le_bytes())).await.unwrap();

    wait_for_state(&client, ConnectionState::Closed).await;
    assert!(client.recv().is_empty());
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn test_undrained_inbound_queue_is_fatal() {
    let (listener, mut config) = listener().await;
    config.warn_capacity = 4;
    config.nuke_capacity = 8;
    let (client, recorder) = client(config);
    client.start().unwrap();
    let (mut server, _) = listener.accept().await.unwrap();

    // Nobody calls `recv`, so the ninth frame has nowhere to go.
    for n in 0..9 {
        let msg: Message = Chat::broadcast(n.to_string()).into();
        server.write_all(&encode_frame(&encode(&msg))).await.unwrap();
    }

    wait_for_state(&client, ConnectionState::Closed).await;
    let calls = recorder.calls.lock().clone();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("message queue overflow"), "{calls:?}");
}

// =========================================================================
// Lifecycle and failures
// =========================================================================

#[tokio::test]
async fn test_connect_failure_is_fatal() {
    let (listener, config) = listener().await;
    drop(listener);
    let (client, recorder) = client(config);
    client.start().unwrap();

    wait_for_state(&client, ConnectionState::Closed).await;
    let calls = recorder.calls.lock().clone();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("connect to 127.0.0.1:"));
}

#[tokio::test]
async fn test_peer_hangup_is_fatal_receive_failure() {
    let (listener, config) = listener().await;
    let (client, recorder) = client(config);
    client.start().unwrap();
    let (mut server, _) = listener.accept().await.unwrap();
    let _ = next_message(&mut server).await;

    drop(server);

    wait_for_state(&client, ConnectionState::Closed).await;
    let calls = recorder.calls.lock().clone();
    assert_eq!(calls.len(), 1, "{calls:?}");
    assert!(calls[0].starts_with("receive failed"), "{calls:?}");
}

#[tokio::test]
async fn test_stalled_peer_is_fatal_send_failure() {
    let (listener, mut config) = listener().await;
    config.write_timeout = Duration::from_millis(100);
    let (client, recorder) = client(config);
    client.start().unwrap();
    // Accepted but never read, so the socket buffers eventually fill up.
    let (_server, _) = listener.accept().await.unwrap();
    wait_for_state(&client, ConnectionState::Connected).await;

    let filler = "x".repeat(16 * 1024);
    tokio::time::timeout(Duration::from_secs(20), async {
        while client.state() < ConnectionState::Closing {
            if client.pending() < 500 {
                let batch = vec![Message::from(Chat::broadcast(filler.as_str())); 200];
                client.send_batch(batch).unwrap();
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("writes to a stalled peer should time out");

    wait_for_state(&client, ConnectionState::Closed).await;
    let calls = recorder.calls.lock().clone();
    assert_eq!(calls.len(), 1, "{calls:?}");
    assert!(calls[0].starts_with("send failed"), "{calls:?}");
}

#[tokio::test]
async fn test_outbound_overflow_is_fatal_and_rejects() {
    let (client, recorder) = client(ClientConfig::default());

    for n in 0..ClientConfig::NUKE_CAPACITY - 1 {
        client.send(Chat::broadcast(n.to_string())).unwrap();
    }
    assert_eq!(recorder.count(), 0);

    let err = client.send(Chat::broadcast("one too many")).unwrap_err();
    assert!(matches!(err, TransportError::CapacityExceeded { pending: 3072 }));
    assert_eq!(recorder.count(), 1);

    assert!(client.send(Chat::broadcast("still full")).is_err());
    assert_eq!(client.pending(), ClientConfig::NUKE_CAPACITY);
    assert_eq!(recorder.count(), 2);
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let (listener, config) = listener().await;
    let (client, _recorder) = client(config);
    client.start().unwrap();
    assert!(matches!(client.start(), Err(TransportError::AlreadyStarted)));
    let _ = listener.accept().await.unwrap();
    client.stop().await;
}

#[tokio::test]
async fn test_stop_before_start_closes() {
    let (client, recorder) = client(ClientConfig::default());
    assert_eq!(client.state(), ConnectionState::Disconnected);
    client.stop().await;
    assert_eq!(client.state(), ConnectionState::Closed);
    client.stop().await;
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn test_stop_closes_socket_without_fatal() {
    let (listener, config) = listener().await;
    let (client, recorder) = client(config);
    client.start().unwrap();
    let (mut server, _) = listener.accept().await.unwrap();
    let _ = next_message(&mut server).await;
    wait_for_state(&client, ConnectionState::Connected).await;

    client.stop().await;
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(recorder.count(), 0);

    let mut rest = Vec::new();
    let n = tokio::time::timeout(Duration::from_secs(5), server.read_to_end(&mut rest))
        .await
        .expect("server should see EOF")
        .unwrap();
    assert_eq!(n, 0);
}
