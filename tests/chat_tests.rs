//! End-to-end chat between two pipelines over loopback UDP.

use std::sync::Arc;
use std::time::Duration;

use s_talk::core::MAX_MESSAGE_LEN;
use s_talk::pipeline::{self, AgentExit};
use s_talk::terminal::ReaderLines;
use s_talk::{Session, SessionReport, SessionState, ShutdownOrigin, UdpTransport};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

struct Peer {
    session: Arc<Session>,
    keyboard: DuplexStream,
    screen: BufReader<DuplexStream>,
    run: JoinHandle<s_talk::Result<SessionReport>>,
}

fn start(socket: UdpSocket, remote: std::net::SocketAddr) -> Peer {
    let transport = Arc::new(UdpTransport::from_socket(socket, remote));
    let session = Arc::new(Session::new(transport, 16));

    let (keyboard, stdin) = tokio::io::duplex(8192);
    let (stdout, screen) = tokio::io::duplex(8192);
    let run = tokio::spawn(pipeline::run(
        Arc::clone(&session),
        ReaderLines::new(BufReader::new(stdin)),
        stdout,
    ));

    Peer {
        session,
        keyboard,
        screen: BufReader::new(screen),
        run,
    }
}

async fn start_pair() -> (Peer, Peer) {
    let a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let a_addr = a.local_addr().unwrap();
    let b_addr = b.local_addr().unwrap();
    (start(a, b_addr), start(b, a_addr))
}

async fn screen_line(peer: &mut Peer) -> Vec<u8> {
    let mut line = Vec::new();
    timeout(WAIT, peer.screen.read_until(b'\n', &mut line))
        .await
        .expect("display output")
        .unwrap();
    line
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_hello_then_local_exit() {
    let (mut a, mut b) = start_pair().await;

    a.keyboard.write_all(b"hello\n").await.unwrap();
    assert_eq!(screen_line(&mut b).await, b"Recieved: hello\n");

    a.keyboard.write_all(b"!\n").await.unwrap();
    assert_eq!(screen_line(&mut b).await, b"Recieved: !\n");

    let report_a = timeout(WAIT, a.run).await.unwrap().unwrap().unwrap();
    let report_b = timeout(WAIT, b.run).await.unwrap().unwrap().unwrap();

    assert_eq!(report_a.origin, Some(ShutdownOrigin::Local));
    assert_eq!(report_b.origin, Some(ShutdownOrigin::Remote));
    assert_eq!(
        report_b.exit_of(s_talk::core::AgentKind::Receive),
        Some(AgentExit::InitiatedShutdown)
    );
    assert_eq!(a.session.state(), SessionState::Terminated);
    assert_eq!(b.session.state(), SessionState::Terminated);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_conversation_both_directions() {
    let (mut a, mut b) = start_pair().await;

    a.keyboard.write_all(b"ping\n").await.unwrap();
    assert_eq!(screen_line(&mut b).await, b"Recieved: ping\n");

    b.keyboard.write_all(b"pong\n").await.unwrap();
    assert_eq!(screen_line(&mut a).await, b"Recieved: pong\n");

    b.keyboard.write_all(b"!\n").await.unwrap();
    let report_a = timeout(WAIT, a.run).await.unwrap().unwrap().unwrap();
    let report_b = timeout(WAIT, b.run).await.unwrap().unwrap().unwrap();

    assert_eq!(report_a.origin, Some(ShutdownOrigin::Remote));
    assert_eq!(report_b.origin, Some(ShutdownOrigin::Local));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_max_length_message_arrives_whole() {
    let (mut a, mut b) = start_pair().await;

    let mut line = vec![b'x'; MAX_MESSAGE_LEN - 2];
    line.extend_from_slice(b"y\n");
    assert_eq!(line.len(), MAX_MESSAGE_LEN);

    a.keyboard.write_all(&line).await.unwrap();

    let mut expected = b"Recieved: ".to_vec();
    expected.extend_from_slice(&line);
    assert_eq!(screen_line(&mut b).await, expected);

    a.keyboard.write_all(b"!\n").await.unwrap();
    timeout(WAIT, a.run).await.unwrap().unwrap().unwrap();
    timeout(WAIT, b.run).await.unwrap().unwrap().unwrap();
}
