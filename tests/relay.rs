//! End-to-end relay tests over loopback TCP

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use rtcm_relay::{crc24q, Relay, RelayConfig};

fn encode(payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xD3, (payload.len() >> 8) as u8, payload.len() as u8];
    out.extend_from_slice(payload);
    let crc = crc24q(&out);
    out.extend_from_slice(&crc.to_be_bytes()[1..]);
    out
}

async fn wait_for_subscribers(relay: &Relay, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while relay.broadcaster().len().await < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("subscribers did not register in time");
}

struct Harness {
    relay: Arc<Relay>,
    relay_addr: std::net::SocketAddr,
    upstream: TcpListener,
    task: tokio::task::JoinHandle<rtcm_relay::Result<()>>,
    shutdown: Option<oneshot::Sender<()>>,
}

async fn start(config: RelayConfig) -> Harness {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = config.upstream(upstream.local_addr().unwrap().to_string());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let relay_addr = listener.local_addr().unwrap();

    let relay = Arc::new(Relay::new(config).unwrap());
    let (tx, rx) = oneshot::channel::<()>();

    let task = {
        let relay = Arc::clone(&relay);
        tokio::spawn(async move {
            relay
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await
        })
    };

    Harness {
        relay,
        relay_addr,
        upstream,
        task,
        shutdown: Some(tx),
    }
}

#[tokio::test]
async fn test_frames_reach_every_subscriber() {
    let mut harness = start(RelayConfig::default()).await;

    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(TcpStream::connect(harness.relay_addr).await.unwrap());
    }
    wait_for_subscribers(&harness.relay, 3).await;

    let (mut source, _) = harness.upstream.accept().await.unwrap();

    let frames: Vec<Vec<u8>> = (0..10u8).map(|i| encode(&vec![i; 20 + i as usize])).collect();
    let mut corrupted = encode(&[0x55; 30]);
    corrupted[12] ^= 0x80;

    let mut stream = vec![0x00, 0x13, 0x37];
    for (i, frame) in frames.iter().enumerate() {
        stream.extend_from_slice(frame);
        if i == 4 {
            stream.extend_from_slice(&corrupted);
        }
    }

    for chunk in stream.chunks(29) {
        source.write_all(chunk).await.unwrap();
        source.flush().await.unwrap();
    }

    let expected = frames.concat();
    for client in &mut clients {
        let mut got = vec![0u8; expected.len()];
        tokio::time::timeout(Duration::from_secs(5), client.read_exact(&mut got))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, expected);
    }

    // Upstream goes away: relay terminates and closes every subscriber
    drop(source);
    let result = tokio::time::timeout(Duration::from_secs(5), &mut harness.task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());

    for client in &mut clients {
        let mut rest = Vec::new();
        let n = tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
    }

    let stats = harness.relay.stats().await;
    assert_eq!(stats.frames_relayed, 10);
    assert_eq!(stats.connections_accepted, 3);
}

#[tokio::test]
async fn test_disconnected_subscriber_does_not_affect_others() {
    let config = RelayConfig::default().write_timeout(Duration::from_millis(200));
    let mut harness = start(config).await;

    let mut staying = TcpStream::connect(harness.relay_addr).await.unwrap();
    let leaving = TcpStream::connect(harness.relay_addr).await.unwrap();
    wait_for_subscribers(&harness.relay, 2).await;

    let (mut source, _) = harness.upstream.accept().await.unwrap();
    drop(leaving);

    // Keep sending until the closed peer's failure surfaces; the other
    // subscriber must receive every frame regardless.
    for i in 0..50u8 {
        let frame = encode(&[i; 100]);
        source.write_all(&frame).await.unwrap();

        let mut got = vec![0u8; frame.len()];
        tokio::time::timeout(Duration::from_secs(5), staying.read_exact(&mut got))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, frame);
    }

    // The last broadcast may still be finishing; retry until the dead
    // subscriber is both counted and reaped.
    let relay = Arc::clone(&harness.relay);
    tokio::time::timeout(Duration::from_secs(5), async move {
        loop {
            relay.broadcaster().reap().await;
            let stats = relay.stats().await;
            if stats.broadcast_failures > 0 && stats.subscribers == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("closed subscriber was not reaped");

    if let Some(tx) = harness.shutdown.take() {
        let _ = tx.send(());
    }
    let result = tokio::time::timeout(Duration::from_secs(5), &mut harness.task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    assert!(harness.relay.broadcaster().is_closed().await);
}

#[tokio::test]
async fn test_subscriber_limit() {
    let config = RelayConfig::default().max_subscribers(1);
    let harness = start(config).await;

    let _first = TcpStream::connect(harness.relay_addr).await.unwrap();
    wait_for_subscribers(&harness.relay, 1).await;

    let mut second = TcpStream::connect(harness.relay_addr).await.unwrap();
    let mut buf = [0u8; 1];
    let n = tokio::time::timeout(Duration::from_secs(5), second.read(&mut buf))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(n, 0);

    let stats = harness.relay.stats().await;
    assert_eq!(stats.subscribers, 1);
    assert_eq!(stats.connections_rejected, 1);
}
