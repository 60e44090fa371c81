//! Query socket tests against scripted UDP servers on loopback.
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;

use srcquery::packet::{header, Packet};
use srcquery::socket::{GoldSrcSocket, MasterServerSocket, QuerySocket, SourceSocket};
use srcquery::{Request, SrcQueryError};

/// Binds a UDP socket that answers the first request with the given
/// datagrams, in order.
async fn spawn_udp_server(replies: Vec<Vec<u8>>) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        let (_, peer) = socket.recv_from(&mut buf).await.unwrap();
        for reply in replies {
            socket.send_to(&reply, peer).await.unwrap();
        }
    });

    addr
}

fn rules_payload() -> Vec<u8> {
    let mut payload = vec![0xff, 0xff, 0xff, 0xff, header::S2A_RULES, 2, 0];
    payload.extend_from_slice(b"sv_gravity\x00800\0mp_friendlyfire\x000\0");
    payload
}

fn goldsrc_fragment(request_id: i32, count: u8, number: u8, data: &[u8]) -> Vec<u8> {
    let mut datagram = (-2i32).to_le_bytes().to_vec();
    datagram.extend_from_slice(&request_id.to_le_bytes());
    datagram.push(count | (number << 4));
    datagram.extend_from_slice(data);
    datagram
}

fn source_fragment(request_id: u32, count: u8, number: u8, size: u32, checksum: Option<u32>, data: &[u8]) -> Vec<u8> {
    let mut datagram = (-2i32).to_le_bytes().to_vec();
    datagram.extend_from_slice(&request_id.to_le_bytes());
    datagram.push(count);
    datagram.push(number);
    match checksum {
        Some(checksum) => {
            datagram.extend_from_slice(&size.to_le_bytes());
            datagram.extend_from_slice(&checksum.to_le_bytes());
        }
        None => datagram.extend_from_slice(&(size as u16).to_le_bytes()),
    }
    datagram.extend_from_slice(data);
    datagram
}

#[tokio::test]
async fn single_datagram_reply_decodes() {
    let addr = spawn_udp_server(vec![rules_payload()]).await;
    let mut socket = GoldSrcSocket::connect(addr, false).await.unwrap();

    socket.send(&Request::Rules { challenge: 42 }).await.unwrap();
    match socket.get_reply().await.unwrap() {
        Packet::Rules(rules) => assert_eq!(rules["sv_gravity"], "800"),
        other => panic!("unexpected packet {other:?}"),
    }
}

#[tokio::test]
async fn goldsrc_reassembles_out_of_order_fragments() {
    let payload = rules_payload();
    let (a, b) = payload.split_at(payload.len() / 2);

    // second fragment arrives first; indices must win over arrival order
    let addr = spawn_udp_server(vec![
        goldsrc_fragment(99, 2, 1, b),
        goldsrc_fragment(99, 2, 0, a),
    ])
    .await;
    let mut socket = GoldSrcSocket::connect(addr, false).await.unwrap();

    socket.send(&Request::Rules { challenge: 42 }).await.unwrap();
    match socket.get_reply().await.unwrap() {
        Packet::Rules(rules) => {
            assert_eq!(rules.len(), 2);
            assert_eq!(rules["mp_friendlyfire"], "0");
        }
        other => panic!("unexpected packet {other:?}"),
    }
}

#[tokio::test]
async fn source_reassembles_split_reply() {
    let payload = rules_payload();
    let (a, b) = payload.split_at(payload.len() / 2);

    let addr = spawn_udp_server(vec![
        source_fragment(7, 2, 0, a.len() as u32, None, a),
        source_fragment(7, 2, 1, b.len() as u32, None, b),
    ])
    .await;
    let mut socket = SourceSocket::connect(addr).await.unwrap();

    socket.send(&Request::Rules { challenge: 42 }).await.unwrap();
    match socket.get_reply().await.unwrap() {
        Packet::Rules(rules) => assert_eq!(rules.len(), 2),
        other => panic!("unexpected packet {other:?}"),
    }
}

#[tokio::test]
async fn source_decompresses_and_verifies_split_reply() {
    use bzip2::read::BzEncoder;
    use bzip2::Compression;
    use std::io::Read;

    let payload = rules_payload();
    let checksum = crc32fast::hash(&payload);
    let mut compressed = Vec::new();
    BzEncoder::new(payload.as_slice(), Compression::default())
        .read_to_end(&mut compressed)
        .unwrap();
    let (a, b) = compressed.split_at(compressed.len() / 2);

    let request_id = 7 | 0x8000_0000;
    let addr = spawn_udp_server(vec![
        source_fragment(request_id, 2, 0, compressed.len() as u32, Some(checksum), a),
        source_fragment(request_id, 2, 1, compressed.len() as u32, Some(checksum), b),
    ])
    .await;
    let mut socket = SourceSocket::connect(addr).await.unwrap();

    socket.send(&Request::Rules { challenge: 42 }).await.unwrap();
    match socket.get_reply().await.unwrap() {
        Packet::Rules(rules) => assert_eq!(rules["sv_gravity"], "800"),
        other => panic!("unexpected packet {other:?}"),
    }
}

#[tokio::test]
async fn silent_server_times_out_within_bounds() {
    // bound but never replies
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = silent.local_addr().unwrap();

    let mut socket = SourceSocket::connect(addr).await.unwrap();
    socket.set_timeout(Duration::from_millis(150));

    socket.send(&Request::GetChallenge).await.unwrap();
    let start = Instant::now();
    let err = socket.get_reply().await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, SrcQueryError::Timeout(_)));
    assert!(elapsed >= Duration::from_millis(100), "returned too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "returned too late: {elapsed:?}");
}

#[tokio::test]
async fn master_socket_rejects_wrong_leading_marker() {
    let mut reply = 0x12345678i32.to_le_bytes().to_vec();
    reply.push(header::M2A_SERVER_BATCH);
    reply.push(0x0a);

    let addr = spawn_udp_server(vec![reply]).await;
    let mut socket = MasterServerSocket::connect(addr).await.unwrap();

    socket
        .send(&Request::GetServers {
            region: 0xff,
            start: "0.0.0.0:0".to_string(),
            filter: String::new(),
        })
        .await
        .unwrap();
    assert!(matches!(
        socket.get_reply().await,
        Err(SrcQueryError::PacketFormat(_))
    ));
}
