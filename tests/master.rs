//! Master server listing tests against a scripted UDP master on loopback.
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use tokio::net::UdpSocket;

use srcquery::{MasterServer, SrcQueryError};

/// One scripted reaction per incoming request. `None` swallows the
/// request to provoke a client-side timeout.
async fn spawn_master(script: Vec<Option<Vec<u8>>>) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        for action in script {
            let (_, peer) = socket.recv_from(&mut buf).await.unwrap();
            if let Some(reply) = action {
                socket.send_to(&reply, peer).await.unwrap();
            }
        }
        // stay bound so late requests time out instead of getting an
        // ICMP port-unreachable error
        loop {
            socket.recv_from(&mut buf).await.unwrap();
        }
    });

    addr
}

fn batch(entries: &[SocketAddrV4]) -> Vec<u8> {
    let mut reply = vec![0xff, 0xff, 0xff, 0xff, 0x66, 0x0a];
    for entry in entries {
        reply.extend_from_slice(&entry.ip().octets());
        reply.extend_from_slice(&entry.port().to_be_bytes());
    }
    reply
}

fn v4(ip: [u8; 4], port: u16) -> SocketAddrV4 {
    SocketAddrV4::new(Ipv4Addr::from(ip), port)
}

const SENTINEL: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);

#[tokio::test]
async fn get_servers_pages_until_sentinel_and_deduplicates() {
    let first = [v4([127, 0, 0, 1], 27015), v4([127, 0, 0, 1], 27016)];
    // the first entry repeats the previous page's seed
    let second = [
        v4([127, 0, 0, 1], 27016),
        v4([127, 0, 0, 2], 27015),
        v4([127, 0, 0, 2], 27016),
        SENTINEL,
    ];

    let addr = spawn_master(vec![Some(batch(&first)), Some(batch(&second))]).await;
    let mut master = MasterServer::connect(&addr.to_string()).await.unwrap();

    let servers = master
        .get_servers(MasterServer::REGION_ALL, "", false)
        .await
        .unwrap();

    assert_eq!(
        servers,
        vec![
            v4([127, 0, 0, 1], 27015),
            v4([127, 0, 0, 1], 27016),
            v4([127, 0, 0, 2], 27015),
            v4([127, 0, 0, 2], 27016),
        ]
    );
}

#[tokio::test]
async fn get_servers_retries_after_a_dropped_request() {
    let page = [v4([10, 0, 0, 1], 27015), SENTINEL];
    let addr = spawn_master(vec![None, Some(batch(&page))]).await;

    let mut master = MasterServer::connect(&addr.to_string()).await.unwrap();
    master.set_timeout(Duration::from_millis(100));

    let servers = master
        .get_servers(MasterServer::REGION_EUROPE, "\\type\\d", false)
        .await
        .unwrap();
    assert_eq!(servers, vec![v4([10, 0, 0, 1], 27015)]);
}

#[tokio::test]
async fn get_servers_gives_up_once_the_rotation_wraps() {
    // bound but never replies
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = silent.local_addr().unwrap();

    let mut master = MasterServer::connect(&addr.to_string()).await.unwrap();
    master.set_timeout(Duration::from_millis(100));
    master.set_retries(1);

    assert!(matches!(
        master.get_servers(MasterServer::REGION_ALL, "", false).await,
        Err(SrcQueryError::Timeout(_))
    ));
}

#[tokio::test]
async fn get_servers_force_returns_the_partial_list() {
    // one page without a sentinel, then silence
    let page = [v4([10, 0, 0, 2], 27015)];
    let addr = spawn_master(vec![Some(batch(&page))]).await;

    let mut master = MasterServer::connect(&addr.to_string()).await.unwrap();
    master.set_timeout(Duration::from_millis(100));
    master.set_retries(1);

    let servers = master
        .get_servers(MasterServer::REGION_ALL, "", true)
        .await
        .unwrap();
    assert_eq!(servers, vec![v4([10, 0, 0, 2], 27015)]);
}
