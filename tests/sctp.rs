use bytes::Bytes;
use socket2::Domain;
use std::io;
use std::net::SocketAddr;

use sctp_sockapi::{
    AsyncSctpSocket, BindxFlag, EventSubscription, InitParams, PackedAddrs, RecvContent, RtoInfo, SctpError,
    SctpSocket, SendFlags, SendOptions, SndRcvInfo, SocketStyle,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Kernels built without SCTP refuse the socket; there is nothing to test then.
fn socket(style: SocketStyle) -> Option<SctpSocket> {
    init_tracing();
    SctpSocket::new(Domain::IPV4, style).ok()
}

fn loopback() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

/// A bound, listening one-to-many socket.
fn server() -> io::Result<AsyncSctpSocket> {
    let socket = SctpSocket::new(Domain::IPV4, SocketStyle::OneToMany)?;
    socket.bind(loopback())?;
    socket.listen(16)?;
    Ok(AsyncSctpSocket::new(socket)?)
}

async fn recv_data(socket: &AsyncSctpSocket) -> io::Result<(Bytes, SndRcvInfo, Option<SocketAddr>)> {
    loop {
        let msg = socket.recv_msg(1024).await?;
        match msg.content {
            RecvContent::Data { payload, info } => return Ok((payload, info, msg.from)),
            RecvContent::Notification(_) => continue,
        }
    }
}

#[tokio::test]
async fn rto_info_round_trip() -> io::Result<()> {
    let Some(socket) = socket(SocketStyle::OneToOne) else {
        return Ok(());
    };

    let first = socket.rto_info(0)?;
    socket.set_rto_info(&first)?;
    assert_eq!(socket.rto_info(0)?, first);

    let wanted = RtoInfo {
        assoc_id: 0,
        initial: 2000,
        min: 500,
        max: 30000,
    };
    socket.set_rto_info(&wanted)?;
    assert_eq!(socket.rto_info(0)?, wanted);
    Ok(())
}

#[tokio::test]
async fn event_subscription_round_trip() -> io::Result<()> {
    let Some(socket) = socket(SocketStyle::OneToMany) else {
        return Ok(());
    };

    // data_io is switched on by SctpSocket::new
    assert!(socket.events()?.data_io);

    let shutdown_only = EventSubscription {
        shutdown: true,
        ..Default::default()
    };
    socket.set_events(&shutdown_only)?;
    assert_eq!(socket.events()?, shutdown_only);
    Ok(())
}

#[tokio::test]
async fn init_params_round_trip() -> io::Result<()> {
    let Some(socket) = socket(SocketStyle::OneToOne) else {
        return Ok(());
    };

    let params = InitParams {
        num_ostreams: 5,
        max_instreams: 6,
        max_attempts: 3,
        max_init_timeout: 3000,
    };
    socket.set_init_params(&params)?;
    assert_eq!(socket.init_params()?, params);
    Ok(())
}

#[tokio::test]
async fn local_addrs_of_bound_socket() -> io::Result<()> {
    let Some(socket) = socket(SocketStyle::OneToOne) else {
        return Ok(());
    };

    socket.bind(loopback())?;
    let bound = socket.local_addr()?;
    assert_eq!(socket.local_addrs(0)?, vec![Some(bound)]);
    Ok(())
}

#[tokio::test]
async fn one_to_many_send_recv() -> io::Result<()> {
    if socket(SocketStyle::OneToMany).is_none() {
        return Ok(());
    }
    let server = server()?;
    let server_addr = server.get_ref().local_addr()?;

    let client = AsyncSctpSocket::new(SctpSocket::new(Domain::IPV4, SocketStyle::OneToMany)?)?;
    let opts = SendOptions {
        ppid: 46,
        stream: 1,
        ..Default::default()
    };
    let n = client.send_msg(b"hello", Some(server_addr), &opts).await?;
    assert_eq!(n, 5);

    let (payload, info, from) = recv_data(&server).await?;
    assert_eq!(&payload[..], b"hello");
    assert_eq!(info.stream, 1);
    assert_eq!(info.ppid, 46);
    assert_ne!(info.assoc_id, 0);
    let from = from.expect("source address");

    let status = server.get_ref().status(info.assoc_id)?;
    assert_eq!(status.state, sctp_sockapi::AssocState::Established);
    assert!(status.outstrms > 1);
    assert!(server.get_ref().peer_addrs(info.assoc_id)?.contains(&Some(from)));

    // answer on the same association without naming an address
    let reply = SendOptions {
        stream: info.stream,
        assoc_id: info.assoc_id,
        ..Default::default()
    };
    server.send_msg(b"world", None, &reply).await?;
    let (payload, info, _) = recv_data(&client).await?;
    assert_eq!(&payload[..], b"world");
    assert_eq!(info.stream, 1);
    Ok(())
}

#[tokio::test]
async fn empty_message_needs_eof() -> io::Result<()> {
    if socket(SocketStyle::OneToMany).is_none() {
        return Ok(());
    }
    let server = server()?;
    let server_addr = server.get_ref().local_addr()?;
    let client = AsyncSctpSocket::new(SctpSocket::new(Domain::IPV4, SocketStyle::OneToMany)?)?;

    let err = client
        .send_msg(b"", Some(server_addr), &SendOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SctpError::EmptyMessage));

    client.send_msg(b"ping", Some(server_addr), &SendOptions::default()).await?;
    recv_data(&server).await?;

    // graceful shutdown of the association to server_addr
    let eof = SendOptions {
        flags: SendFlags::EOF,
        ..Default::default()
    };
    assert_eq!(client.send_msg(b"", Some(server_addr), &eof).await?, 0);
    Ok(())
}

#[tokio::test]
async fn peeloff_association() -> io::Result<()> {
    if socket(SocketStyle::OneToMany).is_none() {
        return Ok(());
    }
    let server = server()?;
    let server_addr = server.get_ref().local_addr()?;
    let client = AsyncSctpSocket::new(SctpSocket::new(Domain::IPV4, SocketStyle::OneToMany)?)?;

    client.send_msg(b"hello", Some(server_addr), &SendOptions::default()).await?;
    let (_, info, from) = recv_data(&server).await?;

    let peeled = server.peeloff(info.assoc_id)?;
    assert_eq!(Some(peeled.get_ref().peer_addr()?), from);

    peeled.send_msg(b"direct", None, &SendOptions::default()).await?;
    let (payload, _, _) = recv_data(&client).await?;
    assert_eq!(&payload[..], b"direct");
    Ok(())
}

#[tokio::test]
async fn init_params_limit_streams() -> io::Result<()> {
    let Some(listener) = socket(SocketStyle::OneToOne) else {
        return Ok(());
    };
    listener.set_init_params(&InitParams {
        num_ostreams: 3,
        max_instreams: 3,
        max_attempts: 3,
        max_init_timeout: 30,
    })?;
    listener.bind(loopback())?;
    listener.listen(4)?;
    let listen_addr = listener.local_addr()?;
    let listener = AsyncSctpSocket::new(listener)?;

    let sender = {
        let socket = SctpSocket::new(Domain::IPV4, SocketStyle::OneToOne)?;
        socket.set_init_params(&InitParams {
            num_ostreams: 2,
            max_instreams: 2,
            max_attempts: 3,
            max_init_timeout: 30,
        })?;
        AsyncSctpSocket::connect(socket, listen_addr).await?
    };
    let (_receiver, _addr) = listener.accept().await?;

    // sent on invalid stream, expect error
    let result = sender
        .send_msg(
            b"hello",
            None,
            &SendOptions {
                stream: 2,
                ..Default::default()
            },
        )
        .await;
    assert_eq!(result.map_err(|e| e.errno()).err(), Some(Some(libc::EINVAL)));

    let result = sender
        .send_msg(
            b"hello",
            None,
            &SendOptions {
                stream: 1,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(5, result);
    Ok(())
}

#[tokio::test]
async fn multi_homing() -> io::Result<()> {
    let Some(listener) = socket(SocketStyle::OneToOne) else {
        return Ok(());
    };
    listener.bind(loopback())?;
    let port = listener.local_addr()?.port();
    let extra = PackedAddrs::from_socket_addrs(&[SocketAddr::from(([127, 0, 0, 2], port))])?;
    listener.bindx(&extra, BindxFlag::Add)?;
    listener.listen(4)?;

    let bound: Vec<_> = listener.local_addrs(0)?.into_iter().flatten().collect();
    assert_eq!(bound.len(), 2);
    let listener = AsyncSctpSocket::new(listener)?;

    let sender = SctpSocket::new(Domain::IPV4, SocketStyle::OneToOne)?;
    let targets = PackedAddrs::from_socket_addrs(&bound)?;
    let (sender, _assoc_id) = AsyncSctpSocket::connectx(sender, &targets).await?;

    let (receiver, _addr) = listener.accept().await?;
    sender.send_msg(b"hello", None, &SendOptions::default()).await?;

    let (payload, info, _) = recv_data(&receiver).await?;
    assert_eq!(0, info.stream);
    assert_eq!(&payload[..], b"hello");
    Ok(())
}
