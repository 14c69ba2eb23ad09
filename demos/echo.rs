use std::{env, error::Error, net::SocketAddr};

use socket2::Domain;
use sctp_sockapi::{
    AsyncSctpSocket, BindxFlag, EventSubscription, InitParams, PackedAddrs, RecvContent, SctpSocket, SendOptions,
    SocketStyle,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let addrs = env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string())
        .split(',')
        .map(|s| s.parse())
        .collect::<Result<Vec<SocketAddr>, _>>()?;

    let socket = SctpSocket::new(Domain::for_address(addrs[0]), SocketStyle::OneToMany)?;
    socket.bind(addrs[0])?;
    if addrs.len() > 1 {
        socket.bindx(&PackedAddrs::from_socket_addrs(&addrs[1..])?, BindxFlag::Add)?;
    }
    socket.set_init_params(&InitParams {
        num_ostreams: 5,
        max_instreams: 5,
        max_attempts: 0,
        max_init_timeout: 0,
    })?;
    socket.set_events(&EventSubscription {
        data_io: true,
        association: true,
        address: true,
        shutdown: true,
        ..Default::default()
    })?;
    socket.listen(128)?;

    info!("listening on {:?}", socket.local_addrs(0)?);
    let socket = AsyncSctpSocket::new(socket)?;

    loop {
        let msg = socket.recv_msg(64 * 1024).await?;
        match msg.content {
            RecvContent::Notification(n) => info!("notification {:?}", n),
            RecvContent::Data { payload, info } => {
                let opts = SendOptions {
                    ppid: info.ppid,
                    stream: info.stream,
                    assoc_id: info.assoc_id,
                    ..Default::default()
                };
                socket.send_msg(&payload, None, &opts).await?;
            }
        }
    }
}
