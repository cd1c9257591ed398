//! Async pump between a byte stream and one session.
//!
//! Inbound frames are decoded with [`CommandCodec`] and pushed into the
//! session's inbox; packets the session sends through its
//! [`ConnectionLink`] are framed and written back. The pump never runs
//! handlers: the session's own update loop does that.

use crate::core::codec::CommandCodec;
use crate::core::command::OutboundPacket;
use crate::error::Result;
use crate::protocol::queue::CommandInbox;
use crate::session::{AccountInfo, ConnectionLink, Session, SessionContext};
use crate::utils::metrics::SessionMetrics;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::codec::Framed;
use tracing::{debug, instrument, warn};

/// Pump `stream` until the peer hangs up, a frame fails to decode, or the
/// link is closed from the session side. The link is closed on return.
#[instrument(skip_all, level = "debug")]
pub async fn run_connection<S>(
    stream: S,
    inbox: CommandInbox,
    link: ConnectionLink,
    outbound: mpsc::UnboundedReceiver<OutboundPacket>,
    metrics: Arc<SessionMetrics>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, CommandCodec);
    let mut outbound = UnboundedReceiverStream::new(outbound);

    let result = loop {
        tokio::select! {
            _ = link.closed() => {
                debug!("Link closed by session");
                break Ok(());
            }
            incoming = framed.next() => match incoming {
                Some(Ok(command)) => {
                    metrics.command_received();
                    inbox.push(command);
                }
                Some(Err(e)) => {
                    metrics.protocol_violation();
                    warn!(error = %e, "Undecodable frame, closing connection");
                    break Err(e);
                }
                None => {
                    debug!("Peer closed connection");
                    break Ok(());
                }
            },
            packet = outbound.next() => match packet {
                Some(packet) => {
                    if let Err(e) = framed.send(packet).await {
                        break Err(e);
                    }
                }
                None => break Ok(()),
            },
        }
    };

    link.close();

    // packets queued before the close still go out
    let mut pending = outbound.into_inner();
    while let Ok(packet) = pending.try_recv() {
        if framed.feed(packet).await.is_err() {
            break;
        }
    }
    if let Err(e) = SinkExt::<OutboundPacket>::flush(&mut framed).await {
        debug!(error = %e, "Final flush failed");
    }

    result
}

/// Build a session for an authenticated stream and spawn its pump.
pub fn open_session<S>(
    stream: S,
    account: AccountInfo,
    ctx: Arc<SessionContext>,
) -> (Session, JoinHandle<Result<()>>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (link, outbound) = ConnectionLink::pair();
    let metrics = Arc::clone(&ctx.metrics);
    let session = Session::new(account, link.clone(), ctx);
    let pump = tokio::spawn(run_connection(stream, session.inbox(), link, outbound, metrics));
    (session, pump)
}
