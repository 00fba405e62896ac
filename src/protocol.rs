//! Implementation of the client-server communication protocol
//!
//! This module provides structures mapping the protocol messages, helper functions for messages and an entrypoint
//! function that runs the protocol on a given [`WebSocketStream`] connection : [`execute_protocol_on_connection`].
//!
//! The structures are :
//! * Serializable : [`GameCreatedMessage`], [`JoinAcceptedMessage`], [`JoinRefusedMessage`], [`GameStateMessage`],
//!   [`PlayerLeftMessage`] and [`GameOverMessage`], wrapped in the enum [`ServerEvent`].
//! * Deserializable : [`ClientRequest`], produced by [`parse_client_request`].
//!
//! A connection task owns no game state. It forwards validated requests to the hub as [`Command`]s, and writes
//! every [`ServerEvent`] the hub addresses to it back onto the websocket.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use futures_util::{SinkExt, StreamExt};

pub use messages::events::{
    GameCreatedMessage, GameOverMessage, GameStateMessage, JoinAcceptedMessage, JoinRefusedMessage,
    PlayerLeftMessage, ServerEvent,
};
pub use messages::requests::{parse_client_request, ClientRequest, ClientRequestError};

use crate::hub::Command;

pub mod constants;
mod messages;
mod role;

/// Run the protocol on a fresh connection until the client disconnects or violates the protocol.
///
/// The task registers its outbound channel with the hub first, so that every event the hub emits for this
/// connection from then on reaches the socket. On any exit path, a [`Command::Disconnect`] is sent so the hub
/// can vacate the seat the connection may hold.
pub async fn execute_protocol_on_connection<S>(
    mut websocket: WebSocketStream<S>,
    connection_id: String,
    hub: mpsc::UnboundedSender<Command>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    log::info!("{connection_id}: Beginning to unroll the protocol with a client.");

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerEvent>();
    if hub
        .send(Command::Register {
            connection: connection_id.clone(),
            outbound: outbound_tx,
        })
        .is_err()
    {
        log::warn!("{connection_id}: The hub is gone. Dropping the connection.");
        return;
    }

    loop {
        tokio::select! {
            event = outbound_rx.recv() => {
                // The hub dropped our outbound sender ; nothing will ever be addressed to us again.
                let Some(event) = event else { break };
                if let Err(e) = websocket.send(Message::Binary(Vec::from(event))).await {
                    log::info!("{connection_id}: Failed to write to the websocket : {e}.");
                    break;
                }
            }
            msg = websocket.next() => {
                match parse_client_request(msg) {
                    Ok(Some(request)) => {
                        if hub.send(command_for_request(&connection_id, request)).is_err() {
                            log::warn!("{connection_id}: The hub is gone. Dropping the connection.");
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(ClientRequestError::ConnectionLost) => {
                        log::info!("{connection_id}: The client disconnected.");
                        break;
                    }
                    Err(e) => {
                        log::info!("{connection_id}: Dropping the connection : {e}.");
                        break;
                    }
                }
            }
        }
    }

    let _ = hub.send(Command::Disconnect {
        connection: connection_id.clone(),
    });
    log::info!("{connection_id}: Protocol done.");
}

/// Wrap a validated request into the hub command carrying the issuing connection.
fn command_for_request(connection_id: &str, request: ClientRequest) -> Command {
    let connection = String::from(connection_id);
    match request {
        ClientRequest::CreateGame => Command::CreateGame { connection },
        ClientRequest::JoinGame { game_id } => Command::JoinGame {
            connection,
            game_id,
        },
        ClientRequest::PaddleMove { role, action } => Command::PaddleMove {
            connection,
            role,
            action,
        },
    }
}
