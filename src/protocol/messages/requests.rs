//! Parsing and validation of client-to-server messages.
//!
//! Everything a client can ask for is validated here, at the boundary, before any of it reaches the registry :
//! out-of-range roles, actions or directions are protocol violations and never become [`ClientRequest`]s.

use ciborium::value::Integer;
use ciborium::Value;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::Message;

use crate::game::{MoveDirection, PaddleAction, Role};

const CREATE_GAME_MSG_ID: u8 = 0;
const JOIN_GAME_MSG_ID: u8 = 1;
const PADDLE_MOVE_MSG_ID: u8 = 2;

/// A validated request from a client.
#[derive(Debug, Eq, PartialEq)]
pub enum ClientRequest {
    CreateGame,
    JoinGame { game_id: String },
    PaddleMove { role: Role, action: PaddleAction },
}

/// Errors encountered while receiving a request from the client.
#[derive(thiserror::Error, Debug)]
pub enum ClientRequestError {
    /// This error happens when a poll to a [`WebSocketStream`](tokio_tungstenite::WebSocketStream) returns an
    /// error.
    #[error("Error at the websocket layer : {0}")]
    ConnectionError(#[from] tungstenite::Error),

    /// This error happens when a poll to a [`WebSocketStream`](tokio_tungstenite::WebSocketStream) returns
    /// [`None`], or that the connection has been closed.
    #[error("Connection closed or lost")]
    ConnectionLost,

    /// This error happens when the deserialization of the binary data received fails.
    #[error("Parsing failed : {0:?}")]
    ParsingFailed(#[from] ciborium::de::Error<<&'static [u8] as ciborium_io::Read>::Error>),

    /// This error happens when the client sends a message type other than [`Message::Ping`] and
    /// [`Message::Binary`], an unknown message id, or an out-of-range field.
    #[error("Received a malformed or out-of-range request")]
    ProtocolViolation,
}

/// Process the output of a poll on a [`WebSocketStream`](tokio_tungstenite::WebSocketStream). Handle
/// [`ClientRequestError`]s, and - if it was not a ping - return the validated request.
pub fn parse_client_request(
    msg: Option<Result<Message, tungstenite::Error>>,
) -> Result<Option<ClientRequest>, ClientRequestError> {
    match msg {
        Some(Ok(Message::Ping(_))) => Ok(None),
        Some(Ok(Message::Binary(bytes))) => decode_request(&bytes).map(Some),
        Some(Ok(_)) => Err(ClientRequestError::ProtocolViolation),
        Some(Err(tungstenite::Error::ConnectionClosed)) | None => {
            Err(ClientRequestError::ConnectionLost)
        }
        Some(Err(e)) => Err(ClientRequestError::ConnectionError(e)),
    }
}

/// Decode a binary frame : a CBOR array whose first element is the message id.
fn decode_request(bytes: &[u8]) -> Result<ClientRequest, ClientRequestError> {
    let fields: Vec<Value> = ciborium::from_reader(bytes)?;
    match fields.as_slice() {
        [Value::Integer(id)] if *id == Integer::from(CREATE_GAME_MSG_ID) => {
            Ok(ClientRequest::CreateGame)
        }
        [Value::Integer(id), Value::Text(game_id)] if *id == Integer::from(JOIN_GAME_MSG_ID) => {
            Ok(ClientRequest::JoinGame {
                game_id: game_id.clone(),
            })
        }
        [Value::Integer(id), Value::Integer(role), Value::Integer(action), Value::Integer(direction)]
            if *id == Integer::from(PADDLE_MOVE_MSG_ID) =>
        {
            decode_paddle_move(*role, *action, *direction)
        }
        _ => Err(ClientRequestError::ProtocolViolation),
    }
}

/// Validate the fields of a paddle move. The direction travels on stop requests too, but is ignored there.
fn decode_paddle_move(
    role: Integer,
    action: Integer,
    direction: Integer,
) -> Result<ClientRequest, ClientRequestError> {
    let role = u8::try_from(role)
        .ok()
        .and_then(|r| Role::try_from(r).ok())
        .ok_or(ClientRequestError::ProtocolViolation)?;
    let direction = match u8::try_from(direction) {
        Ok(0) => MoveDirection::Up,
        Ok(1) => MoveDirection::Down,
        _ => return Err(ClientRequestError::ProtocolViolation),
    };
    let action = match u8::try_from(action) {
        Ok(0) => PaddleAction::Stop,
        Ok(1) => PaddleAction::Start(direction),
        _ => return Err(ClientRequestError::ProtocolViolation),
    };
    Ok(ClientRequest::PaddleMove { role, action })
}
