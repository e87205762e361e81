mod dispatcher;
mod messages;
mod ws_connection;

pub use dispatcher::SignalingDispatcher;
pub use messages::{
    events, ClientEnvelope, OutboundMessage, ServerNotification, ServerReply,
};
pub use ws_connection::handle_socket;
