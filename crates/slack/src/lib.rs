//! Slack edge for huddle: RTM frame parsing, the reconnecting event pump,
//! and the outbound chat API seam that carries runtime effects back to
//! the platform.

pub mod inbound;
pub mod outbound;
pub mod transport;

pub use inbound::{EventParser, ParseError};
pub use outbound::{deliver, ApiError, ChatApi, LoggingChatApi};
pub use transport::{NoopRtmTransport, ReconnectPolicy, RtmRunner, RtmTransport, TransportError};
