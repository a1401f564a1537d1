/*
    control - group-broadcast protocol for catalog consistency

    Keeps every peer's catalog eventually consistent with three message
    kinds: a join announcement, a full-catalog handoff to joiners, and
    incremental add/remove broadcasts. The transport carrying the messages
    is a generic ordered group-broadcast primitive supplied by the embedder.
*/

mod channel;
mod errors;
mod message;
mod transport;

pub use channel::{ControlChannel, ControlRole};
pub use errors::{ControlError, ControlResult};
pub use message::ControlMessage;
pub use transport::{GroupTransport, PeerId};
