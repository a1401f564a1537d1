/*
    transfer - channel pool and per-file download coordination

    Point-to-point byte channels arrive asynchronously from the membership
    system with no ordering guarantee relative to download requests. The
    pool absorbs them and serves them to jobs; the coordinator drives one
    download at a time per counterpart and feeds progress into the catalog.
*/

mod coordinator;
mod errors;
mod pool;
mod transport;

pub use coordinator::{DownloadCoordinator, DownloadJob, JobState};
pub use errors::{TransferError, TransferResult};
pub use pool::{ChannelId, ChannelState, Endpoint, TransferChannel, TransferChannelPool};
pub use transport::{FileTransport, TransferEvent, TransferHandle};
