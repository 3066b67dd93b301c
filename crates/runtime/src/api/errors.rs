//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, repositories, and payment setup
//! so clients can bubble them up with consistent context. Purchase
//! rejections are not errors; they are reported as
//! [`PurchaseOutcome`](crate::PurchaseOutcome) values.

use thiserror::Error;
use tokio::sync::oneshot;

pub use crate::payment::PaymentError;
pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("scheduler worker command channel closed")]
    CommandChannelClosed,

    #[error("scheduler worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("scheduler worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("runtime requires a catalog to be configured before building")]
    MissingCatalog,
}
