//! # reply-pacer
//!
//! Delivery layer for conversational agents that reply over chat and SMS
//! channels.
//!
//! Replies addressed to a recipient are buffered for a short debounce window,
//! consolidated, split into human-sized chunks with reading pauses between
//! them, and sent through a [`ChannelClient`]. Every dispatch in the process
//! passes through a single [`DeliveryGate`](gate::DeliveryGate), so at most one
//! recipient's batch is being sent at any moment no matter how many tasks or
//! threads are submitting.
//!
//! ## Quick Start
//!
//! ```no_run
//! use reply_pacer::{Config, DeliveryCoordinator, EnqueueOptions, RecipientId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = DeliveryCoordinator::new(Config::default())?;
//!
//!     let mut events = coordinator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("event: {:?}", event);
//!         }
//!     });
//!
//!     let to = RecipientId::new("+15551234567")?;
//!     coordinator
//!         .enqueue(&to, "Thanks for reaching out!", EnqueueOptions::default())
//!         .await?;
//!     coordinator
//!         .enqueue(&to, "Your order shipped this morning.", EnqueueOptions::default())
//!         .await?;
//!
//!     // Both messages go out together once the debounce window passes,
//!     // or right away on shutdown.
//!     coordinator.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Per-recipient message buffers
pub mod buffer;
/// Channel clients that perform the actual sends
pub mod channel;
/// Text chunking and pre-paced text detection
pub mod chunking;
/// Configuration types
pub mod config;
/// The delivery coordinator (decomposed into focused submodules)
pub mod coordinator;
/// Sends a chunk list through a channel client
pub mod dispatcher;
/// Error types
pub mod error;
/// Process-wide dispatch serialization
pub mod gate;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use channel::{ChannelClient, DryRunChannelClient, HttpChannelClient, SendReceipt};
pub use config::Config;
pub use coordinator::{DeliveryCoordinator, DrainSummary};
pub use error::{
    ApiError, ConcurrencyError, Error, ErrorDetail, Result, ToHttpStatus, TransportError,
    ValidationError,
};
pub use types::{
    BufferStatus, Chunk, ChunkResult, ChunkStats, DeliveryReport, EnqueueOptions, EnqueueOutcome,
    Event, FlushOutcome, GateStats, RecipientId, SplitOptions, SplitResult,
};

/// Wait for a termination signal, then drain the coordinator.
///
/// Listens for SIGTERM and SIGINT on Unix and Ctrl+C elsewhere. Returns the
/// summary of the shutdown drain.
///
/// # Example
///
/// ```no_run
/// use reply_pacer::{Config, DeliveryCoordinator, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let coordinator = DeliveryCoordinator::new(Config::default())?;
///     let _api = coordinator.spawn_api_server();
///
///     let summary = run_with_shutdown(&coordinator).await?;
///     println!("delivered {} items on the way out", summary.delivered_items);
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(coordinator: &DeliveryCoordinator) -> Result<DrainSummary> {
    wait_for_signal().await;
    coordinator.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::warn!(error = %e, "could not register SIGTERM handler, waiting for Ctrl+C only");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl+C");
            }
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => tracing::info!("received SIGINT (Ctrl+C)"),
            Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl+C"),
        },
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C"),
        Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl+C"),
    }
}
