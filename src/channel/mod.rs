//! Messaging provider boundary
//!
//! Every send leaves the crate through the [`ChannelClient`] trait. Two
//! implementations ship with the crate:
//!
//! - [`HttpChannelClient`]: POSTs JSON to a provider's REST endpoint
//! - [`DryRunChannelClient`]: logs messages instead of sending them
//!
//! [`DeliveryCoordinator::new`](crate::DeliveryCoordinator::new) picks the HTTP
//! client when `channel.base_url` is configured and the dry-run client otherwise.
//! Anything else can be injected with
//! [`DeliveryCoordinator::with_client`](crate::DeliveryCoordinator::with_client).

mod dry_run;
mod http;
mod traits;

pub use dry_run::DryRunChannelClient;
pub use http::HttpChannelClient;
pub use traits::{ChannelClient, SendReceipt};
