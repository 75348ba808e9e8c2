//! OpenAPI documentation and schema generation
//!
//! The specification is generated at compile time with utoipa and served at
//! `/openapi.json` (and through `/swagger-ui` when enabled).

use utoipa::OpenApi;

/// OpenAPI documentation for the reply-pacer REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "reply-pacer REST API",
        version = "0.1.0",
        description = "Buffers, chunks and paces outbound chat replies, one delivery at a time",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790", description = "Local development server")
    ),
    paths(
        // Messages
        crate::api::routes::enqueue_message,
        crate::api::routes::deliver_message,
        crate::api::routes::flush_recipient,
        crate::api::routes::split_text,

        // Buffers
        crate::api::routes::list_buffers,
        crate::api::routes::get_buffer,

        // System
        crate::api::routes::gate_stats,
        crate::api::routes::get_config,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        crate::types::RecipientId,
        crate::types::Chunk,
        crate::types::ChunkStats,
        crate::types::SplitResult,
        crate::types::EnqueueOptions,
        crate::types::EnqueueOutcome,
        crate::types::FlushOutcome,
        crate::types::BufferStatus,
        crate::types::ChunkResult,
        crate::types::DeliveryReport,
        crate::types::GateStats,
        crate::types::Event,

        crate::config::Config,
        crate::config::ChunkingConfig,
        crate::config::BufferConfig,
        crate::config::ChannelConfig,
        crate::config::RetryConfig,
        crate::config::ApiConfig,

        crate::api::routes::EnqueueMessageRequest,
        crate::api::routes::DeliverMessageRequest,
        crate::api::routes::SplitRequest,

        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "messages", description = "Buffer replies, deliver them directly, flush buffers, preview chunking"),
        (name = "buffers", description = "Per-recipient buffer status"),
        (name = "system", description = "Gate stats, configuration, health, OpenAPI spec, events"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the `X-Api-Key` header scheme
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}
