/// OpenAPI documentation generation.
pub mod documentation;
/// Background refresh of storefront metadata.
pub mod enrichment;
/// Health check service.
pub mod health_service;
/// User actions on the game library.
pub mod library_service;
/// Load-time migration of legacy status values.
pub mod reconciliation;
/// Store credentials management.
pub mod settings_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Optimistic compare-and-swap updates of the remote document.
pub mod update_coordinator;

#[cfg(test)]
mod test_support;
