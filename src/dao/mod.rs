/// Remote persistence of the game collection document.
pub mod document_store;
/// Persisted record and document definitions.
pub mod models;
/// Error taxonomy shared by the document stores.
pub mod storage;
/// Storefront metadata and search clients.
pub mod storefront;
