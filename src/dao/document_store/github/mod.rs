mod config;
mod error;
mod models;
mod store;

pub use config::{GithubConfig, credentials_from_env};
pub use error::{GithubDaoError, GithubResult};
pub use store::GithubDocumentStore;
