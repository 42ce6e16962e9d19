pub mod api;
pub mod config;
pub mod gateway;

pub use api::ApiError;
pub use config::ConfigError;
pub use gateway::GatewayError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
