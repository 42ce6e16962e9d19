pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;


pub const APP_NAME: &str = "gatewayctl";
