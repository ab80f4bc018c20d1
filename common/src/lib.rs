//! Ambient setup shared by binaries that embed the grading engine: dotenv-backed
//! configuration and the coloured stdout/file logger.

pub mod config;
pub mod logger;

pub use config::GraderConfig;
pub use logger::init_logger;
