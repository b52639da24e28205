pub mod ai;
pub mod db;
pub mod error;
pub mod exercises;
pub mod metrics;
pub mod models;
pub mod nutrition;
pub mod service;
pub mod sync;
pub mod workout_session;

pub use error::FormaError;
pub use service::FormaService;
