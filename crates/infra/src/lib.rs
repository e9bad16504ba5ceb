pub mod db;
pub mod deadlines;
pub mod draw;
pub mod error;
pub mod models;
pub mod pagination;
pub mod pairing;
pub mod registration;
pub mod repos;
pub mod score;

pub use error::EngineError;
