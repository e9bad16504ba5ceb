pub mod entry_service;
pub mod generation_service;
pub mod pairing_service;
pub mod payments;
pub mod sweep_service;

pub use generation_service::GenerationService;
pub use pairing_service::PairingService;
pub use sweep_service::spawn_sweep_service;
