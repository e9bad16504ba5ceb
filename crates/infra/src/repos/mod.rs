pub mod entries;
pub mod events;
pub mod holds;
pub mod pairings;
pub mod registrations;
pub mod structures;

pub use entries::EntryRepo;
pub use events::EventRepo;
pub use holds::HoldRepo;
pub use pairings::PairingRepo;
pub use registrations::RegistrationRepo;
pub use structures::StructureRepo;
