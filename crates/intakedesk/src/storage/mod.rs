pub mod filesystem;

pub use filesystem::{DocumentStorage, StoredDocument};
