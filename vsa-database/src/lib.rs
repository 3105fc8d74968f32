pub mod database;
pub mod impls;
pub mod model;

pub use database::{DEFAULT_STORE_PATH, PunishmentStore};
