pub mod availability;
pub mod connection;
pub mod meetings;
pub mod reservations;
pub mod waitlist;

pub use connection::{init_db, Database};
