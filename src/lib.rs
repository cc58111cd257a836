//! Sales meeting scheduling: conflict-checked bookings for salespeople,
//! plus time-boxed venue holds with a ranked waitlist.

pub mod clock;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod responses;
pub mod router;
pub mod scheduling;

#[cfg(test)]
mod tests;
