//! Back-office entry points: seeding an in-memory engine and running the
//! expiry sweep from the command line.

pub mod seed;
