#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(unsafe_code)]

pub mod models;
pub mod rl;
pub mod runtime;
