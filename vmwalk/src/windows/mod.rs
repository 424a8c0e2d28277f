mod proc;
mod token;

pub use proc::{Process, Windows};
