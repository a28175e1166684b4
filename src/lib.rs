// src/lib.rs

//! glowfic-dl: downloads Glowfic posts, board sections and boards and hands
//! them to an e-book assembler.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;
