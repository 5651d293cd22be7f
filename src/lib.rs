pub mod config;
pub mod game;
pub mod games;
pub mod network;
pub mod protocol;
pub mod render;
pub mod scheduler;
pub mod session;
