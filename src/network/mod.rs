pub mod broadcast;
pub mod handler;
pub mod udp;
