pub mod config;
pub mod constants;
pub mod io;
pub mod protocol;
pub mod tilemap;
