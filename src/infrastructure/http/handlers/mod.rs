//! HTTP Handlers

mod book;
mod ping;
mod review;
mod websocket;

pub use book::*;
pub use ping::*;
pub use review::*;
pub use websocket::*;
