//! Usage: HTTP surface (router, handlers, listener) and the Spotify OAuth client side.

mod handlers;
mod listen;
pub(crate) mod oauth;
mod routes;
mod server;

pub(crate) use routes::build_router;
pub(crate) use server::serve;
