mod server;

pub use server::{routes, serve, HttpState};
