//! HTTP plumbing for talking to the Octane server.

pub mod rest;
pub mod routes;

pub use rest::RestClient;
