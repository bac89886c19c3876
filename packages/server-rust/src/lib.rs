//! Gazette Server -- articles microservice with a bus request/response bridge.
//!
//! The HTTP surface (`network`) serves plain CRUD against `storage`; the
//! interesting part is `bus`, which lets request handlers call other
//! services over an asynchronous publish/subscribe bus as if they were
//! synchronous RPCs, and `service`, which fans one caller-facing read out
//! into several correlated calls and merges the results.

pub mod bus;
pub mod network;
pub mod service;
pub mod storage;

pub use network::{NetworkConfig, NetworkModule};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
