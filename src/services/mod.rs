pub mod auxiliary;
pub mod cache;
pub mod client;
pub mod coordinator;
pub mod fetcher;
pub mod forecast;
pub mod location;
pub mod metrics;
pub mod sensors;
pub mod window;
pub mod xml;
