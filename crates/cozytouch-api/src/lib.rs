// cozytouch-api: Async client for the Cozytouch cloud API

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod remote;
pub mod transport;

pub use client::{ClientConfig, CozytouchClient};
pub use error::Error;
pub use models::{CommandRequest, RawConnectivity, RawGateway, RawNode, RawPlace, RawSetup};
pub use remote::RemoteClient;
pub use transport::TransportConfig;
