pub mod components;
pub mod hf_client;
pub mod session;

pub use hf_client::HfClient;
