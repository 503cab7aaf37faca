pub mod ip;
pub mod source;

pub use ip::extract_client_ip;
pub use source::derive_source;
