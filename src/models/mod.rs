//! Data models shared by the gateway, the storage backends and the HTTP surface.
//!
//! - `request`: intercepted requests and their fetch destination
//! - `response`: buffered responses and where they came from
//! - `record`: cache keys and the records stored under them

// Author: kelexine (https://github.com/kelexine)

pub mod record;
pub mod request;
pub mod response;

pub use record::{CacheKey, ResponseRecord};
pub use request::{Destination, GatewayRequest};
pub use response::{GatewayResponse, ResponseSource};
