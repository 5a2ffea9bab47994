pub mod bytes;
pub mod error;

pub use bytes::{bytes_to_elements, elements_to_bytes};
