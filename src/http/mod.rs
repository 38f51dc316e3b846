//! Outgoing request plumbing: framework-agnostic request/response values, the
//! reqwest transport, and the ordered middleware pipeline.

pub mod pipeline;
pub mod request;
pub mod transport;

pub use pipeline::RequestPipeline;
pub use request::{ApiRequest, ApiResponse, Method};
pub use transport::{HttpTransport, ReqwestTransport, TransportError};
