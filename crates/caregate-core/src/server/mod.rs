//! HTTP middleware for embedding the gateway in a tower stack.
//!
//! Nothing here binds a socket; the layers wrap whatever service the host
//! application already runs.

pub mod admission_layer;

pub use admission_layer::{AdmissionLayer, AdmissionService};
