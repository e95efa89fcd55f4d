//! Ports to external collaborators.

pub mod outbound;

pub use outbound::{
    AdmissionOracle, ClientTxProcessor, OracleError, SystemTimeSource, TimeSource,
};
