/// datamock - a mock HTTP API with deterministic synthetic data
///
/// This is the root crate that provides workspace-level documentation.
/// Actual implementation is in the subcrates:
/// - `datamock-core`: schema model, data engine and fault-injection logic
/// - `datamock-server`: HTTP server exposing datasets and the control API
/// - `datamock-client`: typed async client for the server

/// Returns the version of the package.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
