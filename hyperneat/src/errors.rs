use neat_cppn::networks::NetworkError;

use thiserror::Error;

/// An error type indicating a failure to
/// build a substrate network.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HyperNeatError {
    /// The CPPN does not take `(x1, y1, x2, y2, bias)`
    /// or has no output.
    #[error("CPPN must have {expected} inputs and at least one output, found {inputs} -> {outputs}")]
    CppnShape {
        expected: usize,
        inputs: usize,
        outputs: usize,
    },
    #[error(transparent)]
    Network(#[from] NetworkError),
}
