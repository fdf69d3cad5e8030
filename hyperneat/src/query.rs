use crate::{HyperNeatError, Point};

use neat_cppn::networks::Network;

/// Number of CPPN inputs: both endpoints' coordinates and a bias.
pub const CPPN_INPUTS: usize = 5;

/// CPPN outputs of at most this magnitude express no connection.
const WEIGHT_THRESHOLD: f32 = 0.2;

/// Checks that `cppn` can be queried for connection weights.
pub(crate) fn check_cppn<N: Network + ?Sized>(cppn: &N) -> Result<(), HyperNeatError> {
    if cppn.input_count() != CPPN_INPUTS || cppn.output_count() == 0 {
        return Err(HyperNeatError::CppnShape {
            expected: CPPN_INPUTS,
            inputs: cppn.input_count(),
            outputs: cppn.output_count(),
        });
    }
    Ok(())
}

/// Returns the weight of the connection between `a` and `b`,
/// from `a` to `b` if `outgoing`, and from `b` to `a` otherwise.
///
/// The CPPN is fed `(x1, y1, x2, y2, 1.0)` for a connection
/// `(x1, y1) -> (x2, y2)`. Its first output `w` becomes 0 when
/// `|w| <= 0.2`, and `sign(w) · (|w| - 0.2) / 0.8 · max_weight`
/// otherwise.
///
/// # Examples
/// ```
/// use hyperneat::query_cppn;
/// use neat_cppn::genomics::{ActivationFunction, AggregationFunction};
/// use neat_cppn::networks::{FeedForwardNetwork, NodeEval};
///
/// // A CPPN returning x2 (its third input).
/// let mut cppn = FeedForwardNetwork::new(
///     vec![0, 1, 2, 3, 4],
///     vec![5],
///     vec![NodeEval {
///         node: 5,
///         activation: ActivationFunction::Identity,
///         aggregation: AggregationFunction::Sum,
///         bias: 0.0,
///         response: 1.0,
///         links: vec![(2, 1.0)],
///     }],
/// );
///
/// assert_eq!(query_cppn((0.0, 0.0), (1.0, 0.0), true, &mut cppn, 2.0).unwrap(), 2.0);
/// assert_eq!(query_cppn((0.0, 0.0), (1.0, 0.0), false, &mut cppn, 2.0).unwrap(), 0.0);
/// assert_eq!(query_cppn((0.0, 0.0), (-1.0, 0.0), true, &mut cppn, 2.0).unwrap(), -2.0);
/// // Weak outputs express no connection.
/// assert_eq!(query_cppn((0.0, 0.0), (0.1, 0.0), true, &mut cppn, 2.0).unwrap(), 0.0);
/// ```
pub fn query_cppn<N: Network + ?Sized>(
    a: Point,
    b: Point,
    outgoing: bool,
    cppn: &mut N,
    max_weight: f32,
) -> Result<f32, HyperNeatError> {
    let ((x1, y1), (x2, y2)) = if outgoing { (a, b) } else { (b, a) };
    let outputs = cppn.activate(&[x1, y1, x2, y2, 1.0])?;
    let w = outputs.first().copied().unwrap_or(0.0);
    if w.abs() > WEIGHT_THRESHOLD {
        Ok(w.signum() * (w.abs() - WEIGHT_THRESHOLD) / (1.0 - WEIGHT_THRESHOLD) * max_weight)
    } else {
        Ok(0.0)
    }
}
