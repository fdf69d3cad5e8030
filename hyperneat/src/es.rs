//! Evolvable-substrate HyperNEAT.
//!
//! Hidden nodes are not given by the substrate but discovered:
//! from every input, a quadtree over `[-1, 1]²` is divided where
//! the CPPN's outgoing weights vary, and connections are expressed
//! at the leaves that stand out from their neighbourhood. The search
//! is repeated from the discovered hidden nodes, then run backwards
//! from every output, and the nodes that lie on no input to output
//! path are pruned.
use crate::query::{check_cppn, query_cppn};
use crate::{HyperNeatError, Point, Substrate};

use ahash::RandomState;
use neat_cppn::genomics::{ActivationFunction, AggregationFunction};
use neat_cppn::networks::{Network, NodeEval, RecurrentNetwork};
use serde::{Deserialize, Serialize};
use tracing::debug;

use std::collections::{BTreeMap, HashMap, HashSet};

/// Offsets of a quadtree node's children, in half-widths.
const CHILD_OFFSETS: [(f32, f32); 4] = [(-1.0, -1.0), (-1.0, 1.0), (1.0, 1.0), (1.0, -1.0)];

/// Parameters of the ES-HyperNEAT search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EsParams {
    /// Level down to which the quadtree is always divided.
    /// The root is at level 1.
    pub initial_depth: usize,
    /// Level past which the quadtree is never divided.
    pub max_depth: usize,
    /// Regions with a weight variance above this value
    /// are searched further for connections.
    pub variance_threshold: f32,
    /// Minimum contrast with the neighbouring regions
    /// for a connection to be expressed.
    pub band_threshold: f32,
    /// Number of searches started from discovered hidden nodes.
    pub iteration_level: usize,
    /// Regions with a weight variance above this value are
    /// divided past `initial_depth`.
    pub division_threshold: f32,
    pub max_weight: f32,
    /// Activation function of the hidden and output nodes.
    pub activation: ActivationFunction,
}

impl EsParams {
    /// Returns a parameter set with every numeric
    /// field set to 0 and sigmoid activations.
    pub const fn zero() -> EsParams {
        EsParams {
            initial_depth: 0,
            max_depth: 0,
            variance_threshold: 0.0,
            band_threshold: 0.0,
            iteration_level: 0,
            division_threshold: 0.0,
            max_weight: 0.0,
            activation: ActivationFunction::Sigmoid,
        }
    }

    /// Activations needed for a signal to cross the
    /// discovered network: `2^max_depth + 1`.
    pub fn activations(&self) -> usize {
        1usize
            .checked_shl(self.max_depth as u32)
            .map_or(usize::MAX, |n| n.saturating_add(1))
    }
}

/// A weighted connection between two substrate points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Link {
    pub source: Point,
    pub target: Point,
    pub weight: f32,
}

/// Hashable form of a point; `-0.0` and `0.0` coincide.
type PointKey = (u32, u32);

fn point_key((x, y): Point) -> PointKey {
    ((x + 0.0).to_bits(), (y + 0.0).to_bits())
}

#[derive(Clone, Debug)]
struct QuadPoint {
    x: f32,
    y: f32,
    width: f32,
    level: usize,
    weight: f32,
    children: Vec<QuadPoint>,
}

impl QuadPoint {
    fn new(x: f32, y: f32, width: f32, level: usize) -> QuadPoint {
        QuadPoint {
            x,
            y,
            width,
            level,
            weight: 0.0,
            children: vec![],
        }
    }

    fn leaf_weights(&self, weights: &mut Vec<f32>) {
        if self.children.is_empty() {
            weights.push(self.weight);
        }
        for child in &self.children {
            child.leaf_weights(weights);
        }
    }

    /// Population variance of the weights of the leaves below.
    fn variance(&self) -> f32 {
        if self.children.is_empty() {
            return 0.0;
        }
        let mut weights = vec![];
        self.leaf_weights(&mut weights);
        let count = weights.len() as f32;
        let mean = weights.iter().sum::<f32>() / count;
        weights.iter().map(|w| (w - mean).powi(2)).sum::<f32>() / count
    }
}

/// Connections in discovery order, without duplicate endpoints.
#[derive(Default)]
struct LinkSet {
    links: Vec<Link>,
    seen: HashSet<(PointKey, PointKey), RandomState>,
}

impl LinkSet {
    fn insert(&mut self, link: Link) {
        if self.seen.insert((point_key(link.source), point_key(link.target))) {
            self.links.push(link);
        }
    }
}

/// An ES-HyperNEAT search over a substrate's inputs and outputs,
/// driven by a CPPN.
///
/// # Examples
/// ```
/// use hyperneat::{EsNetwork, EsParams, Substrate};
/// use neat_cppn::genomics::{ActivationFunction, AggregationFunction};
/// use neat_cppn::networks::{FeedForwardNetwork, Network, NodeEval};
///
/// // A CPPN returning x1 + x2.
/// let mut cppn = FeedForwardNetwork::new(
///     vec![0, 1, 2, 3, 4],
///     vec![5],
///     vec![NodeEval {
///         node: 5,
///         activation: ActivationFunction::Identity,
///         aggregation: AggregationFunction::Sum,
///         bias: 0.0,
///         response: 1.0,
///         links: vec![(0, 1.0), (2, 1.0)],
///     }],
/// );
/// let substrate = Substrate {
///     inputs: vec![(0.0, -1.0)],
///     hidden: vec![],
///     outputs: vec![(0.0, 1.0)],
///     activation: ActivationFunction::Identity,
/// };
/// let params = EsParams {
///     initial_depth: 1,
///     max_depth: 1,
///     band_threshold: 0.3,
///     max_weight: 1.0,
///     activation: ActivationFunction::Identity,
///     ..EsParams::zero()
/// };
///
/// let mut network = EsNetwork::new(&substrate, &mut cppn, params)
///     .create_phenotype_network()
///     .unwrap();
/// let mut output = vec![];
/// for _ in 0..params.activations() {
///     output = network.activate(&[1.0]).unwrap();
/// }
/// assert!(output[0] > 0.0);
/// ```
pub struct EsNetwork<'a, N: Network + ?Sized> {
    substrate: &'a Substrate,
    cppn: &'a mut N,
    params: EsParams,
}

impl<'a, N: Network + ?Sized> EsNetwork<'a, N> {
    pub fn new(substrate: &'a Substrate, cppn: &'a mut N, params: EsParams) -> EsNetwork<'a, N> {
        EsNetwork {
            substrate,
            cppn,
            params,
        }
    }

    pub fn params(&self) -> &EsParams {
        &self.params
    }

    /// Builds the phenotype network: inputs take indices
    /// `0..n`, outputs `n..n + m`, and the discovered hidden
    /// nodes follow. Every node with incoming connections
    /// sums them with a bias of 0 and a response of 1.
    ///
    /// # Errors
    /// Returns an error if the CPPN does not have 5 inputs
    /// and at least one output.
    pub fn create_phenotype_network(&mut self) -> Result<RecurrentNetwork, HyperNeatError> {
        let (hidden, links) = self.es_hyperneat()?;
        let substrate = self.substrate;

        let mut indices: HashMap<PointKey, usize, RandomState> = HashMap::default();
        for (index, &point) in substrate
            .inputs
            .iter()
            .chain(&substrate.outputs)
            .chain(&hidden)
            .enumerate()
        {
            indices.entry(point_key(point)).or_insert(index);
        }

        let mut incoming: BTreeMap<usize, Vec<(usize, f32)>> = BTreeMap::new();
        for link in &links {
            let source = indices.get(&point_key(link.source));
            let target = indices.get(&point_key(link.target));
            if let (Some(&source), Some(&target)) = (source, target) {
                // Inputs are clamped.
                if target >= substrate.inputs.len() {
                    incoming.entry(target).or_default().push((source, link.weight));
                }
            }
        }

        let node_evals = incoming
            .into_iter()
            .map(|(node, links)| NodeEval {
                node,
                activation: self.params.activation,
                aggregation: AggregationFunction::Sum,
                bias: 0.0,
                response: 1.0,
                links,
            })
            .collect();

        let input_count = substrate.inputs.len();
        Ok(RecurrentNetwork::new(
            (0..input_count).collect(),
            (input_count..input_count + substrate.outputs.len()).collect(),
            node_evals,
        ))
    }

    /// Runs the search and returns the hidden nodes, sorted
    /// by `y` then `x`, and the connections that lie on some
    /// input to output path.
    ///
    /// Each of the `iteration_level` hidden searches starts
    /// from the nodes the previous search discovered.
    ///
    /// # Errors
    /// Returns an error if the CPPN does not have 5 inputs
    /// and at least one output.
    pub fn es_hyperneat(&mut self) -> Result<(Vec<Point>, Vec<Link>), HyperNeatError> {
        check_cppn(&*self.cppn)?;
        let substrate = self.substrate;

        let mut links = LinkSet::default();
        let mut hidden: HashSet<PointKey, RandomState> = HashSet::default();
        let mut unexplored = vec![];

        for &input in &substrate.inputs {
            for link in self.explore(input, true)? {
                if hidden.insert(point_key(link.target)) {
                    unexplored.push(link.target);
                }
                links.insert(link);
            }
        }

        for _ in 0..self.params.iteration_level {
            let mut discovered = vec![];
            for &node in &unexplored {
                for link in self.explore(node, true)? {
                    if hidden.insert(point_key(link.target)) {
                        discovered.push(link.target);
                    }
                    links.insert(link);
                }
            }
            unexplored = discovered;
        }

        for &output in &substrate.outputs {
            for link in self.explore(output, false)? {
                links.insert(link);
            }
        }

        let (hidden, links) = self.clean_net(links.links);
        debug!(
            hidden = hidden.len(),
            connections = links.len(),
            "explored evolvable substrate"
        );
        Ok((hidden, links))
    }

    /// Searches the connections going out of `coord`,
    /// or coming into it when `outgoing` is false.
    fn explore(&mut self, coord: Point, outgoing: bool) -> Result<Vec<Link>, HyperNeatError> {
        let root = self.division_initialization(coord, outgoing)?;
        let mut links = vec![];
        self.pruning_extraction(coord, &root, outgoing, &mut links)?;
        Ok(links)
    }

    fn query(&mut self, coord: Point, point: Point, outgoing: bool) -> Result<f32, HyperNeatError> {
        query_cppn(coord, point, outgoing, self.cppn, self.params.max_weight)
    }

    fn division_initialization(
        &mut self,
        coord: Point,
        outgoing: bool,
    ) -> Result<QuadPoint, HyperNeatError> {
        let mut root = QuadPoint::new(0.0, 0.0, 1.0, 1);
        self.divide(&mut root, coord, outgoing)?;
        Ok(root)
    }

    fn divide(
        &mut self,
        point: &mut QuadPoint,
        coord: Point,
        outgoing: bool,
    ) -> Result<(), HyperNeatError> {
        let half = point.width / 2.0;
        for (dx, dy) in CHILD_OFFSETS {
            let mut child = QuadPoint::new(
                point.x + dx * half,
                point.y + dy * half,
                half,
                point.level + 1,
            );
            child.weight = self.query(coord, (child.x, child.y), outgoing)?;
            point.children.push(child);
        }

        let divide_further = point.level < self.params.initial_depth
            || (point.level < self.params.max_depth
                && point.variance() > self.params.division_threshold);
        if divide_further {
            for child in &mut point.children {
                self.divide(child, coord, outgoing)?;
            }
        }
        Ok(())
    }

    fn pruning_extraction(
        &mut self,
        coord: Point,
        point: &QuadPoint,
        outgoing: bool,
        links: &mut Vec<Link>,
    ) -> Result<(), HyperNeatError> {
        for child in &point.children {
            if child.variance() > self.params.variance_threshold {
                self.pruning_extraction(coord, child, outgoing, links)?;
                continue;
            }

            let offset = point.width;
            let mut contrast = |x: f32, y: f32| -> Result<f32, HyperNeatError> {
                Ok((child.weight - self.query(coord, (x, y), outgoing)?).abs())
            };
            let left = contrast(child.x - offset, child.y)?;
            let right = contrast(child.x + offset, child.y)?;
            let top = contrast(child.x, child.y - offset)?;
            let bottom = contrast(child.x, child.y + offset)?;

            if top.min(bottom).max(left.min(right)) <= self.params.band_threshold {
                continue;
            }
            let link = if outgoing {
                Link {
                    source: coord,
                    target: (child.x, child.y),
                    weight: child.weight,
                }
            } else {
                Link {
                    source: (child.x, child.y),
                    target: coord,
                    weight: child.weight,
                }
            };
            if link.weight != 0.0 && link.source.1 < link.target.1 {
                links.push(link);
            }
        }
        Ok(())
    }

    /// Keeps the connections whose endpoints are both reachable
    /// from an input and able to reach an output.
    fn clean_net(&self, links: Vec<Link>) -> (Vec<Point>, Vec<Link>) {
        let from_inputs = reachable(&self.substrate.inputs, &links, true);
        let to_outputs = reachable(&self.substrate.outputs, &links, false);
        let on_path = |p: Point| {
            let key = point_key(p);
            from_inputs.contains(&key) && to_outputs.contains(&key)
        };
        let links: Vec<Link> = links
            .into_iter()
            .filter(|l| on_path(l.source) && on_path(l.target))
            .collect();

        let io: HashSet<PointKey, RandomState> = self
            .substrate
            .inputs
            .iter()
            .chain(&self.substrate.outputs)
            .map(|&p| point_key(p))
            .collect();
        let mut seen: HashSet<PointKey, RandomState> = HashSet::default();
        let mut hidden: Vec<Point> = links
            .iter()
            .flat_map(|l| [l.source, l.target])
            .filter(|&p| !io.contains(&point_key(p)) && seen.insert(point_key(p)))
            .collect();
        hidden.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.total_cmp(&b.0)));

        (hidden, links)
    }
}

/// Points reachable from `start` by following `links`,
/// forwards or backwards.
fn reachable(start: &[Point], links: &[Link], forward: bool) -> HashSet<PointKey, RandomState> {
    let mut reached: HashSet<PointKey, RandomState> = start.iter().map(|&p| point_key(p)).collect();
    loop {
        let before = reached.len();
        for link in links {
            let (from, to) = if forward {
                (link.source, link.target)
            } else {
                (link.target, link.source)
            };
            if reached.contains(&point_key(from)) {
                reached.insert(point_key(to));
            }
        }
        if reached.len() == before {
            return reached;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use neat_cppn::networks::FeedForwardNetwork;

    /// A CPPN summing some of its inputs.
    fn cppn(links: Vec<(usize, f32)>) -> FeedForwardNetwork {
        FeedForwardNetwork::new(
            vec![0, 1, 2, 3, 4],
            vec![5],
            vec![NodeEval {
                node: 5,
                activation: ActivationFunction::Identity,
                aggregation: AggregationFunction::Sum,
                bias: 0.0,
                response: 1.0,
                links,
            }],
        )
    }

    fn substrate() -> Substrate {
        Substrate {
            inputs: vec![(0.0, -1.0)],
            hidden: vec![],
            outputs: vec![(0.0, 1.0)],
            activation: ActivationFunction::Identity,
        }
    }

    fn params() -> EsParams {
        EsParams {
            initial_depth: 1,
            max_depth: 1,
            variance_threshold: 0.03,
            band_threshold: 0.3,
            division_threshold: 0.01,
            max_weight: 1.0,
            activation: ActivationFunction::Identity,
            ..EsParams::zero()
        }
    }

    fn leaf_count(point: &QuadPoint) -> usize {
        if point.children.is_empty() {
            1
        } else {
            point.children.iter().map(leaf_count).sum()
        }
    }

    #[test]
    fn activations_grow_with_depth() {
        assert_eq!(EsParams { max_depth: 3, ..params() }.activations(), 9);
        assert_eq!(EsParams::zero().activations(), 2);
    }

    #[test]
    fn variance_of_leaves() {
        let mut root = QuadPoint::new(0.0, 0.0, 1.0, 1);
        assert_eq!(root.variance(), 0.0);
        for w in [1.0, -1.0, 1.0, -1.0] {
            let mut child = QuadPoint::new(0.0, 0.0, 0.5, 2);
            child.weight = w;
            root.children.push(child);
        }
        assert_eq!(root.variance(), 1.0);
    }

    #[test]
    fn uniform_weights_stop_at_initial_depth() {
        let substrate = substrate();
        let mut cppn = cppn(vec![(4, 1.0)]);
        let params = EsParams {
            max_depth: 3,
            ..params()
        };
        let mut search = EsNetwork::new(&substrate, &mut cppn, params);
        let root = search.division_initialization((0.0, -1.0), true).unwrap();
        assert_eq!(leaf_count(&root), 4);

        let params = EsParams {
            initial_depth: 2,
            max_depth: 3,
            ..params
        };
        let mut search = EsNetwork::new(&substrate, &mut cppn, params);
        let root = search.division_initialization((0.0, -1.0), true).unwrap();
        assert_eq!(leaf_count(&root), 16);
    }

    #[test]
    fn varying_weights_divide_up_to_max_depth() {
        let substrate = substrate();
        // Weight follows the target's x.
        let mut cppn = cppn(vec![(2, 1.0)]);
        let params = EsParams {
            max_depth: 2,
            ..params()
        };
        let mut search = EsNetwork::new(&substrate, &mut cppn, params);
        let root = search.division_initialization((0.0, -1.0), true).unwrap();
        assert_eq!(leaf_count(&root), 16);
        assert_eq!(root.children[0].children[0].level, 3);
        assert_eq!(root.children[0].children[0].width, 0.25);
    }

    #[test]
    fn uniform_weights_express_nothing() {
        let substrate = substrate();
        let mut cppn = cppn(vec![(4, 1.0)]);
        let mut search = EsNetwork::new(&substrate, &mut cppn, params());
        let (hidden, links) = search.es_hyperneat().unwrap();
        assert!(hidden.is_empty());
        assert!(links.is_empty());

        let mut network = search.create_phenotype_network().unwrap();
        assert!(network.node_evals().is_empty());
        assert_eq!(network.activate(&[1.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn hidden_nodes_bridge_inputs_and_outputs() {
        let substrate = substrate();
        let mut cppn = cppn(vec![(0, 1.0), (2, 1.0)]);
        let mut search = EsNetwork::new(&substrate, &mut cppn, params());
        let (hidden, links) = search.es_hyperneat().unwrap();

        assert_eq!(
            hidden,
            vec![(-0.5, -0.5), (0.5, -0.5), (-0.5, 0.5), (0.5, 0.5)]
        );
        // Input to each hidden node, each hidden node to the output.
        assert_eq!(links.len(), 8);
        assert!(links.iter().all(|l| l.source.1 < l.target.1));
    }

    #[test]
    fn hidden_iterations_link_hidden_nodes() {
        let substrate = substrate();
        let mut cppn = cppn(vec![(0, 1.0), (2, 1.0)]);
        let params = EsParams {
            iteration_level: 1,
            ..params()
        };
        let mut search = EsNetwork::new(&substrate, &mut cppn, params);
        let (hidden, links) = search.es_hyperneat().unwrap();

        assert_eq!(hidden.len(), 4);
        assert_eq!(links.len(), 10);
        assert!(links
            .iter()
            .any(|l| l.source == (0.5, -0.5) && l.target == (0.5, 0.5)));
    }

    #[test]
    fn phenotype_indexes_hidden_nodes_after_outputs() {
        let substrate = substrate();
        let mut cppn = cppn(vec![(0, 1.0), (2, 1.0)]);
        let params = params();
        let mut network = EsNetwork::new(&substrate, &mut cppn, params)
            .create_phenotype_network()
            .unwrap();

        let evals = network.node_evals();
        assert_eq!(evals.len(), 5);
        assert_eq!(evals[0].node, 1);
        assert_eq!(evals[0].links.len(), 4);
        assert!(evals[1..].iter().all(|e| e.links.len() == 1 && e.links[0].0 == 0));

        // Hidden weights are ±w, output weights the same sign.
        let mut output = vec![];
        for _ in 0..params.activations() {
            output = network.activate(&[1.0]).unwrap();
        }
        assert!(output[0] > 0.0);
    }

    #[test]
    fn dead_ends_are_pruned() {
        let mut substrate = substrate();
        // Only the lower hidden nodes reach an output at the origin.
        substrate.outputs = vec![(0.0, 0.0)];
        let mut cppn = cppn(vec![(0, 1.0), (2, 1.0)]);
        let mut search = EsNetwork::new(&substrate, &mut cppn, params());
        let (hidden, links) = search.es_hyperneat().unwrap();
        assert_eq!(hidden, vec![(-0.5, -0.5), (0.5, -0.5)]);
        assert_eq!(links.len(), 4);
    }

    #[test]
    fn cppn_shape_is_checked() {
        let substrate = substrate();
        let mut cppn = FeedForwardNetwork::new(vec![0], vec![1], vec![]);
        assert!(matches!(
            EsNetwork::new(&substrate, &mut cppn, params()).create_phenotype_network(),
            Err(HyperNeatError::CppnShape { inputs: 1, .. })
        ));
    }
}
