use crate::errors::{GraphError, GraphResult};
use crate::model::{Graph, Node, NodeId, ValueId};
use nnir_data::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Producer and consumer lists of every live node, sentinels included.
///
/// Real nodes without producers hang off Source, real nodes without
/// consumers feed Sink.
#[derive(Debug)]
pub(crate) struct Adjacency {
    producers: Vec<TVec<NodeId>>,
    consumers: Vec<TVec<NodeId>>,
}

impl Adjacency {
    pub(crate) fn of(graph: &Graph) -> Adjacency {
        let len = graph.nodes.len();
        let mut producers: Vec<TVec<NodeId>> = vec![tvec!(); len];
        let mut consumers: Vec<TVec<NodeId>> = vec![tvec!(); len];
        let mut producer_of: HashMap<ValueId, NodeId> = HashMap::new();
        for node in graph.real_nodes() {
            for &output in node.outputs() {
                if !graph.value(output).is_absent() {
                    producer_of.entry(output).or_insert(node.id);
                }
            }
        }
        for node in graph.real_nodes() {
            for input in node.inputs() {
                if let Some(&producer) = producer_of.get(input) {
                    if !producers[node.id.0].contains(&producer) {
                        producers[node.id.0].push(producer);
                        consumers[producer.0].push(node.id);
                    }
                }
            }
        }
        let (source, sink) = (graph.source_node(), graph.sink_node());
        for node in graph.real_nodes() {
            if producers[node.id.0].is_empty() {
                producers[node.id.0].push(source);
                consumers[source.0].push(node.id);
            }
            if consumers[node.id.0].is_empty() {
                consumers[node.id.0].push(sink);
                producers[sink.0].push(node.id);
            }
        }
        Adjacency { producers, consumers }
    }

    pub(crate) fn producers(&self, id: NodeId) -> &[NodeId] {
        self.producers.get(id.0).map(|p| p.as_slice()).unwrap_or(&[])
    }

    pub(crate) fn consumers(&self, id: NodeId) -> &[NodeId] {
        self.consumers.get(id.0).map(|c| c.as_slice()).unwrap_or(&[])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

#[derive(Clone, Copy, Debug)]
enum Step {
    Enter(NodeId),
    Leave(NodeId),
}

/// Depth-first search along producer edges. Colors persist across `run`
/// calls so that a search can be continued from new seeds.
pub(crate) struct ReverseDfs<'g> {
    graph: &'g Graph,
    adjacency: Adjacency,
    colors: Vec<Color>,
}

impl<'g> ReverseDfs<'g> {
    pub(crate) fn new(graph: &'g Graph) -> ReverseDfs<'g> {
        ReverseDfs { graph, adjacency: Adjacency::of(graph), colors: vec![Color::White; graph.nodes.len()] }
    }

    pub(crate) fn is_visited(&self, id: NodeId) -> bool {
        self.colors[id.0] != Color::White
    }

    /// Visits everything reachable from the seeds, first seed first. Among
    /// the producers of a node, the greatest under `compare` is visited
    /// first. Fails on the first gray producer met, reporting the cycle.
    pub(crate) fn run<E, L, C>(
        &mut self,
        seeds: &[NodeId],
        enter: &mut E,
        leave: &mut L,
        compare: &C,
    ) -> GraphResult<()>
    where
        E: FnMut(&Node),
        L: FnMut(&Node),
        C: Fn(&Node, &Node) -> Ordering,
    {
        let graph = self.graph;
        let mut stack: Vec<Step> = vec![];
        for &seed in seeds.iter().rev() {
            graph.node(seed).ok_or(GraphError::NoSuchNode(seed))?;
            stack.push(Step::Enter(seed));
        }
        let mut path: Vec<NodeId> = vec![];
        while let Some(step) = stack.pop() {
            match step {
                Step::Leave(id) => {
                    self.colors[id.0] = Color::Black;
                    path.pop();
                    if let Some(node) = graph.node(id) {
                        leave(node);
                    }
                }
                Step::Enter(id) => {
                    if self.colors[id.0] != Color::White {
                        continue;
                    }
                    let Some(node) = graph.node(id) else { continue };
                    self.colors[id.0] = Color::Gray;
                    path.push(id);
                    enter(node);
                    stack.push(Step::Leave(id));
                    let mut producers: Vec<&Node> =
                        self.adjacency.producers(id).iter().filter_map(|&p| graph.node(p)).collect();
                    producers.sort_by(|a, b| compare(a, b));
                    for producer in producers {
                        match self.colors[producer.id.0] {
                            Color::White => stack.push(Step::Enter(producer.id)),
                            Color::Gray => {
                                let start = path.iter().position(|&p| p == producer.id).unwrap_or(0);
                                let cycle = path[start..]
                                    .iter()
                                    .filter_map(|&p| graph.node(p))
                                    .map(|n| n.name.clone())
                                    .collect();
                                return Err(GraphError::GraphNotAcyclic { cycle });
                            }
                            Color::Black => (),
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Graph {
    /// Depth-first traversal following edges backwards, from consumers to
    /// producers, starting at `from`.
    ///
    /// `enter` is called when a node is first reached, `leave` once all its
    /// producers are done. `compare` fixes the visiting order among the
    /// producers of a node. Meeting a node that is still being visited
    /// means the graph has a cycle, and the traversal stops with
    /// `GraphNotAcyclic`.
    pub fn reverse_dfs_from<E, L, C>(
        &self,
        from: &[NodeId],
        mut enter: E,
        mut leave: L,
        compare: C,
    ) -> GraphResult<()>
    where
        E: FnMut(&Node),
        L: FnMut(&Node),
        C: Fn(&Node, &Node) -> Ordering,
    {
        ReverseDfs::new(self).run(from, &mut enter, &mut leave, &compare)
    }

    /// Nodes feeding `id`. Source for nodes without real producers.
    pub fn input_nodes(&self, id: NodeId) -> Vec<NodeId> {
        Adjacency::of(self).producers(id).to_vec()
    }

    /// Nodes fed by `id`. Sink for nodes without real consumers.
    pub fn output_nodes(&self, id: NodeId) -> Vec<NodeId> {
        Adjacency::of(self).consumers(id).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueInfo;

    fn chain() -> (Graph, NodeId, NodeId) {
        let mut graph = Graph::new("chain");
        let a = graph.add_node("a", "Identity", "", &[ValueInfo::untyped("x")], &[ValueInfo::untyped("y")]);
        let b = graph.add_node("b", "Identity", "", &[ValueInfo::untyped("y")], &[ValueInfo::untyped("z")]);
        (graph, a, b)
    }

    #[test]
    fn sentinel_edges() {
        let (graph, a, b) = chain();
        assert_eq!(graph.input_nodes(a), vec![graph.source_node()]);
        assert_eq!(graph.output_nodes(a), vec![b]);
        assert_eq!(graph.output_nodes(b), vec![graph.sink_node()]);
        assert_eq!(graph.input_nodes(graph.sink_node()), vec![b]);
        assert_eq!(graph.output_nodes(graph.source_node()), vec![a]);
    }

    #[test]
    fn leave_in_finish_order() {
        let (graph, _, _) = chain();
        let mut left = vec![];
        graph
            .reverse_dfs_from(&[graph.sink_node()], |_| (), |n| left.push(n.name().to_string()), |a, b| {
                a.name().cmp(b.name())
            })
            .unwrap();
        assert_eq!(left, vec!["_Graph_Source", "a", "b", "_Graph_Sink"]);
    }

    #[test]
    fn self_loop() {
        let mut graph = Graph::new("loop");
        let a = graph.add_node("a", "Identity", "", &[ValueInfo::untyped("x")], &[ValueInfo::untyped("x")]);
        let err = graph.reverse_dfs_from(&[a], |_| (), |_| (), |a, b| a.name().cmp(b.name()));
        assert_eq!(err, Err(GraphError::GraphNotAcyclic { cycle: vec!["a".to_string()] }));
    }

    #[test]
    fn unknown_seed() {
        let (graph, _, _) = chain();
        let err = graph.reverse_dfs_from(&[NodeId(42)], |_| (), |_| (), |a, b| a.name().cmp(b.name()));
        assert_eq!(err, Err(GraphError::NoSuchNode(NodeId(42))));
    }
}
