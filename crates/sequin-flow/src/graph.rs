use std::collections::HashMap;

/// Connection-line index for one flow.
///
/// Components are addressed by their index within the flow, lines by their
/// declaration index. Both adjacency lists keep declaration order, which is
/// the order values fan out in.
#[derive(Debug, Clone, Default)]
pub struct Graph {
  /// component -> lines leaving it.
  outgoing: HashMap<usize, Vec<usize>>,
  /// component -> lines arriving at it.
  incoming: HashMap<usize, Vec<usize>>,
  /// Components with no incoming lines.
  entry_points: Vec<usize>,
}

impl Graph {
  /// Build the index from `(source, target)` component pairs, one per line.
  pub fn new(num_components: usize, lines: &[(usize, Option<usize>)]) -> Self {
    let mut outgoing: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut incoming: HashMap<usize, Vec<usize>> = HashMap::new();

    for (line, (source, target)) in lines.iter().enumerate() {
      outgoing.entry(*source).or_default().push(line);
      if let Some(target) = target {
        incoming.entry(*target).or_default().push(line);
      }
    }

    let entry_points = (0..num_components)
      .filter(|component| incoming.get(component).is_none_or(|v| v.is_empty()))
      .collect();

    Self {
      outgoing,
      incoming,
      entry_points,
    }
  }

  pub fn outgoing(&self, component: usize) -> &[usize] {
    self
      .outgoing
      .get(&component)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  pub fn incoming(&self, component: usize) -> &[usize] {
    self
      .incoming
      .get(&component)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Components nothing delivers into.
  pub fn entry_points(&self) -> &[usize] {
    &self.entry_points
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_graph_keeps_declaration_order() {
    // 0 -> 1, 0 -> 2, 0 -> 3, dangling from 3
    let graph = Graph::new(4, &[(0, Some(1)), (0, Some(2)), (0, Some(3)), (3, None)]);

    assert_eq!(graph.outgoing(0), &[0, 1, 2]);
    assert_eq!(graph.incoming(2), &[1]);
    assert_eq!(graph.outgoing(3), &[3]);
    assert!(graph.incoming(0).is_empty());
    assert_eq!(graph.entry_points(), &[0]);
  }
}
