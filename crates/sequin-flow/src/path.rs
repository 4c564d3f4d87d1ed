//! Stable string paths for flows, components and connection lines.
//!
//! Paths survive serialization (debug-info snapshots) and are resolved back
//! against the loaded project:
//!
//! - flow: `main`
//! - component: `main/components/add`
//! - connection line: `main/lines/3`

use crate::component::ComponentId;
use crate::flow::{ConnectionLineId, FlowId};
use crate::project::Project;

const COMPONENTS_SEGMENT: &str = "components";
const LINES_SEGMENT: &str = "lines";

impl Project {
  pub fn flow_path(&self, id: FlowId) -> String {
    self.flow(id).name.clone()
  }

  pub fn component_path(&self, id: ComponentId) -> String {
    format!(
      "{}/{}/{}",
      self.flow(id.flow).name,
      COMPONENTS_SEGMENT,
      self.component(id).name
    )
  }

  pub fn connection_line_path(&self, id: ConnectionLineId) -> String {
    format!("{}/{}/{}", self.flow(id.flow).name, LINES_SEGMENT, id.index)
  }

  pub fn resolve_flow_path(&self, path: &str) -> Option<FlowId> {
    self.flow_by_name(path).map(|flow| flow.id)
  }

  pub fn resolve_component_path(&self, path: &str) -> Option<ComponentId> {
    let (flow, name) = split(path, COMPONENTS_SEGMENT)?;
    self
      .flow_by_name(flow)?
      .component_by_name(name)
      .map(|component| component.id)
  }

  pub fn resolve_connection_line_path(&self, path: &str) -> Option<ConnectionLineId> {
    let (flow, index) = split(path, LINES_SEGMENT)?;
    let flow = self.flow_by_name(flow)?;
    let index: usize = index.parse().ok()?;
    (index < flow.connection_lines.len()).then_some(ConnectionLineId {
      flow: flow.id,
      index,
    })
  }
}

fn split<'a>(path: &'a str, segment: &str) -> Option<(&'a str, &'a str)> {
  let (flow, rest) = path.split_once('/')?;
  let (kind, name) = rest.split_once('/')?;
  (kind == segment).then_some((flow, name))
}
