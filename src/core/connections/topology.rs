use crate::core::errors::{Result, SimError};
use crate::core::execution::execution_order::ExecutionOrderBuilder;
use crate::core::types::{ChannelId, PortDirection, PortSpec};
use std::collections::{BTreeMap, HashSet};

/// What the validator needs to know about one process
#[derive(Debug, Clone)]
pub struct ProcessShape {
    pub name: String,
    pub ports: Vec<PortSpec>,
    pub holds_state: bool,
}

/// One end of a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Index of the process in the network
    pub process: usize,
    pub port: String,
    pub rate: usize,
}

/// A fully wired channel: one writer, one reader
#[derive(Debug, Clone)]
pub struct ChannelBinding {
    pub channel: ChannelId,
    pub name: String,
    pub writer: Endpoint,
    pub reader: Endpoint,
}

/// Validated wiring of a network
#[derive(Debug, Clone)]
pub struct Topology {
    pub bindings: Vec<ChannelBinding>,
    /// Dependency stages for lock-step execution
    pub stages: Vec<Vec<usize>>,
}

/// Centralized wiring validation
pub struct TopologyValidator;

impl TopologyValidator {
    /// Check that every channel has exactly one writer and one reader and that
    /// every cycle passes through at least one state-holding process.
    pub fn validate(processes: &[ProcessShape], channels: &[(ChannelId, String)]) -> Result<Topology> {
        Self::check_unique_names(processes)?;

        let known: BTreeMap<ChannelId, &str> =
            channels.iter().map(|(id, name)| (*id, name.as_str())).collect();
        let mut writers: BTreeMap<ChannelId, Endpoint> = BTreeMap::new();
        let mut readers: BTreeMap<ChannelId, Endpoint> = BTreeMap::new();

        for (index, shape) in processes.iter().enumerate() {
            for port in &shape.ports {
                let channel_name = known.get(&port.channel).ok_or_else(|| {
                    SimError::Topology(format!(
                        "Port '{}' on process '{}' is bound to channel {} which does not belong to this network",
                        port.name, shape.name, port.channel
                    ))
                })?;
                let endpoint = Endpoint {
                    process: index,
                    port: port.name.clone(),
                    rate: port.rate,
                };
                let (table, role) = match port.direction {
                    PortDirection::Output => (&mut writers, "writer"),
                    PortDirection::Input => (&mut readers, "reader"),
                };
                if let Some(existing) = table.get(&port.channel) {
                    return Err(SimError::Topology(format!(
                        "Channel '{}' already has a {} (port '{}' on process '{}'); port '{}' on process '{}' cannot also bind to it. Insert a fanout process instead.",
                        channel_name,
                        role,
                        existing.port,
                        processes[existing.process].name,
                        port.name,
                        shape.name
                    )));
                }
                table.insert(port.channel, endpoint);
            }
        }

        let mut bindings = Vec::with_capacity(channels.len());
        for (id, name) in channels {
            let writer = writers
                .remove(id)
                .ok_or_else(|| SimError::Topology(format!("Channel '{}' has no writer", name)))?;
            let reader = readers
                .remove(id)
                .ok_or_else(|| SimError::Topology(format!("Channel '{}' has no reader", name)))?;
            bindings.push(ChannelBinding {
                channel: *id,
                name: name.clone(),
                writer,
                reader,
            });
        }

        let stages = Self::dependency_stages(processes, &bindings)?;
        Ok(Topology { bindings, stages })
    }

    fn check_unique_names(processes: &[ProcessShape]) -> Result<()> {
        let mut seen = HashSet::new();
        for shape in processes {
            if !seen.insert(shape.name.as_str()) {
                return Err(SimError::Topology(format!(
                    "Process name '{}' is used more than once",
                    shape.name
                )));
            }
        }
        Ok(())
    }

    /// Producer-before-consumer ordering. Channels written by state-holding
    /// processes impose no ordering within a step.
    fn dependency_stages(processes: &[ProcessShape], bindings: &[ChannelBinding]) -> Result<Vec<Vec<usize>>> {
        let edges: Vec<(usize, usize)> = bindings
            .iter()
            .filter(|b| !processes[b.writer.process].holds_state)
            .map(|b| (b.writer.process, b.reader.process))
            .collect();

        ExecutionOrderBuilder::build_execution_order_stages(processes.len(), &edges).map_err(|cycle| {
            let names: Vec<&str> = cycle
                .nodes
                .iter()
                .map(|&n| processes[n].name.as_str())
                .collect();
            SimError::Topology(format!(
                "Cycle without a delay process detected among: {}",
                names.join(", ")
            ))
        })
    }
}
