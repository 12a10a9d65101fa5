use crate::core::channel::{Channel, ChannelMode};
use crate::core::connections::balance::repetition_vector;
use crate::core::connections::topology::{ProcessShape, TopologyValidator};
use crate::core::errors::Result;
use crate::core::execution::config::SimulationConfig;
use crate::core::execution::simulation_engine::SimulationEngine;
use crate::core::process::{Process, ProcessObserver};
use crate::core::types::{ChannelId, Moc, ProcessId};
use log::debug;
use std::fmt::Debug;

/// Imperative API for assembling a process network
///
/// Channels are created through the network so that their buffering matches
/// the model of computation; processes are then constructed on top of the
/// channel handles and added here. `build` validates the wiring.
pub struct Network {
    moc: Moc,
    /// Declared channels in creation order
    channels: Vec<(ChannelId, String)>,
    processes: Vec<Box<dyn Process>>,
    observers: Vec<Box<dyn ProcessObserver>>,
}

impl Network {
    /// Create a new network for the given model of computation
    pub fn new(moc: Moc) -> Self {
        Self {
            moc,
            channels: Vec::new(),
            processes: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn synchronous() -> Self {
        Self::new(Moc::Synchronous)
    }

    pub fn dataflow() -> Self {
        Self::new(Moc::Dataflow)
    }

    pub fn continuous_time() -> Self {
        Self::new(Moc::ContinuousTime)
    }

    pub fn moc(&self) -> Moc {
        self.moc
    }

    /// Create a channel whose buffering follows the network MoC
    pub fn signal<T: Debug>(&mut self, name: &str) -> Channel<T> {
        let id = ChannelId(self.channels.len());
        let mode = match self.moc {
            Moc::Synchronous => ChannelMode::SingleSlot,
            Moc::Dataflow | Moc::ContinuousTime => ChannelMode::Unbounded,
        };
        self.channels.push((id, name.to_string()));
        Channel::new(id, name, mode)
    }

    /// Add a process to the network
    pub fn add<P: Process + 'static>(&mut self, process: P) -> ProcessId {
        self.add_boxed(Box::new(process))
    }

    pub fn add_boxed(&mut self, process: Box<dyn Process>) -> ProcessId {
        let id = process.id();
        debug!("[{} {}] added to {} network", id.kind(), id.name(), self.moc);
        self.processes.push(process);
        id
    }

    /// Attach an introspection observer, notified once per process at init
    pub fn observe(&mut self, observer: Box<dyn ProcessObserver>) {
        self.observers.push(observer);
    }

    /// Validate the wiring and hand the network over to an engine
    pub fn build(self, config: SimulationConfig) -> Result<SimulationEngine> {
        config.validate()?;

        let shapes: Vec<ProcessShape> = self
            .processes
            .iter()
            .map(|p| ProcessShape {
                name: p.name().to_string(),
                ports: p.ports(),
                holds_state: p.holds_state(),
            })
            .collect();
        let topology = TopologyValidator::validate(&shapes, &self.channels)?;

        let repetitions = if self.moc == Moc::Dataflow {
            let names: Vec<String> = shapes.iter().map(|s| s.name.clone()).collect();
            Some(repetition_vector(&names, &topology.bindings)?)
        } else {
            None
        };

        SimulationEngine::new(
            self.moc,
            self.processes,
            topology,
            repetitions,
            self.observers,
            config,
        )
    }
}
