use crate::core::connections::topology::Topology;
use crate::core::errors::{Result, SimError};
use crate::core::execution::config::{ConcurrencyMode, SimulationConfig};
use crate::core::execution::dataflow_engine::DataflowEngine;
use crate::core::execution::lockstep_engine::{LockstepEngine, StepOutcome};
use crate::core::process::{Process, ProcessObserver, Readiness};
use crate::core::types::Moc;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Life-cycle status of a process inside a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessStatus {
    Active,
    /// Permanently suspended; not an error
    Exhausted,
    /// Stopped by a fatal error
    Halted,
}

/// A process together with its run-time bookkeeping
pub(crate) struct ProcessSlot {
    pub(crate) process: Box<dyn Process>,
    pub(crate) status: ProcessStatus,
    pub(crate) firings: u64,
}

impl ProcessSlot {
    /// One complete prepare → execute → produce firing
    pub(crate) fn fire(&mut self) -> Result<()> {
        self.process.prepare()?;
        self.process.execute()?;
        self.process.produce()?;
        self.firings += 1;
        Ok(())
    }

    pub(crate) fn is_active(&self) -> bool {
        self.status == ProcessStatus::Active
    }
}

/// Summary of a finished (or aborted) run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub moc: Moc,
    /// Global steps (synchronous) or scheduling rounds (dataflow)
    pub steps: u64,
    pub firings: BTreeMap<String, u64>,
    pub status: BTreeMap<String, ProcessStatus>,
    /// Halted processes with the error that stopped them
    pub halted: Vec<(String, String)>,
    /// Smallest integer firing ratio per process (dataflow only)
    pub repetition_vector: Option<BTreeMap<String, u64>>,
}

impl RunReport {
    pub fn firings_of(&self, name: &str) -> u64 {
        self.firings.get(name).copied().unwrap_or(0)
    }
}

/// Drives a validated network: init every process, run the MoC-specific
/// firing discipline, then clean every process regardless of progress.
pub struct SimulationEngine {
    run_id: Uuid,
    moc: Moc,
    slots: Vec<ProcessSlot>,
    topology: Topology,
    repetitions: Option<Vec<u64>>,
    observers: Vec<Box<dyn ProcessObserver>>,
    config: SimulationConfig,
    pool: Option<rayon::ThreadPool>,
    initialized: bool,
    finished: bool,
    cleaned: bool,
    steps: u64,
    halted: Vec<(String, String)>,
}

impl SimulationEngine {
    pub(crate) fn new(
        moc: Moc,
        processes: Vec<Box<dyn Process>>,
        topology: Topology,
        repetitions: Option<Vec<u64>>,
        observers: Vec<Box<dyn ProcessObserver>>,
        config: SimulationConfig,
    ) -> Result<Self> {
        let pool = match config.concurrency_mode {
            ConcurrencyMode::Sequential => None,
            ConcurrencyMode::Rayon => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.thread_pool_size.unwrap_or(0))
                    .build()
                    .map_err(|e| SimError::Config(format!("cannot build thread pool: {}", e)))?,
            ),
        };

        let slots = processes
            .into_iter()
            .map(|process| ProcessSlot {
                process,
                status: ProcessStatus::Active,
                firings: 0,
            })
            .collect();

        Ok(Self {
            run_id: Uuid::new_v4(),
            moc,
            slots,
            topology,
            repetitions,
            observers,
            config,
            pool,
            initialized: false,
            finished: false,
            cleaned: false,
            steps: 0,
            halted: Vec::new(),
        })
    }

    pub fn moc(&self) -> Moc {
        self.moc
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Number of global steps / scheduling rounds executed so far
    pub fn current_step(&self) -> u64 {
        self.steps
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Run the complete simulation and tear the network down
    pub fn run(&mut self) -> Result<RunReport> {
        info!("[run {}] starting {} simulation with {} processes", self.run_id, self.moc, self.slots.len());
        let outcome = self.drive();
        self.teardown();
        match outcome {
            Ok(()) => {
                info!("[run {}] finished after {} steps", self.run_id, self.steps);
                Ok(self.report())
            }
            Err(e) => {
                error!("[run {}] aborted at step {}: {}", self.run_id, self.steps, e);
                Err(e)
            }
        }
    }

    fn drive(&mut self) -> Result<()> {
        while !self.finished {
            if let Some(max) = self.config.max_steps {
                if self.steps >= max {
                    debug!("[run {}] step bound {} reached", self.run_id, max);
                    break;
                }
            }
            self.step()?;
        }
        Ok(())
    }

    /// Advance by one global step (synchronous) or one scheduling round
    /// (dataflow). Returns `false` once the run can make no more progress.
    pub fn step(&mut self) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }
        if !self.initialized {
            self.initialize()?;
        }

        let progressed = match self.moc {
            Moc::Synchronous => {
                let engine = LockstepEngine::new(&self.topology.stages, self.pool.as_ref());
                match engine.step(&mut self.slots) {
                    Ok(StepOutcome::Completed) => true,
                    Ok(StepOutcome::Exhausted(name)) => {
                        info!("[run {}] '{}' is exhausted; synchronous run ends", self.run_id, name);
                        false
                    }
                    Err(e) => {
                        self.finished = true;
                        if let Some(process) = e.process() {
                            self.halted.push((process.to_string(), e.to_string()));
                        }
                        return Err(e);
                    }
                }
            }
            Moc::Dataflow | Moc::ContinuousTime => {
                let engine = DataflowEngine::new(self.config.halt_on_error);
                let fired = engine.round(&mut self.slots, &mut self.halted).map_err(|e| {
                    self.finished = true;
                    e
                })?;
                fired > 0
            }
        };

        if progressed {
            self.steps += 1;
            debug!("[run {}] completed step {}", self.run_id, self.steps);
        } else {
            self.finished = true;
        }
        Ok(progressed)
    }

    fn initialize(&mut self) -> Result<()> {
        self.initialized = true;
        for slot in self.slots.iter_mut() {
            let id = slot.process.id();
            let ports = slot.process.ports();
            let arguments = slot.process.arguments();
            for observer in self.observers.iter_mut() {
                observer.on_init(&id, &ports, &arguments);
            }

            if let Err(e) = slot.process.init() {
                slot.status = ProcessStatus::Halted;
                self.halted.push((id.name().to_string(), e.to_string()));
                match self.moc {
                    Moc::Synchronous => {
                        self.finished = true;
                        return Err(e);
                    }
                    Moc::Dataflow | Moc::ContinuousTime => {
                        if self.config.halt_on_error {
                            self.finished = true;
                            return Err(e);
                        }
                        warn!("[{} {}] halted during init: {}", id.kind(), id.name(), e);
                    }
                }
            } else if slot.process.readiness() == Readiness::Exhausted {
                slot.status = ProcessStatus::Exhausted;
            }
        }
        Ok(())
    }

    /// Invoke `clean` on every process, however far it progressed.
    pub fn teardown(&mut self) {
        if self.cleaned || !self.initialized {
            return;
        }
        self.cleaned = true;
        self.finished = true;
        for slot in self.slots.iter_mut() {
            if let Err(e) = slot.process.clean() {
                warn!("[{} {}] clean failed: {}", slot.process.kind(), slot.process.name(), e);
            }
        }
    }

    pub fn report(&self) -> RunReport {
        let names: Vec<String> = self.slots.iter().map(|s| s.process.name().to_string()).collect();
        RunReport {
            run_id: self.run_id.to_string(),
            moc: self.moc,
            steps: self.steps,
            firings: names
                .iter()
                .cloned()
                .zip(self.slots.iter().map(|s| s.firings))
                .collect(),
            status: names
                .iter()
                .cloned()
                .zip(self.slots.iter().map(|s| s.status))
                .collect(),
            halted: self.halted.clone(),
            repetition_vector: self
                .repetitions
                .as_ref()
                .map(|q| names.iter().cloned().zip(q.iter().copied()).collect()),
        }
    }
}

impl Drop for SimulationEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}
