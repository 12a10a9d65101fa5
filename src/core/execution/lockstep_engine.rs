use crate::core::errors::Result;
use crate::core::execution::simulation_engine::{ProcessSlot, ProcessStatus};
use crate::core::process::Readiness;
use log::debug;
use rayon::prelude::*;
use std::collections::HashSet;

pub(crate) enum StepOutcome {
    Completed,
    /// A process can never fire again, so no further step can be complete
    Exhausted(String),
}

/// Lock-step execution of synchronous networks
///
/// Every process fires exactly once per global step. State-holding
/// processes emit their pending output before anything else runs, then all
/// processes fire stage by stage in producer-before-consumer order; the
/// state-holding ones only read and update their state in that pass.
pub(crate) struct LockstepEngine<'a> {
    stages: &'a [Vec<usize>],
    pool: Option<&'a rayon::ThreadPool>,
}

impl<'a> LockstepEngine<'a> {
    pub(crate) fn new(stages: &'a [Vec<usize>], pool: Option<&'a rayon::ThreadPool>) -> Self {
        Self { stages, pool }
    }

    pub(crate) fn step(&self, slots: &mut [ProcessSlot]) -> Result<StepOutcome> {
        // A step either runs every process or none
        for slot in slots.iter_mut() {
            if slot.process.readiness() == Readiness::Exhausted {
                slot.status = ProcessStatus::Exhausted;
                return Ok(StepOutcome::Exhausted(slot.process.name().to_string()));
            }
        }

        for slot in slots.iter_mut().filter(|s| s.process.holds_state()) {
            if let Err(e) = slot.process.produce() {
                slot.status = ProcessStatus::Halted;
                return Err(e);
            }
        }

        for stage in self.stages {
            self.fire_stage(slots, stage)?;
        }
        Ok(StepOutcome::Completed)
    }

    fn fire_stage(&self, slots: &mut [ProcessSlot], stage: &[usize]) -> Result<()> {
        match self.pool {
            None => {
                for &index in stage {
                    fire_in_step(&mut slots[index])?;
                }
                Ok(())
            }
            Some(pool) => {
                let members: HashSet<usize> = stage.iter().copied().collect();
                debug!("firing stage of {} processes in parallel", members.len());
                let results: Vec<Result<()>> = pool.install(|| {
                    slots
                        .par_iter_mut()
                        .enumerate()
                        .filter(|(index, _)| members.contains(index))
                        .map(|(_, slot)| fire_in_step(slot))
                        .collect()
                });
                results.into_iter().collect()
            }
        }
    }
}

fn fire_in_step(slot: &mut ProcessSlot) -> Result<()> {
    let outcome = if slot.process.holds_state() {
        slot.process
            .prepare()
            .and_then(|_| slot.process.execute())
            .map(|_| slot.firings += 1)
    } else {
        slot.fire()
    };
    if outcome.is_err() {
        slot.status = ProcessStatus::Halted;
    }
    outcome
}
