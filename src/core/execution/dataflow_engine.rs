use crate::core::errors::Result;
use crate::core::execution::simulation_engine::{ProcessSlot, ProcessStatus};
use crate::core::process::Readiness;
use log::{debug, warn};

/// Data-driven execution for dataflow and continuous-time networks
///
/// There is no global step: in each scheduling round every active process
/// whose firing rule is met fires once. A process with unmet input rates is
/// simply skipped; the run is quiescent once a full round fires nothing.
pub(crate) struct DataflowEngine {
    halt_on_error: bool,
}

impl DataflowEngine {
    pub(crate) fn new(halt_on_error: bool) -> Self {
        Self { halt_on_error }
    }

    /// Run one scheduling round and return the number of firings
    pub(crate) fn round(&self, slots: &mut [ProcessSlot], halted: &mut Vec<(String, String)>) -> Result<usize> {
        let mut fired = 0;
        for slot in slots.iter_mut().filter(|s| s.is_active()) {
            match slot.process.readiness() {
                Readiness::Ready => match slot.fire() {
                    Ok(()) => fired += 1,
                    Err(e) => {
                        slot.status = ProcessStatus::Halted;
                        if self.halt_on_error {
                            return Err(e);
                        }
                        warn!(
                            "[{} {}] halted after {} firings: {}",
                            slot.process.kind(),
                            slot.process.name(),
                            slot.firings,
                            e
                        );
                        halted.push((slot.process.name().to_string(), e.to_string()));
                    }
                },
                Readiness::Waiting => {}
                Readiness::Exhausted => {
                    debug!("[{} {}] exhausted", slot.process.kind(), slot.process.name());
                    slot.status = ProcessStatus::Exhausted;
                }
            }
        }
        Ok(fired)
    }
}
