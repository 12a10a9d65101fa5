//! Scenario-aware dataflow: detectors choosing scenarios, kernels whose
//! token rates follow the scenario they are told to run.
//!
//! A detector fires like a static-rate actor on its data inputs. Each firing
//! moves it to a new scenario and emits a scenario-dependent number of
//! control tokens to the kernels it steers. A kernel reads one control token
//! per firing and consumes and produces the rates listed for that scenario.
//!
//! Ports whose rate depends on the scenario are declared with rate 0, which
//! keeps them out of the static balance check.

use crate::core::channel::{Channel, InPort, OutPort};
use crate::core::errors::{Result, SimError};
use crate::core::process::{check_rate, guarded, Process, Readiness};
use crate::core::types::PortSpec;
use log::debug;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Token counts of one kernel scenario, one entry per port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioRates {
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
}

impl ScenarioRates {
    pub fn new(inputs: &[usize], outputs: &[usize]) -> Self {
        Self {
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        }
    }
}

fn unknown_scenario<S: Debug>(process: &str, scenario: &S) -> SimError {
    SimError::Execution {
        process: process.to_string(),
        value: format!("{:?}", scenario),
        reason: "scenario missing from the scenario table".to_string(),
    }
}

type KernelFn<C, I, O> = Box<dyn Fn(&C, &[Vec<I>]) -> Vec<Vec<O>> + Send>;

/// Dataflow actor whose rates are selected per firing by a control token
pub struct Kernel<C, I, O> {
    name: String,
    control: InPort<C>,
    inputs: Vec<InPort<I>>,
    outputs: Vec<OutPort<O>>,
    table: HashMap<C, ScenarioRates>,
    func: KernelFn<C, I, O>,
    current: Option<(C, ScenarioRates)>,
    ivals: Vec<Vec<I>>,
    ovals: Vec<Vec<O>>,
}

/// Build a kernel.
///
/// `table` lists the input and output rates of every scenario the kernel
/// accepts. The function gets the scenario and one group per input and must
/// return one group per output sized to that scenario's output rates.
pub fn kernel<C, I, O, F>(
    name: &str,
    table: Vec<(C, ScenarioRates)>,
    control: &Channel<C>,
    inputs: &[&Channel<I>],
    outputs: &[&Channel<O>],
    func: F,
) -> Result<Kernel<C, I, O>>
where
    C: Clone + Eq + Hash + Debug,
    I: Debug,
    O: Debug,
    F: Fn(&C, &[Vec<I>]) -> Vec<Vec<O>> + Send + 'static,
{
    for (scenario, rates) in &table {
        if rates.inputs.len() != inputs.len() || rates.outputs.len() != outputs.len() {
            return Err(SimError::Config(format!(
                "{}: scenario {:?} lists {} input and {} output rates for {} inputs and {} outputs",
                name,
                scenario,
                rates.inputs.len(),
                rates.outputs.len(),
                inputs.len(),
                outputs.len()
            )));
        }
    }
    Ok(Kernel {
        name: name.to_string(),
        control: InPort::new("c1", control, 1),
        inputs: inputs
            .iter()
            .enumerate()
            .map(|(i, ch)| InPort::new(&format!("i{}", i + 1), ch, 0))
            .collect(),
        outputs: outputs
            .iter()
            .enumerate()
            .map(|(i, ch)| OutPort::new(&format!("o{}", i + 1), ch, 0))
            .collect(),
        table: table.into_iter().collect(),
        func: Box::new(func),
        current: None,
        ivals: Vec::new(),
        ovals: Vec::new(),
    })
}

impl<C, I, O> Process for Kernel<C, I, O>
where
    C: Clone + Eq + Hash + Debug + Send + 'static,
    I: Debug + Send + 'static,
    O: Debug + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sadf::kernel"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports = vec![self.control.spec()];
        ports.extend(self.inputs.iter().map(|p| p.spec()));
        ports.extend(self.outputs.iter().map(|p| p.spec()));
        ports
    }

    fn readiness(&self) -> Readiness {
        let Some(scenario) = self.control.peek() else {
            return Readiness::Waiting;
        };
        match self.table.get(&scenario) {
            Some(rates) if !self.inputs.iter().zip(&rates.inputs).all(|(p, &n)| p.available() >= n) => {
                Readiness::Waiting
            }
            // an unknown scenario fails in prepare
            _ => Readiness::Ready,
        }
    }

    fn prepare(&mut self) -> Result<()> {
        let scenario = self.control.read().map_err(|e| SimError::channel(&self.name, e))?;
        let rates = self
            .table
            .get(&scenario)
            .cloned()
            .ok_or_else(|| unknown_scenario(&self.name, &scenario))?;
        self.ivals = self
            .inputs
            .iter()
            .zip(&rates.inputs)
            .map(|(p, &n)| p.read_n(n).map_err(|e| SimError::channel(&self.name, e)))
            .collect::<Result<_>>()?;
        self.current = Some((scenario, rates));
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let Some((scenario, rates)) = self.current.take() else {
            return Ok(());
        };
        let func = &self.func;
        let ivals = std::mem::take(&mut self.ivals);
        let groups = guarded(&self.name, &ivals, || func(&scenario, &ivals))?;
        check_rate(&self.name, "outputs", self.outputs.len(), &groups)?;
        for ((port, group), &n) in self.outputs.iter().zip(&groups).zip(&rates.outputs) {
            check_rate(&self.name, port.name(), n, group)?;
        }
        debug!("[sadf::kernel {}] fired in scenario {:?}", self.name, scenario);
        self.ovals = groups;
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        for (port, group) in self.outputs.iter().zip(self.ovals.drain(..)) {
            port.write_all(group).map_err(|e| SimError::channel(&self.name, e))?;
        }
        Ok(())
    }

    fn arguments(&self) -> Vec<(String, String)> {
        vec![("scenarios".to_string(), self.table.len().to_string())]
    }
}

type NextScenarioFn<S, I> = Box<dyn Fn(&S, &[Vec<I>]) -> S + Send>;
type SelectFn<S, I, C> = Box<dyn Fn(&S, &[Vec<I>]) -> Vec<Vec<C>> + Send>;

/// Scenario state machine steering a set of kernels
pub struct Detector<S, I, C> {
    name: String,
    inputs: Vec<InPort<I>>,
    outputs: Vec<OutPort<C>>,
    table: HashMap<S, Vec<usize>>,
    initial: S,
    scenario: S,
    next: NextScenarioFn<S, I>,
    select: SelectFn<S, I, C>,
    ivals: Vec<Vec<I>>,
    ovals: Vec<Vec<C>>,
}

/// Build a detector.
///
/// Every firing consumes the fixed `inputs` rates, computes the new scenario
/// from the previous one with `next`, then asks `select` for the control
/// tokens of each output. `table` gives the number of control tokens each
/// output carries in every scenario. A detector without inputs fires in
/// every scheduling round.
pub fn detector<S, I, C, N, K>(
    name: &str,
    initial: S,
    table: Vec<(S, Vec<usize>)>,
    inputs: &[(&Channel<I>, usize)],
    outputs: &[&Channel<C>],
    next: N,
    select: K,
) -> Result<Detector<S, I, C>>
where
    S: Clone + Eq + Hash + Debug,
    I: Debug,
    C: Debug,
    N: Fn(&S, &[Vec<I>]) -> S + Send + 'static,
    K: Fn(&S, &[Vec<I>]) -> Vec<Vec<C>> + Send + 'static,
{
    if let Some((scenario, counts)) = table.iter().find(|(_, counts)| counts.len() != outputs.len()) {
        return Err(SimError::Config(format!(
            "{}: scenario {:?} lists {} output counts for {} outputs",
            name,
            scenario,
            counts.len(),
            outputs.len()
        )));
    }
    Ok(Detector {
        name: name.to_string(),
        inputs: inputs
            .iter()
            .enumerate()
            .map(|(i, (ch, rate))| InPort::new(&format!("i{}", i + 1), ch, *rate))
            .collect(),
        outputs: outputs
            .iter()
            .enumerate()
            .map(|(i, ch)| OutPort::new(&format!("o{}", i + 1), ch, 0))
            .collect(),
        table: table.into_iter().collect(),
        scenario: initial.clone(),
        initial,
        next: Box::new(next),
        select: Box::new(select),
        ivals: Vec::new(),
        ovals: Vec::new(),
    })
}

impl<S, I, C> Detector<S, I, C> {
    /// Scenario chosen by the latest firing
    pub fn scenario(&self) -> &S {
        &self.scenario
    }
}

impl<S, I, C> Process for Detector<S, I, C>
where
    S: Clone + Eq + Hash + Debug + Send + 'static,
    I: Debug + Send + 'static,
    C: Debug + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sadf::detector"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports: Vec<PortSpec> = self.inputs.iter().map(|p| p.spec()).collect();
        ports.extend(self.outputs.iter().map(|p| p.spec()));
        ports
    }

    fn readiness(&self) -> Readiness {
        if self.inputs.iter().all(|p| p.satisfied()) {
            Readiness::Ready
        } else {
            Readiness::Waiting
        }
    }

    fn prepare(&mut self) -> Result<()> {
        self.ivals = self
            .inputs
            .iter()
            .map(|p| p.read_rate().map_err(|e| SimError::channel(&self.name, e)))
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let ivals = std::mem::take(&mut self.ivals);
        let (next, select) = (&self.next, &self.select);
        let previous = &self.scenario;
        let (scenario, groups) = guarded(&self.name, &ivals, || {
            let scenario = next(previous, &ivals);
            let groups = select(&scenario, &ivals);
            (scenario, groups)
        })?;
        let counts = self
            .table
            .get(&scenario)
            .ok_or_else(|| unknown_scenario(&self.name, &scenario))?;
        check_rate(&self.name, "outputs", self.outputs.len(), &groups)?;
        for ((port, group), &n) in self.outputs.iter().zip(&groups).zip(counts) {
            check_rate(&self.name, port.name(), n, group)?;
        }
        debug!("[sadf::detector {}] {:?} -> {:?}", self.name, self.scenario, scenario);
        self.scenario = scenario;
        self.ovals = groups;
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        for (port, group) in self.outputs.iter().zip(self.ovals.drain(..)) {
            port.write_all(group).map_err(|e| SimError::channel(&self.name, e))?;
        }
        Ok(())
    }

    fn arguments(&self) -> Vec<(String, String)> {
        vec![
            ("init_sc".to_string(), format!("{:?}", self.initial)),
            ("scenarios".to_string(), self.table.len().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::channel::ChannelMode;
    use crate::core::types::ChannelId;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Phase {
        Plus,
        Minus,
        Copy,
    }

    fn channel<T: Debug>(id: usize, name: &str) -> Channel<T> {
        Channel::new(ChannelId(id), name, ChannelMode::Unbounded)
    }

    fn fire(process: &mut dyn Process) -> Result<()> {
        process.prepare()?;
        process.execute()?;
        process.produce()
    }

    #[test]
    fn test_detector_cycles_scenarios_without_inputs() {
        let ctrl: Channel<Phase> = channel(0, "ctrl");
        let mut det = detector::<Phase, i32, Phase, _, _>(
            "k",
            Phase::Copy,
            vec![(Phase::Plus, vec![1]), (Phase::Minus, vec![1]), (Phase::Copy, vec![2])],
            &[],
            &[&ctrl],
            |prev, _| match prev {
                Phase::Plus => Phase::Minus,
                Phase::Minus => Phase::Copy,
                Phase::Copy => Phase::Plus,
            },
            |sc, _| match sc {
                Phase::Copy => vec![vec![Phase::Copy, Phase::Copy]],
                other => vec![vec![*other]],
            },
        )
        .unwrap();

        assert_eq!(det.readiness(), Readiness::Ready);
        for _ in 0..4 {
            fire(&mut det).unwrap();
        }
        assert_eq!(det.scenario(), &Phase::Plus);
        assert_eq!(
            ctrl.snapshot(),
            vec![Phase::Plus, Phase::Minus, Phase::Copy, Phase::Copy, Phase::Plus]
        );
    }

    #[test]
    fn test_detector_rejects_wrong_control_count() {
        let ctrl: Channel<Phase> = channel(0, "ctrl");
        let mut det = detector::<Phase, i32, Phase, _, _>(
            "k",
            Phase::Plus,
            vec![(Phase::Plus, vec![1]), (Phase::Minus, vec![1])],
            &[],
            &[&ctrl],
            |_, _| Phase::Minus,
            |_, _| vec![vec![]],
        )
        .unwrap();

        let err = fire(&mut det).unwrap_err();
        assert!(matches!(err, SimError::RateMismatch { expected: 1, got: 0, .. }));
    }

    #[test]
    fn test_kernel_waits_for_scenario_rates() {
        let ctrl: Channel<Phase> = channel(0, "ctrl");
        let data: Channel<i32> = channel(1, "data");
        let out: Channel<i32> = channel(2, "out");
        let mut k = kernel(
            "t",
            vec![
                (Phase::Plus, ScenarioRates::new(&[2], &[1])),
                (Phase::Minus, ScenarioRates::new(&[1], &[1])),
            ],
            &ctrl,
            &[&data],
            &[&out],
            |sc, ins: &[Vec<i32>]| match sc {
                Phase::Plus => vec![vec![ins[0].iter().sum()]],
                _ => vec![vec![-ins[0][0]]],
            },
        )
        .unwrap();

        assert_eq!(k.readiness(), Readiness::Waiting);
        ctrl.write(Phase::Plus).unwrap();
        data.write(3).unwrap();
        assert_eq!(k.readiness(), Readiness::Waiting);
        data.write(4).unwrap();
        assert_eq!(k.readiness(), Readiness::Ready);
        fire(&mut k).unwrap();

        ctrl.write(Phase::Minus).unwrap();
        data.write(5).unwrap();
        fire(&mut k).unwrap();
        assert_eq!(out.snapshot(), vec![7, -5]);
    }

    #[test]
    fn test_kernel_unknown_scenario_is_execution_error() {
        let ctrl: Channel<Phase> = channel(0, "ctrl");
        let data: Channel<i32> = channel(1, "data");
        let out: Channel<i32> = channel(2, "out");
        let mut k = kernel(
            "t",
            vec![(Phase::Plus, ScenarioRates::new(&[1], &[1]))],
            &ctrl,
            &[&data],
            &[&out],
            |_, ins: &[Vec<i32>]| vec![ins[0].clone()],
        )
        .unwrap();

        ctrl.write(Phase::Copy).unwrap();
        assert_eq!(k.readiness(), Readiness::Ready);
        let err = k.prepare().unwrap_err();
        assert!(err.to_string().contains("scenario missing"), "{}", err);
    }

    #[test]
    fn test_kernel_table_shape_checked() {
        let ctrl: Channel<Phase> = channel(0, "ctrl");
        let data: Channel<i32> = channel(1, "data");
        let out: Channel<i32> = channel(2, "out");
        let result = kernel(
            "t",
            vec![(Phase::Plus, ScenarioRates::new(&[1, 1], &[1]))],
            &ctrl,
            &[&data],
            &[&out],
            |_, ins: &[Vec<i32>]| vec![ins[0].clone()],
        );
        assert!(matches!(result, Err(SimError::Config(_))));
    }
}
