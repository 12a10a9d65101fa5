//! Synchronous (lock-step) process constructors.
//!
//! Every signal carries [`ExtendedValue`] tokens, one per global step. A
//! process reads exactly one token per input and writes exactly one token per
//! output in every step; absence is a legal token and propagates.

use crate::core::channel::{Channel, InPort, OutPort};
use crate::core::errors::{Result, SimError};
use crate::core::process::{check_rate, guarded, Process, Readiness};
use crate::core::types::PortSpec;
use crate::core::values::{unwrap_all, ExtendedValue};
use crate::moc::shared::{Collector, Fanout, Generator, LineSource, LineSink};
use std::collections::VecDeque;
use std::fmt::Debug;
use std::path::PathBuf;

/// A synchronous signal
pub type SyChannel<T> = Channel<ExtendedValue<T>>;

fn in_port<T: Debug>(index: usize, channel: &SyChannel<T>) -> InPort<ExtendedValue<T>> {
    InPort::new(&format!("i{}", index + 1), channel, 1)
}

fn out_port<T: Debug>(index: usize, channel: &SyChannel<T>) -> OutPort<ExtendedValue<T>> {
    OutPort::new(&format!("o{}", index + 1), channel, 1)
}

fn all_satisfied<T: Debug>(ports: &[InPort<T>]) -> Readiness {
    if ports.iter().all(|p| p.satisfied()) {
        Readiness::Ready
    } else {
        Readiness::Waiting
    }
}

type CombFn<I, O> = Box<dyn Fn(&[I]) -> Vec<O> + Send>;

/// N-input, M-output combinational process
pub struct Comb<I, O> {
    name: String,
    inputs: Vec<InPort<ExtendedValue<I>>>,
    outputs: Vec<OutPort<ExtendedValue<O>>>,
    func: CombFn<I, O>,
    ivals: Vec<ExtendedValue<I>>,
    ovals: Vec<ExtendedValue<O>>,
}

/// Combinational process over present values.
///
/// The function receives one value per input and must return one value per
/// output. If any input is absent in a step, every output is absent.
pub fn comb<I, O, F>(name: &str, inputs: &[&SyChannel<I>], outputs: &[&SyChannel<O>], func: F) -> Comb<I, O>
where
    I: Debug,
    O: Debug,
    F: Fn(&[I]) -> Vec<O> + Send + 'static,
{
    Comb {
        name: name.to_string(),
        inputs: inputs.iter().enumerate().map(|(i, ch)| in_port(i, ch)).collect(),
        outputs: outputs.iter().enumerate().map(|(i, ch)| out_port(i, ch)).collect(),
        func: Box::new(func),
        ivals: Vec::new(),
        ovals: Vec::new(),
    }
}

impl<I, O> Process for Comb<I, O>
where
    I: Clone + Debug + Send + 'static,
    O: Clone + Debug + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sy::comb"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports: Vec<PortSpec> = self.inputs.iter().map(|p| p.spec()).collect();
        ports.extend(self.outputs.iter().map(|p| p.spec()));
        ports
    }

    fn readiness(&self) -> Readiness {
        all_satisfied(&self.inputs)
    }

    fn prepare(&mut self) -> Result<()> {
        self.ivals = self
            .inputs
            .iter()
            .map(|p| p.read())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| SimError::channel(&self.name, e))?;
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        self.ovals = match unwrap_all(&self.ivals) {
            Some(values) => {
                let func = &self.func;
                let results = guarded(&self.name, &values, || func(&values))?;
                check_rate(&self.name, "outputs", self.outputs.len(), &results)?;
                results.into_iter().map(ExtendedValue::Present).collect()
            }
            None => self.outputs.iter().map(|_| ExtendedValue::Absent).collect(),
        };
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        for (port, value) in self.outputs.iter().zip(self.ovals.drain(..)) {
            port.write(value).map_err(|e| SimError::channel(&self.name, e))?;
        }
        Ok(())
    }

    fn arguments(&self) -> Vec<(String, String)> {
        vec![
            ("inputs".to_string(), self.inputs.len().to_string()),
            ("outputs".to_string(), self.outputs.len().to_string()),
        ]
    }
}

type Comb2Fn<A, B, O> = Box<dyn Fn(&A, &B) -> O + Send>;

/// Two-input combinational process over distinct token types
pub struct Comb2<A, B, O> {
    name: String,
    input1: InPort<ExtendedValue<A>>,
    input2: InPort<ExtendedValue<B>>,
    output: OutPort<ExtendedValue<O>>,
    func: Comb2Fn<A, B, O>,
    ivals: Option<(ExtendedValue<A>, ExtendedValue<B>)>,
    oval: ExtendedValue<O>,
}

pub fn comb2<A, B, O, F>(name: &str, input1: &SyChannel<A>, input2: &SyChannel<B>, output: &SyChannel<O>, func: F) -> Comb2<A, B, O>
where
    A: Debug,
    B: Debug,
    O: Debug,
    F: Fn(&A, &B) -> O + Send + 'static,
{
    Comb2 {
        name: name.to_string(),
        input1: in_port(0, input1),
        input2: in_port(1, input2),
        output: out_port(0, output),
        func: Box::new(func),
        ivals: None,
        oval: ExtendedValue::Absent,
    }
}

impl<A, B, O> Process for Comb2<A, B, O>
where
    A: Debug + Send + 'static,
    B: Debug + Send + 'static,
    O: Debug + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sy::comb2"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input1.spec(), self.input2.spec(), self.output.spec()]
    }

    fn readiness(&self) -> Readiness {
        if self.input1.satisfied() && self.input2.satisfied() {
            Readiness::Ready
        } else {
            Readiness::Waiting
        }
    }

    fn prepare(&mut self) -> Result<()> {
        let a = self.input1.read().map_err(|e| SimError::channel(&self.name, e))?;
        let b = self.input2.read().map_err(|e| SimError::channel(&self.name, e))?;
        self.ivals = Some((a, b));
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        self.oval = match self.ivals.take() {
            Some((ExtendedValue::Present(a), ExtendedValue::Present(b))) => {
                let func = &self.func;
                ExtendedValue::Present(guarded(&self.name, &(&a, &b), || func(&a, &b))?)
            }
            _ => ExtendedValue::Absent,
        };
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        let value = std::mem::take(&mut self.oval);
        self.output.write(value).map_err(|e| SimError::channel(&self.name, e))
    }
}

type TransformFn<I, O> = Box<dyn FnMut(ExtendedValue<I>) -> ExtendedValue<O> + Send>;

/// Single-input, single-output process whose output depends on the input of
/// the same step (and possibly on hidden state).
pub struct Transform<I, O> {
    name: String,
    kind: &'static str,
    input: InPort<ExtendedValue<I>>,
    output: OutPort<ExtendedValue<O>>,
    func: TransformFn<I, O>,
    ival: ExtendedValue<I>,
    oval: ExtendedValue<O>,
}

impl<I: Debug, O: Debug> Transform<I, O> {
    fn new<F>(name: &str, kind: &'static str, input: &SyChannel<I>, output: &SyChannel<O>, func: F) -> Self
    where
        F: FnMut(ExtendedValue<I>) -> ExtendedValue<O> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            kind,
            input: in_port(0, input),
            output: out_port(0, output),
            func: Box::new(func),
            ival: ExtendedValue::Absent,
            oval: ExtendedValue::Absent,
        }
    }
}

impl<I, O> Process for Transform<I, O>
where
    I: Clone + Debug + Send + 'static,
    O: Debug + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.kind
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input.spec(), self.output.spec()]
    }

    fn readiness(&self) -> Readiness {
        all_satisfied(std::slice::from_ref(&self.input))
    }

    fn prepare(&mut self) -> Result<()> {
        self.ival = self.input.read().map_err(|e| SimError::channel(&self.name, e))?;
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let value = std::mem::take(&mut self.ival);
        let func = &mut self.func;
        let shown = value.clone();
        self.oval = guarded(&self.name, &shown, || func(value))?;
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        let value = std::mem::take(&mut self.oval);
        self.output.write(value).map_err(|e| SimError::channel(&self.name, e))
    }
}

/// Mealy machine: next state and output both depend on state and input.
///
/// Absent inputs leave the state unchanged and yield an absent output.
pub fn mealy<S, I, O, NS, OD>(
    name: &str,
    next_state: NS,
    output_decode: OD,
    initial: S,
    input: &SyChannel<I>,
    output: &SyChannel<O>,
) -> Transform<I, O>
where
    S: Send + 'static,
    I: Clone + Debug + Send + 'static,
    O: Debug + Send + 'static,
    NS: Fn(&S, &I) -> S + Send + 'static,
    OD: Fn(&S, &I) -> O + Send + 'static,
{
    let mut state = initial;
    Transform::new(name, "sy::mealy", input, output, move |value| match value {
        ExtendedValue::Present(x) => {
            let out = output_decode(&state, &x);
            state = next_state(&state, &x);
            ExtendedValue::Present(out)
        }
        ExtendedValue::Absent => ExtendedValue::Absent,
    })
}

/// Replace absent tokens with a default value
pub fn fill<T>(name: &str, default: T, input: &SyChannel<T>, output: &SyChannel<T>) -> Transform<T, T>
where
    T: Clone + Debug + Send + 'static,
{
    Transform::new(name, "sy::fill", input, output, move |value| {
        ExtendedValue::Present(value.unwrap_or(default.clone()))
    })
}

/// Replace absent tokens with the last present value (initially `default`)
pub fn hold<T>(name: &str, default: T, input: &SyChannel<T>, output: &SyChannel<T>) -> Transform<T, T>
where
    T: Clone + Debug + Send + 'static,
{
    let mut last = default;
    Transform::new(name, "sy::hold", input, output, move |value| {
        if let ExtendedValue::Present(v) = value {
            last = v;
        }
        ExtendedValue::Present(last.clone())
    })
}

/// Collect `samples` tokens and emit them as one vector on every
/// `samples`-th step; absent in between.
pub fn group<T>(name: &str, samples: usize, input: &SyChannel<T>, output: &SyChannel<Vec<ExtendedValue<T>>>) -> Transform<T, Vec<ExtendedValue<T>>>
where
    T: Clone + Debug + Send + 'static,
{
    let mut buffer = Vec::with_capacity(samples);
    Transform::new(name, "sy::group", input, output, move |value| {
        buffer.push(value);
        if buffer.len() >= samples.max(1) {
            ExtendedValue::Present(std::mem::take(&mut buffer))
        } else {
            ExtendedValue::Absent
        }
    })
}

/// State-holding delay line of `n` steps
///
/// Emits `n` copies of the initial value, then the input shifted by `n`
/// steps. With `n >= 1` the output of a step never depends on the input of
/// the same step, so delays break feedback cycles.
pub struct Delay<T> {
    name: String,
    kind: &'static str,
    input: InPort<ExtendedValue<T>>,
    output: OutPort<ExtendedValue<T>>,
    pipeline: VecDeque<ExtendedValue<T>>,
    depth: usize,
    ival: Option<ExtendedValue<T>>,
}

/// `[t1..tn]` becomes `[initial, t1..t(n-1)]`
pub fn delay<T>(name: &str, initial: T, input: &SyChannel<T>, output: &SyChannel<T>) -> Delay<T>
where
    T: Clone + Debug,
{
    delay_line(name, "sy::delay", initial, 1, input, output)
}

/// `n` copies of `initial` followed by the input
pub fn delayn<T>(name: &str, initial: T, n: usize, input: &SyChannel<T>, output: &SyChannel<T>) -> Delay<T>
where
    T: Clone + Debug,
{
    delay_line(name, "sy::delayn", initial, n, input, output)
}

fn delay_line<T: Clone + Debug>(
    name: &str,
    kind: &'static str,
    initial: T,
    n: usize,
    input: &SyChannel<T>,
    output: &SyChannel<T>,
) -> Delay<T> {
    Delay {
        name: name.to_string(),
        kind,
        input: in_port(0, input),
        output: out_port(0, output),
        pipeline: std::iter::repeat(ExtendedValue::Present(initial)).take(n).collect(),
        depth: n,
        ival: None,
    }
}

impl<T: Debug + Send + 'static> Process for Delay<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.kind
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input.spec(), self.output.spec()]
    }

    fn holds_state(&self) -> bool {
        self.depth > 0
    }

    fn readiness(&self) -> Readiness {
        all_satisfied(std::slice::from_ref(&self.input))
    }

    fn prepare(&mut self) -> Result<()> {
        self.ival = Some(self.input.read().map_err(|e| SimError::channel(&self.name, e))?);
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        if let Some(value) = self.ival.take() {
            self.pipeline.push_back(value);
        }
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        let value = self.pipeline.pop_front().unwrap_or_default();
        self.output.write(value).map_err(|e| SimError::channel(&self.name, e))
    }

    fn arguments(&self) -> Vec<(String, String)> {
        vec![("n".to_string(), self.depth.to_string())]
    }
}

type NextStateFn<S, I> = Box<dyn Fn(&S, &I) -> S + Send>;
type DecodeFn<S, O> = Box<dyn Fn(&S) -> O + Send>;

/// Moore machine: the output depends on the state only.
///
/// The output of step k is decoded from the state before input k is
/// applied, so a Moore machine breaks feedback cycles like a delay.
pub struct Moore<S, I, O> {
    name: String,
    input: InPort<ExtendedValue<I>>,
    output: OutPort<ExtendedValue<O>>,
    next_state: NextStateFn<S, I>,
    output_decode: DecodeFn<S, O>,
    state: S,
    ival: ExtendedValue<I>,
}

pub fn moore<S, I, O, NS, OD>(
    name: &str,
    next_state: NS,
    output_decode: OD,
    initial: S,
    input: &SyChannel<I>,
    output: &SyChannel<O>,
) -> Moore<S, I, O>
where
    I: Debug,
    O: Debug,
    NS: Fn(&S, &I) -> S + Send + 'static,
    OD: Fn(&S) -> O + Send + 'static,
{
    Moore {
        name: name.to_string(),
        input: in_port(0, input),
        output: out_port(0, output),
        next_state: Box::new(next_state),
        output_decode: Box::new(output_decode),
        state: initial,
        ival: ExtendedValue::Absent,
    }
}

impl<S, I, O> Process for Moore<S, I, O>
where
    S: Debug + Send + 'static,
    I: Debug + Send + 'static,
    O: Debug + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sy::moore"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input.spec(), self.output.spec()]
    }

    fn holds_state(&self) -> bool {
        true
    }

    fn readiness(&self) -> Readiness {
        all_satisfied(std::slice::from_ref(&self.input))
    }

    fn prepare(&mut self) -> Result<()> {
        self.ival = self.input.read().map_err(|e| SimError::channel(&self.name, e))?;
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        if let ExtendedValue::Present(x) = std::mem::take(&mut self.ival) {
            let next_state = &self.next_state;
            let state = &self.state;
            let next = guarded(&self.name, &(state, &x), || next_state(state, &x))?;
            self.state = next;
        }
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        let output_decode = &self.output_decode;
        let state = &self.state;
        let decoded = ExtendedValue::Present(guarded(&self.name, state, || output_decode(state))?);
        self.output.write(decoded).map_err(|e| SimError::channel(&self.name, e))
    }
}

/// Emit `value` in every step, `take` times at most
pub fn constant<T>(name: &str, value: T, take: Option<u64>, output: &SyChannel<T>) -> Generator<ExtendedValue<T>>
where
    T: Clone + Debug + Send + 'static,
{
    let shown = format!("{:?}", value);
    Generator::new(
        name,
        "sy::constant",
        output,
        Box::new(std::iter::repeat(ExtendedValue::Present(value))),
        take,
    )
    .with_argument("value", shown)
}

/// Emit `initial`, then successive states of `next`, `take` times at most
pub fn source<T, F>(name: &str, next: F, initial: T, take: Option<u64>, output: &SyChannel<T>) -> Generator<ExtendedValue<T>>
where
    T: Debug + Send + 'static,
    F: Fn(&T) -> T + Send + 'static,
{
    let states = std::iter::successors(Some(initial), move |state| Some(next(state)));
    Generator::new(name, "sy::source", output, Box::new(states.map(ExtendedValue::Present)), take)
}

/// Emit a fixed sequence of tokens, then exhaust
pub fn vsource<T>(name: &str, values: Vec<ExtendedValue<T>>, output: &SyChannel<T>) -> Generator<ExtendedValue<T>>
where
    T: Debug + Send + 'static,
{
    let len = values.len() as u64;
    Generator::new(name, "sy::vsource", output, Box::new(values.into_iter()), Some(len))
        .with_argument("length", len)
}

pub fn sink<T, F>(name: &str, input: &SyChannel<T>, func: F) -> Collector<ExtendedValue<T>>
where
    T: Debug + Send + 'static,
    F: FnMut(&ExtendedValue<T>) + Send + 'static,
{
    Collector::new(name, "sy::sink", input, func)
}

/// One token per line of `path`; exhausts at end of file
pub fn file_source<T, F>(name: &str, path: impl Into<PathBuf>, output: &SyChannel<T>, convert: F) -> LineSource<ExtendedValue<T>>
where
    T: Debug + Send + 'static,
    F: Fn(&str) -> ExtendedValue<T> + Send + 'static,
{
    LineSource::new(name, "sy::file_source", path, output, convert)
}

pub fn file_sink<T, F>(name: &str, path: impl Into<PathBuf>, input: &SyChannel<T>, convert: F) -> LineSink<ExtendedValue<T>>
where
    T: Debug + Send + 'static,
    F: Fn(&ExtendedValue<T>) -> String + Send + 'static,
{
    LineSink::new(name, "sy::file_sink", path, input, convert)
}

pub fn fanout<T>(name: &str, input: &SyChannel<T>, outputs: &[&SyChannel<T>]) -> Fanout<ExtendedValue<T>>
where
    T: Clone + Debug + Send + 'static,
{
    Fanout::new(name, "sy::fanout", input, outputs)
}

/// Pairs two signals; the pair itself is always present
pub struct Zip<A, B> {
    name: String,
    input1: InPort<ExtendedValue<A>>,
    input2: InPort<ExtendedValue<B>>,
    output: OutPort<ExtendedValue<(ExtendedValue<A>, ExtendedValue<B>)>>,
    current: Option<(ExtendedValue<A>, ExtendedValue<B>)>,
}

pub fn zip<A: Debug, B: Debug>(
    name: &str,
    input1: &SyChannel<A>,
    input2: &SyChannel<B>,
    output: &SyChannel<(ExtendedValue<A>, ExtendedValue<B>)>,
) -> Zip<A, B> {
    Zip {
        name: name.to_string(),
        input1: in_port(0, input1),
        input2: in_port(1, input2),
        output: out_port(0, output),
        current: None,
    }
}

impl<A, B> Process for Zip<A, B>
where
    A: Debug + Send + 'static,
    B: Debug + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sy::zip"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input1.spec(), self.input2.spec(), self.output.spec()]
    }

    fn readiness(&self) -> Readiness {
        if self.input1.satisfied() && self.input2.satisfied() {
            Readiness::Ready
        } else {
            Readiness::Waiting
        }
    }

    fn prepare(&mut self) -> Result<()> {
        let a = self.input1.read().map_err(|e| SimError::channel(&self.name, e))?;
        let b = self.input2.read().map_err(|e| SimError::channel(&self.name, e))?;
        self.current = Some((a, b));
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        let value = self.current.take().map(ExtendedValue::Present).unwrap_or_default();
        self.output.write(value).map_err(|e| SimError::channel(&self.name, e))
    }
}

/// Splits a paired signal; an absent pair yields absent on both outputs
pub struct Unzip<A, B> {
    name: String,
    input: InPort<ExtendedValue<(ExtendedValue<A>, ExtendedValue<B>)>>,
    output1: OutPort<ExtendedValue<A>>,
    output2: OutPort<ExtendedValue<B>>,
    current: ExtendedValue<(ExtendedValue<A>, ExtendedValue<B>)>,
}

pub fn unzip<A: Debug, B: Debug>(
    name: &str,
    input: &SyChannel<(ExtendedValue<A>, ExtendedValue<B>)>,
    output1: &SyChannel<A>,
    output2: &SyChannel<B>,
) -> Unzip<A, B> {
    Unzip {
        name: name.to_string(),
        input: in_port(0, input),
        output1: out_port(0, output1),
        output2: out_port(1, output2),
        current: ExtendedValue::Absent,
    }
}

impl<A, B> Process for Unzip<A, B>
where
    A: Debug + Send + 'static,
    B: Debug + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sy::unzip"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input.spec(), self.output1.spec(), self.output2.spec()]
    }

    fn readiness(&self) -> Readiness {
        all_satisfied(std::slice::from_ref(&self.input))
    }

    fn prepare(&mut self) -> Result<()> {
        self.current = self.input.read().map_err(|e| SimError::channel(&self.name, e))?;
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        let (a, b) = std::mem::take(&mut self.current)
            .into_option()
            .unwrap_or((ExtendedValue::Absent, ExtendedValue::Absent));
        self.output1.write(a).map_err(|e| SimError::channel(&self.name, e))?;
        self.output2.write(b).map_err(|e| SimError::channel(&self.name, e))
    }
}

/// Collects N homogeneous signals into one vector-valued signal
pub struct ZipN<T> {
    name: String,
    inputs: Vec<InPort<ExtendedValue<T>>>,
    output: OutPort<ExtendedValue<Vec<ExtendedValue<T>>>>,
    current: Vec<ExtendedValue<T>>,
}

pub fn zip_n<T: Debug>(name: &str, inputs: &[&SyChannel<T>], output: &SyChannel<Vec<ExtendedValue<T>>>) -> ZipN<T> {
    ZipN {
        name: name.to_string(),
        inputs: inputs.iter().enumerate().map(|(i, ch)| in_port(i, ch)).collect(),
        output: out_port(0, output),
        current: Vec::new(),
    }
}

impl<T: Debug + Send + 'static> Process for ZipN<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sy::zip_n"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports: Vec<PortSpec> = self.inputs.iter().map(|p| p.spec()).collect();
        ports.push(self.output.spec());
        ports
    }

    fn readiness(&self) -> Readiness {
        all_satisfied(&self.inputs)
    }

    fn prepare(&mut self) -> Result<()> {
        self.current = self
            .inputs
            .iter()
            .map(|p| p.read())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| SimError::channel(&self.name, e))?;
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        let value = ExtendedValue::Present(std::mem::take(&mut self.current));
        self.output.write(value).map_err(|e| SimError::channel(&self.name, e))
    }
}

/// Spreads a vector-valued signal over N outputs
pub struct UnzipN<T> {
    name: String,
    input: InPort<ExtendedValue<Vec<ExtendedValue<T>>>>,
    outputs: Vec<OutPort<ExtendedValue<T>>>,
    current: ExtendedValue<Vec<ExtendedValue<T>>>,
}

pub fn unzip_n<T: Debug>(name: &str, input: &SyChannel<Vec<ExtendedValue<T>>>, outputs: &[&SyChannel<T>]) -> UnzipN<T> {
    UnzipN {
        name: name.to_string(),
        input: in_port(0, input),
        outputs: outputs.iter().enumerate().map(|(i, ch)| out_port(i, ch)).collect(),
        current: ExtendedValue::Absent,
    }
}

impl<T: Debug + Send + 'static> Process for UnzipN<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sy::unzip_n"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports = vec![self.input.spec()];
        ports.extend(self.outputs.iter().map(|p| p.spec()));
        ports
    }

    fn readiness(&self) -> Readiness {
        all_satisfied(std::slice::from_ref(&self.input))
    }

    fn prepare(&mut self) -> Result<()> {
        self.current = self.input.read().map_err(|e| SimError::channel(&self.name, e))?;
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        if let ExtendedValue::Present(values) = &self.current {
            check_rate(&self.name, "i1", self.outputs.len(), values)?;
        }
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        let values = match std::mem::take(&mut self.current) {
            ExtendedValue::Present(values) => values,
            ExtendedValue::Absent => self.outputs.iter().map(|_| ExtendedValue::Absent).collect(),
        };
        for (port, value) in self.outputs.iter().zip(values) {
            port.write(value).map_err(|e| SimError::channel(&self.name, e))?;
        }
        Ok(())
    }
}
