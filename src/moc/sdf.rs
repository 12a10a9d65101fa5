//! Synchronous dataflow process constructors.
//!
//! Every port carries a static rate fixed at construction. A process fires
//! once every input channel holds at least its rate in tokens; it then
//! consumes exactly the input rates and produces exactly the output rates.

use crate::core::channel::{Channel, InPort, OutPort};
use crate::core::errors::{Result, SimError};
use crate::core::process::{check_rate, guarded, Process, Readiness};
use crate::core::types::PortSpec;
use crate::moc::shared::{Collector, Fanout, Generator, LineSource, LineSink};
use std::fmt::Debug;
use std::path::PathBuf;

fn ready_if(satisfied: bool) -> Readiness {
    if satisfied {
        Readiness::Ready
    } else {
        Readiness::Waiting
    }
}

fn bind_inputs<T: Debug>(inputs: &[(&Channel<T>, usize)]) -> Vec<InPort<T>> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, (ch, rate))| InPort::new(&format!("i{}", i + 1), ch, *rate))
        .collect()
}

fn bind_outputs<T: Debug>(outputs: &[(&Channel<T>, usize)]) -> Vec<OutPort<T>> {
    outputs
        .iter()
        .enumerate()
        .map(|(i, (ch, rate))| OutPort::new(&format!("o{}", i + 1), ch, *rate))
        .collect()
}

fn read_all<T: Debug>(process: &str, ports: &[InPort<T>]) -> Result<Vec<Vec<T>>> {
    ports
        .iter()
        .map(|p| p.read_rate().map_err(|e| SimError::channel(process, e)))
        .collect()
}

type CombFn<I, O> = Box<dyn Fn(&[Vec<I>]) -> Vec<Vec<O>> + Send>;

/// N-input, M-output dataflow actor with per-port rates
pub struct Comb<I, O> {
    name: String,
    inputs: Vec<InPort<I>>,
    outputs: Vec<OutPort<O>>,
    func: CombFn<I, O>,
    ivals: Vec<Vec<I>>,
    ovals: Vec<Vec<O>>,
}

/// Dataflow actor over token groups.
///
/// `inputs` and `outputs` pair each channel with its rate. The function gets
/// one group of exactly `rate` tokens per input and must return one group
/// per output, each of exactly the declared output rate.
pub fn comb<I, O, F>(name: &str, inputs: &[(&Channel<I>, usize)], outputs: &[(&Channel<O>, usize)], func: F) -> Comb<I, O>
where
    I: Debug,
    O: Debug,
    F: Fn(&[Vec<I>]) -> Vec<Vec<O>> + Send + 'static,
{
    Comb {
        name: name.to_string(),
        inputs: bind_inputs(inputs),
        outputs: bind_outputs(outputs),
        func: Box::new(func),
        ivals: Vec::new(),
        ovals: Vec::new(),
    }
}

impl<I, O> Process for Comb<I, O>
where
    I: Debug + Send + 'static,
    O: Debug + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sdf::comb"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports: Vec<PortSpec> = self.inputs.iter().map(|p| p.spec()).collect();
        ports.extend(self.outputs.iter().map(|p| p.spec()));
        ports
    }

    fn readiness(&self) -> Readiness {
        ready_if(self.inputs.iter().all(|p| p.satisfied()))
    }

    fn prepare(&mut self) -> Result<()> {
        self.ivals = read_all(&self.name, &self.inputs)?;
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let func = &self.func;
        let ivals = std::mem::take(&mut self.ivals);
        let groups = guarded(&self.name, &ivals, || func(&ivals))?;
        check_rate(&self.name, "outputs", self.outputs.len(), &groups)?;
        for (port, group) in self.outputs.iter().zip(&groups) {
            check_rate(&self.name, port.name(), port.rate(), group)?;
        }
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
        let rates = |ports: Vec<usize>| format!("{:?}", ports);
        vec![
            ("input_rates".to_string(), rates(self.inputs.iter().map(|p| p.rate()).collect())),
            ("output_rates".to_string(), rates(self.outputs.iter().map(|p| p.rate()).collect())),
        ]
    }
}

type Comb2Fn<A, B, O> = Box<dyn Fn(&[A], &[B]) -> Vec<O> + Send>;

/// Two-input dataflow actor over distinct token types
pub struct Comb2<A, B, O> {
    name: String,
    input1: InPort<A>,
    input2: InPort<B>,
    output: OutPort<O>,
    func: Comb2Fn<A, B, O>,
    ivals: (Vec<A>, Vec<B>),
    ovals: Vec<O>,
}

pub fn comb2<A, B, O, F>(
    name: &str,
    input1: (&Channel<A>, usize),
    input2: (&Channel<B>, usize),
    output: (&Channel<O>, usize),
    func: F,
) -> Comb2<A, B, O>
where
    A: Debug,
    B: Debug,
    O: Debug,
    F: Fn(&[A], &[B]) -> Vec<O> + Send + 'static,
{
    Comb2 {
        name: name.to_string(),
        input1: InPort::new("i1", input1.0, input1.1),
        input2: InPort::new("i2", input2.0, input2.1),
        output: OutPort::new("o1", output.0, output.1),
        func: Box::new(func),
        ivals: (Vec::new(), Vec::new()),
        ovals: Vec::new(),
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
        "sdf::comb2"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input1.spec(), self.input2.spec(), self.output.spec()]
    }

    fn readiness(&self) -> Readiness {
        ready_if(self.input1.satisfied() && self.input2.satisfied())
    }

    fn prepare(&mut self) -> Result<()> {
        let a = self.input1.read_rate().map_err(|e| SimError::channel(&self.name, e))?;
        let b = self.input2.read_rate().map_err(|e| SimError::channel(&self.name, e))?;
        self.ivals = (a, b);
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let func = &self.func;
        let (a, b) = std::mem::take(&mut self.ivals);
        let out = guarded(&self.name, &(&a, &b), || func(&a, &b))?;
        check_rate(&self.name, self.output.name(), self.output.rate(), &out)?;
        self.ovals = out;
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        let out = std::mem::take(&mut self.ovals);
        self.output.write_all(out).map_err(|e| SimError::channel(&self.name, e))
    }
}

/// Initial tokens followed by a 1-to-1 passthrough
///
/// The initial tokens are written during init, so a delay inside a
/// feedback cycle lets the cycle start firing.
pub struct Delay<T> {
    name: String,
    kind: &'static str,
    input: InPort<T>,
    output: OutPort<T>,
    initial: T,
    count: usize,
    current: Option<T>,
}

pub fn delay<T: Clone + Debug>(name: &str, initial: T, input: &Channel<T>, output: &Channel<T>) -> Delay<T> {
    delay_line(name, "sdf::delay", initial, 1, input, output)
}

pub fn delayn<T: Clone + Debug>(name: &str, initial: T, n: usize, input: &Channel<T>, output: &Channel<T>) -> Delay<T> {
    delay_line(name, "sdf::delayn", initial, n, input, output)
}

fn delay_line<T: Clone + Debug>(
    name: &str,
    kind: &'static str,
    initial: T,
    count: usize,
    input: &Channel<T>,
    output: &Channel<T>,
) -> Delay<T> {
    Delay {
        name: name.to_string(),
        kind,
        input: InPort::new("i1", input, 1),
        output: OutPort::new("o1", output, 1),
        initial,
        count,
        current: None,
    }
}

impl<T: Clone + Debug + Send + 'static> Process for Delay<T> {
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
        self.count > 0
    }

    fn init(&mut self) -> Result<()> {
        self.output
            .write_all(std::iter::repeat(self.initial.clone()).take(self.count))
            .map_err(|e| SimError::channel(&self.name, e))
    }

    fn readiness(&self) -> Readiness {
        ready_if(self.input.satisfied())
    }

    fn prepare(&mut self) -> Result<()> {
        self.current = Some(self.input.read().map_err(|e| SimError::channel(&self.name, e))?);
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        if let Some(token) = self.current.take() {
            self.output.write(token).map_err(|e| SimError::channel(&self.name, e))?;
        }
        Ok(())
    }

    fn arguments(&self) -> Vec<(String, String)> {
        vec![
            ("init_val".to_string(), format!("{:?}", self.initial)),
            ("n".to_string(), self.count.to_string()),
        ]
    }
}

/// One `value` token per firing, `take` times at most
pub fn constant<T>(name: &str, value: T, take: Option<u64>, output: &Channel<T>) -> Generator<T>
where
    T: Clone + Debug + Send + 'static,
{
    let shown = format!("{:?}", value);
    Generator::new(name, "sdf::constant", output, Box::new(std::iter::repeat(value)), take).with_argument("value", shown)
}

/// `initial`, then successive states of `next`, `take` times at most
pub fn source<T, F>(name: &str, next: F, initial: T, take: Option<u64>, output: &Channel<T>) -> Generator<T>
where
    T: Debug + Send + 'static,
    F: Fn(&T) -> T + Send + 'static,
{
    let states = std::iter::successors(Some(initial), move |state| Some(next(state)));
    Generator::new(name, "sdf::source", output, Box::new(states), take)
}

pub fn vsource<T>(name: &str, values: Vec<T>, output: &Channel<T>) -> Generator<T>
where
    T: Debug + Send + 'static,
{
    let len = values.len() as u64;
    Generator::new(name, "sdf::vsource", output, Box::new(values.into_iter()), Some(len)).with_argument("length", len)
}

pub fn sink<T, F>(name: &str, input: &Channel<T>, func: F) -> Collector<T>
where
    T: Debug + Send + 'static,
    F: FnMut(&T) + Send + 'static,
{
    Collector::new(name, "sdf::sink", input, func)
}

pub fn file_source<T, F>(name: &str, path: impl Into<PathBuf>, output: &Channel<T>, convert: F) -> LineSource<T>
where
    T: Debug + Send + 'static,
    F: Fn(&str) -> T + Send + 'static,
{
    LineSource::new(name, "sdf::file_source", path, output, convert)
}

pub fn file_sink<T, F>(name: &str, path: impl Into<PathBuf>, input: &Channel<T>, convert: F) -> LineSink<T>
where
    T: Debug + Send + 'static,
    F: Fn(&T) -> String + Send + 'static,
{
    LineSink::new(name, "sdf::file_sink", path, input, convert)
}

pub fn fanout<T>(name: &str, input: &Channel<T>, outputs: &[&Channel<T>]) -> Fanout<T>
where
    T: Clone + Debug + Send + 'static,
{
    Fanout::new(name, "sdf::fanout", input, outputs)
}

/// Groups `rate1` tokens of one channel and `rate2` of another into a
/// single tuple token per firing
pub struct Zip<A, B> {
    name: String,
    input1: InPort<A>,
    input2: InPort<B>,
    output: OutPort<(Vec<A>, Vec<B>)>,
    current: Option<(Vec<A>, Vec<B>)>,
}

pub fn zip<A: Debug, B: Debug>(
    name: &str,
    input1: (&Channel<A>, usize),
    input2: (&Channel<B>, usize),
    output: &Channel<(Vec<A>, Vec<B>)>,
) -> Zip<A, B> {
    Zip {
        name: name.to_string(),
        input1: InPort::new("i1", input1.0, input1.1),
        input2: InPort::new("i2", input2.0, input2.1),
        output: OutPort::new("o1", output, 1),
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
        "sdf::zip"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input1.spec(), self.input2.spec(), self.output.spec()]
    }

    fn readiness(&self) -> Readiness {
        ready_if(self.input1.satisfied() && self.input2.satisfied())
    }

    fn prepare(&mut self) -> Result<()> {
        let a = self.input1.read_rate().map_err(|e| SimError::channel(&self.name, e))?;
        let b = self.input2.read_rate().map_err(|e| SimError::channel(&self.name, e))?;
        self.current = Some((a, b));
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        if let Some(pair) = self.current.take() {
            self.output.write(pair).map_err(|e| SimError::channel(&self.name, e))?;
        }
        Ok(())
    }
}

/// Splits one tuple token per firing into `rate1` and `rate2` tokens
pub struct Unzip<A, B> {
    name: String,
    input: InPort<(Vec<A>, Vec<B>)>,
    output1: OutPort<A>,
    output2: OutPort<B>,
    current: Option<(Vec<A>, Vec<B>)>,
}

pub fn unzip<A: Debug, B: Debug>(
    name: &str,
    input: &Channel<(Vec<A>, Vec<B>)>,
    output1: (&Channel<A>, usize),
    output2: (&Channel<B>, usize),
) -> Unzip<A, B> {
    Unzip {
        name: name.to_string(),
        input: InPort::new("i1", input, 1),
        output1: OutPort::new("o1", output1.0, output1.1),
        output2: OutPort::new("o2", output2.0, output2.1),
        current: None,
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
        "sdf::unzip"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input.spec(), self.output1.spec(), self.output2.spec()]
    }

    fn readiness(&self) -> Readiness {
        ready_if(self.input.satisfied())
    }

    fn prepare(&mut self) -> Result<()> {
        self.current = Some(self.input.read().map_err(|e| SimError::channel(&self.name, e))?);
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        if let Some((a, b)) = &self.current {
            check_rate(&self.name, self.output1.name(), self.output1.rate(), a)?;
            check_rate(&self.name, self.output2.name(), self.output2.rate(), b)?;
        }
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        if let Some((a, b)) = self.current.take() {
            self.output1.write_all(a).map_err(|e| SimError::channel(&self.name, e))?;
            self.output2.write_all(b).map_err(|e| SimError::channel(&self.name, e))?;
        }
        Ok(())
    }
}

/// Groups the rated inputs of N channels into one token per firing
pub struct ZipN<T> {
    name: String,
    inputs: Vec<InPort<T>>,
    output: OutPort<Vec<Vec<T>>>,
    current: Option<Vec<Vec<T>>>,
}

pub fn zip_n<T: Debug>(name: &str, inputs: &[(&Channel<T>, usize)], output: &Channel<Vec<Vec<T>>>) -> ZipN<T> {
    ZipN {
        name: name.to_string(),
        inputs: bind_inputs(inputs),
        output: OutPort::new("o1", output, 1),
        current: None,
    }
}

impl<T: Debug + Send + 'static> Process for ZipN<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sdf::zip_n"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports: Vec<PortSpec> = self.inputs.iter().map(|p| p.spec()).collect();
        ports.push(self.output.spec());
        ports
    }

    fn readiness(&self) -> Readiness {
        ready_if(self.inputs.iter().all(|p| p.satisfied()))
    }

    fn prepare(&mut self) -> Result<()> {
        self.current = Some(read_all(&self.name, &self.inputs)?);
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        if let Some(groups) = self.current.take() {
            self.output.write(groups).map_err(|e| SimError::channel(&self.name, e))?;
        }
        Ok(())
    }
}

/// Spreads one grouped token per firing over N rated outputs
pub struct UnzipN<T> {
    name: String,
    input: InPort<Vec<Vec<T>>>,
    outputs: Vec<OutPort<T>>,
    current: Option<Vec<Vec<T>>>,
}

pub fn unzip_n<T: Debug>(name: &str, input: &Channel<Vec<Vec<T>>>, outputs: &[(&Channel<T>, usize)]) -> UnzipN<T> {
    UnzipN {
        name: name.to_string(),
        input: InPort::new("i1", input, 1),
        outputs: bind_outputs(outputs),
        current: None,
    }
}

impl<T: Debug + Send + 'static> Process for UnzipN<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sdf::unzip_n"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports = vec![self.input.spec()];
        ports.extend(self.outputs.iter().map(|p| p.spec()));
        ports
    }

    fn readiness(&self) -> Readiness {
        ready_if(self.input.satisfied())
    }

    fn prepare(&mut self) -> Result<()> {
        self.current = Some(self.input.read().map_err(|e| SimError::channel(&self.name, e))?);
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        if let Some(groups) = &self.current {
            check_rate(&self.name, "i1", self.outputs.len(), groups)?;
            for (port, group) in self.outputs.iter().zip(groups) {
                check_rate(&self.name, port.name(), port.rate(), group)?;
            }
        }
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        if let Some(groups) = self.current.take() {
            for (port, group) in self.outputs.iter().zip(groups) {
                port.write_all(group).map_err(|e| SimError::channel(&self.name, e))?;
            }
        }
        Ok(())
    }
}
