//! Continuous-time process constructors.
//!
//! Signals carry [`Segment`]s: functions of absolute time valid over a
//! half-open interval. Consecutive segments on a channel tile the time axis.
//! Firing is driven by simulated time: a source emits one segment per period,
//! every other process fires once per incoming segment.

use crate::core::channel::{Channel, InPort, OutPort};
use crate::core::errors::{Result, SimError};
use crate::core::process::{guarded, Process, Readiness};
use crate::core::types::PortSpec;
use crate::core::values::{Segment, SimTime};
use crate::moc::shared::Fanout;
use log::debug;

/// A continuous-time signal
pub type CtChannel = Channel<Segment>;

fn ready_if(satisfied: bool) -> Readiness {
    if satisfied {
        Readiness::Ready
    } else {
        Readiness::Waiting
    }
}

/// Sampling intervals per emitted source segment
pub const DEFAULT_RESOLUTION: usize = 64;

type TimeFn = Box<dyn Fn(SimTime) -> f64 + Send>;

/// Emits `f(t)` as consecutive segments of one period each until `end`
///
/// Each segment samples `f` on `resolution` equal intervals when the source
/// fires.
pub struct Source {
    name: String,
    output: OutPort<Segment>,
    func: TimeFn,
    period: SimTime,
    end: SimTime,
    resolution: usize,
    emitted: u64,
    current: Option<Segment>,
}

pub fn source<F>(name: &str, func: F, period: SimTime, end: SimTime, output: &CtChannel) -> Result<Source>
where
    F: Fn(SimTime) -> f64 + Send + 'static,
{
    if !(period > 0.0 && period.is_finite()) {
        return Err(SimError::Config(format!("{}: period must be positive, got {}", name, period)));
    }
    Ok(Source {
        name: name.to_string(),
        output: OutPort::new("o1", output, 1),
        func: Box::new(func),
        period,
        end,
        resolution: DEFAULT_RESOLUTION,
        emitted: 0,
        current: None,
    })
}

impl Source {
    pub fn with_resolution(mut self, intervals: usize) -> Self {
        self.resolution = intervals.max(1);
        self
    }

    fn next_start(&self) -> SimTime {
        self.emitted as f64 * self.period
    }
}

impl Process for Source {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "ct::source"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.output.spec()]
    }

    fn readiness(&self) -> Readiness {
        if self.next_start() < self.end {
            Readiness::Ready
        } else {
            Readiness::Exhausted
        }
    }

    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let start = self.next_start();
        // boundaries are always k * period, so consecutive segments tile exactly
        let end = ((self.emitted + 1) as f64 * self.period).min(self.end);
        let func = &self.func;
        let resolution = self.resolution;
        let segment = guarded(&self.name, &(start, end), || {
            Segment::sampled(start, end, resolution, |t| func(t))
        })?;
        self.current = Some(segment);
        self.emitted += 1;
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        if let Some(segment) = self.current.take() {
            self.output.write(segment).map_err(|e| SimError::channel(&self.name, e))?;
        }
        Ok(())
    }

    fn arguments(&self) -> Vec<(String, String)> {
        vec![
            ("period".to_string(), self.period.to_string()),
            ("end".to_string(), self.end.to_string()),
            ("resolution".to_string(), self.resolution.to_string()),
        ]
    }
}

type PointFn = Box<dyn Fn(f64) -> f64 + Send>;

/// Pointwise function of a single signal
pub struct Comb {
    name: String,
    input: InPort<Segment>,
    output: OutPort<Segment>,
    func: PointFn,
    current: Option<Segment>,
}

pub fn comb<F>(name: &str, func: F, input: &CtChannel, output: &CtChannel) -> Comb
where
    F: Fn(f64) -> f64 + Send + 'static,
{
    Comb {
        name: name.to_string(),
        input: InPort::new("i1", input, 1),
        output: OutPort::new("o1", output, 1),
        func: Box::new(func),
        current: None,
    }
}

impl Process for Comb {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "ct::comb"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input.spec(), self.output.spec()]
    }

    fn readiness(&self) -> Readiness {
        ready_if(self.input.satisfied())
    }

    fn prepare(&mut self) -> Result<()> {
        self.current = Some(self.input.read().map_err(|e| SimError::channel(&self.name, e))?);
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        if let Some(segment) = self.current.take() {
            let func = &self.func;
            self.current = Some(guarded(&self.name, &segment, || segment.map(|v| func(v)))?);
        }
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        if let Some(segment) = self.current.take() {
            self.output.write(segment).map_err(|e| SimError::channel(&self.name, e))?;
        }
        Ok(())
    }
}

/// Time shift by a fixed delay; the first `delay` seconds are zero
pub struct Delay {
    name: String,
    input: InPort<Segment>,
    output: OutPort<Segment>,
    delay: SimTime,
    current: Option<Segment>,
}

pub fn delay(name: &str, delay: SimTime, input: &CtChannel, output: &CtChannel) -> Result<Delay> {
    if !(delay > 0.0 && delay.is_finite()) {
        return Err(SimError::Config(format!("{}: delay must be positive, got {}", name, delay)));
    }
    Ok(Delay {
        name: name.to_string(),
        input: InPort::new("i1", input, 1),
        output: OutPort::new("o1", output, 1),
        delay,
        current: None,
    })
}

impl Process for Delay {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "ct::delay"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input.spec(), self.output.spec()]
    }

    fn holds_state(&self) -> bool {
        true
    }

    fn init(&mut self) -> Result<()> {
        self.output
            .write(Segment::constant(0.0, self.delay, 0.0))
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
        self.current = self.current.take().map(|s| s.shifted(self.delay));
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        if let Some(segment) = self.current.take() {
            self.output.write(segment).map_err(|e| SimError::channel(&self.name, e))?;
        }
        Ok(())
    }

    fn arguments(&self) -> Vec<(String, String)> {
        vec![("delay".to_string(), self.delay.to_string())]
    }
}

/// State-space realisation of a proper rational transfer function
#[derive(Debug, Clone)]
struct StateSpace {
    /// Denominator coefficients a1..an of the monic denominator
    a: Vec<f64>,
    /// Output weights of the state vector
    c: Vec<f64>,
    /// Direct feedthrough
    d: f64,
}

impl StateSpace {
    /// Controllable canonical form of `num(s) / den(s)`, both given in
    /// descending powers of s.
    fn from_transfer_function(num: &[f64], den: &[f64]) -> std::result::Result<Self, String> {
        let lead = match den.first() {
            Some(&lead) if lead != 0.0 => lead,
            _ => return Err("denominator must have a non-zero leading coefficient".to_string()),
        };
        if num.len() > den.len() {
            return Err(format!(
                "improper transfer function: numerator degree {} exceeds denominator degree {}",
                num.len() - 1,
                den.len() - 1
            ));
        }
        let order = den.len() - 1;
        let a: Vec<f64> = den[1..].iter().map(|x| x / lead).collect();
        let mut b = vec![0.0; den.len() - num.len()];
        b.extend(num.iter().map(|x| x / lead));

        let d = b[0];
        // x1 is the lowest derivative; its weight uses the constant coefficients
        let c = (0..order).map(|j| b[order - j] - a[order - j - 1] * d).collect();
        Ok(Self { a, c, d })
    }

    fn order(&self) -> usize {
        self.a.len()
    }

    fn derivative(&self, x: &[f64], u: f64) -> Vec<f64> {
        let n = self.order();
        let mut dx = vec![0.0; n];
        if n == 0 {
            return dx;
        }
        dx[..n - 1].copy_from_slice(&x[1..]);
        let feedback: f64 = (0..n).map(|j| self.a[n - 1 - j] * x[j]).sum();
        dx[n - 1] = u - feedback;
        dx
    }

    fn output(&self, x: &[f64], u: f64) -> f64 {
        self.c.iter().zip(x).map(|(c, x)| c * x).sum::<f64>() + self.d * u
    }
}

fn axpy(x: &[f64], k: &[f64], h: f64) -> Vec<f64> {
    x.iter().zip(k).map(|(x, k)| x + h * k).collect()
}

/// Linear filter given by a rational transfer function
///
/// Each input segment is integrated with fixed-step fourth-order
/// Runge-Kutta; the output segment interpolates the computed samples. The
/// state carries over between segments.
pub struct Filter {
    name: String,
    input: InPort<Segment>,
    output: OutPort<Segment>,
    numerator: Vec<f64>,
    denominator: Vec<f64>,
    system: StateSpace,
    step: SimTime,
    state: Vec<f64>,
    current: Option<Segment>,
}

pub fn filter(name: &str, numerator: &[f64], denominator: &[f64], step: SimTime, input: &CtChannel, output: &CtChannel) -> Result<Filter> {
    let system = StateSpace::from_transfer_function(numerator, denominator)
        .map_err(|reason| SimError::Config(format!("{}: {}", name, reason)))?;
    if !(step > 0.0 && step.is_finite()) {
        return Err(SimError::Config(format!("{}: integration step must be positive, got {}", name, step)));
    }
    Ok(Filter {
        name: name.to_string(),
        input: InPort::new("i1", input, 1),
        output: OutPort::new("o1", output, 1),
        numerator: numerator.to_vec(),
        denominator: denominator.to_vec(),
        state: vec![0.0; system.order()],
        system,
        step,
        current: None,
    })
}

impl Filter {
    fn integrate(&mut self, segment: &Segment) -> Vec<(SimTime, f64)> {
        let sys = &self.system;
        let u = |t: SimTime| segment.value_at(t);
        let mut t = segment.start();
        let mut x = std::mem::take(&mut self.state);
        let mut samples = vec![(t, sys.output(&x, u(t)))];

        while t < segment.end() {
            let last = self.step >= segment.end() - t;
            let h = if last { segment.end() - t } else { self.step };
            let k1 = sys.derivative(&x, u(t));
            let k2 = sys.derivative(&axpy(&x, &k1, h / 2.0), u(t + h / 2.0));
            let k3 = sys.derivative(&axpy(&x, &k2, h / 2.0), u(t + h / 2.0));
            let k4 = sys.derivative(&axpy(&x, &k3, h), u(t + h));
            for i in 0..x.len() {
                x[i] += h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
            }
            t = if last { segment.end() } else { t + h };
            samples.push((t, sys.output(&x, u(t))));
        }

        self.state = x;
        samples
    }
}

impl Process for Filter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "ct::filter"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input.spec(), self.output.spec()]
    }

    fn readiness(&self) -> Readiness {
        ready_if(self.input.satisfied())
    }

    fn prepare(&mut self) -> Result<()> {
        self.current = Some(self.input.read().map_err(|e| SimError::channel(&self.name, e))?);
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        if let Some(segment) = self.current.take() {
            let name = self.name.clone();
            let samples = guarded(&name, &segment, || self.integrate(&segment))?;
            debug!("[ct::filter {}] integrated {} with {} samples", self.name, segment, samples.len());
            self.current = Some(Segment::interpolated(segment.start(), segment.end(), samples));
        }
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        if let Some(segment) = self.current.take() {
            self.output.write(segment).map_err(|e| SimError::channel(&self.name, e))?;
        }
        Ok(())
    }

    fn arguments(&self) -> Vec<(String, String)> {
        vec![
            ("numerator".to_string(), format!("{:?}", self.numerator)),
            ("denominator".to_string(), format!("{:?}", self.denominator)),
            ("step".to_string(), self.step.to_string()),
        ]
    }
}

type SampleFn = Box<dyn FnMut(SimTime, f64) + Send>;

/// Samples the incoming signal on a fixed global grid `k * period`
pub struct Sink {
    name: String,
    input: InPort<Segment>,
    period: SimTime,
    next_sample: u64,
    func: SampleFn,
    current: Option<Segment>,
}

pub fn sink<F>(name: &str, period: SimTime, input: &CtChannel, func: F) -> Result<Sink>
where
    F: FnMut(SimTime, f64) + Send + 'static,
{
    if !(period > 0.0 && period.is_finite()) {
        return Err(SimError::Config(format!("{}: sampling period must be positive, got {}", name, period)));
    }
    Ok(Sink {
        name: name.to_string(),
        input: InPort::new("i1", input, 1),
        period,
        next_sample: 0,
        func: Box::new(func),
        current: None,
    })
}

impl Process for Sink {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "ct::sink"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input.spec()]
    }

    fn readiness(&self) -> Readiness {
        ready_if(self.input.satisfied())
    }

    fn prepare(&mut self) -> Result<()> {
        self.current = Some(self.input.read().map_err(|e| SimError::channel(&self.name, e))?);
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let Some(segment) = self.current.take() else {
            return Ok(());
        };
        loop {
            let t = self.next_sample as f64 * self.period;
            if t >= segment.end() {
                break;
            }
            if t >= segment.start() {
                let value = segment.value_at(t);
                let func = &mut self.func;
                guarded(&self.name, &(t, value), || func(t, value))?;
            }
            self.next_sample += 1;
        }
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        Ok(())
    }

    fn arguments(&self) -> Vec<(String, String)> {
        vec![("period".to_string(), self.period.to_string())]
    }
}

pub fn fanout(name: &str, input: &CtChannel, outputs: &[&CtChannel]) -> Fanout<Segment> {
    Fanout::new(name, "ct::fanout", input, outputs)
}
