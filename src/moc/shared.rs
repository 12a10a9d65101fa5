//! Process shapes shared by the discrete models of computation.
//!
//! Synchronous signals carry `ExtendedValue<T>` while dataflow signals carry
//! `T` directly, so these processes are generic over the token type and take
//! their constructor kind as a parameter.

use crate::core::channel::{Channel, InPort, OutPort};
use crate::core::errors::{Result, SimError};
use crate::core::process::{guarded, Process, Readiness};
use crate::core::types::PortSpec;
use log::{debug, info};
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

type TokenIter<T> = Box<dyn Iterator<Item = T> + Send>;

/// Zero-input process emitting one token per firing from an iterator
///
/// `remaining` is the exact number of tokens left, or `None` for an
/// infinite generator. Once it reaches zero the process is exhausted.
pub struct Generator<T> {
    name: String,
    kind: &'static str,
    output: OutPort<T>,
    tokens: TokenIter<T>,
    remaining: Option<u64>,
    current: Option<T>,
    arguments: Vec<(String, String)>,
}

impl<T: Debug + Send + 'static> Generator<T> {
    pub(crate) fn new(
        name: &str,
        kind: &'static str,
        output: &Channel<T>,
        tokens: TokenIter<T>,
        remaining: Option<u64>,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            output: OutPort::new("o1", output, 1),
            tokens,
            remaining,
            current: None,
            arguments: Vec::new(),
        }
    }

    pub(crate) fn with_argument(mut self, key: &str, value: impl ToString) -> Self {
        self.arguments.push((key.to_string(), value.to_string()));
        self
    }
}

impl<T: Debug + Send + 'static> Process for Generator<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.kind
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.output.spec()]
    }

    fn readiness(&self) -> Readiness {
        match self.remaining {
            Some(0) => Readiness::Exhausted,
            _ => Readiness::Ready,
        }
    }

    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let tokens = &mut self.tokens;
        let remaining = self.remaining;
        self.current = guarded(&self.name, &remaining, || tokens.next())?;
        if self.current.is_none() {
            self.remaining = Some(0);
        } else if let Some(left) = self.remaining.as_mut() {
            *left = left.saturating_sub(1);
        }
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        if let Some(token) = self.current.take() {
            self.output
                .write(token)
                .map_err(|e| SimError::channel(&self.name, e))?;
        }
        Ok(())
    }

    fn arguments(&self) -> Vec<(String, String)> {
        self.arguments.clone()
    }
}

/// Single-input process handing every token to a user callback
pub struct Collector<T> {
    name: String,
    kind: &'static str,
    input: InPort<T>,
    current: Option<T>,
    func: Box<dyn FnMut(&T) + Send>,
}

impl<T: Debug + Send + 'static> Collector<T> {
    pub(crate) fn new<F>(name: &str, kind: &'static str, input: &Channel<T>, func: F) -> Self
    where
        F: FnMut(&T) + Send + 'static,
    {
        Self {
            name: name.to_string(),
            kind,
            input: InPort::new("i1", input, 1),
            current: None,
            func: Box::new(func),
        }
    }
}

impl<T: Debug + Send + 'static> Process for Collector<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.kind
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input.spec()]
    }

    fn readiness(&self) -> Readiness {
        if self.input.satisfied() {
            Readiness::Ready
        } else {
            Readiness::Waiting
        }
    }

    fn prepare(&mut self) -> Result<()> {
        let token = self.input.read().map_err(|e| SimError::channel(&self.name, e))?;
        self.current = Some(token);
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        if let Some(token) = self.current.take() {
            let func = &mut self.func;
            guarded(&self.name, &token, || func(&token))?;
        }
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Identity replicator: one input copied to every output
pub struct Fanout<T> {
    name: String,
    kind: &'static str,
    input: InPort<T>,
    outputs: Vec<OutPort<T>>,
    current: Option<T>,
}

impl<T: Clone + Debug + Send + 'static> Fanout<T> {
    pub(crate) fn new(name: &str, kind: &'static str, input: &Channel<T>, outputs: &[&Channel<T>]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            input: InPort::new("i1", input, 1),
            outputs: outputs
                .iter()
                .enumerate()
                .map(|(i, ch)| OutPort::new(&format!("o{}", i + 1), ch, 1))
                .collect(),
            current: None,
        }
    }
}

impl<T: Clone + Debug + Send + 'static> Process for Fanout<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.kind
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports = vec![self.input.spec()];
        ports.extend(self.outputs.iter().map(|p| p.spec()));
        ports
    }

    fn readiness(&self) -> Readiness {
        if self.input.satisfied() {
            Readiness::Ready
        } else {
            Readiness::Waiting
        }
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
            for port in &self.outputs {
                port.write(token.clone())
                    .map_err(|e| SimError::channel(&self.name, e))?;
            }
        }
        Ok(())
    }
}

/// Reads a text file at init and emits one converted line per firing
pub struct LineSource<T> {
    name: String,
    kind: &'static str,
    path: PathBuf,
    output: OutPort<T>,
    convert: Box<dyn Fn(&str) -> T + Send>,
    lines: std::vec::IntoIter<String>,
    loaded: bool,
    current: Option<T>,
}

impl<T: Debug + Send + 'static> LineSource<T> {
    pub(crate) fn new<F>(name: &str, kind: &'static str, path: impl Into<PathBuf>, output: &Channel<T>, convert: F) -> Self
    where
        F: Fn(&str) -> T + Send + 'static,
    {
        Self {
            name: name.to_string(),
            kind,
            path: path.into(),
            output: OutPort::new("o1", output, 1),
            convert: Box::new(convert),
            lines: Vec::new().into_iter(),
            loaded: false,
            current: None,
        }
    }

    fn open_error(&self, reason: impl ToString) -> SimError {
        SimError::ResourceOpen {
            process: self.name.clone(),
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl<T: Debug + Send + 'static> Process for LineSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.kind
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.output.spec()]
    }

    fn init(&mut self) -> Result<()> {
        let file = File::open(&self.path).map_err(|e| self.open_error(e))?;
        let lines = BufReader::new(file)
            .lines()
            .collect::<std::io::Result<Vec<String>>>()
            .map_err(|e| self.open_error(e))?;
        info!("[{} {}] loaded {} lines from {}", self.kind, self.name, lines.len(), self.path.display());
        self.lines = lines.into_iter();
        self.loaded = true;
        Ok(())
    }

    fn readiness(&self) -> Readiness {
        if self.loaded && self.lines.len() == 0 {
            Readiness::Exhausted
        } else {
            Readiness::Ready
        }
    }

    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        if let Some(line) = self.lines.next() {
            let convert = &self.convert;
            self.current = Some(guarded(&self.name, &line, || convert(&line))?);
        }
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        if let Some(token) = self.current.take() {
            self.output
                .write(token)
                .map_err(|e| SimError::channel(&self.name, e))?;
        }
        Ok(())
    }

    fn arguments(&self) -> Vec<(String, String)> {
        vec![("path".to_string(), self.path.display().to_string())]
    }
}

/// Writes one converted line per consumed token
pub struct LineSink<T> {
    name: String,
    kind: &'static str,
    path: PathBuf,
    input: InPort<T>,
    convert: Box<dyn Fn(&T) -> String + Send>,
    writer: Option<BufWriter<File>>,
    token: Option<T>,
    line: Option<String>,
}

impl<T: Debug + Send + 'static> LineSink<T> {
    pub(crate) fn new<F>(name: &str, kind: &'static str, path: impl Into<PathBuf>, input: &Channel<T>, convert: F) -> Self
    where
        F: Fn(&T) -> String + Send + 'static,
    {
        Self {
            name: name.to_string(),
            kind,
            path: path.into(),
            input: InPort::new("i1", input, 1),
            convert: Box::new(convert),
            writer: None,
            token: None,
            line: None,
        }
    }

    fn io_error(&self, reason: impl ToString) -> SimError {
        SimError::ResourceOpen {
            process: self.name.clone(),
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl<T: Debug + Send + 'static> Process for LineSink<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.kind
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![self.input.spec()]
    }

    fn init(&mut self) -> Result<()> {
        let file = File::create(&self.path).map_err(|e| self.io_error(e))?;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn readiness(&self) -> Readiness {
        if self.input.satisfied() {
            Readiness::Ready
        } else {
            Readiness::Waiting
        }
    }

    fn prepare(&mut self) -> Result<()> {
        self.token = Some(self.input.read().map_err(|e| SimError::channel(&self.name, e))?);
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        if let Some(token) = self.token.take() {
            let convert = &self.convert;
            self.line = Some(guarded(&self.name, &token, || convert(&token))?);
        }
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        if let Some(line) = self.line.take() {
            let outcome = match self.writer.as_mut() {
                Some(writer) => writeln!(writer, "{}", line),
                None => return Err(self.io_error("file not open")),
            };
            outcome.map_err(|e| self.io_error(e))?;
        }
        Ok(())
    }

    fn clean(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| self.io_error(e))?;
            debug!("[{} {}] closed {}", self.kind, self.name, self.path.display());
        }
        Ok(())
    }

    fn arguments(&self) -> Vec<(String, String)> {
        vec![("path".to_string(), self.path.display().to_string())]
    }
}
