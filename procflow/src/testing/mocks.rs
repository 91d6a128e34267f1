//! Mock operations for testing.

use parking_lot::Mutex;

use crate::core::{OutputArity, Value};
use crate::stages::Operation;

/// An operation that records every argument list it receives.
///
/// Returns its first argument unchanged, or [`Value::None`] when it takes
/// no arguments.
#[derive(Debug)]
pub struct RecordingOperation {
    name: String,
    arity: usize,
    calls: Mutex<Vec<Vec<Value>>>,
}

impl RecordingOperation {
    /// Creates a recording operation.
    #[must_use]
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Returns the number of times the operation was invoked.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the argument lists from each call.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.calls.lock().clone()
    }

    /// Returns the arguments of the most recent call.
    #[must_use]
    pub fn last_call(&self) -> Option<Vec<Value>> {
        self.calls.lock().last().cloned()
    }

    /// Resets call tracking.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

impl Operation for RecordingOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn invoke(&self, args: &[Value]) -> anyhow::Result<Vec<Value>> {
        self.calls.lock().push(args.to_vec());
        Ok(vec![args.first().cloned().unwrap_or_default()])
    }
}

/// A source operation that takes no arguments and produces fixed values.
#[derive(Debug)]
pub struct ConstOperation {
    values: Vec<Value>,
    calls: Mutex<usize>,
}

impl ConstOperation {
    /// Creates an operation producing the single value `value`.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self::many(vec![value.into()])
    }

    /// Creates an operation producing every value in `values`.
    #[must_use]
    pub fn many(values: Vec<Value>) -> Self {
        Self {
            values,
            calls: Mutex::new(0),
        }
    }

    /// Returns the number of times the operation was invoked.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

impl Operation for ConstOperation {
    fn name(&self) -> &str {
        "const"
    }

    fn arity(&self) -> usize {
        0
    }

    fn outputs(&self) -> OutputArity {
        OutputArity::Fixed(self.values.len())
    }

    fn invoke(&self, _args: &[Value]) -> anyhow::Result<Vec<Value>> {
        *self.calls.lock() += 1;
        Ok(self.values.clone())
    }
}

/// An operation that always fails.
#[derive(Debug)]
pub struct FailingOperation {
    name: String,
    arity: usize,
    message: String,
    calls: Mutex<usize>,
}

impl FailingOperation {
    /// Creates a failing operation with the given error message.
    #[must_use]
    pub fn new(name: impl Into<String>, arity: usize, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arity,
            message: message.into(),
            calls: Mutex::new(0),
        }
    }

    /// Returns the number of times the operation was invoked.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

impl Operation for FailingOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn invoke(&self, _args: &[Value]) -> anyhow::Result<Vec<Value>> {
        *self.calls.lock() += 1;
        anyhow::bail!("{}", self.message)
    }
}
