//! The operation trait and a closure-backed implementation.

use crate::core::{OutputArity, Value};
use std::fmt::Debug;

/// An externally supplied processing function invoked by a stage.
///
/// Operations receive their resolved arguments positionally and return
/// their results in order. Errors are reported through `anyhow` and reach
/// the pipeline caller unchanged.
pub trait Operation: Send + Sync + Debug {
    /// Returns the operation name.
    fn name(&self) -> &str;

    /// Returns the number of positional arguments.
    fn arity(&self) -> usize;

    /// Returns how many values the operation produces.
    fn outputs(&self) -> OutputArity {
        OutputArity::Fixed(1)
    }

    /// Invokes the operation.
    ///
    /// # Arguments
    ///
    /// * `args` - Resolved arguments, one per parameter, in declared order
    ///
    /// # Returns
    ///
    /// The produced values, in output order.
    fn invoke(&self, args: &[Value]) -> anyhow::Result<Vec<Value>>;
}

/// A function-based operation.
pub struct FnOperation<F>
where
    F: Fn(&[Value]) -> anyhow::Result<Vec<Value>> + Send + Sync,
{
    name: String,
    arity: usize,
    outputs: OutputArity,
    func: F,
}

impl<F> FnOperation<F>
where
    F: Fn(&[Value]) -> anyhow::Result<Vec<Value>> + Send + Sync,
{
    /// Creates an operation taking `arity` arguments and returning one value.
    pub fn new(name: impl Into<String>, arity: usize, func: F) -> Self {
        Self {
            name: name.into(),
            arity,
            outputs: OutputArity::Fixed(1),
            func,
        }
    }

    /// Declares a fixed number of outputs.
    #[must_use]
    pub fn with_outputs(mut self, count: usize) -> Self {
        self.outputs = OutputArity::Fixed(count);
        self
    }

    /// Declares that the output count varies per call.
    #[must_use]
    pub fn with_dynamic_outputs(mut self) -> Self {
        self.outputs = OutputArity::Dynamic;
        self
    }
}

impl<F> Debug for FnOperation<F>
where
    F: Fn(&[Value]) -> anyhow::Result<Vec<Value>> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnOperation")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("outputs", &self.outputs)
            .finish()
    }
}

impl<F> Operation for FnOperation<F>
where
    F: Fn(&[Value]) -> anyhow::Result<Vec<Value>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn outputs(&self) -> OutputArity {
        self.outputs
    }

    fn invoke(&self, args: &[Value]) -> anyhow::Result<Vec<Value>> {
        (self.func)(args)
    }
}
