//! Hook-dispatch contract between a training framework and the collectors.
//!
//! The framework calls one of the four callbacks around every operation that
//! touches parameters, in program order. The collectors only read parameter
//! sizes; they never move tensors.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a parameter tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamId(pub usize);

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "param#{}", self.0)
    }
}

/// Size view of one parameter tensor participating in an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamRef {
    pub id: ParamId,
    pub numel: u64,
    pub element_size: u64,
    #[serde(default = "default_requires_grad")]
    pub requires_grad: bool,
}

fn default_requires_grad() -> bool {
    true
}

impl ParamRef {
    /// Trainable parameter.
    pub fn new(id: usize, numel: u64, element_size: u64) -> Self {
        Self { id: ParamId(id), numel, element_size, requires_grad: true }
    }

    /// Parameter excluded from gradient computation.
    pub fn frozen(id: usize, numel: u64, element_size: u64) -> Self {
        Self { requires_grad: false, ..Self::new(id, numel, element_size) }
    }

    /// Bytes of the data tensor (and of its gradient, which has the same shape).
    pub fn bytes(&self) -> u64 {
        self.numel.saturating_mul(self.element_size)
    }
}

/// Which half of the training step is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingPhase {
    #[default]
    Forward,
    Backward,
}

/// Callbacks a hook dispatcher invokes around each parameter operation.
pub trait ParamOpHook {
    fn pre_forward(&mut self, params: &[ParamRef]) -> Result<()>;

    fn post_forward(&mut self, params: &[ParamRef]) -> Result<()>;

    fn pre_backward(&mut self, params: &[ParamRef]) -> Result<()>;

    fn post_backward(&mut self, params: &[ParamRef]) -> Result<()>;
}
