//! The action-dispatch boundary.
//!
//! The wire protocol and invocation framework that deliver remote calls
//! live outside this crate; what lives here is the contract they consume:
//! permission levels, parameter descriptors, and the handler an action
//! node carries.

use crate::error::{CoreError, CoreResult};
use crate::node::Node;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Permission level required to invoke an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Permission {
    /// No access.
    None,
    /// Read-only access.
    Read,
    /// Read and write access.
    Write,
    /// Full configuration access.
    Config,
}

/// A declared action parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    description: Option<String>,
}

impl Parameter {
    /// Creates a parameter descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Attaches a human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Handler run when an action node is invoked.
pub type ActionHandler = Box<dyn Fn(&Invocation) -> CoreResult<()> + Send + Sync>;

/// An invocable registered on an action node.
pub struct Action {
    permission: Permission,
    parameters: Vec<Parameter>,
    handler: ActionHandler,
}

impl Action {
    /// Creates an action with its required permission and handler.
    pub fn new(permission: Permission, handler: ActionHandler) -> Self {
        Self {
            permission,
            parameters: Vec::new(),
            handler,
        }
    }

    /// Declares a parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// The permission required to invoke this action.
    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// The declared parameters.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Runs the handler.
    ///
    /// # Errors
    ///
    /// Whatever the handler surfaces; permission checking happens in the
    /// dispatch framework before this is reached.
    pub fn invoke(&self, invocation: &Invocation) -> CoreResult<()> {
        (self.handler)(invocation)
    }
}

/// What the dispatch framework hands an action handler: the invoked
/// action node and the supplied parameter values.
pub struct Invocation {
    node: Arc<Node>,
    params: BTreeMap<String, Value>,
}

impl Invocation {
    /// Creates an invocation targeting an action node.
    pub fn new(node: &Arc<Node>) -> Self {
        Self {
            node: Arc::clone(node),
            params: BTreeMap::new(),
        }
    }

    /// Adds a parameter value.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// The invoked action node.
    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    /// Looks up a supplied parameter.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Looks up a required string parameter.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingParameter`] if the parameter is absent
    /// or not a string.
    pub fn require_str(&self, name: &str) -> CoreResult<&str> {
        self.param(name)
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::missing_parameter(name))
    }
}
