//! Executable action tree

use crate::condition::Condition;
use crate::errors::ModelError;
use crate::mapping::FieldMapping;
use crate::source::DataSourceSpec;
use serde_json::Value;
use uuid::Uuid;

/// One case arm of a switch action
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub condition: Condition,
    pub actions: Vec<Action>,
}

/// An executable tree node representing one step or control-flow construct
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Stable node identifier
    pub id: String,
    /// Human-readable description
    pub description: String,
    /// Action variant
    pub kind: ActionKind,
}

/// Action variants
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    /// Run children in order, stopping at the first failure
    Sequence { actions: Vec<Action> },

    /// Assign a variable, optionally resolving the value as an expression
    SetVariable {
        name: String,
        value: Value,
        /// When true and the value is a string, it is resolved through the
        /// expression grammar before assignment
        evaluate: bool,
    },

    /// Conditional branch
    IfThenElse {
        condition: Condition,
        then_branch: Vec<Action>,
        else_branch: Vec<Action>,
    },

    /// First matching case wins; the default branch runs when none match
    SwitchCase {
        cases: Vec<Case>,
        default_branch: Vec<Action>,
    },

    /// Condition-driven loop with an optional hard iteration cap
    WhileLoop {
        condition: Condition,
        body: Vec<Action>,
        max_iterations: Option<u64>,
    },

    /// Signal the nearest enclosing loop to terminate
    Break,

    /// Signal the nearest enclosing loop to skip to the next iteration
    Continue,

    /// Run the body once per record of a data source
    DataDriven {
        source: DataSourceSpec,
        mappings: Vec<FieldMapping>,
        body: Vec<Action>,
        /// Keep iterating past failing records
        continue_on_error: bool,
        /// Stop once this many records have failed
        max_errors: Option<u64>,
        /// Context variable receiving the per-record result list
        results_variable: Option<String>,
    },
}

impl Action {
    /// Create an action with a fresh id and no description
    pub fn new(kind: ActionKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: String::new(),
            kind,
        }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set an explicit id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sequence of child actions
    pub fn sequence(actions: Vec<Action>) -> Self {
        Self::new(ActionKind::Sequence { actions })
    }

    /// Assign a literal value
    pub fn set_variable(name: impl Into<String>, value: Value) -> Self {
        Self::new(ActionKind::SetVariable {
            name: name.into(),
            value,
            evaluate: false,
        })
    }

    /// Assign the result of an expression
    pub fn set_variable_expr(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self::new(ActionKind::SetVariable {
            name: name.into(),
            value: Value::String(expr.into()),
            evaluate: true,
        })
    }

    /// Conditional branch
    pub fn if_then_else(
        condition: Condition,
        then_branch: Vec<Action>,
        else_branch: Vec<Action>,
    ) -> Self {
        Self::new(ActionKind::IfThenElse {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// Switch over ordered cases
    pub fn switch_case(cases: Vec<Case>, default_branch: Vec<Action>) -> Self {
        Self::new(ActionKind::SwitchCase {
            cases,
            default_branch,
        })
    }

    /// Condition-driven loop
    pub fn while_loop(
        condition: Condition,
        body: Vec<Action>,
        max_iterations: Option<u64>,
    ) -> Self {
        Self::new(ActionKind::WhileLoop {
            condition,
            body,
            max_iterations,
        })
    }

    /// Loop break signal
    pub fn break_loop() -> Self {
        Self::new(ActionKind::Break)
    }

    /// Loop continue signal
    pub fn continue_loop() -> Self {
        Self::new(ActionKind::Continue)
    }

    /// Data-driven iteration
    pub fn data_driven(
        source: DataSourceSpec,
        mappings: Vec<FieldMapping>,
        body: Vec<Action>,
    ) -> Self {
        Self::new(ActionKind::DataDriven {
            source,
            mappings,
            body,
            continue_on_error: true,
            max_errors: None,
            results_variable: None,
        })
    }

    /// Validate the subtree rooted at this action
    pub fn validate(&self) -> Result<(), ModelError> {
        match &self.kind {
            ActionKind::Sequence { actions } => actions.iter().try_for_each(Action::validate),
            ActionKind::SetVariable { name, .. } => {
                if name.is_empty() {
                    return Err(ModelError::EmptyVariableName {
                        id: self.id.clone(),
                    });
                }
                Ok(())
            }
            ActionKind::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.validate()?;
                then_branch.iter().try_for_each(Action::validate)?;
                else_branch.iter().try_for_each(Action::validate)
            }
            ActionKind::SwitchCase {
                cases,
                default_branch,
            } => {
                for case in cases {
                    case.condition.validate()?;
                    case.actions.iter().try_for_each(Action::validate)?;
                }
                default_branch.iter().try_for_each(Action::validate)
            }
            ActionKind::WhileLoop {
                condition,
                body,
                max_iterations,
            } => {
                if *max_iterations == Some(0) {
                    return Err(ModelError::ZeroIterationCap {
                        id: self.id.clone(),
                    });
                }
                condition.validate()?;
                body.iter().try_for_each(Action::validate)
            }
            ActionKind::Break | ActionKind::Continue => Ok(()),
            ActionKind::DataDriven {
                mappings,
                body,
                max_errors,
                ..
            } => {
                if *max_errors == Some(0) {
                    return Err(ModelError::ZeroErrorBudget {
                        id: self.id.clone(),
                    });
                }
                for mapping in mappings {
                    mapping.validate()?;
                }
                body.iter().try_for_each(Action::validate)
            }
        }
    }
}
