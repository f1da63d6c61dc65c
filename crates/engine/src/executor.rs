//! Action tree interpreter

use crate::condition::ConditionEvaluator;
use crate::driver::DomDriver;
use crate::errors::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use stepflow_data::{DataIteration, IterationOptions, IterationSummary, RecordOutcome};
use stepflow_model::{
    Action, ActionKind, ActionResult, Condition, Control, ExecutionContext, FieldMapping,
};
use tracing::{debug, info, warn};

/// Report of one complete top-level execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub latency_ms: i64,
    pub result: ActionResult,
    /// Snapshot of the context variables after execution
    pub variables: Map<String, Value>,
}

/// Depth-first interpreter for one action tree.
///
/// Every `execute` call runs to completion on the calling thread before
/// returning. Child failures never escape as errors; each interior node
/// converts them to a failure result at its own boundary.
#[derive(Clone, Default)]
pub struct Engine {
    evaluator: ConditionEvaluator,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            evaluator: ConditionEvaluator::new(),
        }
    }

    /// Engine with the DOM driver capability installed
    pub fn with_dom_driver(driver: Arc<dyn DomDriver>) -> Self {
        Self {
            evaluator: ConditionEvaluator::with_dom_driver(driver),
        }
    }

    pub fn evaluator(&self) -> &ConditionEvaluator {
        &self.evaluator
    }

    /// Validate the tree, execute it, and wrap the outcome in a report.
    ///
    /// Validation is the only path that raises; everything past it is
    /// reported through the result.
    pub fn run(
        &self,
        action: &Action,
        ctx: &mut ExecutionContext,
    ) -> Result<ExecutionReport, EngineError> {
        action.validate()?;
        let started_at = Utc::now();
        info!(action_id = %action.id, "execution started");
        let result = self.execute(action, ctx);
        let finished_at = Utc::now();
        let latency_ms = (finished_at - started_at).num_milliseconds();
        info!(
            action_id = %action.id,
            success = result.success,
            latency_ms,
            "execution finished"
        );
        Ok(ExecutionReport {
            started_at,
            finished_at,
            latency_ms,
            result,
            variables: ctx.values().clone(),
        })
    }

    /// Execute one node against the context
    pub fn execute(&self, action: &Action, ctx: &mut ExecutionContext) -> ActionResult {
        debug!(action_id = %action.id, "executing action");
        match &action.kind {
            ActionKind::Sequence { actions } => self.run_actions(actions, ctx),
            ActionKind::SetVariable {
                name,
                value,
                evaluate,
            } => self.set_variable(name, value, *evaluate, ctx),
            ActionKind::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => self.if_then_else(condition, then_branch, else_branch, ctx),
            ActionKind::SwitchCase {
                cases,
                default_branch,
            } => self.switch_case(cases, default_branch, ctx),
            ActionKind::WhileLoop {
                condition,
                body,
                max_iterations,
            } => self.while_loop(condition, body, *max_iterations, ctx),
            ActionKind::Break => ActionResult::break_signal(),
            ActionKind::Continue => ActionResult::continue_signal(),
            ActionKind::DataDriven {
                source,
                mappings,
                body,
                continue_on_error,
                max_errors,
                results_variable,
            } => self.data_driven(
                source,
                mappings,
                body,
                IterationOptions {
                    continue_on_error: *continue_on_error,
                    max_errors: *max_errors,
                },
                results_variable.as_deref(),
                ctx,
            ),
        }
    }

    /// Run a child list in order, stopping at the first failure or active
    /// control signal. Control signals propagate up to the nearest loop.
    fn run_actions(&self, actions: &[Action], ctx: &mut ExecutionContext) -> ActionResult {
        for action in actions {
            let result = self.execute(action, ctx);
            if !result.success || !result.is_normal() {
                return result;
            }
        }
        ActionResult::ok(format!("{} actions completed", actions.len()))
    }

    fn set_variable(
        &self,
        name: &str,
        value: &Value,
        evaluate: bool,
        ctx: &mut ExecutionContext,
    ) -> ActionResult {
        // the variable name itself may be a template
        let name = match stepflow_expr::resolve(name, ctx) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            Ok(other) => {
                return ActionResult::fail(format!(
                    "variable name `{name}` did not resolve to a usable name: {other}"
                ))
            }
            Err(e) => return ActionResult::fail(e.to_string()),
        };
        let resolved = match (evaluate, value) {
            (true, Value::String(expr)) => match stepflow_expr::resolve(expr, ctx) {
                Ok(v) => v,
                Err(e) => return ActionResult::fail(e.to_string()),
            },
            _ => value.clone(),
        };
        ctx.set(name.clone(), resolved);
        ActionResult::ok(format!("set `{name}`"))
    }

    fn if_then_else(
        &self,
        condition: &Condition,
        then_branch: &[Action],
        else_branch: &[Action],
        ctx: &mut ExecutionContext,
    ) -> ActionResult {
        let outcome = self.evaluator.evaluate(condition, ctx);
        if !outcome.success {
            return ActionResult::fail(format!("branch condition failed: {}", outcome.message));
        }
        if outcome.value {
            self.run_actions(then_branch, ctx)
        } else {
            self.run_actions(else_branch, ctx)
        }
    }

    fn switch_case(
        &self,
        cases: &[stepflow_model::Case],
        default_branch: &[Action],
        ctx: &mut ExecutionContext,
    ) -> ActionResult {
        for (index, case) in cases.iter().enumerate() {
            let outcome = self.evaluator.evaluate(&case.condition, ctx);
            if !outcome.success {
                return ActionResult::fail(format!(
                    "case {index} condition failed: {}",
                    outcome.message
                ));
            }
            if outcome.value {
                debug!(case = index, "switch matched");
                return self.run_actions(&case.actions, ctx);
            }
        }
        self.run_actions(default_branch, ctx)
    }

    fn while_loop(
        &self,
        condition: &Condition,
        body: &[Action],
        max_iterations: Option<u64>,
        ctx: &mut ExecutionContext,
    ) -> ActionResult {
        let mut iterations: u64 = 0;
        loop {
            // the cap is a safety valve and wins over condition truth
            if max_iterations.is_some_and(|max| iterations >= max) {
                return ActionResult::ok_with(
                    format!("iteration cap reached after {iterations} iterations"),
                    json!({ "iterations": iterations }),
                );
            }
            let outcome = self.evaluator.evaluate(condition, ctx);
            if !outcome.success {
                return ActionResult::fail_with(
                    format!("loop condition failed: {}", outcome.message),
                    json!({ "iterations": iterations }),
                );
            }
            if !outcome.value {
                return ActionResult::ok_with(
                    format!("loop finished after {iterations} iterations"),
                    json!({ "iterations": iterations }),
                );
            }

            let mut broke = false;
            for action in body {
                let result = self.execute(action, ctx);
                if !result.success {
                    return ActionResult::fail_with(
                        format!("loop body failed at iteration {iterations}: {}", result.message),
                        json!({ "iterations": iterations }),
                    );
                }
                match result.control {
                    Control::Normal => {}
                    Control::Break => {
                        broke = true;
                        break;
                    }
                    // skip the rest of the body, re-evaluate the condition
                    Control::Continue => break,
                }
            }
            iterations += 1;
            if broke {
                debug!(iterations, "loop break");
                return ActionResult::ok_with(
                    format!("loop stopped by break after {iterations} iterations"),
                    json!({ "iterations": iterations }),
                );
            }
        }
    }

    fn data_driven(
        &self,
        source: &stepflow_model::DataSourceSpec,
        mappings: &[FieldMapping],
        body: &[Action],
        options: IterationOptions,
        results_variable: Option<&str>,
        ctx: &mut ExecutionContext,
    ) -> ActionResult {
        let source = stepflow_data::from_spec(source);
        let execute = |record_ctx: &mut ExecutionContext| {
            let result = self.run_actions(body, record_ctx);
            if result.success {
                RecordOutcome::ok(result.message)
            } else {
                RecordOutcome::fail(result.message)
            }
        };
        let iteration = match DataIteration::new(source, mappings, ctx, options, execute) {
            Ok(iteration) => iteration,
            Err(e) => {
                warn!(error = %e, "data source unavailable");
                return ActionResult::fail(format!("data source unavailable: {e}"));
            }
        };
        let results: Vec<_> = iteration.collect();
        let summary = IterationSummary::from_results(&results);

        if let Some(name) = results_variable {
            match serde_json::to_value(&results) {
                Ok(value) => ctx.set(name, value),
                Err(e) => return ActionResult::fail(format!("cannot store results: {e}")),
            }
        }

        let payload = json!({
            "total": summary.total,
            "success": summary.success,
            "error": summary.error,
            "success_rate": summary.success_rate(),
        });
        if summary.error == 0 {
            ActionResult::ok_with(
                format!("{} records processed", summary.total),
                payload,
            )
        } else {
            ActionResult::fail_with(
                format!(
                    "{} of {} records failed",
                    summary.error, summary.total
                ),
                payload,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepflow_model::{Case, CompareOp, DataSourceSpec, FieldMapping, Operand};

    fn lt(variable: &str, limit: i64) -> Condition {
        Condition::comparison(
            Operand::Variable(variable.into()),
            CompareOp::LessThan,
            Operand::Literal(json!(limit)),
        )
    }

    fn always_true() -> Condition {
        Condition::comparison(
            Operand::Literal(json!(1)),
            CompareOp::Equal,
            Operand::Literal(json!(1)),
        )
    }

    #[test]
    fn sequence_stops_at_first_failure() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        let tree = Action::sequence(vec![
            Action::set_variable("a", json!(1)),
            // condition failure inside the branch becomes an action failure
            Action::if_then_else(lt("missing", 5), vec![], vec![]),
            Action::set_variable("b", json!(2)),
        ]);
        let result = engine.execute(&tree, &mut ctx);
        assert!(!result.success);
        assert_eq!(ctx.get("a"), Some(&json!(1)));
        assert!(ctx.get("b").is_none());
    }

    #[test]
    fn set_variable_resolves_expressions() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        ctx.set("user", json!({"name": "Jo"}));
        let action = Action::set_variable_expr("greeting", "Hi ${user.name}!");
        let result = engine.execute(&action, &mut ctx);
        assert!(result.success);
        assert_eq!(ctx.get("greeting"), Some(&json!("Hi Jo!")));
        // whole-reference assignment keeps the native type
        let action = Action::set_variable_expr("copy", "${user}");
        assert!(engine.execute(&action, &mut ctx).success);
        assert_eq!(ctx.get("copy"), Some(&json!({"name": "Jo"})));
    }

    #[test]
    fn set_variable_name_may_be_templated() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        ctx.set("i", json!(3));
        let action = Action::set_variable("slot_${i}", json!("x"));
        assert!(engine.execute(&action, &mut ctx).success);
        assert_eq!(ctx.get("slot_3"), Some(&json!("x")));
    }

    #[test]
    fn if_then_else_picks_branch() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        ctx.set("n", json!(3));
        let tree = Action::if_then_else(
            lt("n", 5),
            vec![Action::set_variable("taken", json!("then"))],
            vec![Action::set_variable("taken", json!("else"))],
        );
        assert!(engine.execute(&tree, &mut ctx).success);
        assert_eq!(ctx.get("taken"), Some(&json!("then")));

        ctx.set("n", json!(9));
        assert!(engine.execute(&tree, &mut ctx).success);
        assert_eq!(ctx.get("taken"), Some(&json!("else")));
    }

    #[test]
    fn empty_else_branch_is_a_successful_noop() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        ctx.set("n", json!(9));
        let tree = Action::if_then_else(lt("n", 5), vec![Action::set_variable("x", json!(1))], vec![]);
        let result = engine.execute(&tree, &mut ctx);
        assert!(result.success);
        assert!(ctx.get("x").is_none());
    }

    #[test]
    fn switch_case_first_match_wins() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        ctx.set("n", json!(2));
        let tree = Action::switch_case(
            vec![
                Case {
                    condition: lt("n", 1),
                    actions: vec![Action::set_variable("bucket", json!("tiny"))],
                },
                Case {
                    condition: lt("n", 10),
                    actions: vec![Action::set_variable("bucket", json!("small"))],
                },
                Case {
                    condition: always_true(),
                    actions: vec![Action::set_variable("bucket", json!("any"))],
                },
            ],
            vec![Action::set_variable("bucket", json!("default"))],
        );
        assert!(engine.execute(&tree, &mut ctx).success);
        assert_eq!(ctx.get("bucket"), Some(&json!("small")));
    }

    #[test]
    fn switch_case_falls_through_to_default() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        ctx.set("n", json!(99));
        let tree = Action::switch_case(
            vec![Case {
                condition: lt("n", 1),
                actions: vec![Action::set_variable("bucket", json!("tiny"))],
            }],
            vec![Action::set_variable("bucket", json!("default"))],
        );
        assert!(engine.execute(&tree, &mut ctx).success);
        assert_eq!(ctx.get("bucket"), Some(&json!("default")));
    }

    #[test]
    fn while_loop_counts_to_the_condition() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        ctx.set("n", json!(0));
        let tree = Action::while_loop(
            lt("n", 5),
            vec![Action::set_variable_expr("n", "${n.plus(1)}")],
            None,
        );
        let result = engine.execute(&tree, &mut ctx);
        assert!(result.success, "{}", result.message);
        assert_eq!(ctx.get("n"), Some(&json!(5)));
        assert_eq!(result.payload, Some(json!({"iterations": 5})));
    }

    #[test]
    fn iteration_cap_terminates_an_always_true_loop() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        ctx.set("n", json!(0));
        let tree = Action::while_loop(
            always_true(),
            vec![Action::set_variable_expr("n", "${n.plus(1)}")],
            Some(10),
        );
        let result = engine.execute(&tree, &mut ctx);
        assert!(result.success);
        assert_eq!(ctx.get("n"), Some(&json!(10)));
        assert_eq!(result.payload, Some(json!({"iterations": 10})));
    }

    #[test]
    fn break_exits_the_nearest_loop() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        ctx.set("n", json!(0));
        let tree = Action::while_loop(
            always_true(),
            vec![
                Action::set_variable_expr("n", "${n.plus(1)}"),
                Action::if_then_else(
                    Condition::comparison(
                        Operand::Variable("n".into()),
                        CompareOp::GreaterOrEqual,
                        Operand::Literal(json!(3)),
                    ),
                    vec![Action::break_loop()],
                    vec![],
                ),
                Action::set_variable("after_break", json!(true)),
            ],
            Some(100),
        );
        let result = engine.execute(&tree, &mut ctx);
        assert!(result.success);
        assert_eq!(ctx.get("n"), Some(&json!(3)));
        // break propagated through the branch and skipped the trailing action
        assert_eq!(ctx.get("after_break"), Some(&json!(true)));
        // ...on earlier iterations only; the breaking iteration skipped it
        let mut ctx2 = ExecutionContext::new();
        ctx2.set("n", json!(2));
        let result2 = engine.execute(&tree, &mut ctx2);
        assert!(result2.success);
        assert!(ctx2.get("after_break").is_none());
    }

    #[test]
    fn continue_skips_remaining_body_actions() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        ctx.set("n", json!(0));
        ctx.set("odd_sum", json!(0));
        // sum odd numbers below 6; continue skips the accumulation on evens
        let tree = Action::while_loop(
            lt("n", 6),
            vec![
                Action::set_variable_expr("n", "${n.plus(1)}"),
                Action::if_then_else(
                    Condition::comparison(
                        Operand::Variable("n".into()),
                        CompareOp::GreaterThan,
                        Operand::Literal(json!(4)),
                    ),
                    vec![Action::continue_loop()],
                    vec![],
                ),
                Action::set_variable_expr("last_small", "${n}"),
            ],
            None,
        );
        let result = engine.execute(&tree, &mut ctx);
        assert!(result.success, "{}", result.message);
        assert_eq!(ctx.get("last_small"), Some(&json!(4)));
        assert_eq!(ctx.get("n"), Some(&json!(6)));
    }

    #[test]
    fn stray_break_surfaces_on_the_root_result() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        let tree = Action::sequence(vec![
            Action::set_variable("a", json!(1)),
            Action::break_loop(),
            Action::set_variable("b", json!(2)),
        ]);
        let result = engine.execute(&tree, &mut ctx);
        assert!(result.success);
        assert_eq!(result.control, Control::Break);
        // the sequence stopped at the signal
        assert!(ctx.get("b").is_none());
    }

    #[test]
    fn loop_body_failure_fails_the_loop() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        ctx.set("n", json!(0));
        let tree = Action::while_loop(
            lt("n", 5),
            vec![
                Action::set_variable_expr("n", "${n.plus(1)}"),
                Action::if_then_else(lt("missing", 1), vec![], vec![]),
            ],
            None,
        );
        let result = engine.execute(&tree, &mut ctx);
        assert!(!result.success);
        assert_eq!(result.payload, Some(json!({"iterations": 0})));
    }

    fn five_records() -> DataSourceSpec {
        let records = (0..5)
            .map(|i| json!({"idx": i}).as_object().cloned().unwrap())
            .collect();
        DataSourceSpec::Inline { records }
    }

    // fails on records 1 and 3
    fn flaky_body() -> Vec<Action> {
        vec![Action::if_then_else(
            Condition::or(vec![
                Condition::comparison(
                    Operand::Variable("idx".into()),
                    CompareOp::Equal,
                    Operand::Literal(json!(1)),
                ),
                Condition::comparison(
                    Operand::Variable("idx".into()),
                    CompareOp::Equal,
                    Operand::Literal(json!(3)),
                ),
            ])
            .unwrap(),
            vec![Action::if_then_else(lt("boom", 1), vec![], vec![])],
            vec![],
        )]
    }

    #[test]
    fn data_driven_aggregates_a_summary() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        let mut action = Action::data_driven(
            five_records(),
            vec![FieldMapping::new("idx", "idx")],
            flaky_body(),
        );
        if let ActionKind::DataDriven {
            results_variable, ..
        } = &mut action.kind
        {
            *results_variable = Some("outcomes".into());
        }
        let result = engine.execute(&action, &mut ctx);
        assert!(!result.success);
        assert_eq!(
            result.payload.as_ref().and_then(|p| p.get("total")),
            Some(&json!(5))
        );
        assert_eq!(
            result.payload.as_ref().and_then(|p| p.get("success")),
            Some(&json!(3))
        );
        assert_eq!(
            result.payload.as_ref().and_then(|p| p.get("error")),
            Some(&json!(2))
        );
        let outcomes = ctx.get("outcomes").and_then(|v| v.as_array()).unwrap();
        assert_eq!(outcomes.len(), 5);
        assert_eq!(outcomes[1]["success"], json!(false));
    }

    #[test]
    fn data_driven_stop_on_first_error() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        let mut action = Action::data_driven(
            five_records(),
            vec![FieldMapping::new("idx", "idx")],
            flaky_body(),
        );
        if let ActionKind::DataDriven {
            continue_on_error,
            results_variable,
            ..
        } = &mut action.kind
        {
            *continue_on_error = false;
            *results_variable = Some("outcomes".into());
        }
        let result = engine.execute(&action, &mut ctx);
        assert!(!result.success);
        // records 0 and 1 processed; the failing record is included
        assert_eq!(
            ctx.get("outcomes").and_then(|v| v.as_array()).map(Vec::len),
            Some(2)
        );
    }

    #[test]
    fn data_driven_record_mutations_do_not_leak() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        ctx.set("shared", json!("base"));
        let action = Action::data_driven(
            five_records(),
            vec![FieldMapping::new("idx", "idx")],
            vec![Action::set_variable("shared", json!("mutated"))],
        );
        assert!(engine.execute(&action, &mut ctx).success);
        assert_eq!(ctx.get("shared"), Some(&json!("base")));
    }

    #[test]
    fn data_driven_unopenable_source_is_a_failure_result() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        let action = Action::data_driven(
            DataSourceSpec::Csv {
                path: "/nonexistent/input.csv".into(),
                delimiter: None,
            },
            vec![],
            vec![],
        );
        let result = engine.execute(&action, &mut ctx);
        assert!(!result.success);
        assert!(result.message.contains("data source unavailable"));
    }

    #[test]
    fn run_produces_a_report() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        let tree = Action::sequence(vec![Action::set_variable("done", json!(true))]);
        let report = engine.run(&tree, &mut ctx).unwrap();
        assert!(report.result.success);
        assert_eq!(report.variables.get("done"), Some(&json!(true)));
        assert!(report.latency_ms >= 0);
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn run_rejects_an_invalid_tree() {
        let engine = Engine::new();
        let mut ctx = ExecutionContext::new();
        let tree = Action::while_loop(always_true(), vec![], Some(0));
        assert!(engine.run(&tree, &mut ctx).is_err());
    }
}
