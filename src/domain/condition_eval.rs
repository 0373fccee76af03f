//! Condition evaluation engine.
//!
//! Evaluates conditions against pre-computed indicator series.
//!
//! # Evaluation Semantics
//!
//! - Comparisons read both operands at the given bar index
//! - `CROSS_UP`/`CROSS_DOWN`: compare bar `index - 1` with bar `index`;
//!   `false` at index 0
//! - Any undefined operand (warmup, missing series) makes the condition
//!   `false`; evaluation never fails
//! - A group reduces its conditions with AND or OR; a signal is the OR of
//!   its groups

use crate::domain::condition::{
    ComparisonOperator, Condition, ConditionGroup, IndicatorRef, LogicalOperator,
};
use crate::domain::indicator::{IndicatorSeries, IndicatorSpec};
use std::collections::HashMap;

/// Absolute tolerance for `EQ`.
pub const EQ_TOLERANCE: f64 = 1e-6;

pub type IndicatorMap = HashMap<IndicatorSpec, IndicatorSeries>;

pub fn evaluate_condition(condition: &Condition, indicators: &IndicatorMap, index: usize) -> bool {
    if condition.operator.is_crossing() {
        let Some(right) = condition.right.as_ref() else {
            return false;
        };
        if index == 0 {
            return false;
        }
        let operands = (
            resolve(&condition.left, indicators, index - 1),
            resolve(right, indicators, index - 1),
            resolve(&condition.left, indicators, index),
            resolve(right, indicators, index),
        );
        let (Some(left_prev), Some(right_prev), Some(left_curr), Some(right_curr)) = operands
        else {
            return false;
        };

        return match condition.operator {
            ComparisonOperator::CrossUp => left_prev <= right_prev && left_curr > right_curr,
            _ => left_prev >= right_prev && left_curr < right_curr,
        };
    }

    let Some(left) = resolve(&condition.left, indicators, index) else {
        return false;
    };
    let right = match (&condition.right, condition.value) {
        (Some(ind), _) => resolve(ind, indicators, index),
        (None, v) => v,
    };
    let Some(right) = right else {
        return false;
    };

    match condition.operator {
        ComparisonOperator::Gt => left > right,
        ComparisonOperator::Gte => left >= right,
        ComparisonOperator::Lt => left < right,
        ComparisonOperator::Lte => left <= right,
        ComparisonOperator::Eq => (left - right).abs() < EQ_TOLERANCE,
        ComparisonOperator::CrossUp | ComparisonOperator::CrossDown => false,
    }
}

pub fn evaluate_group(group: &ConditionGroup, indicators: &IndicatorMap, index: usize) -> bool {
    if group.conditions.is_empty() {
        return false;
    }
    match group.operator {
        LogicalOperator::And => group
            .conditions
            .iter()
            .all(|c| evaluate_condition(c, indicators, index)),
        LogicalOperator::Or => group
            .conditions
            .iter()
            .any(|c| evaluate_condition(c, indicators, index)),
    }
}

/// A signal fires when any of its groups is satisfied.
pub fn evaluate_signal(groups: &[ConditionGroup], indicators: &IndicatorMap, index: usize) -> bool {
    groups.iter().any(|g| evaluate_group(g, indicators, index))
}

fn resolve(operand: &IndicatorRef, indicators: &IndicatorMap, index: usize) -> Option<f64> {
    indicators.get(&operand.spec)?.value_at(index, operand.field)
}
