//! Declarative condition model.
//!
//! - `IndicatorRef`: an indicator spec plus the output field to read
//! - `Condition`: left operand, comparison operator, and either a right
//!   operand or a literal threshold (exactly one)
//! - `ConditionGroup`: conditions combined with AND or OR
//!
//! Groups belonging to the same signal are OR'd together by the evaluator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::StratbenchError;
use crate::domain::indicator::{IndicatorField, IndicatorSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonOperator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    CrossUp,
    CrossDown,
}

impl ComparisonOperator {
    pub fn is_crossing(self) -> bool {
        matches!(
            self,
            ComparisonOperator::CrossUp | ComparisonOperator::CrossDown
        )
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Gte => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Lte => "<=",
            ComparisonOperator::Eq => "==",
            ComparisonOperator::CrossUp => "crosses above",
            ComparisonOperator::CrossDown => "crosses below",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndicatorRef {
    #[serde(flatten)]
    pub spec: IndicatorSpec,
    #[serde(default, skip_serializing_if = "is_default_field")]
    pub field: IndicatorField,
}

fn is_default_field(field: &IndicatorField) -> bool {
    *field == IndicatorField::Value
}

impl IndicatorRef {
    pub fn new(spec: IndicatorSpec) -> Self {
        IndicatorRef {
            spec,
            field: IndicatorField::Value,
        }
    }

    pub fn with_field(spec: IndicatorSpec, field: IndicatorField) -> Self {
        IndicatorRef { spec, field }
    }
}

impl fmt::Display for IndicatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field == IndicatorField::Value {
            write!(f, "{}", self.spec)
        } else {
            let field = match self.field {
                IndicatorField::Value => "value",
                IndicatorField::Signal => "signal",
                IndicatorField::Histogram => "histogram",
                IndicatorField::Upper => "upper",
                IndicatorField::Middle => "middle",
                IndicatorField::Lower => "lower",
                IndicatorField::K => "k",
                IndicatorField::D => "d",
            };
            write!(f, "{}.{}", self.spec, field)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "leftIndicator")]
    pub left: IndicatorRef,
    pub operator: ComparisonOperator,
    #[serde(
        rename = "rightIndicator",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub right: Option<IndicatorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Condition {
    /// Compare two indicators.
    pub fn indicators(left: IndicatorRef, operator: ComparisonOperator, right: IndicatorRef) -> Self {
        Condition {
            left,
            operator,
            right: Some(right),
            value: None,
        }
    }

    /// Compare an indicator against a literal threshold.
    pub fn threshold(left: IndicatorRef, operator: ComparisonOperator, value: f64) -> Self {
        Condition {
            left,
            operator,
            right: None,
            value: Some(value),
        }
    }

    /// Indicators this condition reads.
    pub fn indicators_used(&self) -> impl Iterator<Item = IndicatorSpec> + '_ {
        std::iter::once(self.left.spec).chain(self.right.map(|r| r.spec))
    }

    pub fn validate(&self) -> Result<(), StratbenchError> {
        match (&self.right, self.value) {
            (Some(_), Some(_)) => {
                return Err(StratbenchError::strategy(format!(
                    "condition on {} sets both rightIndicator and value",
                    self.left
                )));
            }
            (None, None) => {
                return Err(StratbenchError::strategy(format!(
                    "condition on {} needs rightIndicator or value",
                    self.left
                )));
            }
            (None, Some(v)) => {
                if self.operator.is_crossing() {
                    return Err(StratbenchError::strategy(format!(
                        "{} {} a literal value is not supported",
                        self.left, self.operator
                    )));
                }
                if !v.is_finite() {
                    return Err(StratbenchError::strategy(format!(
                        "condition on {} has a non-finite value",
                        self.left
                    )));
                }
            }
            (Some(_), None) => {}
        }

        for operand in std::iter::once(&self.left).chain(self.right.as_ref()) {
            operand.spec.validate()?;
            if !operand.spec.supports(operand.field) {
                return Err(StratbenchError::strategy(format!(
                    "{} has no field {:?}",
                    operand.spec, operand.field
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.right, self.value) {
            (Some(right), _) => write!(f, "{} {} {}", self.left, self.operator, right),
            (None, Some(v)) => write!(f, "{} {} {}", self.left, self.operator, v),
            (None, None) => write!(f, "{} {} ?", self.left, self.operator),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub operator: LogicalOperator,
}

impl ConditionGroup {
    pub fn all(conditions: Vec<Condition>) -> Self {
        ConditionGroup {
            id: None,
            conditions,
            operator: LogicalOperator::And,
        }
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        ConditionGroup {
            id: None,
            conditions,
            operator: LogicalOperator::Or,
        }
    }

    pub fn validate(&self) -> Result<(), StratbenchError> {
        if self.conditions.is_empty() {
            let name = self.id.as_deref().unwrap_or("<unnamed>");
            return Err(StratbenchError::strategy(format!(
                "condition group {name} has no conditions"
            )));
        }
        for condition in &self.conditions {
            condition.validate()?;
        }
        Ok(())
    }
}

impl fmt::Display for ConditionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joiner = match self.operator {
            LogicalOperator::And => " AND ",
            LogicalOperator::Or => " OR ",
        };
        let parts: Vec<String> = self.conditions.iter().map(|c| c.to_string()).collect();
        write!(f, "({})", parts.join(joiner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sma(period: usize) -> IndicatorRef {
        IndicatorRef::new(IndicatorSpec::Sma { period })
    }

    #[test]
    fn parse_indicator_condition() {
        let json = r#"{
            "leftIndicator": {"type": "SMA", "period": 5},
            "operator": "CROSS_UP",
            "rightIndicator": {"type": "SMA", "period": 20}
        }"#;
        let cond: Condition = serde_json::from_str(json).unwrap();
        assert_eq!(
            cond,
            Condition::indicators(sma(5), ComparisonOperator::CrossUp, sma(20))
        );
        assert!(cond.validate().is_ok());
    }

    #[test]
    fn parse_threshold_condition_with_field() {
        let json = r#"{
            "leftIndicator": {"type": "MACD", "field": "histogram"},
            "operator": "GT",
            "value": 0
        }"#;
        let cond: Condition = serde_json::from_str(json).unwrap();
        assert_eq!(cond.left.field, IndicatorField::Histogram);
        assert_eq!(cond.value, Some(0.0));
        assert!(cond.right.is_none());
    }

    #[test]
    fn parse_group_defaults_to_and() {
        let json = r#"{"conditions": [
            {"leftIndicator": {"type": "RSI"}, "operator": "LT", "value": 30}
        ]}"#;
        let group: ConditionGroup = serde_json::from_str(json).unwrap();
        assert_eq!(group.operator, LogicalOperator::And);
        assert_eq!(group.conditions.len(), 1);
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let json = r#"{"leftIndicator": {"type": "RSI"}, "operator": "BETWEEN", "value": 30}"#;
        assert!(serde_json::from_str::<Condition>(json).is_err());
    }

    #[test]
    fn validate_requires_exactly_one_right_side() {
        let mut cond = Condition::threshold(sma(5), ComparisonOperator::Gt, 10.0);
        cond.right = Some(sma(20));
        assert!(cond.validate().is_err());

        cond.right = None;
        cond.value = None;
        assert!(cond.validate().is_err());
    }

    #[test]
    fn validate_rejects_crossing_a_literal() {
        let cond = Condition::threshold(sma(5), ComparisonOperator::CrossUp, 100.0);
        let err = cond.validate().unwrap_err();
        assert!(err.to_string().contains("literal"));
    }

    #[test]
    fn validate_rejects_foreign_field() {
        let left = IndicatorRef::with_field(IndicatorSpec::Rsi { period: 14 }, IndicatorField::Upper);
        let cond = Condition::threshold(left, ComparisonOperator::Gt, 70.0);
        assert!(cond.validate().is_err());
    }

    #[test]
    fn validate_checks_operand_specs() {
        let bad = IndicatorRef::new(IndicatorSpec::Macd {
            fast_period: 26,
            slow_period: 12,
            signal_period: 9,
        });
        let cond = Condition::threshold(bad, ComparisonOperator::Gt, 0.0);
        assert!(cond.validate().is_err());
    }

    #[test]
    fn empty_group_is_invalid() {
        let group = ConditionGroup {
            id: Some("entry".into()),
            conditions: vec![],
            operator: LogicalOperator::Or,
        };
        let err = group.validate().unwrap_err();
        assert!(err.to_string().contains("entry"));
    }

    #[test]
    fn indicators_used_lists_both_sides() {
        let cond = Condition::indicators(sma(5), ComparisonOperator::Gt, sma(20));
        let used: Vec<IndicatorSpec> = cond.indicators_used().collect();
        assert_eq!(used, vec![sma(5).spec, sma(20).spec]);
    }

    #[test]
    fn display() {
        let group = ConditionGroup::all(vec![
            Condition::indicators(sma(5), ComparisonOperator::CrossUp, sma(20)),
            Condition::threshold(
                IndicatorRef::new(IndicatorSpec::Rsi { period: 14 }),
                ComparisonOperator::Lt,
                70.0,
            ),
        ]);
        assert_eq!(
            group.to_string(),
            "(SMA(5) crosses above SMA(20) AND RSI(14) < 70)"
        );
    }

    #[test]
    fn serialize_round_trip_keeps_camel_case() {
        let cond = Condition::indicators(sma(5), ComparisonOperator::CrossDown, sma(20));
        let json = serde_json::to_string(&cond).unwrap();
        assert!(json.contains("\"leftIndicator\""));
        assert!(json.contains("\"CROSS_DOWN\""));
        assert!(!json.contains("\"value\""));
    }
}
