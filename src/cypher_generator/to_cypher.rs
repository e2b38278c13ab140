use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cypher_ir::{CypherExpr, Operator, ReadOnlyQuery};
use crate::query_model::Value;

use super::errors::CypherGeneratorError;

/// One `{name, value}` pair backing a `$name` placeholder in the text.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct StatementParameter {
    pub name: String,
    pub value: Value,
}

/// Literal statement text plus its ordered parameter list.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GeneratedStatement {
    pub text: String,
    pub parameters: Vec<StatementParameter>,
}

/// Collects parameters in order of first appearance in the rendered text.
pub struct ParameterCollector<'a> {
    values: &'a HashMap<String, Value>,
    collected: Vec<StatementParameter>,
}

impl<'a> ParameterCollector<'a> {
    fn new(values: &'a HashMap<String, Value>) -> Self {
        ParameterCollector {
            values,
            collected: Vec::new(),
        }
    }

    fn record(&mut self, name: &str) -> Result<(), CypherGeneratorError> {
        if self.collected.iter().any(|p| p.name == name) {
            return Ok(());
        }
        let value = self
            .values
            .get(name)
            .cloned()
            .ok_or_else(|| CypherGeneratorError::MissingParameterValue(name.to_string()))?;
        self.collected.push(StatementParameter {
            name: name.to_string(),
            value,
        });
        Ok(())
    }
}

/// Render an IR node to statement text.
pub trait ToCypher {
    fn to_cypher(&self, params: &mut ParameterCollector) -> Result<String, CypherGeneratorError>;
}

/// Serialize a finished query into literal statement text plus parameters.
///
/// Deterministic by construction: every traversal follows `Vec` order, so
/// repeated calls on unmodified input yield byte-identical text. The
/// statement cache depends on this.
pub fn generate(
    query: &ReadOnlyQuery,
    parameter_values: &HashMap<String, Value>,
) -> Result<GeneratedStatement, CypherGeneratorError> {
    let mut params = ParameterCollector::new(parameter_values);
    let mut text = String::new();

    for (i, clause) in query.reading_clauses().iter().enumerate() {
        if clause.labels.is_empty() {
            return Err(CypherGeneratorError::EmptyPatternLabels(
                clause.alias.0.clone(),
            ));
        }
        if i > 0 {
            text.push(' ');
        }
        text.push_str(&format!(
            "MATCH ({}:{})",
            clause.alias,
            clause.labels.join(":")
        ));
    }

    let mut predicates = Vec::new();
    for clause in query.reading_clauses() {
        if let Some(predicate) = &clause.predicate {
            predicates.push(predicate.to_cypher(&mut params)?);
        }
    }
    if !predicates.is_empty() {
        text.push_str("\nWHERE ");
        text.push_str(&predicates.join(" AND "));
    }

    text.push_str(" RETURN ");
    if query.return_items().is_empty() {
        // Sentinel literal row marker; an empty RETURN clause is invalid.
        text.push('1');
    } else {
        let mut items = Vec::with_capacity(query.return_items().len());
        for item in query.return_items() {
            let mut rendered = item.expression.to_cypher(&mut params)?;
            if let Some(alias) = &item.alias {
                let same_name = item
                    .expression
                    .as_property_access()
                    .map(|access| &access.property == alias)
                    .unwrap_or(false);
                if !same_name {
                    rendered.push_str(&format!(" AS \"{}\"", alias));
                }
            }
            items.push(rendered);
        }
        text.push_str(&items.join(", "));
    }

    Ok(GeneratedStatement {
        text,
        parameters: params.collected,
    })
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Wrap nested operator applications so precedence never depends on the
/// target language's defaults.
fn render_operand(
    expr: &CypherExpr,
    params: &mut ParameterCollector,
) -> Result<String, CypherGeneratorError> {
    let rendered = expr.to_cypher(params)?;
    match expr {
        CypherExpr::OperatorApplication(_) | CypherExpr::Case(_) => Ok(format!("({})", rendered)),
        _ => Ok(rendered),
    }
}

fn binary_symbol(operator: Operator) -> Option<&'static str> {
    match operator {
        Operator::Addition => Some("+"),
        Operator::Subtraction => Some("-"),
        Operator::Multiplication => Some("*"),
        Operator::Division => Some("/"),
        Operator::ModuloDivision => Some("%"),
        Operator::Equal => Some("="),
        Operator::NotEqual => Some("<>"),
        Operator::LessThan => Some("<"),
        Operator::GreaterThan => Some(">"),
        Operator::LessThanEqual => Some("<="),
        Operator::GreaterThanEqual => Some(">="),
        Operator::And => Some("AND"),
        Operator::Or => Some("OR"),
        Operator::StartsWith => Some("STARTS WITH"),
        Operator::EndsWith => Some("ENDS WITH"),
        Operator::Contains => Some("CONTAINS"),
        _ => None,
    }
}

impl ToCypher for CypherExpr {
    fn to_cypher(&self, params: &mut ParameterCollector) -> Result<String, CypherGeneratorError> {
        match self {
            CypherExpr::Literal(value) => Ok(match value {
                Value::Integer(i) => i.to_string(),
                Value::Float(f) => f.to_string(),
                Value::Boolean(b) => b.to_string(),
                Value::String(s) => format!("'{}'", escape_string(s)),
                Value::Null => "NULL".to_string(),
            }),
            CypherExpr::Parameter(name) => {
                params.record(name)?;
                Ok(format!("${}", name))
            }
            CypherExpr::PropertyAccess(access) => {
                Ok(format!("\"{}\".\"{}\"", access.alias, access.property))
            }
            CypherExpr::OperatorApplication(op) => {
                if let Some(symbol) = binary_symbol(op.operator) {
                    if op.operands.len() != 2 {
                        return Err(CypherGeneratorError::OperandCountMismatch(
                            format!("{:?}", op.operator),
                            op.operands.len(),
                        ));
                    }
                    let left = render_operand(&op.operands[0], params)?;
                    let right = render_operand(&op.operands[1], params)?;
                    return Ok(format!("{} {} {}", left, symbol, right));
                }
                if op.operands.len() != 1 {
                    return Err(CypherGeneratorError::OperandCountMismatch(
                        format!("{:?}", op.operator),
                        op.operands.len(),
                    ));
                }
                let operand = render_operand(&op.operands[0], params)?;
                Ok(match op.operator {
                    Operator::Not => format!("NOT {}", operand),
                    Operator::Negate => format!("-{}", operand),
                    Operator::IsNull => format!("{} IS NULL", operand),
                    Operator::IsNotNull => format!("{} IS NOT NULL", operand),
                    // Binary operators are handled above.
                    other => {
                        return Err(CypherGeneratorError::OperandCountMismatch(
                            format!("{:?}", other),
                            1,
                        ))
                    }
                })
            }
            CypherExpr::Case(case) => {
                let mut text = String::from("CASE");
                for (when, then) in &case.when_then {
                    text.push_str(&format!(
                        " WHEN {} THEN {}",
                        when.to_cypher(params)?,
                        then.to_cypher(params)?
                    ));
                }
                if let Some(else_expr) = &case.else_expr {
                    text.push_str(&format!(" ELSE {}", else_expr.to_cypher(params)?));
                }
                text.push_str(" END");
                Ok(text)
            }
            // The null-guard marker is a read-side concern; rendering is
            // transparent.
            CypherExpr::NullGuarded(inner) => inner.to_cypher(params),
        }
    }
}
