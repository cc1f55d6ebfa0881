//! Statement and expression emission: one CUDA C fragment per AST node.

use crate::ast::{Expression, Statement};
use crate::classify::IdentifierClassifier;
use crate::error::TranspileError;
use crate::options::KernelOptions;
use crate::symbols::{binary_symbol, unary_symbol};

/// Emits kernel text for function body nodes, classifying names as it goes.
pub struct Emitter<'a> {
    options: &'a KernelOptions,
    classifier: IdentifierClassifier<'a>,
}

impl<'a> Emitter<'a> {
    pub fn new(classifier: IdentifierClassifier<'a>, options: &'a KernelOptions) -> Self {
        Emitter { options, classifier }
    }

    /// Emit one statement. `None` means the statement contributes no line.
    pub fn emit_statement(&mut self, stmt: &Statement) -> Result<Option<String>, TranspileError> {
        match stmt {
            Statement::Assign { target, value } => {
                let target = self.emit_target(target)?;
                let value = self.emit_expression(value)?;
                Ok(Some(format!("{} = {};", target, value)))
            }
            Statement::AugAssign { target, op, value } => {
                let target = self.emit_target(target)?;
                let symbol = binary_symbol(*op)?;
                let value = self.emit_expression(value)?;
                Ok(Some(format!("{} {}= {};", target, symbol, value)))
            }
            Statement::Return(Some(value)) => {
                // Kernels return void; the value goes to the result buffer
                let value = self.emit_expression(value)?;
                Ok(Some(format!(
                    "{}[{}] = {};",
                    self.options.result_name, self.options.index_name, value
                )))
            }
            Statement::Return(None) => Err(TranspileError::unsupported_construct("return without a value")),
            Statement::Expr(Expression::Call { .. }) => {
                Err(TranspileError::unsupported_construct("function call"))
            }
            // Docstrings and other bare expressions
            Statement::Expr(_) => Ok(None),
            Statement::Pass
            | Statement::If { .. }
            | Statement::While { .. }
            | Statement::For { .. } => Err(TranspileError::unsupported_construct(stmt.kind())),
        }
    }

    fn emit_target(&mut self, target: &Expression) -> Result<String, TranspileError> {
        if !target.is_assignable() {
            return Err(TranspileError::unsupported_construct(format!(
                "assignment to {}",
                target.kind()
            )));
        }
        self.emit_expression(target)
    }

    pub fn emit_expression(&mut self, expr: &Expression) -> Result<String, TranspileError> {
        match expr {
            Expression::BinaryOp { left, op, right } => {
                let left = self.emit_expression(left)?;
                let symbol = binary_symbol(*op)?;
                let right = self.emit_expression(right)?;
                Ok(format!("({} {} {})", left, symbol, right))
            }
            Expression::UnaryOp { op, expr } => {
                let symbol = unary_symbol(*op)?;
                let expr = self.emit_expression(expr)?;
                Ok(format!("({}{})", symbol, expr))
            }
            Expression::Name(name) => self.classifier.visit_name(name),
            Expression::Number(literal) => Ok(literal.to_string()),
            Expression::Subscript { base, index } => match base.as_ref() {
                // Raw access at the given offset: the base is not thread-indexed
                // and is not classified.
                Expression::Name(name) => {
                    let index = self.emit_expression(index)?;
                    Ok(format!("{}[{}]", name, index))
                }
                other => Err(TranspileError::unsupported_construct(format!(
                    "subscript of {}",
                    other.kind()
                ))),
            },
            Expression::Attribute { .. }
            | Expression::Call { .. }
            | Expression::Str(_)
            | Expression::Bool(_)
            | Expression::NoneLiteral => Err(TranspileError::unsupported_construct(expr.kind())),
        }
    }

    /// Locals discovered so far, in first-occurrence order
    pub fn locals(&self) -> &[String] {
        self.classifier.locals()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, Literal, UnaryOperator};

    fn emit_with<T>(params: &[&str], f: impl FnOnce(&mut Emitter) -> T) -> T {
        let options = KernelOptions::default();
        let classifier = IdentifierClassifier::new(params.iter().copied(), &options).unwrap();
        let mut emitter = Emitter::new(classifier, &options);
        f(&mut emitter)
    }

    #[test]
    fn test_binary_op_fully_parenthesized() {
        let expr = Expression::binary(
            Expression::binary(Expression::name("a"), BinaryOperator::Add, Expression::name("key")),
            BinaryOperator::Mod,
            Expression::int(26),
        );
        let text = emit_with(&["a", "key"], |e| e.emit_expression(&expr).unwrap());
        assert_eq!(text, "((a[kernel_index] + key[kernel_index]) % 26)");
    }

    #[test]
    fn test_return_writes_result_buffer() {
        let stmt = Statement::Return(Some(Expression::name("a")));
        let line = emit_with(&["a"], |e| e.emit_statement(&stmt).unwrap());
        assert_eq!(line.as_deref(), Some("kernel_result[kernel_index] = a[kernel_index];"));
    }

    #[test]
    fn test_aug_assign_on_parameter() {
        let stmt = Statement::AugAssign {
            target: Expression::name("d"),
            op: BinaryOperator::BitOr,
            value: Expression::int(0x77777777),
        };
        let line = emit_with(&["d"], |e| e.emit_statement(&stmt).unwrap());
        assert_eq!(line.as_deref(), Some("d[kernel_index] |= 2004318071;"));
    }

    #[test]
    fn test_assign_target_becomes_local() {
        let stmt = Statement::Assign {
            target: Expression::name("unused"),
            value: Expression::Number(Literal::Float(0.5)),
        };
        emit_with(&["a"], |e| {
            assert_eq!(e.emit_statement(&stmt).unwrap().as_deref(), Some("unused = 0.5;"));
            assert_eq!(e.locals(), ["unused".to_string()]);
        });
    }

    #[test]
    fn test_subscript_is_raw_access() {
        let expr = Expression::subscript(Expression::name("b"), Expression::name("i"));
        emit_with(&["b"], |e| {
            assert_eq!(e.emit_expression(&expr).unwrap(), "b[i]");
            // the index is an ordinary expression, the base is not classified
            assert_eq!(e.locals(), ["i".to_string()]);
        });

        let expr = Expression::subscript(Expression::name("scratch"), Expression::int(1));
        emit_with(&[], |e| {
            assert_eq!(e.emit_expression(&expr).unwrap(), "scratch[1]");
            assert!(e.locals().is_empty());
        });
    }

    #[test]
    fn test_non_assignable_target_rejected() {
        let stmt = Statement::Assign {
            target: Expression::binary(Expression::name("a"), BinaryOperator::Add, Expression::int(1)),
            value: Expression::int(2),
        };
        let err = emit_with(&["a"], |e| e.emit_statement(&stmt).unwrap_err());
        assert_eq!(err, TranspileError::unsupported_construct("assignment to binary operation"));

        let stmt = Statement::AugAssign {
            target: Expression::int(3),
            op: BinaryOperator::Add,
            value: Expression::int(1),
        };
        let err = emit_with(&[], |e| e.emit_statement(&stmt).unwrap_err());
        assert_eq!(err, TranspileError::unsupported_construct("assignment to number"));
    }

    #[test]
    fn test_docstring_is_elided() {
        let stmt = Statement::Expr(Expression::Str("doc".to_string()));
        assert_eq!(emit_with(&[], |e| e.emit_statement(&stmt).unwrap()), None);
    }

    #[test]
    fn test_unsupported_nodes() {
        let call = Expression::Call {
            func: Box::new(Expression::name("abs")),
            args: vec![Expression::name("a")],
        };
        let err = emit_with(&["a"], |e| e.emit_statement(&Statement::Expr(call.clone())).unwrap_err());
        assert_eq!(err, TranspileError::unsupported_construct("function call"));

        let err = emit_with(&["a"], |e| e.emit_expression(&call).unwrap_err());
        assert!(matches!(err, TranspileError::UnsupportedConstruct { .. }));

        let err = emit_with(&[], |e| e.emit_statement(&Statement::Pass).unwrap_err());
        assert_eq!(err, TranspileError::unsupported_construct("pass statement"));

        let neg = Expression::UnaryOp {
            op: UnaryOperator::Neg,
            expr: Box::new(Expression::name("a")),
        };
        let err = emit_with(&["a"], |e| e.emit_expression(&neg).unwrap_err());
        assert_eq!(err, TranspileError::UnsupportedOperator { op: "-".to_string() });
    }
}
