use ledgermash_common::EvalError;
use ledgermash_parse::{ASTNode, ASTNodeType, FieldRef};
use rustc_hash::FxHashMap;

/// Resolved values for the references of one record.
pub type SymbolTable = FxHashMap<FieldRef, f64>;

/// Folds a formula tree over resolved reference values.
pub struct Interpreter<'a> {
    symbols: &'a SymbolTable,
}

impl<'a> Interpreter<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self { symbols }
    }

    /* ===================  public  =================== */
    pub fn evaluate_ast(&self, node: &ASTNode) -> Result<f64, EvalError> {
        let v = self.evaluate_node(node)?;
        sanitize_numeric(v)
    }

    fn evaluate_node(&self, node: &ASTNode) -> Result<f64, EvalError> {
        match &node.node_type {
            ASTNodeType::Literal(n) => Ok(*n),
            ASTNodeType::Reference(r) => self.eval_reference(r),
            ASTNodeType::UnaryOp { op, expr } => self.eval_unary(op, expr),
            ASTNodeType::BinaryOp { op, left, right } => self.eval_binary(op, left, right),
        }
    }

    /* ===================  reference  =================== */
    fn eval_reference(&self, r: &FieldRef) -> Result<f64, EvalError> {
        // Unknown references degrade to zero like unresolved fields.
        Ok(self.symbols.get(r).copied().unwrap_or(0.0))
    }

    /* ===================  unary ops  =================== */
    fn eval_unary(&self, op: &str, expr: &ASTNode) -> Result<f64, EvalError> {
        let v = self.evaluate_node(expr)?;
        match op {
            "+" => Ok(v),
            "-" => Ok(-v),
            _ => Err(EvalError::new_value().with_message(format!("Unary op '{op}'"))),
        }
    }

    /* ===================  binary ops  =================== */
    fn eval_binary(&self, op: &str, left: &ASTNode, right: &ASTNode) -> Result<f64, EvalError> {
        let l = self.evaluate_node(left)?;
        let r = self.evaluate_node(right)?;
        match op {
            "+" => Ok(l + r),
            "-" => Ok(l - r),
            "*" => Ok(l * r),
            "/" => {
                if r == 0.0 {
                    return Err(EvalError::new_div());
                }
                Ok(l / r)
            }
            _ => Err(EvalError::new_value().with_message(format!("Binary op '{op}'"))),
        }
    }
}

/// Reject NaN and infinities.
fn sanitize_numeric(n: f64) -> Result<f64, EvalError> {
    if n.is_finite() {
        Ok(n)
    } else {
        Err(EvalError::new_num().with_message("result is not a finite number"))
    }
}
