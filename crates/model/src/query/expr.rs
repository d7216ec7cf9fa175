use super::method::Method;
use crate::core::{identifiers::EntityType, value::Value};
use std::{fmt, sync::Arc};
use xxhash_rust::xxh3::xxh3_64;

pub type ExprRef = Arc<Expr>;

/// Node of a query expression tree.
///
/// Nodes are immutable and shared. A rewrite that leaves a subtree alone
/// hands back the same `Arc`, so callers detect "no change" with
/// [`Arc::ptr_eq`].
#[derive(Debug, Clone)]
pub enum Expr {
    Constant(Constant),
    Variable(Variable),
    /// Reference to a named entry of the query's parameter table.
    Parameter(String),
    Member {
        target: ExprRef,
        member: String,
    },
    Unary {
        op: UnaryOp,
        operand: ExprRef,
    },
    Binary {
        left: ExprRef,
        op: BinaryOp,
        right: ExprRef,
    },
    Lambda(Lambda),
    /// Marks a lambda passed as data to a query operator.
    Quote(ExprRef),
    Call(MethodCall),
    /// The full collection of one entity type.
    QueryRoot(EntityType),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    // Comparison
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    // Logical
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::LessThan => "<",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Negate,
}

/// A lambda-bound row variable. Two variables are the same binding when
/// both name and entity type match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: Arc<str>,
    pub entity: EntityType,
}

impl Variable {
    pub fn new(name: impl Into<String>, entity: EntityType) -> Self {
        Self {
            name: Arc::from(name.into()),
            entity,
        }
    }

    pub fn expr(&self) -> ExprRef {
        Arc::new(Expr::Variable(self.clone()))
    }

    /// `self.<field>`
    pub fn field(&self, field: &str) -> ExprRef {
        Expr::member(self.expr(), field)
    }
}

#[derive(Debug, Clone)]
pub struct Lambda {
    pub parameters: Vec<Variable>,
    pub body: ExprRef,
}

impl Lambda {
    pub fn new(parameters: Vec<Variable>, body: ExprRef) -> Self {
        Self { parameters, body }
    }

    /// Single-parameter boolean lambda over one row variable.
    pub fn predicate(parameter: Variable, body: ExprRef) -> Self {
        Self::new(vec![parameter], body)
    }

    /// The row variable of a single-parameter lambda.
    pub fn bound_variable(&self) -> Option<&Variable> {
        match self.parameters.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn binds(&self, variable: &Variable) -> bool {
        self.parameters.iter().any(|p| p == variable)
    }

    pub fn into_expr(self) -> ExprRef {
        Arc::new(Expr::Lambda(self))
    }
}

#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: Method,
    /// Element type of the query the call produces or consumes.
    pub element: EntityType,
    pub args: Vec<ExprRef>,
}

impl MethodCall {
    pub fn with_args(&self, args: Vec<ExprRef>) -> Self {
        Self {
            method: self.method.clone(),
            element: self.element.clone(),
            args,
        }
    }
}

/// A value produced on demand from state captured by the caller, such as
/// the current request's tenant.
#[derive(Clone)]
pub struct Captured {
    label: Arc<str>,
    thunk: Arc<dyn Fn() -> Value + Send + Sync>,
}

impl Captured {
    pub fn new<F>(label: impl Into<String>, thunk: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            label: Arc::from(label.into()),
            thunk: Arc::new(thunk),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn evaluate(&self) -> Value {
        (self.thunk)()
    }
}

impl fmt::Debug for Captured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Captured")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Constant {
    Value(Value),
    Captured(Captured),
}

impl Expr {
    pub fn value(value: impl Into<Value>) -> ExprRef {
        Arc::new(Expr::Constant(Constant::Value(value.into())))
    }

    pub fn captured(captured: Captured) -> ExprRef {
        Arc::new(Expr::Constant(Constant::Captured(captured)))
    }

    pub fn parameter(name: impl Into<String>) -> ExprRef {
        Arc::new(Expr::Parameter(name.into()))
    }

    pub fn member(target: ExprRef, member: impl Into<String>) -> ExprRef {
        Arc::new(Expr::Member {
            target,
            member: member.into(),
        })
    }

    pub fn unary(op: UnaryOp, operand: ExprRef) -> ExprRef {
        Arc::new(Expr::Unary { op, operand })
    }

    pub fn not(operand: ExprRef) -> ExprRef {
        Self::unary(UnaryOp::Not, operand)
    }

    pub fn binary(left: ExprRef, op: BinaryOp, right: ExprRef) -> ExprRef {
        Arc::new(Expr::Binary { left, op, right })
    }

    pub fn and(left: ExprRef, right: ExprRef) -> ExprRef {
        Self::binary(left, BinaryOp::And, right)
    }

    pub fn eq(left: ExprRef, right: ExprRef) -> ExprRef {
        Self::binary(left, BinaryOp::Equal, right)
    }

    pub fn quote(inner: ExprRef) -> ExprRef {
        Arc::new(Expr::Quote(inner))
    }

    pub fn call(method: Method, element: EntityType, args: Vec<ExprRef>) -> ExprRef {
        Arc::new(Expr::Call(MethodCall {
            method,
            element,
            args,
        }))
    }

    pub fn root(entity: EntityType) -> ExprRef {
        Arc::new(Expr::QueryRoot(entity))
    }

    /// Stable hash of the canonical rendering. Parameter names take part in
    /// the hash, parameter values do not.
    pub fn fingerprint(&self) -> u64 {
        xxh3_64(self.to_string().as_bytes())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(Constant::Value(value)) => write!(f, "{value}"),
            Expr::Constant(Constant::Captured(captured)) => {
                write!(f, "captured({})", captured.label())
            }
            Expr::Variable(variable) => f.write_str(&variable.name),
            Expr::Parameter(name) => write!(f, "@{name}"),
            Expr::Member { target, member } => write!(f, "{target}.{member}"),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "!({operand})"),
                UnaryOp::Negate => write!(f, "-({operand})"),
            },
            Expr::Binary { left, op, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Lambda(lambda) => match lambda.parameters.as_slice() {
                [only] => write!(f, "{} => {}", only.name, lambda.body),
                params => {
                    let names = params
                        .iter()
                        .map(|p| p.name.as_ref())
                        .collect::<Vec<_>>()
                        .join(", ");
                    write!(f, "({names}) => {}", lambda.body)
                }
            },
            Expr::Quote(inner) => write!(f, "{inner}"),
            Expr::Call(call) => {
                let (source, rest) = match call.args.split_first() {
                    Some((source, rest)) => (Some(source), rest),
                    None => (None, &[][..]),
                };
                if let Some(source) = source {
                    write!(f, "{source}.")?;
                }
                let rest = rest
                    .iter()
                    .map(|arg| arg.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}({rest})", call.method)
            }
            Expr::QueryRoot(entity) => write!(f, "Query<{entity}>"),
        }
    }
}
