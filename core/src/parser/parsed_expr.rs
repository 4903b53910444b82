use core::fmt;

use crate::parser::syntax::AnnotatedSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    /// `/`. Integer-only language, so this floors like `//`.
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Invert,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    Int(i32),
    Bool(bool),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprehensionKind {
    /// `[x for x in ...]`
    List,
    /// `(x for x in ...)` or a bare generator call argument.
    Generator,
}

#[derive(Debug, PartialEq)]
pub enum Expr<'a> {
    Literal(Literal),
    Ident(&'a str),
    Unary {
        op: UnaryOp,
        expr: &'a Expr<'a>,
    },
    Binary {
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Boolean {
        op: BoolOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    /// `left op0 r0 op1 r1 ...`, kept flat so chains can share the middle operands.
    Comparison {
        left: &'a Expr<'a>,
        rest: &'a [(ComparisonOp, &'a Expr<'a>)],
    },
    If {
        cond: &'a Expr<'a>,
        then_branch: &'a Expr<'a>,
        else_branch: &'a Expr<'a>,
    },
    List(&'a [&'a Expr<'a>]),
    Dict(&'a [(&'a Expr<'a>, &'a Expr<'a>)]),
    Comprehension {
        kind: ComprehensionKind,
        element: &'a Expr<'a>,
        var: &'a str,
        iter: &'a Expr<'a>,
        filter: Option<&'a Expr<'a>>,
    },
    Call {
        callable: &'a Expr<'a>,
        args: &'a [Argument<'a>],
    },
    Attribute {
        value: &'a Expr<'a>,
        attr: &'a str,
    },
    Grouped(&'a Expr<'a>),
}

#[derive(Debug, PartialEq)]
pub struct Argument<'a> {
    /// Keyword name for `name=value` arguments.
    pub name: Option<&'a str>,
    pub value: &'a Expr<'a>,
}

impl<'a> Expr<'a> {
    /// Strips any number of enclosing parentheses.
    pub fn ungrouped(&'a self) -> &'a Expr<'a> {
        let mut expr = self;
        while let Expr::Grouped(inner) = *expr {
            expr = inner;
        }
        expr
    }

    pub fn for_each_child(&'a self, mut f: impl FnMut(&'a Expr<'a>)) {
        match *self {
            Expr::Literal(_) | Expr::Ident(_) => {}
            Expr::Unary { expr, .. } => f(expr),
            Expr::Binary { left, right, .. } | Expr::Boolean { left, right, .. } => {
                f(left);
                f(right);
            }
            Expr::Comparison { left, rest } => {
                f(left);
                for &(_, operand) in rest {
                    f(operand);
                }
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                f(then_branch);
                f(cond);
                f(else_branch);
            }
            Expr::List(items) => {
                for &item in items {
                    f(item);
                }
            }
            Expr::Dict(entries) => {
                for &(key, value) in entries {
                    f(key);
                    f(value);
                }
            }
            Expr::Comprehension {
                element,
                iter,
                filter,
                ..
            } => {
                f(element);
                f(iter);
                if let Some(filter) = filter {
                    f(filter);
                }
            }
            Expr::Call { callable, args } => {
                f(callable);
                for arg in args {
                    f(arg.value);
                }
            }
            Expr::Attribute { value, .. } => f(value),
            Expr::Grouped(inner) => f(inner),
        }
    }
}

#[derive(Debug)]
pub struct ParsedExpr<'a> {
    pub expr: &'a Expr<'a>,
    pub ann: &'a AnnotatedSource<'a, Expr<'a>>,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        })
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::Neq => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
            ComparisonOp::In => "in",
            ComparisonOp::NotIn => "not in",
            ComparisonOp::Is => "is",
            ComparisonOp::IsNot => "is not",
        })
    }
}
