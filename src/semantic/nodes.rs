//! Annotated semantic graph.
//!
//! Every node carries a [`Meta`]: a unique node id, the fresh type variable
//! the annotator assigned to it, and its source location.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{PolyType, Tvar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: Option<String>,
    pub start: Position,
    pub end: Position,
}

impl SourceLocation {
    pub fn new(start: Position, end: Position) -> Self {
        Self {
            file: None,
            start,
            end,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:", file)?;
        }
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub id: NodeId,
    pub var: Tvar,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub files: Vec<File>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    pub imports: Vec<Import>,
    pub body: Vec<Statement>,
}

/// `import "path"` or `import alias "path"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub meta: Meta,
    pub alias: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// `name = init`
    Variable(Box<VariableAssignment>),
    /// A bare expression.
    Expr(ExprStatement),
    /// `builtin name : type`
    Builtin(BuiltinStatement),
    /// `return argument`, only inside function blocks.
    Return(ReturnStatement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableAssignment {
    pub meta: Meta,
    pub name: String,
    pub init: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprStatement {
    pub meta: Meta,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltinStatement {
    pub meta: Meta,
    pub name: String,
    pub ty: PolyType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatement {
    pub meta: Meta,
    pub argument: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Identifier(Identifier),
    Array(Box<ArrayExpr>),
    Function(Box<FunctionExpr>),
    Logical(Box<LogicalExpr>),
    Object(Box<ObjectExpr>),
    Member(Box<MemberExpr>),
    Index(Box<IndexExpr>),
    Binary(Box<BinaryExpr>),
    Unary(Box<UnaryExpr>),
    Call(Box<CallExpr>),
    Conditional(Box<ConditionalExpr>),
    StringExpr(Box<StringExpr>),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub meta: Meta,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayExpr {
    pub meta: Meta,
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExpr {
    pub meta: Meta,
    pub params: Vec<FunctionParameter>,
    pub body: FunctionBody,
}

impl FunctionExpr {
    pub fn pipe(&self) -> Option<&FunctionParameter> {
        self.params.iter().find(|p| p.is_pipe)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParameter {
    pub meta: Meta,
    pub key: String,
    pub default: Option<Expression>,
    pub is_pipe: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionBody {
    Expr(Expression),
    /// Assignments and expression statements ending in a return.
    Block(Block),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub meta: Meta,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalExpr {
    pub meta: Meta,
    pub operator: LogicalOperator,
    pub left: Expression,
    pub right: Expression,
}

/// `{a: 1, b: x}` or `{r with a: 1}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectExpr {
    pub meta: Meta,
    pub with: Option<Identifier>,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub meta: Meta,
    pub key: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberExpr {
    pub meta: Meta,
    pub object: Expression,
    pub property: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexExpr {
    pub meta: Meta,
    pub array: Expression,
    pub index: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
    RegexMatch,
    NotRegexMatch,
}

impl Operator {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Operator::Add
                | Operator::Sub
                | Operator::Mul
                | Operator::Div
                | Operator::Mod
                | Operator::Pow
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, Operator::Eq | Operator::NotEq)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Pow => "^",
            Operator::Less => "<",
            Operator::LessEq => "<=",
            Operator::Greater => ">",
            Operator::GreaterEq => ">=",
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::RegexMatch => "=~",
            Operator::NotRegexMatch => "!~",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub meta: Meta,
    pub operator: Operator,
    pub left: Expression,
    pub right: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Neg,
    Pos,
    Exists,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub meta: Meta,
    pub operator: UnaryOperator,
    pub argument: Expression,
}

/// `callee(a: x, b: y)`, optionally receiving a piped argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub meta: Meta,
    pub callee: Expression,
    pub arguments: Vec<Property>,
    pub pipe: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalExpr {
    pub meta: Meta,
    pub test: Expression,
    pub consequent: Expression,
    pub alternate: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringExpr {
    pub meta: Meta,
    pub parts: Vec<StringPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StringPart {
    Text(String),
    Interpolated(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub meta: Meta,
    pub value: LiteralValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Integer(i64),
    UnsignedInteger(u64),
    Float(f64),
    String(String),
    Boolean(bool),
    /// Nanoseconds since the Unix epoch.
    DateTime(i64),
    /// Nanoseconds.
    Duration(i64),
    Regexp(String),
}

impl Expression {
    pub fn meta(&self) -> &Meta {
        match self {
            Expression::Identifier(e) => &e.meta,
            Expression::Array(e) => &e.meta,
            Expression::Function(e) => &e.meta,
            Expression::Logical(e) => &e.meta,
            Expression::Object(e) => &e.meta,
            Expression::Member(e) => &e.meta,
            Expression::Index(e) => &e.meta,
            Expression::Binary(e) => &e.meta,
            Expression::Unary(e) => &e.meta,
            Expression::Call(e) => &e.meta,
            Expression::Conditional(e) => &e.meta,
            Expression::StringExpr(e) => &e.meta,
            Expression::Literal(e) => &e.meta,
        }
    }

    pub fn id(&self) -> NodeId {
        self.meta().id
    }

    pub fn as_function(&self) -> Option<&FunctionExpr> {
        match self {
            Expression::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn var(&self) -> Tvar {
        self.meta().var
    }

    pub fn loc(&self) -> &SourceLocation {
        &self.meta().loc
    }
}

impl Package {
    /// Read a graph produced by an external annotator.
    pub fn from_json(json: &str) -> crate::error::Result<Package> {
        serde_json::from_str(json).map_err(|e| {
            crate::error::Error::internal(format!("invalid semantic graph: {}", e))
        })
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        serde_json::to_string(self).map_err(|e| {
            crate::error::Error::internal(format!("failed to serialize semantic graph: {}", e))
        })
    }

    /// The function bound to `name` by a top-level assignment.
    pub fn find_function(&self, name: &str) -> Option<&FunctionExpr> {
        self.files
            .iter()
            .flat_map(|file| file.body.iter())
            .find_map(|stmt| match stmt {
                Statement::Variable(v) if v.name == name => v.init.as_function(),
                _ => None,
            })
    }
}

impl Statement {
    pub fn meta(&self) -> &Meta {
        match self {
            Statement::Variable(s) => &s.meta,
            Statement::Expr(s) => &s.meta,
            Statement::Builtin(s) => &s.meta,
            Statement::Return(s) => &s.meta,
        }
    }
}
