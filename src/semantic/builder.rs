use std::cell::{Cell, RefCell};

use super::nodes::*;
use crate::types::{PolyType, Tvar};

/// Constructs annotated semantic graphs.
///
/// Stands in for the parser/annotator front end: every node it creates gets a
/// unique [`NodeId`] and a fresh type variable. Methods take `&self` so calls
/// nest the way the expressions they build do.
#[derive(Debug, Default)]
pub struct Builder {
    next_id: Cell<u32>,
    next_var: Cell<u64>,
    loc: RefCell<SourceLocation>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate subsequently created nodes at `line:column`.
    pub fn at(&self, line: u32, column: u32) -> &Self {
        let pos = Position::new(line, column);
        let mut loc = self.loc.borrow_mut();
        loc.start = pos;
        loc.end = pos;
        self
    }

    pub fn in_file(&self, name: &str) -> &Self {
        self.loc.borrow_mut().file = Some(name.to_string());
        self
    }

    /// The most recently assigned type variable.
    pub fn last_var(&self) -> Option<Tvar> {
        self.next_var.get().checked_sub(1).map(Tvar)
    }

    fn meta(&self) -> Meta {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let var = self.next_var.get();
        self.next_var.set(var + 1);
        Meta {
            id: NodeId(id),
            var: Tvar(var),
            loc: self.loc.borrow().clone(),
        }
    }

    pub fn package(&self, body: Vec<Statement>) -> Package {
        self.package_with_imports(Vec::new(), body)
    }

    pub fn package_with_imports(&self, imports: Vec<Import>, body: Vec<Statement>) -> Package {
        Package {
            name: "main".to_string(),
            files: vec![File {
                name: self.loc.borrow().file.clone().unwrap_or_default(),
                imports,
                body,
            }],
        }
    }

    pub fn import(&self, path: &str) -> Import {
        Import {
            meta: self.meta(),
            alias: None,
            path: path.to_string(),
        }
    }

    pub fn import_as(&self, alias: &str, path: &str) -> Import {
        Import {
            alias: Some(alias.to_string()),
            ..self.import(path)
        }
    }

    // ---- statements ----

    pub fn variable(&self, name: &str, init: Expression) -> Statement {
        Statement::Variable(Box::new(VariableAssignment {
            meta: self.meta(),
            name: name.to_string(),
            init,
        }))
    }

    pub fn expr_stmt(&self, expression: Expression) -> Statement {
        Statement::Expr(ExprStatement {
            meta: self.meta(),
            expression,
        })
    }

    pub fn builtin(&self, name: &str, ty: PolyType) -> Statement {
        Statement::Builtin(BuiltinStatement {
            meta: self.meta(),
            name: name.to_string(),
            ty,
        })
    }

    pub fn ret(&self, argument: Expression) -> Statement {
        Statement::Return(ReturnStatement {
            meta: self.meta(),
            argument,
        })
    }

    // ---- literals ----

    fn literal(&self, value: LiteralValue) -> Expression {
        Expression::Literal(Literal {
            meta: self.meta(),
            value,
        })
    }

    pub fn int(&self, v: i64) -> Expression {
        self.literal(LiteralValue::Integer(v))
    }

    pub fn uint(&self, v: u64) -> Expression {
        self.literal(LiteralValue::UnsignedInteger(v))
    }

    pub fn float(&self, v: f64) -> Expression {
        self.literal(LiteralValue::Float(v))
    }

    pub fn string(&self, v: &str) -> Expression {
        self.literal(LiteralValue::String(v.to_string()))
    }

    pub fn bool(&self, v: bool) -> Expression {
        self.literal(LiteralValue::Boolean(v))
    }

    pub fn time(&self, nanos: i64) -> Expression {
        self.literal(LiteralValue::DateTime(nanos))
    }

    pub fn duration(&self, nanos: i64) -> Expression {
        self.literal(LiteralValue::Duration(nanos))
    }

    pub fn regexp(&self, pattern: &str) -> Expression {
        self.literal(LiteralValue::Regexp(pattern.to_string()))
    }

    // ---- expressions ----

    pub fn ident(&self, name: &str) -> Expression {
        Expression::Identifier(self.identifier(name))
    }

    fn identifier(&self, name: &str) -> Identifier {
        Identifier {
            meta: self.meta(),
            name: name.to_string(),
        }
    }

    pub fn array(&self, elements: Vec<Expression>) -> Expression {
        Expression::Array(Box::new(ArrayExpr {
            meta: self.meta(),
            elements,
        }))
    }

    pub fn param(&self, key: &str) -> FunctionParameter {
        FunctionParameter {
            meta: self.meta(),
            key: key.to_string(),
            default: None,
            is_pipe: false,
        }
    }

    pub fn param_default(&self, key: &str, default: Expression) -> FunctionParameter {
        FunctionParameter {
            default: Some(default),
            ..self.param(key)
        }
    }

    pub fn pipe_param(&self, key: &str) -> FunctionParameter {
        FunctionParameter {
            is_pipe: true,
            ..self.param(key)
        }
    }

    pub fn function(&self, params: Vec<FunctionParameter>, body: Expression) -> Expression {
        Expression::Function(Box::new(FunctionExpr {
            meta: self.meta(),
            params,
            body: FunctionBody::Expr(body),
        }))
    }

    pub fn function_block(&self, params: Vec<FunctionParameter>, body: Vec<Statement>) -> Expression {
        let block = Block {
            meta: self.meta(),
            body,
        };
        Expression::Function(Box::new(FunctionExpr {
            meta: self.meta(),
            params,
            body: FunctionBody::Block(block),
        }))
    }

    pub fn logical(&self, operator: LogicalOperator, left: Expression, right: Expression) -> Expression {
        Expression::Logical(Box::new(LogicalExpr {
            meta: self.meta(),
            operator,
            left,
            right,
        }))
    }

    pub fn and(&self, left: Expression, right: Expression) -> Expression {
        self.logical(LogicalOperator::And, left, right)
    }

    pub fn or(&self, left: Expression, right: Expression) -> Expression {
        self.logical(LogicalOperator::Or, left, right)
    }

    pub fn property(&self, key: &str, value: Expression) -> Property {
        Property {
            meta: self.meta(),
            key: key.to_string(),
            value,
        }
    }

    pub fn object(&self, properties: Vec<Property>) -> Expression {
        Expression::Object(Box::new(ObjectExpr {
            meta: self.meta(),
            with: None,
            properties,
        }))
    }

    pub fn object_with(&self, base: &str, properties: Vec<Property>) -> Expression {
        Expression::Object(Box::new(ObjectExpr {
            with: Some(self.identifier(base)),
            meta: self.meta(),
            properties,
        }))
    }

    pub fn member(&self, object: Expression, property: &str) -> Expression {
        Expression::Member(Box::new(MemberExpr {
            meta: self.meta(),
            object,
            property: property.to_string(),
        }))
    }

    pub fn index(&self, array: Expression, index: Expression) -> Expression {
        Expression::Index(Box::new(IndexExpr {
            meta: self.meta(),
            array,
            index,
        }))
    }

    pub fn binary(&self, operator: Operator, left: Expression, right: Expression) -> Expression {
        Expression::Binary(Box::new(BinaryExpr {
            meta: self.meta(),
            operator,
            left,
            right,
        }))
    }

    pub fn unary(&self, operator: UnaryOperator, argument: Expression) -> Expression {
        Expression::Unary(Box::new(UnaryExpr {
            meta: self.meta(),
            operator,
            argument,
        }))
    }

    pub fn call(&self, callee: Expression, arguments: Vec<Property>) -> Expression {
        Expression::Call(Box::new(CallExpr {
            meta: self.meta(),
            callee,
            arguments,
            pipe: None,
        }))
    }

    /// `pipe |> callee(arguments)`
    pub fn pipe_call(&self, pipe: Expression, callee: Expression, arguments: Vec<Property>) -> Expression {
        Expression::Call(Box::new(CallExpr {
            meta: self.meta(),
            callee,
            arguments,
            pipe: Some(pipe),
        }))
    }

    pub fn conditional(&self, test: Expression, consequent: Expression, alternate: Expression) -> Expression {
        Expression::Conditional(Box::new(ConditionalExpr {
            meta: self.meta(),
            test,
            consequent,
            alternate,
        }))
    }

    pub fn string_expr(&self, parts: Vec<StringPart>) -> Expression {
        Expression::StringExpr(Box::new(StringExpr {
            meta: self.meta(),
            parts,
        }))
    }

    pub fn text(&self, text: &str) -> StringPart {
        StringPart::Text(text.to_string())
    }

    pub fn interpolate(&self, expr: Expression) -> StringPart {
        StringPart::Interpolated(expr)
    }
}
