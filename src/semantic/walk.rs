use std::collections::BTreeSet;

use super::nodes::*;
use crate::types::Tvar;

/// A borrowed reference to any node of the graph.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Import(&'a Import),
    Statement(&'a Statement),
    Block(&'a Block),
    Expression(&'a Expression),
    Parameter(&'a FunctionParameter),
    Property(&'a Property),
    /// The base identifier of `{r with ...}`.
    Identifier(&'a Identifier),
}

impl Node<'_> {
    pub fn meta(&self) -> &Meta {
        match self {
            Node::Import(n) => &n.meta,
            Node::Statement(n) => n.meta(),
            Node::Block(n) => &n.meta,
            Node::Expression(n) => n.meta(),
            Node::Parameter(n) => &n.meta,
            Node::Property(n) => &n.meta,
            Node::Identifier(n) => &n.meta,
        }
    }
}

/// Pre-order walk over every node of a package.
pub fn walk_package<'a>(pkg: &'a Package, f: &mut impl FnMut(Node<'a>)) {
    for file in &pkg.files {
        for import in &file.imports {
            f(Node::Import(import));
        }
        for stmt in &file.body {
            walk_statement(stmt, f);
        }
    }
}

pub fn walk_statement<'a>(stmt: &'a Statement, f: &mut impl FnMut(Node<'a>)) {
    f(Node::Statement(stmt));
    match stmt {
        Statement::Variable(s) => walk_expression(&s.init, f),
        Statement::Expr(s) => walk_expression(&s.expression, f),
        Statement::Builtin(_) => {}
        Statement::Return(s) => walk_expression(&s.argument, f),
    }
}

pub fn walk_expression<'a>(expr: &'a Expression, f: &mut impl FnMut(Node<'a>)) {
    f(Node::Expression(expr));
    match expr {
        Expression::Identifier(_) | Expression::Literal(_) => {}
        Expression::Array(e) => {
            for elem in &e.elements {
                walk_expression(elem, f);
            }
        }
        Expression::Function(e) => {
            for param in &e.params {
                f(Node::Parameter(param));
                if let Some(default) = &param.default {
                    walk_expression(default, f);
                }
            }
            match &e.body {
                FunctionBody::Expr(body) => walk_expression(body, f),
                FunctionBody::Block(block) => {
                    f(Node::Block(block));
                    for stmt in &block.body {
                        walk_statement(stmt, f);
                    }
                }
            }
        }
        Expression::Logical(e) => {
            walk_expression(&e.left, f);
            walk_expression(&e.right, f);
        }
        Expression::Object(e) => {
            if let Some(with) = &e.with {
                f(Node::Identifier(with));
            }
            for prop in &e.properties {
                f(Node::Property(prop));
                walk_expression(&prop.value, f);
            }
        }
        Expression::Member(e) => walk_expression(&e.object, f),
        Expression::Index(e) => {
            walk_expression(&e.array, f);
            walk_expression(&e.index, f);
        }
        Expression::Binary(e) => {
            walk_expression(&e.left, f);
            walk_expression(&e.right, f);
        }
        Expression::Unary(e) => walk_expression(&e.argument, f),
        Expression::Call(e) => {
            walk_expression(&e.callee, f);
            for arg in &e.arguments {
                f(Node::Property(arg));
                walk_expression(&arg.value, f);
            }
            if let Some(pipe) = &e.pipe {
                walk_expression(pipe, f);
            }
        }
        Expression::Conditional(e) => {
            walk_expression(&e.test, f);
            walk_expression(&e.consequent, f);
            walk_expression(&e.alternate, f);
        }
        Expression::StringExpr(e) => {
            for part in &e.parts {
                if let StringPart::Interpolated(inner) = part {
                    walk_expression(inner, f);
                }
            }
        }
    }
}

/// The largest type variable assigned anywhere in the package.
pub fn max_tvar(pkg: &Package) -> Option<Tvar> {
    let mut max = None;
    walk_package(pkg, &mut |node| {
        let var = node.meta().var;
        if max.is_none_or(|m| var > m) {
            max = Some(var);
        }
    });
    max
}

/// Every identifier name referenced inside `expr`, including `with` bases.
pub fn referenced_identifiers(expr: &Expression) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    walk_expression(expr, &mut |node| match node {
        Node::Expression(Expression::Identifier(id)) | Node::Identifier(id) => {
            names.insert(id.name.clone());
        }
        _ => {}
    });
    names
}
