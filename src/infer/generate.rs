//! Constraint generation: one depth-first walk over the semantic graph.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::constraints::Constraints;
use super::env::{Environment, Scheme};
use super::import::Importer;
use super::solve::solve;
use crate::error::{Error, ErrorKind, Result};
use crate::semantic::{
    Block, CallExpr, Expression, FunctionBody, FunctionExpr, Import, LiteralValue, ObjectExpr,
    Operator, Package, SourceLocation, Statement, StringPart, UnaryOperator,
};
use crate::types::{
    Fresher, FunctionPoly, Kind, LabelSet, Nature, ObjectKind, PIPE_LABEL, PolyType, Tvar, TvarSet,
};

pub struct Generator<'a> {
    constraints: Constraints,
    env: Environment,
    fresher: Fresher,
    importer: &'a dyn Importer,
}

fn var(tv: Tvar) -> PolyType {
    PolyType::Var(tv)
}

impl<'a> Generator<'a> {
    pub fn new(fresher: Fresher, importer: &'a dyn Importer) -> Self {
        Self {
            constraints: Constraints::new(),
            env: Environment::new(),
            fresher,
            importer,
        }
    }

    pub fn generate(mut self, pkg: &Package) -> Result<Constraints> {
        for file in &pkg.files {
            for import in &file.imports {
                self.import(import)?;
            }
            for stmt in &file.body {
                self.statement(stmt, false)?;
            }
        }
        debug!(
            package = %pkg.name,
            types = self.constraints.type_constraints().len(),
            kinds = self.constraints.kind_constraints().len(),
            "generated constraints"
        );
        Ok(self.constraints)
    }

    fn eq(&mut self, left: PolyType, right: PolyType, loc: &SourceLocation) {
        self.constraints.add_type(left, right, loc);
    }

    fn import(&mut self, import: &Import) -> Result<()> {
        self.constraints.annotate(&import.meta);
        let pkg = self
            .importer
            .import(&import.path)
            .ok_or_else(|| Error::from(ErrorKind::ImportNotFound(import.path.clone())).at(&import.meta.loc))?;
        let scheme = Scheme::closed(pkg.ty);
        let ty = self.instantiate(&scheme);
        self.constraints.set_type(&import.meta, ty.clone());
        self.eq(var(import.meta.var), ty, &import.meta.loc);
        let name = import.alias.clone().unwrap_or(pkg.name);
        self.env.bind(name, scheme);
        Ok(())
    }

    /// Returns the argument variable of a return statement.
    fn statement(&mut self, stmt: &Statement, in_block: bool) -> Result<Option<Tvar>> {
        let meta = stmt.meta();
        self.constraints.annotate(meta);
        match stmt {
            Statement::Variable(v) => {
                self.expression(&v.init)?;
                self.eq(var(v.meta.var), var(v.init.var()), &v.meta.loc);
                let scheme = self.generalize(&v.init).map_err(|e| e.at(&v.meta.loc))?;
                if !in_block {
                    self.constraints
                        .bind_name(&v.name, v.init.as_function().is_some());
                }
                self.env.bind(v.name.clone(), scheme);
                Ok(None)
            }
            Statement::Expr(s) => {
                self.expression(&s.expression)?;
                self.eq(var(s.meta.var), var(s.expression.var()), &s.meta.loc);
                Ok(None)
            }
            Statement::Builtin(s) => {
                if in_block {
                    return Err(Error::unimplemented("builtin statement inside a function block").at(&s.meta.loc));
                }
                self.constraints.set_type(&s.meta, s.ty.clone());
                self.constraints.bind_name(&s.name, false);
                self.env.bind(s.name.clone(), Scheme::closed(s.ty.clone()));
                Ok(None)
            }
            Statement::Return(s) => {
                if !in_block {
                    return Err(Error::unimplemented("return statement outside of a function block").at(&s.meta.loc));
                }
                self.expression(&s.argument)?;
                self.eq(var(s.meta.var), var(s.argument.var()), &s.meta.loc);
                Ok(Some(s.argument.var()))
            }
        }
    }

    /// Solve what is known so far and quantify the variables of a function
    /// initializer that the environment does not mention. Other initializers
    /// stay monomorphic.
    ///
    /// Every call solves the whole constraint set gathered so far: kind
    /// resolution merges rows across all earlier bindings, so a package with
    /// `n` function bindings costs `n` solves of growing size.
    fn generalize(&self, init: &Expression) -> Result<Scheme> {
        if init.as_function().is_none() {
            return Ok(Scheme::mono(var(init.var())));
        }
        let solved = solve(&self.constraints)?;
        let poly_type = solved.subst.apply(&var(init.var())).resolve_poly_type(&solved.kinds);
        let env_free = self.env.free_vars(&solved.subst, &solved.kinds);
        let free: TvarSet = poly_type.free_vars().difference(&env_free).copied().collect();
        let nullable = free
            .iter()
            .copied()
            .filter(|tv| solved.kinds.is_nullable(*tv))
            .collect();
        trace!(ty = %poly_type, quantified = free.len(), "generalized");
        Ok(Scheme {
            poly_type,
            free,
            nullable,
        })
    }

    /// Replace quantified variables with fresh ones. Objects inside the type
    /// become fresh variables carrying the object as a kind.
    fn instantiate(&mut self, scheme: &Scheme) -> PolyType {
        let mut mapping = BTreeMap::new();
        for tv in &scheme.free {
            let fresh = self.fresher.fresh();
            if scheme.nullable.contains(tv) {
                self.constraints.add_kind(fresh, Kind::Nullable);
            }
            mapping.insert(*tv, fresh);
        }
        self.freshen(&scheme.poly_type, &mapping)
    }

    fn freshen(&mut self, ty: &PolyType, mapping: &BTreeMap<Tvar, Tvar>) -> PolyType {
        match ty {
            PolyType::Var(tv) => var(mapping.get(tv).copied().unwrap_or(*tv)),
            PolyType::Basic(_) => ty.clone(),
            PolyType::Array(elem) => PolyType::array(self.freshen(elem, mapping)),
            PolyType::Function(func) => PolyType::function(FunctionPoly {
                parameters: func
                    .parameters
                    .iter()
                    .map(|(label, ty)| (label.clone(), self.freshen(ty, mapping)))
                    .collect(),
                required: func.required.clone(),
                pipe: func.pipe.clone(),
                ret: self.freshen(&func.ret, mapping),
            }),
            PolyType::Object(obj) => {
                let lifted = ObjectKind {
                    with: obj.with.as_ref().map(|w| self.freshen(w, mapping)),
                    properties: obj
                        .properties
                        .iter()
                        .map(|(label, ty)| (label.clone(), self.freshen(ty, mapping)))
                        .collect(),
                    lower: obj.lower.clone(),
                    upper: obj.upper.clone(),
                };
                let fresh = self.fresher.fresh();
                self.constraints.add_kind(fresh, Kind::Object(lifted));
                var(fresh)
            }
        }
    }

    fn lookup(&mut self, name: &str, loc: &SourceLocation) -> Result<PolyType> {
        let scheme = self
            .env
            .lookup(name)
            .cloned()
            .ok_or_else(|| Error::from(ErrorKind::UndefinedIdentifier(name.to_string())).at(loc))?;
        Ok(self.instantiate(&scheme))
    }

    fn expression(&mut self, expr: &Expression) -> Result<()> {
        self.constraints.annotate(expr.meta());
        self.expression_inner(expr).map_err(|e| e.at(expr.loc()))
    }

    fn expression_inner(&mut self, expr: &Expression) -> Result<()> {
        let tv = expr.var();
        let loc = expr.loc();
        match expr {
            Expression::Literal(lit) => {
                let nature = match lit.value {
                    LiteralValue::Integer(_) => Nature::Int,
                    LiteralValue::UnsignedInteger(_) => Nature::UInt,
                    LiteralValue::Float(_) => Nature::Float,
                    LiteralValue::String(_) => Nature::String,
                    LiteralValue::Boolean(_) => Nature::Bool,
                    LiteralValue::DateTime(_) => Nature::Time,
                    LiteralValue::Duration(_) => Nature::Duration,
                    LiteralValue::Regexp(_) => Nature::Regexp,
                };
                self.eq(var(tv), PolyType::Basic(nature), loc);
            }
            Expression::Identifier(id) => {
                let ty = self.lookup(&id.name, loc)?;
                self.constraints.set_type(&id.meta, ty.clone());
                self.eq(var(tv), ty, loc);
            }
            Expression::Array(arr) => {
                for elem in &arr.elements {
                    self.expression(elem)?;
                }
                let elem_tv = match arr.elements.first() {
                    Some(first) => first.var(),
                    None => self.fresher.fresh(),
                };
                for elem in arr.elements.iter().skip(1) {
                    self.eq(var(elem_tv), var(elem.var()), elem.loc());
                }
                self.eq(var(tv), PolyType::array(var(elem_tv)), loc);
            }
            Expression::Function(func) => {
                self.env.enter_scope();
                let result = self.function(func);
                self.env.exit_scope();
                result?;
            }
            Expression::Logical(e) => {
                self.expression(&e.left)?;
                self.expression(&e.right)?;
                let bool_ty = PolyType::Basic(Nature::Bool);
                self.eq(var(e.left.var()), bool_ty.clone(), e.left.loc());
                self.eq(var(e.right.var()), bool_ty.clone(), e.right.loc());
                self.eq(var(tv), bool_ty, loc);
            }
            Expression::Object(obj) => self.object(obj)?,
            Expression::Member(m) => {
                self.expression(&m.object)?;
                self.constraints.add_kind(tv, Kind::Nullable);
                self.constraints.add_kind(
                    m.object.var(),
                    Kind::Object(ObjectKind::with_property(m.property.clone(), var(tv))),
                );
            }
            Expression::Index(ix) => {
                self.expression(&ix.array)?;
                self.expression(&ix.index)?;
                self.eq(var(ix.index.var()), PolyType::Basic(Nature::Int), ix.index.loc());
                self.eq(var(ix.array.var()), PolyType::array(var(tv)), loc);
            }
            Expression::Binary(bin) => {
                self.expression(&bin.left)?;
                self.expression(&bin.right)?;
                match bin.operator {
                    op if op.is_arithmetic() => {
                        self.eq(var(tv), var(bin.left.var()), loc);
                        self.eq(var(tv), var(bin.right.var()), loc);
                    }
                    Operator::RegexMatch | Operator::NotRegexMatch => {
                        self.eq(var(tv), PolyType::Basic(Nature::Bool), loc);
                        self.eq(var(bin.left.var()), PolyType::Basic(Nature::String), bin.left.loc());
                        self.eq(var(bin.right.var()), PolyType::Basic(Nature::Regexp), bin.right.loc());
                    }
                    _ => self.eq(var(tv), PolyType::Basic(Nature::Bool), loc),
                }
            }
            Expression::Unary(u) => {
                self.expression(&u.argument)?;
                match u.operator {
                    UnaryOperator::Not => {
                        self.eq(var(tv), PolyType::Basic(Nature::Bool), loc);
                        self.eq(var(u.argument.var()), PolyType::Basic(Nature::Bool), u.argument.loc());
                    }
                    UnaryOperator::Neg | UnaryOperator::Pos => {
                        self.eq(var(tv), var(u.argument.var()), loc);
                    }
                    UnaryOperator::Exists => self.eq(var(tv), PolyType::Basic(Nature::Bool), loc),
                }
            }
            Expression::Call(call) => self.call(call)?,
            Expression::Conditional(c) => {
                self.expression(&c.test)?;
                self.expression(&c.consequent)?;
                self.expression(&c.alternate)?;
                self.eq(var(c.test.var()), PolyType::Basic(Nature::Bool), c.test.loc());
                self.eq(var(c.consequent.var()), var(c.alternate.var()), loc);
                self.eq(var(tv), var(c.consequent.var()), loc);
            }
            Expression::StringExpr(s) => {
                for part in &s.parts {
                    if let StringPart::Interpolated(inner) = part {
                        self.expression(inner)?;
                        self.eq(var(inner.var()), PolyType::Basic(Nature::String), inner.loc());
                    }
                }
                self.eq(var(tv), PolyType::Basic(Nature::String), loc);
            }
        }
        Ok(())
    }

    fn function(&mut self, func: &FunctionExpr) -> Result<()> {
        let mut parameters = BTreeMap::new();
        let mut required = LabelSet::empty();
        let mut pipe = None;
        for param in &func.params {
            self.constraints.annotate(&param.meta);
            if let Some(default) = &param.default {
                self.expression(default)?;
                self.eq(var(param.meta.var), var(default.var()), &param.meta.loc);
            } else if !param.is_pipe {
                required.insert(param.key.clone());
            }
            if param.is_pipe {
                if pipe.is_some() {
                    return Err(Error::unimplemented("more than one pipe parameter").at(&param.meta.loc));
                }
                pipe = Some(param.key.clone());
            }
            parameters.insert(param.key.clone(), var(param.meta.var));
            self.env.bind(param.key.clone(), Scheme::mono(var(param.meta.var)));
        }
        let ret = match &func.body {
            FunctionBody::Expr(body) => {
                self.expression(body)?;
                body.var()
            }
            FunctionBody::Block(block) => self.block(block)?,
        };
        let ty = PolyType::function(FunctionPoly {
            parameters,
            required,
            pipe,
            ret: var(ret),
        });
        self.eq(var(func.meta.var), ty, &func.meta.loc);
        Ok(())
    }

    fn block(&mut self, block: &Block) -> Result<Tvar> {
        self.constraints.annotate(&block.meta);
        let mut ret = None;
        for stmt in &block.body {
            if ret.is_some() {
                return Err(Error::unimplemented("statement after return").at(&stmt.meta().loc));
            }
            ret = self.statement(stmt, true)?;
        }
        let ret = ret.ok_or_else(|| {
            Error::unimplemented("function block without a return statement").at(&block.meta.loc)
        })?;
        self.eq(var(block.meta.var), var(ret), &block.meta.loc);
        Ok(ret)
    }

    fn object(&mut self, obj: &ObjectExpr) -> Result<()> {
        let mut properties = Vec::with_capacity(obj.properties.len());
        for prop in &obj.properties {
            self.constraints.annotate(&prop.meta);
            self.expression(&prop.value)?;
            self.eq(var(prop.meta.var), var(prop.value.var()), &prop.meta.loc);
            properties.push((prop.key.clone(), var(prop.value.var())));
        }
        let kind = match &obj.with {
            Some(base) => {
                self.constraints.annotate(&base.meta);
                let ty = self.lookup(&base.name, &base.meta.loc)?;
                self.constraints.set_type(&base.meta, ty.clone());
                self.eq(var(base.meta.var), ty, &base.meta.loc);
                ObjectKind::extending(var(base.meta.var), properties)
            }
            None => ObjectKind::closed(properties),
        };
        self.constraints.add_kind(obj.meta.var, Kind::Object(kind));
        Ok(())
    }

    fn call(&mut self, call: &CallExpr) -> Result<()> {
        self.expression(&call.callee)?;
        let mut parameters = BTreeMap::new();
        let mut required = LabelSet::empty();
        for arg in &call.arguments {
            self.constraints.annotate(&arg.meta);
            self.expression(&arg.value)?;
            self.eq(var(arg.meta.var), var(arg.value.var()), &arg.meta.loc);
            parameters.insert(arg.key.clone(), var(arg.value.var()));
            required.insert(arg.key.clone());
        }
        let pipe = match &call.pipe {
            Some(pipe) => {
                self.expression(pipe)?;
                parameters.insert(PIPE_LABEL.to_string(), var(pipe.var()));
                Some(PIPE_LABEL.to_string())
            }
            None => None,
        };
        let expected = PolyType::function(FunctionPoly {
            parameters,
            required,
            pipe,
            ret: var(call.meta.var),
        });
        self.eq(var(call.callee.var()), expected, &call.meta.loc);
        Ok(())
    }
}
