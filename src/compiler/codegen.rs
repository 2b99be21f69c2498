//! Lowering of a monomorphised function body to a register program.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, trace};

use super::Builtins;
use super::monomorphise::match_types;
use crate::config::NullTest;
use crate::error::{Error, ErrorKind, Result};
use crate::infer::TypeSolution;
use crate::semantic::{
    CallExpr, Expression, FunctionBody, FunctionExpr, LiteralValue, LogicalOperator, NodeId,
    ObjectExpr, Operator, Statement, StringPart, UnaryOperator, walk,
};
use crate::types::{
    KindMap, MonoType, Nature, ObjectKind, ObjectType, PIPE_LABEL, PolyType, Property,
    Substitution,
};
use crate::vm::{Cast, FieldSource, Op, OperatorTable, Part, Program, Reg, Value};

/// A lowered function and the type it returns.
#[derive(Debug, Clone)]
pub(crate) struct Lowered {
    pub program: Arc<Program>,
    pub ret: MonoType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProgramKey {
    function: NodeId,
    args: ObjectType,
    captures: Vec<MonoType>,
}

/// State shared by every function lowered for one compilation.
pub(crate) struct Session<'a> {
    solution: &'a TypeSolution,
    builtins: &'a Builtins,
    operators: &'a OperatorTable,
    null_test: NullTest,
    programs: RefCell<HashMap<ProgramKey, Lowered>>,
}

impl<'a> Session<'a> {
    pub fn new(
        solution: &'a TypeSolution,
        builtins: &'a Builtins,
        operators: &'a OperatorTable,
        null_test: NullTest,
    ) -> Self {
        Self {
            solution,
            builtins,
            operators,
            null_test,
            programs: RefCell::new(HashMap::new()),
        }
    }

    /// Lower `func` for arguments of the given types.
    pub fn lower(&self, func: &'a FunctionExpr, args: &ObjectType) -> Result<Lowered> {
        Codegen::new(self, Substitution::new()).function(func, args, &[], &[])
    }

    /// Number of distinct local function instances lowered so far.
    pub fn instances(&self) -> usize {
        self.programs.borrow().len()
    }
}

/// An outer register a local function reads.
#[derive(Debug, Clone)]
struct Capture {
    /// `None` when only a nested function refers to it.
    name: Option<String>,
    reg: Reg,
    ty: MonoType,
}

/// A function bound by `f = (...) => ...` inside a body. It is lowered
/// separately at every call site with the argument types found there.
#[derive(Debug)]
struct LocalFunction<'a> {
    expr: &'a FunctionExpr,
    captures: Vec<Capture>,
    functions: Vec<(String, Rc<LocalFunction<'a>>)>,
}

impl<'a> LocalFunction<'a> {
    /// The same function seen from a program whose capture registers were
    /// renumbered by `map`.
    fn reroot(&self, map: &HashMap<Reg, Reg>) -> Result<Rc<LocalFunction<'a>>> {
        let captures = self
            .captures
            .iter()
            .map(|c| {
                let reg = map.get(&c.reg).copied().ok_or_else(|| {
                    Error::internal(format!("capture r{} was not passed down", c.reg))
                })?;
                Ok(Capture {
                    name: c.name.clone(),
                    reg,
                    ty: c.ty.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let functions = self
            .functions
            .iter()
            .map(|(name, f)| Ok((name.clone(), f.reroot(map)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Rc::new(LocalFunction {
            expr: self.expr,
            captures,
            functions,
        }))
    }
}

#[derive(Debug, Clone)]
enum Binding<'a> {
    Register(Reg, MonoType),
    Function(Rc<LocalFunction<'a>>),
}

enum Arm<'a> {
    Expr(&'a Expression),
    Bool(bool),
}

/// Code generator for one function instance.
struct Codegen<'s, 'a> {
    session: &'s Session<'a>,
    subst: Substitution,
    kinds: KindMap,
    ops: Vec<Op>,
    registers: usize,
    names: HashMap<String, Binding<'a>>,
}

impl<'s, 'a> Codegen<'s, 'a> {
    fn new(session: &'s Session<'a>, subst: Substitution) -> Self {
        Self {
            session,
            subst,
            kinds: KindMap::new(),
            ops: Vec::new(),
            registers: 0,
            names: HashMap::new(),
        }
    }

    fn function(
        mut self,
        func: &'a FunctionExpr,
        args: &ObjectType,
        captures: &[Capture],
        functions: &[(String, Rc<LocalFunction<'a>>)],
    ) -> Result<Lowered> {
        let solution = self.session.solution;

        for arg in &args.properties {
            if !func.params.iter().any(|p| p.key == arg.label) {
                return Err(ErrorKind::UnexpectedArgument(arg.label.clone()).into());
            }
        }
        for param in &func.params {
            match args.get(&param.key) {
                Some(concrete) => {
                    let declared = solution.apply(&PolyType::Var(solution.var_of(param.meta.id)?));
                    match_types(&declared, concrete, solution.kinds(), &mut self.subst)
                        .map_err(|e| e.at(&param.meta.loc))?;
                }
                None if param.default.is_none() => {
                    return Err(Error::from(ErrorKind::MissingRequiredArgument(param.key.clone()))
                        .at(&param.meta.loc));
                }
                None => {}
            }
        }
        self.kinds = solution.kinds().apply(&self.subst);

        let inputs: Vec<Reg> = args.properties.iter().map(|_| self.alloc()).collect();
        let mut rename = HashMap::new();
        let mut capture_regs = Vec::with_capacity(captures.len());
        for capture in captures {
            let reg = self.alloc();
            rename.insert(capture.reg, reg);
            capture_regs.push(reg);
            if let Some(name) = &capture.name {
                self.names
                    .insert(name.clone(), Binding::Register(reg, capture.ty.clone()));
            }
        }
        for (name, f) in functions {
            let f = f.reroot(&rename)?;
            self.names.insert(name.clone(), Binding::Function(f));
        }

        for param in &func.params {
            let ty = self.type_of(param.meta.id)?;
            let reg = match (args.index_of(&param.key), &param.default) {
                (Some(i), _) => {
                    let from = &args.properties[i].ty;
                    self.coerce(inputs[i], from, &ty)?
                }
                (None, Some(default)) => {
                    let reg = self.expression(default)?;
                    let from = self.type_of(default.id())?;
                    self.coerce(reg, &from, &ty)?
                }
                (None, None) => {
                    return Err(Error::internal(format!("parameter {} has no value", param.key)));
                }
            };
            self.names.insert(param.key.clone(), Binding::Register(reg, ty));
        }

        let (ret, ret_ty) = match &func.body {
            FunctionBody::Expr(body) => (self.expression(body)?, self.type_of(body.id())?),
            FunctionBody::Block(block) => {
                let mut result = None;
                for stmt in &block.body {
                    if let Some(ret) = self.statement(stmt)? {
                        result = Some(ret);
                        break;
                    }
                }
                result.ok_or_else(|| {
                    Error::unimplemented("function block without a return statement")
                        .at(&block.meta.loc)
                })?
            }
        };

        let program = Program {
            ops: self.ops,
            registers: self.registers,
            inputs,
            captures: capture_regs,
            ret,
        };
        trace!(ops = program.ops.len(), registers = program.registers, "lowered function");
        Ok(Lowered {
            program: Arc::new(program),
            ret: ret_ty,
        })
    }

    /// Lower one statement of a function block; returns the result register
    /// and type at `return`.
    fn statement(&mut self, stmt: &'a Statement) -> Result<Option<(Reg, MonoType)>> {
        match stmt {
            Statement::Variable(v) => {
                let binding = match &v.init {
                    Expression::Function(func) => Binding::Function(self.define(func, &v.init)),
                    init => {
                        let reg = self.expression(init)?;
                        Binding::Register(reg, self.type_of(init.id())?)
                    }
                };
                self.names.insert(v.name.clone(), binding);
                Ok(None)
            }
            Statement::Return(r) => {
                let reg = self.expression(&r.argument)?;
                Ok(Some((reg, self.type_of(r.argument.id())?)))
            }
            Statement::Expr(s) => Err(Error::unimplemented("expression statement in a function body")
                .at(&s.meta.loc)),
            Statement::Builtin(s) => {
                Err(Error::unimplemented("builtin declaration in a function body").at(&s.meta.loc))
            }
        }
    }

    /// Capture what a local function needs from the current scope.
    fn define(&self, func: &'a FunctionExpr, expr: &Expression) -> Rc<LocalFunction<'a>> {
        let mut captures: BTreeMap<Reg, Capture> = BTreeMap::new();
        let mut functions = Vec::new();
        for name in walk::referenced_identifiers(expr) {
            match self.names.get(&name) {
                Some(Binding::Register(reg, ty)) => {
                    captures.insert(
                        *reg,
                        Capture {
                            name: Some(name),
                            reg: *reg,
                            ty: ty.clone(),
                        },
                    );
                }
                Some(Binding::Function(f)) => {
                    for c in &f.captures {
                        captures.entry(c.reg).or_insert_with(|| Capture {
                            name: None,
                            reg: c.reg,
                            ty: c.ty.clone(),
                        });
                    }
                    functions.push((name, f.clone()));
                }
                None => {}
            }
        }
        Rc::new(LocalFunction {
            expr: func,
            captures: captures.into_values().collect(),
            functions,
        })
    }

    // ========================================
    // Types and registers
    // ========================================

    fn type_of(&self, id: NodeId) -> Result<MonoType> {
        let solution = self.session.solution;
        let ty = solution.apply(&PolyType::Var(solution.var_of(id)?));
        self.subst.apply(&ty).resolve_type(&self.kinds)
    }

    fn alloc(&mut self) -> Reg {
        let reg = self.registers;
        self.registers += 1;
        reg
    }

    fn emit(&mut self, op: Op) -> usize {
        self.ops.push(op);
        self.ops.len() - 1
    }

    fn constant(&mut self, value: Value) -> Reg {
        let dst = self.alloc();
        self.emit(Op::Const { dst, value });
        dst
    }

    /// Move a value of type `from` into a position declared as `to`,
    /// reshaping records when their layouts differ.
    fn coerce(&mut self, reg: Reg, from: &MonoType, to: &MonoType) -> Result<Reg> {
        match Cast::between(from, to)? {
            None => Ok(reg),
            Some(cast) => {
                let dst = self.alloc();
                self.emit(Op::StaticCast {
                    dst,
                    src: reg,
                    cast: Arc::new(cast),
                });
                Ok(dst)
            }
        }
    }

    // ========================================
    // Expressions
    // ========================================

    fn expression(&mut self, expr: &'a Expression) -> Result<Reg> {
        self.expression_inner(expr).map_err(|e| e.at(expr.loc()))
    }

    fn expression_inner(&mut self, expr: &'a Expression) -> Result<Reg> {
        match expr {
            Expression::Literal(lit) => {
                let value = match &lit.value {
                    LiteralValue::Integer(v) => Value::new_int(*v),
                    LiteralValue::UnsignedInteger(v) => Value::new_uint(*v),
                    LiteralValue::Float(v) => Value::new_float(*v),
                    LiteralValue::String(v) => Value::new_string(v.clone()),
                    LiteralValue::Boolean(v) => Value::new_bool(*v),
                    LiteralValue::DateTime(v) => Value::new_time(*v),
                    LiteralValue::Duration(v) => Value::new_duration(*v),
                    LiteralValue::Regexp(pattern) => Value::regexp(pattern)?,
                };
                Ok(self.constant(value))
            }
            Expression::Identifier(id) => self.identifier(&id.name, id.meta.id),
            Expression::Array(arr) => {
                let ty = self.type_of(arr.meta.id)?;
                let elem = ty
                    .element()
                    .cloned()
                    .ok_or_else(|| Error::internal(format!("array literal typed {}", ty)))?;
                let mut elements = Vec::with_capacity(arr.elements.len());
                for e in &arr.elements {
                    let reg = self.expression(e)?;
                    let from = self.type_of(e.id())?;
                    elements.push(self.coerce(reg, &from, &elem)?);
                }
                let dst = self.alloc();
                self.emit(Op::Array {
                    dst,
                    elem,
                    elements,
                });
                Ok(dst)
            }
            Expression::Function(_) => Err(Error::unimplemented("function value")),
            Expression::Logical(e) => match e.operator {
                LogicalOperator::And => {
                    self.conditional(&e.left, Arm::Expr(&e.right), Arm::Bool(false), e.meta.id)
                }
                LogicalOperator::Or => {
                    self.conditional(&e.left, Arm::Bool(true), Arm::Expr(&e.right), e.meta.id)
                }
            },
            Expression::Object(obj) => self.object(obj),
            Expression::Member(m) => {
                if let Expression::Identifier(pkg) = &m.object {
                    if !self.names.contains_key(&pkg.name) {
                        let path = format!("{}.{}", pkg.name, m.property);
                        if let Some(value) = self.session.builtins.get(&path).cloned() {
                            return self.builtin(value, m.meta.id);
                        }
                    }
                }
                let object = self.expression(&m.object)?;
                let object_ty = self.type_of(m.object.id())?;
                let ty = self.type_of(m.meta.id)?;
                match &object_ty {
                    MonoType::Object(record) => match record.index_of(&m.property) {
                        Some(index) => {
                            let dst = self.alloc();
                            self.emit(Op::Member { dst, object, index });
                            let from = record.properties[index].ty.clone();
                            self.coerce(dst, &from, &ty)
                        }
                        None => Ok(self.constant(Value::typed_null(ty.nature()))),
                    },
                    MonoType::Basic(Nature::Null) => Ok(self.constant(Value::typed_null(ty.nature()))),
                    other => Err(Error::conflict(
                        PolyType::object(ObjectKind::with_property(
                            m.property.clone(),
                            PolyType::from(&ty),
                        )),
                        other,
                    )),
                }
            }
            Expression::Index(ix) => {
                let array = self.expression(&ix.array)?;
                let index = self.expression(&ix.index)?;
                let array_ty = self.type_of(ix.array.id())?;
                let ty = self.type_of(ix.meta.id)?;
                let elem = array_ty
                    .element()
                    .cloned()
                    .ok_or_else(|| Error::conflict(PolyType::array(PolyType::from(&ty)), &array_ty))?;
                let dst = self.alloc();
                self.emit(Op::Index { dst, array, index });
                self.coerce(dst, &elem, &ty)
            }
            Expression::Binary(bin) => {
                let left = self.expression(&bin.left)?;
                let right = self.expression(&bin.right)?;
                let left_ty = self.type_of(bin.left.id())?;
                let right_ty = self.type_of(bin.right.id())?;
                let nature = operand_nature(bin.operator, left_ty.nature(), right_ty.nature())?;
                let kernel = self
                    .session
                    .operators
                    .lookup(bin.operator, nature)
                    .ok_or_else(|| {
                        Error::unimplemented(format!("operator {} for {}", bin.operator, nature))
                    })?;
                let dst = self.alloc();
                self.emit(Op::Binary {
                    dst,
                    kernel,
                    left,
                    right,
                });
                Ok(dst)
            }
            Expression::Unary(u) => {
                let src = self.expression(&u.argument)?;
                let dst = match u.operator {
                    UnaryOperator::Pos => return Ok(src),
                    UnaryOperator::Not => {
                        let dst = self.alloc();
                        self.emit(Op::Not { dst, src });
                        dst
                    }
                    UnaryOperator::Neg => {
                        let nature = self.type_of(u.argument.id())?.nature();
                        if !matches!(
                            nature,
                            Nature::Int | Nature::Float | Nature::Duration | Nature::Null
                        ) {
                            return Err(Error::unimplemented(format!("negation of {}", nature)));
                        }
                        let dst = self.alloc();
                        self.emit(Op::Neg { dst, src });
                        dst
                    }
                    UnaryOperator::Exists => {
                        let dst = self.alloc();
                        self.emit(Op::Exists { dst, src });
                        dst
                    }
                };
                Ok(dst)
            }
            Expression::Call(call) => self.call(call),
            Expression::Conditional(c) => self.conditional(
                &c.test,
                Arm::Expr(&c.consequent),
                Arm::Expr(&c.alternate),
                c.meta.id,
            ),
            Expression::StringExpr(s) => {
                let mut parts = Vec::with_capacity(s.parts.len());
                for part in &s.parts {
                    parts.push(match part {
                        StringPart::Text(text) => Part::Text(text.clone()),
                        StringPart::Interpolated(e) => Part::Reg(self.expression(e)?),
                    });
                }
                let dst = self.alloc();
                self.emit(Op::Interpolate { dst, parts });
                Ok(dst)
            }
        }
    }

    fn identifier(&mut self, name: &str, id: NodeId) -> Result<Reg> {
        match self.names.get(name).cloned() {
            Some(Binding::Register(reg, from)) => {
                let to = self.type_of(id)?;
                self.coerce(reg, &from, &to)
            }
            Some(Binding::Function(_)) => Err(Error::unimplemented(format!(
                "function {} used as a value",
                name
            ))),
            None => match self.session.builtins.get(name).cloned() {
                Some(value) => self.builtin(value, id),
                None if self.session.solution.is_package_function(name) => {
                    Err(Error::unimplemented(format!(
                        "package-level function {}",
                        name
                    )))
                }
                None => Err(ErrorKind::UndefinedIdentifier(name.to_string()).into()),
            },
        }
    }

    /// Load a value bound by the caller. Apart from native functions, its
    /// nature must agree with the type inferred for the reference.
    fn builtin(&mut self, value: Value, id: NodeId) -> Result<Reg> {
        if value.nature() == Nature::Function {
            return Ok(self.constant(value));
        }
        let ty = self.type_of(id)?;
        if !value.is_null() && value.nature() != ty.nature() {
            return Err(Error::conflict(&ty, PolyType::Basic(value.nature())));
        }
        Ok(self.constant(value))
    }

    fn object(&mut self, obj: &'a ObjectExpr) -> Result<Reg> {
        let ty = self.type_of(obj.meta.id)?;
        let MonoType::Object(record) = &ty else {
            return Err(Error::internal(format!("object literal typed {}", ty)));
        };

        let mut locals: HashMap<&str, Reg> = HashMap::new();
        for prop in &obj.properties {
            let reg = self.expression(&prop.value)?;
            let reg = match record.get(&prop.key) {
                Some(to) => {
                    let from = self.type_of(prop.value.id())?;
                    self.coerce(reg, &from, to)?
                }
                None => reg,
            };
            locals.insert(&prop.key, reg);
        }

        let (base, base_ty) = match &obj.with {
            Some(ident) => {
                let reg = self.identifier(&ident.name, ident.meta.id)?;
                (Some(reg), Some(self.type_of(ident.meta.id)?))
            }
            None => (None, None),
        };
        let base_record = base_ty.as_ref().and_then(MonoType::as_object);

        let fields = record
            .properties
            .iter()
            .map(|p| match locals.get(p.label.as_str()) {
                Some(reg) => FieldSource::Local(*reg),
                None => match base_record.and_then(|b| b.index_of(&p.label)) {
                    Some(i) => FieldSource::Base(i),
                    None => FieldSource::Null(p.ty.nature()),
                },
            })
            .collect();
        let dst = self.alloc();
        self.emit(Op::Record {
            dst,
            labels: record.labels().map(str::to_string).collect(),
            base,
            fields,
        });
        Ok(dst)
    }

    /// branch, consequent, jump, alternate, jump, phi
    fn conditional(
        &mut self,
        test: &'a Expression,
        consequent: Arm<'a>,
        alternate: Arm<'a>,
        id: NodeId,
    ) -> Result<Reg> {
        let ty = self.type_of(id)?;
        let test = self.expression(test)?;
        let branch = self.emit(Op::Branch {
            test,
            on_true: 0,
            on_false: 0,
            strict: self.session.null_test == NullTest::Error,
        });

        let on_true = self.ops.len();
        let consequent = self.arm(consequent, &ty)?;
        let jump_true = self.emit(Op::Jump { target: 0 });

        let on_false = self.ops.len();
        let alternate = self.arm(alternate, &ty)?;
        let jump_false = self.emit(Op::Jump { target: 0 });

        let join = self.ops.len();
        if let Some(Op::Branch {
            on_true: t,
            on_false: f,
            ..
        }) = self.ops.get_mut(branch)
        {
            *t = on_true;
            *f = on_false;
        }
        for jump in [jump_true, jump_false] {
            if let Some(Op::Jump { target }) = self.ops.get_mut(jump) {
                *target = join;
            }
        }

        let dst = self.alloc();
        self.emit(Op::Phi {
            dst,
            test,
            consequent,
            alternate,
        });
        Ok(dst)
    }

    fn arm(&mut self, arm: Arm<'a>, ty: &MonoType) -> Result<Reg> {
        match arm {
            Arm::Expr(e) => {
                let reg = self.expression(e)?;
                let from = self.type_of(e.id())?;
                self.coerce(reg, &from, ty)
            }
            Arm::Bool(b) => Ok(self.constant(Value::new_bool(b))),
        }
    }

    // ========================================
    // Calls
    // ========================================

    fn call(&mut self, call: &'a CallExpr) -> Result<Reg> {
        let local = match &call.callee {
            Expression::Identifier(id) => match self.names.get(&id.name) {
                Some(Binding::Function(f)) => Some(f.clone()),
                _ => None,
            },
            Expression::Function(func) => Some(self.define(func, &call.callee)),
            _ => None,
        };
        match local {
            Some(f) => self.call_static(call, &f),
            None => self.call_native(call),
        }
    }

    fn arguments(&mut self, call: &'a CallExpr, pipe_label: &str) -> Result<(Vec<Reg>, ObjectType)> {
        let mut regs = Vec::with_capacity(call.arguments.len() + 1);
        let mut args = ObjectType::default();
        for arg in &call.arguments {
            regs.push(self.expression(&arg.value)?);
            args.properties.push(Property {
                label: arg.key.clone(),
                ty: self.type_of(arg.value.id())?,
            });
        }
        if let Some(pipe) = &call.pipe {
            regs.push(self.expression(pipe)?);
            args.properties.push(Property {
                label: pipe_label.to_string(),
                ty: self.type_of(pipe.id())?,
            });
        }
        Ok((regs, args))
    }

    fn call_static(&mut self, call: &'a CallExpr, f: &Rc<LocalFunction<'a>>) -> Result<Reg> {
        let pipe_label = match (f.expr.pipe(), &call.pipe) {
            (Some(param), _) => param.key.clone(),
            (None, Some(_)) => return Err(ErrorKind::UnexpectedArgument(PIPE_LABEL.into()).into()),
            (None, None) => PIPE_LABEL.to_string(),
        };
        let (regs, args) = self.arguments(call, &pipe_label)?;
        let key = ProgramKey {
            function: f.expr.meta.id,
            args,
            captures: f.captures.iter().map(|c| c.ty.clone()).collect(),
        };

        let cached = self.session.programs.borrow().get(&key).cloned();
        let lowered = match cached {
            Some(lowered) => lowered,
            None => {
                debug!(function = key.function.0, args = %MonoType::Object(key.args.clone()), "lowering local function");
                let lowered = Codegen::new(self.session, self.subst.clone()).function(
                    f.expr,
                    &key.args,
                    &f.captures,
                    &f.functions,
                )?;
                self.session
                    .programs
                    .borrow_mut()
                    .insert(key, lowered.clone());
                lowered
            }
        };

        let ty = self.type_of(call.meta.id)?;
        let dst = self.alloc();
        self.emit(Op::CallStatic {
            dst,
            callee: lowered.program,
            captures: f.captures.iter().map(|c| c.reg).collect(),
            args: regs,
        });
        self.coerce(dst, &lowered.ret, &ty)
    }

    fn call_native(&mut self, call: &'a CallExpr) -> Result<Reg> {
        let callee = self.expression(&call.callee)?;
        let solution = self.session.solution;
        let callee_ty = solution.apply(&PolyType::Var(solution.var_of(call.callee.id())?));
        let callee_ty = self.subst.apply(&callee_ty);
        let pipe_label = match &callee_ty {
            PolyType::Function(func) => func.pipe.clone().unwrap_or_else(|| PIPE_LABEL.to_string()),
            other => {
                return Err(Error::unimplemented(format!("call of a value of type {}", other)));
            }
        };
        let (args, types) = self.arguments(call, &pipe_label)?;
        let dst = self.alloc();
        self.emit(Op::CallNative {
            dst,
            callee,
            labels: types.labels().map(str::to_string).collect(),
            args,
        });
        Ok(dst)
    }
}

/// The nature an operator is dispatched on. A statically null operand takes
/// the nature of the other side.
fn operand_nature(op: Operator, left: Nature, right: Nature) -> Result<Nature> {
    match (left, right) {
        (Nature::Null, n) | (n, Nature::Null) => Ok(n),
        (l, r) if l == r => Ok(l),
        (l, Nature::Regexp) if matches!(op, Operator::RegexMatch | Operator::NotRegexMatch) => {
            Ok(l)
        }
        (l, r) => Err(Error::unimplemented(format!(
            "operator {} between {} and {}",
            op, l, r
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_nature() {
        assert_eq!(
            operand_nature(Operator::Add, Nature::Int, Nature::Int).unwrap(),
            Nature::Int
        );
        assert_eq!(
            operand_nature(Operator::Eq, Nature::Null, Nature::String).unwrap(),
            Nature::String
        );
        assert_eq!(
            operand_nature(Operator::RegexMatch, Nature::String, Nature::Regexp).unwrap(),
            Nature::String
        );
        let err = operand_nature(Operator::Add, Nature::Int, Nature::Float).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Unimplemented(_)));
    }
}
