//! Type inference through the public API.

use std::collections::HashMap;

use rill::infer::{NoImports, PackageType};
use rill::semantic::{Builder, Expression, Operator, Package, Statement};
use rill::types::{FunctionPoly, LabelSet, MonoType, Nature, ObjectKind, PolyType};
use rill::{ErrorKind, Result, TypeSolution, infer};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn solve(pkg: &Package) -> Result<TypeSolution> {
    init_tracing();
    infer(pkg, &NoImports)
}

/// The expression of the `index`th top-level statement.
fn expr_at(pkg: &Package, index: usize) -> &Expression {
    match &pkg.files[0].body[index] {
        Statement::Variable(v) => &v.init,
        Statement::Expr(s) => &s.expression,
        other => panic!("statement {} has no expression: {:?}", index, other),
    }
}

#[test]
fn test_polymorphic_function_at_two_types() {
    let b = Builder::new();
    let pkg = b.package(vec![
        b.variable(
            "add",
            b.function(
                vec![b.param("a"), b.param("b")],
                b.binary(Operator::Add, b.ident("a"), b.ident("b")),
            ),
        ),
        b.expr_stmt(b.call(
            b.ident("add"),
            vec![b.property("a", b.int(1)), b.property("b", b.int(2))],
        )),
        b.expr_stmt(b.call(
            b.ident("add"),
            vec![b.property("a", b.float(1.0)), b.property("b", b.float(2.0))],
        )),
    ]);
    let solution = solve(&pkg).unwrap();
    assert_eq!(solution.type_of(expr_at(&pkg, 1).id()).unwrap(), MonoType::INT);
    assert_eq!(solution.type_of(expr_at(&pkg, 2).id()).unwrap(), MonoType::FLOAT);
}

#[test]
fn test_mixed_arithmetic_conflicts() {
    let b = Builder::new();
    let pkg = b.package(vec![b.expr_stmt(b.binary(
        Operator::Mul,
        b.int(1),
        b.at(4, 2).float(2.0),
    ))]);
    let err = solve(&pkg).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeConflict(_, _)));
    assert!(err.loc.is_some());
}

#[test]
fn test_record_argument_must_carry_accessed_label() {
    let b = Builder::new();
    let get_a = b.variable(
        "get_a",
        b.function(
            vec![b.param("r")],
            b.binary(Operator::Add, b.member(b.ident("r"), "a"), b.int(1)),
        ),
    );
    let ok = b.expr_stmt(b.call(
        b.ident("get_a"),
        vec![b.property(
            "r",
            b.object(vec![b.property("a", b.int(1)), b.property("z", b.bool(true))]),
        )],
    ));
    let pkg = b.package(vec![get_a, ok]);
    let solution = solve(&pkg).unwrap();
    assert_eq!(solution.type_of(expr_at(&pkg, 1).id()).unwrap(), MonoType::INT);

    let b = Builder::new();
    let get_a = b.variable(
        "get_a",
        b.function(
            vec![b.param("r")],
            b.binary(Operator::Add, b.member(b.ident("r"), "a"), b.int(1)),
        ),
    );
    let missing = b.expr_stmt(b.call(
        b.ident("get_a"),
        vec![b.property("r", b.object(vec![b.property("z", b.bool(true))]))],
    ));
    let err = solve(&b.package(vec![get_a, missing])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingObjectProperty(vec!["a".to_string()]));
}

#[test]
fn test_conditional_branches_unify() {
    let b = Builder::new();
    let pkg = b.package(vec![b.expr_stmt(b.conditional(
        b.bool(true),
        b.string("cats"),
        b.int(1),
    ))]);
    let err = solve(&pkg).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeConflict(_, _)));
}

#[test]
fn test_non_function_initializers_stay_monomorphic() {
    let b = Builder::new();
    let pkg = b.package(vec![
        b.variable("xs", b.array(vec![])),
        b.expr_stmt(b.index(b.ident("xs"), b.int(0))),
        b.expr_stmt(b.binary(Operator::Add, b.index(b.ident("xs"), b.int(0)), b.int(1))),
        b.expr_stmt(b.binary(Operator::Add, b.index(b.ident("xs"), b.int(0)), b.float(1.0))),
    ]);
    let err = solve(&pkg).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeConflict(_, _)));
}

#[test]
fn test_imported_package_member() {
    init_tracing();
    let b = Builder::new();
    let upper = PolyType::function(FunctionPoly {
        parameters: [("v".to_string(), PolyType::Basic(Nature::String))]
            .into_iter()
            .collect(),
        required: LabelSet::from_labels(["v"]),
        pipe: None,
        ret: PolyType::Basic(Nature::String),
    });
    let mut packages = HashMap::new();
    packages.insert(
        "strings".to_string(),
        PackageType {
            name: "strings".to_string(),
            ty: PolyType::object(ObjectKind::closed([("toUpper".to_string(), upper)])),
        },
    );

    let pkg = b.package_with_imports(
        vec![b.import("strings")],
        vec![b.expr_stmt(b.call(
            b.member(b.ident("strings"), "toUpper"),
            vec![b.property("v", b.string("rill"))],
        ))],
    );
    let solution = infer(&pkg, &packages).unwrap();
    assert_eq!(solution.type_of(expr_at(&pkg, 0).id()).unwrap(), MonoType::STRING);

    let b = Builder::new();
    let pkg = b.package_with_imports(vec![b.import("csv")], vec![]);
    let err = infer(&pkg, &packages).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ImportNotFound("csv".to_string()));
}

#[test]
fn test_graph_round_trips_through_json() {
    let b = Builder::new();
    let pkg = b.package(vec![b.variable(
        "f",
        b.function(
            vec![b.param("r"), b.param_default("n", b.int(2))],
            b.object_with(
                "r",
                vec![b.property(
                    "n",
                    b.binary(Operator::Mul, b.ident("n"), b.int(3)),
                )],
            ),
        ),
    )]);
    let json = pkg.to_json().unwrap();
    let decoded = Package::from_json(&json).unwrap();
    assert_eq!(decoded, pkg);

    let f = decoded.find_function("f").unwrap();
    let solution = solve(&decoded).unwrap();
    assert_eq!(
        solution.type_of(f.params[1].meta.id).unwrap(),
        MonoType::INT
    );

    let err = Package::from_json("{\"name\": 1}").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Internal(_)));
}

#[test]
fn test_generalization_sees_earlier_bindings() {
    let b = Builder::new();
    let pkg = b.package(vec![
        b.variable("id", b.function(vec![b.param("x")], b.ident("x"))),
        b.variable(
            "twice",
            b.function(
                vec![b.param("x")],
                b.call(
                    b.ident("id"),
                    vec![b.property(
                        "x",
                        b.call(b.ident("id"), vec![b.property("x", b.ident("x"))]),
                    )],
                ),
            ),
        ),
        b.variable(
            "first",
            b.function(vec![b.param("r")], b.member(b.ident("r"), "a")),
        ),
        b.expr_stmt(b.call(b.ident("twice"), vec![b.property("x", b.int(1))])),
        b.expr_stmt(b.call(b.ident("twice"), vec![b.property("x", b.string("s"))])),
        b.expr_stmt(b.call(
            b.ident("first"),
            vec![b.property("r", b.object(vec![b.property("a", b.float(1.5))]))],
        )),
    ]);
    let solution = solve(&pkg).unwrap();
    assert_eq!(solution.type_of(expr_at(&pkg, 3).id()).unwrap(), MonoType::INT);
    assert_eq!(solution.type_of(expr_at(&pkg, 4).id()).unwrap(), MonoType::STRING);
    assert_eq!(solution.type_of(expr_at(&pkg, 5).id()).unwrap(), MonoType::FLOAT);
}
