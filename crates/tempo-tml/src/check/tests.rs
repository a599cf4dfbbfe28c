//! Pass-level tests: whole systems built by hand, checked end to end, with
//! assertions on the diagnostic buffer and on the rewritten fields.

use crate::ast::stmt::Block;
use crate::ast::{
    Decl, Edge, Expr, ExprKind, Frame, Function, Instance, State, Statement, SyncFlavor,
    SyncUsage, Symbol, System, Template, Variable,
};
use crate::check::{check_system, TypeChecker};
use crate::error::Severity;
use crate::foundation::{Span, Type, TypeKind};
use indexmap::IndexSet;

fn sp() -> Span {
    Span::default()
}

fn int() -> Type {
    Type::primitive(TypeKind::Int)
}

fn clock() -> Type {
    Type::primitive(TypeKind::Clock)
}

fn int_range(lo: i64, hi: Expr) -> Type {
    Type::range(int(), Expr::int_constant(lo, sp()), hi)
}

fn ident(symbol: &Symbol) -> Expr {
    Expr::identifier(symbol, sp())
}

fn template(name: &str) -> Template {
    Template::new(Instance::plain(Symbol::new(name, Type::instance(vec![]))))
}

fn location(name: &str, invariant: Option<Expr>) -> State {
    State {
        uid: Symbol::new(name, Type::primitive(TypeKind::Location)),
        invariant,
        exp_rate: None,
        cost_rate: None,
    }
}

fn edge(guard: Option<Expr>, sync: Option<Expr>) -> Edge {
    Edge {
        select: Frame::new(),
        guard,
        sync,
        assign: Expr::int_constant(1, sp()),
        prob: None,
        control: true,
        dst: Some(0),
    }
}

fn messages(system: &System) -> Vec<String> {
    system.diagnostics.iter().map(|d| d.message.clone()).collect()
}

fn warnings(system: &System) -> Vec<String> {
    system
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .map(|d| d.message.clone())
        .collect()
}

/// Every node of an accepted expression carries a known type.
fn assert_fully_typed(expr: &Expr) {
    assert!(
        !expr.ty.unknown_kind(),
        "untyped node {:?} survived checking",
        expr.kind
    );
    for sub in &expr.subs {
        assert_fully_typed(sub);
    }
}

#[test]
fn test_const_sized_array_accepted() {
    // const int n = 5; int a[n];
    let n = Symbol::new("n", int().prefixed(TypeKind::Const));
    let bound = Expr::binary(
        ExprKind::Minus,
        ident(&n),
        Expr::int_constant(1, sp()),
        sp(),
        Type::unknown(),
    );
    let a = Symbol::new("a", Type::array(int(), int_range(0, bound)));

    let mut system = System::new();
    system.global.decls.push(Decl::Variable(Variable {
        uid: n,
        init: Some(Expr::int_constant(5, sp())),
    }));
    system.global.decls.push(Decl::Variable(Variable { uid: a, init: None }));

    assert!(check_system(&mut system), "{:?}", messages(&system));
    assert!(system.diagnostics.is_empty());
}

#[test]
fn test_array_size_must_be_computable() {
    let m = Symbol::new("m", int());
    let a = Symbol::new("a", Type::array(int(), int_range(0, ident(&m))));

    let mut system = System::new();
    system.global.decls.push(Decl::Variable(Variable {
        uid: m,
        init: None,
    }));
    system.global.decls.push(Decl::Variable(Variable { uid: a, init: None }));

    assert!(!check_system(&mut system));
    assert!(messages(&system).contains(&"$Must_be_computable_at_compile_time".to_string()));
}

fn cost_rate_eq(cost: &Symbol, value: i64) -> Expr {
    let rated = Expr::unary(ExprKind::Rate, ident(cost), sp(), Type::unknown());
    Expr::binary(
        ExprKind::Eq,
        rated,
        Expr::int_constant(value, sp()),
        sp(),
        Type::unknown(),
    )
}

#[test]
fn test_invariant_decomposition_extracts_cost_rate() {
    // invariant x <= 3 && c' == 2
    let x = Symbol::new("x", clock());
    let c = Symbol::new("c", Type::primitive(TypeKind::Cost));
    let bound = Expr::binary(
        ExprKind::Le,
        ident(&x),
        Expr::int_constant(3, sp()),
        sp(),
        Type::unknown(),
    );
    let invariant = Expr::binary(
        ExprKind::And,
        bound,
        cost_rate_eq(&c, 2),
        sp(),
        Type::unknown(),
    );

    let mut t = template("T");
    t.states.push(location("s", Some(invariant)));
    let mut system = System::new();
    system.templates.push(t);

    assert!(check_system(&mut system), "{:?}", messages(&system));

    let state = &system.templates[0].states[0];
    let residual = state.invariant.as_ref().expect("residual invariant");
    assert_eq!(residual.kind, ExprKind::Le);
    assert!(residual.ty.is_invariant());
    assert_fully_typed(residual);
    assert_eq!(state.cost_rate.as_ref().and_then(Expr::int_value), Some(2));
    assert!(!system.facts.stopwatches);
}

#[test]
fn test_two_cost_rates_rejected() {
    let c = Symbol::new("c", Type::primitive(TypeKind::Cost));
    let invariant = Expr::binary(
        ExprKind::And,
        cost_rate_eq(&c, 2),
        cost_rate_eq(&c, 3),
        sp(),
        Type::unknown(),
    );

    let mut t = template("T");
    t.states.push(location("s", Some(invariant)));
    let mut system = System::new();
    system.templates.push(t);

    assert!(!check_system(&mut system));
    assert!(messages(&system).contains(&"$Only_one_cost_rate_is_allowed".to_string()));
}

#[test]
fn test_clock_rate_records_stopwatch() {
    let x = Symbol::new("x", clock());
    let rated = Expr::unary(ExprKind::Rate, ident(&x), sp(), Type::unknown());
    let invariant = Expr::binary(
        ExprKind::Eq,
        rated,
        Expr::int_constant(0, sp()),
        sp(),
        Type::unknown(),
    );

    let mut t = template("T");
    t.states.push(location("s", Some(invariant)));
    let mut system = System::new();
    system.templates.push(t);

    assert!(check_system(&mut system), "{:?}", messages(&system));
    assert!(system.facts.stopwatches);
    let state = &system.templates[0].states[0];
    assert!(state.cost_rate.is_none());
    assert!(state.invariant.is_some());
}

#[test]
fn test_clock_as_invariant_rejected() {
    let x = Symbol::new("x", clock());
    let mut t = template("T");
    t.states.push(location("s", Some(ident(&x))));
    let mut system = System::new();
    system.templates.push(t);

    assert!(!check_system(&mut system));
    assert!(messages(&system)
        .contains(&"$Expression_of_type clock $cannot_be_used_as_an_invariant".to_string()));
}

#[test]
fn test_clock_guard_on_urgent_edge_warns() {
    let x = Symbol::new("x", clock());
    let a = Symbol::new(
        "a",
        Type::primitive(TypeKind::Channel).prefixed(TypeKind::Urgent),
    );
    let guard = Expr::binary(
        ExprKind::Lt,
        ident(&x),
        Expr::int_constant(5, sp()),
        sp(),
        Type::unknown(),
    );
    let sync = Expr::sync(ident(&a), SyncFlavor::Bang, sp());

    let mut t = template("T");
    t.states.push(location("s", None));
    t.edges.push(edge(Some(guard), Some(sync)));
    let mut system = System::new();
    system.templates.push(t);

    assert!(check_system(&mut system), "{:?}", messages(&system));
    let warned = warnings(&system);
    assert!(warned.contains(&"$Clock_guards_are_not_allowed_on_urgent_edges".to_string()));
    // x < 5 is also a strict bound on an urgent edge.
    assert!(warned.contains(&"$Strict_bounds_on_urgent_edges_may_not_make_sense".to_string()));
    assert!(system.facts.urgent_transitions);
}

#[test]
fn test_guard_of_wrong_type_rejected() {
    let a = Symbol::new("a", Type::primitive(TypeKind::Channel));
    let mut t = template("T");
    t.edges.push(edge(Some(ident(&a)), None));
    let mut system = System::new();
    system.templates.push(t);

    assert!(!check_system(&mut system));
    assert!(messages(&system)
        .contains(&"$Expression_of_type chan $cannot_be_used_as_a_guard".to_string()));
}

#[test]
fn test_useless_expression_in_function_body_warns() {
    // void f() { 1+1; return; }
    let f = Symbol::new("f", Type::function(Type::primitive(TypeKind::Void), vec![]));
    let useless = Expr::binary(
        ExprKind::Plus,
        Expr::int_constant(1, sp()),
        Expr::int_constant(1, sp()),
        sp(),
        Type::unknown(),
    );
    let body = Block {
        frame: Frame::new(),
        decls: Vec::new(),
        stats: vec![Statement::Expr(useless), Statement::Return(None)],
    };
    let mut system = System::new();
    system.global.decls.push(Decl::Function(Function {
        uid: f,
        body,
        changes: IndexSet::new(),
        depends: IndexSet::new(),
    }));

    assert!(check_system(&mut system), "{:?}", messages(&system));
    assert_eq!(
        warnings(&system),
        vec!["$Expression_does_not_have_any_effect".to_string()]
    );
}

#[test]
fn test_function_effects_exclude_locals() {
    // int g; void f(int p) { int t; g = t + p; }
    let g = Symbol::new("g", int());
    let f = Symbol::new(
        "f",
        Type::function(Type::primitive(TypeKind::Void), vec![int()]),
    );
    let mut frame = Frame::new();
    let p = frame.declare("p", int());
    let t = frame.declare("t", int());
    let sum = Expr::binary(ExprKind::Plus, ident(&t), ident(&p), sp(), Type::unknown());
    let assign = Expr::binary(ExprKind::Assign, ident(&g), sum, sp(), Type::unknown());
    let body = Block {
        frame,
        decls: vec![Variable {
            uid: t.clone(),
            init: None,
        }],
        stats: vec![Statement::Expr(assign)],
    };

    let mut system = System::new();
    system.global.decls.push(Decl::Variable(Variable {
        uid: g.clone(),
        init: None,
    }));
    system.global.decls.push(Decl::Function(Function {
        uid: f,
        body,
        changes: IndexSet::new(),
        depends: IndexSet::new(),
    }));

    assert!(check_system(&mut system), "{:?}", messages(&system));
    let Decl::Function(fun) = &system.global.decls[1] else {
        panic!("function expected");
    };
    assert!(fun.changes.contains(&g));
    assert!(fun.depends.contains(&g));
    assert!(!fun.changes.contains(&t) && !fun.changes.contains(&p));
    assert!(!fun.depends.contains(&t) && !fun.depends.contains(&p));
}

fn simulate_query(runs: i64, monitored: Expr) -> Expr {
    Expr::nary(
        ExprKind::Simulate,
        vec![
            Expr::int_constant(runs, sp()),
            Expr::int_constant(1, sp()),
            Expr::int_constant(10, sp()),
            monitored,
        ],
        sp(),
        Type::unknown(),
    )
}

#[test]
fn test_simulate_query_accepted() {
    let x = Symbol::new("x", clock());
    let mut system = System::new();
    system.queries.push(simulate_query(100, ident(&x)));

    assert!(check_system(&mut system), "{:?}", messages(&system));
    assert!(system.queries[0].ty.is_formula());
}

#[test]
fn test_simulate_with_zero_runs_rejected() {
    let x = Symbol::new("x", clock());
    let mut system = System::new();
    system.queries.push(simulate_query(0, ident(&x)));

    assert!(!check_system(&mut system));
    assert!(messages(&system).contains(&"$Invalid_run_count".to_string()));
}

#[test]
fn test_spawn_of_undefined_template_rejected() {
    let mut t = template("T");
    t.inst.parameters.declare("id", int());
    t.inst.unbound = 1;
    t.dynamic = true;
    t.defined = false;
    let mut system = System::new();
    system.dynamic_templates.push(t);

    let template_ref = Symbol::new("T", Type::instance(vec![int()]));
    let mut spawn = Expr::nary(
        ExprKind::Spawn,
        vec![ident(&template_ref), Expr::int_constant(1, sp())],
        sp(),
        Type::unknown(),
    );

    let mut checker = TypeChecker::new(&system, false);
    assert!(!checker.check_expression(&mut spawn));
    let diags = checker.take_diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].message, "Template is only declared - not defined");
}

#[test]
fn test_spawn_of_static_template_rejected() {
    let mut system = System::new();
    system.templates.push(template("S"));

    let template_ref = Symbol::new("S", Type::instance(vec![]));
    let mut spawn = Expr::nary(
        ExprKind::Spawn,
        vec![ident(&template_ref)],
        sp(),
        Type::unknown(),
    );

    let mut checker = TypeChecker::new(&system, false);
    assert!(!checker.check_expression(&mut spawn));
    let diags = checker.take_diagnostics();
    assert_eq!(
        diags[0].message,
        "Appears as an attempt to spawn a non-dynamic template"
    );
}

#[test]
fn test_mixed_io_and_csp_sync_rejected() {
    let a = Symbol::new("a", Type::primitive(TypeKind::Channel));
    let b = Symbol::new("b", Type::primitive(TypeKind::Channel));

    let mut t = template("T");
    t.states.push(location("s", None));
    t.edges
        .push(edge(None, Some(Expr::sync(ident(&a), SyncFlavor::Bang, sp()))));
    t.edges
        .push(edge(None, Some(Expr::sync(ident(&b), SyncFlavor::Csp, sp()))));
    let mut system = System::new();
    system.templates.push(t);

    assert!(!check_system(&mut system));
    assert!(messages(&system).contains(&"$Assumed_IO_but_found_CSP_synchronization".to_string()));
    assert_eq!(system.facts.sync_used, SyncUsage::Io);
}

#[test]
fn test_record_initialiser_reordered() {
    // struct { int x; int y; } r = { y = 1, x = 2 };
    let record = Type::record(vec![("x".into(), int()), ("y".into(), int())], sp());
    let list_ty = Type::list(vec![("y".into(), int()), ("x".into(), int())], sp());
    let init = Expr::nary(
        ExprKind::List,
        vec![Expr::int_constant(1, sp()), Expr::int_constant(2, sp())],
        sp(),
        list_ty,
    );
    let r = Symbol::new("r", record);

    let mut system = System::new();
    system.global.decls.push(Decl::Variable(Variable {
        uid: r,
        init: Some(init),
    }));

    assert!(check_system(&mut system), "{:?}", messages(&system));
    let Decl::Variable(var) = &system.global.decls[0] else {
        panic!("variable expected");
    };
    let init = var.init.as_ref().expect("initialiser kept");
    assert!(init.ty.is_record());
    assert_eq!(init.size(), 2);
    assert_eq!(init.get(0).int_value(), Some(2), "x comes first");
    assert_eq!(init.get(1).int_value(), Some(1), "y comes second");
}

#[test]
fn test_incomplete_record_initialiser_rejected() {
    let record = Type::record(vec![("x".into(), int()), ("y".into(), int())], sp());
    let list_ty = Type::list(vec![("x".into(), int())], sp());
    let init = Expr::nary(
        ExprKind::List,
        vec![Expr::int_constant(2, sp())],
        sp(),
        list_ty,
    );
    let r = Symbol::new("r", record);

    let mut system = System::new();
    system.global.decls.push(Decl::Variable(Variable {
        uid: r,
        init: Some(init),
    }));

    assert!(!check_system(&mut system));
    assert!(messages(&system).contains(&"$Incomplete_initialiser".to_string()));
}

#[test]
fn test_unknown_field_in_initialiser_rejected() {
    let record = Type::record(vec![("x".into(), int())], sp());
    let list_ty = Type::list(vec![("z".into(), int())], sp());
    let init = Expr::nary(
        ExprKind::List,
        vec![Expr::int_constant(2, sp())],
        sp(),
        list_ty,
    );
    let r = Symbol::new("r", record);

    let mut system = System::new();
    system.global.decls.push(Decl::Variable(Variable {
        uid: r,
        init: Some(init),
    }));

    assert!(!check_system(&mut system));
    assert!(messages(&system).contains(&"$Unknown_field".to_string()));
}

#[test]
fn test_nesting_of_path_quantifiers_rejected() {
    // E<> (E<> true) — the inner quantifier is a formula, not a constraint.
    let inner = Expr::unary(
        ExprKind::Ef,
        Expr::bool_constant(true, sp()),
        sp(),
        Type::unknown(),
    );
    let outer = Expr::unary(ExprKind::Ef, inner, sp(), Type::unknown());
    let mut system = System::new();
    system.queries.push(outer);

    assert!(!check_system(&mut system));
    assert!(messages(&system)
        .contains(&"$Nesting_of_path_quantifiers_is_not_allowed".to_string()));
}

#[test]
fn test_reachability_query_accepted() {
    // E<> x > 2 with a clock x: the comparison is a constraint-compatible
    // invariant, so nesting passes and the query is a formula.
    let x = Symbol::new("x", clock());
    let cmp = Expr::binary(
        ExprKind::Gt,
        ident(&x),
        Expr::int_constant(2, sp()),
        sp(),
        Type::unknown(),
    );
    let query = Expr::unary(ExprKind::Ef, cmp, sp(), Type::unknown());
    let mut system = System::new();
    system.queries.push(query);

    assert!(check_system(&mut system), "{:?}", messages(&system));
    assert!(system.queries[0].ty.is_formula());
    assert_fully_typed(&system.queries[0]);
}

#[test]
fn test_property_with_side_effect_rejected() {
    let v = Symbol::new("v", int());
    let assign = Expr::binary(
        ExprKind::Assign,
        ident(&v),
        Expr::int_constant(1, sp()),
        sp(),
        Type::unknown(),
    );
    let query = Expr::unary(ExprKind::Ef, assign, sp(), Type::unknown());
    let mut system = System::new();
    system.queries.push(query);

    assert!(!check_system(&mut system));
    assert!(messages(&system).contains(&"$Property_must_be_side-effect_free".to_string()));
}

#[test]
fn test_free_process_parameters_checked() {
    // An unbound ref parameter is rejected.
    let mut process = Instance::plain(Symbol::new("P", Type::process(vec![])));
    process.parameters.declare("p", int().prefixed(TypeKind::Ref));
    process.unbound = 1;
    let mut system = System::new();
    system.processes.push(process);

    assert!(!check_system(&mut system));
    assert!(messages(&system)
        .contains(&"$Free_process_parameters_must_be_a_bounded_integer_or_a_scalar".to_string()));
}

#[test]
fn test_instance_argument_discipline() {
    // Passing a plain variable by value is rejected, a constant accepted.
    let n = Symbol::new("n", int().prefixed(TypeKind::Const));
    let v = Symbol::new("v", int());

    let build = |arg: Expr| {
        let param_ty = int();
        let mut inst = Instance::plain(Symbol::new("I", Type::instance(vec![])));
        let param = inst.parameters.declare("p", param_ty);
        inst.arguments = 1;
        inst.mapping.insert(param, arg);
        inst
    };

    let mut system = System::new();
    system.global.decls.push(Decl::Variable(Variable {
        uid: n.clone(),
        init: Some(Expr::int_constant(5, sp())),
    }));
    system.global.decls.push(Decl::Variable(Variable {
        uid: v.clone(),
        init: None,
    }));
    system.instances.push(build(ident(&n)));
    system.instances.push(build(ident(&v)));

    assert!(!check_system(&mut system));
    assert_eq!(messages(&system), vec!["$Incompatible_argument".to_string()]);
}

#[test]
fn test_exit_outside_dynamic_template_rejected() {
    let system = System::new();
    let mut checker = TypeChecker::new(&system, false);
    let mut exit = Expr::new(ExprKind::Exit, Vec::new(), sp(), Type::unknown());
    assert!(!checker.check_expression(&mut exit));
    let diags = checker.take_diagnostics();
    assert_eq!(
        diags[0].message,
        "Exit can only be used in templates declared as dynamic"
    );
}

#[test]
fn test_computability_follows_function_reads() {
    // int v; int f() { return v; } const int c = f();
    // The call itself is fine, but f reads a non-constant, so the constant
    // initialiser is not computable.
    let v = Symbol::new("v", int());
    let f = Symbol::new("f", Type::function(int(), vec![]));
    let body = Block {
        frame: Frame::new(),
        decls: Vec::new(),
        stats: vec![Statement::Return(Some(ident(&v)))],
    };
    let c = Symbol::new("c", int().prefixed(TypeKind::Const));
    let call = Expr::call(ident(&f), Vec::new(), sp());

    let mut system = System::new();
    system.global.decls.push(Decl::Variable(Variable {
        uid: v,
        init: None,
    }));
    system.global.decls.push(Decl::Function(Function {
        uid: f,
        body,
        changes: IndexSet::new(),
        depends: IndexSet::new(),
    }));
    system.global.decls.push(Decl::Variable(Variable {
        uid: c,
        init: Some(call),
    }));

    assert!(!check_system(&mut system));
    assert!(messages(&system).contains(&"$Must_be_computable_at_compile_time".to_string()));
}

#[test]
fn test_constant_fed_function_call_is_computable() {
    // const int k = 2; int g() { return k; } const int c = g();
    let k = Symbol::new("k", int().prefixed(TypeKind::Const));
    let g = Symbol::new("g", Type::function(int(), vec![]));
    let body = Block {
        frame: Frame::new(),
        decls: Vec::new(),
        stats: vec![Statement::Return(Some(ident(&k)))],
    };
    let c = Symbol::new("c", int().prefixed(TypeKind::Const));
    let call = Expr::call(ident(&g), Vec::new(), sp());

    let mut system = System::new();
    system.global.decls.push(Decl::Variable(Variable {
        uid: k,
        init: Some(Expr::int_constant(2, sp())),
    }));
    system.global.decls.push(Decl::Function(Function {
        uid: g,
        body,
        changes: IndexSet::new(),
        depends: IndexSet::new(),
    }));
    system.global.decls.push(Decl::Variable(Variable {
        uid: c,
        init: Some(call),
    }));

    assert!(check_system(&mut system), "{:?}", messages(&system));
}

#[test]
fn test_refinement_mode_warns_on_controllable_output() {
    let a = Symbol::new("a", Type::primitive(TypeKind::Channel));
    let mut t = template("T");
    t.edges
        .push(edge(None, Some(Expr::sync(ident(&a), SyncFlavor::Bang, sp()))));
    let mut system = System::new();
    system.templates.push(t);

    assert!(crate::check::check_system_with(&mut system, true));
    assert!(warnings(&system)
        .contains(&"$Outputs_should_be_uncontrollable_for_refinement_checking".to_string()));
}
