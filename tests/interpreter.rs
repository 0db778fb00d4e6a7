use pretty_assertions::assert_eq;

use shrav::error::{Result, ShravError};
use shrav::host::CapturedOutput;
use shrav::interpreter::{Interpreter, InterpreterConfig};
use shrav::value::Value;

fn interpreter() -> (Interpreter, CapturedOutput) {
    let output = CapturedOutput::new();
    let config = InterpreterConfig::default().with_output(output.clone());
    (Interpreter::with_config(config), output)
}

fn run(source: &str) -> (Result<Value>, Vec<String>) {
    let (mut interpreter, output) = interpreter();
    let result = interpreter.run_source(source);
    (result, output.lines())
}

fn eval(source: &str) -> Value {
    let (result, _) = run(source);
    result.unwrap_or_else(|e| panic!("program failed: {}", e))
}

fn printed(source: &str) -> Vec<String> {
    let (result, lines) = run(source);
    if let Err(e) = result {
        panic!("program failed: {}", e);
    }
    lines
}

fn error_of(source: &str) -> ShravError {
    match run(source).0 {
        Err(e) => e,
        Ok(value) => panic!("expected an error, got {:?}", value),
    }
}

fn s(text: &str) -> Value {
    Value::Str(text.to_owned())
}

// ───────────────────────────── bindings & functions ─────────────────────────

#[test]
fn assignment_updates_existing_binding() {
    assert_eq!(eval("let x = 5; x = x + 1; x"), Value::Int(6));
    assert_eq!(eval("let x"), Value::Null);
    assert_eq!(eval("let y\ny"), Value::Null);
}

#[test]
fn closures_see_the_live_variable() {
    let source = "
        let x = 1
        fn f() { return x }
        x = 2
        f()
    ";
    assert_eq!(eval(source), Value::Int(2));
}

#[test]
fn parameters_shadow_outer_names() {
    let source = "
        let a = 1
        fn g(a) { a = a + 10; return a }
        [g(5), a]
    ";
    assert_eq!(eval(source), Value::list(vec![Value::Int(15), Value::Int(1)]));
}

#[test]
fn recursion_by_name() {
    let source = "
        fn fib(n) { if n < 2 { return n } return fib(n - 1) + fib(n - 2) }
        fib(15)
    ";
    assert_eq!(eval(source), Value::Int(610));
}

#[test]
fn missing_arguments_are_null_and_extras_ignored() {
    let source = "
        fn pair(a, b) { return [a, b] }
        [pair(1), pair(1, 2, 3)]
    ";
    assert_eq!(
        eval(source),
        Value::list(vec![
            Value::list(vec![Value::Int(1), Value::Null]),
            Value::list(vec![Value::Int(1), Value::Int(2)]),
        ])
    );

    assert_eq!(eval("str()"), s("null"));
    assert_eq!(eval("len(\"abc\", 5)"), Value::Int(3));
}

#[test]
fn closures_capture_their_defining_scope() {
    let source = "
        fn counter() {
            let n = 0
            return () => { n = n + 1; return n }
        }
        let c = counter()
        c(); c()
        let d = counter()
        let result = [c(), d()]
        result
    ";
    assert_eq!(eval(source), Value::list(vec![Value::Int(3), Value::Int(1)]));
}

#[test]
fn function_without_return_yields_null() {
    assert_eq!(eval("fn f() { 1 + 1 }\nf()"), Value::Null);
}

// ───────────────────────────── classes ──────────────────────────────────────

#[test]
fn initializer_sets_fields() {
    let source = "
        class Pt { fn init(v) { this.v = v; } }
        Pt(5).v
    ";
    assert_eq!(eval(source), Value::Int(5));
}

#[test]
fn initializer_always_yields_the_receiver() {
    let source = "
        class A { fn init() { this.k = 1; return 5 } }
        let a = A()
        let result = [type(a), type(a.init())]
        result
    ";
    assert_eq!(eval(source), Value::list(vec![s("A"), s("A")]));
}

#[test]
fn methods_bind_this_and_survive_extraction() {
    let source = "
        class Counter {
            fn init() { this.n = 0 }
            fn inc() { this.n = this.n + 1; return this }
        }
        let c = Counter()
        c.inc().inc()
        let bump = c.inc
        bump()
        c.n
    ";
    assert_eq!(eval(source), Value::Int(3));
}

#[test]
fn instances_never_share_fields() {
    let source = "
        class Box { fn init(v) { this.v = v } }
        let a = Box(1)
        let b = Box(2)
        a.v = 10
        let result = [a.v, b.v]
        result
    ";
    assert_eq!(eval(source), Value::list(vec![Value::Int(10), Value::Int(2)]));
}

#[test]
fn fields_shadow_methods() {
    let source = "
        class K { fn name() { return \"method\" } }
        let k = K()
        k.name = \"field\"
        k.name
    ";
    assert_eq!(eval(source), s("field"));
}

#[test]
fn property_errors() {
    assert!(matches!(
        error_of("class K {}\nK().missing"),
        ShravError::Attribute(_)
    ));
    assert!(matches!(error_of("let n = 1\nn.x = 2"), ShravError::Attribute(_)));
    assert!(matches!(error_of("5.x"), ShravError::Attribute(_)));
}

// ───────────────────────────── control flow ─────────────────────────────────

#[test]
fn for_loop_is_half_open() {
    assert_eq!(printed("for i in 0..3 { print i }"), vec!["0", "1", "2"]);
    assert!(printed("for i in 3..3 { print i }").is_empty());
    assert!(printed("for i in 5..1 { print i }").is_empty());
}

#[test]
fn for_bounds_are_coerced_to_integers() {
    assert_eq!(printed("for i in 0..2.9 { print i }"), vec!["0", "1"]);
    assert_eq!(printed("for i in \"1\"..\"3\" { print i }"), vec!["1", "2"]);
    assert!(matches!(
        error_of("for i in null..2 { print i }"),
        ShravError::Type(_)
    ));
}

#[test]
fn for_bounds_are_evaluated_once() {
    let source = "
        let n = 3
        for i in 0..n { n = 10; print i }
    ";
    assert_eq!(printed(source), vec!["0", "1", "2"]);
}

#[test]
fn break_and_continue() {
    let source = "
        let i = 0
        while true {
            i = i + 1
            if i == 2 { continue }
            if i > 4 { break }
            print i
        }
        for j in 0..5 { if j == 1 { continue } if j == 3 { break } print j * 10 }
    ";
    assert_eq!(printed(source), vec!["1", "3", "4", "0", "20"]);
}

#[test]
fn return_unwinds_through_loops() {
    let source = "
        fn find() {
            for i in 0..10 { while true { if i == 3 { return i } break } }
            return -1
        }
        find()
    ";
    assert_eq!(eval(source), Value::Int(3));
}

#[test]
fn if_elif_else_runs_first_truthy_branch() {
    let source = "
        fn grade(n) {
            if n > 90 { return \"A\" } elif n > 80 { return \"B\" } elif n > 70 { return \"C\" } else { return \"F\" }
        }
        [grade(95), grade(85), grade(75), grade(10)]
    ";
    assert_eq!(
        eval(source),
        Value::list(vec![s("A"), s("B"), s("C"), s("F")])
    );
}

#[test]
fn block_scopes_do_not_leak() {
    assert!(matches!(
        error_of("if true { let inner = 1 }\ninner"),
        ShravError::Name(_)
    ));
}

#[test]
fn switch_runs_first_equal_case_without_fallthrough() {
    let source = "
        fn name(n) {
            switch n {
                case 1 { return \"one\" }
                case 1.0 { return \"float one\" }
                case \"two\" { return \"two\" }
                default { return \"other\" }
            }
        }
        [name(1), name(\"two\"), name(3)]
    ";
    assert_eq!(
        eval(source),
        Value::list(vec![s("one"), s("two"), s("other")])
    );

    assert!(printed("switch 9 { case 1 { print 1 } }").is_empty());
}

#[test]
fn break_inside_switch_leaves_the_enclosing_loop() {
    let source = "
        for i in 0..5 {
            switch i {
                case 2 { break }
                default { print i }
            }
        }
    ";
    assert_eq!(printed(source), vec!["0", "1"]);
}

// ───────────────────────────── errors & try/catch ───────────────────────────

#[test]
fn try_catch_binds_the_error_message() {
    let (result, lines) = run("try { print y } catch (e) { print e }\nprint \"after\"");
    assert!(result.is_ok());
    assert_eq!(
        lines,
        vec!["NameError: Undefined variable 'y' [line 1]", "after"]
    );
}

#[test]
fn try_cannot_intercept_control_signals() {
    let source = "
        fn f() { try { return 1 } catch (e) { return 2 } return 3 }
        let out = []
        for i in 0..3 { try { if i == 1 { break } out.push(i) } catch (e) { out.push(e) } }
        [f(), out]
    ";
    assert_eq!(
        eval(source),
        Value::list(vec![Value::Int(1), Value::list(vec![Value::Int(0)])])
    );
}

#[test]
fn errors_in_catch_body_propagate() {
    assert!(matches!(
        error_of("try { boom() } catch (e) { also_missing() }"),
        ShravError::Name(msg) if msg.contains("also_missing")
    ));
}

#[test]
fn runtime_error_kinds() {
    assert!(matches!(error_of("z = 1"), ShravError::Name(_)));
    assert!(matches!(error_of("let n = 5\nn[0]"), ShravError::Type(_)));
    assert!(matches!(error_of("5()"), ShravError::Call(_)));
    assert!(matches!(error_of("-\"a\""), ShravError::Type(_)));
    assert!(matches!(error_of("1 < \"a\""), ShravError::Type(_)));
    assert!(matches!(error_of("1 - \"a\""), ShravError::Type(_)));
    assert!(matches!(error_of("[1, 2][5]"), ShravError::Index(_)));
    assert!(matches!(error_of("{a: 1}[\"b\"]"), ShravError::Index(_)));
    assert!(matches!(error_of("[1][\"a\"]"), ShravError::Type(_)));
    assert!(matches!(error_of("let t = \"abc\"\nt[0] = \"x\""), ShravError::Type(_)));
    assert!(matches!(error_of("[].pop()"), ShravError::Index(_)));
}

#[test]
fn call_depth_is_bounded() {
    let output = CapturedOutput::new();
    let config = InterpreterConfig::default()
        .with_output(output)
        .with_max_call_depth(50);
    let mut interpreter = Interpreter::with_config(config);

    let err = interpreter
        .run_source("fn r(n) { return r(n + 1) }\nr(0)")
        .unwrap_err();
    assert!(matches!(&err, ShravError::Call(msg) if msg.contains("Maximum call depth")));

    // still usable afterwards
    assert_eq!(interpreter.run_source("1 + 1").unwrap(), Value::Int(2));
}

#[test]
fn interpreter_survives_errors_and_keeps_globals() {
    let (mut interpreter, _) = interpreter();

    assert_eq!(interpreter.run_source("let a = 1").unwrap(), Value::Null);
    assert!(interpreter.run_source("if true { b }").is_err());
    assert!(interpreter.run_source("let = ").unwrap_err().is_compile_error());
    assert_eq!(interpreter.run_source("a + 1").unwrap(), Value::Int(2));
}

// ───────────────────────────── operators ────────────────────────────────────

#[test]
fn arithmetic_semantics() {
    assert_eq!(eval("10 / 4"), Value::Float(2.5));
    assert_eq!(eval("-7 % 3"), Value::Int(2));
    assert_eq!(eval("7 % -3"), Value::Int(-2));
    assert_eq!(eval("7.5 % 2"), Value::Float(1.5));
    assert_eq!(eval("2 ** -1"), Value::Float(0.5));
    assert_eq!(eval("2 ** 10"), Value::Int(1024));
    assert_eq!(eval("2 ** 0.5 == 2 ** 0.5"), Value::Bool(true));
    assert_eq!(eval("1 + 2.5"), Value::Float(3.5));
    assert!(matches!(eval("9223372036854775807 + 1"), Value::Float(_)));

    assert!(matches!(error_of("1 / 0"), ShravError::ZeroDivision(_)));
    assert!(matches!(error_of("1 % 0"), ShravError::ZeroDivision(_)));
}

#[test]
fn concatenation_and_repetition() {
    assert_eq!(eval("\"a\" + 1"), s("a1"));
    assert_eq!(eval("1.0 + \"a\""), s("1a"));
    assert_eq!(eval("\"x\" + null + true"), s("xnulltrue"));
    assert_eq!(eval("\"ab\" * 3"), s("ababab"));
    assert_eq!(
        eval("[1] + [2] * 2"),
        Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(2)])
    );
    assert_eq!(eval("\"ab\" * -2"), s(""));
    assert_eq!(eval("[] * 9223372036854775807"), Value::list(Vec::new()));
}

#[test]
fn oversized_repetition_is_a_catchable_error() {
    assert!(matches!(
        error_of("let s = \"abc\" * 9223372036854775807"),
        ShravError::Overflow(_)
    ));
    assert!(matches!(
        error_of("[1, 2] * 4611686018427387904"),
        ShravError::Overflow(_)
    ));

    let caught = eval(
        "let m = \"\"\ntry { let s = \"abc\" * 9223372036854775807 } catch (e) { m = e }\nm",
    );
    match caught {
        Value::Str(msg) => assert!(msg.starts_with("OverflowError:"), "{}", msg),
        other => panic!("expected string, got {:?}", other),
    }
}

#[test]
fn equality_and_ordering() {
    assert_eq!(eval("1 == 1.0"), Value::Bool(true));
    assert_eq!(eval("1 == \"1\""), Value::Bool(false));
    assert_eq!(eval("null == null"), Value::Bool(true));
    assert_eq!(eval("[1, [2]] == [1, [2]]"), Value::Bool(true));
    assert_eq!(eval("{a: 1, b: 2} == {b: 2, a: 1}"), Value::Bool(true));
    assert_eq!(eval("\"abc\" < \"abd\""), Value::Bool(true));
    assert_eq!(eval("[1, 2] < [1, 3]"), Value::Bool(true));
    assert_eq!(eval("[1, 2] < [1, 2, 0]"), Value::Bool(true));
    assert_eq!(eval("false < true"), Value::Bool(true));
    assert_eq!(eval("2 >= 2.0"), Value::Bool(true));
}

#[test]
fn logical_operators_short_circuit_and_yield_booleans() {
    assert_eq!(eval("1 and \"x\""), Value::Bool(true));
    assert_eq!(eval("0 or null"), Value::Bool(false));
    assert_eq!(eval("not []"), Value::Bool(true));
    assert_eq!(eval("!\"\""), Value::Bool(true));

    // the right side would raise if evaluated
    assert_eq!(eval("false and missing()"), Value::Bool(false));
    assert_eq!(eval("true or missing()"), Value::Bool(true));
}

#[test]
fn truthiness() {
    let source = "
        let values = [null, false, 0, 0.0, \"\", [], {}, true, 1, \"a\", [0], {k: 0}, len]
        let out = []
        for i in 0..len(values) { if values[i] { out.push(1) } else { out.push(0) } }
        out.join(\"\")
    ";
    assert_eq!(eval(source), s("0000000111111"));
}

// ───────────────────────────── collections ──────────────────────────────────

#[test]
fn indexing_lists_dicts_and_strings() {
    assert_eq!(eval("[1, 2, 3][-1]"), Value::Int(3));
    assert_eq!(eval("\"héllo\"[1]"), s("é"));
    assert_eq!(eval("{a: 1}[\"a\"]"), Value::Int(1));

    let source = "
        let d = {}
        d[\"k\"] = 1
        d[\"k\"] = d[\"k\"] + 1
        let l = [0, 0]
        l[-1] = 5;
        [d, l]
    ";
    let mut dict = shrav::value::Dict::new();
    dict.insert("k".into(), Value::Int(2));
    assert_eq!(
        eval(source),
        Value::list(vec![
            Value::dict(dict),
            Value::list(vec![Value::Int(0), Value::Int(5)]),
        ])
    );
}

#[test]
fn lists_have_reference_semantics() {
    assert_eq!(
        eval("let a = [1]\nlet b = a\nb.push(2)\nlen(a)"),
        Value::Int(2)
    );
}

#[test]
fn builtin_methods() {
    assert_eq!(
        eval("[1, 2, 3].map((x) => x * 2)"),
        Value::list(vec![Value::Int(2), Value::Int(4), Value::Int(6)])
    );
    assert_eq!(eval("[1, 2].contains(2)"), Value::Bool(true));
    assert_eq!(eval("let l = [1, 2]\nl.append(3);\n[l.pop(), l.len()]"),
        Value::list(vec![Value::Int(3), Value::Int(2)])
    );
    assert_eq!(eval("[1, \"a\", null].join(\"-\")"), s("1-a-null"));

    assert_eq!(eval("\"  Hi \".trim().upper()"), s("HI"));
    assert_eq!(eval("\"AbC\".lower()"), s("abc"));
    assert_eq!(
        eval("\"a,b\".split(\",\")"),
        Value::list(vec![s("a"), s("b")])
    );
    assert_eq!(eval("\"haystack\".contains(\"st\")"), Value::Bool(true));
    assert_eq!(eval("\"héllo\".len()"), Value::Int(5));

    assert_eq!(
        eval("let d = {b: 1, a: 2};\n[d.keys(), d.values(), d.has(\"a\"), d.get(\"zz\")]"),
        Value::list(vec![
            Value::list(vec![s("b"), s("a")]),
            Value::list(vec![Value::Int(1), Value::Int(2)]),
            Value::Bool(true),
            Value::Null,
        ])
    );

    assert!(matches!(error_of("[].nope()"), ShravError::Attribute(_)));
}

#[test]
fn global_builtins() {
    assert_eq!(eval("len([1, 2]) + len({a: 1}) + len(\"abc\")"), Value::Int(6));
    assert_eq!(eval("int(\"42\") + int(3.9) + int(null) + int(true)"), Value::Int(46));
    assert_eq!(eval("float(\"2.5\")"), Value::Float(2.5));
    assert_eq!(eval("float(null)"), Value::Float(0.0));
    assert_eq!(eval("str(1.0) + str([1])"), s("1[1]"));
    assert_eq!(
        eval("[type(1), type(1.5), type(\"\"), type(null), type([]), type({}), type(len)]"),
        Value::list(vec![
            s("int"),
            s("float"),
            s("string"),
            s("null"),
            s("list"),
            s("dict"),
            s("native function"),
        ])
    );
    assert_eq!(eval("clock() > 0"), Value::Bool(true));

    assert!(matches!(error_of("len(5)"), ShravError::Type(_)));
    assert!(matches!(error_of("int(\"abc\")"), ShravError::Type(_)));
}

// ───────────────────────────── printing ─────────────────────────────────────

#[test]
fn stringification() {
    let source = r#"
        fn f() {}
        class Pt {}
        print null
        print true
        print 3.0
        print 2.5
        print [1, "a", [null]]
        print {a: 1, b: [2]}
        print f
        print len
        print Pt
        print Pt()
    "#;
    assert_eq!(
        printed(source),
        vec![
            "null",
            "true",
            "3",
            "2.5",
            "[1, a, [null]]",
            "{a: 1, b: [2]}",
            "<fn f>",
            "<native fn len>",
            "Pt",
            "Pt instance",
        ]
    );
}

#[test]
fn self_containing_containers_render_and_compare() {
    let source = r#"
        let a = [1]
        a.push(a)
        let d = {k: 1}
        d["me"] = d
        d["list"] = a
        print a
        print d
        print str(a)
        let b = [1]
        b.push(b)
        print a == b
        print a < b
        print a == a
    "#;
    assert_eq!(
        printed(source),
        vec![
            "[1, [...]]",
            "{k: 1, me: {...}, list: [1, [...]]}",
            "[1, [...]]",
            "true",
            "false",
            "true",
        ]
    );
}

#[test]
fn interpolation_uses_the_active_scope() {
    let source = r#"
        let name = "Ada"
        print "Hi ${name}, ${missing} ${1x} $name"
        fn greet(name) { print "inner ${name}" }
        greet("Bob")
        let items = ["${name}"]
        print items
    "#;
    assert_eq!(
        printed(source),
        vec![
            "Hi Ada, ${missing} ${1x} $name",
            "inner Bob",
            "[Ada]",
        ]
    );
}

#[test]
fn interpolated_values_are_not_rescanned() {
    let source = r#"
        let a = "${a}"
        let b = "<${a}>"
        print "x${a}"
        print "y${b}"
    "#;
    assert_eq!(printed(source), vec!["x${a}", "y<${a}>"]);
}

#[test]
fn concatenation_does_not_interpolate() {
    let source = r#"
        let n = 1
        let t = "${n}" + ""
        t == "${n}"
    "#;
    assert_eq!(eval(source), Value::Bool(true));
}

// ───────────────────────────── with ─────────────────────────────────────────

#[test]
fn with_closes_exactly_once_on_every_exit_path() {
    let source = r#"
        let log = []
        class Res {
            fn init(log) { this.log = log }
            fn close() { this.log.push("closed") }
        }
        with Res(log) as r { log.push("body") }
        for i in 0..3 { with Res(log) as r { break } }
        fn early() { with Res(log) as r { return 1 } }
        early()
        try { with Res(log) as r { boom() } } catch (e) { log.push("caught") }
        log
    "#;
    assert_eq!(
        eval(source),
        Value::list(vec![
            s("body"),
            s("closed"),
            s("closed"),
            s("closed"),
            s("closed"),
            s("caught"),
        ])
    );
}

#[test]
fn close_failure_does_not_mask_body_error() {
    let prelude = "class Bad { fn close() { close_failed() } }\n";

    let err = error_of(&format!("{}with Bad() as b {{ body_failed() }}", prelude));
    assert!(matches!(&err, ShravError::Name(msg) if msg.contains("body_failed")));

    let err = error_of(&format!("{}with Bad() as b {{ 1 }}", prelude));
    assert!(matches!(&err, ShravError::Name(msg) if msg.contains("close_failed")));
}

#[test]
fn with_accepts_resources_without_close() {
    assert_eq!(printed("with 5 as n { print n + 1 }"), vec!["6"]);
}
