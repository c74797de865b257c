use std::cell::RefCell;
use std::rc::Rc;

use ezlang::error::EzError;
use ezlang::eval::host::Host;
use ezlang::eval::value::Value;
use ezlang::eval::Runtime;
use ezlang::span::Position;
use pretty_assertions::assert_eq;

/// Host that records everything the script does to the outside world.
#[derive(Default)]
struct Recorder {
    printed: RefCell<Vec<String>>,
    sent: RefCell<Vec<(String, String)>>,
    reactions: RefCell<Vec<String>>,
}

impl Host for Recorder {
    fn print(&self, text: &str) {
        self.printed.borrow_mut().push(text.to_string());
    }

    fn send(&self, target: &Value, message: &Value) -> Result<(), String> {
        self.sent
            .borrow_mut()
            .push((target.to_string(), message.to_string()));
        Ok(())
    }

    fn reply(&self, target: &Value, message: &Value) -> Result<(), String> {
        self.send(target, message)
    }

    fn react(&self, _target: &Value, emoji: &Value) -> Result<(), String> {
        self.reactions.borrow_mut().push(emoji.to_string());
        Ok(())
    }

    fn load_module(&self, name: &str) -> Result<Value, String> {
        match name {
            "greeter" => Ok(Value::native("hello", |args| {
                Ok(Value::string(format!("hello {}", args[0])))
            })),
            other => Err(format!("unknown module '{}'", other)),
        }
    }
}

fn runtime(source: &str) -> (Runtime, Rc<Recorder>) {
    let program = ezlang::parse_source(source)
        .expect("lexer should succeed")
        .into_result()
        .expect("parser should succeed");
    let recorder = Rc::new(Recorder::default());
    let runtime = Runtime::new(program).with_host(recorder.clone());
    (runtime, recorder)
}

fn run_output(source: &str) -> Vec<String> {
    let (mut rt, recorder) = runtime(source);
    rt.execute().expect("execution should succeed");
    let printed = recorder.printed.borrow().clone();
    printed
}

fn run_err(source: &str) -> EzError {
    let (mut rt, _) = runtime(source);
    rt.execute().expect_err("execution should fail")
}

fn global(source: &str, name: &str) -> Value {
    let (mut rt, _) = runtime(source);
    rt.execute().expect("execution should succeed");
    rt.get_variable(name).expect("variable should be declared")
}

#[test]
fn eval_arithmetic_precedence() {
    assert_eq!(global("var x = 2 + 3 * 4", "x"), Value::Number(14.0));
    assert_eq!(run_output("print(2 + 3 * 4)"), vec!["14"]);
    assert_eq!(run_output("print(10 % 4, 7 / 2, -(1 - 3))"), vec!["2 3.5 2"]);
}

#[test]
fn eval_closure_counter() {
    let src = r#"
function makeCounter() {
    var count = 0
    function inc(n) {
        count = count + n
        return count
    }
    return inc
}
var c = makeCounter()
c(5)
var total = c(10)
"#;
    assert_eq!(global(src, "total"), Value::Number(15.0));
}

#[test]
fn eval_recursive_factorial() {
    let src = r#"
function fact(n) {
    if n <= 1 {
        return 1
    }
    return n * fact(n - 1)
}
print(fact(5))
"#;
    assert_eq!(run_output(src), vec!["120"]);
}

#[test]
fn eval_arrays_are_shared_handles() {
    let src = r#"
var a = [1, 2]
var b = a
push(b, 3)
b[0] = 9
print(a, length(a))
"#;
    assert_eq!(run_output(src), vec!["[9, 2, 3] 3"]);
}

#[test]
fn eval_objects_keep_insertion_order() {
    let src = r#"
var user = { name: "Ada", age: 36 }
user.city = "London"
user["age"] = 37
print(keys(user), user.age, user.missing)
"#;
    assert_eq!(run_output(src), vec!["[name, age, city] 37 null"]);
}

#[test]
fn eval_for_over_range_runs_each_item() {
    let src = r#"
var sum = 0
var count = 0
for i in range(5) {
    sum = sum + i
    count = count + 1
}
"#;
    assert_eq!(global(src, "count"), Value::Number(5.0));
    assert_eq!(global(src, "sum"), Value::Number(10.0));
}

#[test]
fn eval_for_iterates_a_snapshot() {
    let src = r#"
var items = [1, 2]
var seen = 0
for x in items {
    push(items, x)
    seen = seen + 1
}
print(seen, length(items))
"#;
    assert_eq!(run_output(src), vec!["2 4"]);
}

#[test]
fn eval_while_and_else_if() {
    let src = r#"
var n = 0
var out = ""
while n < 3 {
    if n == 0 {
        out = out + "a"
    } else if n == 1 {
        out = out + "b"
    } else {
        out = out + "c"
    }
    n = n + 1
}
"#;
    assert_eq!(global(src, "out"), Value::string("abc"));
}

#[test]
fn eval_block_scoping_shadows_and_assigns_outward() {
    let src = r#"
var x = 1
var y = 1
{
    var x = 2
    y = x
}
print(x, y)
"#;
    assert_eq!(run_output(src), vec!["1 2"]);
}

#[test]
fn eval_string_concatenation() {
    assert_eq!(
        run_output(r#"print("n=" + 1, 2 + "x", "t" + true + null)"#),
        vec!["n=1 2x ttruenull"]
    );
}

#[test]
fn eval_equality_does_not_coerce() {
    let src = r#"
print(1 == "1", null == false, 0 == false, "a" == "a")
print([1, 2] == [1, 2], {a: 1} == {a: 1})
var o = {a: 1}
var p = o
print(o == p, print == print)
"#;
    assert_eq!(
        run_output(src),
        vec![
            "false false false true",
            "true false",
            "true true"
        ]
    );
}

#[test]
fn eval_logic_always_yields_booleans() {
    assert_eq!(
        run_output(r#"print(1 && "x", 0 || "", not 0, !"")"#),
        vec!["true false true true"]
    );
}

#[test]
fn eval_function_without_return_yields_null() {
    let src = r#"
function nothing() {
    var a = 1
}
function early(x) {
    if x { return }
    return 5
}
print(nothing(), early(true), early(false))
"#;
    assert_eq!(run_output(src), vec!["null null 5"]);
}

#[test]
fn eval_top_level_return_is_ignored() {
    assert_eq!(run_output("return 1\nprint(\"after\")"), vec!["after"]);
}

#[test]
fn eval_message_statements_reach_host() {
    let src = r#"
var msg = { channel: "general" }
send msg.channel "hi " + "there"
reply msg "ok"
react msg "+1"
"#;
    let (mut rt, recorder) = runtime(src);
    rt.execute().unwrap();
    assert_eq!(
        *recorder.sent.borrow(),
        vec![
            ("general".to_string(), "hi there".to_string()),
            ("{channel: general}".to_string(), "ok".to_string()),
        ]
    );
    assert_eq!(*recorder.reactions.borrow(), vec!["+1".to_string()]);
}

#[test]
fn eval_listeners_run_on_dispatch() {
    let src = r#"
var greeted = 0
listen "message" (msg) {
    greeted = greeted + 1
    reply msg "pong: " + msg.text
}
listen "join" (user) { }
"#;
    let (mut rt, recorder) = runtime(src);
    rt.execute().unwrap();
    assert_eq!(rt.listener_count("message"), 1);
    assert!(recorder.sent.borrow().is_empty());

    let mut payload = indexmap::IndexMap::new();
    payload.insert("text".to_string(), Value::string("ping"));
    let ran = rt.dispatch("message", Value::object(payload)).unwrap();
    assert_eq!(ran, 1);
    assert_eq!(rt.dispatch("unknown", Value::Null).unwrap(), 0);
    assert_eq!(rt.get_variable("greeted"), Some(Value::Number(1.0)));
    assert_eq!(recorder.sent.borrow()[0].1, "pong: ping");
}

#[test]
fn eval_use_binds_host_module() {
    let (mut rt, recorder) = runtime("use \"greeter\" as greet\nprint(greet(\"bot\"))");
    rt.execute().unwrap();
    assert_eq!(*recorder.printed.borrow(), vec!["hello bot".to_string()]);

    match run_err("use \"nope\" as x") {
        EzError::RuntimeError { message, pos } => {
            assert_eq!(message, "unknown module 'nope'");
            assert_eq!(pos, Position::new(1, 1));
        }
        other => panic!("expected RuntimeError, got {:?}", other),
    }
}

#[test]
fn eval_default_host_has_no_message_bus() {
    let program = ezlang::parse_source("send \"x\" \"y\"")
        .unwrap()
        .into_result()
        .unwrap();
    let err = Runtime::new(program).execute().unwrap_err();
    assert_eq!(err.to_string(), "no message bus attached");
}

#[test]
fn eval_undefined_variable() {
    assert_eq!(
        run_err("var a = 1\nprint(b)"),
        EzError::UndefinedVariable {
            name: "b".into(),
            pos: Position::new(2, 7),
        }
    );
    assert_eq!(
        run_err("z = 3"),
        EzError::UndefinedVariable {
            name: "z".into(),
            pos: Position::new(1, 1),
        }
    );
}

#[test]
fn eval_arity_mismatch() {
    assert_eq!(
        run_err("function f(a) { }\nf(1, 2)"),
        EzError::ArityMismatch {
            name: "f".into(),
            expected: 1,
            found: 2,
            pos: Position::new(2, 2),
        }
    );
}

#[test]
fn eval_index_out_of_bounds() {
    assert_eq!(
        run_err("var a = [1, 2]\na[5]"),
        EzError::IndexOutOfBounds {
            index: 5,
            length: 2,
            pos: Position::new(2, 2),
        }
    );
    assert!(matches!(
        run_err("var a = []\na[-1]"),
        EzError::IndexOutOfBounds { index: -1, length: 0, .. }
    ));
}

#[test]
fn eval_not_callable() {
    assert_eq!(
        run_err("var n = 3\nn()"),
        EzError::NotCallable {
            callee: "n".into(),
            pos: Position::new(2, 2),
        }
    );
}

#[test]
fn eval_type_errors() {
    let err = run_err("var x = null + true");
    assert!(err.is_type_error());
    assert_eq!(err.to_string(), "Cannot add null and boolean");

    let err = run_err("\"a\" < 1");
    assert_eq!(
        err.to_string(),
        "Comparison '<' requires numbers, got string and number"
    );

    let err = run_err("for x in 5 { }");
    assert_eq!(err.to_string(), "for loop expects an array, got number");
}

#[test]
fn eval_native_errors_carry_call_position() {
    match run_err("var a = []\n  pop(a)") {
        EzError::RuntimeError { message, pos } => {
            assert_eq!(message, "Cannot pop from empty array");
            assert_eq!(pos, Position::new(2, 6));
        }
        other => panic!("expected RuntimeError, got {:?}", other),
    }
    match run_err("num(\"abc\")") {
        EzError::TypeMismatch { message, .. } => {
            assert_eq!(message, "Cannot convert 'abc' to number")
        }
        other => panic!("expected TypeMismatch, got {:?}", other),
    }
}

#[test]
fn eval_error_stops_execution() {
    let (mut rt, recorder) = runtime("print(1)\nmissing()\nprint(2)");
    assert!(rt.execute().is_err());
    assert_eq!(*recorder.printed.borrow(), vec!["1".to_string()]);
}

#[test]
fn eval_runaway_recursion_is_a_runtime_error() {
    assert_eq!(
        run_err("function f(n) { return f(n + 1) }\nf(0)").to_string(),
        "maximum call depth of 256 exceeded"
    );
}

#[test]
fn eval_recursion_just_below_the_depth_limit() {
    let src = r#"
function depth(n) {
    if n == 0 {
        return 0
    }
    return 1 + depth(n - 1)
}
var d = depth(250)
"#;
    assert_eq!(global(src, "d"), Value::Number(250.0));
}

#[test]
fn eval_deeply_nested_expression() {
    let src = format!("var x = {}1", "- ".repeat(2_000));
    assert_eq!(global(&src, "x"), Value::Number(1.0));
}

#[test]
fn eval_self_referential_array_prints_and_compares() {
    let src = r#"
var a = [1]
push(a, a)
print(a, a == a)
"#;
    assert_eq!(run_output(src), vec!["[1, [...]] true"]);
}
