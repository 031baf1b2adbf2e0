use script_executor::{self as sx, Binding, Context, EvalError, Executor, ScriptExecutor};
use serde_json::json;

// An undefined name is never silently turned into null.
#[test]
fn test_undefined_variable_fails() {
    let err = sx::execute("missing + 1", &Binding::new()).unwrap_err();
    assert!(
        matches!(err, EvalError::MissingProperty(ref name) if name == "missing"),
        "unexpected error: {err}"
    );
}

#[test]
fn test_syntax_error_is_reported_and_executor_stays_usable() {
    let err = sx::execute("1 +* 2", &Binding::new()).unwrap_err();
    assert!(matches!(err, EvalError::Parse(_)), "unexpected error: {err}");
    assert!(err.to_string().starts_with("parse error:"));

    let binding: Binding = [("x", json!(5))].into_iter().collect();
    assert_eq!(sx::execute("x+1", &binding).unwrap(), json!(6));
}

#[test]
fn test_unterminated_interpolation() {
    let err = sx::execute(r#""value is ${x""#, &Binding::new()).unwrap_err();
    assert!(matches!(err, EvalError::Parse(_)), "unexpected error: {err}");
}

#[test]
fn test_runtime_faults_propagate() {
    let binding: Binding = [("user", json!(null))].into_iter().collect();
    for script in ["10 / (5 - 5)", "user.name", "'abc'.substring(2, 1)", "[1] < [2]"] {
        let err = sx::execute(script, &binding).unwrap_err();
        assert!(matches!(err, EvalError::Runtime(_)), "{script}: {err}");
    }
}

#[test]
fn test_unknown_method() {
    let err = sx::execute("'abc'.reverse()", &Binding::new()).unwrap_err();
    assert_eq!(err.to_string(), "no such method: reverse with 1 argument(s)");
}

#[test]
fn test_deep_nesting_is_rejected_before_it_exhausts_the_stack() {
    let n = 100_000;
    let parens = format!("{}1{}", "(".repeat(n), ")".repeat(n));
    let lists = format!("{}{}", "[".repeat(n), "]".repeat(n));
    let negations = format!("{}1", "!".repeat(n));
    for script in [&parens, &lists, &negations] {
        let err = sx::execute(script, &Binding::new()).unwrap_err();
        assert!(err.to_string().contains("nesting too deep"), "unexpected error: {err}");
    }
    assert_eq!(sx::execute("((1 + 2)) * 3", &Binding::new()).unwrap(), json!(9));
}

#[test]
fn test_nesting_limit_follows_the_context() {
    let shallow = ScriptExecutor::default().with_context(Context {
        max_depth: 4,
        ..Context::default()
    });
    assert_eq!(shallow.context().max_depth, 4);
    assert_eq!(shallow.execute("(1)", &Binding::new()).unwrap(), json!(1));
    let err = shallow.execute("((((1))))", &Binding::new()).unwrap_err();
    assert!(matches!(err, EvalError::Parse(_)), "unexpected error: {err}");
}
