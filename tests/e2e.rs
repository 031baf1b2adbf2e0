use pretty_assertions::assert_eq;
use script_executor::{self as sx, Binding, Executor, ScriptExecutor};
use serde_json::json;

fn bind(v: serde_json::Value) -> Binding {
    Binding::try_from(v).unwrap()
}

#[test]
fn test_numeric_literal_stays_numeric() {
    let out = sx::execute("1+1", &Binding::new()).unwrap();
    assert_eq!(out, json!(2));
    assert!(out.is_i64());
}

#[test]
fn test_binding_variable_is_visible() {
    let out = sx::execute("x+1", &bind(json!({"x": 5}))).unwrap();
    assert_eq!(out, json!(6));
}

#[test]
fn test_interpolated_result_becomes_plain_string() {
    let binding = bind(json!({"x": "ok"}));
    let raw = ScriptExecutor::instance()
        .evaluate_raw(r#""value is ${x}""#, &binding)
        .unwrap();
    assert!(raw.is_interpolated());
    match &raw {
        sx::ScriptValue::Interpolated(g) => {
            assert_eq!(g.strings(), ["value is ".to_string(), String::new()]);
            assert_eq!(g.values(), [json!("ok")]);
        }
        other => panic!("expected an interpolated string, got {other:?}"),
    }

    let out = sx::execute(r#""value is ${x}""#, &binding).unwrap();
    assert_eq!(out, json!("value is ok"));
    assert!(out.is_string());
}

#[test]
fn test_short_placeholder_form() {
    let out = sx::execute(r#""Hello $name.first!""#, &bind(json!({"name": {"first": "Ada"}}))).unwrap();
    assert_eq!(out, json!("Hello Ada!"));
}

#[test]
fn test_non_string_results_pass_through() {
    let binding = bind(json!({"roles": ["a", "b"], "active": true}));
    assert_eq!(sx::execute("roles", &binding).unwrap(), json!(["a", "b"]));
    assert_eq!(sx::execute("!active", &binding).unwrap(), json!(false));
    assert_eq!(sx::execute("[n: roles.size()]", &binding).unwrap(), json!({"n": 2}));
    assert_eq!(sx::execute("'single'", &binding).unwrap(), json!("single"));
}

#[test]
fn test_dotted_binding_names_are_groovified() {
    let binding = bind(json!({"user.login": "jdoe", "user.domain": "example.org"}));
    let out = sx::execute(r#""${user_login}@${user_domain}""#, &binding).unwrap();
    assert_eq!(out, json!("jdoe@example.org"));
}

#[test]
fn test_groovify_can_be_switched_off() {
    let ctx = sx::Context {
        groovify_names: false,
        ..Default::default()
    };
    let executor = ScriptExecutor::default().with_context(ctx);
    let binding = bind(json!({"user.login": "jdoe", "login": "plain"}));
    assert!(matches!(
        executor.execute("user_login", &binding),
        Err(sx::EvalError::MissingProperty(_))
    ));
    assert_eq!(executor.execute("login", &binding).unwrap(), json!("plain"));
}

#[test]
fn test_script_assignments_do_not_touch_the_binding() {
    let binding = bind(json!({"x": 1}));
    let out = sx::execute("x = x + 41\nx", &binding).unwrap();
    assert_eq!(out, json!(42));
    assert_eq!(binding.get("x"), Some(&json!(1)));
    assert_eq!(sx::execute("x", &binding).unwrap(), json!(1));
}

#[test]
fn test_multi_statement_attribute_script() {
    let script = r#"
        // derive an account name from the identity attributes
        def first = givenName.trim().toLowerCase()
        def last = sn.trim().toLowerCase()
        def base = first.substring(0, 1) + last
        return suffix ? "${base}${suffix}" : base
    "#;
    let out = sx::execute(script, &bind(json!({"givenName": " Grace ", "sn": "Hopper", "suffix": null}))).unwrap();
    assert_eq!(out, json!("ghopper"));
    let out = sx::execute(script, &bind(json!({"givenName": "Grace", "sn": "Hopper", "suffix": 2}))).unwrap();
    assert_eq!(out, json!("ghopper2"));
}

#[test]
fn test_custom_function_through_injected_executor() {
    struct Initials;
    impl sx::Function for Initials {
        fn name(&self) -> &'static str { "initials" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[serde_json::Value]) -> sx::Result<serde_json::Value> {
            let s = args[0].as_str().unwrap_or_default();
            Ok(json!(s.split_whitespace().filter_map(|w| w.chars().next()).collect::<String>()))
        }
    }
    let mut registry = sx::Registry::with_builtins();
    registry.register(Initials);
    let executor = ScriptExecutor::new(registry);
    assert!(executor.registry().get("initials").is_some());
    assert!(executor.registry().get("trim").is_some());
    assert_eq!(executor.context(), &sx::Context::default());
    assert!(ScriptExecutor::instance().registry().get("initials").is_none());
    assert_eq!(
        executor.execute("initials(name)", &bind(json!({"name": "Ada King Lovelace"}))).unwrap(),
        json!("AKL")
    );
    // the shared instance is unaffected
    assert!(sx::execute("initials('a b')", &Binding::new()).is_err());
}
