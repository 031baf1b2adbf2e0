use script_executor as sx;
use serde_json::json;

fn run(script: &str) -> serde_json::Value {
    sx::execute(script, &sx::Binding::new()).unwrap()
}

#[test]
fn test_string_methods() {
    assert_eq!(run("'Hello'.toUpperCase()"), json!("HELLO"));
    assert_eq!(run("'Hello'.toLowerCase()"), json!("hello"));
    assert_eq!(run("'a-b-c'.replace('-', '.')"), json!("a.b.c"));
    assert_eq!(run("'cn=admin'.startsWith('cn=')"), json!(true));
    assert_eq!(run("'report.csv'.endsWith('.txt')"), json!(false));
    assert_eq!(run("'Hello'.substring(1)"), json!("ello"));
    assert_eq!(run("'a, b'.split(', ')"), json!(["a", "b"]));
    assert_eq!(run("'  a  b '.split()"), json!(["a", "b"]));
    assert_eq!(run("'x'.contains('y')"), json!(false));
    assert_eq!(run("''.isEmpty()"), json!(true));
}

#[test]
fn test_collection_methods() {
    assert_eq!(run("[3, 1, 3].unique()"), json!([3, 1]));
    assert_eq!(run("[3, 1].first()"), json!(3));
    assert_eq!(run("[3, 1].last()"), json!(1));
    assert_eq!(run("[].first()"), json!(null));
    assert_eq!(run("[1, 2].join(',')"), json!("1,2"));
    assert_eq!(run("[1, 2].contains(2.0)"), json!(true));
    assert_eq!(run("[b: 1, a: 2].keySet()"), json!(["b", "a"]));
    assert_eq!(run("([z: 1] + [m: 2] + [a: 3]).keySet()"), json!(["z", "m", "a"]));
    assert_eq!(run("[b: 1, a: 2].toString()"), json!("{\"b\":1,\"a\":2}"));
    assert_eq!(run("[k: 1].contains('k')"), json!(true));
    assert_eq!(run("[:].size()"), json!(0));
}

#[test]
fn test_to_string_renders_any_value() {
    assert_eq!(run("12.toString()"), json!("12"));
    assert_eq!(run("[1, 'a'].toString()"), json!("[1,\"a\"]"));
    assert_eq!(run("toString(true)"), json!("true"));
}

// Property: unique is idempotent
#[test]
fn unique_idempotent_smoke() {
    let once = run("[1, 1, 2, 3, 3].unique()");
    let twice = run("[1, 1, 2, 3, 3].unique().unique()");
    assert_eq!(once, twice);
}
