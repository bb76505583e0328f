use curly::{Options, Value};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::json;

/// Generate n random profiles to use in the benchmark
pub fn generate_random_contexts(n: usize) -> Vec<serde_json::Value> {
    let mut rng = StdRng::seed_from_u64(42); // Fixed seed for reproducibility
    let mut contexts = Vec::with_capacity(n);

    for _ in 0..n {
        let name = random_string(&mut rng, 5, 10);
        let age = rng.random_range(18..80);
        let is_active = rng.random_bool(0.7);

        let items_count = rng.random_range(0..10);
        let mut items = Vec::with_capacity(items_count);
        for _ in 0..items_count {
            let item_name = random_string(&mut rng, 3, 8);
            let item_value = rng.random_range(10..1000);
            items.push(json!({
                "name": format!("<{item_name}>"),
                "value": item_value,
                "special": rng.random_bool(0.3)
            }));
        }

        contexts.push(json!({
            "user": {
                "name": name,
                "age": age,
                "active": is_active
            },
            "items": items,
            "show_details": rng.random_bool(0.8),
        }));
    }

    contexts
}

/// Converts a JSON document into a presenter value.
pub fn to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map_or_else(|| Value::Float(n.as_f64().unwrap_or_default()), Value::Int),
        serde_json::Value::String(s) => Value::from(s.as_str()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(to_value).collect()),
        serde_json::Value::Object(map) => map.iter().map(|(k, v)| (k.as_str(), to_value(v))).collect(),
    }
}

/// The top-level keys of a JSON object as presenter options.
pub fn to_options(json: &serde_json::Value) -> Options {
    json.as_object()
        .map(|map| {
            map.iter()
                .map(|(k, v)| (k.clone(), to_value(v)))
                .collect()
        })
        .unwrap_or_default()
}

/// Generate a random string with length between min and max
fn random_string(rng: &mut StdRng, min_len: usize, max_len: usize) -> String {
    let charset = "abcdefghijklmnopqrstuvwxyz";
    let len = rng.random_range(min_len..=max_len);

    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..charset.len());
            charset.chars().nth(idx).unwrap()
        })
        .collect()
}
