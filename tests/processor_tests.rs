use idp_mapping::{
    ErrorKind, EvalError, MappingTable, Namespace, RuleProcessor, RuleSet, Value,
};
use serde_json::json;

fn processor(rules: serde_json::Value) -> RuleProcessor {
    RuleProcessor::new(RuleSet::from_json(rules).unwrap())
}

fn process(rules: serde_json::Value, assertion: serde_json::Value) -> Option<serde_json::Value> {
    let assertion = Value::from_json(assertion).unwrap();
    processor(rules)
        .process(&assertion)
        .unwrap()
        .map(|mapped| Value::Map(mapped).to_json())
}

fn process_err(rules: serde_json::Value, assertion: serde_json::Value) -> EvalError {
    let assertion = Value::from_json(assertion).unwrap();
    processor(rules).process(&assertion).unwrap_err()
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn test_group_membership_grants_role() {
    let rules = json!([{
        "statement_blocks": [[
            ["in", "admin", "$assertion[groups]"],
            ["exit", "rule_succeeds", "if_success"]
        ]],
        "mapping": {"role": "admin"}
    }]);
    let result = process(rules, json!({"user": "alice", "groups": ["eng", "admin"]}));
    assert_eq!(result, Some(json!({"role": "admin"})));
}

#[test]
fn test_exit_only_fires_when_condition_holds() {
    let rules = json!([{
        "statement_blocks": [[
            ["compare", "$assertion[user]", "==", "bob"],
            ["exit", "rule_fails", "if_not_success"],
            ["exit", "rule_succeeds", "always"]
        ]],
        "mapping": {"user": "$assertion[user]"}
    }]);

    assert_eq!(process(rules.clone(), json!({"user": "bob"})), Some(json!({"user": "bob"})));
    assert_eq!(process(rules, json!({"user": "alice"})), None);
}

#[test]
fn test_fall_through_after_false_test() {
    // exit(rule_fails, if_success) does not fire because the compare failed,
    // so the following unconditional exit decides the rule.
    let rules = json!([{
        "statement_blocks": [[
            ["compare", "$assertion[user]", "==", "bob"],
            ["exit", "rule_fails", "if_success"],
            ["exit", "rule_succeeds", "always"]
        ]],
        "mapping": {"ok": true}
    }]);
    assert_eq!(process(rules, json!({"user": "alice"})), Some(json!({"ok": true})));
}

#[test]
fn test_regexp_no_match_interpolates_empty_map() {
    let rules = json!([{
        "statement_blocks": [[
            ["regexp", "$assertion[email]", "^(?<user>[^@]+)@(?<domain>.+)$"],
            ["interpolate", "$out", "user=${regexp_map}"]
        ]],
        "mapping": {"out": "$out"}
    }]);
    let result = process(rules, json!({"email": "not-an-email"}));
    assert_eq!(result, Some(json!({"out": "user={}"})));
}

#[test]
fn test_regexp_match_feeds_mapping() {
    let rules = json!([{
        "statement_blocks": [[
            ["regexp", "$assertion[email]", "^(?<user>[^@]+)@(?<domain>.+)$"],
            ["exit", "rule_fails", "if_not_success"],
            ["set", "$name", "$regexp_map[user]"],
            ["upper", "$realm", "$regexp_array[2]"]
        ]],
        "mapping": {"name": "$name", "realm": "$realm"}
    }]);
    let result = process(rules, json!({"email": "alice@example.org"}));
    assert_eq!(result, Some(json!({"name": "alice", "realm": "EXAMPLE.ORG"})));
}

#[test]
fn test_no_rule_matches() {
    let rules = json!([
        {"statement_blocks": [[["exit", "rule_fails", "always"]]], "mapping": {"a": 1}},
        {"statement_blocks": [[
            ["in", "root", "$assertion[groups]"],
            ["exit", "rule_fails", "if_not_success"]
        ]], "mapping": {"a": 2}}
    ]);
    assert_eq!(process(rules, json!({"groups": ["eng"]})), None);
}

#[test]
fn test_empty_rule_set_has_no_result() {
    assert_eq!(process(json!([]), json!({})), None);
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_first_successful_rule_wins() {
    let rules = json!([
        {"statement_blocks": [[["exit", "rule_fails", "always"]]], "mapping": {"rule": 0}},
        {"statement_blocks": [[["exit", "rule_succeeds", "always"]]], "mapping": {"rule": 1}},
        {"statement_blocks": [], "mapping": {"rule": 2}}
    ]);
    assert_eq!(process(rules, json!({})), Some(json!({"rule": 1})));
}

#[test]
fn test_rule_without_exit_succeeds() {
    let rules = json!([{"statement_blocks": [[["set", "$x", 1]]], "mapping": {"x": "$x"}}]);
    assert_eq!(process(rules, json!({})), Some(json!({"x": 1})));
}

#[test]
fn test_continue_skips_rest_of_block_only() {
    let rules = json!([{
        "statement_blocks": [
            [
                ["set", "$path", "first"],
                ["continue", "always"],
                ["set", "$path", "skipped"]
            ],
            [
                ["append", "$trail", "never"]
            ]
        ],
        "mapping": {"path": "$path"}
    }]);
    // Block 1 runs after the continue and fails on the unbound $trail.
    let err = process_err(rules, json!({}));
    assert_eq!(err.kind(), ErrorKind::UndefinedValue);

    let rules = json!([{
        "statement_blocks": [
            [
                ["set", "$path", "first"],
                ["continue", "always"],
                ["set", "$path", "skipped"]
            ],
            [
                ["interpolate", "$path", "${path}-second"]
            ]
        ],
        "mapping": {"path": "$path"}
    }]);
    assert_eq!(process(rules, json!({})), Some(json!({"path": "first-second"})));
}

#[test]
fn test_reserved_variables_are_seeded() {
    let rules = json!([
        {"statement_blocks": [[["exit", "rule_fails", "always"]]], "mapping": {}},
        {
            "name": "second",
            "statement_blocks": [
                [["set", "$x", 0]],
                [
                    ["set", "$x", 0],
                    ["interpolate", "$where", "${rule_number}/${rule_name}/${block_number}/${statement_number}"]
                ]
            ],
            "mapping": {"where": "$where", "block_name": "$block_name"}
        }
    ]);
    assert_eq!(
        process(rules, json!({})),
        Some(json!({"where": "1/second/1/1", "block_name": ""}))
    );
}

#[test]
fn test_success_flag_carries_into_next_rule() {
    // Rule 0 leaves the flag false; rule 1 consults it before running any test.
    let rules = json!([
        {"statement_blocks": [[
            ["compare", 1, "==", 2],
            ["exit", "rule_fails", "always"]
        ]], "mapping": {}},
        {"statement_blocks": [[
            ["exit", "rule_succeeds", "if_not_success"],
            ["exit", "rule_fails", "always"]
        ]], "mapping": {"carried": true}}
    ]);
    assert_eq!(process(rules, json!({})), Some(json!({"carried": true})));
}

#[test]
fn test_assertion_is_copied_per_rule() {
    let rules = json!([
        {"statement_blocks": [[
            ["append", "$assertion[groups]", "admin"],
            ["exit", "rule_fails", "always"]
        ]], "mapping": {}},
        {"statement_blocks": [[
            ["in", "admin", "$assertion[groups]"],
            ["exit", "rule_fails", "if_success"]
        ]], "mapping": {"groups": "$assertion[groups]"}}
    ]);
    let assertion = Value::from_json(json!({"groups": ["eng"]})).unwrap();
    let result = processor(rules).process(&assertion).unwrap().unwrap();
    assert_eq!(Value::Map(result).to_json(), json!({"groups": ["eng"]}));
    assert_eq!(assertion.to_json(), json!({"groups": ["eng"]}));
}

// ============================================================================
// Mappings
// ============================================================================

#[test]
fn test_named_mapping() {
    let rules = RuleSet::from_json(json!([{
        "statement_blocks": [[["set", "$user", "$assertion[sub]"]]],
        "mapping_name": "basic"
    }]))
    .unwrap();
    let mappings = MappingTable::from_json(json!({
        "basic": {"user": "$user", "domain": "sdn", "roles": ["user"]}
    }))
    .unwrap();

    let mapped = RuleProcessor::new(rules)
        .with_mappings(mappings)
        .process_json(r#"{"sub": "carol"}"#)
        .unwrap()
        .unwrap();
    assert_eq!(
        Value::Map(mapped).to_json(),
        json!({"user": "carol", "domain": "sdn", "roles": ["user"]})
    );
}

#[test]
fn test_inline_mapping_wins_over_named() {
    let rules = RuleSet::from_json(json!([{
        "statement_blocks": [],
        "mapping": {"from": "inline"},
        "mapping_name": "other"
    }]))
    .unwrap();
    let mapped = RuleProcessor::new(rules).process_json("{}").unwrap().unwrap();
    assert_eq!(mapped["from"], Value::from("inline"));
}

#[test]
fn test_mapping_keeps_key_order() {
    let rules = json!([{"statement_blocks": [], "mapping": {"z": 1, "a": 2, "m": 3}}]);
    let mapped = processor(rules).process_json("{}").unwrap().unwrap();
    let keys: Vec<&str> = mapped.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["z", "a", "m"]);
}

#[test]
fn test_missing_or_unknown_mapping_is_invalid_rule() {
    let err = process_err(json!([{"statement_blocks": []}]), json!({}));
    assert_eq!(err.kind(), ErrorKind::InvalidRule);

    let err = process_err(json!([{"statement_blocks": [], "mapping_name": "nope"}]), json!({}));
    assert_eq!(err.kind(), ErrorKind::InvalidRule);
    assert!(err.to_string().contains("nope"));
}

#[test]
fn test_mapping_resolution_failure_surfaces() {
    let err = process_err(
        json!([{"statement_blocks": [], "mapping": {"user": "$assertion[missing]"}}]),
        json!({"sub": "x"}),
    );
    assert_eq!(err.kind(), ErrorKind::UndefinedValue);
    assert!(matches!(err, EvalError::Mapping { ref key, .. } if key == "user"));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_error_aborts_whole_evaluation() {
    let rules = json!([
        {"statement_blocks": [[["compare", "$assertion[user]", "==", 5]]], "mapping": {}},
        {"statement_blocks": [], "mapping": {"never": "reached"}}
    ]);
    let err = process_err(rules, json!({"user": "alice"}));
    assert_eq!(err.kind(), ErrorKind::InvalidType);
}

#[test]
fn test_statement_errors_carry_statement_id() {
    let rules = json!([{
        "name": "lookup",
        "statement_blocks": [[
            ["set", "$x", 1],
            ["set", "$y", "$undefined"]
        ]],
        "mapping": {}
    }]);
    let err = process_err(rules, json!({}));
    assert_eq!(err.kind(), ErrorKind::UndefinedValue);
    let EvalError::Statement { id, statement, .. } = &err else {
        panic!("expected statement context, got {:?}", err);
    };
    assert_eq!(id, r#"<rule [0:"lookup"] block [0:""] statement 1>"#);
    assert_eq!(statement, r#"["set", "$y", "$undefined"]"#);
}

#[test]
fn test_custom_id_formats() {
    let rules = RuleSet::from_json(json!([{
        "statement_blocks": [[["bogus"]]],
        "mapping": {}
    }]))
    .unwrap();
    let processor = RuleProcessor::new(rules)
        .with_statement_id_format("r${rule_number}.b${block_number}.s${statement_number}");
    let err = processor.process_json("{}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRule);
    assert!(err.to_string().starts_with("r0.b0.s0 "));

    let mut ns = Namespace::new();
    ns.insert("rule_number", Value::Integer(4));
    ns.insert("rule_name", Value::from("x"));
    assert_eq!(processor.rule_id(&ns).unwrap(), r#"<rule [4:"x"]>"#);
}

#[test]
fn test_unrepresentable_operand_reports_its_position() {
    let err = RuleSet::from_json(json!([{
        "statement_blocks": [[["set", "$x", u64::MAX]]],
        "mapping": {}
    }]))
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StatementError);
    let EvalError::StatementError { index, source } = &err else {
        panic!("expected statement error, got {:?}", err);
    };
    assert_eq!(*index, 2);
    assert_eq!(source.kind(), ErrorKind::InvalidRule);
}

#[test]
fn test_assertion_must_be_an_object() {
    let processor = processor(json!([{"statement_blocks": [], "mapping": {"a": 1}}]));
    for assertion in ["[1, 2]", r#""alice""#, "null", "3"] {
        let err = processor.process_json(assertion).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRule, "accepted {}", assertion);
    }
    assert!(processor.process_json("{}").unwrap().is_some());
}

#[test]
fn test_missing_statement_blocks_fails_only_when_reached() {
    let rules = json!([
        {"statement_blocks": [], "mapping": {"first": true}},
        {"mapping": {"second": true}}
    ]);
    assert_eq!(process(rules, json!({})), Some(json!({"first": true})));

    let rules = json!([{"mapping": {"only": true}}]);
    let err = process_err(rules, json!({}));
    assert_eq!(err.kind(), ErrorKind::InvalidRule);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_processor_is_shared_across_threads() {
    let processor = processor(json!([{
        "statement_blocks": [[
            ["in", "admin", "$assertion[groups]"],
            ["exit", "rule_fails", "if_not_success"],
            ["append", "$assertion[groups]", "audited"]
        ]],
        "mapping": {"groups": "$assertion[groups]"}
    }]));

    std::thread::scope(|scope| {
        let admin = scope.spawn(|| processor.process_json(r#"{"groups": ["admin"]}"#));
        let guest = scope.spawn(|| processor.process_json(r#"{"groups": ["guest"]}"#));

        let admin = admin.join().unwrap().unwrap().unwrap();
        assert_eq!(
            Value::Map(admin).to_json(),
            json!({"groups": ["admin", "audited"]})
        );
        assert!(guest.join().unwrap().unwrap().is_none());
    });
}
