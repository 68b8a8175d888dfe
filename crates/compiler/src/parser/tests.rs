/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
use super::*;
use crate::ast::{Declaration, Expression, LiteralType, NodeId};
use crate::diagnostics::DiagnosticCollector;
use crate::source::MemoryFileProvider;

fn parse_files(files: &[(&str, &str)]) -> (Option<Ast>, DiagnosticCollector) {
    let mut provider = MemoryFileProvider::new();
    for (path, content) in files {
        provider.insert(*path, *content);
    }
    let mut collector = DiagnosticCollector::new();
    let ast = parse_module(files[0].0, &provider, &mut collector);
    (ast, collector)
}

fn parse_ok(content: &str) -> Ast {
    let (ast, collector) = parse_files(&[("module.yml", content)]);
    assert!(
        !collector.has_errors(),
        "unexpected diagnostics: {:?}",
        collector.diagnostics()
    );
    ast.expect("module should parse")
}

fn parse_err(content: &str) -> Vec<ErrorCode> {
    let (ast, collector) = parse_files(&[("module.yml", content)]);
    assert!(ast.is_none(), "module should not parse");
    collector.diagnostics().iter().map(|d| d.code()).collect()
}

fn items(ast: &Ast) -> Vec<NodeId> {
    let root = ast.root().expect("root");
    match ast.declaration(root) {
        Some(Declaration::Module(module)) => module.items.clone(),
        other => panic!("expected module, found {other:?}"),
    }
}

fn variable_value(ast: &Ast, name: &str) -> NodeId {
    items(ast)
        .into_iter()
        .find_map(|id| match ast.declaration(id) {
            Some(Declaration::Variable(variable)) if variable.name == name => Some(variable.value),
            _ => None,
        })
        .unwrap_or_else(|| panic!("variable {name} not found"))
}

fn literal(ast: &Ast, id: NodeId) -> (LiteralType, String) {
    match ast.expression(id) {
        Some(Expression::Literal { value, kind }) => (*kind, value.clone()),
        other => panic!("expected literal, found {other:?}"),
    }
}

#[test]
fn test_parse_minimal_module() {
    let ast = parse_ok("Module: Acme.Demo\nVersion: 1.0\nDescription: Demo module\n");
    let root = ast.root().unwrap();
    let Some(Declaration::Module(module)) = ast.declaration(root) else {
        panic!("expected module");
    };
    assert_eq!(module.module, "Acme.Demo");
    assert_eq!(module.version.as_deref(), Some("1.0"));
    assert_eq!(module.description.as_deref(), Some("Demo module"));
    assert!(module.items.is_empty());
    assert_eq!(ast.location(root).start_line(), 1);
}

#[test]
fn test_short_and_long_sub_are_identical() {
    let ast = parse_ok(
        r#"Module: Acme.Demo
Items:
  - Variable: Short
    Value: !Sub "t-${AWS::Region}"
  - Variable: Long
    Value:
      Fn::Sub: "t-${AWS::Region}"
"#,
    );
    let short = ast.expression(variable_value(&ast, "Short")).unwrap();
    let long = ast.expression(variable_value(&ast, "Long")).unwrap();
    assert_eq!(short, long);
    assert!(matches!(short, Expression::Sub { parameters: None, .. }));
}

#[test]
fn test_short_form_with_arguments() {
    let ast = parse_ok(
        r#"Module: Acme.Demo
Items:
  - Variable: Joined
    Value: !Join [ ",", [ a, b ] ]
  - Variable: Selected
    Value: !Select [ 0, !GetAZs "" ]
  - Variable: Attribute
    Value: !GetAtt Bucket.Arn
"#,
    );
    let joined = variable_value(&ast, "Joined");
    let Some(Expression::Join { separator, values }) = ast.expression(joined) else {
        panic!("expected join");
    };
    assert_eq!(separator, ",");
    assert!(matches!(ast.expression(*values), Some(Expression::List { items }) if items.len() == 2));

    let selected = variable_value(&ast, "Selected");
    let Some(Expression::Select { values, .. }) = ast.expression(selected) else {
        panic!("expected select");
    };
    assert!(matches!(ast.expression(*values), Some(Expression::GetAzs { .. })));

    let attribute = variable_value(&ast, "Attribute");
    let Some(Expression::GetAtt {
        reference_name,
        attribute_name,
    }) = ast.expression(attribute)
    else {
        panic!("expected getatt");
    };
    assert_eq!(reference_name, "Bucket");
    assert_eq!(literal(&ast, *attribute_name).1, "Arn");
}

#[test]
fn test_if_names_its_condition() {
    let ast = parse_ok(
        "Module: Acme.Demo\nItems:\n  - Variable: Choice\n    Value: !If [ IsProd, big, small ]\n",
    );
    let Some(Expression::If { condition, .. }) = ast.expression(variable_value(&ast, "Choice")) else {
        panic!("expected if");
    };
    assert_eq!(
        ast.expression(*condition),
        Some(&Expression::Condition {
            name: "IsProd".to_string()
        })
    );
}

#[test]
fn test_condition_key_with_siblings_is_an_object() {
    let ast = parse_ok(
        "Module: Acme.Demo\nItems:\n  - Variable: Data\n    Value:\n      Condition: Ready\n      Other: 1\n",
    );
    let Some(Expression::Object { entries }) = ast.expression(variable_value(&ast, "Data")) else {
        panic!("expected object");
    };
    let keys: Vec<_> = entries.iter().map(|entry| entry.key.as_str()).collect();
    assert_eq!(keys, ["Condition", "Other"]);
}

#[test]
fn test_literal_normalization() {
    let ast = parse_ok(
        r#"Module: Acme.Demo
Items:
  - Variable: Grouped
    Value: 685_230
  - Variable: Hex
    Value: 0x_0A_74_AE
  - Variable: Flag
    Value: yes
  - Variable: Quoted
    Value: "true"
  - Variable: Nothing
    Value: ~
  - Variable: Forced
    Value: !!str 42
  - Variable: When
    Value: 2001-12-14
"#,
    );
    assert_eq!(
        literal(&ast, variable_value(&ast, "Grouped")),
        (LiteralType::Integer, "685230".to_string())
    );
    assert_eq!(
        literal(&ast, variable_value(&ast, "Hex")),
        (LiteralType::Integer, "685230".to_string())
    );
    assert_eq!(
        literal(&ast, variable_value(&ast, "Flag")),
        (LiteralType::Bool, "true".to_string())
    );
    assert_eq!(
        literal(&ast, variable_value(&ast, "Quoted")),
        (LiteralType::String, "true".to_string())
    );
    assert_eq!(literal(&ast, variable_value(&ast, "Nothing")).0, LiteralType::Null);
    assert_eq!(
        literal(&ast, variable_value(&ast, "Forced")),
        (LiteralType::String, "42".to_string())
    );
    assert_eq!(literal(&ast, variable_value(&ast, "When")).0, LiteralType::Timestamp);
}

#[test]
fn test_invalid_tagged_literal() {
    let codes = parse_err("Module: Acme.Demo\nItems:\n  - Variable: A\n    Value: !!int abc\n");
    assert_eq!(codes, vec![ErrorCode::E110]);
}

#[test]
fn test_unknown_tag() {
    let codes = parse_err("Module: Acme.Demo\nItems:\n  - Variable: A\n    Value: !Bogus x\n");
    assert_eq!(codes, vec![ErrorCode::E104]);
}

#[test]
fn test_unknown_key_suggests_known_key() {
    let (ast, collector) = parse_files(&[(
        "module.yml",
        "Module: Acme.Demo\nItems:\n  - Variable: A\n    Value: 1\n    Descripton: typo\n",
    )]);
    assert!(ast.is_none());
    let diagnostic = &collector.diagnostics()[0];
    assert_eq!(diagnostic.code(), ErrorCode::E105);
    assert_eq!(diagnostic.suggestion(), Some("did you mean `Description`?"));
    let location = diagnostic.location().unwrap();
    assert_eq!((location.start_line(), location.start_column()), (5, 5));
}

#[test]
fn test_duplicate_key() {
    let codes = parse_err("Module: Acme.Demo\nItems:\n  - Variable: A\n    Value: 1\n    Value: 2\n");
    assert_eq!(codes, vec![ErrorCode::E106]);
}

#[test]
fn test_missing_required_key() {
    let codes = parse_err("Module: Acme.Demo\nItems:\n  - Variable: A\n    Description: no value\n");
    assert_eq!(codes, vec![ErrorCode::E107]);
}

#[test]
fn test_keyword_must_come_first() {
    let codes = parse_err("Module: Acme.Demo\nItems:\n  - Value: 1\n    Variable: A\n");
    assert_eq!(codes, vec![ErrorCode::E109]);
}

#[test]
fn test_sources_only_accept_event_keywords() {
    let codes = parse_err(
        "Module: Acme.Demo\nItems:\n  - Function: Worker\n    Sources:\n      - Variable: A\n        Value: 1\n",
    );
    assert_eq!(codes, vec![ErrorCode::E109]);
}

#[test]
fn test_siblings_continue_after_error() {
    let codes = parse_err(
        "Module: Acme.Demo\nItems:\n  - Variable: A\n    Valeu: 1\n  - Resorce: B\n  - Variable: C\n    Value: !Equals [ a ]\n",
    );
    assert_eq!(codes, vec![ErrorCode::E105, ErrorCode::E107, ErrorCode::E109, ErrorCode::E108]);
}

#[test]
fn test_long_form_with_extra_keys() {
    let codes = parse_err(
        "Module: Acme.Demo\nItems:\n  - Variable: A\n    Value:\n      Ref: B\n      Extra: 1\n",
    );
    assert_eq!(codes, vec![ErrorCode::E108]);
}

#[test]
fn test_argument_count() {
    let codes = parse_err("Module: Acme.Demo\nItems:\n  - Variable: A\n    Value: !Equals [ a ]\n");
    assert_eq!(codes, vec![ErrorCode::E108]);
}

#[test]
fn test_ref_rejects_nested_expressions() {
    let codes = parse_err("Module: Acme.Demo\nItems:\n  - Variable: A\n    Value: !Ref [ a ]\n");
    assert_eq!(codes, vec![ErrorCode::E108]);
}

#[test]
fn test_include_splices_declarations() {
    let (ast, collector) = parse_files(&[
        (
            "src/module.yml",
            "Module: Acme.Demo\nItems:\n  - !Include parts/first.yml\n  - Variable: Local\n    Value: 1\n",
        ),
        (
            "src/parts/first.yml",
            "- Variable: One\n  Value: !Include value.yml\n- Variable: Two\n  Value: 2\n",
        ),
        ("src/parts/value.yml", "hello\n"),
    ]);
    assert!(!collector.has_errors(), "{:?}", collector.diagnostics());
    let ast = ast.unwrap();
    let names: Vec<_> = items(&ast)
        .into_iter()
        .filter_map(|id| ast.declaration(id).and_then(|d| d.name()).map(str::to_string))
        .collect();
    assert_eq!(names, ["One", "Two", "Local"]);

    let one = variable_value(&ast, "One");
    assert_eq!(ast.location(one).file(), "src/parts/value.yml");
    assert_eq!(literal(&ast, one).1, "hello");
    let two = items(&ast)[1];
    assert_eq!(ast.location(two).file(), "src/parts/first.yml");
}

#[test]
fn test_include_list_for_items() {
    let (ast, collector) = parse_files(&[
        ("module.yml", "Module: Acme.Demo\nItems: !Include items.yml\n"),
        ("items.yml", "Variable: Single\nValue: 1\n"),
    ]);
    assert!(!collector.has_errors());
    assert_eq!(items(&ast.unwrap()).len(), 1);
}

#[test]
fn test_include_cycle_is_reported() {
    let (ast, collector) = parse_files(&[
        ("module.yml", "Module: Acme.Demo\nItems: !Include items.yml\n"),
        ("items.yml", "- !Include items.yml\n"),
    ]);
    assert!(ast.is_none());
    let codes: Vec<_> = collector.diagnostics().iter().map(|d| d.code()).collect();
    assert_eq!(codes, vec![ErrorCode::E102]);
    assert!(collector.diagnostics()[0].message().contains("items.yml -> items.yml"));
}

#[test]
fn test_missing_include() {
    let codes = parse_err("Module: Acme.Demo\nItems: !Include missing.yml\n");
    assert_eq!(codes, vec![ErrorCode::E101]);
}

#[test]
fn test_missing_entry_file() {
    let provider = MemoryFileProvider::new();
    let mut collector = DiagnosticCollector::new();
    assert!(parse_module("absent.yml", &provider, &mut collector).is_none());
    assert_eq!(collector.diagnostics()[0].code(), ErrorCode::E101);
}

#[test]
fn test_invalid_yaml() {
    let codes = parse_err("Module: Acme.Demo\nItems: [\n");
    assert_eq!(codes, vec![ErrorCode::E100]);
}

#[test]
fn test_module_keyword_must_be_first() {
    let codes = parse_err("Version: 1.0\nModule: Acme.Demo\n");
    assert_eq!(codes, vec![ErrorCode::E109]);
}

#[test]
fn test_function_with_sources() {
    let ast = parse_ok(
        r#"Module: Acme.Demo
Items:
  - Function: Worker
    Memory: 256
    Timeout: 30
    Handler: index.handler
    Runtime: nodejs18.x
    Environment:
      STAGE: prod
    Sources:
      - Api: "GET:/items"
        OperationName: ListItems
      - Schedule: rate(1 hour)
      - Sqs: Queue
        BatchSize: 5
      - Alexa: "*"
      - EventBus: default
        Pattern:
          source: [ acme ]
"#,
    );
    let function = items(&ast)[0];
    let Some(Declaration::Function(function)) = ast.declaration(function) else {
        panic!("expected function");
    };
    assert_eq!(function.handler.as_deref(), Some("index.handler"));
    assert_eq!(function.sources.len(), 5);
    let keywords: Vec<_> = function
        .sources
        .iter()
        .filter_map(|id| ast.declaration(*id).map(Declaration::keyword))
        .collect();
    assert_eq!(keywords, ["Api", "Schedule", "Sqs", "Alexa", "EventBus"]);
    assert!(matches!(
        ast.declaration(function.sources[3]),
        Some(Declaration::Alexa(source)) if source.skill.is_none()
    ));
}

#[test]
fn test_resource_type_properties() {
    let ast = parse_ok(
        r#"Module: Acme.Demo
Items:
  - ResourceType: Acme::Widget
    Handler: WidgetFunction
    Properties:
      - Name: Size
        Type: Number
        Required: true
    Attributes:
      - Name: Id
"#,
    );
    let Some(Declaration::ResourceType(resource_type)) = ast.declaration(items(&ast)[0]) else {
        panic!("expected resource type");
    };
    assert_eq!(resource_type.name, "Acme::Widget");
    assert!(resource_type.properties[0].required);
    assert_eq!(resource_type.attributes[0].name, "Id");
}

#[test]
fn test_scope_splits_commas() {
    let ast = parse_ok(
        "Module: Acme.Demo\nItems:\n  - Parameter: Size\n    Scope: Worker, Other\n    Allow: sqs:SendMessage\n",
    );
    let Some(Declaration::Parameter(parameter)) = ast.declaration(items(&ast)[0]) else {
        panic!("expected parameter");
    };
    assert_eq!(parameter.scope, ["Worker", "Other"]);
    assert_eq!(parameter.allow, ["sqs:SendMessage"]);
}

#[test]
fn test_expression_location() {
    let ast = parse_ok("Module: Acme.Demo\nItems:\n  - Variable: A\n    Value: !Ref Other\n");
    let location = ast.location(variable_value(&ast, "A"));
    assert_eq!(location.file(), "module.yml");
    assert_eq!(location.start_line(), 4);
    assert!(location.start_column() >= 12);
}
