/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
use super::*;
use crate::ast::{Declaration, Expression, NodeId};
use crate::diagnostics::{Diagnostic, DiagnosticCollector, ErrorCode};
use crate::parser::parse_module;
use crate::source::MemoryFileProvider;

const SPEC: &str = r#"{
    "ResourceTypes": {
        "AWS::SQS::Queue": {
            "Properties": {
                "QueueName": { "PrimitiveType": "String" },
                "VisibilityTimeout": { "PrimitiveType": "Integer" }
            },
            "Attributes": {
                "Arn": { "PrimitiveType": "String" },
                "QueueName": { "PrimitiveType": "String" }
            }
        },
        "AWS::SSM::Parameter": {
            "Properties": {
                "Type": { "PrimitiveType": "String", "Required": true },
                "Value": { "PrimitiveType": "String", "Required": true }
            }
        }
    }
}"#;

const FUNCTION: &str = "    Memory: 128\n    Timeout: 30\n    Runtime: nodejs18.x\n    Handler: index.handler\n";

fn run(content: &str, spec: Option<&ResourceSpecification>) -> (Ast, Option<SemanticModel>, Vec<Diagnostic>) {
    let provider = MemoryFileProvider::new().with_file("module.yml", content);
    let mut collector = DiagnosticCollector::new();
    let mut ast = parse_module("module.yml", &provider, &mut collector).expect("module should parse");
    let model = analyze(&mut ast, spec, &mut collector);
    (ast, model, collector.into_diagnostics())
}

fn analyze_ok(content: &str) -> (Ast, SemanticModel) {
    let (ast, model, diagnostics) = run(content, None);
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    (ast, model.expect("analysis should succeed"))
}

fn analyze_err(content: &str) -> Vec<Diagnostic> {
    analyze_err_with(content, None)
}

fn analyze_err_with(content: &str, spec: Option<&ResourceSpecification>) -> Vec<Diagnostic> {
    let (_, model, diagnostics) = run(content, spec);
    assert!(model.is_none(), "analysis should fail");
    diagnostics
}

fn codes(diagnostics: &[Diagnostic]) -> Vec<ErrorCode> {
    diagnostics.iter().map(Diagnostic::code).collect()
}

fn spec() -> ResourceSpecification {
    ResourceSpecification::from_json(SPEC).unwrap()
}

fn node(model: &SemanticModel, full_name: &str) -> NodeId {
    model
        .symbol_by_full_name(full_name)
        .unwrap_or_else(|| panic!("{full_name} not declared"))
        .node
}

fn value_of(ast: &Ast, model: &SemanticModel, full_name: &str) -> NodeId {
    match ast.declaration(node(model, full_name)) {
        Some(Declaration::Variable(variable)) => variable.value,
        other => panic!("expected variable, found {other:?}"),
    }
}

#[test]
fn test_symbols_in_groups() {
    let (_, model) = analyze_ok(
        r#"Module: Acme.Demo
Items:
  - Group: Storage
    Items:
      - Resource: Bucket
        Type: AWS::S3::Bucket
  - Variable: Greeting
    Value: hello
"#,
    );
    let bucket = model.symbol_by_full_name("Storage::Bucket").unwrap();
    assert_eq!(bucket.name, "Bucket");
    assert_eq!(bucket.logical_id, "StorageBucket");
    assert_eq!(model.symbol_by_logical_id("StorageBucket"), Some(bucket));
    assert_eq!(
        model.full_names().collect::<Vec<_>>(),
        ["Storage", "Storage::Bucket", "Greeting"]
    );
    assert_eq!(model.module().full_name(), "Acme.Demo");
    assert_eq!(model.module().version().unwrap().to_string(), DEFAULT_MODULE_VERSION);
}

#[test]
fn test_references_resolve_through_groups() {
    let (ast, model) = analyze_ok(
        r#"Module: Acme.Demo
Items:
  - Group: Storage
    Items:
      - Resource: Bucket
        Type: AWS::S3::Bucket
      - Variable: Inner
        Value: !Ref Bucket
  - Variable: Absolute
    Value: !Ref Storage::Bucket
  - Variable: ByLogicalId
    Value: !GetAtt StorageBucket.Arn
"#,
    );
    let bucket = node(&model, "Storage::Bucket");
    for variable in ["Storage::Inner", "Absolute", "ByLogicalId"] {
        assert_eq!(model.binding(value_of(&ast, &model, variable)), Some(bucket), "{variable}");
    }
}

#[test]
fn test_sub_tokens_bind_by_name() {
    let (ast, model) = analyze_ok(
        r#"Module: Acme.Demo
Items:
  - Parameter: Stage
  - Resource: Queue
    Type: AWS::SQS::Queue
  - Variable: Name
    Value: !Sub
      - "${Stage}-${Queue.Arn}-${AWS::Region}-${Local}"
      - Local: x
"#,
    );
    let value = value_of(&ast, &model, "Name");
    assert_eq!(model.name_binding(value, "Stage"), Some(node(&model, "Stage")));
    assert_eq!(model.name_binding(value, "Queue"), Some(node(&model, "Queue")));
    assert_eq!(model.name_binding(value, "Local"), None);
}

#[test]
fn test_unresolved_reference_suggests() {
    let diagnostics = analyze_err(
        "Module: Acme.Demo\nItems:\n  - Parameter: Bucket\n  - Variable: A\n    Value: !Ref Buckt\n",
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E300]);
    assert_eq!(diagnostics[0].suggestion(), Some("did you mean `Bucket`?"));
    assert!(diagnostics[0].is_exact());
}

#[test]
fn test_unresolved_sub_token_is_near() {
    let diagnostics = analyze_err(
        "Module: Acme.Demo\nItems:\n  - Variable: A\n    Value: !Sub \"${Missing}\"\n",
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E300]);
    assert!(!diagnostics[0].is_exact());
}

#[test]
fn test_pseudo_parameters_always_resolve() {
    analyze_ok("Module: Acme.Demo\nItems:\n  - Variable: A\n    Value: !Ref AWS::Region\n");
}

#[test]
fn test_reference_to_wrong_kind() {
    let diagnostics = analyze_err(
        r#"Module: Acme.Demo
Items:
  - Condition: IsProd
    Value: !Equals [ a, b ]
  - Variable: A
    Value: !Ref IsProd
  - Variable: B
    Value: !If [ A, x, y ]
"#,
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E301, ErrorCode::E301]);
    assert!(diagnostics[0].message().contains("condition"));
}

#[test]
fn test_unknown_attribute() {
    let spec = spec();
    let diagnostics = analyze_err_with(
        r#"Module: Acme.Demo
Items:
  - Resource: Queue
    Type: AWS::SQS::Queue
  - Variable: A
    Value: !GetAtt Queue.Arm
"#,
        Some(&spec),
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E302]);
    assert_eq!(diagnostics[0].suggestion(), Some("did you mean `Arn`?"));
}

#[test]
fn test_function_and_local_type_attributes() {
    let content = format!(
        r#"Module: Acme.Demo
Items:
  - ResourceType: Acme::Widget
    Handler: Handler
    Attributes:
      - Name: Id
  - Function: Handler
{FUNCTION}  - Resource: Widget
    Type: Acme::Widget
  - Variable: A
    Value: !GetAtt Widget.Id
  - Variable: B
    Value: !GetAtt Handler.Arn
  - Variable: C
    Value: !GetAtt Widget.Name
"#
    );
    let diagnostics = analyze_err(&content);
    assert_eq!(codes(&diagnostics), [ErrorCode::E302]);
    assert!(diagnostics[0].message().contains("`Name`"));
}

#[test]
fn test_variable_cycle() {
    let diagnostics = analyze_err(
        "Module: Acme.Demo\nItems:\n  - Variable: A\n    Value: !Ref B\n  - Variable: B\n    Value: !Sub \"${A}\"\n",
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E303]);
    assert!(diagnostics[0].message().contains("A -> B -> A"));
}

#[test]
fn test_self_reference_is_a_cycle() {
    let diagnostics =
        analyze_err("Module: Acme.Demo\nItems:\n  - Variable: A\n    Value: [ !Ref A ]\n");
    assert_eq!(codes(&diagnostics), [ErrorCode::E303]);
}

#[test]
fn test_resource_value_cycle() {
    let diagnostics = analyze_err(
        "Module: Acme.Demo\nItems:\n  - Resource: A\n    Scope: public\n    Value: !Ref B\n  - Resource: B\n    Value: !Ref A\n",
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E303]);
    assert!(diagnostics[0].message().contains("A -> B -> A"));
}

#[test]
fn test_resource_value_self_reference() {
    let diagnostics =
        analyze_err("Module: Acme.Demo\nItems:\n  - Resource: A\n    Value: !Sub \"${A}-x\"\n");
    assert_eq!(codes(&diagnostics), [ErrorCode::E303]);
}

#[test]
fn test_variable_and_resource_value_cycle() {
    let diagnostics = analyze_err(
        r#"Module: Acme.Demo
Items:
  - Variable: Name
    Value: !Join [ "-", [ !Ref Existing, x ] ]
  - Resource: Existing
    Value: !Ref Name
"#,
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E303]);
    assert!(diagnostics[0].message().contains("Name -> Existing -> Name"));
}

#[test]
fn test_condition_cycle() {
    let diagnostics = analyze_err(
        "Module: Acme.Demo\nItems:\n  - Condition: A\n    Value: !Condition B\n  - Condition: B\n    Value: !Condition A\n",
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E303]);
    assert!(diagnostics[0].message().contains("A -> B -> A"));
}

#[test]
fn test_condition_cycle_through_variable() {
    let diagnostics = analyze_err(
        r#"Module: Acme.Demo
Items:
  - Variable: Flag
    Value: !Condition IsProd
  - Condition: IsProd
    Value: !Equals [ !Ref Flag, "true" ]
"#,
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E303]);
    assert!(diagnostics[0].message().contains("Flag -> IsProd -> Flag"));
}

#[test]
fn test_acyclic_chains_are_accepted() {
    analyze_ok(
        r#"Module: Acme.Demo
Items:
  - Parameter: Stage
  - Condition: IsProd
    Value: !Equals [ !Ref Stage, prod ]
  - Condition: IsLive
    Value: !Or [ !Condition IsProd, !Equals [ !Ref Stage, live ] ]
  - Resource: Existing
    Value: arn:aws:sqs:us-east-1:123456789012:jobs
  - Variable: Queue
    Value: !Ref Existing
  - Resource: Inline
    Type: AWS::SQS::Queue
    If: !And [ !Condition IsLive, !Condition IsProd ]
    Properties:
      QueueName: !Ref Queue
"#,
    );
}

#[test]
fn test_duplicate_names() {
    let diagnostics = analyze_err(
        "Module: Acme.Demo\nItems:\n  - Parameter: Size\n  - Variable: Size\n    Value: 1\n",
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E200]);
    assert!(diagnostics[0].message().contains("module.yml:3"));
}

#[test]
fn test_logical_id_collision() {
    let diagnostics = analyze_err(
        r#"Module: Acme.Demo
Items:
  - Group: A
    Items:
      - Variable: B
        Value: 1
  - Variable: AB
    Value: 2
"#,
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E200]);
}

#[test]
fn test_invalid_and_reserved_names() {
    let diagnostics = analyze_err(
        "Module: Acme.Demo\nItems:\n  - Parameter: bad-name\n  - Parameter: DeploymentPrefix\n  - Parameter: ModuleRestApiStage\n",
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E201, ErrorCode::E202, ErrorCode::E202]);
}

#[test]
fn test_parameter_inside_group() {
    let diagnostics = analyze_err(
        "Module: Acme.Demo\nItems:\n  - Group: Settings\n    Items:\n      - Parameter: Size\n",
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E203]);
}

#[test]
fn test_invalid_module_name_and_version() {
    let diagnostics = analyze_err("Module: Demo\nVersion: one\n");
    assert_eq!(codes(&diagnostics), [ErrorCode::E205, ErrorCode::E204]);
}

#[test]
fn test_nested_module_needs_version() {
    let diagnostics = analyze_err(
        "Module: Acme.Demo\nItems:\n  - Nested: Child\n    Module: Acme.Child\n",
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E205]);
}

#[test]
fn test_scope_resolution() {
    let content = format!(
        r#"Module: Acme.Demo
Items:
  - Parameter: Everywhere
    Scope: "*"
  - Parameter: Exported
    Scope: public, Worker
  - Function: Worker
{FUNCTION}  - Function: Other
{FUNCTION}"#
    );
    let (_, model) = analyze_ok(&content);
    let worker = node(&model, "Worker");
    let other = node(&model, "Other");

    let everywhere = model.scope(node(&model, "Everywhere")).unwrap();
    assert_eq!(everywhere.functions, [worker, other]);
    assert!(!everywhere.public);

    let exported = model.scope(node(&model, "Exported")).unwrap();
    assert_eq!(exported.functions, [worker]);
    assert!(exported.public);

    let scoped: Vec<_> = model.scoped_to(worker).iter().map(|s| s.name.clone()).collect();
    assert_eq!(scoped, ["Everywhere", "Exported"]);
}

#[test]
fn test_unknown_scope_entry() {
    let content = format!(
        "Module: Acme.Demo\nItems:\n  - Parameter: Size\n    Scope: Workr\n  - Function: Worker\n{FUNCTION}"
    );
    let diagnostics = analyze_err(&content);
    assert_eq!(codes(&diagnostics), [ErrorCode::E206]);
    assert_eq!(diagnostics[0].suggestion(), Some("did you mean `Worker`?"));
}

#[test]
fn test_grants() {
    let (_, model) = analyze_ok(
        r#"Module: Acme.Demo
Items:
  - Resource: Queue
    Type: AWS::SQS::Queue
    Allow: Full, sqs:SendMessage
  - Parameter: Topic
    Type: AWS::SNS::Topic
    Allow: None
"#,
    );
    assert_eq!(model.grants().len(), 1);
    assert_eq!(model.grants()[0].declaration, node(&model, "Queue"));
    assert_eq!(model.grants()[0].actions, ["sqs:*", "sqs:SendMessage"]);
}

#[test]
fn test_invalid_allow() {
    let diagnostics = analyze_err(
        "Module: Acme.Demo\nItems:\n  - Parameter: Name\n    Allow: Full\n  - Parameter: Other\n    Allow: publish\n",
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E207, ErrorCode::E207]);
}

#[test]
fn test_resource_properties_against_specification() {
    let spec = spec();
    let diagnostics = analyze_err_with(
        r#"Module: Acme.Demo
Items:
  - Resource: Queue
    Type: AWS::SQS::Queue
    Properties:
      QueueNam: jobs
  - Resource: Setting
    Type: AWS::SSM::Parameter
    Properties:
      Type: String
  - Resource: Table
    Type: AWS::DynamoDB::Tabel
"#,
        Some(&spec),
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E209, ErrorCode::E210, ErrorCode::E208]);
    assert_eq!(diagnostics[0].suggestion(), Some("did you mean `QueueName`?"));
    assert_eq!(diagnostics[0].location().unwrap().start_line(), 6);
    assert!(diagnostics[1].message().contains("`Value`"));
}

#[test]
fn test_unknown_type_without_dependencies() {
    let diagnostics = analyze_err("Module: Acme.Demo\nItems:\n  - Resource: Thing\n    Type: Acme::Thing\n");
    assert_eq!(codes(&diagnostics), [ErrorCode::E208]);

    analyze_ok(
        "Module: Acme.Demo\nUsing:\n  - Module: Acme.Things:1.0\nItems:\n  - Resource: Thing\n    Type: Acme::Thing\n",
    );
}

#[test]
fn test_resource_needs_type_or_value() {
    let diagnostics = analyze_err(
        "Module: Acme.Demo\nItems:\n  - Resource: Empty\n  - Resource: Both\n    Value: arn:aws:sqs:x\n    Properties:\n      A: 1\n",
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E213, ErrorCode::E213]);
}

#[test]
fn test_function_settings() {
    let diagnostics = analyze_err(
        "Module: Acme.Demo\nItems:\n  - Function: Worker\n    Memory: lots\n    Handler: index.handler\n",
    );
    assert_eq!(
        codes(&diagnostics),
        [ErrorCode::E211, ErrorCode::E211, ErrorCode::E211]
    );
}

#[test]
fn test_event_sources() {
    let content = format!(
        r#"Module: Acme.Demo
Items:
  - Resource: Queue
    Type: AWS::SQS::Queue
  - Function: Worker
{FUNCTION}    Sources:
      - Api: "FETCH:/items"
      - Schedule: every hour
      - Sqs: Queue
        BatchSize: 11
      - S3: Queue
        Events: [ ObjectCreated ]
"#
    );
    let diagnostics = analyze_err(&content);
    assert_eq!(codes(&diagnostics), vec![ErrorCode::E212; 4]);
}

#[test]
fn test_event_source_targets_bind() {
    let content = format!(
        r#"Module: Acme.Demo
Items:
  - Import: Jobs
    Module: Acme.Queues::JobQueue
  - Function: Worker
{FUNCTION}    Sources:
      - Sqs: Jobs
      - EventBus: default
        Pattern:
          source: [ acme ]
"#
    );
    let (ast, model) = analyze_ok(&content);
    let Some(Declaration::Function(function)) = ast.declaration(node(&model, "Worker")) else {
        panic!("expected function");
    };
    assert_eq!(model.name_binding(function.sources[0], "Jobs"), Some(node(&model, "Jobs")));
    assert_eq!(model.name_binding(function.sources[1], "default"), None);
}

#[test]
fn test_conditions() {
    let (ast, model) = analyze_ok(
        r#"Module: Acme.Demo
Items:
  - Parameter: Stage
  - Condition: IsProd
    Value: !Equals [ !Ref Stage, prod ]
  - Resource: Named
    Type: AWS::SQS::Queue
    If: IsProd
  - Resource: Inline
    Type: AWS::SQS::Queue
    If: !Not [ !Condition IsProd ]
"#,
    );
    let Some(Declaration::Resource(named)) = ast.declaration(node(&model, "Named")) else {
        panic!("expected resource");
    };
    assert_eq!(model.binding(named.condition.unwrap()), Some(node(&model, "IsProd")));
    assert_eq!(model.implicit_condition(node(&model, "Named")), None);
    assert_eq!(
        model.implicit_condition(node(&model, "Inline")),
        Some("InlineCondition")
    );
}

#[test]
fn test_depends_on_and_handlers() {
    let content = format!(
        r#"Module: Acme.Demo
Items:
  - Resource: First
    Type: AWS::SQS::Queue
  - Resource: Second
    Type: AWS::SQS::Queue
    DependsOn: [ First, Missing ]
  - Macro: Expand
    Handler: Expander
  - Function: Expander
{FUNCTION}"#
    );
    let diagnostics = analyze_err(&content);
    assert_eq!(codes(&diagnostics), [ErrorCode::E300]);
    assert!(diagnostics[0].message().contains("Missing"));
}

#[test]
fn test_find_in_map_binds_mapping() {
    let (ast, model) = analyze_ok(
        r#"Module: Acme.Demo
Items:
  - Mapping: Sizes
    Value:
      prod:
        Memory: 512
  - Variable: Memory
    Value: !FindInMap [ Sizes, prod, Memory ]
"#,
    );
    let value = value_of(&ast, &model, "Memory");
    assert!(matches!(ast.expression(value), Some(Expression::FindInMap { .. })));
    assert_eq!(model.binding(value), Some(node(&model, "Sizes")));
}

#[test]
fn test_structure_errors_stop_before_references() {
    let diagnostics = analyze_err(
        "Module: Acme.Demo\nItems:\n  - Parameter: A\n  - Parameter: A\n  - Variable: B\n    Value: !Ref Missing\n",
    );
    assert_eq!(codes(&diagnostics), [ErrorCode::E200]);
}

#[test]
fn test_every_parsed_node_has_parent_and_location() {
    let provider = MemoryFileProvider::new()
        .with_file(
            "module.yml",
            format!(
                r#"Module: Acme.Demo
Items:
  - Parameter: Stage
  - Condition: IsProd
    Value: !Equals [ !Ref Stage, prod ]
  - Group: Storage
    Items: !Include storage.yml
  - Function: Worker
{FUNCTION}    Environment:
      QUEUE: !GetAtt Storage::Queue.Arn
      NAME: !Sub
        - "${{Stage}}-${{Suffix}}"
        - Suffix: !Select [ 0, !Split [ ",", "a,b" ] ]
    Sources:
      - Sqs: Storage::Queue
        BatchSize: 5
      - Api: "GET:/items"
"#
            ),
        )
        .with_file(
            "storage.yml",
            "- Resource: Queue\n  Type: AWS::SQS::Queue\n  If: !Not [ !Condition IsProd ]\n  Properties:\n    QueueName: !Join [ \"-\", [ !Ref Stage, jobs ] ]\n",
        );
    let mut collector = DiagnosticCollector::new();
    let mut ast = parse_module("module.yml", &provider, &mut collector).expect("module should parse");
    let model = analyze(&mut ast, None, &mut collector);
    assert!(
        collector.diagnostics().is_empty(),
        "unexpected diagnostics: {:?}",
        collector.diagnostics()
    );
    assert!(model.is_some());

    let root = ast.root().unwrap();
    assert!(ast.len() > 20);
    for id in ast.ids() {
        assert!(!ast.location(id).is_unknown(), "node {id} has no location");
        if id == root {
            assert_eq!(ast.parent(id), None);
            continue;
        }
        assert!(ast.parent(id).is_some(), "node {id} has no parent");
        assert_eq!(ast.ancestors(id).last(), Some(root), "node {id} is detached");
    }
    assert!(ast
        .ids()
        .any(|id| ast.location(id).file() == "storage.yml"));
}
