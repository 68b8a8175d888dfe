/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
use chrono::{TimeZone, Utc};
use serde_json::json;

use super::*;
use crate::analyzer::analyze;
use crate::diagnostics::DiagnosticCollector;
use crate::parser::parse_module;
use crate::source::MemoryFileProvider;

const FUNCTION: &str = "    Memory: 128\n    Timeout: 30\n    Runtime: nodejs18.x\n    Handler: index.handler\n";

fn options() -> GeneratorOptions {
    GeneratorOptions {
        tool_version: Some("0.1.0".to_string()),
        timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
    }
}

fn run(content: &str) -> (Option<Generated>, Vec<Diagnostic>) {
    let provider = MemoryFileProvider::new().with_file("module.yml", content);
    let mut collector = DiagnosticCollector::new();
    let mut ast = parse_module("module.yml", &provider, &mut collector).expect("module should parse");
    let model = analyze(&mut ast, None, &mut collector);
    assert!(
        collector.diagnostics().is_empty(),
        "unexpected diagnostics: {:?}",
        collector.diagnostics()
    );
    let model = model.expect("analysis should succeed");
    let generated = generate(&ast, &model, None, &options(), &mut collector).expect("no internal error");
    (generated, collector.into_diagnostics())
}

fn generated(content: &str) -> Generated {
    let (generated, diagnostics) = run(content);
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    generated.expect("generation should succeed")
}

fn generation_errors(content: &str) -> Vec<ErrorCode> {
    let (generated, diagnostics) = run(content);
    assert!(generated.is_none(), "generation should fail");
    diagnostics.iter().map(Diagnostic::code).collect()
}

fn resource<'t>(template: &'t Template, logical_id: &str) -> &'t Value {
    template
        .resource(logical_id)
        .unwrap_or_else(|| panic!("{logical_id} not generated: {:?}", template.resources.keys()))
}

#[test]
fn test_minimal_module() {
    let output = generated(
        r#"Module: Acme.Demo
Description: Demo module
Items:
  - Resource: Queue
    Type: AWS::SQS::Queue
"#,
    );
    let template = &output.template;
    assert_eq!(template.format_version, TEMPLATE_FORMAT_VERSION);
    assert_eq!(template.description.as_deref(), Some("Demo module"));
    assert_eq!(
        template.parameters.keys().collect::<Vec<_>>(),
        [DEPLOYMENT_BUCKET_NAME, DEPLOYMENT_PREFIX]
    );
    assert_eq!(resource(template, "Queue"), &json!({ "Type": "AWS::SQS::Queue" }));
    assert!(template.resource(MODULE_ROLE).is_none());
    assert!(template.metadata.contains_key("AWS::CloudFormation::Interface"));
    assert!(template.metadata.contains_key(MANIFEST_METADATA_KEY));
    assert!(template.validate().is_ok());
}

#[test]
fn test_parameters_and_interface() {
    let output = generated(
        r#"Module: Acme.Demo
Items:
  - Parameter: Stage
    Section: Environment
    Label: Deployment stage
    AllowedValues: [ dev, prod ]
    Default: dev
  - Parameter: Size
    Type: Number
    MinValue: 1
  - Parameter: Topic
    Type: AWS::SNS::Topic
"#,
    );
    let template = &output.template;
    assert_eq!(
        template.parameters["Stage"],
        json!({ "Type": "String", "Default": "dev", "AllowedValues": ["dev", "prod"] })
    );
    assert_eq!(template.parameters["Size"], json!({ "Type": "Number", "MinValue": 1 }));
    assert_eq!(template.parameters["Topic"]["Type"], "String");

    let interface = &template.metadata["AWS::CloudFormation::Interface"];
    assert_eq!(
        interface["ParameterGroups"],
        json!([
            { "Label": { "default": "Environment" }, "Parameters": ["Stage"] },
            { "Label": { "default": "Module Settings" }, "Parameters": ["Size", "Topic"] },
            {
                "Label": { "default": "Deployment Settings" },
                "Parameters": ["DeploymentBucketName", "DeploymentPrefix"]
            },
        ])
    );
    assert_eq!(interface["ParameterLabels"], json!({ "Stage": { "default": "Deployment stage" } }));

    let sections = &output.manifest.parameter_sections;
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[1].parameters[1].r#type, "AWS::SNS::Topic");
}

#[test]
fn test_variables_imports_and_packages_are_inlined() {
    let output = generated(
        r#"Module: Acme.Demo
Items:
  - Variable: Greeting
    Value: hello
  - Import: Jobs
    Module: Acme.Queues::JobQueue
  - Package: Assets
    Files: assets/
  - Resource: Existing
    Value: arn:aws:sqs:us-east-1:123456789012:existing
  - Resource: Setting
    Type: AWS::SSM::Parameter
    Properties:
      Type: String
      Value: !Ref Greeting
      Description: !Ref Jobs
      Tags:
        Assets: !Ref Assets
        Existing: !Ref Existing
"#,
    );
    let properties = &resource(&output.template, "Setting")["Properties"];
    assert_eq!(properties["Value"], "hello");
    assert_eq!(
        properties["Description"],
        json!({ "Fn::ImportValue": { "Fn::Sub": "${DeploymentPrefix}Acme-Queues::JobQueue" } })
    );
    assert_eq!(
        properties["Tags"]["Assets"],
        json!({ "Fn::Sub": "s3://${DeploymentBucketName}/${DeploymentPrefix}Acme/Demo/.artifacts/Assets.zip" })
    );
    assert_eq!(properties["Tags"]["Existing"], "arn:aws:sqs:us-east-1:123456789012:existing");
    assert!(output.template.resource("Greeting").is_none());
    assert!(output.template.resource("Existing").is_none());
    assert_eq!(output.manifest.dependencies[0].module, "Acme.Queues");
    assert_eq!(output.manifest.dependencies[0].kind, DependencyKind::Root);
}

#[test]
fn test_sub_tokens_are_rewritten() {
    let output = generated(
        r#"Module: Acme.Demo
Items:
  - Variable: Prefix
    Value: acme
  - Group: Storage
    Items:
      - Resource: Queue
        Type: AWS::SQS::Queue
  - Resource: Name
    Type: AWS::SSM::Parameter
    Properties:
      Type: String
      Value: !Sub "${Prefix}-${Storage::Queue.Arn}-${AWS::Region}"
"#,
    );
    assert_eq!(
        resource(&output.template, "Name")["Properties"]["Value"],
        json!({ "Fn::Sub": ["${Prefix}-${StorageQueue.Arn}-${AWS::Region}", { "Prefix": "acme" }] })
    );
}

#[test]
fn test_conditions_and_conditional_resources() {
    let output = generated(
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
  - Resource: Choice
    Type: AWS::SSM::Parameter
    Properties:
      Type: String
      Value: !If [ IsProd, big, small ]
"#,
    );
    let template = &output.template;
    assert_eq!(
        template.conditions["IsProd"],
        json!({ "Fn::Equals": [{ "Ref": "Stage" }, "prod"] })
    );
    assert_eq!(
        template.conditions["InlineCondition"],
        json!({ "Fn::Not": [{ "Condition": "IsProd" }] })
    );
    assert_eq!(resource(template, "Named")["Condition"], "IsProd");
    assert_eq!(resource(template, "Inline")["Condition"], "InlineCondition");
    assert_eq!(
        resource(template, "Choice")["Properties"]["Value"],
        json!({ "Fn::If": ["IsProd", "big", "small"] })
    );
}

#[test]
fn test_illegal_function_positions() {
    let condition = r#"Module: Acme.Demo
Items:
  - Resource: Queue
    Type: AWS::SQS::Queue
  - Condition: HasQueue
    Value: !Equals [ !Ref Queue, "" ]
"#;
    assert_eq!(generation_errors(condition), [ErrorCode::E400]);

    let value = r#"Module: Acme.Demo
Items:
  - Variable: Flag
    Value: !Equals [ a, b ]
  - Resource: Name
    Type: AWS::SSM::Parameter
    Properties:
      Type: String
      Value: !Ref Flag
"#;
    assert_eq!(generation_errors(value), [ErrorCode::E400]);

    let mapping = r#"Module: Acme.Demo
Items:
  - Mapping: Sizes
    Value:
      prod:
        Region: !Ref AWS::Region
"#;
    assert_eq!(generation_errors(mapping), [ErrorCode::E401]);
}

#[test]
fn test_mappings() {
    let output = generated(
        r#"Module: Acme.Demo
Items:
  - Mapping: Sizes
    Value:
      prod:
        Memory: 512
  - Resource: Memory
    Type: AWS::SSM::Parameter
    Properties:
      Type: String
      Value: !FindInMap [ Sizes, prod, Memory ]
"#,
    );
    assert_eq!(output.template.mappings["Sizes"], json!({ "prod": { "Memory": 512 } }));
    assert_eq!(
        resource(&output.template, "Memory")["Properties"]["Value"],
        json!({ "Fn::FindInMap": ["Sizes", "prod", "Memory"] })
    );
}

#[test]
fn test_function_and_module_role() {
    let output = generated(&format!(
        r#"Module: Acme.Demo
Items:
  - Resource: Queue
    Type: AWS::SQS::Queue
    Scope: Worker
    Allow: sqs:SendMessage
  - Variable: Tags
    Value: [ a, b ]
    Scope: Worker
  - Function: Worker
    Description: Processes jobs
{FUNCTION}    Environment:
      LOG_LEVEL: debug
"#
    ));
    let template = &output.template;
    let function = resource(template, "Worker");
    assert_eq!(function["Type"], "AWS::Lambda::Function");
    let properties = &function["Properties"];
    assert_eq!(
        properties.as_object().unwrap().keys().collect::<Vec<_>>(),
        ["Description", "Code", "Handler", "Runtime", "MemorySize", "Timeout", "Role", "Environment"]
    );
    assert_eq!(
        properties["Code"],
        json!({
            "S3Bucket": { "Ref": "DeploymentBucketName" },
            "S3Key": { "Fn::Sub": "${DeploymentPrefix}Acme/Demo/.artifacts/Worker.zip" },
        })
    );
    assert_eq!(properties["MemorySize"], 128);
    assert_eq!(properties["Role"], json!({ "Fn::GetAtt": ["ModuleRole", "Arn"] }));
    assert_eq!(
        properties["Environment"]["Variables"],
        json!({
            "MODULE_ID": { "Ref": "AWS::StackName" },
            "MODULE_INFO": "Acme.Demo:1.0-DEV",
            "STR_QUEUE": { "Ref": "Queue" },
            "STR_TAGS": { "Fn::Join": [",", ["a", "b"]] },
            "LOG_LEVEL": "debug",
        })
    );

    let role = resource(template, MODULE_ROLE);
    assert_eq!(role["Type"], "AWS::IAM::Role");
    let statements = &role["Properties"]["Policies"][0]["PolicyDocument"]["Statement"];
    assert_eq!(
        statements[0],
        json!({
            "Sid": "Queue",
            "Effect": "Allow",
            "Action": ["sqs:SendMessage"],
            "Resource": [
                { "Fn::GetAtt": ["Queue", "Arn"] },
                { "Fn::Join": ["", [{ "Fn::GetAtt": ["Queue", "Arn"] }, "/*"]] },
            ],
        })
    );
}

#[test]
fn test_language_defaults() {
    let output = generated(
        r#"Module: Acme.Demo
Items:
  - Function: Worker
    Memory: 256
    Timeout: 10
    Language: Python
"#,
    );
    let properties = &resource(&output.template, "Worker")["Properties"];
    assert_eq!(properties["Runtime"], "python3.12");
    assert_eq!(properties["Handler"], "index.handler");
}

#[test]
fn test_public_outputs() {
    let output = generated(
        r#"Module: Acme.Demo
Items:
  - Resource: Queue
    Description: Job queue
    Type: AWS::SQS::Queue
    Scope: public
  - Variable: Endpoint
    Value: https://example.com
    Scope: public
"#,
    );
    assert_eq!(
        output.template.outputs["Queue"],
        json!({
            "Description": "Job queue",
            "Value": { "Ref": "Queue" },
            "Export": { "Name": { "Fn::Sub": "${AWS::StackName}::Queue" } },
        })
    );
    assert_eq!(output.template.outputs["Endpoint"]["Value"], "https://example.com");
    let names: Vec<_> = output.manifest.outputs.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["Queue", "Endpoint"]);
    assert_eq!(output.manifest.outputs[0].r#type.as_deref(), Some("AWS::SQS::Queue"));
}

#[test]
fn test_nested_module() {
    let output = generated(
        r#"Module: Acme.Demo
Items:
  - Parameter: Stage
  - Nested: Child
    Module: Acme.Child:2.1@acme-modules
    Parameters:
      Stage: !Ref Stage
"#,
    );
    assert_eq!(
        resource(&output.template, "Child"),
        &json!({
            "Type": "AWS::CloudFormation::Stack",
            "Properties": {
                "TemplateURL": "https://acme-modules.s3.amazonaws.com/Acme/Child/.templates/2.1/cloudformation.json",
                "Parameters": {
                    "DeploymentBucketName": { "Ref": "DeploymentBucketName" },
                    "DeploymentPrefix": { "Ref": "DeploymentPrefix" },
                    "Stage": { "Ref": "Stage" },
                },
            },
        })
    );
    assert_eq!(output.manifest.dependencies[0].kind, DependencyKind::Nested);
}

#[test]
fn test_resource_type_and_macro() {
    let output = generated(&format!(
        r#"Module: Acme.Demo
Items:
  - ResourceType: Acme::Widget
    Description: A widget
    Handler: WidgetHandler
    Properties:
      - Name: Size
        Type: Number
        Required: true
    Attributes:
      - Name: Id
  - Resource: Widget
    Type: Acme::Widget
    Properties:
      Size: 3
  - Macro: Expand
    Handler: WidgetHandler
  - Function: WidgetHandler
{FUNCTION}"#
    ));
    let template = &output.template;
    assert_eq!(
        resource(template, "Widget"),
        &json!({
            "Type": "Custom::AcmeWidget",
            "Properties": {
                "ServiceToken": { "Fn::GetAtt": ["WidgetHandler", "Arn"] },
                "Size": 3,
            },
        })
    );
    assert_eq!(
        template.outputs["AcmeWidget"]["Export"],
        json!({ "Name": { "Fn::Sub": "${DeploymentPrefix}Acme::Widget" } })
    );
    assert_eq!(
        resource(template, "Expand")["Properties"]["Name"],
        json!({ "Fn::Sub": "${DeploymentPrefix}Expand" })
    );
    let export = &output.manifest.resource_types[0];
    assert_eq!(export.r#type, "Acme::Widget");
    assert!(export.properties[0].required);
    assert_eq!(export.attributes[0].r#type, "String");
}

#[test]
fn test_event_sources() {
    let output = generated(&format!(
        r#"Module: Acme.Demo
Items:
  - Resource: Queue
    Type: AWS::SQS::Queue
  - Resource: Topic
    Type: AWS::SNS::Topic
  - Function: Worker
{FUNCTION}    Sources:
      - Schedule: rate(1 hour)
        Name: hourly
      - Sqs: Queue
        BatchSize: 5
      - Topic: Topic
"#
    ));
    let template = &output.template;
    let rule = resource(template, "WorkerSource1");
    assert_eq!(rule["Type"], "AWS::Events::Rule");
    assert_eq!(rule["Properties"]["ScheduleExpression"], "rate(1 hour)");
    assert_eq!(rule["Properties"]["Targets"][0]["Input"], r#"{"Name":"hourly"}"#);
    assert_eq!(resource(template, "WorkerSource1Permission")["Properties"]["Principal"], "events.amazonaws.com");

    let mapping = resource(template, "WorkerSource2");
    assert_eq!(mapping["Type"], "AWS::Lambda::EventSourceMapping");
    assert_eq!(mapping["Properties"]["BatchSize"], 5);
    assert_eq!(mapping["Properties"]["EventSourceArn"], json!({ "Fn::GetAtt": ["Queue", "Arn"] }));

    let subscription = resource(template, "WorkerSource3");
    assert_eq!(subscription["Type"], "AWS::SNS::Subscription");
    assert_eq!(subscription["Properties"]["TopicArn"], json!({ "Ref": "Topic" }));

    let statements = &resource(template, MODULE_ROLE)["Properties"]["Policies"][0]["PolicyDocument"]["Statement"];
    assert_eq!(statements[0]["Sid"], "WorkerSource2");
    assert_eq!(statements[0]["Action"][0], "sqs:ReceiveMessage");
}

#[test]
fn test_rest_api() {
    let output = generated(&format!(
        r#"Module: Acme.Demo
Items:
  - Function: Items
{FUNCTION}    Sources:
      - Api: GET:/items
      - Api: POST:/items/{{itemId}}
      - SlackCommand: /slack
"#
    ));
    let template = &output.template;
    assert_eq!(resource(template, "ModuleRestApi")["Type"], "AWS::ApiGateway::RestApi");
    assert_eq!(resource(template, "ModuleRestApiItemsResource")["Properties"]["PathPart"], "items");
    assert_eq!(
        resource(template, "ModuleRestApiItemsItemIdResource")["Properties"]["ParentId"],
        json!({ "Ref": "ModuleRestApiItemsResource" })
    );
    let method = resource(template, "ModuleRestApiItemsGetMethod");
    assert_eq!(method["Properties"]["HttpMethod"], "GET");
    assert_eq!(method["Properties"]["AuthorizationType"], "NONE");
    assert_eq!(method["Properties"]["Integration"]["Type"], "AWS_PROXY");
    assert!(template.resource("ModuleRestApiItemsItemIdPostMethod").is_some());
    assert!(template.resource("ModuleRestApiSlackPostMethod").is_some());
    assert_eq!(
        resource(template, "ModuleRestApiDeployment")["DependsOn"],
        json!([
            "ModuleRestApiItemsGetMethod",
            "ModuleRestApiItemsItemIdPostMethod",
            "ModuleRestApiSlackPostMethod"
        ])
    );
    assert_eq!(resource(template, "ModuleRestApiStage")["Properties"]["StageName"], "LATEST");
    assert!(template.resource("ModuleRestApiItemsPermission").is_some());
    assert!(template.outputs.contains_key("ModuleRestApiUrl"));
    assert!(template.validate().is_ok());
}

#[test]
fn test_duplicate_api_route() {
    let content = format!(
        r#"Module: Acme.Demo
Items:
  - Function: First
{FUNCTION}    Sources:
      - Api: GET:/items
  - Function: Second
{FUNCTION}    Sources:
      - Api: GET:/items
"#
    );
    assert_eq!(generation_errors(&content), [ErrorCode::E212]);
}

#[test]
fn test_web_socket() {
    let output = generated(&format!(
        r#"Module: Acme.Demo
Items:
  - Function: Chat
{FUNCTION}    Sources:
      - WebSocket: $connect
      - WebSocket: send
"#
    ));
    let template = &output.template;
    assert_eq!(resource(template, "ModuleWebSocket")["Properties"]["ProtocolType"], "WEBSOCKET");
    assert_eq!(resource(template, "ModuleWebSocketConnectRoute")["Properties"]["RouteKey"], "$connect");
    assert_eq!(
        resource(template, "ModuleWebSocketSendRoute")["Properties"]["Target"],
        json!({ "Fn::Join": ["/", ["integrations", { "Ref": "ModuleWebSocketSendIntegration" }]] })
    );
    assert_eq!(
        resource(template, "ModuleWebSocketDeployment")["DependsOn"],
        json!(["ModuleWebSocketConnectRoute", "ModuleWebSocketSendRoute"])
    );
    assert!(template.outputs.contains_key("ModuleWebSocketUrl"));
}

#[test]
fn test_manifest_hash_and_embedding() {
    let content = "Module: Acme.Demo\nItems:\n  - Resource: Queue\n    Type: AWS::SQS::Queue\n";
    let first = generated(content);
    let second = generated(content);
    assert_eq!(first.manifest.hash.len(), 64);
    assert_eq!(first.manifest.hash, second.manifest.hash);
    assert_eq!(first.manifest.date, "2025-03-01T12:00:00Z");
    assert_eq!(first.manifest.tool_version.as_deref(), Some("0.1.0"));
    assert_eq!(first.manifest.module, "Acme.Demo:1.0-DEV");

    let mut template = first.template.clone();
    let embedded = template.metadata.remove(MANIFEST_METADATA_KEY).unwrap();
    assert_eq!(embedded, serde_json::to_value(&first.manifest).unwrap());
    assert_eq!(checksum(&template.to_value().unwrap()).unwrap(), first.manifest.hash);
}

#[test]
fn test_using_dependencies() {
    let output = generated(
        r#"Module: Acme.Demo
Using:
  - Module: Acme.Things:1.0
Items:
  - Resource: Thing
    Type: Acme::Thing
"#,
    );
    assert_eq!(output.manifest.dependencies[0].module, "Acme.Things:1.0");
    assert_eq!(output.manifest.dependencies[0].kind, DependencyKind::Shared);
    assert_eq!(
        resource(&output.template, "Thing")["Properties"]["ServiceToken"],
        json!({ "Fn::ImportValue": { "Fn::Sub": "${DeploymentPrefix}Acme::Thing" } })
    );
}
