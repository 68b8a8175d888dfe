/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Event sources of functions, plus the REST and WebSocket APIs that
//! collect their routes.

use std::collections::HashSet;

use serde_json::{json, Map, Value};

use crate::ast::{ApiSource, Declaration, NodeId, WebSocketSource};
use crate::diagnostics::ErrorCode;
use crate::error::{CompilerError, SerializationError};
use crate::generator::{attribute, reference, sub, Generator, Position, DEPLOYMENT_PREFIX};

const REST_API: &str = "ModuleRestApi";
const WEB_SOCKET: &str = "ModuleWebSocket";
const STAGE_NAME: &str = "LATEST";

const SQS_ACTIONS: &[&str] = &["sqs:ReceiveMessage", "sqs:DeleteMessage", "sqs:GetQueueAttributes"];
const DYNAMODB_STREAM_ACTIONS: &[&str] = &[
    "dynamodb:DescribeStream",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:ListStreams",
];
const KINESIS_ACTIONS: &[&str] = &[
    "kinesis:DescribeStream",
    "kinesis:GetRecords",
    "kinesis:GetShardIterator",
    "kinesis:ListShards",
    "kinesis:ListStreams",
    "kinesis:SubscribeToShard",
];

/// A method of the module REST API.
#[derive(Debug, Clone)]
pub(super) struct RestRoute {
    source: NodeId,
    function: String,
    condition: Option<String>,
    method: String,
    path: String,
    integration: &'static str,
    /// Extra properties of the method resource.
    options: Map<String, Value>,
}

/// A route of the module WebSocket API.
#[derive(Debug, Clone)]
pub(super) struct WebSocketRoute {
    source: NodeId,
    function: String,
    condition: Option<String>,
    route: String,
    options: Map<String, Value>,
}

/// PascalCase concatenation of the alphanumeric runs of `text`, e.g.
/// `{itemId}` becomes `ItemId` and `$connect` becomes `Connect`.
pub(crate) fn pascal_case(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn lambda_uri(function: &str) -> Value {
    sub(format!(
        "arn:${{AWS::Partition}}:apigateway:${{AWS::Region}}:lambda:path/2015-03-31/functions/${{{function}.Arn}}/invocations"
    ))
}

fn with_condition(mut resource: Value, condition: Option<&str>) -> Value {
    if let (Some(condition), Value::Object(object)) = (condition, &mut resource) {
        object.insert("Condition".to_string(), json!(condition));
    }
    resource
}

fn api_options(api: &ApiSource) -> Map<String, Value> {
    let mut options = Map::new();
    if let Some(name) = &api.operation_name {
        options.insert("OperationName".to_string(), json!(name));
    }
    if let Some(required) = api.api_key_required {
        options.insert("ApiKeyRequired".to_string(), json!(required));
    }
    if !api.authorization_scopes.is_empty() {
        options.insert("AuthorizationScopes".to_string(), json!(api.authorization_scopes));
    }
    if let Some(authorizer) = &api.authorizer {
        options.insert("AuthorizerId".to_string(), json!(authorizer));
    }
    options.insert(
        "AuthorizationType".to_string(),
        json!(api.authorization_type.as_deref().unwrap_or("NONE")),
    );
    options
}

fn web_socket_options(web_socket: &WebSocketSource) -> Map<String, Value> {
    let mut options = Map::new();
    if let Some(name) = &web_socket.operation_name {
        options.insert("OperationName".to_string(), json!(name));
    }
    if let Some(required) = web_socket.api_key_required {
        options.insert("ApiKeyRequired".to_string(), json!(required));
    }
    if let Some(authorizer) = &web_socket.authorizer {
        options.insert("AuthorizerId".to_string(), json!(authorizer));
    }
    options.insert(
        "AuthorizationType".to_string(),
        json!(web_socket.authorization_type.as_deref().unwrap_or("NONE")),
    );
    options
}

impl Generator<'_> {
    fn add_permission(
        &mut self,
        logical_id: String,
        function: &str,
        principal: &str,
        source_arn: Option<Value>,
        condition: Option<&str>,
    ) {
        let mut properties = Map::new();
        properties.insert("Action".to_string(), json!("lambda:InvokeFunction"));
        properties.insert("FunctionName".to_string(), attribute(function, "Arn"));
        properties.insert("Principal".to_string(), json!(principal));
        if let Some(source_arn) = source_arn {
            properties.insert("SourceArn".to_string(), source_arn);
        }
        let permission = json!({ "Type": "AWS::Lambda::Permission", "Properties": properties });
        self.add_resource(logical_id, with_condition(permission, condition));
    }

    /// Optional lowered value of an event-source setting.
    fn lower_option(&mut self, id: Option<NodeId>) -> Result<Option<Value>, CompilerError> {
        id.map(|id| self.lower(id, Position::Value)).transpose()
    }

    pub(super) fn generate_event_source(
        &mut self,
        function_id: NodeId,
        source: NodeId,
        index: usize,
    ) -> Result<(), CompilerError> {
        let ast = self.ast;
        let function = self.logical_id(function_id)?;
        let condition = self.condition_of(function_id)?;
        let source_id = format!("{function}Source{index}");
        let function_arn = attribute(function, "Arn");
        let declaration = ast
            .declaration(source)
            .ok_or_else(|| CompilerError::internal(format!("node {source} is not a declaration")))?;

        match declaration {
            Declaration::Api(api) => {
                let (method, path) = api
                    .api
                    .split_once(':')
                    .ok_or_else(|| CompilerError::internal(format!("invalid API route `{}`", api.api)))?;
                let integration = match api.integration.as_deref() {
                    Some(integration) if integration.eq_ignore_ascii_case("aws") => "AWS",
                    _ => "AWS_PROXY",
                };
                self.rest_routes.push(RestRoute {
                    source,
                    function: function.to_string(),
                    condition: condition.map(str::to_string),
                    method: method.to_ascii_uppercase(),
                    path: path.to_string(),
                    integration,
                    options: api_options(api),
                });
            }
            Declaration::SlackCommand(slack) => {
                let mut options = Map::new();
                options.insert("AuthorizationType".to_string(), json!("NONE"));
                self.rest_routes.push(RestRoute {
                    source,
                    function: function.to_string(),
                    condition: condition.map(str::to_string),
                    method: "POST".to_string(),
                    path: slack.path.clone(),
                    integration: "AWS_PROXY",
                    options,
                });
            }
            Declaration::WebSocket(web_socket) => {
                self.web_socket_routes.push(WebSocketRoute {
                    source,
                    function: function.to_string(),
                    condition: condition.map(str::to_string),
                    route: web_socket.route.clone(),
                    options: web_socket_options(web_socket),
                });
            }
            Declaration::Schedule(schedule) => {
                let mut target = Map::new();
                target.insert("Id".to_string(), json!(source_id));
                target.insert("Arn".to_string(), function_arn);
                if let Some(name) = &schedule.name {
                    let input = serde_json::to_string(&json!({ "Name": name }))
                        .map_err(SerializationError::from)?;
                    target.insert("Input".to_string(), json!(input));
                }
                let rule = json!({
                    "Type": "AWS::Events::Rule",
                    "Properties": {
                        "ScheduleExpression": self.lower(schedule.expression, Position::Value)?,
                        "State": "ENABLED",
                        "Targets": [target],
                    },
                });
                self.add_resource(source_id.clone(), with_condition(rule, condition));
                let source_arn = attribute(&source_id, "Arn");
                self.add_permission(
                    format!("{source_id}Permission"),
                    function,
                    "events.amazonaws.com",
                    Some(source_arn),
                    condition,
                );
            }
            Declaration::EventBus(event_bus) => {
                let bus = if event_bus.bus == "default" {
                    json!("default")
                } else {
                    let target = self.name_binding(source, &event_bus.bus)?;
                    self.arn_value(target)?
                };
                let rule = json!({
                    "Type": "AWS::Events::Rule",
                    "Properties": {
                        "EventBusName": bus,
                        "EventPattern": self.lower(event_bus.pattern, Position::Value)?,
                        "State": "ENABLED",
                        "Targets": [{ "Id": source_id, "Arn": function_arn }],
                    },
                });
                self.add_resource(source_id.clone(), with_condition(rule, condition));
                let source_arn = attribute(&source_id, "Arn");
                self.add_permission(
                    format!("{source_id}Permission"),
                    function,
                    "events.amazonaws.com",
                    Some(source_arn),
                    condition,
                );
            }
            Declaration::S3(s3) => {
                let target = self.name_binding(source, &s3.bucket)?;
                let bucket = self.arn_value(target)?;
                let permission = format!("{source_id}Permission");
                self.add_permission(
                    permission.clone(),
                    function,
                    "s3.amazonaws.com",
                    Some(bucket.clone()),
                    condition,
                );
                let events = if s3.events.is_empty() {
                    vec!["s3:ObjectCreated:*".to_string()]
                } else {
                    s3.events.clone()
                };
                let mut filter = Map::new();
                filter.insert("Events".to_string(), json!(events));
                if let Some(prefix) = &s3.prefix {
                    filter.insert("Prefix".to_string(), json!(prefix));
                }
                if let Some(suffix) = &s3.suffix {
                    filter.insert("Suffix".to_string(), json!(suffix));
                }
                let subscription = json!({
                    "Type": "Custom::S3Subscription",
                    "Properties": {
                        "ServiceToken": {
                            "Fn::ImportValue": sub(format!("${{{DEPLOYMENT_PREFIX}}}Cumulus::S3::Subscription"))
                        },
                        "Bucket": bucket,
                        "Function": function_arn,
                        "Filters": [filter],
                    },
                    "DependsOn": [permission],
                });
                self.add_resource(format!("{source_id}Subscription"), with_condition(subscription, condition));
            }
            Declaration::Topic(topic) => {
                let target = self.name_binding(source, &topic.topic)?;
                let topic_arn = self.arn_value(target)?;
                let mut properties = Map::new();
                properties.insert("Endpoint".to_string(), function_arn);
                properties.insert("Protocol".to_string(), json!("lambda"));
                properties.insert("TopicArn".to_string(), topic_arn.clone());
                if let Some(filters) = self.lower_option(topic.filters)? {
                    properties.insert("FilterPolicy".to_string(), filters);
                }
                let subscription = json!({ "Type": "AWS::SNS::Subscription", "Properties": properties });
                self.add_resource(source_id.clone(), with_condition(subscription, condition));
                self.add_permission(
                    format!("{source_id}Permission"),
                    function,
                    "sns.amazonaws.com",
                    Some(topic_arn),
                    condition,
                );
            }
            Declaration::Sqs(sqs) => {
                let target = self.name_binding(source, &sqs.queue)?;
                let queue_arn = self.arn_value(target)?;
                let mut properties = Map::new();
                if let Some(batch_size) = self.lower_option(sqs.batch_size)? {
                    properties.insert("BatchSize".to_string(), batch_size);
                }
                properties.insert("Enabled".to_string(), json!(true));
                properties.insert("EventSourceArn".to_string(), queue_arn.clone());
                properties.insert("FunctionName".to_string(), reference(function));
                self.add_event_source_mapping(source_id.clone(), properties, condition);
                self.allow(source_id, SQS_ACTIONS, queue_arn);
            }
            Declaration::DynamoDb(stream) => {
                let target = self.name_binding(source, &stream.table)?;
                let stream_arn = match ast.declaration(target) {
                    Some(Declaration::Resource(resource)) if resource.r#type.is_some() => {
                        attribute(self.logical_id(target)?, "StreamArn")
                    }
                    _ => self.arn_value(target)?,
                };
                let properties = self.stream_properties(
                    stream.batch_size,
                    stream.starting_position.as_deref(),
                    stream.maximum_batching_window,
                    stream_arn.clone(),
                    function,
                )?;
                self.add_event_source_mapping(source_id.clone(), properties, condition);
                self.allow(source_id, DYNAMODB_STREAM_ACTIONS, stream_arn);
            }
            Declaration::Kinesis(stream) => {
                let target = self.name_binding(source, &stream.stream)?;
                let stream_arn = self.arn_value(target)?;
                let properties = self.stream_properties(
                    stream.batch_size,
                    stream.starting_position.as_deref(),
                    stream.maximum_batching_window,
                    stream_arn.clone(),
                    function,
                )?;
                self.add_event_source_mapping(source_id.clone(), properties, condition);
                self.allow(source_id, KINESIS_ACTIONS, stream_arn);
            }
            Declaration::Alexa(alexa) => {
                let mut properties = Map::new();
                properties.insert("Action".to_string(), json!("lambda:InvokeFunction"));
                properties.insert("FunctionName".to_string(), function_arn);
                properties.insert("Principal".to_string(), json!("alexa-appkit.amazon.com"));
                if let Some(skill) = self.lower_option(alexa.skill)? {
                    properties.insert("EventSourceToken".to_string(), skill);
                }
                let permission = json!({ "Type": "AWS::Lambda::Permission", "Properties": properties });
                self.add_resource(format!("{source_id}Permission"), with_condition(permission, condition));
            }
            other => {
                return Err(CompilerError::internal(format!(
                    "{} {source} is not an event source",
                    other.kind().describe()
                )))
            }
        }
        Ok(())
    }

    fn stream_properties(
        &mut self,
        batch_size: Option<NodeId>,
        starting_position: Option<&str>,
        maximum_batching_window: Option<NodeId>,
        stream_arn: Value,
        function: &str,
    ) -> Result<Map<String, Value>, CompilerError> {
        let mut properties = Map::new();
        if let Some(batch_size) = self.lower_option(batch_size)? {
            properties.insert("BatchSize".to_string(), batch_size);
        }
        if let Some(window) = self.lower_option(maximum_batching_window)? {
            properties.insert("MaximumBatchingWindowInSeconds".to_string(), window);
        }
        properties.insert("Enabled".to_string(), json!(true));
        properties.insert("EventSourceArn".to_string(), stream_arn);
        properties.insert("FunctionName".to_string(), reference(function));
        properties.insert(
            "StartingPosition".to_string(),
            json!(starting_position.unwrap_or("LATEST")),
        );
        Ok(properties)
    }

    fn add_event_source_mapping(
        &mut self,
        logical_id: String,
        properties: Map<String, Value>,
        condition: Option<&str>,
    ) {
        let mapping = json!({ "Type": "AWS::Lambda::EventSourceMapping", "Properties": properties });
        self.add_resource(logical_id, with_condition(mapping, condition));
    }

    /// Emits the REST API, its path resources and methods, one invoke
    /// permission per function, the deployment and the `LATEST` stage.
    pub(super) fn generate_rest_api(&mut self) -> Result<(), CompilerError> {
        if self.rest_routes.is_empty() {
            return Ok(());
        }
        let routes = std::mem::take(&mut self.rest_routes);
        let api = reference(REST_API);
        self.add_resource(
            REST_API,
            json!({
                "Type": "AWS::ApiGateway::RestApi",
                "Properties": {
                    "Name": sub("${AWS::StackName} Module API"),
                    "Description": format!("{} REST API", self.model.module().full_name()),
                    "FailOnWarnings": true,
                },
            }),
        );

        let mut paths: HashSet<String> = HashSet::new();
        let mut methods: Vec<String> = Vec::new();
        let mut permissions: Vec<&str> = Vec::new();
        for route in &routes {
            let segments: Vec<&str> = route.path.split('/').filter(|s| !s.is_empty()).collect();
            let mut parent = attribute(REST_API, "RootResourceId");
            let mut prefix = String::new();
            for (depth, segment) in segments.iter().enumerate() {
                prefix.push_str(&pascal_case(segment));
                let resource_id = format!("{REST_API}{prefix}Resource");
                if paths.insert(segments[..=depth].join("/")) {
                    self.add_resource(
                        resource_id.clone(),
                        json!({
                            "Type": "AWS::ApiGateway::Resource",
                            "Properties": {
                                "ParentId": parent,
                                "PathPart": segment,
                                "RestApiId": api,
                            },
                        }),
                    );
                }
                parent = reference(&resource_id);
            }
            let path_name = if segments.is_empty() { "Root".to_string() } else { prefix };
            let method_id = format!("{REST_API}{path_name}{}Method", pascal_case(&route.method.to_ascii_lowercase()));
            if self.template.resources.contains_key(&method_id) {
                self.error(
                    ErrorCode::E212,
                    format!("API route `{}:{}` is declared more than once", route.method, route.path),
                    route.source,
                );
                continue;
            }

            let mut properties = route.options.clone();
            properties.insert("HttpMethod".to_string(), json!(route.method));
            properties.insert("ResourceId".to_string(), parent);
            properties.insert("RestApiId".to_string(), api.clone());
            properties.insert(
                "Integration".to_string(),
                json!({
                    "Type": route.integration,
                    "IntegrationHttpMethod": "POST",
                    "Uri": lambda_uri(&route.function),
                }),
            );
            let method = json!({ "Type": "AWS::ApiGateway::Method", "Properties": properties });
            self.add_resource(method_id.clone(), with_condition(method, route.condition.as_deref()));
            methods.push(method_id);

            if !permissions.contains(&route.function.as_str()) {
                permissions.push(&route.function);
                self.add_permission(
                    format!("{REST_API}{}Permission", route.function),
                    &route.function,
                    "apigateway.amazonaws.com",
                    Some(sub(format!(
                        "arn:${{AWS::Partition}}:execute-api:${{AWS::Region}}:${{AWS::AccountId}}:${{{REST_API}}}/*/*"
                    ))),
                    route.condition.as_deref(),
                );
            }
        }

        let deployment = format!("{REST_API}Deployment");
        self.add_resource(
            deployment.clone(),
            json!({
                "Type": "AWS::ApiGateway::Deployment",
                "Properties": { "RestApiId": api, "Description": sub("${AWS::StackName} API") },
                "DependsOn": methods,
            }),
        );
        self.add_resource(
            format!("{REST_API}Stage"),
            json!({
                "Type": "AWS::ApiGateway::Stage",
                "Properties": {
                    "RestApiId": api,
                    "DeploymentId": reference(&deployment),
                    "StageName": STAGE_NAME,
                },
            }),
        );
        self.template.outputs.insert(
            format!("{REST_API}Url"),
            json!({
                "Description": "Module REST API URL",
                "Value": sub(format!(
                    "https://${{{REST_API}}}.execute-api.${{AWS::Region}}.${{AWS::URLSuffix}}/{STAGE_NAME}/"
                )),
            }),
        );
        Ok(())
    }

    /// Emits the WebSocket API with one integration and route per source.
    pub(super) fn generate_web_socket(&mut self) -> Result<(), CompilerError> {
        if self.web_socket_routes.is_empty() {
            return Ok(());
        }
        let routes = std::mem::take(&mut self.web_socket_routes);
        let api = reference(WEB_SOCKET);
        self.add_resource(
            WEB_SOCKET,
            json!({
                "Type": "AWS::ApiGatewayV2::Api",
                "Properties": {
                    "Name": sub("${AWS::StackName} Module WebSocket"),
                    "ProtocolType": "WEBSOCKET",
                    "RouteSelectionExpression": "$request.body.action",
                },
            }),
        );

        let mut route_ids: Vec<String> = Vec::new();
        let mut permissions: Vec<&str> = Vec::new();
        for route in &routes {
            let name = pascal_case(&route.route);
            let integration = format!("{WEB_SOCKET}{name}Integration");
            let route_id = format!("{WEB_SOCKET}{name}Route");
            if self.template.resources.contains_key(&route_id) {
                self.error(
                    ErrorCode::E212,
                    format!("WebSocket route `{}` is declared more than once", route.route),
                    route.source,
                );
                continue;
            }
            let condition = route.condition.as_deref();
            self.add_resource(
                integration.clone(),
                with_condition(
                    json!({
                        "Type": "AWS::ApiGatewayV2::Integration",
                        "Properties": {
                            "ApiId": api,
                            "IntegrationType": "AWS_PROXY",
                            "IntegrationUri": lambda_uri(&route.function),
                        },
                    }),
                    condition,
                ),
            );
            let mut properties = route.options.clone();
            properties.insert("ApiId".to_string(), api.clone());
            properties.insert("RouteKey".to_string(), json!(route.route));
            properties.insert(
                "Target".to_string(),
                json!({ "Fn::Join": ["/", ["integrations", reference(&integration)]] }),
            );
            self.add_resource(
                route_id.clone(),
                with_condition(
                    json!({ "Type": "AWS::ApiGatewayV2::Route", "Properties": properties }),
                    condition,
                ),
            );
            route_ids.push(route_id);

            if !permissions.contains(&route.function.as_str()) {
                permissions.push(&route.function);
                self.add_permission(
                    format!("{WEB_SOCKET}{}Permission", route.function),
                    &route.function,
                    "apigateway.amazonaws.com",
                    Some(sub(format!(
                        "arn:${{AWS::Partition}}:execute-api:${{AWS::Region}}:${{AWS::AccountId}}:${{{WEB_SOCKET}}}/*"
                    ))),
                    condition,
                );
            }
        }

        let deployment = format!("{WEB_SOCKET}Deployment");
        self.add_resource(
            deployment.clone(),
            json!({
                "Type": "AWS::ApiGatewayV2::Deployment",
                "Properties": { "ApiId": api },
                "DependsOn": route_ids,
            }),
        );
        self.add_resource(
            format!("{WEB_SOCKET}Stage"),
            json!({
                "Type": "AWS::ApiGatewayV2::Stage",
                "Properties": {
                    "ApiId": api,
                    "DeploymentId": reference(&deployment),
                    "StageName": STAGE_NAME,
                },
            }),
        );
        self.template.outputs.insert(
            format!("{WEB_SOCKET}Url"),
            json!({
                "Description": "Module WebSocket URL",
                "Value": sub(format!(
                    "wss://${{{WEB_SOCKET}}}.execute-api.${{AWS::Region}}.${{AWS::URLSuffix}}/{STAGE_NAME}"
                )),
            }),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("items"), "Items");
        assert_eq!(pascal_case("{itemId}"), "ItemId");
        assert_eq!(pascal_case("$connect"), "Connect");
        assert_eq!(pascal_case("send-message"), "SendMessage");
        assert_eq!(pascal_case("get"), "Get");
    }

    #[test]
    fn test_with_condition() {
        let resource = with_condition(json!({ "Type": "X" }), Some("IsProd"));
        assert_eq!(resource["Condition"], "IsProd");
        assert!(with_condition(json!({ "Type": "X" }), None).get("Condition").is_none());
    }
}
