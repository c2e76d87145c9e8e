use crate::config::OpenApiConfig;
use crate::synthesizer::{ApiDocument, Endpoint, ParameterDefault, ParameterSpec, Parameters};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Info,
    /// Server URLs
    servers: Vec<Server>,
    /// Paths collection (URL path -> PathItem), in insertion order
    paths: IndexMap<String, PathItem>,
    /// Every group seen, emitted as a sorted tag list
    tags: BTreeSet<String>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Server object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
}

/// OpenAPI Tag object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// OpenAPI PathItem object. Frappe methods only answer POST.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathItem {
    pub post: Operation,
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Group the operation belongs to
    pub tags: Vec<String>,
    /// Operation summary
    pub summary: String,
    /// Operation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Operation ID
    #[serde(rename = "operationId")]
    pub operation_id: String,
    /// Request body
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses
    pub responses: IndexMap<String, Response>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    /// Whether the request body is required
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type
    pub schema: Schema,
}

/// JSON schema of a request body or one of its properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    pub description: String,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    /// API servers
    pub servers: Vec<Server>,
    /// Tags sorted by name
    pub tags: Vec<Tag>,
    /// API paths
    pub paths: IndexMap<String, PathItem>,
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info: Info {
                title: "Generated API".to_string(),
                version: "1.0.0".to_string(),
                description: Some("API documentation generated from Python code".to_string()),
            },
            servers: Vec::new(),
            paths: IndexMap::new(),
            tags: BTreeSet::new(),
        }
    }

    /// Create a builder with the info and servers of the configuration
    pub fn from_config(config: &OpenApiConfig) -> Self {
        Self::new()
            .with_info(config.title.clone(), config.version.clone(), config.description.clone())
            .with_servers(config.servers.clone())
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: Option<String>) -> Self {
        self.info = Info {
            title,
            version,
            description,
        };
        self
    }

    /// Set the server URLs
    pub fn with_servers(mut self, urls: Vec<String>) -> Self {
        self.servers = urls.into_iter().map(|url| Server { url }).collect();
        self
    }

    /// Add every endpoint of a synthesized document
    pub fn add_document(&mut self, document: &ApiDocument) {
        for (group, endpoints) in &document.groups {
            for endpoint in endpoints {
                self.add_endpoint(group, endpoint);
            }
        }
    }

    /// Add one endpoint under `group`.
    ///
    /// Generic endpoints (`get`, `get_list`, `run_doc_method`) are shared by every doctype; when a
    /// path is already taken the key is suffixed with `#<operationId>`, and a repeated operation
    /// id gets a counter on top (`#Site.get.2`).
    pub fn add_endpoint(&mut self, group: &str, endpoint: &Endpoint) {
        let key = self.unused_key(endpoint);
        debug!("Adding operation {} at {}", endpoint.operation_id, key);

        let request_body = if endpoint.parameters.is_empty() {
            None
        } else {
            let schema = object_schema(&endpoint.parameters);
            Some(RequestBody {
                required: schema.required.is_some(),
                content: {
                    let mut content = IndexMap::new();
                    content.insert("application/json".to_string(), MediaType { schema });
                    content
                },
            })
        };

        let mut responses = IndexMap::new();
        responses.insert(
            "200".to_string(),
            Response {
                description: "Successful response".to_string(),
            },
        );

        let operation = Operation {
            tags: vec![group.to_string()],
            summary: endpoint.operation_id.clone(),
            description: Some(endpoint.description.clone()).filter(|d| !d.is_empty()),
            operation_id: endpoint.operation_id.clone(),
            request_body,
            responses,
        };

        self.tags.insert(group.to_string());
        self.paths.insert(key, PathItem { post: operation });
    }

    fn unused_key(&self, endpoint: &Endpoint) -> String {
        if !self.paths.contains_key(&endpoint.path) {
            return endpoint.path.clone();
        }
        let suffixed = format!("{}#{}", endpoint.path, endpoint.operation_id);
        if !self.paths.contains_key(&suffixed) {
            return suffixed;
        }

        warn!(
            "Operation {} is defined more than once at {}",
            endpoint.operation_id, endpoint.path
        );
        let mut counter = 2;
        loop {
            let key = format!("{}.{}", suffixed, counter);
            if !self.paths.contains_key(&key) {
                return key;
            }
            counter += 1;
        }
    }

    /// Build the final OpenAPI document
    pub fn build(self) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        OpenApiDocument {
            openapi: "3.0.0".to_string(),
            info: self.info,
            servers: self.servers,
            tags: self.tags.into_iter().map(|name| Tag { name }).collect(),
            paths: self.paths,
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Object schema of a parameter map; parameters without a default are required.
fn object_schema(parameters: &Parameters) -> Schema {
    let properties: IndexMap<String, Schema> = parameters
        .iter()
        .map(|(name, spec)| (name.clone(), property_schema(spec)))
        .collect();
    let required: Vec<String> = parameters
        .iter()
        .filter(|(_, spec)| matches!(&spec.default, ParameterDefault::Text(d) if d.is_empty()))
        .map(|(name, _)| name.clone())
        .collect();

    Schema {
        schema_type: "object".to_string(),
        default: None,
        properties: Some(properties),
        required: Some(required).filter(|r| !r.is_empty()),
    }
}

fn property_schema(spec: &ParameterSpec) -> Schema {
    match &spec.default {
        ParameterDefault::Nested(parameters) => object_schema(parameters),
        ParameterDefault::Text(default) => Schema {
            schema_type: json_type(&spec.type_name).to_string(),
            default: Some(default.clone()).filter(|d| !d.is_empty()),
            properties: None,
            required: None,
        },
    }
}

/// JSON schema type of a rendered Python annotation
fn json_type(python_type: &str) -> &'static str {
    let base = python_type.split('[').next().unwrap_or(python_type).trim();
    match base {
        "str" => "string",
        "int" => "integer",
        "float" => "number",
        "bool" => "boolean",
        "dict" | "Dict" | "_dict" | "Mapping" => "object",
        "list" | "List" | "tuple" | "Tuple" | "set" | "Set" | "Sequence" => "array",
        _ => "string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesizer::HttpMethod;

    fn endpoint(path: &str, operation_id: &str, parameters: Parameters) -> Endpoint {
        Endpoint {
            method: HttpMethod::Post,
            path: path.to_string(),
            description: format!("{} description", operation_id),
            parameters,
            operation_id: operation_id.to_string(),
        }
    }

    fn get_info_parameters() -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("site".to_string(), ParameterSpec::text("", "str"));
        parameters.insert("verbose".to_string(), ParameterSpec::text("False", "bool"));
        parameters
    }

    #[test]
    fn test_new_builder() {
        let builder = OpenApiBuilder::new();

        assert_eq!(builder.info.title, "Generated API");
        assert_eq!(builder.info.version, "1.0.0");
        assert!(builder.info.description.is_some());
        assert!(builder.paths.is_empty());
        assert!(builder.servers.is_empty());
    }

    #[test]
    fn test_from_config() {
        let builder = OpenApiBuilder::from_config(&OpenApiConfig::default());

        assert_eq!(builder.info.title, "Press API");
        assert_eq!(builder.servers.len(), 1);
        assert_eq!(builder.servers[0].url, "https://frappecloud.com");
    }

    #[test]
    fn test_add_endpoint_with_parameters() {
        let mut builder = OpenApiBuilder::new();
        builder.add_endpoint(
            "press.api.site",
            &endpoint("/api/method/press.api.site.get_info", "press.api.site.get_info", get_info_parameters()),
        );
        let document = builder.build();

        let operation = &document.paths["/api/method/press.api.site.get_info"].post;
        assert_eq!(operation.tags, vec!["press.api.site".to_string()]);
        assert_eq!(operation.operation_id, "press.api.site.get_info");
        assert!(operation.responses.contains_key("200"));

        let body = operation.request_body.as_ref().unwrap();
        assert!(body.required);
        let schema = &body.content["application/json"].schema;
        assert_eq!(schema.schema_type, "object");
        assert_eq!(schema.required, Some(vec!["site".to_string()]));

        let properties = schema.properties.as_ref().unwrap();
        assert_eq!(properties["site"].schema_type, "string");
        assert_eq!(properties["site"].default, None);
        assert_eq!(properties["verbose"].schema_type, "boolean");
        assert_eq!(properties["verbose"].default.as_deref(), Some("False"));
    }

    #[test]
    fn test_endpoint_without_parameters_has_no_body() {
        let mut builder = OpenApiBuilder::new();
        builder.add_endpoint("press.api.ping", &endpoint("/api/method/press.api.ping.ping", "press.api.ping.ping", Parameters::new()));
        let document = builder.build();

        let operation = &document.paths["/api/method/press.api.ping.ping"].post;
        assert!(operation.request_body.is_none());
        assert_eq!(operation.description.as_deref(), Some("press.api.ping.ping description"));
    }

    #[test]
    fn test_shared_paths_are_disambiguated() {
        let mut builder = OpenApiBuilder::new();
        builder.add_endpoint("Site", &endpoint("/api/method/press.api.client.get", "Site.get", Parameters::new()));
        builder.add_endpoint("Bench", &endpoint("/api/method/press.api.client.get", "Bench.get", Parameters::new()));
        let document = builder.build();

        let keys: Vec<&str> = document.paths.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "/api/method/press.api.client.get",
                "/api/method/press.api.client.get#Bench.get",
            ]
        );
    }

    #[test]
    fn test_repeated_operation_ids_are_all_kept() {
        let mut builder = OpenApiBuilder::new();
        for _ in 0..3 {
            builder.add_endpoint("Site", &endpoint("/api/method/press.api.client.get", "Site.get", Parameters::new()));
        }
        builder.add_endpoint("Bench", &endpoint("/api/method/press.api.client.get", "Bench.get", Parameters::new()));
        let document = builder.build();

        let keys: Vec<&str> = document.paths.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "/api/method/press.api.client.get",
                "/api/method/press.api.client.get#Site.get",
                "/api/method/press.api.client.get#Site.get.2",
                "/api/method/press.api.client.get#Bench.get",
            ]
        );
    }

    #[test]
    fn test_tags_are_sorted_and_unique() {
        let mut builder = OpenApiBuilder::new();
        builder.add_endpoint("press.api.site", &endpoint("/a", "a", Parameters::new()));
        builder.add_endpoint("Site", &endpoint("/b", "b", Parameters::new()));
        builder.add_endpoint("press.api.site", &endpoint("/c", "c", Parameters::new()));
        let document = builder.build();

        let tags: Vec<&str> = document.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tags, vec!["Site", "press.api.site"]);
    }

    #[test]
    fn test_nested_parameters_become_object_properties() {
        let mut args = Parameters::new();
        args.insert("force".to_string(), ParameterSpec::text("False", "bool"));
        args.insert("reason".to_string(), ParameterSpec::text("", "any"));
        let mut parameters = Parameters::new();
        parameters.insert("dt".to_string(), ParameterSpec::text("Site", "str"));
        parameters.insert(
            "args".to_string(),
            ParameterSpec {
                default: ParameterDefault::Nested(args),
                type_name: "dict".to_string(),
            },
        );

        let schema = object_schema(&parameters);
        assert_eq!(schema.required, None);

        let nested = &schema.properties.as_ref().unwrap()["args"];
        assert_eq!(nested.schema_type, "object");
        assert_eq!(nested.required, Some(vec!["reason".to_string()]));
        assert_eq!(nested.properties.as_ref().unwrap()["force"].schema_type, "boolean");
    }

    #[test]
    fn test_json_type_mapping() {
        assert_eq!(json_type("str"), "string");
        assert_eq!(json_type("int"), "integer");
        assert_eq!(json_type("float"), "number");
        assert_eq!(json_type("dict[str, int]"), "object");
        assert_eq!(json_type("List[str]"), "array");
        assert_eq!(json_type("any"), "string");
        assert_eq!(json_type("Optional[str]"), "string");
    }

    #[test]
    fn test_add_document_keeps_group_order() {
        let mut document = ApiDocument::default();
        document
            .groups
            .insert("press.api.zeta".to_string(), vec![endpoint("/z", "z", Parameters::new())]);
        document
            .groups
            .insert("press.api.alpha".to_string(), vec![endpoint("/a", "a", Parameters::new())]);

        let mut builder = OpenApiBuilder::new();
        builder.add_document(&document);
        let openapi = builder.build();

        let keys: Vec<&str> = openapi.paths.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["/z", "/a"]);
        let tags: Vec<&str> = openapi.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tags, vec!["press.api.alpha", "press.api.zeta"]);
    }
}
