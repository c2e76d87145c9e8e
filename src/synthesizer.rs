//! API document synthesis.
//!
//! Turns the extracted symbol trees into endpoint descriptors, grouped by module path (for
//! whitelisted functions) or by class name (for allow-listed doctypes).

use crate::allowlist::DoctypeAllowList;
use crate::config::EndpointConfig;
use crate::extractor::{Argument, ClassSymbol, FileSymbolTree, FunctionSymbol};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;

/// HTTP method of a generated endpoint. Frappe methods are always called with POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HttpMethod {
    #[serde(rename = "POST")]
    Post,
}

/// Parameters of an endpoint, in declaration order
pub type Parameters = IndexMap<String, ParameterSpec>;

/// Default value and type of one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    pub default: ParameterDefault,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A parameter default: source text, or the argument map of a dispatched method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParameterDefault {
    Text(String),
    Nested(Parameters),
}

/// One endpoint of the generated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: String,
    pub description: String,
    pub parameters: Parameters,
    /// Unique name of the operation (`press.api.site.get`, `Site.restart`, ...)
    #[serde(skip)]
    pub operation_id: String,
}

/// The synthesized document: group name to endpoints, in visit order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ApiDocument {
    pub groups: IndexMap<String, Vec<Endpoint>>,
}

impl ApiDocument {
    /// Total number of endpoints over all groups
    pub fn endpoint_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

impl ParameterSpec {
    /// Create a parameter with a textual default
    pub fn text(default: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            default: ParameterDefault::Text(default.into()),
            type_name: type_name.into(),
        }
    }
}

/// Builds the [`ApiDocument`] from symbol trees.
pub struct ApiDocSynthesizer<'a> {
    endpoints: &'a EndpointConfig,
    allow_list: &'a DoctypeAllowList,
}

impl<'a> ApiDocSynthesizer<'a> {
    pub fn new(endpoints: &'a EndpointConfig, allow_list: &'a DoctypeAllowList) -> Self {
        Self { endpoints, allow_list }
    }

    /// Runs both passes and drops the groups that ended up empty.
    ///
    /// Module groups come first, in scan order, followed by the doctype groups in the order
    /// their classes were found.
    pub fn synthesize(&self, trees: &[FileSymbolTree]) -> ApiDocument {
        let mut groups: IndexMap<String, Vec<Endpoint>> = IndexMap::new();

        for tree in trees {
            let endpoints = groups.entry(tree.module_path.clone()).or_default();
            for function in tree.functions.iter().filter(|f| f.is_public_endpoint) {
                endpoints.push(self.method_endpoint(&tree.module_path, function));
            }
        }

        let mut class_modules: HashMap<&str, &str> = HashMap::new();
        let classes = trees
            .iter()
            .flat_map(|tree| tree.classes.iter().map(move |class| (tree.module_path.as_str(), class)));
        for (module_path, class) in classes {
            let doctype = camel_case_to_words(&class.name);
            if !self.allow_list.contains(&doctype) {
                continue;
            }
            match class_modules.get(class.name.as_str()) {
                Some(first) if *first != module_path => warn!(
                    "Class {} is defined in both {} and {}; their endpoints share one group",
                    class.name, first, module_path
                ),
                Some(_) => {}
                None => {
                    class_modules.insert(&class.name, module_path);
                }
            }
            debug!("Synthesizing document endpoints for {} ({})", class.name, doctype);
            groups
                .entry(class.name.clone())
                .or_default()
                .extend(self.document_endpoints(class, &doctype));
        }

        groups.retain(|_, endpoints| !endpoints.is_empty());

        let document = ApiDocument { groups };
        info!(
            "Synthesized {} endpoints in {} groups",
            document.endpoint_count(),
            document.groups.len()
        );
        document
    }

    /// Endpoint of a whitelisted module function.
    fn method_endpoint(&self, module_path: &str, function: &FunctionSymbol) -> Endpoint {
        let dotted = format!("{}.{}", module_path, function.name);
        debug!("Endpoint for whitelisted function {}", dotted);
        Endpoint {
            method: HttpMethod::Post,
            path: format!("{}{}", self.endpoints.method_prefix, dotted),
            description: function.docs.clone(),
            parameters: argument_map(&function.args),
            operation_id: dotted,
        }
    }

    /// Dispatch endpoints for the exposed methods, then the fetch-one and fetch-list endpoints.
    fn document_endpoints(&self, class: &ClassSymbol, doctype: &str) -> Vec<Endpoint> {
        let placeholder = &self.endpoints.name_placeholder;
        let listed_fields = class.dashboard_fields.join(", ");
        let mut endpoints = Vec::new();

        for method in class.methods.iter().filter(|m| m.is_exposed_method) {
            let mut parameters = Parameters::new();
            parameters.insert("dt".to_string(), ParameterSpec::text(doctype, "str"));
            parameters.insert("dn".to_string(), ParameterSpec::text(placeholder.as_str(), "str"));
            parameters.insert("method".to_string(), ParameterSpec::text(method.name.as_str(), "str"));
            if !method.args.is_empty() {
                parameters.insert(
                    "args".to_string(),
                    ParameterSpec {
                        default: ParameterDefault::Nested(argument_map(&method.args)),
                        type_name: "dict".to_string(),
                    },
                );
            }

            endpoints.push(Endpoint {
                method: HttpMethod::Post,
                path: self.endpoints.dispatch_path.clone(),
                description: method.docs.clone(),
                parameters,
                operation_id: format!("{}.{}", class.name, method.name),
            });
        }

        let mut parameters = Parameters::new();
        parameters.insert("doctype".to_string(), ParameterSpec::text(doctype, "str"));
        parameters.insert("name".to_string(), ParameterSpec::text(placeholder.as_str(), "str"));
        endpoints.push(Endpoint {
            method: HttpMethod::Post,
            path: self.endpoints.get_path.clone(),
            description: format!(
                "Returns the {} document with the given name. Dashboard fields: {}",
                doctype, listed_fields
            ),
            parameters,
            operation_id: format!("{}.get", class.name),
        });

        let fields = serde_json::to_string(&class.dashboard_fields).unwrap_or_default();
        let mut parameters = Parameters::new();
        parameters.insert("doctype".to_string(), ParameterSpec::text(doctype, "str"));
        parameters.insert("fields".to_string(), ParameterSpec::text(fields, "list"));
        parameters.insert("filters".to_string(), ParameterSpec::text("", "dict"));
        parameters.insert("order_by".to_string(), ParameterSpec::text("", "str"));
        parameters.insert("start".to_string(), ParameterSpec::text("0", "int"));
        parameters.insert(
            "limit".to_string(),
            ParameterSpec::text(self.endpoints.list_limit.as_str(), "int"),
        );
        parameters.insert("parent".to_string(), ParameterSpec::text("", "str"));
        endpoints.push(Endpoint {
            method: HttpMethod::Post,
            path: self.endpoints.list_path.clone(),
            description: format!(
                "Returns a list of {} documents. Dashboard fields: {}",
                doctype, listed_fields
            ),
            parameters,
            operation_id: format!("{}.get_list", class.name),
        });

        endpoints
    }
}

/// Parameter map of a function's arguments; unannotated arguments get type `any`.
fn argument_map(args: &[Argument]) -> Parameters {
    args.iter()
        .map(|arg| {
            let type_name = if arg.annotation.is_empty() {
                "any"
            } else {
                arg.annotation.as_str()
            };
            (arg.name.clone(), ParameterSpec::text(arg.default.as_str(), type_name))
        })
        .collect()
}

/// Splits a class name into the words of its doctype name.
///
/// A space goes before every uppercase character (except the first) that is followed or
/// preceded by a lowercase one: `SiteConfig` becomes `Site Config`, `HTTPServer` becomes
/// `HTTP Server` and `DNS` stays `DNS`.
pub fn camel_case_to_words(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut words = String::with_capacity(name.len() + 4);

    for (index, &c) in chars.iter().enumerate() {
        if index > 0 && c.is_uppercase() {
            let next_is_lower = chars.get(index + 1).is_some_and(|n| n.is_lowercase());
            let prev_is_lower = chars[index - 1].is_lowercase();
            if next_is_lower || prev_is_lower {
                words.push(' ');
            }
        }
        words.push(c);
    }

    words
}
