use crate::config::Conventions;
use crate::expr::{
    decorator_name, list_of_constants, named_children, node_text, render_annotation,
    simple_assignment, string_literal, Expr,
};
use crate::extractor::{Argument, ClassSymbol, FileSymbolTree, FunctionSymbol, SymbolExtractor};
use crate::parser::ParsedFile;
use log::debug;
use tree_sitter::Node;

/// Python symbol extractor
pub struct PythonExtractor {
    conventions: Conventions,
}

impl SymbolExtractor for PythonExtractor {
    fn extract_symbols(&self, parsed_files: &[ParsedFile]) -> Vec<FileSymbolTree> {
        parsed_files.iter().map(|parsed| self.extract_file(parsed)).collect()
    }
}

/// A positional parameter before default alignment
struct RawParameter {
    name: String,
    annotation: Option<Expr>,
}

impl PythonExtractor {
    pub fn new(conventions: Conventions) -> Self {
        Self { conventions }
    }

    /// Extracts the module-level functions and classes of one file.
    ///
    /// Only direct children of the module are visited: functions nested in functions or
    /// classes never show up as module functions.
    pub fn extract_file(&self, parsed: &ParsedFile) -> FileSymbolTree {
        let source = parsed.source.as_bytes();
        let mut tree = FileSymbolTree::new(parsed.module_path.clone());

        for statement in named_children(parsed.tree.root_node()) {
            let (definition, decorators) = unwrap_decorated(statement, source);
            match definition.kind() {
                "function_definition" => {
                    if let Some(function) = self.extract_function(definition, &decorators, source) {
                        tree.functions.push(function);
                    }
                }
                "class_definition" => {
                    if let Some(class) = self.extract_class(definition, source) {
                        tree.classes.push(class);
                    }
                }
                _ => {}
            }
        }

        debug!(
            "Extracted {} functions and {} classes from {}",
            tree.functions.len(),
            tree.classes.len(),
            tree.module_path
        );
        tree
    }

    fn extract_function(&self, node: Node, decorators: &[String], source: &[u8]) -> Option<FunctionSymbol> {
        let name = node_text(node.child_by_field_name("name")?, source).to_string();

        let docs = node
            .child_by_field_name("body")
            .and_then(|body| docstring(body, source))
            .unwrap_or_default();

        let args = node
            .child_by_field_name("parameters")
            .map(|params| arguments(params, source))
            .unwrap_or_default();

        let is_public_endpoint = decorators.iter().any(|d| *d == self.conventions.public_decorator);
        let is_exposed_method = decorators.iter().any(|d| *d == self.conventions.exposed_decorator);

        Some(FunctionSymbol {
            name,
            docs,
            args,
            decorators: decorators.to_vec(),
            is_public_endpoint,
            is_exposed_method,
        })
    }

    fn extract_class(&self, node: Node, source: &[u8]) -> Option<ClassSymbol> {
        let name = node_text(node.child_by_field_name("name")?, source).to_string();
        let mut methods = Vec::new();
        let mut dashboard_fields = Vec::new();

        if let Some(body) = node.child_by_field_name("body") {
            for statement in named_children(body) {
                let (definition, decorators) = unwrap_decorated(statement, source);
                match definition.kind() {
                    "function_definition" => {
                        if let Some(method) = self.extract_function(definition, &decorators, source) {
                            methods.push(method);
                        }
                    }
                    "expression_statement" => {
                        let Some((target, value)) = simple_assignment(definition, source) else {
                            continue;
                        };
                        if target != self.conventions.dashboard_fields_attr {
                            continue;
                        }
                        if let Some(fields) = list_of_constants(value, source) {
                            dashboard_fields.extend(fields);
                        }
                    }
                    _ => {}
                }
            }
        }

        Some(ClassSymbol {
            name,
            methods,
            dashboard_fields,
        })
    }
}

/// Splits a `decorated_definition` into the definition and its recognised decorator names.
fn unwrap_decorated<'tree>(node: Node<'tree>, source: &[u8]) -> (Node<'tree>, Vec<String>) {
    if node.kind() != "decorated_definition" {
        return (node, Vec::new());
    }
    let Some(definition) = node.child_by_field_name("definition") else {
        return (node, Vec::new());
    };

    let decorators = named_children(node)
        .into_iter()
        .filter(|child| child.kind() == "decorator")
        .filter_map(|decorator| named_children(decorator).into_iter().next())
        .filter_map(|expr| decorator_name(&Expr::from_node(expr, source)))
        .collect();

    (definition, decorators)
}

/// First statement of a body when it is a plain string literal.
fn docstring(body: Node, source: &[u8]) -> Option<String> {
    let first = named_children(body).into_iter().next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let mut literal = match named_children(first).as_slice() {
        [literal] => *literal,
        _ => return None,
    };
    // `("a" "b")` is still a docstring
    while literal.kind() == "parenthesized_expression" {
        literal = match named_children(literal).as_slice() {
            [inner] => *inner,
            _ => return None,
        };
    }
    string_literal(literal, source).map(|docs| docs.trim().to_string())
}

/// Positional arguments of a `parameters` node.
///
/// Defaults are matched to the trailing arguments: with N arguments and D default values the
/// argument at index i gets a default iff i >= N - D. A leading `self` is dropped afterwards.
fn arguments(parameters: Node, source: &[u8]) -> Vec<Argument> {
    let mut positional = Vec::new();
    let mut defaults = Vec::new();

    for param in named_children(parameters) {
        let (name_node, annotation, default) = match param.kind() {
            "identifier" => (Some(param), None, None),
            "typed_parameter" => {
                let first = named_children(param).into_iter().next();
                match first {
                    Some(first) if first.kind() == "identifier" => {
                        (Some(first), param.child_by_field_name("type"), None)
                    }
                    // `*args: T` or `**kwargs: T`
                    _ => break,
                }
            }
            "default_parameter" | "typed_default_parameter" => (
                param.child_by_field_name("name"),
                param.child_by_field_name("type"),
                param.child_by_field_name("value"),
            ),
            "positional_separator" => continue,
            "keyword_separator" | "list_splat_pattern" | "dictionary_splat_pattern" => break,
            _ => continue,
        };

        let Some(name_node) = name_node.filter(|n| n.kind() == "identifier") else {
            continue;
        };
        positional.push(RawParameter {
            name: node_text(name_node, source).to_string(),
            annotation: annotation.map(|ty| Expr::from_node(ty, source)),
        });
        if let Some(value) = default {
            defaults.push(node_text(value, source).to_string());
        }
    }

    let first_default = positional.len().saturating_sub(defaults.len());
    let mut args: Vec<Argument> = positional
        .into_iter()
        .enumerate()
        .map(|(index, param)| {
            let default = if index >= first_default {
                defaults
                    .get(index - first_default)
                    .cloned()
                    .unwrap_or_default()
            } else {
                String::new()
            };
            Argument {
                name: param.name,
                annotation: render_annotation(param.annotation.as_ref()),
                default,
            }
        })
        .collect();

    if args.first().is_some_and(|arg| arg.name == "self") {
        args.remove(0);
    }
    args
}
