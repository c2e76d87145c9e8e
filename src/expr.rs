//! Expression shapes used by the symbol extractor.
//!
//! Annotations and decorators are lowered from `tree-sitter` nodes into the small closed
//! [`Expr`] enum before anything inspects them. Shapes the generator does not care about are
//! kept as [`Expr::Other`] with their source text, so rendering never fails.
//!
//! The module also hosts the literal helpers shared by the extractor and the allow-list loader:
//! string literal decoding, list-of-constants extraction and simple assignment matching.

use tree_sitter::Node;

/// A Python expression, reduced to the shapes annotations and decorators are made of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// `int`
    Name(String),
    /// `typing.Optional`
    Attribute { value: Box<Expr>, attr: String },
    /// `dict[str, int]`
    Subscript { value: Box<Expr>, args: Vec<Expr> },
    /// `str, int` inside a subscript
    Tuple(Vec<Expr>),
    /// `frappe.whitelist(allow_guest=True)`
    Call { function: Box<Expr>, text: String },
    /// Anything else, as written in the source
    Other(String),
}

impl Expr {
    /// Lowers a syntax node into an [`Expr`].
    pub fn from_node(node: Node, source: &[u8]) -> Expr {
        match node.kind() {
            "identifier" => Expr::Name(node_text(node, source).to_string()),
            "type" | "parenthesized_expression" => match only_named_child(node) {
                Some(inner) => Expr::from_node(inner, source),
                None => Expr::Other(node_text(node, source).to_string()),
            },
            "attribute" => {
                match (node.child_by_field_name("object"), node.child_by_field_name("attribute")) {
                    (Some(object), Some(attr)) => Expr::Attribute {
                        value: Box::new(Expr::from_node(object, source)),
                        attr: node_text(attr, source).to_string(),
                    },
                    _ => Expr::Other(node_text(node, source).to_string()),
                }
            }
            // `a.B` in annotation position with newer grammars
            "member_type" => {
                let children = named_children(node);
                match (children.first(), children.last()) {
                    (Some(object), Some(attr)) if children.len() == 2 && attr.kind() == "identifier" => {
                        Expr::Attribute {
                            value: Box::new(Expr::from_node(*object, source)),
                            attr: node_text(*attr, source).to_string(),
                        }
                    }
                    _ => Expr::Other(node_text(node, source).to_string()),
                }
            }
            "subscript" => {
                let Some(value) = node.child_by_field_name("value") else {
                    return Expr::Other(node_text(node, source).to_string());
                };
                let mut cursor = node.walk();
                let args = node
                    .children_by_field_name("subscript", &mut cursor)
                    .map(|arg| Expr::from_node(arg, source))
                    .collect();
                Expr::Subscript {
                    value: Box::new(Expr::from_node(value, source)),
                    args,
                }
            }
            // `list[str]` in annotation position with newer grammars
            "generic_type" => {
                let children = named_children(node);
                let base = children.iter().find(|c| c.kind() != "type_parameter");
                let params = children.iter().find(|c| c.kind() == "type_parameter");
                match (base, params) {
                    (Some(base), Some(params)) => Expr::Subscript {
                        value: Box::new(Expr::from_node(*base, source)),
                        args: named_children(*params)
                            .into_iter()
                            .map(|arg| Expr::from_node(arg, source))
                            .collect(),
                    },
                    _ => Expr::Other(node_text(node, source).to_string()),
                }
            }
            "tuple" | "expression_list" => Expr::Tuple(
                named_children(node)
                    .into_iter()
                    .map(|elt| Expr::from_node(elt, source))
                    .collect(),
            ),
            "call" => match node.child_by_field_name("function") {
                Some(function) => Expr::Call {
                    function: Box::new(Expr::from_node(function, source)),
                    text: node_text(node, source).to_string(),
                },
                None => Expr::Other(node_text(node, source).to_string()),
            },
            _ => Expr::Other(node_text(node, source).to_string()),
        }
    }

    /// Renders the expression as a human readable type.
    ///
    /// Qualified names keep only their last segment (`typing.Optional[str]` becomes
    /// `Optional[str]`); unknown shapes fall back to their source text.
    pub fn render(&self) -> String {
        match self {
            Expr::Name(name) => name.clone(),
            Expr::Attribute { attr, .. } => attr.clone(),
            Expr::Subscript { value, args } => {
                format!("{}[{}]", value.render(), render_list(args))
            }
            Expr::Tuple(elts) => render_list(elts),
            Expr::Call { text, .. } | Expr::Other(text) => text.clone(),
        }
    }
}

fn render_list(exprs: &[Expr]) -> String {
    exprs.iter().map(Expr::render).collect::<Vec<_>>().join(", ")
}

/// Renders an optional annotation, an absent one renders as the empty string.
pub fn render_annotation(annotation: Option<&Expr>) -> String {
    annotation.map(Expr::render).unwrap_or_default()
}

/// Returns the dotted name of a decorator expression.
///
/// Only `@pkg.deco`, `@pkg.deco(...)` and `@deco(...)` are recognised. A bare `@deco`, a longer
/// chain such as `@a.b.c` and any other shape yield `None` and must be left out of the decorator
/// list.
pub fn decorator_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Call { function, .. } => match function.as_ref() {
            Expr::Name(name) => Some(name.clone()),
            other => qualified_name(other),
        },
        other => qualified_name(other),
    }
}

/// `pkg.name`, with exactly one qualifying segment.
fn qualified_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Attribute { value, attr } => match value.as_ref() {
            Expr::Name(prefix) => Some(format!("{}.{}", prefix, attr)),
            _ => None,
        },
        _ => None,
    }
}

/// Source text of a node, empty if it is not valid UTF-8.
pub fn node_text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// Named children without comments.
pub fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn only_named_child(node: Node) -> Option<Node> {
    let children = named_children(node);
    if children.len() == 1 {
        children.into_iter().next()
    } else {
        None
    }
}

/// Matches `name = value` (single plain target, no annotation).
pub fn simple_assignment<'tree>(statement: Node<'tree>, source: &[u8]) -> Option<(String, Node<'tree>)> {
    if statement.kind() != "expression_statement" {
        return None;
    }
    let assignment = only_named_child(statement)?;
    if assignment.kind() != "assignment" || assignment.child_by_field_name("type").is_some() {
        return None;
    }
    let left = assignment.child_by_field_name("left")?;
    let right = assignment.child_by_field_name("right")?;
    if left.kind() != "identifier" {
        return None;
    }
    Some((node_text(left, source).to_string(), right))
}

/// Literal constants of a list display, in order.
///
/// Returns `None` when `node` is not a list; elements that are not constants are skipped.
pub fn list_of_constants(node: Node, source: &[u8]) -> Option<Vec<String>> {
    if node.kind() != "list" {
        return None;
    }
    Some(
        named_children(node)
            .into_iter()
            .filter_map(|elt| constant_literal(elt, source))
            .collect(),
    )
}

/// Value of a literal constant: decoded text for strings, source text for other constants.
pub fn constant_literal(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "string" | "concatenated_string" => string_literal(node, source),
        "integer" | "float" | "true" | "false" | "none" | "ellipsis" => {
            Some(node_text(node, source).to_string())
        }
        _ => None,
    }
}

/// Decoded value of a `str` literal; f-strings and bytes yield `None`.
pub fn string_literal(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => decode_string(node_text(node, source)),
        "concatenated_string" => named_children(node)
            .into_iter()
            .map(|part| string_literal(part, source))
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.concat()),
        _ => None,
    }
}

fn decode_string(text: &str) -> Option<String> {
    let quote_at = text.find(&['"', '\''][..])?;
    let prefix = text[..quote_at].to_ascii_lowercase();
    if prefix.contains('f') || prefix.contains('b') {
        return None;
    }

    let quoted = &text[quote_at..];
    let delimiter = if quoted.starts_with("\"\"\"") || quoted.starts_with("'''") {
        3
    } else {
        1
    };
    if quoted.len() < delimiter * 2 {
        return None;
    }
    let body = &quoted[delimiter..quoted.len() - delimiter];

    if prefix.contains('r') {
        Some(body.to_string())
    } else {
        Some(unescape(body))
    }
}

/// Decodes the escape sequences of a non-raw `str` literal.
///
/// `\N{NAME}` is kept as written: resolving it needs the Unicode name table.
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\u{07}'),
            Some('b') => out.push('\u{08}'),
            Some('f') => out.push('\u{0c}'),
            Some('v') => out.push('\u{0b}'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            // line continuation
            Some('\n') => {}
            Some(digit @ '0'..='7') => {
                let mut value = digit.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(next) => {
                            value = value * 8 + next;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.extend(char::from_u32(value));
            }
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.clone().take(width).collect();
                let decoded = (digits.len() == width && digits.chars().all(|d| d.is_ascii_hexdigit()))
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(decoded) => {
                        out.push(decoded);
                        for _ in 0..width {
                            chars.next();
                        }
                    }
                    None => {
                        out.push('\\');
                        out.push(kind);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PythonParser;
    use std::path::Path;
    use tree_sitter::Tree;

    fn parse(source: &str) -> Tree {
        PythonParser::new()
            .unwrap()
            .parse_source(source, Path::new("test.py"))
            .unwrap()
    }

    /// Lowers the annotation of `x: <annotation>`
    fn annotation(annotation: &str) -> Expr {
        let source = format!("x: {}\n", annotation);
        let tree = parse(&source);
        let statement = tree.root_node().named_child(0).unwrap();
        let assignment = statement.named_child(0).unwrap();
        let ty = assignment.child_by_field_name("type").unwrap();
        Expr::from_node(ty, source.as_bytes())
    }

    /// Lowers the first decorator of a decorated function
    fn decorator(decorator: &str) -> Expr {
        let source = format!("@{}\ndef f():\n    pass\n", decorator);
        let tree = parse(&source);
        let decorated = tree.root_node().named_child(0).unwrap();
        let deco = decorated.named_child(0).unwrap();
        assert_eq!(deco.kind(), "decorator");
        Expr::from_node(deco.named_child(0).unwrap(), source.as_bytes())
    }

    /// First expression of a single-statement module
    fn with_expression<T>(expression: &str, f: impl FnOnce(Node, &[u8]) -> T) -> T {
        let source = format!("{}\n", expression);
        let tree = parse(&source);
        let statement = tree.root_node().named_child(0).unwrap();
        f(statement.named_child(0).unwrap(), source.as_bytes())
    }

    #[test]
    fn test_render_simple_name() {
        assert_eq!(annotation("str").render(), "str");
        assert_eq!(annotation("int"), Expr::Name("int".to_string()));
    }

    #[test]
    fn test_render_generics() {
        assert_eq!(annotation("list[str]").render(), "list[str]");
        assert_eq!(annotation("dict[str, int]").render(), "dict[str, int]");
        assert_eq!(annotation("List[Dict[str, int]]").render(), "List[Dict[str, int]]");
        assert_eq!(annotation("Tuple[int, ...]").render(), "Tuple[int, ...]");
    }

    #[test]
    fn test_render_qualified_names_keep_last_segment() {
        assert_eq!(annotation("frappe._dict").render(), "_dict");
        assert_eq!(annotation("typing.Optional[str]").render(), "Optional[str]");
        assert_eq!(annotation("t.Dict[str, models.Site]").render(), "Dict[str, Site]");
    }

    #[test]
    fn test_render_falls_back_to_source_text() {
        assert_eq!(annotation("int | None").render(), "int | None");
        assert_eq!(annotation("\"Site\"").render(), "\"Site\"");
        assert_eq!(annotation("None").render(), "None");
    }

    #[test]
    fn test_render_tuple() {
        let tuple = Expr::Tuple(vec![Expr::Name("str".to_string()), Expr::Name("int".to_string())]);
        assert_eq!(tuple.render(), "str, int");
    }

    #[test]
    fn test_render_absent_annotation() {
        assert_eq!(render_annotation(None), "");
        assert_eq!(render_annotation(Some(&Expr::Name("bool".to_string()))), "bool");
    }

    #[test]
    fn test_render_deeply_nested_generic() {
        let nested = (0..64).fold("int".to_string(), |inner, _| format!("list[{}]", inner));
        let rendered = annotation(&nested).render();
        assert_eq!(rendered, nested);
    }

    #[test]
    fn test_decorator_call_and_attribute_share_a_name() {
        assert_eq!(decorator_name(&decorator("frappe.whitelist()")).as_deref(), Some("frappe.whitelist"));
        assert_eq!(decorator_name(&decorator("frappe.whitelist")).as_deref(), Some("frappe.whitelist"));
        assert_eq!(
            decorator_name(&decorator("frappe.whitelist(allow_guest=True)")).as_deref(),
            Some("frappe.whitelist")
        );
    }

    #[test]
    fn test_decorator_plain_names() {
        assert_eq!(decorator_name(&decorator("dashboard_whitelist()")).as_deref(), Some("dashboard_whitelist"));
        assert_eq!(decorator_name(&decorator("staticmethod")), None);
    }

    #[test]
    fn test_decorator_long_chains_are_unrecognized() {
        assert_eq!(decorator_name(&decorator("a.b.c")), None);
        assert_eq!(decorator_name(&decorator("a.b.c()")), None);
    }

    #[test]
    fn test_decorator_unrecognized_shapes() {
        assert_eq!(decorator_name(&decorator("handlers[0]")), None);
        assert_eq!(decorator_name(&decorator("factory()()")), None);
        assert_eq!(decorator_name(&decorator("get_decorator().attr")), None);
    }

    #[test]
    fn test_string_literal_forms() {
        let decode = |expr: &str| with_expression(expr, |node, src| string_literal(node, src));
        assert_eq!(decode("\"plain\"").as_deref(), Some("plain"));
        assert_eq!(decode("'single'").as_deref(), Some("single"));
        assert_eq!(decode("\"\"\"  triple\n  \"\"\"").as_deref(), Some("  triple\n  "));
        assert_eq!(decode("r'raw\\n'").as_deref(), Some("raw\\n"));
        assert_eq!(decode("'tab\\there'").as_deref(), Some("tab\there"));
        assert_eq!(decode("'a' 'b'").as_deref(), Some("ab"));
        assert_eq!(decode("f'{x}'"), None);
        assert_eq!(decode("b'bytes'"), None);
    }

    #[test]
    fn test_numeric_escapes_are_decoded() {
        assert_eq!(unescape(r"caf\xe9"), "café");
        assert_eq!(unescape(r"\u00e9t\u00e9"), "été");
        assert_eq!(unescape(r"\U0001F680 launch"), "🚀 launch");
        assert_eq!(unescape(r"\101\0end"), "A\0end");
        assert_eq!(unescape(r"bell\a"), "bell\u{07}");
        // malformed or unsupported escapes are kept as written
        assert_eq!(unescape(r"\xZZ \u12"), r"\xZZ \u12");
        assert_eq!(unescape(r"\N{BULLET} \d"), r"\N{BULLET} \d");
    }

    #[test]
    fn test_list_of_constants_skips_non_literals() {
        let values = with_expression("[\"name\", 'status', 3, None, some_var, f()]", |node, src| {
            list_of_constants(node, src)
        });
        assert_eq!(
            values,
            Some(vec!["name".to_string(), "status".to_string(), "3".to_string(), "None".to_string()])
        );
    }

    #[test]
    fn test_list_of_constants_rejects_other_displays() {
        assert_eq!(with_expression("(\"a\", \"b\")", |node, src| list_of_constants(node, src)), None);
        assert_eq!(with_expression("{\"a\"}", |node, src| list_of_constants(node, src)), None);
    }

    #[test]
    fn test_simple_assignment() {
        let source = "FIELDS = [\"a\"]\nx: list = []\na = b = []\nobj.attr = []\n";
        let tree = parse(source);
        let statements = named_children(tree.root_node());

        let (name, value) = simple_assignment(statements[0], source.as_bytes()).unwrap();
        assert_eq!(name, "FIELDS");
        assert_eq!(value.kind(), "list");

        assert!(simple_assignment(statements[1], source.as_bytes()).is_none());
        assert!(simple_assignment(statements[3], source.as_bytes()).is_none());

        // chained targets: the value is another assignment, never a list
        let chained = simple_assignment(statements[2], source.as_bytes());
        assert!(chained.map_or(true, |(_, value)| value.kind() != "list"));
    }
}
