use tree_sitter::Node;

/// Node kind of a function or method definition (`async def` included)
pub const FUNCTION_KIND: &str = "function_definition";

pub fn is_function(node: Node<'_>) -> bool {
    node.kind() == FUNCTION_KIND
}

/// Source text covered by `node`, empty if the range is not valid UTF-8 boundaries
pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or("")
}

/// First `ERROR` or `MISSING` node in document order
///
/// Subtrees without errors are skipped.
pub fn first_error_node(root: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

/// First node in pre-order for which `pred` holds
pub fn find_first<'a, P>(root: Node<'a>, mut pred: P) -> Option<Node<'a>>
where
    P: FnMut(Node<'a>) -> bool,
{
    let mut found = None;
    for_each_node(root, &mut |node| {
        if found.is_none() && pred(node) {
            found = Some(node);
        }
    });
    found
}

/// Visit every node under `root` (inclusive) in pre-order
///
/// Iterative, so tree depth is not bounded by the thread stack.
pub fn for_each_node<'a, F>(root: Node<'a>, f: &mut F)
where
    F: FnMut(Node<'a>),
{
    let mut cursor = root.walk();
    loop {
        f(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::{Parser, Tree};

    fn parse(source: &str) -> Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn test_async_def_is_function() {
        let source = "async def foo():\n    return 1\n";
        let tree = parse(source);
        let func = tree.root_node().child(0).unwrap();
        assert!(is_function(func));
        let name = func.child_by_field_name("name").unwrap();
        assert_eq!(node_text(name, source), "foo");
    }

    #[test]
    fn test_first_error_node_clean_source() {
        let tree = parse("x = 1\n");
        assert!(first_error_node(tree.root_node()).is_none());
    }

    #[test]
    fn test_first_error_node_broken_source() {
        let tree = parse("def ok():\n    pass\n\ndef broken(x)\n    return x\n");
        let bad = first_error_node(tree.root_node()).unwrap();
        assert!(bad.start_position().row >= 3);
    }

    #[test]
    fn test_for_each_node_preorder() {
        let source = "f(g(x))\n";
        let tree = parse(source);
        let mut calls = Vec::new();
        for_each_node(tree.root_node(), &mut |node| {
            if node.kind() == "call" {
                calls.push(node_text(node, source).to_string());
            }
        });
        assert_eq!(calls, vec!["f(g(x))".to_string(), "g(x)".to_string()]);
    }

    #[test]
    fn test_find_first() {
        let source = "a = 1\nb = f(2)\nc = g(3)\n";
        let tree = parse(source);
        let call = find_first(tree.root_node(), |n| n.kind() == "call").unwrap();
        assert_eq!(node_text(call, source), "f(2)");
        assert!(find_first(tree.root_node(), |n| n.kind() == "lambda").is_none());
    }

    #[test]
    fn test_walks_survive_very_deep_trees() {
        let terms = vec!["1"; 100_000].join(" + ");
        let source = format!("x = {}\n", terms);
        let tree = parse(&source);
        let mut count = 0usize;
        for_each_node(tree.root_node(), &mut |node| {
            if node.kind() == "binary_operator" {
                count += 1;
            }
        });
        assert_eq!(count, 99_999);
        assert!(first_error_node(tree.root_node()).is_none());
    }
}
