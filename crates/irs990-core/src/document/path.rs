//! Ordered-fallback path resolution over a filing's element tree.
//!
//! Paths use the small subset of ElementTree syntax the mapping resources
//! need: `/`-separated steps, where a step is `.` (the context node), `*`
//! (any child element), `Name` (child elements with that local name) or
//! `Name[n]` (the n-th such child, 1-based). Unprefixed names match elements
//! in the document's default namespace.

use std::iter::Peekable;
use std::str::FromStr;
use std::sync::Arc;

use roxmltree::{Children, Node};

use crate::error::MappingError;
use crate::mapping::FieldSpec;

/// One compiled path step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// `.` - the context node itself.
    Current,
    /// `*` - every child element.
    AnyChild,
    /// `Name` or `Name[n]`.
    Child { name: String, position: Option<usize> },
}

impl Step {
    fn parse(raw: &str, path: &str) -> Result<Self, MappingError> {
        let invalid = |reason: &str| MappingError::Path {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        match raw {
            "" => Err(invalid("empty step")),
            "." => Ok(Step::Current),
            ".." => Err(invalid("parent steps are not supported")),
            "*" => Ok(Step::AnyChild),
            _ => {
                let (name, position) = match raw.find('[') {
                    Some(open) => {
                        let index = raw[open + 1..]
                            .strip_suffix(']')
                            .ok_or_else(|| invalid("unterminated predicate"))?;
                        let position: usize = index
                            .parse()
                            .map_err(|_| invalid("predicate must be a positive integer"))?;
                        if position == 0 {
                            return Err(invalid("positions are 1-based"));
                        }
                        (&raw[..open], Some(position))
                    }
                    None => (raw, None),
                };

                if name.is_empty() {
                    return Err(invalid("missing element name"));
                }
                if name.contains(':') {
                    return Err(invalid("namespace prefixes are not supported"));
                }
                if name.contains(|c: char| c.is_whitespace() || "[]@=".contains(c)) {
                    return Err(invalid("unsupported characters in element name"));
                }

                Ok(Step::Child {
                    name: name.to_string(),
                    position,
                })
            }
        }
    }

    fn position(&self) -> Option<usize> {
        match self {
            Step::Child { position, .. } => *position,
            _ => None,
        }
    }

    fn matches(&self, node: Node<'_, '_>, namespace: Option<&str>) -> bool {
        if !node.is_element() {
            return false;
        }
        match self {
            Step::Current => false,
            Step::AnyChild => true,
            Step::Child { name, .. } => {
                let tag = node.tag_name();
                tag.name() == name && tag.namespace() == namespace
            }
        }
    }
}

/// A compiled document path.
#[derive(Debug, Clone)]
pub struct PathExpr {
    text: String,
    steps: Arc<[Step]>,
}

impl PathExpr {
    /// Compile a path string.
    pub fn compile(text: &str) -> Result<Self, MappingError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(MappingError::Path {
                path: text.to_string(),
                reason: "empty path".to_string(),
            });
        }
        if trimmed.starts_with('/') {
            return Err(MappingError::Path {
                path: text.to_string(),
                reason: "absolute paths are not supported".to_string(),
            });
        }

        let body = trimmed.strip_prefix("./").unwrap_or(trimmed);
        let steps = body
            .split('/')
            .map(|raw| Step::parse(raw, text))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            text: trimmed.to_string(),
            steps: steps.into(),
        })
    }

    /// The path as written in the mapping resource.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl FromStr for PathExpr {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl PartialEq for PathExpr {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for PathExpr {}

/// Pending matches for one step below one node.
enum Frame<'a, 'input: 'a> {
    Current(Option<Node<'a, 'input>>),
    Children {
        children: Children<'a, 'input>,
        seen: usize,
    },
}

impl<'a, 'input: 'a> Frame<'a, 'input> {
    fn start(step: &Step, node: Node<'a, 'input>) -> Self {
        match step {
            Step::Current => Frame::Current(Some(node)),
            _ => Frame::Children {
                children: node.children(),
                seen: 0,
            },
        }
    }

    fn advance(&mut self, step: &Step, namespace: Option<&str>) -> Option<Node<'a, 'input>> {
        match self {
            Frame::Current(node) => node.take(),
            Frame::Children { children, seen } => {
                for child in children.by_ref() {
                    if !step.matches(child, namespace) {
                        continue;
                    }
                    *seen += 1;
                    match step.position() {
                        None => return Some(child),
                        Some(position) if *seen == position => return Some(child),
                        Some(position) if *seen > position => return None,
                        Some(_) => {}
                    }
                }
                None
            }
        }
    }
}

/// Lazy iterator over the nodes a path selects, in document order.
pub struct Selection<'a, 'input: 'a> {
    steps: Arc<[Step]>,
    namespace: Option<&'a str>,
    stack: Vec<Frame<'a, 'input>>,
}

impl<'a, 'input: 'a> Selection<'a, 'input> {
    /// A selection that yields nothing.
    pub fn empty() -> Self {
        Self {
            steps: Arc::from(Vec::new()),
            namespace: None,
            stack: Vec::new(),
        }
    }
}

impl<'a, 'input: 'a> Iterator for Selection<'a, 'input> {
    type Item = Node<'a, 'input>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let depth = self.stack.len().checked_sub(1)?;
            let found = self.stack[depth].advance(&self.steps[depth], self.namespace);

            match found {
                Some(node) if depth + 1 == self.steps.len() => return Some(node),
                Some(node) => {
                    let frame = Frame::start(&self.steps[depth + 1], node);
                    self.stack.push(frame);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Select every node matched by `path` below `context`.
pub fn select<'a, 'input: 'a>(context: Node<'a, 'input>, path: &PathExpr) -> Selection<'a, 'input> {
    let namespace = context.document().root_element().tag_name().namespace();
    let stack = match path.steps.first() {
        Some(step) => vec![Frame::start(step, context)],
        None => Vec::new(),
    };

    Selection {
        steps: Arc::clone(&path.steps),
        namespace,
        stack,
    }
}

/// Return the first node of the first candidate that matches anything.
///
/// Candidates are tried strictly in order; there is no best-match scoring.
pub fn resolve<'a, 'input: 'a>(
    context: Node<'a, 'input>,
    candidates: &[PathExpr],
) -> Option<Node<'a, 'input>> {
    candidates
        .iter()
        .find_map(|path| select(context, path).next())
}

/// Return every node matched by the first candidate that matches anything.
pub fn select_first<'a, 'input: 'a>(
    context: Node<'a, 'input>,
    candidates: &[PathExpr],
) -> Peekable<Selection<'a, 'input>> {
    for path in candidates {
        let mut selection = select(context, path).peekable();
        if selection.peek().is_some() {
            return selection;
        }
    }
    Selection::empty().peekable()
}

/// Resolve a field spec to the text of its first matching node.
///
/// The text is returned as written. Unresolved fields and elements
/// without text both yield `None`.
pub fn extract_scalar(context: Node<'_, '_>, spec: &FieldSpec) -> Option<String> {
    resolve(context, spec.candidates())
        .and_then(|node| node.text())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"<Return xmlns="http://www.irs.gov/efile" returnVersion="2016v3.0">
  <ReturnHeader>
    <Filer>
      <EIN>041234567</EIN>
      <BusinessName><BusinessNameLine1Txt>HARBORVIEW</BusinessNameLine1Txt></BusinessName>
    </Filer>
  </ReturnHeader>
  <ReturnData>
    <Item><Code>A</Code></Item>
    <Item><Code>B</Code></Item>
    <Item><Code>C</Code></Item>
    <Other xmlns="urn:elsewhere"><Code>X</Code></Other>
  </ReturnData>
</Return>"#;

    fn paths(raw: &[&str]) -> Vec<PathExpr> {
        raw.iter().map(|p| PathExpr::compile(p).unwrap()).collect()
    }

    fn texts<'a, 'input: 'a>(nodes: impl Iterator<Item = Node<'a, 'input>>) -> Vec<String> {
        nodes
            .map(|n| n.descendants().find_map(|d| d.text().filter(|t| !t.trim().is_empty())))
            .map(|t| t.unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_compile_rejects_unsupported_syntax() {
        let rejected = [
            "", "/ReturnHeader", "a//b", "a/../b", "b:Name", "Item[0]", "Item[x]", "Item[1",
        ];
        for bad in rejected {
            assert!(PathExpr::compile(bad).is_err(), "expected {bad:?} to be rejected");
        }
        let relative = PathExpr::compile("./ReturnHeader/Filer").unwrap();
        assert_eq!(relative.as_str(), "./ReturnHeader/Filer");
        assert!(PathExpr::compile(".").is_ok());
    }

    #[test]
    fn test_select_in_document_order() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let path = PathExpr::compile("ReturnData/Item/Code").unwrap();
        let found: Vec<_> = select(doc.root_element(), &path).filter_map(|n| n.text()).collect();
        assert_eq!(found, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_select_positional_and_wildcard() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let root = doc.root_element();

        let second = PathExpr::compile("ReturnData/Item[2]/Code").unwrap();
        let found: Vec<_> = select(root, &second).filter_map(|n| n.text()).collect();
        assert_eq!(found, vec!["B"]);

        let missing = PathExpr::compile("ReturnData/Item[4]").unwrap();
        assert_eq!(select(root, &missing).count(), 0);

        let any = PathExpr::compile("ReturnData/*").unwrap();
        assert_eq!(select(root, &any).count(), 4);
    }

    #[test]
    fn test_select_ignores_foreign_namespace() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let path = PathExpr::compile("ReturnData/Other/Code").unwrap();
        assert_eq!(select(doc.root_element(), &path).count(), 0);
    }

    #[test]
    fn test_resolve_first_match_wins() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let root = doc.root_element();

        let candidates = paths(&[
            "ReturnHeader/Filer/Name/BusinessNameLine1",
            "ReturnHeader/Filer/BusinessName/BusinessNameLine1Txt",
            "ReturnHeader/Filer/EIN",
        ]);
        let node = resolve(root, &candidates).unwrap();
        assert_eq!(node.text(), Some("HARBORVIEW"));

        assert!(resolve(root, &[]).is_none());
        assert!(resolve(root, &paths(&["ReturnHeader/TaxYr"])).is_none());
    }

    #[test]
    fn test_select_first_uses_first_matching_candidate_only() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let candidates = paths(&["ReturnData/Missing", "ReturnData/Item", "ReturnData/*"]);
        let found = texts(select_first(doc.root_element(), &candidates));
        assert_eq!(found, vec!["A", "B", "C"]);

        let none = paths(&["ReturnData/Missing"]);
        assert_eq!(select_first(doc.root_element(), &none).count(), 0);
    }

    #[test]
    fn test_relative_to_element() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let items = PathExpr::compile("ReturnData/Item").unwrap();
        let code = PathExpr::compile("./Code").unwrap();

        let last = select(doc.root_element(), &items).last().unwrap();
        assert_eq!(resolve(last, &[code]).and_then(|n| n.text()), Some("C"));

        let current = PathExpr::compile(".").unwrap();
        assert_eq!(select(last, &current).next(), Some(last));
    }

    #[test]
    fn test_extract_scalar_returns_text_as_written() {
        let doc = roxmltree::Document::parse(
            "<Return><Memo>  padded  </Memo><Empty/><Filer><EIN>041234567</EIN></Filer></Return>",
        )
        .unwrap();
        let root = doc.root_element();

        let memo = FieldSpec::new(paths(&["Memo"]));
        assert_eq!(extract_scalar(root, &memo), Some("  padded  ".to_string()));

        let ein = FieldSpec::new(paths(&["Missing/EIN", "Filer/EIN"]));
        assert_eq!(extract_scalar(root, &ein), Some("041234567".to_string()));

        assert_eq!(extract_scalar(root, &FieldSpec::new(paths(&["Empty"]))), None);
        assert_eq!(extract_scalar(root, &FieldSpec::new(paths(&["Missing"]))), None);
    }
}
