use html5ever::{LocalName, Namespace, QualName};
use kuchiki::traits::TendrilSink;
use kuchiki::{Attribute, ExpandedName, NodeData, NodeRef, Selectors};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Handle to one node of a parsed document.
///
/// Handles are cheap to clone and share the underlying node, so attribute
/// writes through any clone are visible through every other clone.
pub trait HtmlDomElement: Clone {
    /// Uppercase tag name (`"TD"`, `"LABEL"`); empty for non-element nodes.
    fn tag_name(&self) -> String;
    fn get_attribute(&self, name: &str) -> Option<String>;
    fn set_attribute(&self, name: &str, value: &str);
    fn has_attribute(&self, name: &str) -> bool;
    fn remove_attribute(&self, name: &str);
    fn text_content(&self) -> String;
    /// False for text, comment and other pseudo-nodes a query may surface.
    fn is_real_element(&self) -> bool;
    fn same_node(&self, other: &Self) -> bool;
    fn outer_html(&self) -> String;
    /// Parent node, up to and including the document node.
    fn parent(&self) -> Option<Self>;
}

/// Tree-query capability the fixers are written against.
///
/// Every `find*` method returns matches in document order. A selector that
/// fails to compile matches nothing.
pub trait HtmlDomParser {
    type Element: HtmlDomElement;

    fn find(&self, selector: &str) -> Vec<Self::Element>;
    /// Direct children of `scope` matching `selector`.
    fn find_children(&self, scope: &Self::Element, selector: &str) -> Vec<Self::Element>;
    /// Descendants of `scope` (excluding `scope`) matching `selector`.
    fn find_descendants(&self, scope: &Self::Element, selector: &str) -> Vec<Self::Element>;
    /// Ancestors of `scope` matching `selector`, outermost first.
    fn find_ancestors(&self, scope: &Self::Element, selector: &str) -> Vec<Self::Element>;
    fn find_by_id(&self, id: &str) -> Option<Self::Element>;
    /// Detached element, not yet inserted anywhere in the document.
    fn create_element(&self, tag: &str) -> Self::Element;
    fn html(&self) -> String;
}

#[derive(Clone, Debug)]
pub struct KuchikiElement {
    node: NodeRef,
}

impl KuchikiElement {
    pub fn new(node: NodeRef) -> Self {
        Self { node }
    }

    pub fn as_node(&self) -> &NodeRef {
        &self.node
    }
}

impl HtmlDomElement for KuchikiElement {
    fn tag_name(&self) -> String {
        self.node
            .as_element()
            .map(|el| el.name.local.as_ref().to_ascii_uppercase())
            .unwrap_or_default()
    }

    fn get_attribute(&self, name: &str) -> Option<String> {
        let el = self.node.as_element()?;
        let attrs = el.attributes.borrow();
        attrs.get(name).map(|value| value.to_string())
    }

    fn set_attribute(&self, name: &str, value: &str) {
        if let Some(el) = self.node.as_element() {
            el.attributes
                .borrow_mut()
                .insert(name, value.to_string());
        }
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.node
            .as_element()
            .map(|el| el.attributes.borrow().contains(name))
            .unwrap_or(false)
    }

    fn remove_attribute(&self, name: &str) {
        if let Some(el) = self.node.as_element() {
            el.attributes.borrow_mut().remove(name);
        }
    }

    fn text_content(&self) -> String {
        self.node.text_contents()
    }

    fn is_real_element(&self) -> bool {
        matches!(self.node.data(), NodeData::Element(_))
    }

    fn same_node(&self, other: &Self) -> bool {
        self.node == other.node
    }

    fn outer_html(&self) -> String {
        self.node.to_string()
    }

    fn parent(&self) -> Option<Self> {
        self.node.parent().map(KuchikiElement::new)
    }
}

/// `HtmlDomParser` over a kuchiki document.
pub struct KuchikiParser {
    document: NodeRef,
}

impl KuchikiParser {
    pub fn parse(html: &str) -> Self {
        Self {
            document: kuchiki::parse_html().one(html),
        }
    }

    pub fn from_document(document: NodeRef) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &NodeRef {
        &self.document
    }

    fn matching<I>(nodes: I, selector: &str) -> Vec<KuchikiElement>
    where
        I: Iterator<Item = NodeRef>,
    {
        let Ok(selectors) = Selectors::compile(selector) else {
            return Vec::new();
        };
        nodes
            .filter_map(|node| node.into_element_ref())
            .filter(|el| selectors.matches(el))
            .map(|el| KuchikiElement::new(el.as_node().clone()))
            .collect()
    }
}

impl HtmlDomParser for KuchikiParser {
    type Element = KuchikiElement;

    fn find(&self, selector: &str) -> Vec<KuchikiElement> {
        match self.document.select(selector) {
            Ok(found) => found
                .map(|el| KuchikiElement::new(el.as_node().clone()))
                .collect(),
            Err(()) => Vec::new(),
        }
    }

    fn find_children(&self, scope: &KuchikiElement, selector: &str) -> Vec<KuchikiElement> {
        Self::matching(scope.node.children(), selector)
    }

    fn find_descendants(&self, scope: &KuchikiElement, selector: &str) -> Vec<KuchikiElement> {
        Self::matching(scope.node.descendants(), selector)
    }

    fn find_ancestors(&self, scope: &KuchikiElement, selector: &str) -> Vec<KuchikiElement> {
        let mut found = Self::matching(scope.node.ancestors(), selector);
        found.reverse();
        found
    }

    fn find_by_id(&self, id: &str) -> Option<KuchikiElement> {
        if id.is_empty() {
            return None;
        }
        self.document
            .descendants()
            .find(|node| {
                node.as_element()
                    .map(|el| el.attributes.borrow().get("id") == Some(id))
                    .unwrap_or(false)
            })
            .map(KuchikiElement::new)
    }

    fn create_element(&self, tag: &str) -> KuchikiElement {
        let name = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from(tag.to_ascii_lowercase()),
        );
        let attributes: Vec<(ExpandedName, Attribute)> = Vec::new();
        KuchikiElement::new(NodeRef::new_element(name, attributes))
    }

    fn html(&self) -> String {
        self.document.to_string()
    }
}
