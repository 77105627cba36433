//! Query evaluation against a document
//!
//! Results are node-sets in document order without duplicates. Comparisons
//! follow the usual existential semantics: a node-set equals a string when any
//! member's string value does.

use super::parser::{Axis, Expr, Function, NodeTest, PathExpr, Step};
use crate::document::Document;
use crate::namespace::Namespace;
use crate::node::{NodeId, NodeKind};
use std::collections::HashMap;

/// Selectable item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Item {
    /// The virtual node above the root element
    DocumentNode,
    Node(NodeId),
    /// Attribute `index` of an element
    Attr(NodeId, usize),
}

#[derive(Debug, Clone)]
enum Value {
    Nodes(Vec<Item>),
    Str(String),
    Num(f64),
    Bool(bool),
}

#[derive(Clone, Copy)]
struct Focus {
    item: Item,
    position: usize,
}

pub(crate) struct Evaluator<'d> {
    doc: &'d Document,
    order: HashMap<NodeId, usize>,
}

impl<'d> Evaluator<'d> {
    /// Build an evaluator whose document order covers the tree holding `context`
    pub(crate) fn new(doc: &'d Document, context: NodeId) -> Self {
        let mut top = context;
        while let Some(parent) = doc.parent(top) {
            top = parent;
        }
        let mut order = HashMap::new();
        order.insert(top, 0);
        for (i, node) in doc.descendants(top).into_iter().enumerate() {
            order.insert(node, i + 1);
        }
        Self { doc, order }
    }

    pub(crate) fn select(&self, path: &PathExpr, context: NodeId) -> Vec<Item> {
        self.eval_path(
            path,
            Focus {
                item: Item::Node(context),
                position: 1,
            },
        )
    }

    fn order_key(&self, item: Item) -> (usize, usize) {
        match item {
            Item::DocumentNode => (0, 0),
            Item::Node(n) => (self.order.get(&n).map_or(usize::MAX, |k| k + 1), 0),
            Item::Attr(n, i) => (self.order.get(&n).map_or(usize::MAX, |k| k + 1), i + 1),
        }
    }

    fn sort_unique(&self, items: &mut Vec<Item>) {
        items.sort_by_key(|i| self.order_key(*i));
        items.dedup();
    }

    fn eval_path(&self, path: &PathExpr, focus: Focus) -> Vec<Item> {
        let mut current = if path.absolute {
            vec![self.document_item(focus.item)]
        } else {
            vec![focus.item]
        };
        for step in &path.steps {
            let mut next = Vec::new();
            for item in &current {
                next.extend(self.eval_step(step, *item));
            }
            self.sort_unique(&mut next);
            current = next;
        }
        current
    }

    /// Absolute paths start above the root only when the context is attached
    fn document_item(&self, item: Item) -> Item {
        let node = match item {
            Item::DocumentNode => return item,
            Item::Node(n) | Item::Attr(n, _) => n,
        };
        if self.doc.is_attached(node) {
            Item::DocumentNode
        } else {
            let mut top = node;
            while let Some(parent) = self.doc.parent(top) {
                top = parent;
            }
            Item::Node(top)
        }
    }

    fn eval_step(&self, step: &Step, item: Item) -> Vec<Item> {
        let mut candidates: Vec<Item> = self
            .axis(step.axis, item)
            .into_iter()
            .filter(|c| self.test(&step.test, *c))
            .collect();

        for predicate in &step.predicates {
            candidates = candidates
                .into_iter()
                .enumerate()
                .filter(|(i, candidate)| {
                    let focus = Focus {
                        item: *candidate,
                        position: i + 1,
                    };
                    match self.eval(predicate, focus) {
                        #[allow(clippy::cast_precision_loss)]
                        Value::Num(n) => (focus.position as f64 - n).abs() < f64::EPSILON,
                        other => self.boolean(&other),
                    }
                })
                .map(|(_, c)| c)
                .collect();
        }
        candidates
    }

    fn child_items(&self, item: Item) -> Vec<Item> {
        match item {
            Item::DocumentNode => vec![Item::Node(self.doc.root())],
            Item::Node(n) => self.doc.children(n).iter().map(|c| Item::Node(*c)).collect(),
            Item::Attr(..) => Vec::new(),
        }
    }

    fn descendant_items(&self, item: Item) -> Vec<Item> {
        match item {
            Item::DocumentNode => {
                let root = self.doc.root();
                std::iter::once(Item::Node(root))
                    .chain(self.doc.descendants(root).into_iter().map(Item::Node))
                    .collect()
            }
            Item::Node(n) => self.doc.descendants(n).into_iter().map(Item::Node).collect(),
            Item::Attr(..) => Vec::new(),
        }
    }

    fn axis(&self, axis: Axis, item: Item) -> Vec<Item> {
        match axis {
            Axis::Child => self.child_items(item),
            Axis::Descendant => self.descendant_items(item),
            Axis::DescendantOrSelf => {
                let mut out = vec![item];
                out.extend(self.descendant_items(item));
                out
            }
            Axis::SelfAxis => vec![item],
            Axis::Parent => match item {
                Item::DocumentNode => Vec::new(),
                Item::Attr(n, _) => vec![Item::Node(n)],
                Item::Node(n) => match self.doc.parent(n) {
                    Some(p) => vec![Item::Node(p)],
                    None if n == self.doc.root() => vec![Item::DocumentNode],
                    None => Vec::new(),
                },
            },
            Axis::Attribute => match item {
                Item::Node(n) => (0..self.doc.attributes(n).len())
                    .map(|i| Item::Attr(n, i))
                    .collect(),
                _ => Vec::new(),
            },
        }
    }

    fn test(&self, test: &NodeTest, item: Item) -> bool {
        match item {
            Item::DocumentNode => matches!(test, NodeTest::Node),
            Item::Attr(n, i) => {
                let Some(attr) = self.doc.attributes(n).get(i) else {
                    return false;
                };
                let ns = attr.namespace();
                match test {
                    NodeTest::Any | NodeTest::Node => true,
                    NodeTest::Name { prefix: None, local } => ns.is_none() && attr.name() == local,
                    NodeTest::Name { prefix: Some(p), local } => {
                        ns.is_some_and(|ns| self.prefix_matches(p, ns)) && attr.name() == local
                    }
                    NodeTest::PrefixAny(p) => ns.is_some_and(|ns| self.prefix_matches(p, ns)),
                    NodeTest::Text | NodeTest::Comment => false,
                }
            }
            Item::Node(n) => match (self.doc.kind(n), test) {
                (_, NodeTest::Node) => true,
                (Some(NodeKind::Text(_) | NodeKind::CData(_)), NodeTest::Text) => true,
                (Some(NodeKind::Comment(_)), NodeTest::Comment) => true,
                (Some(NodeKind::Element(_)), NodeTest::Any) => true,
                (Some(NodeKind::Element(e)), NodeTest::Name { prefix: None, local }) => {
                    e.name() == local && e.namespace().prefix().is_empty()
                }
                (Some(NodeKind::Element(e)), NodeTest::Name { prefix: Some(p), local }) => {
                    e.name() == local && self.prefix_matches(p, e.namespace())
                }
                (Some(NodeKind::Element(e)), NodeTest::PrefixAny(p)) => self.prefix_matches(p, e.namespace()),
                _ => false,
            },
        }
    }

    /// A prefix declared on the root stands for its URI; otherwise it is compared literally
    fn prefix_matches(&self, prefix: &str, ns: &Namespace) -> bool {
        match self.doc.root_prefix_uri(prefix) {
            Some(uri) => ns.uri() == uri,
            None => ns.prefix() == prefix,
        }
    }

    fn eval(&self, expr: &Expr, focus: Focus) -> Value {
        match expr {
            Expr::Path(path) => Value::Nodes(self.eval_path(path, focus)),
            Expr::Literal(s) => Value::Str(s.clone()),
            Expr::Number(n) => Value::Num(*n),
            Expr::Or(l, r) => Value::Bool(
                self.boolean(&self.eval(l, focus)) || self.boolean(&self.eval(r, focus)),
            ),
            Expr::And(l, r) => Value::Bool(
                self.boolean(&self.eval(l, focus)) && self.boolean(&self.eval(r, focus)),
            ),
            Expr::Eq(l, r) => Value::Bool(self.compare(&self.eval(l, focus), &self.eval(r, focus), true)),
            Expr::Ne(l, r) => Value::Bool(self.compare(&self.eval(l, focus), &self.eval(r, focus), false)),
            Expr::Call(function, args) => self.call(*function, args, focus),
        }
    }

    fn call(&self, function: Function, args: &[Expr], focus: Focus) -> Value {
        let first_item = || match args.first() {
            Some(arg) => match self.eval(arg, focus) {
                Value::Nodes(items) => items.first().copied(),
                _ => None,
            },
            None => Some(focus.item),
        };
        let string_arg = |i: usize| match args.get(i) {
            Some(arg) => self.string(&self.eval(arg, focus)),
            None => self.string_value(focus.item),
        };

        match function {
            Function::LocalName => Value::Str(first_item().map_or_else(String::new, |i| self.local_name(i))),
            Function::NamespaceUri => {
                Value::Str(first_item().map_or_else(String::new, |i| self.namespace_uri(i)))
            }
            Function::Name => Value::Str(first_item().map_or_else(String::new, |i| self.qualified_name(i))),
            Function::Contains => Value::Bool(string_arg(0).contains(string_arg(1).as_str())),
            Function::StartsWith => Value::Bool(string_arg(0).starts_with(string_arg(1).as_str())),
            Function::Not => Value::Bool(!args.first().is_some_and(|a| self.boolean(&self.eval(a, focus)))),
            Function::String => Value::Str(string_arg(0)),
            Function::NormalizeSpace => {
                Value::Str(string_arg(0).split_whitespace().collect::<Vec<_>>().join(" "))
            }
            #[allow(clippy::cast_precision_loss)]
            Function::Count => match args.first().map(|a| self.eval(a, focus)) {
                Some(Value::Nodes(items)) => Value::Num(items.len() as f64),
                _ => Value::Num(0.0),
            },
            Function::True => Value::Bool(true),
            Function::False => Value::Bool(false),
        }
    }

    fn local_name(&self, item: Item) -> String {
        match item {
            Item::Node(n) => self.doc.name(n).unwrap_or_default().to_string(),
            Item::Attr(n, i) => self
                .doc
                .attributes(n)
                .get(i)
                .map_or_else(String::new, |a| a.name().to_string()),
            Item::DocumentNode => String::new(),
        }
    }

    fn namespace_uri(&self, item: Item) -> String {
        match item {
            Item::Node(n) => self
                .doc
                .namespace(n)
                .map_or_else(String::new, |ns| ns.uri().to_string()),
            Item::Attr(n, i) => self
                .doc
                .attributes(n)
                .get(i)
                .map_or_else(String::new, |a| a.namespace_uri().to_string()),
            Item::DocumentNode => String::new(),
        }
    }

    fn qualified_name(&self, item: Item) -> String {
        match item {
            Item::Node(n) => self.doc.qualified_name(n).unwrap_or_default(),
            Item::Attr(n, i) => self
                .doc
                .attributes(n)
                .get(i)
                .map_or_else(String::new, crate::node::Attribute::qualified_name),
            Item::DocumentNode => String::new(),
        }
    }

    pub(crate) fn string_value(&self, item: Item) -> String {
        match item {
            Item::DocumentNode => self.doc.text(self.doc.root()),
            Item::Node(n) => self.doc.text(n),
            Item::Attr(n, i) => self
                .doc
                .attributes(n)
                .get(i)
                .map_or_else(String::new, |a| a.value().to_string()),
        }
    }

    fn string(&self, value: &Value) -> String {
        match value {
            Value::Nodes(items) => items
                .first()
                .map_or_else(String::new, |i| self.string_value(*i)),
            Value::Str(s) => s.clone(),
            Value::Num(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
        }
    }

    fn number(&self, value: &Value) -> f64 {
        match value {
            Value::Num(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            other => self.string(other).trim().parse().unwrap_or(f64::NAN),
        }
    }

    fn boolean(&self, value: &Value) -> bool {
        match value {
            Value::Nodes(items) => !items.is_empty(),
            Value::Str(s) => !s.is_empty(),
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
        }
    }

    fn compare(&self, left: &Value, right: &Value, equal: bool) -> bool {
        let check = |a: bool| a == equal;
        match (left, right) {
            (Value::Nodes(l), Value::Nodes(r)) => l.iter().any(|a| {
                let a = self.string_value(*a);
                r.iter().any(|b| check(a == self.string_value(*b)))
            }),
            (Value::Nodes(items), Value::Bool(b)) | (Value::Bool(b), Value::Nodes(items)) => {
                check(!items.is_empty() == *b)
            }
            (Value::Nodes(items), Value::Num(n)) | (Value::Num(n), Value::Nodes(items)) => items.iter().any(|i| {
                let v: f64 = self.string_value(*i).trim().parse().unwrap_or(f64::NAN);
                check((v - n).abs() < f64::EPSILON)
            }),
            (Value::Nodes(items), Value::Str(s)) | (Value::Str(s), Value::Nodes(items)) => {
                items.iter().any(|i| check(self.string_value(*i) == *s))
            }
            (Value::Bool(_), _) | (_, Value::Bool(_)) => check(self.boolean(left) == self.boolean(right)),
            (Value::Num(_), _) | (_, Value::Num(_)) => {
                check((self.number(left) - self.number(right)).abs() < f64::EPSILON)
            }
            _ => check(self.string(left) == self.string(right)),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}
