//! Python source layout for trees produced by Python's `ast` module.
//!
//! Output is canonical rather than faithful to the original formatting:
//! tuples are always parenthesised, `else: if` is never folded into `elif`,
//! and operands get the fewest parentheses their precedence allows.

use std::collections::{BTreeSet, HashMap};

use dast_diff::DEFAULT_IGNORED_FIELDS;
use dast_types::Scalar;

use crate::layout::{Handler, Layout, ATOM};
use crate::merged::{Mark, Marked, Merged, MergedNode};
use crate::printer::{group_mark, presence, Printer};

const LAMBDA: u8 = 1;
const IF_EXP: u8 = 2;
const OR: u8 = 3;
const AND: u8 = 4;
const NOT: u8 = 5;
const CMP: u8 = 6;
const BIT_OR: u8 = 7;
const BIT_XOR: u8 = 8;
const BIT_AND: u8 = 9;
const SHIFT: u8 = 10;
const ARITH: u8 = 11;
const TERM: u8 = 12;
const FACTOR: u8 = 13;
const POWER: u8 = 14;
const AWAIT: u8 = 15;

/// Operator node kinds and their symbols.
const OPERATORS: &[(&str, &str)] = &[
    ("Add", "+"),
    ("Sub", "-"),
    ("Mult", "*"),
    ("MatMult", "@"),
    ("Div", "/"),
    ("Mod", "%"),
    ("Pow", "**"),
    ("LShift", "<<"),
    ("RShift", ">>"),
    ("BitOr", "|"),
    ("BitXor", "^"),
    ("BitAnd", "&"),
    ("FloorDiv", "//"),
    ("And", "and"),
    ("Or", "or"),
    ("Not", "not"),
    ("Invert", "~"),
    ("UAdd", "+"),
    ("USub", "-"),
    ("Eq", "=="),
    ("NotEq", "!="),
    ("Lt", "<"),
    ("LtE", "<="),
    ("Gt", ">"),
    ("GtE", ">="),
    ("Is", "is"),
    ("IsNot", "is not"),
    ("In", "in"),
    ("NotIn", "not in"),
];

/// Layout for Python syntax trees.
#[derive(Clone)]
pub struct PythonLayout {
    handlers: HashMap<&'static str, Handler>,
    hidden: BTreeSet<String>,
}

impl PythonLayout {
    pub fn new() -> Self {
        Self::hiding(DEFAULT_IGNORED_FIELDS)
    }

    /// A layout whose generic fallback leaves out `fields`.
    pub fn hiding<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            handlers: handlers(),
            hidden: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for PythonLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl Layout for PythonLayout {
    fn handler(&self, kind: &str) -> Option<Handler> {
        self.handlers.get(kind).copied()
    }

    fn precedence(&self, node: &MergedNode) -> u8 {
        let op = node.field("op").kind();
        match node.kind.as_str() {
            "Lambda" => LAMBDA,
            "IfExp" => IF_EXP,
            "BoolOp" if op == Some("Or") => OR,
            "BoolOp" => AND,
            "UnaryOp" if op == Some("Not") => NOT,
            "UnaryOp" => FACTOR,
            "Compare" => CMP,
            "BinOp" => binary_precedence(op),
            "Await" => AWAIT,
            _ => ATOM,
        }
    }

    fn is_hidden(&self, field: &str) -> bool {
        self.hidden.contains(field)
    }
}

fn binary_precedence(op: Option<&str>) -> u8 {
    match op {
        Some("Add" | "Sub") => ARITH,
        Some("LShift" | "RShift") => SHIFT,
        Some("BitOr") => BIT_OR,
        Some("BitXor") => BIT_XOR,
        Some("BitAnd") => BIT_AND,
        Some("Pow") => POWER,
        _ => TERM,
    }
}

fn handlers() -> HashMap<&'static str, Handler> {
    let mut table: HashMap<&'static str, Handler> = HashMap::new();
    let statements: [(&'static str, Handler); 28] = [
        ("Module", module),
        ("Expr", expr),
        ("Assign", assign),
        ("AugAssign", aug_assign),
        ("AnnAssign", ann_assign),
        ("Return", return_stmt),
        ("Pass", keyword_stmt),
        ("Break", keyword_stmt),
        ("Continue", keyword_stmt),
        ("Delete", delete),
        ("Import", import),
        ("ImportFrom", import_from),
        ("alias", alias),
        ("FunctionDef", function_def),
        ("AsyncFunctionDef", function_def),
        ("ClassDef", class_def),
        ("If", if_stmt),
        ("For", for_stmt),
        ("AsyncFor", for_stmt),
        ("While", while_stmt),
        ("With", with_stmt),
        ("withitem", with_item),
        ("Try", try_stmt),
        ("ExceptHandler", except_handler),
        ("Raise", raise),
        ("Assert", assert),
        ("Global", names_stmt),
        ("Nonlocal", names_stmt),
    ];
    let expressions: [(&'static str, Handler); 26] = [
        ("Name", name),
        ("Constant", constant),
        ("Attribute", attribute),
        ("Call", call),
        ("keyword", keyword),
        ("Starred", starred),
        ("BinOp", bin_op),
        ("UnaryOp", unary_op),
        ("BoolOp", bool_op),
        ("Compare", compare),
        ("IfExp", if_exp),
        ("Lambda", lambda),
        ("Await", await_expr),
        ("List", list),
        ("Tuple", tuple),
        ("Set", set),
        ("Dict", dict),
        ("Subscript", subscript),
        ("Slice", slice),
        ("ListComp", list_comp),
        ("SetComp", set_comp),
        ("GeneratorExp", generator_exp),
        ("DictComp", dict_comp),
        ("comprehension", comprehension),
        ("arguments", arguments),
        ("arg", arg),
    ];
    table.extend(statements);
    table.extend(expressions);
    for (kind, _) in OPERATORS {
        table.insert(*kind, operator as Handler);
    }
    table
}

fn module(p: &mut Printer<'_>, n: &MergedNode) {
    p.lines(n.items("body"));
}

fn expr(p: &mut Printer<'_>, n: &MergedNode) {
    p.field(n, "value");
}

fn assign(p: &mut Printer<'_>, n: &MergedNode) {
    p.items(n.items("targets"), " = ");
    p.write(" = ");
    p.field(n, "value");
}

fn aug_assign(p: &mut Printer<'_>, n: &MergedNode) {
    p.field(n, "target");
    p.write(" ");
    p.field(n, "op");
    p.write("= ");
    p.field(n, "value");
}

fn ann_assign(p: &mut Printer<'_>, n: &MergedNode) {
    p.field(n, "target");
    p.write(": ");
    p.field(n, "annotation");
    p.optional(n, "value", " = ");
}

fn return_stmt(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("return");
    p.optional(n, "value", " ");
}

fn keyword_stmt(p: &mut Printer<'_>, n: &MergedNode) {
    p.write(&n.kind.to_lowercase());
}

fn delete(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("del ");
    p.items(n.items("targets"), ", ");
}

fn import(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("import ");
    p.items(n.items("names"), ", ");
}

fn import_from(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("from ");
    if let Merged::Scalar(Scalar::Int(level)) = n.field("level").current() {
        p.write(&".".repeat(usize::try_from(*level).unwrap_or(0)));
    }
    p.optional_ident(n, "module", "");
    p.write(" import ");
    p.items(n.items("names"), ", ");
}

fn alias(p: &mut Printer<'_>, n: &MergedNode) {
    p.ident(n, "name");
    p.optional_ident(n, "asname", " as ");
}

fn decorators(p: &mut Printer<'_>, n: &MergedNode) {
    for item in n.items("decorator_list") {
        p.marked(item.mark, |p| {
            p.write("@");
            p.value(&item.value);
            p.newline();
        });
    }
}

fn function_def(p: &mut Printer<'_>, n: &MergedNode) {
    decorators(p, n);
    if n.kind == "AsyncFunctionDef" {
        p.write("async ");
    }
    p.write("def ");
    p.ident(n, "name");
    p.write("(");
    p.field(n, "args");
    p.write(")");
    p.optional(n, "returns", " -> ");
    p.block(n.items("body"));
}

fn class_def(p: &mut Printer<'_>, n: &MergedNode) {
    decorators(p, n);
    p.write("class ");
    p.ident(n, "name");
    let bases: Vec<&Marked> = n.items("bases").iter().chain(n.items("keywords")).collect();
    if !bases.is_empty() {
        p.marked(group_mark(bases.iter().copied()), |p| {
            p.write("(");
            p.items(bases.iter().copied(), ", ");
            p.write(")");
        });
    }
    p.block(n.items("body"));
}

fn if_stmt(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("if ");
    p.field(n, "test");
    p.block(n.items("body"));
    p.clause("else", n.items("orelse"));
}

fn for_stmt(p: &mut Printer<'_>, n: &MergedNode) {
    if n.kind == "AsyncFor" {
        p.write("async ");
    }
    p.write("for ");
    p.field(n, "target");
    p.write(" in ");
    p.field(n, "iter");
    p.block(n.items("body"));
    p.clause("else", n.items("orelse"));
}

fn while_stmt(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("while ");
    p.field(n, "test");
    p.block(n.items("body"));
    p.clause("else", n.items("orelse"));
}

fn with_stmt(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("with ");
    p.items(n.items("items"), ", ");
    p.block(n.items("body"));
}

fn with_item(p: &mut Printer<'_>, n: &MergedNode) {
    p.field(n, "context_expr");
    p.optional(n, "optional_vars", " as ");
}

fn try_stmt(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("try");
    p.block(n.items("body"));
    for handler in n.items("handlers") {
        p.marked(handler.mark, |p| {
            p.newline();
            p.value(&handler.value);
        });
    }
    p.clause("else", n.items("orelse"));
    p.clause("finally", n.items("finalbody"));
}

fn except_handler(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("except");
    p.optional(n, "type", " ");
    p.optional_ident(n, "name", " as ");
    p.block(n.items("body"));
}

fn raise(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("raise");
    p.optional(n, "exc", " ");
    p.optional(n, "cause", " from ");
}

fn assert(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("assert ");
    p.field(n, "test");
    p.optional(n, "msg", ", ");
}

fn names_stmt(p: &mut Printer<'_>, n: &MergedNode) {
    p.write(&n.kind.to_lowercase());
    p.write(" ");
    p.list(
        n.items("names"),
        |m| m.mark,
        |p| p.write(", "),
        |p, m| p.ident_value(&m.value),
    );
}

fn name(p: &mut Printer<'_>, n: &MergedNode) {
    p.ident(n, "id");
}

fn constant(p: &mut Printer<'_>, n: &MergedNode) {
    p.field(n, "value");
}

fn attribute(p: &mut Printer<'_>, n: &MergedNode) {
    p.operand(n.field("value"), ATOM);
    p.write(".");
    p.ident(n, "attr");
}

fn call(p: &mut Printer<'_>, n: &MergedNode) {
    p.operand(n.field("func"), ATOM);
    p.write("(");
    p.items(n.items("args").iter().chain(n.items("keywords")), ", ");
    p.write(")");
}

fn keyword(p: &mut Printer<'_>, n: &MergedNode) {
    if n.field("arg").current().is_none() {
        p.write("**");
    } else {
        p.ident(n, "arg");
        p.write("=");
    }
    p.field(n, "value");
}

fn starred(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("*");
    p.operand(n.field("value"), ATOM);
}

fn operator(p: &mut Printer<'_>, n: &MergedNode) {
    let symbol = OPERATORS
        .iter()
        .find(|(kind, _)| *kind == n.kind)
        .map_or(n.kind.as_str(), |(_, symbol)| *symbol);
    p.write(symbol);
}

fn bin_op(p: &mut Printer<'_>, n: &MergedNode) {
    let prec = binary_precedence(n.field("op").kind());
    // `**` is right-associative
    let (left, right) = if prec == POWER {
        (prec + 1, prec)
    } else {
        (prec, prec + 1)
    };
    p.operand(n.field("left"), left);
    p.write(" ");
    p.field(n, "op");
    p.write(" ");
    p.operand(n.field("right"), right);
}

fn unary_op(p: &mut Printer<'_>, n: &MergedNode) {
    p.field(n, "op");
    if n.field("op").kind() == Some("Not") {
        p.write(" ");
        p.operand(n.field("operand"), NOT);
    } else {
        p.operand(n.field("operand"), FACTOR);
    }
}

fn bool_op(p: &mut Printer<'_>, n: &MergedNode) {
    let prec = if n.field("op").kind() == Some("Or") { OR } else { AND };
    p.list(
        n.items("values"),
        |m| m.mark,
        |p| {
            p.write(" ");
            p.field(n, "op");
            p.write(" ");
        },
        |p, m| p.operand(&m.value, prec + 1),
    );
}

fn compare(p: &mut Printer<'_>, n: &MergedNode) {
    p.operand(n.field("left"), CMP + 1);
    let ops: Vec<&Marked> = n.items("ops").iter().collect();
    let pairs = pair_up(&ops, n.items("comparators"), 0);
    p.list(
        &pairs,
        |pair| pair.mark,
        |_| {},
        |p, pair| {
            if let Some(op) = pair.key {
                p.write(" ");
                p.value(&op.value);
            }
            for value in &pair.values {
                p.marked(value.mark, |p| {
                    p.write(" ");
                    p.operand(&value.value, CMP + 1);
                });
            }
        },
    );
}

fn if_exp(p: &mut Printer<'_>, n: &MergedNode) {
    p.operand(n.field("body"), IF_EXP + 1);
    p.write(" if ");
    p.operand(n.field("test"), IF_EXP + 1);
    p.write(" else ");
    p.operand(n.field("orelse"), IF_EXP);
}

fn lambda(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("lambda");
    let has_params = n
        .field("args")
        .current()
        .as_node()
        .is_some_and(|args| {
            args.fields.values().any(|v| match v {
                Merged::Seq(items) => visible_count(items) > 0,
                other => !other.current().is_none(),
            })
        });
    if has_params {
        p.write(" ");
    }
    p.field(n, "args");
    p.write(": ");
    p.field(n, "body");
}

fn await_expr(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("await ");
    p.operand(n.field("value"), AWAIT);
}

fn list(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("[");
    p.items(n.items("elts"), ", ");
    p.write("]");
}

fn tuple(p: &mut Printer<'_>, n: &MergedNode) {
    let elts = n.items("elts");
    p.write("(");
    p.items(elts, ", ");
    if visible_count(elts) == 1 {
        p.write(",");
    }
    p.write(")");
}

fn set(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("{");
    p.items(n.items("elts"), ", ");
    p.write("}");
}

fn dict(p: &mut Printer<'_>, n: &MergedNode) {
    let keys: Vec<&Marked> = n.items("keys").iter().collect();
    let pairs = pair_up(&keys, n.items("values"), 0);
    p.write("{");
    p.list(
        &pairs,
        |pair| pair.mark,
        |p| p.write(", "),
        |p, pair| {
            match pair.key {
                Some(key) if key.value.current().is_none() => p.write("**"),
                Some(key) => {
                    p.value(&key.value);
                    p.write(": ");
                }
                None => {}
            }
            for value in &pair.values {
                p.marked(value.mark, |p| p.value(&value.value));
            }
        },
    );
    p.write("}");
}

fn subscript(p: &mut Printer<'_>, n: &MergedNode) {
    p.operand(n.field("value"), ATOM);
    p.write("[");
    p.field(n, "slice");
    p.write("]");
}

fn slice(p: &mut Printer<'_>, n: &MergedNode) {
    p.optional(n, "lower", "");
    p.write(":");
    p.optional(n, "upper", "");
    p.optional(n, "step", ":");
}

fn generators(p: &mut Printer<'_>, n: &MergedNode) {
    for item in n.items("generators") {
        p.marked(item.mark, |p| {
            p.write(" ");
            p.value(&item.value);
        });
    }
}

fn list_comp(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("[");
    p.field(n, "elt");
    generators(p, n);
    p.write("]");
}

fn set_comp(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("{");
    p.field(n, "elt");
    generators(p, n);
    p.write("}");
}

fn generator_exp(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("(");
    p.field(n, "elt");
    generators(p, n);
    p.write(")");
}

fn dict_comp(p: &mut Printer<'_>, n: &MergedNode) {
    p.write("{");
    p.field(n, "key");
    p.write(": ");
    p.field(n, "value");
    generators(p, n);
    p.write("}");
}

fn comprehension(p: &mut Printer<'_>, n: &MergedNode) {
    if matches!(n.field("is_async").current(), Merged::Scalar(Scalar::Int(1) | Scalar::Bool(true))) {
        p.write("async ");
    }
    p.write("for ");
    p.field(n, "target");
    p.write(" in ");
    p.operand(n.field("iter"), IF_EXP + 1);
    for cond in n.items("ifs") {
        p.marked(cond.mark, |p| {
            p.write(" if ");
            p.operand(&cond.value, IF_EXP + 1);
        });
    }
}

/// One entry of a parameter list.
enum Param<'m> {
    /// A parameter with its default, if any.
    Named(Pair<'m>),
    /// `/` or a bare `*`.
    Marker(&'static str, Mark),
    /// `*args` or `**kwargs`.
    Star(&'static str, &'m Merged),
}

impl Param<'_> {
    fn mark(&self) -> Mark {
        match self {
            Param::Named(pair) => pair.mark,
            Param::Marker(_, mark) => *mark,
            Param::Star(_, value) => presence(value).0,
        }
    }
}

fn arguments(p: &mut Printer<'_>, n: &MergedNode) {
    let posonly = n.items("posonlyargs");
    let positional: Vec<&Marked> = posonly.iter().chain(n.items("args")).collect();
    let defaults = n.items("defaults");
    // defaults belong to the last positional parameters
    let without_default =
        visible_count(positional.iter().copied()).saturating_sub(visible_count(defaults));

    let mut params: Vec<Param> = pair_up(&positional, defaults, without_default)
        .into_iter()
        .map(Param::Named)
        .collect();
    if !posonly.is_empty() {
        params.insert(posonly.len().min(params.len()), Param::Marker("/", group_mark(posonly)));
    }

    let kwonly: Vec<&Marked> = n.items("kwonlyargs").iter().collect();
    let vararg = n.field("vararg");
    let star = (!vararg.is_none()).then(|| Param::Star("*", vararg));
    let bare = bare_star(vararg, &kwonly).map(|mark| Param::Marker("*", mark));
    // a removed `*args` and the bare `*` replacing it, or the reverse
    if bare.as_ref().is_some_and(|b| b.mark() == Mark::Deleted) {
        params.extend(bare);
        params.extend(star);
    } else {
        params.extend(star);
        params.extend(bare);
    }
    params.extend(pair_up(&kwonly, n.items("kw_defaults"), 0).into_iter().map(Param::Named));

    let kwarg = n.field("kwarg");
    if !kwarg.is_none() {
        params.push(Param::Star("**", kwarg));
    }

    p.list(&params, Param::mark, |p| p.write(", "), |p, param| match param {
        Param::Named(pair) => {
            if let Some(key) = pair.key {
                p.value(&key.value);
            }
            for default in &pair.values {
                if default.value.current().is_none() {
                    continue;
                }
                p.marked(default.mark, |p| {
                    p.write("=");
                    p.value(&default.value);
                });
            }
        }
        Param::Marker(text, _) => p.write(text),
        Param::Star(prefix, value) => {
            p.write(prefix);
            p.value(presence(value).1);
        }
    });
}

/// Mark of the bare `*` before keyword-only parameters. It is present on a
/// side that has keyword-only parameters but no `*args`.
fn bare_star(vararg: &Merged, kwonly: &[&Marked]) -> Option<Mark> {
    let (mark, shown) = presence(vararg);
    let star_before = !shown.is_none() && mark != Mark::Inserted;
    let star_after = !shown.is_none() && mark != Mark::Deleted;
    let before = !star_before && kwonly.iter().any(|m| m.mark != Mark::Inserted);
    let after = !star_after && kwonly.iter().any(|m| m.mark != Mark::Deleted);
    match (before, after) {
        (true, true) => Some(Mark::Plain),
        (true, false) => Some(Mark::Deleted),
        (false, true) => Some(Mark::Inserted),
        (false, false) => None,
    }
}

fn arg(p: &mut Printer<'_>, n: &MergedNode) {
    p.ident(n, "arg");
    p.optional(n, "annotation", ": ");
}

fn visible_count<'a>(items: impl IntoIterator<Item = &'a Marked>) -> usize {
    items.into_iter().filter(|m| m.is_visible()).count()
}

/// A key element with the value elements that belong to it.
struct Pair<'m> {
    mark: Mark,
    key: Option<&'m Marked>,
    values: Vec<&'m Marked>,
}

/// Pair keys with values from a parallel sequence, as in dict keys and
/// values or parameters and defaults. The first `skip` visible keys take no
/// value. A visible key takes the next visible value together with any
/// removed values before it; a removed key takes a removed value at the head
/// of the queue. Values left over are attached to the last pair.
fn pair_up<'m>(keys: &[&'m Marked], values: &'m [Marked], skip: usize) -> Vec<Pair<'m>> {
    let mut queue = values.iter().peekable();
    let mut unpaired = skip;
    let mut pairs: Vec<Pair<'m>> = Vec::with_capacity(keys.len());

    for &key in keys {
        let mut taken = Vec::new();
        if key.is_visible() {
            if unpaired > 0 {
                unpaired -= 1;
            } else {
                for value in queue.by_ref() {
                    taken.push(value);
                    if value.is_visible() {
                        break;
                    }
                }
            }
        } else if unpaired == 0 {
            taken.extend(queue.next_if(|v| !v.is_visible()));
        }
        pairs.push(Pair {
            mark: key.mark,
            key: Some(key),
            values: taken,
        });
    }

    let rest: Vec<&Marked> = queue.collect();
    if !rest.is_empty() {
        match pairs.last_mut() {
            Some(last) => last.values.extend(rest),
            None => pairs.push(Pair {
                mark: group_mark(rest.iter().copied()),
                key: None,
                values: rest,
            }),
        }
    }
    pairs
}
