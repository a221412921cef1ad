use crate::interp::value::{Value, ValueKind};
use crate::types::{Ty, TyKind};

const TABLEN: usize = 4;
const MAXDEPTH: usize = 4;
const LINELEN: usize = 80;

/// Render a value. Annotations come out as leading `#` comment lines;
/// nesting is depth-bounded, so cyclic data prints as `[...]`/`{...}`.
pub fn display_value(value: &Value) -> String {
    let mut out = String::new();
    if let Some(note) = &value.note {
        for line in note.lines() {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push_str(&render_value(value, 0));
    out
}

/// Render a type term, single line, reparseable.
pub fn display_type(term: &Ty) -> String {
    render_type(term)
}

fn prefix(depth: usize) -> String {
    " ".repeat(depth * TABLEN)
}

/// Collapse a multi-line rendering onto one line when it fits.
fn shorten(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = false;
    for c in text.chars() {
        let c = if c == '\n' { ' ' } else { c };
        if c == ' ' {
            if last_space {
                continue;
            }
            last_space = true;
        } else {
            last_space = false;
        }
        out.push(c);
    }
    let out = out
        .replace("[ ", "[")
        .replace("{ ", "{")
        .replace("( ", "(")
        .replace(" ]", "]")
        .replace(" }", "}")
        .replace(" )", ")");
    out
}

fn shorten_if_possible(text: String, depth: usize) -> String {
    let short = shorten(&text);
    if short.len() < LINELEN.saturating_sub(depth * TABLEN) {
        short
    } else {
        text
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn render_num(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{n:.1}")
    } else {
        format!("{n}")
    }
}

fn render_value(value: &Value, depth: usize) -> String {
    match &value.kind {
        ValueKind::Null => "null".to_string(),
        ValueKind::Bool(b) => b.to_string(),
        ValueKind::Int(n) => n.to_string(),
        ValueKind::Num(n) => render_num(*n),
        ValueKind::Str(s) => quote(s),
        ValueKind::Array(items) => {
            if depth >= MAXDEPTH {
                return "[...]".to_string();
            }
            let items = items.borrow();
            if items.is_empty() {
                return "[]".to_string();
            }
            let inner: Vec<String> = items
                .iter()
                .map(|item| format!("{}{}", prefix(depth + 1), render_value(item, depth + 1)))
                .collect();
            let text = format!("[\n{}\n{}]", inner.join(",\n"), prefix(depth));
            shorten_if_possible(text, depth)
        }
        ValueKind::Object(items) => {
            if depth >= MAXDEPTH {
                return "{...}".to_string();
            }
            let items = items.borrow();
            if items.is_empty() {
                return "{}".to_string();
            }
            let inner: Vec<String> = items
                .iter()
                .map(|(key, item)| {
                    format!(
                        "{}{}: {}",
                        prefix(depth + 1),
                        quote(key),
                        render_value(item, depth + 1)
                    )
                })
                .collect();
            let text = format!("{{\n{}\n{}}}", inner.join(",\n"), prefix(depth));
            shorten_if_possible(text, depth)
        }
        ValueKind::Function(closure) => {
            format!(
                "{}:{} -> {}",
                closure.def.param,
                render_type(&closure.param_ty),
                render_type(&closure.ret_ty)
            )
        }
        ValueKind::Builtin(builtin) => {
            let mut parts: Vec<String> = builtin.def.params[builtin.applied.len()..]
                .iter()
                .map(|ty| render_type(ty))
                .collect();
            parts.push(render_type(&builtin.def.ret));
            parts.join(" -> ")
        }
        ValueKind::Oracle(oracle) => {
            let mut parts: Vec<String> = oracle.sig.params[oracle.applied.len()..]
                .iter()
                .map(|(name, ty)| format!("{}:{}", name, render_type(ty)))
                .collect();
            parts.push(render_type(&oracle.sig.ret));
            parts.join(" -> ")
        }
        ValueKind::Type(tv) => format!("type {}", render_type(&tv.term)),
    }
}

fn render_type(term: &Ty) -> String {
    match &term.kind {
        TyKind::Prim(prim) => prim.name().to_string(),
        TyKind::Name(name) => name.clone(),
        TyKind::Array(elem) => format!("[{}]", render_type(elem)),
        TyKind::Object(fields) => {
            if fields.is_empty() {
                return "{}".to_string();
            }
            let inner: Vec<String> = fields
                .iter()
                .map(|field| {
                    let bang = if field.required { "!" } else { "" };
                    format!("{}{}: {}", field.name, bang, render_type(&field.ty))
                })
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
        TyKind::Arrow(left, right) => {
            let left_txt = if matches!(left.kind, TyKind::Arrow(..)) {
                format!("({})", render_type(left))
            } else {
                render_type(left)
            };
            format!("{} -> {}", left_txt, render_type(right))
        }
        TyKind::Option(inner) => {
            if matches!(inner.kind, TyKind::Arrow(..)) {
                format!("({})?", render_type(inner))
            } else {
                format!("{}?", render_type(inner))
            }
        }
        TyKind::Enum { base, values } => {
            let items: Vec<String> = values
                .iter()
                .map(|value| shorten(&render_value(value, 0)))
                .collect();
            format!("Enum({}, [{}])", render_type(base), items.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Prim;

    #[test]
    fn scalars() {
        assert_eq!(display_value(&Value::int(42)), "42");
        assert_eq!(display_value(&Value::num(0.0)), "0.0");
        assert_eq!(display_value(&Value::num(2.5)), "2.5");
        assert_eq!(display_value(&Value::str("a\nb")), "\"a\\nb\"");
        assert_eq!(display_value(&Value::null()), "null");
    }

    #[test]
    fn short_containers_collapse() {
        let v = Value::array(vec![Value::int(1), Value::int(2)]);
        assert_eq!(display_value(&v), "[1, 2]");
        let o = Value::object(vec![("x".to_string(), Value::int(1))]);
        assert_eq!(display_value(&o), "{\"x\": 1}");
    }

    #[test]
    fn annotations_render_as_comment_lines() {
        let v = Value::int(1).with_note("the answer");
        assert_eq!(display_value(&v), "# the answer\n1");
    }

    #[test]
    fn cyclic_arrays_are_bounded() {
        let inner = Value::array(vec![]);
        if let ValueKind::Array(items) = &inner.kind {
            items.borrow_mut().push(inner.clone());
        }
        // must terminate
        let text = display_value(&inner);
        assert!(text.contains("[...]") || text.contains('['));
    }

    #[test]
    fn type_rendering_round_trips_syntax() {
        let arrow = Ty::new(TyKind::Arrow(
            Ty::new(TyKind::Arrow(Ty::prim(Prim::Int), Ty::prim(Prim::Int))),
            Ty::prim(Prim::Str),
        ));
        assert_eq!(display_type(&arrow), "(Int -> Int) -> Str");
        let opt = Ty::new(TyKind::Option(Ty::prim(Prim::Int)));
        assert_eq!(display_type(&opt), "Int?");
    }
}
