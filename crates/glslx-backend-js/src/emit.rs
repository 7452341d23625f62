//! JavaScript text emission.
//!
//! Parentheses are inserted only where JavaScript precedence requires
//! them. Blocks are indented by two spaces.

use std::fmt::{self, Write as _};

use crate::ast::{JsBinaryOp, JsExpr, JsFunction, JsItem, JsModule, JsStmt, JsUnaryOp};
use crate::runtime::PREAMBLE;

const PREC_ASSIGN: u8 = 2;
const PREC_CONDITIONAL: u8 = 3;
const PREC_UNARY: u8 = 15;
const PREC_POSTFIX: u8 = 18;
const PREC_PRIMARY: u8 = 20;

const INDENT: &str = "  ";

fn binary_precedence(op: JsBinaryOp) -> u8 {
    match op {
        JsBinaryOp::Or => 4,
        JsBinaryOp::And => 5,
        JsBinaryOp::StrictEq | JsBinaryOp::StrictNe => 9,
        JsBinaryOp::Lt | JsBinaryOp::Le | JsBinaryOp::Gt | JsBinaryOp::Ge => 10,
        JsBinaryOp::Add | JsBinaryOp::Sub => 12,
        JsBinaryOp::Mul | JsBinaryOp::Div | JsBinaryOp::Rem => 13,
    }
}

fn precedence(expr: &JsExpr) -> u8 {
    match expr {
        JsExpr::Number(text) if text.starts_with('-') => PREC_UNARY,
        JsExpr::Number(_)
        | JsExpr::Bool(_)
        | JsExpr::Ident(_)
        | JsExpr::Array(_)
        | JsExpr::Object(_) => PREC_PRIMARY,
        JsExpr::Member { .. } | JsExpr::Index { .. } | JsExpr::Call { .. } => PREC_POSTFIX,
        JsExpr::Unary { .. } => PREC_UNARY,
        JsExpr::Binary { op, .. } => binary_precedence(*op),
        JsExpr::Conditional { .. } => PREC_CONDITIONAL,
        JsExpr::Assign { .. } => PREC_ASSIGN,
    }
}

fn operand(f: &mut fmt::Formatter<'_>, expr: &JsExpr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn list(f: &mut fmt::Formatter<'_>, items: &[JsExpr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        operand(f, item, precedence(item) <= PREC_ASSIGN)?;
    }
    Ok(())
}

impl fmt::Display for JsExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(text) => f.write_str(text),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Ident(name) => f.write_str(name),
            Self::Member { object, property } => {
                operand(f, object, precedence(object) < PREC_POSTFIX)?;
                write!(f, ".{property}")
            }
            Self::Index { object, index } => {
                operand(f, object, precedence(object) < PREC_POSTFIX)?;
                write!(f, "[{index}]")
            }
            Self::Unary { op, expr } => {
                let nested_minus = *op == JsUnaryOp::Minus
                    && match &**expr {
                        Self::Unary {
                            op: JsUnaryOp::Minus,
                            ..
                        } => true,
                        Self::Number(text) => text.starts_with('-'),
                        _ => false,
                    };
                f.write_str(match op {
                    JsUnaryOp::Minus => "-",
                    JsUnaryOp::Not => "!",
                })?;
                operand(f, expr, nested_minus || precedence(expr) < PREC_UNARY)
            }
            Self::Binary { op, left, right } => {
                let prec = binary_precedence(*op);
                operand(f, left, precedence(left) < prec)?;
                write!(f, " {} ", op.symbol())?;
                operand(f, right, precedence(right) <= prec)
            }
            Self::Conditional {
                condition,
                accept,
                reject,
            } => {
                operand(f, condition, precedence(condition) <= PREC_CONDITIONAL)?;
                f.write_str(" ? ")?;
                operand(f, accept, precedence(accept) <= PREC_ASSIGN)?;
                f.write_str(" : ")?;
                operand(f, reject, precedence(reject) < PREC_CONDITIONAL)
            }
            Self::Call { callee, arguments } => {
                operand(f, callee, precedence(callee) < PREC_POSTFIX)?;
                f.write_char('(')?;
                list(f, arguments)?;
                f.write_char(')')
            }
            Self::Array(items) => {
                f.write_char('[')?;
                list(f, items)?;
                f.write_char(']')
            }
            Self::Object(properties) => {
                if properties.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (i, (name, value)) in properties.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: ")?;
                    operand(f, value, precedence(value) <= PREC_ASSIGN)?;
                }
                f.write_str(" }")
            }
            Self::Assign { op, target, value } => {
                write!(f, "{target} ")?;
                if let Some(op) = op {
                    f.write_str(op.symbol())?;
                }
                write!(f, "= {value}")
            }
        }
    }
}

fn write_block(out: &mut String, block: &[JsStmt], depth: usize) {
    for stmt in block {
        write_stmt(out, stmt, depth);
    }
}

fn write_stmt(out: &mut String, stmt: &JsStmt, depth: usize) {
    let pad = INDENT.repeat(depth);
    match stmt {
        JsStmt::Let { name, init } => out.push_str(&format!("{pad}let {name} = {init};\n")),
        JsStmt::Expr(expr) => out.push_str(&format!("{pad}{expr};\n")),
        JsStmt::Return(Some(value)) => out.push_str(&format!("{pad}return {value};\n")),
        JsStmt::Return(None) => out.push_str(&format!("{pad}return;\n")),
        JsStmt::If { .. } => {
            out.push_str(&pad);
            write_if(out, stmt, depth);
        }
        JsStmt::For {
            init,
            condition,
            step,
            body,
        } => {
            let condition = condition.as_ref().map(ToString::to_string).unwrap_or_default();
            if init.is_none() && step.is_none() {
                let condition = if condition.is_empty() { "true".into() } else { condition };
                out.push_str(&format!("{pad}while ({condition}) {{\n"));
            } else {
                let init = match init.as_deref() {
                    Some(JsStmt::Let { name, init }) => format!("let {name} = {init}"),
                    Some(JsStmt::Expr(expr)) => expr.to_string(),
                    _ => String::new(),
                };
                let step = step.as_ref().map(ToString::to_string).unwrap_or_default();
                out.push_str(&format!("{pad}for ({init}; {condition}; {step}) {{\n"));
            }
            write_block(out, body, depth + 1);
            out.push_str(&format!("{pad}}}\n"));
        }
        JsStmt::Block(block) => {
            out.push_str(&format!("{pad}{{\n"));
            write_block(out, block, depth + 1);
            out.push_str(&format!("{pad}}}\n"));
        }
        JsStmt::Break => out.push_str(&format!("{pad}break;\n")),
        JsStmt::Continue => out.push_str(&format!("{pad}continue;\n")),
    }
}

/// Writes an `if` chain starting at the current column.
fn write_if(out: &mut String, stmt: &JsStmt, depth: usize) {
    let JsStmt::If {
        condition,
        accept,
        reject,
    } = stmt
    else {
        return;
    };
    let pad = INDENT.repeat(depth);
    out.push_str(&format!("if ({condition}) {{\n"));
    write_block(out, accept, depth + 1);
    match reject.as_slice() {
        [] => out.push_str(&format!("{pad}}}\n")),
        [nested @ JsStmt::If { .. }] => {
            out.push_str(&format!("{pad}}} else "));
            write_if(out, nested, depth);
        }
        _ => {
            out.push_str(&format!("{pad}}} else {{\n"));
            write_block(out, reject, depth + 1);
            out.push_str(&format!("{pad}}}\n"));
        }
    }
}

impl fmt::Display for JsStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_stmt(&mut out, self, 0);
        f.write_str(out.trim_end())
    }
}

fn write_function(out: &mut String, func: &JsFunction) {
    out.push_str("/**\n");
    for param in &func.params {
        out.push_str(&format!(" * @param {{{}}} {}\n", param.doc_type, param.name));
    }
    if let Some(returns) = &func.returns {
        out.push_str(&format!(" * @returns {{{returns}}}\n"));
    }
    out.push_str(" */\n");
    let params: Vec<&str> = func.params.iter().map(|p| p.name.as_str()).collect();
    out.push_str(&format!(
        "export function {}({}) {{\n",
        func.name,
        params.join(", ")
    ));
    write_block(out, &func.body, 1);
    out.push_str("}\n");
}

/// Name of the setter generated for a host-provided global.
pub fn setter_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("set{}{}", first.to_uppercase(), chars.as_str()),
        None => "set".into(),
    }
}

fn write_item(out: &mut String, item: &JsItem) {
    match item {
        JsItem::Typedef { name, properties } => {
            out.push_str(&format!("/**\n * @typedef {{Object}} {name}\n"));
            for property in properties {
                out.push_str(&format!(
                    " * @property {{{}}} {}\n",
                    property.doc_type, property.name
                ));
            }
            out.push_str(" */\n");
        }
        JsItem::Const {
            name,
            doc_type,
            value,
        } => {
            out.push_str(&format!(
                "/** @type {{{doc_type}}} */\nexport const {name} = {value};\n"
            ));
        }
        JsItem::Let {
            name,
            doc_type,
            value,
            setter,
        } => {
            out.push_str(&format!(
                "/** @type {{{doc_type}}} */\nexport let {name} = {value};\n"
            ));
            if *setter {
                out.push_str(&format!(
                    "/** @param {{{doc_type}}} value */\nexport function {}(value) {{\n{INDENT}{name} = value;\n}}\n",
                    setter_name(name)
                ));
            }
        }
        JsItem::Function(func) => write_function(out, func),
    }
}

impl fmt::Display for JsModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            write_item(&mut out, item);
        }
        f.write_str(&out)
    }
}

/// The complete ES module: runtime preamble followed by the items.
pub fn emit_module(module: &JsModule) -> String {
    format!("{PREAMBLE}\n{module}")
}
