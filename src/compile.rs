use std::sync::Arc;

use log::{debug, trace, warn};

use crate::types::{MatchClause, Op, Segment};
use crate::{CompileError, Opcode, PatternCache, RuleId, RuleSet, Sexpr};

/// Compile one directive form into the arena of `rules`.
///
/// On failure every node allocated while compiling the form is released
/// again, so the arena only ever holds nodes reachable from a linked rule.
pub(crate) fn compile(rules: &mut RuleSet, form: &Sexpr) -> Result<RuleId, CompileError> {
    let mark = rules.nodes.len();
    let result = compile_node(rules, form);
    if result.is_err() {
        rules.nodes.truncate(mark);
    }
    result
}

fn compile_node(rules: &mut RuleSet, form: &Sexpr) -> Result<RuleId, CompileError> {
    let (Some(head), Some(payload)) = (form.head(), form.tail()) else {
        return Err(CompileError::NotAList);
    };

    let op = match head.as_symbol() {
        Some("match") => Op::Match(match_clauses(&mut rules.patterns, payload)),
        Some("when") => compile_when(rules, payload)?,
        Some("mknod") => Op::Mknod(path_template(payload)?),
        Some("set-user") => {
            let user = string_payload(payload, Opcode::SetUser)?;
            Op::SetUser(rules.interner.intern(user))
        }
        Some("set-group") => {
            let group = string_payload(payload, Opcode::SetGroup)?;
            Op::SetGroup(rules.interner.intern(group))
        }
        Some("set-attribute") => {
            if payload.iter().any(|a| a.is_symbol("block-device")) {
                Op::SetBlockDevice
            } else {
                return Err(CompileError::MissingPayload {
                    opcode: Opcode::SetBlockDevice,
                });
            }
        }
        Some("set-mode") => Op::SetMode(mode_payload(payload)?),
        _ => {
            return Err(CompileError::UnknownOpcode {
                name: head.to_string(),
            })
        }
    };

    let opcode = op.opcode();
    let id = rules.push_node(op);
    debug!("compiled '{opcode}' as node {}", id.index());
    Ok(id)
}

fn compile_when(rules: &mut RuleSet, payload: &Sexpr) -> Result<Op, CompileError> {
    let condition = branch(rules, payload.nth(0), "condition")?;
    let body = branch(rules, payload.nth(1), "body")?;
    Ok(Op::When { condition, body })
}

fn branch(
    rules: &mut RuleSet,
    form: Option<&Sexpr>,
    name: &'static str,
) -> Result<RuleId, CompileError> {
    let empty = CompileError::EmptyWhenBranch { branch: name };
    let Some(form) = form else {
        return Err(empty);
    };
    compile_node(rules, form).map_err(|inner| {
        debug!("'when' {name} rejected: {inner}");
        empty
    })
}

/// Collect `(KEY . "pattern")` clauses, registering each pattern. The
/// two-element list form `(KEY "pattern")` is accepted too. Anything else
/// is skipped.
fn match_clauses(patterns: &mut PatternCache, payload: &Sexpr) -> Vec<MatchClause> {
    let mut clauses = Vec::new();
    for clause in payload {
        let Some(key) = clause.head().and_then(Sexpr::as_symbol) else {
            trace!("skipping match clause {clause}");
            continue;
        };
        let tail = clause.tail();
        let pattern = tail
            .and_then(Sexpr::as_string)
            .or_else(|| tail.and_then(|t| t.nth(0)).and_then(Sexpr::as_string));
        let Some(pattern) = pattern else {
            trace!("skipping match clause {clause}");
            continue;
        };

        let pattern = match patterns.register(pattern) {
            Ok(shared) => shared,
            Err(err) => {
                warn!("pattern {pattern:?} for {key} will never match: {err}");
                Arc::from(pattern)
            }
        };
        clauses.push(MatchClause {
            key: Arc::from(key),
            pattern,
        });
    }
    clauses
}

fn path_template(payload: &Sexpr) -> Result<Vec<Segment>, CompileError> {
    let segments: Vec<Segment> = payload
        .iter()
        .filter_map(|seg| match seg {
            Sexpr::Symbol(name) => Some(Segment::Attribute(Arc::clone(name))),
            Sexpr::String(text) => Some(Segment::Literal(Arc::clone(text))),
            other => {
                trace!("skipping mknod segment {other}");
                None
            }
        })
        .collect();
    if segments.is_empty() {
        return Err(CompileError::MissingPayload {
            opcode: Opcode::Mknod,
        });
    }
    Ok(segments)
}

fn string_payload(payload: &Sexpr, opcode: Opcode) -> Result<&str, CompileError> {
    payload
        .nth(0)
        .and_then(Sexpr::as_string)
        .ok_or(CompileError::MissingPayload { opcode })
}

fn mode_payload(payload: &Sexpr) -> Result<u32, CompileError> {
    payload
        .nth(0)
        .and_then(Sexpr::as_integer)
        .and_then(|n| u32::try_from(n).ok())
        .map(|mode| mode & 0o7777)
        .ok_or(CompileError::MissingPayload {
            opcode: Opcode::SetMode,
        })
}
