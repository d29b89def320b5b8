//! Word Expansion
//!
//! Main entry point for shell word expansion.
//!
//! Handles shell word expansion including:
//! - Variable expansion ($VAR, ${VAR})
//! - Command substitution $(...)
//! - Arithmetic expansion $((...)
//! - Tilde expansion (~)
//! - Brace expansion {a,b,c}
//! - Glob expansion (*, ?, [...])
//!
//! This module provides the high-level expansion functions.
//! The actual expansion logic is implemented in the expansion/ submodules.
//! Command substitution requires runtime dependencies (script execution).

use crate::ast::types::{
    WordNode, WordPart, LiteralPart, SingleQuotedPart, DoubleQuotedPart,
    ParameterExpansionPart, CommandSubstitutionPart, ArithmeticExpansionPart,
    TildeExpansionPart, GlobPart, BraceExpansionPart, BraceItem, BraceRangeValue,
    InnerParameterOperation, ParameterOperation, PatternAnchor, CaseDirection,
    TransformOperator, ScriptNode,
};
use crate::interpreter::types::{ExecResult, InterpreterState};

// Re-export commonly used expansion functions
pub use crate::interpreter::expansion::analysis::*;
pub use crate::interpreter::expansion::brace_range::*;
pub use crate::interpreter::expansion::glob_escape::*;
pub use crate::interpreter::expansion::pattern::*;
pub use crate::interpreter::expansion::pattern_removal::*;
pub use crate::interpreter::expansion::quoting::*;
pub use crate::interpreter::expansion::tilde::*;
pub use crate::interpreter::expansion::variable::*;
pub use crate::interpreter::expansion::word_split::*;

use crate::interpreter::expansion::{
    apply_array_pattern_removal, apply_array_pattern_replacement, apply_array_slicing,
    apply_array_transform, apply_case_modification, apply_pattern_removal_op,
    apply_pattern_removal_with_prefix_suffix, apply_pattern_replacement_op,
    apply_pattern_replacement_with_prefix_suffix, apply_positional_pattern_removal,
    apply_positional_pattern_replacement, apply_positional_slicing, apply_prefix_suffix_to_array,
    apply_substring_op, apply_transform_op, expand_indirect_array, expand_unquoted_array,
    expand_unquoted_array_keys, expand_unquoted_positional, expand_unquoted_var_name_prefix,
    get_array_elements, get_array_keys, get_parameter_length, get_positional_params,
    get_var_names_with_prefix_op, is_variable_set, pattern_to_regex,
    should_use_alternative, should_use_default, ParameterOpContext,
};
use crate::interpreter::helpers::get_ifs;
use regex_lite::Regex;

/// Result of word expansion.
#[derive(Debug, Clone)]
pub struct WordExpansionResult {
    /// The expanded string value
    pub value: String,
    /// Whether the expansion produced multiple words (from word splitting)
    pub split_words: Option<Vec<String>>,
    /// Any stderr output from command substitutions
    pub stderr: String,
    /// Exit code from command substitutions (if any)
    pub exit_code: Option<i32>,
}

impl WordExpansionResult {
    /// Create a simple result with just a value.
    pub fn simple(value: String) -> Self {
        Self {
            value,
            split_words: None,
            stderr: String::new(),
            exit_code: None,
        }
    }

    /// Create a result with split words.
    pub fn with_split(value: String, words: Vec<String>) -> Self {
        Self {
            value,
            split_words: Some(words),
            stderr: String::new(),
            exit_code: None,
        }
    }
}

/// Options for word expansion.
#[derive(Debug, Clone, Default)]
pub struct WordExpansionOptions {
    /// Whether we're inside double quotes
    pub in_double_quotes: bool,
    /// Whether to perform word splitting
    pub do_word_split: bool,
    /// Whether to perform glob expansion
    pub do_glob: bool,
    /// Whether to preserve empty fields
    pub preserve_empty: bool,
    /// Whether extglob is enabled
    pub extglob: bool,
}

/// Callback type for command substitution execution.
///
/// The runtime must provide this callback to execute command substitutions.
/// It takes the command string and returns the execution result.
pub type CommandSubstitutionFn = Box<dyn Fn(&str, &mut InterpreterState) -> ExecResult + Send + Sync>;

/// Expand a word without glob expansion.
///
/// This performs all expansions except glob expansion:
/// - Tilde expansion
/// - Parameter expansion
/// - Command substitution (requires callback)
/// - Arithmetic expansion
/// - Brace expansion
/// - Quote removal
///
/// For command substitution, if no callback is provided, $(...) and `...`
/// are left unexpanded.
pub fn expand_word_no_glob(
    state: &InterpreterState,
    word: &WordNode,
    options: &WordExpansionOptions,
) -> WordExpansionResult {
    let mut result = String::new();

    for part in &word.parts {
        result.push_str(&expand_part_no_glob(state, part, options));
    }

    WordExpansionResult::simple(result)
}

/// Expand a single word part without glob expansion.
fn expand_part_no_glob(
    state: &InterpreterState,
    part: &WordPart,
    options: &WordExpansionOptions,
) -> String {
    use crate::interpreter::helpers::word_parts::get_literal_value;
    use crate::interpreter::expansion::tilde::apply_tilde_expansion;
    use crate::interpreter::expansion::variable::get_variable;

    // Handle literal parts
    if let Some(literal) = get_literal_value(part) {
        return literal.to_string();
    }

    match part {
        WordPart::TildeExpansion(tilde) => {
            // Tilde expansion doesn't happen inside double quotes
            if options.in_double_quotes {
                return match &tilde.user {
                    Some(u) => format!("~{}", u),
                    None => "~".to_string(),
                };
            }
            // apply_tilde_expansion expects a &str value, not Option<&str>
            // For TildeExpansionPart, we construct the tilde string
            let tilde_str = match &tilde.user {
                Some(u) => format!("~{}", u),
                None => "~".to_string(),
            };
            apply_tilde_expansion(state, &tilde_str)
        }
        WordPart::ParameterExpansion(param) => {
            // Simple variable expansion
            get_variable(state, &param.parameter)
        }
        WordPart::DoubleQuoted(dq) => {
            // Expand contents of double quotes
            let inner_options = WordExpansionOptions {
                in_double_quotes: true,
                ..options.clone()
            };
            let mut result = String::new();
            for inner_part in &dq.parts {
                result.push_str(&expand_part_no_glob(state, inner_part, &inner_options));
            }
            result
        }
        WordPart::CommandSubstitution(_) => {
            // Command substitution requires runtime callback
            // Return empty string if no callback provided
            String::new()
        }
        WordPart::ArithmeticExpansion(arith) => {
            // Arithmetic expansion
            use crate::interpreter::arithmetic::evaluate_arithmetic;
            use crate::interpreter::types::{ExecutionLimits, InterpreterContext};

            // Evaluate the expression
            // Note: This creates a temporary mutable state, which is not ideal
            // In a real implementation, the state should be passed mutably
            let limits = ExecutionLimits::default();
            let mut state_clone = state.clone();
            let mut ctx = InterpreterContext::new(&mut state_clone, &limits);
            match evaluate_arithmetic(&mut ctx, &arith.expression.expression, true, None) {
                Ok(value) => value.to_string(),
                Err(_) => "0".to_string(),
            }
        }
        WordPart::Glob(glob) => {
            // In non-glob mode, return the pattern as-is
            glob.pattern.clone()
        }
        WordPart::BraceExpansion(_) => {
            // Brace expansion is complex and typically handled at a higher level
            // For now, return empty
            String::new()
        }
        _ => String::new(),
    }
}

/// Check if a word is "fully quoted" - meaning glob characters should be treated literally.
///
/// A word is fully quoted if all its parts are either:
/// - SingleQuoted
/// - DoubleQuoted (entirely quoted variable expansion like "$pat")
/// - Escaped characters
pub fn is_word_fully_quoted(word: &WordNode) -> bool {
    use crate::interpreter::helpers::word_parts::is_quoted_part;

    // Empty word is considered quoted (matches empty pattern literally)
    if word.parts.is_empty() {
        return true;
    }

    // Check if we have any unquoted parts with actual content
    for part in &word.parts {
        if !is_quoted_part(part) {
            return false;
        }
    }
    true
}

/// Check if a word contains any glob patterns.
pub fn word_has_glob_pattern(word: &WordNode, extglob: bool) -> bool {
    use crate::interpreter::expansion::glob_escape::has_glob_pattern;

    for part in &word.parts {
        match part {
            WordPart::Glob(_) => return true,
            WordPart::Literal(lit) => {
                if has_glob_pattern(&lit.value, extglob) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Check if a word contains command substitution.
pub fn word_has_command_substitution(word: &WordNode) -> bool {
    for part in &word.parts {
        if matches!(part, WordPart::CommandSubstitution(_)) {
            return true;
        }
        if let WordPart::DoubleQuoted(dq) = part {
            for inner in &dq.parts {
                if matches!(inner, WordPart::CommandSubstitution(_)) {
                    return true;
                }
            }
        }
    }
    false
}

// ============================================================================
// Real word expansion: brace expansion, parameter operations, command
// substitution and arithmetic expansion threaded through live interpreter
// state, field splitting and glob-candidate detection.
// ============================================================================

/// Callback the runtime provides to run a command substitution's body and
/// hand back its captured stdout (and side effects on `state`).
pub type CommandSubstFn<'a> = dyn FnMut(&mut InterpreterState, &ScriptNode) -> ExecResult + 'a;

fn ast_removal_side(side: crate::ast::types::PatternRemovalSide) -> PatternRemovalSide {
    match side {
        crate::ast::types::PatternRemovalSide::Prefix => PatternRemovalSide::Prefix,
        crate::ast::types::PatternRemovalSide::Suffix => PatternRemovalSide::Suffix,
    }
}

/// Expand a bare (non-quoted) word fragment to a literal string, for use as
/// a pattern operand (e.g. the `word` in `${var#word}`) or an array
/// subscript. Quote removal happens, but no field splitting or globbing.
fn flatten_word(state: &mut InterpreterState, word: &WordNode, cmd_subst: &mut CommandSubstFn) -> String {
    word.parts
        .iter()
        .map(|p| expand_part(state, p, false, cmd_subst))
        .collect()
}

/// Expand a bare word fragment, but leave glob metacharacters in `Glob`
/// parts untouched so the result can still be used as a pattern (e.g. for
/// `${var/pattern/repl}` where `pattern` may contain `*`/`?`).
fn flatten_pattern_word(state: &mut InterpreterState, word: &WordNode, cmd_subst: &mut CommandSubstFn) -> String {
    word.parts
        .iter()
        .map(|p| match p {
            WordPart::Glob(g) => g.pattern.clone(),
            _ => expand_part(state, p, false, cmd_subst),
        })
        .collect()
}

/// Expand a single word part to a flat string, recursing through quotes.
/// `in_dq` tracks whether we're nested inside a double-quoted context
/// (disables tilde expansion, word splitting is handled by the caller).
fn expand_part(
    state: &mut InterpreterState,
    part: &WordPart,
    in_dq: bool,
    cmd_subst: &mut CommandSubstFn,
) -> String {
    match part {
        WordPart::Literal(lit) => lit.value.clone(),
        WordPart::SingleQuoted(s) => s.value.clone(),
        WordPart::Escaped(e) => e.value.clone(),
        WordPart::DoubleQuoted(dq) => {
            dq.parts
                .iter()
                .map(|p| expand_part(state, p, true, cmd_subst))
                .collect()
        }
        WordPart::TildeExpansion(tilde) => {
            if in_dq {
                return match &tilde.user {
                    Some(u) => format!("~{}", u),
                    None => "~".to_string(),
                };
            }
            let tilde_str = match &tilde.user {
                Some(u) => format!("~{}", u),
                None => "~".to_string(),
            };
            apply_tilde_expansion(state, &tilde_str)
        }
        WordPart::ParameterExpansion(pe) => {
            let values = expand_parameter(state, pe, in_dq, cmd_subst);
            let ifs_sep = get_ifs(&state.env).chars().next().map(|c| c.to_string()).unwrap_or_default();
            values.join(&ifs_sep)
        }
        WordPart::CommandSubstitution(cs) => {
            // `$(< file)` is recognized and short-circuited by the caller's
            // cmd_subst callback (see get_file_read_shorthand); from here
            // it's just another script body to run.
            let result = cmd_subst(state, &cs.body);
            let mut out = result.stdout;
            while out.ends_with('\n') {
                out.pop();
            }
            out
        }
        WordPart::ArithmeticExpansion(arith) => {
            use crate::interpreter::arithmetic::evaluate_arithmetic;
            use crate::interpreter::types::{ExecutionLimits, InterpreterContext};
            let limits = ExecutionLimits::default();
            let mut ctx = InterpreterContext::new(state, &limits);
            match evaluate_arithmetic(&mut ctx, &arith.expression.expression, true, None) {
                Ok(value) => value.to_string(),
                Err(_) => "0".to_string(),
            }
        }
        WordPart::Glob(glob) => glob.pattern.clone(),
        WordPart::BraceExpansion(_) => {
            // Handled by the brace pre-pass in expand_word/expand_word_with_glob;
            // reaching here means a brace survived unexpanded (e.g. malformed).
            String::new()
        }
        WordPart::ProcessSubstitution(_) => {
            // Process substitution has no real subprocess in this sandboxed
            // shell; treat as unsupported and expand to empty.
            String::new()
        }
    }
}

/// Dispatch a `${param[operation]}` expansion, returning one or more
/// result words. Most operations produce exactly one; `@`/array/positional
/// expansions without an enclosing prefix/suffix can produce many.
fn expand_parameter(
    state: &mut InterpreterState,
    pe: &ParameterExpansionPart,
    in_dq: bool,
    cmd_subst: &mut CommandSubstFn,
) -> Vec<String> {
    let param = pe.parameter.as_str();
    let array_re = Regex::new(r"^([a-zA-Z_][a-zA-Z0-9_]*)\[([@*])\]$").unwrap();
    let array_match = array_re.captures(param).map(|c| {
        (c.get(1).unwrap().as_str().to_string(), c.get(2).unwrap().as_str() == "*")
    });
    let is_positional_all = param == "@" || param == "*";
    let is_star = param == "*" || array_match.as_ref().map(|(_, s)| *s).unwrap_or(false);

    match &pe.operation {
        None => {
            if let Some((ref name, star)) = array_match {
                if in_dq {
                    return apply_prefix_suffix_to_array(state, name, star, "", "").values;
                }
                return expand_unquoted_array(state, name, star).values;
            }
            if is_positional_all {
                if in_dq {
                    let params = get_positional_params(state);
                    if is_star {
                        let ifs_sep = get_ifs(&state.env).chars().next().map(|c| c.to_string()).unwrap_or_default();
                        return vec![params.join(&ifs_sep)];
                    }
                    return params;
                }
                return expand_unquoted_positional(state, is_star).values;
            }
            vec![get_variable(state, param)]
        }
        Some(ParameterOperation::Indirection(ind)) => {
            if let Some(result) = expand_indirect_array(state, param) {
                return result.values;
            }
            // Scalar indirection: resolve the referenced variable name and
            // optionally apply the inner operation to its value.
            let ref_value = get_variable(state, param);
            if ref_value.is_empty() {
                return vec![String::new()];
            }
            match ind.inner_op.as_deref() {
                None => vec![get_variable(state, &ref_value)],
                Some(inner) => vec![apply_inner_op_scalar(state, &ref_value, inner, cmd_subst)],
            }
        }
        Some(ParameterOperation::ArrayKeys(op)) => {
            if in_dq {
                return get_array_keys(state, &op.array, op.star);
            }
            expand_unquoted_array_keys(state, &op.array, op.star).values
        }
        Some(ParameterOperation::VarNamePrefix(op)) => {
            if in_dq {
                return get_var_names_with_prefix_op(state, &op.prefix, op.star);
            }
            expand_unquoted_var_name_prefix(state, &op.prefix, op.star).values
        }
        Some(ParameterOperation::Inner(inner)) => {
            if let Some((ref name, star)) = array_match {
                return expand_array_inner_op(state, name, star, inner, cmd_subst);
            }
            if is_positional_all {
                return expand_positional_inner_op(state, is_star, inner, cmd_subst);
            }
            vec![apply_inner_op_scalar(state, param, inner, cmd_subst)]
        }
    }
}

/// Apply an `InnerParameterOperation` to a single scalar parameter.
fn apply_inner_op_scalar(
    state: &mut InterpreterState,
    param: &str,
    inner: &InnerParameterOperation,
    cmd_subst: &mut CommandSubstFn,
) -> String {
    let ctx = ParameterOpContext::new(state, param, true);
    match inner {
        InnerParameterOperation::DefaultValue(op) => {
            if should_use_default(&ctx, op.check_empty) {
                flatten_word(state, &op.word, cmd_subst)
            } else {
                ctx.value
            }
        }
        InnerParameterOperation::AssignDefault(op) => {
            if should_use_default(&ctx, op.check_empty) {
                let new_value = flatten_word(state, &op.word, cmd_subst);
                state.env.insert(param.to_string(), new_value.clone());
                new_value
            } else {
                ctx.value
            }
        }
        InnerParameterOperation::ErrorIfUnset(op) => {
            if should_use_default(&ctx, op.check_empty) {
                let msg = op
                    .word
                    .as_ref()
                    .map(|w| flatten_word(state, w, cmd_subst))
                    .unwrap_or_else(|| "parameter null or not set".to_string());
                state.last_exit_code = 1;
                format!("__ERROR_IF_UNSET__:{}", msg)
            } else {
                ctx.value
            }
        }
        InnerParameterOperation::UseAlternative(op) => {
            if should_use_alternative(&ctx, op.check_empty) {
                flatten_word(state, &op.word, cmd_subst)
            } else {
                String::new()
            }
        }
        InnerParameterOperation::Length => get_parameter_length(state, param).to_string(),
        InnerParameterOperation::LengthSliceError => String::new(),
        InnerParameterOperation::BadSubstitution => String::new(),
        InnerParameterOperation::Substring(op) => {
            let offset = eval_arith_i64(state, &op.offset);
            let length = op.length.as_ref().map(|l| eval_arith_i64(state, l));
            apply_substring_op(&ctx.value, offset, length).unwrap_or_default()
        }
        InnerParameterOperation::PatternRemoval(op) => {
            let pattern = flatten_pattern_word(state, &op.pattern, cmd_subst);
            let side = ast_removal_side(op.side);
            let greedy = op.greedy;
            let regex_str = pattern_to_regex(&pattern, greedy, state.options.extglob);
            apply_pattern_removal_op(&ctx.value, &regex_str, side, greedy)
        }
        InnerParameterOperation::PatternReplacement(op) => {
            let pattern = flatten_pattern_word(state, &op.pattern, cmd_subst);
            let replacement = op
                .replacement
                .as_ref()
                .map(|w| flatten_word(state, w, cmd_subst))
                .unwrap_or_default();
            let regex_str = pattern_to_regex(&pattern, op.all, state.options.extglob);
            let anchor_start = matches!(op.anchor, Some(PatternAnchor::Start));
            let anchor_end = matches!(op.anchor, Some(PatternAnchor::End));
            apply_pattern_replacement_op(&ctx.value, &regex_str, &replacement, op.all, anchor_start, anchor_end)
        }
        InnerParameterOperation::CaseModification(op) => {
            let upper = matches!(op.direction, CaseDirection::Upper);
            let operator = match (upper, op.all) {
                (true, true) => "U",
                (true, false) => "u",
                (false, true) => "L",
                (false, false) => "l",
            };
            apply_case_modification(&ctx.value, operator)
        }
        InnerParameterOperation::Transform(op) => {
            let operator = transform_operator_str(op.operator);
            apply_transform_op(state, param, &ctx.value, operator)
        }
    }
}

fn transform_operator_str(op: TransformOperator) -> &'static str {
    match op {
        TransformOperator::Q => "Q",
        TransformOperator::P => "P",
        TransformOperator::A => "a",
        TransformOperator::LowerA => "a",
        TransformOperator::E => "E",
        TransformOperator::K => "K",
        TransformOperator::LowerK => "k",
        TransformOperator::LowerU => "u",
        TransformOperator::U => "U",
        TransformOperator::L => "L",
    }
}

fn eval_arith_i64(state: &mut InterpreterState, expr: &crate::ast::types::ArithmeticExpressionNode) -> i64 {
    use crate::interpreter::arithmetic::evaluate_arithmetic;
    use crate::interpreter::types::{ExecutionLimits, InterpreterContext};
    let limits = ExecutionLimits::default();
    let mut ctx = InterpreterContext::new(state, &limits);
    evaluate_arithmetic(&mut ctx, &expr.expression, true, None).unwrap_or(0)
}

/// Apply an inner operation across an `arr[@]`/`arr[*]` expansion (no
/// adjacent literal text; that case is special-cased earlier for the whole
/// double-quoted word in `expand_word_with_glob`).
fn expand_array_inner_op(
    state: &mut InterpreterState,
    name: &str,
    is_star: bool,
    inner: &InnerParameterOperation,
    cmd_subst: &mut CommandSubstFn,
) -> Vec<String> {
    match inner {
        InnerParameterOperation::PatternRemoval(op) => {
            let pattern = flatten_pattern_word(state, &op.pattern, cmd_subst);
            let regex_str = pattern_to_regex(&pattern, op.greedy, state.options.extglob);
            apply_array_pattern_removal(state, name, is_star, &regex_str, ast_removal_side(op.side), op.greedy).values
        }
        InnerParameterOperation::PatternReplacement(op) => {
            let pattern = flatten_pattern_word(state, &op.pattern, cmd_subst);
            let replacement = op.replacement.as_ref().map(|w| flatten_word(state, w, cmd_subst)).unwrap_or_default();
            let regex_str = pattern_to_regex(&pattern, op.all, state.options.extglob);
            apply_array_pattern_replacement(state, name, is_star, &regex_str, &replacement, op.all).values
        }
        InnerParameterOperation::Substring(op) => {
            let offset = eval_arith_i64(state, &op.offset);
            let length = op.length.as_ref().map(|l| eval_arith_i64(state, l));
            apply_array_slicing(state, name, is_star, offset, length).unwrap_or_default()
        }
        InnerParameterOperation::CaseModification(op) => {
            let upper = matches!(op.direction, CaseDirection::Upper);
            let operator = match (upper, op.all) {
                (true, true) => "U",
                (true, false) => "u",
                (false, true) => "L",
                (false, false) => "l",
            };
            apply_array_transform(state, name, is_star, operator)
        }
        InnerParameterOperation::Length => {
            vec![get_array_elements(state, name).len().to_string()]
        }
        InnerParameterOperation::DefaultValue(op) => {
            let elements = get_array_elements(state, name);
            if elements.is_empty() && !is_variable_set(state, name) {
                vec![flatten_word(state, &op.word, cmd_subst)]
            } else {
                elements.into_iter().map(|(_, v)| v).collect()
            }
        }
        _ => apply_prefix_suffix_to_array(state, name, is_star, "", "").values,
    }
}

/// Apply an inner operation across `$@`/`$*` (no adjacent literal text).
fn expand_positional_inner_op(
    state: &mut InterpreterState,
    is_star: bool,
    inner: &InnerParameterOperation,
    cmd_subst: &mut CommandSubstFn,
) -> Vec<String> {
    match inner {
        InnerParameterOperation::PatternRemoval(op) => {
            let pattern = flatten_pattern_word(state, &op.pattern, cmd_subst);
            let regex_str = pattern_to_regex(&pattern, op.greedy, state.options.extglob);
            apply_positional_pattern_removal(state, is_star, "", "", &regex_str, ast_removal_side(op.side), op.greedy).values
        }
        InnerParameterOperation::PatternReplacement(op) => {
            let pattern = flatten_pattern_word(state, &op.pattern, cmd_subst);
            let replacement = op.replacement.as_ref().map(|w| flatten_word(state, w, cmd_subst)).unwrap_or_default();
            let regex_str = pattern_to_regex(&pattern, op.all, state.options.extglob);
            let anchor_start = matches!(op.anchor, Some(PatternAnchor::Start));
            let anchor_end = matches!(op.anchor, Some(PatternAnchor::End));
            apply_positional_pattern_replacement(state, is_star, "", "", &regex_str, &replacement, op.all, anchor_start, anchor_end).values
        }
        InnerParameterOperation::Substring(op) => {
            let offset = eval_arith_i64(state, &op.offset);
            let length = op.length.as_ref().map(|l| eval_arith_i64(state, l));
            apply_positional_slicing(state, is_star, "", "", offset, length).values
        }
        InnerParameterOperation::Length => vec![get_positional_params(state).len().to_string()],
        _ => get_positional_params(state),
    }
}

/// Expand brace-expansion groups across a whole word's parts, producing the
/// cross product of alternatives. A word with no `BraceExpansion` part
/// yields a single alternative (the original parts, cloned).
fn brace_alternatives(parts: &[WordPart]) -> Vec<Vec<WordPart>> {
    if let Some(idx) = parts.iter().position(|p| matches!(p, WordPart::BraceExpansion(_))) {
        let prefix = &parts[..idx];
        let suffix_alts = brace_alternatives(&parts[idx + 1..]);
        let brace = match &parts[idx] {
            WordPart::BraceExpansion(b) => b,
            _ => unreachable!(),
        };

        let mut item_alts: Vec<Vec<WordPart>> = Vec::new();
        for item in &brace.items {
            match item {
                BraceItem::Word { word } => {
                    item_alts.extend(brace_alternatives(&word.parts));
                }
                BraceItem::Range { start, end, step, start_str, end_str } => {
                    let rv_start = match start {
                        BraceRangeValue::Number(n) => RangeValue::Numeric(*n),
                        BraceRangeValue::Char(c) => RangeValue::Char(*c),
                    };
                    let rv_end = match end {
                        BraceRangeValue::Number(n) => RangeValue::Numeric(*n),
                        BraceRangeValue::Char(c) => RangeValue::Char(*c),
                    };
                    match expand_brace_range(rv_start, rv_end, *step, start_str.as_deref(), end_str.as_deref()) {
                        Ok(res) => {
                            if let Some(values) = res.expanded {
                                for v in values {
                                    item_alts.push(vec![WordPart::Literal(LiteralPart { value: v })]);
                                }
                            } else {
                                item_alts.push(vec![WordPart::Literal(LiteralPart { value: res.literal })]);
                            }
                        }
                        Err(_) => {}
                    }
                }
            }
        }
        if item_alts.is_empty() {
            return vec![parts.to_vec()];
        }

        let mut out = Vec::with_capacity(item_alts.len() * suffix_alts.len());
        for item_alt in &item_alts {
            for suf in &suffix_alts {
                let mut combined: Vec<WordPart> = prefix.to_vec();
                combined.extend(item_alt.clone());
                combined.extend(suf.clone());
                out.push(combined);
            }
        }
        out
    } else {
        vec![parts.to_vec()]
    }
}

/// Whether the whole word is a single double-quoted `"${arr[@]}"`/`"$@"`
/// (optionally with surrounding literal prefix/suffix text) shape, which
/// needs to expand to multiple *quoted* result words rather than one
/// flattened string.
fn try_expand_quoted_multi(
    state: &mut InterpreterState,
    parts: &[WordPart],
    cmd_subst: &mut CommandSubstFn,
) -> Option<Vec<String>> {
    if parts.len() != 1 {
        return None;
    }
    let dq = match &parts[0] {
        WordPart::DoubleQuoted(dq) => dq,
        _ => return None,
    };
    let array_re = Regex::new(r"^([a-zA-Z_][a-zA-Z0-9_]*)\[([@*])\]$").unwrap();
    let idx = dq.parts.iter().position(|p| match p {
        WordPart::ParameterExpansion(pe) => {
            pe.parameter == "@" || pe.parameter == "*" || array_re.is_match(&pe.parameter)
        }
        _ => false,
    })?;
    let pe = match &dq.parts[idx] {
        WordPart::ParameterExpansion(pe) => pe,
        _ => return None,
    };
    let prefix: String = dq.parts[..idx].iter().map(|p| expand_part(state, p, true, cmd_subst)).collect();
    let suffix: String = dq.parts[idx + 1..].iter().map(|p| expand_part(state, p, true, cmd_subst)).collect();

    let array_match = array_re.captures(&pe.parameter).map(|c| {
        (c.get(1).unwrap().as_str().to_string(), c.get(2).unwrap().as_str() == "*")
    });
    let is_positional = pe.parameter == "@" || pe.parameter == "*";
    let is_star = pe.parameter == "*" || array_match.as_ref().map(|(_, s)| *s).unwrap_or(false);

    match (&array_match, is_positional, &pe.operation) {
        (Some((name, _)), _, None) => {
            Some(apply_prefix_suffix_to_array(state, name, is_star, &prefix, &suffix).values)
        }
        (Some((name, _)), _, Some(ParameterOperation::Inner(InnerParameterOperation::PatternRemoval(op)))) => {
            let pattern = flatten_pattern_word(state, &op.pattern, cmd_subst);
            let regex_str = pattern_to_regex(&pattern, op.greedy, state.options.extglob);
            Some(apply_pattern_removal_with_prefix_suffix(state, name, is_star, &prefix, &suffix, &regex_str, ast_removal_side(op.side), op.greedy).values)
        }
        (Some((name, _)), _, Some(ParameterOperation::Inner(InnerParameterOperation::PatternReplacement(op)))) => {
            let pattern = flatten_pattern_word(state, &op.pattern, cmd_subst);
            let replacement = op.replacement.as_ref().map(|w| flatten_word(state, w, cmd_subst)).unwrap_or_default();
            let regex_str = pattern_to_regex(&pattern, op.all, state.options.extglob);
            Some(apply_pattern_replacement_with_prefix_suffix(state, name, is_star, &prefix, &suffix, &regex_str, &replacement, op.all).values)
        }
        (None, true, None) => {
            let params = get_positional_params(state);
            if params.is_empty() {
                let combined = format!("{}{}", prefix, suffix);
                return Some(if combined.is_empty() { vec![] } else { vec![combined] });
            }
            if is_star {
                let ifs_sep = get_ifs(&state.env).chars().next().map(|c| c.to_string()).unwrap_or_default();
                return Some(vec![format!("{}{}{}", prefix, params.join(&ifs_sep), suffix)]);
            }
            let mut result = Vec::with_capacity(params.len());
            if params.len() == 1 {
                result.push(format!("{}{}{}", prefix, params[0], suffix));
            } else {
                result.push(format!("{}{}", prefix, params[0]));
                result.extend(params[1..params.len() - 1].iter().cloned());
                result.push(format!("{}{}", params[params.len() - 1], suffix));
            }
            Some(result)
        }
        (None, true, Some(ParameterOperation::Inner(InnerParameterOperation::PatternRemoval(op)))) => {
            let pattern = flatten_pattern_word(state, &op.pattern, cmd_subst);
            let regex_str = pattern_to_regex(&pattern, op.greedy, state.options.extglob);
            Some(apply_positional_pattern_removal(state, is_star, &prefix, &suffix, &regex_str, ast_removal_side(op.side), op.greedy).values)
        }
        (None, true, Some(ParameterOperation::Inner(InnerParameterOperation::PatternReplacement(op)))) => {
            let pattern = flatten_pattern_word(state, &op.pattern, cmd_subst);
            let replacement = op.replacement.as_ref().map(|w| flatten_word(state, w, cmd_subst)).unwrap_or_default();
            let regex_str = pattern_to_regex(&pattern, op.all, state.options.extglob);
            let anchor_start = matches!(op.anchor, Some(PatternAnchor::Start));
            let anchor_end = matches!(op.anchor, Some(PatternAnchor::End));
            Some(apply_positional_pattern_replacement(state, is_star, &prefix, &suffix, &regex_str, &replacement, op.all, anchor_start, anchor_end).values)
        }
        _ => None,
    }
}

/// Expand a word to a single flat string: no field splitting, no glob
/// expansion. Used for assignment right-hand sides, redirection targets,
/// `case` subjects, and anywhere else bash performs quote removal but not
/// splitting.
pub fn expand_word(state: &mut InterpreterState, word: &WordNode, cmd_subst: &mut CommandSubstFn) -> WordExpansionResult {
    let alts = brace_alternatives(&word.parts);
    let mut pieces = Vec::with_capacity(alts.len());
    for alt in &alts {
        if let Some(values) = try_expand_quoted_multi(state, alt, cmd_subst) {
            pieces.push(values.join(""));
            continue;
        }
        let flat: String = alt.iter().map(|p| expand_part(state, p, false, cmd_subst)).collect();
        pieces.push(flat);
    }
    WordExpansionResult::simple(pieces.join(" "))
}

/// Full word expansion: brace expansion, parameter/command/arithmetic
/// expansion, field splitting on IFS, and glob-candidate detection. The
/// caller is responsible for actually invoking the filesystem glob (this
/// module has no filesystem handle); `split_words` gives the post-split
/// fields and `glob_candidates` marks, in parallel, which of those fields
/// are unquoted and contain glob metacharacters.
pub struct GlobAwareExpansion {
    pub split_words: Vec<String>,
    pub glob_candidates: Vec<bool>,
}

pub fn expand_word_with_glob(
    state: &mut InterpreterState,
    word: &WordNode,
    cmd_subst: &mut CommandSubstFn,
) -> GlobAwareExpansion {
    let alts = brace_alternatives(&word.parts);
    let mut split_words = Vec::new();
    let mut glob_candidates = Vec::new();
    let extglob = state.options.extglob;
    let ifs = get_ifs(&state.env).to_string();

    for alt in &alts {
        if let Some(values) = try_expand_quoted_multi(state, alt, cmd_subst) {
            for v in values {
                split_words.push(v);
                glob_candidates.push(false);
            }
            continue;
        }

        let is_glob_word = alt.len() == 1
            && matches!(alt[0], WordPart::Glob(_))
            && !alt.iter().any(|p| matches!(p, WordPart::DoubleQuoted(_) | WordPart::SingleQuoted(_)));

        let mut segments = Vec::with_capacity(alt.len());
        for part in alt {
            let value = expand_part(state, part, false, cmd_subst);
            let splittable = is_part_splittable(part);
            let quoted = matches!(part, WordPart::SingleQuoted(_) | WordPart::DoubleQuoted(_) | WordPart::Escaped(_));
            segments.push(WordSplitSegment { value, is_splittable: splittable, is_quoted: quoted });
        }

        let split = smart_word_split(&segments, &ifs);
        let n = split.words.len();
        for (i, w) in split.words.into_iter().enumerate() {
            let is_glob = is_glob_word && n == 1 && has_glob_pattern(&w, extglob);
            split_words.push(w);
            glob_candidates.push(is_glob && i == 0);
        }
    }

    GlobAwareExpansion { split_words, glob_candidates }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_literal_word(s: &str) -> WordNode {
        WordNode {
            parts: vec![WordPart::Literal(LiteralPart {
                value: s.to_string(),
            })],
        }
    }

    fn make_var_word(name: &str) -> WordNode {
        WordNode {
            parts: vec![WordPart::ParameterExpansion(ParameterExpansionPart {
                parameter: name.to_string(),
                operation: None,
            })],
        }
    }

    #[test]
    fn test_expand_word_literal() {
        let state = InterpreterState::default();
        let word = make_literal_word("hello");
        let options = WordExpansionOptions::default();
        let result = expand_word_no_glob(&state, &word, &options);
        assert_eq!(result.value, "hello");
    }

    #[test]
    fn test_expand_word_variable() {
        let mut state = InterpreterState::default();
        state.env.insert("FOO".to_string(), "bar".to_string());
        let word = make_var_word("FOO");
        let options = WordExpansionOptions::default();
        let result = expand_word_no_glob(&state, &word, &options);
        assert_eq!(result.value, "bar");
    }

    #[test]
    fn test_expand_word_unset_variable() {
        let state = InterpreterState::default();
        let word = make_var_word("UNSET");
        let options = WordExpansionOptions::default();
        let result = expand_word_no_glob(&state, &word, &options);
        assert_eq!(result.value, "");
    }

    #[test]
    fn test_is_word_fully_quoted_empty() {
        let word = WordNode { parts: vec![] };
        assert!(is_word_fully_quoted(&word));
    }

    #[test]
    fn test_is_word_fully_quoted_single_quoted() {
        let word = WordNode {
            parts: vec![WordPart::SingleQuoted(SingleQuotedPart {
                value: "hello".to_string(),
            })],
        };
        assert!(is_word_fully_quoted(&word));
    }

    #[test]
    fn test_is_word_fully_quoted_literal() {
        let word = make_literal_word("hello");
        assert!(!is_word_fully_quoted(&word));
    }

    #[test]
    fn test_word_has_glob_pattern() {
        let word = WordNode {
            parts: vec![WordPart::Glob(GlobPart {
                pattern: "*.txt".to_string(),
            })],
        };
        assert!(word_has_glob_pattern(&word, false));

        let word = make_literal_word("hello");
        assert!(!word_has_glob_pattern(&word, false));
    }

    #[test]
    fn test_word_has_command_substitution() {
        let word = WordNode {
            parts: vec![WordPart::CommandSubstitution(CommandSubstitutionPart {
                body: ScriptNode { statements: vec![] },
                legacy: false,
            })],
        };
        assert!(word_has_command_substitution(&word));

        let word = make_literal_word("hello");
        assert!(!word_has_command_substitution(&word));
    }
}
