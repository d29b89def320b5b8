//! `[[ ... ]]` conditional expression evaluator.
//!
//! Walks the `ConditionalExpressionNode` tree produced by the parser and
//! evaluates it against the live interpreter state, reusing the same
//! pattern-matching, numeric coercion and file-test building blocks that
//! `conditionals.rs` and `helpers::*` already provide for `test`/`[`.

use crate::ast::types::{
    CondBinaryNode, CondBinaryOperator, CondUnaryNode, CondUnaryOperator, ConditionalExpressionNode,
    WordNode,
};
use crate::interpreter::conditionals::{evaluate_shell_option, match_pattern, parse_numeric, posix_ere_to_regex};
use crate::interpreter::helpers::file_tests::FileTestOperator;
use crate::interpreter::helpers::nameref::is_nameref;
use crate::interpreter::helpers::variable_tests::{evaluate_nameref_test, evaluate_variable_test};
use crate::interpreter::interpreter::{FileSystem as SyncFileSystem, FileStat};
use crate::interpreter::types::InterpreterState;
use crate::interpreter::word_expansion::{expand_word, CommandSubstFn};

/// Truth value of an evaluated `[[ ]]` expression, plus any stdout produced
/// by command substitutions inside its operand words.
pub struct CondEvalResult {
    pub value: bool,
    pub stdout: String,
}

fn expand_operand(
    state: &mut InterpreterState,
    word: &WordNode,
    cmd_subst: &mut CommandSubstFn,
    _stdout: &mut String,
) -> String {
    expand_word(state, word, cmd_subst).value
}

fn stat(fs: &dyn SyncFileSystem, path: &str) -> Option<FileStat> {
    fs.stat(path).ok()
}

fn evaluate_unary(
    state: &mut InterpreterState,
    node: &CondUnaryNode,
    fs: &dyn SyncFileSystem,
    cmd_subst: &mut CommandSubstFn,
    stdout: &mut String,
) -> bool {
    use CondUnaryOperator::*;

    // -v and -R inspect the variable table directly rather than an expanded value.
    if matches!(node.operator, V) {
        let name = expand_operand(state, &node.operand, cmd_subst, stdout);
        let env = state.env.clone();
        return evaluate_variable_test(state, &env, &name, Some(state.current_line as i32)).0;
    }
    if matches!(node.operator, UpperR) {
        let name = expand_operand(state, &node.operand, cmd_subst, stdout);
        return evaluate_nameref_test(state, &name);
    }
    if matches!(node.operator, LowerO) {
        let opt = expand_operand(state, &node.operand, cmd_subst, stdout);
        return evaluate_shell_option(state, &opt);
    }

    let operand = expand_operand(state, &node.operand, cmd_subst, stdout);

    match node.operator {
        Z => operand.is_empty(),
        LowerN => !operand.is_empty(),
        T => operand.parse::<i32>().map(|_| false).unwrap_or(false),
        _ => {
            let op = match node.operator {
                A => FileTestOperator::ExistsDeprecated,
                B => FileTestOperator::BlockSpecial,
                C => FileTestOperator::CharSpecial,
                D => FileTestOperator::Directory,
                E => FileTestOperator::Exists,
                F => FileTestOperator::RegularFile,
                G => FileTestOperator::SetGid,
                H => FileTestOperator::SymbolicLinkH,
                K => FileTestOperator::StickyBit,
                P => FileTestOperator::NamedPipe,
                R => FileTestOperator::Readable,
                S => FileTestOperator::NonEmpty,
                U => FileTestOperator::SetUid,
                W => FileTestOperator::Writable,
                X => FileTestOperator::Executable,
                UpperG => FileTestOperator::OwnedByGroup,
                L => FileTestOperator::SymbolicLink,
                N => FileTestOperator::ModifiedSinceRead,
                UpperO => FileTestOperator::OwnedByUser,
                UpperS => FileTestOperator::Socket,
                _ => unreachable!("handled above"),
            };
            evaluate_file_test(fs, op, &operand)
        }
    }
}

fn evaluate_file_test(fs: &dyn SyncFileSystem, op: FileTestOperator, path: &str) -> bool {
    match op {
        FileTestOperator::Exists | FileTestOperator::ExistsDeprecated => fs.exists(path),
        FileTestOperator::RegularFile => fs.is_file(path),
        FileTestOperator::Directory => fs.is_dir(path),
        FileTestOperator::NonEmpty => stat(fs, path).map(|s| s.size > 0).unwrap_or(false),
        FileTestOperator::SymbolicLink | FileTestOperator::SymbolicLinkH => {
            stat(fs, path).map(|s| s.is_symlink).unwrap_or(false)
        }
        FileTestOperator::Readable => fs.exists(path),
        FileTestOperator::Writable => fs.exists(path),
        FileTestOperator::Executable => {
            stat(fs, path).map(|s| (s.mode & 0o111) != 0).unwrap_or(false)
        }
        FileTestOperator::StickyBit => stat(fs, path).map(|s| (s.mode & 0o1000) != 0).unwrap_or(false),
        FileTestOperator::SetGid => stat(fs, path).map(|s| (s.mode & 0o2000) != 0).unwrap_or(false),
        FileTestOperator::SetUid => stat(fs, path).map(|s| (s.mode & 0o4000) != 0).unwrap_or(false),
        FileTestOperator::OwnedByGroup | FileTestOperator::OwnedByUser => fs.exists(path),
        FileTestOperator::BlockSpecial | FileTestOperator::CharSpecial | FileTestOperator::Socket => false,
        FileTestOperator::NamedPipe => false,
        FileTestOperator::Terminal => false,
        FileTestOperator::ModifiedSinceRead => false,
    }
}

fn evaluate_binary(
    state: &mut InterpreterState,
    node: &CondBinaryNode,
    fs: &dyn SyncFileSystem,
    cmd_subst: &mut CommandSubstFn,
    stdout: &mut String,
) -> bool {
    let left = expand_operand(state, &node.left, cmd_subst, stdout);
    let right = expand_operand(state, &node.right, cmd_subst, stdout);

    match node.operator {
        CondBinaryOperator::Eq | CondBinaryOperator::EqEq => {
            match_pattern(&left, &right, state.options.nocasematch, state.options.extglob)
        }
        CondBinaryOperator::Ne => {
            !match_pattern(&left, &right, state.options.nocasematch, state.options.extglob)
        }
        CondBinaryOperator::Match => {
            let re_src = posix_ere_to_regex(&right);
            match regex_lite::Regex::new(&re_src) {
                Ok(re) => re.is_match(&left),
                Err(_) => false,
            }
        }
        CondBinaryOperator::Lt => left < right,
        CondBinaryOperator::Gt => left > right,
        CondBinaryOperator::NumEq => parse_numeric(&left) == parse_numeric(&right),
        CondBinaryOperator::NumNe => parse_numeric(&left) != parse_numeric(&right),
        CondBinaryOperator::NumLt => parse_numeric(&left) < parse_numeric(&right),
        CondBinaryOperator::NumLe => parse_numeric(&left) <= parse_numeric(&right),
        CondBinaryOperator::NumGt => parse_numeric(&left) > parse_numeric(&right),
        CondBinaryOperator::NumGe => parse_numeric(&left) >= parse_numeric(&right),
        CondBinaryOperator::Nt => {
            let lm = stat(fs, &left).map(|s| s.mtime).unwrap_or(0);
            let rm = stat(fs, &right).map(|s| s.mtime).unwrap_or(0);
            fs.exists(&left) && (!fs.exists(&right) || lm > rm)
        }
        CondBinaryOperator::Ot => {
            let lm = stat(fs, &left).map(|s| s.mtime).unwrap_or(0);
            let rm = stat(fs, &right).map(|s| s.mtime).unwrap_or(0);
            fs.exists(&right) && (!fs.exists(&left) || lm < rm)
        }
        CondBinaryOperator::Ef => {
            fs.exists(&left) && fs.exists(&right) && fs.resolve_path("", &left) == fs.resolve_path("", &right)
        }
    }
}

/// Evaluate a full `[[ ]]` expression tree.
pub fn evaluate_conditional_expression(
    state: &mut InterpreterState,
    expr: &ConditionalExpressionNode,
    fs: &dyn SyncFileSystem,
    cmd_subst: &mut CommandSubstFn,
) -> CondEvalResult {
    let mut stdout = String::new();
    let value = eval_inner(state, expr, fs, cmd_subst, &mut stdout);
    CondEvalResult { value, stdout }
}

fn eval_inner(
    state: &mut InterpreterState,
    expr: &ConditionalExpressionNode,
    fs: &dyn SyncFileSystem,
    cmd_subst: &mut CommandSubstFn,
    stdout: &mut String,
) -> bool {
    match expr {
        ConditionalExpressionNode::Word(w) => {
            let v = expand_operand(state, &w.word, cmd_subst, stdout);
            !v.is_empty()
        }
        ConditionalExpressionNode::Unary(u) => evaluate_unary(state, u, fs, cmd_subst, stdout),
        ConditionalExpressionNode::Binary(b) => evaluate_binary(state, b, fs, cmd_subst, stdout),
        ConditionalExpressionNode::Not(n) => !eval_inner(state, &n.operand, fs, cmd_subst, stdout),
        ConditionalExpressionNode::And(a) => {
            eval_inner(state, &a.left, fs, cmd_subst, stdout)
                && eval_inner(state, &a.right, fs, cmd_subst, stdout)
        }
        ConditionalExpressionNode::Or(o) => {
            eval_inner(state, &o.left, fs, cmd_subst, stdout)
                || eval_inner(state, &o.right, fs, cmd_subst, stdout)
        }
        ConditionalExpressionNode::Group(g) => eval_inner(state, &g.expression, fs, cmd_subst, stdout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{CondWordNode, WordNode, WordPart};

    fn literal_word(s: &str) -> WordNode {
        WordNode { parts: vec![WordPart::Literal(s.to_string())] }
    }

    struct NullFs;
    impl SyncFileSystem for NullFs {
        fn read_file(&self, _: &str) -> Result<String, std::io::Error> { Err(std::io::Error::new(std::io::ErrorKind::NotFound, "")) }
        fn write_file(&self, _: &str, _: &str) -> Result<(), std::io::Error> { Ok(()) }
        fn append_file(&self, _: &str, _: &str) -> Result<(), std::io::Error> { Ok(()) }
        fn exists(&self, _: &str) -> bool { false }
        fn is_dir(&self, _: &str) -> bool { false }
        fn is_file(&self, _: &str) -> bool { false }
        fn resolve_path(&self, _: &str, path: &str) -> String { path.to_string() }
        fn stat(&self, _: &str) -> Result<FileStat, std::io::Error> { Err(std::io::Error::new(std::io::ErrorKind::NotFound, "")) }
        fn read_dir(&self, _: &str) -> Result<Vec<String>, std::io::Error> { Ok(vec![]) }
        fn glob(&self, _: &str, _: &str) -> Result<Vec<String>, std::io::Error> { Ok(vec![]) }
    }

    fn noop_cmd_subst<'a>() -> Box<CommandSubstFn<'a>> {
        Box::new(|_state, _script| crate::interpreter::types::ExecResult::ok())
    }

    #[test]
    fn test_string_equality() {
        let mut state = InterpreterState::default();
        let fs = NullFs;
        let mut cs = noop_cmd_subst();
        let expr = ConditionalExpressionNode::Binary(CondBinaryNode {
            operator: CondBinaryOperator::EqEq,
            left: literal_word("abc"),
            right: literal_word("abc"),
        });
        let result = evaluate_conditional_expression(&mut state, &expr, &fs, &mut *cs);
        assert!(result.value);
    }

    #[test]
    fn test_numeric_comparison() {
        let mut state = InterpreterState::default();
        let fs = NullFs;
        let mut cs = noop_cmd_subst();
        let expr = ConditionalExpressionNode::Binary(CondBinaryNode {
            operator: CondBinaryOperator::NumLt,
            left: literal_word("3"),
            right: literal_word("10"),
        });
        let result = evaluate_conditional_expression(&mut state, &expr, &fs, &mut *cs);
        assert!(result.value);
    }

    #[test]
    fn test_empty_string_unary() {
        let mut state = InterpreterState::default();
        let fs = NullFs;
        let mut cs = noop_cmd_subst();
        let expr = ConditionalExpressionNode::Unary(CondUnaryNode {
            operator: CondUnaryOperator::Z,
            operand: literal_word(""),
        });
        let result = evaluate_conditional_expression(&mut state, &expr, &fs, &mut *cs);
        assert!(result.value);
    }

    #[test]
    fn test_word_truthiness() {
        let mut state = InterpreterState::default();
        let fs = NullFs;
        let mut cs = noop_cmd_subst();
        let expr = ConditionalExpressionNode::Word(CondWordNode { word: literal_word("x") });
        let result = evaluate_conditional_expression(&mut state, &expr, &fs, &mut *cs);
        assert!(result.value);
    }
}
