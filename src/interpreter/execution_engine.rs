//! Execution Engine
//!
//! The core execution engine that ties all interpreter components together.
//! Implements the full AST execution chain:
//!
//! execute_script -> execute_statement -> execute_pipeline -> execute_command

use std::cell::RefCell;
use std::sync::Arc;

use crate::ast::types::{
    CaseTerminator, CommandNode, CompoundCommandNode, PipelineNode, ScriptNode, SimpleCommandNode,
    StatementNode, StatementOperator, WordNode,
};
use crate::commands::registry::CommandRegistry;
use crate::commands::types::CommandContext;
use crate::fs::FileSystem as AsyncFileSystem;
use crate::interpreter::arithmetic::evaluate_arithmetic;
use crate::interpreter::builtins::{
    declare_cmd::{handle_declare, handle_readonly},
    export_cmd::handle_export,
    read_cmd::handle_read,
    BuiltinResult,
};
use crate::interpreter::builtins::cd_cmd::handle_cd;
use crate::interpreter::builtins::local_cmd::handle_local;
use crate::interpreter::builtins::unset_cmd::handle_unset;
use crate::interpreter::builtins::break_cmd::handle_break;
use crate::interpreter::builtins::continue_cmd::handle_continue;
use crate::interpreter::builtins::return_cmd::handle_return;
use crate::interpreter::builtins::shift_cmd::handle_shift;
use crate::interpreter::builtins::set_cmd::handle_set;
use crate::interpreter::builtins::getopts_cmd::handle_getopts;
use crate::interpreter::builtins::mapfile_cmd::handle_mapfile;
use crate::interpreter::builtins::shopt_cmd::handle_shopt;
use crate::interpreter::builtins::hash_cmd::handle_hash;
use crate::interpreter::builtins::dirs_cmd::{handle_dirs, handle_popd, handle_pushd};
use crate::interpreter::builtins::let_cmd::handle_let;
use crate::interpreter::builtins::help_cmd::handle_help;
use crate::interpreter::builtins::trap_cmd::handle_trap;
use crate::interpreter::conditional_eval::evaluate_conditional_expression;
use crate::interpreter::conditionals::match_pattern;
use crate::interpreter::errors::{ControlFlowError, ErrexitError, ExitError, InterpreterError};
use crate::interpreter::functions::{call_function, get_function, is_function_defined};
use crate::interpreter::helpers::loop_helpers::{handle_loop_error, LoopAction};
use crate::interpreter::interpreter::{
    build_exported_env, check_command_limit, should_trigger_errexit, update_exit_code,
    FileSystem as SyncFileSystem,
};
use crate::interpreter::pipeline_execution::{format_timing_output, set_pipestatus, PipelineState};
use crate::interpreter::redirections::apply_redirections;
use crate::interpreter::subshell_group::{execute_group, execute_subshell};
use crate::interpreter::type_command::{handle_command_v, handle_type, TypeCommandContext};
use crate::interpreter::types::{ExecResult, ExecutionLimits, InterpreterContext, InterpreterState};
use crate::interpreter::word_expansion::{expand_word, expand_word_with_glob, CommandSubstFn, GlobAwareExpansion};

/// The execution engine that ties all interpreter components together.
pub struct ExecutionEngine<'a> {
    /// Execution limits (max commands, recursion depth, iterations)
    pub limits: &'a ExecutionLimits,
    /// Sync filesystem interface, used directly by the evaluator (tests, cd, redirections)
    pub fs: &'a dyn SyncFileSystem,
    /// Registry of reimplemented utilities, dispatched for anything that isn't a shell builtin
    pub registry: &'a CommandRegistry,
    /// Async filesystem backing the registry commands
    pub async_fs: Arc<dyn AsyncFileSystem>,
    /// Tokio handle used to bridge the sync evaluator into async `Command::execute`
    pub handle: tokio::runtime::Handle,
}

impl<'a> ExecutionEngine<'a> {
    /// Create a new execution engine.
    pub fn new(
        limits: &'a ExecutionLimits,
        fs: &'a dyn SyncFileSystem,
        registry: &'a CommandRegistry,
        async_fs: Arc<dyn AsyncFileSystem>,
        handle: tokio::runtime::Handle,
    ) -> Self {
        Self { limits, fs, registry, async_fs, handle }
    }

    /// Build a command-substitution callback bound to this engine, for use by
    /// `expand_word`/`expand_word_with_glob`/`evaluate_conditional_expression`.
    fn make_cmd_subst<'b>(&'b self) -> impl FnMut(&mut InterpreterState, &ScriptNode) -> ExecResult + 'b {
        move |state: &mut InterpreterState, script: &ScriptNode| match self.execute_script(state, script) {
            Ok(r) => r,
            Err(InterpreterError::Exit(e)) => ExecResult::new(e.stdout, e.stderr, e.exit_code),
            Err(InterpreterError::Errexit(e)) => ExecResult::new(e.stdout, e.stderr, e.exit_code),
            Err(InterpreterError::Return(e)) => ExecResult::new(e.stdout, e.stderr, e.exit_code),
            Err(InterpreterError::Break(e)) => ExecResult::new(e.stdout, e.stderr, 0),
            Err(InterpreterError::Continue(e)) => ExecResult::new(e.stdout, e.stderr, 0),
            Err(InterpreterError::ExecutionLimit(e)) => ExecResult::new(e.stdout, e.stderr, 126),
            Err(e) => ExecResult::new(String::new(), format!("{}\n", e), 1),
        }
    }

    /// Expand a list of argument words, applying word-splitting and glob expansion.
    fn expand_args(
        &self,
        state: &mut InterpreterState,
        words: &[WordNode],
        cmd_subst: &mut CommandSubstFn,
    ) -> Vec<String> {
        let mut args = Vec::new();
        for word in words {
            let GlobAwareExpansion { split_words, glob_candidates } =
                expand_word_with_glob(state, word, cmd_subst);
            for (w, is_glob) in split_words.into_iter().zip(glob_candidates) {
                if is_glob {
                    match self.fs.glob(&w, &state.cwd) {
                        Ok(matches) if !matches.is_empty() => args.extend(matches),
                        _ => {
                            if !state.shopt_options.nullglob {
                                args.push(w);
                            }
                        }
                    }
                } else {
                    args.push(w);
                }
            }
        }
        args
    }

    /// Dispatch a command that came over the registry (any reimplemented
    /// utility that isn't a shell builtin), bridging the sync evaluator into
    /// the registry's async `Command::execute`.
    fn run_registry_command(
        &self,
        name: &str,
        args: Vec<String>,
        stdin: String,
        state: &InterpreterState,
    ) -> Option<ExecResult> {
        let cmd = self.registry.get(name)?;
        let ctx = CommandContext {
            args,
            stdin,
            cwd: state.cwd.clone(),
            env: build_exported_env(state),
            fs: self.async_fs.clone(),
            exec_fn: None,
            fetch_fn: None,
        };
        let handle = self.handle.clone();
        let result = tokio::task::block_in_place(|| handle.block_on(cmd.execute(ctx)));
        Some(ExecResult::new(result.stdout, result.stderr, result.exit_code))
    }

    /// Run a loop body once, handling break/continue/errors the way bash does.
    /// Returns `Ok(true)` to keep looping, `Ok(false)` to stop (plain break or
    /// an error result already folded into stdout/stderr/exit_code).
    fn run_loop_body(
        &self,
        state: &mut InterpreterState,
        body: &[&StatementNode],
        stdout: &mut String,
        stderr: &mut String,
        exit_code: &mut i32,
    ) -> Result<bool, InterpreterError> {
        state.loop_depth += 1;
        let loop_depth = state.loop_depth;

        let mut outcome: Option<LoopAction> = None;
        let mut pending_err: Option<InterpreterError> = None;

        for stmt in body {
            match self.execute_statement(state, stmt) {
                Ok(res) => {
                    stdout.push_str(&res.stdout);
                    stderr.push_str(&res.stderr);
                    *exit_code = res.exit_code;
                    update_exit_code(state, *exit_code);
                }
                Err(e) => {
                    let taken_stdout = std::mem::take(stdout);
                    let taken_stderr = std::mem::take(stderr);
                    let r = handle_loop_error(e, taken_stdout, taken_stderr, loop_depth);
                    *stdout = r.stdout;
                    *stderr = r.stderr;
                    if let Some(code) = r.exit_code {
                        *exit_code = code;
                    }
                    outcome = Some(r.action);
                    pending_err = r.error;
                    break;
                }
            }
        }

        state.loop_depth -= 1;

        match outcome {
            None => Ok(true),
            Some(LoopAction::Continue) => Ok(true),
            Some(LoopAction::Break) => Ok(false),
            Some(LoopAction::Error) => Ok(false),
            Some(LoopAction::Rethrow) => Err(pending_err.expect("rethrow action always carries an error")),
        }
    }

    /// Execute an if/while/until condition's statement list, with `in_condition`
    /// set so errexit does not trigger on a failing test.
    fn run_condition(
        &self,
        state: &mut InterpreterState,
        condition: &[StatementNode],
    ) -> Result<(String, String, bool), InterpreterError> {
        let prev_in_condition = state.in_condition;
        state.in_condition = true;

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for stmt in condition {
            match self.execute_statement(state, stmt) {
                Ok(res) => {
                    stdout.push_str(&res.stdout);
                    stderr.push_str(&res.stderr);
                    exit_code = res.exit_code;
                    update_exit_code(state, exit_code);
                }
                Err(e) => {
                    state.in_condition = prev_in_condition;
                    return Err(e);
                }
            }
        }

        state.in_condition = prev_in_condition;
        Ok((stdout, stderr, exit_code == 0))
    }

    /// Execute a complete script (list of statements).
    pub fn execute_script(
        &self,
        state: &mut InterpreterState,
        ast: &ScriptNode,
    ) -> Result<ExecResult, InterpreterError> {
        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for statement in &ast.statements {
            match self.execute_statement(state, statement) {
                Ok(result) => {
                    stdout.push_str(&result.stdout);
                    stderr.push_str(&result.stderr);
                    exit_code = result.exit_code;
                    update_exit_code(state, exit_code);
                }
                Err(InterpreterError::Exit(e)) => {
                    // ExitError propagates up to terminate the script
                    let mut err = e;
                    err.prepend_output(&stdout, &stderr);
                    return Err(InterpreterError::Exit(err));
                }
                Err(InterpreterError::ExecutionLimit(e)) => {
                    // ExecutionLimitError must always propagate
                    return Err(InterpreterError::ExecutionLimit(e));
                }
                Err(InterpreterError::Errexit(e)) => {
                    // Errexit terminates the script
                    stdout.push_str(&e.stdout);
                    stderr.push_str(&e.stderr);
                    exit_code = e.exit_code;
                    return Ok(ExecResult::new(stdout, stderr, exit_code));
                }
                Err(InterpreterError::Break(mut e)) => {
                    // Break/continue outside loops - silently continue
                    e.prepend_output(&stdout, &stderr);
                    stdout = e.stdout.clone();
                    stderr = e.stderr.clone();
                    continue;
                }
                Err(InterpreterError::Continue(mut e)) => {
                    e.prepend_output(&stdout, &stderr);
                    stdout = e.stdout.clone();
                    stderr = e.stderr.clone();
                    continue;
                }
                Err(InterpreterError::Return(mut e)) => {
                    // Return outside function - propagate
                    e.prepend_output(&stdout, &stderr);
                    return Err(InterpreterError::Return(e));
                }
                Err(e) => {
                    // Other errors - convert to result
                    stderr.push_str(&format!("{}\n", e));
                    exit_code = 1;
                }
            }
        }

        Ok(ExecResult::new(stdout, stderr, exit_code))
    }

    /// Execute a single statement (list of pipelines with && || operators).
    pub fn execute_statement(
        &self,
        state: &mut InterpreterState,
        stmt: &StatementNode,
    ) -> Result<ExecResult, InterpreterError> {
        // Handle deferred syntax errors
        if let Some(ref err) = stmt.deferred_error {
            return Ok(ExecResult::new(
                String::new(),
                format!("bash: syntax error near unexpected token `{}'\n", err.token),
                2,
            ));
        }

        // noexec mode (set -n): parse but don't execute
        if state.options.noexec {
            return Ok(ExecResult::ok());
        }

        // Reset errexit_safe at start of each statement
        state.errexit_safe = Some(false);

        let mut stdout = String::new();
        let mut stderr = String::new();

        // verbose mode (set -v): print source before execution
        if state.options.verbose {
            if let Some(ref source) = stmt.source_text {
                stderr.push_str(source);
                stderr.push('\n');
            }
        }

        let mut exit_code = 0;
        let mut last_executed_index: i32 = -1;
        let mut last_pipeline_negated = false;

        for (i, pipeline) in stmt.pipelines.iter().enumerate() {
            // Check && / || short-circuit
            if i > 0 {
                let op = &stmt.operators[i - 1];
                match op {
                    StatementOperator::And => {
                        if exit_code != 0 {
                            continue;
                        }
                    }
                    StatementOperator::Or => {
                        if exit_code == 0 {
                            continue;
                        }
                    }
                    StatementOperator::Semi => {
                        // Always execute
                    }
                }
            }

            let result = self.execute_pipeline_node(state, pipeline)?;
            stdout.push_str(&result.stdout);
            stderr.push_str(&result.stderr);
            exit_code = result.exit_code;
            last_executed_index = i as i32;
            last_pipeline_negated = pipeline.negated;

            update_exit_code(state, exit_code);
        }

        // Check errexit
        let was_short_circuited = last_executed_index < (stmt.pipelines.len() as i32 - 1);
        let inner_was_safe = state.errexit_safe.unwrap_or(false);

        if should_trigger_errexit(state, exit_code, was_short_circuited, last_pipeline_negated)
            && !inner_was_safe
        {
            return Err(InterpreterError::Errexit(ErrexitError::new(
                exit_code, stdout, stderr,
            )));
        }

        Ok(ExecResult::new(stdout, stderr, exit_code))
    }

    /// Execute a pipeline (list of commands connected by |).
    pub fn execute_pipeline_node(
        &self,
        state: &mut InterpreterState,
        pipeline: &PipelineNode,
    ) -> Result<ExecResult, InterpreterError> {
        let mut pipe_state = PipelineState::new();
        let pipe_stderr = pipeline.pipe_stderr.clone().unwrap_or_default();
        let n = pipeline.commands.len();

        let start = if pipeline.timed {
            Some(std::time::Instant::now())
        } else {
            None
        };

        for (i, cmd) in pipeline.commands.iter().enumerate() {
            let is_last = i == n - 1;
            let stdin = pipe_state.stdin.clone();
            let result = self.execute_command(state, cmd, &stdin)?;
            let pipe_stderr_here = pipe_stderr.get(i).copied().unwrap_or(false);
            pipe_state.record_result(&result, is_last, pipe_stderr_here);
        }

        set_pipestatus(&mut state.env, &pipe_state.pipestatus);

        let mut exit_code = pipe_state.final_exit_code(state.options.pipefail);
        let mut stdout = pipe_state.last_result.stdout.clone();
        let mut stderr = pipe_state.last_result.stderr.clone();

        if pipeline.negated {
            exit_code = if exit_code == 0 { 1 } else { 0 };
        }

        if let Some(start) = start {
            let elapsed = start.elapsed().as_secs_f64();
            stderr.push_str(&format_timing_output(elapsed, pipeline.time_posix));
        }

        Ok(ExecResult::new(stdout, stderr, exit_code))
    }

    /// Execute a single command.
    pub fn execute_command(
        &self,
        state: &mut InterpreterState,
        cmd: &CommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        // Check command limit
        if let Some(msg) = check_command_limit(state, self.limits) {
            tracing::warn!(limit = "max_command_count", %msg, "execution limit exceeded");
            return Err(InterpreterError::ExecutionLimit(
                crate::interpreter::errors::ExecutionLimitError::simple(
                    msg,
                    crate::interpreter::errors::LimitType::Commands,
                ),
            ));
        }

        match cmd {
            CommandNode::Simple(simple) => self.execute_simple_command(state, simple, stdin),
            CommandNode::Compound(compound) => {
                self.execute_compound_command(state, compound, stdin)
            }
            CommandNode::FunctionDef(func_def) => {
                let current_source = state.current_source.clone();
                crate::interpreter::functions::execute_function_def(state, func_def, current_source.as_deref())
                    .map_err(InterpreterError::Exit)
            }
        }
    }

    /// Execute a simple command (name + args + redirections).
    pub fn execute_simple_command(
        &self,
        state: &mut InterpreterState,
        cmd: &SimpleCommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        // Set line number for $LINENO
        if let Some(line) = cmd.line {
            state.current_line = line as u32;
        }

        let cmd_subst_cell = RefCell::new(self.make_cmd_subst());
        let expand_fn = |state: &mut InterpreterState, word: &WordNode| -> String {
            expand_word(state, word, &mut *cmd_subst_cell.borrow_mut()).value
        };

        // Process assignments (both prefix `FOO=bar cmd` and standalone `FOO=bar`)
        let assignment_result =
            crate::interpreter::simple_command_assignments::process_assignments(state, cmd, &expand_fn);

        if let Some(error) = assignment_result.error {
            return Ok(error);
        }
        if !assignment_result.xtrace_output.is_empty() && cmd.name.is_none() {
            return Ok(ExecResult::new(String::new(), assignment_result.xtrace_output, 1));
        }

        // Assignment-only command: nothing more to do.
        if cmd.name.is_none() {
            return Ok(ExecResult::ok());
        }

        // Push prefix assignments so they're visible for the duration of this command only.
        let has_temp_assignments = !assignment_result.temp_assignments.is_empty();
        if has_temp_assignments {
            if state.temp_env_bindings.is_none() {
                state.temp_env_bindings = Some(Vec::new());
            }
            state
                .temp_env_bindings
                .as_mut()
                .unwrap()
                .push(assignment_result.temp_assignments.clone());
        }

        let restore_temp_assignments = |state: &mut InterpreterState| {
            if has_temp_assignments {
                for (key, original) in &assignment_result.temp_assignments {
                    match original {
                        Some(v) => { state.env.insert(key.clone(), v.clone()); }
                        None => { state.env.remove(key); }
                    }
                }
                if let Some(stack) = state.temp_env_bindings.as_mut() {
                    stack.pop();
                }
            }
        };

        // Get command name
        let word = cmd.name.as_ref().unwrap();
        let cmd_name = {
            let mut cs = cmd_subst_cell.borrow_mut();
            expand_word(state, word, &mut *cs).value
        };

        // Expand arguments
        let args = {
            let mut cs = cmd_subst_cell.borrow_mut();
            self.expand_args(state, &cmd.args, &mut *cs)
        };

        let result = self.dispatch_command(state, &cmd_name, args, stdin, false);

        restore_temp_assignments(state);

        let result = result?;

        // Apply redirections
        if cmd.redirections.is_empty() {
            Ok(result)
        } else {
            Ok(apply_redirections(state, self.fs, result, &cmd.redirections, None, &expand_fn))
        }
    }

    /// Resolve a command name to its behaviour: user function, shell builtin,
    /// or a reimplemented utility dispatched through the registry.
    fn dispatch_command(
        &self,
        state: &mut InterpreterState,
        name: &str,
        args: Vec<String>,
        stdin: &str,
        skip_functions: bool,
    ) -> Result<ExecResult, InterpreterError> {
        tracing::debug!(command = name, arg_count = args.len(), "dispatching command");

        if !skip_functions && is_function_defined(state, name) {
            let func = get_function(state, name).unwrap().clone();
            let line = Some(state.current_line);
            let max_depth = self.limits.max_recursion_depth;
            return call_function(state, &func, &args, stdin, line, max_depth, |state, stdin| {
                self.execute_compound_command(state, &func.body, stdin)
            });
        }

        match name {
            ":" | "true" => Ok(ExecResult::ok()),
            "false" => Ok(ExecResult::new(String::new(), String::new(), 1)),
            "echo" => {
                let output = if args.is_empty() {
                    "\n".to_string()
                } else {
                    format!("{}\n", args.join(" "))
                };
                Ok(ExecResult::new(output, String::new(), 0))
            }
            "pwd" => Ok(ExecResult::new(format!("{}\n", state.cwd), String::new(), 0)),
            "exit" => {
                let code = args
                    .first()
                    .and_then(|s| s.parse::<i32>().ok())
                    .unwrap_or(state.last_exit_code);
                Err(InterpreterError::Exit(ExitError::new(code, String::new(), String::new())))
            }
            "cd" => Ok(handle_cd(state, &args, self.fs)),
            "export" => {
                let r = handle_export(state, &args);
                Ok(to_exec_result(r))
            }
            "unset" => Ok(handle_unset(state, &args)),
            "local" => Ok(handle_local(state, &args)),
            "declare" | "typeset" => Ok(to_exec_result(handle_declare(state, &args))),
            "readonly" => Ok(to_exec_result(handle_readonly(state, &args))),
            "read" => Ok(to_exec_result(handle_read(state, &args, stdin, -1))),
            "break" => handle_break(state, &args).map(to_exec_result),
            "continue" => handle_continue(state, &args).map(to_exec_result),
            "return" => handle_return(state, &args).map(to_exec_result),
            "shift" => handle_shift(state, &args).map(to_exec_result),
            "set" => handle_set(state, &args).map(to_exec_result),
            "getopts" => Ok(to_exec_result(handle_getopts(state, &args))),
            "mapfile" | "readarray" => Ok(to_exec_result(handle_mapfile(state, &args, stdin))),
            "shopt" => Ok(to_exec_result(handle_shopt(state, &args))),
            "hash" => {
                let (out, err, code) = handle_hash(state, &args);
                Ok(ExecResult::new(out, err, code))
            }
            "pushd" => {
                let (out, err, code) = handle_pushd(state, &args);
                Ok(ExecResult::new(out, err, code))
            }
            "popd" => {
                let (out, err, code) = handle_popd(state, &args);
                Ok(ExecResult::new(out, err, code))
            }
            "dirs" => {
                let (out, err, code) = handle_dirs(state, &args);
                Ok(ExecResult::new(out, err, code))
            }
            "let" => {
                let (out, err, code) = handle_let(state, &args);
                Ok(ExecResult::new(out, err, code))
            }
            "help" => Ok(to_exec_result(handle_help(&args))),
            "trap" => Ok(to_exec_result(handle_trap(state, &args))),
            "eval" => {
                let script = args.join(" ");
                if script.trim().is_empty() {
                    return Ok(ExecResult::ok());
                }
                match crate::parser::parse(&script) {
                    Ok(ast) => self.execute_script(state, &ast),
                    Err(e) => Ok(ExecResult::new(String::new(), format!("bash: eval: {}\n", e), 2)),
                }
            }
            "source" | "." => {
                if args.is_empty() {
                    return Ok(ExecResult::new(
                        String::new(),
                        "bash: source: filename argument required\n".to_string(),
                        2,
                    ));
                }
                let path = self.fs.resolve_path(&state.cwd, &args[0]);
                let content = match self.fs.read_file(&path) {
                    Ok(c) => c,
                    Err(_) => {
                        return Ok(ExecResult::new(
                            String::new(),
                            format!("bash: {}: No such file or directory\n", args[0]),
                            1,
                        ));
                    }
                };
                match crate::parser::parse(&content) {
                    Ok(ast) => {
                        state.source_depth += 1;
                        let prev_source = state.current_source.clone();
                        state.current_source = Some(path);
                        let result = self.execute_script(state, &ast);
                        state.current_source = prev_source;
                        state.source_depth -= 1;
                        result
                    }
                    Err(e) => Ok(ExecResult::new(String::new(), format!("bash: source: {}\n", e), 2)),
                }
            }
            "type" => {
                let ctx = TypeCommandContext { state };
                let find_first = |n: &str| -> Option<String> {
                    if self.registry.contains(n) { Some(format!("/usr/bin/{}", n)) } else { None }
                };
                let find_all = |n: &str| -> Vec<String> { find_first(n).into_iter().collect() };
                Ok(handle_type(&ctx, &args, find_first, find_all))
            }
            "command" => {
                let mut rest = args;
                let mut use_v = false;
                let mut use_verbose = false;
                while rest.first().map_or(false, |a| a.starts_with('-') && a != "--") {
                    match rest.remove(0).as_str() {
                        "-v" => use_v = true,
                        "-V" => use_verbose = true,
                        _ => {}
                    }
                }
                if rest.first().map(|s| s.as_str()) == Some("--") {
                    rest.remove(0);
                }
                if use_v || use_verbose {
                    let ctx = TypeCommandContext { state };
                    return Ok(handle_command_v(&ctx, &rest, use_v, use_verbose));
                }
                if rest.is_empty() {
                    return Ok(ExecResult::ok());
                }
                let cmd_name = rest.remove(0);
                self.dispatch_command(state, &cmd_name, rest, stdin, true)
            }
            _ => {
                if let Some(result) =
                    self.run_registry_command(name, args, stdin.to_string(), state)
                {
                    Ok(result)
                } else {
                    Ok(ExecResult::new(
                        String::new(),
                        format!("bash: {}: command not found\n", name),
                        127,
                    ))
                }
            }
        }
    }

    /// Execute a compound command (if, for, while, etc.).
    pub fn execute_compound_command(
        &self,
        state: &mut InterpreterState,
        compound: &CompoundCommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        match compound {
            CompoundCommandNode::If(if_node) => {
                let mut stdout = String::new();
                let mut stderr = String::new();

                for clause in &if_node.clauses {
                    let (cond_out, cond_err, succeeded) =
                        self.run_condition(state, &clause.condition)?;
                    stdout.push_str(&cond_out);
                    stderr.push_str(&cond_err);

                    if succeeded {
                        for stmt in &clause.body {
                            let res = self.execute_statement(state, stmt)?;
                            stdout.push_str(&res.stdout);
                            stderr.push_str(&res.stderr);
                            update_exit_code(state, res.exit_code);
                        }
                        return Ok(ExecResult::new(stdout, stderr, state.last_exit_code));
                    }
                }

                if let Some(ref else_body) = if_node.else_body {
                    for stmt in else_body {
                        let res = self.execute_statement(state, stmt)?;
                        stdout.push_str(&res.stdout);
                        stderr.push_str(&res.stderr);
                        update_exit_code(state, res.exit_code);
                    }
                    return Ok(ExecResult::new(stdout, stderr, state.last_exit_code));
                }

                update_exit_code(state, 0);
                Ok(ExecResult::new(stdout, stderr, 0))
            }

            CompoundCommandNode::For(for_node) => {
                let mut cmd_subst = self.make_cmd_subst();
                let words: Vec<String> = if let Some(ref word_list) = for_node.words {
                    self.expand_args(state, word_list, &mut cmd_subst)
                } else {
                    // Default to positional parameters
                    let argc: usize = state
                        .env
                        .get("#")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0);
                    (1..=argc)
                        .filter_map(|i| state.env.get(&i.to_string()).cloned())
                        .collect()
                };

                let body: Vec<&StatementNode> = for_node.body.iter().collect();

                let mut stdout = String::new();
                let mut stderr = String::new();
                let mut exit_code = 0;

                for word in &words {
                    state.env.insert(for_node.variable.clone(), word.clone());

                    if !self.run_loop_body(state, &body, &mut stdout, &mut stderr, &mut exit_code)? {
                        break;
                    }
                }

                Ok(ExecResult::new(stdout, stderr, exit_code))
            }

            CompoundCommandNode::While(while_node) => {
                let body: Vec<&StatementNode> = while_node.body.iter().collect();
                let mut stdout = String::new();
                let mut stderr = String::new();
                let mut exit_code = 0;
                let mut iterations: u64 = 0;

                loop {
                    let (cond_out, cond_err, succeeded) =
                        self.run_condition(state, &while_node.condition)?;
                    stdout.push_str(&cond_out);
                    stderr.push_str(&cond_err);

                    if !succeeded {
                        break;
                    }

                    iterations += 1;
                    if iterations > self.limits.max_iterations {
                        tracing::warn!(limit = "max_iterations", construct = "while", "execution limit exceeded");
                        return Err(InterpreterError::ExecutionLimit(
                            crate::interpreter::errors::ExecutionLimitError::simple(
                                "maximum loop iterations exceeded".to_string(),
                                crate::interpreter::errors::LimitType::Iterations,
                            ),
                        ));
                    }

                    if !self.run_loop_body(state, &body, &mut stdout, &mut stderr, &mut exit_code)? {
                        break;
                    }
                }

                Ok(ExecResult::new(stdout, stderr, exit_code))
            }

            CompoundCommandNode::Until(until_node) => {
                let body: Vec<&StatementNode> = until_node.body.iter().collect();
                let mut stdout = String::new();
                let mut stderr = String::new();
                let mut exit_code = 0;
                let mut iterations: u64 = 0;

                loop {
                    let (cond_out, cond_err, succeeded) =
                        self.run_condition(state, &until_node.condition)?;
                    stdout.push_str(&cond_out);
                    stderr.push_str(&cond_err);

                    if succeeded {
                        break;
                    }

                    iterations += 1;
                    if iterations > self.limits.max_iterations {
                        tracing::warn!(limit = "max_iterations", construct = "until", "execution limit exceeded");
                        return Err(InterpreterError::ExecutionLimit(
                            crate::interpreter::errors::ExecutionLimitError::simple(
                                "maximum loop iterations exceeded".to_string(),
                                crate::interpreter::errors::LimitType::Iterations,
                            ),
                        ));
                    }

                    if !self.run_loop_body(state, &body, &mut stdout, &mut stderr, &mut exit_code)? {
                        break;
                    }
                }

                Ok(ExecResult::new(stdout, stderr, exit_code))
            }

            CompoundCommandNode::Case(case_node) => {
                let mut cmd_subst = self.make_cmd_subst();
                let subject = expand_word(state, &case_node.word, &mut cmd_subst).value;

                let mut stdout = String::new();
                let mut stderr = String::new();
                let mut exit_code = 0;
                let mut fell_through = false;

                for item in &case_node.items {
                    let matched = fell_through
                        || item.patterns.iter().any(|p| {
                            let pattern = expand_word(state, p, &mut cmd_subst).value;
                            match_pattern(&subject, &pattern, state.options.nocasematch, state.options.extglob)
                        });

                    if !matched {
                        continue;
                    }

                    for stmt in &item.body {
                        let res = self.execute_statement(state, stmt)?;
                        stdout.push_str(&res.stdout);
                        stderr.push_str(&res.stderr);
                        exit_code = res.exit_code;
                        update_exit_code(state, exit_code);
                    }

                    match item.terminator {
                        CaseTerminator::DoubleSemi => return Ok(ExecResult::new(stdout, stderr, exit_code)),
                        CaseTerminator::SemiAnd => {
                            fell_through = true;
                        }
                        CaseTerminator::SemiSemiAnd => {
                            fell_through = false;
                            // re-test remaining items' patterns against the next clause normally
                        }
                    }
                }

                Ok(ExecResult::new(stdout, stderr, exit_code))
            }

            CompoundCommandNode::Subshell(subshell_node) => {
                execute_subshell(
                    state,
                    &subshell_node.body,
                    Some(stdin),
                    |state, stmt| self.execute_statement(state, stmt),
                )
            }

            CompoundCommandNode::Group(group_node) => {
                execute_group(
                    state,
                    &group_node.body,
                    Some(stdin),
                    |state, stmt| self.execute_statement(state, stmt),
                )
            }

            CompoundCommandNode::ArithmeticCommand(arith) => {
                let mut ctx = InterpreterContext::new(state, self.limits);
                match evaluate_arithmetic(&mut ctx, &arith.expression.expression, false, None) {
                    Ok(value) => {
                        // Arithmetic command: exit 0 if non-zero, exit 1 if zero
                        let exit_code = if value != 0 { 0 } else { 1 };
                        Ok(ExecResult::new(String::new(), String::new(), exit_code))
                    }
                    Err(e) => {
                        Ok(ExecResult::new(
                            String::new(),
                            format!("bash: {}\n", e),
                            1,
                        ))
                    }
                }
            }

            CompoundCommandNode::ConditionalCommand(cond) => {
                let mut cmd_subst = self.make_cmd_subst();
                let result = evaluate_conditional_expression(state, &cond.expression, self.fs, &mut cmd_subst);
                let exit_code = if result.value { 0 } else { 1 };
                Ok(ExecResult::new(result.stdout, String::new(), exit_code))
            }

            CompoundCommandNode::CStyleFor(cfor) => {
                if let Some(ref init) = cfor.init {
                    let mut ctx = InterpreterContext::new(state, self.limits);
                    evaluate_arithmetic(&mut ctx, &init.expression, false, None)
                        .map_err(InterpreterError::Arithmetic)?;
                }

                let body: Vec<&StatementNode> = cfor.body.iter().collect();
                let mut stdout = String::new();
                let mut stderr = String::new();
                let mut exit_code = 0;
                let mut iterations: u64 = 0;

                loop {
                    let cond_true = if let Some(ref cond) = cfor.condition {
                        let mut ctx = InterpreterContext::new(state, self.limits);
                        evaluate_arithmetic(&mut ctx, &cond.expression, false, None)
                            .map_err(InterpreterError::Arithmetic)?
                            != 0
                    } else {
                        true
                    };

                    if !cond_true {
                        break;
                    }

                    iterations += 1;
                    if iterations > self.limits.max_iterations {
                        tracing::warn!(limit = "max_iterations", construct = "c-style for", "execution limit exceeded");
                        return Err(InterpreterError::ExecutionLimit(
                            crate::interpreter::errors::ExecutionLimitError::simple(
                                "maximum loop iterations exceeded".to_string(),
                                crate::interpreter::errors::LimitType::Iterations,
                            ),
                        ));
                    }

                    if !self.run_loop_body(state, &body, &mut stdout, &mut stderr, &mut exit_code)? {
                        break;
                    }

                    if let Some(ref update) = cfor.update {
                        let mut ctx = InterpreterContext::new(state, self.limits);
                        evaluate_arithmetic(&mut ctx, &update.expression, false, None)
                            .map_err(InterpreterError::Arithmetic)?;
                    }
                }

                Ok(ExecResult::new(stdout, stderr, exit_code))
            }
        }
    }
}

/// Convert the struct-shaped `BuiltinResult` used by most builtin handlers into an `ExecResult`.
fn to_exec_result(r: BuiltinResult) -> ExecResult {
    ExecResult::new(r.stdout, r.stderr, r.exit_code)
}

// ============================================================================
// Tests
// ============================================================================
