//! `awk` command wrapper
//!
//! Bridges the tree-walking AWK interpreter (see `commands::awk`) into the
//! command registry: parses `-F`/`-v`/`-f`/`--` options, reads the program
//! text (inline or from `-f` files), feeds stdin or named files record by
//! record, and returns the accumulated output.

use async_trait::async_trait;
use crate::commands::awk::context::AwkContext;
use crate::commands::awk::interpreter::AwkInterpreter;
use crate::commands::awk::parser::parse as parse_awk;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct AwkCommand;

#[async_trait]
impl Command for AwkCommand {
    fn name(&self) -> &'static str {
        "awk"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        execute_awk(ctx).await
    }
}

struct ParsedArgs {
    fs: Option<String>,
    assignments: Vec<(String, String)>,
    program_files: Vec<String>,
    inline_program: Option<String>,
    data_files: Vec<String>,
}

fn parse_args(args: &[String]) -> Result<ParsedArgs, String> {
    let mut fs = None;
    let mut assignments = Vec::new();
    let mut program_files = Vec::new();
    let mut inline_program = None;
    let mut data_files = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == "-F" {
            i += 1;
            fs = args.get(i).cloned();
        } else if let Some(rest) = arg.strip_prefix("-F") {
            fs = Some(rest.to_string());
        } else if arg == "-v" {
            i += 1;
            if let Some(kv) = args.get(i) {
                if let Some((k, v)) = kv.split_once('=') {
                    assignments.push((k.to_string(), v.to_string()));
                }
            }
        } else if let Some(rest) = arg.strip_prefix("-v") {
            if let Some((k, v)) = rest.split_once('=') {
                assignments.push((k.to_string(), v.to_string()));
            }
        } else if arg == "-f" {
            i += 1;
            if let Some(path) = args.get(i) {
                program_files.push(path.clone());
            }
        } else if let Some(rest) = arg.strip_prefix("-f") {
            if !rest.is_empty() {
                program_files.push(rest.to_string());
            }
        } else if arg == "--" {
            i += 1;
            break;
        } else if program_files.is_empty() && inline_program.is_none() {
            inline_program = Some(arg.clone());
        } else {
            data_files.push(arg.clone());
        }
        i += 1;
    }
    while i < args.len() {
        data_files.push(args[i].clone());
        i += 1;
    }

    if program_files.is_empty() && inline_program.is_none() {
        return Err("awk: no program text\n".to_string());
    }

    Ok(ParsedArgs {
        fs,
        assignments,
        program_files,
        inline_program,
        data_files,
    })
}

async fn execute_awk(ctx: CommandContext) -> CommandResult {
    let parsed = match parse_args(&ctx.args) {
        Ok(p) => p,
        Err(e) => return CommandResult::with_exit_code(String::new(), e, 2),
    };

    let program_text = if !parsed.program_files.is_empty() {
        let mut combined = String::new();
        for path in &parsed.program_files {
            let resolved = ctx.fs.resolve_path(&ctx.cwd, path);
            match ctx.fs.read_file(&resolved).await {
                Ok(text) => {
                    combined.push_str(&text);
                    combined.push('\n');
                }
                Err(e) => {
                    return CommandResult::with_exit_code(
                        String::new(),
                        format!("awk: can't open file {}: {}\n", path, e),
                        2,
                    )
                }
            }
        }
        combined
    } else {
        parsed.inline_program.clone().unwrap_or_default()
    };

    let awk_program = match parse_awk(&program_text) {
        Ok(p) => p,
        Err(e) => {
            return CommandResult::with_exit_code(
                String::new(),
                format!("awk: syntax error: {}\n", e),
                2,
            )
        }
    };

    let mut awk_ctx = AwkContext::with_fs(parsed.fs.as_deref().unwrap_or(" "));
    awk_ctx.environ = ctx.env.clone();
    for (k, v) in &parsed.assignments {
        crate::commands::awk::variables::set_variable(&mut awk_ctx, k, v);
    }

    let mut interpreter = AwkInterpreter::new(awk_ctx, awk_program);
    interpreter.execute_begin();

    // Gather input: explicit files in argument order, or stdin if none given.
    let mut sources: Vec<(String, String)> = Vec::new();
    if parsed.data_files.is_empty() {
        sources.push((String::new(), ctx.stdin.clone()));
    } else {
        for path in &parsed.data_files {
            let resolved = ctx.fs.resolve_path(&ctx.cwd, path);
            match ctx.fs.read_file(&resolved).await {
                Ok(text) => sources.push((path.clone(), text)),
                Err(e) => {
                    return CommandResult::with_exit_code(
                        String::new(),
                        format!("awk: can't open file {}: {}\n", path, e),
                        2,
                    )
                }
            }
        }
    }

    for (name, content) in sources {
        interpreter.get_context_mut().filename = name;
        interpreter.get_context_mut().fnr = 0;
        let rs = interpreter
            .get_context()
            .vars
            .get("RS")
            .cloned()
            .unwrap_or_else(|| "\n".to_string());

        if content.is_empty() {
            continue;
        }

        let records: Vec<&str> = if rs == "\n" {
            let trimmed = content.strip_suffix('\n').unwrap_or(&content);
            trimmed.split('\n').collect()
        } else if rs.is_empty() {
            content.split("\n\n").filter(|s| !s.is_empty()).collect()
        } else {
            content.split(rs.as_str()).collect()
        };

        for line in records {
            if interpreter.get_context().should_exit {
                break;
            }
            interpreter.execute_line(line);
        }
    }

    // A genuine `exit` statement still runs END (standard awk behavior); an
    // execution-limit abort does not, since the program already forfeited
    // normal control flow.
    if interpreter.get_context().error_message.is_none() {
        interpreter.execute_end();
    }

    let exit_code = interpreter.get_exit_code();
    let stderr = interpreter
        .get_context()
        .error_message
        .clone()
        .unwrap_or_default();
    CommandResult::with_exit_code(interpreter.get_output().to_string(), stderr, exit_code)
}
