pub mod types;
pub mod parser;
pub mod matcher;

use std::collections::VecDeque;
use std::time::SystemTime;

use async_trait::async_trait;
use crate::commands::types::{Command, CommandContext, CommandResult};
use crate::fs::RmOptions;
use types::*;

pub struct FindCommand;

#[async_trait]
impl Command for FindCommand {
    fn name(&self) -> &'static str {
        "find"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let args = &ctx.args;

        // 1. Parse starting paths (everything before first flag/expression token)
        let mut search_paths: Vec<String> = Vec::new();
        let mut expr_start = 0;

        for (i, arg) in args.iter().enumerate() {
            let s = arg.as_str();
            if s.starts_with('-')
                || s == "("
                || s == "\\("
                || s == ")"
                || s == "\\)"
                || s == "!"
            {
                expr_start = i;
                break;
            }
            search_paths.push(arg.clone());
            expr_start = i + 1;
        }

        if search_paths.is_empty() {
            search_paths.push(".".to_string());
        }

        // 2. Parse expressions from remaining args
        let expr_args: Vec<String> = args[expr_start..].to_vec();
        let (expression, options) = match parser::parse_expressions(&expr_args) {
            Ok((expr, opts)) => (expr, opts),
            Err(e) => {
                return CommandResult::error(format!("{}\n", e));
            }
        };

        // Determine if expression has an explicit action
        let has_action = expression_has_action(&expression);

        let mut all_output = String::new();
        let mut all_stderr = String::new();
        let mut exit_code = 0i32;

        // 3. For each starting path, traverse the directory tree
        for search_path in &search_paths {
            // Normalize trailing slashes
            let search_path_clean = if search_path.len() > 1 && search_path.ends_with('/') {
                &search_path[..search_path.len() - 1]
            } else {
                search_path.as_str()
            };

            let base_path = ctx.fs.resolve_path(&ctx.cwd, search_path_clean);

            // Check if path exists
            if !ctx.fs.exists(&base_path).await {
                all_stderr.push_str(&format!(
                    "find: {}: No such file or directory\n",
                    search_path_clean
                ));
                exit_code = 1;
                continue;
            }

            // Resolve -newer reference file mtime
            let newer_ref_mtime = collect_newer_ref_mtime(&expression, &ctx, &base_path).await;
            // Traversal
            let mut matched_paths: Vec<String> = Vec::new();
            let mut output = String::new();

            if options.depth_first {
                // Depth-first (post-order): process children before parents
                traverse_depth_first(
                    &ctx,
                    &base_path,
                    search_path_clean,
                    &expression,
                    &options,
                    has_action,
                    newer_ref_mtime,
                    &mut matched_paths,
                    &mut output,
                    &mut all_stderr,
                    &mut exit_code,
                ).await;
            } else {
                // BFS (pre-order): process parents before children
                traverse_breadth_first(
                    &ctx,
                    &base_path,
                    search_path_clean,
                    &expression,
                    &options,
                    has_action,
                    newer_ref_mtime,
                    &mut matched_paths,
                    &mut output,
                    &mut all_stderr,
                    &mut exit_code,
                ).await;
            }

            // Handle -delete action
            if expression_has_delete(&expression) {
                // Delete in reverse order (deepest first)
                let mut sorted = matched_paths.clone();
                sorted.sort_by(|a, b| b.len().cmp(&a.len()));
                for file in &sorted {
                    let full_path = ctx.fs.resolve_path(&ctx.cwd, file);
                    match ctx.fs.rm(&full_path, &RmOptions { recursive: false, force: false }).await {
                        Ok(()) => {}
                        Err(e) => {
                            all_stderr.push_str(&format!("find: cannot delete '{}': {}\n", file, e));
                            exit_code = 1;
                        }
                    }
                }
            }
            // Handle -exec action
            if let Some((command_parts, batch)) = expression_get_exec(&expression) {
                if let Some(ref exec_fn) = ctx.exec_fn {
                    if batch {
                        // -exec ... + : execute once with all files
                        let mut cmd_parts: Vec<String> = Vec::new();
                        for part in &command_parts {
                            if part == "{}" {
                                cmd_parts.extend(matched_paths.iter().cloned());
                            } else {
                                cmd_parts.push(part.clone());
                            }
                        }
                        let cmd = cmd_parts.iter()
                            .map(|p| format!("\"{}\"", p))
                            .collect::<Vec<_>>()
                            .join(" ");
                        let result = exec_fn(
                            cmd,
                            String::new(),
                            ctx.cwd.clone(),
                            ctx.env.clone(),
                            ctx.fs.clone(),
                        ).await;
                        output.push_str(&result.stdout);
                        all_stderr.push_str(&result.stderr);
                        if result.exit_code != 0 {
                            exit_code = result.exit_code;
                        }
                    } else {
                        // -exec ... ; : execute for each file
                        for file in &matched_paths {
                            let cmd_with_file: Vec<String> = command_parts.iter()
                                .map(|part| if part == "{}" { file.clone() } else { part.clone() })
                                .collect();
                            let cmd = cmd_with_file.iter()
                                .map(|p| format!("\"{}\"", p))
                                .collect::<Vec<_>>()
                                .join(" ");
                            let result = exec_fn(
                                cmd,
                                String::new(),
                                ctx.cwd.clone(),
                                ctx.env.clone(),
                                ctx.fs.clone(),
                            ).await;
                            output.push_str(&result.stdout);
                            all_stderr.push_str(&result.stderr);
                            if result.exit_code != 0 {
                                exit_code = result.exit_code;
                            }
                        }
                    }
                }
            }

            all_output.push_str(&output);
        }

        CommandResult::with_exit_code(all_output, all_stderr, exit_code)
    }
}
/// Check if expression tree contains any action (print, print0, printf, delete, exec).
fn expression_has_action(expr: &Expression) -> bool {
    match expr {
        Expression::Print | Expression::Print0 | Expression::Printf { .. }
        | Expression::Delete | Expression::Exec { .. } => true,
        Expression::Not(inner) => expression_has_action(inner),
        Expression::And(left, right) | Expression::Or(left, right) => {
            expression_has_action(left) || expression_has_action(right)
        }
        _ => false,
    }
}

/// Check if expression tree contains -delete.
fn expression_has_delete(expr: &Expression) -> bool {
    match expr {
        Expression::Delete => true,
        Expression::Not(inner) => expression_has_delete(inner),
        Expression::And(left, right) | Expression::Or(left, right) => {
            expression_has_delete(left) || expression_has_delete(right)
        }
        _ => false,
    }
}

/// Extract -exec command parts and batch flag if present.
fn expression_get_exec(expr: &Expression) -> Option<(Vec<String>, bool)> {
    match expr {
        Expression::Exec { command, batch } => Some((command.clone(), *batch)),
        Expression::Not(inner) => expression_get_exec(inner),
        Expression::And(left, right) | Expression::Or(left, right) => {
            expression_get_exec(left).or_else(|| expression_get_exec(right))
        }
        _ => None,
    }
}

/// Collect -newer reference file mtime.
async fn collect_newer_ref_mtime(
    expr: &Expression,
    ctx: &CommandContext,
    _base_path: &str,
) -> Option<SystemTime> {
    if let Some(ref_path) = collect_newer_ref_path(expr) {
        let full_path = ctx.fs.resolve_path(&ctx.cwd, &ref_path);
        if let Ok(stat) = ctx.fs.stat(&full_path).await {
            return Some(stat.mtime);
        }
    }
    None
}
fn collect_newer_ref_path(expr: &Expression) -> Option<String> {
    match expr {
        Expression::Newer { reference_path } => Some(reference_path.clone()),
        Expression::Not(inner) => collect_newer_ref_path(inner),
        Expression::And(left, right) | Expression::Or(left, right) => {
            collect_newer_ref_path(left).or_else(|| collect_newer_ref_path(right))
        }
        _ => None,
    }
}

/// Build an EvalContext for a given entry.
fn build_eval_context(
    name: &str,
    path: &str,
    relative_path: &str,
    stat: &crate::fs::FsStat,
    depth: usize,
    is_empty: bool,
    newer_ref_mtime: Option<SystemTime>,
    starting_point: &str,
) -> EvalContext {
    EvalContext {
        name: name.to_string(),
        path: path.to_string(),
        relative_path: relative_path.to_string(),
        is_file: stat.is_file,
        is_directory: stat.is_directory,
        is_symlink: stat.is_symlink,
        size: stat.size,
        mode: stat.mode,
        mtime: stat.mtime,
        depth,
        is_empty,
        newer_ref_mtime,
        starting_point: starting_point.to_string(),
    }
}

/// Compute the relative path for display.
fn compute_relative_path(
    current_path: &str,
    base_path: &str,
    search_path: &str,
) -> String {
    if current_path == base_path {
        search_path.to_string()
    } else if search_path == "." {
        let suffix = if base_path == "/" {
            &current_path[1..]
        } else {
            &current_path[base_path.len() + 1..]
        };
        format!("./{}", suffix)
    } else {
        let suffix = &current_path[base_path.len()..];
        format!("{}{}", search_path, suffix)
    }
}
/// Compute the name (basename) for a path.
fn compute_name(current_path: &str, base_path: &str, search_path: &str) -> String {
    if current_path == base_path {
        // For the starting point, use the last component of search_path
        search_path.rsplit('/').next().unwrap_or(search_path).to_string()
    } else {
        current_path.rsplit('/').next().unwrap_or("").to_string()
    }
}

/// Check if a directory is empty.
async fn check_dir_empty(ctx: &CommandContext, path: &str) -> bool {
    match ctx.fs.readdir(path).await {
        Ok(entries) => entries.is_empty(),
        Err(_) => false,
    }
}

/// Process a single node: evaluate expression, collect output.
fn process_node(
    eval_ctx: &EvalContext,
    expression: &Expression,
    has_action: bool,
    matched_paths: &mut Vec<String>,
    output: &mut String,
) -> (bool, bool) {
    let result = matcher::evaluate(expression, eval_ctx);

    let should_output = if has_action {
        result.printed
    } else {
        result.matches
    };

    if should_output {
        matched_paths.push(eval_ctx.relative_path.clone());
        if !has_action {
            // Default print
            output.push_str(&eval_ctx.relative_path);
            output.push('\n');
        } else {
            output.push_str(&result.output);
        }
    }

    (result.matches, result.pruned)
}
#[allow(clippy::too_many_arguments)]
async fn traverse_breadth_first(
    ctx: &CommandContext,
    base_path: &str,
    search_path: &str,
    expression: &Expression,
    options: &FindOptions,
    has_action: bool,
    newer_ref_mtime: Option<SystemTime>,
    matched_paths: &mut Vec<String>,
    output: &mut String,
    stderr: &mut String,
    exit_code: &mut i32,
) {
    // Queue: (absolute_path, depth)
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    queue.push_back((base_path.to_string(), 0));

    while let Some((current_path, depth)) = queue.pop_front() {
        // Check maxdepth
        if let Some(max) = options.max_depth {
            if depth > max {
                continue;
            }
        }

        // Stat the entry
        let stat = match ctx.fs.stat(&current_path).await {
            Ok(s) => s,
            Err(_) => continue,
        };

        let name = compute_name(&current_path, base_path, search_path);
        let relative_path = compute_relative_path(&current_path, base_path, search_path);

        // Check if empty
        let is_empty = if stat.is_file {
            stat.size == 0
        } else if stat.is_directory {
            check_dir_empty(ctx, &current_path).await
        } else {
            false
        };

        // Build eval context
        let eval_ctx = build_eval_context(
            &name, &current_path, &relative_path, &stat, depth,
            is_empty, newer_ref_mtime, search_path,
        );

        // Check mindepth
        let at_or_beyond_min = options.min_depth.map_or(true, |min| depth >= min);

        let mut pruned = false;
        if at_or_beyond_min {
            let (_matched, p) = process_node(&eval_ctx, expression, has_action, matched_paths, output);
            pruned = p;
        }

        // Descend into directories (unless pruned or at maxdepth)
        if stat.is_directory && !pruned {
            if let Some(max) = options.max_depth {
                if depth >= max {
                    continue;
                }
            }
            match ctx.fs.readdir_with_file_types(&current_path).await {
                Ok(entries) => {
                    for entry in entries {
                        let child_path = if current_path == "/" {
                            format!("/{}", entry.name)
                        } else {
                            format!("{}/{}", current_path, entry.name)
                        };
                        queue.push_back((child_path, depth + 1));
                    }
                }
                Err(e) => {
                    stderr.push_str(&format!("find: {}: {}\n", relative_path, e));
                    *exit_code = 1;
                }
            }
        }
    }
}
#[allow(clippy::too_many_arguments)]
async fn traverse_depth_first(
    ctx: &CommandContext,
    base_path: &str,
    search_path: &str,
    expression: &Expression,
    options: &FindOptions,
    has_action: bool,
    newer_ref_mtime: Option<SystemTime>,
    matched_paths: &mut Vec<String>,
    output: &mut String,
    stderr: &mut String,
    exit_code: &mut i32,
) {
    // Iterative post-order DFS using two phases:
    // Phase 1: Discover all nodes (BFS-like) and record parent-child relationships
    // Phase 2: Process in reverse order (children before parents)

    struct NodeInfo {
        path: String,
        depth: usize,
        children_start: usize,
        children_end: usize,
    }

    let mut nodes: Vec<NodeInfo> = Vec::new();
    // Discovery queue
    let mut discover_queue: VecDeque<(String, usize)> = VecDeque::new();
    discover_queue.push_back((base_path.to_string(), 0));

    // Phase 1: Discover all nodes
    while let Some((current_path, depth)) = discover_queue.pop_front() {
        if let Some(max) = options.max_depth {
            if depth > max {
                continue;
            }
        }

        let stat = match ctx.fs.stat(&current_path).await {
            Ok(s) => s,
            Err(_) => continue,
        };

        let children_start = discover_queue.len();
        if stat.is_directory {
            let can_descend = options.max_depth.map_or(true, |max| depth < max);
            if can_descend {
                match ctx.fs.readdir_with_file_types(&current_path).await {
                    Ok(entries) => {
                        for entry in entries {
                            let child_path = if current_path == "/" {
                                format!("/{}", entry.name)
                            } else {
                                format!("{}/{}", current_path, entry.name)
                            };
                            discover_queue.push_back((child_path, depth + 1));
                        }
                    }
                    Err(e) => {
                        let rel = compute_relative_path(&current_path, base_path, search_path);
                        stderr.push_str(&format!("find: {}: {}\n", rel, e));
                        *exit_code = 1;
                    }
                }
            }
        }
        let children_end = discover_queue.len();

        nodes.push(NodeInfo {
            path: current_path,
            depth,
            children_start,
            children_end,
        });
    }

    // Phase 2: Process in reverse order (post-order)
    // Since we discovered in BFS order, reversing gives us children-before-parents
    for node_info in nodes.iter().rev() {
        let stat = match ctx.fs.stat(&node_info.path).await {
            Ok(s) => s,
            Err(_) => continue,
        };

        let name = compute_name(&node_info.path, base_path, search_path);
        let relative_path = compute_relative_path(&node_info.path, base_path, search_path);

        let is_empty = if stat.is_file {
            stat.size == 0
        } else if stat.is_directory {
            check_dir_empty(ctx, &node_info.path).await
        } else {
            false
        };

        let eval_ctx = build_eval_context(
            &name, &node_info.path, &relative_path, &stat, node_info.depth,
            is_empty, newer_ref_mtime, search_path,
        );

        let at_or_beyond_min = options.min_depth.map_or(true, |min| node_info.depth >= min);
        if at_or_beyond_min {
            process_node(&eval_ctx, expression, has_action, matched_paths, output);
        }
    }
}
