//! trap - Register or display signal/exit handlers
//!
//! trap [-lp] [[arg] signal_spec ...]
//!
//! Real signal delivery is out of scope for this sandboxed interpreter; only
//! the EXIT pseudo-signal is ever actually fired, when the top-level script
//! finishes or unwinds via `exit`. Other signal names are accepted and
//! remembered (so `trap -p` and script introspection behave) but never fire.

use std::collections::HashMap;
use crate::interpreter::types::InterpreterState;

pub type BuiltinResult = (String, String, i32);

fn get_trap_table(state: &mut InterpreterState) -> &mut HashMap<String, String> {
    if state.trap_handlers.is_none() {
        state.trap_handlers = Some(HashMap::new());
    }
    state.trap_handlers.as_mut().unwrap()
}

/// Handle the `trap` builtin command.
pub fn handle_trap(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    if args.first().map(|a| a.as_str()) == Some("-l") {
        return (
            "1) SIGHUP\t2) SIGINT\t3) SIGQUIT\t15) SIGTERM\n".to_string(),
            String::new(),
            0,
        );
    }

    if args.first().map(|a| a.as_str()) == Some("-p") {
        let names: Vec<&String> = args[1..].iter().collect();
        let table = state.trap_handlers.clone().unwrap_or_default();
        let mut out = String::new();
        if names.is_empty() {
            for (sig, cmd) in &table {
                out.push_str(&format!("trap -- '{}' {}\n", cmd, sig));
            }
        } else {
            for sig in names {
                if let Some(cmd) = table.get(sig.as_str()) {
                    out.push_str(&format!("trap -- '{}' {}\n", cmd, sig));
                }
            }
        }
        return (out, String::new(), 0);
    }

    if args.is_empty() {
        let table = state.trap_handlers.clone().unwrap_or_default();
        let mut out = String::new();
        for (sig, cmd) in &table {
            out.push_str(&format!("trap -- '{}' {}\n", cmd, sig));
        }
        return (out, String::new(), 0);
    }

    // `trap -- arg sig...` or `trap arg sig...`: first word is the handler,
    // the rest are signal names it's registered under. `trap - sig...` and
    // `trap '' sig...` reset/ignore respectively.
    let mut rest = args;
    if rest[0] == "--" {
        rest = &rest[1..];
    }
    if rest.is_empty() {
        return (String::new(), "bash: trap: usage: trap [-lp] [[arg] signal_spec ...]\n".to_string(), 2);
    }
    let action = &rest[0];
    let signals = &rest[1..];
    if signals.is_empty() {
        return (String::new(), "bash: trap: usage: trap [-lp] [[arg] signal_spec ...]\n".to_string(), 2);
    }

    let table = get_trap_table(state);
    for sig in signals {
        let name = sig.trim_start_matches("SIG").to_uppercase();
        if action == "-" {
            table.remove(&name);
        } else {
            table.insert(name, action.clone());
        }
    }

    (String::new(), String::new(), 0)
}

/// Look up the handler word registered for `EXIT`, if any.
pub fn exit_trap(state: &InterpreterState) -> Option<String> {
    state.trap_handlers.as_ref().and_then(|t| t.get("EXIT")).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_state() -> InterpreterState {
        InterpreterState::default()
    }

    #[test]
    fn test_trap_register_and_print() {
        let mut state = make_state();
        let (_, _, code) = handle_trap(&mut state, &["echo bye".to_string(), "EXIT".to_string()]);
        assert_eq!(code, 0);
        assert_eq!(exit_trap(&state), Some("echo bye".to_string()));
    }

    #[test]
    fn test_trap_reset() {
        let mut state = make_state();
        handle_trap(&mut state, &["echo bye".to_string(), "EXIT".to_string()]);
        handle_trap(&mut state, &["-".to_string(), "EXIT".to_string()]);
        assert_eq!(exit_trap(&state), None);
    }

    #[test]
    fn test_trap_no_args_lists_nothing_when_empty() {
        let mut state = make_state();
        let (out, _, code) = handle_trap(&mut state, &[]);
        assert_eq!(out, "");
        assert_eq!(code, 0);
    }

    #[test]
    fn test_trap_list_signals() {
        let mut state = make_state();
        let (out, _, _) = handle_trap(&mut state, &["-l".to_string()]);
        assert!(out.contains("SIGINT"));
    }
}
