use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct TacCommand;

#[async_trait]
impl Command for TacCommand {
    fn name(&self) -> &'static str {
        "tac"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let content = if !ctx.args.is_empty() && ctx.args[0] != "-" {
            let file_path = if ctx.args[0].starts_with('/') {
                ctx.args[0].clone()
            } else {
                format!("{}/{}", ctx.cwd, ctx.args[0])
            };

            match ctx.fs.read_file(&file_path).await {
                Ok(content) => content,
                Err(_) => {
                    return CommandResult::error(format!(
                        "tac: {}: No such file or directory\n",
                        ctx.args[0]
                    ));
                }
            }
        } else {
            ctx.stdin.clone()
        };

        let mut lines: Vec<&str> = content.split('\n').collect();
        if lines.last() == Some(&"") {
            lines.pop();
        }
        lines.reverse();

        let output = if lines.is_empty() {
            String::new()
        } else {
            format!("{}\n", lines.join("\n"))
        };

        CommandResult::success(output)
    }
}
