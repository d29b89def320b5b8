use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct WhoamiCommand;

#[async_trait]
impl Command for WhoamiCommand {
    fn name(&self) -> &'static str {
        "whoami"
    }

    async fn execute(&self, _ctx: CommandContext) -> CommandResult {
        // In sandboxed environment, always return "user"
        CommandResult::success("user\n".to_string())
    }
}
