// src/commands/registry.rs
use std::collections::HashMap;
use super::types::Command;

pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.keys().map(|s| s.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the registry of every reimplemented utility.
///
/// Anything not found here falls through to "command not found" (exit 127)
/// in the evaluator, matching real bash's behaviour for a missing `$PATH`
/// entry.
pub fn build_default_registry() -> CommandRegistry {
    let mut r = CommandRegistry::new();

    r.register(Box::new(super::alias_cmd::AliasCommand));
    r.register(Box::new(super::awk_cmd::AwkCommand));
    r.register(Box::new(super::base64_cmd::Base64Command));
    r.register(Box::new(super::basename::BasenameCommand));
    r.register(Box::new(super::bash_cmd::BashCommand));
    r.register(Box::new(super::bash_cmd::ShCommand));
    r.register(Box::new(super::cat::CatCommand));
    r.register(Box::new(super::chmod::ChmodCommand));
    r.register(Box::new(super::clear_cmd::ClearCommand));
    r.register(Box::new(super::column_cmd::ColumnCommand));
    r.register(Box::new(super::comm_cmd::CommCommand));
    r.register(Box::new(super::cp::CpCommand));
    r.register(Box::new(super::curl::CurlCommand));
    r.register(Box::new(super::cut::CutCommand));
    r.register(Box::new(super::date::DateCommand));
    r.register(Box::new(super::diff_cmd::DiffCommand));
    r.register(Box::new(super::dirname::DirnameCommand));
    r.register(Box::new(super::du_cmd::DuCommand));
    r.register(Box::new(super::echo::EchoCommand));
    r.register(Box::new(super::env::EnvCommand));
    r.register(Box::new(super::env::PrintenvCommand));
    r.register(Box::new(super::expand_cmd::ExpandCommand));
    r.register(Box::new(super::expr_cmd::ExprCommand));
    r.register(Box::new(super::file_cmd::FileCommand));
    r.register(Box::new(super::find::FindCommand));
    r.register(Box::new(super::fold_cmd::FoldCommand));
    r.register(Box::new(super::grep::GrepCommand));
    r.register(Box::new(super::gzip::GzipCommand));
    r.register(Box::new(super::gzip::GunzipCommand));
    r.register(Box::new(super::gzip::ZcatCommand));
    r.register(Box::new(super::head::HeadCommand));
    r.register(Box::new(super::help_cmd::HelpCommand));
    r.register(Box::new(super::history_cmd::HistoryCommand));
    r.register(Box::new(super::hostname_cmd::HostnameCommand));
    r.register(Box::new(super::html_to_markdown_cmd::HtmlToMarkdownCommand));
    r.register(Box::new(super::join::JoinCommand));
    r.register(Box::new(super::jq::JqCommand));
    r.register(Box::new(super::ln::LnCommand));
    r.register(Box::new(super::ls::LsCommand));
    r.register(Box::new(super::md5sum::Md5sumCommand));
    r.register(Box::new(super::md5sum::Sha1sumCommand));
    r.register(Box::new(super::md5sum::Sha256sumCommand));
    r.register(Box::new(super::mkdir::MkdirCommand));
    r.register(Box::new(super::mv::MvCommand));
    r.register(Box::new(super::nl::NlCommand));
    r.register(Box::new(super::od_cmd::OdCommand));
    r.register(Box::new(super::paste::PasteCommand));
    r.register(Box::new(super::printf::PrintfCommand));
    r.register(Box::new(super::pwd::PwdCommand));
    r.register(Box::new(super::readlink_cmd::ReadlinkCommand));
    r.register(Box::new(super::rev_cmd::RevCommand));
    r.register(Box::new(super::rg_cmd::RgCommand));
    r.register(Box::new(super::rm::RmCommand));
    r.register(Box::new(super::rmdir_cmd::RmdirCommand));
    r.register(Box::new(super::sed::SedCommand));
    r.register(Box::new(super::seq::SeqCommand));
    r.register(Box::new(super::sleep_cmd::SleepCommand));
    r.register(Box::new(super::sort::SortCommand));
    r.register(Box::new(super::split_cmd::SplitCommand));
    r.register(Box::new(super::stat_cmd::StatCommand));
    r.register(Box::new(super::strings_cmd::StringsCommand));
    r.register(Box::new(super::tac_cmd::TacCommand));
    r.register(Box::new(super::tail::TailCommand));
    r.register(Box::new(super::tar::TarCommand));
    r.register(Box::new(super::tee::TeeCommand));
    r.register(Box::new(super::test_cmd::TestCommand));
    r.register(Box::new(super::test_cmd::BracketCommand));
    r.register(Box::new(super::time_cmd::TimeCommand));
    r.register(Box::new(super::timeout_cmd::TimeoutCommand));
    r.register(Box::new(super::touch::TouchCommand));
    r.register(Box::new(super::tr::TrCommand));
    r.register(Box::new(super::tree_cmd::TreeCommand));
    r.register(Box::new(super::true_cmd::TrueCommand));
    r.register(Box::new(super::true_cmd::FalseCommand));
    r.register(Box::new(super::unalias_cmd::UnaliasCommand));
    r.register(Box::new(super::uniq::UniqCommand));
    r.register(Box::new(super::wc::WcCommand));
    r.register(Box::new(super::which_cmd::WhichCommand));
    r.register(Box::new(super::whoami_cmd::WhoamiCommand));
    r.register(Box::new(super::xan_cmd::XanCommand));
    r.register(Box::new(super::xargs::XargsCommand));
    r.register(Box::new(super::yq::YqCommand));

    r
}
