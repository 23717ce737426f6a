pub mod commands;
pub mod output;

use crate::errors::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "restack")]
#[command(about = "Stacked-branch rebase tools for Git")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rebase every stack of branches under a prefix onto a target branch
    Rebase {
        /// Branch prefix selecting the stacks (e.g. "feature/")
        prefix: String,

        /// Branch to rebase onto
        #[arg(long, default_value = "main")]
        onto: String,

        /// Answer yes to the merged-branch deletion prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Re-anchor dependent branches after the current branch was amended
    Evolve {
        /// Previous position of the current branch (defaults to HEAD@{1})
        old: Option<String>,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Push every branch under a prefix that differs from its remote
    Push {
        /// Branch prefix selecting the branches
        prefix: String,

        /// Extra options passed through to `git push`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        push_opts: Vec<String>,
    },

    /// Delete local branches whose upstream is gone
    PruneLocal {
        /// Only report what would be deleted
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete remote branches under a prefix that are obsolete in the target
    PruneRemote {
        /// Branch prefix selecting the remote branches
        prefix: String,

        /// Target branch the obsolescence check runs against
        #[arg(long, default_value = "main")]
        onto: String,

        /// Only report what would be deleted
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        self.setup_logging();

        match self.command {
            Commands::Rebase { prefix, onto, yes } => commands::rebase::run(&prefix, &onto, yes),
            Commands::Evolve { old, yes } => commands::evolve::run(old.as_deref(), yes),
            Commands::Push { prefix, push_opts } => commands::push::run(&prefix, &push_opts),
            Commands::PruneLocal { dry_run } => commands::prune::run_local(dry_run),
            Commands::PruneRemote {
                prefix,
                onto,
                dry_run,
                yes,
            } => commands::prune::run_remote(&prefix, &onto, dry_run, yes),
            Commands::Completions { shell } => commands::completions::run(shell),
        }
    }

    fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr);

        if self.no_color {
            subscriber.with_ansi(false).init();
        } else {
            subscriber.init();
        }

        if self.no_color {
            console::set_colors_enabled(false);
        }
    }
}
