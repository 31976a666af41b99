use clap::{CommandFactory, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "semana-cli", version, about = "Semana CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Project management
    Project {
        #[command(subcommand)]
        action: commands::project::ProjectAction,
    },
    /// Work session logging
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Time-based task recommendations
    Recommend(commands::recommend::RecommendArgs),
    /// Workload and context analysis
    Context {
        #[command(subcommand)]
        action: commands::context::ContextAction,
    },
    /// Recommendation feedback and learning state
    Feedback {
        #[command(subcommand)]
        action: commands::feedback::FeedbackCliAction,
    },
    /// Weekly plan management
    Plan {
        #[command(subcommand)]
        action: commands::plan::PlanAction,
    },
    /// Proactive notifications and reminders
    Notify {
        #[command(subcommand)]
        action: commands::notify::NotifyAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action),
        Commands::Project { action } => commands::project::run(action),
        Commands::Session { action } => commands::session::run(action),
        Commands::Recommend(args) => commands::recommend::run(args),
        Commands::Context { action } => commands::context::run(action),
        Commands::Feedback { action } => commands::feedback::run(action),
        Commands::Plan { action } => commands::plan::run(action),
        Commands::Notify { action } => commands::notify::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
