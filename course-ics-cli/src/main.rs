mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "course-ics")]
#[command(about = "Compile a course schedule into calendar events")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// IANA timezone the schedule is written in
    #[arg(long, global = true, default_value = course_ics_core::DEFAULT_TIMEZONE)]
    timezone: String,

    /// Term start for courses missing from the reference table (YYYY-MM-DD)
    #[arg(long, global = true)]
    term_start: Option<String>,

    /// Term end for courses missing from the reference table (YYYY-MM-DD)
    #[arg(long, global = true)]
    term_end: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile course records into an .ics file
    Generate {
        /// JSON file with course records
        #[arg(short, long)]
        input: String,

        /// JSON reference table (location and term dates per course)
        #[arg(short, long)]
        reference: Option<String>,

        /// Output file path
        #[arg(short, long)]
        output: Option<String>,

        /// Calendar name
        #[arg(long)]
        calendar_name: Option<String>,

        /// Reminder before each meeting, in minutes
        #[arg(long)]
        reminder_minutes: Option<u32>,
    },

    /// Print one Google Calendar quick-add link per event
    Links {
        #[arg(short, long)]
        input: String,

        #[arg(short, long)]
        reference: Option<String>,
    },

    /// Print the review table as JSON
    Normalize {
        #[arg(short, long)]
        input: String,

        #[arg(short, long)]
        reference: Option<String>,
    },

    /// Inspect a reference table
    Reference {
        /// JSON reference table; an empty table when omitted
        #[arg(short, long, global = true)]
        file: Option<String>,

        #[command(subcommand)]
        action: ReferenceCommands,
    },
}

#[derive(Subcommand)]
enum ReferenceCommands {
    /// List every entry
    List,

    /// Resolve a course code through the lookup chain
    Lookup {
        /// Course code, e.g. MBA201A.1
        code: String,
    },

    /// Write the table back out as JSON
    Export {
        /// Output file path
        output: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("course_ics_cli={log_level},course_ics_core={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = commands::Settings::new(
        &cli.timezone,
        cli.term_start.as_deref(),
        cli.term_end.as_deref(),
    )?;

    match cli.command {
        Commands::Generate {
            input,
            reference,
            output,
            calendar_name,
            reminder_minutes,
        } => commands::generate_command(
            &settings,
            commands::GenerateParams {
                input,
                reference,
                output,
                calendar_name,
                reminder_minutes,
            },
        ),

        Commands::Links { input, reference } => {
            commands::links_command(&settings, &input, reference.as_deref())
        }

        Commands::Normalize { input, reference } => {
            commands::normalize_command(&settings, &input, reference.as_deref())
        }

        Commands::Reference { file, action } => match action {
            ReferenceCommands::List => commands::reference_list_command(file.as_deref()),
            ReferenceCommands::Lookup { code } => {
                commands::reference_lookup_command(&settings, file.as_deref(), &code)
            }
            ReferenceCommands::Export { output } => {
                commands::reference_export_command(file.as_deref(), &output)
            }
        },
    }
}
