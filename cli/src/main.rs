mod commands;
mod config;
mod groq;
mod logging;
mod supabase;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    ProfileSetArgs, cmd_calc_convert, cmd_calc_one_rm, cmd_calc_plates, cmd_calc_rest,
    cmd_data_repair, cmd_data_reset, cmd_exercises, cmd_meals_activate, cmd_meals_list,
    cmd_meals_show, cmd_profile_set, cmd_profile_show, cmd_program_activate, cmd_program_generate,
    cmd_program_list, cmd_program_show, cmd_progress, cmd_signin, cmd_signout, cmd_signup,
    cmd_stats, cmd_status, cmd_sync, cmd_template_create, cmd_template_delete, cmd_template_list,
    cmd_template_show, cmd_workout_delete, cmd_workout_list, cmd_workout_record,
    cmd_workout_show,
};
use crate::config::Config;
use crate::groq::GroqClient;
use crate::supabase::SupabaseClient;
use forma_core::FormaService;

#[derive(Parser)]
#[command(
    name = "forma",
    version,
    about = "A local-first training log with AI programs and cloud backup",
    long_about = "\n\n  ███████╗ ██████╗ ██████╗ ███╗   ███╗ █████╗
  ██╔════╝██╔═══██╗██╔══██╗████╗ ████║██╔══██╗
  █████╗  ██║   ██║██████╔╝██╔████╔██║███████║
  ██╔══╝  ██║   ██║██╔══██╗██║╚██╔╝██║██╔══██║
  ██║     ╚██████╔╝██║  ██║██║ ╚═╝ ██║██║  ██║
  ╚═╝      ╚═════╝ ╚═╝  ╚═╝╚═╝     ╚═╝╚═╝  ╚═╝
        lift, log, progress.
"
)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log and review workouts
    Workout {
        #[command(subcommand)]
        command: WorkoutCommands,
    },
    /// Manage workout templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// View or edit your training profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Training calculators
    Calc {
        #[command(subcommand)]
        command: CalcCommands,
    },
    /// Show overall workout stats
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show history and personal record for one exercise
    Progress {
        /// Exercise name (case-insensitive)
        exercise: String,
        /// Number of recent sessions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// AI-generated training programs
    Program {
        #[command(subcommand)]
        command: ProgramCommands,
    },
    /// Meal plans that come with generated programs
    Meals {
        #[command(subcommand)]
        command: MealsCommands,
    },
    /// Browse the exercise catalog
    Exercises {
        /// Muscle group: chest, back, legs, shoulders, arms, core
        #[arg(short, long)]
        muscle: Option<String>,
        /// Name contains
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Cloud backup account
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Back up pending local data to the cloud
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage local data
    Data {
        #[command(subcommand)]
        command: DataCommands,
    },
}

#[derive(Subcommand)]
enum WorkoutCommands {
    /// List recent workouts
    List {
        /// Number of workouts to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one workout with its sets
    Show {
        /// Workout ID (a unique prefix is enough)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a finished workout
    Record {
        /// Set as "Exercise=WEIGHTxREPS" (e.g. "Bench Press=100x5", "Pull Up=x8"); repeatable
        #[arg(short, long = "set", value_name = "SET")]
        sets: Vec<String>,
        /// Start from a template (ID or name)
        #[arg(short, long)]
        template: Option<String>,
        /// Workout name (default: template name or "Workout <date>")
        #[arg(short, long)]
        name: Option<String>,
        /// Date trained (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Session length in minutes
        #[arg(short, long, default_value = "60")]
        duration: u32,
        /// Notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a workout and its sets
    Delete {
        /// Workout ID (a unique prefix is enough)
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Create a template
    Create {
        /// Template name
        name: String,
        /// Exercise as "Name:SETS:REPS" (e.g. "Squat:3:8-12"); repeatable
        #[arg(short, long = "exercise", value_name = "EXERCISE", required = true)]
        exercises: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List templates
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a template
    Show {
        /// Template ID or name
        template: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a template
    Delete {
        /// Template ID or name
        template: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show your profile and daily nutrition targets
    Show {
        /// BMR formula for the targets: mifflin or harris-benedict
        #[arg(long, default_value = "mifflin")]
        formula: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update profile fields
    Set {
        #[command(flatten)]
        args: ProfileSetArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CalcCommands {
    /// Estimate a one-rep max (Epley) with a percentage table
    OneRm {
        /// Weight lifted
        weight: f64,
        /// Reps performed
        reps: u32,
        /// kg or lbs (default: profile unit)
        #[arg(short, long)]
        unit: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Plates to load per side for a barbell weight
    Plates {
        /// Total bar weight
        weight: f64,
        /// kg or lbs (default: profile unit)
        #[arg(short, long)]
        unit: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Convert between kg and lbs
    Convert {
        /// Value to convert
        value: f64,
        /// Unit of the value: kg or lbs
        from: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse a rest time ("1:30", "90s") or list the presets
    Rest {
        /// Rest time
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProgramCommands {
    /// Generate a program and meal plan from your profile
    Generate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List programs
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a program (default: the active one)
    Show {
        /// Program ID (a unique prefix is enough)
        id: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Make a program the active one
    Activate {
        /// Program ID (a unique prefix is enough)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MealsCommands {
    /// List meal plans
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a meal plan (default: the active one)
    Show {
        /// Meal plan ID (a unique prefix is enough)
        id: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Make a meal plan the active one
    Activate {
        /// Meal plan ID (a unique prefix is enough)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Create an account and back up local data
    Signup {
        /// Email address
        email: String,
        /// Password (prompted when omitted)
        #[arg(long, env = "FORMA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign in and back up local data
    Signin {
        /// Email address
        email: String,
        /// Password (prompted when omitted)
        #[arg(long, env = "FORMA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign out (local data is kept)
    Signout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show sign-in and backup state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum DataCommands {
    /// Erase all local data
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move an unreadable collection aside so it reads as empty
    Repair {
        /// Collection key (e.g. workouts, workout_sets, templates, profile)
        key: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn supabase_client(config: &Config) -> Result<SupabaseClient> {
    SupabaseClient::new(config.supabase()?)
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let svc = FormaService::new(&config.db_path)?;

    match cli.command {
        Commands::Workout { command } => match command {
            WorkoutCommands::List { limit, json } => cmd_workout_list(&svc, limit, json),
            WorkoutCommands::Show { id, json } => cmd_workout_show(&svc, &id, json),
            WorkoutCommands::Record {
                sets,
                template,
                name,
                date,
                duration,
                notes,
                json,
            } => cmd_workout_record(
                &svc,
                template.as_deref(),
                name,
                &sets,
                date,
                duration,
                notes,
                json,
            ),
            WorkoutCommands::Delete { id, yes, json } => cmd_workout_delete(&svc, &id, yes, json),
        },
        Commands::Template { command } => match command {
            TemplateCommands::Create {
                name,
                exercises,
                json,
            } => cmd_template_create(&svc, &name, &exercises, json),
            TemplateCommands::List { json } => cmd_template_list(&svc, json),
            TemplateCommands::Show { template, json } => cmd_template_show(&svc, &template, json),
            TemplateCommands::Delete { template, json } => {
                cmd_template_delete(&svc, &template, json)
            }
        },
        Commands::Profile { command } => match command {
            ProfileCommands::Show { formula, json } => cmd_profile_show(&svc, &formula, json),
            ProfileCommands::Set { args, json } => cmd_profile_set(&svc, args, json),
        },
        Commands::Calc { command } => match command {
            CalcCommands::OneRm {
                weight,
                reps,
                unit,
                json,
            } => cmd_calc_one_rm(&svc, weight, reps, unit.as_deref(), json),
            CalcCommands::Plates { weight, unit, json } => {
                cmd_calc_plates(&svc, weight, unit.as_deref(), json)
            }
            CalcCommands::Convert { value, from, json } => cmd_calc_convert(value, &from, json),
            CalcCommands::Rest { time, json } => cmd_calc_rest(time.as_deref(), json),
        },
        Commands::Stats { json } => cmd_stats(&svc, json),
        Commands::Progress {
            exercise,
            limit,
            json,
        } => cmd_progress(&svc, &exercise, limit, json),
        Commands::Program { command } => match command {
            ProgramCommands::Generate { json } => {
                let groq =
                    GroqClient::new(&config.groq_url, config.groq_api_key()?, &config.groq_model)?;
                cmd_program_generate(&svc, &groq, json).await
            }
            ProgramCommands::List { json } => cmd_program_list(&svc, json),
            ProgramCommands::Show { id, json } => cmd_program_show(&svc, id.as_deref(), json),
            ProgramCommands::Activate { id, json } => cmd_program_activate(&svc, &id, json),
        },
        Commands::Meals { command } => match command {
            MealsCommands::List { json } => cmd_meals_list(&svc, json),
            MealsCommands::Show { id, json } => cmd_meals_show(&svc, id.as_deref(), json),
            MealsCommands::Activate { id, json } => cmd_meals_activate(&svc, &id, json),
        },
        Commands::Exercises {
            muscle,
            search,
            json,
        } => {
            let client = match config.supabase {
                Some(ref sb) => Some(SupabaseClient::new(sb)?),
                None => None,
            };
            cmd_exercises(
                &svc,
                client.as_ref(),
                muscle.as_deref(),
                search.as_deref(),
                json,
            )
            .await
        }
        Commands::Account { command } => match command {
            AccountCommands::Signup {
                email,
                password,
                json,
            } => cmd_signup(&svc, &supabase_client(&config)?, &email, password, json).await,
            AccountCommands::Signin {
                email,
                password,
                json,
            } => cmd_signin(&svc, &supabase_client(&config)?, &email, password, json).await,
            AccountCommands::Signout { json } => {
                cmd_signout(&svc, &supabase_client(&config)?, json).await
            }
            AccountCommands::Status { json } => {
                cmd_status(&svc, config.supabase.is_some(), json)
            }
        },
        Commands::Sync { json } => cmd_sync(&svc, &supabase_client(&config)?, json).await,
        Commands::Data { command } => match command {
            DataCommands::Reset { yes, json } => cmd_data_reset(&svc, yes, json),
            DataCommands::Repair { key, json } => cmd_data_repair(&svc, &key, json),
        },
    }
}
