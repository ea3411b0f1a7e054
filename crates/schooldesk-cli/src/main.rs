use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use dotenvy::dotenv;
use schooldesk_cli::overdue;
use schooldesk_cli::seeder::{self, LibraryPerSchool, RosterPerSchool, SeedConfig};
use schooldesk_config::LibraryPolicy;
use schooldesk_db::{PgPool, init_db_pool, run_migrations};
use schooldesk_models::SchoolId;

#[derive(Parser)]
#[command(name = "schooldesk-cli")]
#[command(about = "SchoolDesk CLI - seeding and library reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed fake schools with classes, students, library members and book copies
    Seed {
        /// Number of schools to create
        #[arg(short = 's', long, default_value = "2")]
        schools: usize,

        /// Number of classes per school
        #[arg(long, default_value = "6")]
        classes: usize,

        /// Number of students per class
        #[arg(long, default_value = "30")]
        students: usize,

        /// Number of staff library members per school
        #[arg(long, default_value = "10")]
        staff: usize,

        /// Number of book copies per school
        #[arg(long, default_value = "200")]
        copies: usize,
    },
    /// Delete every school and everything that belongs to it
    ClearSeed {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Print open loans past their due date with the fine a return would record
    Overdue {
        /// Report date (YYYY-MM-DD), defaults to today
        #[arg(short = 'd', long)]
        date: Option<NaiveDate>,

        /// Limit the report to one school
        #[arg(long)]
        school: Option<SchoolId>,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();

    let pool = match init_db_pool().await {
        Ok(pool) => pool,
        Err(e) => fail("connecting to the database", e),
    };
    if let Err(e) = run_migrations(&pool).await {
        fail("applying migrations", e);
    }

    match cli.command {
        Commands::Seed {
            schools,
            classes,
            students,
            staff,
            copies,
        } => handle_seed(&pool, schools, classes, students, staff, copies).await,
        Commands::ClearSeed { yes } => handle_clear_seed(&pool, yes).await,
        Commands::Overdue { date, school } => handle_overdue(&pool, date, school).await,
    }
}

fn fail(action: &str, e: impl std::fmt::Display) -> ! {
    eprintln!("\n❌ Error {}: {}", action, e);
    std::process::exit(1);
}

async fn handle_seed(
    pool: &PgPool,
    schools: usize,
    classes: usize,
    students: usize,
    staff: usize,
    copies: usize,
) {
    let config = SeedConfig::new(schools)
        .with_roster(RosterPerSchool {
            classes,
            students_per_class: students,
        })
        .with_library(LibraryPerSchool {
            staff_members: staff,
            copies,
            ..Default::default()
        });

    if let Err(e) = seeder::seed_all(pool, config).await {
        fail("seeding database", e);
    }
}

async fn handle_clear_seed(pool: &PgPool, yes: bool) {
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Delete all schools, rosters, library data and attendance?")
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            println!("Aborted");
            return;
        }
    }

    if let Err(e) = seeder::clear_all(pool).await {
        fail("clearing seeded data", e);
    }
}

async fn handle_overdue(pool: &PgPool, date: Option<NaiveDate>, school: Option<SchoolId>) {
    let as_of = date.unwrap_or_else(|| Local::now().date_naive());
    let policy = LibraryPolicy::from_env();

    match overdue::find_overdue(pool, as_of, school).await {
        Ok(loans) if loans.is_empty() => println!("✅ No overdue loans as of {}", as_of),
        Ok(loans) => {
            for line in overdue::render(&loans, as_of, &policy) {
                println!("{}", line);
            }
        }
        Err(e) => fail("fetching overdue loans", e),
    }
}
