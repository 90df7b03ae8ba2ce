//! scriptql: transpile resolved scripts from the command line
//!
//! # Usage
//!
//! ```bash
//! # Emit PostgreSQL for a serialized script model
//! scriptql transpile script.json --metadata catalog.json --dialect postgres
//!
//! # Per-statement breakdown with mappers
//! scriptql explain script.json --metadata catalog.json
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use scriptql::prelude::*;

#[derive(Parser)]
#[command(name = "scriptql")]
#[command(version)]
#[command(about = "Transpile resolved data-access scripts into MS-SQL or PostgreSQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    scriptql transpile script.json --metadata catalog.json
    scriptql transpile - --dialect pg --year-offset 2000 < script.json
    scriptql explain script.json --metadata catalog.json --json")]
struct Cli {
    /// Configuration file (defaults to ./scriptql.toml, then the user config dir)
    #[arg(short, long, global = true, env = "SCRIPTQL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ScriptArgs {
    /// Script model as JSON; `-` reads stdin
    script: PathBuf,

    /// Metadata catalog as JSON
    #[arg(short, long, env = "SCRIPTQL_METADATA")]
    metadata: Option<PathBuf>,

    /// Target dialect (overrides the configuration file)
    #[arg(short, long, value_enum)]
    dialect: Option<Dialect>,

    /// Years added to datetime literals (overrides configuration and metadata)
    #[arg(short, long, allow_negative_numbers = true)]
    year_offset: Option<i32>,

    /// Print the full output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the generated SQL script
    Transpile(ScriptArgs),
    /// Show every statement with its SQL, mapper and deferred functions
    Explain(ScriptArgs),
    /// List supported dialects
    Dialects,
}

fn main() {
    let cli = Cli::parse();

    let config = match TranspilerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(2);
        }
    };
    init_tracing(&config.log_level);

    let result = match &cli.command {
        Commands::Transpile(args) => transpile(args, config),
        Commands::Explain(args) => explain(args, config),
        Commands::Dialects => {
            show_dialects();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// RUST_LOG wins over the configured level.
fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &ScriptArgs, mut config: TranspilerConfig) -> Result<TranspilerOutput> {
    let model = read_model(&args.script)?;
    let metadata = match &args.metadata {
        Some(path) => InMemoryMetadata::load(path)
            .with_context(|| format!("failed to load metadata from {}", path.display()))?,
        None => InMemoryMetadata::new(),
    };

    if let Some(dialect) = args.dialect {
        config.dialect = dialect;
    }
    config.year_offset = args
        .year_offset
        .or_else(|| (config.year_offset == 0).then(|| metadata.year_offset()))
        .unwrap_or(config.year_offset);
    tracing::info!(
        dialect = %config.dialect,
        year_offset = config.year_offset,
        statements = model.statements.len(),
        "transpiling script"
    );

    let functions = FunctionRegistry::default();
    let output = Transpiler::from_config(&config, &metadata, &functions).transpile(&model)?;
    Ok(output)
}

fn read_model(path: &Path) -> Result<ScriptModel> {
    let json = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read script from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&json).context("invalid script model")
}

fn transpile(args: &ScriptArgs, config: TranspilerConfig) -> Result<()> {
    let output = run(args, config)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", output.script);
    }
    Ok(())
}

fn explain(args: &ScriptArgs, config: TranspilerConfig) -> Result<()> {
    let dialect = args.dialect.unwrap_or(config.dialect);
    let output = run(args, config)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&output.statements)?);
        return Ok(());
    }

    println!("{} {}", "Dialect:".dimmed(), dialect.name().cyan());
    for (index, statement) in output.statements.iter().enumerate() {
        println!();
        println!(
            "{} {} {}",
            format!("[{}]", index + 1).white().bold(),
            "node".dimmed(),
            statement.node.to_string().yellow()
        );
        if statement.script.is_empty() {
            println!("  {}", "(no SQL emitted)".dimmed());
        } else {
            for line in statement.script.lines() {
                println!("  {}", line.white());
            }
        }

        if !statement.mapper.is_empty() {
            println!(
                "  {} {} ({} columns)",
                "Mapper:".green().bold(),
                statement.mapper.name.cyan(),
                statement.mapper.column_count()
            );
            for property in &statement.mapper.properties {
                let columns: Vec<&str> = property.columns.iter().map(|column| column.name.as_str()).collect();
                println!("    • {} {}", property.name.white(), columns.join(", ").dimmed());
            }
        }

        for function in &statement.functions {
            println!(
                "  {} {} -> {}",
                "Deferred:".yellow().bold(),
                function.name.cyan(),
                function.target.white()
            );
        }
    }
    Ok(())
}

fn show_dialects() {
    let dialects = [
        (Dialect::SqlServer, "mssql", "Microsoft SQL Server (T-SQL)"),
        (Dialect::Postgres, "pg", "PostgreSQL"),
    ];

    println!(
        "{:12} {:16} {}",
        "Dialect".white().bold(),
        "Aliases".white().bold(),
        "Backend".white().bold()
    );
    println!("{}", "─".repeat(50).dimmed());
    for (dialect, aliases, backend) in dialects {
        println!("{:12} {:16} {}", dialect.name().cyan().bold(), aliases.yellow(), backend);
    }

    let constructs = [
        ("CONSUME", "DELETE ... OUTPUT deleted.*", "DELETE ... USING ... RETURNING"),
        ("CONSUME locking", "ROWLOCK, READPAST", "FOR UPDATE SKIP LOCKED"),
        ("UPSERT", "UPDATE WITH (UPDLOCK) + INSERT", "UPDATE + INSERT"),
        ("TOP n", "SELECT TOP (n)", "LIMIT n"),
        ("CROSS APPLY", "CROSS APPLY", "INNER JOIN LATERAL ... ON TRUE"),
        ("DECLARE @t", "DECLARE @t TABLE", "CREATE TEMPORARY TABLE"),
        ("CREATE TYPE", "AS TABLE", "composite type"),
        ("APPLY SEQUENCE", "INSTEAD OF INSERT trigger", "BEFORE INSERT trigger"),
        ("VECTOR(seq)", "NEXT VALUE FOR seq", "nextval('seq')"),
        ("ISNULL", "ISNULL", "COALESCE"),
        ("CHARLENGTH", "LEN", "LENGTH"),
    ];

    println!();
    println!(
        "{:16} {:32} {}",
        "Construct".white().bold(),
        "sqlserver".white().bold(),
        "postgres".white().bold()
    );
    println!("{}", "─".repeat(80).dimmed());
    for (construct, sqlserver, postgres) in constructs {
        println!("{:16} {:32} {}", construct.cyan(), sqlserver, postgres.dimmed());
    }
}
