//! Quiniela CLI
//!
//! Football match outcome prediction and home-win value picks.

use clap::{Parser, Subcommand};
use quiniela::{Config, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quiniela")]
#[command(about = "Football match outcome prediction with value picks", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the match database path
    #[arg(long, env = "DATA_DB", global = true)]
    database: Option<PathBuf>,

    /// Override the model artifact path
    #[arg(long, env = "MODEL_PATH", global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Train the calibrated boosted-tree model
    Train,
    /// Rank home-win value picks
    Predict {
        /// Minimum home-win probability
        #[arg(long)]
        threshold: Option<f64>,
        /// Minimum edge over the market implied probability
        #[arg(long)]
        min_value: Option<f64>,
        /// Show probabilities for every match instead of picks
        #[arg(long)]
        all: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// List stored matches
    Matches {
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import matches from a CSV file
    Import {
        /// CSV file with match_id,date,home_team,away_team,home_goals,away_goals[,odds...]
        file: PathBuf,
    },
    /// Show database status
    Status,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show model information
    Info,
}

#[derive(Clone, Copy, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let mut config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };
    if let Some(database) = cli.database {
        config.data.database_path = database;
    }
    if let Some(model) = cli.model {
        config.data.model_path = model;
    }

    // Run command
    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Import { file } => commands::data_import(&config, &file),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Train => commands::train(&config),
        Commands::Predict {
            threshold,
            min_value,
            all,
            format,
        } => commands::predict(&config, threshold, min_value, all, format),
        Commands::Matches { format } => commands::matches(&config, format),
        Commands::Model { action } => match action {
            ModelCommands::Info => commands::model_info(&config),
        },
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use quiniela::data::{read_csv_file, Database};
    use quiniela::model::ModelArtifact;
    use quiniela::predict::Predictor;
    use quiniela::training::Trainer;
    use serde::Serialize;
    use std::path::Path;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        for path in [&config.data.database_path, &config.data.model_path] {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        println!("Created data/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'quiniela data import matches.csv' to load match data");
        println!("  3. Run 'quiniela train' to train the model");
        println!("  4. Run 'quiniela predict' to list value picks");

        Ok(())
    }

    pub fn data_import(config: &Config, file: &Path) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;

        println!("Importing matches from {}...", file.display());
        let import = read_csv_file(file)?;
        if import.skipped > 0 {
            println!("Skipped {} invalid rows", import.skipped);
        }

        let count = db.upsert_matches(&import.records)?;
        println!(
            "Stored {} matches in database ({} resolved, {} upcoming)",
            count,
            import.resolved(),
            count - import.resolved()
        );

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", config.data.database_path.display());
        println!("  Teams:    {}", stats.team_count);
        println!("  Matches:  {}", stats.match_count);
        println!("  Resolved: {}", stats.resolved_count);
        println!(
            "  Upcoming: {}",
            stats.match_count - stats.resolved_count
        );
        if let (Some(earliest), Some(latest)) = (stats.earliest_match, stats.latest_match) {
            println!("  Range:    {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn train(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let matches = db.get_all_matches()?;
        println!("Loaded {} matches", matches.len());

        let trainer = Trainer::new(config.clone());
        let path = trainer.train(&matches)?;
        println!("Model saved to {}", path.display());

        Ok(())
    }

    pub fn predict(
        config: &Config,
        threshold: Option<f64>,
        min_value: Option<f64>,
        all: bool,
        format: OutputFormat,
    ) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let matches = db.get_all_matches()?;
        let predictor = Predictor::load(config);

        if all {
            let predictions = predictor.predict(&matches);
            return match format {
                OutputFormat::Table => {
                    println!(
                        "{:<12} {:<10} {:<20} {:<20} {:>6} {:>6} {:>6} {:>7} {:>6}",
                        "Match", "Date", "Home", "Away", "Home%", "Draw%", "Away%", "Implied", "Result"
                    );
                    for p in &predictions {
                        println!(
                            "{:<12} {:<10} {:<20} {:<20} {:>6.3} {:>6.3} {:>6.3} {:>7.3} {:>6}",
                            p.match_id,
                            p.date,
                            p.home_team,
                            p.away_team,
                            p.p_home,
                            p.p_draw,
                            p.p_away,
                            p.implied_home,
                            p.result.map(|r| r.to_string()).unwrap_or_else(|| "-".into())
                        );
                    }
                    Ok(())
                }
                OutputFormat::Json => print_json(&predictions),
                OutputFormat::Csv => print_csv(&predictions),
            };
        }

        let picks = predictor.picks(&matches, threshold, min_value);
        match format {
            OutputFormat::Table => {
                if picks.is_empty() {
                    println!("No picks meet the threshold and value criteria");
                    return Ok(());
                }
                println!(
                    "{:<12} {:<10} {:<20} {:<20} {:<5} {:>6} {:>6} {:>7}",
                    "Match", "Date", "Home", "Away", "Pick", "Prob", "Value", "Implied"
                );
                for pick in &picks {
                    println!(
                        "{:<12} {:<10} {:<20} {:<20} {:<5} {:>6.3} {:>+6.3} {:>7.3}",
                        pick.match_id,
                        pick.date,
                        pick.home_team,
                        pick.away_team,
                        pick.side.to_string(),
                        pick.probability,
                        pick.value,
                        pick.implied_home
                    );
                }
                Ok(())
            }
            OutputFormat::Json => print_json(&picks),
            OutputFormat::Csv => print_csv(&picks),
        }
    }

    pub fn matches(config: &Config, format: OutputFormat) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let matches = db.get_all_matches()?;

        match format {
            OutputFormat::Table => {
                println!(
                    "{:<12} {:<10} {:<20} {:<20} {:>5} {:>6} {:>6} {:>6}",
                    "Match", "Date", "Home", "Away", "Score", "1", "X", "2"
                );
                for m in &matches {
                    let score = m
                        .score()
                        .map(|(h, a)| format!("{}-{}", h, a))
                        .unwrap_or_else(|| "-".into());
                    println!(
                        "{:<12} {:<10} {:<20} {:<20} {:>5} {:>6} {:>6} {:>6}",
                        m.match_id,
                        m.date,
                        m.home_team,
                        m.away_team,
                        score,
                        fmt_odd(m.odds_home),
                        fmt_odd(m.odds_draw),
                        fmt_odd(m.odds_away)
                    );
                }
                println!("\n{} matches", matches.len());
                Ok(())
            }
            OutputFormat::Json => print_json(&matches),
            OutputFormat::Csv => print_csv(&matches),
        }
    }

    pub fn model_info(config: &Config) -> Result<()> {
        let path = &config.data.model_path;

        println!("Model Information");
        println!("───────────────────────────────");
        println!("  Path:       {}", path.display());

        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(_) => {
                println!("  Exists:     no");
                println!("\nPredictions will use implied probabilities from odds.");
                return Ok(());
            }
        };
        println!("  Exists:     yes");
        println!("  Size:       {} bytes", metadata.len());

        let artifact = match ModelArtifact::load(path) {
            Ok(a) => a,
            Err(e) => {
                println!("  Loadable:   no ({})", e);
                return Ok(());
            }
        };
        let report = &artifact.report;
        let [away, draw, home] = report.class_counts;

        println!("  Loadable:   yes");
        println!("  Created:    {}", artifact.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("  Window:     {}", artifact.window);
        println!("  Features:   {}", artifact.feature_names.join(", "));
        println!("  Trees:      {}", artifact.model.classifier().tree_count());
        println!(
            "  Examples:   {} labeled ({} train / {} holdout)",
            report.labeled, report.train_size, report.holdout_size
        );
        println!(
            "  Classes:    HOME {} / DRAW {} / AWAY {}",
            home, draw, away
        );
        println!("  Raw:        {}", report.raw);
        println!("  Calibrated: {}", report.calibrated);

        Ok(())
    }

    fn fmt_odd(odd: Option<f64>) -> String {
        odd.map(|o| format!("{:.2}", o))
            .unwrap_or_else(|| "-".into())
    }

    fn print_json<T: Serialize>(rows: &[T]) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(rows)?);
        Ok(())
    }

    fn print_csv<T: Serialize>(rows: &[T]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(std::io::stdout());
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
