use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use student_risk_engine::config::AppConfig;
use student_risk_engine::intervention;
use student_risk_engine::models::{NewStudent, RawMetrics};
use student_risk_engine::prediction::ConfiguredPrediction;
use student_risk_engine::reconcile::{admit_student, rescore_record};
use student_risk_engine::{assess_with_fallback, db, reconcile, report, telemetry, RiskEngine};

#[derive(Parser)]
#[command(name = "student-risk")]
#[command(about = "Student dropout and wellbeing risk scoring", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct MetricArgs {
    #[arg(long)]
    attendance: Option<f64>,
    #[arg(long)]
    grades: Option<f64>,
    #[arg(long)]
    assignments: Option<f64>,
    /// One of good/okay/bad, or free text describing how the student feels
    #[arg(long)]
    mood: Option<String>,
}

impl MetricArgs {
    fn into_raw(self) -> RawMetrics {
        RawMetrics {
            attendance_pct: self.attendance,
            grade_pct: self.grades,
            pending_assignments: self.assignments,
            mood_signal: self.mood,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Admit students from a CSV file, scoring each row
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Add one student by hand, scoring the submitted metrics
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        cohort: String,
        #[command(flatten)]
        metrics: MetricArgs,
        /// First note for the student's record
        #[arg(long)]
        note: Option<String>,
    },
    /// Print a student's profile with scores, intervention and notes
    Show {
        #[arg(long)]
        email: String,
    },
    /// Score one set of metrics without storing anything
    Assess {
        #[command(flatten)]
        metrics: MetricArgs,
        /// Consult the prediction service when PREDICT_URL is set
        #[arg(long)]
        remote: bool,
        /// Print the assessment as JSON
        #[arg(long)]
        json: bool,
    },
    /// Submit new metrics for a stored student and rescore
    Submit {
        #[arg(long)]
        email: String,
        #[command(flatten)]
        metrics: MetricArgs,
    },
    /// Count students per risk level
    Summary {
        #[arg(long)]
        cohort: Option<String>,
    },
    /// List students in crisis or at HIGH risk
    Alerts {
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Append a note to a student's record
    Note {
        #[arg(long)]
        email: String,
        #[arg(long)]
        text: String,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to a Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("invalid configuration")?;
    telemetry::init(&config.log_level)?;

    let engine = RiskEngine::new(config.engine).context("invalid scoring configuration")?;
    let predictor = ConfiguredPrediction::from_config(&config.prediction)
        .context("failed to build prediction client")?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            db::seed(&pool, &engine).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let outcome = db::import_csv(&pool, &engine, &predictor, &csv).await?;
            println!(
                "Imported {} students from {}.",
                outcome.imported,
                csv.display()
            );
            for rejection in &outcome.rejected {
                println!(
                    "- skipped line {} ({}): {}",
                    rejection.line,
                    rejection.email.as_deref().unwrap_or("no email"),
                    rejection.reason
                );
            }
        }
        Commands::Add {
            name,
            email,
            cohort,
            metrics,
            note,
        } => {
            let pool = connect(&config).await?;
            let student = NewStudent {
                name,
                email,
                cohort,
            };
            let record = admit_student(
                &engine,
                &predictor,
                student,
                &metrics.into_raw(),
                note.as_deref(),
                Utc::now(),
            )
            .await?;
            db::save_admission(&pool, &record).await?;
            println!(
                "{} added at {}% ({}).",
                record.name, record.assessment.risk_percentage, record.assessment.risk_level
            );
            if record.assessment.crisis_flag || record.metrics.crisis_language {
                println!("CRISIS: escalate to counseling immediately.");
            }
        }
        Commands::Show { email } => {
            let pool = connect(&config).await?;
            let record = db::fetch_record(&pool, engine.classifier(), &email)
                .await?
                .with_context(|| format!("no student with email {email}"))?;
            print!("{}", report::build_profile(&record));
        }
        Commands::Assess {
            metrics,
            remote,
            json,
        } => {
            let raw = metrics.into_raw();
            let (_, assessment) = if remote {
                assess_with_fallback(&engine, &predictor, &raw).await?
            } else {
                let metrics = engine.normalize(&raw)?;
                let assessment = engine.score(&metrics);
                (metrics, assessment)
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&assessment)?);
                return Ok(());
            }

            println!(
                "{}% risk ({} level, {:?} estimate)",
                assessment.risk_percentage, assessment.risk_level, assessment.source
            );
            println!(
                "academic {:.1}, sentiment {:.1}",
                assessment.academic_risk, assessment.sentiment_risk
            );
            if let Some((action, crisis)) = intervention::for_assessment(&assessment) {
                println!("{}: {}", action.title, action.message);
                if crisis {
                    println!("CRISIS: escalate to counseling immediately.");
                }
            }
        }
        Commands::Submit { email, metrics } => {
            let pool = connect(&config).await?;
            let mut record = db::fetch_record(&pool, engine.classifier(), &email)
                .await?
                .with_context(|| format!("no student with email {email}"))?;
            rescore_record(&engine, &predictor, &mut record, &metrics.into_raw()).await?;
            db::upsert_student(&pool, &record).await?;
            println!(
                "{} rescored at {}% ({}).",
                record.name, record.assessment.risk_percentage, record.assessment.risk_level
            );
        }
        Commands::Summary { cohort } => {
            let pool = connect(&config).await?;
            let records =
                db::fetch_records(&pool, engine.classifier(), cohort.as_deref()).await?;
            let summary = reconcile::summarize(&records);
            println!(
                "HIGH {} | MEDIUM {} | LOW {} | unknown {} | total {}",
                summary.high, summary.medium, summary.low, summary.unknown, summary.total
            );
        }
        Commands::Alerts { cohort, limit } => {
            let pool = connect(&config).await?;
            let records =
                db::fetch_records(&pool, engine.classifier(), cohort.as_deref()).await?;
            let alerts = reconcile::alerts(&records);

            if alerts.is_empty() {
                println!("No students need urgent attention.");
                return Ok(());
            }

            for alert in alerts.iter().take(limit) {
                println!(
                    "- {}{} ({}) {}% {}: \"{}\"",
                    if alert.crisis { "[CRISIS] " } else { "" },
                    alert.record.name,
                    alert.record.email,
                    alert.record.assessment.risk_percentage,
                    alert.record.assessment.risk_level,
                    alert.record.metrics.mood_text
                );
            }
        }
        Commands::Note { email, text } => {
            let pool = connect(&config).await?;
            db::append_note(&pool, &email, &text, Utc::now()).await?;
            println!("Note added for {email}.");
        }
        Commands::Report { cohort, out } => {
            let pool = connect(&config).await?;
            let records =
                db::fetch_records(&pool, engine.classifier(), cohort.as_deref()).await?;
            let report = report::build_report(cohort.as_deref(), Utc::now(), &records);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
