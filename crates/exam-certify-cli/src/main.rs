//! ExamCertify CLI: `examctl` command.
//!
//! Operator interface for the exam engine: run the expiry sweep, route and
//! grade submissions, re-evaluate certification, and verify issued
//! certificates.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use exam_certify::certify::{parse_certificate, verify_certificate};
use exam_certify::crypto::IssuerKey;
use exam_certify::{
    CandidateId, Certification, EngineConfig, ExamEngine, ExaminerId, GradeDisposition,
    InMemoryCatalog, InMemoryDirectory, QuestionGrade, SubmissionId, SweepReport, TrackId,
};

// ── Time formatting helpers ───────────────────────────────────────────────────

fn micros_to_datetime(micros: u64) -> String {
    let secs = (micros / 1_000_000) as i64;
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("{micros}us"))
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// ExamCertify CLI: operate the exam lifecycle and grading engine.
#[derive(Parser, Debug)]
#[command(
    name = "examctl",
    about = "ExamCertify CLI",
    version,
    long_about = "examctl: ExamCertify CLI\n\nRun expiry sweeps, assign and grade submissions,\nre-evaluate certification and verify certificates."
)]
struct Cli {
    /// Configuration file (default: <data-dir>/config.json if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides the configured one)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Force-submit and complete every expired exam
    Sweep {
        /// Keep running, once per configured sweep interval
        #[arg(long)]
        watch: bool,
    },

    /// Assign a submitted exam to an examiner
    Assign {
        /// Submission ID (asub_...)
        #[arg(long)]
        submission: String,

        /// Examiner ID
        #[arg(long)]
        examiner: String,
    },

    /// Grade a submission under review
    Grade {
        /// Submission ID (asub_...)
        #[arg(long)]
        submission: String,

        /// Examiner ID
        #[arg(long)]
        examiner: String,

        /// JSON array of {"question", "raw_score", "feedback"?}; prefix with @ to read a file
        #[arg(long)]
        grades: String,

        /// Total the examiner's tool computed; only compared, never trusted
        #[arg(long)]
        claimed_total: Option<f64>,
    },

    /// Re-evaluate certification for a candidate and track
    Reevaluate {
        #[arg(long)]
        candidate: String,

        #[arg(long)]
        track: String,
    },

    /// Show a candidate's module statuses and scores
    Status {
        #[arg(long)]
        candidate: String,
    },

    /// Verify a certificate file's signature
    VerifyCertificate {
        /// Path to the certificate JSON
        path: PathBuf,
    },
}

// ── Main entry point ──────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = resolve_config(cli.config.as_deref(), cli.data_dir.as_deref()).and_then(|config| {
        match cli.command {
            Commands::Sweep { watch } => cmd_sweep(config, watch, cli.json),
            Commands::Assign {
                submission,
                examiner,
            } => cmd_assign(config, &submission, &examiner, cli.json),
            Commands::Grade {
                submission,
                examiner,
                grades,
                claimed_total,
            } => cmd_grade(
                config,
                &submission,
                &examiner,
                &grades,
                claimed_total,
                cli.json,
                cli.verbose,
            ),
            Commands::Reevaluate { candidate, track } => {
                cmd_reevaluate(config, &candidate, &track, cli.json)
            }
            Commands::Status { candidate } => cmd_status(config, &candidate, cli.json),
            Commands::VerifyCertificate { path } => cmd_verify_certificate(&config, &path),
        }
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Setup helpers ─────────────────────────────────────────────────────────────

/// `--config`, then `<data-dir>/config.json`, then defaults. `--data-dir`
/// always wins over the configured directory.
fn resolve_config(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<EngineConfig> {
    let mut config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => {
            let candidate = data_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(|| EngineConfig::default().data_dir)
                .join("config.json");
            if candidate.exists() {
                EngineConfig::load(&candidate)?
            } else {
                EngineConfig::default()
            }
        }
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir.to_path_buf();
    }
    log::debug!("using data directory {}", config.data_dir.display());
    Ok(config)
}

fn open_engine(config: EngineConfig) -> Result<ExamEngine> {
    let catalog = InMemoryCatalog::load(&config.catalog_path())
        .with_context(|| format!("failed to load catalog {}", config.catalog_path().display()))?;
    let directory = InMemoryDirectory::load(&config.candidates_path()).with_context(|| {
        format!(
            "failed to load candidates {}",
            config.candidates_path().display()
        )
    })?;
    ExamEngine::open(config, Arc::new(catalog), Arc::new(directory))
        .context("failed to open exam engine")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_grades(arg: &str) -> Result<Vec<QuestionGrade>> {
    let raw = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read grades file {path}"))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&raw).context("grades must be a JSON array of {question, raw_score}")
}

fn describe_certification(certification: &Certification) -> String {
    match certification {
        Certification::Incomplete { missing } => {
            let names: Vec<&str> = missing.iter().map(|m| m.as_str()).collect();
            format!("incomplete (awaiting: {})", names.join(", "))
        }
        Certification::Failing(summary) => format!(
            "not passed (average {:.2}/20, pass mark {:.2})",
            summary.average_out_of_20, summary.pass_mark
        ),
        Certification::Issued {
            record,
            newly_issued,
        } => format!(
            "{} {} (average {:.2}/20)",
            if *newly_issued { "issued" } else { "already issued" },
            record.certificate_id,
            record.summary.average_out_of_20
        ),
        Certification::Deferred { reason } => format!("deferred ({reason})"),
    }
}

// ── Command implementations ───────────────────────────────────────────────────

#[derive(Serialize)]
struct SweepSummary {
    examined: usize,
    processed: usize,
    failures: Vec<SweepFailureSummary>,
}

#[derive(Serialize)]
struct SweepFailureSummary {
    candidate: String,
    track: String,
    operation: &'static str,
    error: String,
}

impl From<&SweepReport> for SweepSummary {
    fn from(report: &SweepReport) -> Self {
        Self {
            examined: report.examined,
            processed: report.processed,
            failures: report
                .failures
                .iter()
                .map(|f| SweepFailureSummary {
                    candidate: f.candidate.to_string(),
                    track: f.track.to_string(),
                    operation: f.operation,
                    error: f.error.clone(),
                })
                .collect(),
        }
    }
}

/// `examctl sweep [--watch]`
fn cmd_sweep(config: EngineConfig, watch: bool, json: bool) -> Result<()> {
    let interval = Duration::from_secs(config.sweep_interval_secs.max(1));
    let engine = open_engine(config)?;

    loop {
        let report = engine.run_sweep().context("sweep failed")?;
        if json {
            print_json(&SweepSummary::from(&report))?;
        } else {
            println!(
                "Sweep: {} examined, {} processed, {} failed",
                report.examined,
                report.processed,
                report.failures.len()
            );
            for failure in &report.failures {
                println!(
                    "  {} / {} ({}): {}",
                    failure.candidate, failure.track, failure.operation, failure.error
                );
            }
        }

        if !watch {
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}

/// `examctl assign --submission ID --examiner ID`
fn cmd_assign(config: EngineConfig, submission: &str, examiner: &str, json: bool) -> Result<()> {
    let engine = open_engine(config)?;
    let submission = engine
        .assign_for_review(&SubmissionId::new(submission), &ExaminerId::new(examiner))
        .context("failed to assign submission")?;

    if json {
        return print_json(&submission);
    }
    println!("Assigned {} to {}", submission.id, examiner);
    println!("  Candidate: {}", submission.candidate);
    println!("  Exam:      {}", submission.exam);
    println!("  Status:    {}", submission.status);
    if submission.forced {
        println!("  Forced:    yes (submitted by expiry sweep)");
    }
    Ok(())
}

#[derive(Serialize)]
struct GradeSummary {
    submission: String,
    total_score: f64,
    max_score: f64,
    already_graded: bool,
    certification: String,
}

/// `examctl grade --submission ID --examiner ID --grades JSON [--claimed-total N]`
fn cmd_grade(
    config: EngineConfig,
    submission: &str,
    examiner: &str,
    grades: &str,
    claimed_total: Option<f64>,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let grades = parse_grades(grades)?;
    let engine = open_engine(config)?;
    let outcome = engine
        .grade(
            &SubmissionId::new(submission),
            &ExaminerId::new(examiner),
            &grades,
            claimed_total,
        )
        .context("grading failed")?;

    let already_graded = outcome.disposition == GradeDisposition::AlreadyGraded;
    if json {
        return print_json(&GradeSummary {
            submission: outcome.submission.to_string(),
            total_score: outcome.total_score,
            max_score: outcome.max_score,
            already_graded,
            certification: describe_certification(&outcome.certification),
        });
    }

    if already_graded {
        println!("Submission {} was already graded", outcome.submission);
    } else {
        println!("Graded {}", outcome.submission);
    }
    println!("  Total: {:.2} / {:.2}", outcome.total_score, outcome.max_score);
    if let Some(claimed) = claimed_total {
        if verbose && (claimed - outcome.total_score).abs() > f64::EPSILON {
            println!("  Claimed total {claimed:.2} ignored");
        }
    }
    println!("  Certification: {}", describe_certification(&outcome.certification));
    Ok(())
}

/// `examctl reevaluate --candidate ID --track ID`
fn cmd_reevaluate(config: EngineConfig, candidate: &str, track: &str, json: bool) -> Result<()> {
    let engine = open_engine(config)?;
    let certification = engine
        .reevaluate(&CandidateId::new(candidate), &TrackId::new(track))
        .context("re-evaluation failed")?;

    if json {
        return print_json(&serde_json::json!({
            "candidate": candidate,
            "track": track,
            "certified": certification.is_certified(),
            "certification": describe_certification(&certification),
        }));
    }
    println!("{candidate} / {track}: {}", describe_certification(&certification));
    Ok(())
}

/// `examctl status --candidate ID`
fn cmd_status(config: EngineConfig, candidate: &str, json: bool) -> Result<()> {
    let engine = open_engine(config)?;
    let status = engine
        .candidate_status(&CandidateId::new(candidate))
        .context("failed to load candidate status")?;

    if json {
        return print_json(&status);
    }

    println!("Candidate: {}", status.candidate);
    println!("  Track: {}", status.track);
    match status.window {
        Some(window) => println!(
            "  Window: {} → {}",
            micros_to_datetime(window.started_at),
            micros_to_datetime(window.expires_at)
        ),
        None => println!("  Window: not opened"),
    }
    for module in &status.modules {
        let score = match (module.score, module.max_score) {
            (Some(score), Some(max)) => format!("{score:.2}/{max:.2}"),
            _ => "-".to_string(),
        };
        let submission = module
            .submission
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string());
        println!(
            "  {:<20} {:<12} submission: {:<12} score: {}",
            module.module.as_str(),
            module.status.as_str(),
            submission,
            score
        );
    }
    match &status.certificate {
        Some(id) => println!("  Certificate: {id}"),
        None => println!("  Certificate: none"),
    }
    Ok(())
}

/// `examctl verify-certificate PATH`
fn cmd_verify_certificate(config: &EngineConfig, path: &Path) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let certificate = parse_certificate(&bytes).context("not a certificate")?;

    let embedded = IssuerKey::verifying_key_from_base64(&certificate.issuer_key)
        .context("certificate carries an invalid issuer key")?;

    let key_path = config.issuer_key_path();
    if key_path.exists() {
        let local = IssuerKey::load_or_generate(&key_path).context("failed to load issuer key")?;
        if local.verifying_key() != &embedded {
            return Err(anyhow!(
                "certificate {} was not issued by the key at {}",
                certificate.id,
                key_path.display()
            ));
        }
    } else {
        log::warn!(
            "no issuer key at {}; checking against the embedded key only",
            key_path.display()
        );
    }

    verify_certificate(&certificate, &embedded)
        .map_err(|e| anyhow!("certificate {} is INVALID: {e}", certificate.id))?;

    println!("Certificate {}: valid", certificate.id);
    println!("  Candidate: {}", certificate.candidate);
    println!("  Track:     {}", certificate.track);
    println!("  Issued:    {}", certificate.issued_at_rfc3339);
    println!(
        "  Average:   {:.2}/20 ({:.2} / {:.2})",
        certificate.summary.average_out_of_20,
        certificate.summary.total_score,
        certificate.summary.total_max
    );
    Ok(())
}
