use clap::{Arg, Command};
use log::LevelFilter;
use phishguard::detector::UrlVerdict;
use phishguard::inbox::{self, InboxReport};
use phishguard::training::{self, Dataset};
use phishguard::web::{self, AppState};
use phishguard::{Config, PhishingDetector, PhishingModel};
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let matches = Command::new("phishguard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Phishing detection for URLs, email text and IMAP inboxes")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("phishguard.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate configuration and check that the model loads")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("train")
                .long("train")
                .value_name("DATASET")
                .num_args(0..=1)
                .help("Train a model from a labeled CSV dataset (defaults to training.dataset_path)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Where to write the trained model (defaults to model.model_path)")
                .requires("train"),
        )
        .arg(
            Arg::new("test-url")
                .long("test-url")
                .value_name("URL")
                .help("Classify a single URL")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-email")
                .long("test-email")
                .value_name("FILE")
                .help("Classify an RFC 822 email file and its links")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("scan-inbox")
                .long("scan-inbox")
                .value_name("ADDRESS")
                .help("Scan an IMAP inbox; password is read from PHISHGUARD_IMAP_PASSWORD")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("phishguard.yaml");
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    if matches.contains_id("train") {
        let dataset = matches
            .get_one::<String>("train")
            .cloned()
            .unwrap_or_else(|| config.training.dataset_path.clone());
        let output = matches
            .get_one::<String>("output")
            .cloned()
            .unwrap_or_else(|| config.model.model_path.clone());
        if let Err(e) = train(&config, &dataset, &output) {
            eprintln!("❌ Training failed: {e:#}");
            process::exit(1);
        }
        return;
    }

    if matches.get_flag("test-config") {
        println!("🔍 Testing configuration...");
        println!("Server address: {}", config.bind_addr());
        println!(
            "Risk thresholds: medium {} / high {}",
            config.risk.medium_threshold, config.risk.high_threshold
        );
        match PhishingModel::load(&config.model.model_path) {
            Ok(model) => {
                let meta = model.metadata();
                println!(
                    "✅ Model loaded: {} samples, vocabulary {}, trained {}",
                    meta.training_samples,
                    meta.vocabulary_size,
                    meta.trained_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
            Err(e) => {
                println!("❌ Model check failed: {e:#}");
                process::exit(1);
            }
        }
        return;
    }

    let detector = match load_detector(&config) {
        Ok(detector) => detector,
        Err(e) => {
            eprintln!("Error loading model: {e:#}");
            eprintln!("Train one first with: phishguard --train <DATASET>");
            process::exit(1);
        }
    };

    if let Some(url) = matches.get_one::<String>("test-url") {
        match detector.check_url(url) {
            Ok(verdict) => print_url_verdict(&verdict),
            Err(e) => {
                eprintln!("❌ {e:#}");
                process::exit(1);
            }
        }
        return;
    }

    if let Some(email_file) = matches.get_one::<String>("test-email") {
        if let Err(e) = test_email_file(&detector, &config, email_file).await {
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
        return;
    }

    if let Some(address) = matches.get_one::<String>("scan-inbox") {
        let password = match std::env::var("PHISHGUARD_IMAP_PASSWORD") {
            Ok(password) if !password.is_empty() => password,
            _ => {
                eprintln!("❌ Set PHISHGUARD_IMAP_PASSWORD to the account's app password");
                process::exit(1);
            }
        };
        match inbox::scan_imap(detector, &config.inbox, address, &password, None).await {
            Ok(report) => print_inbox_report(&report),
            Err(e) => {
                eprintln!("❌ Inbox scan failed: {e:#}");
                process::exit(1);
            }
        }
        return;
    }

    log::info!("Starting phishguard web server...");
    if let Err(e) = web::run_server(AppState::new(detector, config)).await {
        log::error!("Server error: {e:#}");
        process::exit(1);
    }
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path)
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn load_detector(config: &Config) -> anyhow::Result<PhishingDetector> {
    let model = PhishingModel::load(&config.model.model_path)?;
    Ok(PhishingDetector::new(Arc::new(model), config.risk.clone()))
}

fn train(config: &Config, dataset_path: &str, output: &str) -> anyhow::Result<()> {
    let settings = &config.training;
    let dataset = Dataset::from_csv(dataset_path, &settings.text_column, &settings.label_column)?;
    let (model, report) = training::train_pipeline(&dataset, settings)?;

    println!("📊 Training Report");
    println!("═══════════════════════════════════════");
    println!("  Samples: {} ({} dropped)", report.total_samples, report.dropped_rows);
    println!(
        "  ├─ Legitimate: {}\n  └─ Phishing: {}",
        report.legitimate_samples, report.phishing_samples
    );
    match &report.metrics {
        Some(m) => {
            println!(
                "  Held-out split: {} train / {} test",
                report.train_samples, report.test_samples
            );
            println!("  Accuracy:  {:.4}", m.accuracy);
            println!("  Precision: {:.4}", m.precision);
            println!("  Recall:    {:.4}", m.recall);
            println!("  F1:        {:.4}", m.f1);
            println!(
                "  Confusion: tp={} fp={} tn={} fn={}",
                m.confusion.true_positives,
                m.confusion.false_positives,
                m.confusion.true_negatives,
                m.confusion.false_negatives
            );
        }
        None => println!("  No held-out evaluation (test_ratio = 0)"),
    }

    model.save(output)?;
    println!("✅ Model saved to {output}");
    Ok(())
}

fn print_url_verdict(verdict: &UrlVerdict) {
    let icon = if verdict.is_phishing { "🚨" } else { "✅" };
    println!("{icon} {}", verdict.label);
    println!("   URL: {}", verdict.url);
    println!("   Confidence: {:.2}%", verdict.probability);
    println!(
        "   Risk: {} (score {:.2}, heuristics {:.2})",
        verdict.risk_level, verdict.risk_score, verdict.heuristic_score
    );
    for indicator in &verdict.indicators {
        println!("     - {indicator}");
    }
}

fn print_inbox_report(report: &InboxReport) {
    println!(
        "📬 Scanned {} messages: {} flagged, {} unreadable",
        report.scanned, report.flagged, report.failed
    );
    for email in report.emails.iter().filter(|e| e.flagged) {
        println!();
        println!("🚨 {} | {}", email.from, email.subject);
        if let Some(verdict) = &email.text_verdict {
            println!("   Text: {} ({:.2}%)", verdict.label, verdict.probability);
        }
        for link in &email.suspicious_links {
            println!("   Link: {} ({})", link.url, link.risk_level);
        }
    }
}

async fn test_email_file(
    detector: &PhishingDetector,
    config: &Config,
    email_file: &str,
) -> anyhow::Result<()> {
    use anyhow::Context;

    println!("🧪 Testing email file: {email_file}");
    let bytes = std::fs::read(email_file)
        .with_context(|| format!("Error reading email file: {email_file}"))?;

    let scanner = inbox::InboxScanner::new(detector.clone(), &config.inbox);
    let report = scanner
        .analyze(vec![inbox::RawMessage { uid: None, bytes }])
        .await;

    let Some(email) = report.emails.first() else {
        anyhow::bail!("Email file could not be parsed");
    };
    println!("   From: {}", email.from);
    println!("   Subject: {}", email.subject);
    match &email.text_verdict {
        Some(v) => println!(
            "{} Result: {} ({:.2}%, risk {})",
            if v.is_phishing { "🚨" } else { "✅" },
            v.label,
            v.probability,
            v.risk_level
        ),
        None => println!("   No text content to classify"),
    }
    println!("   Links: {} ({} suspicious)", email.links.len(), email.suspicious_links.len());
    for link in &email.suspicious_links {
        print_url_verdict(link);
    }
    Ok(())
}
