mod logging;
mod preflight;

use clap::{Parser, Subcommand};
use ibanbic::{Bic, BicOptions, DirectorySource, Iban, IbanOptions, RandomOptions, Registry};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "ibanbic")]
#[command(about = "IBAN, BBAN and BIC validation toolkit", long_about = None)]
struct Cli {
    /// Directory with iban_registry/ and bank_registry/ overriding the bundled
    /// data. Defaults to $IBANBIC_DATA_DIR.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Iban(IbanArgs),
    Bic(BicArgs),
    BankCode(BankCodeArgs),
    Generate(GenerateArgs),
    Random(RandomArgs),
    Check(CheckArgs),
}

#[derive(Parser)]
struct IbanArgs {
    value: String,
    #[arg(long, default_value_t = false)]
    validate_bban: bool,
}

#[derive(Parser)]
struct BicArgs {
    value: String,
    /// Disallow digits in the business party prefix.
    #[arg(long, default_value_t = false)]
    swift: bool,
}

#[derive(Parser)]
struct BankCodeArgs {
    #[arg(long)]
    country: String,
    #[arg(long)]
    bank_code: String,
    /// List every candidate instead of the most generic one.
    #[arg(long, default_value_t = false)]
    all: bool,
}

#[derive(Parser)]
struct GenerateArgs {
    #[arg(long)]
    country: String,
    #[arg(long)]
    bank_code: String,
    #[arg(long)]
    account_code: String,
    #[arg(long, default_value = "")]
    branch_code: String,
}

#[derive(Parser)]
struct RandomArgs {
    #[arg(long)]
    country: Option<String>,
    #[arg(long, default_value_t = 1)]
    count: usize,
    #[arg(long)]
    seed: Option<u64>,
    /// Ignore the bank directory and draw bank codes at random.
    #[arg(long, default_value_t = false)]
    no_registry: bool,
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Parser)]
struct CheckArgs {
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    validate_bban: bool,
}

#[derive(Debug, Serialize)]
struct RandomRow {
    iban: String,
    country_code: String,
    bank_code: String,
    bic: String,
    bank_name: String,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    logging::init_logging("ibanbic")?;
    let cli = Cli::parse();

    let owned;
    let registry: &Registry = match &cli.data_dir {
        Some(dir) => {
            let source = DirectorySource::new(dir);
            log::info!("loading registry from {}", source.root().display());
            owned = Registry::load(&source).map_err(|err| err.to_string())?;
            &owned
        }
        None => Registry::ensure_loaded().map_err(|err| err.to_string())?,
    };

    match cli.command {
        Command::Iban(args) => run_iban(registry, args),
        Command::Bic(args) => run_bic(registry, args),
        Command::BankCode(args) => run_bank_code(registry, args),
        Command::Generate(args) => run_generate(registry, args),
        Command::Random(args) => run_random(registry, args),
        Command::Check(args) => run_check(registry, args),
    }
}

fn run_iban(registry: &Registry, args: IbanArgs) -> Result<(), String> {
    let options = IbanOptions {
        validate_bban: args.validate_bban,
        ..IbanOptions::default()
    };
    let iban = Iban::with_options(registry, &args.value, options).map_err(|err| err.to_string())?;

    emit_info_line(&format!("IBAN: {}", iban.formatted()));
    emit_info_line(&format!(
        "Country: {} ({})",
        iban.country_code(),
        iban.country().unwrap_or("unknown")
    ));
    emit_info_line(&format!("Checksum digits: {}", iban.checksum_digits()));
    emit_info_line(&format!("BBAN: {}", iban.bban()));
    for (label, value) in [
        ("Bank code", iban.bank_code()),
        ("Branch code", iban.branch_code()),
        ("Account code", iban.account_code()),
        ("National checksum", iban.national_checksum_digits()),
    ] {
        if !value.is_empty() {
            emit_info_line(&format!("{label}: {value}"));
        }
    }
    if let Ok(sepa) = iban.in_sepa_zone() {
        emit_info_line(&format!("SEPA: {}", if sepa { "yes" } else { "no" }));
    }
    if let Some(bic) = iban.bic() {
        emit_info_line(&format!("BIC: {bic}"));
    }
    if let Some(name) = iban.bank_name() {
        emit_info_line(&format!("Bank: {name}"));
    }
    Ok(())
}

fn run_bic(registry: &Registry, args: BicArgs) -> Result<(), String> {
    let options = BicOptions {
        enforce_swift_compliance: args.swift,
        ..BicOptions::default()
    };
    let bic = Bic::with_options(&args.value, options).map_err(|err| err.to_string())?;

    emit_info_line(&format!("BIC: {}", bic.formatted()));
    emit_info_line(&format!(
        "Country: {} ({})",
        bic.country_code(),
        bic.country().unwrap_or("unknown")
    ));
    emit_info_line(&format!("Location: {}", bic.location_code()));
    if !bic.branch_code().is_empty() {
        emit_info_line(&format!("Branch: {}", bic.branch_code()));
    }
    emit_info_line(&format!("Type: {}", bic.kind()));
    let codes = bic.domestic_bank_codes(registry);
    if codes.is_empty() {
        emit_info_line("Not found in bank directory");
    } else {
        emit_info_line(&format!("Domestic bank codes: {}", codes.join(", ")));
        emit_info_line(&format!("Bank names: {}", bic.bank_names(registry).join(", ")));
    }
    Ok(())
}

fn run_bank_code(registry: &Registry, args: BankCodeArgs) -> Result<(), String> {
    if args.all {
        let candidates = Bic::candidates_from_bank_code(registry, &args.country, &args.bank_code)
            .map_err(|err| err.to_string())?;
        for bic in candidates {
            emit_info_line(bic.as_str());
        }
    } else {
        let bic = Bic::from_bank_code(registry, &args.country, &args.bank_code)
            .map_err(|err| err.to_string())?;
        emit_info_line(bic.as_str());
    }
    Ok(())
}

fn run_generate(registry: &Registry, args: GenerateArgs) -> Result<(), String> {
    let iban = Iban::generate(
        registry,
        &args.country,
        &args.bank_code,
        &args.account_code,
        &args.branch_code,
    )
    .map_err(|err| err.to_string())?;
    emit_info_line(&iban.formatted());
    Ok(())
}

fn run_random(registry: &Registry, args: RandomArgs) -> Result<(), String> {
    let seed = args.seed.unwrap_or_else(random_seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let options = RandomOptions {
        country_code: args.country.clone(),
        use_registry: !args.no_registry,
        ..RandomOptions::default()
    };

    log::info!("generating {} random IBAN(s) (seed {})", args.count, seed);
    let start = Instant::now();
    let mut rows = Vec::with_capacity(args.count);
    for _ in 0..args.count {
        let iban = Iban::random(registry, &mut rng, &options).map_err(|err| err.to_string())?;
        rows.push(RandomRow {
            iban: iban.to_string(),
            country_code: iban.country_code().to_string(),
            bank_code: iban.bank_code().to_string(),
            bic: iban.bic().map(|bic| bic.to_string()).unwrap_or_default(),
            bank_name: iban.bank_name().unwrap_or_default().to_string(),
        });
    }
    let elapsed = start.elapsed();

    match &args.output {
        Some(output) => {
            write_csv(output, &rows)?;
            emit_info_line(&format!(
                "Wrote {} IBAN(s) to {}",
                rows.len(),
                output.display()
            ));
        }
        None => {
            for row in &rows {
                emit_info_line(&row.iban);
            }
        }
    }
    emit_info_line(&format!("Generation time: {} ms", elapsed.as_millis()));
    Ok(())
}

fn run_check(registry: &Registry, args: CheckArgs) -> Result<(), String> {
    let report = preflight::preflight_csv(&args.input, registry, args.validate_bban)?;

    emit_info_line(&format!(
        "Check: records={} iban={} bic={} valid={}",
        report.total_records, report.iban_records, report.bic_records, report.valid_records
    ));
    emit_info_line(&format!(
        "Check issues: errors={} warnings={}",
        report.error_count(),
        report.warning_count()
    ));

    emit_issue_summary("error", &report.issues, preflight::IssueLevel::Error);
    emit_issue_summary("warning", &report.issues, preflight::IssueLevel::Warning);

    if let Some(output) = &args.output {
        preflight::write_report(output, &report.rows)?;
        emit_info_line(&format!("Report written to {}", output.display()));
    }

    if report.error_count() > 0 {
        return Err(format!("check failed with {} error(s)", report.error_count()));
    }
    Ok(())
}

fn emit_issue_summary(
    label: &str,
    issues: &[preflight::PreflightIssue],
    level: preflight::IssueLevel,
) {
    let mut counts = std::collections::HashMap::new();
    for issue in issues.iter().filter(|issue| issue.level == level) {
        *counts.entry(issue.kind.as_str()).or_insert(0usize) += 1;
    }
    if counts.is_empty() {
        return;
    }

    let mut items: Vec<(&str, usize)> = counts.into_iter().collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let max_items = 5usize;
    for (kind, count) in items.iter().take(max_items) {
        emit_info_line(&format!("Check {}s: {} = {}", label, kind, count));
    }
    if items.len() > max_items {
        emit_info_line(&format!(
            "Check {}s: {} additional issue types not shown",
            label,
            items.len() - max_items
        ));
    }
}

fn random_seed() -> u64 {
    let mut rng = rand::rngs::OsRng;
    rng.gen()
}

fn write_csv<T: Serialize>(output: &Path, rows: &[T]) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(output).map_err(|err| err.to_string())?;
    for row in rows {
        writer.serialize(row).map_err(|err| err.to_string())?;
    }
    writer.flush().map_err(|err| err.to_string())
}

fn emit_info_line(message: &str) {
    if log::log_enabled!(log::Level::Info) {
        log::info!("{}", message);
    } else {
        println!("{message}");
    }
}
