//! c2db-crawl — entry point.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use c2db::{
    Assembler, Crawler, DocumentType, FieldMap, HttpFetcher, RecordWriter, DEFAULT_TIMEOUT_SECS,
};
use c2db_crawl::{
    default_ase_db, ids_from_ase_db, ids_from_list_file, resolve_base_url, resolve_output_dir,
};

#[derive(Parser)]
#[command(
    name = "c2db-crawl",
    about = "Mirror C2DB material records into local JSON files",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a list of materials and write one JSON file per material (default).
    ///
    /// With no id source given, reads ./c2db.db if it exists.
    Crawl {
        /// ASE SQLite database to take material ids from.
        #[arg(long)]
        db: Option<PathBuf>,

        /// Text file with one material id per line.
        #[arg(long)]
        ids: Option<PathBuf>,

        /// Material ids given directly.
        uids: Vec<String>,

        /// Output directory. Also reads C2DB_OUTPUT_DIR.
        #[arg(short, long)]
        out: Option<String>,

        /// C2DB row URL. Also reads C2DB_BASE_URL.
        #[arg(long)]
        base_url: Option<String>,

        /// Per-request timeout in seconds.
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,

        /// Output field as key=document-type (repeatable).
        /// Defaults to uid, structure and bands.
        #[arg(long = "field", value_name = "KEY=DOCUMENT")]
        fields: Vec<String>,
    },

    /// Assemble one material and print it as JSON.
    Fetch {
        /// Material id, e.g. MoS2-b3b4685fb6e1.
        uid: String,

        /// Document types to request. Defaults to every implemented one.
        documents: Vec<String>,

        /// C2DB row URL. Also reads C2DB_BASE_URL.
        #[arg(long)]
        base_url: Option<String>,

        /// Per-request timeout in seconds.
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,
    },

    /// List the known document types.
    Types,

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Crawl {
        db: None,
        ids: None,
        uids: Vec::new(),
        out: None,
        base_url: None,
        timeout_secs: DEFAULT_TIMEOUT_SECS,
        fields: Vec::new(),
    }) {
        Commands::Crawl {
            db,
            ids,
            uids,
            out,
            base_url,
            timeout_secs,
            fields,
        } => {
            let fields = if fields.is_empty() {
                FieldMap::default()
            } else {
                FieldMap::parse(&fields)?
            };

            let db = if db.is_none() && ids.is_none() && uids.is_empty() {
                default_ase_db()
            } else {
                db
            };

            let mut material_ids = Vec::new();
            if let Some(db) = db {
                material_ids.extend(ids_from_ase_db(&db)?);
            }
            if let Some(list) = ids {
                material_ids.extend(ids_from_list_file(&list)?);
            }
            material_ids.extend(uids);
            if material_ids.is_empty() {
                bail!("no material ids given; use --db, --ids, list them as arguments, or run next to c2db.db");
            }

            let fetcher = HttpFetcher::new(Duration::from_secs(timeout_secs));
            let crawler = Crawler::new(
                Assembler::with_base_url(fetcher, resolve_base_url(base_url.as_deref())),
                fields,
                RecordWriter::new(resolve_output_dir(out.as_deref())),
            );
            tracing::info!("Base URL: {}", crawler.assembler().base_url());
            tracing::info!("Output dir: {}", crawler.writer().dir().display());

            let report = crawler.run(&material_ids);
            println!(
                "Finished: {} | Invalid: {} | Total: {}",
                report.written, report.invalid, report.total
            );
            println!("Invalid uid list: {:?}", report.invalid_ids);
        }

        Commands::Fetch {
            uid,
            documents,
            base_url,
            timeout_secs,
        } => {
            let documents: Vec<String> = if documents.is_empty() {
                DocumentType::ALL
                    .into_iter()
                    .filter(|d| d.is_implemented())
                    .map(|d| d.name().to_string())
                    .collect()
            } else {
                documents
            };

            let fetcher = HttpFetcher::new(Duration::from_secs(timeout_secs));
            let assembler =
                Assembler::with_base_url(fetcher, resolve_base_url(base_url.as_deref()));
            let record = assembler
                .assemble(&uid, &documents)
                .with_context(|| format!("failed to assemble {uid}"))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        Commands::Types => {
            for doc in DocumentType::ALL {
                let status = if doc.is_implemented() {
                    "implemented"
                } else {
                    "not implemented"
                };
                println!("{:<48} {status}", doc.name());
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "c2db-crawl", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::try_parse_from(["c2db-crawl", "--log-level", "debug"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_crawl_arguments() {
        let cli = Cli::try_parse_from([
            "c2db-crawl",
            "crawl",
            "--out",
            "mirror",
            "--field",
            "uid=results-asr.database.material_fingerprint.json",
            "MoS2-1",
            "WSe2-2",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Crawl {
                uids,
                out,
                fields,
                timeout_secs,
                ..
            }) => {
                assert_eq!(uids, vec!["MoS2-1", "WSe2-2"]);
                assert_eq!(out.as_deref(), Some("mirror"));
                assert_eq!(fields.len(), 1);
                assert_eq!(timeout_secs, DEFAULT_TIMEOUT_SECS);
            }
            _ => panic!("expected crawl"),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
