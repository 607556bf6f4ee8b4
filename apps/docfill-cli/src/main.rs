//! docfill command-line tool
//!
//! Inspect DOCX templates and fill them offline.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docfill_core::{FsSource, RenderMode};
use docfill_cli::commands;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "docfill")]
#[command(version, about = "Inspect and fill DOCX field templates")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List `{placeholder}` names in first-occurrence order
    Placeholders {
        template: PathBuf,
    },

    /// List checkbox bookmarks and their resolved state
    Bookmarks {
        template: PathBuf,
        #[arg(long)]
        schema: Option<PathBuf>,
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Check a schema for malformed mappings and duplicate bookmarks
    Validate {
        schema: PathBuf,
    },

    /// Render a template with field values
    Fill {
        template: PathBuf,
        #[arg(long)]
        schema: Option<PathBuf>,
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value = "final")]
        mode: Mode,
    },

    /// Print the bound preview, one paragraph per line
    Preview {
        template: PathBuf,
        #[arg(long)]
        schema: Option<PathBuf>,
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        readonly: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Final,
    Preview,
}

impl From<Mode> for RenderMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Final => RenderMode::Final,
            Mode::Preview => RenderMode::Preview,
        }
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_optional(path: Option<&Path>) -> Result<Option<String>> {
    path.map(|p| std::fs::read_to_string(p).with_context(|| format!("Failed to read {}", p.display())))
        .transpose()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries command output; logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Command::Placeholders { template } => {
            for name in commands::placeholders(&read_bytes(&template)?)? {
                println!("{}", name);
            }
        }
        Command::Bookmarks { template, schema, data } => {
            let schema = commands::load_schema(read_optional(schema.as_deref())?.as_deref())?;
            let values = commands::load_values(read_optional(data.as_deref())?.as_deref())?;
            for info in commands::bookmarks(&read_bytes(&template)?, &schema, &values)? {
                println!(
                    "{}\t{}\t{}",
                    info.bookmark,
                    info.field.as_deref().unwrap_or("-"),
                    if info.checked { "checked" } else { "unchecked" }
                );
            }
        }
        Command::Validate { schema } => {
            let schema = commands::load_schema(read_optional(Some(schema.as_path()))?.as_deref())?;
            let issues = commands::validate(&schema);
            for issue in &issues {
                println!("{}", issue);
            }
            if !issues.is_empty() {
                anyhow::bail!("{} schema issue(s)", issues.len());
            }
            println!("Schema OK");
        }
        Command::Fill {
            template,
            schema,
            data,
            out,
            mode,
        } => {
            let schema = commands::load_schema(read_optional(schema.as_deref())?.as_deref())?;
            let values = commands::load_values(read_optional(data.as_deref())?.as_deref())?;
            let location = template.to_string_lossy();
            let bytes = commands::fill(&FsSource::new(), &location, schema, values, mode.into()).await?;
            std::fs::write(&out, &bytes).with_context(|| format!("Failed to write {}", out.display()))?;
            tracing::info!("Wrote {} ({} bytes)", out.display(), bytes.len());
        }
        Command::Preview {
            template,
            schema,
            data,
            readonly,
        } => {
            let schema = commands::load_schema(read_optional(schema.as_deref())?.as_deref())?;
            let values = commands::load_values(read_optional(data.as_deref())?.as_deref())?;
            for line in commands::preview(&read_bytes(&template)?, schema, values, readonly)? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
