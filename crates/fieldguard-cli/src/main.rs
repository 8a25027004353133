//! Fieldguard Command-Line Tool
//!
//! Offline tooling for security groups: audits relation declarations against
//! implemented predicates, derives default-deny groups from a schema, and
//! merges and checks groups.

mod config;
mod executor;
mod formatter;

use clap::{Args as ClapArgs, Parser, Subcommand};
use config::{conventions_from_overrides, AuditConfig};
use executor::ExecuteError;
use fieldguard_core::schema::{
    default_ruleset, permission_descriptions, schema_with_permissions, SchemaConventions,
};
use fieldguard_core::secure_inbound_query_fields;
use formatter::{Formatter, OutputFormat};
use std::path::PathBuf;

/// Fieldguard Command-Line Tool
#[derive(Parser, Debug)]
#[command(name = "fieldguard")]
#[command(version, about = "Fieldguard security group tooling")]
pub struct Args {
    /// Output format
    #[arg(long, default_value = "table", value_enum, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Schema input shared by schema-aware commands.
#[derive(ClapArgs, Debug)]
pub struct SchemaArgs {
    /// Introspection result (JSON)
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Prefix of relation declaration enums
    #[arg(long)]
    pub relation_prefix: Option<String>,

    /// Prefix of types excluded from permission handling
    #[arg(long)]
    pub hidden_prefix: Option<String>,

    /// Identifier field, readable whenever its row is
    #[arg(long)]
    pub id_field: Option<String>,
}

impl SchemaArgs {
    fn conventions(&self) -> SchemaConventions {
        conventions_from_overrides(
            self.relation_prefix.as_deref(),
            self.hidden_prefix.as_deref(),
            self.id_field.as_deref(),
        )
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Audit relation declarations against implemented relations
    Audit {
        #[command(flatten)]
        schema: SchemaArgs,

        /// Implemented relations per type (JSON: {"Type": ["relation", ...]})
        #[arg(short, long)]
        resolvers: PathBuf,

        /// Fail on warnings as well as errors
        #[arg(long)]
        deny_warnings: bool,
    },

    /// Print the default-deny group derived from a schema
    Defaults {
        #[command(flatten)]
        schema: SchemaArgs,
    },

    /// Print declared relations, or every field with its relations
    Describe {
        #[command(flatten)]
        schema: SchemaArgs,

        /// Annotate each field with its effective relations
        #[arg(long)]
        fields: bool,
    },

    /// Merge security groups; later groups override earlier ones
    Merge {
        /// Group files (JSON), in precedence order
        #[arg(required = true)]
        groups: Vec<PathBuf>,

        /// Merge on top of the default-deny group of this schema
        #[command(flatten)]
        schema: Option<SchemaArgs>,
    },

    /// List which requested fields of an entity a group may read
    Check {
        /// Group file (JSON)
        #[arg(short, long)]
        group: PathBuf,

        /// Entity type
        entity: String,

        /// Requested fields
        fields: Vec<String>,
    },
}

fn main() {
    // Logs go to stderr so JSON output stays machine-readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fieldguard=info")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), ExecuteError> {
    let formatter = formatter::create_formatter(args.format);

    match args.command {
        Command::Audit {
            schema,
            resolvers,
            deny_warnings,
        } => {
            let config = AuditConfig::new(&schema.schema, resolvers)
                .with_conventions(schema.conventions())
                .with_deny_warnings(deny_warnings);
            run_audit(&config, &*formatter)
        }

        Command::Defaults { schema } => {
            let catalog = executor::load_catalog(&schema.schema, schema.conventions())?;
            println!("{}", formatter.format_group(&default_ruleset(&catalog)));
            Ok(())
        }

        Command::Describe { schema, fields } => {
            let catalog = executor::load_catalog(&schema.schema, schema.conventions())?;
            let output = if fields {
                formatter.format_schema(&schema_with_permissions(&catalog))
            } else {
                formatter.format_descriptions(&permission_descriptions(&catalog))
            };
            println!("{}", output);
            Ok(())
        }

        Command::Merge { groups, schema } => {
            let base = match schema {
                Some(schema) => Some(default_ruleset(&executor::load_catalog(
                    &schema.schema,
                    schema.conventions(),
                )?)),
                None => None,
            };
            let merged = executor::merge_group_files(base, &groups)?;
            println!("{}", formatter.format_group(&merged));
            Ok(())
        }

        Command::Check {
            group,
            entity,
            fields,
        } => {
            let group = executor::load_group(&group)?;
            let allowed = secure_inbound_query_fields(&entity, &fields, &group);
            println!(
                "{}",
                formatter.format_field_check(&entity, allowed.as_deref())
            );
            Ok(())
        }
    }
}

/// Print audit findings, then fail if any reaches the configured level.
fn run_audit(config: &AuditConfig, formatter: &dyn Formatter) -> Result<(), ExecuteError> {
    let findings = executor::audit(config)?;
    println!("{}", formatter.format_diagnostics(&findings));
    tracing::info!(findings = findings.len(), "audit complete");
    executor::audit_verdict(&findings, config.fail_level)
}
