//! SchemaPin CLI - keygen, signing, and verification front-end.
//!
//! Exit code 0 means the operation succeeded (and, for verification,
//! that the artifact verified); anything else is non-zero. Verification
//! results are printed as their JSON wire form.

use anyhow::{bail, Context};
use clap::Parser;
use schemapin_core::{
    export_private_key_pem, export_public_key_pem, generate_keypair, key_fingerprint,
    parse_schema, sign_skill, verify_schema, verify_schema_with_resolver, verify_skill_offline,
    verify_skill_with_resolver, DiscoveryDocument, DurablePinStore, MemoryPinStore, PinStore,
    Resolver, SchemaSigningWorkflow, TrustBundleResolver, VerificationResult, WellKnownResolver,
};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "schemapin")]
#[command(about = "SchemaPin - Cryptographic integrity for AI tool schemas and skills")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Generate a P-256 keypair as PEM files
    Keygen {
        /// Directory to write the key files into
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Filename prefix for <prefix>.key and <prefix>.pub
        #[arg(short, long, default_value = "schemapin")]
        prefix: String,
    },
    /// Sign a JSON schema file
    SignSchema {
        /// Path to the schema JSON
        schema: PathBuf,

        /// Path to the PKCS#8 private key PEM
        #[arg(short, long)]
        key: PathBuf,

        /// Write the base64 signature here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Verify a signed JSON schema
    VerifySchema {
        /// Path to the schema JSON
        schema: PathBuf,

        /// Base64 signature to check
        #[arg(short, long)]
        signature: String,

        /// Publisher domain
        #[arg(short, long)]
        domain: String,

        /// Tool identifier for pinning (defaults to the domain)
        #[arg(short, long)]
        tool_id: Option<String>,

        /// Use a local discovery document instead of the network
        #[arg(long)]
        discovery: Option<PathBuf>,

        /// Use a trust bundle file instead of the network
        #[arg(long)]
        bundle: Option<PathBuf>,

        /// Durable pin database path (no pinning when omitted)
        #[arg(long)]
        pin_db: Option<PathBuf>,
    },
    /// Sign a skill directory, writing .schemapin.sig
    SignSkill {
        /// Path to the skill directory
        dir: PathBuf,

        /// Path to the PKCS#8 private key PEM
        #[arg(short, long)]
        key: PathBuf,

        /// Signing domain
        #[arg(short, long)]
        domain: String,

        /// Key identifier (defaults to the key fingerprint)
        #[arg(long)]
        signer_kid: Option<String>,

        /// Skill name override (defaults to SKILL.md frontmatter)
        #[arg(long)]
        name: Option<String>,
    },
    /// Verify a signed skill directory
    VerifySkill {
        /// Path to the skill directory
        dir: PathBuf,

        /// Publisher domain (must match the signature envelope)
        #[arg(short, long)]
        domain: String,

        /// Tool identifier for pinning (defaults to the skill name)
        #[arg(short, long)]
        tool_id: Option<String>,

        /// Use a local discovery document instead of the network
        #[arg(long)]
        discovery: Option<PathBuf>,

        /// Use a trust bundle file instead of the network
        #[arg(long)]
        bundle: Option<PathBuf>,

        /// Durable pin database path (no pinning when omitted)
        #[arg(long)]
        pin_db: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { out_dir, prefix } => keygen(&out_dir, &prefix),
        Commands::SignSchema { schema, key, out } => sign_schema(&schema, &key, out.as_deref()),
        Commands::VerifySchema {
            schema,
            signature,
            domain,
            tool_id,
            discovery,
            bundle,
            pin_db,
        } => {
            let schema_value = read_json(&schema)?;
            let tool_id = tool_id.unwrap_or_else(|| domain.clone());
            let pins = open_pins(pin_db.as_deref())?;

            let result = match discovery {
                Some(path) => {
                    let doc: DiscoveryDocument = serde_json::from_str(
                        &fs::read_to_string(&path)
                            .with_context(|| format!("reading {}", path.display()))?,
                    )?;
                    verify_schema(
                        &schema_value,
                        &signature,
                        &domain,
                        &tool_id,
                        &doc,
                        None,
                        Some(pins.as_ref()),
                    )
                }
                None => {
                    let resolver = build_resolver(bundle.as_deref())?;
                    verify_schema_with_resolver(
                        &schema_value,
                        &signature,
                        &domain,
                        &tool_id,
                        resolver.as_ref(),
                        Some(pins.as_ref()),
                    )
                }
            };

            finish(result)
        }
        Commands::SignSkill {
            dir,
            key,
            domain,
            signer_kid,
            name,
        } => {
            let key_pem = fs::read_to_string(&key)
                .with_context(|| format!("reading {}", key.display()))?;
            let envelope =
                sign_skill(&dir, &key_pem, &domain, signer_kid.as_deref(), name.as_deref())?;
            println!(
                "Signed skill '{}' ({}) for {}",
                envelope.skill_name, envelope.skill_hash, envelope.domain
            );
            Ok(())
        }
        Commands::VerifySkill {
            dir,
            domain,
            tool_id,
            discovery,
            bundle,
            pin_db,
        } => {
            let pins = open_pins(pin_db.as_deref())?;

            let result = match discovery {
                Some(path) => {
                    let doc: DiscoveryDocument = serde_json::from_str(
                        &fs::read_to_string(&path)
                            .with_context(|| format!("reading {}", path.display()))?,
                    )?;
                    verify_skill_offline(
                        &dir,
                        &doc,
                        None,
                        None,
                        Some(pins.as_ref()),
                        tool_id.as_deref(),
                    )
                }
                None => {
                    let resolver = build_resolver(bundle.as_deref())?;
                    verify_skill_with_resolver(
                        &dir,
                        &domain,
                        resolver.as_ref(),
                        Some(pins.as_ref()),
                        tool_id.as_deref(),
                    )
                }
            };

            finish(result)
        }
    }
}

fn keygen(out_dir: &std::path::Path, prefix: &str) -> anyhow::Result<()> {
    let key = generate_keypair();
    let private_pem = export_private_key_pem(&key)?;
    let public_pem = export_public_key_pem(key.verifying_key())?;
    let fingerprint = key_fingerprint(key.verifying_key())?;

    fs::create_dir_all(out_dir)?;
    let private_path = out_dir.join(format!("{}.key", prefix));
    let public_path = out_dir.join(format!("{}.pub", prefix));
    fs::write(&private_path, private_pem)?;
    fs::write(&public_path, public_pem)?;

    println!("Private key: {}", private_path.display());
    println!("Public key:  {}", public_path.display());
    println!("Fingerprint: {}", fingerprint);
    Ok(())
}

fn sign_schema(
    schema: &std::path::Path,
    key: &std::path::Path,
    out: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let schema_value = read_json(schema)?;
    let key_pem =
        fs::read_to_string(key).with_context(|| format!("reading {}", key.display()))?;

    let workflow = SchemaSigningWorkflow::new(&key_pem)?;
    let signature = workflow.sign_schema(&schema_value)?;

    match out {
        Some(path) => fs::write(path, format!("{}\n", signature))?,
        None => println!("{}", signature),
    }
    Ok(())
}

fn read_json(path: &std::path::Path) -> anyhow::Result<serde_json::Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_schema(&text).with_context(|| format!("parsing {}", path.display()))
}

fn build_resolver(bundle: Option<&std::path::Path>) -> anyhow::Result<Box<dyn Resolver>> {
    match bundle {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(Box::new(TrustBundleResolver::from_json(&text)?))
        }
        None => Ok(Box::new(WellKnownResolver::new()?)),
    }
}

fn open_pins(pin_db: Option<&std::path::Path>) -> anyhow::Result<Box<dyn PinStore>> {
    match pin_db {
        Some(path) => Ok(Box::new(DurablePinStore::open(path)?)),
        None => Ok(Box::new(MemoryPinStore::new())),
    }
}

fn finish(result: VerificationResult) -> anyhow::Result<()> {
    println!("{}", result.to_json()?);
    if !result.valid {
        bail!(
            "verification failed: {}",
            result
                .error_code
                .map(|c| c.as_str())
                .unwrap_or("unknown error")
        );
    }
    Ok(())
}
