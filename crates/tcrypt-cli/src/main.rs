//! tcrypt CLI
//!
//! Provision digit files, generate key pairs and encrypt or decrypt data.
//!
//! Usage:
//!   tcrypt setup --from ./digits
//!   tcrypt keygen --private-key private.json --public-key public.json -v
//!   tcrypt encrypt report.pdf report.pdf.enc --public-key public.json
//!   tcrypt decrypt report.pdf.enc report.pdf --private-key private.json

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tcrypt_core::{DigitFiles, DigitSource, EngineConfig, Pattern};
use tcrypt_keys::{
    decrypt_file, decrypt_message, encrypt_file, encrypt_message, KeyBinder, KeyParams,
    PrivateKeyMaterial, PublicKeyMaterial,
};

#[derive(Parser, Debug)]
#[command(name = "tcrypt")]
#[command(about = "Key material from digit patterns in pi and e")]
struct Cli {
    /// Directory holding pi_1m.txt and e_1m.txt
    #[arg(long, env = "TCRYPT_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Engine config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Worker threads for synthesis and search
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install and verify the digit files
    Setup {
        /// Copy digit files from this directory
        #[arg(long)]
        from: Option<PathBuf>,

        /// Replace existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate a key pair
    Keygen(KeygenArgs),

    /// Encrypt a file or a text message
    Encrypt {
        /// File to encrypt, or the message itself with --text
        input: String,

        /// Envelope output file (printed when omitted with --text)
        output: Option<PathBuf>,

        #[arg(long)]
        public_key: PathBuf,

        /// Treat input as a text message
        #[arg(short, long)]
        text: bool,
    },

    /// Decrypt an envelope
    Decrypt {
        /// Envelope file, or inline envelope JSON with --text
        input: String,

        /// Output file (printed when omitted with --text)
        output: Option<PathBuf>,

        #[arg(long)]
        private_key: PathBuf,

        /// Decrypt a text message
        #[arg(short, long)]
        text: bool,

        /// Match count the public key was bound with
        #[arg(long)]
        max_positions: Option<usize>,
    },

    /// Check that a private key reproduces a public key
    Verify {
        #[arg(long)]
        private_key: PathBuf,

        #[arg(long)]
        public_key: PathBuf,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Show pattern positions and follow sequences for a private key
    Positions {
        #[arg(long)]
        private_key: PathBuf,

        #[arg(long, default_value_t = tcrypt_core::DEFAULT_MAX_POSITIONS)]
        max_positions: usize,
    },
}

#[derive(Args, Debug)]
struct KeygenArgs {
    /// Comma-separated pattern digits, e.g. 3,1,4
    #[arg(long)]
    pattern: Option<String>,

    /// Comma-separated gaps between pattern digits, e.g. 5,2
    #[arg(long, requires = "pattern", conflicts_with = "no_spacing")]
    spacing: Option<String>,

    /// Length of a random pattern
    #[arg(long, default_value_t = 3)]
    pattern_length: usize,

    /// Random patterns without gaps
    #[arg(long)]
    no_spacing: bool,

    /// Largest gap in a random pattern
    #[arg(long, default_value_t = 10)]
    max_spacing: usize,

    #[arg(long, alias = "pi-seed")]
    seed_a: Option<u64>,

    #[arg(long, alias = "e-seed")]
    seed_b: Option<u64>,

    #[arg(long, default_value_t = tcrypt_core::DEFAULT_NUM_OFFSETS)]
    num_offsets: usize,

    #[arg(long, default_value_t = tcrypt_core::DEFAULT_MODULUS)]
    modulus: u16,

    #[arg(long, default_value_t = tcrypt_core::DEFAULT_FOLLOW_DIGITS)]
    follow_digits: usize,

    #[arg(long, default_value_t = tcrypt_core::DEFAULT_MAX_POSITIONS)]
    max_positions: usize,

    #[arg(long, default_value = "private_key.json")]
    private_key: PathBuf,

    #[arg(long, default_value = "public_key.json")]
    public_key: PathBuf,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = engine_config(&cli)?;

    match cli.command {
        Command::Setup { from, force } => setup(&config, from.as_deref(), force),
        Command::Keygen(args) => keygen(&config, &args),
        Command::Encrypt {
            input,
            output,
            public_key,
            text,
        } => encrypt(&input, output.as_deref(), &public_key, text),
        Command::Decrypt {
            input,
            output,
            private_key,
            text,
            max_positions,
        } => decrypt(
            &config,
            &input,
            output.as_deref(),
            &private_key,
            text,
            max_positions,
        ),
        Command::Verify {
            private_key,
            public_key,
            verbose,
        } => verify(&config, &private_key, &public_key, verbose),
        Command::Positions {
            private_key,
            max_positions,
        } => positions(&config, &private_key, max_positions),
    }
}

/// Defaults, then the config file, then command-line overrides
fn engine_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(threads) = cli.threads {
        config = config.with_threads(threads);
    }
    Ok(config)
}

fn open_source(config: &EngineConfig) -> Result<DigitSource> {
    DigitSource::from_config(config).with_context(|| {
        format!(
            "Failed to open digit files in {} (run `tcrypt setup`)",
            config.data_dir.display()
        )
    })
}

fn load_private(path: &Path) -> Result<PrivateKeyMaterial> {
    PrivateKeyMaterial::load(path)
        .with_context(|| format!("Failed to load private key {}", path.display()))
}

fn load_public(path: &Path) -> Result<PublicKeyMaterial> {
    PublicKeyMaterial::load(path)
        .with_context(|| format!("Failed to load public key {}", path.display()))
}

fn parse_list<T: std::str::FromStr>(list: &str, what: &str) -> Result<Vec<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    list.split(',')
        .map(|item| {
            item.trim()
                .parse()
                .with_context(|| format!("Invalid {what} value {item:?}"))
        })
        .collect()
}

fn setup(config: &EngineConfig, from: Option<&Path>, force: bool) -> Result<()> {
    let files = DigitFiles::in_dir(&config.data_dir);
    files
        .install(from, force)
        .context("Failed to install digit files")?;
    files.verify().context("Digit files failed verification")?;

    let source = open_source(config)?;
    for constant in tcrypt_core::Constant::ALL {
        tracing::info!(
            %constant,
            path = %files.path(constant).display(),
            digits = source.period(constant),
            "Digit file ready"
        );
    }
    Ok(())
}

fn keygen(config: &EngineConfig, args: &KeygenArgs) -> Result<()> {
    let source = open_source(config)?;
    let binder = KeyBinder::new(&source, config.clone());
    let mut rng = rand::thread_rng();

    let (private, public) = match &args.pattern {
        Some(digits) => {
            let digits = parse_list::<u8>(digits, "pattern digit")?;
            let spacing = match &args.spacing {
                Some(gaps) => Some(parse_list::<usize>(gaps, "spacing")?),
                None => None,
            };
            let pattern = Pattern::new(digits, spacing)?;
            let private = PrivateKeyMaterial::new(
                args.seed_a.unwrap_or_else(|| rand::Rng::gen(&mut rng)),
                args.seed_b.unwrap_or_else(|| rand::Rng::gen(&mut rng)),
                pattern,
            )
            .with_num_offsets(args.num_offsets)
            .with_modulus(args.modulus)
            .with_follow_digits(args.follow_digits);
            let public = binder
                .bind(&private, args.max_positions)
                .context("Pattern does not occur often enough; try another pattern or seeds")?;
            (private, public)
        }
        None => {
            if args.seed_a.is_some() || args.seed_b.is_some() {
                bail!("--seed-a/--seed-b require --pattern");
            }
            let params = KeyParams {
                pattern_length: args.pattern_length,
                use_spacing: !args.no_spacing,
                max_spacing: args.max_spacing,
                num_offsets: args.num_offsets,
                modulus: args.modulus,
                follow_digits: args.follow_digits,
            };
            binder.generate_pair(&params, args.max_positions, &mut rng)?
        }
    };

    private
        .save(&args.private_key)
        .with_context(|| format!("Failed to save {}", args.private_key.display()))?;
    public
        .save(&args.public_key)
        .with_context(|| format!("Failed to save {}", args.public_key.display()))?;
    tracing::info!(
        private_key = %args.private_key.display(),
        public_key = %args.public_key.display(),
        "Key pair generated"
    );

    if args.verbose {
        println!("Private key:");
        println!("  Seed A: {}", private.seed_a);
        println!("  Seed B: {}", private.seed_b);
        println!("  Pattern: {}", private.pattern);
        println!("  Num offsets: {}", private.num_offsets);
        println!("  Modulus: {}", private.modulus);
        println!("  Follow digits: {}", private.follow_digits);
        println!("Public key:");
        println!("  Verification token: {}", public.verification_token);
        println!("  Max positions: {}", public.max_positions);
        print_matches(&binder, &private, public.max_positions)?;
    }
    Ok(())
}

fn encrypt(input: &str, output: Option<&Path>, public_key: &Path, text: bool) -> Result<()> {
    let public = load_public(public_key)?;

    if text {
        let envelope = encrypt_message(input, &public)?;
        match output {
            Some(path) => {
                std::fs::write(path, &envelope)?;
                tracing::info!(output = %path.display(), "Encrypted message saved");
            }
            None => println!("{envelope}"),
        }
        return Ok(());
    }

    let Some(output) = output else {
        bail!("An output file is required when encrypting a file");
    };
    encrypt_file(input, output, &public).with_context(|| format!("Failed to encrypt {input}"))
}

fn decrypt(
    config: &EngineConfig,
    input: &str,
    output: Option<&Path>,
    private_key: &Path,
    text: bool,
    max_positions: Option<usize>,
) -> Result<()> {
    let private = load_private(private_key)?;
    let source = open_source(config)?;
    let binder = KeyBinder::new(&source, config.clone());

    if text {
        let envelope = if Path::new(input).exists() {
            std::fs::read_to_string(input)?
        } else {
            input.to_string()
        };
        let message = decrypt_message(&envelope, &private, &binder, max_positions)
            .context("Decryption failed")?;
        match output {
            Some(path) => {
                std::fs::write(path, &message)?;
                tracing::info!(output = %path.display(), "Decrypted message saved");
            }
            None => println!("{message}"),
        }
        return Ok(());
    }

    let Some(output) = output else {
        bail!("An output file is required when decrypting a file");
    };
    decrypt_file(input, output, &private, &binder, max_positions)
        .with_context(|| format!("Failed to decrypt {input}"))
}

fn verify(config: &EngineConfig, private_key: &Path, public_key: &Path, verbose: bool) -> Result<()> {
    let private = load_private(private_key)?;
    let public = load_public(public_key)?;
    let source = open_source(config)?;
    let binder = KeyBinder::new(&source, config.clone());

    if !binder.verify(&private, &public)? {
        bail!("Private key does not match public key");
    }
    println!("Key pair verified");
    if verbose {
        print_matches(&binder, &private, public.max_positions)?;
    }
    Ok(())
}

fn positions(config: &EngineConfig, private_key: &Path, max_positions: usize) -> Result<()> {
    let private = load_private(private_key)?;
    let source = open_source(config)?;
    let binder = KeyBinder::new(&source, config.clone());
    print_matches(&binder, &private, max_positions)
}

fn print_matches(
    binder: &KeyBinder<'_>,
    private: &PrivateKeyMaterial,
    max_positions: usize,
) -> Result<()> {
    let matches = binder.matches(private, max_positions)?;
    println!("Pattern positions:");
    for m in &matches {
        let follow: String = m.follow.iter().map(|d| d.to_string()).collect();
        println!("  {:>8}  {}", m.position, follow);
    }
    Ok(())
}
