//! Command-line front end (§6). Not part of the library surface: a thin
//! wrapper around [`fixed_paillier`] that reads/writes the JOSE-adjacent
//! JSON wire format and the base10 values a shell user actually types.

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fixed_paillier::jwk::{CiphertextDocument, PrivateKeyDocument, PublicKeyDocument};
use fixed_paillier::{DecryptionKey, EncodingContext, EncryptedNumber};

#[derive(Parser)]
#[command(name = "fixed-paillier", about = "Paillier encryption with fixed-point encoded numbers")]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a keypair and write the private key JSON.
    Genpkey {
        #[arg(long, default_value_t = 2048)]
        keysize: u32,
        #[arg(long)]
        message: Option<String>,
        /// Output path, or "-" for stdout.
        out: String,
    },
    /// Read a private key JSON and write its public sub-object.
    Extract {
        priv_path: PathBuf,
        /// Output path, or "-" for stdout.
        out: String,
    },
    /// Encode and encrypt a value under a public key.
    Encrypt {
        #[arg(short, default_value = "-")]
        o: String,
        pub_path: PathBuf,
        value: f64,
    },
    /// Decrypt and decode a ciphertext.
    Decrypt {
        #[arg(short, default_value = "-")]
        o: String,
        priv_path: PathBuf,
        cipher_path: PathBuf,
    },
    /// Add a plaintext value to a ciphertext.
    Add {
        #[arg(short, default_value = "-")]
        o: String,
        pub_path: PathBuf,
        cipher_path: PathBuf,
        value: f64,
    },
    /// Add two ciphertexts.
    Addenc {
        #[arg(short, default_value = "-")]
        o: String,
        pub_path: PathBuf,
        cipher1_path: PathBuf,
        cipher2_path: PathBuf,
    },
    /// Multiply a ciphertext by a plaintext scalar.
    Multiply {
        #[arg(short, default_value = "-")]
        o: String,
        pub_path: PathBuf,
        cipher_path: PathBuf,
        value: f64,
    },
}

fn write_output(target: &str, contents: &str) -> std::io::Result<()> {
    if target == "-" || target.is_empty() {
        println!("{contents}");
        Ok(())
    } else {
        let mut f = fs::File::create(target)?;
        f.write_all(contents.as_bytes())?;
        f.write_all(b"\n")
    }
}

fn read_ciphertext(path: &PathBuf, ctx: &std::sync::Arc<EncodingContext>) -> fixed_paillier::Result<EncryptedNumber> {
    let raw = fs::read_to_string(path).map_err(io_err)?;
    let doc = CiphertextDocument::from_json(&raw)?;
    EncryptedNumber::from_parts(std::sync::Arc::clone(ctx), doc.ciphertext, doc.exponent)
}

fn io_err(e: std::io::Error) -> fixed_paillier::Error {
    fixed_paillier::Error::InvalidArgument(format!("I/O error: {e}"))
}

fn run() -> fixed_paillier::Result<()> {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    let _ = builder.try_init();

    let mut rng = rand::rngs::OsRng;

    match cli.command {
        Command::Genpkey { keysize, message, out } => {
            let dk = DecryptionKey::generate(&mut rng, keysize)?;
            let doc = PrivateKeyDocument {
                key: dk,
                kid: message,
            };
            let json = doc.to_json()?;
            write_output(&out, &json).map_err(io_err)?;
        }
        Command::Extract { priv_path, out } => {
            let raw = fs::read_to_string(&priv_path).map_err(io_err)?;
            let priv_doc = PrivateKeyDocument::from_json(&raw)?;
            let pub_doc = PublicKeyDocument {
                key: priv_doc.key.encryption_key().clone(),
                kid: priv_doc.kid,
            };
            let json = pub_doc.to_json()?;
            write_output(&out, &json).map_err(io_err)?;
        }
        Command::Encrypt { o, pub_path, value } => {
            let raw = fs::read_to_string(&pub_path).map_err(io_err)?;
            let pub_doc = PublicKeyDocument::from_json(&raw)?;
            let ctx = std::sync::Arc::new(EncodingContext::full_precision(pub_doc.key)?);
            let encoded = ctx.encode_f64(value)?;
            let encrypted = EncryptedNumber::encrypt(&encoded, &mut rng)?;
            let doc = CiphertextDocument {
                ciphertext: encrypted.ciphertext(&mut rng)?,
                exponent: encrypted.exponent(),
            };
            write_output(&o, &doc.to_json()?).map_err(io_err)?;
        }
        Command::Decrypt { o, priv_path, cipher_path } => {
            let raw = fs::read_to_string(&priv_path).map_err(io_err)?;
            let priv_doc = PrivateKeyDocument::from_json(&raw)?;
            let ctx = std::sync::Arc::new(EncodingContext::full_precision(
                priv_doc.key.encryption_key().clone(),
            )?);
            let encrypted = read_ciphertext(&cipher_path, &ctx)?;
            let decoded = encrypted.decrypt(&priv_doc.key)?.decode_f64()?;
            write_output(&o, &decoded.to_string()).map_err(io_err)?;
        }
        Command::Add { o, pub_path, cipher_path, value } => {
            let raw = fs::read_to_string(&pub_path).map_err(io_err)?;
            let pub_doc = PublicKeyDocument::from_json(&raw)?;
            let ctx = std::sync::Arc::new(EncodingContext::full_precision(pub_doc.key)?);
            let encrypted = read_ciphertext(&cipher_path, &ctx)?;
            let encoded = ctx.encode_f64(value)?;
            let sum = encrypted.add_encoded(&encoded, &mut rng)?;
            let doc = CiphertextDocument {
                ciphertext: sum.ciphertext(&mut rng)?,
                exponent: sum.exponent(),
            };
            write_output(&o, &doc.to_json()?).map_err(io_err)?;
        }
        Command::Addenc { o, pub_path, cipher1_path, cipher2_path } => {
            let raw = fs::read_to_string(&pub_path).map_err(io_err)?;
            let pub_doc = PublicKeyDocument::from_json(&raw)?;
            let ctx = std::sync::Arc::new(EncodingContext::full_precision(pub_doc.key)?);
            let c1 = read_ciphertext(&cipher1_path, &ctx)?;
            let c2 = read_ciphertext(&cipher2_path, &ctx)?;
            let sum = c1.add(&c2)?;
            let doc = CiphertextDocument {
                ciphertext: sum.ciphertext(&mut rng)?,
                exponent: sum.exponent(),
            };
            write_output(&o, &doc.to_json()?).map_err(io_err)?;
        }
        Command::Multiply { o, pub_path, cipher_path, value } => {
            let raw = fs::read_to_string(&pub_path).map_err(io_err)?;
            let pub_doc = PublicKeyDocument::from_json(&raw)?;
            let ctx = std::sync::Arc::new(EncodingContext::full_precision(pub_doc.key)?);
            let encrypted = read_ciphertext(&cipher_path, &ctx)?;
            let encoded = ctx.encode_f64(value)?;
            let product = encrypted.multiply(&encoded)?;
            let doc = CiphertextDocument {
                ciphertext: product.ciphertext(&mut rng)?,
                exponent: product.exponent(),
            };
            write_output(&o, &doc.to_json()?).map_err(io_err)?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}
