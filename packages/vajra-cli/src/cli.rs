//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use vajra_core::WireFormat;

#[derive(Parser, Debug)]
#[command(
    name = "vajra",
    version,
    about = "End-to-end encrypted file drops through a VajraShare relay"
)]
pub struct Args {
    /// Relay URL (overrides the stored one)
    #[arg(long, global = true, env = "VAJRA_SERVER_URL")]
    pub server: Option<String>,

    /// Directory for the local identity store
    #[arg(long, global = true, env = "VAJRA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Account password; read from stdin when omitted
    #[arg(long, global = true, env = "VAJRA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// RSA modulus size for new identities
    #[arg(long, global = true, default_value_t = 4096, value_parser = parse_modulus_bits)]
    pub modulus_bits: usize,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new identity and publish it to the relay
    Register {
        /// Handle to claim
        handle: String,
    },

    /// Restore an identity from the relay's key backup
    Login {
        /// Handle to restore
        handle: String,
    },

    /// Forget the local identity
    Logout,

    /// Show the local identity
    Whoami {
        /// Print the full public key
        #[arg(long)]
        public_key: bool,
    },

    /// Encrypt a file and send it to another user
    Send {
        /// Recipient handle
        recipient: String,
        /// File to send
        path: PathBuf,
        /// Media type (guessed from the extension when omitted)
        #[arg(long = "type")]
        file_type: Option<String>,
    },

    /// List files waiting for you
    Inbox,

    /// Download and decrypt a file from your inbox
    Receive {
        /// File id from `vajra inbox`
        id: String,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Encrypt a file locally for a public key, without a relay
    Seal {
        /// File to encrypt
        path: PathBuf,
        /// File holding the recipient's public key
        #[arg(long)]
        public_key: PathBuf,
        /// Output path
        #[arg(short, long)]
        output: PathBuf,
        /// Package layout
        #[arg(long, value_enum, default_value_t = PackageFormat::Json)]
        format: PackageFormat,
    },

    /// Decrypt a local package with your identity
    Open {
        /// Package file (JSON or packed)
        path: PathBuf,
        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Client settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Persist a custom relay URL
    SetServer {
        /// Relay base URL
        url: String,
    },
    /// Remove the custom relay URL
    ResetServer,
    /// Print the effective settings
    Show,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFormat {
    /// JSON package (current)
    Json,
    /// Length-prefixed binary layout
    Packed,
}

impl From<PackageFormat> for WireFormat {
    fn from(format: PackageFormat) -> Self {
        match format {
            PackageFormat::Json => WireFormat::Json,
            PackageFormat::Packed => WireFormat::Packed,
        }
    }
}

fn parse_modulus_bits(s: &str) -> Result<usize, String> {
    let bits: usize = s.parse().map_err(|_| format!("not a number: {}", s))?;
    if vajra_core::crypto::SUPPORTED_MODULUS_BITS.contains(&bits) {
        Ok(bits)
    } else {
        Err(format!(
            "unsupported modulus {}, expected one of {:?}",
            bits,
            vajra_core::crypto::SUPPORTED_MODULUS_BITS
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_send() {
        let args = Args::try_parse_from([
            "vajra",
            "--server",
            "http://relay.test/",
            "send",
            "bob",
            "notes.txt",
        ])
        .unwrap();
        assert_eq!(args.server.as_deref(), Some("http://relay.test/"));
        assert_eq!(args.modulus_bits, 4096);
        match args.command {
            Command::Send {
                recipient,
                path,
                file_type,
            } => {
                assert_eq!(recipient, "bob");
                assert_eq!(path, PathBuf::from("notes.txt"));
                assert!(file_type.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_modulus_bits_validated() {
        assert!(Args::try_parse_from(["vajra", "--modulus-bits", "2048", "inbox"]).is_ok());
        assert!(Args::try_parse_from(["vajra", "--modulus-bits", "1024", "inbox"]).is_err());
    }

    #[test]
    fn test_seal_format() {
        let args = Args::try_parse_from([
            "vajra",
            "seal",
            "a.bin",
            "--public-key",
            "bob.pub",
            "-o",
            "a.vajra",
            "--format",
            "packed",
        ])
        .unwrap();
        match args.command {
            Command::Seal { format, .. } => {
                assert_eq!(WireFormat::from(format), WireFormat::Packed)
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
