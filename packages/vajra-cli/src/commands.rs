//! Command handlers.
//!
//! Each handler returns the text to print on success; diagnostics go to
//! stderr through `tracing`.

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use color_eyre::eyre::{bail, eyre, WrapErr};
use color_eyre::Result;
use tokio::io::AsyncWriteExt;
use zeroize::Zeroizing;

use vajra_core::storage::{self, keys, KeyValueStore};
use vajra_core::{
    CoreConfig, FileMetadata, FilePackage, Identity, KdfParams, Relay, Request, VajraCore,
    WireFormat,
};

use crate::cli::{Args, Command, ConfigCommand};
use crate::config::{normalize_url, Settings};
use crate::relay_http::HttpRelay;

struct Session {
    core: VajraCore,
    settings: Settings,
    password: Option<Zeroizing<String>>,
}

impl Session {
    fn relay(&self) -> Result<HttpRelay> {
        Ok(HttpRelay::new(&self.settings.server_url)?)
    }

    fn password(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        if let Some(password) = self.password.take() {
            return Ok(password);
        }
        eprint!("{}: ", prompt);
        io::stderr().flush()?;
        read_password(&mut io::stdin().lock())
    }

    fn identity(&self) -> Result<Identity> {
        storage::load_identity(&self.settings.store)?
            .ok_or_else(|| vajra_core::Error::NoIdentity.into())
    }

    async fn unlocked_identity(&mut self) -> Result<Identity> {
        let mut identity = self.identity()?;
        let password = self.password(&format!("Password for {}", identity.handle()))?;
        self.core.unlock(&mut identity, &password).await?;
        Ok(identity)
    }
}

/// Run the parsed command
pub async fn run(args: Args) -> Result<String> {
    let settings = Settings::load(args.data_dir, args.server.as_deref())?;
    let core = VajraCore::new(CoreConfig {
        modulus_bits: args.modulus_bits,
        kdf: KdfParams::default(),
    })?;
    let mut session = Session {
        core,
        settings,
        password: args.password.map(Zeroizing::new),
    };

    match args.command {
        Command::Register { handle } => register(&mut session, &handle).await,
        Command::Login { handle } => login(&mut session, &handle).await,
        Command::Logout => logout(&session),
        Command::Whoami { public_key } => whoami(&session, public_key),
        Command::Send {
            recipient,
            path,
            file_type,
        } => send(&session, &recipient, &path, file_type).await,
        Command::Inbox => inbox(&session).await,
        Command::Receive { id, out } => receive(&mut session, &id, &out).await,
        Command::Seal {
            path,
            public_key,
            output,
            format,
        } => seal(&session, &path, &public_key, &output, format.into()).await,
        Command::Open { path, output } => open(&mut session, &path, &output).await,
        Command::Config(command) => config(&session, command),
    }
}

// ============================================================================
// ACCOUNT
// ============================================================================

/// Refuse to replace a stored identity
fn ensure_signed_out(store: &dyn KeyValueStore) -> Result<()> {
    if let Some(existing) = storage::load_identity(store)? {
        bail!(
            "already signed in as {}; run `vajra logout` first",
            existing.handle()
        );
    }
    Ok(())
}

async fn register(session: &mut Session, handle: &str) -> Result<String> {
    ensure_signed_out(&session.settings.store)?;
    let password = session.password("Choose a password")?;
    let relay = session.relay()?;

    eprintln!(
        "Generating a {}-bit key pair, this can take a moment...",
        session.core.config().modulus_bits
    );
    let identity = session.core.register(&relay, handle, &password).await?;
    storage::save_identity(&session.settings.store, &identity)?;

    Ok(format!(
        "Registered {} on {}\nFingerprint: {}",
        identity.handle(),
        session.settings.server_url,
        identity.public_key().fingerprint()?
    ))
}

async fn login(session: &mut Session, handle: &str) -> Result<String> {
    ensure_signed_out(&session.settings.store)?;
    let password = session.password(&format!("Password for {}", handle))?;
    let relay = session.relay()?;
    let identity = session.core.restore(&relay, handle, &password).await?;
    storage::save_identity(&session.settings.store, &identity)?;
    Ok(format!(
        "Logged in as {}\nFingerprint: {}",
        identity.handle(),
        identity.public_key().fingerprint()?
    ))
}

fn logout(session: &Session) -> Result<String> {
    if storage::clear_identity(&session.settings.store)? {
        Ok("Signed out".to_string())
    } else {
        Ok("No identity stored".to_string())
    }
}

fn whoami(session: &Session, full_key: bool) -> Result<String> {
    let identity = session.identity()?;
    let mut out = format!(
        "Handle:      {}\nFingerprint: {}\nRelay:       {}",
        identity.handle(),
        identity.public_key().fingerprint()?,
        session.settings.server_url
    );
    if full_key {
        write!(out, "\nPublic key:  {}", identity.public_key())?;
    }
    Ok(out)
}

// ============================================================================
// FILES
// ============================================================================

async fn send(
    session: &Session,
    recipient: &str,
    path: &Path,
    file_type: Option<String>,
) -> Result<String> {
    let sender = session.identity()?;
    let data = tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("reading {}", path.display()))?;
    let file_name = display_name(path);
    let file_type = file_type.unwrap_or_else(|| guess_type(path));
    let relay = session.relay()?;

    let id = session
        .core
        .send_file(&relay, &sender, recipient, data, &file_name, &file_type)
        .await?;
    Ok(format!("Sent {} to {} ({})", file_name, recipient, id))
}

async fn inbox(session: &Session) -> Result<String> {
    let identity = session.identity()?;
    let relay = session.relay()?;
    let mut files = relay.list_inbox(identity.handle()).await?;
    if files.is_empty() {
        return Ok("Inbox is empty".to_string());
    }
    files.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    Ok(format_inbox(&files))
}

fn format_inbox(files: &[FileMetadata]) -> String {
    let mut out = format!("{:<36}  {:<16}  {:<16}  {}", "ID", "FROM", "RECEIVED", "NAME");
    for file in files {
        let received = file
            .received_at()
            .map(|at| {
                at.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|| "-".to_string());
        let _ = write!(
            out,
            "\n{:<36}  {:<16}  {:<16}  {}",
            file.id, file.sender, received, file.file_name
        );
    }
    out
}

async fn receive(session: &mut Session, id: &str, out_dir: &Path) -> Result<String> {
    let identity = session.unlocked_identity().await?;
    let relay = session.relay()?;
    let file = session.core.receive_file(&relay, &identity, id).await?;

    let target = out_dir.join(safe_file_name(&file.file_name, id));
    write_new(&target, &file.data).await?;
    Ok(format!(
        "Saved {} ({} bytes, {})",
        target.display(),
        file.data.len(),
        if file.file_type.is_empty() {
            "unknown type"
        } else {
            file.file_type.as_str()
        }
    ))
}

async fn seal(
    session: &Session,
    path: &Path,
    public_key: &Path,
    output: &Path,
    format: WireFormat,
) -> Result<String> {
    let key_text = tokio::fs::read_to_string(public_key)
        .await
        .wrap_err_with(|| format!("reading {}", public_key.display()))?;
    let recipient = session.core.keys().import_public(key_text.trim())?;
    let data = tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("reading {}", path.display()))?;

    let package = session
        .core
        .encrypt_with_progress(
            data,
            display_name(path),
            guess_type(path),
            recipient,
            |progress| tracing::debug!(percent = progress.percent(), "Sealing"),
        )
        .await?;
    let bytes = package.encode(format)?;
    write_new(output, &bytes).await?;
    Ok(format!("Sealed {} into {}", path.display(), output.display()))
}

async fn open(session: &mut Session, path: &Path, output: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("reading {}", path.display()))?;
    let package = FilePackage::parse(&bytes, &display_name(path), "")?;
    let identity = session.unlocked_identity().await?;

    let file = session
        .core
        .dispatch(Request::Decrypt {
            package,
            key: identity.private_key()?.clone(),
        })
        .await?
        .into_file()?;
    write_new(output, &file.data).await?;
    Ok(format!(
        "Opened {} ({}) into {}",
        file.file_name,
        file.data.len(),
        output.display()
    ))
}

// ============================================================================
// SETTINGS
// ============================================================================

fn config(session: &Session, command: ConfigCommand) -> Result<String> {
    let store = &session.settings.store;
    match command {
        ConfigCommand::SetServer { url } => {
            let url = normalize_url(&url);
            HttpRelay::new(&url)?;
            storage::save_server_url(store, &url)?;
            Ok(format!("Relay set to {}", url))
        }
        ConfigCommand::ResetServer => {
            store.remove(keys::SERVER_URL)?;
            Ok("Relay reset to default".to_string())
        }
        ConfigCommand::Show => {
            let handle = storage::load_identity(store)?
                .map(|identity| identity.handle().to_string())
                .unwrap_or_else(|| "(none)".to_string());
            Ok(format!(
                "Store:    {}\nRelay:    {}\nIdentity: {}",
                store.path().display(),
                session.settings.server_url,
                handle
            ))
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn read_password(input: &mut impl BufRead) -> Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    if input.read_line(&mut line)? == 0 {
        bail!("no password given");
    }
    let len = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(len);
    Ok(line)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}

fn guess_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Reduce a sender-chosen name to a bare file name
fn safe_file_name(name: &str, id: &str) -> PathBuf {
    Path::new(name)
        .file_name()
        .filter(|n| !n.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("vajra-{}", id)))
}

/// Create `path` and write `data`, never replacing or following an existing entry
async fn write_new(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => eyre!("{} already exists", path.display()),
            _ => eyre!(e).wrap_err(format!("creating {}", path.display())),
        })?;
    file.write_all(data)
        .await
        .wrap_err_with(|| format!("writing {}", path.display()))?;
    file.flush()
        .await
        .wrap_err_with(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vajra_core::crypto::{ExportedPublicKey, Nonce};
    use vajra_core::storage::MemoryStore;
    use vajra_core::PasswordWrapper;

    #[test]
    fn test_read_password() {
        let mut input = io::Cursor::new(b"p@ss1\r\nrest".to_vec());
        assert_eq!(read_password(&mut input).unwrap().as_str(), "p@ss1");

        let mut spaced = io::Cursor::new(b" two words \n".to_vec());
        assert_eq!(read_password(&mut spaced).unwrap().as_str(), " two words ");

        let mut empty = io::Cursor::new(Vec::new());
        assert!(read_password(&mut empty).is_err());
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("report.pdf", "x"), PathBuf::from("report.pdf"));
        assert_eq!(safe_file_name("../../etc/passwd", "x"), PathBuf::from("passwd"));
        assert_eq!(safe_file_name("..", "abc"), PathBuf::from("vajra-abc"));
        assert_eq!(safe_file_name("", "abc"), PathBuf::from("vajra-abc"));
    }

    #[test]
    fn test_guess_type() {
        assert_eq!(guess_type(Path::new("a.txt")), "text/plain");
        assert_eq!(guess_type(Path::new("a.png")), "image/png");
        assert_eq!(guess_type(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_format_inbox() {
        let files = vec![FileMetadata {
            id: "6f1c".into(),
            sender: "alice".into(),
            recipient: "bob".into(),
            file_name: "notes.txt".into(),
            timestamp: 1_718_000_000_000.0,
        }];
        let text = format_inbox(&files);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].starts_with("6f1c"));
        assert!(lines[1].contains("alice"));
        assert!(lines[1].ends_with("notes.txt"));
    }

    #[tokio::test]
    async fn test_write_new_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        write_new(&path, b"one").await.unwrap();
        assert!(write_new(&path, b"two").await.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"one");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_new_does_not_follow_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.txt");
        std::fs::write(&target, b"keep").unwrap();

        let link = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        assert!(write_new(&link, b"overwrite").await.is_err());
        assert_eq!(std::fs::read(&target).unwrap(), b"keep");

        let missing = dir.path().join("missing.txt");
        let dangling = dir.path().join("dangling.txt");
        std::os::unix::fs::symlink(&missing, &dangling).unwrap();
        assert!(write_new(&dangling, b"planted").await.is_err());
        assert!(!missing.exists());
    }

    #[test]
    fn test_signed_in_store_refuses_another_identity() {
        let store = MemoryStore::new();
        ensure_signed_out(&store).unwrap();

        let wrapper = PasswordWrapper {
            salt: [0u8; 16],
            iv: Nonce::from_bytes([0u8; 12]),
            encrypted_data: vec![0u8; 32],
            iterations: None,
        };
        let identity =
            Identity::from_parts("alice", ExportedPublicKey::new("AAAA"), wrapper).unwrap();
        storage::save_identity(&store, &identity).unwrap();

        let err = ensure_signed_out(&store).unwrap_err();
        assert!(err.to_string().contains("already signed in as alice"));
        assert_eq!(storage::load_identity(&store).unwrap().unwrap().handle(), "alice");
    }
}
