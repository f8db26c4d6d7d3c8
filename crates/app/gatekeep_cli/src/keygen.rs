//! RSA key pair generation for the token signer.

use std::fs;
use std::path::{Path, PathBuf};

use rand_core::OsRng;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::{Error, Result};

pub const PRIVATE_KEY_FILE: &str = "private.pem";
pub const PUBLIC_KEY_FILE: &str = "public.pem";

/// PEM-encoded key pair.
pub struct KeyPair {
    pub private_pem: String,
    pub public_pem: String,
}

pub fn generate(bits: usize) -> Result<KeyPair> {
    let private_key = RsaPrivateKey::new(&mut OsRng, bits)?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| Error::Custom(format!("encode private key: {e}")))?;
    let public_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| Error::Custom(format!("encode public key: {e}")))?;

    Ok(KeyPair {
        private_pem: private_pem.to_string(),
        public_pem,
    })
}

/// Write both keys into `out_dir`. Refuses to clobber existing files unless
/// `force` is set.
pub fn write(pair: &KeyPair, out_dir: &Path, force: bool) -> Result<(PathBuf, PathBuf)> {
    let private_path = out_dir.join(PRIVATE_KEY_FILE);
    let public_path = out_dir.join(PUBLIC_KEY_FILE);

    if !force {
        for path in [&private_path, &public_path] {
            if path.exists() {
                return Err(Error::Custom(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
        }
    }

    fs::create_dir_all(out_dir)?;
    write_private(&private_path, &pair.private_pem)?;
    fs::write(&public_path, &pair.public_pem)?;

    Ok((private_path, public_path))
}

/// Write key material readable by the owner only. New files are created
/// 0600; an existing file is narrowed to 0600 before its content is
/// replaced.
#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.set_len(0)?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)?;
    Ok(())
}
