//! JSON file [`TokenCache`] with atomic replace-on-write.

// std
use std::{
	fs::{self, File, OpenOptions},
	io::{self, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Token},
	cache::{CacheError, CacheFuture, TokenCache},
};

/// Persists the token as a single JSON object.
///
/// Writes go to a sibling `<file name>.tmp` file which is synced and then renamed over the target, so a
/// crash mid-write leaves the previous record intact. On Unix the file is created with mode
/// `0600`.
#[derive(Clone, Debug)]
pub struct FileTokenCache {
	path: PathBuf,
}
impl FileTokenCache {
	/// Uses the file at `path`; it is created lazily on the first store.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Uses `token-<fingerprint>.json` inside `dir`, one slot per credential set.
	pub fn in_dir(dir: impl AsRef<Path>, credentials: &Credentials) -> Self {
		Self::new(dir.as_ref().join(format!("token-{}.json", credentials.fingerprint())))
	}

	/// Location of the cache file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_now(path: &Path) -> Result<Option<Token>, CacheError> {
		let bytes = match fs::read(path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
			Err(e) =>
				return Err(CacheError::Backend {
					message: format!("Failed to read {}: {e}", path.display()),
				}),
		};

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(None);
		}

		serde_json::from_slice(&bytes).map(Some).map_err(|e| CacheError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn write_now(path: &Path, token: &Token) -> Result<(), CacheError> {
		Self::ensure_parent_exists(path)?;

		let serialized = serde_json::to_vec(token).map_err(|e| CacheError::Serialization {
			message: format!("Failed to serialize token: {e}"),
		})?;
		let tmp_path = temp_path(path);

		{
			let mut file = create_private(&tmp_path).map_err(|e| CacheError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| CacheError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| CacheError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, path).map_err(|e| CacheError::Backend {
			message: format!("Failed to replace {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), CacheError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| CacheError::Backend {
				message: format!("Failed to create cache directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}
}
impl TokenCache for FileTokenCache {
	fn load(&self) -> CacheFuture<'_, Option<Token>> {
		Box::pin(async move { Self::read_now(&self.path) })
	}

	fn store<'a>(&'a self, token: &'a Token) -> CacheFuture<'a, ()> {
		Box::pin(async move { Self::write_now(&self.path, token) })
	}
}

// Appends to the full file name so `token.json` and `token.tmp` never share a temp file.
fn temp_path(path: &Path) -> PathBuf {
	let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();

	name.push(".tmp");

	path.with_file_name(name)
}

fn create_private(path: &Path) -> io::Result<File> {
	let mut options = OpenOptions::new();

	options.write(true).create(true).truncate(true);

	#[cfg(unix)]
	{
		use std::os::unix::fs::OpenOptionsExt;

		options.mode(0o600);
	}

	options.open(path)
}
