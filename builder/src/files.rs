use pocketd_common::api::v1::FileRef;
use pocketd_common::errors::*;
use pocketd_common::http;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;
use url::Url;

/// Hash a file into the reference the daemon stores for it
pub fn file_ref(path: &Path) -> Result<FileRef> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format_err!("Invalid filename: {:?}", path))?
        .to_string();

    let mut file = File::open(path).with_context(|| anyhow!("Failed to open {:?}", path))?;
    let mut hasher = Sha256::new();
    let size = io::copy(&mut file, &mut hasher)?;

    Ok(FileRef {
        filename,
        sha256: data_encoding::HEXLOWER.encode(&hasher.finalize()),
        size: i64::try_from(size)?,
    })
}

/// Content addressed upload target, files are PUT to `<base>/<sha256>`
pub struct Librarian {
    client: http::Client,
    base: Url,
}

impl Librarian {
    pub fn new(base: &str) -> Result<Librarian> {
        let mut base =
            Url::parse(base).with_context(|| anyhow!("Invalid librarian url: {base:?}"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Librarian {
            client: http::client()?,
            base,
        })
    }

    pub async fn upload(&self, file: &FileRef, path: &Path) -> Result<()> {
        let body = tokio::fs::read(path)
            .await
            .with_context(|| anyhow!("Failed to read {:?}", path))?;
        let url = self.base.join(&file.sha256)?;
        debug!("Uploading {:?} to {}", file.filename, url);
        self.client
            .put(url)
            .body(body)
            .send()
            .await?
            .error_for_status()
            .with_context(|| anyhow!("Librarian rejected {:?}", file.filename))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_file_ref() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello_2.10-3_amd64.deb");
        fs::write(&path, b"hello world").unwrap();

        let file = file_ref(&path).unwrap();
        assert_eq!(
            file,
            FileRef {
                filename: "hello_2.10-3_amd64.deb".to_string(),
                sha256: "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
                    .to_string(),
                size: 11,
            }
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(file_ref(&dir.path().join("nope.deb")).is_err());
    }
}
