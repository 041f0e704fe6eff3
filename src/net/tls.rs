//! TLS configuration and certificate loading.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::error::ServerError;

/// Load and check PEM key material before any listener is bound.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, ServerError> {
    let cert = read_pem(cert_path).await?;
    let key = read_pem(key_path).await?;

    let certs = rustls_pemfile::certs(&mut cert.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| material_error(cert_path, e))?;
    if certs.is_empty() {
        return Err(material_error(cert_path, "no certificate found"));
    }
    match rustls_pemfile::private_key(&mut key.as_slice()) {
        Ok(Some(_)) => {}
        Ok(None) => return Err(material_error(key_path, "no private key found")),
        Err(e) => return Err(material_error(key_path, e)),
    }

    let config = RustlsConfig::from_pem(cert, key)
        .await
        .map_err(|e| material_error(cert_path, e))?;
    tracing::info!(
        cert = %cert_path.display(),
        certificates = certs.len(),
        "TLS material loaded"
    );
    Ok(config)
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, ServerError> {
    tokio::fs::read(path).await.map_err(|e| material_error(path, e))
}

fn material_error(path: &Path, reason: impl ToString) -> ServerError {
    ServerError::TlsMaterial {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn self_signed(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_path = dir.join("cert.pem");
        let key_path = dir.join("key.pem");
        fs::write(&cert_path, cert.pem()).unwrap();
        fs::write(&key_path, key_pair.serialize_pem()).unwrap();
        (cert_path, key_path)
    }

    #[tokio::test]
    async fn test_load_valid_material() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key) = self_signed(dir.path());
        assert!(load_tls_config(&cert, &key).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, _) = self_signed(dir.path());
        let missing = dir.path().join("missing.pem");

        match load_tls_config(&cert, &missing).await {
            Err(ServerError::TlsMaterial { path, .. }) => assert_eq!(path, missing),
            Err(other) => panic!("expected TlsMaterial, got {other:?}"),
            Ok(_) => panic!("missing key file was accepted"),
        }
    }

    #[tokio::test]
    async fn test_garbage_material() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key) = self_signed(dir.path());
        fs::write(&key, "not a key").unwrap();
        assert!(matches!(
            load_tls_config(&cert, &key).await,
            Err(ServerError::TlsMaterial { .. })
        ));

        fs::write(&cert, "not a certificate").unwrap();
        assert!(matches!(
            load_tls_config(&cert, &key).await,
            Err(ServerError::TlsMaterial { .. })
        ));
    }
}
