use crate::http::HttpClient;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

/// Fetches a formula's source archive into a temporary file.
///
/// Transient network errors are retried by the HTTP layer; the bytes are
/// not trusted until the caller verifies them against the formula's
/// declared checksum.
#[tracing::instrument(skip(runtime, archive_path, http_client))]
pub async fn fetch_source_archive<R: Runtime>(
    runtime: &R,
    url: &str,
    archive_path: &Path,
    http_client: &HttpClient,
) -> Result<()> {
    info!("Downloading source archive from {}...", url);

    let archive_path = archive_path.to_path_buf();
    http_client
        .download_file(url, || {
            runtime
                .create_file(&archive_path)
                .with_context(|| format!("Failed to create archive file at {:?}", archive_path))
        })
        .await?;

    info!("Source archive downloaded.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use reqwest::Client;

    const ARCHIVE: &str = "qvm-ffmpeg-v0.0.0-test3-g.tar.gz";

    #[test_log::test(tokio::test)]
    async fn test_fetch_source_archive() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", format!("/{}", ARCHIVE).as_str())
            .with_status(200)
            .with_body("archive bytes")
            .create_async()
            .await;

        let mut runtime = MockRuntime::new();
        runtime
            .expect_create_file()
            .with(mockall::predicate::eq(Path::new(ARCHIVE).to_path_buf()))
            .returning(|_| Ok(Box::new(std::io::sink())));

        let http_client = HttpClient::new(Client::new());
        let result = fetch_source_archive(
            &runtime,
            &format!("{}/{}", url, ARCHIVE),
            Path::new(ARCHIVE),
            &http_client,
        )
        .await;

        mock.assert_async().await;
        assert!(result.is_ok());
    }

    #[test_log::test(tokio::test)]
    async fn test_fetch_source_archive_not_found() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", format!("/{}", ARCHIVE).as_str())
            .with_status(404)
            .create_async()
            .await;

        // No expectations: the archive file must never be created when
        // the server rejects the request
        let runtime = MockRuntime::new();

        let http_client = HttpClient::new(Client::new());
        let result = fetch_source_archive(
            &runtime,
            &format!("{}/{}", url, ARCHIVE),
            Path::new(ARCHIVE),
            &http_client,
        )
        .await;

        mock.assert_async().await;
        assert!(result.is_err());
    }
}
