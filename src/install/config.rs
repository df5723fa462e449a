use anyhow::Result;
use reqwest::Client;
use std::path::PathBuf;

use crate::{
    archive::{ArchiveExtractor, Extractor},
    http::HttpClient,
};

pub struct Config<E: Extractor> {
    pub http: HttpClient,
    pub extractor: E,
    pub install_root: Option<PathBuf>,
}

impl Config<ArchiveExtractor> {
    pub fn new(install_root: Option<PathBuf>) -> Result<Self> {
        let client = Client::builder().user_agent("sfi-cli").build()?;

        Ok(Self {
            http: HttpClient::new(client),
            extractor: ArchiveExtractor::new(),
            install_root,
        })
    }
}
