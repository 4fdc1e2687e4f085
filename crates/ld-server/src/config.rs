//! Server configuration
//!
//! The listen address comes from the command line; everything that names
//! an external collaborator comes from the environment, matching how the
//! deployment provisions secrets.

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;

/// Command-line options
#[derive(Debug, Parser)]
#[command(name = "labdesk-server", about = "LabDesk backend-for-frontend")]
pub struct Options {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub listen: SocketAddr,
}

/// Environment-derived configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the managed backend.
    pub supabase_url: String,
    /// Service-role key used for table and storage calls.
    pub service_key: String,
    /// Generative-model API key; absent means agent endpoints serve 503.
    pub gemini_api_key: Option<String>,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let supabase_url =
            std::env::var("SUPABASE_URL").context("SUPABASE_URL must be set")?;
        let service_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .context("SUPABASE_SERVICE_ROLE_KEY must be set")?;
        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());
        let allowed_origins = parse_origins(
            &std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".into()),
        );

        Ok(Self {
            supabase_url,
            service_key,
            gemini_api_key,
            allowed_origins,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
