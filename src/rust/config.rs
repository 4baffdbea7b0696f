use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::chat::DEFAULT_GEMINI_MODEL;
use crate::runtime::RuntimeConfig;

/// Command-line and environment settings for the HTTP server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Plant disease detection server", long_about = None)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "AGROVISION_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "AGROVISION_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Path of the ONNX model artifact
    #[arg(short, long, env = "AGROVISION_MODEL", default_value = "plant_disease_model.onnx")]
    pub model: PathBuf,

    /// Download the artifact from this URL into the cache directory when it is missing
    #[arg(long, env = "AGROVISION_MODEL_URL")]
    pub model_url: Option<String>,

    /// Expected SHA-256 of the artifact (hex)
    #[arg(long, env = "AGROVISION_MODEL_SHA256")]
    pub model_sha256: Option<String>,

    /// ONNX Runtime intra-op threads (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    pub intra_threads: usize,

    /// API key for the chat backend; chat answers with a fallback reply when unset
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Chat backend model name
    #[arg(long, default_value = DEFAULT_GEMINI_MODEL)]
    pub gemini_model: String,

    /// Largest accepted request body, in megabytes
    #[arg(long, default_value_t = 16)]
    pub max_upload_mb: usize,
}

impl ServerConfig {
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig::default().with_intra_threads(self.intra_threads)
    }

    pub fn bind_address(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}
