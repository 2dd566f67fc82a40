//! Configuração do scribeflow carregada a partir de `scribeflow.toml`.
//!
//! A struct [`ScribeConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `SCRIBEFLOW_API_KEY` e `SCRIBEFLOW_SERVER_URL`
//! têm precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::job::JobClassifier;
use crate::poller::JobPoller;

pub const DEFAULT_CONFIG_FILE: &str = "scribeflow.toml";
pub const API_KEY_ENV: &str = "SCRIBEFLOW_API_KEY";
pub const SERVER_URL_ENV: &str = "SCRIBEFLOW_SERVER_URL";

/// Configuração de nível superior carregada de `scribeflow.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScribeConfig {
    /// URL base do servidor de transcrição.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Token enviado como `Authorization: Bearer`.
    #[serde(default)]
    pub api_key: String,

    /// Idioma da fala. Vazio deixa o servidor detectar.
    #[serde(default)]
    pub language: Option<String>,

    /// Solicita a correção automática depois de cada transcrição.
    #[serde(default = "default_auto_correct")]
    pub auto_correct: bool,

    /// Intervalo entre consultas a um job em background, em milissegundos.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Número máximo de consultas antes de desistir do job.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Tempo em execução após o qual um job é considerado travado.
    #[serde(default = "default_stuck_job_secs")]
    pub stuck_job_secs: u64,
}

// Valor padrão para o servidor: instância local.
fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_auto_correct() -> bool {
    true
}

// Valor padrão para o intervalo de polling: 1500ms.
fn default_poll_interval_ms() -> u64 {
    1500
}

fn default_max_poll_attempts() -> u32 {
    200
}

// Cinco minutos, o mesmo limite do classificador.
fn default_stuck_job_secs() -> u64 {
    300
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            api_key: String::new(),
            language: None,
            auto_correct: default_auto_correct(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            stuck_job_secs: default_stuck_job_secs(),
        }
    }
}

impl ScribeConfig {
    /// Carrega a configuração do caminho informado ou de `scribeflow.toml`
    /// no diretório atual. Usa valores padrão se o arquivo padrão não existir;
    /// um caminho explícito inexistente é erro.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = toml::from_str::<ScribeConfig>(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    // Variáveis de ambiente têm precedência sobre o arquivo de configuração.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV)
            && !key.is_empty()
        {
            self.api_key = key;
        }
        if let Some(url) = lookup(SERVER_URL_ENV)
            && !url.is_empty()
        {
            self.server_url = url;
        }
    }

    /// Chave da API, ou `None` se não configurada.
    pub fn api_key(&self) -> Option<String> {
        Some(self.api_key.clone()).filter(|k| !k.is_empty())
    }

    /// Idioma configurado, ignorando strings vazias.
    pub fn language(&self) -> Option<String> {
        self.language.clone().filter(|l| !l.trim().is_empty())
    }

    /// Monta o poller de jobs a partir dos limites configurados.
    pub fn poller(&self) -> JobPoller {
        JobPoller::new(
            Duration::from_millis(self.poll_interval_ms),
            self.max_poll_attempts,
            JobClassifier::new(Duration::from_secs(self.stuck_job_secs)),
        )
    }
}
