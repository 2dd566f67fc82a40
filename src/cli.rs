//! Interface de linha de comando do scribeflow baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (validate, extract,
//! classify, transcribe, correct, poll) e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// scribeflow: transcrição de voz com correção e acompanhamento de jobs.
#[derive(Debug, Parser)]
#[command(name = "scribeflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./scribeflow.toml).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verifica se um texto é aceitável como resultado de transcrição.
    Validate {
        /// Texto a validar.
        text: String,
    },

    /// Extrai o texto da resposta de um job salvo em JSON.
    Extract {
        /// Arquivo JSON com o registro do job.
        job: PathBuf,
    },

    /// Classifica o estado de um job salvo em JSON.
    Classify {
        /// Arquivo JSON com o registro do job.
        job: PathBuf,
    },

    /// Transcreve um arquivo de áudio e aplica a correção automática.
    Transcribe {
        /// Arquivo de áudio (webm, wav, mp3...).
        audio: PathBuf,

        /// Idioma da fala; sobrescreve a configuração.
        #[arg(long)]
        language: Option<String>,

        /// Identificador da sessão; gerado se omitido.
        #[arg(long)]
        session: Option<String>,

        /// Diretório do projeto enviado como contexto.
        #[arg(long)]
        project_dir: Option<String>,

        /// Desliga a correção automática.
        #[arg(long, default_value_t = false)]
        no_correct: bool,
    },

    /// Envia um texto para correção.
    Correct {
        /// Texto bruto a corrigir.
        text: String,

        #[arg(long)]
        language: Option<String>,

        #[arg(long)]
        session: Option<String>,
    },

    /// Acompanha um job em background até o resultado final.
    Poll {
        /// Identificador do job.
        job_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_transcribe_subcommand() {
        let cli = Cli::parse_from([
            "scribeflow",
            "transcribe",
            "clip.webm",
            "--language",
            "en",
            "--project-dir",
            "/work",
            "--no-correct",
        ]);
        match cli.command {
            Command::Transcribe {
                audio,
                language,
                session,
                project_dir,
                no_correct,
            } => {
                assert_eq!(audio, PathBuf::from("clip.webm"));
                assert_eq!(language.as_deref(), Some("en"));
                assert!(session.is_none());
                assert_eq!(project_dir.as_deref(), Some("/work"));
                assert!(no_correct);
            }
            _ => panic!("expected Transcribe command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "scribeflow",
            "--config",
            "custom.toml",
            "--verbose",
            "poll",
            "job-7",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Command::Poll { job_id } if job_id == "job-7"));
    }

    #[test]
    fn cli_parses_validate_subcommand() {
        let cli = Cli::parse_from(["scribeflow", "validate", "hello world"]);
        assert!(matches!(cli.command, Command::Validate { text } if text == "hello world"));
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
