//! Interface de terminal do scribeflow: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`PollProgress`] acompanha visualmente o
//! polling de um job; o [`ConsoleSink`] recebe as atualizações do fluxo de
//! transcrição e as imprime.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use scribeflow::job::{JobPhase, JobResult};
use scribeflow::transcription::{Outcome, TextStatus, TranscriptionSink, UiUpdate};
use scribeflow::validation::Validation;

/// Paleta usada em toda a saída do terminal.
struct Palette {
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl Palette {
    fn new() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Indicador visual do polling de um job em background.
///
/// Exibe um spinner enquanto o job processa, prévias de streaming em cinza
/// e avisos de job travado em amarelo.
pub struct PollProgress {
    pb: ProgressBar,
    palette: Palette,
}

impl PollProgress {
    /// Inicia o spinner para o job informado.
    pub fn start(job_id: &str) -> Self {
        Self {
            pb: spinner(format!("Waiting for job {job_id}")),
            palette: Palette::new(),
        }
    }

    /// Mostra um resultado intermediário (prévia ou aviso).
    pub fn observe(&self, result: &JobResult) {
        if let Some(warning) = &result.error {
            self.pb
                .println(format!("  {} {warning}", self.palette.yellow.apply_to("!")));
        }
        if let Some(partial) = &result.text {
            self.pb.set_message(format!(
                "Streaming: {}",
                self.palette.dim.apply_to(preview(partial))
            ));
        }
    }

    /// Finaliza o spinner sem deixar rastro.
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

/// Spinner simples para requisições únicas (transcrição, correção).
pub struct Busy(ProgressBar);

impl Busy {
    pub fn start(message: &str) -> Self {
        Self(spinner(message.to_string()))
    }

    pub fn finish(&self) {
        self.0.finish_and_clear();
    }
}

// Última linha da prévia, limitada a 60 caracteres.
fn preview(text: &str) -> String {
    let line = text.lines().last().unwrap_or_default().trim();
    let chars: Vec<char> = line.chars().collect();
    if chars.len() > 60 {
        let tail: String = chars[chars.len() - 60..].iter().collect();
        format!("...{tail}")
    } else {
        line.to_string()
    }
}

/// Imprime o veredito da validação de um texto.
pub fn print_validation(validation: &Validation) {
    let palette = Palette::new();
    match validation {
        Validation::Valid => println!("  {} Text is valid", palette.green.apply_to("✓")),
        Validation::Invalid(reason) => println!("  {} {reason}", palette.red.apply_to("✗")),
    }
}

/// Imprime o resultado classificado de um job, seguido do JSON completo.
pub fn print_job_result(result: &JobResult) {
    let palette = Palette::new();
    let style = match result.status {
        JobPhase::Completed => &palette.green,
        JobPhase::Failed => &palette.red,
        JobPhase::Processing => &palette.yellow,
    };
    println!("  {}", style.apply_to(result.status));
    if let Some(text) = &result.text {
        println!("{text}");
    }
    if let Some(error) = &result.error {
        println!("  {}", palette.red.apply_to(error));
    }
    println!();
    println!("{}", style.apply_to("─── Job Result ───"));
    println!(
        "{}",
        serde_json::to_string_pretty(result).unwrap_or_default()
    );
}

/// Imprime a decisão final do fluxo de transcrição.
pub fn print_outcome(outcome: &Outcome) {
    let palette = Palette::new();
    match outcome {
        Outcome::Transcribed { text } | Outcome::Corrected { corrected: text, .. } => {
            println!("  {} {text}", palette.green.apply_to("✓"));
        }
        Outcome::FellBack { text, cause } => {
            println!("  {} {text}", palette.green.apply_to("✓"));
            println!(
                "  {} correction skipped: {cause}",
                palette.yellow.apply_to("!")
            );
        }
        Outcome::AwaitingJob { job_id, .. } => {
            println!(
                "  {} still running as job {job_id}",
                palette.yellow.apply_to("…")
            );
        }
        Outcome::Rejected { reason, .. } => {
            println!("  {} {reason}", palette.red.apply_to("✗"));
        }
        Outcome::Failed { error } => {
            println!("  {} {error}", palette.red.apply_to("✗"));
        }
    }
}

/// [`TranscriptionSink`] que escreve as atualizações no terminal.
///
/// Só mostra o texto bruto no modo verbose; o resultado final é impresso
/// por [`print_outcome`].
pub struct ConsoleSink {
    verbose: bool,
    palette: Palette,
    pub status: TextStatus,
}

impl ConsoleSink {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            palette: Palette::new(),
            status: TextStatus::Idle,
        }
    }
}

impl TranscriptionSink for ConsoleSink {
    fn update(&mut self, update: UiUpdate) -> anyhow::Result<()> {
        match update {
            UiUpdate::RawText(text) if self.verbose => {
                println!("  {} {text}", self.palette.dim.apply_to("raw:"));
            }
            UiUpdate::Status(status) => self.status = status,
            _ => {}
        }
        Ok(())
    }

    fn on_correction_complete(&mut self, raw: Option<&str>, corrected: &str) -> anyhow::Result<()> {
        if self.verbose && raw != Some(corrected) {
            println!("  {} {corrected}", self.palette.dim.apply_to("corrected:"));
        }
        Ok(())
    }
}
