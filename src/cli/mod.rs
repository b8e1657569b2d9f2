// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and hands each subcommand to its Layer 2 use case:
//
//   fetch     → PrepareCorpusUseCase
//   init      → InitModelUseCase
//   train     → TrainUseCase
//   evaluate  → EvaluateUseCase
//   translate → TranslateUseCase
//
// Only this layer prints results to stdout.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, EvaluateArgs, FetchArgs, InitArgs, TrainArgs, TranslateArgs};

use crate::application::config::RunConfig;
use crate::domain::sentence_pair::Split;

#[derive(Parser, Debug)]
#[command(
    name = "koja_mt",
    version,
    about = "Fine-tune and evaluate a pretrained encoder-decoder model for Japanese→Korean translation."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the use case for the chosen subcommand
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Fetch(args)     => run_fetch(args),
            Commands::Init(args)      => run_init(args),
            Commands::Train(args)     => run_train(args),
            Commands::Evaluate(args)  => run_evaluate(args),
            Commands::Translate(args) => run_translate(args),
        }
    }
}

fn run_fetch(args: FetchArgs) -> Result<()> {
    use crate::application::corpus_use_case::PrepareCorpusUseCase;

    let cfg: RunConfig = args.into();
    cfg.validate()?;
    let files = PrepareCorpusUseCase::new(&cfg).execute()?;

    for split in Split::ALL {
        let rows = files.read(split)?.len();
        println!("{:<6} {:>8} pairs  {}", split, rows, files.path(split).display());
    }
    Ok(())
}

fn run_init(args: InitArgs) -> Result<()> {
    use crate::application::init_use_case::InitModelUseCase;

    let shape  = args.shape();
    let output = args.output.clone();
    let cfg: RunConfig = args.into();
    cfg.validate()?;

    let dir = InitModelUseCase::new(cfg, shape, output).execute()?;
    println!("Initial model written to {}", dir.display());
    println!("Fine-tune it with: koja_mt train --model {}", dir.display());
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let cfg: RunConfig = args.into();
    tracing::info!("Fine-tuning '{}' on {} → {}", cfg.model, cfg.source_lang, cfg.target_lang);

    let summary = TrainUseCase::new(cfg).execute()?;

    println!("\nepoch  train_loss  val_loss");
    for row in &summary.epochs {
        let val = row.val_loss.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
        println!("{:>5}  {:>10.4}  {:>8}", row.epoch, row.train_loss, val);
    }
    if let Some(dir) = summary.final_checkpoint() {
        println!("Training complete. Final checkpoint: {}", dir.display());
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let choice = args.translator.choice();
    let output = args.output.clone();
    let cfg: RunConfig = args.into();

    let mut use_case = EvaluateUseCase::new(cfg, choice.kind).with_gpt_model(choice.gpt_model);
    if let Some(path) = choice.checkpoint {
        use_case = use_case.with_checkpoint(path);
    }
    if let Some(path) = output {
        use_case = use_case.with_output(path);
    }

    let report = use_case.execute()?;
    println!("\nScored {} test sentences", report.predictions.len());
    for metric in &report.scores {
        println!("  {metric}");
    }
    Ok(())
}

fn run_translate(mut args: TranslateArgs) -> Result<()> {
    use crate::application::translate_use_case::TranslateUseCase;
    use std::io::BufRead;

    let mut texts = std::mem::take(&mut args.text);
    if texts.is_empty() {
        for line in std::io::stdin().lock().lines() {
            let line = line.context("Cannot read stdin")?;
            if !line.trim().is_empty() {
                texts.push(line);
            }
        }
    }

    let choice = args.translator.choice();
    let cfg: RunConfig = args.into();

    for translated in TranslateUseCase::new(cfg, choice).execute(&texts)? {
        println!("{translated}");
    }
    Ok(())
}
