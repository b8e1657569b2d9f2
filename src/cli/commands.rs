// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the five subcommands and their flags. Flags shared by
// several commands live in flattened argument groups.
//
// Every *Args struct converts into a RunConfig through From;
// the application layer never sees clap types.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::config::RunConfig;
use crate::application::init_use_case::ModelShape;
use crate::application::translate_use_case::{TranslatorChoice, TranslatorKind};
use crate::infra::remote_corpus::DEFAULT_DATASET;
use crate::infra::translators::DEFAULT_GPT_MODEL;
use crate::ml::seq2seq::ComputeDevice;
use crate::scoring::tokenize::BleuTokenizer;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the corpus and write train/valid/test split files
    Fetch(FetchArgs),

    /// Build a fresh character-level model from the train split
    Init(InitArgs),

    /// Fine-tune a pretrained model on the train split
    Train(TrainArgs),

    /// Score a checkpoint or a remote translator on the test split
    Evaluate(EvaluateArgs),

    /// Translate sentences (arguments, or one per stdin line)
    Translate(TranslateArgs),
}

// ─── Shared argument groups ───────────────────────────────────────────────────

/// Where the corpus comes from and how it is split
#[derive(Args, Debug)]
pub struct CorpusArgs {
    /// Directory holding train.tsv, valid.tsv and test.tsv
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Local TSV corpus with a header row (skips the download)
    #[arg(long)]
    pub corpus_file: Option<PathBuf>,

    /// Hugging Face dataset id served by datasets-server
    #[arg(long, default_value = DEFAULT_DATASET)]
    pub dataset: String,

    /// datasets-server split to page rows from
    #[arg(long = "hf-split", default_value = "train")]
    pub dataset_split: String,

    /// Maximum rows to download
    #[arg(long, default_value_t = 10_000)]
    pub max_rows: usize,

    #[arg(long, default_value = "ja")]
    pub source_column: String,

    #[arg(long, default_value = "ko")]
    pub target_column: String,

    #[arg(long, default_value_t = 0.1)]
    pub valid_fraction: f64,

    #[arg(long, default_value_t = 0.1)]
    pub test_fraction: f64,

    /// Seed for the corpus partition and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl CorpusArgs {
    fn apply(self, cfg: &mut RunConfig) {
        cfg.data_dir       = self.data_dir;
        cfg.corpus_file    = self.corpus_file;
        cfg.dataset        = self.dataset;
        cfg.dataset_split  = self.dataset_split;
        cfg.max_rows       = self.max_rows;
        cfg.source_column  = self.source_column;
        cfg.target_column  = self.target_column;
        cfg.valid_fraction = self.valid_fraction;
        cfg.test_fraction  = self.test_fraction;
        cfg.seed           = self.seed;
    }
}

/// Language codes and the model's language-tag tokens
#[derive(Args, Debug)]
pub struct LanguageArgs {
    #[arg(long, default_value = "ja")]
    pub source_lang: String,

    #[arg(long, default_value = "ko")]
    pub target_lang: String,

    /// Token prepended to every source sequence
    #[arg(long, default_value = "jpn_Jpan")]
    pub source_tag: String,

    /// Token prepended to every label and forced at generation start
    #[arg(long, default_value = "kor_Hang")]
    pub target_tag: String,

    /// The model has no language-tag tokens
    #[arg(long)]
    pub no_tags: bool,

    /// Do not force the target tag as the first generated token
    #[arg(long)]
    pub no_forced_tag: bool,
}

impl LanguageArgs {
    fn apply(self, cfg: &mut RunConfig) {
        cfg.source_lang = self.source_lang;
        cfg.target_lang = self.target_lang;
        if self.no_tags {
            cfg.source_tag = None;
            cfg.target_tag = None;
        } else {
            cfg.source_tag = Some(self.source_tag);
            cfg.target_tag = Some(self.target_tag);
        }
        cfg.force_target_tag = !self.no_tags && !self.no_forced_tag;
    }
}

/// Which translator to use and where its model lives
#[derive(Args, Debug)]
pub struct TranslatorArgs {
    #[arg(long, value_enum, default_value_t = TranslatorKind::Model)]
    pub translator: TranslatorKind,

    /// Epoch dir, run dir or checkpoint root (defaults to --checkpoint-dir)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// OpenAI model used by --translator openai
    #[arg(long, default_value = DEFAULT_GPT_MODEL)]
    pub gpt_model: String,

    #[arg(long, value_enum, default_value_t = ComputeDevice::Cpu)]
    pub device: ComputeDevice,

    /// Upper bound on generated tokens per sentence
    #[arg(long, default_value_t = 128)]
    pub max_new_tokens: usize,
}

impl TranslatorArgs {
    pub fn choice(&self) -> TranslatorChoice {
        TranslatorChoice {
            kind:       self.translator,
            checkpoint: self.checkpoint.clone(),
            gpt_model:  self.gpt_model.clone(),
        }
    }

    fn apply(self, cfg: &mut RunConfig) {
        cfg.checkpoint_dir = self.checkpoint_dir;
        cfg.device         = self.device;
        cfg.max_new_tokens = self.max_new_tokens;
    }
}

// ─── fetch ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,
}

impl From<FetchArgs> for RunConfig {
    fn from(a: FetchArgs) -> Self {
        let mut cfg = RunConfig::default();
        a.corpus.apply(&mut cfg);
        cfg
    }
}

// ─── init ─────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[command(flatten)]
    pub languages: LanguageArgs,

    /// Directory to write tokenizer.json, model_config.json and weights
    #[arg(long, default_value = "models/koja-base")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    /// d_model must be divisible by n_heads
    #[arg(long, default_value_t = 8)]
    pub n_heads: usize,

    /// Encoder layers; the decoder gets the same number
    #[arg(long, default_value_t = 3)]
    pub n_layers: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Longest sequence the position table must cover
    #[arg(long, default_value_t = 128)]
    pub max_length: usize,
}

impl InitArgs {
    pub fn shape(&self) -> ModelShape {
        ModelShape {
            d_model:  self.d_model,
            d_ff:     self.d_ff,
            n_heads:  self.n_heads,
            n_layers: self.n_layers,
            dropout:  self.dropout,
        }
    }
}

impl From<InitArgs> for RunConfig {
    fn from(a: InitArgs) -> Self {
        let mut cfg = RunConfig { max_length: a.max_length, ..RunConfig::default() };
        a.corpus.apply(&mut cfg);
        a.languages.apply(&mut cfg);
        cfg
    }
}

// ─── train ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Pretrained model: a local directory or an "org/name" hub id
    #[arg(long, default_value = "models/koja-base")]
    pub model: String,

    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[command(flatten)]
    pub languages: LanguageArgs,

    /// Directory that receives one run-… directory per training run
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[arg(long, default_value_t = 2e-5)]
    pub lr: f64,

    /// Number of full passes through the training split
    #[arg(long, default_value_t = 3)]
    pub epochs: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Token length of every encoded source and label sequence
    #[arg(long, default_value_t = 128)]
    pub max_length: usize,

    #[arg(long, value_enum, default_value_t = ComputeDevice::Cpu)]
    pub device: ComputeDevice,
}

impl From<TrainArgs> for RunConfig {
    fn from(a: TrainArgs) -> Self {
        let mut cfg = RunConfig {
            model:          a.model,
            checkpoint_dir: a.checkpoint_dir,
            learning_rate:  a.lr,
            epochs:         a.epochs,
            batch_size:     a.batch_size,
            max_length:     a.max_length,
            device:         a.device,
            ..RunConfig::default()
        };
        a.corpus.apply(&mut cfg);
        a.languages.apply(&mut cfg);
        cfg
    }
}

// ─── evaluate ─────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub translator: TranslatorArgs,

    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[command(flatten)]
    pub languages: LanguageArgs,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Segment tokenizer for BLEU: 13a, char or none
    #[arg(long, value_enum, default_value_t = BleuTokenizer::Mteval13a)]
    pub bleu_tokenize: BleuTokenizer,

    /// Write predictions and references to this TSV file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl From<EvaluateArgs> for RunConfig {
    fn from(a: EvaluateArgs) -> Self {
        let mut cfg = RunConfig {
            batch_size:    a.batch_size,
            bleu_tokenize: a.bleu_tokenize,
            ..RunConfig::default()
        };
        a.translator.apply(&mut cfg);
        a.corpus.apply(&mut cfg);
        a.languages.apply(&mut cfg);
        cfg
    }
}

// ─── translate ────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// Sentences to translate; read from stdin when none are given
    pub text: Vec<String>,

    #[command(flatten)]
    pub translator: TranslatorArgs,

    #[command(flatten)]
    pub languages: LanguageArgs,
}

impl From<TranslateArgs> for RunConfig {
    fn from(a: TranslateArgs) -> Self {
        let mut cfg = RunConfig::default();
        a.translator.apply(&mut cfg);
        a.languages.apply(&mut cfg);
        cfg
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use crate::application::config::RunConfig;
    use crate::cli::commands::Commands;
    use crate::cli::Cli;
    use clap::Parser;

    fn fetch_config(args: &[&str]) -> RunConfig {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Fetch(a) => a.into(),
            other => panic!("expected fetch, got {other:?}"),
        }
    }

    #[test]
    fn test_hf_split_reaches_run_config() {
        let cfg = fetch_config(&["koja_mt", "fetch", "--hf-split", "validation"]);
        assert_eq!(cfg.dataset_split, "validation");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_hf_split_defaults_to_train() {
        assert_eq!(fetch_config(&["koja_mt", "fetch"]).dataset_split, "train");
    }
}
