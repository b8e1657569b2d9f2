// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a fine-tuning run in order:
//
//   Step 1: Validate the run config          (Layer 2)
//   Step 2: Make the split files available   (Layer 4 - data)
//   Step 3: Resolve pretrained artifacts     (Layer 6 - infra)
//   Step 4: Open tokenizer, encoder, model   (Layers 4-5)
//   Step 5: Encode train / valid splits      (Layer 4 - data)
//   Step 6: Create the run directory         (Layer 6 - infra)
//   Step 7: Run the fine-tuning loop         (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;

use crate::application::config::RunConfig;
use crate::application::corpus_use_case::PrepareCorpusUseCase;
use crate::application::pretrained::PretrainedModel;
use crate::data::dataset::TranslationDataset;
use crate::domain::sentence_pair::Split;
use crate::infra::{checkpoint::CheckpointManager, hub::ModelHub};
use crate::ml::trainer::{FineTuner, TrainingSummary};

pub struct TrainUseCase {
    config: RunConfig,
    hub:    ModelHub,
}

impl TrainUseCase {
    pub fn new(config: RunConfig) -> Self {
        Self { config, hub: ModelHub::from_env() }
    }

    /// Execute the full fine-tuning pipeline end to end
    pub fn execute(&self) -> Result<TrainingSummary> {
        let cfg = &self.config;

        // ── Step 1: Reject bad settings before touching anything ─────────────
        cfg.validate()?;

        // ── Step 2: Corpus ────────────────────────────────────────────────────
        let files       = PrepareCorpusUseCase::new(cfg).execute()?;
        let train_pairs = files.read(Split::Train)?;
        let valid_pairs = files.read(Split::Valid)?;
        tracing::info!("Split sizes: {} train, {} valid", train_pairs.len(), valid_pairs.len());

        // ── Step 3 + 4: Pretrained model ──────────────────────────────────────
        let artifacts = self.hub.resolve(&cfg.model)?;
        let PretrainedModel { encoder, mut model } = PretrainedModel::open(cfg, &artifacts)?;

        // ── Step 5: Encode ────────────────────────────────────────────────────
        let train = TranslationDataset::encode(Split::Train, &train_pairs, &encoder)?;
        let valid = TranslationDataset::encode(Split::Valid, &valid_pairs, &encoder)?;

        // ── Step 6: Run directory ─────────────────────────────────────────────
        let checkpoints = CheckpointManager::start_run(&cfg.checkpoint_dir)?;

        // ── Step 7: Fine-tune ─────────────────────────────────────────────────
        let tuner = FineTuner::new(cfg.train_options(), &checkpoints, cfg);
        tuner.run(model.as_mut(), encoder.tokenizer(), &train, &valid)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::evaluate_use_case::EvaluateUseCase;
    use crate::application::init_use_case::{InitModelUseCase, ModelShape};
    use crate::application::translate_use_case::TranslatorKind;
    use crate::data::split_file::write_split;
    use crate::domain::errors::PipelineError;
    use crate::domain::sentence_pair::SentencePair;
    use crate::scoring::tokenize::BleuTokenizer;
    use std::path::Path;

    fn tiny_config(root: &Path) -> RunConfig {
        let corpus = root.join("corpus.tsv");
        let pairs: Vec<SentencePair> = [
            ("猫が好きです", "고양이를 좋아해요"),
            ("今日は寒いです", "오늘은 추워요"),
            ("ありがとう", "감사합니다"),
            ("おはよう", "안녕하세요"),
            ("水をください", "물 주세요"),
            ("駅はどこですか", "역은 어디예요"),
            ("犬が好きです", "개를 좋아해요"),
            ("明日は暑いです", "내일은 더워요"),
            ("さようなら", "안녕히 가세요"),
            ("本を読みます", "책을 읽어요"),
        ]
        .iter()
        .map(|(s, t)| SentencePair::new(*s, *t))
        .collect();

        let cfg = RunConfig {
            model:          root.join("base").display().to_string(),
            corpus_file:    Some(corpus.clone()),
            data_dir:       root.join("data"),
            checkpoint_dir: root.join("checkpoints"),
            epochs:         1,
            batch_size:     4,
            max_length:     16,
            max_new_tokens: 8,
            learning_rate:  1e-3,
            valid_fraction: 0.2,
            test_fraction:  0.2,
            bleu_tokenize:  BleuTokenizer::Char,
            ..RunConfig::default()
        };
        write_split(&corpus, &cfg.columns(), &pairs).unwrap();
        cfg
    }

    fn tiny_shape() -> ModelShape {
        ModelShape { d_model: 16, d_ff: 32, n_heads: 2, n_layers: 1, dropout: 0.0 }
    }

    #[test]
    fn test_invalid_config_stops_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig { epochs: 0, ..tiny_config(dir.path()) };

        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Configuration(_))));
        assert!(!dir.path().join("data").exists());
        assert!(!dir.path().join("checkpoints").exists());
    }

    #[test]
    fn test_init_train_evaluate_on_cpu() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());

        InitModelUseCase::new(cfg.clone(), tiny_shape(), dir.path().join("base"))
            .execute()
            .unwrap();

        let summary = TrainUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(summary.epochs.len(), 1);
        assert!(summary.epochs[0].train_loss.is_finite());

        let checkpoint = summary.final_checkpoint().unwrap();
        assert!(checkpoint.join("model.mpk").is_file());
        assert!(checkpoint.join("run_config.json").is_file());

        let report = EvaluateUseCase::new(cfg.clone(), TranslatorKind::Model)
            .with_checkpoint(cfg.checkpoint_dir.clone())
            .execute()
            .unwrap();
        assert_eq!(report.predictions.len(), report.references.len());
        assert_eq!(report.scores.len(), 3);
        assert!(report.scores.iter().all(|m| m.score >= 0.0));
    }
}
