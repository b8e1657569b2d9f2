// ============================================================
// Layer 5 — Seq2Seq Transformer
// ============================================================
// An encoder-decoder transformer in the NLLB layout, built from
// burn's stock transformer blocks:
//
//   input_ids ─▶ embed ─▶ TransformerEncoder ─▶ memory
//                                                  │
//   decoder_input_ids ─▶ embed ─▶ TransformerDecoder ─▶ Linear ─▶ logits
//
// One token embedding is shared by encoder and decoder (the
// vocabulary is shared across languages). Positions are learned.
//
// The architecture is fixed by `Seq2SeqConfig`, which is saved
// as model_config.json next to the weights so a pretrained or
// fine-tuned directory can always be rebuilt before loading.

use burn::{
    nn::{
        attention::generate_autoregressive_mask,
        loss::CrossEntropyLossConfig,
        transformer::{
            TransformerDecoder, TransformerDecoderConfig, TransformerDecoderInput,
            TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput,
        },
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::data::batcher::TranslationBatch;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    pub vocab_size:       usize,
    pub d_model:          usize,
    pub d_ff:             usize,
    pub n_heads:          usize,
    pub n_encoder_layers: usize,
    pub n_decoder_layers: usize,
    /// Longest source or decoder sequence the position table covers
    pub max_positions:    usize,
    #[config(default = 0.1)]
    pub dropout:          f64,
}

impl Seq2SeqConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Seq2SeqTransformer<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_positions, self.d_model).init(device);

        let encoder = TransformerEncoderConfig::new(
            self.d_model, self.d_ff, self.n_heads, self.n_encoder_layers,
        )
        .with_dropout(self.dropout)
        .with_norm_first(true)
        .init(device);

        let decoder = TransformerDecoderConfig::new(
            self.d_model, self.d_ff, self.n_heads, self.n_decoder_layers,
        )
        .with_dropout(self.dropout)
        .with_norm_first(true)
        .init(device);

        let lm_head = LinearConfig::new(self.d_model, self.vocab_size).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();

        Seq2SeqTransformer {
            token_embedding, position_embedding,
            encoder, decoder, lm_head, dropout,
            vocab_size:    self.vocab_size,
            max_positions: self.max_positions,
        }
    }
}

#[derive(Module, Debug)]
pub struct Seq2SeqTransformer<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub encoder:            TransformerEncoder<B>,
    pub decoder:            TransformerDecoder<B>,
    pub lm_head:            Linear<B>,
    pub dropout:            Dropout,
    pub vocab_size:         usize,
    pub max_positions:      usize,
}

/// Encoder output plus the pad mask the decoder needs for cross-attention
pub struct EncoderState<B: Backend> {
    pub memory:   Tensor<B, 3>,
    pub pad_mask: Tensor<B, 2, Bool>,
}

impl<B: Backend> Seq2SeqTransformer<B> {
    /// ids: [batch, seq_len] → [batch, seq_len, d_model]
    fn embed(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = ids.dims();
        let tok_emb = self.token_embedding.forward(ids);

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        self.dropout.forward(tok_emb + pos_emb)
    }

    pub fn encode(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> EncoderState<B> {
        let pad_mask = attention_mask.equal_elem(0);
        let x        = self.embed(input_ids);
        let memory   = self.encoder.forward(
            TransformerEncoderInput::new(x).mask_pad(pad_mask.clone()),
        );
        EncoderState { memory, pad_mask }
    }

    /// decoder_input_ids: [batch, t] → logits [batch, t, vocab]
    pub fn decode(&self, decoder_input_ids: Tensor<B, 2, Int>, state: &EncoderState<B>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = decoder_input_ids.dims();
        let device = decoder_input_ids.device();

        let causal = generate_autoregressive_mask::<B>(batch_size, seq_len, &device);
        let x      = self.embed(decoder_input_ids);

        let hidden = self.decoder.forward(
            TransformerDecoderInput::new(x, state.memory.clone())
                .target_mask_attn(causal)
                .memory_mask_pad(state.pad_mask.clone()),
        );
        self.lm_head.forward(hidden)
    }

    /// Teacher-forced forward pass → logits [batch, seq_len, vocab]
    pub fn forward(&self, batch: &TranslationBatch<B>) -> Tensor<B, 3> {
        let state = self.encode(batch.input_ids.clone(), batch.attention_mask.clone());
        self.decode(batch.decoder_input_ids.clone(), &state)
    }

    /// Mean token cross-entropy against the labels, pad positions ignored
    pub fn forward_loss(&self, batch: &TranslationBatch<B>, pad: u32) -> Tensor<B, 1> {
        let logits = self.forward(batch);
        let [batch_size, seq_len, vocab] = logits.dims();

        let ce = CrossEntropyLossConfig::new()
            .with_pad_tokens(Some(vec![pad as usize]))
            .init(&logits.device());

        ce.forward(
            logits.reshape([batch_size * seq_len, vocab]),
            batch.labels.clone().reshape([batch_size * seq_len]),
        )
    }

    /// Greedy decoding.
    ///
    /// Every row starts from `decoder_start`; `forced_bos`, when set, is
    /// written as the first output token instead of the argmax. A row is
    /// finished once it emits `eos`. The returned rows exclude the start
    /// token and the final eos.
    pub fn generate_greedy(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        decoder_start:  u32,
        eos:            u32,
        forced_bos:     Option<u32>,
        max_new_tokens: usize,
    ) -> Vec<Vec<u32>> {
        let [batch_size, _] = input_ids.dims();
        if batch_size == 0 {
            return Vec::new();
        }
        let device = input_ids.device();
        let state  = self.encode(input_ids, attention_mask);

        // Decoder positions include the start token
        let steps = max_new_tokens.min(self.max_positions.saturating_sub(1));

        let mut sequences: Vec<Vec<u32>> = vec![vec![decoder_start]; batch_size];
        let mut outputs:   Vec<Vec<u32>> = vec![Vec::new(); batch_size];
        let mut finished = vec![false; batch_size];

        for step in 0..steps {
            let next: Vec<u32> = match (step, forced_bos) {
                (0, Some(tag)) => vec![tag; batch_size],
                _ => {
                    let len  = sequences[0].len();
                    let flat: Vec<i32> = sequences.iter().flatten().map(|&x| x as i32).collect();
                    let ids  = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &device)
                        .reshape([batch_size, len]);

                    let logits = self.decode(ids, &state);
                    let [_, _, vocab] = logits.dims();
                    logits
                        .slice([0..batch_size, len - 1..len])
                        .reshape([batch_size, vocab])
                        .argmax(1)
                        .into_data()
                        .iter::<i64>()
                        .map(|x| x as u32)
                        .collect()
                }
            };

            for (row, &token) in next.iter().enumerate() {
                if finished[row] {
                    sequences[row].push(eos);
                    continue;
                }
                sequences[row].push(token);
                if token == eos {
                    finished[row] = true;
                } else {
                    outputs[row].push(token);
                }
            }

            if finished.iter().all(|&f| f) {
                break;
            }
        }

        outputs
    }
}
