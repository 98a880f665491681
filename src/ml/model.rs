// ============================================================
// Layer 5 — Patch Transformer Classifier
// ============================================================
// Backbone + binary head.
//
//   signals [batch, C, P, patch]
//       │  reshape → [batch, C·P, patch]
//       ▼
//   patch_embed (Linear patch → d_model)
//       + channel embedding (which electrode)
//       + position embedding (which patch within the segment)
//       │
//       ▼
//   EncoderBlock × num_layers   (self-attention + GELU FFN)
//       │
//       ▼
//   final_norm → [batch, C·P, d_model]           ← backbone ends here
//       │
//   mean over tokens → dropout → Linear → GELU → Linear(→1)
//       ▼
//   logits [batch]
//
// The backbone is its own Module so it can be frozen, stepped
// at its own learning rate, or loaded from a pretrained record.

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::BinaryCrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::gelu,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
#[derive(Config, Debug)]
pub struct EegClassifierConfig {
    pub channels:   usize,
    pub patches:    usize,
    pub patch_size: usize,
    pub d_model:    usize,
    pub num_heads:  usize,
    pub num_layers: usize,
    pub d_ff:       usize,
    pub dropout:    f64,
}

impl EegClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> EegClassifier<B> {
        EegClassifier {
            backbone:    self.init_backbone(device),
            head_hidden: LinearConfig::new(self.d_model, self.d_model).init(device),
            head_out:    LinearConfig::new(self.d_model, 1).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }

    pub fn init_backbone<B: Backend>(&self, device: &B::Device) -> PatchBackbone<B> {
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        PatchBackbone {
            patch_embed:        LinearConfig::new(self.patch_size, self.d_model).init(device),
            channel_embedding:  EmbeddingConfig::new(self.channels, self.d_model).init(device),
            position_embedding: EmbeddingConfig::new(self.patches, self.d_model).init(device),
            layers,
            final_norm:         LayerNormConfig::new(self.d_model).init(device),
            dropout:            DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

// ─── Encoder block ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let attn_output = self.self_attn.forward(MhaInput::self_attn(x.clone())).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

// ─── Backbone ─────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct PatchBackbone<B: Backend> {
    pub patch_embed:        Linear<B>,
    pub channel_embedding:  Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub dropout:            Dropout,
}

impl<B: Backend> PatchBackbone<B> {
    /// signals: [batch, C, P, patch] → tokens: [batch, C·P, d_model]
    pub fn forward(&self, signals: Tensor<B, 4>) -> Tensor<B, 3> {
        let [batch_size, channels, patches, patch_size] = signals.dims();
        let tokens = channels * patches;
        let device = signals.device();

        let x = self.patch_embed.forward(signals.reshape([batch_size, tokens, patch_size]));

        // token k is patch (k mod P) of channel (k / P)
        let channel_ids: Vec<i32> = (0..tokens).map(|k| (k / patches) as i32).collect();
        let position_ids: Vec<i32> = (0..tokens).map(|k| (k % patches) as i32).collect();
        let channel_ids = Tensor::<B, 1, Int>::from_ints(channel_ids.as_slice(), &device)
            .unsqueeze::<2>()
            .expand([batch_size, tokens]);
        let position_ids = Tensor::<B, 1, Int>::from_ints(position_ids.as_slice(), &device)
            .unsqueeze::<2>()
            .expand([batch_size, tokens]);

        let x = x
            + self.channel_embedding.forward(channel_ids)
            + self.position_embedding.forward(position_ids);

        let mut x = self.dropout.forward(x);
        for layer in &self.layers {
            x = layer.forward(x);
        }
        self.final_norm.forward(x)
    }
}

// ─── Classifier ───────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct EegClassifier<B: Backend> {
    pub backbone:    PatchBackbone<B>,
    pub head_hidden: Linear<B>,
    pub head_out:    Linear<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EegClassifier<B> {
    /// signals: [batch, C, P, patch] → logits: [batch]
    pub fn forward(&self, signals: Tensor<B, 4>) -> Tensor<B, 1> {
        let batch_size = signals.dims()[0];
        let tokens = self.backbone.forward(signals);
        let d_model = tokens.dims()[2];

        let pooled = tokens.mean_dim(1).reshape([batch_size, d_model]);
        let hidden = gelu(self.head_hidden.forward(self.dropout.forward(pooled)));
        self.head_out.forward(hidden).reshape([batch_size])
    }

    /// Binary cross-entropy on the logits, with label smoothing.
    pub fn forward_loss(
        &self,
        signals:         Tensor<B, 4>,
        labels:          Tensor<B, 1, Int>,
        label_smoothing: f32,
    ) -> (Tensor<B, 1>, Tensor<B, 1>) {
        let logits = self.forward(signals);
        let smoothing = (label_smoothing > 0.0).then_some(label_smoothing);
        let bce = BinaryCrossEntropyLossConfig::new()
            .with_logits(true)
            .with_smoothing(smoothing)
            .init(&logits.device());
        let loss = bce.forward(logits.clone(), labels);
        (loss, logits)
    }
}
