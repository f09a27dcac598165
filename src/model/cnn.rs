//! Classification network
//!
//! A small stand-in for the Inception / MobileNet family built with burn: a
//! strided stem, a stack of downsampling stages, global average pooling and a
//! single linear classifier. MobileNet variants use depthwise separable
//! stages; Inception uses plain 3x3 convolutions.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Configuration for the [`ClassifierNet`] CNN
#[derive(Config, Debug)]
pub struct ClassifierNetConfig {
    /// Number of output classes (ImageNet-sized by default)
    #[config(default = "1000")]
    pub num_classes: usize,

    /// Input image size (square)
    #[config(default = "224")]
    pub input_size: usize,

    /// Dropout before the classifier
    #[config(default = "0.2")]
    pub dropout_rate: f64,

    #[config(default = "3")]
    pub in_channels: usize,

    /// Stem output channels; each stage doubles them
    #[config(default = "32")]
    pub base_filters: usize,

    /// Downsampling stages after the stem
    #[config(default = "4")]
    pub stages: usize,

    /// Depthwise separable stages instead of full 3x3 convolutions
    #[config(default = "false")]
    pub separable: bool,
}

impl ClassifierNetConfig {
    /// Channels coming out of the last stage
    pub fn feature_channels(&self) -> usize {
        self.base_filters << self.stages
    }
}

fn conv3x3<B: Backend>(
    in_channels: usize,
    out_channels: usize,
    stride: usize,
    groups: usize,
    device: &B::Device,
) -> Conv2d<B> {
    Conv2dConfig::new([in_channels, out_channels], [3, 3])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .with_groups(groups)
        .with_bias(false)
        .init(device)
}

/// One stride-2 stage that doubles the channel count
///
/// Separable: 3x3 depthwise (stride 2) then 1x1 pointwise.
/// Plain: a single 3x3 convolution with stride 2.
#[derive(Module, Debug)]
pub struct Stage<B: Backend> {
    depthwise: Option<Conv2d<B>>,
    depthwise_bn: Option<BatchNorm<B, 2>>,
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
    relu: Relu,
}

impl<B: Backend> Stage<B> {
    pub fn new(in_channels: usize, out_channels: usize, separable: bool, device: &B::Device) -> Self {
        let (depthwise, depthwise_bn, conv) = if separable {
            let pointwise = Conv2dConfig::new([in_channels, out_channels], [1, 1])
                .with_bias(false)
                .init(device);
            (
                Some(conv3x3(in_channels, in_channels, 2, in_channels, device)),
                Some(BatchNormConfig::new(in_channels).init(device)),
                pointwise,
            )
        } else {
            (None, None, conv3x3(in_channels, out_channels, 2, 1, device))
        };

        Self {
            depthwise,
            depthwise_bn,
            conv,
            bn: BatchNormConfig::new(out_channels).init(device),
            relu: Relu::new(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = match (&self.depthwise, &self.depthwise_bn) {
            (Some(dw), Some(bn)) => self.relu.forward(bn.forward(dw.forward(x))),
            _ => x,
        };
        let x = self.bn.forward(self.conv.forward(x));
        self.relu.forward(x)
    }
}

/// Image classifier CNN
///
/// Stem (3x3, stride 2), `stages` stride-2 stages, global average pooling,
/// dropout and one linear layer. Any input of at least `2^(stages + 1)`
/// pixels per side gives a non-empty feature map.
#[derive(Module, Debug)]
pub struct ClassifierNet<B: Backend> {
    stem: Conv2d<B>,
    stem_bn: BatchNorm<B, 2>,
    stages: Vec<Stage<B>>,
    global_pool: AdaptiveAvgPool2d,
    dropout: Dropout,
    classifier: Linear<B>,
    relu: Relu,
    num_classes: usize,
}

impl<B: Backend> ClassifierNet<B> {
    /// Create a freshly initialised network from configuration
    pub fn new(config: &ClassifierNetConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        let stages = (0..config.stages)
            .map(|i| Stage::new(base << i, base << (i + 1), config.separable, device))
            .collect();

        Self {
            stem: conv3x3(config.in_channels, base, 2, 1, device),
            stem_bn: BatchNormConfig::new(base).init(device),
            stages,
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dropout: DropoutConfig::new(config.dropout_rate).init(),
            classifier: LinearConfig::new(config.feature_channels(), config.num_classes)
                .init(device),
            relu: Relu::new(),
            num_classes: config.num_classes,
        }
    }

    /// Logits of shape `[batch, num_classes]` for input `[batch, 3, height, width]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = self.relu.forward(self.stem_bn.forward(self.stem.forward(x)));
        for stage in &self.stages {
            x = stage.forward(x);
        }

        // [B, C, H, W] -> [B, C]
        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        self.classifier.forward(self.dropout.forward(x))
    }

    /// Forward pass followed by softmax over the class dimension
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(x), 1)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }
}
