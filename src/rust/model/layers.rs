//! Forward-only layers for the reconstructed network.
//!
//! Images are `(height, width, channels)` arrays; kernels use the
//! `[kernel_h, kernel_w, in_channels, out_channels]` layout and dense weights
//! `[inputs, units]`, matching the tensors stored in the artifact.

use ndarray::{Array1, Array2, Array3, Array4, Axis};

/// Element-wise (or, for softmax, vector-wide) output activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu6,
    Softmax,
    Sigmoid,
    Linear,
}

impl Activation {
    /// Maps a Keras activation name; unknown names yield `None`.
    pub fn from_keras(name: &str) -> Option<Self> {
        match name {
            "relu6" => Some(Self::Relu6),
            "softmax" => Some(Self::Softmax),
            "sigmoid" => Some(Self::Sigmoid),
            "linear" => Some(Self::Linear),
            _ => None,
        }
    }

    /// The head activation for `units` outputs: sigmoid for one, softmax otherwise.
    pub fn for_head(units: usize) -> Self {
        if units == 1 {
            Self::Sigmoid
        } else {
            Self::Softmax
        }
    }

    pub fn apply(self, mut values: Array1<f32>) -> Array1<f32> {
        match self {
            Self::Relu6 => values.mapv_inplace(relu6),
            Self::Sigmoid => values.mapv_inplace(|x| 1.0 / (1.0 + (-x).exp())),
            Self::Linear => {}
            Self::Softmax => {
                let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                values.mapv_inplace(|x| (x - max).exp());
                let sum = values.sum();
                if sum > 0.0 {
                    values /= sum;
                }
            }
        }
        values
    }
}

fn relu6(x: f32) -> f32 {
    x.clamp(0.0, 6.0)
}

/// 2-D convolution with "same" padding and ReLU6 applied to its output.
#[derive(Debug, Clone)]
pub struct Conv2d {
    pub name: String,
    pub kernel: Array4<f32>,
    pub bias: Array1<f32>,
    pub stride: usize,
}

impl Conv2d {
    /// A zero-initialised convolution.
    pub fn new(name: &str, kernel_size: usize, in_channels: usize, filters: usize, stride: usize) -> Self {
        Self {
            name: name.to_string(),
            kernel: Array4::zeros((kernel_size, kernel_size, in_channels, filters)),
            bias: Array1::zeros(filters),
            stride: stride.max(1),
        }
    }

    /// Output extent along one axis: `ceil(input / stride)`.
    pub fn output_len(&self, input: usize) -> usize {
        input.div_ceil(self.stride)
    }

    pub fn forward(&self, input: &Array3<f32>) -> Array3<f32> {
        let (in_h, in_w, in_c) = input.dim();
        let (k_h, k_w, _, filters) = self.kernel.dim();
        let (out_h, out_w) = (self.output_len(in_h), self.output_len(in_w));
        let pad_top = ((out_h.saturating_sub(1)) * self.stride + k_h).saturating_sub(in_h) / 2;
        let pad_left = ((out_w.saturating_sub(1)) * self.stride + k_w).saturating_sub(in_w) / 2;

        let mut output = Array3::zeros((out_h, out_w, filters));
        for oy in 0..out_h {
            for ox in 0..out_w {
                let mut acc = self.bias.clone();
                for ky in 0..k_h {
                    let iy = (oy * self.stride + ky) as isize - pad_top as isize;
                    if iy < 0 || iy >= in_h as isize {
                        continue;
                    }
                    for kx in 0..k_w {
                        let ix = (ox * self.stride + kx) as isize - pad_left as isize;
                        if ix < 0 || ix >= in_w as isize {
                            continue;
                        }
                        for c in 0..in_c {
                            let pixel = input[[iy as usize, ix as usize, c]];
                            if pixel != 0.0 {
                                acc.scaled_add(pixel, &self.kernel.slice(ndarray::s![ky, kx, c, ..]));
                            }
                        }
                    }
                }
                output
                    .slice_mut(ndarray::s![oy, ox, ..])
                    .assign(&acc.mapv(relu6));
            }
        }
        output
    }
}

/// Mean over the spatial axes: `(h, w, c)` becomes `(c)`.
pub fn global_average_pool(input: &Array3<f32>) -> Array1<f32> {
    input
        .mean_axis(Axis(0))
        .and_then(|rows| rows.mean_axis(Axis(0)))
        .unwrap_or_else(|| Array1::zeros(input.dim().2))
}

/// Fully connected layer.
#[derive(Debug, Clone)]
pub struct Dense {
    pub name: String,
    pub kernel: Array2<f32>,
    pub bias: Array1<f32>,
    pub activation: Activation,
}

impl Dense {
    pub fn new(name: &str, inputs: usize, units: usize, activation: Activation) -> Self {
        Self {
            name: name.to_string(),
            kernel: Array2::zeros((inputs, units)),
            bias: Array1::zeros(units),
            activation,
        }
    }

    pub fn forward(&self, input: &Array1<f32>) -> Array1<f32> {
        self.activation.apply(input.dot(&self.kernel) + &self.bias)
    }
}
