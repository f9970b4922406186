//! Fully connected network with tanh hidden layers

use rand::rngs::StdRng;
use rand::Rng;

/// Dense layer, weights stored row-major as `[out][in]`
#[derive(Debug, Clone, PartialEq)]
pub struct Linear {
    pub in_dim: usize,
    pub out_dim: usize,
    pub weight: Vec<f64>,
    pub bias: Vec<f64>,
}

impl Linear {
    /// Uniform(±1/√fan_in) init for weights and bias
    pub fn new(in_dim: usize, out_dim: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (in_dim.max(1) as f64).sqrt();
        let weight = (0..in_dim * out_dim)
            .map(|_| rng.gen_range(-bound..=bound))
            .collect();
        let bias = (0..out_dim).map(|_| rng.gen_range(-bound..=bound)).collect();
        Self {
            in_dim,
            out_dim,
            weight,
            bias,
        }
    }

    pub fn forward(&self, x: &[f64]) -> Vec<f64> {
        (0..self.out_dim)
            .map(|o| {
                let row = &self.weight[o * self.in_dim..(o + 1) * self.in_dim];
                row.iter().zip(x).map(|(w, xi)| w * xi).sum::<f64>() + self.bias[o]
            })
            .collect()
    }

    pub fn param_count(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FcNetwork {
    layers: Vec<Linear>,
}

impl FcNetwork {
    pub fn new(in_dim: usize, out_dim: usize, hidden_sizes: &[usize], rng: &mut StdRng) -> Self {
        let mut sizes = Vec::with_capacity(hidden_sizes.len() + 2);
        sizes.push(in_dim);
        sizes.extend_from_slice(hidden_sizes);
        sizes.push(out_dim);

        let layers = sizes
            .windows(2)
            .map(|pair| Linear::new(pair[0], pair[1], rng))
            .collect();
        Self { layers }
    }

    pub fn layers(&self) -> &[Linear] {
        &self.layers
    }

    pub fn in_dim(&self) -> usize {
        self.layers.first().map(|l| l.in_dim).unwrap_or(0)
    }

    pub fn out_dim(&self) -> usize {
        self.layers.last().map(|l| l.out_dim).unwrap_or(0)
    }

    pub fn forward(&self, x: &[f64]) -> Vec<f64> {
        let last = self.layers.len().saturating_sub(1);
        let mut h = x.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            h = layer.forward(&h);
            if i < last {
                h.iter_mut().for_each(|v| *v = v.tanh());
            }
        }
        h
    }

    /// Multiply the output layer's weights and bias by `factor`
    pub fn scale_output_layer(&mut self, factor: f64) {
        if let Some(layer) = self.layers.last_mut() {
            layer.weight.iter_mut().for_each(|w| *w *= factor);
            layer.bias.iter_mut().for_each(|b| *b *= factor);
        }
    }

    pub fn param_count(&self) -> usize {
        self.layers.iter().map(Linear::param_count).sum()
    }

    /// Append parameters layer by layer, weights before bias
    pub fn write_params(&self, out: &mut Vec<f64>) {
        for layer in &self.layers {
            out.extend_from_slice(&layer.weight);
            out.extend_from_slice(&layer.bias);
        }
    }

    /// Load parameters in `write_params` order; returns how many were read
    pub fn read_params(&mut self, values: &[f64]) -> usize {
        let mut offset = 0;
        for layer in &mut self.layers {
            let w = layer.weight.len();
            layer.weight.copy_from_slice(&values[offset..offset + w]);
            offset += w;
            let b = layer.bias.len();
            layer.bias.copy_from_slice(&values[offset..offset + b]);
            offset += b;
        }
        offset
    }
}
