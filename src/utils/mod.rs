use anyhow::{Context, Result};
use std::path::Path;

/// Ensure the parent directory of a file exists
pub fn ensure_parent_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }
    Ok(())
}

/// Format number with commas
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}

/// Random number utilities
pub mod random {
    use burn::prelude::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Create RNG with fixed seed
    pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    /// Standard-uniform batch of shape [batch_size, timesteps, channels]
    pub fn random_batch<B: Backend>(
        batch_size: usize,
        timesteps: usize,
        channels: usize,
        seed: u64,
        device: &B::Device,
    ) -> Tensor<B, 3> {
        let mut rng = seeded_rng(seed);
        let values: Vec<f32> = (0..batch_size * timesteps * channels)
            .map(|_| rng.gen::<f32>())
            .collect();

        Tensor::<B, 1>::from_floats(values.as_slice(), device)
            .reshape([batch_size, timesteps, channels])
    }
}
