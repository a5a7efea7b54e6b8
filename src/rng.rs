use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seeded random streams, one per named concern.
///
/// A stream's seed depends only on the master seed and its name, so adding a
/// new stream never perturbs the draws of existing ones.
pub struct RngManager {
    master_seed: u64,
    streams: HashMap<&'static str, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            master_seed: seed,
            streams: HashMap::new(),
        }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn stream(&mut self, name: &'static str) -> &mut ChaCha8Rng {
        let seed = derive_seed(self.master_seed, name);
        self.streams
            .entry(name)
            .or_insert_with(|| ChaCha8Rng::seed_from_u64(seed))
    }
}

fn derive_seed(master: u64, name: &str) -> u64 {
    // FNV-1a over the stream name, folded into the master seed
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (master ^ hash)
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407)
}
