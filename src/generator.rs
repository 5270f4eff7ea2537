//! Client generation by inverse-transform sampling.
//!
//! Inter-arrival gaps and service durations are both exponential:
//! `x = -ln(U) / rate` with `U` drawn from the open interval (0, 1), so
//! `ln(U)` is always finite and strictly negative.

use crate::client::{Client, ClientId};
use rand::distributions::Open01;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};

/// 64-bit fractional golden ratio, spreads consecutive child offsets over the seed space.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplingMethod {
    /// `-ln(U) / rate` by hand.
    #[default]
    Inversion,
    /// `rand_distr::Exp`, kept around to cross-check the inversion.
    Direct,
}

#[derive(Debug, Clone, Copy)]
pub struct RandomProcessGenerator {
    arrival_rate: f64,
    service_rate: f64,
    method: SamplingMethod,
}

impl RandomProcessGenerator {
    /// Rates are assumed positive; `SimConfig::validate` is where that gets enforced.
    pub fn new(arrival_rate: f64, service_rate: f64) -> Self {
        Self {
            arrival_rate,
            service_rate,
            method: SamplingMethod::Inversion,
        }
    }

    pub fn with_method(mut self, method: SamplingMethod) -> Self {
        self.method = method;
        self
    }

    /// `n` clients, arrivals first then service times, both drawn from `rng`.
    pub fn generate<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Client> {
        let gaps = self.draw(self.arrival_rate, n, rng);
        let services = self.draw(self.service_rate, n, rng);

        let mut arrival = 0.0;
        gaps.into_iter()
            .zip(services)
            .enumerate()
            .map(|(i, (gap, service))| {
                arrival += gap;
                Client::new(ClientId::new(i as u64), arrival, service)
            })
            .collect()
    }

    fn draw<R: Rng + ?Sized>(&self, rate: f64, n: usize, rng: &mut R) -> Vec<f64> {
        match self.method {
            SamplingMethod::Inversion => (0..n)
                .map(|_| {
                    let u: f64 = Open01.sample(rng);
                    -u.ln() / rate
                })
                .collect(),
            SamplingMethod::Direct => match Exp::new(rate) {
                Ok(exp) => (0..n).map(|_| exp.sample(rng)).collect(),
                // Exp rejects non-positive rates, config validation stops those earlier
                Err(_) => vec![f64::INFINITY; n],
            },
        }
    }
}

/// Seedable random source owned by a simulation.
#[derive(Debug, Clone)]
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        SimRng(SmallRng::from_entropy())
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map(Self::new).unwrap_or_else(Self::from_entropy)
    }

    /// Seed for an independent child stream, a pure function of `(seed, offset)`.
    pub fn derive_seed(seed: u64, offset: u64) -> u64 {
        seed ^ offset.wrapping_add(1).wrapping_mul(MIXING_CONSTANT)
    }

    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn arrivals_increase_and_services_positive() {
        let mut rng = SimRng::new(42);
        let clients = RandomProcessGenerator::new(0.2, 0.05).generate(500, rng.inner());
        assert_eq!(clients.len(), 500);
        for pair in clients.windows(2) {
            assert!(pair[0].arrival_time < pair[1].arrival_time);
        }
        assert!(clients.iter().all(|c| c.service_time > 0.0));
        assert!(clients.iter().enumerate().all(|(i, c)| c.id.index() == i));
    }

    #[test]
    fn zero_clients_is_empty() {
        let mut rng = SimRng::new(1);
        assert!(RandomProcessGenerator::new(1.0, 1.0).generate(0, rng.inner()).is_empty());
    }

    #[test]
    fn mean_gap_close_to_inverse_rate() {
        let mut rng = SimRng::new(7);
        let n = 20_000;
        let clients = RandomProcessGenerator::new(0.5, 2.0).generate(n, rng.inner());
        let mean_gap = clients.last().unwrap().arrival_time / n as f64;
        let mean_service = clients.iter().map(|c| c.service_time).sum::<f64>() / n as f64;
        assert!((mean_gap - 2.0).abs() < 0.1, "got {mean_gap}");
        assert!((mean_service - 0.5).abs() < 0.02, "got {mean_service}");
    }

    #[test]
    fn direct_method_matches_moments() {
        let mut rng = SimRng::new(7);
        let n = 20_000;
        let clients = RandomProcessGenerator::new(0.5, 2.0)
            .with_method(SamplingMethod::Direct)
            .generate(n, rng.inner());
        let mean_gap = clients.last().unwrap().arrival_time / n as f64;
        assert!((mean_gap - 2.0).abs() < 0.1, "got {mean_gap}");
    }

    #[test]
    fn constant_source_gives_constant_gaps() {
        // StepRng with zero increment always yields the same word, so every U is equal
        let mut rng = StepRng::new(u64::MAX / 2, 0);
        let clients = RandomProcessGenerator::new(1.0, 1.0).generate(4, &mut rng);
        let gap = clients[0].arrival_time;
        assert!(gap > 0.0);
        assert!((clients[3].arrival_time - 4.0 * gap).abs() < 1e-12);
        assert!((clients[2].service_time - gap).abs() < 1e-12);
    }

    #[test]
    fn derived_seeds_differ() {
        assert_ne!(SimRng::derive_seed(5, 0), SimRng::derive_seed(5, 1));
        assert_eq!(SimRng::derive_seed(5, 3), SimRng::derive_seed(5, 3));
    }
}
