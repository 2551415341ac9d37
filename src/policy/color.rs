use crate::node::Opinion;
use crate::simulation::SimConfig;
use rand::Rng;

/// Picks each node's opinion at population-creation time.
#[derive(Debug, Clone, Copy)]
pub struct RandomColorAssigner {
    prob_start_with_color: f64,
    prob_starts_with_red: f64,
}

impl RandomColorAssigner {
    pub fn new(prob_start_with_color: f64, prob_starts_with_red: f64) -> Self {
        Self {
            prob_start_with_color,
            prob_starts_with_red,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.prob_start_with_color, config.prob_starts_with_red)
    }

    pub fn assign<R: Rng + ?Sized>(&self, rng: &mut R) -> Opinion {
        if rng.r#gen::<f64>() > self.prob_start_with_color {
            return Opinion::None;
        }

        if rng.r#gen::<f64>() <= self.prob_starts_with_red {
            Opinion::Red
        } else {
            Opinion::Blue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn certain_red() {
        let assigner = RandomColorAssigner::new(1.0, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..500 {
            assert_eq!(assigner.assign(&mut rng), Opinion::Red);
        }
    }

    #[test]
    fn never_uncolored_when_color_is_certain() {
        let assigner = RandomColorAssigner::new(1.0, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let opinions: Vec<_> = (0..500).map(|_| assigner.assign(&mut rng)).collect();
        assert!(opinions.iter().all(|o| o.is_color()));
        assert!(opinions.contains(&Opinion::Red));
        assert!(opinions.contains(&Opinion::Blue));
    }

    #[test]
    fn proportions_roughly_match() {
        let assigner = RandomColorAssigner::new(0.2, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let n = 20_000;
        let colored = (0..n).filter(|_| assigner.assign(&mut rng).is_color()).count();
        let ratio = colored as f64 / n as f64;
        // 0.2 expected, loose bound
        assert!((0.17..0.23).contains(&ratio), "colored ratio {ratio}");
    }
}
