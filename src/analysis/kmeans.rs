// 🎯 K-Means - Lloyd's algorithm with k-means++ seeding
// Deterministic for a given seed: every restart draws from the same seeded RNG.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct KMeans {
    pub k: usize,
    pub seed: u64,
    pub restarts: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub centroids: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
}

impl KMeans {
    pub fn new(k: usize, seed: u64) -> Self {
        KMeans {
            k,
            seed,
            restarts: 10,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }

    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts.max(1);
        self
    }

    /// Cluster `points` (all of equal dimension).
    ///
    /// Returns `None` for empty input or k = 0. When there are fewer distinct
    /// points than k, k shrinks to the number of distinct points.
    pub fn fit(&self, points: &[Vec<f64>]) -> Option<KMeansFit> {
        if points.is_empty() || self.k == 0 {
            return None;
        }

        let k = self.k.min(count_distinct(points));
        let tolerance = self.tolerance * mean_variance(points);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut best: Option<KMeansFit> = None;
        for _ in 0..self.restarts.max(1) {
            let initial = init_plus_plus(points, k, &mut rng);
            let fit = lloyd(points, initial, self.max_iterations, tolerance);
            let better = match &best {
                Some(b) => fit.inertia < b.inertia,
                None => true,
            };
            if better {
                best = Some(fit);
            }
        }
        best
    }
}

impl KMeansFit {
    /// Renumber clusters so label 0 has the smallest centroid (first dimension)
    pub fn ordered_by_first_dim(self) -> Self {
        let mut order: Vec<usize> = (0..self.centroids.len()).collect();
        order.sort_by(|a, b| self.centroids[*a][0].total_cmp(&self.centroids[*b][0]));

        let mut remap = vec![0; order.len()];
        for (new_label, old_label) in order.iter().enumerate() {
            remap[*old_label] = new_label;
        }

        KMeansFit {
            centroids: order.iter().map(|i| self.centroids[*i].clone()).collect(),
            labels: self.labels.iter().map(|l| remap[*l]).collect(),
            inertia: self.inertia,
            iterations: self.iterations,
        }
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }
}

// ============================================================================
// ALGORITHM
// ============================================================================

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (idx, d);
        }
    }
    best
}

fn count_distinct(points: &[Vec<f64>]) -> usize {
    // `+ 0.0` folds -0.0 into 0.0 so the two sort next to each other
    let mut sorted: Vec<Vec<f64>> = points
        .iter()
        .map(|p| p.iter().map(|v| v + 0.0).collect())
        .collect();
    sorted.sort_by(|a, b| {
        a.iter()
            .zip(b)
            .map(|(x, y)| x.total_cmp(y))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len()))
    });
    sorted.dedup();
    sorted.len()
}

fn mean_variance(points: &[Vec<f64>]) -> f64 {
    let dims = points[0].len();
    if dims == 0 {
        return 0.0;
    }
    let n = points.len() as f64;
    let total: f64 = (0..dims)
        .map(|d| {
            let m = points.iter().map(|p| p[d]).sum::<f64>() / n;
            points.iter().map(|p| (p[d] - m).powi(2)).sum::<f64>() / n
        })
        .sum();
    total / dims as f64
}

fn init_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = vec![points[rng.gen_range(0..points.len())].clone()];

    while centroids.len() < k {
        let weights: Vec<f64> = points.iter().map(|p| nearest(p, &centroids).1).collect();
        let next = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            // All remaining weight is zero: take any point not yet chosen
            Err(_) => match points.iter().position(|p| !centroids.contains(p)) {
                Some(idx) => idx,
                None => break,
            },
        };
        centroids.push(points[next].clone());
    }
    centroids
}

fn lloyd(
    points: &[Vec<f64>],
    mut centroids: Vec<Vec<f64>>,
    max_iterations: usize,
    tolerance: f64,
) -> KMeansFit {
    let dims = points[0].len();
    let k = centroids.len();
    let mut labels = vec![0; points.len()];
    let mut iterations = 0;

    for _ in 0..max_iterations {
        iterations += 1;

        for (i, p) in points.iter().enumerate() {
            labels[i] = nearest(p, &centroids).0;
        }

        let mut sums = vec![vec![0.0; dims]; k];
        let mut counts = vec![0usize; k];
        for (p, label) in points.iter().zip(&labels) {
            counts[*label] += 1;
            for d in 0..dims {
                sums[*label][d] += p[d];
            }
        }

        let mut updated = centroids.clone();
        for c in 0..k {
            if counts[c] > 0 {
                updated[c] = sums[c].iter().map(|s| s / counts[c] as f64).collect();
            } else {
                // Empty cluster: move it onto the worst-served point
                let far = points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (i, squared_distance(p, &centroids[labels[i]])))
                    .max_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                updated[c] = points[far].clone();
            }
        }

        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centroids = updated;

        if shift <= tolerance {
            break;
        }
    }

    // Final assignment against the converged centroids
    let mut inertia = 0.0;
    for (i, p) in points.iter().enumerate() {
        let (label, d) = nearest(p, &centroids);
        labels[i] = label;
        inertia += d;
    }

    KMeansFit {
        centroids,
        labels,
        inertia,
        iterations,
    }
}

// ============================================================================
// TESTS
// ============================================================================
