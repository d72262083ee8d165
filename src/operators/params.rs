#[derive(Clone, Copy)]
pub struct OperatorParams {
    pub overlap_tolerance: f64,    // Route-pair centroid distance, as a fraction of max extent, below which SWAP* is tried
    pub max_exchange_segment: u8,  // Largest k/m tried by Exchange moves
    pub granular_k: usize,         // Neighbours kept per client in the granular neighbourhood
}

impl Default for OperatorParams {
    fn default() -> Self {
        OperatorParams { overlap_tolerance: 0.5, max_exchange_segment: 3, granular_k: 10 }
    }
}
