/// Exponential moving average of the published shadow price.
#[derive(Debug, Clone)]
pub struct PriceSmoother {
    alpha: f64,
    value: Option<f64>,
}

impl PriceSmoother {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, value: None }
    }

    /// Blend a new price in; the first observation is taken as-is.
    pub fn observe(&mut self, price: f64) -> f64 {
        let smoothed = match self.value {
            Some(prev) => self.alpha * price + (1.0 - self.alpha) * prev,
            None => price,
        };
        self.value = Some(smoothed);
        smoothed
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}
