//! Settlement coordinator configuration.
//!
//! Configuration values should be provided by the application, not
//! hardcoded.

/// Settlement coordinator configuration.
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// URL the processor sends the payer back to after checkout
    /// (e.g. "<https://app.example.org/payments/callback>").
    ///
    /// The payment reference is appended by the processor as a query
    /// parameter on the return leg.
    pub callback_url: String,

    /// Maximum quantity of a single resource per reservation.
    ///
    /// Default: 10
    pub max_quantity: u32,

    /// How many fresh references to try when creation hits the
    /// astronomically unlikely reference collision.
    ///
    /// Default: 3
    pub reference_retries: u32,
}

impl SettlementConfig {
    /// Create a new settlement configuration.
    ///
    /// # Arguments
    ///
    /// * `callback_url` - Browser return URL registered with the processor
    #[must_use]
    pub const fn new(callback_url: String) -> Self {
        Self {
            callback_url,
            max_quantity: 10,
            reference_retries: 3,
        }
    }

    /// Set the maximum per-reservation quantity.
    #[must_use]
    pub const fn with_max_quantity(mut self, max_quantity: u32) -> Self {
        self.max_quantity = max_quantity;
        self
    }

    /// Set the reference collision retry budget.
    #[must_use]
    pub const fn with_reference_retries(mut self, retries: u32) -> Self {
        self.reference_retries = retries;
        self
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self::new("http://localhost:3000/payments/callback".to_string())
    }
}
