use common::Escrow;

pub struct AppState {
    pub escrow: Escrow,
    pub public_base_url: String,
}

impl AppState {
    pub fn new(escrow: Escrow, public_base_url: &str) -> Self {
        AppState {
            escrow,
            public_base_url: public_base_url.to_string(),
        }
    }

    /// Link the seller shares with the buyer.
    pub fn payment_link(&self, tx_id: &str) -> String {
        format!("{}/pay/{}", self.public_base_url, tx_id)
    }
}
