mod decoder_port;
mod slot_currency_port;
mod transport_port;

pub use decoder_port::Decoder;
pub use slot_currency_port::SlotCurrency;
pub use transport_port::Transport;
