// Keys, signing and addresses at the edge of the codec

mod address;
mod signer;

pub use address::{address_to_script_pubkey, Address, Network, Payload};
pub use signer::{KeyPair, Signer};
