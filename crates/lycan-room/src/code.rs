//! Room code generation.

use lycan_protocol::RoomCode;
use rand::Rng;

/// Draws a uniformly random room code.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> RoomCode {
    RoomCode::from_indices(|n| rng.random_range(0..n))
}

/// Draws codes until one is not taken.
///
/// There are 36^6 (about 2.2 billion) codes, so with any realistic number
/// of live rooms this returns after one or two draws.
pub fn generate_unique<R: Rng + ?Sized>(
    rng: &mut R,
    is_taken: impl Fn(&RoomCode) -> bool,
) -> RoomCode {
    loop {
        let code = generate(rng);
        if !is_taken(&code) {
            return code;
        }
        tracing::debug!(%code, "room code collision, drawing again");
    }
}
