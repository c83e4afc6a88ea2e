mod resolve_relay;

pub use resolve_relay::{pick_relay, ResolveRelayUseCase};
